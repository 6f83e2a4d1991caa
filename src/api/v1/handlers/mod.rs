pub mod health;
pub mod me;
