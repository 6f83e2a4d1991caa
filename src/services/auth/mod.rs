pub mod claims;
pub mod factory;
pub mod http_client;
pub mod token_service;

pub use claims::{AccessClaims, MalformedToken, Role};
pub use factory::build_token_service;
pub use http_client::HttpTokenService;
pub use token_service::{BearerToken, TokenService, TokenServiceError};
