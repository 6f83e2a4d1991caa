/// Factory: build the remote `TokenService` from application `Config`.
use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;
use crate::error::AppError;
use crate::services::auth::{HttpTokenService, TokenService};

pub fn build_token_service(config: &Config) -> Result<Arc<dyn TokenService>, AppError> {
    let service = HttpTokenService::new(
        &config.token_service_url,
        config.token_service_client_id.clone(),
        Duration::from_secs(config.token_service_timeout_seconds),
    )
    .map_err(|e| {
        tracing::error!(error = %e, "failed to build token service client");
        AppError::Internal
    })?;

    tracing::info!(
        refresh_url = %service.refresh_url(),
        validate_url = %service.validate_url(),
        "token service configured"
    );

    Ok(Arc::new(service))
}
