//! Application error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Telemetry error: {0}")]
    Telemetry(#[from] spreadbot_telemetry::TelemetryError),
}

pub type AppResult<T> = Result<T, AppError>;
