use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use pirate_core::{ConfigError, LedgerError, SpinError};
use pirate_shared::{ErrorCode, ErrorResponse};
use tracing::error;

/// Everything a handler can fail with. Internal causes are logged and never
/// sent to the client.
#[derive(thiserror::Error, Debug)]
pub enum ApiFailure {
    #[error("malformed request: {0}")]
    InvalidRequest(String),
    #[error("wager must be a positive integer")]
    InvalidWager,
    #[error("account id is missing or malformed")]
    InvalidAccount,
    #[error("insufficient funds")]
    InsufficientFunds,
    #[error("invalid engine params: {0}")]
    InvalidParams(#[from] ConfigError),
    #[error("missing or wrong api key")]
    Unauthorized,
    #[error("daily reward available at {0}")]
    DailyNotReady(DateTime<Utc>),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ApiFailure {
    pub fn code(&self) -> ErrorCode {
        match self {
            ApiFailure::InvalidRequest(_) => ErrorCode::InvalidRequest,
            ApiFailure::InvalidWager => ErrorCode::InvalidWager,
            ApiFailure::InvalidAccount => ErrorCode::InvalidAccount,
            ApiFailure::InsufficientFunds => ErrorCode::InsufficientFunds,
            ApiFailure::InvalidParams(_) => ErrorCode::InvalidParams,
            ApiFailure::Unauthorized => ErrorCode::Unauthorized,
            ApiFailure::DailyNotReady(_) => ErrorCode::DailyNotReady,
            ApiFailure::Internal(_) => ErrorCode::InternalError,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiFailure::InvalidRequest(_)
            | ApiFailure::InvalidWager
            | ApiFailure::InvalidAccount
            | ApiFailure::InvalidParams(_) => StatusCode::BAD_REQUEST,
            ApiFailure::InsufficientFunds | ApiFailure::DailyNotReady(_) => StatusCode::CONFLICT,
            ApiFailure::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiFailure::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<SpinError> for ApiFailure {
    fn from(err: SpinError) -> Self {
        match err {
            SpinError::InvalidWager => ApiFailure::InvalidWager,
            SpinError::InsufficientFunds { .. } => ApiFailure::InsufficientFunds,
            SpinError::LedgerUnavailable(_) | SpinError::SettlementFailed(_) => {
                ApiFailure::Internal(anyhow::Error::new(err))
            }
        }
    }
}

impl From<LedgerError> for ApiFailure {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::Rejected => ApiFailure::InsufficientFunds,
            LedgerError::Unavailable(_) => ApiFailure::Internal(anyhow::Error::new(err)),
        }
    }
}

impl IntoResponse for ApiFailure {
    fn into_response(self) -> Response {
        if let ApiFailure::Internal(cause) = &self {
            error!(error = ?cause, "request failed");
        }
        let mut body = ErrorResponse::new(self.code());
        if let ApiFailure::DailyNotReady(at) = &self {
            body.next_claim_at = Some(*at);
        }
        (self.status(), Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settlement_errors_are_internal() {
        let failure = ApiFailure::from(SpinError::SettlementFailed(LedgerError::Unavailable(
            "io".into(),
        )));
        assert_eq!(failure.code(), ErrorCode::InternalError);
        assert_eq!(failure.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn rejected_change_is_insufficient_funds() {
        let failure = ApiFailure::from(LedgerError::Rejected);
        assert_eq!(failure.code(), ErrorCode::InsufficientFunds);
        assert_eq!(failure.status(), StatusCode::CONFLICT);
    }
}
