//! HTTP error mapping. Every failure leaves as `{"detail": "..."}`.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use tracing::error;
use duet_core::schemas::ErrorResponse;
use crate::generation::GenerationError;
use crate::translation::TranslationError;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Unavailable(String),

    #[error("{0}")]
    Internal(String),

    #[error("{0}")]
    BadGateway(String),

    #[error("{0}")]
    GatewayTimeout(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::BadGateway(_) => StatusCode::BAD_GATEWAY,
            Self::GatewayTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        (status, Json(ErrorResponse { detail: self.to_string() })).into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Validation(rejection.body_text())
    }
}

impl From<GenerationError> for ApiError {
    fn from(e: GenerationError) -> Self {
        match e {
            GenerationError::Validation(msg) => Self::Validation(msg),
            GenerationError::ServiceUnavailable => Self::Unavailable(e.to_string()),
            GenerationError::ArtifactMissing(_) => {
                error!("generation failed: {e}");
                Self::Internal("Video generation failed".into())
            }
            other => {
                error!("generation failed: {other:?}");
                Self::Internal(other.to_string())
            }
        }
    }
}

impl From<TranslationError> for ApiError {
    fn from(e: TranslationError) -> Self {
        match e {
            TranslationError::Validation(msg) => Self::Validation(msg),
            TranslationError::Config(msg) => {
                error!("translation unavailable: {msg}");
                Self::Internal(msg)
            }
            TranslationError::Upstream(_) => {
                error!("{e}");
                Self::BadGateway(e.to_string())
            }
            TranslationError::UpstreamTimeout(_) => {
                error!("{e}");
                Self::GatewayTimeout(e.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use duet_model::HostError;

    #[test]
    fn test_generation_status_codes() {
        let cases = [
            (GenerationError::Validation("empty".into()), StatusCode::UNPROCESSABLE_ENTITY),
            (GenerationError::ServiceUnavailable, StatusCode::SERVICE_UNAVAILABLE),
            (GenerationError::Inference(HostError::Inference("nan".into())), StatusCode::INTERNAL_SERVER_ERROR),
            (GenerationError::ArtifactMissing("x.mp4".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status(), status);
        }
    }

    #[test]
    fn test_translation_status_codes() {
        assert_eq!(
            ApiError::from(TranslationError::Config("no key".into())).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ApiError::from(TranslationError::Upstream("500".into())).status(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            ApiError::from(TranslationError::UpstreamTimeout(Duration::from_secs(30))).status(),
            StatusCode::GATEWAY_TIMEOUT
        );
    }

    #[test]
    fn test_details() {
        assert_eq!(ApiError::from(GenerationError::ServiceUnavailable).to_string(), "Model not loaded");
        assert_eq!(
            ApiError::from(GenerationError::ArtifactMissing("x.mp4".into())).to_string(),
            "Video generation failed"
        );
    }
}
