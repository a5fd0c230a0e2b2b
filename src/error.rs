use actix_web::http::StatusCode;
use actix_web::ResponseError;

use thiserror::Error;

use crate::client::CommerceError;
use crate::etl::EtlError;
use crate::issuance::IssuanceError;

pub type RestResult<T> = Result<T, RestError>;

#[derive(Debug, Error)]
pub enum RestError {
    #[error("Parse Error: {0}")]
    ParseError(String),

    #[error("Unauthorized Access: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not Found: {0}")]
    NotFound(String),

    #[error("Upstream Error: {0}")]
    Upstream(String),

    #[error("Internal Server Error: {0}")]
    InternalError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<sqlx::Error> for RestError {
    fn from(_e: sqlx::Error) -> Self {
        Self::InternalError("Database error".into())
    }
}

impl From<CommerceError> for RestError {
    fn from(e: CommerceError) -> Self {
        use CommerceError as E;
        match e {
            E::Transient(status) => Self::Upstream(format!("Commerce API unavailable ({})", status)),
            E::Http(_) => Self::Upstream("Commerce API unreachable".into()),
            // Operator intervention required; retrying will not help
            E::Authentication => Self::InternalError("Commerce API credentials rejected".into()),
            E::BadRequest(_) | E::ProtocolViolation(_) => {
                Self::InternalError("Commerce API contract failure".into())
            }
        }
    }
}

impl From<EtlError> for RestError {
    fn from(e: EtlError) -> Self {
        match e {
            EtlError::Commerce(e) => e.into(),
            EtlError::Database(e) => e.into(),
        }
    }
}

impl From<IssuanceError> for RestError {
    fn from(e: IssuanceError) -> Self {
        use IssuanceError as E;
        match e {
            E::NoMembership => Self::NotFound("No membership on record".into()),
            E::BadEmail(msg) => Self::ParseError(msg),
            E::Database(e) => e.into(),
        }
    }
}

impl ResponseError for RestError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::ParseError(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Upstream(_) => StatusCode::BAD_GATEWAY,
            Self::InternalError(_) | Self::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
