use http::StatusCode;
use thiserror::Error;

/// HTTP result type, T is typically a hyper::Response
/// HttpError is used to generate a synthetic error response
pub(crate) type HttpResult<T> = std::result::Result<T, HttpError>;

/// Describes things that can go wrong before a handler produces a response
#[derive(Debug, Error, Clone)]
pub enum HttpError {
    #[error("Not found")]
    NotFound,

    #[error("Method not allowed")]
    MethodNotAllowed,

    #[error("Request body exceeds {0} bytes")]
    PayloadTooLarge(usize),

    #[error("Failed to read request body: {0}")]
    BodyRead(String),

    #[error("Request body not received within {0:?}")]
    RequestTimeout(std::time::Duration),

    #[error("Failed to generate response: {0}")]
    FailedToGenerateResponse(String),
}

impl HttpError {
    pub fn error_type(&self) -> &'static str {
        match self {
            HttpError::NotFound => "not_found",
            HttpError::MethodNotAllowed => "method_not_allowed",
            HttpError::PayloadTooLarge(_) => "payload_too_large",
            HttpError::BodyRead(_) => "body_read",
            HttpError::RequestTimeout(_) => "request_timeout",
            HttpError::FailedToGenerateResponse(_) => "response_build",
        }
    }
}

impl From<HttpError> for StatusCode {
    fn from(e: HttpError) -> StatusCode {
        match e {
            HttpError::NotFound => StatusCode::NOT_FOUND,
            HttpError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            HttpError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            HttpError::BodyRead(_) => StatusCode::BAD_REQUEST,
            HttpError::RequestTimeout(_) => StatusCode::REQUEST_TIMEOUT,
            HttpError::FailedToGenerateResponse(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
