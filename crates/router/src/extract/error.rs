use crate::body::ResponseBody;
use crate::responder::Responder;
use crate::RequestContext;
use http::{Response, StatusCode};
use thiserror::Error;
use tracing::warn;

/// Failure to turn a request into handler arguments.
///
/// Answered as `400 Bad Request`, except for [`ExtractError::UnsupportedContentType`] which
/// answers `415` and [`ExtractError::Missing`] which points at a misconfigured route and
/// answers `500`.
#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("invalid path parameters: {message}")]
    InvalidPath { message: String },

    #[error("invalid query string: {message}")]
    InvalidQuery { message: String },

    #[error("invalid request body: {message}")]
    InvalidBody { message: String },

    #[error("unsupported content type, expected {expected}")]
    UnsupportedContentType { expected: &'static str },

    #[error("missing {name}")]
    Missing { name: String },
}

impl ExtractError {
    pub fn invalid_path<S: ToString>(str: S) -> Self {
        Self::InvalidPath { message: str.to_string() }
    }

    pub fn invalid_query<S: ToString>(str: S) -> Self {
        Self::InvalidQuery { message: str.to_string() }
    }

    pub fn invalid_body<S: ToString>(str: S) -> Self {
        Self::InvalidBody { message: str.to_string() }
    }

    pub fn unsupported_content_type(expected: &'static str) -> Self {
        Self::UnsupportedContentType { expected }
    }

    pub fn missing<S: ToString>(name: S) -> Self {
        Self::Missing { name: name.to_string() }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidPath { .. } | Self::InvalidQuery { .. } | Self::InvalidBody { .. } => StatusCode::BAD_REQUEST,
            Self::UnsupportedContentType { .. } => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            Self::Missing { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl Responder for ExtractError {
    fn response_to(self, req: &RequestContext) -> Response<ResponseBody> {
        let status = self.status();
        if status.is_server_error() {
            warn!(cause = %self, path = req.path(), "route cannot provide handler arguments");
            return (status, "500 internal server error").response_to(req);
        }
        (status, self.to_string()).response_to(req)
    }
}
