use crate::extract::{ExtractError, Form, FromRequest, Json};
use crate::RequestContext;
use bytes::Bytes;
use http::header::CONTENT_TYPE;
use mime::Mime;
use serde::de::DeserializeOwned;
use std::convert::Infallible;

impl FromRequest for Bytes {
    type Error = Infallible;

    fn from_request(ctx: &RequestContext) -> Result<Self, Self::Error> {
        Ok(ctx.body().clone())
    }
}

impl FromRequest for String {
    type Error = ExtractError;

    fn from_request(ctx: &RequestContext) -> Result<Self, Self::Error> {
        // todo: decode with the charset of the content type instead of assuming utf8
        match std::str::from_utf8(ctx.body()) {
            Ok(s) => Ok(s.to_owned()),
            Err(e) => Err(ExtractError::invalid_body(format!("request body is not utf8: {e}"))),
        }
    }
}

/// Rejects a request whose `Content-Type` is present but differs from `expected`.
///
/// A missing header is accepted, clients such as curl often omit it.
fn check_content_type(ctx: &RequestContext, expected: &'static str) -> Result<(), ExtractError> {
    let Some(value) = ctx.headers().get(CONTENT_TYPE) else {
        return Ok(());
    };

    let matches = value
        .to_str()
        .ok()
        .and_then(|s| s.parse::<Mime>().ok())
        .is_some_and(|mime| mime.essence_str().eq_ignore_ascii_case(expected));

    if matches { Ok(()) } else { Err(ExtractError::unsupported_content_type(expected)) }
}

impl<T> FromRequest for Json<T>
where
    T: DeserializeOwned + Send,
{
    type Error = ExtractError;

    fn from_request(ctx: &RequestContext) -> Result<Self, Self::Error> {
        check_content_type(ctx, "application/json")?;
        serde_json::from_slice::<T>(ctx.body()).map(Json).map_err(ExtractError::invalid_body)
    }
}

impl<T> FromRequest for Form<T>
where
    T: DeserializeOwned + Send,
{
    type Error = ExtractError;

    fn from_request(ctx: &RequestContext) -> Result<Self, Self::Error> {
        check_content_type(ctx, "application/x-www-form-urlencoded")?;
        serde_urlencoded::from_bytes::<T>(ctx.body()).map(Form).map_err(ExtractError::invalid_body)
    }
}
