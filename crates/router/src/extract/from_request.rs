use crate::responder::Responder;
use crate::{ContextValues, RequestContext};
use std::convert::Infallible;

/// Extracts a handler argument from the request.
///
/// Extraction is synchronous: by the time a handler runs the body has been buffered and the
/// path parameters captured, so every extractor only reads from the context.
pub trait FromRequest: Sized + Send {
    type Error: Responder + Send;

    fn from_request(ctx: &RequestContext) -> Result<Self, Self::Error>;
}

/// Turns an extraction failure into `None` instead of an error response.
impl<T> FromRequest for Option<T>
where
    T: FromRequest,
{
    type Error = Infallible;

    fn from_request(ctx: &RequestContext) -> Result<Self, Self::Error> {
        Ok(T::from_request(ctx).ok())
    }
}

/// Hands the extraction failure to the handler instead of answering it.
impl<T> FromRequest for Result<T, T::Error>
where
    T: FromRequest,
{
    type Error = Infallible;

    fn from_request(ctx: &RequestContext) -> Result<Self, Self::Error> {
        Ok(T::from_request(ctx))
    }
}

impl FromRequest for () {
    type Error = Infallible;

    fn from_request(_ctx: &RequestContext) -> Result<Self, Self::Error> {
        Ok(())
    }
}

/// A snapshot of the values middleware stored for this request.
///
/// The snapshot does not borrow the request, so it can be moved into a detached task.
impl FromRequest for ContextValues {
    type Error = Infallible;

    fn from_request(ctx: &RequestContext) -> Result<Self, Self::Error> {
        Ok(ctx.values().clone())
    }
}
