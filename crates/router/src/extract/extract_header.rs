use crate::extract::from_request::FromRequest;
use crate::RequestContext;
use http::{HeaderMap, Method, Uri, Version};
use std::convert::Infallible;

impl FromRequest for Method {
    type Error = Infallible;

    fn from_request(ctx: &RequestContext) -> Result<Self, Self::Error> {
        Ok(ctx.method().clone())
    }
}

impl FromRequest for Uri {
    type Error = Infallible;

    fn from_request(ctx: &RequestContext) -> Result<Self, Self::Error> {
        Ok(ctx.uri().clone())
    }
}

impl FromRequest for Version {
    type Error = Infallible;

    fn from_request(ctx: &RequestContext) -> Result<Self, Self::Error> {
        Ok(ctx.version())
    }
}

impl FromRequest for HeaderMap {
    type Error = Infallible;

    fn from_request(ctx: &RequestContext) -> Result<Self, Self::Error> {
        Ok(ctx.headers().clone())
    }
}
