//! Extraction from the request target: the captured path parameters and the query string.

use crate::extract::{ExtractError, FromRequest, Path, Query};
use crate::{PathParams, RequestContext};
use serde::de::DeserializeOwned;
use std::convert::Infallible;

impl FromRequest for PathParams {
    type Error = Infallible;

    fn from_request(ctx: &RequestContext) -> Result<Self, Self::Error> {
        Ok(ctx.path_params().clone())
    }
}

impl<T> FromRequest for Path<T>
where
    T: DeserializeOwned + Send,
{
    type Error = ExtractError;

    fn from_request(ctx: &RequestContext) -> Result<Self, Self::Error> {
        ctx.path_params().deserialize::<T>().map(Path)
    }
}

/// Implements query string extraction for any type that implements Deserialize
///
/// This implementation allows automatic deserialization of query string parameters
/// into a strongly-typed struct using serde_qs.
impl<T> FromRequest for Query<T>
where
    T: DeserializeOwned + Send,
{
    type Error = ExtractError;

    fn from_request(ctx: &RequestContext) -> Result<Self, Self::Error> {
        let query = ctx.uri().query().unwrap_or_default();
        serde_qs::from_str::<T>(query).map(Query).map_err(ExtractError::invalid_query)
    }
}
