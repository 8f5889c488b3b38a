//! Typed extraction of handler arguments from the [`RequestContext`](crate::RequestContext).
//!
//! Every argument of a function passed to [`handler_fn`](crate::handler_fn) implements
//! [`FromRequest`]. Extraction happens after routing and before the function is called, so path
//! parameters are already captured and the body is fully buffered.

mod error;
mod extract_body;
mod extract_header;
mod extract_tuple;
mod extract_url;
mod from_request;

pub use error::ExtractError;
pub use from_request::FromRequest;

/// Represented as form data
///
/// when `post` as a `application/x-www-form-urlencoded`, we can using this struct to inject data,
/// note: the struct must impl [`serde::Deserialize`] and [`Send`]
///
/// # Example
/// ```
/// # use serde::Deserialize;
/// # use micro_router::extract::Form;
/// # #[allow(dead_code, reason = "doc example")]
/// #[derive(Deserialize, Debug)]
/// struct Login {
///     username: String,
///     password: String,
/// }
///
/// pub async fn handle(Form(login): Form<Login>) -> String {
///     format!("received login: {}", login.username)
/// }
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Form<T>(pub T);

/// Represented as json data
///
/// As an argument it decodes an `application/json` body, as a return value it encodes `T`
/// into a json response.
///
/// # Example
/// ```
/// # use serde::Deserialize;
/// # use micro_router::extract::Json;
/// # #[allow(dead_code, reason = "doc example")]
/// #[derive(Deserialize, Debug)]
/// struct Book {
///     title: String,
///     author: String,
/// }
///
/// pub async fn handle(Json(book): Json<Book>) -> String {
///     format!("received book: {}", book.title)
/// }
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Json<T>(pub T);

/// Represented as url query data
///
/// An absent query string is treated as an empty one, so a struct whose fields are all
/// optional still extracts.
///
/// # Example
/// ```
/// # use serde::Deserialize;
/// # use micro_router::extract::Query;
/// # #[allow(dead_code, reason = "doc example")]
/// #[derive(Deserialize, Debug)]
/// struct Params {
///     page: Option<u32>,
/// }
///
/// pub async fn handle(Query(params): Query<Params>) -> String {
///     format!("received params: {:?}", params)
/// }
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Query<T>(pub T);

/// Represented as the parameters captured from the request path
///
/// A struct binds parameters by name; a route with a single parameter may bind it as a bare
/// value.
///
/// # Example
/// ```
/// # use micro_router::extract::Path;
/// // registered as "/hello/:name"
/// pub async fn hello(Path(name): Path<String>) -> String {
///     format!("hello, {name}!")
/// }
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Path<T>(pub T);
