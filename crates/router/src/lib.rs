//! A trie based HTTP router with an ordered middleware chain.
//!
//! Routes are registered through [`Router::builder`] with `:name` segments that capture a
//! single path segment and a terminal `*name` segment that captures the rest of the path.
//! Middleware is layered global first, then per [`router::Group`], then per route, and every
//! request runs inside a panic boundary that hands failures to a recovery handler.
//!
//! # Example
//!
//! ```no_run
//! use micro_router::router::{get, Routes};
//! use micro_router::extract::Path;
//! use micro_router::middleware::Logger;
//! use micro_router::{handler_fn, Router, Server};
//!
//! async fn hello(Path(name): Path<String>) -> String {
//!     format!("hello, {name}!")
//! }
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let mut builder = Router::builder();
//! builder.wrap(Logger);
//! builder.route("/hello/:name", get(handler_fn(hello)))?;
//!
//! Server::builder().router(builder.build()).address("127.0.0.1:8080").build()?.start().await?;
//! # Ok(())
//! # }
//! ```

mod body;

mod fn_trait;
mod handler;
mod recovery;
mod request;
mod responder;
mod server;

pub mod extract;
pub mod middleware;
pub mod router;
pub mod session;

pub use body::BoxError;
pub use body::ResponseBody;
pub use fn_trait::FnTrait;
pub use handler::handler_fn;
pub use handler::FnHandler;
pub use handler::RequestHandler;
pub use recovery::Fault;
pub use recovery::RecoveryHandler;
pub use request::ContextValues;
pub use request::PathParams;
pub use request::RequestContext;
pub use responder::Responder;
pub use router::Router;
pub use server::Server;
pub use server::ServerBuildError;
pub use server::ServerBuilder;
pub use server::ServerError;
