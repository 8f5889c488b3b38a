//! A small bookstore api.
//!
//! ```shell
//! curl -v http://127.0.0.1:8080/books/978-3-16
//! curl -v -u admin:secret http://127.0.0.1:8080/protected/
//! curl -v -X OPTIONS -H 'Access-Control-Request-Method: GET' http://127.0.0.1:8080/books/978-3-16
//! curl -v http://127.0.0.1:8080/panic
//! ```

use http::StatusCode;
use micro_router::extract::{Json, Path};
use micro_router::middleware::{BasicAuth, CorsPreflight, Logger};
use micro_router::router::{get, Routes};
use micro_router::{handler_fn, Fault, RequestContext, Router, Server};
use serde::Serialize;

#[derive(Serialize)]
struct Book {
    isdn: String,
    title: String,
}

async fn index() -> &'static str {
    "Welcome!\n"
}

async fn hello(Path(name): Path<String>) -> String {
    format!("hello, {name}!\n")
}

async fn book(Path(isdn): Path<String>) -> Json<Book> {
    Json(Book { title: format!("book {isdn}"), isdn })
}

async fn file(Path(filepath): Path<String>) -> String {
    format!("serving file '{filepath}'\n")
}

async fn protected() -> &'static str {
    "Protected!\n"
}

fn failing_lookup() {
    panic!("book storage is corrupted")
}

async fn crash() -> &'static str {
    failing_lookup();
    "unreachable"
}

async fn not_found() -> (StatusCode, &'static str) {
    (StatusCode::NOT_FOUND, "nothing to see here\n")
}

fn recover(ctx: &RequestContext, fault: &Fault) -> (StatusCode, String) {
    (StatusCode::INTERNAL_SERVER_ERROR, format!("{} failed: {fault}\n", ctx.path()))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut builder = Router::builder();
    builder.wrap(Logger);
    builder
        .route("/", get(handler_fn(index)))?
        .route("/hello/:name", get(handler_fn(hello)))?
        .route("/books/:isdn", get(handler_fn(book)))?
        .route("/files/*filepath", get(handler_fn(file)))?
        .route("/protected/", get(handler_fn(protected)).wrap(BasicAuth::new("admin", "secret")))?
        .route("/panic", get(handler_fn(crash)))?;
    builder.not_found(handler_fn(not_found)).global_options(CorsPreflight::default()).recovery(recover);

    Server::builder().router(builder.build()).address("127.0.0.1:8080").build()?.start().await?;
    Ok(())
}
