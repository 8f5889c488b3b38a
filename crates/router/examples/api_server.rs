//! Grouped routes with per group middleware and cookie sessions.
//!
//! ```shell
//! curl -v -H 'Authorization: token' http://127.0.0.1:8080/api/users/42
//! curl -v -H 'Authorization: token' -X DELETE http://127.0.0.1:8080/api/admin/users/42
//! curl -v -c cookies -b cookies http://127.0.0.1:8080/visits
//! curl -v -X POST http://127.0.0.1:8080/visits    # 405 from no_method with Allow: GET, OPTIONS
//! ```

use http::header::AUTHORIZATION;
use http::StatusCode;
use micro_router::extract::{Json, Path};
use micro_router::middleware::{abort_with, middleware_fn, Cors, Flow, Logger};
use micro_router::router::{delete, get, Routes};
use micro_router::session::{MemorySessionStore, Session, SessionError, Sessions};
use micro_router::{handler_fn, ContextValues, RequestContext, Router, Server};
use serde_json::json;
use std::sync::Arc;

fn authenticate(ctx: &mut RequestContext) -> Flow {
    if ctx.headers().contains_key(AUTHORIZATION) {
        ctx.insert("user_id", "123".to_string());
        Flow::Proceed
    } else {
        abort_with(ctx, (StatusCode::UNAUTHORIZED, Json(json!({ "error": "missing authorization" }))))
    }
}

fn api_version(ctx: &mut RequestContext) -> Flow {
    ctx.insert("api_version", "v1");
    Flow::Proceed
}

async fn user(Path(id): Path<u64>, values: ContextValues) -> Json<serde_json::Value> {
    let caller = values.get::<String>("user_id").cloned();
    let version = values.get::<&'static str>("api_version").copied();
    Json(json!({ "id": id, "caller": caller, "version": version }))
}

async fn remove_user(Path(id): Path<u64>) -> String {
    format!("user {id} removed\n")
}

async fn visits(session: Session) -> Result<String, SessionError> {
    let visits = session.get::<u64>("visits").unwrap_or_default() + 1;
    session.set("visits", visits)?;
    Ok(format!("visit number {visits}\n"))
}

async fn no_route() -> (StatusCode, Json<serde_json::Value>) {
    (StatusCode::NOT_FOUND, Json(json!({ "code": "PAGE_NOT_FOUND", "message": "page not found" })))
}

async fn no_method() -> (StatusCode, Json<serde_json::Value>) {
    (StatusCode::METHOD_NOT_ALLOWED, Json(json!({ "code": "METHOD_NOT_ALLOWED", "message": "method not allowed" })))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut builder = Router::builder();
    builder
        .wrap(Logger)
        .wrap(Cors::default())
        .wrap(Sessions::new(Arc::new(MemorySessionStore::new())))
        .not_found(handler_fn(no_route))
        .method_not_allowed(handler_fn(no_method));

    builder.route("/visits", get(handler_fn(visits)))?;

    let mut api = builder.group("/api").wrap(middleware_fn(authenticate)).wrap(middleware_fn(api_version));
    api.route("/users/:id", get(handler_fn(user)))?;

    let mut admin = api.group("/admin");
    admin.route("/users/:id", delete(handler_fn(remove_user)))?;

    Server::builder().router(builder.build()).address("127.0.0.1:8080").build()?.start().await?;
    Ok(())
}
