//! An HTTP/1 server that feeds every request to a [`Router`].

use crate::body::ResponseBody;
use crate::router::Router;
use http::{Request, Response, StatusCode};
use http_body_util::{BodyExt, LengthLimitError, Limited};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::{TokioIo, TokioTimer};
use std::convert::Infallible;
use std::fmt;
use std::io;
use std::net::{SocketAddr, ToSocketAddrs};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::net::TcpListener;
use tracing::{debug, error, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

/// Limits applied to every connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ConnectionLimits {
    max_body_size: usize,
    max_header_size: usize,
    header_read_timeout: Duration,
    read_timeout: Duration,
}

impl ConnectionLimits {
    const DEFAULT_MAX_BODY_SIZE: usize = 4 << 20;
    const DEFAULT_MAX_HEADER_SIZE: usize = 1 << 20;
    // hyper refuses read buffers below 8 KiB
    const MIN_HEADER_SIZE: usize = 8192;
}

impl Default for ConnectionLimits {
    fn default() -> Self {
        Self {
            max_body_size: Self::DEFAULT_MAX_BODY_SIZE,
            max_header_size: Self::DEFAULT_MAX_HEADER_SIZE,
            header_read_timeout: Duration::from_secs(30),
            read_timeout: Duration::from_secs(30),
        }
    }
}

pub struct ServerBuilder {
    router: Option<Router>,
    address: Option<io::Result<Vec<SocketAddr>>>,
    limits: ConnectionLimits,
}

impl ServerBuilder {
    fn new() -> Self {
        Self { router: None, address: None, limits: ConnectionLimits::default() }
    }

    #[must_use]
    pub fn address<A: ToSocketAddrs>(mut self, address: A) -> Self {
        self.address = Some(address.to_socket_addrs().map(Iterator::collect));
        self
    }

    #[must_use]
    pub fn router(mut self, router: Router) -> Self {
        self.router = Some(router);
        self
    }

    /// Request bodies larger than `bytes` are answered with `413 Payload Too Large`.
    /// Defaults to 4 MiB.
    #[must_use]
    pub fn max_body_size(mut self, bytes: usize) -> Self {
        self.limits.max_body_size = bytes;
        self
    }

    /// Upper bound of the request line plus headers, defaults to 1 MiB. Values below 8 KiB are
    /// raised to 8 KiB.
    #[must_use]
    pub fn max_header_size(mut self, bytes: usize) -> Self {
        self.limits.max_header_size = bytes.max(ConnectionLimits::MIN_HEADER_SIZE);
        self
    }

    /// Connections that do not deliver a complete request head in time are closed.
    /// Defaults to 30 seconds.
    #[must_use]
    pub fn header_read_timeout(mut self, timeout: Duration) -> Self {
        self.limits.header_read_timeout = timeout;
        self
    }

    /// Request bodies that are not fully read in time are answered with `408 Request Timeout`.
    /// Defaults to 30 seconds.
    #[must_use]
    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.limits.read_timeout = timeout;
        self
    }

    /// # Errors
    ///
    /// Fails when the router or the address is missing, or when the address did not resolve.
    pub fn build(self) -> Result<Server, ServerBuildError> {
        let router = self.router.ok_or(ServerBuildError::MissingRouter)?;
        let address = match self.address {
            None => return Err(ServerBuildError::MissingAddress),
            Some(Err(source)) => return Err(ServerBuildError::InvalidAddress { source }),
            Some(Ok(address)) if address.is_empty() => return Err(ServerBuildError::MissingAddress),
            Some(Ok(address)) => address,
        };
        Ok(Server { router: Arc::new(router), address, limits: self.limits })
    }
}

impl fmt::Debug for ServerBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerBuilder")
            .field("router", &self.router.is_some())
            .field("address", &self.address)
            .field("limits", &self.limits)
            .finish()
    }
}

#[derive(Error, Debug)]
pub enum ServerBuildError {
    #[error("router must be set")]
    MissingRouter,
    #[error("address must be set")]
    MissingAddress,
    #[error("address can not be resolved")]
    InvalidAddress {
        #[source]
        source: io::Error,
    },
}

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("failed to bind {address:?}")]
    Bind {
        address: Vec<SocketAddr>,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug)]
pub struct Server {
    router: Arc<Router>,
    address: Vec<SocketAddr>,
    limits: ConnectionLimits,
}

impl Server {
    pub fn builder() -> ServerBuilder {
        ServerBuilder::new()
    }

    /// Binds the address and serves connections until the task is dropped.
    ///
    /// A `fmt` subscriber logging at `INFO` is installed unless the application already set a
    /// global subscriber.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Bind`] when none of the addresses can be bound.
    pub async fn start(self) -> Result<(), ServerError> {
        let subscriber = FmtSubscriber::builder().with_max_level(Level::INFO).finish();
        if tracing::subscriber::set_global_default(subscriber).is_err() {
            debug!("global subscriber already set, keep it");
        }

        info!("start listening at {:?}", self.address);
        let listener = match TcpListener::bind(self.address.as_slice()).await {
            Ok(listener) => listener,
            Err(source) => {
                error!(cause = %source, "bind server error");
                return Err(ServerError::Bind { address: self.address, source });
            }
        };

        serve(listener, self.router, self.limits).await;
        Ok(())
    }
}

/// Accepts connections from `listener` forever, one task per connection.
pub(crate) async fn serve(listener: TcpListener, router: Arc<Router>, limits: ConnectionLimits) {
    loop {
        let (tcp_stream, remote_addr) = match listener.accept().await {
            Ok(stream_and_addr) => stream_and_addr,
            Err(e) => {
                warn!(cause = %e, "failed to accept");
                continue;
            }
        };

        let router = Arc::clone(&router);
        tokio::spawn(async move {
            let service = service_fn(move |request: Request<Incoming>| {
                let router = Arc::clone(&router);
                async move { Ok::<_, Infallible>(handle(&router, request, limits).await) }
            });

            let connection = http1::Builder::new()
                .timer(TokioTimer::new())
                .header_read_timeout(limits.header_read_timeout)
                .max_buf_size(limits.max_header_size)
                .serve_connection(TokioIo::new(tcp_stream), service);
            match connection.await {
                Ok(()) => debug!(%remote_addr, "finished process, connection shutdown"),
                Err(e) => warn!(%remote_addr, cause = %e, "service has error, connection shutdown"),
            }
        });
    }
}

/// Buffers the request body within the connection limits, then dispatches.
async fn handle(router: &Router, request: Request<Incoming>, limits: ConnectionLimits) -> Response<ResponseBody> {
    let (parts, body) = request.into_parts();
    let collected = tokio::time::timeout(limits.read_timeout, Limited::new(body, limits.max_body_size).collect()).await;

    match collected {
        Ok(Ok(collected)) => router.dispatch(Request::from_parts(parts, collected.to_bytes())).await,
        Ok(Err(e)) if e.is::<LengthLimitError>() => {
            warn!(path = parts.uri.path(), limit = limits.max_body_size, "request body too large");
            plain_response(StatusCode::PAYLOAD_TOO_LARGE, "413 payload too large")
        }
        Ok(Err(e)) => {
            warn!(cause = %e, path = parts.uri.path(), "failed to read request body");
            plain_response(StatusCode::BAD_REQUEST, "400 bad request")
        }
        Err(elapsed) => {
            warn!(cause = %elapsed, path = parts.uri.path(), "timed out reading request body");
            plain_response(StatusCode::REQUEST_TIMEOUT, "408 request timeout")
        }
    }
}

fn plain_response(status: StatusCode, body: &'static str) -> Response<ResponseBody> {
    let mut response = Response::new(ResponseBody::from(body));
    *response.status_mut() = status;
    response
}

#[cfg(test)]
mod tests {
    use super::{serve, ConnectionLimits, Server, ServerBuildError};
    use crate::extract::Path;
    use crate::handler_fn;
    use crate::router::{get, post, Router, Routes};
    use std::net::SocketAddr;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};

    async fn hello(Path(name): Path<String>) -> String {
        format!("hello, {name}!")
    }

    async fn echo(body: String) -> String {
        body
    }

    async fn start(limits: ConnectionLimits) -> SocketAddr {
        let mut builder = Router::builder();
        builder.route("/hello/:name", get(handler_fn(hello))).unwrap();
        builder.route("/echo", post(handler_fn(echo))).unwrap();

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();
        tokio::spawn(serve(listener, Arc::new(builder.build()), limits));
        address
    }

    async fn exchange(address: SocketAddr, request: &[u8]) -> String {
        let mut stream = TcpStream::connect(address).await.unwrap();
        stream.write_all(request).await.unwrap();
        let mut response = String::new();
        stream.read_to_string(&mut response).await.unwrap();
        response
    }

    #[test]
    fn test_build_requires_router_and_address() {
        let err = Server::builder().address("127.0.0.1:8080").build().unwrap_err();
        assert!(matches!(err, ServerBuildError::MissingRouter));

        let err = Server::builder().router(Router::builder().build()).build().unwrap_err();
        assert!(matches!(err, ServerBuildError::MissingAddress));

        let err = Server::builder().router(Router::builder().build()).address("not an address").build().unwrap_err();
        assert!(matches!(err, ServerBuildError::InvalidAddress { .. }));
    }

    #[test]
    fn test_builder_limits() {
        let server = Server::builder()
            .router(Router::builder().build())
            .address("127.0.0.1:8080")
            .max_body_size(1024)
            .max_header_size(100)
            .header_read_timeout(Duration::from_secs(5))
            .read_timeout(Duration::from_secs(10))
            .build()
            .unwrap();

        assert_eq!(server.limits.max_body_size, 1024);
        assert_eq!(server.limits.max_header_size, ConnectionLimits::MIN_HEADER_SIZE);
        assert_eq!(server.limits.header_read_timeout, Duration::from_secs(5));
        assert_eq!(server.limits.read_timeout, Duration::from_secs(10));
    }

    #[tokio::test]
    async fn test_serve_over_tcp() {
        let address = start(ConnectionLimits::default()).await;

        let response =
            exchange(address, b"GET /hello/john HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n").await;

        assert!(response.starts_with("HTTP/1.1 200 OK"));
        assert!(response.ends_with("hello, john!"));
    }

    #[tokio::test]
    async fn test_body_size_limit() {
        let address = start(ConnectionLimits { max_body_size: 8, ..ConnectionLimits::default() }).await;

        let response = exchange(
            address,
            b"POST /echo HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\nContent-Length: 4\r\n\r\nsmol",
        )
        .await;
        assert!(response.starts_with("HTTP/1.1 200 OK"));
        assert!(response.ends_with("smol"));

        let response = exchange(
            address,
            b"POST /echo HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\nContent-Length: 16\r\n\r\nway too large!!!",
        )
        .await;
        assert!(response.starts_with("HTTP/1.1 413 Payload Too Large"));
    }

    #[tokio::test]
    async fn test_header_read_timeout_closes_connection() {
        let address =
            start(ConnectionLimits { header_read_timeout: Duration::from_millis(100), ..ConnectionLimits::default() })
                .await;

        // the request head never completes
        let response = tokio::time::timeout(
            Duration::from_secs(5),
            exchange(address, b"GET /hello/john HTTP/1.1\r\nHost: localhost\r\n"),
        )
        .await
        .expect("connection should be closed by the server");

        assert!(!response.starts_with("HTTP/1.1 200"));
    }
}
