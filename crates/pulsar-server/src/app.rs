//! The application interface.
//!
//! An [`Application`] receives one [`AppRequest`] per HTTP request and
//! returns an [`AppResponse`]. Calls run on the blocking pool, so an
//! application may block freely.

use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use http::HeaderMap;

/// A request as seen by the application.
#[derive(Debug, Clone)]
pub struct AppRequest {
    /// Request method, e.g. `GET`.
    pub method: String,
    /// Request path, e.g. `/test`.
    pub path_info: String,
    /// Raw query string without the leading `?`. Empty when absent.
    pub query_string: String,
    /// Request headers.
    pub headers: HeaderMap,
    /// Request body.
    pub body: Bytes,
    /// Peer address. `None` for unix socket connections.
    pub remote_addr: Option<SocketAddr>,
    /// Port of the listener that accepted the request. `None` for unix sockets.
    pub server_port: Option<u16>,
}

impl AppRequest {
    /// Returns a header value as a string, if present and valid UTF-8.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

/// A response produced by the application.
///
/// # Example
///
/// ```
/// use pulsar_server::AppResponse;
///
/// let response = AppResponse::text(200, "hello")
///     .with_header("X-Served-By", "pulsar");
///
/// assert_eq!(response.status, 200);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response headers, in order.
    pub headers: Vec<(String, String)>,
    /// Response body.
    pub body: Bytes,
}

impl AppResponse {
    /// An empty response with the given status.
    pub fn new(status: u16) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: Bytes::new(),
        }
    }

    /// A `text/plain` response.
    pub fn text(status: u16, body: impl Into<String>) -> Self {
        Self::new(status)
            .with_header("Content-Type", "text/plain; charset=utf-8")
            .with_body(body.into())
    }

    /// A `200 OK` response with the given body.
    pub fn ok(body: impl Into<Bytes>) -> Self {
        Self::new(200).with_body(body)
    }

    /// Adds a header.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Replaces the body.
    #[must_use]
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }
}

/// A request handler.
///
/// Implemented for every `Fn(AppRequest) -> AppResponse` closure.
///
/// # Example
///
/// ```
/// use pulsar_server::{AppRequest, AppResponse, Application};
///
/// let app = |req: AppRequest| AppResponse::text(200, req.path_info);
/// fn assert_app<A: Application>(_: &A) {}
/// assert_app(&app);
/// ```
pub trait Application: Send + Sync + 'static {
    /// Handles one request.
    fn call(&self, request: AppRequest) -> AppResponse;
}

impl<F> Application for F
where
    F: Fn(AppRequest) -> AppResponse + Send + Sync + 'static,
{
    fn call(&self, request: AppRequest) -> AppResponse {
        self(request)
    }
}

/// A type-erased, cloneable [`Application`].
#[derive(Clone)]
pub struct SharedApp(Arc<dyn Application>);

impl SharedApp {
    /// Erases the type of `app`.
    pub fn new(app: impl Application) -> Self {
        Self(Arc::new(app))
    }
}

impl From<Arc<dyn Application>> for SharedApp {
    fn from(app: Arc<dyn Application>) -> Self {
        Self(app)
    }
}

impl Application for SharedApp {
    fn call(&self, request: AppRequest) -> AppResponse {
        self.0.call(request)
    }
}

impl fmt::Debug for SharedApp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SharedApp").finish_non_exhaustive()
    }
}
