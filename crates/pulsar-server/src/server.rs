//! Listeners and the HTTP/1.1 serving loop.
//!
//! # Architecture
//!
//! - one listener per [`Bind`], all bound before anything is served
//! - one accept loop task per listener
//! - one task per connection, served by hyper
//! - application calls on the blocking pool
//!
//! Every loop and connection watches the same [`ShutdownSignal`]. The
//! listeners are dropped when their accept loop ends, so once [`serve`]
//! returns no socket is held.

use std::convert::Infallible;
use std::fmt;
use std::io;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::Bytes;
use http::{HeaderName, HeaderValue, Request, Response, StatusCode};
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use pulsar_config::Bind;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::{TcpListener, TcpStream};

use crate::app::{AppRequest, AppResponse, Application};
use crate::events::Events;
use crate::shutdown::{ConnectionTracker, ShutdownSignal};
use crate::ServerError;

/// Type alias for HTTP response body.
pub type ResponseBody = Full<Bytes>;

/// Type alias for the HTTP response.
pub type HttpResponse = Response<ResponseBody>;

/// How long open connections get to finish once shutdown starts.
pub const DRAIN_TIMEOUT: Duration = Duration::from_millis(250);

/// An address a listener is actually bound to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum BoundAddr {
    /// A TCP socket address, with any ephemeral port resolved.
    Tcp(SocketAddr),
    /// A unix socket path.
    Unix(PathBuf),
}

impl BoundAddr {
    /// The bound port of a TCP listener.
    pub fn port(&self) -> Option<u16> {
        match self {
            Self::Tcp(addr) => Some(addr.port()),
            Self::Unix(_) => None,
        }
    }
}

impl fmt::Display for BoundAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tcp(addr) => write!(f, "tcp://{addr}"),
            Self::Unix(path) => write!(f, "unix://{}", path.display()),
        }
    }
}

/// A bound listener.
#[derive(Debug)]
pub enum Listener {
    /// TCP listener.
    Tcp(TcpListener),
    /// Unix socket listener. The socket file is removed on drop.
    #[cfg(unix)]
    Unix(UnixSocket),
}

/// A unix listener that owns its socket file.
#[cfg(unix)]
#[derive(Debug)]
pub struct UnixSocket {
    listener: tokio::net::UnixListener,
    path: PathBuf,
}

#[cfg(unix)]
impl Drop for UnixSocket {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            tracing::debug!(path = %self.path.display(), error = %e, "failed to remove socket file");
        }
    }
}

enum Accepted {
    Tcp(TcpStream, SocketAddr),
    #[cfg(unix)]
    Unix(tokio::net::UnixStream),
}

impl Listener {
    /// Binds a single address.
    ///
    /// Must be called from within a tokio runtime.
    pub async fn bind(bind: &Bind) -> Result<(Self, BoundAddr), ServerError> {
        match bind {
            Bind::Tcp { host, port } => {
                let listener = TcpListener::bind((host.as_str(), *port))
                    .await
                    .map_err(|e| ServerError::bind(bind, e))?;
                let local = listener.local_addr().map_err(|e| ServerError::bind(bind, e))?;
                Ok((Self::Tcp(listener), BoundAddr::Tcp(local)))
            }
            #[cfg(unix)]
            Bind::Unix { path } => {
                let listener =
                    tokio::net::UnixListener::bind(path).map_err(|e| ServerError::bind(bind, e))?;
                let socket = UnixSocket {
                    listener,
                    path: path.clone(),
                };
                Ok((Self::Unix(socket), BoundAddr::Unix(path.clone())))
            }
            #[cfg(not(unix))]
            Bind::Unix { .. } => Err(ServerError::Unsupported(format!(
                "{bind}: unix sockets are not available on this platform"
            ))),
        }
    }

    async fn accept(&self) -> io::Result<Accepted> {
        match self {
            Self::Tcp(listener) => {
                let (stream, peer) = listener.accept().await?;
                Ok(Accepted::Tcp(stream, peer))
            }
            #[cfg(unix)]
            Self::Unix(socket) => {
                let (stream, _) = socket.listener.accept().await?;
                Ok(Accepted::Unix(stream))
            }
        }
    }
}

/// Binds every address in order.
///
/// On failure the listeners bound so far are dropped before returning.
pub async fn bind_all(binds: &[Bind]) -> Result<Vec<(Listener, BoundAddr)>, ServerError> {
    let mut listeners = Vec::with_capacity(binds.len());
    for bind in binds {
        let bound = Listener::bind(bind).await?;
        tracing::debug!(bind = %bind, addr = %bound.1, "bound listener");
        listeners.push(bound);
    }
    Ok(listeners)
}

/// Serves `listeners` until `shutdown` is triggered.
///
/// Returns once every accept loop has ended and open connections have
/// drained or [`DRAIN_TIMEOUT`] has passed.
pub async fn serve(
    listeners: Vec<(Listener, BoundAddr)>,
    app: Arc<dyn Application>,
    events: Events,
    shutdown: ShutdownSignal,
) {
    let tracker = ConnectionTracker::new();

    let loops: Vec<_> = listeners
        .into_iter()
        .map(|(listener, local)| {
            let service = Arc::new(AppService {
                app: Arc::clone(&app),
                events,
                server_port: local.port(),
            });
            tokio::spawn(accept_loop(
                listener,
                service,
                shutdown.clone(),
                tracker.clone(),
            ))
        })
        .collect();

    for handle in loops {
        if let Err(e) = handle.await {
            tracing::error!(error = %e, "accept loop failed");
        }
    }

    events.stopping(tracker.active_connections());
    tokio::select! {
        () = tracker.wait_for_idle() => {}
        () = tokio::time::sleep(DRAIN_TIMEOUT) => {
            tracing::warn!(
                open_connections = tracker.active_connections(),
                "drain timeout reached, closing connections"
            );
        }
    }
}

async fn accept_loop(
    listener: Listener,
    service: Arc<AppService>,
    shutdown: ShutdownSignal,
    tracker: ConnectionTracker,
) {
    loop {
        tokio::select! {
            accepted = listener.accept() => {
                let accepted = match accepted {
                    Ok(accepted) => accepted,
                    Err(e) => {
                        tracing::error!(error = %e, "failed to accept connection");
                        continue;
                    }
                };

                let service = Arc::clone(&service);
                let shutdown = shutdown.clone();
                let token = tracker.acquire();

                tokio::spawn(async move {
                    let result = match accepted {
                        Accepted::Tcp(stream, peer) => {
                            serve_connection(stream, Some(peer), service, shutdown).await
                        }
                        #[cfg(unix)]
                        Accepted::Unix(stream) => {
                            serve_connection(stream, None, service, shutdown).await
                        }
                    };
                    if let Err(e) = result {
                        tracing::debug!(error = %e, "connection error");
                    }
                    drop(token);
                });
            }
            () = shutdown.recv() => break,
        }
    }
}

async fn serve_connection<I>(
    io: I,
    peer: Option<SocketAddr>,
    service: Arc<AppService>,
    shutdown: ShutdownSignal,
) -> Result<(), hyper::Error>
where
    I: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let io = TokioIo::new(io);
    let handler = service_fn(move |req: Request<Incoming>| {
        let service = Arc::clone(&service);
        async move { service.handle(req, peer).await }
    });

    let conn = http1::Builder::new().serve_connection(io, handler);

    tokio::select! {
        result = conn => result,
        () = shutdown.recv() => {
            tracing::debug!(peer = ?peer, "connection closed by shutdown");
            Ok(())
        }
    }
}

struct AppService {
    app: Arc<dyn Application>,
    events: Events,
    server_port: Option<u16>,
}

impl AppService {
    async fn handle(
        &self,
        req: Request<Incoming>,
        remote_addr: Option<SocketAddr>,
    ) -> Result<HttpResponse, Infallible> {
        let started = Instant::now();
        let (parts, body) = req.into_parts();
        let method = parts.method.to_string();
        let path = parts.uri.path().to_string();

        let body = match body.collect().await {
            Ok(collected) => collected.to_bytes(),
            Err(e) => {
                tracing::debug!(error = %e, "failed to read request body");
                return Ok(plain(StatusCode::BAD_REQUEST, "Bad Request"));
            }
        };

        let request = AppRequest {
            method: method.clone(),
            path_info: path.clone(),
            query_string: parts.uri.query().unwrap_or_default().to_string(),
            headers: parts.headers,
            body,
            remote_addr,
            server_port: self.server_port,
        };

        let app = Arc::clone(&self.app);
        let response = match tokio::task::spawn_blocking(move || app.call(request)).await {
            Ok(response) => into_http(response),
            Err(e) => {
                self.events.app_error(&method, &path, &e.to_string());
                plain(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error")
            }
        };

        self.events
            .request(&method, &path, response.status().as_u16(), started.elapsed());
        Ok(response)
    }
}

fn into_http(response: AppResponse) -> HttpResponse {
    let status = match StatusCode::from_u16(response.status) {
        Ok(status) => status,
        Err(_) => {
            tracing::error!(status = response.status, "application returned an invalid status");
            return plain(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error");
        }
    };

    let mut http = Response::new(Full::new(response.body));
    *http.status_mut() = status;

    for (name, value) in response.headers {
        match (
            HeaderName::try_from(name.as_str()),
            HeaderValue::try_from(value.as_str()),
        ) {
            (Ok(name), Ok(value)) => {
                http.headers_mut().append(name, value);
            }
            _ => tracing::warn!(header = %name, "dropping invalid response header"),
        }
    }

    http
}

fn plain(status: StatusCode, body: &'static str) -> HttpResponse {
    let mut response = Response::new(Full::new(Bytes::from_static(body.as_bytes())));
    *response.status_mut() = status;
    response.headers_mut().insert(
        http::header::CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    response
}
