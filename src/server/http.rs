//! HTTP server implementation
//!
//! Uses hyper http1 with TokioIo, one task per connection.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use hyper::header::{
    HeaderName, HeaderValue, ACCESS_CONTROL_ALLOW_CREDENTIALS, ACCESS_CONTROL_ALLOW_HEADERS,
    ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_ALLOW_ORIGIN, ACCESS_CONTROL_MAX_AGE, SET_COOKIE,
    VARY,
};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use hyper_util::server::graceful::GracefulShutdown;
use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};

use crate::boot::HealthProbe;
use crate::config::Args;
use crate::gateway::Gateway;
use crate::routes::{self, empty_body, BoxBody};
use crate::server::cookies;
use crate::session::{self, IdentityContext, RequestContext, SessionStore};
use crate::types::GatewayError;

/// How often expired sessions are swept
const SESSION_SWEEP_PERIOD: Duration = Duration::from_secs(60);

/// Shared application state
pub struct AppState {
    pub args: Args,
    pub gateway: Arc<Gateway>,
    pub sessions: Arc<SessionStore>,
    pub probe: HealthProbe,
}

impl AppState {
    pub fn new(args: Args, gateway: Arc<Gateway>, probe: HealthProbe) -> Self {
        let sessions = Arc::new(SessionStore::new(args.session_ttl()));
        Self {
            args,
            gateway,
            sessions,
            probe,
        }
    }
}

/// Serve on the configured address until `shutdown` resolves
pub async fn run<F>(state: Arc<AppState>, shutdown: F) -> Result<(), GatewayError>
where
    F: Future<Output = ()>,
{
    let listener = TcpListener::bind(state.args.listen).await?;
    info!("Gateway listening on {}", state.args.listen);

    if state.args.dev_mode {
        warn!("Development mode enabled - insecure session cookies allowed");
    }

    serve(listener, state, shutdown).await
}

/// Accept connections until `shutdown` resolves, then let in-flight
/// requests finish (bounded by `args.drain_timeout()`) before returning.
pub async fn serve<F>(
    listener: TcpListener,
    state: Arc<AppState>,
    shutdown: F,
) -> Result<(), GatewayError>
where
    F: Future<Output = ()>,
{
    let sweeper = session::spawn_cleanup_task(Arc::clone(&state.sessions), SESSION_SWEEP_PERIOD);
    let graceful = GracefulShutdown::new();

    tokio::pin!(shutdown);
    loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!("Shutdown requested, no longer accepting connections");
                break;
            }
            accepted = listener.accept() => match accepted {
                Ok((stream, addr)) => {
                    let io = TokioIo::new(stream);
                    let conn_state = Arc::clone(&state);
                    let service = service_fn(move |req| {
                        let state = Arc::clone(&conn_state);
                        async move { handle_request(state, addr, req).await }
                    });

                    let conn = graceful.watch(http1::Builder::new().serve_connection(io, service));
                    tokio::spawn(async move {
                        if let Err(err) = conn.await {
                            debug!("Error serving connection from {}: {:?}", addr, err);
                        }
                    });
                }
                Err(e) => {
                    error!("Error accepting connection: {:?}", e);
                }
            }
        }
    }

    sweeper.abort();

    let drain_timeout = state.args.drain_timeout();
    tokio::select! {
        _ = graceful.shutdown() => info!("All connections drained"),
        _ = tokio::time::sleep(drain_timeout) => {
            warn!("Connections still open after {:?}, abandoning them", drain_timeout);
        }
    }
    Ok(())
}

/// Route one request
pub async fn handle_request<B>(
    state: Arc<AppState>,
    addr: SocketAddr,
    req: Request<B>,
) -> Result<Response<BoxBody>, hyper::Error>
where
    B: hyper::body::Body,
    B::Error: std::error::Error + Send + Sync + 'static,
{
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    debug!("[{}] {} {}", addr, method, path);

    let response = match (method, path.as_str()) {
        (Method::GET, "/health") | (Method::GET, "/healthz") => {
            routes::health_check(&state.probe).await
        }

        (Method::OPTIONS, _) => {
            let mut response = Response::new(empty_body());
            *response.status_mut() = StatusCode::NO_CONTENT;
            response
                .headers_mut()
                .insert(ACCESS_CONTROL_MAX_AGE, HeaderValue::from_static("86400"));
            response
        }

        (Method::POST, "/query") => handle_query_request(&state, req).await,

        _ => routes::not_found_response(&path),
    };

    Ok(with_cors(response, &state.args.cors_origin))
}

/// Attach the caller's session, run the query, and hand back a cookie if
/// the session is new
async fn handle_query_request<B>(state: &AppState, req: Request<B>) -> Response<BoxBody>
where
    B: hyper::body::Body,
    B::Error: std::error::Error + Send + Sync + 'static,
{
    let cookie_name = &state.args.session_cookie_name;
    let presented = cookies::read_cookie(req.headers(), cookie_name);
    let (session_id, is_new) = state.sessions.resolve(presented.as_deref());

    let ctx = RequestContext::new(IdentityContext::new(
        Arc::clone(&state.sessions),
        session_id.clone(),
    ));

    // Cancels in-flight backend calls if the client goes away mid-request
    let guard = ctx.cancel.drop_guard();
    let mut response = routes::handle_query(&state.gateway, &ctx, req).await;
    guard.disarm();

    if is_new {
        let cookie = cookies::session_cookie(
            cookie_name,
            &session_id,
            state.sessions.ttl(),
            state.args.secure_cookie(),
        );
        match HeaderValue::from_str(&cookie) {
            Ok(value) => {
                response.headers_mut().append(SET_COOKIE, value);
            }
            Err(e) => warn!(error = %e, "Could not encode session cookie"),
        }
    }

    response
}

fn with_cors(mut response: Response<BoxBody>, origin: &str) -> Response<BoxBody> {
    let headers = response.headers_mut();

    match HeaderValue::from_str(origin) {
        Ok(value) => {
            headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, value);
            headers.insert(
                ACCESS_CONTROL_ALLOW_CREDENTIALS,
                HeaderValue::from_static("true"),
            );
        }
        Err(e) => warn!(error = %e, "Invalid CORS origin"),
    }

    let statics: [(HeaderName, &'static str); 3] = [
        (ACCESS_CONTROL_ALLOW_METHODS, "GET, POST, OPTIONS"),
        (ACCESS_CONTROL_ALLOW_HEADERS, "Content-Type"),
        (VARY, "Origin"),
    ];
    for (name, value) in statics {
        headers.insert(name, HeaderValue::from_static(value));
    }

    response
}
