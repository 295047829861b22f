//! HTTP API for the parts catalog
//!
//! - `GET /health` - Health check
//! - `GET /api/parts/` - Name index of every part
//! - `GET /api/parts/{name}` - Basic record of one part
//! - `GET /api/extended-parts/{name}` - Extended record, fetched from the
//!   registry on first access
//!
//! Part responses carry an `ETag`; a matching `If-None-Match` gets
//! `304 Not Modified` with no body.
//!
//! ```bash
//! curl http://localhost:3000/api/parts/BBa_B0034
//! curl -H 'If-None-Match: "sha256-..."' http://localhost:3000/api/extended-parts/BBa_B0034
//! ```

use crate::catalog::Catalog;
use crate::conditional::{self, Conditional};
use crate::resolver::{ExtendedResolver, Resolution};
use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::header::{self, HeaderMap, HeaderValue};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};

const PARTS_PREFIX: &str = "/api/parts";
const EXTENDED_PARTS_PREFIX: &str = "/api/extended-parts";

/// Client-facing failure; details stay in the logs
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    BadRequest(String),
    NotFound,
    MethodNotAllowed,
    Unavailable(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            ApiError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    pub fn reason(&self) -> &str {
        match self {
            ApiError::BadRequest(reason) | ApiError::Unavailable(reason) => reason,
            ApiError::NotFound => "not found",
            ApiError::MethodNotAllowed => "method not allowed",
        }
    }

    fn into_response(self) -> Response<Full<Bytes>> {
        let body = format!("{}\n", self.reason());
        text_response(self.status(), "text/plain; charset=utf-8", Bytes::from(body))
    }
}

/// Routed reply plus the short string logged for it
pub struct Reply {
    pub response: Response<Full<Bytes>>,
    pub summary: String,
}

impl From<ApiError> for Reply {
    fn from(e: ApiError) -> Self {
        Self {
            summary: e.reason().to_string(),
            response: e.into_response(),
        }
    }
}

fn text_response(status: StatusCode, content_type: &'static str, body: Bytes) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(body));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
    response
}

/// Encode a stored JSON payload, honouring `If-None-Match`
fn conditional_reply(headers: &HeaderMap, payload: Bytes) -> Reply {
    let request_validator = headers
        .get(header::IF_NONE_MATCH)
        .and_then(|v| v.to_str().ok());

    let (mut response, validator, summary) = match conditional::respond(request_validator, payload) {
        Conditional::Fresh { body, validator } => (
            text_response(StatusCode::OK, "application/json", body),
            validator,
            "ok",
        ),
        Conditional::NotModified { validator } => (
            text_response(StatusCode::NOT_MODIFIED, "application/json", Bytes::new()),
            validator,
            "not modified",
        ),
    };

    if let Ok(value) = HeaderValue::from_str(&validator) {
        response.headers_mut().insert(header::ETAG, value);
    }

    Reply {
        response,
        summary: summary.to_string(),
    }
}

/// Name from the rest of a path, `None` if it spans several segments
/// before or after percent-decoding
fn path_name(rest: &str) -> Option<String> {
    if rest.contains('/') {
        return None;
    }
    let decoded = urlencoding::decode(rest).ok()?;
    if decoded.contains('/') {
        return None;
    }
    Some(decoded.into_owned())
}

/// Known endpoints
#[derive(Debug, PartialEq, Eq)]
enum Route {
    Health,
    AllParts,
    Part(String),
    ExtendedPart(String),
}

impl Route {
    fn parse(path: &str) -> Option<Self> {
        if path == "/health" {
            return Some(Route::Health);
        }
        if path == PARTS_PREFIX || path == "/api/parts/" {
            return Some(Route::AllParts);
        }
        if let Some(rest) = path.strip_prefix("/api/parts/") {
            return path_name(rest).map(Route::Part);
        }
        if path == EXTENDED_PARTS_PREFIX {
            return Some(Route::ExtendedPart(String::new()));
        }
        if let Some(rest) = path.strip_prefix("/api/extended-parts/") {
            return path_name(rest).map(Route::ExtendedPart);
        }
        None
    }
}

/// HTTP server state
pub struct HttpServer {
    catalog: Catalog,
    resolver: Arc<ExtendedResolver>,
    bind_addr: SocketAddr,
}

impl HttpServer {
    pub fn new(catalog: Catalog, resolver: Arc<ExtendedResolver>, bind_addr: SocketAddr) -> Self {
        Self {
            catalog,
            resolver,
            bind_addr,
        }
    }

    /// Run the HTTP server
    pub async fn run(self: Arc<Self>) -> Result<(), std::io::Error> {
        let listener = TcpListener::bind(self.bind_addr).await?;
        info!(addr = %self.bind_addr, "HTTP server listening");
        self.serve(listener).await
    }

    /// Accept connections from an already bound listener
    pub async fn serve(self: Arc<Self>, listener: TcpListener) -> Result<(), std::io::Error> {
        loop {
            let (stream, remote_addr) = listener.accept().await?;
            let io = TokioIo::new(stream);
            let server = self.clone();

            tokio::spawn(async move {
                let service = service_fn(move |req| {
                    let server = server.clone();
                    async move { server.handle_request(req, remote_addr).await }
                });

                if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                    warn!(addr = %remote_addr, error = %err, "Connection error");
                }
            });
        }
    }

    async fn handle_request(
        &self,
        req: Request<Incoming>,
        remote_addr: SocketAddr,
    ) -> Result<Response<Full<Bytes>>, hyper::Error> {
        let started = Instant::now();
        let uri = req.uri().to_string();

        let reply = self.route(req.method(), req.uri().path(), req.headers()).await;

        let status = reply.response.status();
        let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
        if status.is_server_error() {
            error!(status = status.as_u16(), remote = %remote_addr, uri = %uri, response = %reply.summary, elapsed_ms, "Request failed");
        } else {
            info!(status = status.as_u16(), remote = %remote_addr, uri = %uri, response = %reply.summary, elapsed_ms, "Request served");
        }

        Ok(reply.response)
    }

    /// Route a request to its handler
    pub async fn route(&self, method: &Method, path: &str, headers: &HeaderMap) -> Reply {
        debug!(method = %method, path = %path, "Incoming request");

        let Some(route) = Route::parse(path) else {
            return ApiError::NotFound.into();
        };
        if *method != Method::GET {
            return ApiError::MethodNotAllowed.into();
        }

        let result = match route {
            Route::Health => self.handle_health().await,
            Route::AllParts => self.handle_all_parts(headers).await,
            Route::Part(name) => self.handle_part(&name, headers).await,
            Route::ExtendedPart(name) => self.handle_extended_part(&name, headers).await,
        };

        match result {
            Ok(reply) => reply,
            Err(e) => e.into(),
        }
    }

    /// GET /health
    async fn handle_health(&self) -> Result<Reply, ApiError> {
        let generation = self.catalog.active_generation().await.map_err(|e| {
            error!(error = %e, "Health check could not read catalog");
            ApiError::Unavailable("store unavailable".into())
        })?;

        let body = serde_json::json!({
            "status": "ok",
            "generation": generation,
            "pending_writebacks": self.resolver.writeback().pending(),
        });

        Ok(Reply {
            response: text_response(StatusCode::OK, "application/json", Bytes::from(body.to_string())),
            summary: "ok".into(),
        })
    }

    /// GET /api/parts/
    async fn handle_all_parts(&self, headers: &HeaderMap) -> Result<Reply, ApiError> {
        match self.catalog.index().await {
            Ok(Some(index)) => Ok(conditional_reply(headers, index)),
            Ok(None) => Err(ApiError::Unavailable("index not built".into())),
            Err(e) => {
                error!(error = %e, "Reading parts index failed");
                Err(ApiError::Unavailable(
                    "cannot fulfill request for all parts".into(),
                ))
            }
        }
    }

    /// GET /api/parts/{name}
    async fn handle_part(&self, name: &str, headers: &HeaderMap) -> Result<Reply, ApiError> {
        if name.is_empty() {
            return Err(ApiError::BadRequest("missing biobrick name".into()));
        }

        match self.catalog.part(name).await {
            Ok(Some(data)) => Ok(conditional_reply(headers, data)),
            Ok(None) => Err(ApiError::NotFound),
            Err(e) => {
                error!(part = %name, error = %e, "Reading part failed");
                Err(ApiError::Unavailable(format!(
                    "cannot fulfill request for part named {}",
                    name
                )))
            }
        }
    }

    /// GET /api/extended-parts/{name}
    async fn handle_extended_part(&self, name: &str, headers: &HeaderMap) -> Result<Reply, ApiError> {
        if name.is_empty() {
            return Err(ApiError::BadRequest("missing biobrick name".into()));
        }

        match self.resolver.resolve(name).await {
            Resolution::Hit(data) | Resolution::Fetched(data) => Ok(conditional_reply(headers, data)),
            Resolution::NotFound => Err(ApiError::NotFound),
            Resolution::UpstreamUnavailable(reason) => Err(ApiError::Unavailable(reason)),
        }
    }
}
