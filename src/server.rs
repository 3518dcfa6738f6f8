// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! HTTPS transport for the admission webhook.
//!
//! This module owns everything between the socket and the decision engine:
//!
//! - **Routing** - `/inject`, `/health`, `/ready` and `/metrics`
//! - **Request validation** - method, content type and envelope checks that
//!   short-circuit with a [`TransportError`] before the engine is reached
//! - **TLS bring-up** - certificate/key loading with rustls, TLS 1.2 minimum
//! - **Timeouts** - header read bound on every HTTP/1.1 connection, a per-call
//!   bound on body reading and handling
//! - **Lifecycle** - `Stopped → Starting → Serving → Draining → Stopped`
//!
//! # Architecture
//!
//! Each accepted connection is served on its own Tokio task by `axum-server`.
//! Handlers share only an [`AppState`] holding the immutable engine and the
//! readiness flag. Shutdown goes through the server [`Handle`]: new connections
//! are refused immediately and in-flight calls get the configured drain window.

use crate::admission::AdmissionReview;
use crate::constants::{
    CONTENT_TYPE_JSON, DEFAULT_REQUEST_TIMEOUT_SECS, HEALTH_PATH, HTTP2_KEEP_ALIVE_INTERVAL_SECS,
    INJECT_PATH, MAX_REQUEST_BODY_BYTES, METRICS_PATH, READY_PATH,
};
use crate::engine::AdmissionEngine;
use crate::errors::ServerError;
use crate::http_errors::TransportError;
use crate::lifecycle::{Lifecycle, ServerState};
use crate::metrics::gather_metrics;
use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, DefaultBodyLimit, Request, State},
    http::{header, HeaderMap, Method, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{any, get},
    Json, Router,
};
use axum_server::{tls_rustls::RustlsConfig, Handle};
use chrono::{SecondsFormat, Utc};
use hyper_util::rt::TokioTimer;
use rustls::pki_types::{
    pem::{self, PemObject},
    CertificateDer, PrivateKeyDer,
};
use serde_json::json;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::{JoinError, JoinHandle};
use tracing::{debug, error, info, warn};

/// Extra time allowed past the drain bound for the serve task to unwind.
const DRAIN_SLACK: Duration = Duration::from_secs(1);

/// Listener and TLS settings for [`WebhookServer`].
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Socket address to bind
    pub listen_addr: SocketAddr,
    /// PEM certificate chain
    pub cert_file: PathBuf,
    /// PEM private key
    pub key_file: PathBuf,
    /// Window after bind during which a serve failure aborts startup
    pub startup_grace: Duration,
    /// Upper bound on waiting for in-flight requests at shutdown
    pub drain_timeout: Duration,
    /// Upper bound on reading a request body and producing the response
    pub request_timeout: Duration,
    /// Upper bound on receiving request headers, including on idle HTTP/1.1
    /// keep-alive connections
    pub header_read_timeout: Duration,
}

/// Shared state for webhook handlers
#[derive(Debug, Clone)]
pub struct AppState {
    engine: AdmissionEngine,
    ready: Arc<AtomicBool>,
    request_timeout: Duration,
}

impl AppState {
    /// Create handler state. The engine carries loaded configuration, so the
    /// state starts out ready.
    #[must_use]
    pub fn new(engine: AdmissionEngine) -> Self {
        Self {
            engine,
            ready: Arc::new(AtomicBool::new(true)),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }

    /// Override the per-request time limit.
    #[must_use]
    pub fn with_request_timeout(mut self, request_timeout: Duration) -> Self {
        self.request_timeout = request_timeout;
        self
    }

    /// Flip the readiness reported by `/ready`.
    pub fn set_ready(&self, ready: bool) {
        self.ready.store(ready, Ordering::SeqCst);
    }

    /// Whether `/ready` currently reports ready.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }
}

/// Create the webhook router with all endpoints
///
/// - `/inject` - admission mutation, POST only
/// - `/health` - liveness probe
/// - `/ready` - readiness probe
/// - `/metrics` - Prometheus text exposition
pub fn webhook_router(state: AppState) -> Router {
    Router::new()
        .route(INJECT_PATH, any(handle_inject))
        .route(HEALTH_PATH, get(handle_health))
        .route(READY_PATH, get(handle_ready))
        .route(METRICS_PATH, get(handle_metrics))
        .layer(DefaultBodyLimit::max(MAX_REQUEST_BODY_BYTES))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            enforce_request_timeout,
        ))
        .with_state(state)
}

/// Bound body reading and handling of every call.
async fn enforce_request_timeout(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, TransportError> {
    tokio::time::timeout(state.request_timeout, next.run(request))
        .await
        .map_err(|_| TransportError::RequestTimeout(state.request_timeout))
}

/// Handle one admission call.
async fn handle_inject(
    State(state): State<AppState>,
    method: Method,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Result<Response, TransportError> {
    debug!(method = %method, path = INJECT_PATH, "Processing admission request");

    if method != Method::POST {
        return Err(TransportError::MethodNotAllowed(method.to_string()));
    }

    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    if !is_json_content_type(content_type) {
        return Err(TransportError::UnsupportedContentType(
            content_type.to_string(),
        ));
    }

    let body = body.map_err(TransportError::UnreadableBody)?;
    let review: AdmissionReview =
        serde_json::from_slice(&body).map_err(TransportError::InvalidReview)?;
    let request = review.request.ok_or(TransportError::MissingRequest)?;
    if request.uid.is_empty() {
        return Err(TransportError::EmptyUid);
    }

    debug!(
        uid = %request.uid,
        kind = %request.kind.kind,
        resource = %request.resource.resource,
        operation = %request.operation,
        namespace = request.namespace.as_deref().unwrap_or_default(),
        name = request.name.as_deref().unwrap_or_default(),
        "Parsed admission review request"
    );

    let response = state.engine.decide(&request);
    let allowed = response.allowed;

    let body = serde_json::to_vec(&AdmissionReview::from_response(response))
        .map_err(TransportError::ResponseEncoding)?;

    info!(uid = %request.uid, allowed, "Admission request processed");

    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, CONTENT_TYPE_JSON)],
        body,
    )
        .into_response())
}

/// Liveness probe: healthy whenever the process is serving HTTP at all.
async fn handle_health() -> impl IntoResponse {
    Json(json!({ "status": "healthy", "time": now_rfc3339() }))
}

/// Readiness probe: ready once configuration is loaded and not draining.
async fn handle_ready(State(state): State<AppState>) -> impl IntoResponse {
    if state.is_ready() {
        (
            StatusCode::OK,
            Json(json!({ "status": "ready", "time": now_rfc3339() })),
        )
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "status": "not ready", "time": now_rfc3339() })),
        )
    }
}

async fn handle_metrics() -> Response {
    match gather_metrics() {
        Ok(text) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            text,
        )
            .into_response(),
        Err(e) => {
            error!(error = %e, "Failed to gather metrics");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// `application/json`, optionally with parameters such as `charset`.
fn is_json_content_type(value: &str) -> bool {
    value
        .split(';')
        .next()
        .is_some_and(|media| media.trim().eq_ignore_ascii_case(CONTENT_TYPE_JSON))
}

fn now_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Load and validate a PEM certificate chain and private key.
///
/// Only TLS 1.2 and 1.3 are offered.
///
/// # Errors
///
/// Returns a [`ServerError`] if either file cannot be read, the certificate
/// file holds no certificates, the key file holds no private key, or rustls
/// rejects the pair.
pub async fn load_tls_config(
    cert_file: &Path,
    key_file: &Path,
) -> Result<Arc<rustls::ServerConfig>, ServerError> {
    let cert_pem = read_pem(cert_file).await?;
    let key_pem = read_pem(key_file).await?;

    let certs = CertificateDer::pem_slice_iter(&cert_pem)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|source| ServerError::InvalidPem {
            path: cert_file.display().to_string(),
            source,
        })?;
    if certs.is_empty() {
        return Err(ServerError::EmptyCertificate(
            cert_file.display().to_string(),
        ));
    }

    let key = match PrivateKeyDer::from_pem_slice(&key_pem) {
        Ok(key) => key,
        Err(pem::Error::NoItemsFound) => {
            return Err(ServerError::MissingPrivateKey(
                key_file.display().to_string(),
            ))
        }
        Err(source) => {
            return Err(ServerError::InvalidPem {
                path: key_file.display().to_string(),
                source,
            })
        }
    };

    let provider = Arc::new(rustls::crypto::ring::default_provider());
    let mut config = rustls::ServerConfig::builder_with_provider(provider)
        .with_protocol_versions(&[&rustls::version::TLS12, &rustls::version::TLS13])?
        .with_no_client_auth()
        .with_single_cert(certs, key)?;
    config.alpn_protocols = vec![b"h2".to_vec(), b"http/1.1".to_vec()];

    info!(
        cert_file = %cert_file.display(),
        key_file = %key_file.display(),
        "TLS certificates validated successfully"
    );

    Ok(Arc::new(config))
}

async fn read_pem(path: &Path) -> Result<Vec<u8>, ServerError> {
    tokio::fs::read(path)
        .await
        .map_err(|source| ServerError::CertificateRead {
            path: path.display().to_string(),
            source,
        })
}

/// The HTTPS webhook server and its lifecycle.
pub struct WebhookServer {
    config: ServerConfig,
    state: AppState,
    lifecycle: Arc<Lifecycle>,
    handle: Handle,
    task: Option<JoinHandle<std::io::Result<()>>>,
    local_addr: Option<SocketAddr>,
}

impl WebhookServer {
    /// Create a stopped server.
    #[must_use]
    pub fn new(config: ServerConfig, engine: AdmissionEngine) -> Self {
        Self {
            state: AppState::new(engine).with_request_timeout(config.request_timeout),
            config,
            lifecycle: Arc::new(Lifecycle::new()),
            handle: Handle::new(),
            task: None,
            local_addr: None,
        }
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> ServerState {
        self.lifecycle.current()
    }

    /// Shared lifecycle, for observers.
    #[must_use]
    pub fn lifecycle(&self) -> Arc<Lifecycle> {
        Arc::clone(&self.lifecycle)
    }

    /// Handler state, shared with the router.
    #[must_use]
    pub fn app_state(&self) -> &AppState {
        &self.state
    }

    /// Bound address while serving.
    #[must_use]
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    /// Validate certificates, bind and start serving.
    ///
    /// Returns once the listener is bound and the startup grace window has
    /// passed without the serve task failing.
    ///
    /// # Errors
    ///
    /// Returns a [`ServerError`] if the server is not stopped, the certificates
    /// are invalid, the bind fails, or serving fails within the grace window.
    /// On error the server is back in `Stopped`.
    pub async fn start(&mut self) -> Result<SocketAddr, ServerError> {
        self.lifecycle
            .transition(ServerState::Stopped, ServerState::Starting)?;

        info!(
            listen_addr = %self.config.listen_addr,
            cert_file = %self.config.cert_file.display(),
            key_file = %self.config.key_file.display(),
            "Starting webhook server"
        );

        match self.bring_up().await {
            Ok(addr) => {
                self.lifecycle
                    .transition(ServerState::Starting, ServerState::Serving)?;
                info!(address = %addr, "Webhook server started successfully");
                Ok(addr)
            }
            Err(e) => {
                error!(error = %e, "Webhook server failed to start");
                self.lifecycle.stop();
                Err(e)
            }
        }
    }

    async fn bring_up(&mut self) -> Result<SocketAddr, ServerError> {
        let tls = load_tls_config(&self.config.cert_file, &self.config.key_file).await?;

        self.handle = Handle::new();
        let app = webhook_router(self.state.clone());
        let mut server =
            axum_server::bind_rustls(self.config.listen_addr, RustlsConfig::from_config(tls))
                .handle(self.handle.clone());
        server
            .http_builder()
            .http1()
            .timer(TokioTimer::new())
            .header_read_timeout(self.config.header_read_timeout)
            .keep_alive(true);
        server
            .http_builder()
            .http2()
            .timer(TokioTimer::new())
            .keep_alive_interval(Duration::from_secs(HTTP2_KEEP_ALIVE_INTERVAL_SECS));
        let mut task = tokio::spawn(async move { server.serve(app.into_make_service()).await });

        let listening = tokio::time::timeout(self.config.startup_grace, self.handle.listening());
        let addr = match listening.await {
            Ok(Some(addr)) => addr,
            Ok(None) => return Err(ServerError::Startup(describe_exit(task.await))),
            Err(_) => {
                task.abort();
                return Err(ServerError::BindTimeout(self.config.startup_grace));
            }
        };

        debug!(address = %addr, grace = ?self.config.startup_grace, "Listener bound, waiting out startup grace window");
        tokio::select! {
            result = &mut task => return Err(ServerError::Startup(describe_exit(result))),
            () = tokio::time::sleep(self.config.startup_grace) => {}
        }

        self.task = Some(task);
        self.local_addr = Some(addr);
        self.state.set_ready(true);
        Ok(addr)
    }

    /// Stop accepting connections and drain in-flight calls.
    ///
    /// Waits at most the configured drain timeout; calls still running after
    /// that are abandoned. The server always ends in `Stopped`.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::DrainTimeout`] if in-flight calls had to be
    /// abandoned, or [`ServerError::Serve`] if the serve task failed.
    pub async fn stop(&mut self) -> Result<(), ServerError> {
        if self.task.is_none() {
            debug!("Stop requested while not serving");
            self.lifecycle.stop();
            return Ok(());
        }

        self.lifecycle
            .transition(ServerState::Serving, ServerState::Draining)?;
        self.state.set_ready(false);
        let Some(mut task) = self.task.take() else {
            self.lifecycle.stop();
            return Ok(());
        };

        let drain_timeout = self.config.drain_timeout;
        info!(
            in_flight = self.handle.connection_count(),
            timeout = ?drain_timeout,
            "Stopping webhook server"
        );

        let started = Instant::now();
        self.handle.graceful_shutdown(Some(drain_timeout));
        let outcome = tokio::time::timeout(drain_timeout + DRAIN_SLACK, &mut task).await;

        self.local_addr = None;
        self.lifecycle.stop();

        let result = match outcome {
            Err(_) => {
                task.abort();
                Err(ServerError::DrainTimeout(drain_timeout))
            }
            Ok(_) if started.elapsed() >= drain_timeout => {
                Err(ServerError::DrainTimeout(drain_timeout))
            }
            Ok(Ok(Ok(()))) => Ok(()),
            Ok(exit) => Err(ServerError::Serve(describe_exit(exit))),
        };

        match &result {
            Ok(()) => info!("Webhook server stopped successfully"),
            Err(e) => warn!(error = %e, "Webhook server stopped with errors"),
        }
        result
    }
}

fn describe_exit(result: Result<std::io::Result<()>, JoinError>) -> String {
    match result {
        Ok(Ok(())) => "server exited unexpectedly".to_string(),
        Ok(Err(e)) => e.to_string(),
        Err(e) => format!("server task failed: {e}"),
    }
}

#[cfg(test)]
#[path = "server_tests.rs"]
mod server_tests;
