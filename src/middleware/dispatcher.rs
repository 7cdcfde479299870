//! Request dispatcher: adapts an [`Action`] into an axum handler.
//!
//! Responsibility:
//! - build one `RequestContext` per request (body read lazily, bounded by `body_limit`)
//! - panic barrier around the action
//! - map `AppError` into a response, keeping cookies the action already set
//! - one access-log line per request
//!
//! The barrier only receives the panic payload. The stack trace is logged by the panic
//! hook, which `Dispatcher::new` installs once per process (see [`install_panic_hook`]).

use std::{
    any::Any,
    backtrace::Backtrace,
    net::SocketAddr,
    panic::{self, AssertUnwindSafe},
    sync::{Arc, Once},
    time::Instant,
};

use axum::{
    extract::{ConnectInfo, Request},
    handler::Handler,
    http::{Method, StatusCode, header},
    response::{IntoResponse, Response},
};
use futures_util::FutureExt;
use tracing::{error, info};

use crate::error::{AppError, internal_error};
use crate::middleware::action::{Action, BoxFuture};
use crate::middleware::context::RequestContext;

/// Builds request handlers that share one body limit.
#[derive(Clone, Copy, Debug)]
pub struct Dispatcher {
    body_limit: usize,
}

impl Dispatcher {
    pub fn new(body_limit: usize) -> Self {
        install_panic_hook();
        Self { body_limit }
    }

    pub fn handle<A: Action>(&self, action: A) -> DispatchHandler {
        DispatchHandler {
            action: Arc::new(action),
            body_limit: self.body_limit,
        }
    }
}

/// An axum handler running one action per request.
#[derive(Clone)]
pub struct DispatchHandler {
    action: Arc<dyn Action>,
    body_limit: usize,
}

impl std::fmt::Debug for DispatchHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DispatchHandler")
            .field("body_limit", &self.body_limit)
            .finish_non_exhaustive()
    }
}

impl DispatchHandler {
    pub async fn serve(&self, request: Request) -> Response {
        let remote_addr = request
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| *addr);

        let mut log = AccessLog::start(
            request.method().clone(),
            request.uri().path().to_owned(),
            remote_addr,
        );

        let mut ctx = RequestContext::new(request, remote_addr, self.body_limit);

        let outcome = AssertUnwindSafe(self.action.call(&mut ctx))
            .catch_unwind()
            .await;

        let response = match outcome {
            Ok(Ok(())) => ctx.into_response(),
            Ok(Err(err)) => error_response(err, ctx),
            Err(payload) => {
                error!(
                    method = %log.method,
                    path = %log.path,
                    panic = %panic_message(payload.as_ref()),
                    "action panicked"
                );
                internal_error()
            }
        };

        log.status = Some(response.status());
        response
    }
}

/// Log every panic through `tracing` with a forced backtrace. Never aborts.
///
/// Replaces the process-wide hook on the first call; later calls do nothing.
pub fn install_panic_hook() {
    static INSTALL: Once = Once::new();

    INSTALL.call_once(|| {
        panic::set_hook(Box::new(|info| {
            let backtrace = Backtrace::force_capture();
            error!(panic = %info, %backtrace, "panic");
        }));
    });
}

impl<S> Handler<(), S> for DispatchHandler
where
    S: Send + Sync + 'static,
{
    type Future = BoxFuture<'static, Response>;

    fn call(self, request: Request, _state: S) -> Self::Future {
        Box::pin(async move { self.serve(request).await })
    }
}

fn error_response(err: AppError, ctx: RequestContext) -> Response {
    let mut response = err.into_response();

    let headers = response.headers_mut();
    for cookie in ctx.response().headers().get_all(header::SET_COOKIE) {
        headers.append(header::SET_COOKIE, cookie.clone());
    }

    response
}

/// Best-effort text of a panic payload.
fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "unknown panic payload"
    }
}

/// Emits the access-log line when dropped, so it is written on every exit path.
struct AccessLog {
    method: Method,
    path: String,
    remote_addr: Option<SocketAddr>,
    started: Instant,
    status: Option<StatusCode>,
}

impl AccessLog {
    fn start(method: Method, path: String, remote_addr: Option<SocketAddr>) -> Self {
        Self {
            method,
            path,
            remote_addr,
            started: Instant::now(),
            status: None,
        }
    }
}

impl Drop for AccessLog {
    fn drop(&mut self) {
        let status = self.status.unwrap_or(StatusCode::OK);
        let remote = self
            .remote_addr
            .map(|addr| addr.to_string())
            .unwrap_or_else(|| "-".to_string());

        info!(
            method = %self.method,
            path = %self.path,
            status = status.as_u16(),
            elapsed_ms = self.started.elapsed().as_millis() as u64,
            remote = %remote,
            "request"
        );
    }
}
