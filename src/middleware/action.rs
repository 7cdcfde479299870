//! The unit of work the dispatcher runs for a request.
//!
//! An action receives the per-request context, writes its response into it and
//! returns `Err` for anything the dispatcher should turn into an error response.
//! Wrappers such as `authorize` are actions themselves, so they nest freely.

use std::{future::Future, pin::Pin};

use crate::error::AppError;
use crate::middleware::context::RequestContext;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

pub trait Action: Send + Sync + 'static {
    fn call<'a>(&'a self, ctx: &'a mut RequestContext) -> BoxFuture<'a, Result<(), AppError>>;
}

/// Action backed by a closure.
pub struct FnAction<F>(F);

/// Wrap a closure as an action.
///
/// ```ignore
/// let ping = action(|ctx| Box::pin(async move {
///     ctx.response_mut().write(b"pong");
///     Ok(())
/// }));
/// ```
pub fn action<F>(f: F) -> FnAction<F>
where
    F: for<'a> Fn(&'a mut RequestContext) -> BoxFuture<'a, Result<(), AppError>>
        + Send
        + Sync
        + 'static,
{
    FnAction(f)
}

impl<F> Action for FnAction<F>
where
    F: for<'a> Fn(&'a mut RequestContext) -> BoxFuture<'a, Result<(), AppError>>
        + Send
        + Sync
        + 'static,
{
    fn call<'a>(&'a self, ctx: &'a mut RequestContext) -> BoxFuture<'a, Result<(), AppError>> {
        (self.0)(ctx)
    }
}

impl<A: Action + ?Sized> Action for std::sync::Arc<A> {
    fn call<'a>(&'a self, ctx: &'a mut RequestContext) -> BoxFuture<'a, Result<(), AppError>> {
        (**self).call(ctx)
    }
}
