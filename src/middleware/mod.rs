/*
 * Responsibility
 * - public surface of the request pipeline
 * - action (unit of work), context (per-request state), dispatcher (handler adapter)
 * - auth (authorize wrapper), http (router-level layers)
 */
pub mod action;
pub mod auth;
pub mod context;
pub mod dispatcher;
pub mod http;

pub use action::{Action, BoxFuture, action};
pub use auth::access::authorize;
pub use context::RequestContext;
pub use dispatcher::Dispatcher;
