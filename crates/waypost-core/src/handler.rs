//! Middleware handlers.
//!
//! A handler is registered as one of three kinds, chosen explicitly by the
//! constructor used:
//!
//! | constructor    | signature                               | continues?                      |
//! |----------------|-----------------------------------------|---------------------------------|
//! | [`basic`]      | `(Input, O)`                            | never; the run ends with it     |
//! | [`with_next`]  | `(Input, O, Next<O>)`                   | explicitly, or on completion    |
//! | [`on_error`]   | `(BoxError, Input, O, Next<O>)`         | only invoked for a pending error|
//!
//! Every handler is an `async` function (or closure returning a future)
//! resolving to [`HandlerResult`].
//!
//! ```rust,ignore
//! use waypost_core::{basic, on_error, with_next};
//!
//! dispatcher
//!     .use_middleware(with_next(|input: Input, out: Out, next: Next<Out>| async move {
//!         let started = Instant::now();
//!         let result = next.run().await;
//!         out.record_latency(started.elapsed());
//!         result
//!     }))
//!     .use_middleware(basic(|input: Input, out: Out| async move {
//!         out.set_body("hello");
//!         Ok(())
//!     }));
//! ```

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;

use crate::chain::Next;
use crate::error::{BoxError, HandlerResult};
use crate::input::Input;

// ============================================================================
// Handler traits
// ============================================================================

/// A handler receiving the input and output only.
pub trait BasicHandler<O>: Send + Sync + 'static {
    /// Invokes the handler.
    fn call(&self, input: Input, output: O) -> BoxFuture<'static, HandlerResult>;
}

/// A handler that may pass control on through [`Next`].
pub trait NextHandler<O>: Send + Sync + 'static {
    /// Invokes the handler.
    fn call(&self, input: Input, output: O, next: Next<O>) -> BoxFuture<'static, HandlerResult>;
}

/// A handler consuming a pending error.
pub trait ErrorHandler<O>: Send + Sync + 'static {
    /// Invokes the handler with the pending error.
    fn call(
        &self,
        error: BoxError,
        input: Input,
        output: O,
        next: Next<O>,
    ) -> BoxFuture<'static, HandlerResult>;
}

impl<O, F, Fut> BasicHandler<O> for F
where
    F: Fn(Input, O) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    fn call(&self, input: Input, output: O) -> BoxFuture<'static, HandlerResult> {
        Box::pin((self)(input, output))
    }
}

impl<O, F, Fut> NextHandler<O> for F
where
    F: Fn(Input, O, Next<O>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    fn call(&self, input: Input, output: O, next: Next<O>) -> BoxFuture<'static, HandlerResult> {
        Box::pin((self)(input, output, next))
    }
}

impl<O, F, Fut> ErrorHandler<O> for F
where
    F: Fn(BoxError, Input, O, Next<O>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    fn call(
        &self,
        error: BoxError,
        input: Input,
        output: O,
        next: Next<O>,
    ) -> BoxFuture<'static, HandlerResult> {
        Box::pin((self)(error, input, output, next))
    }
}

// ============================================================================
// Middleware
// ============================================================================

/// The kind of a registered handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandlerKind {
    /// `(input, output)`; always ends the run.
    Basic,
    /// `(input, output, next)`.
    Next,
    /// `(error, input, output, next)`.
    Error,
}

impl fmt::Display for HandlerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Basic => "basic",
            Self::Next => "next",
            Self::Error => "error",
        })
    }
}

/// A type-erased handler tagged with its calling convention.
pub enum Middleware<O> {
    /// See [`basic`].
    Basic(Arc<dyn BasicHandler<O>>),
    /// See [`with_next`].
    Next(Arc<dyn NextHandler<O>>),
    /// See [`on_error`].
    Error(Arc<dyn ErrorHandler<O>>),
}

impl<O> Middleware<O> {
    /// Returns the calling convention of this handler.
    pub fn kind(&self) -> HandlerKind {
        match self {
            Self::Basic(_) => HandlerKind::Basic,
            Self::Next(_) => HandlerKind::Next,
            Self::Error(_) => HandlerKind::Error,
        }
    }

    /// Returns whether this handler can consume a pending error.
    pub fn accepts_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }
}

impl<O> Clone for Middleware<O> {
    fn clone(&self) -> Self {
        match self {
            Self::Basic(h) => Self::Basic(Arc::clone(h)),
            Self::Next(h) => Self::Next(Arc::clone(h)),
            Self::Error(h) => Self::Error(Arc::clone(h)),
        }
    }
}

impl<O> fmt::Debug for Middleware<O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Middleware").field(&self.kind()).finish()
    }
}

/// Wraps a handler that never passes control on.
///
/// Once it completes the run resolves with the output; a failure fails the
/// run directly.
pub fn basic<O, F, Fut>(f: F) -> Middleware<O>
where
    F: Fn(Input, O) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    Middleware::Basic(Arc::new(f))
}

/// Wraps a handler that receives the continuation.
///
/// The handler may await `next` to run the rest of the chain and then
/// post-process. If it never invokes `next`, its completion continues the
/// chain, and a failure is handed to the next error handler.
pub fn with_next<O, F, Fut>(f: F) -> Middleware<O>
where
    F: Fn(Input, O, Next<O>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    Middleware::Next(Arc::new(f))
}

/// Wraps an error handler.
///
/// Error handlers are skipped unless an error is pending. Calling
/// `next.run()` clears the error and resumes the chain.
pub fn on_error<O, F, Fut>(f: F) -> Middleware<O>
where
    F: Fn(BoxError, Input, O, Next<O>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    Middleware::Error(Arc::new(f))
}
