//! The per-run execution chain and its continuation handle.
//!
//! A run owns the filtered entries, the caller's input and the output
//! handle. [`advance`] executes the entry at a position; every handler that
//! can pass control on receives a [`Next`] pointing at the position after
//! its own.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use futures::future::BoxFuture;
use tracing::{debug, trace};

use crate::error::{BoxError, HandlerResult};
use crate::handler::Middleware;
use crate::input::Input;
use crate::registry::Entry;

/// State shared by every step of one run.
pub(crate) struct Chain<O> {
    pub(crate) entries: Vec<Arc<Entry<O>>>,
    pub(crate) input: Input,
    pub(crate) output: O,
    pub(crate) path_property: Option<Arc<str>>,
}

/// The continuation handed to [`with_next`](crate::with_next) and
/// [`on_error`](crate::on_error) handlers.
///
/// `Next` is consumed when invoked, so a handler continues the chain at
/// most once. The returned future resolves when the rest of the chain has
/// finished, which allows wrapping it:
///
/// ```rust,ignore
/// with_next(|input: Input, out: Out, next: Next<Out>| async move {
///     out.push("before");
///     next.run().await?;
///     out.push("after");
///     Ok(())
/// })
/// ```
///
/// A handler that drops `Next` without invoking it lets the dispatcher
/// decide: the chain continues once the handler completes, unless the entry
/// stops on match.
pub struct Next<O> {
    chain: Arc<Chain<O>>,
    position: usize,
    invoked: Arc<AtomicBool>,
}

impl<O> Next<O>
where
    O: Clone + Send + Sync + 'static,
{
    fn new(chain: Arc<Chain<O>>, position: usize) -> Self {
        Self {
            chain,
            position,
            invoked: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Runs the rest of the chain.
    pub fn run(self) -> BoxFuture<'static, HandlerResult> {
        self.resume(None)
    }

    /// Aborts with `error`; only a later error handler can recover it.
    pub fn fail(self, error: impl Into<BoxError>) -> BoxFuture<'static, HandlerResult> {
        self.resume(Some(error.into()))
    }

    /// Continues the chain, optionally with a pending error.
    ///
    /// The continuation counts as used from this call on, even if the
    /// returned future is spawned elsewhere or never polled.
    pub fn resume(self, pending: Option<BoxError>) -> BoxFuture<'static, HandlerResult> {
        self.invoked.store(true, Ordering::Release);
        advance(self.chain, self.position, pending)
    }

    fn invoked_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.invoked)
    }
}

impl<O> std::fmt::Debug for Next<O> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Next")
            .field("position", &self.position)
            .field("remaining", &self.chain.entries.len().saturating_sub(self.position))
            .finish()
    }
}

/// Executes the entry at `position`, threading `pending` through the chain.
pub(crate) fn advance<O>(
    chain: Arc<Chain<O>>,
    position: usize,
    pending: Option<BoxError>,
) -> BoxFuture<'static, HandlerResult>
where
    O: Clone + Send + Sync + 'static,
{
    Box::pin(async move {
        let Some(entry) = chain.entries.get(position).map(Arc::clone) else {
            return match pending {
                Some(err) => {
                    debug!(error = %err, "Chain exhausted with an unhandled error");
                    Err(err)
                }
                None => Ok(()),
            };
        };

        let pending = match (entry.middleware.accepts_error(), pending) {
            (true, None) => {
                trace!(position, "No pending error, skipping error handler");
                return advance(chain, position + 1, None).await;
            }
            (false, Some(err)) => {
                debug!(
                    position,
                    kind = %entry.middleware.kind(),
                    error = %err,
                    "Pending error reached a handler that cannot consume it"
                );
                return Err(err);
            }
            (_, pending) => pending,
        };

        let input = entry.bind_input(&chain.input, chain.path_property.as_deref());
        let output = chain.output.clone();
        let next = Next::new(Arc::clone(&chain), position + 1);
        let invoked = next.invoked_flag();

        trace!(
            position,
            kind = %entry.middleware.kind(),
            stop_on_match = entry.stop_on_match,
            "Executing middleware"
        );

        let outcome = match (&entry.middleware, pending) {
            (Middleware::Basic(h), _) => h.call(input, output).await,
            (Middleware::Next(h), _) => h.call(input, output, next).await,
            (Middleware::Error(h), Some(err)) => h.call(err, input, output, next).await,
            // filtered out above
            (Middleware::Error(_), None) => Ok(()),
        };

        if entry.stop_on_match {
            trace!(position, ok = outcome.is_ok(), "Stop-on-match entry settled");
            return outcome;
        }
        if invoked.load(Ordering::Acquire) {
            return outcome;
        }

        match outcome {
            Ok(()) => advance(chain, position + 1, None).await,
            Err(err) => {
                trace!(position, error = %err, "Handler failed, passing error down the chain");
                advance(chain, position + 1, Some(err)).await
            }
        }
    })
}
