//! Reusable condition bindings.
//!
//! [`Dispatcher::when`](crate::Dispatcher::when) captures a condition set
//! (and optionally a base path) without registering anything. The binding
//! can then register handlers at several paths:
//!
//! ```rust,ignore
//! let get = app.when(Conditions::new().equals("method", "GET"));
//! get.handle_at("/users", basic(list_users))?;
//! get.handle_at("/users/:id", basic(show_user))?;
//!
//! let admin = get.at("/admin");
//! admin.handle(basic(dashboard))?;            // exactly /admin
//! admin.handle_at("/stats", basic(stats))?;   // exactly /admin/stats
//! ```

use std::sync::Arc;

use crate::condition::Conditions;
use crate::dispatcher::Dispatcher;
use crate::error::ConfigurationResult;
use crate::handler::Middleware;
use crate::mount::join_paths;

/// Conditions (and a base path) bound to a dispatcher, awaiting handlers.
///
/// Every entry registered through a binding:
/// - requires all bound conditions
/// - matches its path exactly rather than as a prefix
/// - ends the run once it completes
pub struct ConditionBinding<O> {
    dispatcher: Dispatcher<O>,
    conditions: Arc<Conditions>,
    path: Option<String>,
}

impl<O> Clone for ConditionBinding<O> {
    fn clone(&self) -> Self {
        Self {
            dispatcher: self.dispatcher.clone(),
            conditions: Arc::clone(&self.conditions),
            path: self.path.clone(),
        }
    }
}

impl<O> ConditionBinding<O>
where
    O: Clone + Send + Sync + 'static,
{
    pub(crate) fn new(
        dispatcher: Dispatcher<O>,
        conditions: Arc<Conditions>,
        path: Option<String>,
    ) -> Self {
        Self {
            dispatcher,
            conditions,
            path,
        }
    }

    /// Returns the bound conditions.
    pub fn conditions(&self) -> &Conditions {
        &self.conditions
    }

    /// Returns the bound base path.
    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    /// Returns a binding whose base path is this one's joined with `segment`.
    ///
    /// Segments are joined with a single `/`; an empty segment leaves the
    /// path unchanged.
    pub fn at(&self, segment: &str) -> Self {
        Self {
            dispatcher: self.dispatcher.clone(),
            conditions: Arc::clone(&self.conditions),
            path: join_paths([self.path.as_deref(), Some(segment)]),
        }
    }

    /// Registers `middleware` at the bound path.
    pub fn handle(&self, middleware: impl Into<Middleware<O>>) -> ConfigurationResult<&Self> {
        self.handle_all([middleware.into()])
    }

    /// Registers `middleware` at the bound path joined with `segment`.
    pub fn handle_at(
        &self,
        segment: &str,
        middleware: impl Into<Middleware<O>>,
    ) -> ConfigurationResult<&Self> {
        let path = join_paths([self.path.as_deref(), Some(segment)]);
        self.dispatcher.register(
            Arc::clone(&self.conditions),
            path.as_deref(),
            true,
            true,
            vec![middleware.into()],
        )?;
        Ok(self)
    }

    /// Registers several middleware at the bound path, in order.
    pub fn handle_all<I>(&self, handlers: I) -> ConfigurationResult<&Self>
    where
        I: IntoIterator<Item = Middleware<O>>,
    {
        self.dispatcher.register(
            Arc::clone(&self.conditions),
            self.path.as_deref(),
            true,
            true,
            handlers.into_iter().collect(),
        )?;
        Ok(self)
    }
}

impl<O> std::fmt::Debug for ConditionBinding<O> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConditionBinding")
            .field("conditions", &self.conditions.len())
            .field("path", &self.path)
            .finish()
    }
}
