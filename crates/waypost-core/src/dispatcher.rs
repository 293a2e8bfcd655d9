//! The middleware dispatcher.
//!
//! A [`Dispatcher`] keeps an ordered stack of middleware. Running it over an
//! input:
//!
//! 1. selects, once, the entries whose conditions and mount path match the
//!    input, in registration order
//! 2. executes them one after another, each deciding whether the chain
//!    continues (see [`Next`](crate::Next))
//! 3. resolves with the output, or fails with the error no error handler
//!    consumed
//!
//! ```rust,ignore
//! use waypost_core::{Conditions, Dispatcher, Input, basic, with_next};
//!
//! let app = Dispatcher::<Out>::with_path_property("path")?;
//!
//! app.use_middleware(with_next(log_request));
//! app.use_at("/static", serve_static)?;
//!
//! let get = app.when(Conditions::new().equals("method", "GET"));
//! get.handle_at("/users/:id", basic(show_user))?;
//! get.handle_at("/users", basic(list_users))?;
//!
//! let out = app.run(Input::new().with("path", "/users/7").with("method", "GET"), Out::default()).await?;
//! ```
//!
//! # Nesting
//!
//! A dispatcher converts into a [`Middleware`], so it can be mounted inside
//! another one. The inner dispatcher sees the path with the outer mount
//! prefix already stripped.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::future::BoxFuture;
use tower::Service;
use tracing::{Instrument, debug, debug_span, trace};

use crate::binding::ConditionBinding;
use crate::chain::{Chain, advance};
use crate::condition::Conditions;
use crate::error::{BoxError, ConfigurationError, ConfigurationResult};
use crate::handler::{Middleware, basic};
use crate::input::Input;
use crate::mount::MountPath;
use crate::options::DispatcherOptions;
use crate::registry::{EntryTemplate, Registry};

struct DispatcherInner<O> {
    path_property: Option<Arc<str>>,
    registry: Registry<O>,
}

/// An ordered, conditional middleware stack.
///
/// # Cheap Cloning
///
/// Clones share the same registry, so handlers registered through any
/// clone are visible to all of them.
///
/// # Thread Safety
///
/// Runs only read the registry and may execute concurrently with each other
/// and with registrations; a run never sees entries appended after it
/// started.
pub struct Dispatcher<O> {
    inner: Arc<DispatcherInner<O>>,
}

impl<O> Clone for Dispatcher<O> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<O> Dispatcher<O>
where
    O: Clone + Send + Sync + 'static,
{
    /// Creates a dispatcher with path mounting disabled.
    pub fn new() -> Self {
        Self::from_parts(None)
    }

    /// Creates a dispatcher from validated options.
    pub fn with_options(options: DispatcherOptions) -> ConfigurationResult<Self> {
        options.validate()?;
        Ok(Self::from_parts(options.path_property.map(Arc::from)))
    }

    /// Creates a dispatcher that mounts middleware on the `name` input field.
    pub fn with_path_property(name: impl Into<String>) -> ConfigurationResult<Self> {
        Self::with_options(DispatcherOptions::new().path_property(name))
    }

    fn from_parts(path_property: Option<Arc<str>>) -> Self {
        Self {
            inner: Arc::new(DispatcherInner {
                path_property,
                registry: Registry::new(),
            }),
        }
    }

    /// Returns the input field used for path mounting, if enabled.
    pub fn path_property(&self) -> Option<&str> {
        self.inner.path_property.as_deref()
    }

    /// Returns the number of registered entries.
    pub fn len(&self) -> usize {
        self.inner.registry.len()
    }

    /// Returns whether nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // ------------------------------------------------------------------
    // Registration
    // ------------------------------------------------------------------

    /// Registers a middleware for every input.
    pub fn use_middleware(&self, middleware: impl Into<Middleware<O>>) -> &Self {
        let template = EntryTemplate {
            conditions: Arc::new(Conditions::new()),
            mount: None,
            stop_on_match: false,
        };
        self.inner
            .registry
            .extend(&template, vec![middleware.into()]);
        self
    }

    /// Registers a middleware mounted at the path prefix `path`.
    ///
    /// The middleware sees the path with the prefix stripped. Without a
    /// path property the path is ignored.
    pub fn use_at(
        &self,
        path: &str,
        middleware: impl Into<Middleware<O>>,
    ) -> ConfigurationResult<&Self> {
        self.use_all(Some(path), [middleware.into()])
    }

    /// Registers several middleware sharing one optional prefix mount.
    ///
    /// Each handler becomes its own entry, in the order given.
    pub fn use_all<I>(&self, path: Option<&str>, handlers: I) -> ConfigurationResult<&Self>
    where
        I: IntoIterator<Item = Middleware<O>>,
    {
        self.register(
            Arc::new(Conditions::new()),
            path,
            false,
            false,
            handlers.into_iter().collect(),
        )?;
        Ok(self)
    }

    /// Binds `conditions` for later registrations.
    ///
    /// Nothing is registered until one of the binding's `handle*` methods
    /// is called. Middleware registered through the binding match their
    /// path exactly and always end the run.
    pub fn when(&self, conditions: impl Into<Conditions>) -> ConditionBinding<O> {
        ConditionBinding::new(self.clone(), Arc::new(conditions.into()), None)
    }

    /// Binds `conditions` and a base path for later registrations.
    pub fn when_at(&self, conditions: impl Into<Conditions>, path: &str) -> ConditionBinding<O> {
        let path = (!path.is_empty()).then(|| path.to_string());
        ConditionBinding::new(self.clone(), Arc::new(conditions.into()), path)
    }

    pub(crate) fn register(
        &self,
        conditions: Arc<Conditions>,
        path: Option<&str>,
        match_to_end: bool,
        stop_on_match: bool,
        handlers: Vec<Middleware<O>>,
    ) -> ConfigurationResult<()> {
        if handlers.is_empty() {
            return Err(ConfigurationError::MissingHandler);
        }

        let path = path.filter(|p| !p.is_empty());
        let mount = match (path, &self.inner.path_property) {
            (Some(path), Some(_)) => Some(Arc::new(MountPath::compile(path, match_to_end)?)),
            (Some(path), None) => {
                trace!(path, "No path property configured, ignoring mount path");
                None
            }
            (None, _) => None,
        };

        debug!(
            handlers = handlers.len(),
            conditions = conditions.len(),
            mount = path,
            match_to_end,
            "Registering middleware"
        );

        let template = EntryTemplate {
            conditions,
            mount,
            stop_on_match,
        };
        self.inner.registry.extend(&template, handlers);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Dispatch
    // ------------------------------------------------------------------

    /// Runs the matching middleware over `input` and `output`.
    ///
    /// The set of matching entries is fixed when this is called. The
    /// returned future resolves with `output` once the chain settles, or
    /// fails with the error that reached the end of the chain unhandled.
    pub fn run(
        &self,
        input: Input,
        output: O,
    ) -> impl Future<Output = Result<O, BoxError>> + Send + use<O> {
        let path_property = self.inner.path_property.clone();
        let entries = self.inner.registry.matching(&input, path_property.as_deref());
        let path = path_property
            .as_deref()
            .and_then(|property| input.get_str(property))
            .map(str::to_owned);
        let span = debug_span!("dispatch", matched = entries.len(), path = path.as_deref());

        let chain = Arc::new(Chain {
            entries,
            input,
            output: output.clone(),
            path_property,
        });

        async move {
            advance(chain, 0, None).await?;
            trace!("Dispatch completed");
            Ok(output)
        }
        .instrument(span)
    }

    /// Wraps this dispatcher as a middleware for another dispatcher.
    pub fn into_middleware(self) -> Middleware<O> {
        Middleware::from(self)
    }
}

impl<O> Default for Dispatcher<O>
where
    O: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<O> fmt::Debug for Dispatcher<O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("path_property", &self.inner.path_property)
            .field("entries", &self.inner.registry.len())
            .finish()
    }
}

/// A nested dispatcher behaves like a basic handler: its run is awaited and
/// the enclosing run ends with it.
impl<O> From<Dispatcher<O>> for Middleware<O>
where
    O: Clone + Send + Sync + 'static,
{
    fn from(dispatcher: Dispatcher<O>) -> Self {
        basic(move |input: Input, output: O| {
            let run = dispatcher.run(input, output);
            async move { run.await.map(|_| ()) }
        })
    }
}

// ============================================================================
// Tower Service Implementation
// ============================================================================

/// Tower Service implementation for Dispatcher.
///
/// This allows applying Tower middleware (timeouts, concurrency limits,
/// ...) around a whole dispatcher.
///
/// ```rust,ignore
/// use tower::{ServiceBuilder, ServiceExt};
///
/// let svc = ServiceBuilder::new()
///     .concurrency_limit(64)
///     .service(dispatcher);
/// let out = svc.oneshot((input, output)).await?;
/// ```
impl<O> Service<(Input, O)> for Dispatcher<O>
where
    O: Clone + Send + Sync + 'static,
{
    type Response = O;
    type Error = BoxError;
    type Future = BoxFuture<'static, Result<O, BoxError>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, (input, output): (Input, O)) -> Self::Future {
        Box::pin(self.run(input, output))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::Next;
    use crate::handler::{on_error, with_next};
    use parking_lot::Mutex;
    use serde_json::{Value, json};
    use std::io;
    use tower::ServiceExt;

    type Trace = Arc<Mutex<Vec<String>>>;

    fn trace() -> Trace {
        Arc::new(Mutex::new(Vec::new()))
    }

    fn entries(out: &Trace) -> Vec<String> {
        out.lock().clone()
    }

    /// A basic handler recording `label`.
    fn record(label: &'static str) -> Middleware<Trace> {
        basic(move |_input: Input, out: Trace| async move {
            out.lock().push(label.to_string());
            Ok::<_, BoxError>(())
        })
    }

    /// A next-style handler recording `label` without touching `next`.
    fn pass(label: &'static str) -> Middleware<Trace> {
        with_next(move |_input: Input, out: Trace, _next: Next<Trace>| async move {
            out.lock().push(label.to_string());
            Ok::<_, BoxError>(())
        })
    }

    /// A next-style handler failing with `message`.
    fn failing(message: &'static str) -> Middleware<Trace> {
        with_next(move |_input: Input, _out: Trace, _next: Next<Trace>| async move {
            Err::<(), BoxError>(message.into())
        })
    }

    /// An error handler recording the error and clearing it.
    fn recover(label: &'static str) -> Middleware<Trace> {
        on_error(
            move |err: BoxError, _input: Input, out: Trace, next: Next<Trace>| async move {
                out.lock().push(format!("{label}: {err}"));
                next.run().await
            },
        )
    }

    fn at(path: &str) -> Input {
        Input::new().with("path", path)
    }

    fn routed() -> Dispatcher<Trace> {
        Dispatcher::with_path_property("path").unwrap()
    }

    #[tokio::test]
    async fn test_empty_dispatcher_resolves_immediately() {
        let dispatcher = Dispatcher::<Trace>::new();
        let out = trace();

        let mut run = tokio_test::task::spawn(dispatcher.run(Input::new(), Arc::clone(&out)));
        let result = tokio_test::assert_ready!(run.poll()).unwrap();

        assert!(Arc::ptr_eq(&result, &out));
        assert!(entries(&out).is_empty());
    }

    #[tokio::test]
    async fn test_next_handlers_run_in_registration_order() {
        let dispatcher = Dispatcher::new();
        dispatcher
            .use_middleware(pass("first"))
            .use_middleware(pass("second"))
            .use_middleware(pass("third"));

        let out = dispatcher.run(Input::new(), trace()).await.unwrap();
        assert_eq!(entries(&out), ["first", "second", "third"]);
    }

    #[tokio::test]
    async fn test_basic_handler_stops_the_run() {
        let dispatcher = Dispatcher::new();
        dispatcher
            .use_middleware(pass("before"))
            .use_middleware(record("basic"))
            .use_middleware(pass("after"));

        let out = dispatcher.run(Input::new(), trace()).await.unwrap();
        assert_eq!(entries(&out), ["before", "basic"]);
    }

    #[tokio::test]
    async fn test_explicit_next_wraps_the_rest_of_the_chain() {
        let dispatcher = Dispatcher::new();
        dispatcher
            .use_middleware(with_next(
                |_input: Input, out: Trace, next: Next<Trace>| async move {
                    out.lock().push("outer:enter".into());
                    next.run().await?;
                    out.lock().push("outer:leave".into());
                    Ok::<_, BoxError>(())
                },
            ))
            .use_middleware(with_next(
                |_input: Input, out: Trace, next: Next<Trace>| async move {
                    out.lock().push("inner:enter".into());
                    next.run().await?;
                    out.lock().push("inner:leave".into());
                    Ok::<_, BoxError>(())
                },
            ))
            .use_middleware(record("endpoint"));

        let out = dispatcher.run(Input::new(), trace()).await.unwrap();
        assert_eq!(
            entries(&out),
            [
                "outer:enter",
                "inner:enter",
                "endpoint",
                "inner:leave",
                "outer:leave"
            ]
        );
    }

    #[tokio::test]
    async fn test_explicit_next_is_not_advanced_twice() {
        let dispatcher = Dispatcher::new();
        dispatcher
            .use_middleware(with_next(
                |_input: Input, _out: Trace, next: Next<Trace>| async move { next.run().await },
            ))
            .use_middleware(pass("once"));

        let out = dispatcher.run(Input::new(), trace()).await.unwrap();
        assert_eq!(entries(&out), ["once"]);
    }

    #[tokio::test]
    async fn test_next_fail_aborts_without_error_handler() {
        let dispatcher = Dispatcher::new();
        dispatcher
            .use_middleware(with_next(
                |_input: Input, _out: Trace, next: Next<Trace>| async move {
                    next.fail("denied").await
                },
            ))
            .use_middleware(pass("unreached"));

        let out = trace();
        let err = dispatcher.run(Input::new(), Arc::clone(&out)).await.unwrap_err();

        assert_eq!(err.to_string(), "denied");
        assert!(entries(&out).is_empty());
    }

    #[tokio::test]
    async fn test_error_handler_skipped_without_pending_error() {
        let dispatcher = Dispatcher::new();
        dispatcher
            .use_middleware(pass("first"))
            .use_middleware(recover("handler"))
            .use_middleware(pass("second"));

        let out = dispatcher.run(Input::new(), trace()).await.unwrap();
        assert_eq!(entries(&out), ["first", "second"]);
    }

    #[tokio::test]
    async fn test_error_handler_consumes_and_clears_error() {
        let dispatcher = Dispatcher::new();
        dispatcher
            .use_middleware(failing("boom"))
            .use_middleware(recover("handler"))
            .use_middleware(pass("resumed"));

        let out = dispatcher.run(Input::new(), trace()).await.unwrap();
        assert_eq!(entries(&out), ["handler: boom", "resumed"]);
    }

    #[tokio::test]
    async fn test_error_handler_receives_the_same_error() {
        let dispatcher = Dispatcher::new();
        dispatcher
            .use_middleware(with_next(
                |_input: Input, _out: Trace, _next: Next<Trace>| async move {
                    Err::<(), BoxError>(Box::new(io::Error::new(io::ErrorKind::NotFound, "gone")))
                },
            ))
            .use_middleware(on_error(
                |err: BoxError, _input: Input, out: Trace, _next: Next<Trace>| async move {
                    let kind = err.downcast_ref::<io::Error>().map(io::Error::kind);
                    out.lock().push(format!("{kind:?}"));
                    Ok::<_, BoxError>(())
                },
            ));

        let out = dispatcher.run(Input::new(), trace()).await.unwrap();
        assert_eq!(entries(&out), ["Some(NotFound)"]);
    }

    #[tokio::test]
    async fn test_pending_error_is_fatal_at_non_error_handler() {
        let dispatcher = Dispatcher::new();
        dispatcher
            .use_middleware(failing("boom"))
            .use_middleware(pass("unreached"))
            .use_middleware(recover("too late"));

        let out = trace();
        let err = dispatcher.run(Input::new(), Arc::clone(&out)).await.unwrap_err();

        assert_eq!(err.to_string(), "boom");
        assert!(entries(&out).is_empty());
    }

    #[tokio::test]
    async fn test_unhandled_error_surfaces_at_exhaustion() {
        let dispatcher = Dispatcher::new();
        dispatcher.use_middleware(pass("first")).use_middleware(failing("late"));

        let err = dispatcher.run(Input::new(), trace()).await.unwrap_err();
        assert_eq!(err.to_string(), "late");
    }

    #[tokio::test]
    async fn test_basic_failure_bypasses_error_handlers() {
        let dispatcher = Dispatcher::new();
        dispatcher
            .use_middleware(basic(|_input: Input, _out: Trace| async move {
                Err::<(), BoxError>("basic failed".into())
            }))
            .use_middleware(recover("handler"));

        let out = trace();
        let err = dispatcher.run(Input::new(), Arc::clone(&out)).await.unwrap_err();

        assert_eq!(err.to_string(), "basic failed");
        assert!(entries(&out).is_empty());
    }

    #[tokio::test]
    async fn test_prefix_mount_strips_path() {
        let dispatcher = routed();
        dispatcher
            .use_at(
                "/api",
                with_next(|input: Input, out: Trace, _next: Next<Trace>| async move {
                    let path = input.get_str("path").unwrap_or_default().to_string();
                    let original = input.get_str("originalPath").unwrap_or_default().to_string();
                    out.lock().push(format!("{path} {original}"));
                    Ok::<_, BoxError>(())
                }),
            )
            .unwrap();

        let out = dispatcher.run(at("/api/users/7"), trace()).await.unwrap();
        assert_eq!(entries(&out), ["/users/7 /api/users/7"]);

        let out = dispatcher.run(at("/api"), trace()).await.unwrap();
        assert_eq!(entries(&out), ["/ /api"]);
    }

    #[tokio::test]
    async fn test_prefix_mount_respects_segment_boundary() {
        let dispatcher = routed();
        dispatcher.use_at("/test", pass("mounted")).unwrap();

        let out = dispatcher.run(at("/testing"), trace()).await.unwrap();
        assert!(entries(&out).is_empty());

        let out = dispatcher.run(at("/TEST/deeper"), trace()).await.unwrap();
        assert_eq!(entries(&out), ["mounted"]);
    }

    #[tokio::test]
    async fn test_mount_leaves_caller_input_untouched() {
        let dispatcher = routed();
        dispatcher
            .use_at("/api", pass("mounted"))
            .unwrap()
            .use_middleware(with_next(
                |input: Input, out: Trace, _next: Next<Trace>| async move {
                    out.lock().push(input.get_str("path").unwrap_or_default().to_string());
                    assert!(!input.contains("originalPath"));
                    Ok::<_, BoxError>(())
                },
            ));

        let out = dispatcher.run(at("/api/users"), trace()).await.unwrap();
        assert_eq!(entries(&out), ["mounted", "/api/users"]);
    }

    #[tokio::test]
    async fn test_exact_match_from_condition_binding() {
        let dispatcher = routed();
        dispatcher
            .when(Conditions::new())
            .handle_at("/users", record("users"))
            .unwrap();

        let out = dispatcher.run(at("/users"), trace()).await.unwrap();
        assert_eq!(entries(&out), ["users"]);

        let out = dispatcher.run(at("/users/"), trace()).await.unwrap();
        assert_eq!(entries(&out), ["users"]);

        let out = dispatcher.run(at("/users/7"), trace()).await.unwrap();
        assert!(entries(&out).is_empty());
    }

    #[tokio::test]
    async fn test_path_parameters() {
        let dispatcher = routed();
        dispatcher
            .when(Conditions::new())
            .handle_at(
                "/test/:name?",
                basic(|input: Input, out: Trace| async move {
                    let name = input.params().and_then(|p| p.get("name")).cloned();
                    out.lock().push(format!("{name:?}"));
                    Ok::<_, BoxError>(())
                }),
            )
            .unwrap();

        let out = dispatcher.run(at("/test/hello%20world"), trace()).await.unwrap();
        assert_eq!(entries(&out), [format!("{:?}", Some(json!("hello world")))]);

        let out = dispatcher.run(at("/test"), trace()).await.unwrap();
        assert_eq!(entries(&out), [format!("{:?}", Some(Value::Null))]);
    }

    #[tokio::test]
    async fn test_conditions_filter_entries() {
        let dispatcher = Dispatcher::new();
        dispatcher
            .when(Conditions::new().equals("method", "GET"))
            .handle(record("get"))
            .unwrap();
        dispatcher
            .when(Conditions::new().equals("method", "POST"))
            .handle(record("post"))
            .unwrap();

        let out = dispatcher
            .run(Input::new().with("method", "POST"), trace())
            .await
            .unwrap();
        assert_eq!(entries(&out), ["post"]);

        let out = dispatcher
            .run(Input::new().with("method", "PUT"), trace())
            .await
            .unwrap();
        assert!(entries(&out).is_empty());
    }

    #[tokio::test]
    async fn test_binding_entries_stop_even_with_next() {
        let dispatcher = Dispatcher::new();
        dispatcher.when(Conditions::new()).handle(pass("bound")).unwrap();
        dispatcher.use_middleware(pass("after"));

        let out = dispatcher.run(Input::new(), trace()).await.unwrap();
        assert_eq!(entries(&out), ["bound"]);
    }

    #[tokio::test]
    async fn test_nested_dispatcher_sees_stripped_path() {
        let inner = routed();
        inner
            .when(Conditions::new())
            .handle_at(
                "/users/:id",
                basic(|input: Input, out: Trace| async move {
                    let id = input.param("id").unwrap_or_default().to_string();
                    let original = input.get_str("originalPath").unwrap_or_default().to_string();
                    out.lock().push(format!("user {id} via {original}"));
                    Ok::<_, BoxError>(())
                }),
            )
            .unwrap();

        let outer = routed();
        outer.use_at("/api", inner).unwrap();
        outer.use_middleware(record("fallback"));

        let out = outer.run(at("/api/users/7"), trace()).await.unwrap();
        assert_eq!(entries(&out), ["user 7 via /api/users/7"]);

        let out = outer.run(at("/other"), trace()).await.unwrap();
        assert_eq!(entries(&out), ["fallback"]);
    }

    #[tokio::test]
    async fn test_original_path_survives_two_mounts() {
        let inner = routed();
        inner
            .use_at(
                "/v1",
                with_next(|input: Input, out: Trace, _next: Next<Trace>| async move {
                    let path = input.get_str("path").unwrap_or_default().to_string();
                    let original = input.get_str("originalPath").unwrap_or_default().to_string();
                    out.lock().push(format!("{path} {original}"));
                    Ok::<_, BoxError>(())
                }),
            )
            .unwrap();

        let outer = routed();
        outer.use_at("/api", inner).unwrap();

        let out = outer.run(at("/api/v1/items"), trace()).await.unwrap();
        assert_eq!(entries(&out), ["/items /api/v1/items"]);
    }

    #[tokio::test]
    async fn test_run_future_outlives_dispatcher_handle() {
        let dispatcher = Dispatcher::<Trace>::new();
        dispatcher.use_middleware(record("detached"));

        let run = dispatcher.run(Input::new(), trace());
        drop(dispatcher);

        let out = tokio::spawn(run).await.unwrap().unwrap();
        assert_eq!(entries(&out), ["detached"]);
    }

    #[tokio::test]
    async fn test_nested_dispatcher_without_path() {
        let inner = Dispatcher::new();
        inner.use_middleware(pass("inner"));

        let outer = Dispatcher::new();
        outer.use_middleware(inner.into_middleware());
        outer.use_middleware(pass("after"));

        let out = outer.run(Input::new(), trace()).await.unwrap();
        assert_eq!(entries(&out), ["inner"]);
    }

    #[tokio::test]
    async fn test_path_ignored_without_path_property() {
        let dispatcher = Dispatcher::new();
        dispatcher.use_at("/api", pass("everywhere")).unwrap();

        let out = dispatcher.run(at("/elsewhere"), trace()).await.unwrap();
        assert_eq!(entries(&out), ["everywhere"]);
    }

    #[tokio::test]
    async fn test_non_string_path_never_matches_mount() {
        let dispatcher = routed();
        dispatcher.use_at("/", pass("mounted")).unwrap();

        let out = dispatcher
            .run(Input::new().with("path", 42), trace())
            .await
            .unwrap();
        assert!(entries(&out).is_empty());
    }

    #[test]
    fn test_configuration_errors() {
        let dispatcher = routed();
        assert!(matches!(
            dispatcher.use_all(None, Vec::new()),
            Err(ConfigurationError::MissingHandler)
        ));
        assert!(matches!(
            dispatcher.use_at("/broken(", pass("x")),
            Err(ConfigurationError::InvalidPath { .. })
        ));
        assert!(matches!(
            Dispatcher::<Trace>::with_path_property(""),
            Err(ConfigurationError::EmptyPathProperty)
        ));
        assert!(dispatcher.is_empty());
    }

    #[test]
    fn test_use_all_registers_each_handler() {
        let dispatcher = routed();
        dispatcher
            .use_all(Some("/api"), [pass("a"), pass("b"), record("c")])
            .unwrap();
        assert_eq!(dispatcher.len(), 3);
        assert_eq!(dispatcher.path_property(), Some("path"));
    }

    #[tokio::test]
    async fn test_run_uses_registry_snapshot() {
        let dispatcher = Dispatcher::<Trace>::new();
        let registrar = dispatcher.clone();
        dispatcher.use_middleware(with_next(
            move |_input: Input, out: Trace, _next: Next<Trace>| {
                let registrar = registrar.clone();
                async move {
                    if registrar.len() == 1 {
                        registrar.use_middleware(pass("late"));
                    }
                    out.lock().push("registering".into());
                    Ok::<_, BoxError>(())
                }
            },
        ));

        let out = dispatcher.run(Input::new(), trace()).await.unwrap();
        assert_eq!(entries(&out), ["registering"]);

        let out = dispatcher.run(Input::new(), trace()).await.unwrap();
        assert_eq!(entries(&out), ["registering", "late"]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_runs_are_isolated() {
        let dispatcher = routed();
        dispatcher
            .when(Conditions::new())
            .handle_at(
                "/items/:id",
                basic(|input: Input, out: Trace| async move {
                    tokio::task::yield_now().await;
                    out.lock().push(input.param("id").unwrap_or_default().to_string());
                    Ok::<_, BoxError>(())
                }),
            )
            .unwrap();

        let handles: Vec<_> = (0..16)
            .map(|i| tokio::spawn(dispatcher.run(at(&format!("/items/{i}")), trace())))
            .collect();

        for (i, handle) in handles.into_iter().enumerate() {
            let out = handle.await.unwrap().unwrap();
            assert_eq!(entries(&out), [i.to_string()]);
        }
    }

    #[tokio::test]
    async fn test_tower_service() {
        let dispatcher = Dispatcher::new();
        dispatcher.use_middleware(record("served"));

        let out = dispatcher.oneshot((Input::new(), trace())).await.unwrap();
        assert_eq!(entries(&out), ["served"]);
    }
}
