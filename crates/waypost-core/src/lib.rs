//! # Waypost Core
//!
//! A transport-agnostic middleware dispatcher.
//!
//! Callers register an ordered stack of middleware. Each entry may be gated
//! by field [`Conditions`] and by a mount path. Running the dispatcher over
//! an [`Input`] record and an output handle executes the applicable entries
//! in order and produces a single asynchronous result.
//!
//! ## Building blocks
//!
//! - **Conditions** ([`condition`]): equality, regex and predicate checks on input fields
//! - **Mount paths** ([`mount`]): prefix or exact path matching, prefix stripping and parameters
//! - **Handlers** ([`handler`]): [`basic`], [`with_next`] and [`on_error`] middleware
//! - **Dispatcher** ([`Dispatcher`]): registration and the execution chain
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use parking_lot::Mutex;
//! use waypost_core::{BoxError, Conditions, Dispatcher, Input, Next, basic, with_next};
//!
//! type Out = Arc<Mutex<Vec<String>>>;
//!
//! # tokio_test::block_on(async {
//! let app = Dispatcher::<Out>::with_path_property("path").unwrap();
//!
//! app.use_middleware(with_next(|_input: Input, out: Out, next: Next<Out>| async move {
//!     out.lock().push("enter".into());
//!     next.run().await?;
//!     out.lock().push("leave".into());
//!     Ok::<_, BoxError>(())
//! }));
//!
//! app.when(Conditions::new().equals("method", "GET"))
//!     .handle_at("/users/:id", basic(|input: Input, out: Out| async move {
//!         out.lock().push(format!("user {}", input.param("id").unwrap_or("?")));
//!         Ok::<_, BoxError>(())
//!     }))
//!     .unwrap();
//!
//! let input = Input::new().with("method", "GET").with("path", "/users/7");
//! let out = app.run(input, Out::default()).await.unwrap();
//! assert_eq!(*out.lock(), ["enter", "user 7", "leave"]);
//! # });
//! ```

pub mod binding;
pub mod chain;
pub mod condition;
pub mod dispatcher;
pub mod error;
pub mod handler;
pub mod input;
pub mod mount;
pub mod options;
pub mod registry;

pub use binding::ConditionBinding;
pub use chain::Next;
pub use condition::{Condition, Conditions, PredicateFn};
pub use dispatcher::Dispatcher;
pub use error::{BoxError, ConfigurationError, ConfigurationResult, HandlerResult};
pub use handler::{
    BasicHandler, ErrorHandler, HandlerKind, Middleware, NextHandler, basic, on_error, with_next,
};
pub use input::{Input, PARAMS_FIELD};
pub use mount::{MountPath, join_paths, original_property};
pub use options::DispatcherOptions;
pub use registry::Entry;
