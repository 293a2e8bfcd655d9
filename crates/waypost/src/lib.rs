//! # Waypost
//!
//! A transport-agnostic middleware dispatcher.
//!
//! ## Overview
//!
//! Waypost runs an ordered stack of middleware over an input record and an
//! output handle. It is not a router resolving one best match: zero, one or
//! many entries may run for an input, each deciding whether the chain
//! continues. What "request" and "response" mean is up to the caller; the
//! only convention is an optional path field used for mounting.
//!
//! ```text
//!  input ─▶ ┌──────────────┐   filter by conditions    ┌─────────┐   ┌─────────┐
//!           │  Dispatcher  │──────── and mount ───────▶│ entry 0 │──▶│ entry 1 │──▶ …
//! output ─▶ └──────────────┘                           └─────────┘   └─────────┘
//! ```
//!
//! - **waypost-path**: path pattern compilation and matching
//! - **waypost-core**: conditions, mounts, handlers and the dispatcher
//! - **waypost-runtime**: configuration loading and logging setup
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use waypost::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ConfigLoader::new().load()?;
//!     init_from_config(&config.logging);
//!
//!     let app = config.build_dispatcher::<Response>()?;
//!     app.use_middleware(with_next(log_request));
//!     app.when(Conditions::new().equals("method", "GET"))
//!         .handle_at("/users/:id", basic(show_user))?;
//!
//!     let response = app.run(request, Response::default()).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - `toml-config`: TOML configuration files (default)
//! - `yaml-config`: YAML configuration files
//! - `json-log`: JSON log output

pub use waypost_core as core;
pub use waypost_path as path;
pub use waypost_runtime as runtime;

pub use waypost_core::{Dispatcher, Input, Next};

/// Prelude module for convenient imports.
///
/// ```rust,ignore
/// use waypost::prelude::*;
/// ```
pub mod prelude {
    // Dispatcher and registration
    pub use waypost_core::{
        ConditionBinding, Condition, Conditions, Dispatcher, DispatcherOptions, Input, Next,
    };

    // Handlers
    pub use waypost_core::{BoxError, HandlerResult, Middleware, basic, on_error, with_next};

    // Errors
    pub use waypost_core::{ConfigurationError, ConfigurationResult};

    // Configuration and logging
    pub use waypost_runtime::{
        ConfigError, ConfigLoader, LoggingBuilder, WaypostConfig, init_from_config,
    };
}
