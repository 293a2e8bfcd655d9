//! # Waypost Path
//!
//! Mount-path patterns for the Waypost dispatcher.
//!
//! A pattern such as `/users/:id` or `/files/:name?` is compiled once into a
//! [`PathPattern`] and then matched against request paths. A pattern is
//! compiled in one of two modes:
//!
//! - **exact** ([`PathOptions::exact`]): the pattern must consume the whole path
//! - **prefix** ([`PathOptions::prefix`]): the pattern must consume a leading
//!   run of whole segments, leaving the rest for the mounted middleware
//!
//! ```rust
//! use waypost_path::{PathOptions, PathPattern};
//!
//! let pattern = PathPattern::compile("/test/:name?", PathOptions::prefix()).unwrap();
//! let matched = pattern.matches("/test/route/deeper").unwrap();
//!
//! assert_eq!(matched.len(), "/test/route".len());
//! assert_eq!(matched.param("name"), Some("route"));
//! ```
//!
//! ## Syntax
//!
//! | Token          | Meaning                                         |
//! |----------------|-------------------------------------------------|
//! | `:name`        | one path segment, captured as `name`            |
//! | `:name(\d+)`   | a parameter with a custom regular expression    |
//! | `(\d+)`        | an unnamed parameter, named by its index        |
//! | `*`            | an unnamed parameter matching anything          |
//! | `?` / `*` / `+`| optional / zero or more / one or more segments  |
//! | `\x`           | the literal character `x`                       |

mod error;
mod pattern;
mod token;

pub use error::{PatternError, PatternResult};
pub use pattern::{ParamKey, PathMatch, PathOptions, PathPattern};
