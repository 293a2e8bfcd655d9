//! Mount paths: matching an input's path and deriving the input a mounted
//! middleware sees.
//!
//! With a path property of `url`, a middleware mounted at `/test/:name`
//! receives for `url = "/test/route"`:
//!
//! ```text
//! url         = "/"
//! originalUrl = "/test/route"
//! params      = { "name": "route" }
//! ```

use serde_json::{Map, Value};
use tracing::trace;
use waypost_path::{PathOptions, PathPattern};

use crate::error::{ConfigurationError, ConfigurationResult};
use crate::input::{Input, PARAMS_FIELD};

/// A compiled mount path.
#[derive(Debug, Clone)]
pub struct MountPath {
    pattern: PathPattern,
}

impl MountPath {
    /// Compiles `path`.
    ///
    /// `match_to_end` selects exact matching; otherwise the path is a prefix
    /// mount.
    pub fn compile(path: &str, match_to_end: bool) -> ConfigurationResult<Self> {
        let options = if match_to_end {
            PathOptions::exact()
        } else {
            PathOptions::prefix()
        };
        let pattern =
            PathPattern::compile(path, options).map_err(|source| ConfigurationError::InvalidPath {
                path: path.to_string(),
                source,
            })?;
        Ok(Self { pattern })
    }

    /// Returns the compiled pattern.
    pub fn pattern(&self) -> &PathPattern {
        &self.pattern
    }

    /// Returns whether the input's path property matches this mount path.
    ///
    /// A missing or non-string path never matches.
    pub fn matches(&self, input: &Input, path_property: &str) -> bool {
        input
            .get_str(path_property)
            .is_some_and(|path| self.pattern.is_match(path))
    }

    /// Derives the input seen by a middleware mounted at this path.
    ///
    /// The caller's input is left untouched. If the path no longer matches,
    /// a plain copy is returned.
    pub fn bind(&self, input: &Input, path_property: &str) -> Input {
        let Some(path) = input.get_str(path_property) else {
            return input.clone();
        };
        let Some(matched) = self.pattern.matches(path) else {
            return input.clone();
        };

        let remainder = with_leading_slash(&path[matched.len()..]);
        let original_key = original_property(path_property);
        let original = match input.get(&original_key) {
            Some(Value::String(s)) if !s.is_empty() => s.clone(),
            _ => path.to_string(),
        };
        let params: Map<String, Value> = matched
            .params()
            .into_iter()
            .map(|(name, value)| (name, value.map_or(Value::Null, Value::String)))
            .collect();

        trace!(
            mount = %self.pattern,
            path,
            remainder = %remainder,
            "Stripped mount path"
        );

        let mut bound = input.clone();
        bound.insert(path_property, remainder);
        bound.insert(original_key, original);
        bound.insert(PARAMS_FIELD, params);
        bound
    }
}

/// Name of the field preserving the unstripped path: `path` becomes
/// `originalPath`, `url` becomes `originalUrl`.
pub fn original_property(path_property: &str) -> String {
    let mut chars = path_property.chars();
    match chars.next() {
        Some(first) => format!("original{}{}", first.to_uppercase(), chars.as_str()),
        None => "original".to_string(),
    }
}

/// Joins path segments, giving each a leading `/` and skipping empty ones.
///
/// Returns `None` when no segment remains, meaning "no path restriction".
pub fn join_paths<'a, I>(segments: I) -> Option<String>
where
    I: IntoIterator<Item = Option<&'a str>>,
{
    let joined: String = segments
        .into_iter()
        .flatten()
        .filter(|segment| !segment.is_empty())
        .map(with_leading_slash)
        .collect();
    (!joined.is_empty()).then_some(joined)
}

fn with_leading_slash(path: &str) -> String {
    if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{path}")
    }
}
