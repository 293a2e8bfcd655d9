//! Compiled path patterns.

use std::borrow::Cow;

use regex::Regex;

use crate::error::{PatternError, PatternResult};
use crate::token::{Token, tokenize};

/// Options controlling how a pattern is compiled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PathOptions {
    /// Whether the pattern must match to the end of the path.
    pub end: bool,
    /// Whether literal text is compared case-sensitively.
    pub sensitive: bool,
}

impl Default for PathOptions {
    fn default() -> Self {
        Self::exact()
    }
}

impl PathOptions {
    /// The whole path must match.
    pub const fn exact() -> Self {
        Self {
            end: true,
            sensitive: false,
        }
    }

    /// A leading run of whole segments must match.
    pub const fn prefix() -> Self {
        Self {
            end: false,
            sensitive: false,
        }
    }

    /// Sets case sensitivity.
    pub const fn sensitive(mut self, sensitive: bool) -> Self {
        self.sensitive = sensitive;
        self
    }
}

/// A declared parameter of a compiled pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamKey {
    /// Parameter name; unnamed groups are named by their index.
    pub name: String,
    /// Whether the parameter may be absent.
    pub optional: bool,
    /// Whether the parameter may span several segments.
    pub repeat: bool,
}

/// A compiled path pattern.
///
/// Compilation happens once; matching is a single regex evaluation.
#[derive(Debug, Clone)]
pub struct PathPattern {
    source: String,
    regex: Regex,
    keys: Vec<ParamKey>,
    options: PathOptions,
}

impl PathPattern {
    /// Compiles `source` with the given options.
    pub fn compile(source: &str, options: PathOptions) -> PatternResult<Self> {
        let tokens = tokenize(source)?;
        let mut route = String::with_capacity(source.len() * 2);
        let mut keys = Vec::new();

        for token in &tokens {
            match token {
                Token::Literal(text) => route.push_str(&regex::escape(text)),
                Token::Param(param) => {
                    let prefix = param
                        .prefix
                        .map(|c| regex::escape(&c.to_string()))
                        .unwrap_or_default();
                    let mut capture = format!("(?:{})", param.pattern);
                    if param.repeat {
                        capture = format!("{capture}(?:{prefix}{capture})*");
                    }
                    let group = match (param.optional, param.prefix.is_some()) {
                        (true, true) => format!("(?:{prefix}({capture}))?"),
                        (true, false) => format!("({capture})?"),
                        (false, _) => format!("{prefix}({capture})"),
                    };
                    route.push_str(&group);
                    keys.push(ParamKey {
                        name: param.name.clone(),
                        optional: param.optional,
                        repeat: param.repeat,
                    });
                }
            }
        }

        // A trailing slash in the pattern is optional in the subject.
        if matches!(tokens.last(), Some(Token::Literal(text)) if text.ends_with('/')) {
            route.pop();
        }

        // Group 1 is the consumed part; parameters start at group 2. In
        // prefix mode the boundary is matched outside the group so the
        // engine can pick a parameter alternative that ends on a segment.
        let flags = if options.sensitive { "" } else { "(?i)" };
        let anchored = if options.end {
            format!("{flags}^({route}/?)$")
        } else {
            format!("{flags}^({route}(?:/$)?)(?:/|$)")
        };

        let regex = Regex::new(&anchored).map_err(|err| PatternError::Regex {
            pattern: source.to_string(),
            source: err,
        })?;

        Ok(Self {
            source: source.to_string(),
            regex,
            keys,
            options,
        })
    }

    /// Compiles a pattern that must match the whole path.
    pub fn exact(source: &str) -> PatternResult<Self> {
        Self::compile(source, PathOptions::exact())
    }

    /// Compiles a pattern that matches a leading run of segments.
    pub fn prefix(source: &str) -> PatternResult<Self> {
        Self::compile(source, PathOptions::prefix())
    }

    /// Returns the pattern as written.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Returns the declared parameters in declaration order.
    pub fn keys(&self) -> &[ParamKey] {
        &self.keys
    }

    /// Returns whether the pattern must match to the end of the path.
    pub fn is_exact(&self) -> bool {
        self.options.end
    }

    /// Matches `subject` against this pattern.
    ///
    /// In prefix mode the match must stop at a segment boundary: `/test`
    /// matches `/test/route` but not `/testing`. A capture holding a
    /// malformed percent escape makes the whole match fail.
    pub fn matches<'a>(&'a self, subject: &'a str) -> Option<PathMatch<'a>> {
        let captures = self.regex.captures(subject)?;
        let len = captures.get(1).map_or(0, |m| m.end());

        let mut params = Vec::with_capacity(self.keys.len());
        let mut decoded = Vec::with_capacity(self.keys.len());
        for (i, key) in self.keys.iter().enumerate() {
            let raw = captures.get(i + 2).map(|m| m.as_str());
            decoded.push(match raw {
                Some(raw) => Some(decode(raw)?),
                None => None,
            });
            params.push((key.name.as_str(), raw));
        }

        Some(PathMatch {
            len,
            params,
            decoded,
        })
    }

    /// Returns whether `subject` matches this pattern.
    pub fn is_match(&self, subject: &str) -> bool {
        self.matches(subject).is_some()
    }
}

impl std::fmt::Display for PathPattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.source)
    }
}

/// The result of a successful match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathMatch<'a> {
    len: usize,
    params: Vec<(&'a str, Option<&'a str>)>,
    decoded: Vec<Option<String>>,
}

impl<'a> PathMatch<'a> {
    /// Length in bytes of the matched prefix of the subject.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns whether the match consumed nothing.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Raw captures in declaration order; `None` for an optional parameter
    /// that did not participate.
    pub fn captures(&self) -> &[(&'a str, Option<&'a str>)] {
        &self.params
    }

    /// Returns the raw capture for `name`.
    pub fn param(&self, name: &str) -> Option<&'a str> {
        self.params
            .iter()
            .find(|(key, _)| *key == name)
            .and_then(|(_, value)| *value)
    }

    /// Returns the percent-decoded captures in declaration order.
    pub fn params(&self) -> Vec<(String, Option<String>)> {
        self.params
            .iter()
            .zip(&self.decoded)
            .map(|((key, _), value)| (key.to_string(), value.clone()))
            .collect()
    }
}

/// Percent-decodes a capture. `None` for an escape that is not followed by
/// two hex digits or that does not decode to UTF-8.
fn decode(raw: &str) -> Option<String> {
    let bytes = raw.as_bytes();
    let malformed = bytes.iter().enumerate().any(|(i, &b)| {
        b == b'%'
            && !bytes
                .get(i + 1..i + 3)
                .is_some_and(|hex| hex.iter().all(u8::is_ascii_hexdigit))
    });
    if malformed {
        return None;
    }
    urlencoding::decode(raw).ok().map(Cow::into_owned)
}
