//! Pattern tokenizer.

use std::iter::Peekable;
use std::str::CharIndices;

use crate::error::{PatternError, PatternResult};

/// A lexical piece of a path pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Token {
    /// Text that must appear verbatim.
    Literal(String),
    /// A captured parameter.
    Param(ParamToken),
}

/// A parameter as written in the pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ParamToken {
    pub name: String,
    /// The `/` or `.` written directly before the parameter.
    pub prefix: Option<char>,
    /// Regex source for one repetition, without capturing groups.
    pub pattern: String,
    pub optional: bool,
    pub repeat: bool,
}

/// Splits `source` into literal and parameter tokens.
pub(crate) fn tokenize(source: &str) -> PatternResult<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut literal = String::new();
    // An escaped `/` or `.` is never taken as a parameter prefix.
    let mut escaped_tail = false;
    let mut unnamed = 0usize;
    let mut chars = source.char_indices().peekable();

    while let Some((position, c)) = chars.next() {
        let (name, custom, asterisk) = match c {
            '\\' => {
                literal.push(chars.next().map_or('\\', |(_, escaped)| escaped));
                escaped_tail = true;
                continue;
            }
            ':' => {
                let name = read_name(&mut chars);
                if name.is_empty() {
                    return Err(PatternError::MissingParameterName {
                        pattern: source.to_string(),
                        position,
                    });
                }
                let custom = match chars.peek() {
                    Some(&(open, '(')) => {
                        chars.next();
                        Some(read_group(&mut chars, source, open)?)
                    }
                    _ => None,
                };
                (name, custom, false)
            }
            '(' => {
                let group = read_group(&mut chars, source, position)?;
                let name = unnamed.to_string();
                unnamed += 1;
                (name, Some(group), false)
            }
            '*' => {
                let name = unnamed.to_string();
                unnamed += 1;
                (name, None, true)
            }
            other => {
                literal.push(other);
                escaped_tail = false;
                continue;
            }
        };

        let prefix = match literal.chars().last() {
            Some(last @ ('/' | '.')) if !escaped_tail => {
                literal.pop();
                Some(last)
            }
            _ => None,
        };
        if !literal.is_empty() {
            tokens.push(Token::Literal(std::mem::take(&mut literal)));
        }
        escaped_tail = false;

        let (optional, repeat) = if asterisk {
            (false, false)
        } else {
            read_modifier(&mut chars)
        };
        let pattern = if asterisk {
            ".*".to_string()
        } else if let Some(custom) = custom {
            non_capturing(&custom)
        } else {
            let delimiter = prefix.unwrap_or('/');
            format!("[^{}]+", regex::escape(&delimiter.to_string()))
        };

        tokens.push(Token::Param(ParamToken {
            name,
            prefix,
            pattern,
            optional,
            repeat,
        }));
    }

    if !literal.is_empty() {
        tokens.push(Token::Literal(literal));
    }
    Ok(tokens)
}

fn read_name(chars: &mut Peekable<CharIndices<'_>>) -> String {
    let mut name = String::new();
    while let Some(&(_, c)) = chars.peek() {
        if !(c.is_ascii_alphanumeric() || c == '_') {
            break;
        }
        name.push(c);
        chars.next();
    }
    name
}

/// Reads up to the parenthesis closing the one at `open`, which has already
/// been consumed.
fn read_group(
    chars: &mut Peekable<CharIndices<'_>>,
    source: &str,
    open: usize,
) -> PatternResult<String> {
    let mut depth = 1usize;
    let mut group = String::new();

    while let Some((_, c)) = chars.next() {
        match c {
            '\\' => {
                group.push(c);
                if let Some((_, escaped)) = chars.next() {
                    group.push(escaped);
                }
                continue;
            }
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return Ok(group);
                }
            }
            _ => {}
        }
        group.push(c);
    }

    Err(PatternError::UnbalancedGroup {
        pattern: source.to_string(),
        position: open,
    })
}

fn read_modifier(chars: &mut Peekable<CharIndices<'_>>) -> (bool, bool) {
    let modifier = match chars.peek() {
        Some(&(_, m @ ('?' | '*' | '+'))) => m,
        _ => return (false, false),
    };
    chars.next();
    match modifier {
        '?' => (true, false),
        '*' => (true, true),
        _ => (false, true),
    }
}

/// Rewrites capturing groups inside a custom parameter pattern so that
/// capture indices keep lining up with parameter keys.
fn non_capturing(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len() + 4);
    let mut chars = pattern.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                out.push(c);
                if let Some(escaped) = chars.next() {
                    out.push(escaped);
                }
            }
            '(' if chars.peek() != Some(&'?') => out.push_str("(?:"),
            _ => out.push(c),
        }
    }
    out
}
