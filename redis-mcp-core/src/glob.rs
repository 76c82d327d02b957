/*!
Store-style glob patterns compiled to anchored regular expressions.

Supports the same syntax the store uses for `KEYS`: `*` matches any run of
characters, `?` a single character, `[...]` a character class (with `^`
negation and `a-z` ranges), and `\x` a literal `x`. Every other character
matches itself, including regex metacharacters such as `.`, `+` and `$`.
Like the store, `!` has no special meaning inside a class.

Unlike the store, an unterminated or empty class is rejected rather than
silently matching to the end of the pattern.
*/

use regex::Regex;
use std::fmt;

use crate::{RedisMcpError, Result};

/// A compiled glob pattern
#[derive(Clone)]
pub struct GlobPattern {
    source: String,
    regex: Regex,
}

impl GlobPattern {
    /// Compile a glob pattern
    ///
    /// # Errors
    /// * `RedisMcpError::Configuration` - unterminated or empty character class
    pub fn new(pattern: &str) -> Result<Self> {
        let translated = translate(pattern)?;
        let regex = Regex::new(&translated).map_err(|e| {
            RedisMcpError::configuration(format!("invalid glob pattern '{pattern}': {e}"))
        })?;

        Ok(Self {
            source: pattern.to_string(),
            regex,
        })
    }

    pub fn is_match(&self, key: &str) -> bool {
        self.regex.is_match(key)
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }
}

impl fmt::Debug for GlobPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("GlobPattern").field(&self.source).finish()
    }
}

/// Several patterns evaluated as "matches any"
#[derive(Debug, Clone, Default)]
pub struct GlobSet {
    patterns: Vec<GlobPattern>,
}

impl GlobSet {
    pub fn compile<S: AsRef<str>>(patterns: &[S]) -> Result<Self> {
        let patterns = patterns
            .iter()
            .map(|p| GlobPattern::new(p.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { patterns })
    }

    pub fn matches_any(&self, key: &str) -> bool {
        self.patterns.iter().any(|p| p.is_match(key))
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

/// Translate a glob into an anchored regex source string
pub fn translate(pattern: &str) -> Result<String> {
    let chars: Vec<char> = pattern.chars().collect();
    let mut out = String::with_capacity(pattern.len() * 2 + 8);
    out.push_str("(?s)\\A");

    let mut i = 0;
    while i < chars.len() {
        match chars[i] {
            '*' => {
                // Runs of stars are equivalent to one
                while i + 1 < chars.len() && chars[i + 1] == '*' {
                    i += 1;
                }
                out.push_str(".*");
            }
            '?' => out.push('.'),
            '\\' => {
                if i + 1 < chars.len() {
                    i += 1;
                }
                push_literal(&mut out, chars[i]);
            }
            '[' => {
                let (class, next) = read_class(&chars, i + 1, pattern)?;
                out.push_str(&class);
                i = next;
                continue;
            }
            other => push_literal(&mut out, other),
        }
        i += 1;
    }

    out.push_str("\\z");
    Ok(out)
}

fn push_literal(out: &mut String, c: char) {
    let mut buf = [0u8; 4];
    out.push_str(&regex::escape(c.encode_utf8(&mut buf)));
}

/// Read a class body starting just after `[`; returns its regex form and the
/// index after the closing `]`
fn read_class(chars: &[char], mut i: usize, pattern: &str) -> Result<(String, usize)> {
    let unterminated = || {
        RedisMcpError::configuration(format!(
            "invalid glob pattern '{pattern}': unterminated character class"
        ))
    };

    let mut negated = false;
    if chars.get(i) == Some(&'^') {
        negated = true;
        i += 1;
    }

    let mut items: Vec<(char, char)> = Vec::new();
    loop {
        let Some(&c) = chars.get(i) else {
            return Err(unterminated());
        };
        if c == ']' {
            i += 1;
            break;
        }

        let start = if c == '\\' && i + 1 < chars.len() {
            i += 1;
            chars[i]
        } else {
            c
        };
        i += 1;

        // `a-z` range, unless the dash closes the class
        if chars.get(i) == Some(&'-') && chars.get(i + 1).is_some_and(|&n| n != ']') {
            i += 1;
            let mut end = chars[i];
            if end == '\\' && i + 1 < chars.len() {
                i += 1;
                end = chars[i];
            }
            i += 1;
            let (lo, hi) = if start <= end { (start, end) } else { (end, start) };
            items.push((lo, hi));
        } else {
            items.push((start, start));
        }
    }

    if items.is_empty() {
        return Err(RedisMcpError::configuration(format!(
            "invalid glob pattern '{pattern}': empty character class"
        )));
    }

    let mut class = String::from("[");
    if negated {
        class.push('^');
    }
    for (lo, hi) in items {
        push_literal(&mut class, lo);
        if lo != hi {
            class.push('-');
            push_literal(&mut class, hi);
        }
    }
    class.push(']');
    Ok((class, i))
}
