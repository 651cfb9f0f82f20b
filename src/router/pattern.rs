//! Compiled path patterns.
//!
//! A route path containing `:token` segments is rewritten into a regex with
//! one named capture group per token. Each group matches a run of characters
//! other than `/`. Patterns always match the whole request path.

use std::collections::HashSet;
use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

use crate::router::error::Error;

static TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(":([A-Za-z][A-Za-z0-9_]*)").expect("token pattern is valid")
});

#[derive(Debug, Clone)]
pub(crate) struct PathPattern {
    regex: Regex,
    /// Names of the declared capture groups; empty for a regex without named groups.
    groups: Vec<String>,
}

impl PathPattern {
    /// Whether `path` has `:token` segments and must be compiled as a pattern.
    pub(crate) fn has_tokens(path: &str) -> bool {
        TOKEN.is_match(path)
    }

    /// Compile a route path with `:token` segments.
    pub(crate) fn from_path(path: &str) -> Result<Self, Error> {
        let mut source = String::with_capacity(path.len() + 16);
        let mut groups = Vec::new();
        let mut seen = HashSet::new();
        let mut last = 0;

        for caps in TOKEN.captures_iter(path) {
            let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            let name = name.as_str();
            if !seen.insert(name) {
                return Err(Error::DuplicateToken(name.to_string()));
            }
            source.push_str(&regex::escape(&path[last..whole.start()]));
            source.push_str(&format!("(?P<{name}>[^/]+)"));
            groups.push(name.to_string());
            last = whole.end();
        }
        source.push_str(&regex::escape(&path[last..]));

        Ok(Self {
            regex: anchored(&source)?,
            groups,
        })
    }

    /// Compile a raw regular expression.
    pub(crate) fn from_regex(pattern: &str) -> Result<Self, Error> {
        let regex = anchored(pattern)?;
        let groups = regex
            .capture_names()
            .flatten()
            .map(str::to_string)
            .collect();
        Ok(Self { regex, groups })
    }

    /// Match the whole of `path`, returning the extracted parameters.
    ///
    /// Named groups are reported under their names; a regex without named
    /// groups reports its numbered groups as `param0`, `param1`, ...
    pub(crate) fn captures(&self, path: &str) -> Option<Vec<(String, String)>> {
        let caps = self.regex.captures(path)?;

        let params = if self.groups.is_empty() {
            (1..caps.len())
                .filter_map(|i| {
                    caps.get(i)
                        .map(|m| (format!("param{}", i - 1), m.as_str().to_string()))
                })
                .collect()
        } else {
            self.groups
                .iter()
                .filter_map(|name| {
                    caps.name(name)
                        .map(|m| (name.clone(), m.as_str().to_string()))
                })
                .collect()
        };
        Some(params)
    }
}

impl fmt::Display for PathPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.regex.as_str())
    }
}

fn anchored(source: &str) -> Result<Regex, Error> {
    Ok(Regex::new(&format!("^(?:{source})$"))?)
}
