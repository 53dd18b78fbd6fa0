use log::debug;
use regex::{Regex, RegexBuilder};

/// A user-typed search expression compiled to a matchable predicate.
///
/// All variants match case-insensitively. A wildcard-free pattern is a plain
/// substring test; a glob requires a full match of the target; an explicit
/// regex uses search semantics and anchors itself.
#[derive(Debug, Clone)]
pub enum CompiledPattern {
    /// Empty pattern: matches everything.
    MatchAll,
    /// No wildcards: case-insensitive substring containment. Holds the
    /// lowercased needle.
    Literal(String),
    /// Glob with `*`/`?` translated to an anchored regex.
    Glob(Regex),
    /// Explicit `/…/`-delimited regex.
    Explicit(Regex),
    /// A `/…/` pattern that failed to compile: matches nothing.
    Invalid,
}

impl CompiledPattern {
    /// Compiles a raw pattern string.
    ///
    /// Empty input matches everything; input wrapped in `/` slashes is taken
    /// as a regular expression (a compile failure yields [`Invalid`], never
    /// an error); input containing `*` ("zero or more characters") or `?`
    /// ("exactly one character") is a glob that must match the whole target;
    /// anything else is a substring test.
    ///
    /// [`Invalid`]: CompiledPattern::Invalid
    pub fn compile(raw: &str) -> Self {
        let raw = raw.trim();
        if raw.is_empty() {
            return CompiledPattern::MatchAll;
        }

        if let Some(inner) = explicit_regex_body(raw) {
            return match RegexBuilder::new(inner).case_insensitive(true).build() {
                Ok(re) => CompiledPattern::Explicit(re),
                Err(e) => {
                    debug!("Rejecting malformed regex pattern '{}': {}", raw, e);
                    CompiledPattern::Invalid
                }
            };
        }

        if !raw.contains(['*', '?']) {
            return CompiledPattern::Literal(raw.to_lowercase());
        }

        let mut rx = String::with_capacity(raw.len() + 8);
        rx.push('^');
        let mut buf = [0u8; 4];
        for ch in raw.chars() {
            match ch {
                '*' => rx.push_str(".*"),
                '?' => rx.push('.'),
                _ => rx.push_str(&regex::escape(ch.encode_utf8(&mut buf))),
            }
        }
        rx.push('$');
        match RegexBuilder::new(&rx).case_insensitive(true).build() {
            Ok(re) => CompiledPattern::Glob(re),
            Err(e) => {
                debug!("Rejecting untranslatable glob '{}': {}", raw, e);
                CompiledPattern::Invalid
            }
        }
    }

    /// Whether `target` satisfies the pattern.
    pub fn matches(&self, target: &str) -> bool {
        match self {
            CompiledPattern::MatchAll => true,
            CompiledPattern::Literal(needle) => target.to_lowercase().contains(needle),
            CompiledPattern::Glob(re) => re.is_match(target),
            CompiledPattern::Explicit(re) => re.is_match(target),
            CompiledPattern::Invalid => false,
        }
    }

    /// The wildcard-stripped remainder of the pattern, used as the coarse
    /// storage-level prefilter substring. Explicit regexes contribute no
    /// core literal (regex metacharacters would poison a LIKE filter), and
    /// an empty result means "no substring restriction".
    pub fn core_literal(raw: &str) -> String {
        let raw = raw.trim();
        if explicit_regex_body(raw).is_some() {
            return String::new();
        }
        raw.chars()
            .filter(|c| *c != '*' && *c != '?')
            .collect::<String>()
            .trim()
            .to_string()
    }
}

fn explicit_regex_body(raw: &str) -> Option<&str> {
    if raw.len() >= 2 && raw.starts_with('/') && raw.ends_with('/') {
        Some(&raw[1..raw.len() - 1])
    } else {
        None
    }
}
