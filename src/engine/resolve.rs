//! Post-match resolution.
//!
//! Once a rule has produced a template, the remaining steps are pure string
//! work on the request path and the rule's tokens:
//!
//! ```text
//! tokens ──┬─ export_tokens   route_N globals
//!          └─ substitute      "$1" in the template -> token value
//! rule ──── query_remainder   path with the literal prefix removed
//! ```

use super::compiler::CompiledPattern;
use crate::router::Router;
use crate::wildcard::Wildcard;

/// The part of `uri` after the rule's literal prefix.
///
/// Only rules containing a wildcard have a remainder; an empty remainder is
/// reported as `None`.
pub(crate) fn query_remainder(pattern: &CompiledPattern, uri: &str) -> Option<String> {
    let prefix = pattern.literal_prefix()?;
    let rest = uri
        .strip_prefix(prefix.as_str())
        .or_else(|| uri.strip_prefix(prefix.trim_end_matches('/')))
        .unwrap_or(uri);
    let rest = rest.trim_start_matches('/');
    (!rest.is_empty()).then(|| rest.to_string())
}

/// Export every token as `route_<index>`; empty tokens export as blank.
pub(crate) fn export_tokens(router: &mut Router<'_>, tokens: &[Wildcard]) {
    for token in tokens {
        router.set_global(format!("route_{}", token.index()), token.to_string());
    }
}

/// Replace `$N` in `text` with the value of token `N`.
///
/// Highest indices go first so `$1` never eats the prefix of `$10`.
pub(crate) fn substitute(text: &str, tokens: &[Wildcard]) -> String {
    let mut ordered: Vec<&Wildcard> = tokens.iter().collect();
    ordered.sort_by(|a, b| b.index().cmp(&a.index()));

    ordered
        .into_iter()
        .fold(text.to_string(), |acc, token| acc.replace(&format!("${}", token.index()), &token.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{CategoryConfig, PageUris, compile};
    use crate::lookup::MemoryLookup;

    fn tokens(values: &[&str]) -> Vec<Wildcard> {
        values.iter().enumerate().map(|(i, v)| Wildcard::new(i + 1, Some(v.to_string()), None)).collect()
    }

    #[test]
    fn substitution_handles_two_digit_indices() {
        let values: Vec<String> = (1..=10).map(|i| format!("v{i}")).collect();
        let refs: Vec<&str> = values.iter().map(String::as_str).collect();
        let toks = tokens(&refs);
        assert_eq!(substitute("$1-$10", &toks), "v1-v10");
        assert_eq!(substitute("$11", &toks), "v11");
    }

    #[test]
    fn empty_tokens_substitute_as_blank() {
        let toks = vec![Wildcard::new(1, None, None), Wildcard::new(2, Some("x".into()), None)];
        assert_eq!(substitute("a/$1/$2", &toks), "a//x");
    }

    #[test]
    fn remainder_strips_literal_prefix() {
        let pages = PageUris::new();
        let category = CategoryConfig::default();

        let rule = compile("blog/:any/:pagination", &pages, &category).unwrap();
        assert_eq!(query_remainder(&rule, "blog/hello/P10").as_deref(), Some("hello/P10"));

        let bare = compile(":any", &pages, &category).unwrap();
        assert_eq!(query_remainder(&bare, "hello").as_deref(), Some("hello"));

        let literal = compile("about", &pages, &category).unwrap();
        assert_eq!(query_remainder(&literal, "about"), None);

        let docs = compile("docs/:all", &pages, &category).unwrap();
        assert_eq!(query_remainder(&docs, "docs"), None);
    }

    #[test]
    fn exported_globals_use_token_positions() {
        let lookup = MemoryLookup::new();
        let mut router = Router::new("", &lookup);
        export_tokens(&mut router, &[Wildcard::new(1, Some("a".into()), None), Wildcard::new(2, None, None)]);
        assert_eq!(router.global("route_1"), Some("a"));
        assert_eq!(router.global("route_2"), Some(""));
    }
}
