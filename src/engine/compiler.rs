//! Rule compilation.
//!
//! Turns a rule pattern string into an anchored [`Regex`] plus per-capture
//! type metadata. Compilation happens once, when a rule is added to a
//! [`RouteTable`](super::RouteTable); a malformed pattern is reported then and
//! aborts table construction.
//!
//! ## Steps
//!
//! ```text
//! "blog/:page:3/:url_title/"
//!    │ trim trailing '/'
//!    │ :page:N  -> "(<uri of page N>)"         (not a wildcard)
//!    v
//! "blog/(about)/:url_title"
//!    │ scan left to right: wildcard tokens + capturing '(' in order
//!    │   position 1 -> None          (explicit group)
//!    │   position 2 -> url_title
//!    │ expand tokens via the substitution table
//!    v
//! ^(?:blog/(about)/([^/]+))$
//! ```
//!
//! ## Substitution table
//!
//! | token                 | sub-pattern                          |
//! |-----------------------|--------------------------------------|
//! | `:any`                | `([^/]+)`                            |
//! | `:num`                | `([0-9]+)`                           |
//! | `:year`               | `([0-9]{4})`                         |
//! | `:month`, `:day`      | `([0-9]{2})`                         |
//! | `/:pagination`        | `((?:/P[0-9]+)?)`                    |
//! | `/:all`               | `((?:/.*)?)`                         |
//! | `:category`           | `<word>/([^/]+)` or `<word>/([0-9]+)` |
//! | `:entry_id`, `:category_id`, `:member_id` | `([0-9]+)`       |
//! | `:url_title`, `:category_url_title`, `:username` | `([^/]+)` |
//!
//! The leading `/` of `:pagination` and `:all` is optional and, when present,
//! folds into the optional group so `blog/:pagination` also matches `blog`.
//!
//! ## Literal rules
//!
//! A rule with no `:` and no `(` (after page substitution) is escaped and
//! matched for exact equality. Otherwise text outside tokens is handed to the
//! regex engine verbatim, so rules may embed their own sub-patterns.
//!
//! ## Capture numbering
//!
//! Positions follow the opening-parenthesis order of the generated regex:
//! each wildcard token contributes exactly one group, escaped parens and
//! `(?...)` groups (other than named groups) contribute none, and parens
//! inside character classes are ignored.

use super::route_table::{CategoryConfig, PageUris};
use crate::error::{Error, Result};
use crate::wildcard::{WildcardKind, WildcardSet};
use regex::Regex;
use std::collections::BTreeMap;

/// A compiled rule pattern.
#[derive(Debug, Clone)]
pub struct CompiledPattern {
    /// Rule after trailing-slash trim and `:page:N` substitution.
    source: String,
    regex: Regex,
    /// Kind of each capture position; index 0 is position 1.
    capture_types: Vec<Option<WildcardKind>>,
    kinds: WildcardSet,
    /// Byte offset of the first `:` in `source`.
    wildcard_offset: Option<usize>,
}

impl CompiledPattern {
    /// The rule text the regex was built from.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn regex(&self) -> &Regex {
        &self.regex
    }

    /// Kind of the capture at 1-based `position`; `None` for explicit groups.
    pub fn capture_type(&self, position: usize) -> Option<WildcardKind> {
        position.checked_sub(1).and_then(|i| self.capture_types.get(i).copied().flatten())
    }

    /// Position -> kind map for every capture group.
    pub fn capture_types(&self) -> BTreeMap<usize, Option<WildcardKind>> {
        (1..self.regex.captures_len()).map(|p| (p, self.capture_type(p))).collect()
    }

    /// Number of capture groups (excluding the whole match).
    pub fn capture_count(&self) -> usize {
        self.regex.captures_len() - 1
    }

    /// True iff a `:`-prefixed token appears in the rule.
    pub fn has_wildcard(&self) -> bool {
        self.wildcard_offset.is_some()
    }

    pub fn wildcard_offset(&self) -> Option<usize> {
        self.wildcard_offset
    }

    pub fn kinds(&self) -> WildcardSet {
        self.kinds
    }

    /// Whether any capture must be confirmed by a lookup.
    pub fn needs_lookup(&self) -> bool {
        self.kinds.intersects(WildcardSet::LOOKUP)
    }

    /// Fixed text before the first wildcard, grouping parentheses removed.
    pub fn literal_prefix(&self) -> Option<String> {
        let offset = self.wildcard_offset?;
        let prefix: String = self.source[..offset].chars().filter(|c| !matches!(c, '(' | ')')).collect();
        Some(prefix.trim_start_matches('/').to_string())
    }
}

/// Compile `pattern` against the page-URI table and category settings.
pub fn compile(pattern: &str, pages: &PageUris, category: &CategoryConfig) -> Result<CompiledPattern> {
    let trimmed = pattern.trim_end_matches('/');
    let source = substitute_pages(trimmed, pages);
    let wildcard_offset = source.find(':');

    let (body, capture_types) = if wildcard_offset.is_none() && !source.contains('(') {
        (regex::escape(source.trim_matches('/')), Vec::new())
    } else {
        let (expanded, types) = expand(&source, category);
        (expanded.trim_matches('/').to_string(), types)
    };

    let regex = Regex::new(&format!("^(?:{body})$"))
        .map_err(|source| Error::Pattern { pattern: pattern.to_string(), source })?;

    let kinds = capture_types.iter().flatten().fold(WildcardSet::empty(), |acc, k| acc | k.flag());

    tracing::trace!(pattern, regex = regex.as_str(), captures = capture_types.len(), "compiled route rule");

    Ok(CompiledPattern { source, regex, capture_types, kinds, wildcard_offset })
}

/// Replace `:page:N` (optionally parenthesized) with `(<uri>)` for known page ids.
fn substitute_pages(rule: &str, pages: &PageUris) -> String {
    if !rule.contains(":page:") {
        return rule.to_string();
    }

    crate::regex!(r"\(?:page:([0-9]+)\)?")
        .replace_all(rule, |caps: &regex::Captures<'_>| {
            let uri = caps[1].parse::<u32>().ok().and_then(|id| pages.get(id));
            match uri {
                Some(uri) => format!("({})", uri.trim_matches('/')),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

/// Scan `source`, expanding wildcard tokens and recording capture kinds.
fn expand(source: &str, category: &CategoryConfig) -> (String, Vec<Option<WildcardKind>>) {
    // Longer names first so `:category_id` is not read as `:category`.
    let token = crate::regex!(
        r"^(?:/?:(pagination|all)|:(category_url_title|category_id|category|url_title|entry_id|member_id|username|any|num|year|month|day))"
    );

    let mut out = String::with_capacity(source.len() * 2);
    let mut types = Vec::new();
    let mut rest = source;

    while let Some(c) = rest.chars().next() {
        if let Some(caps) = token.captures(rest) {
            let name = caps.get(1).or_else(|| caps.get(2)).map(|m| m.as_str()).unwrap_or_default();
            if let Some(kind) = WildcardKind::from_name(name) {
                out.push_str(&sub_pattern(kind, category));
                types.push(Some(kind));
                rest = &rest[caps[0].len()..];
                continue;
            }
        }

        match c {
            '\\' => {
                let len: usize = rest.chars().take(2).map(char::len_utf8).sum();
                out.push_str(&rest[..len]);
                rest = &rest[len..];
            }
            '[' => {
                let len = class_len(rest);
                out.push_str(&rest[..len]);
                rest = &rest[len..];
            }
            '(' => {
                if opens_capture(rest) {
                    types.push(None);
                }
                out.push('(');
                rest = &rest[1..];
            }
            _ => {
                out.push(c);
                rest = &rest[c.len_utf8()..];
            }
        }
    }

    (out, types)
}

fn sub_pattern(kind: WildcardKind, category: &CategoryConfig) -> String {
    match kind {
        WildcardKind::Any | WildcardKind::UrlTitle | WildcardKind::CategoryUrlTitle | WildcardKind::Username => {
            "([^/]+)".to_string()
        }
        WildcardKind::Num | WildcardKind::EntryId | WildcardKind::CategoryId | WildcardKind::MemberId => {
            "([0-9]+)".to_string()
        }
        WildcardKind::Year => "([0-9]{4})".to_string(),
        WildcardKind::Month | WildcardKind::Day => "([0-9]{2})".to_string(),
        WildcardKind::Pagination => "((?:/P[0-9]+)?)".to_string(),
        WildcardKind::All => "((?:/.*)?)".to_string(),
        WildcardKind::Category => {
            let value = if category.use_name { "([^/]+)" } else { "([0-9]+)" };
            format!("{}/{}", regex::escape(&category.reserved_word), value)
        }
    }
}

/// `(` that starts a capturing group: plain or named, not `(?:`, `(?=`, `(?<=`, ...
fn opens_capture(at_paren: &str) -> bool {
    match at_paren.strip_prefix("(?") {
        None => true,
        Some(flags) => {
            flags.starts_with("P<") || (flags.starts_with('<') && !flags.starts_with("<=") && !flags.starts_with("<!"))
        }
    }
}

/// Byte length of the character class starting at `[` (whole input if unterminated).
fn class_len(at_bracket: &str) -> usize {
    let mut chars = at_bracket.char_indices().skip(1).peekable();

    if let Some((_, '^')) = chars.peek() {
        chars.next();
    }
    if let Some((_, ']')) = chars.peek() {
        chars.next();
    }

    while let Some((i, c)) = chars.next() {
        match c {
            '\\' => {
                chars.next();
            }
            ']' => return i + 1,
            _ => {}
        }
    }
    at_bracket.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compile_default(pattern: &str) -> CompiledPattern {
        compile(pattern, &PageUris::new(), &CategoryConfig::default()).unwrap()
    }

    #[test]
    fn literal_rules_match_exactly() {
        let cases: Vec<(&str, &str, bool)> = vec![
            ("about", "about", true),
            ("about/", "about", true),
            ("about", "about/team", false),
            ("feed.xml", "feed.xml", true),
            ("feed.xml", "feedXxml", false),
            ("a+b", "a+b", true),
            ("", "", true),
        ];

        for (rule, path, expected) in cases {
            let compiled = compile_default(rule);
            assert!(!compiled.has_wildcard(), "{rule}");
            assert_eq!(compiled.regex().is_match(path), expected, "{rule} vs {path}");
        }
    }

    #[test]
    fn wildcards_expand_to_typed_captures() {
        let compiled = compile_default("blog/:year/:month/:day/:url_title/:pagination");
        assert!(compiled.has_wildcard());
        assert_eq!(compiled.capture_count(), 5);
        assert_eq!(compiled.capture_type(1), Some(WildcardKind::Year));
        assert_eq!(compiled.capture_type(4), Some(WildcardKind::UrlTitle));
        assert_eq!(compiled.capture_type(5), Some(WildcardKind::Pagination));
        assert!(compiled.needs_lookup());

        let re = compiled.regex();
        assert!(re.is_match("blog/2024/03/09/hello"));
        assert!(re.is_match("blog/2024/03/09/hello/P20"));
        assert!(!re.is_match("blog/24/03/09/hello"));
        assert!(!re.is_match("blog/2024/3/09/hello"));
    }

    #[test]
    fn num_rejects_non_digits_at_regex_stage() {
        let compiled = compile_default("items/:num");
        assert!(compiled.regex().is_match("items/42"));
        assert!(!compiled.regex().is_match("items/4a"));
        assert!(!compiled.regex().is_match("items/٤٢"));
    }

    #[test]
    fn longest_token_names_win() {
        let compiled = compile_default(":category_url_title/:category_id");
        assert_eq!(compiled.capture_type(1), Some(WildcardKind::CategoryUrlTitle));
        assert_eq!(compiled.capture_type(2), Some(WildcardKind::CategoryId));
    }

    #[test]
    fn explicit_groups_are_untyped_and_numbered_in_order() {
        let compiled = compile_default("(news|blog)/:any/(?:x|y)/([0-9]{3})");
        let types: Vec<Option<WildcardKind>> = compiled.capture_types().into_values().collect();
        assert_eq!(types, vec![None, Some(WildcardKind::Any), None]);
        assert!(compiled.regex().is_match("news/hello/x/123"));

        let classes = compile_default(r"[()]:num/\(:any\)");
        assert_eq!(classes.capture_count(), 2);
        assert_eq!(classes.capture_type(1), Some(WildcardKind::Num));
        assert_eq!(classes.capture_type(2), Some(WildcardKind::Any));
        assert!(classes.regex().is_match("(12/(x)"));
    }

    #[test]
    fn pagination_and_all_absorb_their_slash() {
        let paged = compile_default("blog/:pagination");
        assert!(paged.regex().is_match("blog"));
        assert!(paged.regex().is_match("blog/P10"));
        assert!(!paged.regex().is_match("blog/10"));

        let docs = compile_default("docs/:all");
        assert!(docs.regex().is_match("docs"));
        assert!(docs.regex().is_match("docs/a/b/c"));
        assert_eq!(docs.capture_type(1), Some(WildcardKind::All));
    }

    #[test]
    fn category_token_uses_reserved_word_and_flag() {
        let by_id = compile("blog/:category", &PageUris::new(), &CategoryConfig::default()).unwrap();
        assert!(by_id.regex().is_match("blog/category/12"));
        assert!(!by_id.regex().is_match("blog/category/rust"));

        let by_name = CategoryConfig { reserved_word: "topic".to_string(), use_name: true };
        let named = compile("blog/:category", &PageUris::new(), &by_name).unwrap();
        assert!(named.regex().is_match("blog/topic/rust"));
        assert!(!named.regex().is_match("blog/category/rust"));
    }

    #[test]
    fn page_reference_is_substituted_before_wildcard_detection() {
        let pages: PageUris = [(3, "/about/team/")].into_iter().collect();

        let only_page = compile(":page:3", &pages, &CategoryConfig::default()).unwrap();
        assert_eq!(only_page.as_str(), "(about/team)");
        assert!(!only_page.has_wildcard());
        assert_eq!(only_page.capture_type(1), None);
        assert!(only_page.regex().is_match("about/team"));

        let nested = compile("(:page:3)/:any", &pages, &CategoryConfig::default()).unwrap();
        assert_eq!(nested.as_str(), "(about/team)/:any");
        assert_eq!(nested.wildcard_offset(), Some(13));
        assert_eq!(nested.literal_prefix().as_deref(), Some("about/team/"));
        assert_eq!(nested.capture_type(2), Some(WildcardKind::Any));

        let unknown = compile(":page:9/x", &pages, &CategoryConfig::default()).unwrap();
        assert!(unknown.has_wildcard());
        assert!(!unknown.regex().is_match("about/team/x"));
    }

    #[test]
    fn malformed_patterns_fail_with_the_rule_text() {
        let err = compile("blog/(:any", &PageUris::new(), &CategoryConfig::default()).unwrap_err();
        match err {
            Error::Pattern { pattern, .. } => assert_eq!(pattern, "blog/(:any"),
            other => panic!("unexpected error: {other}"),
        }
    }
}
