//! The ordered rule list.
//!
//! A [`RouteTable`] owns compiled rules in declaration order together with the
//! settings the compiler depends on (page URIs and the category segment). Rules
//! are compiled eagerly in [`RouteTable::add`]; a bad pattern is reported there
//! rather than on the first request that reaches it.
//!
//! The table is immutable during dispatch and can be shared across threads:
//! destinations and the before hook are `Arc<dyn Fn + Send + Sync>`.

use super::compiler::{CompiledPattern, compile};
use crate::error::Result;
use crate::router::{DEFAULT_CHARSET, Router};
use crate::{BeforeHook, Destination};
use std::collections::BTreeMap;
use std::sync::Arc;

// --- Settings ----------------------------------------------------------------

/// Page id -> URI for pages that own a fixed path.
///
/// Used both for `:page:N` substitution in rules and to flag requests for
/// reserved paths as not routable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageUris(BTreeMap<u32, String>);

impl PageUris {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: u32, uri: impl Into<String>) {
        self.0.insert(id, uri.into());
    }

    pub fn get(&self, id: u32) -> Option<&str> {
        self.0.get(&id).map(String::as_str)
    }

    /// Exact comparison against the stored URIs (no normalization).
    pub fn contains_uri(&self, uri: &str) -> bool {
        self.0.values().any(|u| u == uri)
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, &str)> {
        self.0.iter().map(|(id, uri)| (*id, uri.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<S: Into<String>> FromIterator<(u32, S)> for PageUris {
    fn from_iter<I: IntoIterator<Item = (u32, S)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(id, uri)| (id, uri.into())).collect())
    }
}

/// How the `:category` token is expanded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryConfig {
    /// Literal segment preceding the category value.
    pub reserved_word: String,
    /// Match category names instead of numeric ids.
    pub use_name: bool,
}

impl Default for CategoryConfig {
    fn default() -> Self {
        Self { reserved_word: "category".to_string(), use_name: false }
    }
}

// --- Table -------------------------------------------------------------------

/// A compiled rule and where it sends matching requests.
#[derive(Debug, Clone)]
pub struct Route {
    rule: String,
    pub pattern: CompiledPattern,
    pub destination: Destination,
}

impl Route {
    /// The rule as declared.
    pub fn rule(&self) -> &str {
        &self.rule
    }
}

#[derive(Clone, Default)]
pub struct RouteTable {
    routes: Vec<Route>,
    before: Option<BeforeHook>,
    pages: PageUris,
    category: CategoryConfig,
    charset: Option<String>,
}

impl std::fmt::Debug for RouteTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouteTable")
            .field("routes", &self.routes)
            .field("before", &self.before.as_ref().map(|_| "<hook>"))
            .field("pages", &self.pages)
            .field("category", &self.category)
            .field("charset", &self.charset)
            .finish()
    }
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_pages(pages: PageUris) -> Self {
        Self { pages, ..Self::default() }
    }

    /// Change the category settings, recompiling rules already added.
    pub fn with_category(mut self, category: CategoryConfig) -> Result<Self> {
        self.category = category;
        self.routes = self
            .routes
            .into_iter()
            .map(|route| {
                let pattern = compile(&route.rule, &self.pages, &self.category)?;
                Ok(Route { pattern, ..route })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(self)
    }

    /// Charset used for the default `text/html` content type of emitted bodies.
    pub fn with_charset(mut self, charset: impl Into<String>) -> Self {
        self.charset = Some(charset.into());
        self
    }

    /// Append a rule. Declaration order is evaluation order.
    pub fn add(&mut self, rule: &str, destination: impl Into<Destination>) -> Result<&mut Self> {
        let pattern = compile(rule, &self.pages, &self.category)?;
        tracing::debug!(rule, regex = pattern.regex().as_str(), "route added");
        self.routes.push(Route { rule: rule.to_string(), pattern, destination: destination.into() });
        Ok(self)
    }

    /// Install the hook that runs before any rule is evaluated.
    pub fn before<F>(&mut self, hook: F) -> &mut Self
    where
        F: Fn(&mut Router<'_>) -> Result<()> + Send + Sync + 'static,
    {
        self.before = Some(Arc::new(hook));
        self
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    pub fn pages(&self) -> &PageUris {
        &self.pages
    }

    pub fn category(&self) -> &CategoryConfig {
        &self.category
    }

    pub fn charset(&self) -> &str {
        self.charset.as_deref().unwrap_or(DEFAULT_CHARSET)
    }

    pub(crate) fn before_hook(&self) -> Option<&BeforeHook> {
        self.before.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Error, TemplateRef};

    #[test]
    fn routes_keep_declaration_order() {
        let mut table = RouteTable::new();
        table.add("b", "site/b").unwrap().add("a", "site/a").unwrap();
        let rules: Vec<&str> = table.routes().iter().map(Route::rule).collect();
        assert_eq!(rules, vec!["b", "a"]);
    }

    #[test]
    fn bad_rule_fails_fast_and_leaves_table_unchanged() {
        let mut table = RouteTable::new();
        table.add("ok", "site/ok").unwrap();
        assert!(matches!(table.add("broken/(", "site/x"), Err(Error::Pattern { .. })));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn category_change_recompiles_existing_rules() {
        let mut table = RouteTable::new();
        table.add("blog/:category", "blog/list").unwrap();
        assert!(table.routes()[0].pattern.regex().is_match("blog/category/4"));

        let table = table.with_category(CategoryConfig { reserved_word: "c".into(), use_name: true }).unwrap();
        assert!(table.routes()[0].pattern.regex().is_match("blog/c/rust"));
        let expected = TemplateRef::new("blog", "list");
        assert!(matches!(&table.routes()[0].destination, Destination::Template(t) if *t == expected));
    }

    #[test]
    fn page_uris_compare_exactly() {
        let pages: PageUris = [(1, "/about"), (2, "/contact/")].into_iter().collect();
        assert!(pages.contains_uri("/about"));
        assert!(!pages.contains_uri("/about/"));
        assert!(!pages.contains_uri("/contact"));
        assert_eq!(pages.get(2), Some("/contact/"));
        assert_eq!(RouteTable::with_pages(pages).charset(), "UTF-8");
    }
}
