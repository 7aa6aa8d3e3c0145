//! File-based route configuration.
//!
//! ```toml
//! charset = "UTF-8"
//! reserved_category_word = "category"
//! use_category_name = false
//!
//! [pages]
//! 3 = "/about"
//!
//! [[routes]]
//! pattern = "blog/:url_title"
//! template = "blog/detail"
//!
//! [[routes]]
//! pattern = ":page:3/:any"
//! template = "about/$2"
//! ```
//!
//! Routes are an array of tables so declaration order survives parsing.
//! Dynamic destinations and the before hook are attached in code after
//! [`RouterConfig::into_table`].

use crate::engine::{CategoryConfig, PageUris, RouteTable};
use crate::error::{Error, Result};
use crate::router::DEFAULT_CHARSET;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RouterConfig {
    pub charset: String,
    pub reserved_category_word: String,
    pub use_category_name: bool,
    /// Page id -> URI. Keys are strings in TOML and must parse as integers.
    pub pages: BTreeMap<String, String>,
    pub routes: Vec<RouteConfig>,
}

impl Default for RouterConfig {
    fn default() -> Self {
        let category = CategoryConfig::default();
        Self {
            charset: DEFAULT_CHARSET.to_string(),
            reserved_category_word: category.reserved_word,
            use_category_name: category.use_name,
            pages: BTreeMap::new(),
            routes: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RouteConfig {
    pub pattern: String,
    /// `group/name` descriptor; may contain `$N` placeholders.
    pub template: String,
}

impl RouterConfig {
    pub fn from_toml_str(source: &str) -> Result<Self> {
        Ok(toml::from_str(source)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let source = std::fs::read_to_string(path)?;
        Self::from_toml_str(&source)
    }

    /// Compile every route. The first malformed pattern aborts construction.
    pub fn into_table(self) -> Result<RouteTable> {
        let pages = self
            .pages
            .iter()
            .map(|(id, uri)| {
                let id = id.trim().parse::<u32>().map_err(|_| Error::InvalidPageId(id.clone()))?;
                Ok((id, uri.clone()))
            })
            .collect::<Result<PageUris>>()?;

        let category = CategoryConfig { reserved_word: self.reserved_category_word, use_name: self.use_category_name };
        let mut table = RouteTable::with_pages(pages).with_category(category)?.with_charset(self.charset);

        for route in &self.routes {
            table.add(&route.pattern, route.template.as_str())?;
        }

        tracing::debug!(routes = table.len(), pages = table.pages().len(), "route table built from config");
        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{MemoryLookup, Outcome, TemplateRef, dispatch};

    const SAMPLE: &str = r#"
        reserved_category_word = "topic"
        use_category_name = true

        [pages]
        3 = "/about"

        [[routes]]
        pattern = "news/:category"
        template = "news/by_topic"

        [[routes]]
        pattern = "products/:any"
        template = "catalog/$1"
    "#;

    #[test]
    fn defaults_apply_to_missing_keys() {
        let config = RouterConfig::from_toml_str("").unwrap();
        assert_eq!(config, RouterConfig::default());
        assert_eq!(config.charset, "UTF-8");
        assert_eq!(config.reserved_category_word, "category");
        assert!(!config.use_category_name);
    }

    #[test]
    fn routes_keep_file_order_and_settings() {
        let table = RouterConfig::from_toml_str(SAMPLE).unwrap().into_table().unwrap();
        let rules: Vec<&str> = table.routes().iter().map(|r| r.rule()).collect();
        assert_eq!(rules, vec!["news/:category", "products/:any"]);
        assert_eq!(table.pages().get(3), Some("/about"));
        assert!(table.category().use_name);

        let out = dispatch("news/topic/rust", &table, &MemoryLookup::new()).unwrap();
        assert_eq!(out.outcome, Outcome::Template(TemplateRef::new("news", "by_topic")));
    }

    #[test]
    fn non_numeric_page_id_is_rejected() {
        let config = RouterConfig::from_toml_str("[pages]\nabout = \"/about\"\n").unwrap();
        assert!(matches!(config.into_table(), Err(Error::InvalidPageId(id)) if id == "about"));
    }

    #[test]
    fn malformed_route_aborts_table_construction() {
        let config = RouterConfig::from_toml_str("[[routes]]\npattern = \"a/(\"\ntemplate = \"x/y\"\n").unwrap();
        assert!(matches!(config.into_table(), Err(Error::Pattern { .. })));
    }

    #[test]
    fn syntax_errors_surface_as_config_errors() {
        assert!(matches!(RouterConfig::from_toml_str("routes = ["), Err(Error::Config(_))));
    }
}
