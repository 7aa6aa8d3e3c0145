//! Dispatch-scoped router context.
//!
//! One [`Router`] is created per dispatch and threaded through the before hook,
//! wildcard validation and dynamic destinations. It collects everything a
//! request produces besides the outcome itself: the selected template, exported
//! globals, template variables, response headers and status.

use crate::lookup::Lookup;
use crate::{CallbackResult, TemplateRef};
use serde::Serialize;
use std::collections::BTreeMap;

/// Template globals exported by a dispatch (`route_N`, `route_N_<column>`, ...).
pub type Globals = BTreeMap<String, String>;

/// Highest `route_N` index that exists (blank) on every dispatch; `route_0` is the lowest.
pub const MAX_DEFAULT_ROUTE_GLOBAL: usize = 10;

pub const DEFAULT_CHARSET: &str = "UTF-8";

/// A value handed to the template layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Variable {
    Scalar(String),
    List(Vec<String>),
    Rows(Vec<BTreeMap<String, String>>),
}

impl Variable {
    pub fn is_empty(&self) -> bool {
        match self {
            Variable::Scalar(s) => s.is_empty(),
            Variable::List(items) => items.is_empty(),
            Variable::Rows(rows) => rows.is_empty(),
        }
    }

    /// Render against template tag data.
    ///
    /// Scalars ignore `tagdata`; lists repeat it with `{value}` substituted;
    /// rows repeat it with every `{column}` substituted. Empty variables yield
    /// `None` so the caller can show its "no results" branch.
    pub fn render(&self, tagdata: &str) -> Option<String> {
        if self.is_empty() {
            return None;
        }

        let out = match self {
            Variable::Scalar(s) => s.clone(),
            Variable::List(items) => items.iter().map(|item| tagdata.replace("{value}", item)).collect(),
            Variable::Rows(rows) => rows
                .iter()
                .map(|row| row.iter().fold(tagdata.to_string(), |acc, (k, v)| acc.replace(&format!("{{{k}}}"), v)))
                .collect(),
        };
        Some(out)
    }
}

impl From<&str> for Variable {
    fn from(value: &str) -> Self {
        Variable::Scalar(value.to_string())
    }
}

impl From<String> for Variable {
    fn from(value: String) -> Self {
        Variable::Scalar(value)
    }
}

impl From<Vec<String>> for Variable {
    fn from(items: Vec<String>) -> Self {
        Variable::List(items)
    }
}

impl From<Vec<BTreeMap<String, String>>> for Variable {
    fn from(rows: Vec<BTreeMap<String, String>>) -> Self {
        Variable::Rows(rows)
    }
}

/// Host output type; decides the content type of an emitted body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputType {
    #[default]
    Webpage,
    Css,
    Js,
    Json,
    Xml,
    Feed,
    NotFound,
}

/// A body to emit immediately, bypassing template rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: u16,
    pub headers: BTreeMap<String, String>,
    pub content_type: Option<String>,
    pub body: String,
}

/// Mutable per-dispatch context.
pub struct Router<'a> {
    pub(crate) uri: String,
    pub(crate) is_page: bool,
    pub(crate) template: Option<TemplateRef>,
    pub(crate) globals: Globals,
    pub(crate) variables: BTreeMap<String, Variable>,
    pub(crate) headers: BTreeMap<String, String>,
    pub(crate) status: Option<u16>,
    pub(crate) content_type: Option<String>,
    pub(crate) output_type: OutputType,
    pub(crate) redirect: Option<String>,
    pub(crate) not_found: bool,
    pub(crate) charset: String,
    pub(crate) lookups: usize,
    lookup: &'a dyn Lookup,
}

impl std::fmt::Debug for Router<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Router")
            .field("uri", &self.uri)
            .field("is_page", &self.is_page)
            .field("template", &self.template)
            .field("status", &self.status)
            .field("lookup", &"<lookup>")
            .finish()
    }
}

impl<'a> Router<'a> {
    /// Create a context for `uri` (trailing `/` trimmed) with `route_0`..`route_10` blank.
    pub fn new(uri: &str, lookup: &'a dyn Lookup) -> Self {
        let globals = (0..=MAX_DEFAULT_ROUTE_GLOBAL).map(|i| (format!("route_{i}"), String::new())).collect();

        Self {
            uri: uri.trim_end_matches('/').to_string(),
            is_page: false,
            template: None,
            globals,
            variables: BTreeMap::new(),
            headers: BTreeMap::new(),
            status: None,
            content_type: None,
            output_type: OutputType::default(),
            redirect: None,
            not_found: false,
            charset: DEFAULT_CHARSET.to_string(),
            lookups: 0,
            lookup,
        }
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// Replace the path that rules are matched against (from a before hook).
    pub fn set_uri(&mut self, uri: &str) {
        self.uri = uri.trim_end_matches('/').to_string();
    }

    /// Whether the request path is exactly a reserved page path.
    pub fn is_page(&self) -> bool {
        self.is_page
    }

    pub fn lookup(&self) -> &'a dyn Lookup {
        self.lookup
    }

    /// Number of lookup round trips made so far.
    pub fn lookups(&self) -> usize {
        self.lookups
    }

    pub(crate) fn count_lookup(&mut self) {
        self.lookups += 1;
    }

    // --- Template ---------------------------------------------------------------

    /// Set the destination from a `group/name` descriptor (`name` defaults to `index`).
    pub fn set_template(&mut self, descriptor: &str) -> &mut Self {
        self.template = Some(TemplateRef::parse(descriptor));
        self
    }

    pub fn set_template_pair(&mut self, group: &str, name: &str) -> &mut Self {
        self.template = Some(TemplateRef::new(group, name));
        self
    }

    pub fn template(&self) -> Option<&TemplateRef> {
        self.template.as_ref()
    }

    pub fn has_template(&self) -> bool {
        self.template.as_ref().is_some_and(TemplateRef::is_set)
    }

    /// A template is set and the path is not a reserved page path.
    pub fn is_routable(&self) -> bool {
        self.has_template() && !self.is_page
    }

    // --- Template layer exports -----------------------------------------------

    pub fn set_global(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.globals.insert(key.into(), value.into());
        self
    }

    pub fn global(&self, key: &str) -> Option<&str> {
        self.globals.get(key).map(String::as_str)
    }

    pub fn globals(&self) -> &Globals {
        &self.globals
    }

    pub fn set_variable(&mut self, name: impl Into<String>, value: impl Into<Variable>) -> &mut Self {
        self.variables.insert(name.into(), value.into());
        self
    }

    pub fn variable(&self, name: &str) -> Option<&Variable> {
        self.variables.get(name)
    }

    // --- Response ---------------------------------------------------------------

    pub fn set_header(&mut self, name: &str, value: &str) -> &mut Self {
        if name.eq_ignore_ascii_case("Content-Type") {
            self.content_type = Some(value.to_string());
        } else {
            self.headers.insert(name.to_string(), value.to_string());
        }
        self
    }

    /// Set a header from a full `Name: value` line. Lines without a colon are ignored.
    pub fn set_raw_header(&mut self, line: &str) -> &mut Self {
        if let Some((name, value)) = line.split_once(':') {
            self.set_header(name.trim(), value.trim());
        }
        self
    }

    pub fn set_content_type(&mut self, content_type: &str) -> &mut Self {
        self.set_header("Content-Type", content_type)
    }

    pub fn set_http_status(&mut self, code: u16) -> &mut Self {
        self.status = Some(code);
        self
    }

    pub fn set_output_type(&mut self, output_type: OutputType) -> &mut Self {
        self.output_type = output_type;
        self
    }

    /// Redirect to `url` and stop routing.
    ///
    /// URLs not starting with `/`, `.` or a scheme are treated as site
    /// template paths.
    pub fn redirect(&mut self, url: &str, status: u16) -> CallbackResult {
        let is_url = crate::regex!(r"^(/|\.|[a-z]+://)").is_match(url);
        let location = if is_url { url.to_string() } else { format!("/{url}") };
        self.status = Some(status);
        self.redirect = Some(location);
        Ok(None)
    }

    /// Serialize `data` as a JSON body with a 200 status.
    pub fn json<T: Serialize + ?Sized>(&mut self, data: &T) -> CallbackResult {
        let body = serde_json::to_string(data)?;
        self.status = Some(200);
        self.set_content_type("application/json");
        Ok(Some(body))
    }

    /// Hand the request to the host's 404 template and stop routing.
    pub fn set_404(&mut self) -> &mut Self {
        self.not_found = true;
        self.status = Some(404);
        self
    }

    pub(crate) fn is_redirecting(&self) -> bool {
        self.redirect.is_some()
    }

    /// Build the emission directive for `body`.
    pub(crate) fn response(&self, body: String) -> Response {
        let mut headers = self.headers.clone();
        let mut body = body;

        if let Some(location) = &self.redirect {
            headers.insert("Location".to_string(), location.clone());
        }

        let content_type = match (&self.content_type, self.output_type) {
            (Some(explicit), _) => Some(explicit.clone()),
            (None, OutputType::Webpage) => Some(format!("text/html; charset={}", self.charset)),
            (None, OutputType::Json) => Some("application/json".to_string()),
            (None, OutputType::Css) => Some("text/css".to_string()),
            (None, OutputType::Js) => Some("text/javascript".to_string()),
            (None, OutputType::Xml) => {
                body = body.trim().to_string();
                Some("text/xml".to_string())
            }
            (None, OutputType::Feed | OutputType::NotFound) => None,
        };

        Response { status: self.status.unwrap_or(200), headers, content_type, body }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lookup::MemoryLookup;

    #[test]
    fn new_router_blanks_route_globals() {
        let lookup = MemoryLookup::new();
        let router = Router::new("blog/", &lookup);
        assert_eq!(router.uri(), "blog");
        for i in 0..=10 {
            assert_eq!(router.global(&format!("route_{i}")), Some(""));
        }
        assert_eq!(router.global("route_11"), None);
    }

    #[test]
    fn template_descriptor_defaults_name_to_index() {
        let lookup = MemoryLookup::new();
        let mut router = Router::new("", &lookup);
        router.set_template("/blog/");
        assert_eq!(router.template(), Some(&TemplateRef::new("blog", "index")));
        assert!(router.is_routable());

        router.is_page = true;
        assert!(router.has_template());
        assert!(!router.is_routable());
    }

    #[test]
    fn content_type_follows_output_type_unless_explicit() {
        let lookup = MemoryLookup::new();
        let mut router = Router::new("", &lookup);
        router.charset = "ISO-8859-1".to_string();

        let html = router.response("<p>hi</p>".into());
        assert_eq!(html.content_type.as_deref(), Some("text/html; charset=ISO-8859-1"));
        assert_eq!(html.status, 200);

        router.set_output_type(OutputType::Xml);
        let xml = router.response("  <a/>\n".into());
        assert_eq!(xml.content_type.as_deref(), Some("text/xml"));
        assert_eq!(xml.body, "<a/>");

        router.set_raw_header("Content-Type: text/plain").set_http_status(201);
        let plain = router.response("ok".into());
        assert_eq!(plain.content_type.as_deref(), Some("text/plain"));
        assert_eq!(plain.status, 201);
    }

    #[test]
    fn redirect_prefixes_template_paths() {
        let lookup = MemoryLookup::new();
        let mut router = Router::new("", &lookup);
        assert_eq!(router.redirect("blog/archive", 301).unwrap(), None);
        let response = router.response(String::new());
        assert_eq!(response.status, 301);
        assert_eq!(response.headers.get("Location").map(String::as_str), Some("/blog/archive"));

        router.redirect("https://example.com/x", 302).unwrap();
        assert_eq!(router.redirect.as_deref(), Some("https://example.com/x"));
    }

    #[test]
    fn json_sets_status_and_content_type() {
        let lookup = MemoryLookup::new();
        let mut router = Router::new("", &lookup);
        let body = router.json(&serde_json::json!({"ok": true})).unwrap();
        assert_eq!(body.as_deref(), Some(r#"{"ok":true}"#));
        assert_eq!(router.content_type.as_deref(), Some("application/json"));
    }

    #[test]
    fn variables_render_by_shape() {
        assert_eq!(Variable::from("x").render("ignored").as_deref(), Some("x"));
        assert_eq!(Variable::List(vec![]).render("{value}"), None);

        let list = Variable::List(vec!["a".into(), "b".into()]);
        assert_eq!(list.render("{value}|").as_deref(), Some("a|b|"));

        let rows = Variable::Rows(vec![
            BTreeMap::from([("bar".to_string(), "1".to_string()), ("baz".to_string(), "2".to_string())]),
            BTreeMap::from([("bar".to_string(), "3".to_string()), ("baz".to_string(), "4".to_string())]),
        ]);
        assert_eq!(rows.render("{bar}-{baz}|").as_deref(), Some("1-2|3-4|"));
    }
}
