use crate::engine::{DispatchMetrics, Matcher, RouteTable};
use crate::error::Result;
use crate::lookup::Lookup;
use crate::router::{Globals, Response, Router, Variable};
use crate::wildcard::Wildcard;
use crate::TemplateRef;
use std::collections::BTreeMap;

/// What the host should do with the request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Render this template.
    Template(TemplateRef),
    /// Emit this response now, skipping template rendering.
    Emit(Response),
    /// Render the host's 404 template.
    NotFound,
    /// No rule applies (or the path is a reserved page path); use default handling.
    NotRoutable,
}

impl Outcome {
    pub fn is_routable(&self) -> bool {
        !matches!(self, Outcome::NotRoutable)
    }

    pub fn template(&self) -> Option<&TemplateRef> {
        match self {
            Outcome::Template(t) => Some(t),
            _ => None,
        }
    }
}

/// Result of [`dispatch`].
///
/// Besides the [`Outcome`] this carries every side-channel output the template
/// layer consumes. Globals always contain `route_0` through `route_10`.
#[derive(Debug, Clone, PartialEq)]
pub struct Dispatch {
    pub outcome: Outcome,
    /// Path the rules were matched against (after the before hook).
    pub uri: String,
    /// The request path is exactly a reserved page path.
    pub is_page: bool,
    pub globals: Globals,
    pub variables: BTreeMap<String, Variable>,
    pub headers: BTreeMap<String, String>,
    pub status: Option<u16>,
    /// Tokens of the rule that produced the outcome.
    pub wildcards: Vec<Wildcard>,
    /// Dynamic tail of the path after the winning rule's literal prefix.
    pub query_string: Option<String>,
    /// Set when capture #1 names a reserved page path, so the host can
    /// initialise its page tree as if that page had been requested.
    pub virtual_page_uri: Option<String>,
}

impl Dispatch {
    pub(crate) fn from_router(router: Router<'_>, outcome: Outcome, wildcards: Vec<Wildcard>) -> Self {
        Self {
            outcome,
            uri: router.uri,
            is_page: router.is_page,
            globals: router.globals,
            variables: router.variables,
            headers: router.headers,
            status: router.status,
            wildcards,
            query_string: None,
            virtual_page_uri: None,
        }
    }

    pub fn global(&self, key: &str) -> Option<&str> {
        self.globals.get(key).map(String::as_str)
    }

    /// Token at 1-based `index`.
    pub fn wildcard(&self, index: usize) -> Option<&Wildcard> {
        self.wildcards.iter().find(|w| w.index() == index)
    }
}

/// Result from [`dispatch_verbose`].
#[derive(Debug, Clone)]
pub struct DispatchVerbose {
    pub dispatch: Dispatch,
    pub metrics: DispatchMetrics,
}

/// Route `path` through `table`, validating captures against `lookup`.
///
/// # Example
/// ```
/// use resource_router::{MemoryLookup, Outcome, RouteTable, dispatch};
///
/// let mut table = RouteTable::new();
/// table.add("about", "site/about").unwrap();
///
/// let out = dispatch("about/", &table, &MemoryLookup::new()).unwrap();
/// assert_eq!(out.outcome.template().map(|t| t.to_string()).as_deref(), Some("site/about"));
///
/// let miss = dispatch("contact", &table, &MemoryLookup::new()).unwrap();
/// assert_eq!(miss.outcome, Outcome::NotRoutable);
/// ```
pub fn dispatch(path: &str, table: &RouteTable, lookup: &dyn Lookup) -> Result<Dispatch> {
    Matcher::new(table).run(path, lookup).map(|run| run.dispatch)
}

/// [`dispatch`] plus a per-rule trace and timings.
pub fn dispatch_verbose(path: &str, table: &RouteTable, lookup: &dyn Lookup) -> Result<DispatchVerbose> {
    let run = Matcher::new(table).run(path, lookup)?;
    Ok(DispatchVerbose { dispatch: run.dispatch, metrics: run.metrics })
}
