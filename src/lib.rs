//! # resource-router
//!
//! A route-matching engine for CMS-style template routing. Declarative rules
//! such as `blog/:url_title` or `archive/:year/:month/:pagination` are compiled
//! to anchored regular expressions, a request path is evaluated against them
//! in declaration order (first match wins), typed captures are validated
//! against the host's data store, and the winning rule resolves to a template,
//! an immediate response body, or "not routable".
//!
//! ```
//! use resource_router::{MemoryLookup, Outcome, RouteTable, TemplateRef, dispatch};
//!
//! let mut table = RouteTable::new();
//! table.add("products/:any", "catalog/$1").unwrap();
//!
//! let lookup = MemoryLookup::new();
//! let out = dispatch("products/widgets", &table, &lookup).unwrap();
//! assert_eq!(out.outcome, Outcome::Template(TemplateRef::new("catalog", "widgets")));
//! assert_eq!(out.globals["route_1"], "widgets");
//! ```
//!
//! The engine knows nothing about any particular CMS: data-store checks go
//! through the [`Lookup`] trait and everything the template layer consumes is
//! returned in [`Dispatch`].

use std::fmt;
use std::sync::Arc;

#[macro_use]
mod macros;
mod api;
mod config;
mod engine;
mod error;
mod lookup;
mod router;
mod wildcard;

pub use api::{Dispatch, DispatchVerbose, Outcome, dispatch, dispatch_verbose};
pub use config::{RouteConfig, RouterConfig};
pub use engine::{
    CategoryConfig, CompiledPattern, DispatchMetrics, PageUris, Route, RouteTable, RuleTrace, Verdict, compile,
};
pub use error::{Error, Result};
pub use lookup::{
    CATEGORY_COLUMNS, Constraint, ENTRY_COLUMNS, Lookup, LookupError, MEMBER_COLUMNS, MemoryLookup, Row, Where,
};
pub use router::{Globals, OutputType, Response, Router, Variable};
pub use wildcard::{Comparison, Wildcard, WildcardKind, WildcardSet};

// --- Destinations -----------------------------------------------------------

/// A `group/name` template pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TemplateRef {
    pub group: String,
    pub name: String,
}

impl TemplateRef {
    pub fn new(group: impl Into<String>, name: impl Into<String>) -> Self {
        Self { group: group.into(), name: name.into() }
    }

    /// Parse `group/name`; a missing name defaults to `index`.
    pub fn parse(descriptor: &str) -> Self {
        let mut parts = descriptor.trim_matches('/').split('/');
        let group = parts.next().unwrap_or_default();
        let name = parts.next().unwrap_or("index");
        Self::new(group, name)
    }

    /// Both halves are non-empty.
    pub fn is_set(&self) -> bool {
        !self.group.is_empty() && !self.name.is_empty()
    }
}

impl fmt::Display for TemplateRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.group, self.name)
    }
}

/// Return value of a dynamic destination: a non-empty body short-circuits
/// dispatch and is emitted immediately.
pub type CallbackResult = Result<Option<String>>;

/// A dynamic destination. Receives the router context and the rule's tokens.
pub type Callback = Arc<dyn Fn(&mut Router<'_>, &mut [Wildcard]) -> CallbackResult + Send + Sync>;

/// Runs once per dispatch before any rule is evaluated.
pub type BeforeHook = Arc<dyn Fn(&mut Router<'_>) -> Result<()> + Send + Sync>;

/// Where a matching rule sends the request.
#[derive(Clone)]
pub enum Destination {
    /// A template; `$N` placeholders are replaced by capture values.
    Template(TemplateRef),
    /// A callback that sets the template itself or returns a body.
    Dynamic(Callback),
}

impl Destination {
    pub fn dynamic<F>(callback: F) -> Self
    where
        F: Fn(&mut Router<'_>, &mut [Wildcard]) -> CallbackResult + Send + Sync + 'static,
    {
        Destination::Dynamic(Arc::new(callback))
    }

    pub fn is_dynamic(&self) -> bool {
        matches!(self, Destination::Dynamic(_))
    }
}

impl fmt::Debug for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Destination::Template(t) => f.debug_tuple("Template").field(t).finish(),
            Destination::Dynamic(_) => f.write_str("Dynamic(<callback>)"),
        }
    }
}

impl From<&str> for Destination {
    fn from(descriptor: &str) -> Self {
        Destination::Template(TemplateRef::parse(descriptor))
    }
}

impl From<String> for Destination {
    fn from(descriptor: String) -> Self {
        Destination::from(descriptor.as_str())
    }
}

impl From<(&str, &str)> for Destination {
    fn from((group, name): (&str, &str)) -> Self {
        Destination::Template(TemplateRef::new(group, name))
    }
}

impl From<TemplateRef> for Destination {
    fn from(template: TemplateRef) -> Self {
        Destination::Template(template)
    }
}
