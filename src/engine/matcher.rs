//! Rule evaluation and dispatch.
//!
//! The matcher walks a [`RouteTable`] in declaration order against one request
//! path and produces a [`Dispatch`]:
//!
//! ```text
//! path ─ trim '/' ─ is_page? ─ before hook ─┐
//!                                           v
//!          for each rule (declaration order):
//!            regex match?            no  -> NoMatch, next rule
//!            build tokens (:all fans out into :any tokens)
//!            template destination:
//!              validate every token  any invalid -> Rejected, next rule
//!              set template
//!            dynamic destination:
//!              call(router, tokens)
//!                set_404()           -> NotFound  (stop)
//!                body / redirect     -> Emitted   (stop)
//!            template set?           yes -> Selected (stop)
//!                                    no  -> Declined, next rule
//!                                           │
//!                                           v
//!          query remainder, virtual page uri, route_N globals, $N substitution
//!          reserved page path or no template -> NotRoutable
//! ```
//!
//! Tokens are rebuilt for every matching rule and dropped when the rule is
//! rejected or declines, so nothing from an earlier rule reaches a later one.

use super::compiler::CompiledPattern;
use super::metrics::{DispatchMetrics, RunResult, Verdict};
use super::resolve::{export_tokens, query_remainder, substitute};
use super::route_table::{Route, RouteTable};
use crate::api::{Dispatch, Outcome};
use crate::error::Result;
use crate::lookup::{Lookup, Where};
use crate::router::Router;
use crate::wildcard::{Wildcard, WildcardKind};
use crate::Destination;
use std::time::Instant;

/// Runs one dispatch against a borrowed route table.
#[derive(Debug)]
pub struct Matcher<'t> {
    table: &'t RouteTable,
}

impl<'t> Matcher<'t> {
    pub fn new(table: &'t RouteTable) -> Self {
        Self { table }
    }

    /// Dispatch `path`, collecting metrics along the way.
    pub fn run(&self, path: &str, lookup: &dyn Lookup) -> Result<RunResult> {
        let start = Instant::now();
        let mut metrics = DispatchMetrics::default();

        let mut router = Router::new(path, lookup);
        router.charset = self.table.charset().to_string();
        router.is_page = self.table.pages().contains_uri(&format!("/{}", router.uri));

        if let Some(hook) = self.table.before_hook() {
            let hook_start = Instant::now();
            hook(&mut router)?;
            metrics.before_hook = hook_start.elapsed();
            tracing::trace!(uri = %router.uri, template = ?router.template, "before hook ran");

            if router.not_found {
                tracing::debug!(uri = %router.uri, "before hook requested 404");
                return Ok(finish(router, Outcome::NotFound, Vec::new(), metrics, start));
            }
            if router.is_redirecting() {
                tracing::debug!(redirect = ?router.redirect, "before hook redirected");
                let response = router.response(String::new());
                return Ok(finish(router, Outcome::Emit(response), Vec::new(), metrics, start));
            }
        }

        let mut selected: Option<(&Route, Vec<Wildcard>)> = None;

        for route in self.table.routes() {
            let regex = route.pattern.regex();
            let mut tokens = match regex.captures(&router.uri) {
                Some(caps) => build_tokens(&route.pattern, &caps),
                None => {
                    metrics.record(route.rule(), regex.as_str(), Verdict::NoMatch);
                    continue;
                }
            };
            tracing::trace!(rule = route.rule(), tokens = tokens.len(), "rule matched");

            let verdict = match &route.destination {
                Destination::Template(template) => {
                    if route.pattern.needs_lookup() && !validate(&mut router, &mut tokens)? {
                        tracing::debug!(rule = route.rule(), uri = %router.uri, "rule rejected by validation");
                        Verdict::Rejected
                    } else {
                        router.template = Some(template.clone());
                        if router.has_template() { Verdict::Selected } else { Verdict::Declined }
                    }
                }
                Destination::Dynamic(callback) => {
                    let body = callback(&mut router, tokens.as_mut_slice())?.filter(|b| !b.is_empty());

                    if router.not_found {
                        metrics.record(route.rule(), regex.as_str(), Verdict::NotFound);
                        tracing::debug!(rule = route.rule(), "callback requested 404");
                        return Ok(finish(router, Outcome::NotFound, tokens, metrics, start));
                    }

                    if body.is_some() || router.is_redirecting() {
                        metrics.record(route.rule(), regex.as_str(), Verdict::Emitted);
                        tracing::debug!(rule = route.rule(), redirect = ?router.redirect, "callback emitted response");
                        let response = router.response(body.unwrap_or_default());
                        return Ok(finish(router, Outcome::Emit(response), tokens, metrics, start));
                    }

                    if router.has_template() { Verdict::Selected } else { Verdict::Declined }
                }
            };

            metrics.record(route.rule(), regex.as_str(), verdict);
            if verdict == Verdict::Selected {
                selected = Some((route, tokens));
                break;
            }
        }

        let mut query_string = None;
        let mut virtual_page_uri = None;
        let mut tokens = Vec::new();

        if let Some((route, matched)) = selected {
            if route.pattern.has_wildcard() {
                query_string = query_remainder(&route.pattern, &router.uri);
            }
            if !router.is_page {
                virtual_page_uri = first_token_page_uri(&matched, self.table);
            }
            tokens = matched;
        }

        if router.has_template() {
            export_tokens(&mut router, &tokens);
            if let Some(template) = router.template.as_mut() {
                template.group = substitute(&template.group, &tokens);
                template.name = substitute(&template.name, &tokens);
            }
        }

        let outcome = match router.template.clone() {
            Some(template) if router.is_routable() => {
                tracing::debug!(uri = %router.uri, %template, "template selected");
                Outcome::Template(template)
            }
            Some(_) if router.is_page => {
                tracing::debug!(uri = %router.uri, "reserved page path, deferring to host");
                Outcome::NotRoutable
            }
            _ => Outcome::NotRoutable,
        };

        let mut result = finish(router, outcome, tokens, metrics, start);
        result.dispatch.query_string = query_string;
        result.dispatch.virtual_page_uri = virtual_page_uri;
        Ok(result)
    }
}

/// One token per capture position; a `:all` capture fans out into `:any` tokens.
fn build_tokens(pattern: &CompiledPattern, caps: &regex::Captures<'_>) -> Vec<Wildcard> {
    let mut tokens: Vec<Wildcard> = Vec::with_capacity(caps.len());

    for position in 1..caps.len() {
        let value = caps.get(position).map(|m| m.as_str().trim_matches('/')).filter(|v| !v.is_empty());

        match (pattern.capture_type(position), value) {
            (Some(WildcardKind::All), Some(rest)) => {
                for segment in rest.split('/') {
                    let index = tokens.len() + 1;
                    tokens.push(Wildcard::new(index, Some(segment.to_string()), Some(WildcardKind::Any)));
                }
            }
            (Some(WildcardKind::All), None) => {
                tokens.push(Wildcard::new(tokens.len() + 1, None, Some(WildcardKind::Any)));
            }
            (kind, value) => {
                tokens.push(Wildcard::new(tokens.len() + 1, value.map(str::to_string), kind));
            }
        }
    }

    tokens
}

/// Validate every token. All tokens are checked even after a failure so
/// each one carries its lookup metadata.
///
/// Globals exported during validation are rolled back when the rule is
/// rejected, so a later rule never sees another rule's row columns.
fn validate(router: &mut Router<'_>, tokens: &mut [Wildcard]) -> Result<bool> {
    let saved = router.globals.clone();
    let mut valid = true;
    for token in tokens.iter_mut() {
        if !token.is_valid(router, Where::new())? {
            tracing::trace!(index = token.index(), value = %token, kind = ?token.kind(), "token failed validation");
            valid = false;
        }
    }
    if !valid {
        router.globals = saved;
    }
    Ok(valid)
}

/// The first capture, when it names a reserved page path.
fn first_token_page_uri(tokens: &[Wildcard], table: &RouteTable) -> Option<String> {
    let first = tokens.first().filter(|t| t.index() == 1)?.value()?;
    let uri = format!("/{first}");
    table.pages().contains_uri(&uri).then_some(uri)
}

fn finish(
    router: Router<'_>,
    outcome: Outcome,
    tokens: Vec<Wildcard>,
    mut metrics: DispatchMetrics,
    start: Instant,
) -> RunResult {
    metrics.lookups = router.lookups();
    metrics.total = start.elapsed();
    RunResult { dispatch: Dispatch::from_router(router, outcome, tokens), metrics }
}
