//! Route compilation and matching engine.
//!
//! The engine is split into focused submodules under `src/engine/`; this file
//! wires them together and re-exports the public types.
//!
//! ## How the parts work together
//!
//! ```text
//! rules (declared order) ──┐
//!                          │  compile                (compiler.rs)
//!                          │    - trim, :page:N substitution
//!                          │    - token scan -> capture kinds
//!                          │    - anchored regex
//!                          v
//!                    RouteTable                      (route_table.rs)
//!                          │
//! path ────────────────────┼─ Matcher::run           (matcher.rs)
//!                          │    - before hook
//!                          │    - first match wins
//!                          │    - tokens + validation via Lookup
//!                          │    - dynamic destinations
//!                          v
//!                    export + substitute             (resolve.rs)
//!                          │
//!                          v
//!                  Dispatch (+ DispatchMetrics)      (metrics.rs)
//! ```
//!
//! ## Responsibilities by module
//!
//! - `compiler.rs`: turns one rule string into a [`CompiledPattern`].
//! - `route_table.rs`: ordered rules plus page URIs and category settings.
//! - `matcher.rs`: evaluates a path against the table.
//! - `resolve.rs`: `$N` substitution, `route_N` export, query remainder.
//! - `metrics.rs`: per-rule trace and timings for `dispatch_verbose`.
//!
//! ## Debugging
//!
//! Run with `RUST_LOG=resource_router=trace` to see compile and match traces.

#[path = "engine/compiler.rs"]
mod compiler;
#[path = "engine/matcher.rs"]
mod matcher;
#[path = "engine/metrics.rs"]
mod metrics;
#[path = "engine/resolve.rs"]
mod resolve;
#[path = "engine/route_table.rs"]
mod route_table;


pub use compiler::{CompiledPattern, compile};
pub use matcher::Matcher;
pub use metrics::{DispatchMetrics, RuleTrace, Verdict};
pub use route_table::{CategoryConfig, PageUris, Route, RouteTable};
