//! Wildcard kinds and runtime wildcard tokens.
//!
//! A rule such as `blog/:url_title/:pagination` declares typed placeholders.
//! The compiler turns each one into a capture group and records its
//! [`WildcardKind`]; at dispatch time every capture becomes a [`Wildcard`]
//! token carrying its 1-based position, captured value and kind.
//!
//! Kinds backed by the data store (`entry_id`, `url_title`, `category_id`,
//! `category_url_title`, `member_id`, `username`) are validated through the
//! [`Lookup`](crate::Lookup) collaborator; a successful lookup caches the
//! matching row on the token and exports its columns as `route_N_<column>`
//! globals. Every other kind is always valid.

use crate::error::{Error, Result};
use crate::lookup::{CATEGORY_COLUMNS, Constraint, ENTRY_COLUMNS, MEMBER_COLUMNS, Row, Where};
use crate::router::Router;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// A typed placeholder recognised in rule patterns (`:any`, `:num`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WildcardKind {
    Any,
    Num,
    Year,
    Month,
    Day,
    Pagination,
    All,
    Category,
    EntryId,
    UrlTitle,
    CategoryId,
    CategoryUrlTitle,
    MemberId,
    Username,
}

impl WildcardKind {
    pub const VARIANTS: [WildcardKind; 14] = [
        WildcardKind::Any,
        WildcardKind::Num,
        WildcardKind::Year,
        WildcardKind::Month,
        WildcardKind::Day,
        WildcardKind::Pagination,
        WildcardKind::All,
        WildcardKind::Category,
        WildcardKind::EntryId,
        WildcardKind::UrlTitle,
        WildcardKind::CategoryId,
        WildcardKind::CategoryUrlTitle,
        WildcardKind::MemberId,
        WildcardKind::Username,
    ];

    /// Parse the token name without its leading colon.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::VARIANTS.iter().copied().find(|k| k.name() == name)
    }

    pub fn name(self) -> &'static str {
        match self {
            WildcardKind::Any => "any",
            WildcardKind::Num => "num",
            WildcardKind::Year => "year",
            WildcardKind::Month => "month",
            WildcardKind::Day => "day",
            WildcardKind::Pagination => "pagination",
            WildcardKind::All => "all",
            WildcardKind::Category => "category",
            WildcardKind::EntryId => "entry_id",
            WildcardKind::UrlTitle => "url_title",
            WildcardKind::CategoryId => "category_id",
            WildcardKind::CategoryUrlTitle => "category_url_title",
            WildcardKind::MemberId => "member_id",
            WildcardKind::Username => "username",
        }
    }

    /// Kinds whose captures are digit strings.
    pub fn is_numeric(self) -> bool {
        matches!(
            self,
            WildcardKind::Num
                | WildcardKind::Year
                | WildcardKind::Month
                | WildcardKind::Day
                | WildcardKind::EntryId
                | WildcardKind::CategoryId
                | WildcardKind::MemberId
        )
    }

    pub fn flag(self) -> WildcardSet {
        match self {
            WildcardKind::Any => WildcardSet::ANY,
            WildcardKind::Num => WildcardSet::NUM,
            WildcardKind::Year => WildcardSet::YEAR,
            WildcardKind::Month => WildcardSet::MONTH,
            WildcardKind::Day => WildcardSet::DAY,
            WildcardKind::Pagination => WildcardSet::PAGINATION,
            WildcardKind::All => WildcardSet::ALL,
            WildcardKind::Category => WildcardSet::CATEGORY,
            WildcardKind::EntryId => WildcardSet::ENTRY_ID,
            WildcardKind::UrlTitle => WildcardSet::URL_TITLE,
            WildcardKind::CategoryId => WildcardSet::CATEGORY_ID,
            WildcardKind::CategoryUrlTitle => WildcardSet::CATEGORY_URL_TITLE,
            WildcardKind::MemberId => WildcardSet::MEMBER_ID,
            WildcardKind::Username => WildcardSet::USERNAME,
        }
    }

    /// True if captures of this kind must be confirmed by a lookup.
    pub fn requires_lookup(self) -> bool {
        WildcardSet::LOOKUP.contains(self.flag())
    }
}

impl fmt::Display for WildcardKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

bitflags::bitflags! {
    /// The set of wildcard kinds used by a compiled rule.
    ///
    /// The matcher uses this to skip the validation pass entirely for rules
    /// that contain no lookup-backed kinds.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct WildcardSet: u16 {
        const ANY                = 1 << 0;
        const NUM                = 1 << 1;
        const YEAR               = 1 << 2;
        const MONTH              = 1 << 3;
        const DAY                = 1 << 4;
        const PAGINATION         = 1 << 5;
        const ALL                = 1 << 6;
        const CATEGORY           = 1 << 7;
        const ENTRY_ID           = 1 << 8;
        const URL_TITLE          = 1 << 9;
        const CATEGORY_ID        = 1 << 10;
        const CATEGORY_URL_TITLE = 1 << 11;
        const MEMBER_ID          = 1 << 12;
        const USERNAME           = 1 << 13;

        const LOOKUP = Self::ENTRY_ID.bits()
            | Self::URL_TITLE.bits()
            | Self::CATEGORY_ID.bits()
            | Self::CATEGORY_URL_TITLE.bits()
            | Self::MEMBER_ID.bits()
            | Self::USERNAME.bits();
    }
}

/// Comparison operators accepted by [`Wildcard::compare`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    /// `==`
    Eq,
    /// `===`
    Identical,
    /// `!=` or `<>`
    NotEq,
    /// `!==`
    NotIdentical,
    /// `>`
    Gt,
    /// `>=`
    Ge,
    /// `<`
    Lt,
    /// `<=`
    Le,
}

impl FromStr for Comparison {
    type Err = Error;

    fn from_str(op: &str) -> Result<Self> {
        match op {
            "==" => Ok(Comparison::Eq),
            "===" => Ok(Comparison::Identical),
            "!=" | "<>" => Ok(Comparison::NotEq),
            "!==" => Ok(Comparison::NotIdentical),
            ">" => Ok(Comparison::Gt),
            ">=" => Ok(Comparison::Ge),
            "<" => Ok(Comparison::Lt),
            "<=" => Ok(Comparison::Le),
            _ => Err(Error::UnsupportedOperator(op.to_string())),
        }
    }
}

/// One captured path segment from a matched rule.
///
/// Tokens are created per dispatch and per capture; empty captures are stored
/// as `None`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Wildcard {
    index: usize,
    value: Option<String>,
    kind: Option<WildcardKind>,
    meta: Option<BTreeMap<String, Option<String>>>,
}

impl Wildcard {
    pub fn new(index: usize, value: Option<String>, kind: Option<WildcardKind>) -> Self {
        let value = value.filter(|v| !v.is_empty());
        Self { index, value, kind, meta: None }
    }

    /// 1-based position within the matched rule.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn value(&self) -> Option<&str> {
        self.value.as_deref()
    }

    pub fn set_value(&mut self, value: impl Into<String>) {
        self.value = Some(value.into()).filter(|v| !v.is_empty());
    }

    /// `None` for explicit `( ... )` groups.
    pub fn kind(&self) -> Option<WildcardKind> {
        self.kind
    }

    /// A column of the row cached by the last successful validation.
    pub fn meta(&self, column: &str) -> Option<&str> {
        self.meta.as_ref()?.get(column)?.as_deref()
    }

    // --- Validation -----------------------------------------------------------

    /// Validate according to the token's kind, with `filter` as additional
    /// constraints on the lookup. Kinds not backed by the data store are
    /// always valid and perform no lookup.
    pub fn is_valid(&mut self, router: &mut Router<'_>, filter: Where) -> Result<bool> {
        match self.kind {
            Some(WildcardKind::EntryId) => self.is_valid_entry_id(router, filter),
            Some(WildcardKind::UrlTitle) => self.is_valid_url_title(router, filter),
            Some(WildcardKind::CategoryId) => self.is_valid_category_id(router, filter),
            Some(WildcardKind::CategoryUrlTitle) => self.is_valid_category_url_title(router, filter),
            Some(WildcardKind::MemberId) => self.is_valid_member_id(router, filter),
            Some(WildcardKind::Username) => self.is_valid_username(router, filter),
            _ => Ok(true),
        }
    }

    pub fn is_valid_entry_id(&mut self, router: &mut Router<'_>, filter: Where) -> Result<bool> {
        let filter = filter.with("entry_id", self.to_string());
        self.is_valid_entry(router, filter)
    }

    pub fn is_valid_url_title(&mut self, router: &mut Router<'_>, filter: Where) -> Result<bool> {
        let filter = filter.with("url_title", self.to_string());
        self.is_valid_entry(router, filter)
    }

    pub fn is_valid_category_id(&mut self, router: &mut Router<'_>, filter: Where) -> Result<bool> {
        let filter = filter.with("cat_id", self.to_string());
        self.is_valid_category(router, filter)
    }

    pub fn is_valid_category_url_title(&mut self, router: &mut Router<'_>, filter: Where) -> Result<bool> {
        let filter = filter.with("cat_url_title", self.to_string());
        self.is_valid_category(router, filter)
    }

    pub fn is_valid_member_id(&mut self, router: &mut Router<'_>, filter: Where) -> Result<bool> {
        let filter = filter.with("member_id", self.to_string());
        self.is_valid_member(router, filter)
    }

    pub fn is_valid_username(&mut self, router: &mut Router<'_>, filter: Where) -> Result<bool> {
        let filter = filter.with("username", self.to_string());
        self.is_valid_member(router, filter)
    }

    /// Check that at least one channel entry matches `filter`.
    pub fn is_valid_entry(&mut self, router: &mut Router<'_>, filter: Where) -> Result<bool> {
        let rows = router.lookup().entries(&filter)?;
        router.count_lookup();
        Ok(self.set_meta(router, rows.into_iter().next(), ENTRY_COLUMNS))
    }

    /// Check that at least one category matches `filter`.
    ///
    /// `channel` / `channel_id` constraints are resolved to the channels'
    /// category groups first, intersected with any explicit `group_id`.
    pub fn is_valid_category(&mut self, router: &mut Router<'_>, mut filter: Where) -> Result<bool> {
        let channel = filter.remove("channel").or_else(|| filter.remove("channel_name"));
        let channel_id = filter.remove("channel_id");

        if channel.is_some() || channel_id.is_some() {
            let mut channels = Where::new();
            if let Some(name) = channel {
                channels.insert("channel_name", name);
            }
            if let Some(id) = channel_id {
                channels.insert("channel_id", id);
            }

            let mut groups = router.lookup().channel_category_groups(&channels)?;
            router.count_lookup();

            if let Some(explicit) = filter.remove("group_id") {
                groups.retain(|g| explicit.matches(g));
            }
            filter.insert("group_id", Constraint::In(groups));
        }

        let rows = router.lookup().categories(&filter)?;
        router.count_lookup();
        Ok(self.set_meta(router, rows.into_iter().next(), CATEGORY_COLUMNS))
    }

    /// Check that at least one member matches `filter`.
    pub fn is_valid_member(&mut self, router: &mut Router<'_>, filter: Where) -> Result<bool> {
        let rows = router.lookup().members(&filter)?;
        router.count_lookup();
        Ok(self.set_meta(router, rows.into_iter().next(), MEMBER_COLUMNS))
    }

    /// Cache the row (or an all-`None` row) and export `route_N_<column>`.
    /// Both branches export the same global names.
    fn set_meta(&mut self, router: &mut Router<'_>, row: Option<Row>, columns: &[&str]) -> bool {
        let valid = row.is_some();
        let meta: BTreeMap<String, Option<String>> = columns
            .iter()
            .map(|column| {
                let value = row.as_ref().map(|r| r.get(*column).cloned().unwrap_or_default());
                (column.to_string(), value)
            })
            .collect();

        for (column, value) in &meta {
            router.set_global(format!("route_{}_{}", self.index, column), value.clone().unwrap_or_default());
        }

        self.meta = Some(meta);
        valid
    }

    // --- Comparison -----------------------------------------------------------

    /// Compare against `other`.
    ///
    /// Loose equality compares strings exactly unless the kind is numeric, in
    /// which case both sides are compared as numbers when they parse. Ordering
    /// is numeric whenever both sides parse as numbers, lexicographic otherwise.
    pub fn compare(&self, op: Comparison, other: &str) -> bool {
        match op {
            Comparison::Eq => self.loose_eq(other),
            Comparison::Identical => self.value.as_deref() == Some(other),
            Comparison::NotEq => !self.loose_eq(other),
            Comparison::NotIdentical => self.value.as_deref() != Some(other),
            Comparison::Gt => self.loose_cmp(other) == Some(Ordering::Greater),
            Comparison::Ge => matches!(self.loose_cmp(other), Some(Ordering::Greater | Ordering::Equal)),
            Comparison::Lt => self.loose_cmp(other) == Some(Ordering::Less),
            Comparison::Le => matches!(self.loose_cmp(other), Some(Ordering::Less | Ordering::Equal)),
        }
    }

    /// [`compare`](Self::compare) with an operator string such as `">="`.
    pub fn compare_str(&self, op: &str, other: &str) -> Result<bool> {
        Ok(self.compare(op.parse()?, other))
    }

    pub fn is(&self, other: &str) -> bool {
        self.compare(Comparison::Eq, other)
    }

    pub fn is_exactly(&self, other: &str) -> bool {
        self.compare(Comparison::Identical, other)
    }

    pub fn is_not(&self, other: &str) -> bool {
        self.compare(Comparison::NotEq, other)
    }

    pub fn is_not_exactly(&self, other: &str) -> bool {
        self.compare(Comparison::NotIdentical, other)
    }

    pub fn is_greater_than(&self, other: &str) -> bool {
        self.compare(Comparison::Gt, other)
    }

    pub fn is_greater_than_or_equal(&self, other: &str) -> bool {
        self.compare(Comparison::Ge, other)
    }

    pub fn is_less_than(&self, other: &str) -> bool {
        self.compare(Comparison::Lt, other)
    }

    pub fn is_less_than_or_equal(&self, other: &str) -> bool {
        self.compare(Comparison::Le, other)
    }

    pub fn is_in(&self, set: &[&str]) -> bool {
        set.iter().any(|candidate| self.loose_eq(candidate))
    }

    /// Empty iff there is no value; `"0"` is not empty.
    pub fn is_empty(&self) -> bool {
        self.value.is_none()
    }

    fn loose_eq(&self, other: &str) -> bool {
        let Some(value) = self.value.as_deref() else {
            return other.is_empty();
        };

        if self.kind.is_some_and(WildcardKind::is_numeric) {
            if let (Ok(a), Ok(b)) = (value.parse::<f64>(), other.parse::<f64>()) {
                return a == b;
            }
        }

        value == other
    }

    fn loose_cmp(&self, other: &str) -> Option<Ordering> {
        let value = self.value.as_deref().unwrap_or("");
        match (value.parse::<f64>(), other.parse::<f64>()) {
            (Ok(a), Ok(b)) => a.partial_cmp(&b),
            _ => Some(value.cmp(other)),
        }
    }
}

impl fmt::Display for Wildcard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.value.as_deref().unwrap_or(""))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lookup::MemoryLookup;

    fn token(value: &str, kind: Option<WildcardKind>) -> Wildcard {
        Wildcard::new(1, Some(value.to_string()), kind)
    }

    #[test]
    fn kind_names_round_trip() {
        for kind in WildcardKind::VARIANTS {
            assert_eq!(WildcardKind::from_name(kind.name()), Some(kind));
        }
        assert_eq!(WildcardKind::from_name("page"), None);
    }

    #[test]
    fn lookup_set_covers_identifier_kinds() {
        assert!(WildcardKind::UrlTitle.requires_lookup());
        assert!(WildcardKind::Username.requires_lookup());
        assert!(!WildcardKind::Num.requires_lookup());
        assert!(!WildcardKind::All.requires_lookup());
    }

    #[test]
    fn empty_values_normalize_to_none() {
        let w = Wildcard::new(3, Some(String::new()), Some(WildcardKind::Any));
        assert!(w.is_empty());
        assert_eq!(w.value(), None);
        assert_eq!(w.to_string(), "");
        assert!(!token("0", None).is_empty());
    }

    #[test]
    fn loose_equality_is_string_exact_for_untyped_tokens() {
        let w = token("01", Some(WildcardKind::Any));
        assert!(!w.is("1"));
        assert!(w.is("01"));

        let n = token("01", Some(WildcardKind::Num));
        assert!(n.is("1"));
        assert!(!n.is_exactly("1"));
    }

    #[test]
    fn ordering_uses_numbers_when_both_sides_parse() {
        let w = token("10", Some(WildcardKind::Any));
        assert!(w.is_greater_than("9"));
        assert!(w.is_less_than_or_equal("10"));

        let s = token("beta", None);
        assert!(s.is_greater_than("alpha"));
        assert!(s.is_less_than("gamma"));
    }

    #[test]
    fn membership_and_operator_strings() {
        let w = token("news", None);
        assert!(w.is_in(&["blog", "news"]));
        assert!(!w.is_in(&["blog"]));

        assert!(w.compare_str("<>", "blog").unwrap());
        assert!(w.compare_str("!==", "blog").unwrap());
        assert!(matches!(w.compare_str("~=", "blog"), Err(Error::UnsupportedOperator(op)) if op == "~="));
    }

    #[test]
    fn validation_exports_identical_global_names_on_hit_and_miss() {
        let lookup = MemoryLookup::new().with_member([
            ("member_id", "4"),
            ("group_id", "1"),
            ("email", "ann@example.com"),
            ("username", "ann"),
            ("screen_name", "Ann"),
        ]);
        let mut router = Router::new("users/ann", &lookup);

        let mut hit = Wildcard::new(1, Some("ann".into()), Some(WildcardKind::Username));
        assert!(hit.is_valid(&mut router, Where::new()).unwrap());
        assert_eq!(hit.meta("screen_name"), Some("Ann"));

        let mut miss = Wildcard::new(2, Some("bob".into()), Some(WildcardKind::Username));
        assert!(!miss.is_valid(&mut router, Where::new()).unwrap());
        assert_eq!(miss.meta("screen_name"), None);

        let names = |i: usize| -> Vec<String> {
            router
                .globals()
                .keys()
                .filter_map(|k| k.strip_prefix(&format!("route_{i}_")).map(str::to_string))
                .collect()
        };
        assert_eq!(names(1), names(2));
        assert_eq!(router.global("route_1_email"), Some("ann@example.com"));
        assert_eq!(router.global("route_2_email"), Some(""));
    }

    #[test]
    fn category_channel_constraint_intersects_groups() {
        let lookup = MemoryLookup::new()
            .with_channel([("channel_id", "1"), ("channel_name", "blog"), ("cat_group", "2")])
            .with_category([("cat_id", "9"), ("group_id", "2"), ("cat_url_title", "rust")])
            .with_category([("cat_id", "10"), ("group_id", "3"), ("cat_url_title", "go")]);
        let mut router = Router::new("blog/category/rust", &lookup);

        let mut rust = Wildcard::new(1, Some("rust".into()), Some(WildcardKind::CategoryUrlTitle));
        assert!(rust.is_valid(&mut router, Where::new().with("channel", "blog")).unwrap());
        assert_eq!(rust.meta("cat_id"), Some("9"));

        let mut go = Wildcard::new(1, Some("go".into()), Some(WildcardKind::CategoryUrlTitle));
        assert!(!go.is_valid(&mut router, Where::new().with("channel", "blog")).unwrap());
        assert!(go.is_valid(&mut router, Where::new()).unwrap());
    }

    #[test]
    fn untyped_tokens_skip_lookups() {
        let lookup = MemoryLookup::new();
        let mut router = Router::new("x", &lookup);
        let mut w = Wildcard::new(1, Some("x".into()), None);
        assert!(w.is_valid(&mut router, Where::new()).unwrap());
        assert_eq!(router.lookups(), 0);
    }
}
