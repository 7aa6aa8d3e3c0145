//! Data-store lookups used to validate typed wildcards.
//!
//! The engine never talks to a database directly. Typed captures such as
//! `:url_title` or `:member_id` are checked through the [`Lookup`] trait, which
//! the host implements on top of whatever store it has. Each operation takes a
//! [`Where`] filter (column -> exact value or value set) and returns zero or more
//! rows projected onto a fixed column list:
//!
//! ```text
//! entries    -> ENTRY_COLUMNS     (entry_id, title, url_title, channel_id)
//! categories -> CATEGORY_COLUMNS  (cat_id, site_id, group_id, parent_id, ...)
//! members    -> MEMBER_COLUMNS    (member_id, group_id, email, username, screen_name)
//! ```
//!
//! Zero rows is a normal "invalid" answer. A [`LookupError`] means the store
//! itself failed and aborts the dispatch.
//!
//! [`MemoryLookup`] is a small in-memory implementation used by tests and the
//! CLI fixtures file.

use serde::Deserialize;
use std::collections::BTreeMap;
use thiserror::Error;

/// A single result row: column name -> value.
pub type Row = BTreeMap<String, String>;

pub const ENTRY_COLUMNS: &[&str] = &["entry_id", "title", "url_title", "channel_id"];

pub const CATEGORY_COLUMNS: &[&str] = &[
    "cat_id",
    "site_id",
    "group_id",
    "parent_id",
    "cat_name",
    "cat_url_title",
    "cat_description",
    "cat_image",
    "cat_order",
];

pub const MEMBER_COLUMNS: &[&str] = &["member_id", "group_id", "email", "username", "screen_name"];

/// Failure of the lookup collaborator (not a zero-row result).
#[derive(Debug, Error)]
pub enum LookupError {
    #[error("data store unavailable: {0}")]
    Unavailable(String),
    #[error("query failed: {0}")]
    Query(String),
}

/// A column constraint: exact value or membership in a set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Constraint {
    Eq(String),
    In(Vec<String>),
}

impl Constraint {
    /// String comparison only; no numeric coercion.
    pub fn matches(&self, value: &str) -> bool {
        match self {
            Constraint::Eq(expected) => expected == value,
            Constraint::In(set) => set.iter().any(|v| v == value),
        }
    }

    pub fn values(&self) -> Vec<&str> {
        match self {
            Constraint::Eq(v) => vec![v.as_str()],
            Constraint::In(set) => set.iter().map(String::as_str).collect(),
        }
    }
}

impl From<&str> for Constraint {
    fn from(value: &str) -> Self {
        Constraint::Eq(value.to_string())
    }
}

impl From<String> for Constraint {
    fn from(value: String) -> Self {
        Constraint::Eq(value)
    }
}

impl From<Vec<String>> for Constraint {
    fn from(values: Vec<String>) -> Self {
        Constraint::In(values)
    }
}

impl<const N: usize> From<[&str; N]> for Constraint {
    fn from(values: [&str; N]) -> Self {
        Constraint::In(values.iter().map(|v| v.to_string()).collect())
    }
}

/// Ordered set of column constraints for a lookup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Where {
    columns: BTreeMap<String, Constraint>,
}

impl Where {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, column: impl Into<String>, constraint: impl Into<Constraint>) -> Self {
        self.insert(column, constraint);
        self
    }

    pub fn insert(&mut self, column: impl Into<String>, constraint: impl Into<Constraint>) {
        self.columns.insert(column.into(), constraint.into());
    }

    pub fn get(&self, column: &str) -> Option<&Constraint> {
        self.columns.get(column)
    }

    pub fn remove(&mut self, column: &str) -> Option<Constraint> {
        self.columns.remove(column)
    }

    pub fn contains(&self, column: &str) -> bool {
        self.columns.contains_key(column)
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Constraint)> {
        self.columns.iter()
    }

    /// True if `row` satisfies every constraint. Missing columns never match.
    pub fn matches(&self, row: &Row) -> bool {
        self.columns.iter().all(|(column, constraint)| row.get(column).is_some_and(|v| constraint.matches(v)))
    }
}

/// Existence checks against the host's data store.
pub trait Lookup {
    /// Channel entries matching `filter`, projected onto [`ENTRY_COLUMNS`].
    fn entries(&self, filter: &Where) -> Result<Vec<Row>, LookupError>;

    /// Categories matching `filter`, projected onto [`CATEGORY_COLUMNS`].
    fn categories(&self, filter: &Where) -> Result<Vec<Row>, LookupError>;

    /// Members matching `filter`, projected onto [`MEMBER_COLUMNS`].
    fn members(&self, filter: &Where) -> Result<Vec<Row>, LookupError>;

    /// Category group ids assigned to the channels matching `filter`
    /// (`channel_name` and/or `channel_id`).
    fn channel_category_groups(&self, filter: &Where) -> Result<Vec<String>, LookupError>;
}

/// In-memory [`Lookup`] backed by plain row lists.
///
/// Rows may carry extra columns (`channel_name`, `status`, custom fields) that
/// filters can reference; results are projected onto the fixed column lists.
/// Channel rows use `channel_id`, `channel_name` and a `|`-separated `cat_group`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MemoryLookup {
    pub entries: Vec<Row>,
    pub categories: Vec<Row>,
    pub members: Vec<Row>,
    pub channels: Vec<Row>,
}

impl MemoryLookup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entry<I, K, V>(mut self, row: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.entries.push(to_row(row));
        self
    }

    pub fn with_category<I, K, V>(mut self, row: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.categories.push(to_row(row));
        self
    }

    pub fn with_member<I, K, V>(mut self, row: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.members.push(to_row(row));
        self
    }

    pub fn with_channel<I, K, V>(mut self, row: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.channels.push(to_row(row));
        self
    }
}

impl Lookup for MemoryLookup {
    fn entries(&self, filter: &Where) -> Result<Vec<Row>, LookupError> {
        // `channel` is accepted as an alias of the joined channel name column.
        let mut filter = filter.clone();
        if let Some(channel) = filter.remove("channel") {
            filter.insert("channel_name", channel);
        }
        Ok(select(&self.entries, &filter, ENTRY_COLUMNS))
    }

    fn categories(&self, filter: &Where) -> Result<Vec<Row>, LookupError> {
        Ok(select(&self.categories, filter, CATEGORY_COLUMNS))
    }

    fn members(&self, filter: &Where) -> Result<Vec<Row>, LookupError> {
        Ok(select(&self.members, filter, MEMBER_COLUMNS))
    }

    fn channel_category_groups(&self, filter: &Where) -> Result<Vec<String>, LookupError> {
        Ok(self
            .channels
            .iter()
            .filter(|row| filter.matches(row))
            .filter_map(|row| row.get("cat_group"))
            .flat_map(|groups| groups.split('|'))
            .filter(|g| !g.is_empty())
            .map(str::to_string)
            .collect())
    }
}

fn to_row<I, K, V>(row: I) -> Row
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
{
    row.into_iter().map(|(k, v)| (k.into(), v.into())).collect()
}

fn select(rows: &[Row], filter: &Where, columns: &[&str]) -> Vec<Row> {
    rows.iter()
        .filter(|row| filter.matches(row))
        .map(|row| {
            columns.iter().map(|c| (c.to_string(), row.get(*c).cloned().unwrap_or_default())).collect::<Row>()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture() -> MemoryLookup {
        MemoryLookup::new()
            .with_entry([
                ("entry_id", "7"),
                ("title", "Hello"),
                ("url_title", "hello"),
                ("channel_id", "1"),
                ("channel_name", "blog"),
                ("status", "open"),
            ])
            .with_channel([("channel_id", "1"), ("channel_name", "blog"), ("cat_group", "2|5")])
            .with_channel([("channel_id", "2"), ("channel_name", "news"), ("cat_group", "")])
    }

    #[test]
    fn entries_are_projected_onto_fixed_columns() {
        let rows = fixture().entries(&Where::new().with("url_title", "hello")).unwrap();
        assert_eq!(rows.len(), 1);
        let keys: Vec<&str> = rows[0].keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["channel_id", "entry_id", "title", "url_title"]);
        assert!(!rows[0].contains_key("status"));
    }

    #[test]
    fn channel_alias_filters_on_channel_name() {
        let lookup = fixture();
        let hit = lookup.entries(&Where::new().with("url_title", "hello").with("channel", "blog")).unwrap();
        let miss = lookup.entries(&Where::new().with("url_title", "hello").with("channel", "news")).unwrap();
        assert_eq!(hit.len(), 1);
        assert!(miss.is_empty());
    }

    #[test]
    fn constraints_compare_strings_exactly() {
        let lookup = fixture();
        assert!(lookup.entries(&Where::new().with("entry_id", "07")).unwrap().is_empty());
        assert_eq!(lookup.entries(&Where::new().with("entry_id", ["3", "7"])).unwrap().len(), 1);
    }

    #[test]
    fn channel_category_groups_split_pipes() {
        let lookup = fixture();
        let groups = lookup.channel_category_groups(&Where::new().with("channel_name", ["blog", "news"])).unwrap();
        assert_eq!(groups, vec!["2".to_string(), "5".to_string()]);
    }
}
