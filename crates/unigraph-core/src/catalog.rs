//! Schema catalog: what every relational table becomes in the graph.
//!
//! The catalog is hand-authored and static. A table is either node-producing
//! (one node per row, under a label with a unique key property) or
//! relationship-producing (one relationship per row, anchored on two foreign
//! key columns). Node tables may additionally declare foreign-key edges, which
//! turn a single FK column of the node row into a relationship.

use std::borrow::Cow;
use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::error::CatalogError;

/// Key property assumed for tables classified as nodes by default.
pub const DEFAULT_KEY: &str = "id";

/// A node located by its label and unique key property.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Endpoint {
    pub label: String,
    pub key: String,
}

impl Endpoint {
    pub fn new(label: &str, key: &str) -> Self {
        Self {
            label: label.to_string(),
            key: key.to_string(),
        }
    }
}

/// A foreign-key column of a relationship table and the node it points at.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Anchor {
    pub column: String,
    pub endpoint: Endpoint,
}

impl Anchor {
    pub fn new(column: &str, label: &str, key: &str) -> Self {
        Self {
            column: column.to_string(),
            endpoint: Endpoint::new(label, key),
        }
    }
}

/// Which way a foreign-key edge points, seen from the row that owns the column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeDirection {
    /// `(owner)-[:TYPE]->(target)`
    Outgoing,
    /// `(target)-[:TYPE]->(owner)`
    Incoming,
}

/// A relationship derived from one FK column of a node table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForeignKeyEdge {
    pub column: String,
    pub rel_type: String,
    pub target: Endpoint,
    pub direction: EdgeDirection,
}

impl ForeignKeyEdge {
    pub fn outgoing(column: &str, rel_type: &str, target: Endpoint) -> Self {
        Self {
            column: column.to_string(),
            rel_type: rel_type.to_string(),
            target,
            direction: EdgeDirection::Outgoing,
        }
    }

    pub fn incoming(column: &str, rel_type: &str, target: Endpoint) -> Self {
        Self {
            direction: EdgeDirection::Incoming,
            ..Self::outgoing(column, rel_type, target)
        }
    }
}

/// A node-producing table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeTable {
    pub label: String,
    pub key: String,
    pub foreign_keys: Vec<ForeignKeyEdge>,
}

impl NodeTable {
    /// Node table whose label is derived from the table name.
    pub fn derived(table: &str, key: &str) -> Self {
        Self::labeled(&derive_label(table), key)
    }

    pub fn labeled(label: &str, key: &str) -> Self {
        Self {
            label: label.to_string(),
            key: key.to_string(),
            foreign_keys: Vec::new(),
        }
    }

    pub fn with_foreign_key(mut self, edge: ForeignKeyEdge) -> Self {
        self.foreign_keys.push(edge);
        self
    }

    pub fn endpoint(&self) -> Endpoint {
        Endpoint::new(&self.label, &self.key)
    }
}

/// A relationship-producing (join) table. Relationships point from `from` to `to`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RelationshipTable {
    pub rel_type: String,
    pub from: Anchor,
    pub to: Anchor,
}

impl RelationshipTable {
    pub fn new(rel_type: &str, from: Anchor, to: Anchor) -> Self {
        Self {
            rel_type: rel_type.to_string(),
            from,
            to,
        }
    }

    /// True if `column` is one of the two anchors (and therefore not a property).
    pub fn is_anchor(&self, column: &str) -> bool {
        self.from.column == column || self.to.column == column
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum TableRole {
    Node(NodeTable),
    Relationship(RelationshipTable),
}

impl TableRole {
    pub fn is_node(&self) -> bool {
        matches!(self, TableRole::Node(_))
    }
}

/// What to do with a discovered table that has no catalog entry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DefaultPolicy {
    /// Treat it as a node table with a derived label and key `id`.
    #[default]
    TreatAsNode,
    /// Refuse to run.
    Reject,
}

/// Read-only lookup from table name to transfer role.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    entries: BTreeMap<String, TableRole>,
    duplicates: Vec<String>,
    policy: DefaultPolicy,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_policy(mut self, policy: DefaultPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_node(self, table: &str, node: NodeTable) -> Self {
        self.with_entry(table, TableRole::Node(node))
    }

    pub fn with_relationship(self, table: &str, rel: RelationshipTable) -> Self {
        self.with_entry(table, TableRole::Relationship(rel))
    }

    fn with_entry(mut self, table: &str, role: TableRole) -> Self {
        if self.entries.insert(table.to_string(), role).is_some() {
            self.duplicates.push(table.to_string());
        }
        self
    }

    /// The university schema: six node tables and four join tables.
    pub fn university() -> Self {
        Self::new()
            .with_node(
                "student",
                NodeTable::derived("student", "id").with_foreign_key(ForeignKeyEdge::outgoing(
                    "group_id",
                    "PART_OF",
                    Endpoint::new("TccGroup", "id"),
                )),
            )
            .with_node("professor", NodeTable::derived("professor", "id"))
            .with_node("course", NodeTable::derived("course", "id"))
            .with_node(
                "department",
                NodeTable::derived("department", "dept_name").with_foreign_key(ForeignKeyEdge::incoming(
                    "boss_id",
                    "HEADS",
                    Endpoint::new("Professor", "id"),
                )),
            )
            .with_node("subj", NodeTable::derived("subj", "id"))
            .with_node(
                "tcc_group",
                NodeTable::derived("tcc_group", "id").with_foreign_key(ForeignKeyEdge::outgoing(
                    "professor_id",
                    "MENTORED_BY",
                    Endpoint::new("Professor", "id"),
                )),
            )
            .with_relationship(
                "takes",
                RelationshipTable::new(
                    "TAKES",
                    Anchor::new("student_id", "Student", "id"),
                    Anchor::new("subj_id", "Subj", "id"),
                ),
            )
            .with_relationship(
                "teaches",
                RelationshipTable::new(
                    "TEACHES",
                    Anchor::new("professor_id", "Professor", "id"),
                    Anchor::new("subj_id", "Subj", "id"),
                ),
            )
            .with_relationship(
                "req",
                RelationshipTable::new(
                    "IS_REQ_OF",
                    Anchor::new("subj_id", "Subj", "id"),
                    Anchor::new("course_id", "Course", "id"),
                ),
            )
            .with_relationship(
                "graduate",
                RelationshipTable::new(
                    "GRADUATED_FROM",
                    Anchor::new("student_id", "Student", "id"),
                    Anchor::new("course_id", "Course", "id"),
                ),
            )
    }

    pub fn policy(&self) -> DefaultPolicy {
        self.policy
    }

    /// The catalog entry for `table`, if one was declared.
    pub fn get(&self, table: &str) -> Option<&TableRole> {
        self.entries.get(table)
    }

    /// Declared entries in table-name order.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &TableRole)> {
        self.entries.iter().map(|(name, role)| (name.as_str(), role))
    }

    /// Role of `table`, applying the default policy to unlisted tables.
    pub fn resolve(&self, table: &str) -> Result<Cow<'_, TableRole>, CatalogError> {
        match self.entries.get(table) {
            Some(role) => Ok(Cow::Borrowed(role)),
            None => match self.policy {
                DefaultPolicy::TreatAsNode => {
                    Ok(Cow::Owned(TableRole::Node(NodeTable::derived(table, DEFAULT_KEY))))
                }
                DefaultPolicy::Reject => Err(CatalogError::UnlistedTable(table.to_string())),
            },
        }
    }

    /// Fail if any of the discovered `tables` cannot be resolved.
    pub fn check_tables(&self, tables: &[String]) -> Result<(), CatalogError> {
        if self.policy == DefaultPolicy::TreatAsNode {
            return Ok(());
        }
        let unlisted: Vec<String> = tables
            .iter()
            .filter(|t| !self.entries.contains_key(t.as_str()))
            .cloned()
            .collect();
        if unlisted.is_empty() {
            Ok(())
        } else {
            Err(CatalogError::UnlistedTables(unlisted))
        }
    }

    /// Distinct `(label, key)` pairs of all declared node tables.
    pub fn unique_keys(&self) -> Vec<Endpoint> {
        let keys: BTreeSet<Endpoint> = self
            .entries
            .values()
            .filter_map(|role| match role {
                TableRole::Node(node) => Some(node.endpoint()),
                TableRole::Relationship(_) => None,
            })
            .collect();
        keys.into_iter().collect()
    }

    /// Check the catalog for internal consistency. Every problem is collected.
    pub fn validate(&self) -> Result<(), CatalogError> {
        let mut issues = Vec::new();

        for table in &self.duplicates {
            issues.push(format!("table '{}' is declared more than once", table));
        }

        let node_keys: BTreeSet<Endpoint> = self.unique_keys().into_iter().collect();
        let mut keys_by_label: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
        for endpoint in &node_keys {
            keys_by_label.entry(&endpoint.label).or_default().insert(&endpoint.key);
        }
        for (label, keys) in &keys_by_label {
            if keys.len() > 1 {
                issues.push(format!(
                    "label '{}' is declared with several keys ({})",
                    label,
                    keys.iter().copied().collect::<Vec<_>>().join(", ")
                ));
            }
        }

        let check_endpoint = |issues: &mut Vec<String>, table: &str, what: &str, endpoint: &Endpoint| {
            if !node_keys.contains(endpoint) {
                issues.push(format!(
                    "table '{}': {} targets {}.{} which no node table declares",
                    table, what, endpoint.label, endpoint.key
                ));
            }
        };

        for (table, role) in &self.entries {
            match role {
                TableRole::Node(node) => {
                    check_identifier(&mut issues, table, "label", &node.label);
                    check_identifier(&mut issues, table, "key", &node.key);
                    for fk in &node.foreign_keys {
                        check_identifier(&mut issues, table, "relationship type", &fk.rel_type);
                        check_identifier(&mut issues, table, "foreign key column", &fk.column);
                        check_endpoint(&mut issues, table, &format!("foreign key '{}'", fk.column), &fk.target);
                    }
                }
                TableRole::Relationship(rel) => {
                    check_identifier(&mut issues, table, "relationship type", &rel.rel_type);
                    for anchor in [&rel.from, &rel.to] {
                        check_identifier(&mut issues, table, "anchor column", &anchor.column);
                        check_endpoint(&mut issues, table, &format!("anchor '{}'", anchor.column), &anchor.endpoint);
                    }
                    if rel.from.column == rel.to.column {
                        issues.push(format!(
                            "table '{}': both anchors use column '{}'",
                            table, rel.from.column
                        ));
                    }
                }
            }
        }

        if issues.is_empty() {
            Ok(())
        } else {
            Err(CatalogError::Invalid(issues))
        }
    }
}

fn check_identifier(issues: &mut Vec<String>, table: &str, what: &str, name: &str) {
    if !is_identifier(name) {
        issues.push(format!("table '{}': {} '{}' is not a valid identifier", table, what, name));
    }
}

/// ASCII letter or underscore, followed by letters, digits or underscores.
pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    }
}

/// Node label for a table name: PascalCase, last word singular.
///
/// `tcc_group` → `TccGroup`, `departments` → `Department`.
pub fn derive_label(table: &str) -> String {
    let words: Vec<String> = table
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(|w| w.to_ascii_lowercase())
        .collect();

    let last = words.len().saturating_sub(1);
    words
        .iter()
        .enumerate()
        .map(|(i, word)| {
            let word = if i == last { singular(word) } else { Cow::Borrowed(word.as_str()) };
            capitalize(&word)
        })
        .collect()
}

fn singular(word: &str) -> Cow<'_, str> {
    if word.len() > 3 && word.ends_with("ies") {
        Cow::Owned(format!("{}y", &word[..word.len() - 3]))
    } else if word.len() > 1
        && word.ends_with('s')
        && !["ss", "us", "is"].iter().any(|suffix| word.ends_with(suffix))
    {
        Cow::Borrowed(&word[..word.len() - 1])
    } else {
        Cow::Borrowed(word)
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derive_label() {
        assert_eq!(derive_label("student"), "Student");
        assert_eq!(derive_label("tcc_group"), "TccGroup");
        assert_eq!(derive_label("departments"), "Department");
        assert_eq!(derive_label("categories"), "Category");
        assert_eq!(derive_label("class"), "Class");
        assert_eq!(derive_label("thesis"), "Thesis");
        assert_eq!(derive_label("subj"), "Subj");
        assert_eq!(derive_label("TCC_GROUPS"), "TccGroup");
    }

    #[test]
    fn test_university_catalog_is_valid() {
        let catalog = Catalog::university();
        catalog.validate().unwrap();

        let keys = catalog.unique_keys();
        assert_eq!(keys.len(), 6);
        assert!(keys.contains(&Endpoint::new("Department", "dept_name")));
        assert!(keys.contains(&Endpoint::new("TccGroup", "id")));
    }

    #[test]
    fn test_resolve_listed_tables() {
        let catalog = Catalog::university();
        match catalog.resolve("teaches").unwrap().as_ref() {
            TableRole::Relationship(rel) => {
                assert_eq!(rel.rel_type, "TEACHES");
                assert_eq!(rel.from.endpoint, Endpoint::new("Professor", "id"));
                assert_eq!(rel.to.column, "subj_id");
                assert!(rel.is_anchor("professor_id"));
                assert!(!rel.is_anchor("semester"));
            }
            other => panic!("unexpected role {:?}", other),
        }
        assert!(catalog.resolve("department").unwrap().is_node());
    }

    #[test]
    fn test_unlisted_table_defaults_to_node() {
        let catalog = Catalog::university();
        match catalog.resolve("lab_rooms").unwrap().into_owned() {
            TableRole::Node(node) => {
                assert_eq!(node.label, "LabRoom");
                assert_eq!(node.key, DEFAULT_KEY);
            }
            other => panic!("unexpected role {:?}", other),
        }
        catalog.check_tables(&["lab_rooms".to_string()]).unwrap();
    }

    #[test]
    fn test_reject_policy_refuses_unlisted_tables() {
        let catalog = Catalog::university().with_policy(DefaultPolicy::Reject);
        assert_eq!(
            catalog.resolve("lab_rooms").unwrap_err(),
            CatalogError::UnlistedTable("lab_rooms".into())
        );
        let tables = vec!["student".to_string(), "lab_rooms".to_string(), "audit".to_string()];
        assert_eq!(
            catalog.check_tables(&tables).unwrap_err(),
            CatalogError::UnlistedTables(vec!["lab_rooms".into(), "audit".into()])
        );
    }

    #[test]
    fn test_validate_reports_every_problem() {
        let catalog = Catalog::new()
            .with_node("person", NodeTable::derived("person", "id"))
            .with_node("person", NodeTable::derived("person", "id"))
            .with_relationship(
                "knows",
                RelationshipTable::new(
                    "KNOWS-WELL",
                    Anchor::new("a", "Person", "id"),
                    Anchor::new("a", "Robot", "serial"),
                ),
            );

        match catalog.validate().unwrap_err() {
            CatalogError::Invalid(issues) => {
                assert_eq!(issues.len(), 4, "{:?}", issues);
                assert!(issues.iter().any(|i| i.contains("more than once")));
                assert!(issues.iter().any(|i| i.contains("KNOWS-WELL")));
                assert!(issues.iter().any(|i| i.contains("Robot.serial")));
                assert!(issues.iter().any(|i| i.contains("both anchors")));
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_validate_rejects_conflicting_keys() {
        let catalog = Catalog::new()
            .with_node("person", NodeTable::labeled("Person", "id"))
            .with_node("people", NodeTable::labeled("Person", "ssn"));
        let err = catalog.validate().unwrap_err();
        assert!(err.to_string().contains("several keys"));
    }
}
