//! End-to-end transfers from an in-memory SQLite university database (or a
//! hand-built `MemorySource`) into the in-memory graph.

use async_trait::async_trait;
use rusqlite::Connection;
use tokio_util::sync::CancellationToken;

use unigraph_core::{Catalog, CatalogError, DefaultPolicy, Endpoint, GraphValue, NodeCreate, RelationshipCreate};
use unigraph_db::{MemorySource, Row, SourceError, SourceResult, SourceStore, SqlValue, SqliteSource};
use unigraph_graph::{GraphStore, MemoryGraph, Outcome, Phase, StoreError, StoreResult, Transfer, TransferError};

const UNIVERSITY: &str = "
    CREATE TABLE student (id TEXT PRIMARY KEY, name TEXT, group_id TEXT);
    CREATE TABLE professor (id TEXT PRIMARY KEY, name TEXT, dept_name TEXT);
    CREATE TABLE course (id TEXT PRIMARY KEY, title TEXT, dept_name TEXT);
    CREATE TABLE department (dept_name TEXT PRIMARY KEY, budget DECIMAL(12,2), boss_id TEXT);
    CREATE TABLE subj (id TEXT PRIMARY KEY, title TEXT);
    CREATE TABLE tcc_group (id TEXT PRIMARY KEY, professor_id TEXT);
    CREATE TABLE takes (student_id TEXT, subj_id TEXT, semester TEXT, year INTEGER, grade DECIMAL(3,1));
    CREATE TABLE teaches (professor_id TEXT, subj_id TEXT, semester TEXT);
    CREATE TABLE req (subj_id TEXT, course_id TEXT);
    CREATE TABLE graduate (student_id TEXT, course_id TEXT, semester INTEGER, year INTEGER);

    INSERT INTO student VALUES ('100000001', 'Ana', 'CC1111111');
    INSERT INTO student VALUES ('100000002', 'Bruno', 'CC1111111');
    INSERT INTO student VALUES ('100000003', 'Carla', NULL);
    INSERT INTO professor VALUES ('P001', 'Alice', 'CS');
    INSERT INTO professor VALUES ('P005', 'Eve', 'Math');
    INSERT INTO course VALUES ('CC', 'Computer Science', 'CS');
    INSERT INTO department VALUES ('CS', 500000.00, 'P001');
    INSERT INTO department VALUES ('Math', 120000.50, 'P005');
    INSERT INTO subj VALUES ('SUB101', 'Databases');
    INSERT INTO subj VALUES ('SUB102', 'Compilers');
    INSERT INTO tcc_group VALUES ('CC1111111', 'P005');
    INSERT INTO takes VALUES ('100000001', 'SUB101', '2', 2018, 8.5);
    INSERT INTO takes VALUES ('100000001', 'SUB102', '1', 2019, 7.0);
    INSERT INTO takes VALUES ('100000009', 'SUB101', '1', 2019, 5.0);
    INSERT INTO teaches VALUES ('P005', 'SUB101', '2');
    INSERT INTO teaches VALUES ('P001', 'SUB102', '1');
    INSERT INTO req VALUES ('SUB101', 'CC');
    INSERT INTO req VALUES ('SUB102', 'CC');
    INSERT INTO graduate VALUES ('100000002', 'CC', 2, 2018);
";

fn university(extra: &str) -> SqliteSource {
    let conn = Connection::open_in_memory().unwrap();
    conn.execute_batch(UNIVERSITY).unwrap();
    conn.execute_batch(extra).unwrap();
    SqliteSource::from_connection(conn)
}

/// What happens when the interrupted table is fetched.
enum Interruption {
    Cancel(CancellationToken),
    /// The table alone cannot be read.
    TableError,
    /// The whole source goes away.
    ConnectionLost,
}

/// Delegates to SQLite, interrupting when a given table is fetched.
struct Interrupting {
    inner: SqliteSource,
    table: &'static str,
    interruption: Interruption,
}

#[async_trait]
impl SourceStore for Interrupting {
    fn kind(&self) -> &'static str {
        "interrupting"
    }

    async fn list_tables(&self) -> SourceResult<Vec<String>> {
        self.inner.list_tables().await
    }

    async fn columns(&self, table: &str) -> SourceResult<Vec<String>> {
        self.inner.columns(table).await
    }

    async fn fetch_rows(&self, table: &str) -> SourceResult<Vec<Row>> {
        if table == self.table {
            match &self.interruption {
                Interruption::Cancel(token) => token.cancel(),
                Interruption::TableError => return Err(SourceError::TableNotFound(table.to_string())),
                Interruption::ConnectionLost => {
                    return Err(SourceError::Unavailable("connection reset by peer".to_string()));
                }
            }
        }
        self.inner.fetch_rows(table).await
    }
}

/// Delegates to `MemoryGraph`, losing the connection on the first write of
/// a node label or relationship type named `name`.
struct Disconnecting {
    inner: MemoryGraph,
    name: &'static str,
}

impl Disconnecting {
    fn check(&self, name: &str) -> StoreResult<()> {
        if name == self.name {
            Err(StoreError::Connection("connection reset by peer".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl GraphStore for Disconnecting {
    fn kind(&self) -> &'static str {
        "disconnecting"
    }

    async fn wipe(&self) -> StoreResult<()> {
        self.inner.wipe().await
    }

    async fn ensure_unique(&self, endpoint: &Endpoint) -> StoreResult<()> {
        self.inner.ensure_unique(endpoint).await
    }

    async fn create_node(&self, node: &NodeCreate) -> StoreResult<()> {
        self.check(&node.label)?;
        self.inner.create_node(node).await
    }

    async fn create_relationship(&self, rel: &RelationshipCreate) -> StoreResult<u64> {
        self.check(&rel.rel_type)?;
        self.inner.create_relationship(rel).await
    }
}

fn prop<'a>(props: &'a std::collections::BTreeMap<String, GraphValue>, key: &str) -> &'a GraphValue {
    props.get(key).unwrap_or(&GraphValue::Null)
}

#[tokio::test]
async fn test_full_university_transfer() {
    let catalog = Catalog::university();
    let source = university("");
    let graph = MemoryGraph::new();

    let report = Transfer::new(&catalog, &source, &graph).run().await.unwrap();

    assert_eq!(report.constraints, 6);
    assert_eq!(report.tables_processed(), 10);
    assert_eq!(report.nodes_created(), 11);
    assert_eq!(graph.node_count(), 11);
    // 2 TAKES + 2 TEACHES + 2 IS_REQ_OF + 1 GRADUATED_FROM + 2 PART_OF + 2 HEADS + 1 MENTORED_BY
    assert_eq!(report.relationships_created(), 12);
    assert_eq!(graph.relationship_count(), 12);
    assert!(report.skipped_rows.is_empty());
    assert!(report.failures.is_empty());

    // The takes row for the unknown student is the only dangling anchor.
    assert_eq!(report.missing_endpoints.len(), 1);
    assert_eq!(report.missing_endpoints[0].table, "takes");
    assert_eq!(report.missing_endpoints[0].row, 2);
    assert_eq!(report.outcome(), Outcome::CompleteWithErrors);
}

#[tokio::test]
async fn test_department_budget_becomes_float() {
    let catalog = Catalog::university();
    let source = university("");
    let graph = MemoryGraph::new();
    Transfer::new(&catalog, &source, &graph).run().await.unwrap();

    let departments = graph.nodes("Department");
    let cs = departments
        .iter()
        .find(|d| d.get("dept_name") == Some(&GraphValue::from("CS")))
        .unwrap();
    assert_eq!(cs.get("budget"), Some(&GraphValue::Float(500000.0)));
    assert_eq!(cs.get("boss_id"), Some(&GraphValue::from("P001")));
}

#[tokio::test]
async fn test_relationship_properties_and_direction() {
    let catalog = Catalog::university();
    let source = university("");
    let graph = MemoryGraph::new();
    Transfer::new(&catalog, &source, &graph).run().await.unwrap();

    let teaches = graph.relationships("TEACHES");
    let p005 = teaches
        .iter()
        .find(|r| r.from.get("id") == Some(&GraphValue::from("P005")))
        .unwrap();
    assert_eq!(p005.from.label, "Professor");
    assert_eq!(p005.to.label, "Subj");
    assert_eq!(p005.to.get("id"), Some(&GraphValue::from("SUB101")));
    // Anchor columns are not copied onto the relationship.
    assert_eq!(p005.properties.len(), 1);
    assert_eq!(prop(&p005.properties, "semester"), &GraphValue::from("2"));

    let takes = graph.relationships("TAKES");
    let databases = takes
        .iter()
        .find(|r| r.to.get("id") == Some(&GraphValue::from("SUB101")))
        .unwrap();
    assert_eq!(prop(&databases.properties, "grade"), &GraphValue::Float(8.5));
    assert_eq!(prop(&databases.properties, "year"), &GraphValue::Integer(2018));
}

#[tokio::test]
async fn test_foreign_key_edges() {
    let catalog = Catalog::university();
    let source = university("");
    let graph = MemoryGraph::new();
    Transfer::new(&catalog, &source, &graph).run().await.unwrap();

    let heads = graph.relationships("HEADS");
    assert_eq!(heads.len(), 2);
    assert!(heads.iter().all(|r| r.from.label == "Professor" && r.to.label == "Department"));
    assert!(heads.iter().all(|r| r.properties.is_empty()));

    let part_of = graph.relationships("PART_OF");
    let mut members: Vec<&GraphValue> = part_of.iter().filter_map(|r| r.from.get("name")).collect();
    members.sort_by_key(|v| v.to_string());
    assert_eq!(members, vec![&GraphValue::from("Ana"), &GraphValue::from("Bruno")]);
    assert!(part_of.iter().all(|r| r.to.label == "TccGroup"));

    let mentored = graph.relationships("MENTORED_BY");
    assert_eq!(mentored.len(), 1);
    assert_eq!(mentored[0].to.get("name"), Some(&GraphValue::from("Eve")));

    // A null foreign key is neither a property nor a missing endpoint.
    let carla = graph
        .nodes("Student")
        .into_iter()
        .find(|s| s.get("name") == Some(&GraphValue::from("Carla")))
        .unwrap();
    assert!(carla.get("group_id").is_none());
}

#[tokio::test]
async fn test_rerun_produces_same_graph() {
    let catalog = Catalog::university();
    let source = university("");
    let graph = MemoryGraph::new();

    let first = Transfer::new(&catalog, &source, &graph).run().await.unwrap();
    let snapshot = graph.snapshot();
    let second = Transfer::new(&catalog, &source, &graph).run().await.unwrap();

    assert_eq!(graph.snapshot(), snapshot);
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_unlisted_table_becomes_node_and_bad_row_is_skipped() {
    let catalog = Catalog::university();
    let source = university(
        "CREATE TABLE photos (id TEXT PRIMARY KEY, image BLOB);
         INSERT INTO photos VALUES ('ph1', x'00FF');
         INSERT INTO photos VALUES ('ph2', NULL);",
    );
    let graph = MemoryGraph::new();

    let report = Transfer::new(&catalog, &source, &graph).run().await.unwrap();

    assert_eq!(report.constraints, 7);
    assert_eq!(graph.nodes("Photo").len(), 1);
    assert_eq!(report.skipped_rows.len(), 1);
    assert_eq!(report.skipped_rows[0].table, "photos");
    assert_eq!(report.skipped_rows[0].row, 0);
    assert!(report.skipped_rows[0].reason.contains("image"));

    let photos = report.tables.iter().find(|t| t.table == "photos").unwrap();
    assert_eq!((photos.rows_read, photos.nodes_created, photos.rows_skipped), (2, 1, 1));
}

#[tokio::test]
async fn test_strict_catalog_fails_before_wipe() {
    let catalog = Catalog::university().with_policy(DefaultPolicy::Reject);
    let source = university("CREATE TABLE audit_log (id INTEGER, entry TEXT);");
    let graph = MemoryGraph::new();
    graph
        .create_node(&NodeCreate {
            label: "Previous".into(),
            properties: vec![("id".into(), "keep".into())],
        })
        .await
        .unwrap();

    let err = Transfer::new(&catalog, &source, &graph).run().await.unwrap_err();

    assert!(matches!(
        err,
        TransferError::Catalog(CatalogError::UnlistedTables(ref tables)) if tables == &vec!["audit_log".to_string()]
    ));
    assert_eq!(graph.node_count(), 1);
}

#[tokio::test]
async fn test_cancelled_before_start_leaves_graph_alone() {
    let catalog = Catalog::university();
    let source = university("");
    let graph = MemoryGraph::new();
    graph
        .create_node(&NodeCreate {
            label: "Previous".into(),
            properties: vec![],
        })
        .await
        .unwrap();

    let cancel = CancellationToken::new();
    cancel.cancel();
    let report = Transfer::new(&catalog, &source, &graph)
        .with_cancellation(cancel)
        .run()
        .await
        .unwrap();

    assert_eq!(report.outcome(), Outcome::Cancelled);
    assert!(report.tables.is_empty());
    assert_eq!(graph.node_count(), 1);
}

#[tokio::test]
async fn test_cancel_stops_at_next_table() {
    let catalog = Catalog::university();
    let cancel = CancellationToken::new();
    let source = Interrupting {
        inner: university(""),
        table: "course",
        interruption: Interruption::Cancel(cancel.clone()),
    };
    let graph = MemoryGraph::new();

    let report = Transfer::new(&catalog, &source, &graph)
        .with_cancellation(cancel)
        .run()
        .await
        .unwrap();

    // course is the first node table; it finishes, nothing after it starts.
    assert!(report.cancelled);
    assert_eq!(report.tables.len(), 1);
    assert_eq!(report.tables[0].table, "course");
    assert_eq!(graph.node_count(), 1);
    assert_eq!(graph.relationship_count(), 0);
}

#[tokio::test]
async fn test_unreadable_table_does_not_block_others() {
    let catalog = Catalog::university();
    let source = Interrupting {
        inner: university(""),
        table: "professor",
        interruption: Interruption::TableError,
    };
    let graph = MemoryGraph::new();

    let report = Transfer::new(&catalog, &source, &graph).run().await.unwrap();

    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].table, "professor");
    assert_eq!(report.failures[0].phase, Phase::Nodes);
    assert!(graph.nodes("Professor").is_empty());
    assert_eq!(graph.nodes("Student").len(), 3);

    // Every edge into a professor now dangles: 2 TEACHES, 2 HEADS, 1 MENTORED_BY, plus the bad TAKES row.
    assert_eq!(report.missing_endpoints.len(), 6);
    assert_eq!(graph.relationships("IS_REQ_OF").len(), 2);
    assert_eq!(report.outcome(), Outcome::CompleteWithErrors);
}

#[tokio::test]
async fn test_lost_source_connection_aborts_run() {
    let catalog = Catalog::university();
    let source = Interrupting {
        inner: university(""),
        table: "professor",
        interruption: Interruption::ConnectionLost,
    };
    let graph = MemoryGraph::new();

    let err = Transfer::new(&catalog, &source, &graph).run().await.unwrap_err();

    assert!(matches!(
        err,
        TransferError::Source { phase: Phase::Nodes, ref source } if matches!(source, SourceError::Unavailable(_))
    ));
    // course and department came before professor; nothing after it ran.
    assert_eq!(graph.nodes("Course").len(), 1);
    assert_eq!(graph.nodes("Department").len(), 2);
    assert!(graph.nodes("Student").is_empty());
    assert_eq!(graph.relationship_count(), 0);
}

#[tokio::test]
async fn test_lost_store_connection_aborts_node_phase() {
    let catalog = Catalog::university();
    let source = university("");
    let graph = Disconnecting {
        inner: MemoryGraph::new(),
        name: "Professor",
    };

    let err = Transfer::new(&catalog, &source, &graph).run().await.unwrap_err();

    assert!(matches!(
        err,
        TransferError::Store { phase: Phase::Nodes, ref source } if source.is_connection()
    ));
    assert!(graph.inner.nodes("Student").is_empty());
}

#[tokio::test]
async fn test_lost_store_connection_aborts_relationship_phase() {
    let catalog = Catalog::university();
    let source = university("");
    let graph = Disconnecting {
        inner: MemoryGraph::new(),
        name: "TAKES",
    };

    let err = Transfer::new(&catalog, &source, &graph).run().await.unwrap_err();

    assert!(matches!(err, TransferError::Store { phase: Phase::Relationships, .. }));
    assert_eq!(graph.inner.node_count(), 11);
    assert!(graph.inner.relationships("TAKES").is_empty());
    assert!(graph.inner.relationships("TEACHES").is_empty());
}

#[tokio::test]
async fn test_duplicate_key_row_is_skipped() {
    let catalog = Catalog::university();
    let source = MemorySource::new()
        .with_table(
            "student",
            &["id", "name", "group_id"],
            vec![
                vec!["100000001".into(), "Ana".into(), SqlValue::Null],
                vec!["100000001".into(), "Ana again".into(), SqlValue::Null],
                vec!["100000002".into(), "Bruno".into(), SqlValue::Null],
            ],
        )
        .with_table("subj", &["id", "title"], vec![vec!["SUB101".into(), "Databases".into()]])
        .with_table(
            "takes",
            &["student_id", "subj_id", "grade"],
            vec![vec!["100000001".into(), "SUB101".into(), SqlValue::Float(9.0)]],
        );
    let graph = MemoryGraph::new();

    let report = Transfer::new(&catalog, &source, &graph).run().await.unwrap();

    assert_eq!(graph.nodes("Student").len(), 2);
    assert_eq!(report.skipped_rows.len(), 1);
    assert_eq!(report.skipped_rows[0].table, "student");
    assert_eq!(report.skipped_rows[0].row, 1);
    assert!(report.skipped_rows[0].reason.contains("already exists"));

    // The surviving node still anchors exactly one relationship.
    assert_eq!(graph.relationships("TAKES").len(), 1);
    assert_eq!(report.outcome(), Outcome::CompleteWithErrors);
}

#[tokio::test]
async fn test_join_table_without_anchor_column_fails() {
    let catalog = Catalog::university();
    let source = MemorySource::new()
        .with_table("professor", &["id", "name"], vec![vec!["P005".into(), "Eve".into()]])
        .with_table("subj", &["id", "title"], vec![vec!["SUB101".into(), "Databases".into()]])
        .with_table(
            "teaches",
            &["professor_id", "semester"],
            vec![vec!["P005".into(), "2".into()]],
        );
    let graph = MemoryGraph::new();

    let report = Transfer::new(&catalog, &source, &graph).run().await.unwrap();

    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].table, "teaches");
    assert_eq!(report.failures[0].phase, Phase::Relationships);
    assert!(report.failures[0].error.contains("subj_id"));
    assert_eq!(graph.node_count(), 2);
    assert_eq!(graph.relationship_count(), 0);
    assert_eq!(report.outcome(), Outcome::CompleteWithErrors);
}
