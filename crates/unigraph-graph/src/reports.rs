//! Fixed report queries over the migrated graph.
//!
//! Each report runs one Cypher query and writes its result set to
//! `<dir>/query-N.json`.

use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::info;

use unigraph_core::GraphValue;

use crate::GraphClient;
use crate::cypher::Statement;

/// Query parameters. Defaults match the reference university dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportParams {
    pub student_id: String,
    pub professor_id: String,
    pub semester: i64,
    pub year: i64,
    pub group_id: String,
}

impl Default for ReportParams {
    fn default() -> Self {
        Self {
            student_id: "100000001".to_string(),
            professor_id: "P005".to_string(),
            semester: 2,
            year: 2018,
            group_id: "CC1111111".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportKind {
    StudentRecord,
    ProfessorRecord,
    Graduates,
    DepartmentHeads,
    ThesisGroup,
}

impl ReportKind {
    pub const ALL: [ReportKind; 5] = [
        ReportKind::StudentRecord,
        ReportKind::ProfessorRecord,
        ReportKind::Graduates,
        ReportKind::DepartmentHeads,
        ReportKind::ThesisGroup,
    ];

    pub fn number(self) -> usize {
        match self {
            ReportKind::StudentRecord => 1,
            ReportKind::ProfessorRecord => 2,
            ReportKind::Graduates => 3,
            ReportKind::DepartmentHeads => 4,
            ReportKind::ThesisGroup => 5,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ReportKind::StudentRecord => "student-record",
            ReportKind::ProfessorRecord => "professor-record",
            ReportKind::Graduates => "graduates",
            ReportKind::DepartmentHeads => "department-heads",
            ReportKind::ThesisGroup => "thesis-group",
        }
    }

    /// Look a report up by number (`"3"`) or name (`"graduates"`).
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.name() == s || kind.number().to_string() == s)
    }

    pub fn file_name(self) -> String {
        format!("query-{}.json", self.number())
    }

    /// Returned columns, in output order.
    pub fn columns(self) -> &'static [&'static str] {
        match self {
            ReportKind::StudentRecord => &["student_id", "subj_id", "subject_title", "semester", "year", "grade"],
            ReportKind::ProfessorRecord => &["professor_id", "subj_id", "subject_title", "semester", "year"],
            ReportKind::Graduates => &["student_id", "name", "course_id"],
            ReportKind::DepartmentHeads => &["professor_id", "professor_name", "department_name", "department_budget"],
            ReportKind::ThesisGroup => &["group_id", "professor_name", "students"],
        }
    }

    /// Whether the report is a single record rather than a list.
    pub fn is_single(self) -> bool {
        self == ReportKind::ThesisGroup
    }

    pub fn statement(self, params: &ReportParams) -> Statement {
        let (text, params) = match self {
            ReportKind::StudentRecord => (
                "MATCH (s:Student {id: $student_id})-[t:TAKES]->(sub:Subj)
                 RETURN s.id AS student_id, sub.id AS subj_id, sub.title AS subject_title,
                        t.semester AS semester, t.year AS year, t.grade AS grade
                 ORDER BY year, semester, subj_id",
                vec![("student_id", GraphValue::from(params.student_id.as_str()))],
            ),
            ReportKind::ProfessorRecord => (
                "MATCH (p:Professor {id: $professor_id})-[t:TEACHES]->(sub:Subj)
                 RETURN p.id AS professor_id, sub.id AS subj_id, sub.title AS subject_title,
                        t.semester AS semester, t.year AS year
                 ORDER BY year, semester, subj_id",
                vec![("professor_id", GraphValue::from(params.professor_id.as_str()))],
            ),
            // semester and year may be stored as text or numbers depending on the source column
            ReportKind::Graduates => (
                "MATCH (s:Student)-[g:GRADUATED_FROM]->(c:Course)
                 WHERE toString(g.semester) = toString($semester) AND toString(g.year) = toString($year)
                 RETURN s.id AS student_id, s.name AS name, c.id AS course_id
                 ORDER BY student_id",
                vec![
                    ("semester", GraphValue::from(params.semester)),
                    ("year", GraphValue::from(params.year)),
                ],
            ),
            ReportKind::DepartmentHeads => (
                "MATCH (p:Professor)-[:HEADS]->(d:Department)
                 RETURN p.id AS professor_id, p.name AS professor_name,
                        d.dept_name AS department_name, d.budget AS department_budget
                 ORDER BY department_name",
                vec![],
            ),
            ReportKind::ThesisGroup => (
                "MATCH (g:TccGroup {id: $group_id})
                 OPTIONAL MATCH (g)-[:MENTORED_BY]->(p:Professor)
                 OPTIONAL MATCH (s:Student)-[:PART_OF]->(g)
                 RETURN g.id AS group_id, p.name AS professor_name, collect(s.name) AS students",
                vec![("group_id", GraphValue::from(params.group_id.as_str()))],
            ),
        };

        Statement {
            text: text.to_string(),
            params: params.into_iter().map(|(k, v)| (k.to_string(), v)).collect(),
        }
    }

    /// Shape fetched records into the report's JSON document.
    pub fn document(self, records: Vec<Map<String, Value>>) -> Value {
        if self.is_single() {
            records.into_iter().next().map(Value::Object).unwrap_or(Value::Null)
        } else {
            Value::Array(records.into_iter().map(Value::Object).collect())
        }
    }
}

impl fmt::Display for ReportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.number(), self.name())
    }
}

/// Run one report against Neo4j.
pub async fn run_report(client: &GraphClient, kind: ReportKind, params: &ReportParams) -> Result<Value> {
    let rows = client
        .query(kind.statement(params).into_query())
        .await
        .with_context(|| format!("Report {} failed", kind))?;

    let records = rows
        .iter()
        .map(|row| record(kind, |col| row.get::<Option<Value>>(col)))
        .collect::<Result<Vec<_>>>()?;

    Ok(kind.document(records))
}

/// One result row as a JSON object. `get` reads a column; `None` is a real null.
fn record<E: fmt::Debug>(
    kind: ReportKind,
    mut get: impl FnMut(&str) -> std::result::Result<Option<Value>, E>,
) -> Result<Map<String, Value>> {
    kind.columns()
        .iter()
        .map(|col| {
            // OPTIONAL MATCH misses come back as null
            let value = get(col)
                .map_err(|e| anyhow::anyhow!("{:?}", e))
                .with_context(|| format!("Report {}: failed to read column '{}'", kind, col))?;
            Ok((col.to_string(), value.unwrap_or(Value::Null)))
        })
        .collect()
}

/// Write a report document to `<dir>/query-N.json`, creating `dir` if needed.
pub fn write_report_file(dir: &Path, kind: ReportKind, document: &Value) -> Result<PathBuf> {
    std::fs::create_dir_all(dir).with_context(|| format!("Failed to create output directory {}", dir.display()))?;

    let path = dir.join(kind.file_name());
    let json = serde_json::to_string_pretty(document).context("Failed to serialize report")?;
    std::fs::write(&path, json).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(path)
}

/// Run `kinds` in order and write each result file.
pub async fn write_reports(
    client: &GraphClient,
    kinds: &[ReportKind],
    params: &ReportParams,
    dir: &Path,
) -> Result<Vec<PathBuf>> {
    let mut written = Vec::with_capacity(kinds.len());
    for &kind in kinds {
        let document = run_report(client, kind, params).await?;
        let records = document.as_array().map_or(usize::from(!document.is_null()), Vec::len);
        let path = write_report_file(dir, kind, &document)?;
        info!(report = kind.name(), records, path = %path.display(), "Report written");
        written.push(path);
    }
    Ok(written)
}
