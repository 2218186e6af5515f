//! CLI command definitions and handlers.

use anyhow::{Result, bail};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use unigraph_db::SourceConfig;
use unigraph_graph::{GraphConfig, ReportKind, ReportParams};

pub mod catalog;
pub mod report;
pub mod run;
pub mod status;
pub mod transfer;

/// Relational-to-graph transfer for the university schema
#[derive(Parser)]
#[command(name = "unigraph")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Also write logs to this file
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Wipe the graph and migrate every source table into it
    Transfer(transfer::TransferArgs),

    /// Run the fixed report queries and write query-N.json files
    Report(report::ReportArgs),

    /// Transfer, then write every report
    Run(run::RunArgs),

    /// Show node and relationship counts of the graph
    Status(GraphArgs),

    /// Show the schema catalog and how source tables resolve against it
    Catalog(catalog::CatalogArgs),
}

impl Cli {
    pub async fn execute(self) -> Result<()> {
        match self.command {
            Commands::Transfer(args) => transfer::execute(args).await,
            Commands::Report(args) => report::execute(args).await,
            Commands::Run(args) => run::execute(args).await,
            Commands::Status(args) => status::execute(args).await,
            Commands::Catalog(args) => catalog::execute(args).await,
        }
    }
}

/// Relational source connection.
#[derive(Args, Debug, Clone)]
pub struct SourceArgs {
    /// PostgreSQL connection URL
    #[arg(long, env = "POSTGRES_URL", hide_env_values = true)]
    pub postgres_url: Option<String>,

    /// PostgreSQL schema holding the university tables
    #[arg(long, env = "POSTGRES_SCHEMA", default_value = "public")]
    pub postgres_schema: String,

    /// Read from a SQLite file instead of PostgreSQL (takes precedence)
    #[arg(long, env = "SQLITE_PATH")]
    pub sqlite_path: Option<PathBuf>,
}

impl SourceArgs {
    pub fn is_set(&self) -> bool {
        self.postgres_url.is_some() || self.sqlite_path.is_some()
    }

    pub fn config(&self) -> Result<SourceConfig> {
        match (&self.postgres_url, &self.sqlite_path) {
            (_, Some(path)) => Ok(SourceConfig::Sqlite { path: path.clone() }),
            (Some(url), None) => Ok(SourceConfig::Postgres {
                url: url.clone(),
                schema: self.postgres_schema.clone(),
            }),
            (None, None) => bail!("No source configured. Set POSTGRES_URL or SQLITE_PATH."),
        }
    }
}

/// Neo4j connection.
#[derive(Args, Debug, Clone)]
pub struct GraphArgs {
    /// Neo4j bolt URL
    #[arg(long, env = "NEO4J_URL", default_value = "bolt://localhost:7687")]
    pub neo4j_url: String,

    #[arg(long, env = "NEO4J_USER", default_value = "neo4j")]
    pub neo4j_user: String,

    #[arg(long, env = "NEO4J_PASSWORD", default_value = "", hide_env_values = true)]
    pub neo4j_password: String,

    #[arg(long, env = "NEO4J_DATABASE", default_value = "neo4j")]
    pub neo4j_database: String,
}

impl GraphArgs {
    pub fn config(&self) -> GraphConfig {
        GraphConfig {
            uri: self.neo4j_url.clone(),
            user: self.neo4j_user.clone(),
            password: self.neo4j_password.clone(),
            database: self.neo4j_database.clone(),
        }
    }
}

/// Report parameters and destination.
#[derive(Args, Debug, Clone)]
pub struct ReportOptions {
    /// Directory for the query-N.json files
    #[arg(long, env = "UNIGRAPH_OUTPUT", default_value = "./output")]
    pub output: PathBuf,

    /// Reports to run, by number or name (default: all)
    #[arg(long, value_delimiter = ',', value_parser = parse_report)]
    pub only: Vec<ReportKind>,

    /// Student for the student-record report
    #[arg(long)]
    pub student_id: Option<String>,

    /// Professor for the professor-record report
    #[arg(long)]
    pub professor_id: Option<String>,

    /// Graduation semester
    #[arg(long)]
    pub semester: Option<i64>,

    /// Graduation year
    #[arg(long)]
    pub year: Option<i64>,

    /// Thesis group for the thesis-group report
    #[arg(long)]
    pub group_id: Option<String>,
}

impl ReportOptions {
    pub fn params(&self) -> ReportParams {
        let defaults = ReportParams::default();
        ReportParams {
            student_id: self.student_id.clone().unwrap_or(defaults.student_id),
            professor_id: self.professor_id.clone().unwrap_or(defaults.professor_id),
            semester: self.semester.unwrap_or(defaults.semester),
            year: self.year.unwrap_or(defaults.year),
            group_id: self.group_id.clone().unwrap_or(defaults.group_id),
        }
    }

    pub fn kinds(&self) -> Vec<ReportKind> {
        if self.only.is_empty() {
            ReportKind::ALL.to_vec()
        } else {
            self.only.clone()
        }
    }
}

fn parse_report(s: &str) -> Result<ReportKind, String> {
    ReportKind::parse(s).ok_or_else(|| {
        let names: Vec<&str> = ReportKind::ALL.iter().map(|k| k.name()).collect();
        format!("unknown report '{}' (use 1-5 or one of: {})", s, names.join(", "))
    })
}
