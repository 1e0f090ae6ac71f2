use std::path::{Path, PathBuf};
use std::time::Instant;

use chmask_contracts::canonical::script_digest;
use chmask_contracts::{
    FilterContext, RunMode, Statement, StatementTarget, Window, format_timestamp,
};
use chmask_planner::{interval, statement};
use chmask_policy::MaskSpecRegistry;
use chrono::NaiveDateTime;

use crate::config::RunnerConfig;
use crate::executor::{DispatchError, HttpExecutor, StatementExecutor};
use crate::metrics;

const STATEMENT_SEPARATOR: &str = "\n\n";

#[derive(Debug)]
pub enum JobError {
    MissingEndpoint,
    Connection(DispatchError),
    ArtifactWrite {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl std::fmt::Display for JobError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobError::MissingEndpoint => write!(f, "EXECUTE mode requires a ClickHouse endpoint"),
            JobError::Connection(err) => write!(f, "cannot reach ClickHouse: {}", err),
            JobError::ArtifactWrite { path, source } => {
                write!(f, "failed to write {}: {}", path.display(), source)
            }
        }
    }
}

impl std::error::Error for JobError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            JobError::MissingEndpoint => None,
            JobError::Connection(err) => Some(err),
            JobError::ArtifactWrite { source, .. } => Some(source),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatementFailure {
    pub table_name: String,
    pub window: Window,
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub path: PathBuf,
    pub sha256: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobOutcome {
    pub mode: RunMode,
    pub windows: usize,
    pub statements: usize,
    pub succeeded: usize,
    pub failures: Vec<StatementFailure>,
    pub artifact: Option<Artifact>,
}

/// One masking run: a registry, a customer scope and the windows planned once for
/// the requested range.
pub struct MaskingJob {
    registry: MaskSpecRegistry,
    target: StatementTarget,
    filter: FilterContext,
    windows: Vec<Window>,
}

impl MaskingJob {
    pub fn new(
        registry: MaskSpecRegistry,
        target: StatementTarget,
        filter: FilterContext,
        start: NaiveDateTime,
        end: NaiveDateTime,
        window_minutes: u32,
    ) -> Self {
        let windows = interval::plan(start, end, window_minutes);
        Self {
            registry,
            target,
            filter,
            windows,
        }
    }

    pub fn from_config(config: &RunnerConfig, registry: MaskSpecRegistry) -> Self {
        Self::new(
            registry,
            config.target.clone(),
            config.filter(),
            config.start,
            config.end,
            config.interval_minutes,
        )
    }

    pub fn windows(&self) -> &[Window] {
        &self.windows
    }

    pub fn statement_count(&self) -> usize {
        self.registry.len() * self.windows.len()
    }

    pub fn statements(&self) -> impl Iterator<Item = Statement> + '_ {
        statement::statements(&self.registry, &self.target, &self.filter, &self.windows).inspect(
            |statement| metrics::observe_statement_built(&statement.table_name),
        )
    }

    /// Writes every statement to `path`, separated by blank lines. Nothing is sent to
    /// the store.
    pub fn generate(&self, path: &Path) -> Result<JobOutcome, JobError> {
        let texts = self.statements().map(|s| s.text).collect::<Vec<_>>();
        let script = texts.join(STATEMENT_SEPARATOR);

        let write = || -> std::io::Result<()> {
            if let Some(parent) = path.parent()
                && !parent.as_os_str().is_empty()
            {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(path, script.as_bytes())
        };
        write().map_err(|source| JobError::ArtifactWrite {
            path: path.to_path_buf(),
            source,
        })?;

        let sha256 = script_digest(&script);
        tracing::info!(
            path = %path.display(),
            statements = texts.len(),
            sha256 = %sha256,
            "generated queries saved"
        );

        Ok(JobOutcome {
            mode: RunMode::Generate,
            windows: self.windows.len(),
            statements: texts.len(),
            succeeded: texts.len(),
            failures: Vec::new(),
            artifact: Some(Artifact {
                path: path.to_path_buf(),
                sha256,
            }),
        })
    }

    /// Builds and dispatches statements one at a time. A failed statement is logged
    /// and recorded, and the run moves on to the next (table, window) pair.
    pub async fn execute<E: StatementExecutor>(&self, executor: &E) -> JobOutcome {
        let mut statements = 0;
        let mut succeeded = 0;
        let mut failures = Vec::new();

        for statement in self.statements() {
            statements += 1;
            let window_start = format_timestamp(&statement.window.start);
            let window_end = format_timestamp(&statement.window.end);
            tracing::info!(
                table = %statement.table_name,
                window_start = %window_start,
                window_end = %window_end,
                "running mask statement"
            );

            let started = Instant::now();
            let result = executor.execute(&statement).await;
            metrics::observe_dispatch(&statement.table_name, result.is_ok(), started.elapsed());

            match result {
                Ok(()) => {
                    succeeded += 1;
                    tracing::info!(
                        table = %statement.table_name,
                        window_start = %window_start,
                        window_end = %window_end,
                        "mask statement executed successfully"
                    );
                }
                Err(err) => {
                    tracing::error!(
                        table = %statement.table_name,
                        window_start = %window_start,
                        window_end = %window_end,
                        error = %err,
                        "mask statement failed"
                    );
                    failures.push(StatementFailure {
                        table_name: statement.table_name,
                        window: statement.window,
                        error: err.to_string(),
                    });
                }
            }
        }

        tracing::info!(
            statements,
            succeeded,
            failed = failures.len(),
            "mask run finished"
        );

        JobOutcome {
            mode: RunMode::Execute,
            windows: self.windows.len(),
            statements,
            succeeded,
            failures,
            artifact: None,
        }
    }
}

/// Runs the job described by `config`. In EXECUTE mode the store must answer a
/// connectivity check before any statement is sent.
pub async fn run(config: &RunnerConfig, registry: MaskSpecRegistry) -> Result<JobOutcome, JobError> {
    let job = MaskingJob::from_config(config, registry);
    tracing::info!(
        mode = config.mode.as_str(),
        customer_id = config.customer_id,
        engine_id = ?config.engine_id,
        windows = job.windows().len(),
        statements = job.statement_count(),
        "planned mask run"
    );

    match (config.mode, &config.clickhouse) {
        (RunMode::Execute, Some(endpoint)) => {
            let executor = HttpExecutor::new(endpoint).map_err(JobError::Connection)?;
            tracing::info!(url = %executor.url(), "connecting to ClickHouse");
            executor
                .check_connectivity()
                .await
                .map_err(JobError::Connection)?;
            tracing::info!("ClickHouse connection verified");
            Ok(job.execute(&executor).await)
        }
        (RunMode::Execute, None) => Err(JobError::MissingEndpoint),
        (RunMode::Generate, _) => job.generate(&config.artifact_path()),
    }
}
