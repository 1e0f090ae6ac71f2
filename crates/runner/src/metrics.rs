use std::path::Path;
use std::sync::OnceLock;
use std::time::Duration;

use prometheus::{Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder};

static REGISTRY: OnceLock<Registry> = OnceLock::new();
static STATEMENTS_BUILT_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();
static STATEMENTS_DISPATCHED_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();
static STATEMENT_DISPATCH_DURATION_SECONDS: OnceLock<HistogramVec> = OnceLock::new();

fn registry() -> &'static Registry {
    REGISTRY.get_or_init(Registry::new)
}

fn register_collector<T>(collector: T) -> T
where
    T: prometheus::core::Collector + Clone + 'static,
{
    let _ = registry().register(Box::new(collector.clone()));
    collector
}

fn statements_built_total() -> &'static IntCounterVec {
    STATEMENTS_BUILT_TOTAL.get_or_init(|| {
        register_collector(
            IntCounterVec::new(
                Opts::new(
                    "chmask_statements_built_total",
                    "Mask statements rendered, by table.",
                ),
                &["table"],
            )
            .expect("create chmask_statements_built_total"),
        )
    })
}

fn statements_dispatched_total() -> &'static IntCounterVec {
    STATEMENTS_DISPATCHED_TOTAL.get_or_init(|| {
        register_collector(
            IntCounterVec::new(
                Opts::new(
                    "chmask_statements_dispatched_total",
                    "Mask statements sent to ClickHouse, by table and outcome.",
                ),
                &["table", "outcome"],
            )
            .expect("create chmask_statements_dispatched_total"),
        )
    })
}

fn statement_dispatch_duration_seconds() -> &'static HistogramVec {
    STATEMENT_DISPATCH_DURATION_SECONDS.get_or_init(|| {
        register_collector(
            HistogramVec::new(
                HistogramOpts::new(
                    "chmask_statement_dispatch_duration_seconds",
                    "Mask statement round-trip duration in seconds.",
                )
                .buckets(vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0]),
                &["outcome"],
            )
            .expect("create chmask_statement_dispatch_duration_seconds"),
        )
    })
}

pub fn observe_statement_built(table: &str) {
    statements_built_total().with_label_values(&[table]).inc();
}

pub fn observe_dispatch(table: &str, success: bool, duration: Duration) {
    let outcome = if success { "success" } else { "error" };
    statements_dispatched_total()
        .with_label_values(&[table, outcome])
        .inc();
    statement_dispatch_duration_seconds()
        .with_label_values(&[outcome])
        .observe(duration.as_secs_f64());
}

pub fn render() -> Result<Vec<u8>, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = registry().gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    Ok(buffer)
}

/// Writes the current metrics in text exposition format, for a node-exporter textfile
/// collector to pick up after the run.
pub fn write_textfile(path: &Path) -> std::io::Result<()> {
    let buffer = render().map_err(|err| std::io::Error::other(err.to_string()))?;
    std::fs::write(path, buffer)
}
