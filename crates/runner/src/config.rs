use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chmask_contracts::{FilterContext, RunMode, StatementTarget, parse_timestamp};
use chmask_policy::MaskSpecRegistry;
use chrono::NaiveDateTime;

#[derive(Debug, Clone)]
pub struct RunnerConfig {
    pub customer_id: i64,
    pub engine_id: Option<i64>,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub interval_minutes: u32,
    pub mode: RunMode,
    pub target: StatementTarget,
    /// Present only in EXECUTE mode.
    pub clickhouse: Option<ClickHouseEndpoint>,
    pub output_dir: PathBuf,
    pub log_path: PathBuf,
    pub tables: Vec<String>,
    pub mask_spec_path: Option<PathBuf>,
    pub metrics_path: Option<PathBuf>,
}

#[derive(Clone)]
pub struct ClickHouseEndpoint {
    pub url: String,
    pub user: String,
    pub password: String,
    pub timeout: Duration,
}

impl std::fmt::Debug for ClickHouseEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClickHouseEndpoint")
            .field("url", &self.url)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartupError {
    pub code: &'static str,
    pub message: String,
}

impl std::fmt::Display for StartupError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for StartupError {}

const DEFAULT_ENV_FILE: &str = ".env";
const DEFAULT_CLUSTER: &str = "analytics";
const DEFAULT_TABLE_SUFFIX: &str = "_local";
const DEFAULT_CLICKHOUSE_PORT: u16 = 8123;
const DEFAULT_CLICKHOUSE_TIMEOUT_SECS: u64 = 60;
const DEFAULT_LOG_PATH: &str = "ClickhouseMasking.log";

impl RunnerConfig {
    pub fn load() -> Result<Self, StartupError> {
        let mut merged = HashMap::new();

        match std::env::var("MASK_ENV_FILE") {
            Ok(path) if !path.trim().is_empty() => {
                merged.extend(parse_env_file(path.trim())?);
            }
            _ => {
                if Path::new(DEFAULT_ENV_FILE).is_file() {
                    merged.extend(parse_env_file(DEFAULT_ENV_FILE)?);
                }
            }
        }

        merged.extend(std::env::vars());

        Self::from_kv(&merged)
    }

    pub fn from_kv(kv: &HashMap<String, String>) -> Result<Self, StartupError> {
        let customer_id = parse_i64(&require_nonempty(kv, "CUSTOMER_ID")?, "CUSTOMER_ID")?;

        let engine_id = match nonempty(kv, "ENGINE_ID") {
            Some(raw) => Some(parse_i64(&raw, "ENGINE_ID")?),
            None => None,
        };

        let start = parse_datetime(&require_nonempty(kv, "START_DATETIME")?, "START_DATETIME")?;
        let end = parse_datetime(&require_nonempty(kv, "END_DATETIME")?, "END_DATETIME")?;

        let interval_minutes = require_nonempty(kv, "INTERVAL_MINUTES")?
            .parse::<u32>()
            .map_err(|_| StartupError {
                code: "ERR_INVALID_CONFIG",
                message: "INTERVAL_MINUTES must be a positive integer".to_string(),
            })?;
        if interval_minutes == 0 {
            return Err(StartupError {
                code: "ERR_INVALID_CONFIG",
                message: "INTERVAL_MINUTES must be > 0".to_string(),
            });
        }

        let mode = parse_mode(&require_nonempty(kv, "MODE")?)?;

        let target = StatementTarget {
            database: require_nonempty(kv, "CLICKHOUSE_DATABASE")?,
            table_suffix: kv
                .get("MASK_TABLE_SUFFIX")
                .map(|s| s.trim().to_string())
                .unwrap_or_else(|| DEFAULT_TABLE_SUFFIX.to_string()),
            cluster: match kv.get("CLICKHOUSE_CLUSTER") {
                None => Some(DEFAULT_CLUSTER.to_string()),
                Some(raw) => Some(raw.trim())
                    .filter(|s| !s.is_empty())
                    .map(|s| s.to_string()),
            },
        };

        let clickhouse = match mode {
            RunMode::Execute => Some(parse_clickhouse_endpoint(kv)?),
            RunMode::Generate => None,
        };

        let output_dir = nonempty(kv, "MASK_OUTPUT_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."));
        let log_path = nonempty(kv, "MASK_LOG_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_PATH));

        let mut tables = nonempty(kv, "MASK_TABLES")
            .unwrap_or_default()
            .split(',')
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .map(|s| s.to_string())
            .collect::<Vec<_>>();
        tables.dedup();

        Ok(Self {
            customer_id,
            engine_id,
            start,
            end,
            interval_minutes,
            mode,
            target,
            clickhouse,
            output_dir,
            log_path,
            tables,
            mask_spec_path: nonempty(kv, "MASK_SPEC_PATH").map(PathBuf::from),
            metrics_path: nonempty(kv, "MASK_METRICS_PATH").map(PathBuf::from),
        })
    }

    pub fn filter(&self) -> FilterContext {
        FilterContext {
            customer_id: self.customer_id,
            engine_id: self.engine_id,
        }
    }

    /// `queries_<customer>_<engine|all>.sql` under the output directory.
    pub fn artifact_path(&self) -> PathBuf {
        let engine = self
            .engine_id
            .map(|id| id.to_string())
            .unwrap_or_else(|| "all".to_string());
        self.output_dir
            .join(format!("queries_{}_{}.sql", self.customer_id, engine))
    }

    /// Builds the registry for this run: the JSON override when configured, else the
    /// built-in tables, narrowed to `MASK_TABLES`.
    pub fn registry(&self) -> Result<MaskSpecRegistry, StartupError> {
        let registry = match &self.mask_spec_path {
            Some(path) => {
                let raw = std::fs::read_to_string(path).map_err(|_| StartupError {
                    code: "ERR_MASK_SPEC",
                    message: format!("failed to read mask spec at {}", path.display()),
                })?;
                MaskSpecRegistry::from_json(&raw).map_err(|err| StartupError {
                    code: "ERR_MASK_SPEC",
                    message: err.to_string(),
                })?
            }
            None => MaskSpecRegistry::builtin(),
        };

        registry.select(&self.tables).map_err(|err| StartupError {
            code: "ERR_MASK_SPEC",
            message: err.to_string(),
        })
    }
}

fn parse_env_file(path: &str) -> Result<HashMap<String, String>, StartupError> {
    let contents = std::fs::read_to_string(path).map_err(|_| StartupError {
        code: "ERR_CONFIG_FILE_READ",
        message: format!("failed to read config file at {}", path),
    })?;

    parse_env_contents(&contents)
}

fn parse_env_contents(contents: &str) -> Result<HashMap<String, String>, StartupError> {
    let mut kv = HashMap::new();

    for (idx, raw_line) in contents.lines().enumerate() {
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let line = line.strip_prefix("export ").unwrap_or(line);

        let (key, value) = line.split_once('=').ok_or_else(|| StartupError {
            code: "ERR_CONFIG_FILE_PARSE",
            message: format!("invalid config line {} (expected KEY=VALUE)", idx + 1),
        })?;

        let key = key.trim();
        if key.is_empty() {
            return Err(StartupError {
                code: "ERR_CONFIG_FILE_PARSE",
                message: format!("invalid config line {} (empty key)", idx + 1),
            });
        }

        kv.insert(key.to_string(), strip_quotes(value.trim()));
    }

    Ok(kv)
}

fn strip_quotes(s: &str) -> String {
    let bytes = s.as_bytes();
    if bytes.len() >= 2 {
        let first = bytes[0];
        let last = bytes[bytes.len() - 1];
        if (first == b'"' && last == b'"') || (first == b'\'' && last == b'\'') {
            return s[1..bytes.len() - 1].to_string();
        }
    }
    s.to_string()
}

fn nonempty(kv: &HashMap<String, String>, key: &str) -> Option<String> {
    kv.get(key)
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
}

fn require_nonempty(
    kv: &HashMap<String, String>,
    key: &'static str,
) -> Result<String, StartupError> {
    nonempty(kv, key).ok_or_else(|| StartupError {
        code: "ERR_MISSING_CONFIG",
        message: format!("missing required config key {}", key),
    })
}

fn parse_i64(value: &str, key: &'static str) -> Result<i64, StartupError> {
    value.parse::<i64>().map_err(|_| StartupError {
        code: "ERR_INVALID_CONFIG",
        message: format!("{} must be an integer", key),
    })
}

fn parse_u64(value: Option<String>, default: u64, key: &'static str) -> Result<u64, StartupError> {
    match value {
        None => Ok(default),
        Some(v) => v.parse::<u64>().map_err(|_| StartupError {
            code: "ERR_INVALID_CONFIG",
            message: format!("{} must be an integer", key),
        }),
    }
}

fn parse_datetime(value: &str, key: &'static str) -> Result<NaiveDateTime, StartupError> {
    parse_timestamp(value).map_err(|_| StartupError {
        code: "ERR_INVALID_CONFIG",
        message: format!("{} must use the YYYY-MM-DD HH:MM:SS format", key),
    })
}

fn parse_mode(value: &str) -> Result<RunMode, StartupError> {
    RunMode::parse(value).ok_or_else(|| StartupError {
        code: "ERR_INVALID_CONFIG",
        message: "MODE must be GENERATE or EXECUTE".to_string(),
    })
}

fn parse_clickhouse_endpoint(
    kv: &HashMap<String, String>,
) -> Result<ClickHouseEndpoint, StartupError> {
    let host = require_nonempty(kv, "CLICKHOUSE_HOST")?;

    let port = match nonempty(kv, "CLICKHOUSE_PORT") {
        None => DEFAULT_CLICKHOUSE_PORT,
        Some(raw) => raw.parse::<u16>().map_err(|_| StartupError {
            code: "ERR_INVALID_CONFIG",
            message: "CLICKHOUSE_PORT must be a valid TCP port".to_string(),
        })?,
    };

    let timeout_secs = parse_u64(
        nonempty(kv, "CLICKHOUSE_TIMEOUT"),
        DEFAULT_CLICKHOUSE_TIMEOUT_SECS,
        "CLICKHOUSE_TIMEOUT",
    )?;
    if timeout_secs == 0 {
        return Err(StartupError {
            code: "ERR_INVALID_CONFIG",
            message: "CLICKHOUSE_TIMEOUT must be > 0".to_string(),
        });
    }

    let user = require_nonempty(kv, "CLICKHOUSE_USER")?;
    let password = kv
        .get("CLICKHOUSE_PASSWORD")
        .cloned()
        .unwrap_or_default();

    Ok(ClickHouseEndpoint {
        url: endpoint_url(&host, port),
        user,
        password,
        timeout: Duration::from_secs(timeout_secs),
    })
}

fn endpoint_url(host: &str, port: u16) -> String {
    let host = host.trim_end_matches('/');
    if host.contains("://") {
        format!("{}:{}", host, port)
    } else {
        format!("http://{}:{}", host, port)
    }
}
