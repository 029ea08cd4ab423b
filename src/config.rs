use std::net::IpAddr;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub max_connections: u32,
    pub host: IpAddr,
    pub port: u16,
    pub max_body_size: usize,
    pub public_dir: PathBuf,
    pub views_dir: PathBuf,
    pub jspsych_dir: PathBuf,
    pub jquery_csv_dir: PathBuf,
    pub submission_mode: SubmissionMode,
    /// Upper bound on detached inserts in flight; further submissions wait.
    pub max_detached_inserts: usize,
    pub log_level: String,
}

/// Whether the submission endpoint waits for the store before answering.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SubmissionMode {
    /// Await the insert; a store failure becomes a 500.
    Acknowledged,
    /// Spawn the insert and answer immediately; failures are only logged.
    Detached,
}

pub const DEFAULT_DATABASE_URL: &str = "postgres://localhost/jspsychdb";
pub const DEFAULT_MAX_BODY_SIZE: &str = "50mb";

impl Config {
    pub fn from_env() -> Result<Self, String> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the config from any key lookup; `from_env` passes the process
    /// environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, String> {
        let env_or = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let database_url = lookup("CONNECTION")
            .or_else(|| lookup("DATABASE_URL"))
            .unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string());

        let max_connections: u32 = env_or("COLLECTOR_MAX_CONNECTIONS", "10")
            .parse()
            .map_err(|e| format!("Invalid COLLECTOR_MAX_CONNECTIONS: {e}"))?;

        let host: IpAddr = env_or("COLLECTOR_HOST", "0.0.0.0")
            .parse()
            .map_err(|e| format!("Invalid COLLECTOR_HOST: {e}"))?;

        let port: u16 = env_or("PORT", "3000")
            .parse()
            .map_err(|e| format!("Invalid PORT: {e}"))?;

        let max_body_size = parse_size(&env_or("COLLECTOR_MAX_BODY_SIZE", DEFAULT_MAX_BODY_SIZE))
            .map_err(|e| format!("Invalid COLLECTOR_MAX_BODY_SIZE: {e}"))?;

        let public_dir = PathBuf::from(env_or("COLLECTOR_PUBLIC_DIR", "public"));
        let views_dir = lookup("COLLECTOR_VIEWS_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| public_dir.join("views"));
        let jspsych_dir = PathBuf::from(env_or("COLLECTOR_JSPSYCH_DIR", "jspsych"));
        let jquery_csv_dir = PathBuf::from(env_or("COLLECTOR_JQUERY_CSV_DIR", "jquery-csv"));

        let submission_mode = match env_or("COLLECTOR_SUBMISSION_MODE", "acknowledged").as_str() {
            "acknowledged" => SubmissionMode::Acknowledged,
            "detached" => SubmissionMode::Detached,
            other => {
                return Err(format!(
                    "Invalid COLLECTOR_SUBMISSION_MODE '{other}': expected 'acknowledged' or 'detached'"
                ));
            }
        };

        let max_detached_inserts: usize = env_or("COLLECTOR_MAX_DETACHED_INSERTS", "64")
            .parse()
            .map_err(|e| format!("Invalid COLLECTOR_MAX_DETACHED_INSERTS: {e}"))?;
        if max_detached_inserts == 0 {
            return Err("Invalid COLLECTOR_MAX_DETACHED_INSERTS: must be at least 1".to_string());
        }

        let log_level = env_or("COLLECTOR_LOG_LEVEL", "info");

        Ok(Config {
            database_url,
            max_connections,
            host,
            port,
            max_body_size,
            public_dir,
            views_dir,
            jspsych_dir,
            jquery_csv_dir,
            submission_mode,
            max_detached_inserts,
            log_level,
        })
    }
}

/// Parse a byte count such as `1048576`, `512kb` or `50mb`.
pub fn parse_size(value: &str) -> Result<usize, String> {
    let value = value.trim().to_ascii_lowercase();
    let (digits, multiplier) = if let Some(n) = value.strip_suffix("gb") {
        (n, 1024 * 1024 * 1024)
    } else if let Some(n) = value.strip_suffix("mb") {
        (n, 1024 * 1024)
    } else if let Some(n) = value.strip_suffix("kb") {
        (n, 1024)
    } else if let Some(n) = value.strip_suffix('b') {
        (n, 1)
    } else {
        (value.as_str(), 1)
    };

    let count: usize = digits
        .trim()
        .parse()
        .map_err(|e| format!("'{value}': {e}"))?;

    count
        .checked_mul(multiplier)
        .ok_or_else(|| format!("'{value}' is too large"))
}
