//! Configuration loading and resolution
//!
//! Settings resolve with the priority: command-line argument > environment
//! variable > TOML config file > compiled default. The resolved [`Config`]
//! is constructed once in `main` and threaded explicitly into application
//! state; nothing reads configuration ambiently after startup.

use crate::{Error, Result};
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Default bind address for the API service
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:5740";

/// Default on-disk database filename
pub const DEFAULT_DB_FILE: &str = "clauseguard.db";

/// Fully resolved service configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Socket address the HTTP server binds to
    pub bind_addr: SocketAddr,
    /// Path to the SQLite database file
    pub database_path: PathBuf,
    /// Identity provider settings (bearer-token resolution)
    pub identity: IdentityConfig,
    /// Analysis backend settings (structured extraction)
    pub analysis: AnalysisConfig,
    /// Billing settings (webhook verification + checkout sessions)
    pub billing: BillingConfig,
    /// Maximum accepted upload size in bytes
    pub max_upload_bytes: usize,
}

#[derive(Debug, Clone)]
pub struct IdentityConfig {
    /// Base URL of the identity provider, e.g. `https://xyz.supabase.co`
    pub base_url: String,
    /// Service key sent alongside the caller's bearer token
    pub service_key: String,
}

#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    /// OpenAI-compatible API base, e.g. `https://api.openai.com/v1`
    pub base_url: String,
    /// Model identifier submitted with each request
    pub model: String,
    /// Bearer API key for the backend
    pub api_key: String,
    /// Additional attempts after the first for transient failures
    pub max_retries: u32,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
}

#[derive(Debug, Clone)]
pub struct BillingConfig {
    /// Shared secret used to verify webhook signatures
    pub webhook_secret: String,
    /// API secret key for checkout session creation
    pub secret_key: String,
    /// Payment processor API base
    pub api_base: String,
    /// Public base URL used to build success/cancel redirect URLs
    pub public_base_url: String,
    /// Accepted clock skew for webhook signature timestamps, in seconds
    pub signature_tolerance_secs: i64,
}

/// Optional settings parsed from the TOML config file
#[derive(Debug, Default, Deserialize)]
pub struct TomlConfig {
    pub bind_addr: Option<String>,
    pub database_path: Option<String>,
    pub identity_base_url: Option<String>,
    pub identity_service_key: Option<String>,
    pub analysis_base_url: Option<String>,
    pub analysis_model: Option<String>,
    pub analysis_api_key: Option<String>,
    pub analysis_max_retries: Option<u32>,
    pub billing_webhook_secret: Option<String>,
    pub billing_secret_key: Option<String>,
    pub public_base_url: Option<String>,
}

/// Overrides supplied on the command line by the service binary
#[derive(Debug, Default, Clone)]
pub struct CliOverrides {
    pub bind_addr: Option<String>,
    pub database_path: Option<String>,
    pub config_file: Option<PathBuf>,
}

impl Config {
    /// Resolve configuration from CLI overrides, environment, and TOML file.
    pub fn load(cli: &CliOverrides) -> Result<Self> {
        let toml = load_toml_config(cli.config_file.as_deref())?;

        let bind_addr = resolve(
            cli.bind_addr.clone(),
            "CLAUSEGUARD_BIND",
            toml.bind_addr.clone(),
        )
        .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr: SocketAddr = bind_addr
            .parse()
            .map_err(|e| Error::Config(format!("Invalid bind address '{}': {}", bind_addr, e)))?;

        let database_path = resolve(
            cli.database_path.clone(),
            "CLAUSEGUARD_DB",
            toml.database_path.clone(),
        )
        .map(PathBuf::from)
        .unwrap_or_else(default_database_path);

        let identity = IdentityConfig {
            base_url: require(
                resolve(None, "CLAUSEGUARD_IDENTITY_URL", toml.identity_base_url),
                "identity provider base URL",
                "CLAUSEGUARD_IDENTITY_URL",
                "identity_base_url",
            )?,
            service_key: require(
                resolve(None, "CLAUSEGUARD_IDENTITY_KEY", toml.identity_service_key),
                "identity provider service key",
                "CLAUSEGUARD_IDENTITY_KEY",
                "identity_service_key",
            )?,
        };

        let analysis = AnalysisConfig {
            base_url: resolve(None, "CLAUSEGUARD_ANALYSIS_URL", toml.analysis_base_url)
                .unwrap_or_else(|| "https://api.openai.com/v1".to_string()),
            model: resolve(None, "CLAUSEGUARD_ANALYSIS_MODEL", toml.analysis_model)
                .unwrap_or_else(|| "gpt-4o".to_string()),
            api_key: require(
                resolve(None, "CLAUSEGUARD_ANALYSIS_API_KEY", toml.analysis_api_key),
                "analysis backend API key",
                "CLAUSEGUARD_ANALYSIS_API_KEY",
                "analysis_api_key",
            )?,
            max_retries: std::env::var("CLAUSEGUARD_ANALYSIS_MAX_RETRIES")
                .ok()
                .and_then(|v| v.parse().ok())
                .or(toml.analysis_max_retries)
                .unwrap_or(2),
            timeout_secs: 60,
        };

        let billing = BillingConfig {
            webhook_secret: require(
                resolve(None, "CLAUSEGUARD_WEBHOOK_SECRET", toml.billing_webhook_secret),
                "billing webhook signing secret",
                "CLAUSEGUARD_WEBHOOK_SECRET",
                "billing_webhook_secret",
            )?,
            secret_key: require(
                resolve(None, "CLAUSEGUARD_BILLING_KEY", toml.billing_secret_key),
                "billing API secret key",
                "CLAUSEGUARD_BILLING_KEY",
                "billing_secret_key",
            )?,
            api_base: "https://api.stripe.com".to_string(),
            public_base_url: resolve(None, "CLAUSEGUARD_BASE_URL", toml.public_base_url)
                .unwrap_or_else(|| "http://localhost:3000".to_string()),
            signature_tolerance_secs: 300,
        };

        Ok(Config {
            bind_addr,
            database_path,
            identity,
            analysis,
            billing,
            max_upload_bytes: 20 * 1024 * 1024,
        })
    }
}

/// Resolve one setting with CLI > env > TOML priority.
fn resolve(cli: Option<String>, env_var: &str, toml: Option<String>) -> Option<String> {
    if let Some(v) = cli {
        return Some(v);
    }
    if let Ok(v) = std::env::var(env_var) {
        if !v.trim().is_empty() {
            return Some(v);
        }
    }
    toml.filter(|v| !v.trim().is_empty())
}

fn require(
    value: Option<String>,
    what: &str,
    env_var: &str,
    toml_key: &str,
) -> Result<String> {
    value.ok_or_else(|| {
        Error::Config(format!(
            "{} not configured. Set the {} environment variable or '{}' in {}",
            what,
            env_var,
            toml_key,
            default_config_path()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "the config file".to_string()),
        ))
    })
}

/// Load the TOML config file if one exists.
///
/// An explicitly passed path must exist and parse; the default path is
/// optional and silently skipped when absent.
fn load_toml_config(explicit: Option<&Path>) -> Result<TomlConfig> {
    let path = match explicit {
        Some(p) => {
            if !p.exists() {
                return Err(Error::Config(format!(
                    "Config file not found: {}",
                    p.display()
                )));
            }
            p.to_path_buf()
        }
        None => match default_config_path() {
            Some(p) if p.exists() => p,
            _ => return Ok(TomlConfig::default()),
        },
    };

    let content = std::fs::read_to_string(&path)
        .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
    let config: TomlConfig = toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))?;
    info!("Loaded config file: {}", path.display());
    Ok(config)
}

/// Default config file location: `~/.config/clauseguard/config.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("clauseguard").join("config.toml"))
}

/// Default database location: `~/.local/share/clauseguard/clauseguard.db`
/// (platform equivalent), falling back to the working directory.
fn default_database_path() -> PathBuf {
    match dirs::data_dir() {
        Some(d) => d.join("clauseguard").join(DEFAULT_DB_FILE),
        None => {
            warn!("Could not determine data directory; using working directory");
            PathBuf::from(DEFAULT_DB_FILE)
        }
    }
}
