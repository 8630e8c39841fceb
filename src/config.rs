//! Configuration for tradevault.
//!
//! Resolution is env-var-first with `.env` loaded via dotenvy. The vault
//! master key is the one piece with no default and no fallback: a process
//! that cannot obtain a valid 256-bit key refuses to start, because a
//! derived stand-in key would silently defeat confidentiality of every
//! record written with it.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::ConfigError;
use crate::vault::MasterKey;

const DEFAULT_GATEWAY_BASE_URL: &str = "https://gateway.tradevault.dev";
const DEFAULT_GATEWAY_TIMEOUT_MS: u64 = 10_000;

/// Resolved runtime configuration.
#[derive(Debug)]
pub struct Config {
    /// 256-bit vault master key.
    pub master_key: MasterKey,
    /// Directory holding one encrypted record file per user.
    pub data_dir: PathBuf,
    pub gateway_base_url: String,
    pub gateway_timeout: Duration,
}

impl Config {
    /// Load configuration from environment variables (plus `./.env`).
    pub fn resolve() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();

        let raw_key =
            optional_env("VAULT_MASTER_KEY").ok_or_else(|| ConfigError::MissingRequired {
                key: "VAULT_MASTER_KEY".to_string(),
                hint: "Set it to 64 hexadecimal characters (256 bits). \
                       There is no insecure fallback key."
                    .to_string(),
            })?;
        let master_key =
            MasterKey::from_hex(&raw_key).map_err(|message| ConfigError::InvalidValue {
                key: "VAULT_MASTER_KEY".to_string(),
                message,
            })?;

        let data_dir = optional_env("TRADEVAULT_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(default_data_dir);

        let gateway_base_url = optional_env("GATEWAY_BASE_URL")
            .unwrap_or_else(|| DEFAULT_GATEWAY_BASE_URL.to_string());

        let timeout_ms = optional_env("GATEWAY_TIMEOUT_MS")
            .map(|s| s.parse::<u64>())
            .transpose()
            .map_err(|e| ConfigError::InvalidValue {
                key: "GATEWAY_TIMEOUT_MS".to_string(),
                message: format!("must be a positive integer: {e}"),
            })?
            .unwrap_or(DEFAULT_GATEWAY_TIMEOUT_MS);
        if timeout_ms == 0 {
            return Err(ConfigError::InvalidValue {
                key: "GATEWAY_TIMEOUT_MS".to_string(),
                message: "must be > 0".to_string(),
            });
        }

        Ok(Self {
            master_key,
            data_dir,
            gateway_base_url,
            gateway_timeout: Duration::from_millis(timeout_ms),
        })
    }
}

/// Default per-user record directory: `~/.tradevault/users`.
pub fn default_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".tradevault")
        .join("users")
}

/// Read an env var, treating unset and empty as absent.
fn optional_env(key: &str) -> Option<String> {
    match std::env::var(key) {
        Ok(value) if !value.trim().is_empty() => Some(value),
        _ => None,
    }
}
