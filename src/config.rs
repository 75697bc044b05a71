//! Runtime settings read from the environment.
//!
//! A `.env` file in the working directory is honoured when present.

use std::env;
use std::path::PathBuf;

const BIND_ADDR_VAR: &str = "PCBUILD_BIND_ADDR";
const PROFILE_DIR_VAR: &str = "PCBUILD_PROFILE_DIR";

const DEFAULT_BIND_ADDR: &str = "127.0.0.1:3000";
const DEFAULT_PROFILE_DIR: &str = "profiles";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub bind_addr: String,
    /// Directory of profile JSON files overriding the built-in table.
    pub profile_dir: PathBuf,
}

impl Settings {
    /// Read settings from the environment, loading `.env` first when present.
    pub fn from_env() -> Self {
        if let Err(err) = dotenvy::dotenv() {
            if !err.not_found() {
                tracing::warn!(error = %err, "failed to read .env file");
            }
        }
        Self {
            bind_addr: var_or(BIND_ADDR_VAR, DEFAULT_BIND_ADDR),
            profile_dir: PathBuf::from(var_or(PROFILE_DIR_VAR, DEFAULT_PROFILE_DIR)),
        }
    }
}

fn var_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| {
        tracing::info!("{key} not set, using default: {default}");
        default.to_string()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_var_or_falls_back_to_default() {
        assert_eq!(var_or("PCBUILD_TEST_SURELY_UNSET", "fallback"), "fallback");
    }
}
