//! Gateway configuration.
//!
//! Loaded from environment variables at startup. The auth token variable
//! is mandatory: an empty value disables authorisation, an unset one is a
//! fatal error.

use crate::error::ConfigError;
use chrono::TimeDelta;
use std::collections::{BTreeMap, HashMap};
use std::env;
use std::ffi::OsString;
use std::fmt;
use std::net::SocketAddr;

/// Name of the variable holding the bearer token.
pub const AUTH_TOKEN_ENV_VAR: &str = "GATEWAY_AUTH_TOKEN";

/// Name of the variable controlling detailed 500 bodies.
pub const ERROR_DETAILS_ENV_VAR: &str = "RETURN_ERROR_DETAILS";

pub const LISTEN_ENV_VAR: &str = "GATEWAY_LISTEN";
pub const REGISTRY_HOST_ENV_VAR: &str = "GATEWAY_REGISTRY_HOST";
pub const TOKEN_TTL_ENV_VAR: &str = "GATEWAY_TOKEN_TTL_SECONDS";

pub const DEFAULT_LISTEN: &str = "0.0.0.0:8080";
pub const DEFAULT_REGISTRY_HOST: &str = "localhost:5000";
pub const DEFAULT_TOKEN_TTL_SECONDS: i64 = 3600;
/// Tokens live at most a year.
pub const MAX_TOKEN_TTL_SECONDS: i64 = 366 * 24 * 3600;

/// Variables read by [`GatewayConfig::from_vars`].
const GATEWAY_VARS: &[&str] = &[
    AUTH_TOKEN_ENV_VAR,
    ERROR_DETAILS_ENV_VAR,
    LISTEN_ENV_VAR,
    REGISTRY_HOST_ENV_VAR,
    TOKEN_TTL_ENV_VAR,
];

#[derive(Clone)]
pub struct GatewayConfig {
    /// Bearer token expected in `Authorization`. Empty disables the check.
    pub auth_token: String,
    pub listen: SocketAddr,
    /// Include the real error message in 500 bodies.
    pub return_error_details: bool,
    /// Static key/value pairs served by `/health`.
    pub health_info: BTreeMap<String, String>,
    /// Registry host reported in tokens by the in-memory backend.
    pub registry_host: String,
    /// Lifetime of issued tokens, within `1..=MAX_TOKEN_TTL_SECONDS`.
    pub token_ttl: TimeDelta,
}

impl fmt::Debug for GatewayConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GatewayConfig")
            .field("auth_token", &"[REDACTED]")
            .field("listen", &self.listen)
            .field("return_error_details", &self.return_error_details)
            .field("health_info", &self.health_info)
            .field("registry_host", &self.registry_host)
            .field("token_ttl", &self.token_ttl)
            .finish()
    }
}

impl GatewayConfig {
    pub fn new(auth_token: impl Into<String>) -> Self {
        Self {
            auth_token: auth_token.into(),
            listen: SocketAddr::from(([127, 0, 0, 1], 0)),
            return_error_details: false,
            health_info: BTreeMap::new(),
            registry_host: DEFAULT_REGISTRY_HOST.to_string(),
            token_ttl: TimeDelta::seconds(DEFAULT_TOKEN_TTL_SECONDS),
        }
    }

    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&collect_vars(env::vars_os())?)
    }

    /// Load configuration from a map of variables (for testing).
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let auth_token = vars
            .get(AUTH_TOKEN_ENV_VAR)
            .cloned()
            .ok_or_else(|| ConfigError::MissingAuthToken(AUTH_TOKEN_ENV_VAR.to_string()))?;

        let listen_raw = vars
            .get(LISTEN_ENV_VAR)
            .map(String::as_str)
            .unwrap_or(DEFAULT_LISTEN);
        let listen = listen_raw
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::InvalidValue {
                name: LISTEN_ENV_VAR.to_string(),
                reason: format!("{listen_raw:?}: {e}"),
            })?;

        let return_error_details = vars
            .get(ERROR_DETAILS_ENV_VAR)
            .map(String::as_str)
            .is_some_and(is_truthy);

        let registry_host = vars
            .get(REGISTRY_HOST_ENV_VAR)
            .cloned()
            .unwrap_or_else(|| DEFAULT_REGISTRY_HOST.to_string());

        let token_ttl = match vars.get(TOKEN_TTL_ENV_VAR) {
            Some(raw) => raw
                .parse::<i64>()
                .map_err(|e| ConfigError::InvalidValue {
                    name: TOKEN_TTL_ENV_VAR.to_string(),
                    reason: format!("{raw:?}: {e}"),
                })
                .and_then(validate_token_ttl)?,
            None => TimeDelta::seconds(DEFAULT_TOKEN_TTL_SECONDS),
        };

        Ok(Self {
            auth_token,
            listen,
            return_error_details,
            health_info: BTreeMap::new(),
            registry_host,
            token_ttl,
        })
    }

    pub fn with_listen(mut self, listen: SocketAddr) -> Self {
        self.listen = listen;
        self
    }

    pub fn with_auth_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = token.into();
        self
    }

    pub fn with_error_details(mut self, enabled: bool) -> Self {
        self.return_error_details = enabled;
        self
    }

    pub fn with_health_info(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.health_info.insert(key.into(), value.into());
        self
    }

    pub fn with_registry_host(mut self, host: impl Into<String>) -> Self {
        self.registry_host = host.into();
        self
    }

    pub fn with_token_ttl(mut self, seconds: i64) -> Result<Self, ConfigError> {
        self.token_ttl = validate_token_ttl(seconds)?;
        Ok(self)
    }
}

/// Validates a token lifetime in seconds.
pub fn validate_token_ttl(seconds: i64) -> Result<TimeDelta, ConfigError> {
    if !(1..=MAX_TOKEN_TTL_SECONDS).contains(&seconds) {
        return Err(ConfigError::InvalidValue {
            name: TOKEN_TTL_ENV_VAR.to_string(),
            reason: format!("{seconds} is outside 1..={MAX_TOKEN_TTL_SECONDS} seconds"),
        });
    }
    TimeDelta::try_seconds(seconds).ok_or_else(|| ConfigError::InvalidValue {
        name: TOKEN_TTL_ENV_VAR.to_string(),
        reason: format!("{seconds} seconds is out of range"),
    })
}

/// Keeps the UTF-8 entries of an OS environment. Unrelated non-UTF-8
/// entries are skipped; a non-UTF-8 gateway variable is an error.
fn collect_vars(
    vars: impl IntoIterator<Item = (OsString, OsString)>,
) -> Result<HashMap<String, String>, ConfigError> {
    let mut collected = HashMap::new();
    for (key, value) in vars {
        let Ok(key) = key.into_string() else {
            continue;
        };
        match value.into_string() {
            Ok(value) => {
                collected.insert(key, value);
            }
            Err(_) if GATEWAY_VARS.contains(&key.as_str()) => {
                return Err(ConfigError::InvalidValue {
                    name: key,
                    reason: "not valid UTF-8".to_string(),
                });
            }
            Err(_) => {}
        }
    }
    Ok(collected)
}

/// `true`, `1` or `yes`, case-insensitive.
pub fn is_truthy(value: &str) -> bool {
    matches!(value.to_ascii_lowercase().as_str(), "true" | "1" | "yes")
}
