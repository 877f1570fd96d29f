use std::path::PathBuf;
use std::str::FromStr;

use andon_audio::speech::DEFAULT_ENDPOINT;
use andon_audio::GeminiConfig;
use andon_store::RestConfig;
use axum::http::HeaderValue;
use chrono::FixedOffset;

/// A configuration value that could not be used.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{var} has invalid value '{value}'")]
    Invalid { var: &'static str, value: String },

    #[error("UTC_OFFSET_MINUTES out of range: {0}")]
    Offset(i32),
}

/// Server configuration loaded from environment variables.
///
/// All fields have sensible defaults suitable for local development.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// Upper bound for draining background tasks on shutdown (default: `30`).
    pub shutdown_timeout_secs: u64,
    /// Ticket store, speech and dashboard settings.
    pub andon: AndonConfig,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                | Default                    |
    /// |------------------------|----------------------------|
    /// | `HOST`                 | `0.0.0.0`                  |
    /// | `PORT`                 | `3000`                     |
    /// | `CORS_ORIGINS`         | `http://localhost:5173`    |
    /// | `REQUEST_TIMEOUT_SECS` | `30`                       |
    /// | `SHUTDOWN_TIMEOUT_SECS`| `30`                       |
    ///
    /// See [`AndonConfig::from_lookup`] for the remaining variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let host = lookup("HOST").unwrap_or_else(|| "0.0.0.0".into());
        let port = parse_or(&lookup, "PORT", 3000)?;

        let cors_origins: Vec<String> = lookup("CORS_ORIGINS")
            .unwrap_or_else(|| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        if let Some(bad) = cors_origins
            .iter()
            .find(|o| HeaderValue::from_str(o).is_err())
        {
            return Err(ConfigError::Invalid {
                var: "CORS_ORIGINS",
                value: bad.clone(),
            });
        }

        let request_timeout_secs = parse_or(&lookup, "REQUEST_TIMEOUT_SECS", 30)?;
        let shutdown_timeout_secs = parse_or(&lookup, "SHUTDOWN_TIMEOUT_SECS", 30)?;
        let andon = AndonConfig::from_lookup(&lookup)?;

        Ok(Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            shutdown_timeout_secs,
            andon,
        })
    }
}

/// Settings of the andon services behind the HTTP surface.
#[derive(Debug, Clone)]
pub struct AndonConfig {
    /// Remote backend; `None` runs local-only.
    pub backend: Option<RestConfig>,
    pub data_dir: PathBuf,
    pub history_limit: usize,
    /// Network speech; `None` speaks through the fallback program only.
    pub speech: Option<GeminiConfig>,
    pub fallback_tts_program: String,
    /// Offset used for hour-of-day labels on the dashboard.
    pub utc_offset: FixedOffset,
    pub arrival_beep: bool,
}

impl AndonConfig {
    /// | Env Var                 | Default                          |
    /// |-------------------------|----------------------------------|
    /// | `BACKEND_URL`           | unset (local-only)               |
    /// | `BACKEND_ANON_KEY`      | unset (local-only)               |
    /// | `BACKEND_TABLE`         | `tickets`                        |
    /// | `ANDON_DATA_DIR`        | `./andon-data`                   |
    /// | `HISTORY_LIMIT`         | `50`                             |
    /// | `SPEECH_API_KEY`        | unset (fallback speaker only)    |
    /// | `SPEECH_MODEL`          | `gemini-2.5-flash-preview-tts`   |
    /// | `SPEECH_VOICE`          | `Kore`                           |
    /// | `SPEECH_ENDPOINT`       | Google generative language API   |
    /// | `FALLBACK_TTS_PROGRAM`  | `espeak-ng`                      |
    /// | `UTC_OFFSET_MINUTES`    | `420`                            |
    /// | `ANNOUNCE_ARRIVAL_BEEP` | `false`                          |
    pub fn from_lookup<F>(lookup: &F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let backend = RestConfig::from_parts(
            lookup("BACKEND_URL"),
            lookup("BACKEND_ANON_KEY"),
            lookup("BACKEND_TABLE").unwrap_or_else(|| "tickets".into()),
        );

        let speech = lookup("SPEECH_API_KEY")
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty() && key != "undefined")
            .map(|api_key| GeminiConfig {
                api_key,
                model: lookup("SPEECH_MODEL")
                    .unwrap_or_else(|| "gemini-2.5-flash-preview-tts".into()),
                voice: lookup("SPEECH_VOICE").unwrap_or_else(|| "Kore".into()),
                endpoint: lookup("SPEECH_ENDPOINT").unwrap_or_else(|| DEFAULT_ENDPOINT.into()),
            });

        let offset_minutes: i32 = parse_or(lookup, "UTC_OFFSET_MINUTES", 420)?;
        let utc_offset = offset_minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
            .ok_or(ConfigError::Offset(offset_minutes))?;

        let arrival_beep = match lookup("ANNOUNCE_ARRIVAL_BEEP") {
            None => false,
            Some(value) => parse_flag(&value).ok_or(ConfigError::Invalid {
                var: "ANNOUNCE_ARRIVAL_BEEP",
                value,
            })?,
        };

        Ok(Self {
            backend,
            data_dir: lookup("ANDON_DATA_DIR")
                .unwrap_or_else(|| "./andon-data".into())
                .into(),
            history_limit: parse_or(lookup, "HISTORY_LIMIT", 50)?,
            speech,
            fallback_tts_program: lookup("FALLBACK_TTS_PROGRAM")
                .unwrap_or_else(|| "espeak-ng".into()),
            utc_offset,
            arrival_beep,
        })
    }
}

fn parse_or<F, T>(lookup: &F, var: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(var) {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { var, value }),
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}
