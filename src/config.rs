//! Environment-driven configuration.
//!
//! Read once at startup, immutable afterwards. A missing `BOT_TOKEN` is
//! not an error: the bot falls back to the CLI channel so the pipeline
//! stays usable without credentials.

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;

use crate::error::ConfigError;
use crate::resolve::{ServiceEndpoint, default_endpoints};

/// Port the hosting platform probes for liveness.
const DEFAULT_PORT: u16 = 8443;

/// Per-network-call time budget inside a resolution.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone)]
pub struct BotConfig {
    /// Telegram bot token. `None` selects the CLI channel.
    pub bot_token: Option<SecretString>,
    /// Port for the liveness endpoint (plus the webhook route when enabled).
    pub port: u16,
    /// Public base URL for webhook mode; unset selects long polling.
    pub webhook_url: Option<String>,
    /// Ordered download service list, first entry tried first.
    pub services: Vec<ServiceEndpoint>,
    /// Time budget for each network call the resolver makes.
    pub per_call_timeout: Duration,
    /// Where the CLI channel writes delivered documents.
    pub output_dir: PathBuf,
}

impl BotConfig {
    /// Build config from environment variables.
    ///
    /// Missing optional values fall back to defaults. A malformed
    /// `DOCFERRY_SERVICES` list is an error, not a silent fallback; a
    /// typo there would otherwise change which hosts we talk to.
    pub fn from_env() -> Result<Self, ConfigError> {
        let bot_token = std::env::var("BOT_TOKEN")
            .ok()
            .filter(|t| !t.trim().is_empty())
            .map(SecretString::from);

        let port: u16 = std::env::var("PORT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_PORT);

        let webhook_url = std::env::var("WEBHOOK_URL")
            .ok()
            .as_deref()
            .and_then(normalize_base_url);

        let services = match std::env::var("DOCFERRY_SERVICES") {
            Ok(raw) => parse_services(&raw)?,
            Err(_) => default_endpoints(),
        };

        let per_call_timeout = Duration::from_secs(
            std::env::var("DOCFERRY_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_TIMEOUT_SECS),
        );

        let output_dir = std::env::var("DOCFERRY_OUTPUT_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("."));

        Ok(Self {
            bot_token,
            port,
            webhook_url,
            services,
            per_call_timeout,
            output_dir,
        })
    }

    pub fn webhook_enabled(&self) -> bool {
        self.webhook_url.is_some()
    }
}

/// Parse a JSON service list.
pub fn parse_services(raw: &str) -> Result<Vec<ServiceEndpoint>, ConfigError> {
    let services: Vec<ServiceEndpoint> = serde_json::from_str(raw)
        .map_err(|e| ConfigError::ParseError(format!("DOCFERRY_SERVICES: {e}")))?;

    if services.is_empty() {
        return Err(ConfigError::NoServices);
    }

    Ok(services)
}

/// Trim whitespace and trailing slashes so webhook paths join cleanly.
fn normalize_base_url(raw: &str) -> Option<String> {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::resolve::EndpointShape;

    #[test]
    fn parses_service_list() {
        let raw = r#"[
            {"name": "api", "url": "https://api.example/download",
             "shape": "json_wrapped", "url_field": "pdf_url"},
            {"name": "direct", "url": "https://mirror.example/{id}",
             "shape": "direct_binary"}
        ]"#;

        let services = parse_services(raw).unwrap();
        assert_eq!(services.len(), 2);
        assert_eq!(services[0].name, "api");
        assert_eq!(services[1].shape, EndpointShape::DirectBinary);
    }

    #[test]
    fn empty_service_list_is_rejected() {
        assert!(matches!(parse_services("[]"), Err(ConfigError::NoServices)));
    }

    #[test]
    fn malformed_service_json_is_rejected() {
        let err = parse_services("{not json").unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn unknown_shape_is_rejected() {
        let raw = r#"[{"name": "x", "url": "https://x.example", "shape": "carrier_pigeon"}]"#;
        assert!(parse_services(raw).is_err());
    }

    #[test]
    fn normalizes_webhook_base() {
        assert_eq!(
            normalize_base_url(" https://bot.example.app/ "),
            Some("https://bot.example.app".to_string())
        );
        assert_eq!(
            normalize_base_url("https://bot.example.app//"),
            Some("https://bot.example.app".to_string())
        );
        assert_eq!(normalize_base_url("   "), None);
    }
}
