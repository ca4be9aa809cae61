//! Configuration module for leadmail.
//!
//! Configuration is assembled once at startup from built-in defaults, an
//! optional TOML file and environment variables (highest priority), then
//! validated and handed to each component explicitly.

use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::{LeadmailError, Result};

/// HTTP server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port number to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Number of reverse proxies whose `X-Forwarded-For` entries are trusted.
    #[serde(default = "default_trusted_proxy_hops")]
    pub trusted_proxy_hops: usize,
    /// Maximum accepted request body size in bytes.
    #[serde(default = "default_body_limit")]
    pub body_limit_bytes: usize,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_trusted_proxy_hops() -> usize {
    1
}

fn default_body_limit() -> usize {
    1024 * 1024
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            trusted_proxy_hops: default_trusted_proxy_hops(),
            body_limit_bytes: default_body_limit(),
        }
    }
}

/// CORS configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CorsConfig {
    /// Origins allowed to call the API. Requests without an Origin header are
    /// always allowed.
    #[serde(default)]
    pub allowed_origins: Vec<String>,
}

/// Rate limiting configuration for `/api` routes.
#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    /// Requests allowed per client IP within one window.
    #[serde(default = "default_rate_limit_max")]
    pub max_requests: u32,
    /// Window length in seconds.
    #[serde(default = "default_rate_limit_window")]
    pub window_secs: u64,
}

fn default_rate_limit_max() -> u32 {
    20
}

fn default_rate_limit_window() -> u64 {
    60
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: default_rate_limit_max(),
            window_secs: default_rate_limit_window(),
        }
    }
}

/// How the SMTP connection is secured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TlsMode {
    /// Plain connection upgraded with STARTTLS before authenticating.
    #[default]
    Starttls,
    /// Implicit TLS from the first byte (usually port 465).
    Tls,
    /// No encryption. Only for local relays.
    None,
}

impl TlsMode {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "starttls" => Some(TlsMode::Starttls),
            "tls" | "smtps" => Some(TlsMode::Tls),
            "none" | "plain" => Some(TlsMode::None),
            _ => None,
        }
    }
}

/// SMTP relay configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SmtpConfig {
    /// Relay hostname.
    #[serde(default)]
    pub host: String,
    /// Relay port.
    #[serde(default = "default_smtp_port")]
    pub port: u16,
    /// Username for authentication.
    #[serde(default)]
    pub user: Option<String>,
    /// Password for authentication.
    #[serde(default)]
    pub password: Option<String>,
    /// TLS policy.
    #[serde(default)]
    pub tls: TlsMode,
    /// Skip certificate verification. Never enable in production.
    #[serde(default)]
    pub accept_invalid_certs: bool,
    /// Connect, greeting and socket timeout in milliseconds.
    #[serde(default = "default_smtp_timeout")]
    pub timeout_ms: u64,
    /// Maximum pooled connections to the relay.
    #[serde(default = "default_smtp_pool_size")]
    pub pool_size: u32,
}

fn default_smtp_port() -> u16 {
    587
}

fn default_smtp_timeout() -> u64 {
    5_000
}

fn default_smtp_pool_size() -> u32 {
    5
}

impl Default for SmtpConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: default_smtp_port(),
            user: None,
            password: None,
            tls: TlsMode::default(),
            accept_invalid_certs: false,
            timeout_ms: default_smtp_timeout(),
            pool_size: default_smtp_pool_size(),
        }
    }
}

impl SmtpConfig {
    /// Connection-level timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Lead mail configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct MailConfig {
    /// Display name used in the From header.
    #[serde(default = "default_from_name")]
    pub from_name: String,
    /// Sender address. Falls back to the SMTP user.
    #[serde(default)]
    pub from_email: Option<String>,
    /// Internal inbox receiving lead notices.
    #[serde(default)]
    pub leads_to: String,
    /// Skip sending entirely and acknowledge submissions.
    #[serde(default)]
    pub disabled: bool,
    /// Upper bound for sending both messages of one request, in milliseconds.
    #[serde(default = "default_send_timeout")]
    pub send_timeout_ms: u64,
}

fn default_from_name() -> String {
    "Website Leads".to_string()
}

fn default_send_timeout() -> u64 {
    8_000
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            from_name: default_from_name(),
            from_email: None,
            leads_to: String::new(),
            disabled: false,
            send_timeout_ms: default_send_timeout(),
        }
    }
}

impl MailConfig {
    /// Wall-clock bound for one request's sends.
    pub fn send_timeout(&self) -> Duration {
        Duration::from_millis(self.send_timeout_ms)
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Optional log file written alongside stdout.
    #[serde(default)]
    pub file: Option<String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    /// HTTP server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// CORS configuration.
    #[serde(default)]
    pub cors: CorsConfig,
    /// Rate limiting configuration.
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
    /// SMTP relay configuration.
    #[serde(default)]
    pub smtp: SmtpConfig,
    /// Lead mail configuration.
    #[serde(default)]
    pub mail: MailConfig,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::parse(&content)
    }

    /// Load configuration from an optional TOML file, then apply environment
    /// variable overrides. A missing file is not an error.
    pub fn load_with_env<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut config = if path.as_ref().exists() {
            Self::load(path)?
        } else {
            Self::default()
        };
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| LeadmailError::Config(format!("config parse error: {e}")))
    }

    /// Apply overrides from the process environment.
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary variable lookup.
    ///
    /// Empty values are ignored so that `FOO=` in a dotenv file does not wipe
    /// a value from the config file.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("HOST") {
            self.server.host = v;
        }
        if let Some(v) = get("PORT") {
            self.server.port = parse_number("PORT", &v)?;
        }
        if let Some(v) = get("TRUST_PROXY_HOPS") {
            self.server.trusted_proxy_hops = parse_number("TRUST_PROXY_HOPS", &v)?;
        }
        if let Some(v) = get("ALLOWED_ORIGINS") {
            self.cors.allowed_origins = split_list(&v);
        }
        if let Some(v) = get("RATE_LIMIT_MAX") {
            self.rate_limit.max_requests = parse_number("RATE_LIMIT_MAX", &v)?;
        }
        if let Some(v) = get("RATE_LIMIT_WINDOW_SECS") {
            self.rate_limit.window_secs = parse_number("RATE_LIMIT_WINDOW_SECS", &v)?;
        }
        if let Some(v) = get("SMTP_HOST") {
            self.smtp.host = v;
        }
        if let Some(v) = get("SMTP_PORT") {
            self.smtp.port = parse_number("SMTP_PORT", &v)?;
        }
        if let Some(v) = get("SMTP_USER") {
            self.smtp.user = Some(v);
        }
        if let Some(v) = get("SMTP_PASS").or_else(|| get("SMTP_PASSWORD")) {
            self.smtp.password = Some(v);
        }
        if let Some(v) = get("SMTP_TLS") {
            self.smtp.tls = TlsMode::parse(&v).ok_or_else(|| {
                LeadmailError::Config(format!(
                    "SMTP_TLS must be one of starttls, tls, none (got {v:?})"
                ))
            })?;
        }
        if let Some(v) = get("SMTP_TLS_INSECURE") {
            self.smtp.accept_invalid_certs = parse_flag(&v);
        }
        if let Some(v) = get("SMTP_TIMEOUT_MS") {
            self.smtp.timeout_ms = parse_number("SMTP_TIMEOUT_MS", &v)?;
        }
        if let Some(v) = get("SMTP_POOL_SIZE") {
            self.smtp.pool_size = parse_number("SMTP_POOL_SIZE", &v)?;
        }
        if let Some(v) = get("FROM_NAME") {
            self.mail.from_name = v;
        }
        if let Some(v) = get("FROM_EMAIL") {
            self.mail.from_email = Some(v);
        }
        if let Some(v) = get("LEADS_TO") {
            self.mail.leads_to = v;
        }
        if let Some(v) = get("DISABLE_EMAIL") {
            self.mail.disabled = parse_flag(&v);
        }
        if let Some(v) = get("SEND_TIMEOUT_MS") {
            self.mail.send_timeout_ms = parse_number("SEND_TIMEOUT_MS", &v)?;
        }
        if let Some(v) = get("LOG_LEVEL") {
            self.logging.level = v;
        }
        if let Some(v) = get("LOG_FILE") {
            self.logging.file = Some(v);
        }

        Ok(())
    }

    /// Address used in the From header of outgoing mail.
    pub fn sender_address(&self) -> Option<&str> {
        self.mail
            .from_email
            .as_deref()
            .or(self.smtp.user.as_deref())
            .filter(|s| !s.is_empty())
    }

    /// Validate the configuration.
    ///
    /// Returns an error if:
    /// - rate limit or timeout values are zero
    /// - email is enabled but the relay host, leads address or sender address
    ///   is missing or malformed
    /// - email is enabled and the SMTP timeout is not shorter than the send
    ///   timeout
    pub fn validate(&self) -> Result<()> {
        if self.rate_limit.max_requests == 0 || self.rate_limit.window_secs == 0 {
            return Err(LeadmailError::Config(
                "rate limit max_requests and window_secs must be greater than zero".to_string(),
            ));
        }
        if self.mail.send_timeout_ms == 0 || self.smtp.timeout_ms == 0 {
            return Err(LeadmailError::Config(
                "SMTP and send timeouts must be greater than zero".to_string(),
            ));
        }

        if self.mail.disabled {
            return Ok(());
        }

        // Sends abandoned at the request deadline end on the SMTP timeout.
        if self.smtp.timeout_ms >= self.mail.send_timeout_ms {
            return Err(LeadmailError::Config(format!(
                "SMTP_TIMEOUT_MS ({}) must be less than SEND_TIMEOUT_MS ({})",
                self.smtp.timeout_ms, self.mail.send_timeout_ms
            )));
        }

        if self.smtp.host.trim().is_empty() {
            return Err(LeadmailError::Config(
                "SMTP_HOST is not set. Set it or disable email with DISABLE_EMAIL=true.".to_string(),
            ));
        }
        if self.mail.leads_to.parse::<lettre::Address>().is_err() {
            return Err(LeadmailError::Config(format!(
                "LEADS_TO is not a valid address: {:?}",
                self.mail.leads_to
            )));
        }
        match self.sender_address() {
            Some(addr) if addr.parse::<lettre::Address>().is_ok() => {}
            Some(addr) => {
                return Err(LeadmailError::Config(format!(
                    "sender address is not valid: {addr:?}"
                )))
            }
            None => {
                return Err(LeadmailError::Config(
                    "no sender address: set FROM_EMAIL or SMTP_USER".to_string(),
                ))
            }
        }

        Ok(())
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| LeadmailError::Config(format!("{key} must be a number (got {value:?})")))
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    fn valid_config() -> Config {
        let mut config = Config::default();
        config.smtp.host = "smtp.example.com".to_string();
        config.smtp.user = Some("mailer@example.com".to_string());
        config.mail.leads_to = "leads@example.com".to_string();
        config
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.server.trusted_proxy_hops, 1);
        assert_eq!(config.server.body_limit_bytes, 1024 * 1024);

        assert!(config.cors.allowed_origins.is_empty());

        assert_eq!(config.rate_limit.max_requests, 20);
        assert_eq!(config.rate_limit.window_secs, 60);

        assert!(config.smtp.host.is_empty());
        assert_eq!(config.smtp.port, 587);
        assert_eq!(config.smtp.tls, TlsMode::Starttls);
        assert!(!config.smtp.accept_invalid_certs);
        assert_eq!(config.smtp.timeout(), Duration::from_secs(5));
        assert_eq!(config.smtp.pool_size, 5);

        assert_eq!(config.mail.from_name, "Website Leads");
        assert!(!config.mail.disabled);
        assert_eq!(config.mail.send_timeout(), Duration::from_secs(8));

        assert_eq!(config.logging.level, "info");
        assert!(config.logging.file.is_none());
    }

    #[test]
    fn test_parse_full_config() {
        let toml = r#"
[server]
host = "127.0.0.1"
port = 8080
trusted_proxy_hops = 2

[cors]
allowed_origins = ["https://example.com", "https://www.example.com"]

[rate_limit]
max_requests = 10
window_secs = 30

[smtp]
host = "smtp.example.com"
port = 465
user = "mailer@example.com"
password = "secret"
tls = "tls"
timeout_ms = 3000

[mail]
from_name = "Acme Roofing"
leads_to = "leads@example.com"
send_timeout_ms = 5000

[logging]
level = "debug"
file = "logs/leadmail.log"
"#;

        let config = Config::parse(toml).unwrap();

        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.trusted_proxy_hops, 2);
        assert_eq!(config.cors.allowed_origins.len(), 2);
        assert_eq!(config.rate_limit.max_requests, 10);
        assert_eq!(config.rate_limit.window_secs, 30);
        assert_eq!(config.smtp.port, 465);
        assert_eq!(config.smtp.tls, TlsMode::Tls);
        assert_eq!(config.smtp.password.as_deref(), Some("secret"));
        assert_eq!(config.mail.from_name, "Acme Roofing");
        assert_eq!(config.mail.send_timeout_ms, 5000);
        assert_eq!(config.logging.file.as_deref(), Some("logs/leadmail.log"));
    }

    #[test]
    fn test_parse_invalid_toml() {
        let result = Config::parse("[server\nport = ");
        assert!(matches!(result, Err(LeadmailError::Config(_))));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[server]\nport = 4000").unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.server.port, 4000);
        assert_eq!(config.smtp.port, 587);
    }

    #[test]
    fn test_load_with_env_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_with_env(dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.rate_limit.max_requests, 20);
    }

    #[test]
    fn test_env_overrides() {
        let mut config = Config::default();
        config
            .apply_overrides(lookup(&[
                ("PORT", "8081"),
                ("ALLOWED_ORIGINS", "https://a.example, https://b.example,,"),
                ("SMTP_HOST", "smtp.example.com"),
                ("SMTP_PORT", "2525"),
                ("SMTP_USER", "mailer@example.com"),
                ("SMTP_PASS", "hunter2"),
                ("SMTP_TLS", "none"),
                ("SMTP_TLS_INSECURE", "true"),
                ("FROM_NAME", "Acme"),
                ("LEADS_TO", "leads@example.com"),
                ("DISABLE_EMAIL", "1"),
                ("SEND_TIMEOUT_MS", "2500"),
            ]))
            .unwrap();

        assert_eq!(config.server.port, 8081);
        assert_eq!(
            config.cors.allowed_origins,
            vec!["https://a.example", "https://b.example"]
        );
        assert_eq!(config.smtp.host, "smtp.example.com");
        assert_eq!(config.smtp.port, 2525);
        assert_eq!(config.smtp.password.as_deref(), Some("hunter2"));
        assert_eq!(config.smtp.tls, TlsMode::None);
        assert!(config.smtp.accept_invalid_certs);
        assert_eq!(config.mail.from_name, "Acme");
        assert_eq!(config.mail.leads_to, "leads@example.com");
        assert!(config.mail.disabled);
        assert_eq!(config.mail.send_timeout_ms, 2500);
    }

    #[test]
    fn test_env_password_alias() {
        let mut config = Config::default();
        config
            .apply_overrides(lookup(&[("SMTP_PASSWORD", "alias")]))
            .unwrap();
        assert_eq!(config.smtp.password.as_deref(), Some("alias"));
    }

    #[test]
    fn test_env_empty_values_ignored() {
        let mut config = Config::default();
        config.smtp.host = "from-file".to_string();
        config
            .apply_overrides(lookup(&[("SMTP_HOST", "  ")]))
            .unwrap();
        assert_eq!(config.smtp.host, "from-file");
    }

    #[test]
    fn test_env_invalid_number() {
        let mut config = Config::default();
        let result = config.apply_overrides(lookup(&[("SMTP_PORT", "submission")]));
        assert!(matches!(result, Err(LeadmailError::Config(_))));
    }

    #[test]
    fn test_env_invalid_tls_mode() {
        let mut config = Config::default();
        let result = config.apply_overrides(lookup(&[("SMTP_TLS", "ssl3")]));
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_flag() {
        assert!(parse_flag("true"));
        assert!(parse_flag("TRUE"));
        assert!(parse_flag("1"));
        assert!(parse_flag("yes"));
        assert!(!parse_flag("false"));
        assert!(!parse_flag("0"));
        assert!(!parse_flag("nope"));
    }

    #[test]
    fn test_sender_address_fallback() {
        let mut config = valid_config();
        assert_eq!(config.sender_address(), Some("mailer@example.com"));

        config.mail.from_email = Some("hello@example.com".to_string());
        assert_eq!(config.sender_address(), Some("hello@example.com"));
    }

    #[test]
    fn test_validate_ok() {
        assert!(valid_config().validate().is_ok());
    }

    #[test]
    fn test_validate_disabled_skips_smtp_checks() {
        let mut config = Config::default();
        config.mail.disabled = true;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_missing_host() {
        let mut config = valid_config();
        config.smtp.host.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_bad_leads_address() {
        let mut config = valid_config();
        config.mail.leads_to = "not an address".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_missing_sender() {
        let mut config = valid_config();
        config.smtp.user = None;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_smtp_timeout_below_send_timeout() {
        let mut config = valid_config();
        config.smtp.timeout_ms = 8_000;
        config.mail.send_timeout_ms = 8_000;
        assert!(config.validate().is_err());

        config.smtp.timeout_ms = 7_999;
        assert!(config.validate().is_ok());

        config.mail.disabled = true;
        config.smtp.timeout_ms = 20_000;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_zero_rate_limit() {
        let mut config = valid_config();
        config.rate_limit.max_requests = 0;
        assert!(config.validate().is_err());
    }
}
