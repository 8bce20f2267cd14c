//! Service configuration and session cookie policy.

use anyhow::{bail, Result};
use chrono::{DateTime, Utc};
use clap::Parser;
use std::net::SocketAddr;

use crate::session::{DEFAULT_CLEANUP_INTERVAL_SECS, DEFAULT_SESSION_TTL_SECS, MAX_SESSION_TTL_SECS};

/// Session cookies are always HttpOnly and restricted to same-site requests.
const COOKIE_SAME_SITE: &str = "Lax";

/// Expiry used to clear a cookie immediately.
const EXPIRED_COOKIE_DATE: &str = "Thu, 01 Jan 1970 00:00:00 GMT";

/// Command line arguments
#[derive(Parser, Debug)]
#[command(name = "admin-session-gate")]
#[command(about = "Session-based admin authentication service")]
pub struct Args {
    /// Address to listen on
    #[arg(long, default_value = "0.0.0.0:8080", env = "LISTEN_ADDR")]
    pub listen: SocketAddr,

    /// Shared admin secret accepted at login
    #[arg(long, env = "ADMIN_PASSWORD", hide_env_values = true)]
    pub admin_password: String,

    /// Session lifetime in seconds
    #[arg(long, default_value_t = DEFAULT_SESSION_TTL_SECS, env = "SESSION_TTL_SECS")]
    pub session_ttl_secs: u64,

    /// Interval between expired-session sweeps, in seconds
    #[arg(long, default_value_t = DEFAULT_CLEANUP_INTERVAL_SECS, env = "SESSION_CLEANUP_INTERVAL_SECS")]
    pub cleanup_interval_secs: u64,

    /// Name of the session cookie
    #[arg(long, default_value = "session_id", env = "SESSION_COOKIE_NAME")]
    pub cookie_name: String,

    /// Path attribute of the session cookie
    #[arg(long, default_value = "/", env = "COOKIE_PATH")]
    pub cookie_path: String,

    /// Mark the session cookie Secure (HTTPS only)
    #[arg(long, env = "COOKIE_SECURE")]
    pub cookie_secure: bool,

    /// Enable verbose logging
    #[arg(short, long, env = "AUTH_VERBOSE")]
    pub verbose: bool,
}

/// Validated authentication configuration, shared read-only after startup.
#[derive(Clone)]
pub struct AuthConfig {
    pub admin_password: String,
    pub session_ttl_secs: u64,
    pub cleanup_interval_secs: u64,
    pub cookie_name: String,
    pub cookie_path: String,
    pub cookie_secure: bool,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("admin_password", &"<redacted>")
            .field("session_ttl_secs", &self.session_ttl_secs)
            .field("cleanup_interval_secs", &self.cleanup_interval_secs)
            .field("cookie_name", &self.cookie_name)
            .field("cookie_path", &self.cookie_path)
            .field("cookie_secure", &self.cookie_secure)
            .finish()
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            admin_password: String::new(),
            session_ttl_secs: DEFAULT_SESSION_TTL_SECS,
            cleanup_interval_secs: DEFAULT_CLEANUP_INTERVAL_SECS,
            cookie_name: "session_id".to_string(),
            cookie_path: "/".to_string(),
            cookie_secure: false,
        }
    }
}

impl AuthConfig {
    pub fn from_args(args: &Args) -> Result<Self> {
        let config = Self {
            admin_password: args.admin_password.clone(),
            session_ttl_secs: args.session_ttl_secs,
            cleanup_interval_secs: args.cleanup_interval_secs,
            cookie_name: args.cookie_name.trim().to_string(),
            cookie_path: args.cookie_path.clone(),
            cookie_secure: args.cookie_secure,
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.admin_password.is_empty() {
            bail!("ADMIN_PASSWORD must not be empty");
        }
        if self.session_ttl_secs == 0 || self.session_ttl_secs > MAX_SESSION_TTL_SECS {
            bail!(
                "session TTL must be between 1 and {} seconds, got {}",
                MAX_SESSION_TTL_SECS,
                self.session_ttl_secs
            );
        }
        if self.cleanup_interval_secs == 0 {
            bail!("session cleanup interval must be greater than zero");
        }
        if self.cookie_name.is_empty()
            || !self
                .cookie_name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            bail!("invalid session cookie name: {:?}", self.cookie_name);
        }
        Ok(())
    }

    /// Build the Set-Cookie value issuing a session token.
    pub fn build_session_cookie(&self, token: &str, expires_at: DateTime<Utc>) -> String {
        let expires = expires_at.format("%a, %d %b %Y %H:%M:%S GMT").to_string();
        self.build_cookie(token, &expires, None)
    }

    /// Build the Set-Cookie value clearing the session token.
    pub fn build_clear_cookie(&self) -> String {
        self.build_cookie("", EXPIRED_COOKIE_DATE, Some(0))
    }

    fn build_cookie(&self, value: &str, expires: &str, max_age: Option<i64>) -> String {
        let mut cookie = format!("{}={}", self.cookie_name, value);

        cookie.push_str(&format!("; Path={}", self.cookie_path));
        cookie.push_str(&format!("; Expires={}", expires));

        if let Some(max_age) = max_age {
            cookie.push_str(&format!("; Max-Age={}", max_age));
        }

        if self.cookie_secure {
            cookie.push_str("; Secure");
        }

        cookie.push_str("; HttpOnly");
        cookie.push_str(&format!("; SameSite={}", COOKIE_SAME_SITE));

        cookie
    }

    /// Parse the session token from a Cookie header.
    pub fn parse_session_cookie<'a>(&self, cookie_header: &'a str) -> Option<&'a str> {
        cookie_header.split(';').find_map(|part| {
            let (name, value) = part.trim().split_once('=')?;
            (name == self.cookie_name && !value.is_empty()).then_some(value)
        })
    }
}
