//! Proxy rules applied by the dev and preview server.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;

use crate::util::{env_non_empty, or_default, DEFAULT_BACKEND_URL};

/// Environment variable holding the proxied backend origin.
pub const PROXY_TARGET_ENV: &str = "VITE_API_PROXY_TARGET";
/// Environment variable overriding the static root.
pub const STATIC_DIR_ENV: &str = "STATIC_DIR";

pub const API_PREFIX: &str = "/api";
pub const DEV_SERVER_PORT: u16 = 5174;
/// Largest request body forwarded upstream (image uploads).
pub const MAX_BODY_BYTES: usize = 64 * 1024 * 1024;
/// Where the frontend build lands; served in preview mode.
pub const PREVIEW_DIST_DIR: &str = "dist";

/// Resolve the proxy target origin from an optional override.
pub fn resolve_proxy_target(value: Option<&str>) -> String {
    or_default(value, DEFAULT_BACKEND_URL)
}

/// Forward requests under `prefix` to `target`, with the prefix stripped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyRule {
    pub prefix: String,
    pub target: String,
    /// Present the target's authority as the upstream `Host`.
    pub change_origin: bool,
}

impl ProxyRule {
    /// The `/api` rule used by both server modes.
    pub fn api(target: impl Into<String>) -> Self {
        Self {
            prefix: API_PREFIX.to_string(),
            target: target.into(),
            change_origin: true,
        }
    }

    /// Plain string prefix match, so `/apiary` matches `/api` too.
    pub fn matches(&self, path: &str) -> bool {
        path.starts_with(&self.prefix)
    }

    /// Strip the prefix once. Unmatched paths come back unchanged.
    pub fn rewrite<'a>(&self, path: &'a str) -> &'a str {
        match path.strip_prefix(self.prefix.as_str()) {
            Some("") => "/",
            Some(rest) => rest,
            None => path,
        }
    }

    /// Upstream URL for a request's path and optional query string.
    pub fn upstream_url(&self, path: &str, query: Option<&str>) -> String {
        let base = self.target.trim_end_matches('/');
        let rewritten = self.rewrite(path);
        let sep = if rewritten.starts_with('/') { "" } else { "/" };
        match query {
            Some(q) if !q.is_empty() => format!("{base}{sep}{rewritten}?{q}"),
            _ => format!("{base}{sep}{rewritten}"),
        }
    }
}

/// Which frontend server flavor is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerMode {
    Development,
    Preview,
}

impl ServerMode {
    /// Parse a mode argument. `None` means development.
    pub fn from_arg(arg: Option<&str>) -> Option<Self> {
        match arg {
            None | Some("dev") | Some("serve") | Some("development") => Some(Self::Development),
            Some("preview") => Some(Self::Preview),
            Some(_) => None,
        }
    }

    /// Mode from a full argv, program name first. Flags are skipped; an
    /// unknown mode comes back as the offending argument.
    pub fn from_args(args: &[String]) -> Result<Self, String> {
        let arg = args.iter().skip(1).find(|a| !a.starts_with('-'));
        Self::from_arg(arg.map(String::as_str)).ok_or_else(|| arg.cloned().unwrap_or_default())
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Development => "development",
            Self::Preview => "preview",
        }
    }
}

/// Dev/preview server configuration.
#[derive(Debug, Clone)]
pub struct DevServerConfig {
    pub mode: ServerMode,
    pub host: IpAddr,
    pub port: u16,
    pub proxy: Vec<ProxyRule>,
    /// Static root for requests no rule matches.
    pub static_dir: Option<PathBuf>,
    /// Request bodies above this size are rejected with 413.
    pub max_body_bytes: usize,
}

impl DevServerConfig {
    /// Build the configuration for `mode` from explicit overrides.
    pub fn new(mode: ServerMode, proxy_target: Option<&str>, static_dir: Option<&str>) -> Self {
        let target = resolve_proxy_target(proxy_target);
        let static_dir = match (static_dir.filter(|s| !s.is_empty()), mode) {
            (Some(dir), _) => Some(PathBuf::from(dir)),
            (None, ServerMode::Preview) => Some(PathBuf::from(PREVIEW_DIST_DIR)),
            (None, ServerMode::Development) => None,
        };
        Self {
            mode,
            host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: DEV_SERVER_PORT,
            proxy: vec![ProxyRule::api(target)],
            static_dir,
            max_body_bytes: MAX_BODY_BYTES,
        }
    }

    pub fn from_env(mode: ServerMode) -> Self {
        let target = env_non_empty(PROXY_TARGET_ENV);
        let static_dir = env_non_empty(STATIC_DIR_ENV);
        Self::new(mode, target.as_deref(), static_dir.as_deref())
    }

    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// First rule matching `path`.
    pub fn rule_for(&self, path: &str) -> Option<&ProxyRule> {
        self.proxy.iter().find(|r| r.matches(path))
    }
}
