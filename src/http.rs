//! Shared HTTP client construction policy.
//!
//! Every outbound client (seed search, citation lookup, artifact download) is
//! built here so timeouts, compression, User-Agent and proxy handling stay
//! consistent. Timeouts are passed in explicitly from configuration.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::time::Duration;

use reqwest::{Client, ClientBuilder, Proxy};
use thiserror::Error;
use tracing::warn;

use crate::user_agent;

/// Default connect timeout in seconds.
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Default total request timeout in seconds.
pub const DEFAULT_READ_TIMEOUT_SECS: u64 = 60;

/// Timeouts applied to every HTTP client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HttpSettings {
    /// Connection establishment timeout in seconds.
    pub connect_timeout_secs: u64,
    /// Whole-request timeout in seconds.
    pub read_timeout_secs: u64,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            connect_timeout_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
            read_timeout_secs: DEFAULT_READ_TIMEOUT_SECS,
        }
    }
}

/// Errors raised while constructing an HTTP client.
#[derive(Debug, Error)]
pub enum HttpClientError {
    /// The builder rejected the configuration.
    #[error("HTTP client construction failed: {0}")]
    Build(#[from] reqwest::Error),

    /// System proxy discovery panicked and the env-proxy fallback did too.
    #[error("HTTP client construction panicked while loading proxy settings")]
    Panicked,
}

/// Builds an HTTP client using the shared project policy.
///
/// Some restricted sandbox environments panic while querying system proxy
/// settings; in that case the client is rebuilt with system lookup disabled
/// and proxies taken from the usual environment variables only.
///
/// # Errors
///
/// Returns [`HttpClientError`] when client construction fails.
pub fn build_http_client(settings: &HttpSettings) -> Result<Client, HttpClientError> {
    match try_build_client(settings, false) {
        Ok(client) => Ok(client),
        Err(BuildClientFailure::Panic) => {
            warn!("HTTP client builder hit system proxy panic; using env-proxy fallback builder");
            match try_build_client(settings, true) {
                Ok(client) => Ok(client),
                Err(BuildClientFailure::Panic) => Err(HttpClientError::Panicked),
                Err(BuildClientFailure::Build(error)) => Err(HttpClientError::Build(error)),
            }
        }
        Err(BuildClientFailure::Build(error)) => Err(HttpClientError::Build(error)),
    }
}

enum BuildClientFailure {
    Panic,
    Build(reqwest::Error),
}

fn try_build_client(
    settings: &HttpSettings,
    disable_system_proxy_lookup: bool,
) -> Result<Client, BuildClientFailure> {
    let settings = *settings;
    catch_unwind(AssertUnwindSafe(move || {
        let mut builder = base_builder(&settings);
        if disable_system_proxy_lookup {
            builder = apply_env_proxy_fallback(builder.no_proxy());
        }
        builder.build().map_err(BuildClientFailure::Build)
    }))
    .map_err(|_| BuildClientFailure::Panic)?
}

fn base_builder(settings: &HttpSettings) -> ClientBuilder {
    Client::builder()
        .connect_timeout(Duration::from_secs(settings.connect_timeout_secs))
        .timeout(Duration::from_secs(settings.read_timeout_secs))
        .user_agent(user_agent::default_user_agent())
        .gzip(true)
}

fn apply_env_proxy_fallback(mut builder: ClientBuilder) -> ClientBuilder {
    if let Some(proxy) = env_proxy_for_scheme("https")
        && let Ok(resolved) = Proxy::https(&proxy)
    {
        builder = builder.proxy(resolved);
    }
    if let Some(proxy) = env_proxy_for_scheme("http")
        && let Ok(resolved) = Proxy::http(&proxy)
    {
        builder = builder.proxy(resolved);
    }
    builder
}

fn env_proxy_for_scheme(scheme: &str) -> Option<String> {
    match scheme {
        "https" => find_first_proxy_var(&["HTTPS_PROXY", "https_proxy", "ALL_PROXY", "all_proxy"]),
        "http" => find_first_proxy_var(&["HTTP_PROXY", "http_proxy", "ALL_PROXY", "all_proxy"]),
        _ => None,
    }
}

fn find_first_proxy_var(names: &[&str]) -> Option<String> {
    names.iter().find_map(|name| {
        std::env::var(name)
            .ok()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    })
}
