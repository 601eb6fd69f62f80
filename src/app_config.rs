//! Application configuration loading and layering.
//!
//! Precedence, lowest to highest: built-in defaults, the config file, then
//! flags given on the command line.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use citegraph_core::RunConfig;
use citegraph_core::config::{MAX_ARTIFACT_CONCURRENCY, MAX_DELAY_MS};

use crate::cli::Args;

/// File configuration; every key is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileConfig {
    /// arXiv search query.
    pub query: Option<String>,
    /// Seed records requested.
    pub seed_limit: Option<u64>,
    /// Node cap.
    pub max_nodes: Option<u64>,
    /// Lookup spacing in milliseconds.
    pub delay_ms: Option<u64>,
    /// Node table path.
    pub nodes_csv: Option<PathBuf>,
    /// Edge table path.
    pub edges_csv: Option<PathBuf>,
    /// PDF directory.
    pub artifact_dir: Option<PathBuf>,
    /// Skip the PDF pass.
    pub skip_artifacts: Option<bool>,
    /// Concurrent PDF downloads.
    pub artifact_concurrency: Option<u64>,
    /// Crossref polite-pool contact.
    pub mailto: Option<String>,
    /// HTTP connect timeout in seconds.
    pub connect_timeout_secs: Option<u64>,
    /// HTTP request timeout in seconds.
    pub read_timeout_secs: Option<u64>,
    /// arXiv API base URL.
    pub arxiv_url: Option<String>,
    /// Crossref API base URL.
    pub crossref_url: Option<String>,
}

impl FileConfig {
    /// Validates config values against runtime and CLI constraints.
    pub fn validate(&self) -> Result<()> {
        if let Some(query) = &self.query
            && query.trim().is_empty()
        {
            bail!("Invalid config value for `query`: must not be empty");
        }
        validate_positive("seed_limit", self.seed_limit)?;
        validate_positive("max_nodes", self.max_nodes)?;
        if let Some(delay_ms) = self.delay_ms
            && delay_ms > MAX_DELAY_MS
        {
            bail!("Invalid config value for `delay_ms`: {delay_ms}. Expected range: 0..={MAX_DELAY_MS}");
        }
        if let Some(concurrency) = self.artifact_concurrency
            && !(1..=MAX_ARTIFACT_CONCURRENCY as u64).contains(&concurrency)
        {
            bail!(
                "Invalid config value for `artifact_concurrency`: {concurrency}. Expected range: 1..={MAX_ARTIFACT_CONCURRENCY}"
            );
        }
        validate_timeout_secs("connect_timeout_secs", self.connect_timeout_secs)?;
        validate_timeout_secs("read_timeout_secs", self.read_timeout_secs)?;
        Ok(())
    }
}

fn validate_positive(field: &str, value: Option<u64>) -> Result<()> {
    let Some(value) = value else {
        return Ok(());
    };
    if value == 0 || usize::try_from(value).is_err() {
        bail!("Invalid config value for `{field}`: {value}. Expected a positive integer");
    }
    Ok(())
}

fn validate_timeout_secs(field: &str, value: Option<u64>) -> Result<()> {
    let Some(value) = value else {
        return Ok(());
    };
    if !(1..=3600).contains(&value) {
        bail!("Invalid config value for `{field}`: {value}. Expected range: 1..=3600");
    }
    Ok(())
}

/// Loaded config metadata.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    /// Path that was consulted, if any.
    pub path: Option<PathBuf>,
    /// Parsed file config when a config file exists and was valid.
    pub config: Option<FileConfig>,
}

/// Resolves default config path.
///
/// Priority:
/// 1. `$XDG_CONFIG_HOME/citegraph/config.toml`
/// 2. `$HOME/.config/citegraph/config.toml`
#[must_use]
pub fn resolve_default_config_path() -> Option<PathBuf> {
    if let Some(xdg_config_home) = env_var_non_empty_os("XDG_CONFIG_HOME") {
        return Some(
            PathBuf::from(xdg_config_home)
                .join("citegraph")
                .join("config.toml"),
        );
    }

    let home = env_var_non_empty_os("HOME")?;
    Some(
        PathBuf::from(home)
            .join(".config")
            .join("citegraph")
            .join("config.toml"),
    )
}

fn env_var_non_empty_os(name: &str) -> Option<std::ffi::OsString> {
    let value = env::var_os(name)?;
    if value.is_empty() { None } else { Some(value) }
}

/// Loads the config selected by the command line.
///
/// An explicit `--config` path must exist; the default path is optional.
pub fn load_config_for(args: &Args) -> Result<LoadedConfig> {
    if args.no_config {
        return Ok(LoadedConfig {
            path: None,
            config: None,
        });
    }
    if let Some(path) = &args.config {
        let config = load_file_config(path)?;
        return Ok(LoadedConfig {
            path: Some(path.clone()),
            config: Some(config),
        });
    }
    load_default_file_config()
}

/// Loads config from default path if present.
pub fn load_default_file_config() -> Result<LoadedConfig> {
    let path = resolve_default_config_path();
    let Some(path_ref) = path.as_deref() else {
        return Ok(LoadedConfig { path, config: None });
    };

    if !path_ref.exists() {
        return Ok(LoadedConfig { path, config: None });
    }

    let config = load_file_config(path_ref)?;
    Ok(LoadedConfig {
        path,
        config: Some(config),
    })
}

fn load_file_config(path: &Path) -> Result<FileConfig> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file '{}'", path.display()))?;
    parse_config_str(&raw)
        .with_context(|| format!("Failed to parse config file '{}'", path.display()))
}

fn parse_config_str(raw: &str) -> Result<FileConfig> {
    let mut cfg = FileConfig::default();
    for (line_index, raw_line) in raw.lines().enumerate() {
        let line = strip_inline_comment(raw_line).trim();
        if line.is_empty() {
            continue;
        }
        let line_no = line_index + 1;

        let Some((raw_key, raw_value)) = line.split_once('=') else {
            bail!("Invalid config syntax on line {line_no}: expected key = value");
        };

        let key = raw_key.trim();
        let value = raw_value.trim();
        let invalid = || format!("Invalid `{key}` value on line {line_no}");

        match key {
            "query" => cfg.query = Some(parse_string_literal(value).with_context(invalid)?),
            "mailto" => cfg.mailto = Some(parse_string_literal(value).with_context(invalid)?),
            "arxiv_url" => cfg.arxiv_url = Some(parse_string_literal(value).with_context(invalid)?),
            "crossref_url" => {
                cfg.crossref_url = Some(parse_string_literal(value).with_context(invalid)?);
            }
            "nodes_csv" => {
                cfg.nodes_csv = Some(PathBuf::from(parse_string_literal(value).with_context(invalid)?));
            }
            "edges_csv" => {
                cfg.edges_csv = Some(PathBuf::from(parse_string_literal(value).with_context(invalid)?));
            }
            "artifact_dir" => {
                cfg.artifact_dir =
                    Some(PathBuf::from(parse_string_literal(value).with_context(invalid)?));
            }
            "seed_limit" => cfg.seed_limit = Some(parse_integer_u64(value).with_context(invalid)?),
            "max_nodes" => cfg.max_nodes = Some(parse_integer_u64(value).with_context(invalid)?),
            "delay_ms" => cfg.delay_ms = Some(parse_integer_u64(value).with_context(invalid)?),
            "artifact_concurrency" => {
                cfg.artifact_concurrency = Some(parse_integer_u64(value).with_context(invalid)?);
            }
            "connect_timeout_secs" => {
                cfg.connect_timeout_secs = Some(parse_integer_u64(value).with_context(invalid)?);
            }
            "read_timeout_secs" => {
                cfg.read_timeout_secs = Some(parse_integer_u64(value).with_context(invalid)?);
            }
            "skip_artifacts" => {
                cfg.skip_artifacts = Some(parse_boolean(value).with_context(invalid)?);
            }
            unknown => {
                bail!("Unknown configuration key: '{unknown}' on line {line_no}");
            }
        }
    }
    cfg.validate()?;
    Ok(cfg)
}

fn strip_inline_comment(line: &str) -> &str {
    let mut in_string = false;
    for (index, ch) in line.char_indices() {
        match ch {
            '"' => in_string = !in_string,
            '#' if !in_string => return &line[..index],
            _ => {}
        }
    }
    line
}

fn parse_string_literal(raw_value: &str) -> Result<String> {
    if raw_value.len() < 2 || !raw_value.starts_with('"') || !raw_value.ends_with('"') {
        bail!("Expected double-quoted string");
    }
    Ok(raw_value[1..raw_value.len() - 1].to_string())
}

fn parse_integer_u64(raw_value: &str) -> Result<u64> {
    let token = raw_value.trim().replace('_', "");
    if token.is_empty() {
        bail!("Expected integer value");
    }
    let value = token.parse::<i128>()?;
    if value < 0 {
        bail!("Expected non-negative integer");
    }
    u64::try_from(value).map_err(|_| anyhow::anyhow!("Integer value out of range for u64"))
}

fn parse_boolean(raw_value: &str) -> Result<bool> {
    match raw_value.trim() {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => bail!("Expected 'true' or 'false'"),
    }
}

fn to_usize(field: &str, value: u64) -> Result<usize> {
    usize::try_from(value).with_context(|| format!("`{field}` value {value} is too large"))
}

/// Layers defaults, the file config and explicit CLI flags into a run config.
pub fn build_run_config(args: &Args, file: Option<&FileConfig>) -> Result<RunConfig> {
    let mut config = RunConfig::default();

    if let Some(file) = file {
        apply_file_config(&mut config, file)?;
    }
    apply_cli_args(&mut config, args);

    config
        .validate()
        .context("Configuration rejected before the crawl")?;
    Ok(config)
}

fn apply_file_config(config: &mut RunConfig, file: &FileConfig) -> Result<()> {
    if let Some(query) = &file.query {
        config.query.clone_from(query);
    }
    if let Some(seed_limit) = file.seed_limit {
        config.seed_limit = to_usize("seed_limit", seed_limit)?;
    }
    if let Some(max_nodes) = file.max_nodes {
        config.crawl.max_nodes = to_usize("max_nodes", max_nodes)?;
    }
    if let Some(delay_ms) = file.delay_ms {
        config.crawl.request_delay = Duration::from_millis(delay_ms);
    }
    if let Some(path) = &file.nodes_csv {
        config.export.nodes.clone_from(path);
    }
    if let Some(path) = &file.edges_csv {
        config.export.edges.clone_from(path);
    }
    if let Some(dir) = &file.artifact_dir {
        config.artifacts.output_dir.clone_from(dir);
    }
    if let Some(skip) = file.skip_artifacts {
        config.artifacts.enabled = !skip;
    }
    if let Some(concurrency) = file.artifact_concurrency {
        config.artifacts.concurrency = to_usize("artifact_concurrency", concurrency)?;
    }
    if let Some(mailto) = &file.mailto {
        config.mailto = Some(mailto.clone());
    }
    if let Some(secs) = file.connect_timeout_secs {
        config.http.connect_timeout_secs = secs;
    }
    if let Some(secs) = file.read_timeout_secs {
        config.http.read_timeout_secs = secs;
    }
    if let Some(url) = &file.arxiv_url {
        config.arxiv_url.clone_from(url);
    }
    if let Some(url) = &file.crossref_url {
        config.crossref_url.clone_from(url);
    }
    Ok(())
}

fn apply_cli_args(config: &mut RunConfig, args: &Args) {
    if let Some(query) = &args.query {
        config.query.clone_from(query);
    }
    if let Some(seed_limit) = args.seed_limit {
        config.seed_limit = seed_limit as usize;
    }
    if let Some(max_nodes) = args.max_nodes {
        config.crawl.max_nodes = max_nodes as usize;
    }
    if let Some(delay_ms) = args.delay_ms {
        config.crawl.request_delay = Duration::from_millis(delay_ms);
    }
    if let Some(path) = &args.nodes_csv {
        config.export.nodes.clone_from(path);
    }
    if let Some(path) = &args.edges_csv {
        config.export.edges.clone_from(path);
    }
    if let Some(dir) = &args.artifact_dir {
        config.artifacts.output_dir.clone_from(dir);
    }
    if args.skip_artifacts {
        config.artifacts.enabled = false;
    }
    if let Some(concurrency) = args.artifact_concurrency {
        config.artifacts.concurrency = usize::from(concurrency);
    }
    if let Some(mailto) = &args.mailto {
        config.mailto = Some(mailto.clone());
    }
    if let Some(secs) = args.connect_timeout_secs {
        config.http.connect_timeout_secs = secs;
    }
    if let Some(secs) = args.read_timeout_secs {
        config.http.read_timeout_secs = secs;
    }
    if let Some(url) = &args.arxiv_url {
        config.arxiv_url.clone_from(url);
    }
    if let Some(url) = &args.crossref_url {
        config.crossref_url.clone_from(url);
    }
}
