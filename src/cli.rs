//! CLI argument definitions using clap derive macros.
//!
//! Every run setting is optional here so that values from the config file
//! are only overridden by flags the user actually passed.

use std::path::PathBuf;

use clap::Parser;

/// Build a bounded citation graph from an arXiv search.
///
/// Citegraph seeds a graph from arXiv search results, follows cited DOIs
/// through Crossref breadth-first until the node cap is reached, writes node
/// and edge CSV tables, then downloads the seed PDFs.
#[derive(Parser, Debug)]
#[command(name = "citegraph")]
#[command(author, version, about)]
pub struct Args {
    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long)]
    pub quiet: bool,

    /// Config file path (default: $XDG_CONFIG_HOME/citegraph/config.toml)
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Ignore the default config file
    #[arg(long, conflicts_with = "config")]
    pub no_config: bool,

    /// arXiv search query (e.g. "all:graph neural networks")
    #[arg(short = 's', long)]
    pub query: Option<String>,

    /// Number of seed records requested from arXiv
    #[arg(short = 'n', long, value_parser = clap::value_parser!(u32).range(1..))]
    pub seed_limit: Option<u32>,

    /// Stop once the graph holds this many nodes
    #[arg(short = 'm', long, value_parser = clap::value_parser!(u32).range(1..))]
    pub max_nodes: Option<u32>,

    /// Minimum delay between external requests in milliseconds (0 to disable, max 60000)
    #[arg(short = 'l', long, value_parser = clap::value_parser!(u64).range(0..=60000))]
    pub delay_ms: Option<u64>,

    /// Node table output path
    #[arg(long, value_name = "PATH")]
    pub nodes_csv: Option<PathBuf>,

    /// Edge table output path
    #[arg(long, value_name = "PATH")]
    pub edges_csv: Option<PathBuf>,

    /// Directory for downloaded seed PDFs
    #[arg(short = 'o', long, value_name = "DIR")]
    pub artifact_dir: Option<PathBuf>,

    /// Skip the PDF download pass
    #[arg(long)]
    pub skip_artifacts: bool,

    /// Maximum concurrent PDF downloads (1-16)
    #[arg(short = 'c', long, value_parser = clap::value_parser!(u8).range(1..=16))]
    pub artifact_concurrency: Option<u8>,

    /// Contact email sent to Crossref (polite pool)
    #[arg(long)]
    pub mailto: Option<String>,

    /// HTTP connect timeout in seconds
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..=3600))]
    pub connect_timeout_secs: Option<u64>,

    /// HTTP request timeout in seconds
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..=3600))]
    pub read_timeout_secs: Option<u64>,

    /// Override the arXiv API base URL
    #[arg(long, hide = true)]
    pub arxiv_url: Option<String>,

    /// Override the Crossref API base URL
    #[arg(long, hide = true)]
    pub crossref_url: Option<String>,
}
