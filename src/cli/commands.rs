//! CLI commands and argument parsing

use crate::output::ExportFormat;
use crate::search::SortOrder;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Polite, resumable harvesting of paginated JSON APIs
#[derive(Parser, Debug)]
#[command(name = "pagewise")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Configuration file (YAML or JSON)
    #[arg(short = 'C', long, global = true)]
    pub config: Option<PathBuf>,

    /// API token (falls back to $PAGEWISE_API_TOKEN)
    #[arg(long, global = true)]
    pub token: Option<String>,

    /// API base URL
    #[arg(long, global = true)]
    pub base_url: Option<String>,

    /// Seconds between requests, also the backoff base
    #[arg(long, global = true)]
    pub delay: Option<f64>,

    /// Retries after HTTP 429 before giving up
    #[arg(long, global = true)]
    pub max_retries: Option<u32>,

    /// Fixed checkpoint file, overwritten on every save
    #[arg(long, global = true)]
    pub checkpoint: Option<PathBuf>,

    /// Directory for timestamped checkpoint files
    #[arg(long, global = true)]
    pub checkpoint_dir: Option<PathBuf>,

    /// Save a checkpoint every N collected items
    #[arg(long, global = true)]
    pub checkpoint_every: Option<usize>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Search models with filters
    Search {
        /// Free-text query
        query: Option<String>,

        /// Category slug (repeatable)
        #[arg(long = "category")]
        categories: Vec<String>,

        /// Tag slug (repeatable)
        #[arg(long = "tag")]
        tags: Vec<String>,

        /// License slug (repeatable)
        #[arg(long = "license")]
        licenses: Vec<String>,

        /// Only downloadable models
        #[arg(long)]
        downloadable: bool,

        /// Only animated models
        #[arg(long)]
        animated: bool,

        /// Minimum face count
        #[arg(long)]
        min_faces: Option<u64>,

        /// Maximum face count
        #[arg(long)]
        max_faces: Option<u64>,

        /// Only models by this user
        #[arg(long)]
        user: Option<String>,

        /// Result ordering
        #[arg(long, value_enum, allow_hyphen_values = true, default_value_t = SortOrder::Relevance)]
        sort: SortOrder,

        /// Extra query parameter as key=value (repeatable)
        #[arg(long = "param", value_parser = parse_key_val)]
        params: Vec<(String, String)>,

        #[command(flatten)]
        run: RunArgs,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Harvest any paginated endpoint
    Fetch {
        /// Endpoint path (relative to the base URL) or absolute URL
        endpoint: String,

        /// Query parameter as key=value (repeatable)
        #[arg(long = "param", value_parser = parse_key_val)]
        params: Vec<(String, String)>,

        /// Label used in checkpoint file names
        #[arg(long, default_value = crate::engine::DEFAULT_LABEL)]
        label: String,

        #[command(flatten)]
        run: RunArgs,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Fetch a single resource and print it
    Get {
        /// Resource path, e.g. /models/<uid>
        path: String,

        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show a checkpoint's timestamp, count and stats
    Inspect {
        /// Checkpoint file
        checkpoint: PathBuf,
    },

    /// Convert a checkpoint to JSON or CSV
    Export {
        /// Checkpoint file
        checkpoint: PathBuf,

        #[command(flatten)]
        output: OutputArgs,
    },
}

/// Options shared by harvesting commands
#[derive(Args, Debug, Clone, Default)]
pub struct RunArgs {
    /// Stop after this many new items
    #[arg(long)]
    pub max_results: Option<usize>,

    /// Resume from a checkpoint file
    #[arg(long)]
    pub resume: Option<PathBuf>,

    /// Drop new items whose value at this key is already in the resumed checkpoint
    #[arg(long)]
    pub dedup_key: Option<String>,
}

/// Where and how to write results
#[derive(Args, Debug, Clone, Default)]
pub struct OutputArgs {
    /// Output file
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Output format (default: from the file extension, else json)
    #[arg(long, value_enum)]
    pub format: Option<ExportFormat>,
}

impl OutputArgs {
    /// Explicit format, else the output file's extension, else JSON
    pub fn resolved_format(&self) -> ExportFormat {
        self.format
            .or_else(|| self.output.as_deref().and_then(ExportFormat::from_path))
            .unwrap_or_default()
    }
}

/// Parse `key=value`
pub fn parse_key_val(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected key=value, got '{raw}'")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_search() {
        let cli = Cli::try_parse_from([
            "pagewise",
            "--delay",
            "3",
            "search",
            "roman bust",
            "--category",
            "cultural-heritage-history",
            "--downloadable",
            "--sort",
            "-likeCount",
            "--max-results",
            "100",
            "-o",
            "out.csv",
        ])
        .unwrap();

        assert_eq!(cli.delay, Some(3.0));
        match cli.command {
            Commands::Search {
                query,
                categories,
                downloadable,
                sort,
                run,
                output,
                ..
            } => {
                assert_eq!(query.as_deref(), Some("roman bust"));
                assert_eq!(categories, vec!["cultural-heritage-history"]);
                assert!(downloadable);
                assert_eq!(sort, SortOrder::Likes);
                assert_eq!(run.max_results, Some(100));
                assert_eq!(output.resolved_format(), ExportFormat::Csv);
            }
            other => panic!("expected search, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_fetch_with_params() {
        let cli = Cli::try_parse_from([
            "pagewise",
            "fetch",
            "/models",
            "--param",
            "user=museum",
            "--param",
            "downloadable=true",
            "--resume",
            "partial.json",
            "--checkpoint-every",
            "50",
        ])
        .unwrap();

        assert_eq!(cli.checkpoint_every, Some(50));
        match cli.command {
            Commands::Fetch {
                endpoint,
                params,
                label,
                run,
                ..
            } => {
                assert_eq!(endpoint, "/models");
                assert_eq!(params[0], ("user".to_string(), "museum".to_string()));
                assert_eq!(label, "harvest");
                assert_eq!(run.resume, Some(PathBuf::from("partial.json")));
            }
            other => panic!("expected fetch, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_key_val() {
        assert_eq!(
            parse_key_val("q=a=b").unwrap(),
            ("q".to_string(), "a=b".to_string())
        );
        assert_eq!(
            parse_key_val("empty=").unwrap(),
            ("empty".to_string(), String::new())
        );
        assert!(parse_key_val("novalue").is_err());
        assert!(parse_key_val("=x").is_err());
    }

    #[test]
    fn test_output_format_resolution() {
        let args = OutputArgs::default();
        assert_eq!(args.resolved_format(), ExportFormat::Json);

        let args = OutputArgs {
            output: Some(PathBuf::from("models.csv")),
            format: Some(ExportFormat::Json),
        };
        assert_eq!(args.resolved_format(), ExportFormat::Json);
    }
}
