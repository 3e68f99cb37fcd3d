//! CLI runner - executes commands

use crate::cli::commands::{Cli, Commands, OutputArgs, RunArgs};
use crate::config::HarvestConfig;
use crate::engine::{HarvestJob, HarvestReport, Harvester};
use crate::error::{Error, Result, ResultExt};
use crate::output::{export, ExportFormat};
use crate::search::{SearchOptions, SEARCH_ENDPOINT};
use crate::state::CheckpointStore;
use crate::types::OptionStringExt;
use std::path::Path;
use tracing::info;

/// Environment variable consulted when no token is given
pub const TOKEN_ENV: &str = "PAGEWISE_API_TOKEN";

/// CLI runner
pub struct Runner {
    cli: Cli,
}

impl Runner {
    /// Create a new runner
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Run the CLI command
    pub async fn run(&self) -> Result<()> {
        match &self.cli.command {
            Commands::Search {
                query,
                categories,
                tags,
                licenses,
                downloadable,
                animated,
                min_faces,
                max_faces,
                user,
                sort,
                params,
                run,
                output,
            } => {
                let mut options = SearchOptions {
                    query: query.clone().none_if_empty(),
                    categories: categories.clone(),
                    tags: tags.clone(),
                    licenses: licenses.clone(),
                    downloadable: downloadable.then_some(true),
                    animated: animated.then_some(true),
                    min_face_count: *min_faces,
                    max_face_count: *max_faces,
                    user: user.clone(),
                    sort_by: *sort,
                    ..SearchOptions::default()
                };
                options.extra.extend(params.iter().cloned());
                self.search(&options, run, output).await
            }
            Commands::Fetch {
                endpoint,
                params,
                label,
                run,
                output,
            } => {
                let job = HarvestJob::new(endpoint.as_str())
                    .with_params(params.clone())
                    .with_label(label.as_str());
                self.harvest(job, run, output).await
            }
            Commands::Get { path, output } => self.get(path, output.as_deref()).await,
            Commands::Inspect { checkpoint } => self.inspect(checkpoint).await,
            Commands::Export { checkpoint, output } => self.export(checkpoint, output).await,
        }
    }

    /// Build the effective configuration: file, then flags, then environment
    pub fn build_config(&self) -> Result<HarvestConfig> {
        let mut config = match &self.cli.config {
            Some(path) => HarvestConfig::from_file(path)?,
            None => HarvestConfig::default(),
        };

        if let Some(url) = &self.cli.base_url {
            config = config.with_base_url(url.as_str());
        }
        if let Some(delay) = self.cli.delay {
            config = config.with_request_delay(delay);
        }
        if let Some(retries) = self.cli.max_retries {
            config = config.with_max_retries(retries);
        }
        if let Some(path) = &self.cli.checkpoint {
            config = config.with_checkpoint_path(path.as_path());
        }
        if let Some(dir) = &self.cli.checkpoint_dir {
            config = config.with_checkpoint_dir(dir.as_path());
        }
        if let Some(every) = self.cli.checkpoint_every {
            config = config.with_checkpoint_every(every);
        }

        if let Some(token) = self.cli.token.clone().none_if_empty() {
            config = config.with_api_token(token);
        } else if config.api_token.is_none() {
            if let Ok(token) = std::env::var(TOKEN_ENV) {
                config = config.with_api_token(token);
            }
        }

        config.validate()?;
        Ok(config)
    }

    async fn search(
        &self,
        options: &SearchOptions,
        run: &RunArgs,
        output: &OutputArgs,
    ) -> Result<()> {
        let job = HarvestJob::new(SEARCH_ENDPOINT)
            .with_params(options.to_params()?)
            .with_label(options.label());
        self.harvest(job, run, output).await
    }

    async fn harvest(&self, job: HarvestJob, run: &RunArgs, output: &OutputArgs) -> Result<()> {
        let mut job = job.with_max_results(run.max_results);
        if let Some(path) = &run.resume {
            job = job.resume_from(path.as_path());
        }
        if let Some(key) = &run.dedup_key {
            job = job.with_dedup_key(key.as_str());
        }

        let harvester = Harvester::new(self.build_config()?)?;
        let result = harvester.run_until(&job, shutdown_signal()).await;

        print_stats(&harvester);
        if let Err(e) = &result {
            if let Some(hint) = resume_hint(e) {
                println!("\n{hint}");
            }
        }
        let report = result?;
        print_report(&report);

        if let Some(path) = &output.output {
            export(&report.items, path, output.resolved_format())?;
            println!("Results written to {}", path.display());
        }
        Ok(())
    }

    async fn get(&self, path: &str, output: Option<&Path>) -> Result<()> {
        let harvester = Harvester::new(self.build_config()?)?;
        let body = harvester.get(path).await?;

        match output {
            Some(file) => {
                let items = [body];
                export(&items, file, ExportFormat::Json)?;
                info!("Resource written to {}", file.display());
            }
            None => {
                let text =
                    serde_json::to_string_pretty(&body).context("Failed to render resource")?;
                println!("{text}");
            }
        }
        Ok(())
    }

    async fn inspect(&self, path: &Path) -> Result<()> {
        let checkpoint = CheckpointStore::default().load_checkpoint(path).await?;

        println!("Checkpoint: {}", path.display());
        println!("Saved at:   {}", checkpoint.timestamp.to_rfc3339());
        println!("Results:    {}", checkpoint.items.len());
        if !checkpoint.is_consistent() {
            println!(
                "Warning:    recorded count {} does not match the data",
                checkpoint.count
            );
        }
        println!("\n{}", checkpoint.stats);
        Ok(())
    }

    async fn export(&self, path: &Path, output: &OutputArgs) -> Result<()> {
        let target = output
            .output
            .as_deref()
            .ok_or_else(|| Error::config("export needs an output file (-o)"))?;

        let checkpoint = CheckpointStore::default().load_checkpoint(path).await?;
        let written = export(&checkpoint.items, target, output.resolved_format())?;
        println!("Exported {written} results to {}", target.display());
        Ok(())
    }
}

/// Resolves on Ctrl-C; never resolves if the handler cannot be installed
async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        std::future::pending::<()>().await;
    }
}

/// What to tell the user after an interrupted run that left a checkpoint
fn resume_hint(err: &Error) -> Option<String> {
    let Error::Interrupted {
        checkpoint: Some(path),
        ..
    } = err
    else {
        return None;
    };

    let advice = if matches!(err.root(), Error::Cancelled) {
        "Stopped by user."
    } else if err.is_transient() {
        "The server is refusing requests for now; wait a while before resuming."
    } else {
        "Fix the cause above before resuming."
    };
    Some(format!("{advice} Resume with: --resume {path}"))
}

fn print_stats(harvester: &Harvester) {
    println!("\n=== Request Statistics ===");
    println!("{}", harvester.stats());

    let limits = harvester.executor().rate_limit_state();
    if let (Some(remaining), Some(limit)) = (limits.remaining, limits.limit) {
        println!("Rate limit:        {remaining}/{limit} remaining");
    } else if let Some(remaining) = limits.remaining {
        println!("Rate limit:        {remaining} remaining");
    }
}

fn print_report(report: &HarvestReport) {
    println!("\n=== Harvest ===");
    println!("Results:           {}", report.len());
    if report.resumed > 0 {
        println!("Resumed:           {}", report.resumed);
        println!("New:               {}", report.fresh());
    }
    if report.duplicates > 0 {
        println!("Duplicates:        {}", report.duplicates);
    }
    println!("Pages:             {}", report.pages);
    println!("Elapsed:           {:.1}s", report.elapsed.as_secs_f64());
    if let Some(path) = &report.checkpoint {
        println!("Checkpoint:        {}", path.display());
    }
}
