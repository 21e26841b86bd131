//! CLI entry point for the casefetch tool.

use anyhow::Result;
use casefetch_core::{ApiClient, Config, Orchestrator, RetryPolicy, SearchQuery};
use clap::Parser;
use tracing::{debug, error, info};

mod cli;

use cli::Args;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    // Determine log level based on verbose/quiet flags
    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (info)
    let default_level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::fmt().with_env_filter(filter).init();

    debug!(?args, "CLI arguments parsed");

    // Configuration failures must surface before any network activity
    let config = Config::from_env()?;

    std::fs::create_dir_all(&args.output)?;

    let retry_policy = RetryPolicy::with_max_attempts(args.max_retries);
    let client = ApiClient::new(&config, retry_policy);
    let orchestrator = Orchestrator::new(client, args.page_size, args.recap);

    let queries: Vec<SearchQuery> = args
        .queries
        .iter()
        .map(|phrase| {
            SearchQuery::new(phrase)
                .with_jurisdictions(args.jurisdictions.iter().cloned())
                .with_filed_range(args.filed_after.clone(), args.filed_before.clone())
        })
        .collect();

    info!(queries = queries.len(), output = %args.output.display(), "casefetch starting");

    let summary = orchestrator.run(&queries, &args.output).await;

    for report in &summary.reports {
        info!(
            phrase = %report.phrase,
            cases = report.cases_found,
            failed = report.cases_failed(),
            "query finished"
        );
        if let Some(search_error) = &report.search_error {
            error!(phrase = %report.phrase, error = %search_error, "search did not complete");
        }
    }

    let metrics = summary.metrics;
    info!(
        cases = summary.cases_found(),
        failed = summary.cases_failed(),
        api_calls = metrics.calls,
        bytes = metrics.total_bytes,
        elapsed_secs = metrics.total_elapsed.as_secs_f64(),
        "run complete"
    );

    if summary.reports.iter().any(|r| r.search_error.is_some()) {
        anyhow::bail!("one or more searches failed");
    }

    Ok(())
}
