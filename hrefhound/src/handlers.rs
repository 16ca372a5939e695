use anyhow::{Context, bail};
use clap::ArgMatches;
use colored::Colorize;
use hrefhound_core::crawl::{
    CrawlOptions, CrawlProgressCallback, execute_crawl, generate_crawl_report,
};
use hrefhound_core::report::{DEFAULT_REPORT_FILE, ReportFormat, write_report};
use hrefhound_scanner::CrawlConfig;
use hrefhound_scanner::config::{
    DEFAULT_BLOCKED_EXTENSIONS, DEFAULT_CONCURRENCY, DEFAULT_POOL_SIZE, DEFAULT_START_URL,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing::level_filters::LevelFilter;
use url::Url;

/// Arguments of the `crawl` subcommand, detached from clap.
#[derive(Debug, Clone)]
pub struct CrawlArgs {
    pub url: String,
    pub threads: usize,
    pub pool_size: usize,
    pub timeout_secs: u64,
    pub deny_extensions: Vec<String>,
    pub output: String,
    pub format: String,
    pub quiet: bool,
    pub verbose: bool,
}

impl Default for CrawlArgs {
    fn default() -> Self {
        Self {
            url: DEFAULT_START_URL.to_string(),
            threads: DEFAULT_CONCURRENCY,
            pool_size: DEFAULT_POOL_SIZE,
            timeout_secs: 20,
            deny_extensions: Vec::new(),
            output: DEFAULT_REPORT_FILE.to_string(),
            format: "csv".to_string(),
            quiet: false,
            verbose: false,
        }
    }
}

impl CrawlArgs {
    pub fn from_matches(args: &ArgMatches) -> Self {
        let defaults = Self::default();
        Self {
            url: args
                .get_one::<Url>("url")
                .map(|url| url.to_string())
                .unwrap_or(defaults.url),
            threads: args
                .get_one::<usize>("threads")
                .copied()
                .unwrap_or(defaults.threads),
            pool_size: args
                .get_one::<usize>("pool-size")
                .copied()
                .unwrap_or(defaults.pool_size),
            timeout_secs: args
                .get_one::<u64>("timeout")
                .copied()
                .unwrap_or(defaults.timeout_secs),
            deny_extensions: args
                .get_many::<String>("deny-ext")
                .map(|values| values.cloned().collect())
                .unwrap_or_default(),
            output: args
                .get_one::<String>("output")
                .cloned()
                .unwrap_or(defaults.output),
            format: args
                .get_one::<String>("format")
                .cloned()
                .unwrap_or(defaults.format),
            quiet: args.get_flag("quiet"),
            verbose: args.get_flag("verbose"),
        }
    }
}

/// Turns parsed arguments into a validated crawl configuration
pub fn build_config(args: &CrawlArgs) -> anyhow::Result<CrawlConfig> {
    if args.timeout_secs == 0 {
        bail!("--timeout must be at least one second");
    }

    let extensions: Vec<String> = if args.deny_extensions.is_empty() {
        DEFAULT_BLOCKED_EXTENSIONS
            .iter()
            .map(|ext| ext.to_string())
            .collect()
    } else {
        args.deny_extensions.clone()
    };

    let config = CrawlConfig::new(args.url.clone())
        .with_concurrency(args.threads)
        .with_pool_size(args.pool_size)
        .with_nav_timeout(Duration::from_secs(args.timeout_secs))
        .with_blocked_extensions(extensions);
    config.validate()?;
    Ok(config)
}

/// Expands `~` in the report path
pub fn resolve_output_path(raw: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(raw).as_ref())
}

pub fn parse_report_format(raw: &str) -> anyhow::Result<ReportFormat> {
    ReportFormat::from_str(raw).with_context(|| format!("unsupported report format '{}'", raw))
}

fn log_level(quiet: bool, verbose: bool) -> LevelFilter {
    if quiet {
        LevelFilter::ERROR
    } else if verbose {
        LevelFilter::INFO
    } else {
        LevelFilter::WARN
    }
}

pub async fn handle_crawl(sub_matches: &ArgMatches) -> anyhow::Result<()> {
    let args = CrawlArgs::from_matches(sub_matches);

    // Initialize tracing for logging
    let _ = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(log_level(args.quiet, args.verbose))
        .try_init();

    let config = build_config(&args)?;
    let format = parse_report_format(&args.format)?;
    let output = resolve_output_path(&args.output);

    if !args.quiet {
        println!("\n🐕 Crawling {}", config.start_url.bright_white());
        println!("Workers: {}", config.concurrency);
        println!("Fetcher pool: {}", config.pool_size);
        println!("Timeout: {}s", args.timeout_secs);
        println!(
            "Blocked extensions: {}\n",
            config.block_policy().extensions().join(", ")
        );
    }

    let progress_callback: CrawlProgressCallback = Arc::new(|message: String| info!("{}", message));
    let options = CrawlOptions {
        config,
        show_progress_bars: !args.quiet && !args.verbose,
    };

    let summary = execute_crawl(options, Some(progress_callback))
        .await
        .context("crawl could not start")?;

    if !args.quiet {
        println!();
        print!("{}", generate_crawl_report(&summary));
    }

    write_report(&output, &summary, format)
        .with_context(|| format!("failed to write report to {}", output.display()))?;
    println!(
        "{} Report written to {}",
        "✓".green().bold(),
        output.display().to_string().bright_white()
    );

    Ok(())
}
