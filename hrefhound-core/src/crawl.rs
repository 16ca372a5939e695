use colored::Colorize;
use hrefhound_scanner::{
    AttemptOutcome, CrawlConfig, CrawlSummary, Crawler, PageFetcher, ResultCallback, ScanError,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Options for configuring a crawl operation
pub struct CrawlOptions {
    pub config: CrawlConfig,
    pub show_progress_bars: bool,
}

/// Callback for reporting crawl progress messages
pub type CrawlProgressCallback = Arc<dyn Fn(String) + Send + Sync>;

/// Execute a crawl with HTTP fetchers built from the options
pub async fn execute_crawl(
    options: CrawlOptions,
    progress_callback: Option<CrawlProgressCallback>,
) -> Result<CrawlSummary, ScanError> {
    let CrawlOptions {
        config,
        show_progress_bars,
    } = options;

    let crawler = Crawler::from_config(&config)?;
    if let Some(ref callback) = progress_callback {
        callback(format!(
            "Crawling {} with {} workers and {} pooled fetchers",
            config.start_url, config.concurrency, config.pool_size
        ));
    }

    run_crawler(crawler, &config.start_url, show_progress_bars).await
}

/// Runs an already built crawler, optionally showing a spinner with live counts
pub async fn run_crawler<F: PageFetcher>(
    crawler: Crawler<F>,
    start_url: &str,
    show_progress_bars: bool,
) -> Result<CrawlSummary, ScanError> {
    let progress_bar = if show_progress_bars {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.enable_steady_tick(Duration::from_millis(100));
        pb.set_message("Starting crawl...");
        Some(Arc::new(pb))
    } else {
        None
    };

    let crawler = match progress_bar.clone() {
        Some(pb) => {
            let visited = Arc::new(AtomicUsize::new(0));
            let broken = Arc::new(AtomicUsize::new(0));
            let callback: ResultCallback = Arc::new(move |url: &str, outcome: &AttemptOutcome| {
                let visited = visited.fetch_add(1, Ordering::Relaxed) + 1;
                let broken = if matches!(outcome, AttemptOutcome::Broken(_)) {
                    pb.println(format!("{} {}", "404".yellow().bold(), url));
                    broken.fetch_add(1, Ordering::Relaxed) + 1
                } else {
                    broken.load(Ordering::Relaxed)
                };
                pb.set_message(format!(
                    "Crawling... {} URLs visited, {} broken",
                    visited, broken
                ));
            });
            crawler.with_result_callback(callback)
        }
        None => crawler,
    };

    let summary = crawler.crawl(start_url).await;

    if let Some(ref pb) = progress_bar {
        match &summary {
            Ok(summary) => pb.finish_with_message(format!(
                "Crawl complete! {} URLs visited",
                summary.visited
            )),
            Err(_) => pb.finish_and_clear(),
        }
    }

    summary
}

/// Generate the console summary for a finished crawl
pub fn generate_crawl_report(summary: &CrawlSummary) -> String {
    let mut report = String::new();
    report.push_str("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n\n");

    if summary.broken.is_empty() {
        report.push_str(&format!("{}\n", "✓ No broken pages found".green().bold()));
    } else {
        report.push_str(&format!(
            "{}\n\n",
            format!("✗ {} broken pages found:", summary.broken.len())
                .red()
                .bold()
        ));

        let url_width = summary
            .broken
            .iter()
            .map(|page| page.url.chars().count())
            .max()
            .unwrap_or(0)
            .max("URL con Error".len());

        report.push_str(&format!(
            "  {:<width$}  {}\n",
            "URL con Error".bold(),
            "Encontrado en".bold(),
            width = url_width
        ));
        report.push_str(&format!("  {}\n", "─".repeat(url_width + 2 + 13)));

        for page in &summary.broken {
            report.push_str(&format!(
                "  {:<width$}  {} {}\n",
                page.url.red(),
                page.referrer,
                format!("({})", page.reason).bright_black(),
                width = url_width
            ));
        }
    }

    if !summary.failed.is_empty() {
        report.push_str(&format!(
            "\n{}\n",
            format!(
                "[!] {} pages could not be loaded (not counted as broken):",
                summary.failed.len()
            )
            .yellow()
        ));
        for page in &summary.failed {
            report.push_str(&format!("  {} {}\n", page.url, page.error.bright_black()));
        }
    }

    report.push_str(&format!(
        "\n# URLs visited: {}\n",
        summary.visited.to_string().cyan()
    ));
    report
}
