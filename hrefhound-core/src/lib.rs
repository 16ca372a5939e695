use colored::Colorize;

pub mod crawl;
pub mod report;

pub use crawl::{
    CrawlOptions, CrawlProgressCallback, execute_crawl, generate_crawl_report, run_crawler,
};
pub use report::{ReportError, ReportFormat, render_report, write_report};

pub fn print_banner() {
    println!(
        "{} {}",
        "hrefhound".bright_cyan().bold(),
        format!("v{}", env!("CARGO_PKG_VERSION")).bright_black()
    );
    println!("{}\n", "sniffing out dead links on a single origin".bright_black());
}
