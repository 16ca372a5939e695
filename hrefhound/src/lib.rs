// Include handlers module directly from handlers.rs
#[path = "handlers.rs"]
pub mod handlers;

pub use handlers::{CrawlArgs, build_config, handle_crawl, parse_report_format, resolve_output_path};

// Re-export crawl functionality from hrefhound-core
pub use hrefhound_core::crawl::{
    CrawlOptions, CrawlProgressCallback, execute_crawl, generate_crawl_report,
};
