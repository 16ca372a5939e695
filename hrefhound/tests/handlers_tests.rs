use hrefhound::handlers::*;
use hrefhound_core::report::ReportFormat;
use hrefhound_scanner::BlockPolicy;
use std::path::PathBuf;
use std::time::Duration;

#[test]
fn test_build_config_defaults() {
    let config = build_config(&CrawlArgs::default()).unwrap();

    assert_eq!(config.start_url, "https://qa.garzablancaresort.com/");
    assert_eq!(config.concurrency, 10);
    assert_eq!(config.pool_size, 15);
    assert_eq!(config.nav_timeout, Duration::from_secs(20));
    assert_eq!(
        config.block_policy(),
        BlockPolicy::new([".pdf", ".zip", ".doc"])
    );
}

#[test]
fn test_build_config_custom_extensions_replace_defaults() {
    let args = CrawlArgs {
        deny_extensions: vec!["PNG".to_string(), ".jpg".to_string()],
        ..CrawlArgs::default()
    };
    let policy = build_config(&args).unwrap().block_policy();

    assert!(policy.should_block("https://site.test/logo.png"));
    assert!(policy.should_block("https://site.test/photo.JPG"));
    assert!(!policy.should_block("https://site.test/brochure.pdf"));
}

#[test]
fn test_build_config_rejects_threads_above_pool() {
    let args = CrawlArgs {
        threads: 20,
        pool_size: 15,
        ..CrawlArgs::default()
    };
    let err = build_config(&args).unwrap_err();
    assert!(err.to_string().contains("exceeds fetcher pool size"));
}

#[test]
fn test_build_config_rejects_zero_timeout() {
    let args = CrawlArgs {
        timeout_secs: 0,
        ..CrawlArgs::default()
    };
    assert!(build_config(&args).is_err());
}

#[test]
fn test_build_config_rejects_zero_threads() {
    let args = CrawlArgs {
        threads: 0,
        ..CrawlArgs::default()
    };
    assert!(build_config(&args).is_err());
}

#[test]
fn test_resolve_output_path_plain() {
    assert_eq!(
        resolve_output_path("errores_404.csv"),
        PathBuf::from("errores_404.csv")
    );
}

#[test]
fn test_resolve_output_path_expands_tilde() {
    if std::env::var_os("HOME").is_none() {
        return;
    }
    let resolved = resolve_output_path("~/reports/out.csv");

    assert!(!resolved.to_string_lossy().starts_with('~'));
    assert!(resolved.ends_with("reports/out.csv"));
}

#[test]
fn test_parse_report_format() {
    assert_eq!(parse_report_format("csv").unwrap(), ReportFormat::Csv);
    assert_eq!(parse_report_format("JSON").unwrap(), ReportFormat::Json);
    assert!(parse_report_format("pdf").is_err());
}
