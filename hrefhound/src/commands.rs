use crate::CLAP_STYLING;
use clap::{arg, command};
use hrefhound_core::report::DEFAULT_REPORT_FILE;
use hrefhound_scanner::config::DEFAULT_START_URL;
use url::Url;

pub(crate) fn command_argument_builder() -> clap::Command {
    clap::Command::new("hrefhound")
        .version(env!("CARGO_PKG_VERSION"))
        .bin_name("hrefhound")
        .styles(CLAP_STYLING)
        .arg(
            arg!(-q --"quiet" "Suppress banner and non-essential output")
                .required(false)
                .global(true),
        )
        .subcommand_required(false)
        .subcommand(
            command!("crawl")
                .about(
                    "Crawl every page reachable inside one origin and report the pages that \
                are missing, together with the page that linked to them.",
                )
                .arg(
                    arg!(-u --"url" <URL>)
                        .required(false)
                        .help("The start URL. Only links under its origin are followed")
                        .value_parser(clap::value_parser!(Url))
                        .default_value(DEFAULT_START_URL),
                )
                .arg(
                    arg!(-t --"threads" <NUM_WORKERS>)
                        .required(false)
                        .help("Maximum number of pages visited at the same time")
                        .value_parser(clap::value_parser!(usize))
                        .default_value("10"),
                )
                .arg(
                    arg!(--"pool-size" <NUM_FETCHERS>)
                        .required(false)
                        .help("Number of page fetchers kept in the pool (must be >= threads)")
                        .value_parser(clap::value_parser!(usize))
                        .default_value("15"),
                )
                .arg(
                    arg!(--"timeout" <SECONDS>)
                        .required(false)
                        .help("Navigation timeout per page, in seconds")
                        .value_parser(clap::value_parser!(u64))
                        .default_value("20"),
                )
                .arg(
                    arg!(--"deny-ext" <EXTENSION>)
                        .required(false)
                        .help(
                            "File extension whose requests are aborted. Repeatable \
                        (default: .pdf, .zip, .doc)",
                        )
                        .action(clap::ArgAction::Append),
                )
                .arg(
                    arg!(-o --"output" <PATH>)
                        .required(false)
                        .help("Where to write the report. Existing files are overwritten")
                        .default_value(DEFAULT_REPORT_FILE),
                )
                .arg(
                    arg!(-f --"format" <FORMAT>)
                        .required(false)
                        .help("Report format: csv, json, text")
                        .value_parser(["csv", "json", "text"])
                        .default_value("csv"),
                )
                .arg(
                    arg!(-v --"verbose")
                        .required(false)
                        .help("Log every visit instead of showing a spinner")
                        .action(clap::ArgAction::SetTrue),
                ),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_definition_is_consistent() {
        command_argument_builder().debug_assert();
    }

    #[test]
    fn test_crawl_defaults() {
        let matches = command_argument_builder()
            .try_get_matches_from(["hrefhound", "crawl"])
            .unwrap();
        let (name, crawl) = matches.subcommand().unwrap();

        assert_eq!(name, "crawl");
        assert_eq!(
            crawl.get_one::<Url>("url").unwrap().as_str(),
            DEFAULT_START_URL
        );
        assert_eq!(*crawl.get_one::<usize>("threads").unwrap(), 10);
        assert_eq!(*crawl.get_one::<usize>("pool-size").unwrap(), 15);
        assert_eq!(*crawl.get_one::<u64>("timeout").unwrap(), 20);
        assert_eq!(
            crawl.get_one::<String>("output").unwrap(),
            DEFAULT_REPORT_FILE
        );
        assert!(crawl.get_many::<String>("deny-ext").is_none());
    }

    #[test]
    fn test_crawl_rejects_unknown_format() {
        let result = command_argument_builder().try_get_matches_from([
            "hrefhound",
            "crawl",
            "--format",
            "html",
        ]);
        assert!(result.is_err());
    }
}
