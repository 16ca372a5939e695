use colored::Colorize;
use commands::command_argument_builder;
use hrefhound::handlers::handle_crawl;
use hrefhound_core::print_banner;

mod commands;

#[tokio::main]
async fn main() {
    let cmd = command_argument_builder();
    let chosen_command = cmd.get_matches();
    let quiet = chosen_command.get_flag("quiet")
        || chosen_command
            .subcommand()
            .is_some_and(|(_, sub)| sub.get_flag("quiet"));

    // Show banner unless --quiet flag is set
    if !quiet {
        print_banner();
    }

    match chosen_command.subcommand() {
        // No subcommand provided, just show the banner
        None => {}
        Some(("crawl", primary_command)) => {
            if let Err(e) = handle_crawl(primary_command).await {
                eprintln!("{} {:#}", "✗ Crawl failed:".red().bold(), e);
                std::process::exit(1);
            }
        }
        _ => unreachable!("clap should ensure we don't get here"),
    }
}

pub const CLAP_STYLING: clap::builder::styling::Styles = clap::builder::styling::Styles::styled()
    .header(clap_cargo::style::HEADER)
    .usage(clap_cargo::style::USAGE)
    .literal(clap_cargo::style::LITERAL)
    .placeholder(clap_cargo::style::PLACEHOLDER)
    .error(clap_cargo::style::ERROR)
    .valid(clap_cargo::style::VALID)
    .invalid(clap_cargo::style::INVALID);
