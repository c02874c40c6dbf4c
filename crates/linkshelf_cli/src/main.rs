//! Command-line inspector for a link library file.
//!
//! # Responsibility
//! - Open a library through `linkshelf_core` and print read-only views.
//! - Keep output line-oriented so it can be piped.

use clap::{Parser, Subcommand, ValueEnum};
use linkshelf_core::{
    core_version, default_log_level, init_logging, LinkFilter, LinkOrder, LinkStore, StoreConfig,
};
use log::info;
use std::error::Error;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(name = "linkshelf", version, about = "Inspect a local link library")]
struct Cli {
    /// TOML store configuration; takes precedence over `--db`.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Database file to open.
    #[arg(long, global = true, default_value = "linkshelf.sqlite")]
    db: PathBuf,

    /// Absolute directory for rolling log files. Logging is off when omitted.
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Collection counters and links added during the last week.
    Stats,
    /// Full-text search over url, title and description.
    Search { term: String },
    /// List links.
    List {
        #[arg(long, default_value_t = LinkOrder::Newest)]
        order: LinkOrder,
        #[arg(long, value_enum, default_value_t = ListFilter::All)]
        filter: ListFilter,
    },
    /// List tags with their link counts.
    Tags,
    /// List groups with their link counts.
    Groups,
    /// Print the library and schema versions.
    Version,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ListFilter {
    All,
    Starred,
    Unread,
    Archived,
}

impl From<ListFilter> for LinkFilter {
    fn from(value: ListFilter) -> Self {
        match value {
            ListFilter::All => Self::All,
            ListFilter::Starred => Self::Starred,
            ListFilter::Unread => Self::Unread,
            ListFilter::Archived => Self::Archived,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    if let Some(log_dir) = cli.log_dir.as_ref() {
        init_logging(default_log_level(), log_dir)?;
    }

    let config = match cli.config.as_ref() {
        Some(path) => StoreConfig::load(path)?,
        None => StoreConfig::new(&cli.db),
    };
    let store = LinkStore::open(&config)?;
    info!(
        "event=cli_command module=cli status=start command={:?} db_path={}",
        cli.command,
        config.db_path.display()
    );

    match cli.command {
        Command::Stats => {
            let stats = store.stats()?;
            println!("total={}", stats.total);
            println!("unread={}", stats.unread);
            println!("starred={}", stats.starred);
            println!("archived={}", stats.archived);
            for day in store.links_added_in_last_seven_days()? {
                println!("added {} {}", day.day, day.count);
            }
        }
        Command::Search { term } => {
            for id in store.search(&term)? {
                match store.fetch_link(id)? {
                    Some(link) => println!("{id}\t{}", link.url),
                    None => println!("{id}"),
                }
            }
        }
        Command::List { order, filter } => {
            for link in store.fetch_links(order, filter.into())? {
                let title = link.og_title.as_deref().unwrap_or("-");
                let tags = link
                    .tags
                    .iter()
                    .map(|tag| tag.name.as_str())
                    .collect::<Vec<_>>()
                    .join(",");
                println!("{}\t{}\t{}\t{}", link.id, link.url, title, tags);
            }
        }
        Command::Tags => {
            for tag in store.fetch_tags()? {
                println!("{}\t{}", tag.name, store.tag_links_count(tag.id)?);
            }
        }
        Command::Groups => {
            for group in store.fetch_groups()? {
                println!("{}\t{}", group.name, store.group_links_count(group.id)?);
            }
        }
        Command::Version => {
            println!("linkshelf_core version={}", core_version());
            println!("schema version={}", store.schema_version()?);
        }
    }
    Ok(())
}
