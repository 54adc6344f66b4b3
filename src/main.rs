use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use prettytable::{Table, row};
use tracing_subscriber::EnvFilter;

use pagestore::file::inspect;
use pagestore::{
    DEFAULT_PAGE_SIZE, FileResult, MemoryPageFile, PageFileConfig, PageFileStatistics,
    PageId, PersistentPageFile, RawPage, StoreSummary,
};

#[derive(Parser)]
#[command(name = "pagestore", version, about = "Inspect and exercise page files")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the header and slot usage of a page file
    Inspect {
        path: PathBuf,
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Create an empty page file
    Create {
        path: PathBuf,
        #[arg(long, default_value_t = DEFAULT_PAGE_SIZE)]
        page_size: usize,
    },
    /// Run a fixed workload on an in-memory page file and report its I/O
    Simulate {
        #[arg(long, default_value_t = 1000)]
        pages: u64,
        #[arg(long, default_value_t = DEFAULT_PAGE_SIZE)]
        page_size: usize,
        #[arg(long, default_value_t = 64)]
        cache_pages: usize,
        #[arg(long, default_value_t = 3)]
        rounds: u64,
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {}", err);
            ExitCode::FAILURE
        }
    }
}

fn run(command: Command) -> FileResult<()> {
    match command {
        Command::Inspect { path, json } => {
            let summary = inspect(&path)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                print_summary(&summary);
            }
        }
        Command::Create { path, page_size } => {
            if path.exists() {
                return Err(io::Error::new(
                    io::ErrorKind::AlreadyExists,
                    format!("{} already exists", path.display()),
                )
                .into());
            }
            let config = PageFileConfig::with_cache_pages(page_size, 1);
            PersistentPageFile::<RawPage>::open(&path, &config)?.close()?;
        }
        Command::Simulate {
            pages,
            page_size,
            cache_pages,
            rounds,
            json,
        } => {
            let config = PageFileConfig::with_cache_pages(page_size, cache_pages);
            let stats = simulate(&config, pages, rounds)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&stats)?);
            } else {
                print_statistics(&config, &stats);
            }
        }
    }
    Ok(())
}

/// Write `pages` pages, then read them back in a scattered order for
/// `rounds` rounds, deleting and rewriting every tenth page read.
fn simulate(config: &PageFileConfig, pages: u64, rounds: u64) -> FileResult<PageFileStatistics> {
    let mut file = MemoryPageFile::<RawPage>::new(config)?;
    for i in 0..pages {
        file.write_page(RawPage::new(format!("page {}", i)))?;
    }

    for round in 0..rounds {
        for i in 0..pages {
            let id = (i * 7919 + round * 31) % pages;
            if file.read_page(id)?.is_some() && id % 10 == 0 {
                file.delete_page(id)?;
                file.write_page(RawPage::new(format!("page {} round {}", id, round)))?;
            }
        }
    }

    let stats = file.statistics();
    file.close()?;
    Ok(stats)
}

fn print_summary(summary: &StoreSummary) {
    let mut table = Table::new();
    table.add_row(row!["File", summary.path]);
    table.add_row(row!["File length", summary.file_length]);
    table.add_row(row!["Header size", summary.header_size]);
    table.add_row(row!["Page size", summary.page_size]);
    table.add_row(row!["Slots", summary.slot_count]);
    table.add_row(row!["Filled", summary.filled]);
    table.add_row(row!["Empty", summary.empty]);
    table.add_row(row!["Free ids", format_ids(&summary.free_ids)]);
    table.printstd();
}

fn format_ids(ids: &[PageId]) -> String {
    ids.iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

fn print_statistics(config: &PageFileConfig, stats: &PageFileStatistics) {
    let mut table = Table::new();
    table.add_row(row!["Page size", config.page_size]);
    table.add_row(row!["Cache size", config.cache_size]);
    table.add_row(row!["Read I/O-Access", stats.physical_reads]);
    table.add_row(row!["Write I/O-Access", stats.physical_writes]);
    table.add_row(row!["Logical Page-Access", stats.logical_accesses]);
    table.add_row(row!["Hit ratio", format!("{:.3}", stats.hit_ratio())]);
    table.printstd();
}
