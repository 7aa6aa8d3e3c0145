mod debug_report;

use clap::Parser;
use resource_router::{MemoryLookup, RouterConfig, dispatch_verbose};
use std::io::{self, IsTerminal};
use std::path::PathBuf;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Parser)]
#[command(name = "resource-router")]
#[command(version, about = "Dispatch a request path against a route table and print the trace", long_about = None)]
struct Cli {
    /// Route table (TOML).
    #[arg(short, long)]
    config: PathBuf,

    /// Entries, categories, members and channels used to validate captures (TOML).
    #[arg(short, long)]
    fixtures: Option<PathBuf>,

    /// Force ANSI color output.
    #[arg(long, conflicts_with = "no_color")]
    color: bool,

    /// Disable ANSI color output.
    #[arg(long)]
    no_color: bool,

    /// Request path, e.g. `blog/hello-world`.
    path: String,
}

fn main() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let cli = Cli::parse();
    let color = if cli.color {
        true
    } else if cli.no_color {
        false
    } else {
        io::stdout().is_terminal()
    };

    let table = match RouterConfig::load(&cli.config).and_then(RouterConfig::into_table) {
        Ok(table) => table,
        Err(err) => {
            eprintln!("error: {}: {err}", cli.config.display());
            std::process::exit(2);
        }
    };

    let lookup = match cli.fixtures.as_deref().map(load_fixtures).transpose() {
        Ok(lookup) => lookup.unwrap_or_default(),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(2);
        }
    };

    match dispatch_verbose(&cli.path, &table, &lookup) {
        Ok(res) => debug_report::print_run(&cli.path, &res, color),
        Err(err) => {
            eprintln!("error: dispatch failed: {err}");
            std::process::exit(1);
        }
    }
}

fn load_fixtures(path: &std::path::Path) -> Result<MemoryLookup, String> {
    let source = std::fs::read_to_string(path).map_err(|err| format!("{}: {err}", path.display()))?;
    toml::from_str(&source).map_err(|err| format!("{}: {err}", path.display()))
}
