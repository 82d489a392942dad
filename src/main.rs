use anyhow::Context;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use hbnb::console::Console;
use hbnb::models::KindRegistry;
use hbnb::storage::FileStore;

#[derive(Parser)]
#[command(name = "hbnb")]
#[command(about = "Line-oriented object manager for the HBnB data model")]
struct Cli {}

/// Initialize tracing with output to stderr: stdout is the interactive
/// protocol channel and must stay clean.
fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| "hbnb=info".into()),
    );

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn main() -> anyhow::Result<()> {
    let _cli = Cli::parse();
    init_tracing();

    let registry = KindRegistry::builtin();
    // A corrupt store here is fatal: there is no safe in-memory state to
    // fall back to.
    let store = FileStore::open_default(&registry).context("cannot load object store")?;
    tracing::debug!(path = %store.path().display(), "store ready");

    let stdin = std::io::stdin();
    let stdout = std::io::stdout();
    let mut console = Console::new(registry, store);
    console.run(stdin.lock(), stdout.lock())?;

    Ok(())
}
