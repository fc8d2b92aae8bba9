//! Web service scaffold.
//!
//! # Architecture Overview
//!
//! ```text
//!   main ──▶ Orchestrator::run
//!               │
//!               ├─ 1. ConfigStore::load ───────── conf/config.yaml (+ hot reload watch)
//!               ├─ 2. logging::init ──────────── tracing subscriber
//!               ├─ 3. CacheConnector::open ───── redis
//!               ├─ 4. net::serve ─────────────── axum on a background task
//!               ├─ 5. await SIGINT/SIGTERM or listener failure
//!               ├─ 6. drain (grace period)
//!               └─ 7. close cache → flush logs
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use web_app::lifecycle::signals;
use web_app::{Orchestrator, Shutdown};

/// Web service with ordered startup and graceful shutdown
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file (.yaml, .yml or .toml)
    #[arg(short, long, value_name = "FILE", default_value = "conf/config.yaml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let shutdown = Shutdown::new();
    signals::forward_to(shutdown.clone());

    match Orchestrator::new(args.config).run(shutdown).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            // No log sink existed yet for these
            if !e.is_logged() {
                eprintln!("{e}");
            }
            ExitCode::from(e.exit_code())
        }
    }
}
