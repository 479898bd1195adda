mod dispatch;
mod render;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::dispatch::{classify_failure, run_cli, FailureKind};

#[derive(Parser, Debug)]
#[command(name = "systemd-boot-lifeboat")]
#[command(about = "Clone the default boot entry if it has changed", long_about = None)]
struct Cli {
    /// Number of lifeboats to keep.
    #[arg(short = 'n', long, default_value_t = 2)]
    max_lifeboats: usize,
    /// Sort key given to the default entry when it has none.
    #[arg(long, default_value = "linux")]
    default_sort_key: String,
    /// Version given to the default entry when it has none [default: running kernel release]
    #[arg(long)]
    default_version: Option<String>,
    /// Entry to use as the template for new lifeboats instead of the boot loader's default.
    #[arg(short = 'c', long)]
    default_config_path: Option<PathBuf>,
    /// Read entries from this boot partition instead of asking bootctl. Without a value the
    /// partition is located with `bootctl --print-boot-path`.
    #[arg(long, num_args = 0..=1)]
    boot_root: Option<Option<PathBuf>>,
    /// Print what would happen without copying, writing or deleting anything.
    #[arg(long)]
    dry_run: bool,
}

fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    match run_cli(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            match classify_failure(&err) {
                FailureKind::Domain => eprintln!("error: {err:#}"),
                FailureKind::Unexpected => eprintln!("error: {err:?}"),
            }
            ExitCode::from(1)
        }
    }
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .without_time()
                .with_target(false),
        )
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
}
