use std::process::exit;

use tokio_util::sync::CancellationToken;
use tracing::{error, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use gitprov::cli::{self, Cli};

#[tokio::main]
async fn main() {
    let cli = Cli::parse_args();

    let layer = fmt::layer().compact().with_writer(std::io::stderr);
    let filter = if cli.debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::registry().with(layer).with(filter).init();

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupted, cancelling");
            on_interrupt.cancel();
        }
    });

    if let Err(error) = cli::run(cli, cancel).await {
        error!("{error:?}");
        exit(1);
    }
}
