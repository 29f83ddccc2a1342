//! Upload Queue CLI
//!
//! Queues the files named on the command line and uploads them one by one.
//!
//! ```text
//! upload-queue [--bulk] <path | ftp://path>...
//! ```

use std::path::Path;

use anyhow::{bail, Context};
use tokio::signal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use upload_queue::{Collaborators, Config, OptionsUpdate, UploadItem, UploadQueue};

const FTP_PREFIX: &str = "ftp://";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "upload_queue=info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    dotenvy::dotenv().ok();

    let config = Config::from_env().context("Failed to load configuration")?;

    let mut bulk = config.upload.bulk;
    let mut targets = Vec::new();
    for arg in std::env::args().skip(1) {
        if arg == "--bulk" {
            bulk = true;
        } else {
            targets.push(arg);
        }
    }
    if targets.is_empty() {
        bail!("usage: upload-queue [--bulk] <path | ftp://path>...");
    }

    let history_id = config
        .upload
        .history_id
        .clone()
        .context("UPLOAD_HISTORY_ID is not set")?;

    tracing::info!("Starting upload-queue v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Application root: {}", config.server.app_root);

    let collaborators = Collaborators::http(&config).context("Failed to build HTTP client")?;
    let queue = UploadQueue::new(
        collaborators,
        OptionsUpdate::new()
            .history_id(history_id)
            .on_announce(|index, item| {
                tracing::info!(index = %index, name = %item.name, size = item.size, "Queued");
            })
            .on_progress(|index, pct| {
                tracing::debug!(index = %index, "{:.0}%", pct);
            })
            .on_success(|index, _| {
                tracing::info!(index = %index, "Uploaded");
            })
            .on_warning(|index, message| {
                tracing::warn!(index = %index, "{}", message);
            })
            .on_error(|index, message| {
                tracing::error!(index = %index, "{}", message);
            }),
    );

    let mut items = Vec::with_capacity(targets.len());
    for target in &targets {
        items.push(item_for(target).await?);
    }
    queue.add(items);

    let run = queue.start(bulk);
    tokio::pin!(run);

    let interrupted = tokio::select! {
        _ = &mut run => false,
        _ = shutdown_signal() => true,
    };
    if interrupted {
        queue.stop();
        run.await;
    }

    let remaining = queue.size();
    if remaining > 0 {
        tracing::info!(remaining, "Stopped with uploads still queued");
    }

    Ok(())
}

/// Item for one command-line target
async fn item_for(target: &str) -> anyhow::Result<UploadItem> {
    if let Some(ftp_path) = target.strip_prefix(FTP_PREFIX) {
        let name = ftp_path.rsplit('/').next().unwrap_or(ftp_path);
        return Ok(UploadItem::ftp(name, 0, ftp_path));
    }

    let path = Path::new(target);
    let metadata = tokio::fs::metadata(path)
        .await
        .with_context(|| format!("Cannot read {}", target))?;
    if !metadata.is_file() {
        bail!("{} is not a file", target);
    }

    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| target.to_string());

    Ok(UploadItem::local(name, metadata.len(), path))
}

/// Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, finishing current upload...");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, finishing current upload...");
        },
    }
}
