//! Watch command - reload, notify and sync on an interval.

use std::time::Duration;

use colored::Colorize;
use tracing::{info, warn};

use bookshelf::relay::RelayTransport;
use bookshelf::{BookAction, BookInfo, Bookshelf, NotificationRelay, Settings};

use super::{runtime, CommandResult, Context};

pub fn run(ctx: &Context, interval: Option<u64>, once: bool) -> CommandResult {
    let settings = &ctx.settings;
    if !settings.auto_sync && !once {
        return Err(format!(
            "auto_sync is off. Run {} or use --once.",
            "bookshelf config set auto_sync true".cyan()
        )
        .into());
    }

    let interval_ms = interval.unwrap_or(settings.sync_interval_ms);
    if interval_ms == 0 {
        return Err("Interval must be positive".into());
    }

    let rt = runtime()?;
    let relay = NotificationRelay::http(settings.relay_config())?;
    rt.block_on(watch(settings, &relay, interval_ms, once))
}

async fn watch<T: RelayTransport>(
    settings: &Settings,
    relay: &NotificationRelay<T>,
    interval_ms: u64,
    once: bool,
) -> CommandResult {
    let mut shelf = Bookshelf::load(settings.clone()).await?;
    sync_once(&shelf, relay).await;
    if once {
        return Ok(());
    }

    println!(
        "{} every {} (press {} to stop)",
        "Watching".cyan().bold(),
        format_interval(interval_ms).white().bold(),
        "Ctrl+C".yellow().bold()
    );

    let mut ticker = tokio::time::interval(Duration::from_millis(interval_ms));
    // The first tick completes immediately; the initial sync already ran.
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = tokio::signal::ctrl_c() => {
                println!();
                println!("{}", "Stopped.".yellow());
                return Ok(());
            }
        }

        match shelf.reload().await {
            Ok(changes) => {
                if settings.notify_on_loan {
                    notify_changes(relay, &changes).await;
                }
                sync_once(&shelf, relay).await;
            }
            Err(e) => warn!(error = %e, "Reload failed, keeping previous data"),
        }
    }
}

/// Publish the report, logging instead of failing so the loop keeps going.
async fn sync_once<T: RelayTransport>(shelf: &Bookshelf, relay: &NotificationRelay<T>) {
    if !relay.config().is_enabled() {
        info!("Relay not configured, skipping sync");
        return;
    }
    match shelf.sync_report(relay).await {
        Ok(Some(response)) => info!(success = response.success, "Synced status report"),
        Ok(None) => info!("Wiki target not configured, skipping sync"),
        Err(e) => warn!(error = %e, "Sync failed"),
    }
}

/// Send one messenger notification per circulation change. Returns the
/// number delivered.
pub async fn notify_changes<T: RelayTransport>(relay: &NotificationRelay<T>, changes: &[(BookAction, BookInfo)]) -> usize {
    let mut sent = 0;
    for (action, book) in changes {
        if relay.notify_book_action(*action, book).await {
            sent += 1;
        }
    }
    if !changes.is_empty() {
        info!(changes = changes.len(), sent, "Circulation notifications");
    }
    sent
}

fn format_interval(ms: u64) -> String {
    match ms {
        ms if ms % 3_600_000 == 0 => format!("{}h", ms / 3_600_000),
        ms if ms % 60_000 == 0 => format!("{}m", ms / 60_000),
        ms if ms % 1_000 == 0 => format!("{}s", ms / 1_000),
        ms => format!("{}ms", ms),
    }
}
