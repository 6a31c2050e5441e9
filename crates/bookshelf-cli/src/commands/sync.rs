//! Sync and test-connection commands - publish the status report.

use chrono::Local;
use colored::Colorize;

use bookshelf::NotificationRelay;

use super::{runtime, CommandResult, Context};

pub fn run(ctx: &Context, dry_run: bool) -> CommandResult {
    let rt = runtime()?;
    let shelf = ctx.shelf(&rt)?;
    let summary = shelf.summary();

    if dry_run {
        println!("{}", summary.to_markdown(Local::now().naive_local()));
        return Ok(());
    }

    let relay = NotificationRelay::http(ctx.settings.relay_config())?;
    println!(
        "{} report for {} books ({} unreturned)",
        "Publishing".cyan().bold(),
        summary.total.to_string().white().bold(),
        summary.unreturned_count()
    );

    match rt.block_on(shelf.sync_report(&relay))? {
        Some(response) if response.success => {
            println!(
                "{} {}",
                "Synced:".green().bold(),
                response.message.unwrap_or_else(|| "wiki page updated".to_string())
            );
            Ok(())
        }
        Some(response) => Err(format!(
            "Backend rejected the report: {}",
            response.message.unwrap_or_else(|| "no message".to_string())
        )
        .into()),
        None => {
            println!(
                "{} wiki_id and page_id are not set; nothing was sent.",
                "Warning:".yellow().bold()
            );
            println!(
                "Run {} and {} first.",
                "bookshelf config set wiki_id <ID>".cyan(),
                "bookshelf config set page_id <ID>".cyan()
            );
            Ok(())
        }
    }
}

pub fn test_connection(ctx: &Context) -> CommandResult {
    let rt = runtime()?;
    let relay = NotificationRelay::http(ctx.settings.relay_config())?;
    let report = rt.block_on(relay.test_connection());

    if report.success {
        println!("{} {}", "Connected:".green().bold(), report.message);
        if let Some(data) = report.data {
            println!("{}", serde_json::to_string_pretty(&data)?);
        }
        Ok(())
    } else {
        Err(report.message.into())
    }
}
