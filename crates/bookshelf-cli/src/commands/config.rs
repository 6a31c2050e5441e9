//! Config commands - show and change persisted settings.

use colored::Colorize;

use bookshelf::Settings;

use super::{CommandResult, Context};

pub fn show(ctx: &Context, json_output: bool) -> CommandResult {
    let settings = &ctx.settings;

    if json_output {
        println!("{}", serde_json::to_string_pretty(settings)?);
        return Ok(());
    }

    let unset = || "(not set)".dimmed().to_string();
    let optional = |value: &Option<String>| value.clone().unwrap_or_else(unset);

    println!("{} {}", "Settings from".cyan().bold(), ctx.settings_path.display());
    println!();
    println!("{}", "Data:".yellow().bold());
    println!("  backend_url:       {}", optional(&settings.backend_url));
    println!("  loan_sheet:        {}", settings.loan_sheet);
    println!("  catalog_sheet:     {}", settings.catalog_sheet);
    println!("  data_dir:          {}", settings.data_dir.display());
    println!("  page_size:         {}", settings.page_size);
    println!();
    println!("{}", "Wiki and messenger:".yellow().bold());
    println!("  wiki_id:           {}", optional(&settings.wiki_id));
    println!("  page_id:           {}", optional(&settings.page_id));
    println!("  enable_messaging:  {}", settings.enable_messaging);
    println!("  messenger_channel: {}", optional(&settings.messenger_channel));
    println!("  notify_on_loan:    {}", settings.notify_on_loan);
    println!("  auto_sync:         {}", settings.auto_sync);
    println!("  sync_interval_ms:  {}", settings.sync_interval_ms);
    println!();
    println!("{}", "Intake form:".yellow().bold());
    println!("  form_url:          {}", settings.intake.form_url);
    println!("  add_book_url:      {}", settings.intake.add_book_url);
    println!();

    if settings.is_relay_enabled() {
        println!("Relay: {}", "configured".green());
    } else {
        println!(
            "Relay: {} (needs backend_url, wiki_id and page_id)",
            "not configured".yellow()
        );
    }
    Ok(())
}

pub fn set(ctx: &Context, key: &str, value: &str) -> CommandResult {
    // Start from the file, not the effective settings, so environment
    // overrides are never written back.
    let mut settings = Settings::load(&ctx.settings_path)?;
    settings.set(key, value)?;
    settings.save(&ctx.settings_path)?;

    println!(
        "{} {} in {}",
        "Updated".green().bold(),
        key.white().bold(),
        ctx.settings_path.display()
    );
    Ok(())
}

pub fn path(ctx: &Context) -> CommandResult {
    println!("{}", ctx.settings_path.display());
    Ok(())
}
