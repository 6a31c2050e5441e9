//! History command - every loan log entry for one book.

use colored::Colorize;

use bookshelf::LoanState;

use super::{runtime, CommandResult, Context};

pub fn run(ctx: &Context, code: &str, json_output: bool) -> CommandResult {
    let rt = runtime()?;
    let shelf = ctx.shelf(&rt)?;
    let history = shelf.history(code)?;

    if json_output {
        let output = serde_json::json!({
            "code": code.trim(),
            "book": shelf.intake_fields(code),
            "history": history,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    match shelf.intake_fields(code) {
        Some(book) if !book.title.is_empty() => println!(
            "{} {} ({})",
            "Loan history for".cyan().bold(),
            book.title.white().bold(),
            book.code
        ),
        _ => println!("{} {}", "Loan history for".cyan().bold(), code.trim().white().bold()),
    }
    println!();

    if history.is_empty() {
        println!("No loan log entries for this code.");
        return Ok(());
    }

    for entry in &history {
        let status = match entry.status.state {
            LoanState::Overdue { .. } => entry.status.display.red(),
            LoanState::OnLoan { .. } => entry.status.display.yellow(),
            LoanState::Returned => entry.status.display.green(),
            LoanState::Unknown => entry.status.display.normal(),
        };
        println!("  {:<20} {:<12} {}", entry.date, entry.borrower, status);
    }
    println!();
    println!("{} entries", history.len().to_string().white().bold());

    Ok(())
}
