//! Link commands - intake form links for existing and new books.

use colored::Colorize;

use super::{runtime, CommandResult, Context};

pub fn run(ctx: &Context, code: &str) -> CommandResult {
    let rt = runtime()?;
    let shelf = ctx.shelf(&rt)?;
    let link = shelf.intake_link(code)?;

    if ctx.verbose {
        if let Some(fields) = shelf.intake_fields(code) {
            eprintln!("{} {} / {} / {}", "Book:".cyan(), fields.code, fields.title, fields.author);
        }
    }
    println!("{}", link);
    Ok(())
}

pub fn add_book(ctx: &Context) -> CommandResult {
    println!("{}", ctx.settings.intake.add_book_link());
    Ok(())
}
