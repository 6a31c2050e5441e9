//! Serve command - run the JSON API.

use colored::Colorize;

use bookshelf::NotificationRelay;

use crate::server::{app, state::AppState};

use super::{runtime, CommandResult, Context};

pub fn run(ctx: &Context, port: u16) -> CommandResult {
    let rt = runtime()?;
    let shelf = ctx.shelf(&rt)?;
    let relay = NotificationRelay::http(ctx.settings.relay_config())?;
    let state = AppState::new(shelf, relay);

    let url = format!("http://localhost:{}/api", port);
    println!();
    println!(
        "{} {}",
        "Serving library API at".cyan().bold(),
        url.white().bold()
    );
    println!();
    println!("  Data: {}", ctx.settings.data_dir.display());
    if let Some(backend) = &ctx.settings.backend_url {
        println!("  Backend: {}", backend);
    }
    println!();
    println!("Press {} to stop the server", "Ctrl+C".yellow().bold());
    println!();

    rt.block_on(app::run_server(state, port))
}
