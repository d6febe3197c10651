use anyhow::Result;

mod api;
mod app;
mod config;
mod format;
mod handler;
mod logging;
mod models;
mod tui;
mod ui;

use app::App;
use config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    let log_path = logging::init()?;

    let config = Config::load().unwrap_or_else(|e| {
        log::warn!("could not read config, using defaults: {}", e);
        Config::new()
    });

    let mut app = App::new(config);
    log::info!(
        "starting chatterm against {} (log: {})",
        app.api.base_url(),
        log_path.display()
    );

    app.init_session().await;

    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let mut events = tui::Events::spawn();

    let result = run(&mut app, &mut terminal, &mut events).await;

    tui::restore()?;
    log::info!("shutting down");
    result
}

async fn run(
    app: &mut App,
    terminal: &mut tui::Tui,
    events: &mut tui::Events,
) -> Result<()> {
    while !app.should_quit {
        terminal.draw(|frame| ui::render(app, frame))?;
        if let Some(event) = events.next().await {
            handler::handle_event(app, event).await?;
        }
    }
    Ok(())
}
