use std::time::Duration;

use anyhow::Result;
use tokio::sync::mpsc;

mod app;
mod chat;
mod config;
mod handler;
mod logging;
mod markdown;
mod theme;
mod toast;
mod tui;
mod ui;
mod util;

use app::App;
use config::Config;
use tui::{AppEvent, EventHandler};
use util::Debouncer;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load().unwrap_or_else(|_| Config::new());
    logging::init()?;
    tracing::info!(server = %config.server_url(), "starting netrouter dashboard");

    tui::install_panic_hook();
    let mut terminal = tui::init()?;

    let result = run(&mut terminal, config).await;

    tui::restore()?;
    result
}

async fn run(terminal: &mut tui::Tui, config: Config) -> Result<()> {
    let mut app = App::new(&config);
    app.start_dashboard_fetch();

    let mut events = EventHandler::new();

    // Resize storms collapse into one stats refresh
    let (refresh_tx, mut refresh_rx) = mpsc::unbounded_channel();
    let mut refresh = Debouncer::new(Duration::from_millis(250), refresh_tx);

    while !app.should_quit {
        terminal.draw(|frame| ui::render(&mut app, frame))?;

        tokio::select! {
            Some(event) = events.next() => {
                if let AppEvent::Resize(_, _) = event {
                    refresh.call(());
                }
                handler::handle_event(&mut app, event)?;
            }
            Some(()) = refresh_rx.recv() => {
                app.refresh_stats();
            }
        }

        app.poll_tasks().await;
    }

    Ok(())
}
