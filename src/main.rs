use std::sync::Arc;

use anyhow::Result;

mod app;
mod attachment;
mod backend;
mod chat;
mod config;
mod handler;
mod notify;
mod session;
mod tui;
mod ui;

use app::App;
use backend::OllamaClient;
use config::Config;
use session::ChatSession;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load().unwrap_or_else(|_| Config::new());
    let endpoint = config.resolved_endpoint();
    let model = config.resolved_model();

    let backend = Arc::new(OllamaClient::new(&endpoint, &model));
    let mut app = App::new(ChatSession::new(backend), model);

    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let result = run(&mut terminal, &mut app).await;
    tui::restore()?;

    result
}

async fn run(terminal: &mut tui::Tui, app: &mut App) -> Result<()> {
    let mut events = tui::EventHandler::new();

    while !app.should_quit {
        terminal.draw(|frame| ui::render(app, frame))?;

        if let Some(event) = events.next().await {
            handler::handle_event(app, event).await?;
        }

        // Fold a settled reply into the transcript as soon as a tick (or any
        // other event) lets the loop come back around.
        if app.session.reply_ready() {
            app.finish_send().await;
        }
    }

    Ok(())
}
