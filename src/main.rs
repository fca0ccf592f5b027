use anyhow::Result;

mod app;
mod backend;
mod config;
mod handler;
mod markdown;
mod session;
mod store;
mod tui;
mod ui;

use app::App;
use backend::BackendClient;
use config::Config;
use session::ChatSession;
use store::FileStore;
use tui::{EventHandler, Tui};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load().unwrap_or_else(|_| Config::new());

    let store = FileStore::open()?;
    let session = ChatSession::new(Box::new(store));
    let backend = BackendClient::new(&config.backend_url());
    let mut app = App::new(session, backend);

    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let mut events = EventHandler::new(config.typing_delay());

    let result = run(&mut terminal, &mut app, &mut events).await;

    tui::restore()?;
    result
}

async fn run(terminal: &mut Tui, app: &mut App, events: &mut EventHandler) -> Result<()> {
    while !app.should_quit {
        terminal.draw(|frame| ui::render(app, frame))?;

        // The typing timer fires often enough that a finished backend call
        // is picked up promptly here.
        app.poll_reply().await;

        match events.next().await {
            Some(event) => handler::handle_event(app, event)?,
            None => break,
        }
    }
    Ok(())
}
