use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

use super::app::App;
use super::render::render_ui;
use crate::chain::{ProgressCallback, TurnOutcome, TurnProgress};
use crate::constants::{TURN_EVENT_BUFFER, UI_PAGE_LINES, UI_REFRESH_INTERVAL_MS, UI_SCROLL_LINES};
use crate::session::PendingTurn;
use crate::utils::ChatError;

/// Messages from a running turn back to the UI loop
pub enum TurnEvent {
    Progress(TurnProgress),
    Finished(Result<TurnOutcome, ChatError>),
}

/// Run the terminal UI
pub async fn run_ui(mut app: App) -> Result<()> {
    // Check if we have an interactive terminal
    if !crossterm::tty::IsTty::is_tty(&io::stdout()) {
        eprintln!("❌ chainchat requires an interactive terminal.");
        eprintln!("   Use --prompt for non-interactive mode");
        return Err(anyhow::anyhow!("No interactive terminal available"));
    }

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;

    let (tx, mut rx) = mpsc::channel::<TurnEvent>(TURN_EVENT_BUFFER);

    let res = run_app(&mut terminal, &mut app, tx, &mut rx).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = &res {
        tracing::error!("UI loop failed: {:?}", err);
    }

    res
}

/// Run a turn on its own task, reporting progress through `tx`
///
/// Progress is queued locally and forwarded with `send().await`, so a full
/// UI channel delays events instead of dropping them. `Finished` always comes
/// after the last progress event.
fn spawn_turn(pending: PendingTurn, tx: mpsc::Sender<TurnEvent>) {
    tokio::spawn(async move {
        let (progress_tx, mut progress_rx) = mpsc::unbounded_channel();
        let progress: ProgressCallback = Arc::new(move |event: TurnProgress| {
            let _ = progress_tx.send(event);
        });

        let turn = pending.run(Some(progress));
        tokio::pin!(turn);

        let result = loop {
            tokio::select! {
                biased;
                Some(event) = progress_rx.recv() => {
                    if tx.send(TurnEvent::Progress(event)).await.is_err() {
                        return; // UI is gone
                    }
                }
                result = &mut turn => break result,
            }
        };

        while let Ok(event) = progress_rx.try_recv() {
            if tx.send(TurnEvent::Progress(event)).await.is_err() {
                return;
            }
        }
        let _ = tx.send(TurnEvent::Finished(result)).await;
    });
}

async fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
    tx: mpsc::Sender<TurnEvent>,
    rx: &mut mpsc::Receiver<TurnEvent>,
) -> Result<()> {
    loop {
        terminal.draw(|f| render_ui(f, app))?;

        if event::poll(Duration::from_millis(UI_REFRESH_INTERVAL_MS))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    handle_key(app, key, &tx);
                }
            }
        }

        // Drain turn events without blocking the redraw
        while let Ok(event) = rx.try_recv() {
            match event {
                TurnEvent::Progress(progress) => app.apply_progress(progress),
                TurnEvent::Finished(result) => app.finish_turn(result),
            }
        }

        app.tick();

        if !app.running {
            break;
        }
    }

    Ok(())
}

fn handle_key(app: &mut App, key: KeyEvent, tx: &mpsc::Sender<TurnEvent>) {
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        match key.code {
            KeyCode::Char('c') => app.quit(),
            KeyCode::Char('d') => app.toggle_mode(),
            KeyCode::Char('l') => app.reset_conversation(),
            KeyCode::Char('b') => app.toggle_sidebar(),
            _ => {}
        }
        return;
    }

    match key.code {
        KeyCode::Enter => {
            if let Some(pending) = app.submit_input() {
                spawn_turn(pending, tx.clone());
            }
        }
        KeyCode::Esc => app.input.clear(),
        KeyCode::Char(c) => app.input.push(c),
        KeyCode::Backspace => {
            app.input.pop();
        }
        KeyCode::Up => app.scroll_up(UI_SCROLL_LINES),
        KeyCode::Down => app.scroll_down(UI_SCROLL_LINES),
        KeyCode::PageUp => app.scroll_up(UI_PAGE_LINES),
        KeyCode::PageDown => app.scroll_down(UI_PAGE_LINES),
        KeyCode::End => app.scroll_offset = 0,
        _ => {}
    }
}
