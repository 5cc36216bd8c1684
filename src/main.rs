//! Terminal catris runner (default binary).
//!
//! Joins (or starts) a game of the topology named by `CATRIS_MODE` and plays
//! it in the terminal. Input is read on a plain thread and handed to the
//! async side over a channel; the screen is redrawn whenever the game
//! reports a change.

use std::env;
use std::thread;
use std::time::Duration;

use anyhow::Result;
use crossterm::event::{self, Event, KeyCode};
use tokio::sync::mpsc;

use catris::core::PlayerId;
use catris::engine::{EngineConfig, GameHandle, GameRegistry, InputEvent};
use catris::input::{handle_key_event, should_quit};
use catris::term::{FrameBuffer, PlaySnapshot, PlayView, TerminalRenderer, Viewport};
use catris::types::TopologyKind;

const POLL_INTERVAL: Duration = Duration::from_millis(50);

#[tokio::main]
async fn main() -> Result<()> {
    let kind = env::var("CATRIS_MODE")
        .ok()
        .and_then(|mode| TopologyKind::from_str(&mode))
        .unwrap_or(TopologyKind::Traditional);
    let name = env::var("CATRIS_NAME")
        .or_else(|_| env::var("USER"))
        .unwrap_or_else(|_| "player".to_string());

    let registry = GameRegistry::new(EngineConfig::from_env());
    let (game, me) = registry.join(kind, &name).await?;

    let mut term = TerminalRenderer::new();
    term.enter()?;

    let result = run(&mut term, &game, me).await;

    // Always try to restore terminal state.
    let _ = term.exit();

    let summary = game.summary();
    game.leave(me).await;
    game.shutdown();
    println!(
        "{} by {}: {} points in {}s",
        kind.display_name(),
        summary.players_label(),
        summary.score,
        summary.duration_secs
    );
    result
}

async fn run(term: &mut TerminalRenderer, game: &GameHandle, me: PlayerId) -> Result<()> {
    let (tx, mut rx) = mpsc::unbounded_channel();
    thread::spawn(move || read_terminal_events(tx));

    let mut changes = game.subscribe();
    let view = PlayView;
    let mut fb = FrameBuffer::new(0, 0);

    loop {
        changes.borrow_and_update();
        draw(term, game, me, &view, &mut fb)?;

        tokio::select! {
            changed = changes.changed() => {
                if changed.is_err() {
                    return Ok(());
                }
            }
            event = rx.recv() => match event {
                None => return Ok(()),
                Some(Event::Key(key)) => {
                    if should_quit(key) {
                        return Ok(());
                    }
                    if game.is_over() {
                        if matches!(key.code, KeyCode::Char('r') | KeyCode::Char('R')) {
                            game.restart().await;
                        }
                        continue;
                    }
                    if let Some(action) = handle_key_event(key) {
                        game.apply(InputEvent { player: me, action }).await;
                    }
                }
                Some(Event::Resize(..)) => term.invalidate(),
                Some(_) => {}
            }
        }
    }
}

fn draw(
    term: &mut TerminalRenderer,
    game: &GameHandle,
    me: PlayerId,
    view: &PlayView,
    fb: &mut FrameBuffer,
) -> Result<()> {
    let (w, h) = crossterm::terminal::size().unwrap_or((80, 24));
    let paused = game.clock().is_paused();
    let snap = game.read(|g| PlaySnapshot::capture(g, me, paused));
    view.render_into(&snap, Viewport::new(w, h), fb);
    term.draw_swap(fb)
}

/// Blocking crossterm reader. Stops once the receiver is gone.
fn read_terminal_events(tx: mpsc::UnboundedSender<Event>) {
    loop {
        if tx.is_closed() {
            return;
        }
        match event::poll(POLL_INTERVAL) {
            Ok(false) => continue,
            Ok(true) => {}
            Err(_) => return,
        }
        let Ok(event) = event::read() else {
            return;
        };
        if tx.send(event).is_err() {
            return;
        }
    }
}
