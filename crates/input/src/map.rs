//! Key mapping from terminal events to player actions.

use crate::types::PlayerAction;
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

/// Map keyboard input to a player action.
///
/// Terminals that report key releases turn soft drop off when the down key
/// goes up; elsewhere the engine turns it off on the next move or landing.
pub fn handle_key_event(key: KeyEvent) -> Option<PlayerAction> {
    if key.kind == KeyEventKind::Release {
        return match key.code {
            KeyCode::Down | KeyCode::Char('j' | 'J' | 's' | 'S') => Some(PlayerAction::SoftDropOff),
            _ => None,
        };
    }

    match key.code {
        // Movement
        KeyCode::Left | KeyCode::Char('a') | KeyCode::Char('A') => Some(PlayerAction::MoveLeft),
        KeyCode::Right | KeyCode::Char('d') | KeyCode::Char('D') => Some(PlayerAction::MoveRight),
        KeyCode::Down
        | KeyCode::Char('j')
        | KeyCode::Char('J')
        | KeyCode::Char('s')
        | KeyCode::Char('S') => Some(PlayerAction::SoftDropOn),

        // Rotation
        KeyCode::Up
        | KeyCode::Char('k')
        | KeyCode::Char('K')
        | KeyCode::Char('w')
        | KeyCode::Char('W') => Some(PlayerAction::Rotate {
            counter_clockwise: false,
        }),
        KeyCode::Char('z') | KeyCode::Char('Z') => Some(PlayerAction::Rotate {
            counter_clockwise: true,
        }),

        // Actions
        KeyCode::Char(' ') => Some(PlayerAction::HardDrop),
        KeyCode::Char('h') | KeyCode::Char('H') | KeyCode::Char('c') => Some(PlayerAction::Hold),
        KeyCode::Char('p') | KeyCode::Char('P') => Some(PlayerAction::TogglePause),
        KeyCode::Char('f') | KeyCode::Char('F') => Some(PlayerAction::Flip),

        _ => None,
    }
}

/// Check if key should quit the game.
pub fn should_quit(key: KeyEvent) -> bool {
    if key.kind == KeyEventKind::Release {
        return false;
    }
    matches!(key.code, KeyCode::Char('q') | KeyCode::Char('Q'))
        || (key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL))
}
