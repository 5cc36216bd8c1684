//! PlayView: lays a game out in a terminal framebuffer.
//!
//! The board comes pre-rendered from the game; this module only places it
//! next to a side panel with the score, the next block and the held block.
//! It is pure (no I/O).

use crate::core::{Game, PlayerId};
use crate::fb::FrameBuffer;
use crate::types::{CellStyle, Color, StyledRow, TopologyKind};

/// Terminal viewport dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: u16,
    pub height: u16,
}

impl Viewport {
    pub fn new(width: u16, height: u16) -> Self {
        Self { width, height }
    }
}

/// Everything one player sees, copied out of the game in one lock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaySnapshot {
    pub kind: TopologyKind,
    pub board: Vec<StyledRow>,
    pub next: Vec<StyledRow>,
    pub held: Vec<StyledRow>,
    pub score: u64,
    pub paused: bool,
    pub game_over: bool,
}

impl PlaySnapshot {
    pub fn capture(game: &Game, viewer: PlayerId, paused: bool) -> Self {
        Self {
            kind: game.kind(),
            board: game.renderable_lines(viewer),
            next: game.next_preview(viewer),
            held: game.held_preview(viewer),
            score: game.score(),
            paused,
            game_over: game.is_over(),
        }
    }
}

const SCORE_STYLE: CellStyle = CellStyle::fg(Color::Cyan);
const PANEL_GAP: u16 = 3;
const NEXT_Y: u16 = 3;
const HOLD_Y: u16 = 10;

#[derive(Debug, Clone, Copy, Default)]
pub struct PlayView;

impl PlayView {
    /// Render into an existing framebuffer, resizing it to the viewport.
    pub fn render_into(&self, snap: &PlaySnapshot, viewport: Viewport, fb: &mut FrameBuffer) {
        fb.resize(viewport.width, viewport.height);
        fb.clear();

        let board_w = snap.board.iter().map(|row| row.len()).max().unwrap_or(0);
        let board_w = u16::try_from(board_w).unwrap_or(u16::MAX);
        for (y, row) in snap.board.iter().enumerate() {
            let Ok(y) = u16::try_from(y) else {
                break;
            };
            fb.put_cells(0, y, row);
        }

        let x = board_w.saturating_add(PANEL_GAP);
        fb.put_str(x, 0, snap.kind.display_name(), CellStyle::default());
        fb.put_str(x, 1, &format!("Score: {}", snap.score), SCORE_STYLE);

        draw_preview(fb, x, NEXT_Y, "Next:", &snap.next);
        if snap.held.is_empty() {
            fb.put_str(x, HOLD_Y, "Nothing in hold", CellStyle::default());
            fb.put_str(x, HOLD_Y + 1, "   (press h)", CellStyle::default());
        } else {
            draw_preview(fb, x, HOLD_Y, "Holding:", &snap.held);
        }

        let status = if snap.game_over {
            Some("GAME OVER (r: restart, q: quit)")
        } else if snap.paused {
            Some("Game paused, press p to continue")
        } else {
            None
        };
        if let Some(text) = status {
            fb.put_str(x, HOLD_Y + 7, text, CellStyle::fg(Color::Yellow));
        }
        if snap.kind == TopologyKind::Ring {
            fb.put_str(x, HOLD_Y + 9, "f: flip the view", CellStyle::default());
        }
    }

    /// Convenience helper that allocates a new framebuffer.
    pub fn render(&self, snap: &PlaySnapshot, viewport: Viewport) -> FrameBuffer {
        let mut fb = FrameBuffer::new(viewport.width, viewport.height);
        self.render_into(snap, viewport, &mut fb);
        fb
    }
}

/// Label on one line, the block indented below it.
fn draw_preview(fb: &mut FrameBuffer, x: u16, y: u16, label: &str, rows: &[StyledRow]) {
    fb.put_str(x, y, label, CellStyle::default());
    for (dy, row) in rows.iter().enumerate() {
        let Ok(dy) = u16::try_from(dy) else {
            break;
        };
        fb.put_cells(x + 2, y + 2 + dy, row);
    }
}
