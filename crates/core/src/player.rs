//! Players: orientation, spawn point and control state.

use crate::block::{BlockTemplate, MovingBlock};
use crate::types::{Color, PlayerPoint, WorldPoint};

pub type PlayerId = u64;

/// What the player is currently doing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlState {
    /// Steering a block.
    Active(MovingBlock),
    /// Counting down (seconds left) before the player's area is wiped.
    Waiting(u32),
    /// No block and no countdown. Does not keep the game alive.
    Inactive,
}

#[derive(Debug, Clone)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub color: Color,
    /// Unit vector pointing "up" in this player's view.
    pub up: (i32, i32),
    /// Where new blocks appear, just outside the playable area.
    pub spawn: WorldPoint,
    pub control: ControlState,
    pub next: BlockTemplate,
    pub held: Option<BlockTemplate>,
    /// Whether a client is currently attached to this player.
    pub connected: bool,
}

impl Player {
    pub fn new(
        id: PlayerId,
        name: &str,
        color: Color,
        up: (i32, i32),
        spawn: WorldPoint,
        next: BlockTemplate,
    ) -> Self {
        Self {
            id,
            name: name.to_string(),
            color,
            up,
            spawn,
            control: ControlState::Inactive,
            next,
            held: None,
            connected: true,
        }
    }

    pub fn world_to_player(&self, (x, y): WorldPoint) -> PlayerPoint {
        let (ux, uy) = self.up;
        (-uy * x + ux * y, -ux * x - uy * y)
    }

    pub fn player_to_world(&self, (x, y): PlayerPoint) -> WorldPoint {
        let (ux, uy) = self.up;
        (-uy * x - ux * y, ux * x - uy * y)
    }

    pub fn block(&self) -> Option<&MovingBlock> {
        match &self.control {
            ControlState::Active(block) => Some(block),
            _ => None,
        }
    }

    pub fn block_mut(&mut self) -> Option<&mut MovingBlock> {
        match &mut self.control {
            ControlState::Active(block) => Some(block),
            _ => None,
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self.control, ControlState::Active(_))
    }

    pub fn is_waiting(&self) -> bool {
        matches!(self.control, ControlState::Waiting(_))
    }

    pub fn set_fast_down(&mut self, value: bool) {
        if let Some(block) = self.block_mut() {
            block.fast_down = value;
        }
    }

    /// Name decorated with the control state, cut to `max_len` characters.
    ///
    /// Inactive players are shown as `[name]`, waiting players as
    /// `[name] 12`.
    pub fn name_string(&self, max_len: usize) -> String {
        let (prefix, suffix) = match &self.control {
            ControlState::Active(_) => (String::new(), String::new()),
            ControlState::Waiting(n) => ("[".to_string(), format!("] {}", n)),
            ControlState::Inactive => ("[".to_string(), "]".to_string()),
        };
        let decoration = prefix.chars().count() + suffix.chars().count();
        let room = max_len.saturating_sub(decoration);
        let name: String = self.name.chars().take(room).collect();
        let text = format!("{}{}{}", prefix, name, suffix);
        text.chars().take(max_len).collect()
    }

    /// Turn the view upside down, dragging the moving block along.
    pub fn flip_view(&mut self) {
        self.up = (-self.up.0, -self.up.1);
        self.spawn = (-self.spawn.0, -self.spawn.1);
        if let Some(block) = self.block_mut() {
            for sq in block.squares.iter_mut() {
                sq.x = -sq.x;
                sq.y = -sq.y;
                sq.offset_x = -sq.offset_x;
                sq.offset_y = -sq.offset_y;
            }
        }
    }
}
