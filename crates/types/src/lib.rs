//! Shared types and constants for the catris board engine.
//!
//! Everything here is plain data with no external dependencies, so it can be
//! used by the core rules, the async engine and the terminal front end alike.
//!
//! # Coordinates
//!
//! All boards share one integer world frame. Each player additionally has a
//! rotated "player frame" in which their blocks fall toward `+y`:
//!
//! - [`WorldPoint`]: position on the shared board
//! - [`PlayerPoint`]: position as seen by one player
//!
//! # Board Geometry
//!
//! | Constant | Value | Description |
//! |----------|-------|-------------|
//! | `TRADITIONAL_HEIGHT` | 20 | Rows in the traditional board |
//! | `WIDTH_PER_PLAYER` | 7 | Lane width per traditional player |
//! | `BOTTLE_INNER_WIDTH` | 9 | Widest part of one bottle |
//! | `BOTTLE_OUTER_WIDTH` | 10 | Bottle plus the wall to its right |
//! | `GAME_RADIUS` | 14 | Outer Chebyshev radius of the ring board |
//! | `MIDDLE_AREA_RADIUS` | 3 | Radius of the unplayable ring hub |
//!
//! # Examples
//!
//! ```
//! use catris_types::{PlayerAction, TopologyKind};
//!
//! assert_eq!(TopologyKind::from_str("ring"), Some(TopologyKind::Ring));
//! assert_eq!(TopologyKind::Bottle.max_players(), 3);
//! assert_eq!(PlayerAction::from_str("hardDrop"), Some(PlayerAction::HardDrop));
//! ```

/// A point in the shared world frame.
pub type WorldPoint = (i32, i32);

/// A point in one player's rotated frame, where "down" is `+y`.
pub type PlayerPoint = (i32, i32);

/// Rows in the traditional board.
pub const TRADITIONAL_HEIGHT: i32 = 20;

/// Lane width of each traditional player.
pub const WIDTH_PER_PLAYER: i32 = 7;

/// Interior width of one bottle at its widest row.
pub const BOTTLE_INNER_WIDTH: i32 = 9;

/// Bottle interior plus the separator wall on its right.
pub const BOTTLE_OUTER_WIDTH: i32 = 10;

/// Outer Chebyshev radius of the ring board (the board is `2 * R + 1` wide).
pub const GAME_RADIUS: i32 = 14;

/// Chebyshev radius of the reserved ring hub.
pub const MIDDLE_AREA_RADIUS: i32 = 3;

/// Seconds a player waits after failing to land a block.
pub const WAIT_COUNTER_START: u32 = 30;

/// Seconds before a freshly spawned bomb explodes.
pub const BOMB_TIMER_START: i32 = 15;

/// Explosion radius. Points with squared distance below `BOMB_RADIUS²` explode.
pub const BOMB_RADIUS: f32 = 3.5;

/// Height of the drill block in squares.
pub const DRILL_HEIGHT: i32 = 5;

/// Upper bound for the number of squares in one moving block.
pub const MAX_BLOCK_SQUARES: usize = 10;

/// Soft-drop gravity interval.
pub const FAST_DROP_MS: u64 = 25;

/// Duration of one flash phase (a flash has four phases).
pub const FLASH_STEP_MS: u64 = 100;

/// Drill animation frame interval.
pub const DRILL_FRAME_MS: u64 = 100;

/// Bomb timers and wait counters tick once per second.
pub const SECOND_MS: u64 = 1000;

/// Normal gravity interval in seconds after `minutes_played` minutes of play.
///
/// Starts at half a second and speeds up by 7% per minute.
///
/// ```
/// use catris_types::normal_drop_interval_secs;
///
/// assert!((normal_drop_interval_secs(0.0) - 0.5).abs() < 1e-9);
/// assert!(normal_drop_interval_secs(10.0) < normal_drop_interval_secs(1.0));
/// ```
pub fn normal_drop_interval_secs(minutes_played: f64) -> f64 {
    1.0 / (2.0 * 1.07f64.powf(minutes_played))
}

/// ANSI palette used by squares, walls and player names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum Color {
    /// Terminal default (reset).
    #[default]
    Default,
    Black,
    Red,
    Green,
    Yellow,
    Blue,
    Magenta,
    Cyan,
    White,
    /// Bright black, used as the background of landed drills.
    Gray,
}

impl Color {
    /// Colors handed out to players, in preference order.
    pub const PLAYER_COLORS: [Color; 4] = [Color::Red, Color::Green, Color::Yellow, Color::Blue];

    /// ANSI SGR code when used as foreground.
    pub fn ansi_fg(self) -> u8 {
        match self {
            Color::Default => 39,
            Color::Black => 30,
            Color::Red => 31,
            Color::Green => 32,
            Color::Yellow => 33,
            Color::Blue => 34,
            Color::Magenta => 35,
            Color::Cyan => 36,
            Color::White => 37,
            Color::Gray => 90,
        }
    }

    /// ANSI SGR code when used as background.
    pub fn ansi_bg(self) -> u8 {
        match self {
            Color::Default => 49,
            Color::Gray => 100,
            other => other.ansi_fg() + 10,
        }
    }
}

/// Foreground/background pair of one terminal cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CellStyle {
    pub fg: Color,
    pub bg: Color,
}

impl CellStyle {
    pub const fn new(fg: Color, bg: Color) -> Self {
        Self { fg, bg }
    }

    pub const fn fg(fg: Color) -> Self {
        Self {
            fg,
            bg: Color::Default,
        }
    }

    pub const fn bg(bg: Color) -> Self {
        Self {
            fg: Color::Default,
            bg,
        }
    }

    pub fn into_cell(self, ch: char) -> Cell {
        Cell { ch, style: self }
    }
}

/// A single styled character.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cell {
    pub ch: char,
    pub style: CellStyle,
}

impl Default for Cell {
    fn default() -> Self {
        Self {
            ch: ' ',
            style: CellStyle::default(),
        }
    }
}

/// One rendered line of the board.
pub type StyledRow = Vec<Cell>;

/// Append `text` to `row` using one style.
pub fn push_str(row: &mut StyledRow, text: &str, style: CellStyle) {
    row.extend(text.chars().map(|ch| Cell { ch, style }));
}

/// Plain text of a styled row, mostly for tests and logs.
pub fn row_text(row: &[Cell]) -> String {
    row.iter().map(|c| c.ch).collect()
}

/// The three board shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TopologyKind {
    /// Rectangular board, one vertical lane per player.
    Traditional,
    /// One vase-shaped bottle per player, separated by walls.
    Bottle,
    /// Square ring around a central hub, players fall toward the middle.
    Ring,
}

impl TopologyKind {
    pub const ALL: [TopologyKind; 3] = [
        TopologyKind::Traditional,
        TopologyKind::Bottle,
        TopologyKind::Ring,
    ];

    /// Parse from string (case-insensitive)
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "traditional" | "t" => Some(TopologyKind::Traditional),
            "bottle" | "b" => Some(TopologyKind::Bottle),
            "ring" | "r" => Some(TopologyKind::Ring),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TopologyKind::Traditional => "traditional",
            TopologyKind::Bottle => "bottle",
            TopologyKind::Ring => "ring",
        }
    }

    /// Human readable name shown in menus and summaries.
    pub fn display_name(&self) -> &'static str {
        match self {
            TopologyKind::Traditional => "Traditional game",
            TopologyKind::Bottle => "Bottle game",
            TopologyKind::Ring => "Ring game",
        }
    }

    pub fn max_players(&self) -> usize {
        match self {
            TopologyKind::Traditional => 4,
            TopologyKind::Bottle => 3,
            TopologyKind::Ring => 4,
        }
    }
}

/// Actions a connected player can request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerAction {
    /// Move the block one step left in the player's frame
    MoveLeft,
    /// Move the block one step right in the player's frame
    MoveRight,
    /// Rotate the block by a quarter turn
    Rotate { counter_clockwise: bool },
    /// Start soft drop (fast gravity)
    SoftDropOn,
    /// Stop soft drop
    SoftDropOff,
    /// Drop until blocked and land immediately
    HardDrop,
    /// Swap the block with the held one
    Hold,
    /// Pause or resume the whole game
    TogglePause,
    /// Turn the view upside down (ring board, single player only)
    Flip,
}

impl PlayerAction {
    /// Parse action from string
    ///
    /// ```
    /// use catris_types::PlayerAction;
    ///
    /// assert_eq!(PlayerAction::from_str("moveLeft"), Some(PlayerAction::MoveLeft));
    /// assert_eq!(
    ///     PlayerAction::from_str("rotateCcw"),
    ///     Some(PlayerAction::Rotate { counter_clockwise: true })
    /// );
    /// assert_eq!(PlayerAction::from_str("unknown"), None);
    /// ```
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "moveleft" => Some(PlayerAction::MoveLeft),
            "moveright" => Some(PlayerAction::MoveRight),
            "rotatecw" | "rotate" => Some(PlayerAction::Rotate {
                counter_clockwise: false,
            }),
            "rotateccw" => Some(PlayerAction::Rotate {
                counter_clockwise: true,
            }),
            "softdropon" | "softdrop" => Some(PlayerAction::SoftDropOn),
            "softdropoff" => Some(PlayerAction::SoftDropOff),
            "harddrop" => Some(PlayerAction::HardDrop),
            "hold" => Some(PlayerAction::Hold),
            "pause" | "togglepause" => Some(PlayerAction::TogglePause),
            "flip" => Some(PlayerAction::Flip),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PlayerAction::MoveLeft => "moveLeft",
            PlayerAction::MoveRight => "moveRight",
            PlayerAction::Rotate {
                counter_clockwise: false,
            } => "rotateCw",
            PlayerAction::Rotate {
                counter_clockwise: true,
            } => "rotateCcw",
            PlayerAction::SoftDropOn => "softDropOn",
            PlayerAction::SoftDropOff => "softDropOff",
            PlayerAction::HardDrop => "hardDrop",
            PlayerAction::Hold => "hold",
            PlayerAction::TogglePause => "pause",
            PlayerAction::Flip => "flip",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ring_geometry_constants() {
        assert_eq!(GAME_RADIUS, 14);
        assert_eq!(MIDDLE_AREA_RADIUS, 3);
        assert_eq!(BOTTLE_OUTER_WIDTH, BOTTLE_INNER_WIDTH + 1);
    }

    #[test]
    fn test_drop_interval_speeds_up() {
        let start = normal_drop_interval_secs(0.0);
        let later = normal_drop_interval_secs(1.0);
        assert!((start / later - 1.07).abs() < 1e-9);
    }

    #[test]
    fn test_ansi_codes() {
        assert_eq!(Color::Red.ansi_fg(), 31);
        assert_eq!(Color::Red.ansi_bg(), 41);
        assert_eq!(Color::White.ansi_bg(), 47);
        assert_eq!(Color::Gray.ansi_bg(), 100);
    }

    #[test]
    fn test_action_round_trip_names() {
        for action in [
            PlayerAction::MoveLeft,
            PlayerAction::MoveRight,
            PlayerAction::Rotate {
                counter_clockwise: false,
            },
            PlayerAction::Rotate {
                counter_clockwise: true,
            },
            PlayerAction::SoftDropOn,
            PlayerAction::SoftDropOff,
            PlayerAction::HardDrop,
            PlayerAction::Hold,
            PlayerAction::TogglePause,
            PlayerAction::Flip,
        ] {
            assert_eq!(PlayerAction::from_str(action.as_str()), Some(action));
        }
    }

    #[test]
    fn test_topology_parse() {
        for kind in TopologyKind::ALL {
            assert_eq!(TopologyKind::from_str(kind.as_str()), Some(kind));
        }
        assert_eq!(TopologyKind::from_str("Ring"), Some(TopologyKind::Ring));
        assert_eq!(TopologyKind::from_str("hexagon"), None);
    }
}
