//! Core game logic for catris - pure, deterministic, and testable
//!
//! This crate holds the rules of the multiplayer falling-block game. It has
//! no notion of time, terminals or networking: the engine crate drives it
//! from timers and the terminal crate draws the rows it produces.
//!
//! # Module Structure
//!
//! - [`square`]: square contents (normal, bomb, drill, separator) and rotation
//! - [`block`]: block shapes, templates and the seeded block factory
//! - [`player`]: orientation, spawn point and control state
//! - [`board`]: landed squares, the valid-coordinate mask and flash overlay
//! - [`topology`]: Traditional, Bottle and Ring board shapes
//! - [`scoring`]: points for cleared regions
//! - [`game`]: the state machine tying it all together
//! - [`rng`]: the LCG behind reproducible games
//!
//! # Rules in short
//!
//! - Every player steers one block toward their own "down".
//! - Full regions (rows, bottle slices, ring lines, whole rings) are removed
//!   and scored for everybody.
//! - A block landing partly outside the board starts a wait countdown
//!   instead of ending the game. When it runs out the player's area is wiped.
//! - Bombs explode after 15 seconds, drills bore through landed squares.
//!
//! # Example
//!
//! ```
//! use catris_core::Game;
//! use catris_core::types::TopologyKind;
//!
//! let mut game = Game::new(TopologyKind::Traditional, 12345);
//! let alice = game.get_or_add_player("Alice").unwrap();
//!
//! game.try_move(alice, 1, 0, true, false);
//! game.move_blocks_down(false);
//! assert!(game.is_valid());
//! assert!(!game.is_over());
//! ```

pub mod block;
pub mod board;
pub mod game;
pub mod player;
pub mod rng;
pub mod scoring;
pub mod square;
pub mod summary;
pub mod topology;

pub use catris_types as types;

// Re-export commonly used types for convenience
pub use block::{BlockFactory, BlockTemplate, MovingBlock, Shape};
pub use board::Board;
pub use game::{Game, PendingClear, WaitTick, HARD_DROP_LIMIT};
pub use player::{ControlState, Player, PlayerId};
pub use rng::SimpleRng;
pub use scoring::{line_clear_score, score_for_regions};
pub use square::{Square, SquareContent};
pub use summary::GameSummary;
pub use topology::{topology_for, Region, Topology};
