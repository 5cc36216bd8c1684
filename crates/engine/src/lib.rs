//! Async orchestration of catris games on tokio.
//!
//! [`GameHandle`] wraps a [`catris_core::Game`] behind the game lock and the
//! flashing lock and runs its background tasks: normal and fast gravity,
//! bomb timers, the drill animation and one countdown per waiting player.
//! All of them sleep on a [`PauseClock`], so pausing freezes the game
//! without losing partial waits.
//!
//! ```no_run
//! use catris_engine::{EngineConfig, GameRegistry, InputEvent};
//! use catris_engine::types::{PlayerAction, TopologyKind};
//!
//! # async fn run() -> Result<(), catris_engine::JoinError> {
//! let registry = GameRegistry::new(EngineConfig::from_env());
//! let (game, me) = registry.join(TopologyKind::Ring, "Alice").await?;
//! let mut changes = game.subscribe();
//!
//! game.apply(InputEvent { player: me, action: PlayerAction::MoveLeft }).await;
//! while changes.changed().await.is_ok() && !game.is_over() {
//!     let _rows = game.renderable_lines(me);
//! }
//! # Ok(())
//! # }
//! ```

pub mod clock;
pub mod config;
pub mod error;
pub mod handle;
pub mod registry;
mod tasks;

pub use catris_core::types;

pub use clock::{PausableTimer, PauseClock};
pub use config::EngineConfig;
pub use error::JoinError;
pub use handle::{GameHandle, InputEvent};
pub use registry::GameRegistry;
