//! Shared handle to one running game.
//!
//! Two locks guard a game. The game lock (`std::sync::Mutex`) is taken for
//! every read and mutation and is never held across an `.await`. The
//! flashing lock (`tokio::sync::Mutex`) is held for a whole flash-then-remove
//! sequence, so gravity cannot move blocks into the rows being removed while
//! they flash.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use catris_core::types::{Color, PlayerAction, StyledRow, TopologyKind, WorldPoint};
use catris_core::{Game, GameSummary, PlayerId};

use crate::clock::PauseClock;
use crate::config::EngineConfig;
use crate::error::JoinError;
use crate::tasks;

/// One player's request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputEvent {
    pub player: PlayerId,
    pub action: PlayerAction,
}

pub(crate) struct Shared {
    game: Mutex<Game>,
    flashing: tokio::sync::Mutex<()>,
    pub(crate) clock: Arc<PauseClock>,
    pub(crate) config: EngineConfig,
    changed: watch::Sender<u64>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
    finished: AtomicBool,
}

impl Drop for Shared {
    fn drop(&mut self) {
        let tasks = self.tasks.get_mut().unwrap_or_else(PoisonError::into_inner);
        for task in tasks.drain(..) {
            task.abort();
        }
    }
}

/// Cheap to clone; all clones control the same game.
#[derive(Clone)]
pub struct GameHandle {
    shared: Arc<Shared>,
}

impl std::fmt::Debug for GameHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GameHandle")
            .field("game", &*self.lock_game())
            .field("paused", &self.shared.clock.is_paused())
            .finish()
    }
}

impl GameHandle {
    /// Wrap a game. Background tasks do not run until [`GameHandle::start`].
    pub fn new(mut game: Game, config: EngineConfig) -> Self {
        game.set_wait_counter_start(config.wait_seconds);
        let (changed, _) = watch::channel(0);
        Self {
            shared: Arc::new(Shared {
                game: Mutex::new(game),
                flashing: tokio::sync::Mutex::new(()),
                clock: Arc::new(PauseClock::new()),
                config,
                changed,
                tasks: Mutex::new(Vec::new()),
                finished: AtomicBool::new(false),
            }),
        }
    }

    /// Spawn gravity, bomb, drill and countdown tasks on the current runtime.
    pub fn start(&self) {
        self.shared.clock.reset();
        for task in tasks::spawn_all(self) {
            self.track(task);
        }
        debug!(kind = self.kind().as_str(), "game tasks started");
    }

    pub(crate) fn from_shared(shared: Arc<Shared>) -> Self {
        Self { shared }
    }

    pub(crate) fn downgrade(&self) -> Weak<Shared> {
        Arc::downgrade(&self.shared)
    }

    pub(crate) fn clock_arc(&self) -> Arc<PauseClock> {
        self.shared.clock.clone()
    }

    pub(crate) fn config(&self) -> &EngineConfig {
        &self.shared.config
    }

    pub(crate) fn track(&self, task: JoinHandle<()>) {
        let mut tasks = self
            .shared
            .tasks
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        tasks.retain(|t| !t.is_finished());
        tasks.push(task);
    }

    fn stop_tasks(&self) {
        let tasks: Vec<_> = self
            .shared
            .tasks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain(..)
            .collect();
        for task in tasks {
            task.abort();
        }
    }

    pub fn ptr_eq(&self, other: &GameHandle) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared)
    }

    fn lock_game(&self) -> MutexGuard<'_, Game> {
        self.shared
            .game
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Look at the game under the game lock.
    pub fn read<R>(&self, f: impl FnOnce(&Game) -> R) -> R {
        f(&self.lock_game())
    }

    /// Change the game under the game lock, then notify subscribers and stop
    /// the background tasks if the game ended.
    pub fn mutate<R>(&self, f: impl FnOnce(&mut Game) -> R) -> R {
        let (result, changed, over, score) = {
            let mut game = self.lock_game();
            let result = f(&mut game);
            (result, game.take_changed(), game.is_over(), game.score())
        };
        if changed {
            self.notify();
        }
        if over && !self.shared.finished.swap(true, Ordering::SeqCst) {
            info!(kind = self.kind().as_str(), score, "game over");
            self.notify();
            self.stop_tasks();
        }
        result
    }

    /// Wake every subscriber. Wake-ups between renders coalesce.
    pub fn notify(&self) {
        self.shared.changed.send_modify(|generation| *generation += 1);
    }

    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.shared.changed.subscribe()
    }

    pub fn clock(&self) -> &PauseClock {
        &self.shared.clock
    }

    pub fn kind(&self) -> TopologyKind {
        self.read(Game::kind)
    }

    pub fn is_over(&self) -> bool {
        self.shared.finished.load(Ordering::SeqCst) || self.read(Game::is_over)
    }

    pub fn score(&self) -> u64 {
        self.read(Game::score)
    }

    pub fn summary(&self) -> GameSummary {
        let played = self.shared.clock.played().as_secs();
        self.read(|game| game.summary(played))
    }

    pub fn renderable_lines(&self, viewer: PlayerId) -> Vec<StyledRow> {
        self.read(|game| game.renderable_lines(viewer))
    }

    pub fn next_preview(&self, viewer: PlayerId) -> Vec<StyledRow> {
        self.read(|game| game.next_preview(viewer))
    }

    pub fn held_preview(&self, viewer: PlayerId) -> Vec<StyledRow> {
        self.read(|game| game.held_preview(viewer))
    }

    /// Add a player, or reconnect one with the same name.
    pub async fn join(&self, name: &str) -> Result<PlayerId, JoinError> {
        if self.shared.finished.load(Ordering::SeqCst) {
            return Err(JoinError::GameOver);
        }
        let _flashing = self.shared.flashing.lock().await;
        self.mutate(|game| {
            if !game.can_join(name) {
                return Err(JoinError::GameFull);
            }
            game.get_or_add_player(name).ok_or(JoinError::GameFull)
        })
    }

    pub async fn leave(&self, player: PlayerId) -> bool {
        let _flashing = self.shared.flashing.lock().await;
        self.mutate(|game| game.remove_player(player))
    }

    /// The player's input went away. Their seat stays.
    pub fn disconnect(&self, player: PlayerId) -> bool {
        self.mutate(|game| game.set_connected(player, false))
    }

    /// Apply one input event. Returns whether it did anything.
    pub async fn apply(&self, event: InputEvent) -> bool {
        let InputEvent { player, action } = event;
        if action == PlayerAction::TogglePause {
            let paused = self.shared.clock.toggle();
            debug!(paused, "pause toggled");
            self.notify();
            return true;
        }
        if self.shared.clock.is_paused() {
            return false;
        }

        match action {
            PlayerAction::MoveLeft | PlayerAction::MoveRight => {
                let dx = if action == PlayerAction::MoveLeft { -1 } else { 1 };
                self.mutate(|game| {
                    game.set_fast_down(player, false);
                    game.try_move(player, dx, 0, true, false)
                })
            }
            PlayerAction::Rotate { counter_clockwise } => self.mutate(|game| {
                game.set_fast_down(player, false);
                game.rotate(player, counter_clockwise)
            }),
            PlayerAction::SoftDropOn => self.mutate(|game| game.set_fast_down(player, true)),
            PlayerAction::SoftDropOff => self.mutate(|game| game.set_fast_down(player, false)),
            PlayerAction::Hold => self.mutate(|game| game.hold(player)),
            PlayerAction::Flip => self.mutate(|game| game.flip(player)),
            PlayerAction::HardDrop => self.drop_and_clear(|game| game.hard_drop(player)).await,
            PlayerAction::TogglePause => false,
        }
    }

    /// Run a landing step and clear whatever became full, flashing it first.
    pub(crate) async fn drop_and_clear<R>(&self, step: impl FnOnce(&mut Game) -> R) -> R {
        let _flashing = self.shared.flashing.lock().await;
        let (result, pending) = self.mutate(|game| {
            let result = step(game);
            (result, game.begin_clear())
        });
        if let Some(pending) = pending {
            self.flash(pending.points(), Color::White).await;
            self.mutate(|game| game.commit_clear(pending));
        }
        result
    }

    /// Blink `points`: color, blank, color, blank. The caller holds the
    /// flashing lock.
    pub(crate) async fn flash(&self, points: &BTreeSet<WorldPoint>, color: Color) {
        let step = self.shared.config.flash_step;
        for phase in [color, Color::Default, color, Color::Default] {
            self.mutate(|game| game.set_flash(points.iter().copied(), phase));
            tokio::time::sleep(step).await;
        }
        self.mutate(|game| game.clear_flash(points.iter().copied()));
    }

    pub(crate) async fn lock_flashing(&self) -> tokio::sync::MutexGuard<'_, ()> {
        self.shared.flashing.lock().await
    }

    /// Start over with the same players. A finished game gets its tasks
    /// back if anyone is still connected.
    pub async fn restart(&self) {
        let was_finished = {
            let _flashing = self.shared.flashing.lock().await;
            self.shared.clock.reset();
            let was_finished = self.shared.finished.swap(false, Ordering::SeqCst);
            self.mutate(Game::restart);
            was_finished
        };
        if was_finished && !self.shared.finished.load(Ordering::SeqCst) {
            self.start();
        }
    }

    /// Stop all background tasks.
    pub fn shutdown(&self) {
        self.stop_tasks();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use catris_core::{BlockFactory, BlockTemplate, Shape, SquareContent};
    use std::time::Duration;

    fn fixed(kind: TopologyKind, template: BlockTemplate) -> GameHandle {
        GameHandle::new(
            Game::with_factory(kind, BlockFactory::fixed(template)),
            EngineConfig::default(),
        )
    }

    fn event(player: PlayerId, action: PlayerAction) -> InputEvent {
        InputEvent { player, action }
    }

    #[tokio::test(start_paused = true)]
    async fn test_join_and_full() {
        let handle = GameHandle::new(Game::new(TopologyKind::Bottle, 1), EngineConfig::default());
        for name in ["a", "b", "c"] {
            assert!(handle.join(name).await.is_ok());
        }
        assert_eq!(handle.join("d").await, Err(JoinError::GameFull));
        assert!(handle.join("B").await.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_moves_notify_subscribers_once() {
        let handle = fixed(TopologyKind::Traditional, BlockTemplate::normal(Shape::O));
        let id = handle.join("a").await.unwrap();
        let mut rx = handle.subscribe();
        rx.borrow_and_update();

        assert!(handle.apply(event(id, PlayerAction::MoveLeft)).await);
        assert!(handle.apply(event(id, PlayerAction::MoveRight)).await);
        assert!(rx.has_changed().unwrap());
        rx.borrow_and_update();
        assert!(!rx.has_changed().unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_paused_game_ignores_moves() {
        let handle = fixed(TopologyKind::Traditional, BlockTemplate::normal(Shape::O));
        let id = handle.join("a").await.unwrap();
        assert!(handle.apply(event(id, PlayerAction::TogglePause)).await);
        assert!(handle.clock().is_paused());
        assert!(!handle.apply(event(id, PlayerAction::MoveLeft)).await);
        handle.apply(event(id, PlayerAction::TogglePause)).await;
        assert!(handle.apply(event(id, PlayerAction::MoveLeft)).await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_hard_drop_clears_row_after_flash() {
        let handle = fixed(TopologyKind::Traditional, BlockTemplate::normal(Shape::I));
        let id = handle.join("a").await.unwrap();
        handle.mutate(|game| {
            for x in [0, 5, 6] {
                game.set_landed(
                    (x, 19),
                    SquareContent::Normal {
                        shape: Shape::T,
                        backwards: false,
                    },
                );
            }
        });

        let started = tokio::time::Instant::now();
        assert!(handle.apply(event(id, PlayerAction::HardDrop)).await);
        assert!(started.elapsed() >= Duration::from_millis(400));
        assert_eq!(handle.score(), 10);
        handle.read(|game| {
            assert_eq!(game.board().landed_count(), 0);
            assert_eq!(game.board().flashing().count(), 0);
        });
    }

    #[tokio::test(start_paused = true)]
    async fn test_soft_drop_is_cancelled_by_moving() {
        let handle = fixed(TopologyKind::Traditional, BlockTemplate::normal(Shape::T));
        let id = handle.join("a").await.unwrap();
        handle.apply(event(id, PlayerAction::SoftDropOn)).await;
        let fast = |h: &GameHandle| {
            h.read(|g| g.player(id).and_then(|p| p.block()).map(|b| b.fast_down))
        };
        assert_eq!(fast(&handle), Some(true));
        handle.apply(event(id, PlayerAction::MoveRight)).await;
        assert_eq!(fast(&handle), Some(false));
    }

    #[tokio::test(start_paused = true)]
    async fn test_game_over_is_reported_once() {
        let handle = fixed(TopologyKind::Traditional, BlockTemplate::normal(Shape::O));
        let id = handle.join("a").await.unwrap();
        assert!(!handle.is_over());
        handle.disconnect(id);
        assert!(handle.is_over());
        assert_eq!(handle.join("b").await, Err(JoinError::GameOver));
        assert_eq!(handle.summary().player_names, vec!["a".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_revives_finished_game() {
        let handle = fixed(TopologyKind::Traditional, BlockTemplate::normal(Shape::O));
        let id = handle.join("a").await.unwrap();
        handle.disconnect(id);
        assert!(handle.is_over());

        handle.mutate(|game| game.set_connected(id, true));
        handle.restart().await;
        assert!(!handle.is_over());

        let top = |h: &GameHandle| {
            h.read(|g| {
                g.player(id)
                    .and_then(|p| p.block())
                    .and_then(|b| b.squares.iter().map(|sq| sq.y).min())
            })
        };
        let before = top(&handle);
        tokio::time::sleep(Duration::from_millis(1200)).await;
        assert!(top(&handle) > before);
        handle.shutdown();
    }
}
