//! Background tasks of a running game.
//!
//! Tasks hold only a weak reference to the game and upgrade it after every
//! sleep, so dropping the last [`GameHandle`] ends them. They sleep on the
//! pause clock, which they keep alive on their own.

use std::collections::HashSet;
use std::sync::{Arc, Weak};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;

use catris_core::types::{normal_drop_interval_secs, Color, DRILL_FRAME_MS, SECOND_MS};
use catris_core::{PlayerId, WaitTick};

use crate::clock::PauseClock;
use crate::handle::{GameHandle, Shared};

pub(crate) fn spawn_all(handle: &GameHandle) -> Vec<JoinHandle<()>> {
    let clock = handle.clock_arc();
    vec![
        tokio::spawn(move_blocks_down(handle.downgrade(), clock.clone(), false)),
        tokio::spawn(move_blocks_down(handle.downgrade(), clock.clone(), true)),
        tokio::spawn(bombs(handle.downgrade(), clock.clone())),
        tokio::spawn(animate_drills(handle.downgrade(), clock)),
        tokio::spawn(start_countdowns_as_needed(
            handle.downgrade(),
            handle.subscribe(),
        )),
    ]
}

fn upgrade(weak: &Weak<Shared>) -> Option<GameHandle> {
    weak.upgrade().map(GameHandle::from_shared)
}

async fn move_blocks_down(weak: Weak<Shared>, clock: Arc<PauseClock>, fast: bool) {
    loop {
        let interval = match upgrade(&weak) {
            Some(handle) if fast => handle.config().fast_drop,
            Some(_) => Duration::from_secs_f64(normal_drop_interval_secs(clock.minutes_played())),
            None => return,
        };
        clock.sleep(interval).await;

        let Some(handle) = upgrade(&weak) else {
            return;
        };
        handle
            .drop_and_clear(|game| game.move_blocks_down(fast))
            .await;
    }
}

async fn bombs(weak: Weak<Shared>, clock: Arc<PauseClock>) {
    loop {
        clock.sleep(Duration::from_millis(SECOND_MS)).await;
        let Some(handle) = upgrade(&weak) else {
            return;
        };
        if handle.mutate(|game| game.tick_bombs()) {
            explode_ripe_bombs(&handle).await;
        }
    }
}

/// Blow up every bomb that ran out, and every bomb those catch, round by
/// round.
pub(crate) async fn explode_ripe_bombs(handle: &GameHandle) {
    let _flashing = handle.lock_flashing().await;
    // Checked again under the lock; a clear may have removed them meanwhile.
    let ripe = handle.read(|game| game.ripe_bombs());
    if ripe.is_empty() {
        return;
    }

    let mut exploded: HashSet<u64> = ripe.iter().map(|(_, id)| *id).collect();
    let mut centers: Vec<_> = ripe.into_iter().map(|(point, _)| point).collect();
    while !centers.is_empty() {
        let area = handle.read(|game| game.explosion_area(&centers));
        handle.flash(&area, Color::Red).await;
        centers = handle.mutate(|game| game.detonate(&area, &mut exploded));
    }
}

async fn animate_drills(weak: Weak<Shared>, clock: Arc<PauseClock>) {
    loop {
        clock.sleep(Duration::from_millis(DRILL_FRAME_MS)).await;
        let Some(handle) = upgrade(&weak) else {
            return;
        };
        handle.mutate(|game| game.advance_drill_animation());
    }
}

async fn start_countdowns_as_needed(weak: Weak<Shared>, mut changed: watch::Receiver<u64>) {
    loop {
        match upgrade(&weak) {
            Some(handle) => {
                let (ids, epoch) =
                    handle.mutate(|game| (game.take_started_waits(), game.epoch()));
                for id in ids {
                    let task = tokio::spawn(countdown(
                        handle.downgrade(),
                        handle.clock_arc(),
                        id,
                        epoch,
                    ));
                    handle.track(task);
                }
            }
            None => return,
        }

        // Fails once the game is gone.
        if changed.changed().await.is_err() {
            return;
        }
    }
}

async fn countdown(weak: Weak<Shared>, clock: Arc<PauseClock>, player: PlayerId, epoch: u64) {
    loop {
        clock.sleep(Duration::from_millis(SECOND_MS)).await;
        let Some(handle) = upgrade(&weak) else {
            return;
        };
        if handle.read(|game| game.epoch()) != epoch {
            return;
        }
        match handle.mutate(|game| game.tick_wait(player)) {
            WaitTick::Counting(_) => continue,
            WaitTick::Gone => return,
            WaitTick::Expired => break,
        }
    }

    let Some(handle) = upgrade(&weak) else {
        return;
    };
    let _flashing = handle.lock_flashing().await;
    if handle.read(|game| game.epoch()) != epoch {
        return;
    }
    let wiped = handle.read(|game| game.owned_landed(player));
    handle.flash(&wiped, Color::White).await;
    handle.mutate(|game| game.finish_wait(player));
    debug!(player, wiped = wiped.len(), "wait countdown finished");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use catris_core::types::TopologyKind;
    use catris_core::{BlockFactory, BlockTemplate, Game, Shape, SquareContent};

    fn o_game(config: EngineConfig) -> GameHandle {
        GameHandle::new(
            Game::with_factory(
                TopologyKind::Traditional,
                BlockFactory::fixed(BlockTemplate::normal(Shape::O)),
            ),
            config,
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_gravity_task_lands_blocks() {
        let handle = o_game(EngineConfig::default());
        handle.join("a").await.unwrap();
        handle.start();
        tokio::time::sleep(Duration::from_secs(15)).await;
        assert!(handle.read(|game| game.board().landed_count()) >= 4);
        handle.shutdown();
    }

    #[tokio::test(start_paused = true)]
    async fn test_pause_stops_gravity() {
        let handle = o_game(EngineConfig::default());
        let id = handle.join("a").await.unwrap();
        handle.start();
        handle.clock().set_paused(true);
        tokio::time::sleep(Duration::from_secs(30)).await;
        let lowest = handle.read(|game| {
            game.player(id)
                .and_then(|p| p.block())
                .map(|b| b.squares.iter().map(|sq| sq.y).max())
        });
        assert_eq!(lowest, Some(Some(-1)));
        handle.shutdown();
    }

    #[tokio::test(start_paused = true)]
    async fn test_countdown_wipes_lane_and_respawns() {
        let config = EngineConfig {
            wait_seconds: 2,
            ..EngineConfig::default()
        };
        let handle = o_game(config);
        let a = handle.join("a").await.unwrap();
        handle.join("b").await.unwrap();
        handle.mutate(|game| {
            game.set_landed(
                (2, 0),
                SquareContent::Normal {
                    shape: Shape::Z,
                    backwards: false,
                },
            )
        });
        handle.start();

        tokio::time::sleep(Duration::from_millis(1600)).await;
        let waiting = handle.read(|game| game.player(a).map(|p| p.is_waiting()));
        assert_eq!(waiting, Some(true));

        tokio::time::sleep(Duration::from_secs(3)).await;
        handle.read(|game| {
            assert!(game.landed((2, 0)).is_none());
            assert!(game.player(a).unwrap().is_active());
        });
        handle.shutdown();
    }

    #[tokio::test(start_paused = true)]
    async fn test_bomb_task_explodes_landed_bomb() {
        let handle = o_game(EngineConfig::default());
        handle.join("a").await.unwrap();
        handle.mutate(|game| {
            game.set_landed((3, 15), SquareContent::Bomb { id: 500, timer: 2 });
            game.set_landed(
                (4, 15),
                SquareContent::Normal {
                    shape: Shape::S,
                    backwards: false,
                },
            );
        });
        handle.start();
        tokio::time::sleep(Duration::from_millis(2700)).await;
        handle.read(|game| {
            assert!(game.landed((3, 15)).is_none());
            assert!(game.landed((4, 15)).is_none());
        });
        handle.shutdown();
    }
}
