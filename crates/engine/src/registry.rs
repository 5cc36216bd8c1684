use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use tracing::info;

use catris_core::types::TopologyKind;
use catris_core::{Game, GameSummary, PlayerId};

use crate::config::EngineConfig;
use crate::error::JoinError;
use crate::handle::GameHandle;

/// At most one running game per topology, created on first use and
/// forgotten once it is over.
#[derive(Debug, Default)]
pub struct GameRegistry {
    config: EngineConfig,
    games: Mutex<HashMap<TopologyKind, GameHandle>>,
}

impl GameRegistry {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            games: Mutex::new(HashMap::new()),
        }
    }

    fn games(&self) -> std::sync::MutexGuard<'_, HashMap<TopologyKind, GameHandle>> {
        self.games.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The running game of `kind`, if any.
    pub fn get(&self, kind: TopologyKind) -> Option<GameHandle> {
        self.games()
            .get(&kind)
            .filter(|handle| !handle.is_over())
            .cloned()
    }

    /// The running game of `kind`, starting a new one if needed.
    ///
    /// Must be called inside a tokio runtime.
    pub fn get_or_create(&self, kind: TopologyKind) -> GameHandle {
        let mut games = self.games();
        if games.get(&kind).is_some_and(GameHandle::is_over) {
            games.remove(&kind);
        }
        games
            .entry(kind)
            .or_insert_with(|| {
                let index = TopologyKind::ALL
                    .iter()
                    .position(|k| *k == kind)
                    .unwrap_or(0);
                let game = Game::new(kind, self.config.seed_for(index));
                let handle = GameHandle::new(game, self.config.clone());
                handle.start();
                info!(kind = kind.as_str(), "new game");
                handle
            })
            .clone()
    }

    /// Join the game of `kind`, starting one if needed.
    pub async fn join(
        &self,
        kind: TopologyKind,
        name: &str,
    ) -> Result<(GameHandle, PlayerId), JoinError> {
        let handle = self.get_or_create(kind);
        let id = handle.join(name).await?;
        Ok((handle, id))
    }

    /// Drop finished games and return their summaries.
    pub fn remove_finished(&self) -> Vec<GameSummary> {
        let mut games = self.games();
        let finished: Vec<TopologyKind> = games
            .iter()
            .filter(|(_, handle)| handle.is_over())
            .map(|(kind, _)| *kind)
            .collect();
        finished
            .into_iter()
            .filter_map(|kind| games.remove(&kind))
            .map(|handle| handle.summary())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.games().len()
    }

    pub fn is_empty(&self) -> bool {
        self.games().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_one_game_per_kind() {
        let registry = GameRegistry::new(EngineConfig::default());
        let a = registry.get_or_create(TopologyKind::Ring);
        let b = registry.get_or_create(TopologyKind::Ring);
        let c = registry.get_or_create(TopologyKind::Bottle);
        assert!(a.ptr_eq(&b));
        assert!(!a.ptr_eq(&c));
        assert_eq!(registry.len(), 2);
        a.shutdown();
        c.shutdown();
    }

    #[tokio::test(start_paused = true)]
    async fn test_finished_game_is_replaced() {
        let registry = GameRegistry::new(EngineConfig::default());
        let (first, id) = registry.join(TopologyKind::Traditional, "a").await.unwrap();
        first.disconnect(id);
        assert!(first.is_over());
        assert!(registry.get(TopologyKind::Traditional).is_none());

        let second = registry.get_or_create(TopologyKind::Traditional);
        assert!(!first.ptr_eq(&second));
        second.shutdown();
    }

    #[tokio::test(start_paused = true)]
    async fn test_remove_finished_returns_summaries() {
        let registry = GameRegistry::new(EngineConfig::default());
        let (handle, id) = registry.join(TopologyKind::Bottle, "zed").await.unwrap();
        handle.disconnect(id);
        let summaries = registry.remove_finished();
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].player_names, vec!["zed".to_string()]);
        assert!(registry.is_empty());
    }
}
