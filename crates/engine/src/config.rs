use std::time::{Duration, SystemTime, UNIX_EPOCH};

use catris_core::types::{FAST_DROP_MS, FLASH_STEP_MS, WAIT_COUNTER_START};

/// Engine tunables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Seed of the block factory.
    pub seed: u32,
    /// Length of the wait countdown, in seconds.
    pub wait_seconds: u32,
    /// Gravity interval of soft-dropping blocks.
    pub fast_drop: Duration,
    /// Length of one flash phase. A flash has four.
    pub flash_step: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            seed: 12345,
            wait_seconds: WAIT_COUNTER_START,
            fast_drop: Duration::from_millis(FAST_DROP_MS),
            flash_step: Duration::from_millis(FLASH_STEP_MS),
        }
    }
}

impl EngineConfig {
    /// Create config from environment variables
    pub fn from_env() -> Self {
        use std::env;

        let seed = env::var("CATRIS_SEED")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or_else(clock_seed);

        let wait_seconds = env::var("CATRIS_WAIT_SECONDS")
            .ok()
            .and_then(|s| s.parse().ok())
            .filter(|&n: &u32| n > 0)
            .unwrap_or(WAIT_COUNTER_START);

        let fast_drop_ms = env::var("CATRIS_FAST_DROP_MS")
            .ok()
            .and_then(|s| s.parse().ok())
            .filter(|&n: &u64| n > 0)
            .unwrap_or(FAST_DROP_MS);

        let flash_ms = env::var("CATRIS_FLASH_MS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(FLASH_STEP_MS);

        Self {
            seed,
            wait_seconds,
            fast_drop: Duration::from_millis(fast_drop_ms),
            flash_step: Duration::from_millis(flash_ms),
        }
    }

    /// Seed for the game of one topology, so parallel games differ.
    pub fn seed_for(&self, index: usize) -> u32 {
        self.seed.wrapping_add(index as u32)
    }
}

fn clock_seed() -> u32 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.subsec_nanos() ^ d.as_secs() as u32)
        .unwrap_or(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_matches_game_constants() {
        let config = EngineConfig::default();
        assert_eq!(config.wait_seconds, 30);
        assert_eq!(config.fast_drop, Duration::from_millis(25));
        assert_eq!(config.flash_step, Duration::from_millis(100));
    }

    #[test]
    fn test_from_env_reads_flash_step() {
        // Only this test touches CATRIS_FLASH_MS.
        std::env::set_var("CATRIS_FLASH_MS", "40");
        let config = EngineConfig::from_env();
        std::env::remove_var("CATRIS_FLASH_MS");
        assert_eq!(config.flash_step, Duration::from_millis(40));
    }

    #[test]
    fn test_seed_for_differs_per_game() {
        let config = EngineConfig::default();
        assert_ne!(config.seed_for(0), config.seed_for(1));
    }
}
