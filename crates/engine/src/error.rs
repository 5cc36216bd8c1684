use std::fmt;

/// Why a player could not join a game.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinError {
    /// Every seat of the topology is taken.
    GameFull,
    /// The game has ended and no longer accepts players.
    GameOver,
}

impl JoinError {
    pub fn code(self) -> &'static str {
        match self {
            JoinError::GameFull => "game_full",
            JoinError::GameOver => "game_over",
        }
    }

    pub fn message(self) -> &'static str {
        match self {
            JoinError::GameFull => "game is full",
            JoinError::GameOver => "game has already ended",
        }
    }
}

impl fmt::Display for JoinError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

impl std::error::Error for JoinError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_and_code() {
        assert_eq!(JoinError::GameFull.to_string(), "game is full");
        assert_eq!(JoinError::GameOver.code(), "game_over");
    }
}
