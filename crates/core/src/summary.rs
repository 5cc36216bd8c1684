use serde::Serialize;

/// Final result of a game, handed to whoever keeps high scores.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GameSummary {
    pub mode: String,
    pub score: u64,
    pub duration_secs: u64,
    pub player_names: Vec<String>,
}

impl GameSummary {
    /// Names joined for a one-line high score entry.
    pub fn players_label(&self) -> String {
        self.player_names.join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serializes_all_fields() {
        let summary = GameSummary {
            mode: "ring".to_string(),
            score: 130,
            duration_secs: 61,
            player_names: vec!["Alice".to_string(), "Bob".to_string()],
        };
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["mode"], "ring");
        assert_eq!(json["score"], 130);
        assert_eq!(json["duration_secs"], 61);
        assert_eq!(json["player_names"][1], "Bob");
        assert_eq!(summary.players_label(), "Alice, Bob");
    }
}
