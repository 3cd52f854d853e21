mod descriptor;

pub use descriptor::{
    builtin_descriptors, CodeClass, DescriptorConfig, GameDescriptor, ResponseCodes,
};

use serde::{Deserialize, Serialize};

use crate::shared::DomainError;

/// The fixed set of games the engine can check in to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Game {
    Genshin,
    StarRail,
    Zzz,
}

impl Game {
    pub const ALL: [Game; 3] = [Game::Genshin, Game::StarRail, Game::Zzz];

    pub fn as_str(&self) -> &'static str {
        match self {
            Game::Genshin => "genshin",
            Game::StarRail => "starrail",
            Game::Zzz => "zzz",
        }
    }

    pub fn parse(s: &str) -> Result<Self, DomainError> {
        match s {
            "genshin" => Ok(Game::Genshin),
            "starrail" => Ok(Game::StarRail),
            "zzz" => Ok(Game::Zzz),
            other => Err(DomainError::GameNotFound(other.to_string())),
        }
    }
}

impl std::fmt::Display for Game {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
