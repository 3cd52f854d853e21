use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::Game;

/// Classification of a game's response-status codes.
///
/// The remote APIs share a `{ retcode, message, data }` envelope but each
/// game community decides what its codes mean. Keeping the mapping on the
/// descriptor means adding a game is adding a table entry, not a new match
/// arm in the client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseCodes {
    pub success: Vec<i64>,
    pub already_signed: Vec<i64>,
    pub invalid_credential: Vec<i64>,
    pub challenge: Vec<i64>,
}

impl ResponseCodes {
    pub fn classify(&self, retcode: i64) -> CodeClass {
        if self.success.contains(&retcode) {
            CodeClass::Success
        } else if self.already_signed.contains(&retcode) {
            CodeClass::AlreadySigned
        } else if self.invalid_credential.contains(&retcode) {
            CodeClass::InvalidCredential
        } else if self.challenge.contains(&retcode) {
            CodeClass::Challenge
        } else {
            CodeClass::Unknown
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodeClass {
    Success,
    AlreadySigned,
    InvalidCredential,
    Challenge,
    Unknown,
}

pub struct DescriptorConfig {
    pub game: Game,
    pub display_name: String,
    pub act_id: String,
    pub sign_url: String,
    pub info_url: String,
    pub home_url: String,
    pub role_url: String,
    pub game_biz: String,
    pub sign_game_header: Option<String>,
    pub codes: ResponseCodes,
}

/// Per-game wire descriptor: endpoints, activity id, the role-binding
/// lookup (`game_biz`) and the header value the remote uses to route the
/// request to the right game event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameDescriptor {
    game: Game,
    display_name: String,
    act_id: String,
    sign_url: String,
    info_url: String,
    home_url: String,
    role_url: String,
    game_biz: String,
    sign_game_header: Option<String>,
    codes: ResponseCodes,
}

impl GameDescriptor {
    pub fn new(config: DescriptorConfig) -> Self {
        Self {
            game: config.game,
            display_name: config.display_name,
            act_id: config.act_id,
            sign_url: config.sign_url,
            info_url: config.info_url,
            home_url: config.home_url,
            role_url: config.role_url,
            game_biz: config.game_biz,
            sign_game_header: config.sign_game_header,
            codes: config.codes,
        }
    }

    pub fn game(&self) -> Game {
        self.game
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn act_id(&self) -> &str {
        &self.act_id
    }

    pub fn sign_url(&self) -> &str {
        &self.sign_url
    }

    pub fn info_url(&self) -> &str {
        &self.info_url
    }

    pub fn home_url(&self) -> &str {
        &self.home_url
    }

    pub fn role_url(&self) -> &str {
        &self.role_url
    }

    pub fn game_biz(&self) -> &str {
        &self.game_biz
    }

    pub fn sign_game_header(&self) -> Option<&str> {
        self.sign_game_header.as_deref()
    }

    pub fn classify(&self, retcode: i64) -> CodeClass {
        self.codes.classify(retcode)
    }
}

fn default_codes() -> ResponseCodes {
    ResponseCodes {
        success: vec![0],
        already_signed: vec![-5003],
        invalid_credential: vec![-100, -101, 10001, 10103],
        challenge: vec![1034, 5003],
    }
}

/// Built-in descriptors, resolved once at startup into a fixed table.
pub fn builtin_descriptors() -> HashMap<Game, GameDescriptor> {
    let luna = "https://api-takumi.mihoyo.com/event/luna";
    // The role-binding lookup is shared; game_biz selects the game.
    let role_url =
        "https://api-takumi.mihoyo.com/binding/api/getUserGameRolesByCookie".to_string();

    let entries = [
        GameDescriptor::new(DescriptorConfig {
            game: Game::Genshin,
            display_name: "Genshin Impact".to_string(),
            act_id: "e202311201442471".to_string(),
            sign_url: format!("{}/sign", luna),
            info_url: format!("{}/info", luna),
            home_url: format!("{}/home", luna),
            role_url: role_url.clone(),
            game_biz: "hk4e_cn".to_string(),
            sign_game_header: Some("hk4e".to_string()),
            codes: default_codes(),
        }),
        GameDescriptor::new(DescriptorConfig {
            game: Game::StarRail,
            display_name: "Honkai: Star Rail".to_string(),
            act_id: "e202304121516551".to_string(),
            sign_url: format!("{}/sign", luna),
            info_url: format!("{}/info", luna),
            home_url: format!("{}/home", luna),
            role_url: role_url.clone(),
            game_biz: "hkrpg_cn".to_string(),
            sign_game_header: Some("hkrpg".to_string()),
            codes: default_codes(),
        }),
        GameDescriptor::new(DescriptorConfig {
            game: Game::Zzz,
            display_name: "Zenless Zone Zero".to_string(),
            act_id: "e202406242138391".to_string(),
            sign_url: format!("{}/zzz/sign", luna),
            info_url: format!("{}/zzz/info", luna),
            home_url: format!("{}/zzz/home", luna),
            role_url,
            game_biz: "nap_cn".to_string(),
            sign_game_header: Some("zzz".to_string()),
            codes: default_codes(),
        }),
    ];

    entries.into_iter().map(|d| (d.game(), d)).collect()
}
