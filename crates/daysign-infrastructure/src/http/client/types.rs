use serde::Deserialize;

pub(super) const USER_AGENT: &str = "Mozilla/5.0 (Linux; Android 12; Unspecified Device) \
     AppleWebKit/537.36 (KHTML, like Gecko) Version/4.0 Chrome/103.0.5060.129 \
     Mobile Safari/537.36 miHoYoBBS/2.93.1";

pub(super) const APP_VERSION: &str = "2.93.1";
pub(super) const CLIENT_TYPE: &str = "5";
pub(super) const REFERER: &str = "https://act.mihoyo.com/";
pub(super) const ORIGIN: &str = "https://act.mihoyo.com";

/// Shared `{ retcode, message, data }` response envelope.
#[derive(Debug, Deserialize)]
pub(super) struct ApiEnvelope {
    #[serde(default)]
    pub retcode: i64,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub data: Option<serde_json::Value>,
}

/// Payload of the role-binding endpoint: the account's roles for one
/// `game_biz`.
#[derive(Debug, Default, Deserialize)]
pub(super) struct RoleInfo {
    #[serde(default)]
    pub list: Vec<GameRole>,
}

#[derive(Debug, Clone, Deserialize)]
pub(super) struct GameRole {
    #[serde(default)]
    pub game_uid: String,
    #[serde(default)]
    pub region: String,
    #[serde(default)]
    pub nickname: String,
}

/// Payload of the info endpoint: today's sign state.
#[derive(Debug, Deserialize)]
pub(super) struct SignInfo {
    #[serde(default)]
    pub is_sign: bool,
    #[serde(default)]
    pub total_sign_day: u32,
}

/// Payload of the home endpoint: the month's award list.
#[derive(Debug, Deserialize)]
pub(super) struct HomeInfo {
    #[serde(default)]
    pub awards: Vec<Award>,
}

#[derive(Debug, Deserialize)]
pub(super) struct Award {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub cnt: u32,
}
