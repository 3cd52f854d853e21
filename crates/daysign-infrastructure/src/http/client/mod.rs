mod types;

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use log::{debug, info, warn};
use reqwest::{header, Client, Response, StatusCode};
use serde_json::json;

use daysign_domain::account::Account;
use daysign_domain::checkin::{CheckinClient, Outcome};
use daysign_domain::game::{CodeClass, GameDescriptor};

use super::signing;
use types::{ApiEnvelope, Award, GameRole, HomeInfo, RoleInfo, SignInfo};

/// Reqwest-backed check-in client.
///
/// One `attempt` is one classified round against the remote: look up the
/// bound game role, probe the sign state, post the sign call if needed,
/// capture the reward. Every
/// request carries the client-wide timeout so a hung remote cannot stall
/// the coordinator.
pub struct HttpCheckinClient {
    client: Client,
    device_id: String,
}

impl HttpCheckinClient {
    pub fn new(request_timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .user_agent(types::USER_AGENT)
            .timeout(request_timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            device_id: signing::device_id(),
        })
    }

    fn headers(&self, token: &str, descriptor: &GameDescriptor) -> header::HeaderMap {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::ACCEPT,
            header::HeaderValue::from_static("application/json, text/plain, */*"),
        );
        headers.insert(
            header::REFERER,
            header::HeaderValue::from_static(types::REFERER),
        );
        headers.insert(
            header::ORIGIN,
            header::HeaderValue::from_static(types::ORIGIN),
        );
        headers.insert(
            header::HeaderName::from_static("x-rpc-app_version"),
            header::HeaderValue::from_static(types::APP_VERSION),
        );
        headers.insert(
            header::HeaderName::from_static("x-rpc-client_type"),
            header::HeaderValue::from_static(types::CLIENT_TYPE),
        );
        if let Ok(value) = header::HeaderValue::from_str(&self.device_id) {
            headers.insert(header::HeaderName::from_static("x-rpc-device_id"), value);
        }
        if let Ok(value) = header::HeaderValue::from_str(&signing::generate_ds()) {
            headers.insert(header::HeaderName::from_static("ds"), value);
        }
        if let Some(sign_game) = descriptor.sign_game_header() {
            if let Ok(value) = header::HeaderValue::from_str(sign_game) {
                headers.insert(header::HeaderName::from_static("x-rpc-signgame"), value);
            }
        }
        if let Ok(value) = header::HeaderValue::from_str(token) {
            headers.insert(header::COOKIE, value);
        }
        headers
    }

    /// Resolve the game role the session is bound to. The sign endpoints
    /// address the player by `region` and `uid`, so every attempt starts
    /// here; a session without a bound role cannot sign.
    async fn fetch_role(
        &self,
        token: &str,
        descriptor: &GameDescriptor,
    ) -> std::result::Result<GameRole, Outcome> {
        let response = self
            .client
            .get(descriptor.role_url())
            .headers(self.headers(token, descriptor))
            .query(&[("game_biz", descriptor.game_biz())])
            .send()
            .await;

        let envelope = match self.read_envelope(response).await {
            Ok(envelope) => envelope,
            Err(outcome) => return Err(outcome),
        };

        match descriptor.classify(envelope.retcode) {
            CodeClass::Success => {
                let roles = envelope
                    .data
                    .and_then(|data| serde_json::from_value::<RoleInfo>(data).ok())
                    .unwrap_or_default();
                roles
                    .list
                    .into_iter()
                    .next()
                    .ok_or_else(|| Outcome::UnknownError {
                        detail: "No game role bound to this account".to_string(),
                    })
            }
            CodeClass::InvalidCredential => Err(Outcome::InvalidCredential),
            CodeClass::Challenge => Err(Outcome::ChallengeRequired),
            _ => Err(Outcome::UnknownError {
                detail: format!(
                    "Role lookup failed, retcode {}: {}",
                    envelope.retcode, envelope.message
                ),
            }),
        }
    }

    /// Probe today's sign state. `Ok(Some(info))` when the remote answered
    /// with a success retcode; `Ok(None)` defers classification to the
    /// sign call; `Err(outcome)` short-circuits the attempt.
    async fn fetch_sign_info(
        &self,
        token: &str,
        descriptor: &GameDescriptor,
        role: &GameRole,
    ) -> std::result::Result<Option<SignInfo>, Outcome> {
        let response = self
            .client
            .get(descriptor.info_url())
            .headers(self.headers(token, descriptor))
            .query(&[
                ("act_id", descriptor.act_id()),
                ("lang", "zh-cn"),
                ("region", &role.region),
                ("uid", &role.game_uid),
            ])
            .send()
            .await;

        let envelope = match self.read_envelope(response).await {
            Ok(envelope) => envelope,
            Err(outcome) => return Err(outcome),
        };

        match descriptor.classify(envelope.retcode) {
            CodeClass::Success => {
                let info = envelope
                    .data
                    .and_then(|data| serde_json::from_value::<SignInfo>(data).ok());
                Ok(info)
            }
            CodeClass::InvalidCredential => Err(Outcome::InvalidCredential),
            CodeClass::Challenge => Err(Outcome::ChallengeRequired),
            // Anything else on the probe is non-conclusive; let the sign
            // call decide.
            _ => Ok(None),
        }
    }

    async fn post_sign(
        &self,
        token: &str,
        descriptor: &GameDescriptor,
        role: &GameRole,
    ) -> std::result::Result<ApiEnvelope, Outcome> {
        let body = json!({
            "act_id": descriptor.act_id(),
            "lang": "zh-cn",
            "region": role.region,
            "uid": role.game_uid,
        });

        let response = self
            .client
            .post(descriptor.sign_url())
            .headers(self.headers(token, descriptor))
            .json(&body)
            .send()
            .await;

        self.read_envelope(response).await
    }

    /// Fetch the month's award list to describe today's reward. Best
    /// effort: a failure here never degrades a successful check-in.
    async fn fetch_reward(
        &self,
        token: &str,
        descriptor: &GameDescriptor,
        signed_days: u32,
    ) -> Option<String> {
        let response = self
            .client
            .get(descriptor.home_url())
            .headers(self.headers(token, descriptor))
            .query(&[("act_id", descriptor.act_id()), ("lang", "zh-cn")])
            .send()
            .await;

        let envelope = self.read_envelope(response).await.ok()?;
        if descriptor.classify(envelope.retcode) != CodeClass::Success {
            return None;
        }

        let home: HomeInfo = serde_json::from_value(envelope.data?).ok()?;
        let day = signed_days.max(1) as usize;
        home.awards
            .get(day - 1)
            .map(|Award { name, cnt }| format!("{} x{}", name, cnt))
    }

    /// Collapse transport and envelope handling into either a parsed
    /// envelope or a classified outcome.
    async fn read_envelope(
        &self,
        response: reqwest::Result<Response>,
    ) -> std::result::Result<ApiEnvelope, Outcome> {
        let response = match response {
            Ok(response) => response,
            Err(e) => return Err(classify_reqwest_error(&e)),
        };

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(Outcome::RateLimited {
                retry_after: parse_retry_after(&response),
            });
        }
        if status.is_server_error() {
            return Err(Outcome::TransientError {
                detail: format!("Server error: HTTP {}", status),
            });
        }
        if !status.is_success() {
            return Err(Outcome::UnknownError {
                detail: format!("Unexpected status: HTTP {}", status),
            });
        }

        let text = match response.text().await {
            Ok(text) => text,
            Err(e) => return Err(classify_reqwest_error(&e)),
        };

        serde_json::from_str::<ApiEnvelope>(&text).map_err(|_| {
            let prefix: String = text.chars().take(200).collect();
            Outcome::UnknownError {
                detail: format!("Response is not the expected envelope: {}", prefix),
            }
        })
    }
}

#[async_trait]
impl CheckinClient for HttpCheckinClient {
    async fn attempt(&self, account: &Account, descriptor: &GameDescriptor) -> Outcome {
        let token = account.session().secret();
        if token.trim().is_empty() {
            return Outcome::InvalidCredential;
        }

        let game = descriptor.display_name();

        // 1. Role lookup: the sign endpoints address the player by region
        // and uid.
        let role = match self.fetch_role(token, descriptor).await {
            Ok(role) => role,
            Err(outcome) => return outcome,
        };
        debug!(
            "[{}] {} role: {} (uid {}, {})",
            account.name(),
            game,
            role.nickname,
            role.game_uid,
            role.region
        );

        // 2. Probe: the remote may already report today as signed.
        let info = match self.fetch_sign_info(token, descriptor, &role).await {
            Ok(info) => info,
            Err(outcome) => return outcome,
        };

        if let Some(info) = &info {
            if info.is_sign {
                info!(
                    "[{}] {} already signed today (day {})",
                    account.name(),
                    game,
                    info.total_sign_day
                );
                return Outcome::AlreadyDone {
                    message: format!("Already checked in (day {})", info.total_sign_day),
                };
            }
        }

        // 3. Sign call.
        let envelope = match self.post_sign(token, descriptor, &role).await {
            Ok(envelope) => envelope,
            Err(outcome) => return outcome,
        };

        match descriptor.classify(envelope.retcode) {
            CodeClass::Success => {
                let signed_days = info.map(|i| i.total_sign_day + 1).unwrap_or(1);
                let reward = self.fetch_reward(token, descriptor, signed_days).await;
                info!(
                    "[{}] {} check-in successful{}",
                    account.name(),
                    game,
                    reward
                        .as_deref()
                        .map(|r| format!(", reward: {}", r))
                        .unwrap_or_default()
                );
                Outcome::Success { reward }
            }
            CodeClass::AlreadySigned => Outcome::AlreadyDone {
                message: if envelope.message.is_empty() {
                    "Already checked in today".to_string()
                } else {
                    envelope.message
                },
            },
            CodeClass::InvalidCredential => {
                warn!("[{}] {} rejected the session token", account.name(), game);
                Outcome::InvalidCredential
            }
            CodeClass::Challenge => {
                warn!(
                    "[{}] {} demands interactive verification",
                    account.name(),
                    game
                );
                Outcome::ChallengeRequired
            }
            CodeClass::Unknown => Outcome::UnknownError {
                detail: format!("retcode {}: {}", envelope.retcode, envelope.message),
            },
        }
    }
}

fn classify_reqwest_error(error: &reqwest::Error) -> Outcome {
    if error.is_timeout() || error.is_connect() || error.is_request() {
        return Outcome::TransientError {
            detail: error.to_string(),
        };
    }
    if let Some(status) = error.status() {
        if status.is_server_error() {
            return Outcome::TransientError {
                detail: format!("Server error: HTTP {}", status),
            };
        }
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Outcome::RateLimited { retry_after: None };
        }
    }
    if error.is_decode() {
        return Outcome::UnknownError {
            detail: error.to_string(),
        };
    }
    Outcome::TransientError {
        detail: error.to_string(),
    }
}

fn parse_retry_after(response: &Response) -> Option<Duration> {
    response
        .headers()
        .get(header::RETRY_AFTER)?
        .to_str()
        .ok()?
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}
