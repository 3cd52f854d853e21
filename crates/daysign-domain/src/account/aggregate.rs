use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::value_objects::SessionToken;
use crate::game::Game;
use crate::shared::{AccountId, DomainError};

/// A community account the engine checks in on behalf of.
///
/// Created by the auth collaborator, mutated by the user through the engine
/// API; the session token is shared across the account's subscribed games.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    id: AccountId,
    name: String,
    session: SessionToken,
    enabled: bool,
    games: BTreeSet<Game>,
    created_at: DateTime<Utc>,
}

impl Account {
    pub fn new(
        id: AccountId,
        name: String,
        session: SessionToken,
        games: impl IntoIterator<Item = Game>,
    ) -> Result<Self, DomainError> {
        if name.trim().is_empty() {
            return Err(DomainError::Validation(
                "Account name cannot be empty".to_string(),
            ));
        }
        if session.secret().trim().is_empty() {
            return Err(DomainError::InvalidCredentials(
                "Session token is required".to_string(),
            ));
        }

        let games: BTreeSet<Game> = games.into_iter().collect();
        let games = if games.is_empty() {
            Game::ALL.into_iter().collect()
        } else {
            games
        };

        Ok(Self {
            id,
            name: name.trim().to_string(),
            session,
            enabled: true,
            games,
            created_at: Utc::now(),
        })
    }

    pub fn restore(
        id: AccountId,
        name: String,
        session: SessionToken,
        enabled: bool,
        games: BTreeSet<Game>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            name,
            session,
            enabled,
            games,
            created_at,
        }
    }

    pub fn id(&self) -> &AccountId {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn session(&self) -> &SessionToken {
        &self.session
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn games(&self) -> impl Iterator<Item = Game> + '_ {
        self.games.iter().copied()
    }

    pub fn subscribes_to(&self, game: Game) -> bool {
        self.games.contains(&game)
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn set_games(&mut self, games: impl IntoIterator<Item = Game>) {
        self.games = games.into_iter().collect();
    }

    /// Called by the auth collaborator whenever a fresh session is obtained.
    /// Replaces the token and clears any invalid flag, so the next run uses
    /// the new credential.
    pub fn update_session(
        &mut self,
        secret: String,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<(), DomainError> {
        if secret.trim().is_empty() {
            return Err(DomainError::InvalidCredentials(
                "Session token is required".to_string(),
            ));
        }
        self.session = SessionToken::new(secret, expires_at);
        Ok(())
    }

    /// Flags the session after the remote rejected it. Subsequent runs are
    /// skipped without a network call until `update_session` replaces it.
    pub fn invalidate_session(&mut self) {
        self.session.invalidate();
    }

    pub fn has_usable_session(&self, now: DateTime<Utc>) -> bool {
        self.session.is_usable(now)
    }
}
