use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Opaque session credential obtained out-of-band (QR login).
///
/// The engine never creates or refreshes tokens; it only uses them and
/// flags them invalid once the remote rejects one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionToken {
    secret: String,
    expires_at: Option<DateTime<Utc>>,
    invalidated: bool,
}

impl SessionToken {
    pub fn new(secret: String, expires_at: Option<DateTime<Utc>>) -> Self {
        Self {
            secret,
            expires_at,
            invalidated: false,
        }
    }

    pub fn restore(secret: String, expires_at: Option<DateTime<Utc>>, invalidated: bool) -> Self {
        Self {
            secret,
            expires_at,
            invalidated,
        }
    }

    pub fn secret(&self) -> &str {
        &self.secret
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    pub fn is_invalidated(&self) -> bool {
        self.invalidated
    }

    pub fn invalidate(&mut self) {
        self.invalidated = true;
    }

    /// A token is usable when it is non-empty, not flagged invalid and not
    /// past its expiry (if one was supplied by the auth flow).
    pub fn is_usable(&self, now: DateTime<Utc>) -> bool {
        if self.secret.trim().is_empty() || self.invalidated {
            return false;
        }
        match self.expires_at {
            Some(expires_at) => now < expires_at,
            None => true,
        }
    }
}
