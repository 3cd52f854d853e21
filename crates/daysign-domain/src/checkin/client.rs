use async_trait::async_trait;

use super::outcome::Outcome;
use crate::account::Account;
use crate::game::GameDescriptor;

/// The network seam: one check-in attempt for one (account, game) pair.
///
/// Implementations know the wire protocol and nothing about scheduling or
/// retries. They must never fail; every error condition is classified into
/// an `Outcome` variant, and every request carries a bounded timeout.
#[async_trait]
pub trait CheckinClient: Send + Sync {
    async fn attempt(&self, account: &Account, descriptor: &GameDescriptor) -> Outcome;
}
