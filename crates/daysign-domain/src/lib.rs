// Domain layer - Pure business logic
// No dependencies on infrastructure or presentation layers

pub mod account;
pub mod checkin;
pub mod game;
pub mod schedule;
pub mod shared;

// Re-exports for convenience
pub use shared::{AccountId, DomainError};
