// Application layer - run coordination, scheduling, engine facade

pub mod coordinator;
pub mod engine;
pub mod events;
pub mod scheduler;

pub use coordinator::{BatchRunResult, DuePair, RunCoordinator};
pub use engine::Engine;
pub use events::EngineEvent;
pub use scheduler::Scheduler;
