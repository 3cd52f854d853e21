mod entry;
mod repository;

pub use entry::ScheduleEntry;
pub use repository::ScheduleRepository;
