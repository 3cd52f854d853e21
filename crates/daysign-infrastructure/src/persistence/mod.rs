pub mod repositories;

mod database;

pub use database::Database;
