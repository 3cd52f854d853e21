// Infrastructure layer - persistence, HTTP client, logging, configuration

pub mod config;
pub mod http;
pub mod logging;
pub mod persistence;
