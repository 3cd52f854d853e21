mod client;
mod signing;

pub use client::HttpCheckinClient;
