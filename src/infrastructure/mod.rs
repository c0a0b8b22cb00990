// Upstream HTTP clients
pub mod alpaca;
pub mod news;
pub mod weather;

// Shared HTTP plumbing
pub mod core;

// In-memory sources for tests and offline runs
pub mod mock;

pub mod observability;
