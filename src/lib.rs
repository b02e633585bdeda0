//! Offline-first sync for the Jagdlog hunting log.
//!
//! The same SQLite schema backs the server and every client. Clients queue
//! local writes and run push-then-pull rounds against the server; the server
//! applies pushed changes last-write-wins and answers pulls with rows changed
//! since the client's checkpoint.

pub mod config;
pub mod db;
pub mod models;
pub mod profiles;
pub mod server;
pub mod sync;
pub mod timestamp;
