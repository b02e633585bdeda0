//! Offline-first sync between a local database and the server.
//!
//! Changes made locally are queued in `sync_queue` and pushed as a batch;
//! the server answers pulls with every row changed since the client's
//! checkpoint. Conflicts resolve last-write-wins.
//!
//! # Layout
//!
//! - [`classifier`]: turns a change into an upsert or a soft delete
//! - [`push`] / [`pull`]: the server-side pipelines
//! - [`engine`]: the client-side round (push, pull, apply, checkpoint)
//! - [`client`]: HTTP transport speaking the [`protocol`]
//! - [`writer`]: local writes that land in the queue

use std::future::Future;

pub mod classifier;
pub mod client;
pub mod engine;
pub mod protocol;
pub mod pull;
pub mod push;
pub mod writer;

pub use classifier::{apply, classify, WriteEffect};
pub use client::{SyncClient, SyncClientError};
pub use engine::{SyncEngine, SyncReport, DEFAULT_RETENTION_DAYS};
pub use protocol::{FeedResponse, PullResponse, PushResponse, SyncRequest};
pub use pull::{PullOutcome, TableError, DEFAULT_PAGE_SIZE};
pub use push::{PushError, PushOutcome};
pub use writer::ChangeWriter;

use crate::models::ChangeRecord;

/// Moves changes between a client and a sync server.
pub trait SyncTransport {
    fn push(
        &self,
        changes: &[ChangeRecord],
    ) -> impl Future<Output = Result<PushResponse, SyncClientError>> + Send;

    fn pull(
        &self,
        since: Option<&str>,
    ) -> impl Future<Output = Result<PullResponse, SyncClientError>> + Send;
}
