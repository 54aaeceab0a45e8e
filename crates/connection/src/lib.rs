//! Blocking facade over an asynchronous cluster client.
//!
//! A [`Connection`] owns one single-threaded execution context, the worker
//! thread that drives it, and the [`cluster::ClusterClient`] scheduled on it.
//! Callers on any other thread invoke blocking operations; each one is a
//! single submission to the client followed by a wait for its single
//! completion, through the [`RequestBridge`].
//!
//! ## Architectural Layer
//!
//! **Orchestration.** Depends on the `cluster` port and on `options` for
//! request population. Concrete clients are injected through a connector
//! closure, so this crate never names an adapter.
//!
//! ## Module Layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`bridge`] | `RequestBridge`: submit, then block on a one-shot channel |
//! | [`handle`] | `Connection`: start, open, buckets, version probe, teardown |
//! | [`dispatch`] | Document, query, analytics, view, search and index operations |

pub mod bridge;
pub mod dispatch;
pub mod handle;

pub use bridge::RequestBridge;
pub use dispatch::GetResult;
pub use handle::{Connection, WORKER_THREAD_NAME};
