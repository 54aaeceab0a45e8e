//! In-process cluster for tests and local runs.
//!
//! [`MemoryCluster`] holds buckets, documents, users and scripted service
//! results behind one lock. Each [`MemoryClient`] implements
//! [`cluster::ClusterClient`] by spawning its work on the runtime it was
//! created with, so completions fire on the connection's worker thread just
//! as a networked client's would.
//!
//! ## Architectural Layer
//!
//! **Adapter.** Implements the `cluster` port. Nothing leaves the process.
//!
//! ## Module Layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | `memory` | `MemoryCluster` handle, shared state, `Fault` |
//! | `client` | `MemoryClient`: the `ClusterClient` implementation |
//! | `store` | Documents with CAS, sequence numbers and tombstones |
//! | `fixture` | JSON fixtures for seeding a cluster |

mod client;
mod fixture;
mod memory;
mod store;

pub use client::MemoryClient;
pub use fixture::{Fixture, FixtureDocument, FixtureError, FixtureNode};
pub use memory::{Fault, MemoryCluster, DEFAULT_VERSION};
