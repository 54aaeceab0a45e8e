//! Option-map population for the cluster bridge.
//!
//! Host code hands every operation an options value: a JSON object keyed by
//! host names (`timeoutMilliseconds`, `durabilityLevel`, ...). This crate turns
//! identifiers plus that object into a populated request from
//! [`cluster::operations`], or the first validation error, before anything is
//! dispatched.
//!
//! ## Module Layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`table`] | `OptionField`/`Setter` descriptors and `populate` |
//! | [`requests`] | One builder per operation |
//! | [`cluster`] | Cluster options, credentials, `cluster_origin` |

pub mod cluster;
pub mod requests;
pub mod table;

pub use crate::cluster::{apply_cluster_options, cluster_origin, extract_credentials};
pub use requests::{
    analytics_request, design_document_namespace, exists_request, get_request, insert_request,
    query_request, remove_request, replace_request, search_index_upsert_request, search_request,
    upsert_request, view_request, GetOperation,
};
pub use table::{populate, populate_object, OptionField, Setter};
