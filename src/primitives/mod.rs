//! Building blocks shared by both recommenders.
//!
//! Includes sparse vector math, deterministic score ranking and the
//! build-once cell guarding lazily materialized models.

/// Build-once state cells.
///
/// Serialize the first build of a model across threads and hand out shared
/// read-only snapshots afterwards.
pub mod concurrency;

/// Deterministic ranking of scored keys.
///
/// Sorting helpers with pinned tie-breaking so equal scores never reorder
/// between runs.
pub mod rank;

/// Sparse vectors and cosine similarity.
pub mod vector;
