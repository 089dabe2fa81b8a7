//! Upstream payload decoding and normalization.
//!
//! [`raw`] models the heterogeneous record shapes the aggregation service
//! forwards from its providers. [`normalizer`] folds them into
//! [`NormalizedEvent`](crate::domain::NormalizedEvent) display records.

pub mod normalizer;
pub mod raw;

pub use normalizer::{normalize, normalize_batch, parse_instant, NormalizedBatch};
pub use raw::RawEventRecord;
