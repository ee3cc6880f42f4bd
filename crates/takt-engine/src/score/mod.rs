//! Incremental hard/soft scoring of a schedule.
//!
//! [`ScoreDirector`] owns the working [`crate::model::Schedule`] and keeps
//! every derived quantity (produced-per-slot, on-hand curves, demand-bucket
//! contributions, neighbour pairs, predecessor bookkeeping) consistent
//! under single-cell mutations. [`ScoreWeights`] holds the tunable
//! constants; signs and monotonicity are contractual and property-tested.

mod buckets;
mod director;
mod weights;

pub use buckets::{BucketEval, bucket_eval, priority_weight_x100};
pub use director::ScoreDirector;
pub use weights::ScoreWeights;

#[cfg(test)]
mod tests;
