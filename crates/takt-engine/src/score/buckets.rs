//! Per-bucket contribution math.
//!
//! Pure functions of (bucket, cumulative production at due). Both the full
//! rebuild and the incremental delta path go through [`bucket_eval`], so a
//! cached contribution can always be reproduced exactly.

use crate::model::DemandBucket;

use super::ScoreWeights;

/// Priority weight on a ×100 fixed-point scale: `0.5 + (p − 1) · 0.28`,
/// with derived priority 0 clamped to priority 1. Monotonic and bounded.
#[inline]
pub fn priority_weight_x100(priority: u8) -> i64 {
    50 + (priority.max(1) as i64 - 1) * 28
}

/// Evaluation of one bucket at a given cumulative production level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BucketEval {
    /// Signed soft contribution (prop + complete − unmet − over).
    pub contribution: i64,
    /// Demand units still unmet; feeds the hard score.
    pub unmet_units: i64,
}

/// Scores `bucket` given the item's cumulative production over
/// `[0..=due_slot]`. Production is allocated to the item's buckets in
/// (due asc, priority desc) order via `prev_demand_sum`.
pub fn bucket_eval(bucket: &DemandBucket, produced_cum_at_due: i64, w: &ScoreWeights) -> BucketEval {
    let demand = bucket.quantity;
    if demand <= 0 {
        return BucketEval {
            contribution: 0,
            unmet_units: 0,
        };
    }

    let available = (produced_cum_at_due - bucket.prev_demand_sum).max(0);
    let pw = priority_weight_x100(bucket.priority);
    let tol_units = w.tolerance_units(demand);

    let prop = available.min(demand) * 1000 / demand * w.prop * pw / 100;
    let complete = if available >= demand && available <= demand + tol_units {
        w.complete * pw / 100
    } else {
        0
    };
    let unmet_units = (demand - available).max(0);
    let unmet = unmet_units * w.unmet * pw / 100;
    let tolerated = (tol_units - 1).max(0);
    let over = (available - demand - tolerated).max(0) * w.over * pw / 100;

    BucketEval {
        contribution: prop + complete - unmet - over,
        unmet_units,
    }
}
