//! Scoring constants.

/// Weight set of the score director. Values may be tuned per deployment;
/// the signs and the monotonicity of the derived terms are contractual.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoreWeights {
    /// Hard weight per cell whose line does not support its router.
    pub hard_unsupported: i64,
    /// Hard weight per unsatisfied predecessor obligation.
    pub hard_predecessor: i64,
    /// Hard weight per demand unit still unmet at its due slot.
    pub hard_unmet: i64,
    /// Hard weight per deficit unit on items that are BOM children, on top
    /// of the plain inventory deficit.
    pub hard_bom_shortage: i64,

    /// Soft reward per ‰ of bucket completion (priority-weighted).
    pub prop: i64,
    /// Soft bonus for a bucket filled to within tolerance.
    pub complete: i64,
    /// Soft penalty per unmet demand unit.
    pub unmet: i64,
    /// Soft penalty per unit over demand beyond the tolerated overshoot.
    pub over: i64,
    /// Soft penalty per unit·slot held above safety stock.
    pub holding: i64,
    /// Soft penalty per unit·slot below safety stock (non-negative stock).
    pub safety: i64,
    /// Soft penalty per changeover pair, scaled by the incoming router's
    /// setup time.
    pub changeover: i64,
    /// Soft reward per adjacent same-router pair.
    pub batch: i64,
    /// Soft penalty per unit produced in a night slot.
    pub night: i64,

    /// Completion tolerance as a fraction `num/den` of bucket demand.
    pub tolerance_num: i64,
    pub tolerance_den: i64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            hard_unsupported: 1_000,
            hard_predecessor: 100,
            hard_unmet: 1,
            hard_bom_shortage: 1,
            prop: 1,
            complete: 500,
            unmet: 10,
            over: 2,
            holding: 1,
            safety: 2,
            changeover: 50,
            batch: 5,
            night: 1,
            tolerance_num: 1,
            tolerance_den: 100,
        }
    }
}

impl ScoreWeights {
    /// Units of overshoot tolerated before the over-production penalty and
    /// after which the completion bonus lapses: `ceil(demand · tol)`.
    #[inline]
    pub fn tolerance_units(&self, demand: i64) -> i64 {
        (demand * self.tolerance_num + self.tolerance_den - 1) / self.tolerance_den
    }
}
