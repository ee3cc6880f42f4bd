//! Hard/soft score pair.
//!
//! Hard counts constraint violations (feasible ⇔ `hard == 0`, never
//! positive); soft is operational cost/reward. Comparison is lexicographic:
//! any hard improvement beats any soft improvement.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Sub};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct HardSoftScore {
    pub hard: i64,
    pub soft: i64,
}

impl HardSoftScore {
    pub const ZERO: HardSoftScore = HardSoftScore { hard: 0, soft: 0 };

    #[inline]
    pub fn new(hard: i64, soft: i64) -> Self {
        Self { hard, soft }
    }

    /// A solution is feasible when no hard constraint is broken.
    #[inline]
    pub fn is_feasible(self) -> bool {
        self.hard >= 0
    }
}

impl PartialOrd for HardSoftScore {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HardSoftScore {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.hard
            .cmp(&other.hard)
            .then(self.soft.cmp(&other.soft))
    }
}

impl Add for HardSoftScore {
    type Output = HardSoftScore;

    fn add(self, rhs: HardSoftScore) -> HardSoftScore {
        HardSoftScore::new(self.hard + rhs.hard, self.soft + rhs.soft)
    }
}

impl Sub for HardSoftScore {
    type Output = HardSoftScore;

    fn sub(self, rhs: HardSoftScore) -> HardSoftScore {
        HardSoftScore::new(self.hard - rhs.hard, self.soft - rhs.soft)
    }
}

impl fmt::Display for HardSoftScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}hard/{}soft", self.hard, self.soft)
    }
}
