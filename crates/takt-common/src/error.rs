//! Failure taxonomy of the scheduler.
//!
//! - **`BuildError`**: input validation, surfaced to the caller before any
//!   engine state is allocated; retrying without changing the request is
//!   pointless.
//! - **`MoveError`**: a mutation addressed a cell that does not exist.
//! - **`InvariantViolation`**: a cached quantity in the score director
//!   disagrees with a fresh recomputation. Programmer bug; `reset` is the
//!   only recovery.
//!
//! Infeasibility is deliberately *not* here: an overloaded plant is a valid
//! solve result with a negative hard score, not an error.

use thiserror::Error;

/// Request validation failures. All of these abort the solve before the
/// problem model exists.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
    #[error("calendar has no shifts")]
    EmptyShifts,

    #[error("calendar has no work dates; the horizon is empty")]
    MissingWorkDates,

    #[error("request defines no production lines")]
    EmptyLines,

    #[error("slot generation produced an empty horizon")]
    EmptyHorizon,

    #[error("unknown item code '{0}'")]
    UnknownItem(String),

    #[error("unknown router code '{0}'")]
    UnknownRouter(String),

    #[error("duplicate {kind} code '{code}'")]
    DuplicateCode { kind: &'static str, code: String },

    #[error("bill of materials contains a cycle through item '{0}'")]
    BomCycle(String),

    #[error("{field} out of range: {value} (expected {expected})")]
    OutOfRange {
        field: &'static str,
        value: i64,
        expected: &'static str,
    },

    #[error("invalid date '{0}' (expected YYYY-MM-DD)")]
    InvalidDate(String),
}

/// Mutation addressed a (line, slot) key outside the fixed cell set.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MoveError {
    #[error("no assignment cell at line {line}, slot {slot}")]
    InvalidCellKey { line: u32, slot: u32 },
}

/// First cached quantity found to disagree with a from-scratch
/// recomputation, with enough context to locate it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvariantViolation {
    /// Name of the cached quantity, e.g. `on_hand` or `changeover_penalty`.
    pub quantity: &'static str,
    /// Optional coordinates, e.g. `item 3, slot 17`.
    pub location: Option<String>,
    pub cached: i64,
    pub recomputed: i64,
}

impl InvariantViolation {
    pub fn new(quantity: &'static str, cached: i64, recomputed: i64) -> Self {
        Self {
            quantity,
            location: None,
            cached,
            recomputed,
        }
    }

    pub fn with_location<S: Into<String>>(mut self, loc: S) -> Self {
        self.location = Some(loc.into());
        self
    }
}

impl std::fmt::Display for InvariantViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "incremental consistency broken: {}", self.quantity)?;
        if let Some(ref loc) = self.location {
            write!(f, " at {loc}")?;
        }
        write!(f, " cached {}, recomputed {}", self.cached, self.recomputed)
    }
}

impl std::error::Error for InvariantViolation {}
