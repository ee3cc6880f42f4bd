//! takt-engine: production scheduling core.
//!
//! Provides the planning data model (items, BOM arcs, routers, lines, time
//! slots, demand buckets), the work calendar, multi-level demand expansion,
//! and the incremental score director that prices a schedule under
//! single-cell mutations.

pub mod builder;
pub mod calendar;
pub mod demand;
pub mod model;
pub mod request;
pub mod response;
pub mod score;

pub use builder::build_problem;
pub use calendar::WorkCalendar;
pub use model::{
    BomArc, DemandBucket, Item, Problem, ProductionLine, Router, Schedule, ShiftTag, TimeSlot,
};
pub use request::SolveRequest;
pub use response::SolveResponse;
pub use score::{ScoreDirector, ScoreWeights};

pub use takt_common::{
    BuildError, HardSoftScore, InvariantViolation, ItemId, LineId, MoveError, RouterId, SlotId,
};
