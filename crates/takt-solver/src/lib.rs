//! takt-solver: move generation and the metaheuristic search driver.
//!
//! Construction fills demand backwards from its due slots, then a
//! late-acceptance hill climb with a tabu sample filter improves the
//! schedule for a wall-clock budget. The search owns a single
//! [`takt_engine::ScoreDirector`] per solve and relies on the scorer, not
//! move filtering, for feasibility.

pub mod construction;
pub mod moves;
pub mod search;

pub use moves::{Move, Undo};
pub use search::{Solved, Solver, SolverConfig};

use std::sync::atomic::AtomicBool;

use takt_common::{BuildError, MoveError};
use takt_engine::{ScoreDirector, SolveRequest, SolveResponse, build_problem};
use thiserror::Error;

/// Anything that can end a solve without a result.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SolveError {
    #[error(transparent)]
    Build(#[from] BuildError),
    #[error(transparent)]
    Move(#[from] MoveError),
}

/// End-to-end convenience: validate and build the request, run the solver
/// for its termination budget, serialise the best schedule found.
///
/// `stop` is the cooperative cancellation flag; setting it makes the
/// search return its current best within one move evaluation.
pub fn solve_request(request: &SolveRequest, stop: &AtomicBool) -> Result<SolveResponse, SolveError> {
    let (problem, schedule) = build_problem(request)?;
    let solver = Solver::new(
        SolverConfig::default()
            .with_termination_seconds(request.termination_seconds)
            .with_seed(request.seed),
    );
    let solved = solver.solve(&problem, schedule, stop)?;
    let director = ScoreDirector::new(&problem, solved.schedule);
    Ok(SolveResponse::from_director(&director))
}
