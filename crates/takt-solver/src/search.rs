//! Late-acceptance local search with a tabu sample filter.
//!
//! The driver owns one score director per solve and runs single-threaded:
//! construction first, then random moves accepted against the current score
//! or the late-acceptance list. Recently touched cells are tabu unless the
//! move beats the best score found (aspiration). Termination is wall-clock
//! first, with an optional unimproved-step cap and a cooperative stop flag
//! checked every step.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use rustc_hash::FxHashSet;
use takt_common::{HardSoftScore, LineId, MoveError, RouterId, SlotId};
use takt_engine::{Problem, Schedule, ScoreDirector};
use tracing::{debug, info};

use crate::construction;
use crate::moves::Move;

#[derive(Debug, Clone)]
pub struct SolverConfig {
    pub termination: Duration,
    pub late_acceptance_size: usize,
    pub tabu_tenure: usize,
    /// Stop after this many consecutive non-improving steps, if set.
    pub unimproved_step_limit: Option<u64>,
    pub seed: u64,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            termination: Duration::from_secs(10),
            late_acceptance_size: 400,
            tabu_tenure: 16,
            unimproved_step_limit: None,
            seed: 0,
        }
    }
}

impl SolverConfig {
    pub fn with_termination_seconds(mut self, seconds: u64) -> Self {
        self.termination = Duration::from_secs(seconds);
        self
    }

    pub fn with_termination(mut self, termination: Duration) -> Self {
        self.termination = termination;
        self
    }

    pub fn with_late_acceptance_size(mut self, size: usize) -> Self {
        self.late_acceptance_size = size.max(1);
        self
    }

    pub fn with_tabu_tenure(mut self, tenure: usize) -> Self {
        self.tabu_tenure = tenure;
        self
    }

    pub fn with_unimproved_step_limit(mut self, limit: u64) -> Self {
        self.unimproved_step_limit = Some(limit);
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }
}

/// Result of one solve: the best schedule found and search statistics.
#[derive(Debug, Clone)]
pub struct Solved {
    pub schedule: Schedule,
    pub score: HardSoftScore,
    pub steps: u64,
    pub moves_evaluated: u64,
    pub elapsed: Duration,
}

pub struct Solver {
    config: SolverConfig,
}

impl Solver {
    pub fn new(config: SolverConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    /// Runs construction and improvement on `schedule`, returning the best
    /// solution observed. Honours `stop` at every step boundary.
    pub fn solve(
        &self,
        problem: &Problem,
        schedule: Schedule,
        stop: &AtomicBool,
    ) -> Result<Solved, MoveError> {
        let start = Instant::now();
        let mut director = ScoreDirector::new(problem, schedule);

        construction::construct(&mut director)?;
        let mut current = director.score();
        let mut best = current;
        let mut best_schedule = director.clone_working();
        info!(score = %current, "construction phase done");

        let mut rng = SmallRng::seed_from_u64(self.config.seed);
        let mut late = vec![current; self.config.late_acceptance_size.max(1)];
        let mut tabu_queue: VecDeque<(u32, u32)> = VecDeque::new();
        let mut tabu_set: FxHashSet<(u32, u32)> = FxHashSet::default();

        let mut steps = 0u64;
        let mut evaluated = 0u64;
        let mut unimproved = 0u64;

        while start.elapsed() < self.config.termination {
            if stop.load(Ordering::Relaxed) {
                debug!(steps, "stop signal observed");
                break;
            }
            if let Some(limit) = self.config.unimproved_step_limit {
                if unimproved >= limit {
                    debug!(steps, limit, "unimproved step limit reached");
                    break;
                }
            }

            let mv = propose(&mut rng, problem);
            let primary = mv.primary_cell();
            let primary_key = (primary.0.raw(), primary.1.raw());

            let undo = mv.apply(&mut director)?;
            evaluated += 1;
            let candidate = director.score();

            let slot = (steps as usize) % late.len();
            let accept = if tabu_set.contains(&primary_key) {
                candidate > best
            } else {
                candidate >= current || candidate >= late[slot]
            };

            if accept {
                current = candidate;
                if self.config.tabu_tenure > 0 && tabu_set.insert(primary_key) {
                    tabu_queue.push_back(primary_key);
                    if tabu_queue.len() > self.config.tabu_tenure {
                        if let Some(expired) = tabu_queue.pop_front() {
                            tabu_set.remove(&expired);
                        }
                    }
                }
                if candidate > best {
                    best = candidate;
                    best_schedule = director.clone_working();
                    unimproved = 0;
                    debug!(score = %best, steps, "new best");
                } else {
                    unimproved += 1;
                }
            } else {
                undo.revert(&mut director)?;
                unimproved += 1;
            }
            late[slot] = current;
            steps += 1;
        }

        let elapsed = start.elapsed();
        info!(
            score = %best,
            steps,
            evaluated,
            elapsed_ms = elapsed.as_millis() as u64,
            "solve finished"
        );
        Ok(Solved {
            schedule: best_schedule,
            score: best,
            steps,
            moves_evaluated: evaluated,
            elapsed,
        })
    }
}

/// Random move, biased towards single-cell changes. Routers are drawn from
/// the line's supported set (idle included); chain lengths derive from the
/// router's min batch size.
fn propose(rng: &mut SmallRng, problem: &Problem) -> Move {
    let n_lines = problem.n_lines() as u32;
    let n_slots = problem.n_slots() as u32;
    let line = LineId::new(rng.gen_range(0..n_lines));
    let slot = SlotId::new(rng.gen_range(0..n_slots));

    match rng.gen_range(0..10u8) {
        0..=6 => Move::ChangeRouter {
            line,
            slot,
            router: random_router(rng, problem, line),
        },
        7..=8 => {
            let other_line = LineId::new(rng.gen_range(0..n_lines));
            let other_slot = SlotId::new(rng.gen_range(0..n_slots));
            Move::SwapRouters {
                a: (line, slot),
                b: (other_line, other_slot),
            }
        }
        _ => {
            let router = random_router(rng, problem, line);
            let len = match router {
                Some(r) => {
                    let router = problem.router(r);
                    if router.speed_per_hour > 0 && router.min_batch_size > 0 {
                        let hours =
                            (router.min_batch_size + router.speed_per_hour - 1) / router.speed_per_hour;
                        hours.clamp(2, 6) as u32
                    } else {
                        rng.gen_range(2..=4)
                    }
                }
                None => rng.gen_range(2..=4),
            };
            Move::ChainChange {
                line,
                start: slot,
                len,
                router,
            }
        }
    }
}

fn random_router(rng: &mut SmallRng, problem: &Problem, line: LineId) -> Option<RouterId> {
    let supported = &problem.line(line).supported;
    if supported.is_empty() {
        return None;
    }
    let pick = rng.gen_range(0..=supported.len());
    (pick < supported.len()).then(|| supported[pick])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_builders_compose() {
        let config = SolverConfig::default()
            .with_termination_seconds(3)
            .with_late_acceptance_size(0)
            .with_tabu_tenure(8)
            .with_unimproved_step_limit(500)
            .with_seed(42);
        assert_eq!(config.termination, Duration::from_secs(3));
        // A zero late list would divide by zero; clamped to 1.
        assert_eq!(config.late_acceptance_size, 1);
        assert_eq!(config.unimproved_step_limit, Some(500));
        assert_eq!(config.seed, 42);
    }
}
