//! Mutation moves over the assignment cells.
//!
//! Moves never pre-filter feasibility beyond the line's supported-router
//! set used at proposal time; the scorer prices anything hard. Applying a
//! move yields an [`Undo`] that restores the exact prior assignments.

use smallvec::SmallVec;
use takt_common::{LineId, MoveError, RouterId, SlotId};
use takt_engine::ScoreDirector;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Move {
    /// Set one cell to a router (or idle).
    ChangeRouter {
        line: LineId,
        slot: SlotId,
        router: Option<RouterId>,
    },
    /// Exchange the assignments of two cells.
    SwapRouters {
        a: (LineId, SlotId),
        b: (LineId, SlotId),
    },
    /// Assign a contiguous block on one line to the same router, to build
    /// or clear batches in one step.
    ChainChange {
        line: LineId,
        start: SlotId,
        len: u32,
        router: Option<RouterId>,
    },
}

/// Captured prior assignments, reverted in reverse order.
#[derive(Debug)]
pub struct Undo(SmallVec<[(LineId, SlotId, Option<RouterId>); 6]>);

impl Undo {
    pub fn revert(self, director: &mut ScoreDirector<'_>) -> Result<(), MoveError> {
        for (line, slot, router) in self.0.into_iter().rev() {
            director.change_cell(line, slot, router)?;
        }
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Move {
    /// The cell keyed for tabu bookkeeping.
    pub fn primary_cell(&self) -> (LineId, SlotId) {
        match *self {
            Move::ChangeRouter { line, slot, .. } => (line, slot),
            Move::SwapRouters { a, .. } => a,
            Move::ChainChange { line, start, .. } => (line, start),
        }
    }

    /// Applies the move through the director and returns the undo record.
    /// Cells that already hold the target value still record, so a swap of
    /// equal routers stays reversible.
    pub fn apply(&self, director: &mut ScoreDirector<'_>) -> Result<Undo, MoveError> {
        let mut undo = SmallVec::new();
        match *self {
            Move::ChangeRouter { line, slot, router } => {
                let old = director.change_cell(line, slot, router)?;
                undo.push((line, slot, old));
            }
            Move::SwapRouters { a, b } => {
                let ra = director.working().router_at(a.0, a.1);
                let rb = director.working().router_at(b.0, b.1);
                let old_a = director.change_cell(a.0, a.1, rb)?;
                undo.push((a.0, a.1, old_a));
                let old_b = director.change_cell(b.0, b.1, ra)?;
                undo.push((b.0, b.1, old_b));
            }
            Move::ChainChange {
                line,
                start,
                len,
                router,
            } => {
                let n_slots = director.working().n_slots();
                let end = (start.raw() + len).min(n_slots);
                for s in start.raw()..end {
                    let slot = SlotId::new(s);
                    let old = director.change_cell(line, slot, router)?;
                    undo.push((line, slot, old));
                }
            }
        }
        Ok(Undo(undo))
    }
}
