//! The mutable solution: one `Option<RouterId>` per (line, slot) cell.
//!
//! Cells are stored densely (`line * n_slots + slot`) so neighbour lookup
//! on a line is O(1). The cell set is fixed at construction; the only
//! mutation path is [`crate::score::ScoreDirector::change_cell`], which
//! brackets the write with retract/apply bookkeeping.

use takt_common::{LineId, MoveError, RouterId, SlotId};

use super::Problem;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schedule {
    n_lines: u32,
    n_slots: u32,
    assignments: Vec<Option<RouterId>>,
}

impl Schedule {
    /// All-idle schedule sized for `problem`.
    pub fn empty(problem: &Problem) -> Self {
        Self {
            n_lines: problem.n_lines() as u32,
            n_slots: problem.n_slots() as u32,
            assignments: vec![None; problem.n_lines() * problem.n_slots()],
        }
    }

    #[inline]
    pub fn n_lines(&self) -> u32 {
        self.n_lines
    }

    #[inline]
    pub fn n_slots(&self) -> u32 {
        self.n_slots
    }

    #[inline]
    pub fn cell_count(&self) -> usize {
        self.assignments.len()
    }

    #[inline]
    fn offset(&self, line: LineId, slot: SlotId) -> usize {
        line.as_index() * self.n_slots as usize + slot.as_index()
    }

    pub fn check_key(&self, line: LineId, slot: SlotId) -> Result<(), MoveError> {
        if line.raw() < self.n_lines && slot.raw() < self.n_slots {
            Ok(())
        } else {
            Err(MoveError::InvalidCellKey {
                line: line.raw(),
                slot: slot.raw(),
            })
        }
    }

    /// Router currently assigned to the cell, `None` = idle.
    #[inline]
    pub fn router_at(&self, line: LineId, slot: SlotId) -> Option<RouterId> {
        self.assignments[self.offset(line, slot)]
    }

    /// Raw write. Crate-private: callers outside the engine go through the
    /// score director so cached state stays consistent.
    #[inline]
    pub(crate) fn set_router(&mut self, line: LineId, slot: SlotId, router: Option<RouterId>) {
        let off = self.offset(line, slot);
        self.assignments[off] = router;
    }

    /// Iterate every cell as `(line, slot, router)`.
    pub fn iter_cells(&self) -> impl Iterator<Item = (LineId, SlotId, Option<RouterId>)> + '_ {
        let n_slots = self.n_slots as usize;
        self.assignments.iter().enumerate().map(move |(i, &r)| {
            (
                LineId::new((i / n_slots) as u32),
                SlotId::new((i % n_slots) as u32),
                r,
            )
        })
    }

    /// Number of non-idle cells.
    pub fn assigned_count(&self) -> usize {
        self.assignments.iter().filter(|r| r.is_some()).count()
    }
}
