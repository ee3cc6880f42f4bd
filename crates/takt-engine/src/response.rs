//! JSON data contract: the solve result.
//!
//! Consecutive same-router cells on a line are merged into one assignment
//! span with wall-clock start/end times; the inventory section reports a
//! balance point wherever an item's stock or production moves.

use serde::{Deserialize, Serialize};
use takt_common::HardSoftScore;

use crate::model::ShiftTag;
use crate::score::ScoreDirector;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SolveResponse {
    pub score: HardSoftScore,
    pub feasible: bool,
    pub assignments: Vec<AssignmentSpan>,
    pub inventory: Vec<ItemTimeline>,
}

/// A maximal run of consecutive slots on one line running one router.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentSpan {
    pub line: String,
    pub router: String,
    pub item: String,
    /// ISO start of the first hour.
    pub start_time: String,
    /// ISO end of the last hour.
    pub end_time: String,
    /// Number of slots in the run.
    pub hours: u32,
    /// Units produced over the run.
    pub quantity: i64,
    pub night_hours: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemTimeline {
    pub item: String,
    pub points: Vec<InventoryPoint>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryPoint {
    pub time: String,
    pub produced: i64,
    pub balance: i64,
}

impl SolveResponse {
    /// Serialises the director's working schedule. The director's cache is
    /// the source of truth for production and balances.
    pub fn from_director(director: &ScoreDirector<'_>) -> Self {
        let problem = director.problem();
        let schedule = director.working();
        let calendar = &problem.calendar;
        let score = director.score();

        let iso = |absolute_hour: i64| -> String {
            calendar
                .date_time_of_hour(absolute_hour)
                .map(|ts| ts.format("%Y-%m-%dT%H:%M:%S").to_string())
                .unwrap_or_default()
        };

        let mut assignments = Vec::new();
        for l in 0..problem.n_lines() {
            let line = takt_common::LineId::new(l as u32);
            let mut run: Option<(takt_common::RouterId, usize, usize)> = None;
            for s in 0..=problem.n_slots() {
                let here = if s < problem.n_slots() {
                    schedule.router_at(line, takt_common::SlotId::new(s as u32))
                } else {
                    None
                };
                match (run, here) {
                    (Some((r, start, _)), Some(h)) if h == r => {
                        run = Some((r, start, s));
                    }
                    (prev, next) => {
                        if let Some((r, start, end)) = prev {
                            assignments.push(span(director, line, r, start, end, &iso));
                        }
                        run = next.map(|r| (r, s, s));
                    }
                }
            }
        }

        let mut inventory = Vec::new();
        for i in 0..problem.n_items() {
            let item = takt_common::ItemId::new(i as u32);
            let mut points = Vec::new();
            let mut prev_balance = problem.initial_on_hand[i];
            for s in 0..problem.n_slots() {
                let slot = takt_common::SlotId::new(s as u32);
                let produced = director.produced_at(item, slot);
                let balance = director.on_hand_at(item, slot);
                if produced != 0 || balance != prev_balance {
                    points.push(InventoryPoint {
                        time: iso(problem.slot(slot).absolute_hour),
                        produced,
                        balance,
                    });
                }
                prev_balance = balance;
            }
            if !points.is_empty() {
                inventory.push(ItemTimeline {
                    item: problem.items[i].code.clone(),
                    points,
                });
            }
        }

        SolveResponse {
            score,
            feasible: score.is_feasible(),
            assignments,
            inventory,
        }
    }
}

fn span(
    director: &ScoreDirector<'_>,
    line: takt_common::LineId,
    r: takt_common::RouterId,
    start: usize,
    end: usize,
    iso: &impl Fn(i64) -> String,
) -> AssignmentSpan {
    let problem = director.problem();
    let router = problem.router(r);
    let hours = (end - start + 1) as u32;
    let night_hours = (start..=end)
        .filter(|&s| problem.slot(takt_common::SlotId::new(s as u32)).shift == ShiftTag::Night)
        .count() as u32;
    AssignmentSpan {
        line: problem.line(line).code.clone(),
        router: router.code.clone(),
        item: problem.item(router.item).code.clone(),
        start_time: iso(problem.slot(takt_common::SlotId::new(start as u32)).absolute_hour),
        end_time: iso(problem.slot(takt_common::SlotId::new(end as u32)).absolute_hour + 1),
        hours,
        quantity: router.speed_per_hour * hours as i64,
        night_hours,
    }
}
