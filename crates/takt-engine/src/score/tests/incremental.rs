//! Targeted unit tests of the incremental delta paths.

use takt_common::{LineId, SlotId};

use crate::builder;
use crate::model::ShiftTag;
use crate::score::ScoreDirector;

use super::fixtures::{consumer_request, plain_problem, rich_problem, zero_weights};

#[test]
fn cached_score_matches_fresh_recompute_after_mutations() {
    let (problem, schedule) = rich_problem();
    let mut director = ScoreDirector::new(&problem, schedule);
    let l1 = LineId::new(0);
    let l2 = LineId::new(1);
    let r_a = problem.router_id("rA").unwrap();
    let r_b = problem.router_id("rB").unwrap();
    let r_c = problem.router_id("rC").unwrap();

    for (line, slot, router) in [
        (l1, 0, Some(r_c)),
        (l1, 1, Some(r_b)),
        (l1, 2, Some(r_b)),
        (l1, 5, Some(r_a)),
        (l2, 0, Some(r_b)),
        (l1, 1, None),
        (l1, 5, Some(r_c)),
        (l2, 0, Some(r_a)), // unsupported on L2
    ] {
        director.change_cell(line, SlotId::new(slot), router).unwrap();
        director.verify().unwrap();

        let fresh = ScoreDirector::new(&problem, director.clone_working());
        assert_eq!(director.score(), fresh.score());
    }
}

#[test]
fn apply_then_retract_restores_everything() {
    let (problem, schedule) = rich_problem();
    let mut director = ScoreDirector::new(&problem, schedule);
    let line = LineId::new(0);
    let r_b = problem.router_id("rB").unwrap();

    let before = director.score();
    let old = director
        .change_cell(line, SlotId::new(4), Some(r_b))
        .unwrap();
    assert_eq!(old, None);
    director.change_cell(line, SlotId::new(4), old).unwrap();
    assert_eq!(director.score(), before);
    director.verify().unwrap();
}

#[test]
fn unrelated_mutations_commute() {
    let (problem, schedule) = rich_problem();
    let r_b = problem.router_id("rB").unwrap();
    let r_c = problem.router_id("rC").unwrap();

    let mut forward = ScoreDirector::new(&problem, schedule.clone());
    forward
        .change_cell(LineId::new(0), SlotId::new(2), Some(r_c))
        .unwrap();
    forward
        .change_cell(LineId::new(1), SlotId::new(9), Some(r_b))
        .unwrap();

    let mut backward = ScoreDirector::new(&problem, schedule);
    backward
        .change_cell(LineId::new(1), SlotId::new(9), Some(r_b))
        .unwrap();
    backward
        .change_cell(LineId::new(0), SlotId::new(2), Some(r_c))
        .unwrap();

    assert_eq!(forward.score(), backward.score());
    forward.verify().unwrap();
    backward.verify().unwrap();
}

/// Crossing zero stock moves the shortfall from the soft safety term to
/// the hard deficit.
#[test]
fn safety_shortage_hands_over_to_deficit_below_zero() {
    let (problem, schedule) = builder::build_problem(&consumer_request(2, 2)).unwrap();
    let n = problem.n_slots() as i64;

    let mut w = zero_weights();
    w.safety = 1;
    let mut director = ScoreDirector::with_weights(&problem, schedule, w);
    let line = LineId::new(0);
    let r_p = problem.router_id("rP").unwrap();

    // Initially X sits exactly at safety stock: no shortage anywhere.
    assert_eq!(director.score().soft, 0);

    // One unit consumed per assigned slot; stock 1 from slot 0 onwards.
    director.change_cell(line, SlotId::new(0), Some(r_p)).unwrap();
    assert_eq!(director.score().soft, -n);
    assert_eq!(director.score().hard, 0);

    // Stock 0: shortage 2 per slot, still no hard deficit.
    director.change_cell(line, SlotId::new(1), Some(r_p)).unwrap();
    assert_eq!(director.score().soft, -(1 + 2 * (n - 1)));
    assert_eq!(director.score().hard, 0);

    // Stock −1 from slot 2 on: the safety term vanishes there and the
    // hard deficit takes over, one unit per slot.
    director.change_cell(line, SlotId::new(2), Some(r_p)).unwrap();
    assert_eq!(director.score().soft, -(1 + 2));
    assert_eq!(director.score().hard, -(n - 2));
    director.verify().unwrap();
}

/// An item that is nobody's child only ever gains stock from production.
#[test]
fn childless_item_production_raises_the_suffix_by_speed() {
    let (problem, schedule) = rich_problem();
    let mut director = ScoreDirector::new(&problem, schedule);
    let line = LineId::new(0);
    let a = problem.item_id("A").unwrap();
    let r_a = problem.router_id("rA").unwrap();
    let speed = problem.router(r_a).speed_per_hour;
    let s = 6u32;

    let before: Vec<i64> = (0..problem.n_slots())
        .map(|k| director.on_hand_at(a, SlotId::new(k as u32)))
        .collect();
    director.change_cell(line, SlotId::new(s), Some(r_a)).unwrap();
    for k in 0..problem.n_slots() {
        let expected = if (k as u32) < s {
            before[k]
        } else {
            before[k] + speed
        };
        assert_eq!(director.on_hand_at(a, SlotId::new(k as u32)), expected);
    }
}

#[test]
fn predecessor_violation_tracks_earliest_use() {
    let (problem, schedule) = rich_problem();
    let mut w = zero_weights();
    w.hard_predecessor = 1;
    let mut director = ScoreDirector::with_weights(&problem, schedule, w);
    let l1 = LineId::new(0);
    let l2 = LineId::new(1);
    let r_a = problem.router_id("rA").unwrap(); // requires rB earlier
    let r_b = problem.router_id("rB").unwrap();

    director.change_cell(l1, SlotId::new(5), Some(r_a)).unwrap();
    assert_eq!(director.score().hard, -1);

    // A later rB does not help.
    director.change_cell(l1, SlotId::new(7), Some(r_b)).unwrap();
    assert_eq!(director.score().hard, -1);

    // Same slot is still not strictly earlier.
    director.change_cell(l2, SlotId::new(5), Some(r_b)).unwrap();
    assert_eq!(director.score().hard, -1);

    // A strictly earlier rB satisfies the obligation, on any line.
    director.change_cell(l2, SlotId::new(3), Some(r_b)).unwrap();
    assert_eq!(director.score().hard, 0);

    // Retracting the earliest use reinstates the violation.
    director.change_cell(l2, SlotId::new(3), None).unwrap();
    assert_eq!(director.score().hard, -1);
    director.verify().unwrap();
}

#[test]
fn unsupported_router_costs_the_hard_weight_per_cell() {
    let (problem, schedule) = rich_problem();
    let mut w = zero_weights();
    w.hard_unsupported = 1_000;
    let mut director = ScoreDirector::with_weights(&problem, schedule, w);
    let l2 = LineId::new(1);
    let r_a = problem.router_id("rA").unwrap(); // L2 does not support rA

    director.change_cell(l2, SlotId::new(0), Some(r_a)).unwrap();
    assert_eq!(director.score().hard, -1_000);
    director.change_cell(l2, SlotId::new(1), Some(r_a)).unwrap();
    assert_eq!(director.score().hard, -2_000);
    director.change_cell(l2, SlotId::new(0), None).unwrap();
    assert_eq!(director.score().hard, -1_000);
    director.verify().unwrap();
}

#[test]
fn night_slots_price_their_production() {
    let (problem, schedule) = rich_problem();
    let mut w = zero_weights();
    w.night = 1;
    let mut director = ScoreDirector::with_weights(&problem, schedule, w);
    let line = LineId::new(0);
    let r_b = problem.router_id("rB").unwrap();
    let speed = problem.router(r_b).speed_per_hour;

    let day_slot = problem
        .slots
        .iter()
        .position(|s| s.shift == ShiftTag::Day)
        .unwrap() as u32;
    let night_slot = problem
        .slots
        .iter()
        .position(|s| s.shift == ShiftTag::Night)
        .unwrap() as u32;

    director
        .change_cell(line, SlotId::new(day_slot), Some(r_b))
        .unwrap();
    assert_eq!(director.score().soft, 0);
    director
        .change_cell(line, SlotId::new(night_slot), Some(r_b))
        .unwrap();
    assert_eq!(director.score().soft, -speed);
}

#[test]
fn changeovers_and_batches_price_adjacent_pairs() {
    let (problem, schedule) = plain_problem();
    let mut w = zero_weights();
    w.changeover = 50;
    w.batch = 5;
    let mut director = ScoreDirector::with_weights(&problem, schedule, w);
    let line = LineId::new(0);
    let r_a = problem.router_id("rA").unwrap();

    director.change_cell(line, SlotId::new(3), Some(r_a)).unwrap();
    assert_eq!(director.score().soft, 0);

    // Same router next door: one batch pair.
    director.change_cell(line, SlotId::new(4), Some(r_a)).unwrap();
    assert_eq!(director.score().soft, 5);
    director.change_cell(line, SlotId::new(5), Some(r_a)).unwrap();
    assert_eq!(director.score().soft, 10);

    // Idle gap breaks the run without a changeover.
    director.change_cell(line, SlotId::new(4), None).unwrap();
    assert_eq!(director.score().soft, 0);
    director.verify().unwrap();
}

#[test]
fn changeover_cost_scales_with_incoming_setup_time() {
    let (problem, schedule) = rich_problem();
    let mut w = zero_weights();
    w.changeover = 50;
    let mut director = ScoreDirector::with_weights(&problem, schedule, w);
    let line = LineId::new(0);
    let r_b = problem.router_id("rB").unwrap(); // setup 0
    let r_a = problem.router_id("rA").unwrap(); // setup 1

    director.change_cell(line, SlotId::new(0), Some(r_b)).unwrap();
    director.change_cell(line, SlotId::new(1), Some(r_a)).unwrap();
    // Incoming rA pays (1 + setup) × weight.
    assert_eq!(director.score().soft, -100);

    director.change_cell(line, SlotId::new(1), None).unwrap();
    director.change_cell(line, SlotId::new(0), Some(r_a)).unwrap();
    director.change_cell(line, SlotId::new(1), Some(r_b)).unwrap();
    // Incoming rB pays (1 + 0) × weight.
    assert_eq!(director.score().soft, -50);
}

#[test]
fn invalid_cell_keys_are_rejected_without_state_damage() {
    let (problem, schedule) = rich_problem();
    let mut director = ScoreDirector::new(&problem, schedule);
    let before = director.score();
    let r_a = problem.router_id("rA").unwrap();

    let bad = director.change_cell(LineId::new(9), SlotId::new(0), Some(r_a));
    assert!(bad.is_err());
    assert_eq!(director.score(), before);
    director.verify().unwrap();
}
