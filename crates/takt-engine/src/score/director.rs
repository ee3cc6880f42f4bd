//! The incremental score director.
//!
//! Owns the working schedule and a cache of every derived quantity. A cell
//! mutation goes retract → write → apply; each phase touches only the
//! produced/on-hand suffixes of the affected item and its BOM children, the
//! demand buckets due at or after the slot, the two neighbour pairs on the
//! line, and the predecessor bookkeeping of the affected router. Worst case
//! O(N + K) per mutation for horizon length N and K buckets of the item.
//!
//! `verify()` recomputes the whole cache from scratch and reports the first
//! disagreement; the property tests drive random mutation sequences
//! through it.

use std::collections::BTreeMap;

use takt_common::{
    HardSoftScore, InvariantViolation, ItemId, LineId, MoveError, RouterId, SlotId,
};

use crate::model::{PredPair, Problem, Schedule, ShiftTag};

use super::buckets::bucket_eval;
use super::weights::ScoreWeights;

#[derive(Debug, Clone, PartialEq, Eq)]
struct CachedState {
    n_slots: usize,

    /// Units of each item produced per slot, `item * n_slots + slot`.
    produced: Vec<i64>,
    /// End-of-slot stock balance per item, same indexing.
    /// `on_hand[s] = on_hand[s-1] − consumed_as_child[s] + produced[s]`,
    /// starting from the item's initial on hand.
    on_hand: Vec<i64>,

    hard_inventory_deficit: i64,
    hard_bom_shortage: i64,
    hard_unmet: i64,

    /// Per bucket: cumulative production of its item over `[0..=due]`.
    produced_cum_at_due: Vec<i64>,
    /// Per bucket: its current soft contribution.
    cached_contribution: Vec<i64>,
    bucket_total: i64,

    holding_penalty: i64,
    safety_shortage_penalty: i64,
    changeover_penalty: i64,
    batch_reward: i64,
    night_shift_cost: i64,
    unsupported_count: i64,

    /// Per router: multiset of slots it currently occupies.
    router_slots: Vec<BTreeMap<u32, u32>>,
    /// Per predecessor pair: count of successor cells with no earlier
    /// predecessor use.
    pair_violations: Vec<i64>,
    predecessor_violations: i64,
}

#[inline]
fn neg_part(x: i64) -> i64 {
    (-x).max(0)
}

#[inline]
fn holding_at(on_hand: i64, safety: i64, w: i64) -> i64 {
    (on_hand - safety).max(0) * w
}

/// Safety shortage applies only while stock is non-negative; below zero the
/// shortfall is a hard deficit instead.
#[inline]
fn safety_short_at(on_hand: i64, safety: i64, w: i64) -> i64 {
    if on_hand >= 0 {
        (safety - on_hand).max(0) * w
    } else {
        0
    }
}

/// (changeover, batch) contribution of one adjacent pair on a line.
/// Changeover cost scales with the incoming router's setup time.
#[inline]
fn pair_value(
    problem: &Problem,
    w: &ScoreWeights,
    a: Option<RouterId>,
    b: Option<RouterId>,
) -> (i64, i64) {
    match (a, b) {
        (Some(x), Some(y)) if x == y => (0, w.batch),
        (Some(_), Some(y)) => (
            w.changeover * (1 + problem.router(y).setup_time_hours as i64),
            0,
        ),
        _ => (0, 0),
    }
}

/// A successor cell at slot `s` violates the pair iff the predecessor has
/// no use at any slot `< s`, i.e. `s <= min_slot(pred)` or pred unused.
fn count_pair_violations(router_slots: &[BTreeMap<u32, u32>], pair: &PredPair) -> i64 {
    let successor_map = &router_slots[pair.successor.as_index()];
    match router_slots[pair.predecessor.as_index()].keys().next() {
        None => successor_map.values().map(|&c| c as i64).sum(),
        Some(&min_p) => successor_map
            .range(..=min_p)
            .map(|(_, &c)| c as i64)
            .sum(),
    }
}

impl CachedState {
    fn recompute(problem: &Problem, schedule: &Schedule, w: &ScoreWeights) -> Self {
        let n_items = problem.n_items();
        let n_slots = problem.n_slots();
        let mut state = CachedState {
            n_slots,
            produced: vec![0; n_items * n_slots],
            on_hand: vec![0; n_items * n_slots],
            hard_inventory_deficit: 0,
            hard_bom_shortage: 0,
            hard_unmet: 0,
            produced_cum_at_due: vec![0; problem.buckets.len()],
            cached_contribution: vec![0; problem.buckets.len()],
            bucket_total: 0,
            holding_penalty: 0,
            safety_shortage_penalty: 0,
            changeover_penalty: 0,
            batch_reward: 0,
            night_shift_cost: 0,
            unsupported_count: 0,
            router_slots: vec![BTreeMap::new(); problem.n_routers()],
            pair_violations: vec![0; problem.pred_pairs.len()],
            predecessor_violations: 0,
        };

        for (line, slot, assigned) in schedule.iter_cells() {
            let Some(r) = assigned else { continue };
            let router = problem.router(r);
            state.produced[router.item.as_index() * n_slots + slot.as_index()] +=
                router.speed_per_hour;
            if problem.slot(slot).shift == ShiftTag::Night {
                state.night_shift_cost += router.speed_per_hour * w.night;
            }
            if !problem.supports(line, r) {
                state.unsupported_count += 1;
            }
            *state.router_slots[r.as_index()]
                .entry(slot.raw())
                .or_insert(0) += 1;
        }

        for i in 0..n_items {
            let base = i * n_slots;
            let safety = problem.safety_stock[i];
            let is_child = problem.is_bom_child[i];
            let mut oh = problem.initial_on_hand[i];
            for s in 0..n_slots {
                let mut consumed = 0;
                for &(parent, qty) in &problem.arcs_by_child[i] {
                    consumed += state.produced[parent.as_index() * n_slots + s] * qty;
                }
                oh = oh - consumed + state.produced[base + s];
                state.on_hand[base + s] = oh;
                state.hard_inventory_deficit += neg_part(oh);
                if is_child {
                    state.hard_bom_shortage += neg_part(oh);
                }
                state.holding_penalty += holding_at(oh, safety, w.holding);
                state.safety_shortage_penalty += safety_short_at(oh, safety, w.safety);
            }
        }

        for (i, per_item) in problem.buckets_by_item.iter().enumerate() {
            let base = i * n_slots;
            let mut cum = 0;
            let mut s = 0;
            for &b in per_item {
                let due = problem.buckets[b].due_slot.as_index();
                while s <= due {
                    cum += state.produced[base + s];
                    s += 1;
                }
                state.produced_cum_at_due[b] = cum;
                let eval = bucket_eval(&problem.buckets[b], cum, w);
                state.cached_contribution[b] = eval.contribution;
                state.bucket_total += eval.contribution;
                state.hard_unmet += eval.unmet_units;
            }
        }

        for l in 0..problem.n_lines() {
            let line = LineId::new(l as u32);
            for s in 1..n_slots {
                let (c, b) = pair_value(
                    problem,
                    w,
                    schedule.router_at(line, SlotId::new((s - 1) as u32)),
                    schedule.router_at(line, SlotId::new(s as u32)),
                );
                state.changeover_penalty += c;
                state.batch_reward += b;
            }
        }

        for (idx, pair) in problem.pred_pairs.iter().enumerate() {
            let viol = count_pair_violations(&state.router_slots, pair);
            state.pair_violations[idx] = viol;
            state.predecessor_violations += viol;
        }

        state
    }
}

/// Incremental score calculator over a working schedule.
pub struct ScoreDirector<'p> {
    problem: &'p Problem,
    weights: ScoreWeights,
    schedule: Schedule,
    state: CachedState,
}

impl<'p> ScoreDirector<'p> {
    pub fn new(problem: &'p Problem, schedule: Schedule) -> Self {
        Self::with_weights(problem, schedule, ScoreWeights::default())
    }

    pub fn with_weights(problem: &'p Problem, schedule: Schedule, weights: ScoreWeights) -> Self {
        let state = CachedState::recompute(problem, &schedule, &weights);
        Self {
            problem,
            weights,
            schedule,
            state,
        }
    }

    #[inline]
    pub fn problem(&self) -> &'p Problem {
        self.problem
    }

    #[inline]
    pub fn weights(&self) -> &ScoreWeights {
        &self.weights
    }

    #[inline]
    pub fn working(&self) -> &Schedule {
        &self.schedule
    }

    pub fn clone_working(&self) -> Schedule {
        self.schedule.clone()
    }

    pub fn into_working(self) -> Schedule {
        self.schedule
    }

    /// Rebuilds the entire cache from the current schedule. The only
    /// recovery action after a failed [`Self::verify`].
    pub fn reset(&mut self) {
        self.state = CachedState::recompute(self.problem, &self.schedule, &self.weights);
    }

    /// Replaces the working schedule wholesale and rebuilds the cache.
    pub fn load(&mut self, schedule: Schedule) {
        self.schedule = schedule;
        self.reset();
    }

    /// The cached score. Contractually equal to rebuilding from scratch.
    pub fn score(&self) -> HardSoftScore {
        let s = &self.state;
        let w = &self.weights;
        let hard = -(s.hard_inventory_deficit
            + w.hard_unsupported * s.unsupported_count
            + w.hard_predecessor * s.predecessor_violations
            + w.hard_unmet * s.hard_unmet
            + w.hard_bom_shortage * s.hard_bom_shortage);
        let soft = s.bucket_total - s.holding_penalty - s.safety_shortage_penalty
            - s.changeover_penalty
            + s.batch_reward
            - s.night_shift_cost;
        HardSoftScore::new(hard, soft)
    }

    /// Units of `item` produced in `slot` under the current schedule.
    #[inline]
    pub fn produced_at(&self, item: ItemId, slot: SlotId) -> i64 {
        self.state.produced[item.as_index() * self.state.n_slots + slot.as_index()]
    }

    /// End-of-slot stock balance of `item`.
    #[inline]
    pub fn on_hand_at(&self, item: ItemId, slot: SlotId) -> i64 {
        self.state.on_hand[item.as_index() * self.state.n_slots + slot.as_index()]
    }

    /// Sets the cell's router, bracketing the write with retraction of the
    /// old router's effects and application of the new one's. Returns the
    /// previous assignment (for undo). The only mutation path.
    pub fn change_cell(
        &mut self,
        line: LineId,
        slot: SlotId,
        router: Option<RouterId>,
    ) -> Result<Option<RouterId>, MoveError> {
        self.schedule.check_key(line, slot)?;
        let old = self.schedule.router_at(line, slot);
        if old == router {
            return Ok(old);
        }
        self.retract_cell(line, slot);
        self.schedule.set_router(line, slot, router);
        self.apply_cell(line, slot);
        Ok(old)
    }

    fn retract_cell(&mut self, line: LineId, slot: SlotId) {
        let Some(r) = self.schedule.router_at(line, slot) else {
            return;
        };
        self.add_neighbour_pairs(line, slot, -1);
        self.apply_router_delta(line, slot, r, -1);
        self.occupancy_remove(r, slot);
    }

    fn apply_cell(&mut self, line: LineId, slot: SlotId) {
        let Some(r) = self.schedule.router_at(line, slot) else {
            return;
        };
        self.occupancy_add(r, slot);
        self.apply_router_delta(line, slot, r, 1);
        self.add_neighbour_pairs(line, slot, 1);
    }

    /// Adds (`sign = 1`) or subtracts (`sign = -1`) the contributions of
    /// the two neighbour pairs touching `(line, slot)`, evaluated against
    /// the assignments currently in place.
    fn add_neighbour_pairs(&mut self, line: LineId, slot: SlotId, sign: i64) {
        let this = self.schedule.router_at(line, slot);
        if let Some(prev) = slot.prev() {
            let (c, b) = pair_value(
                self.problem,
                &self.weights,
                self.schedule.router_at(line, prev),
                this,
            );
            self.state.changeover_penalty += sign * c;
            self.state.batch_reward += sign * b;
        }
        if slot.raw() + 1 < self.schedule.n_slots() {
            let (c, b) = pair_value(
                self.problem,
                &self.weights,
                this,
                self.schedule.router_at(line, slot.next()),
            );
            self.state.changeover_penalty += sign * c;
            self.state.batch_reward += sign * b;
        }
    }

    fn apply_router_delta(&mut self, line: LineId, slot: SlotId, r: RouterId, sign: i64) {
        let problem = self.problem;
        let router = problem.router(r);
        let delta = sign * router.speed_per_hour;
        let item = router.item;
        let s = slot.as_index();

        if problem.slot(slot).shift == ShiftTag::Night {
            self.state.night_shift_cost += sign * router.speed_per_hour * self.weights.night;
        }
        if !problem.supports(line, r) {
            self.state.unsupported_count += sign;
        }

        self.state.produced[item.as_index() * self.state.n_slots + s] += delta;
        self.suffix_update(item, s, delta);
        for &(child, qty) in &problem.arcs_by_parent[item.as_index()] {
            self.suffix_update(child, s, -delta * qty);
        }
        self.update_buckets(item, s, delta);
    }

    /// Adds `delta` to every `on_hand[item][k]` for `k >= from`, tracking
    /// the deficit/holding/safety terms per updated slot.
    fn suffix_update(&mut self, item: ItemId, from: usize, delta: i64) {
        if delta == 0 {
            return;
        }
        let safety = self.problem.safety_stock[item.as_index()];
        let is_child = self.problem.is_bom_child[item.as_index()];
        let (wh, ws) = (self.weights.holding, self.weights.safety);
        let base = item.as_index() * self.state.n_slots;
        for k in from..self.state.n_slots {
            let old = self.state.on_hand[base + k];
            let new = old + delta;
            self.state.on_hand[base + k] = new;
            let d_neg = neg_part(new) - neg_part(old);
            self.state.hard_inventory_deficit += d_neg;
            if is_child {
                self.state.hard_bom_shortage += d_neg;
            }
            self.state.holding_penalty += holding_at(new, safety, wh) - holding_at(old, safety, wh);
            self.state.safety_shortage_penalty +=
                safety_short_at(new, safety, ws) - safety_short_at(old, safety, ws);
        }
    }

    /// Re-evaluates every bucket of `item` whose due slot is `>= from`.
    fn update_buckets(&mut self, item: ItemId, from: usize, delta: i64) {
        if delta == 0 {
            return;
        }
        let problem = self.problem;
        let per_item = &problem.buckets_by_item[item.as_index()];
        let start = per_item.partition_point(|&b| problem.buckets[b].due_slot.as_index() < from);
        for &b in &per_item[start..] {
            let bucket = &problem.buckets[b];
            let old_cum = self.state.produced_cum_at_due[b];
            let old_eval = bucket_eval(bucket, old_cum, &self.weights);
            let new_cum = old_cum + delta;
            let new_eval = bucket_eval(bucket, new_cum, &self.weights);
            self.state.produced_cum_at_due[b] = new_cum;
            self.state.cached_contribution[b] = new_eval.contribution;
            self.state.bucket_total += new_eval.contribution - old_eval.contribution;
            self.state.hard_unmet += new_eval.unmet_units - old_eval.unmet_units;
        }
    }

    fn occupancy_add(&mut self, r: RouterId, slot: SlotId) {
        let map = &mut self.state.router_slots[r.as_index()];
        let old_min = map.keys().next().copied();
        *map.entry(slot.raw()).or_insert(0) += 1;
        let min_changed = map.keys().next().copied() != old_min;
        self.recompute_pairs_for(r, min_changed);
    }

    fn occupancy_remove(&mut self, r: RouterId, slot: SlotId) {
        let map = &mut self.state.router_slots[r.as_index()];
        let old_min = map.keys().next().copied();
        if let Some(count) = map.get_mut(&slot.raw()) {
            *count -= 1;
            if *count == 0 {
                map.remove(&slot.raw());
            }
        }
        let min_changed = map.keys().next().copied() != old_min;
        self.recompute_pairs_for(r, min_changed);
    }

    /// The changed router's own cells always need their pair status
    /// refreshed; pairs where it is the predecessor only when its earliest
    /// use moved.
    fn recompute_pairs_for(&mut self, r: RouterId, min_changed: bool) {
        let problem = self.problem;
        for &pair in &problem.pairs_by_successor[r.as_index()] {
            self.recompute_pair(pair);
        }
        if min_changed {
            for &pair in &problem.pairs_by_predecessor[r.as_index()] {
                self.recompute_pair(pair);
            }
        }
    }

    fn recompute_pair(&mut self, pair: u32) {
        let problem = self.problem;
        let spec = &problem.pred_pairs[pair as usize];
        let viol = count_pair_violations(&self.state.router_slots, spec);
        let old = self.state.pair_violations[pair as usize];
        self.state.predecessor_violations += viol - old;
        self.state.pair_violations[pair as usize] = viol;
    }

    /// Recomputes every cached quantity from scratch and reports the first
    /// disagreement. The property tests call this after every mutation.
    pub fn verify(&self) -> Result<(), InvariantViolation> {
        let fresh = CachedState::recompute(self.problem, &self.schedule, &self.weights);
        let cached = &self.state;
        let n_slots = cached.n_slots;

        for (idx, (&c, &f)) in cached.produced.iter().zip(&fresh.produced).enumerate() {
            if c != f {
                return Err(InvariantViolation::new("produced", c, f)
                    .with_location(format!("item {}, slot {}", idx / n_slots, idx % n_slots)));
            }
        }
        for (idx, (&c, &f)) in cached.on_hand.iter().zip(&fresh.on_hand).enumerate() {
            if c != f {
                return Err(InvariantViolation::new("on_hand", c, f)
                    .with_location(format!("item {}, slot {}", idx / n_slots, idx % n_slots)));
            }
        }
        for (b, (&c, &f)) in cached
            .produced_cum_at_due
            .iter()
            .zip(&fresh.produced_cum_at_due)
            .enumerate()
        {
            if c != f {
                return Err(InvariantViolation::new("produced_cum_at_due", c, f)
                    .with_location(format!("bucket {b}")));
            }
        }
        for (b, (&c, &f)) in cached
            .cached_contribution
            .iter()
            .zip(&fresh.cached_contribution)
            .enumerate()
        {
            if c != f {
                return Err(InvariantViolation::new("cached_contribution", c, f)
                    .with_location(format!("bucket {b}")));
            }
        }
        for (r, (c_map, f_map)) in cached
            .router_slots
            .iter()
            .zip(&fresh.router_slots)
            .enumerate()
        {
            if c_map != f_map {
                let slot = c_map
                    .keys()
                    .chain(f_map.keys())
                    .copied()
                    .find(|k| c_map.get(k) != f_map.get(k))
                    .unwrap_or(0);
                return Err(InvariantViolation::new(
                    "router_slot_uses",
                    c_map.get(&slot).copied().unwrap_or(0) as i64,
                    f_map.get(&slot).copied().unwrap_or(0) as i64,
                )
                .with_location(format!("router {r}, slot {slot}")));
            }
        }
        for (p, (&c, &f)) in cached
            .pair_violations
            .iter()
            .zip(&fresh.pair_violations)
            .enumerate()
        {
            if c != f {
                return Err(InvariantViolation::new("pair_violations", c, f)
                    .with_location(format!("pair {p}")));
            }
        }

        let scalars = [
            (
                "hard_inventory_deficit",
                cached.hard_inventory_deficit,
                fresh.hard_inventory_deficit,
            ),
            (
                "hard_bom_shortage",
                cached.hard_bom_shortage,
                fresh.hard_bom_shortage,
            ),
            ("hard_unmet", cached.hard_unmet, fresh.hard_unmet),
            ("bucket_total", cached.bucket_total, fresh.bucket_total),
            (
                "holding_penalty",
                cached.holding_penalty,
                fresh.holding_penalty,
            ),
            (
                "safety_shortage_penalty",
                cached.safety_shortage_penalty,
                fresh.safety_shortage_penalty,
            ),
            (
                "changeover_penalty",
                cached.changeover_penalty,
                fresh.changeover_penalty,
            ),
            ("batch_reward", cached.batch_reward, fresh.batch_reward),
            (
                "night_shift_cost",
                cached.night_shift_cost,
                fresh.night_shift_cost,
            ),
            (
                "unsupported_count",
                cached.unsupported_count,
                fresh.unsupported_count,
            ),
            (
                "predecessor_violations",
                cached.predecessor_violations,
                fresh.predecessor_violations,
            ),
        ];
        for (name, c, f) in scalars {
            if c != f {
                return Err(InvariantViolation::new(name, c, f));
            }
        }
        Ok(())
    }
}
