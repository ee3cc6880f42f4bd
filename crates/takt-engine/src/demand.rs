//! Demand expansion: raw orders → time-phased demand buckets.
//!
//! Pipeline: merge raw orders, explode multi-level BOM demand breadth-first
//! (child due = parent due − child lead time, clamped to the horizon),
//! re-merge, add safety-stock buckets at the horizon end, then net initial
//! inventory against the earliest-due buckets. Netting happens **here**,
//! once; the score director still starts every on-hand curve at
//! `initial_on_hand`, which only feeds the inventory-feasibility terms.
//!
//! Derived buckets (BOM children, safety stock) carry priority 0 so they
//! never outrank user demand.

use chrono::{Days, NaiveDate};
use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use takt_common::{ItemId, SlotId};

use crate::model::{BomArc, DemandBucket, Item, TimeSlot};

/// A validated, id-resolved demand order.
#[derive(Debug, Clone, Copy)]
pub struct RawOrder {
    pub item: ItemId,
    pub quantity: i64,
    pub due_date: NaiveDate,
    pub priority: u8,
}

/// Priority assigned to BOM-derived and safety-stock buckets.
pub const DERIVED_PRIORITY: u8 = 0;

/// Maps a due date to the last slot on or before that date's end of day.
/// Dates outside the horizon clamp to the nearest boundary slot.
pub fn due_slot_for_date(slots: &[TimeSlot], due: NaiveDate) -> SlotId {
    // Slot dates are non-decreasing in index order.
    let after = slots.partition_point(|s| s.date <= due);
    if after == 0 {
        SlotId::new(0)
    } else {
        slots[after - 1].index
    }
}

/// Expands raw orders into the final bucket list, sorted by
/// (item, due slot asc, priority desc) with `prev_demand_sum` filled in.
///
/// The BOM must already be validated acyclic.
pub fn expand_demand(
    orders: &[RawOrder],
    items: &[Item],
    arcs: &[BomArc],
    initial_on_hand: &[i64],
    safety_stock: &[i64],
    slots: &[TimeSlot],
) -> Vec<DemandBucket> {
    debug_assert!(!slots.is_empty());
    let horizon_start = slots[0].date;
    let horizon_end = slots[slots.len() - 1].date;

    let mut arcs_by_parent: Vec<SmallVec<[(ItemId, i64); 2]>> = vec![SmallVec::new(); items.len()];
    for arc in arcs {
        arcs_by_parent[arc.parent.as_index()].push((arc.child, arc.qty_per_parent));
    }

    // Step 1: merge raw orders by (item, due date, priority); quantities
    // sum. Dates stay as given; boundary clamping happens at slot mapping.
    let mut merged: FxHashMap<(ItemId, NaiveDate, u8), i64> = FxHashMap::default();
    for order in orders {
        *merged
            .entry((order.item, order.due_date, order.priority))
            .or_insert(0) += order.quantity;
    }

    // Step 2: breadth-first BOM explosion. Derived quantities are linear in
    // the source quantity, so exploding worklist entries independently and
    // merging afterwards is equivalent to exploding merged buckets.
    let mut worklist: Vec<(ItemId, NaiveDate, i64)> = merged
        .iter()
        .map(|(&(item, due, _), &qty)| (item, due, qty))
        .collect();
    while let Some((item, due, qty)) = worklist.pop() {
        for &(child, qty_per_parent) in &arcs_by_parent[item.as_index()] {
            let lead = items[child.as_index()].lead_time_days;
            let child_due = due
                .checked_sub_days(Days::new(lead as u64))
                .unwrap_or(horizon_start);
            let child_qty = qty * qty_per_parent;
            // Step 3: re-merge as we go.
            *merged
                .entry((child, child_due, DERIVED_PRIORITY))
                .or_insert(0) += child_qty;
            worklist.push((child, child_due, child_qty));
        }
    }

    // Step 4: safety-stock bucket at the last slot of the horizon.
    for (i, &safety) in safety_stock.iter().enumerate() {
        if safety > 0 {
            *merged
                .entry((ItemId::new(i as u32), horizon_end, DERIVED_PRIORITY))
                .or_insert(0) += safety;
        }
    }

    // Step 5: net initial inventory, earliest due first (priority breaks
    // ties so user demand is netted before derived demand at the same due).
    let mut per_item: Vec<Vec<(NaiveDate, u8, i64)>> = vec![Vec::new(); items.len()];
    for (&(item, due, priority), &qty) in &merged {
        per_item[item.as_index()].push((due, priority, qty));
    }

    let mut buckets = Vec::new();
    for (i, entries) in per_item.iter_mut().enumerate() {
        entries.sort_by_key(|&(due, priority, _)| (due, std::cmp::Reverse(priority)));
        let mut remaining_stock = initial_on_hand[i];
        let mut prev_demand_sum = 0i64;
        for &(due, priority, qty) in entries.iter() {
            let netted = qty - qty.min(remaining_stock);
            remaining_stock -= qty.min(remaining_stock);
            if netted == 0 {
                continue;
            }
            buckets.push(DemandBucket {
                item: ItemId::new(i as u32),
                quantity: netted,
                due_slot: due_slot_for_date(slots, due),
                priority,
                prev_demand_sum,
            });
            prev_demand_sum += netted;
        }
    }

    buckets
}
