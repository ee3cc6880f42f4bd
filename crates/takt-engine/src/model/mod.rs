//! Planning data model.
//!
//! [`Problem`] holds the immutable facts of a solve in flat, id-indexed
//! arrays plus the derived adjacency indexes the score director needs for
//! O(1)/O(log) lookups. [`Schedule`] holds the one decision variable per
//! (line, slot) cell. Both are created once per solve; only the router
//! value of a cell ever mutates, and only through the score director.

mod schedule;

pub use schedule::Schedule;

use chrono::NaiveDate;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use takt_common::{ItemId, LineId, RouterId, SlotId};

use crate::calendar::WorkCalendar;

/// Material / SKU. Identity is the code.
#[derive(Debug, Clone)]
pub struct Item {
    pub code: String,
    pub name: String,
    /// Procurement offset applied when this item appears as a BOM child:
    /// derived demand is due this many days before the parent's due date.
    pub lead_time_days: u32,
}

/// Directed parent → child usage relation. Multigraph allowed, cycles
/// rejected at build time.
#[derive(Debug, Clone, Copy)]
pub struct BomArc {
    pub parent: ItemId,
    pub child: ItemId,
    pub qty_per_parent: i64,
}

/// A production process: runs on a line for whole slots, producing one item
/// at a fixed hourly rate.
#[derive(Debug, Clone)]
pub struct Router {
    pub code: String,
    pub item: ItemId,
    pub speed_per_hour: i64,
    pub setup_time_hours: u32,
    pub min_batch_size: i64,
    /// Routers that must have run somewhere strictly earlier on the horizon
    /// before this one may run.
    pub predecessors: SmallVec<[RouterId; 2]>,
}

#[derive(Debug, Clone)]
pub struct ProductionLine {
    pub code: String,
    pub supported: Vec<RouterId>,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ShiftTag {
    Day,
    Night,
}

/// One capacity hour of the horizon. Slots exist only for working hours;
/// `index` is dense and totally ordered, `absolute_hour` links back to wall
/// clock via the calendar.
#[derive(Debug, Clone, Copy)]
pub struct TimeSlot {
    pub index: SlotId,
    pub date: NaiveDate,
    pub hour: u8,
    pub shift: ShiftTag,
    pub absolute_hour: i64,
}

/// A unit of demand for one item at one due slot.
///
/// `prev_demand_sum` is the total quantity of buckets of the same item that
/// sort earlier (due ascending, priority descending); the scorer allocates
/// cumulative production to buckets in that order.
#[derive(Debug, Clone, Copy)]
pub struct DemandBucket {
    pub item: ItemId,
    pub quantity: i64,
    pub due_slot: SlotId,
    /// 1..=10 for user demand, 0 for BOM-derived and safety-stock demand.
    pub priority: u8,
    pub prev_demand_sum: i64,
}

/// Predecessor obligation: `successor` may only run in a slot strictly
/// after some use of `predecessor`.
#[derive(Debug, Clone, Copy)]
pub struct PredPair {
    pub successor: RouterId,
    pub predecessor: RouterId,
}

/// Immutable facts of one solve.
#[derive(Debug)]
pub struct Problem {
    pub calendar: WorkCalendar,

    pub items: Vec<Item>,
    /// Per item, on hand before slot 0. The on-hand curve starts here.
    pub initial_on_hand: Vec<i64>,
    pub safety_stock: Vec<i64>,

    pub arcs: Vec<BomArc>,
    pub routers: Vec<Router>,
    pub lines: Vec<ProductionLine>,
    pub slots: Vec<TimeSlot>,
    pub buckets: Vec<DemandBucket>,

    // Derived indexes, built once.
    /// Per parent item: (child, qty_per_parent) fan-out.
    pub arcs_by_parent: Vec<SmallVec<[(ItemId, i64); 2]>>,
    /// Per child item: (parent, qty_per_parent) fan-in.
    pub arcs_by_child: Vec<SmallVec<[(ItemId, i64); 2]>>,
    /// Per item: routers producing it.
    pub routers_by_item: Vec<SmallVec<[RouterId; 2]>>,
    /// Per item: indexes into `buckets`, sorted by (due asc, priority desc).
    pub buckets_by_item: Vec<Vec<usize>>,
    /// True for items that are the child of at least one arc.
    pub is_bom_child: Vec<bool>,
    /// Dense `line × router` support bitmap.
    supports: Vec<bool>,

    /// Flattened (successor, predecessor) obligations.
    pub pred_pairs: Vec<PredPair>,
    /// Per router: indexes of pairs where it is the successor.
    pub pairs_by_successor: Vec<SmallVec<[u32; 2]>>,
    /// Per router: indexes of pairs where it is the predecessor.
    pub pairs_by_predecessor: Vec<SmallVec<[u32; 2]>>,

    item_index: FxHashMap<String, ItemId>,
    router_index: FxHashMap<String, RouterId>,
    line_index: FxHashMap<String, LineId>,
}

impl Problem {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn assemble(
        calendar: WorkCalendar,
        items: Vec<Item>,
        initial_on_hand: Vec<i64>,
        safety_stock: Vec<i64>,
        arcs: Vec<BomArc>,
        routers: Vec<Router>,
        lines: Vec<ProductionLine>,
        slots: Vec<TimeSlot>,
        buckets: Vec<DemandBucket>,
        item_index: FxHashMap<String, ItemId>,
        router_index: FxHashMap<String, RouterId>,
        line_index: FxHashMap<String, LineId>,
    ) -> Self {
        let n_items = items.len();
        let n_routers = routers.len();

        let mut arcs_by_parent: Vec<SmallVec<[(ItemId, i64); 2]>> = vec![SmallVec::new(); n_items];
        let mut arcs_by_child: Vec<SmallVec<[(ItemId, i64); 2]>> = vec![SmallVec::new(); n_items];
        let mut is_bom_child = vec![false; n_items];
        for arc in &arcs {
            arcs_by_parent[arc.parent.as_index()].push((arc.child, arc.qty_per_parent));
            arcs_by_child[arc.child.as_index()].push((arc.parent, arc.qty_per_parent));
            is_bom_child[arc.child.as_index()] = true;
        }

        let mut routers_by_item: Vec<SmallVec<[RouterId; 2]>> = vec![SmallVec::new(); n_items];
        for (r, router) in routers.iter().enumerate() {
            routers_by_item[router.item.as_index()].push(RouterId::new(r as u32));
        }

        let mut buckets_by_item: Vec<Vec<usize>> = vec![Vec::new(); n_items];
        for (b, bucket) in buckets.iter().enumerate() {
            buckets_by_item[bucket.item.as_index()].push(b);
        }
        for per_item in &mut buckets_by_item {
            per_item.sort_by_key(|&b| {
                (buckets[b].due_slot, std::cmp::Reverse(buckets[b].priority))
            });
        }

        let mut supports = vec![false; lines.len() * n_routers];
        for (l, line) in lines.iter().enumerate() {
            for &r in &line.supported {
                supports[l * n_routers + r.as_index()] = true;
            }
        }

        let mut pred_pairs = Vec::new();
        let mut pairs_by_successor: Vec<SmallVec<[u32; 2]>> = vec![SmallVec::new(); n_routers];
        let mut pairs_by_predecessor: Vec<SmallVec<[u32; 2]>> = vec![SmallVec::new(); n_routers];
        for (r, router) in routers.iter().enumerate() {
            for &p in &router.predecessors {
                let pair = pred_pairs.len() as u32;
                pred_pairs.push(PredPair {
                    successor: RouterId::new(r as u32),
                    predecessor: p,
                });
                pairs_by_successor[r].push(pair);
                pairs_by_predecessor[p.as_index()].push(pair);
            }
        }

        Self {
            calendar,
            items,
            initial_on_hand,
            safety_stock,
            arcs,
            routers,
            lines,
            slots,
            buckets,
            arcs_by_parent,
            arcs_by_child,
            routers_by_item,
            buckets_by_item,
            is_bom_child,
            supports,
            pred_pairs,
            pairs_by_successor,
            pairs_by_predecessor,
            item_index,
            router_index,
            line_index,
        }
    }

    #[inline]
    pub fn n_items(&self) -> usize {
        self.items.len()
    }

    #[inline]
    pub fn n_routers(&self) -> usize {
        self.routers.len()
    }

    #[inline]
    pub fn n_lines(&self) -> usize {
        self.lines.len()
    }

    #[inline]
    pub fn n_slots(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    pub fn router(&self, id: RouterId) -> &Router {
        &self.routers[id.as_index()]
    }

    #[inline]
    pub fn item(&self, id: ItemId) -> &Item {
        &self.items[id.as_index()]
    }

    #[inline]
    pub fn line(&self, id: LineId) -> &ProductionLine {
        &self.lines[id.as_index()]
    }

    #[inline]
    pub fn slot(&self, id: SlotId) -> &TimeSlot {
        &self.slots[id.as_index()]
    }

    /// Whether `line` supports running `router`.
    #[inline]
    pub fn supports(&self, line: LineId, router: RouterId) -> bool {
        self.supports[line.as_index() * self.n_routers() + router.as_index()]
    }

    pub fn item_id(&self, code: &str) -> Option<ItemId> {
        self.item_index.get(code).copied()
    }

    pub fn router_id(&self, code: &str) -> Option<RouterId> {
        self.router_index.get(code).copied()
    }

    pub fn line_id(&self, code: &str) -> Option<LineId> {
        self.line_index.get(code).copied()
    }
}
