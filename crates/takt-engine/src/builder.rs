//! Request validation and problem materialisation.
//!
//! Turns a [`SolveRequest`] into the immutable [`Problem`] plus an all-idle
//! [`Schedule`]. Every validation failure surfaces before any engine state
//! is allocated; after this point only the cell assignments ever change.

use chrono::NaiveDate;
use rustc_hash::{FxHashMap, FxHashSet};
use smallvec::SmallVec;
use takt_common::{BuildError, ItemId, LineId, RouterId, SlotId};
use tracing::{debug, info};

use crate::calendar::WorkCalendar;
use crate::demand::{self, RawOrder};
use crate::model::{BomArc, Item, Problem, ProductionLine, Router, Schedule, ShiftTag, TimeSlot};
use crate::request::SolveRequest;

fn parse_date(s: &str) -> Result<NaiveDate, BuildError> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|_| BuildError::InvalidDate(s.to_string()))
}

fn check_range(
    field: &'static str,
    value: i64,
    ok: bool,
    expected: &'static str,
) -> Result<(), BuildError> {
    if ok {
        Ok(())
    } else {
        Err(BuildError::OutOfRange {
            field,
            value,
            expected,
        })
    }
}

/// Validates the request and materialises the problem model and an initial
/// all-idle schedule.
pub fn build_problem(request: &SolveRequest) -> Result<(Problem, Schedule), BuildError> {
    if request.calendar.shifts.is_empty() {
        return Err(BuildError::EmptyShifts);
    }
    if request.lines.is_empty() {
        return Err(BuildError::EmptyLines);
    }
    check_range(
        "terminationSeconds",
        request.termination_seconds as i64,
        request.termination_seconds >= 1,
        ">= 1",
    )?;

    let calendar = build_calendar(request)?;
    let slots = generate_slots(&calendar);
    if slots.is_empty() {
        return Err(BuildError::EmptyHorizon);
    }

    // Items.
    let mut items = Vec::with_capacity(request.items.len());
    let mut initial_on_hand = Vec::with_capacity(request.items.len());
    let mut safety_stock = Vec::with_capacity(request.items.len());
    let mut item_index: FxHashMap<String, ItemId> = FxHashMap::default();
    for spec in &request.items {
        check_range(
            "initialStock",
            spec.initial_stock,
            spec.initial_stock >= 0,
            ">= 0",
        )?;
        check_range(
            "safetyStock",
            spec.safety_stock,
            spec.safety_stock >= 0,
            ">= 0",
        )?;
        let id = ItemId::new(items.len() as u32);
        if item_index.insert(spec.code.clone(), id).is_some() {
            return Err(BuildError::DuplicateCode {
                kind: "item",
                code: spec.code.clone(),
            });
        }
        items.push(Item {
            code: spec.code.clone(),
            name: spec.name.clone().unwrap_or_else(|| spec.code.clone()),
            lead_time_days: spec.lead_time,
        });
        initial_on_hand.push(spec.initial_stock);
        safety_stock.push(spec.safety_stock);
    }
    let resolve_item = |code: &str| -> Result<ItemId, BuildError> {
        item_index
            .get(code)
            .copied()
            .ok_or_else(|| BuildError::UnknownItem(code.to_string()))
    };

    // BOM arcs, validated acyclic below.
    let mut arcs = Vec::with_capacity(request.bom_arcs.len());
    for spec in &request.bom_arcs {
        check_range(
            "quantityPerParent",
            spec.quantity_per_parent,
            spec.quantity_per_parent >= 1,
            ">= 1",
        )?;
        arcs.push(BomArc {
            parent: resolve_item(&spec.parent)?,
            child: resolve_item(&spec.child)?,
            qty_per_parent: spec.quantity_per_parent,
        });
    }
    check_bom_acyclic(&items, &arcs)?;

    // Routers: two passes so predecessors may reference any router.
    let mut router_index: FxHashMap<String, RouterId> = FxHashMap::default();
    for (r, spec) in request.routers.iter().enumerate() {
        if router_index
            .insert(spec.code.clone(), RouterId::new(r as u32))
            .is_some()
        {
            return Err(BuildError::DuplicateCode {
                kind: "router",
                code: spec.code.clone(),
            });
        }
    }
    let mut routers = Vec::with_capacity(request.routers.len());
    for spec in &request.routers {
        check_range(
            "speedPerHour",
            spec.speed_per_hour,
            spec.speed_per_hour >= 0,
            ">= 0",
        )?;
        let mut predecessors = SmallVec::new();
        for code in &spec.predecessors {
            let id = router_index
                .get(code)
                .copied()
                .ok_or_else(|| BuildError::UnknownRouter(code.clone()))?;
            predecessors.push(id);
        }
        routers.push(Router {
            code: spec.code.clone(),
            item: resolve_item(&spec.item)?,
            speed_per_hour: spec.speed_per_hour,
            setup_time_hours: spec.setup_time_hours,
            min_batch_size: spec.min_batch_size,
            predecessors,
        });
    }

    // Lines.
    let mut lines = Vec::with_capacity(request.lines.len());
    let mut line_index: FxHashMap<String, LineId> = FxHashMap::default();
    for spec in &request.lines {
        let id = LineId::new(lines.len() as u32);
        if line_index.insert(spec.code.clone(), id).is_some() {
            return Err(BuildError::DuplicateCode {
                kind: "line",
                code: spec.code.clone(),
            });
        }
        let mut supported = Vec::with_capacity(spec.routers.len());
        for code in &spec.routers {
            let router = router_index
                .get(code)
                .copied()
                .ok_or_else(|| BuildError::UnknownRouter(code.clone()))?;
            supported.push(router);
        }
        lines.push(ProductionLine {
            code: spec.code.clone(),
            supported,
        });
    }

    // Demand orders.
    let mut orders = Vec::with_capacity(request.demands.len());
    for spec in &request.demands {
        check_range("quantity", spec.quantity, spec.quantity > 0, "> 0")?;
        check_range(
            "priority",
            spec.priority as i64,
            (1..=10).contains(&spec.priority),
            "1..=10",
        )?;
        orders.push(RawOrder {
            item: resolve_item(&spec.item)?,
            quantity: spec.quantity,
            due_date: parse_date(&spec.due_date)?,
            priority: spec.priority,
        });
    }

    let buckets = demand::expand_demand(
        &orders,
        &items,
        &arcs,
        &initial_on_hand,
        &safety_stock,
        &slots,
    );
    debug!(
        orders = orders.len(),
        buckets = buckets.len(),
        "expanded demand"
    );

    let problem = Problem::assemble(
        calendar,
        items,
        initial_on_hand,
        safety_stock,
        arcs,
        routers,
        lines,
        slots,
        buckets,
        item_index,
        router_index,
        line_index,
    );
    let schedule = Schedule::empty(&problem);
    info!(
        items = problem.n_items(),
        routers = problem.n_routers(),
        lines = problem.n_lines(),
        slots = problem.n_slots(),
        buckets = problem.buckets.len(),
        "problem built"
    );
    Ok((problem, schedule))
}

fn build_calendar(request: &SolveRequest) -> Result<WorkCalendar, BuildError> {
    let start = parse_date(&request.calendar.timeline_start_date)?;

    let mut hour_mask = 0u32;
    let mut night_mask = 0u32;
    for shift in &request.calendar.shifts {
        let mut shift_mask = 0u32;
        WorkCalendar::mark_hours(&mut shift_mask, shift.start_hour, shift.end_hour);
        for brk in &shift.breaks {
            WorkCalendar::clear_hours(&mut shift_mask, brk.start_hour, brk.end_hour);
        }
        hour_mask |= shift_mask;
        if shift.night {
            night_mask |= shift_mask;
        }
    }

    let mut work_dates: FxHashSet<NaiveDate> = FxHashSet::default();
    for date in &request.calendar.work_dates {
        let date = parse_date(date)?;
        // Dates before the timeline start can never be reached by a
        // non-negative absolute hour.
        if date >= start {
            work_dates.insert(date);
        }
    }
    if work_dates.is_empty() {
        return Err(BuildError::MissingWorkDates);
    }

    Ok(WorkCalendar::new(start, hour_mask, night_mask, work_dates))
}

/// One slot per working hour, ordered by date then hour-of-day.
fn generate_slots(calendar: &WorkCalendar) -> Vec<TimeSlot> {
    let mut slots = Vec::new();
    for date in calendar.work_dates_sorted() {
        let day_offset = (date - calendar.timeline_start()).num_days();
        for hour in 0u8..24 {
            if calendar.hour_mask() & (1 << hour) == 0 {
                continue;
            }
            slots.push(TimeSlot {
                index: SlotId::new(slots.len() as u32),
                date,
                hour,
                shift: if calendar.is_night_hour(hour) {
                    ShiftTag::Night
                } else {
                    ShiftTag::Day
                },
                absolute_hour: day_offset * 24 + hour as i64,
            });
        }
    }
    slots
}

/// Kahn's algorithm over the parent → child item graph.
fn check_bom_acyclic(items: &[Item], arcs: &[BomArc]) -> Result<(), BuildError> {
    let n = items.len();
    let mut indegree = vec![0usize; n];
    let mut out: Vec<Vec<usize>> = vec![Vec::new(); n];
    for arc in arcs {
        out[arc.parent.as_index()].push(arc.child.as_index());
        indegree[arc.child.as_index()] += 1;
    }
    let mut queue: Vec<usize> = (0..n).filter(|&i| indegree[i] == 0).collect();
    let mut seen = 0;
    while let Some(i) = queue.pop() {
        seen += 1;
        for &child in &out[i] {
            indegree[child] -= 1;
            if indegree[child] == 0 {
                queue.push(child);
            }
        }
    }
    if seen == n {
        Ok(())
    } else {
        let stuck = (0..n)
            .find(|&i| indegree[i] > 0)
            .map(|i| items[i].code.clone())
            .unwrap_or_default();
        Err(BuildError::BomCycle(stuck))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::request::{
        BomArcSpec, BreakSpec, CalendarSpec, DemandSpec, ItemSpec, LineSpec, RouterSpec, ShiftSpec,
        SolveRequest,
    };

    pub(crate) fn base_request() -> SolveRequest {
        SolveRequest {
            calendar: CalendarSpec {
                timeline_start_date: "2024-03-04".into(),
                shifts: vec![ShiftSpec {
                    start_hour: 8,
                    end_hour: 16,
                    breaks: vec![],
                    night: false,
                }],
                work_dates: vec![
                    "2024-03-04".into(),
                    "2024-03-05".into(),
                    "2024-03-06".into(),
                ],
            },
            lines: vec![LineSpec {
                code: "L1".into(),
                routers: vec!["rA".into(), "rB".into()],
            }],
            routers: vec![
                RouterSpec {
                    code: "rA".into(),
                    item: "A".into(),
                    speed_per_hour: 2,
                    setup_time_hours: 0,
                    min_batch_size: 0,
                    predecessors: vec![],
                },
                RouterSpec {
                    code: "rB".into(),
                    item: "B".into(),
                    speed_per_hour: 4,
                    setup_time_hours: 0,
                    min_batch_size: 0,
                    predecessors: vec![],
                },
            ],
            items: vec![
                ItemSpec {
                    code: "A".into(),
                    name: None,
                    initial_stock: 0,
                    safety_stock: 0,
                    lead_time: 0,
                },
                ItemSpec {
                    code: "B".into(),
                    name: None,
                    initial_stock: 0,
                    safety_stock: 0,
                    lead_time: 0,
                },
            ],
            bom_arcs: vec![BomArcSpec {
                parent: "A".into(),
                child: "B".into(),
                quantity_per_parent: 2,
            }],
            demands: vec![DemandSpec {
                item: "A".into(),
                quantity: 4,
                due_date: "2024-03-05".into(),
                priority: 5,
            }],
            termination_seconds: 10,
            seed: 0,
        }
    }

    /// Two items with one BOM arc on a single line, 24 day slots.
    pub(crate) fn tiny_problem() -> Problem {
        let (problem, _) = build_problem(&base_request()).unwrap();
        problem
    }

    fn init_tracing() {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    }

    #[test]
    fn builds_slots_for_working_hours_only() {
        init_tracing();
        let problem = tiny_problem();
        assert_eq!(problem.n_slots(), 3 * 8);
        assert_eq!(problem.slot(SlotId::new(0)).hour, 8);
        assert_eq!(problem.slot(SlotId::new(7)).hour, 15);
        assert_eq!(problem.slot(SlotId::new(8)).date.to_string(), "2024-03-05");
        assert_eq!(problem.slot(SlotId::new(0)).absolute_hour, 8);
        assert_eq!(problem.slot(SlotId::new(8)).absolute_hour, 32);
    }

    #[test]
    fn breaks_and_night_shifts_shape_the_slots() {
        let mut request = base_request();
        request.calendar.shifts = vec![
            ShiftSpec {
                start_hour: 8,
                end_hour: 16,
                breaks: vec![BreakSpec {
                    start_hour: 12,
                    end_hour: 13,
                }],
                night: false,
            },
            ShiftSpec {
                start_hour: 22,
                end_hour: 2,
                breaks: vec![],
                night: true,
            },
        ];
        let (problem, _) = build_problem(&request).unwrap();
        // 7 day hours + 4 night hours per date.
        assert_eq!(problem.n_slots(), 3 * 11);
        let night_slots = problem
            .slots
            .iter()
            .filter(|s| s.shift == ShiftTag::Night)
            .count();
        assert_eq!(night_slots, 3 * 4);
        assert!(
            problem
                .slots
                .iter()
                .all(|s| s.hour != 12 || s.shift == ShiftTag::Night)
        );
    }

    #[test]
    fn empty_shifts_are_rejected() {
        let mut request = base_request();
        request.calendar.shifts.clear();
        assert_eq!(build_problem(&request).err(), Some(BuildError::EmptyShifts));
    }

    #[test]
    fn empty_work_dates_are_rejected() {
        let mut request = base_request();
        request.calendar.work_dates.clear();
        assert_eq!(
            build_problem(&request).err(),
            Some(BuildError::MissingWorkDates)
        );
    }

    #[test]
    fn unknown_references_are_rejected() {
        let mut request = base_request();
        request.demands[0].item = "ZZZ".into();
        assert_eq!(
            build_problem(&request).err(),
            Some(BuildError::UnknownItem("ZZZ".into()))
        );

        let mut request = base_request();
        request.lines[0].routers.push("nope".into());
        assert_eq!(
            build_problem(&request).err(),
            Some(BuildError::UnknownRouter("nope".into()))
        );
    }

    #[test]
    fn bom_cycles_are_rejected() {
        let mut request = base_request();
        request.bom_arcs.push(BomArcSpec {
            parent: "B".into(),
            child: "A".into(),
            quantity_per_parent: 1,
        });
        assert!(matches!(
            build_problem(&request),
            Err(BuildError::BomCycle(_))
        ));
    }

    #[test]
    fn out_of_range_integers_are_rejected() {
        let mut request = base_request();
        request.demands[0].priority = 11;
        assert!(matches!(
            build_problem(&request),
            Err(BuildError::OutOfRange {
                field: "priority",
                ..
            })
        ));

        let mut request = base_request();
        request.termination_seconds = 0;
        assert!(matches!(
            build_problem(&request),
            Err(BuildError::OutOfRange {
                field: "terminationSeconds",
                ..
            })
        ));
    }

    #[test]
    fn demand_is_expanded_through_the_bom() {
        let problem = tiny_problem();
        // A bucket for the demand plus the derived B bucket.
        assert_eq!(problem.buckets.len(), 2);
        let b_item = problem.item_id("B").unwrap();
        let derived = problem
            .buckets
            .iter()
            .find(|b| b.item == b_item)
            .expect("derived bucket");
        assert_eq!(derived.quantity, 8);
        assert_eq!(derived.priority, 0);
    }
}
