//! JSON data contract: the solve request.
//!
//! These are plain serde DTOs; all validation and interning happens in
//! [`crate::builder`]. Field names follow the wire convention (camelCase).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SolveRequest {
    pub calendar: CalendarSpec,
    pub lines: Vec<LineSpec>,
    pub routers: Vec<RouterSpec>,
    #[serde(default)]
    pub items: Vec<ItemSpec>,
    #[serde(default)]
    pub bom_arcs: Vec<BomArcSpec>,
    #[serde(default)]
    pub demands: Vec<DemandSpec>,
    /// Wall-clock search budget, seconds. Must be ≥ 1.
    #[serde(default = "default_termination_seconds")]
    pub termination_seconds: u64,
    /// RNG seed for reproducible searches.
    #[serde(default)]
    pub seed: u64,
}

pub(crate) fn default_termination_seconds() -> u64 {
    10
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarSpec {
    /// `YYYY-MM-DD`; absolute hour 0 is midnight of this date.
    pub timeline_start_date: String,
    pub shifts: Vec<ShiftSpec>,
    /// Working dates, `YYYY-MM-DD`. Empty means no working days.
    #[serde(default)]
    pub work_dates: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShiftSpec {
    pub start_hour: u8,
    /// Exclusive; `end_hour <= start_hour` wraps past midnight.
    pub end_hour: u8,
    #[serde(default)]
    pub breaks: Vec<BreakSpec>,
    /// Slots generated from this shift carry the NIGHT tag.
    #[serde(default)]
    pub night: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BreakSpec {
    pub start_hour: u8,
    pub end_hour: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineSpec {
    pub code: String,
    /// Codes of the routers this line can run.
    #[serde(default)]
    pub routers: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouterSpec {
    pub code: String,
    /// Code of the item this router produces.
    pub item: String,
    pub speed_per_hour: i64,
    #[serde(default)]
    pub setup_time_hours: u32,
    #[serde(default)]
    pub min_batch_size: i64,
    /// Router codes that must run somewhere earlier on the horizon first.
    #[serde(default)]
    pub predecessors: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemSpec {
    pub code: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub initial_stock: i64,
    #[serde(default)]
    pub safety_stock: i64,
    /// Days subtracted from a parent's due date for derived demand.
    #[serde(default)]
    pub lead_time: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BomArcSpec {
    pub parent: String,
    pub child: String,
    pub quantity_per_parent: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DemandSpec {
    pub item: String,
    pub quantity: i64,
    /// `YYYY-MM-DD`; mapped to the last slot on or before this date's end.
    pub due_date: String,
    #[serde(default = "default_priority")]
    pub priority: u8,
}

pub(crate) fn default_priority() -> u8 {
    5
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_request_round_trips() {
        let json = r#"{
            "calendar": {
                "timelineStartDate": "2024-03-04",
                "shifts": [{"startHour": 8, "endHour": 16, "breaks": [{"startHour": 12, "endHour": 13}]}],
                "workDates": ["2024-03-04", "2024-03-05"]
            },
            "lines": [{"code": "L1", "routers": ["rA"]}],
            "routers": [{"code": "rA", "item": "A", "speedPerHour": 10}],
            "items": [{"code": "A", "initialStock": 5}],
            "demands": [{"item": "A", "quantity": 80, "dueDate": "2024-03-05"}]
        }"#;
        let req: SolveRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.termination_seconds, 10);
        assert_eq!(req.demands[0].priority, 5);
        assert_eq!(req.calendar.shifts[0].breaks.len(), 1);
        assert!(!req.calendar.shifts[0].night);

        let back = serde_json::to_string(&req).unwrap();
        let again: SolveRequest = serde_json::from_str(&back).unwrap();
        assert_eq!(again.routers[0].speed_per_hour, 10);
    }
}
