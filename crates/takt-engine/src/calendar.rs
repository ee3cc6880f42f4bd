//! Work calendar: which absolute hours of the horizon are working hours.
//!
//! The calendar is a pure predicate over absolute hours, parameterised by a
//! reference start date, a 24-bit hour-of-day mask (bit set ⇔ the hour lies
//! inside a shift and outside every break) and a whitelist of working dates.
//! Shifts that cross midnight mark their wrapped hours in the mask. It is
//! built once per solve and never mutated during search.

use chrono::{Days, NaiveDate, NaiveDateTime, NaiveTime};
use rustc_hash::FxHashSet;

#[derive(Debug, Clone)]
pub struct WorkCalendar {
    timeline_start: NaiveDate,
    /// Bit `h` set ⇔ hour-of-day `h` is in a shift and not in a break.
    hour_mask: u32,
    /// Bit `h` set ⇔ hour-of-day `h` belongs to a night-tagged shift.
    night_mask: u32,
    work_dates: FxHashSet<NaiveDate>,
}

impl WorkCalendar {
    pub fn new(
        timeline_start: NaiveDate,
        hour_mask: u32,
        night_mask: u32,
        work_dates: FxHashSet<NaiveDate>,
    ) -> Self {
        Self {
            timeline_start,
            hour_mask: hour_mask & 0x00FF_FFFF,
            night_mask: night_mask & 0x00FF_FFFF,
            work_dates,
        }
    }

    /// Marks hours `[start, end)` in a 24-bit mask, wrapping past midnight
    /// when `end <= start`.
    pub fn mark_hours(mask: &mut u32, start: u8, end: u8) {
        let (start, end) = (start % 24, end % 24);
        let mut h = start;
        loop {
            *mask |= 1 << h;
            h = (h + 1) % 24;
            if h == end {
                break;
            }
        }
    }

    /// Clears hours `[start, end)`, wrapping like [`Self::mark_hours`].
    pub fn clear_hours(mask: &mut u32, start: u8, end: u8) {
        let (start, end) = (start % 24, end % 24);
        let mut h = start;
        loop {
            *mask &= !(1 << h);
            h = (h + 1) % 24;
            if h == end {
                break;
            }
        }
    }

    #[inline]
    pub fn timeline_start(&self) -> NaiveDate {
        self.timeline_start
    }

    #[inline]
    pub fn hour_mask(&self) -> u32 {
        self.hour_mask
    }

    /// True iff hour-of-day `hod` belongs to a night-tagged shift.
    #[inline]
    pub fn is_night_hour(&self, hod: u8) -> bool {
        self.night_mask & (1 << hod) != 0
    }

    /// Whether the absolute hour `h` (hours since midnight of the timeline
    /// start) is a working hour. An empty work-date set means every hour is
    /// non-working.
    pub fn working(&self, h: i64) -> bool {
        if h < 0 {
            return false;
        }
        let hod = (h % 24) as u8;
        if self.hour_mask & (1 << hod) == 0 {
            return false;
        }
        match self.date_of_hour(h) {
            Some(date) => self.work_dates.contains(&date),
            None => false,
        }
    }

    /// Calendar date the absolute hour falls in.
    pub fn date_of_hour(&self, h: i64) -> Option<NaiveDate> {
        if h < 0 {
            return None;
        }
        self.timeline_start.checked_add_days(Days::new((h / 24) as u64))
    }

    /// Wall-clock timestamp of the *start* of the absolute hour. Used when
    /// serialising assignments back to the caller.
    pub fn date_time_of_hour(&self, h: i64) -> Option<NaiveDateTime> {
        let date = self.date_of_hour(h)?;
        let time = NaiveTime::from_hms_opt((h % 24) as u32, 0, 0)?;
        Some(NaiveDateTime::new(date, time))
    }

    pub fn work_dates_sorted(&self) -> Vec<NaiveDate> {
        let mut dates: Vec<NaiveDate> = self.work_dates.iter().copied().collect();
        dates.sort_unstable();
        dates
    }
}
