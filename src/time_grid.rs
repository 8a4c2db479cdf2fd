use chrono::{Duration, NaiveTime};
use serde::Serialize;

pub const SLOT_MINUTES: i64 = 60;
pub const FALLBACK_SLOT_COUNT: usize = 6;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LessonSlot {
    pub index: usize,
    /// `None` on the generic numbering used when the schedule has no usable times.
    pub start: Option<String>,
    pub end: Option<String>,
}

impl LessonSlot {
    fn generic(index: usize) -> Self {
        Self {
            index,
            start: None,
            end: None,
        }
    }
}

/// Parses a 24-hour `HH:MM` wall-clock time. Seconds are not accepted.
pub fn parse_hhmm(raw: &str) -> Option<NaiveTime> {
    let t = raw.trim();
    if t.is_empty() {
        return None;
    }
    NaiveTime::parse_from_str(t, "%H:%M").ok()
}

pub fn format_hhmm(t: NaiveTime) -> String {
    t.format("%H:%M").to_string()
}

/// Number of fixed-width slots needed to cover `total_minutes`, rounded up,
/// never less than one.
pub fn slot_count(total_minutes: i64) -> usize {
    let count = (total_minutes + SLOT_MINUTES - 1).div_euclid(SLOT_MINUTES);
    count.max(1) as usize
}

pub fn compute_slots(start_time: Option<&str>, end_time: Option<&str>) -> Vec<LessonSlot> {
    let (Some(start), Some(end)) = (
        start_time.and_then(parse_hhmm),
        end_time.and_then(parse_hhmm),
    ) else {
        return (0..FALLBACK_SLOT_COUNT).map(LessonSlot::generic).collect();
    };

    let total_minutes = (end - start).num_minutes();
    (0..slot_count(total_minutes))
        .map(|i| {
            let (slot_start, _) =
                start.overflowing_add_signed(Duration::minutes(SLOT_MINUTES * i as i64));
            let (slot_end, _) = slot_start.overflowing_add_signed(Duration::minutes(SLOT_MINUTES));
            LessonSlot {
                index: i,
                start: Some(format_hhmm(slot_start)),
                end: Some(format_hhmm(slot_end)),
            }
        })
        .collect()
}
