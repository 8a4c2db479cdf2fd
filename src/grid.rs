use crate::schedule::{ScheduleConfig, ScheduleRecord};
use crate::time_grid::{self, LessonSlot};
use crate::weekday::{self, DayCode, Locale};
use serde_json::json;

/// Day x slot shape of one schedule. Derived on every read, never stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleGrid {
    pub days: Vec<DayCode>,
    pub slots: Vec<LessonSlot>,
}

impl ScheduleGrid {
    pub fn build(config: &ScheduleConfig) -> Self {
        Self {
            days: config.days.clone(),
            slots: time_grid::compute_slots(Some(&config.start_time), Some(&config.end_time)),
        }
    }

    /// Grid for a persisted row. Goes through the same lenient decoding the
    /// read paths use, so a damaged row still yields a usable grid.
    pub fn for_record(record: &ScheduleRecord) -> Self {
        let days = match record.days_of_week.as_deref() {
            Some(raw) => weekday::normalize_str(raw),
            None => weekday::normalize(&serde_json::Value::Null),
        };
        Self {
            days,
            slots: time_grid::compute_slots(
                record.start_time.as_deref(),
                record.end_time.as_deref(),
            ),
        }
    }

    pub fn day_count(&self) -> usize {
        self.days.len()
    }

    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    pub fn cell_count(&self) -> usize {
        self.days.len() * self.slots.len()
    }

    /// The one place that decides whether a cell is addressable.
    pub fn validate_coordinate(&self, day_index: i64, lesson_index: i64) -> bool {
        day_index >= 0
            && lesson_index >= 0
            && (day_index as u64) < self.days.len() as u64
            && (lesson_index as u64) < self.slots.len() as u64
    }

    pub fn to_json(&self, locale: Locale) -> serde_json::Value {
        let days: Vec<serde_json::Value> = self
            .days
            .iter()
            .enumerate()
            .map(|(i, d)| {
                json!({
                    "index": i,
                    "code": d.as_str(),
                    "label": d.label(locale),
                    "known": d.is_known(),
                })
            })
            .collect();
        let slots: Vec<serde_json::Value> = self
            .slots
            .iter()
            .map(|s| {
                let label = match (&s.start, &s.end) {
                    (Some(a), Some(b)) => format!("{} - {}", a, b),
                    _ => locale.generic_slot_label(s.index),
                };
                json!({
                    "index": s.index,
                    "start": s.start,
                    "end": s.end,
                    "label": label,
                })
            })
            .collect();
        json!({ "days": days, "slots": slots })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(days: Option<&str>, start: Option<&str>, end: Option<&str>) -> ScheduleRecord {
        ScheduleRecord {
            id: "s".into(),
            title: "t".into(),
            user_id: "u".into(),
            days_of_week: days.map(String::from),
            start_time: start.map(String::from),
            end_time: end.map(String::from),
            created_at: String::new(),
            updated_at: String::new(),
        }
    }

    #[test]
    fn build_composes_days_and_slots() {
        let cfg = ScheduleConfig::new("t", &json!(["mon", "wed"]), "09:00", "12:00").unwrap();
        let grid = ScheduleGrid::build(&cfg);
        assert_eq!(grid.day_count(), 2);
        assert_eq!(grid.slot_count(), 3);
        assert_eq!(grid.cell_count(), 6);
    }

    #[test]
    fn validate_coordinate_bounds() {
        let grid = ScheduleGrid::for_record(&record(
            Some("[\"mon\",\"tue\",\"wed\",\"thu\",\"fri\"]"),
            Some("09:00"),
            Some("12:00"),
        ));
        for d in -1..7i64 {
            for l in -1..5i64 {
                let expected = (0..5).contains(&d) && (0..3).contains(&l);
                assert_eq!(grid.validate_coordinate(d, l), expected, "({}, {})", d, l);
            }
        }
        assert!(!grid.validate_coordinate(i64::MAX, 0));
    }

    #[test]
    fn damaged_record_still_has_a_grid() {
        let grid = ScheduleGrid::for_record(&record(Some("{oops"), None, Some("10:00")));
        assert_eq!(grid.day_count(), 1);
        assert_eq!(grid.slot_count(), 6);

        let grid = ScheduleGrid::for_record(&record(None, None, None));
        assert_eq!(grid.day_count(), 5);
    }

    #[test]
    fn json_labels_generic_slots() {
        let grid = ScheduleGrid::for_record(&record(Some("[\"san\"]"), None, None));
        let v = grid.to_json(Locale::Ru);
        assert_eq!(v["days"][0]["code"], "sun");
        assert_eq!(v["days"][0]["label"], "Воскресенье");
        assert_eq!(v["slots"][0]["label"], "Урок 1");
        assert!(v["slots"][0]["start"].is_null());
    }
}
