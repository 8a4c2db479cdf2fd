use crate::grid::ScheduleGrid;
use crate::schedule::{ScheduleError, ScheduleRecord};
use crate::store::ScheduleStore;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

pub const DEFAULT_COLOR: &str = "#FFFFFF";
pub const DEFAULT_FONT: &str = "Arial";

/// Fonts the editor offers, as `(family, category)`.
pub const AVAILABLE_FONTS: [(&str, &str); 10] = [
    ("Arial", "sans-serif"),
    ("Helvetica", "sans-serif"),
    ("Times New Roman", "serif"),
    ("Georgia", "serif"),
    ("Courier New", "monospace"),
    ("Verdana", "sans-serif"),
    ("Tahoma", "sans-serif"),
    ("Comic Sans MS", "handwriting"),
    ("Trebuchet MS", "sans-serif"),
    ("Impact", "sans-serif"),
];

/// Cell content as submitted by the editor. Every field is optional on the wire.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CellContent {
    pub subject_name: Option<String>,
    pub color: Option<String>,
    pub font_family: Option<String>,
    pub lesson_link: Option<String>,
    pub link_text: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LessonCell {
    pub day_index: i64,
    pub lesson_index: i64,
    pub subject_name: String,
    pub color: String,
    pub font_family: String,
    pub lesson_link: String,
    pub link_text: String,
}

impl LessonCell {
    pub fn from_content(day_index: i64, lesson_index: i64, content: &CellContent) -> Self {
        Self {
            day_index,
            lesson_index,
            subject_name: trimmed(content.subject_name.as_deref()),
            color: content
                .color
                .as_deref()
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .unwrap_or(DEFAULT_COLOR)
                .to_string(),
            font_family: normalize_font(content.font_family.as_deref()).to_string(),
            lesson_link: trimmed(content.lesson_link.as_deref()),
            link_text: trimmed(content.link_text.as_deref()),
        }
    }

    pub fn key(&self) -> String {
        cell_key(self.day_index, self.lesson_index)
    }

    pub fn has_content(&self) -> bool {
        !self.subject_name.is_empty()
    }
}

fn trimmed(v: Option<&str>) -> String {
    v.map(str::trim).unwrap_or("").to_string()
}

pub fn normalize_font(raw: Option<&str>) -> &'static str {
    let Some(raw) = raw.map(str::trim) else {
        return DEFAULT_FONT;
    };
    AVAILABLE_FONTS
        .iter()
        .find(|(family, _)| family.eq_ignore_ascii_case(raw))
        .map(|(family, _)| *family)
        .unwrap_or(DEFAULT_FONT)
}

pub fn cell_key(day_index: i64, lesson_index: i64) -> String {
    format!("{}_{}", day_index, lesson_index)
}

/// Splits a `"{day}_{lesson}"` key. Anything but exactly two integers is `None`.
pub fn parse_cell_key(key: &str) -> Option<(i64, i64)> {
    let mut parts = key.split('_');
    let day = parts.next()?.trim().parse::<i64>().ok()?;
    let lesson = parts.next()?.trim().parse::<i64>().ok()?;
    if parts.next().is_some() {
        return None;
    }
    Some((day, lesson))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    MalformedKey,
    MalformedContent,
    OutOfRange,
    DuplicateCell,
}

impl RejectReason {
    pub fn code(self) -> &'static str {
        match self {
            Self::MalformedKey => "bad_key",
            Self::MalformedContent => "bad_params",
            Self::OutOfRange => "out_of_range",
            Self::DuplicateCell => "duplicate_cell",
        }
    }

    pub fn message(self) -> &'static str {
        match self {
            Self::MalformedKey => "key must be \"{day}_{lesson}\" with integer parts",
            Self::MalformedContent => "cell content must be an object",
            Self::OutOfRange => "cell is outside the schedule grid",
            Self::DuplicateCell => "another key in the batch names the same cell",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedEdit {
    pub key: String,
    pub reason: RejectReason,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EditPlan {
    pub accepted: Vec<LessonCell>,
    pub rejected: Vec<RejectedEdit>,
}

/// Validates a batch of keyed edits against `grid` without touching storage.
pub fn plan_edits(grid: &ScheduleGrid, edits: &BTreeMap<String, CellContent>) -> EditPlan {
    let mut plan = EditPlan::default();
    // Key that produced each accepted cell, by position in `plan.accepted`.
    let mut accepted_keys: Vec<&String> = Vec::new();
    for (key, content) in edits {
        let Some((day_index, lesson_index)) = parse_cell_key(key) else {
            plan.rejected.push(RejectedEdit {
                key: key.clone(),
                reason: RejectReason::MalformedKey,
            });
            continue;
        };
        if !grid.validate_coordinate(day_index, lesson_index) {
            plan.rejected.push(RejectedEdit {
                key: key.clone(),
                reason: RejectReason::OutOfRange,
            });
            continue;
        }
        let cell = LessonCell::from_content(day_index, lesson_index, content);
        // "0_1" and "00_1" name the same cell; the later key wins and the
        // earlier one is reported.
        if let Some(pos) = plan
            .accepted
            .iter()
            .position(|c| c.day_index == day_index && c.lesson_index == lesson_index)
        {
            plan.rejected.push(RejectedEdit {
                key: accepted_keys[pos].to_string(),
                reason: RejectReason::DuplicateCell,
            });
            plan.accepted[pos] = cell;
            accepted_keys[pos] = key;
        } else {
            plan.accepted.push(cell);
            accepted_keys.push(key);
        }
    }
    plan
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplaceOutcome {
    pub saved: usize,
    pub deleted: usize,
    pub rejected: Vec<RejectedEdit>,
}

/// Applies cell edits for one schedule on behalf of one user.
pub struct LessonReconciler<'a, S: ScheduleStore> {
    store: &'a S,
}

impl<'a, S: ScheduleStore> LessonReconciler<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Loads the schedule, checks ownership and derives its current grid.
    pub fn load(
        &self,
        schedule_id: &str,
        user_id: &str,
    ) -> Result<(ScheduleRecord, ScheduleGrid), ScheduleError> {
        let record = self
            .store
            .get_schedule(schedule_id)?
            .ok_or(ScheduleError::NotFound)?;
        record.ensure_owner(user_id)?;
        let grid = ScheduleGrid::for_record(&record);
        Ok((record, grid))
    }

    pub fn lessons_by_key(
        &self,
        schedule_id: &str,
        user_id: &str,
    ) -> Result<BTreeMap<String, LessonCell>, ScheduleError> {
        self.load(schedule_id, user_id)?;
        let cells = self.store.list_lessons(schedule_id)?;
        Ok(cells.into_iter().map(|c| (c.key(), c)).collect())
    }

    /// Replaces every stored cell of the schedule with the accepted edits.
    ///
    /// Cells missing from `edits` are deleted. Rejected keys are reported,
    /// they never abort the batch.
    pub fn replace_all(
        &self,
        schedule_id: &str,
        user_id: &str,
        edits: &BTreeMap<String, CellContent>,
    ) -> Result<ReplaceOutcome, ScheduleError> {
        let (_, grid) = self.load(schedule_id, user_id)?;
        let plan = plan_edits(&grid, edits);
        for r in &plan.rejected {
            debug!(schedule_id, key = %r.key, reason = r.reason.code(), "edit rejected");
        }

        let deleted = self.store.atomically(|tx| {
            let deleted = tx.delete_all_lessons(schedule_id)?;
            for cell in &plan.accepted {
                tx.insert_lesson(schedule_id, cell)?;
            }
            Ok(deleted)
        })?;

        if !plan.rejected.is_empty() {
            warn!(
                schedule_id,
                rejected = plan.rejected.len(),
                "ignored edits outside the grid or with bad keys"
            );
        }
        info!(
            schedule_id,
            deleted,
            saved = plan.accepted.len(),
            filled = plan.accepted.iter().filter(|c| c.has_content()).count(),
            "replaced lessons"
        );
        Ok(ReplaceOutcome {
            saved: plan.accepted.len(),
            deleted,
            rejected: plan.rejected,
        })
    }

    /// Writes one cell, inserting it when absent. Other cells are untouched.
    pub fn update_single(
        &self,
        schedule_id: &str,
        user_id: &str,
        day_index: i64,
        lesson_index: i64,
        content: &CellContent,
    ) -> Result<LessonCell, ScheduleError> {
        let (_, grid) = self.load(schedule_id, user_id)?;
        if !grid.validate_coordinate(day_index, lesson_index) {
            return Err(ScheduleError::OutOfRange {
                day_index,
                lesson_index,
            });
        }
        let cell = LessonCell::from_content(day_index, lesson_index, content);
        self.store.atomically(|tx| {
            if tx
                .find_lesson(schedule_id, day_index, lesson_index)?
                .is_some()
            {
                tx.update_lesson(schedule_id, &cell)
            } else {
                tx.insert_lesson(schedule_id, &cell)
            }
        })?;
        debug!(schedule_id, key = %cell.key(), "lesson updated");
        Ok(cell)
    }
}
