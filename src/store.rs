use crate::lessons::LessonCell;
use crate::schedule::ScheduleRecord;

/// Storage the schedule core reads and writes through.
///
/// Writes are expected to run inside `atomically`; an `Err` from the
/// closure must leave none of its writes visible.
pub trait ScheduleStore {
    fn get_schedule(&self, schedule_id: &str) -> anyhow::Result<Option<ScheduleRecord>>;
    fn list_lessons(&self, schedule_id: &str) -> anyhow::Result<Vec<LessonCell>>;
    fn find_lesson(
        &self,
        schedule_id: &str,
        day_index: i64,
        lesson_index: i64,
    ) -> anyhow::Result<Option<LessonCell>>;

    fn delete_all_lessons(&self, schedule_id: &str) -> anyhow::Result<usize>;
    fn insert_lesson(&self, schedule_id: &str, cell: &LessonCell) -> anyhow::Result<()>;
    fn update_lesson(&self, schedule_id: &str, cell: &LessonCell) -> anyhow::Result<()>;
    fn save_title(&self, schedule_id: &str, title: &str) -> anyhow::Result<()>;

    fn atomically<T>(&self, f: impl FnOnce(&Self) -> anyhow::Result<T>) -> anyhow::Result<T>;
}
