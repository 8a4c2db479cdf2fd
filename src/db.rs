use crate::lessons::LessonCell;
use crate::schedule::ScheduleRecord;
use crate::store::ScheduleStore;
use crate::time_grid::{format_hhmm, parse_hhmm};
use crate::weekday;
use chrono::Duration;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use tracing::info;
use uuid::Uuid;

pub const DB_FILE_NAME: &str = "timetable.sqlite3";

pub fn open_db(workspace: &Path) -> anyhow::Result<Connection> {
    std::fs::create_dir_all(workspace)?;
    let db_path = workspace.join(DB_FILE_NAME);
    let conn = Connection::open(db_path)?;
    migrate(&conn)?;
    Ok(conn)
}

pub fn migrate(conn: &Connection) -> anyhow::Result<()> {
    conn.execute("PRAGMA foreign_keys = ON", [])?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS settings(
            key TEXT PRIMARY KEY,
            value_json TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS schedules(
            id TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            user_id TEXT NOT NULL,
            days_of_week TEXT,
            start_time TEXT,
            end_time TEXT,
            created_at TEXT,
            updated_at TEXT
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_schedules_user ON schedules(user_id)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS lessons(
            id TEXT PRIMARY KEY,
            schedule_id TEXT NOT NULL,
            day_index INTEGER NOT NULL,
            lesson_index INTEGER NOT NULL,
            subject_name TEXT NOT NULL DEFAULT '',
            color TEXT NOT NULL DEFAULT '#FFFFFF',
            font_family TEXT NOT NULL DEFAULT 'Arial',
            lesson_link TEXT,
            link_text TEXT,
            created_at TEXT,
            updated_at TEXT,
            FOREIGN KEY(schedule_id) REFERENCES schedules(id),
            UNIQUE(schedule_id, day_index, lesson_index)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_lessons_schedule ON lessons(schedule_id)",
        [],
    )?;

    // Workspaces from the lessons-per-day era have no end_time.
    ensure_schedules_end_time(conn)?;
    ensure_timestamps(conn, "schedules")?;
    ensure_timestamps(conn, "lessons")?;

    Ok(())
}

pub fn now_ts() -> String {
    chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

fn ensure_schedules_end_time(conn: &Connection) -> anyhow::Result<()> {
    if table_has_column(conn, "schedules", "end_time")? {
        return Ok(());
    }
    conn.execute("ALTER TABLE schedules ADD COLUMN end_time TEXT", [])?;

    if !table_has_column(conn, "schedules", "lessons_per_day")?
        || !table_has_column(conn, "schedules", "lesson_duration")?
    {
        return Ok(());
    }

    // Backfill end = start + count * duration so the derived grid keeps its shape.
    let mut stmt =
        conn.prepare("SELECT id, start_time, lessons_per_day, lesson_duration FROM schedules")?;
    let rows = stmt
        .query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, Option<String>>(1)?,
                row.get::<_, Option<i64>>(2)?,
                row.get::<_, Option<i64>>(3)?,
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let mut backfilled = 0usize;
    for (id, start, count, duration) in rows {
        let Some(start) = start.as_deref().and_then(parse_hhmm) else {
            continue;
        };
        let (Some(count), Some(duration)) = (count, duration) else {
            continue;
        };
        if count <= 0 || duration <= 0 {
            continue;
        }
        let (end, _) = start.overflowing_add_signed(Duration::minutes(count * duration));
        conn.execute(
            "UPDATE schedules SET end_time = ? WHERE id = ?",
            params![format_hhmm(end), id],
        )?;
        backfilled += 1;
    }
    info!(backfilled, "migrated legacy schedules to end_time");
    Ok(())
}

fn ensure_timestamps(conn: &Connection, table: &str) -> anyhow::Result<()> {
    for column in ["created_at", "updated_at"] {
        if !table_has_column(conn, table, column)? {
            conn.execute(
                &format!("ALTER TABLE {} ADD COLUMN {} TEXT", table, column),
                [],
            )?;
        }
        conn.execute(
            &format!("UPDATE {} SET {} = ? WHERE {} IS NULL", table, column, column),
            [now_ts()],
        )?;
    }
    Ok(())
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> anyhow::Result<bool> {
    let sql = format!("PRAGMA table_info({})", table);
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let name: String = row.get(1)?;
        if name == column {
            return Ok(true);
        }
    }
    Ok(false)
}

pub fn settings_get_json(conn: &Connection, key: &str) -> anyhow::Result<Option<serde_json::Value>> {
    let raw: Option<String> = conn
        .query_row(
            "SELECT value_json FROM settings WHERE key = ?",
            [key],
            |r| r.get(0),
        )
        .optional()?;
    match raw {
        Some(s) => Ok(serde_json::from_str(&s).ok()),
        None => Ok(None),
    }
}

pub fn settings_set_json(
    conn: &Connection,
    key: &str,
    value: &serde_json::Value,
) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO settings(key, value_json) VALUES(?, ?)
         ON CONFLICT(key) DO UPDATE SET value_json = excluded.value_json",
        params![key, serde_json::to_string(value)?],
    )?;
    Ok(())
}

const SCHEDULE_COLUMNS: &str =
    "id, title, user_id, days_of_week, start_time, end_time, created_at, updated_at";

fn schedule_from_row(row: &Row<'_>) -> rusqlite::Result<ScheduleRecord> {
    Ok(ScheduleRecord {
        id: row.get(0)?,
        title: row.get(1)?,
        user_id: row.get(2)?,
        days_of_week: row.get(3)?,
        start_time: row.get(4)?,
        end_time: row.get(5)?,
        created_at: row.get::<_, Option<String>>(6)?.unwrap_or_default(),
        updated_at: row.get::<_, Option<String>>(7)?.unwrap_or_default(),
    })
}

const LESSON_COLUMNS: &str =
    "day_index, lesson_index, subject_name, color, font_family, lesson_link, link_text";

fn lesson_from_row(row: &Row<'_>) -> rusqlite::Result<LessonCell> {
    Ok(LessonCell {
        day_index: row.get(0)?,
        lesson_index: row.get(1)?,
        subject_name: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
        color: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
        font_family: row.get::<_, Option<String>>(4)?.unwrap_or_default(),
        lesson_link: row.get::<_, Option<String>>(5)?.unwrap_or_default(),
        link_text: row.get::<_, Option<String>>(6)?.unwrap_or_default(),
    })
}

pub fn insert_schedule(
    conn: &Connection,
    user_id: &str,
    title: &str,
    days_json: &str,
    start_time: &str,
    end_time: &str,
) -> anyhow::Result<String> {
    let id = Uuid::new_v4().to_string();
    let ts = now_ts();
    conn.execute(
        "INSERT INTO schedules(id, title, user_id, days_of_week, start_time, end_time, created_at, updated_at)
         VALUES(?, ?, ?, ?, ?, ?, ?, ?)",
        params![id, title, user_id, days_json, start_time, end_time, ts, ts],
    )?;
    Ok(id)
}

pub fn list_schedules(conn: &Connection, user_id: &str) -> anyhow::Result<Vec<ScheduleRecord>> {
    let sql = format!(
        "SELECT {} FROM schedules WHERE user_id = ? ORDER BY created_at DESC, rowid DESC",
        SCHEDULE_COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([user_id], schedule_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// `(stored cells, cells with a subject)` for one schedule.
pub fn lesson_counts(conn: &Connection, schedule_id: &str) -> anyhow::Result<(i64, i64)> {
    let counts = conn.query_row(
        "SELECT COUNT(*), COALESCE(SUM(CASE WHEN TRIM(COALESCE(subject_name, '')) <> '' THEN 1 ELSE 0 END), 0)
         FROM lessons WHERE schedule_id = ?",
        [schedule_id],
        |r| Ok((r.get::<_, i64>(0)?, r.get::<_, i64>(1)?)),
    )?;
    Ok(counts)
}

pub fn delete_schedule(conn: &Connection, schedule_id: &str) -> anyhow::Result<usize> {
    conn.atomically(|tx| {
        let lessons = tx.delete_all_lessons(schedule_id)?;
        tx.execute("DELETE FROM schedules WHERE id = ?", [schedule_id])?;
        Ok(lessons)
    })
}

/// Rewrites misspelled day codes left by older editor builds in the
/// schedules owned by `user_id`. Rows whose day list cannot be decoded are
/// left alone, as are rows that differ only in case or spacing.
pub fn repair_day_codes(conn: &Connection, user_id: &str) -> anyhow::Result<usize> {
    let mut stmt = conn.prepare("SELECT id, days_of_week FROM schedules WHERE user_id = ?")?;
    let rows = stmt
        .query_map([user_id], |r| {
            Ok((r.get::<_, String>(0)?, r.get::<_, Option<String>>(1)?))
        })?
        .collect::<Result<Vec<_>, _>>()?;
    drop(stmt);

    conn.atomically(|tx| {
        let mut fixed = 0usize;
        for (id, raw) in &rows {
            let Some(raw) = raw else {
                continue;
            };
            let Ok(codes) = serde_json::from_str::<Vec<String>>(raw) else {
                continue;
            };
            let lowered: Vec<String> = codes.iter().map(|c| c.trim().to_ascii_lowercase()).collect();
            let corrected: Vec<String> = lowered
                .iter()
                .map(|c| weekday::correct_typo(c).to_string())
                .collect();
            if corrected == lowered {
                continue;
            }
            tx.execute(
                "UPDATE schedules SET days_of_week = ?, updated_at = ? WHERE id = ? AND user_id = ?",
                params![serde_json::to_string(&corrected)?, now_ts(), id, user_id],
            )?;
            info!(schedule_id = %id, "repaired day codes");
            fixed += 1;
        }
        Ok(fixed)
    })
}

impl ScheduleStore for Connection {
    fn get_schedule(&self, schedule_id: &str) -> anyhow::Result<Option<ScheduleRecord>> {
        let sql = format!("SELECT {} FROM schedules WHERE id = ?", SCHEDULE_COLUMNS);
        Ok(self
            .query_row(&sql, [schedule_id], schedule_from_row)
            .optional()?)
    }

    fn list_lessons(&self, schedule_id: &str) -> anyhow::Result<Vec<LessonCell>> {
        let sql = format!(
            "SELECT {} FROM lessons WHERE schedule_id = ? ORDER BY day_index, lesson_index",
            LESSON_COLUMNS
        );
        let mut stmt = self.prepare(&sql)?;
        let rows = stmt
            .query_map([schedule_id], lesson_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn find_lesson(
        &self,
        schedule_id: &str,
        day_index: i64,
        lesson_index: i64,
    ) -> anyhow::Result<Option<LessonCell>> {
        let sql = format!(
            "SELECT {} FROM lessons WHERE schedule_id = ? AND day_index = ? AND lesson_index = ?",
            LESSON_COLUMNS
        );
        Ok(self
            .query_row(
                &sql,
                params![schedule_id, day_index, lesson_index],
                lesson_from_row,
            )
            .optional()?)
    }

    fn delete_all_lessons(&self, schedule_id: &str) -> anyhow::Result<usize> {
        Ok(self.execute("DELETE FROM lessons WHERE schedule_id = ?", [schedule_id])?)
    }

    fn insert_lesson(&self, schedule_id: &str, cell: &LessonCell) -> anyhow::Result<()> {
        let ts = now_ts();
        self.execute(
            "INSERT INTO lessons(
                id, schedule_id, day_index, lesson_index, subject_name, color, font_family, lesson_link, link_text, created_at, updated_at
             ) VALUES(?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            params![
                Uuid::new_v4().to_string(),
                schedule_id,
                cell.day_index,
                cell.lesson_index,
                cell.subject_name,
                cell.color,
                cell.font_family,
                cell.lesson_link,
                cell.link_text,
                ts,
                ts
            ],
        )?;
        Ok(())
    }

    fn update_lesson(&self, schedule_id: &str, cell: &LessonCell) -> anyhow::Result<()> {
        self.execute(
            "UPDATE lessons SET subject_name = ?, color = ?, font_family = ?, lesson_link = ?, link_text = ?, updated_at = ?
             WHERE schedule_id = ? AND day_index = ? AND lesson_index = ?",
            params![
                cell.subject_name,
                cell.color,
                cell.font_family,
                cell.lesson_link,
                cell.link_text,
                now_ts(),
                schedule_id,
                cell.day_index,
                cell.lesson_index
            ],
        )?;
        Ok(())
    }

    fn save_title(&self, schedule_id: &str, title: &str) -> anyhow::Result<()> {
        self.execute(
            "UPDATE schedules SET title = ?, updated_at = ? WHERE id = ?",
            params![title, now_ts(), schedule_id],
        )?;
        Ok(())
    }

    fn atomically<T>(&self, f: impl FnOnce(&Self) -> anyhow::Result<T>) -> anyhow::Result<T> {
        let tx = self.unchecked_transaction()?;
        match f(&*tx) {
            Ok(v) => {
                tx.commit()?;
                Ok(v)
            }
            Err(e) => {
                let _ = tx.rollback();
                Err(e)
            }
        }
    }
}
