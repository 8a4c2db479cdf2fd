use crate::db;
use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};
use crate::weekday::Locale;
use serde_json::{json, Map, Value};

const LIST_MAX_ITEMS: usize = 200;

const DEFAULT_SUBJECTS: [&str; 32] = [
    "Математика",
    "Русский язык",
    "Литература",
    "История",
    "Обществознание",
    "География",
    "Биология",
    "Физика",
    "Химия",
    "Информатика",
    "Английский язык",
    "Немецкий язык",
    "Французский язык",
    "Испанский язык",
    "Физкультура",
    "ОБЖ",
    "Технология",
    "ИЗО",
    "Музыка",
    "МХК",
    "Астрономия",
    "Экономика",
    "Право",
    "Психология",
    "Экология",
    "Черчение",
    "Робототехника",
    "Программирование",
    "Веб-дизайн",
    "Основы предпринимательства",
    "Финансовая грамотность",
    "Краеведение",
];

const DEFAULT_COLORS: [&str; 20] = [
    "#FF6B6B", "#4ECDC4", "#45B7D1", "#F9A826", "#6C5CE7", "#FD79A8", "#00B894", "#FDCB6E",
    "#E17055", "#546DE5", "#D63031", "#00CEC9", "#FAB1A0", "#74B9FF", "#A29BFE", "#FFEAA7",
    "#B2BEC3", "#636E72", "#2D3436", "#FFFFFF",
];

#[derive(Clone, Copy)]
enum SetupSection {
    Display,
    Editor,
}

impl SetupSection {
    fn parse(s: &str) -> Option<Self> {
        match s {
            "display" => Some(Self::Display),
            "editor" => Some(Self::Editor),
            _ => None,
        }
    }

    fn key(self) -> &'static str {
        match self {
            Self::Display => "setup.display",
            Self::Editor => "setup.editor",
        }
    }
}

fn default_section(section: SetupSection) -> Value {
    match section {
        SetupSection::Display => json!({
            "locale": Locale::default().code()
        }),
        SetupSection::Editor => json!({
            "availableSubjects": DEFAULT_SUBJECTS,
            "popularColors": DEFAULT_COLORS
        }),
    }
}

fn as_object_mut(value: &mut Value) -> Result<&mut Map<String, Value>, String> {
    value
        .as_object_mut()
        .ok_or_else(|| "internal setup object must be a JSON object".to_string())
}

fn is_hex_color(s: &str) -> bool {
    let Some(hex) = s.strip_prefix('#') else {
        return false;
    };
    (hex.len() == 3 || hex.len() == 6) && hex.chars().all(|c| c.is_ascii_hexdigit())
}

fn parse_string_list(
    v: &Value,
    key: &str,
    max_len: usize,
    check: impl Fn(&str) -> bool,
) -> Result<Vec<String>, String> {
    let arr = v
        .as_array()
        .ok_or_else(|| format!("{} must be array of strings", key))?;
    if arr.len() > LIST_MAX_ITEMS {
        return Err(format!("{} must have at most {} items", key, LIST_MAX_ITEMS));
    }
    let mut out: Vec<String> = Vec::with_capacity(arr.len());
    for item in arr {
        let s = item
            .as_str()
            .ok_or_else(|| format!("{} must be array of strings", key))?
            .trim();
        if s.is_empty() || s.chars().count() > max_len || !check(s) {
            return Err(format!("{} has an invalid entry: {:?}", key, s));
        }
        if !out.iter().any(|x| x == s) {
            out.push(s.to_string());
        }
    }
    Ok(out)
}

fn merge_section_patch(
    section: SetupSection,
    current: &mut Value,
    patch: &Map<String, Value>,
) -> Result<(), String> {
    let obj = as_object_mut(current)?;
    for (k, v) in patch {
        match section {
            SetupSection::Display => match k.as_str() {
                "locale" => {
                    let locale = v
                        .as_str()
                        .and_then(Locale::parse)
                        .ok_or_else(|| "locale must be one of: ru, en".to_string())?;
                    obj.insert(k.clone(), Value::String(locale.code().to_string()));
                }
                _ => return Err(format!("unknown display field: {}", k)),
            },
            SetupSection::Editor => match k.as_str() {
                "availableSubjects" => {
                    let list = parse_string_list(v, k, 100, |_| true)?;
                    obj.insert(k.clone(), json!(list));
                }
                "popularColors" => {
                    let list = parse_string_list(v, k, 7, is_hex_color)?;
                    let list: Vec<String> = list.iter().map(|c| c.to_ascii_uppercase()).collect();
                    obj.insert(k.clone(), json!(list));
                }
                _ => return Err(format!("unknown editor field: {}", k)),
            },
        }
    }
    Ok(())
}

fn load_section(conn: &rusqlite::Connection, section: SetupSection) -> anyhow::Result<Value> {
    let mut current = default_section(section);
    if let Some(saved) = db::settings_get_json(conn, section.key())? {
        if let Some(saved_obj) = saved.as_object() {
            // Best-effort apply: a malformed stored value must not block reads.
            let _ = merge_section_patch(section, &mut current, saved_obj);
        }
    }
    Ok(current)
}

pub fn load_locale(conn: &rusqlite::Connection) -> Locale {
    load_section(conn, SetupSection::Display)
        .ok()
        .and_then(|v| v.get("locale").and_then(|l| l.as_str()).and_then(Locale::parse))
        .unwrap_or_default()
}

pub fn load_editor(conn: &rusqlite::Connection) -> Value {
    load_section(conn, SetupSection::Editor)
        .unwrap_or_else(|_| default_section(SetupSection::Editor))
}

fn handle_setup_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let display = match load_section(conn, SetupSection::Display) {
        Ok(v) => v,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };
    let editor = match load_section(conn, SetupSection::Editor) {
        Ok(v) => v,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };

    ok(
        &req.id,
        json!({
            "display": display,
            "editor": editor
        }),
    )
}

fn handle_setup_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let Some(section_raw) = req.params.get("section").and_then(|v| v.as_str()) else {
        return err(&req.id, "bad_params", "missing section", None);
    };
    let Some(section) = SetupSection::parse(section_raw) else {
        return err(&req.id, "bad_params", "unknown section", None);
    };
    let Some(patch_obj) = req.params.get("patch").and_then(|v| v.as_object()) else {
        return err(&req.id, "bad_params", "patch must be an object", None);
    };

    let mut current = match load_section(conn, section) {
        Ok(v) => v,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };
    if let Err(msg) = merge_section_patch(section, &mut current, patch_obj) {
        return err(&req.id, "bad_params", msg, None);
    }
    if let Err(e) = db::settings_set_json(conn, section.key(), &current) {
        return err(&req.id, "db_update_failed", e.to_string(), None);
    }
    ok(&req.id, json!({ "ok": true }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "setup.get" => Some(handle_setup_get(state, req)),
        "setup.update" => Some(handle_setup_update(state, req)),
        _ => None,
    }
}
