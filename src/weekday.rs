use serde_json::Value;

pub const DEFAULT_DAYS: [Weekday; 5] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
];

/// Misspellings found in schedules written by older editor builds.
const TYPO_CORRECTIONS: [(&str, &str); 4] = [
    ("san", "sun"),
    ("sut", "sat"),
    ("thus", "thu"),
    ("wend", "wed"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Weekday {
    Mon,
    Tue,
    Wed,
    Thu,
    Fri,
    Sat,
    Sun,
}

impl Weekday {
    pub const ALL: [Weekday; 7] = [
        Weekday::Mon,
        Weekday::Tue,
        Weekday::Wed,
        Weekday::Thu,
        Weekday::Fri,
        Weekday::Sat,
        Weekday::Sun,
    ];

    pub fn parse(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|d| d.code() == code)
    }

    pub fn code(self) -> &'static str {
        match self {
            Self::Mon => "mon",
            Self::Tue => "tue",
            Self::Wed => "wed",
            Self::Thu => "thu",
            Self::Fri => "fri",
            Self::Sat => "sat",
            Self::Sun => "sun",
        }
    }

    fn label(self, locale: Locale) -> &'static str {
        match locale {
            Locale::Ru => match self {
                Self::Mon => "Понедельник",
                Self::Tue => "Вторник",
                Self::Wed => "Среда",
                Self::Thu => "Четверг",
                Self::Fri => "Пятница",
                Self::Sat => "Суббота",
                Self::Sun => "Воскресенье",
            },
            Locale::En => match self {
                Self::Mon => "Monday",
                Self::Tue => "Tuesday",
                Self::Wed => "Wednesday",
                Self::Thu => "Thursday",
                Self::Fri => "Friday",
                Self::Sat => "Saturday",
                Self::Sun => "Sunday",
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Locale {
    #[default]
    Ru,
    En,
}

impl Locale {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ru" => Some(Self::Ru),
            "en" => Some(Self::En),
            _ => None,
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            Self::Ru => "ru",
            Self::En => "en",
        }
    }

    pub fn unknown_day_label(self, raw: &str) -> String {
        match self {
            Self::Ru => format!("День ({})", raw),
            Self::En => format!("Day ({})", raw),
        }
    }

    pub fn generic_slot_label(self, index: usize) -> String {
        match self {
            Self::Ru => format!("Урок {}", index + 1),
            Self::En => format!("Lesson {}", index + 1),
        }
    }
}

/// One entry of a schedule's day axis. Codes that survive typo correction
/// but still are not weekdays are carried along verbatim so that a
/// damaged schedule stays readable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DayCode {
    Known(Weekday),
    Unknown(String),
}

impl DayCode {
    pub fn from_raw(raw: &str) -> Self {
        let code = raw.trim().to_ascii_lowercase();
        let corrected = correct_typo(&code);
        match Weekday::parse(corrected) {
            Some(day) => Self::Known(day),
            None => Self::Unknown(raw.trim().to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Known(day) => day.code(),
            Self::Unknown(raw) => raw.as_str(),
        }
    }

    pub fn is_known(&self) -> bool {
        matches!(self, Self::Known(_))
    }

    pub fn label(&self, locale: Locale) -> String {
        match self {
            Self::Known(day) => day.label(locale).to_string(),
            Self::Unknown(raw) => locale.unknown_day_label(raw),
        }
    }
}

pub fn correct_typo(code: &str) -> &str {
    TYPO_CORRECTIONS
        .iter()
        .find(|(typo, _)| *typo == code)
        .map(|(_, fixed)| *fixed)
        .unwrap_or(code)
}

fn default_days() -> Vec<DayCode> {
    DEFAULT_DAYS.iter().copied().map(DayCode::Known).collect()
}

fn from_items<'a, I>(items: I) -> Vec<DayCode>
where
    I: IntoIterator<Item = &'a str>,
{
    items
        .into_iter()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(DayCode::from_raw)
        .collect()
}

/// Normalizes a stored or submitted day list.
///
/// Accepts a JSON array of strings, a JSON-encoded array inside a string,
/// a comma-joined string, or a single code. Anything that cannot be read
/// as one of those degrades to Monday..Friday instead of failing.
pub fn normalize(raw: &Value) -> Vec<DayCode> {
    match raw {
        Value::Array(items) => {
            let mut codes = Vec::with_capacity(items.len());
            for item in items {
                let Some(s) = item.as_str() else {
                    return default_days();
                };
                codes.extend(from_items([s]));
            }
            codes
        }
        Value::String(s) => normalize_str(s),
        _ => default_days(),
    }
}

pub fn normalize_str(raw: &str) -> Vec<DayCode> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return default_days();
    }
    if trimmed.starts_with('[') {
        return match serde_json::from_str::<Vec<String>>(trimmed) {
            Ok(items) => from_items(items.iter().map(String::as_str)),
            Err(_) => default_days(),
        };
    }
    if trimmed.contains(',') {
        return from_items(trimmed.split(','));
    }
    from_items([trimmed])
}

pub fn encode(days: &[DayCode]) -> String {
    let codes: Vec<&str> = days.iter().map(DayCode::as_str).collect();
    serde_json::to_string(&codes).unwrap_or_else(|_| "[]".to_string())
}
