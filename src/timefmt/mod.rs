//! Relative and absolute time formatting for toast subtexts.
//!
//! Pure functions over [`chrono`] timestamps plus a [`Locale`] phrase table.
//! Invalid input always degrades to an empty string or the locale's fallback
//! phrase; nothing here can fail a render.

use chrono::{DateTime, Datelike, NaiveDateTime, Timelike, Utc};

/// Seconds below which an event is still "just now" (6 minutes).
const JUST_NOW_THRESHOLD_SECS: i64 = 360;
const HOUR_SECS: i64 = 3_600;
const DAY_SECS: i64 = 86_400;
const WEEK_DAYS: i64 = 7;

/// Phrase table for one display language.
///
/// Count-bearing templates contain a literal `{n}` that is substituted with
/// the computed number. The default locale is English; the original
/// deployment's Indonesian copy is available via [`Locale::indonesian`].
#[derive(Debug, Clone)]
pub struct Locale {
    pub just_now: String,
    /// `{n}` minutes-ago template.
    pub minutes_ago: String,
    /// `{n}` hours-ago template.
    pub hours_ago: String,
    pub yesterday: String,
    /// `{n}` days-ago template, used for 2..=6 days.
    pub days_ago: String,
    /// Capped phrase for anything a week old or older.
    pub about_a_week: String,
    /// Shown when a timestamp is missing or unparseable.
    pub fallback: String,
    /// Stand-in for a missing buyer name.
    pub placeholder_name: String,
    /// Stand-in for a missing product name.
    pub placeholder_product: String,
    /// Sunday-first weekday names.
    pub weekdays: [String; 7],
    /// Aggregate period phrase for a one-day trailing window.
    pub period_last_day: String,
    /// Aggregate period phrase for an `{n}`-day trailing window.
    pub period_last_days: String,
}

impl Default for Locale {
    fn default() -> Self {
        Self {
            just_now: "just now".into(),
            minutes_ago: "{n} minutes ago".into(),
            hours_ago: "{n} hours ago".into(),
            yesterday: "yesterday".into(),
            days_ago: "{n} days ago".into(),
            about_a_week: "about a week ago".into(),
            fallback: "a while ago".into(),
            placeholder_name: "Someone".into(),
            placeholder_product: "this product".into(),
            weekdays: [
                "Sunday".into(),
                "Monday".into(),
                "Tuesday".into(),
                "Wednesday".into(),
                "Thursday".into(),
                "Friday".into(),
                "Saturday".into(),
            ],
            period_last_day: "in the last 24 hours".into(),
            period_last_days: "in the last {n} days".into(),
        }
    }
}

impl Locale {
    /// The phrase table the original widget shipped with.
    pub fn indonesian() -> Self {
        Self {
            just_now: "Baru saja".into(),
            minutes_ago: "{n} menit lalu".into(),
            hours_ago: "{n} jam lalu".into(),
            yesterday: "Kemarin".into(),
            days_ago: "{n} hari lalu".into(),
            about_a_week: "sekitar seminggu lalu".into(),
            fallback: "Beberapa waktu lalu".into(),
            placeholder_name: "Seseorang".into(),
            placeholder_product: "produk ini".into(),
            weekdays: [
                "Minggu".into(),
                "Senin".into(),
                "Selasa".into(),
                "Rabu".into(),
                "Kamis".into(),
                "Jumat".into(),
                "Sabtu".into(),
            ],
            period_last_day: "dalam 24 jam terakhir".into(),
            period_last_days: "dalam {n} hari terakhir".into(),
        }
    }

    /// Period phrase for an aggregate toast's trailing window.
    pub fn period_phrase(&self, days: u32) -> String {
        if days <= 1 {
            self.period_last_day.clone()
        } else {
            fill(&self.period_last_days, i64::from(days))
        }
    }
}

fn fill(template: &str, n: i64) -> String {
    template.replace("{n}", &n.to_string())
}

/// Parse a backend timestamp string.
///
/// Accepts RFC 3339 (what the REST backend emits) and the bare
/// `YYYY-MM-DDTHH:MM:SS` shape some rows carry, interpreted as UTC.
/// Returns `None` for anything else; callers fall back per the data-error
/// policy instead of surfacing an error.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

/// Zero-padded 24-hour "HH:MM", or an empty string when the timestamp is
/// missing.
pub fn hours_minutes(ts: Option<DateTime<Utc>>) -> String {
    match ts {
        Some(dt) => format!("{:02}:{:02}", dt.hour(), dt.minute()),
        None => String::new(),
    }
}

/// Banded relative phrase for a timestamp against `now`.
///
/// Bands: under 6 minutes "just now", under an hour minutes, under a day
/// hours, one day "yesterday", under a week days, and everything older
/// collapses to the capped about-a-week phrase. A timestamp ahead of `now`
/// (backend/host clock skew on a fresh event) still lands in the just-now
/// band; only a missing timestamp yields the locale fallback.
pub fn relative_phrase(ts: Option<DateTime<Utc>>, now: DateTime<Utc>, locale: &Locale) -> String {
    let Some(ts) = ts else {
        return locale.fallback.clone();
    };

    let secs = (now - ts).num_seconds();
    if secs < JUST_NOW_THRESHOLD_SECS {
        locale.just_now.clone()
    } else if secs < HOUR_SECS {
        fill(&locale.minutes_ago, secs / 60)
    } else if secs < DAY_SECS {
        fill(&locale.hours_ago, secs / HOUR_SECS)
    } else {
        let days = secs / DAY_SECS;
        if days == 1 {
            locale.yesterday.clone()
        } else if days < WEEK_DAYS {
            fill(&locale.days_ago, days)
        } else {
            locale.about_a_week.clone()
        }
    }
}

/// Localized weekday name, or an empty string when the timestamp is missing.
pub fn day_name(ts: Option<DateTime<Utc>>, locale: &Locale) -> String {
    match ts {
        Some(dt) => {
            let idx = dt.weekday().num_days_from_sunday() as usize;
            locale.weekdays[idx].clone()
        }
        None => String::new(),
    }
}
