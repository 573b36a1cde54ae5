use super::rows::DateRow;
use chrono::{Datelike, NaiveDate};
use std::collections::BTreeSet;
use tracing::debug;

const DAY_NAMES: [&str; 7] = [
    "Domingo",
    "Lunes",
    "Martes",
    "Miércoles",
    "Jueves",
    "Viernes",
    "Sábado",
];

const MONTH_NAMES: [&str; 12] = [
    "Enero",
    "Febrero",
    "Marzo",
    "Abril",
    "Mayo",
    "Junio",
    "Julio",
    "Agosto",
    "Septiembre",
    "Octubre",
    "Noviembre",
    "Diciembre",
];

const KEY_FORMAT: &str = "%Y-%m-%d";

/// Parses an upstream `M/D/Y` date, ignoring any trailing time part.
pub fn parse_source_date(raw: &str) -> Option<NaiveDate> {
    let date_part = raw.split_whitespace().next()?;
    let mut parts = date_part.split('/');
    let month = parts.next()?.trim().parse::<u32>().ok()?;
    let day = parts.next()?.trim().parse::<u32>().ok()?;
    let year = parts.next()?.trim().parse::<i32>().ok()?;
    if parts.next().is_some() {
        return None;
    }
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Canonical `YYYY-MM-DD` key for an upstream date, `None` when blank or invalid.
pub fn format_date(raw: Option<&str>) -> Option<String> {
    raw.and_then(parse_source_date)
        .map(|date| date.format(KEY_FORMAT).to_string())
}

/// Builds one calendar row per distinct valid key, sorted by key.
pub fn build_date_dimension<I, S>(keys: I) -> Vec<DateRow>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let unique: BTreeSet<String> = keys
        .into_iter()
        .map(|key| key.as_ref().trim().to_string())
        .filter(|key| !key.is_empty())
        .collect();

    unique
        .into_iter()
        .filter_map(|key| match NaiveDate::parse_from_str(&key, KEY_FORMAT) {
            Ok(date) => Some(date_row(key, date)),
            Err(err) => {
                debug!(date_key = %key, error = %err, "dropping unparseable date key");
                None
            }
        })
        .collect()
}

fn date_row(date_key: String, date: NaiveDate) -> DateRow {
    let month = date.month();
    let weekday = date.weekday().num_days_from_sunday();
    DateRow {
        date_key,
        year: date.year(),
        month_num: month,
        month_name: MONTH_NAMES[month as usize - 1],
        day_num: date.day(),
        weekday_num: weekday,
        weekday_name: DAY_NAMES[weekday as usize],
        quarter: quarter_label(month),
    }
}

fn quarter_label(month: u32) -> String {
    format!("Q{}", (month - 1) / 3 + 1)
}
