//! Text rendering of DuckDB values for ad-hoc query output.
//!
//! NULL renders as `"null"`. Dates and timestamps render in ISO form (UTC).

use duckdb::types::{TimeUnit, Value};

const MICROS_PER_SECOND: i64 = 1_000_000;
const SECONDS_PER_DAY: i64 = 86_400;

/// Render one value the way the CLI prints it.
pub fn render_value(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Boolean(b) => b.to_string(),
        Value::TinyInt(n) => n.to_string(),
        Value::SmallInt(n) => n.to_string(),
        Value::Int(n) => n.to_string(),
        Value::BigInt(n) => n.to_string(),
        Value::HugeInt(n) => n.to_string(),
        Value::UHugeInt(n) => n.to_string(),
        Value::UTinyInt(n) => n.to_string(),
        Value::USmallInt(n) => n.to_string(),
        Value::UInt(n) => n.to_string(),
        Value::UBigInt(n) => n.to_string(),
        Value::Float(n) => n.to_string(),
        Value::Double(n) => n.to_string(),
        Value::Decimal(d) => d.to_string(),
        Value::Text(s) | Value::Enum(s) => s.clone(),
        Value::Date32(days) => render_date(i64::from(*days)),
        Value::Timestamp(unit, raw) => render_timestamp(*unit, *raw),
        Value::List(items) | Value::Array(items) => {
            let inner: Vec<String> = items.iter().map(render_value).collect();
            format!("[{}]", inner.join(", "))
        }
        Value::Blob(bytes) => format!("<{} bytes>", bytes.len()),
        other => format!("{other:?}"),
    }
}

fn render_timestamp(unit: TimeUnit, raw: i64) -> String {
    let micros = unit.to_micros(raw);
    let days = micros.div_euclid(MICROS_PER_SECOND * SECONDS_PER_DAY);
    let in_day = micros.rem_euclid(MICROS_PER_SECOND * SECONDS_PER_DAY);
    let seconds = in_day / MICROS_PER_SECOND;
    let fraction = in_day % MICROS_PER_SECOND;

    let mut out = format!(
        "{} {:02}:{:02}:{:02}",
        render_date(days),
        seconds / 3600,
        seconds % 3600 / 60,
        seconds % 60
    );
    if fraction > 0 {
        out.push_str(&format!(".{fraction:06}"));
    }
    out
}

/// `days` since 1970-01-01 as `YYYY-MM-DD` in the proleptic Gregorian
/// calendar.
fn render_date(days: i64) -> String {
    let shifted = days + 719_468;
    let era = shifted.div_euclid(146_097);
    let day_of_era = shifted.rem_euclid(146_097);
    let year_of_era =
        (day_of_era - day_of_era / 1460 + day_of_era / 36_524 - day_of_era / 146_096) / 365;
    let day_of_year = day_of_era - (365 * year_of_era + year_of_era / 4 - year_of_era / 100);
    let mp = (5 * day_of_year + 2) / 153;
    let day = day_of_year - (153 * mp + 2) / 5 + 1;
    let month = if mp < 10 { mp + 3 } else { mp - 9 };
    let year = year_of_era + era * 400 + i64::from(month <= 2);
    format!("{year:04}-{month:02}-{day:02}")
}

#[cfg(test)]
#[path = "render_test.rs"]
mod tests;
