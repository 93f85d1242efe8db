use chrono::{DateTime, Datelike, FixedOffset, Timelike, Utc};
use lazy_static::lazy_static;

const KST_OFFSET_SECS: i32 = 9 * 3600;

lazy_static! {
    static ref KST: FixedOffset = FixedOffset::east_opt(KST_OFFSET_SECS).unwrap();
}

/// Current time in the Korean locale form the production log sheet expects:
/// `"YYYY. M. D 오전|오후 H:MM:SS"`.
pub fn korean_timestamp() -> String {
    korean_timestamp_at(Utc::now())
}

/// Korean 12-hour timestamp for a given instant (UTC+9).
///
/// Month, day and hour are not zero-padded; minutes and seconds are. The
/// 24-hour hour maps to 오전 (AM) below 12 and 오후 (PM) from 12, with both
/// 0 and 12 displayed as 12. Downstream sheet consumers parse this exact
/// shape, so it must not change.
pub fn korean_timestamp_at(instant: DateTime<Utc>) -> String {
    let local = instant.with_timezone(&*KST);

    let hour = local.hour();
    let period = if hour < 12 { "오전" } else { "오후" };
    let display_hour = match hour {
        0 => 12,
        h if h > 12 => h - 12,
        h => h,
    };

    format!(
        "{}. {}. {} {} {}:{:02}:{:02}",
        local.year(),
        local.month(),
        local.day(),
        period,
        display_hour,
        local.minute(),
        local.second()
    )
}

/// Current time in the defect log's padded 24-hour form:
/// `"YYYY. MM. DD. HH:MM:SS"`.
pub fn korean_timestamp_padded() -> String {
    korean_timestamp_padded_at(Utc::now())
}

/// Padded 24-hour Korean timestamp for a given instant (UTC+9). Note the
/// trailing period after the day; the defect sheet carries it.
pub fn korean_timestamp_padded_at(instant: DateTime<Utc>) -> String {
    let local = instant.with_timezone(&*KST);

    format!(
        "{}. {:02}. {:02}. {:02}:{:02}:{:02}",
        local.year(),
        local.month(),
        local.day(),
        local.hour(),
        local.minute(),
        local.second()
    )
}

/// Shorten an expiry date string `"YYYY-MM-DD"` to `"YY.MM.DD"`: the
/// century prefix is dropped and the dashes become periods.
pub fn expiry_code(expiry: &str) -> String {
    expiry.get(2..).unwrap_or(expiry).replace('-', ".")
}

/// Synthetic lot identifier written to the output log: the shortened
/// expiry date joined to the product lot with an underscore, e.g.
/// `"2025-08-09"` + `"AA"` → `"25.08.09_AA"`.
pub fn serial_lot_code(expiry: &str, product_lot: &str) -> String {
    format!("{}_{}", expiry_code(expiry), product_lot)
}
