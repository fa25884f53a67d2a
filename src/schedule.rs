use chrono::{
    DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, SecondsFormat, Utc, Weekday,
};
use log::{debug, warn};

/// Titles look like `2024.03.07`.
pub const TITLE_FORMAT: &str = "%Y.%m.%d";

/// Weeks are generated below this ISO week number and never roll over into
/// the next year.
const WEEK_CAP: u32 = 53;

/// Target dates of the next `count` weekly milestones, starting with the
/// current ISO week, in ascending order.
///
/// Weeks past the cap are not generated, so close to the end of the year the
/// result holds fewer than `count` dates. A week in which `weekday` cannot be
/// built is left out.
pub fn desired_milestones(today: NaiveDate, count: u32, weekday: Weekday) -> Vec<NaiveDate> {
    let iso = today.iso_week();
    let year = iso.year();
    let first_week = iso.week();
    let end_week = first_week.saturating_add(count).min(WEEK_CAP);

    let mut desired = Vec::new();
    for week in first_week..end_week {
        match NaiveDate::from_isoywd_opt(year, week, weekday) {
            Some(date) => desired.push(date),
            None => warn!(
                "Skipping week {} of {}, it is missing the target day {}",
                week, year, weekday
            ),
        }
    }

    debug!("Desired milestones for {}: {:?}", today, desired);
    desired
}

pub fn milestone_title(date: NaiveDate) -> String {
    date.format(TITLE_FORMAT).to_string()
}

/// Reads a milestone title back into its target date. Titles that are not
/// dates belong to somebody else and yield `None`.
pub fn parse_milestone_title(title: &str) -> Option<NaiveDate> {
    // chrono skips whitespace ahead of numeric fields; titles must match exactly.
    if title.trim() != title {
        return None;
    }
    NaiveDate::parse_from_str(title, TITLE_FORMAT).ok()
}

/// Midnight UTC, `offset` before the target date.
pub fn due_date_for(target: NaiveDate, offset: Duration) -> DateTime<Utc> {
    (target - offset).and_time(NaiveTime::MIN).and_utc()
}

pub fn format_due_on(due_on: DateTime<Utc>) -> String {
    due_on.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Parses a `due_on` value from the API.
///
/// Accepts RFC 3339 with any offset, and a bare timestamp without zone which
/// is taken to be UTC.
pub fn parse_due_on(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }

    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .map(|naive| naive.and_utc())
}

/// Strictly later than `due_on + grace`: a milestone exactly at the boundary
/// stays open.
pub fn is_expired(due_on: DateTime<Utc>, now: DateTime<Utc>, grace: Duration) -> bool {
    now > due_on + grace
}
