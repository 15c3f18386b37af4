use chrono::{DateTime, Days, NaiveDateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use crate::grid::{Session, ONLINE};
use crate::page::leading_integer;
use crate::week_index::WeekIndex;

/// Suffix of every event UID.
pub const UID_DOMAIN: &str = "lboro";

/// Hour the first slot of a day starts at when the page doesn't say.
pub const DEFAULT_START_HOUR: u32 = 9;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Calendar {
    pub events: Vec<Event>,
}

/// One dated occurrence of a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub uid: String,
    pub generated_at: DateTime<Utc>,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub summary: String,
    pub location: String,
    pub description: String,
}

/// Wall-clock time of the first slot, read from a label such as `"9:00"`.
pub fn schedule_start(label: Option<&str>) -> NaiveTime {
    label
        .and_then(leading_integer)
        .and_then(|hour| NaiveTime::from_hms_opt(hour, 0, 0))
        .unwrap_or_else(|| {
            log::debug!("No usable first slot label {label:?}, starting days at {DEFAULT_START_HOUR}:00");
            NaiveTime::from_hms_opt(DEFAULT_START_HOUR, 0, 0).unwrap_or_default()
        })
}

/// Expands a session into one event per active week known to `weeks`.
///
/// Weeks missing from the index are skipped: a timetable may mention weeks
/// outside the displayed period.
pub fn materialize(
    session: &Session,
    weeks: &WeekIndex,
    day_start: NaiveTime,
    now: DateTime<Utc>,
) -> Vec<Event> {
    session
        .weeks
        .iter()
        .filter_map(|&week| {
            let Some(week_start) = weeks.get(week) else {
                log::debug!(
                    "Week {week} of {} is not in the selected period",
                    session.module_id
                );
                return None;
            };

            let date = week_start
                .checked_add_days(Days::new(u64::from(session.weekday.num_days_from_monday())))?;
            let start = date
                .and_time(day_start)
                .checked_add_signed(session.offset)?;
            let end = start.checked_add_signed(session.duration)?;

            Some(Event {
                uid: format!(
                    "{}-{}@{UID_DOMAIN}",
                    start.format("%Y%m%dT%H%M%S"),
                    session.module_id
                ),
                generated_at: now,
                start,
                end,
                summary: session.module_name.clone(),
                location: location(session),
                description: format!(
                    "{} ({}) with {} in {} {}",
                    session.module_name,
                    session.module_type,
                    session.lecturer,
                    session.room,
                    session.building
                ),
            })
        })
        .collect()
}

fn location(session: &Session) -> String {
    if session.room == ONLINE {
        ONLINE.to_string()
    } else {
        format!("{} ({})", session.room, session.building)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::{Datelike, Duration, NaiveDate, TimeZone, Weekday};

    fn session(weekday: Weekday, weeks: &[u32]) -> Session {
        Session {
            weekday,
            offset: Duration::minutes(90),
            duration: Duration::minutes(120),
            module_name: "Programming".into(),
            module_type: "Lab".into(),
            room: "N.0.01".into(),
            building: "Haslegrave".into(),
            lecturer: "Prof Jones".into(),
            module_id: "24COB107".into(),
            weeks: weeks.iter().copied().collect(),
        }
    }

    fn index() -> WeekIndex {
        [
            (1, NaiveDate::from_ymd_opt(2024, 1, 8).unwrap()),
            (2, NaiveDate::from_ymd_opt(2024, 1, 15).unwrap()),
            (4, NaiveDate::from_ymd_opt(2024, 1, 29).unwrap()),
        ]
        .into_iter()
        .collect()
    }

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, 0)
            .unwrap()
    }

    fn nine() -> NaiveTime {
        NaiveTime::from_hms_opt(9, 0, 0).unwrap()
    }

    #[test]
    fn start_time_comes_from_leading_hour() {
        assert_eq!(schedule_start(Some("8:00")), NaiveTime::from_hms_opt(8, 0, 0).unwrap());
        assert_eq!(schedule_start(Some("10")), NaiveTime::from_hms_opt(10, 0, 0).unwrap());
        assert_eq!(schedule_start(None), nine());
        assert_eq!(schedule_start(Some("morning")), nine());
        assert_eq!(schedule_start(Some("25:00")), nine());
    }

    #[test]
    fn materializes_one_event_per_known_week() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let events = materialize(&session(Weekday::Wed, &[4, 1, 3]), &index(), nine(), now);

        assert_eq!(
            events,
            vec![
                Event {
                    uid: "20240110T103000-24COB107@lboro".into(),
                    generated_at: now,
                    start: at(2024, 1, 10, 10, 30),
                    end: at(2024, 1, 10, 12, 30),
                    summary: "Programming".into(),
                    location: "N.0.01 (Haslegrave)".into(),
                    description: "Programming (Lab) with Prof Jones in N.0.01 Haslegrave".into(),
                },
                Event {
                    uid: "20240131T103000-24COB107@lboro".into(),
                    generated_at: now,
                    start: at(2024, 1, 31, 10, 30),
                    end: at(2024, 1, 31, 12, 30),
                    summary: "Programming".into(),
                    location: "N.0.01 (Haslegrave)".into(),
                    description: "Programming (Lab) with Prof Jones in N.0.01 Haslegrave".into(),
                },
            ]
        );
    }

    #[test]
    fn events_land_on_the_session_weekday() {
        let now = Utc::now();
        let index = index();

        for weekday in [Weekday::Mon, Weekday::Thu, Weekday::Sun] {
            for event in materialize(&session(weekday, &[1, 2, 4]), &index, nine(), now) {
                assert!(event.end > event.start);
                assert_eq!(event.start.date().weekday(), weekday);
            }
        }
    }

    #[test]
    fn online_sessions_have_plain_location() {
        let mut online = session(Weekday::Mon, &[1]);
        online.room = ONLINE.into();
        online.building = String::new();

        let events = materialize(&online, &index(), nine(), Utc::now());

        assert_eq!(events[0].location, "Online");
        assert_eq!(events[0].description, "Programming (Lab) with Prof Jones in Online ");
    }

    #[test]
    fn unknown_weeks_produce_nothing() {
        let events = materialize(&session(Weekday::Mon, &[7, 8]), &index(), nine(), Utc::now());

        assert!(events.is_empty());
    }
}
