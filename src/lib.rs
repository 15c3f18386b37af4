//! Compiles a Loughborough-style weekly timetable grid into dated calendar
//! events and an iCalendar document.

mod error;
mod event;
mod grid;
mod ics;
mod page;
mod week_index;
mod week_range;

pub mod cache;
pub mod cli;
pub mod fetch;
pub mod server;

use chrono::{DateTime, Utc};

pub use crate::error::{Error, Result};
pub use crate::event::{materialize, schedule_start, Calendar, Event, DEFAULT_START_HOUR, UID_DOMAIN};
pub use crate::grid::{
    cell_duration, clean, decode, decode_row, layout, resolve_weekday, Session, ONLINE,
    SLOT_MINUTES,
};
pub use crate::ics::{CONTENT_TYPE, FILE_NAME, PRODUCT_ID};
pub use crate::page::{CellFields, Page, Period, PeriodOption, TimetableCell, TimetableRow};
pub use crate::week_index::{Semester, WeekIndex};
pub use crate::week_range::expand as expand_weeks;

/// Parses a timetable page and compiles it, see [`Calendar::from_page`].
pub fn compile<S: AsRef<str>>(html: S, now: DateTime<Utc>) -> Result<Calendar> {
    Calendar::from_page(&Page::parse(html), now)
}

impl Calendar {
    /// Turns the extracted page into one event per session and active week.
    ///
    /// `now` becomes every event's generation stamp. Fails when no semester is
    /// selected, before any row is looked at, or when nothing is left to
    /// put in the calendar.
    pub fn from_page(page: &Page, now: DateTime<Utc>) -> Result<Self> {
        let semester = Semester::from_period_value(page.period.value.as_deref())?;
        let weeks = WeekIndex::build(semester, &page.period.options);
        let day_start = schedule_start(page.first_slot.as_deref());

        let sessions = decode(&page.rows);

        let events = sessions
            .iter()
            .flat_map(|session| materialize(session, &weeks, day_start, now))
            .collect::<Vec<_>>();

        log::info!(
            "Compiled {} events from {} sessions across {} weeks of {semester}",
            events.len(),
            sessions.len(),
            weeks.len()
        );

        if events.is_empty() {
            return Err(Error::EmptyResult);
        }

        Ok(Self { events })
    }
}
