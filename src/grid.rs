use std::collections::BTreeSet;

use chrono::{Duration, Weekday};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::page::{TimetableCell, TimetableRow};
use crate::week_range;

/// Length of one grid slot.
pub const SLOT_MINUTES: i64 = 30;

/// Room text of a session that has no physical room.
pub const ONLINE: &str = "Online";

const DAYS: [(&str, Weekday); 7] = [
    ("Monday", Weekday::Mon),
    ("Tuesday", Weekday::Tue),
    ("Wednesday", Weekday::Wed),
    ("Thursday", Weekday::Thu),
    ("Friday", Weekday::Fri),
    ("Saturday", Weekday::Sat),
    ("Sunday", Weekday::Sun),
];

static FILLER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\.{3,}|[()]").unwrap());

/// A teaching activity decoded from one grid cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub weekday: Weekday,
    /// Distance from the start of the day's first slot.
    pub offset: Duration,
    pub duration: Duration,
    pub module_name: String,
    pub module_type: String,
    pub room: String,
    pub building: String,
    pub lecturer: String,
    pub module_id: String,
    pub weeks: BTreeSet<u32>,
}

/// Finds the weekday governing `rows[index]`.
///
/// A weekday header row governs every following row up to the next header,
/// so this scans backwards from `index` for the nearest labelled row.
pub fn resolve_weekday(rows: &[TimetableRow], index: usize) -> Option<Weekday> {
    let label = rows
        .get(..=index)?
        .iter()
        .rev()
        .find_map(|row| row.weekday.as_deref())?;

    DAYS.iter()
        .find(|(name, _)| *name == label.trim())
        .map(|(_, weekday)| *weekday)
}

/// Time a cell occupies on its row.
pub fn cell_duration(cell: &TimetableCell) -> Duration {
    Duration::minutes(i64::from(cell.span.max(1)) * SLOT_MINUTES)
}

/// Places each cell of a row on the row's timeline as `(offset, duration, cell)`.
///
/// Offsets accumulate from zero, so every cell starts where its left
/// neighbour ends. The row stops at the first cell whose end no longer fits
/// in a `Duration`.
pub fn layout(
    cells: &[TimetableCell],
) -> impl Iterator<Item = (Duration, Duration, &TimetableCell)> {
    cells.iter().scan(Duration::zero(), |offset, cell| {
        let duration = cell_duration(cell);
        let placed = (*offset, duration, cell);
        *offset = offset.checked_add(&duration)?;
        Some(placed)
    })
}

/// Decodes the sessions of one row whose weekday is already known.
///
/// Filler cells and on-demand sessions still take up time but yield nothing.
pub fn decode_row(row: &TimetableRow, weekday: Weekday) -> Vec<Session> {
    layout(&row.cells)
        .filter(|(_, _, cell)| cell.is_session && !cell.is_on_demand)
        .map(|(offset, duration, cell)| decode_cell(cell, weekday, offset, duration))
        .collect()
}

/// Decodes every row, dropping rows no weekday can be found for.
pub fn decode(rows: &[TimetableRow]) -> Vec<Session> {
    rows.iter()
        .enumerate()
        .flat_map(|(index, row)| match resolve_weekday(rows, index) {
            Some(weekday) => decode_row(row, weekday),
            None => {
                log::debug!("Dropping row {index}: no weekday label");
                Vec::new()
            }
        })
        .collect()
}

fn decode_cell(
    cell: &TimetableCell,
    weekday: Weekday,
    offset: Duration,
    duration: Duration,
) -> Session {
    let fields = &cell.fields;

    let room = Some(clean(fields.room.as_deref().unwrap_or_default()))
        .filter(|room| !room.is_empty())
        .unwrap_or_else(|| ONLINE.to_string());

    Session {
        weekday,
        offset,
        duration,
        module_name: fields.module_name.clone(),
        module_type: fields.module_type.clone(),
        room,
        building: clean(fields.building.as_deref().unwrap_or_default()),
        lecturer: fields.lecturer.clone(),
        module_id: fields.module_id.clone(),
        weeks: week_range::expand(&fields.weeks_raw),
    }
}

/// Strips runs of three or more dots and parentheses.
pub fn clean(s: &str) -> String {
    FILLER.replace_all(s, "").trim().to_string()
}
