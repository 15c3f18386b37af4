use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};

macro_rules! selector {
    ($query:expr) => {{
        static SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse($query).unwrap());
        &SELECTOR
    }};
}

/// Largest `colspan` honoured, as in HTML tables.
pub const MAX_SPAN: u32 = 1000;

/// Everything the compiler needs from a timetable page, lifted out of the DOM.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Page {
    pub period: Period,
    /// Text of the first time slot header, e.g. `"9:00"`.
    pub first_slot: Option<String>,
    pub rows: Vec<TimetableRow>,
}

/// The period selection control.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Period {
    /// Value of the currently selected option, `None` without a selector.
    pub value: Option<String>,
    pub options: Vec<PeriodOption>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeriodOption {
    pub value: String,
    pub label: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TimetableRow {
    /// Weekday label carried by this row itself. Rows grouped under a
    /// header row leave this empty.
    pub weekday: Option<String>,
    pub cells: Vec<TimetableCell>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimetableCell {
    /// Number of 30 minute slots the cell occupies, from 1 to [`MAX_SPAN`].
    pub span: u32,
    pub is_session: bool,
    pub is_on_demand: bool,
    pub fields: CellFields,
}

impl Default for TimetableCell {
    fn default() -> Self {
        Self {
            span: 1,
            is_session: false,
            is_on_demand: false,
            fields: CellFields::default(),
        }
    }
}

/// Raw, trimmed text of a session cell. Cleaning happens in the decoder.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CellFields {
    pub module_name: String,
    pub module_type: String,
    pub room: Option<String>,
    pub building: Option<String>,
    pub lecturer: String,
    pub module_id: String,
    pub weeks_raw: String,
}

impl Page {
    pub fn parse<S: AsRef<str>>(html: S) -> Self {
        let html = Html::parse_document(html.as_ref());

        let first_slot = html
            .select(selector!(".first_time_slot_col"))
            .next()
            .map(text_of);

        let rows = html
            .select(selector!(".tt_info_row"))
            .map(parse_row)
            .collect::<Vec<_>>();

        log::debug!("Extracted {} timetable rows", rows.len());

        Self {
            period: parse_period(&html),
            first_slot,
            rows,
        }
    }
}

fn parse_period(html: &Html) -> Period {
    let Some(dropdown) = html.select(selector!("#P2_MY_PERIOD")).next() else {
        return Period::default();
    };

    let options = dropdown
        .select(selector!("option"))
        .map(|option| PeriodOption {
            value: option
                .value()
                .attr("value")
                .map_or_else(|| text_of(option), str::to_string),
            label: text_of(option),
        })
        .collect::<Vec<_>>();

    let selected = dropdown
        .select(selector!("option"))
        .enumerate()
        .filter(|(_, option)| option.value().attr("selected").is_some())
        .last()
        .map_or(0, |(index, _)| index);

    Period {
        value: options.get(selected).map(|option| option.value.clone()),
        options,
    }
}

fn parse_row(row: ElementRef) -> TimetableRow {
    let weekday = row.select(selector!(".weekday")).next().map(text_of);

    let cells = row
        .children()
        .filter_map(ElementRef::wrap)
        .filter(|cell| matches!(cell.value().name(), "td" | "th"))
        .filter(|cell| !has_class(*cell, "weekday_col"))
        .map(parse_cell)
        .collect();

    TimetableRow { weekday, cells }
}

fn parse_cell(cell: ElementRef) -> TimetableCell {
    let span = cell
        .value()
        .attr("colspan")
        .and_then(leading_integer)
        .filter(|span| *span > 0)
        .map_or(1, |span| span.min(MAX_SPAN));

    let is_session = has_class(cell, "tt_info_cell") || has_class(cell, "new_row_tt_info_cell");
    let is_on_demand = cell
        .select(selector!(".tt_content.on_demand"))
        .next()
        .is_some();

    let mut rooms = cell.select(selector!(".tt_room_row")).map(text_of);

    let fields = CellFields {
        room: rooms.next(),
        building: rooms.next(),
        module_name: field(cell, selector!(".tt_module_name_row")),
        module_type: field(cell, selector!(".tt_modtype_row")),
        lecturer: field(cell, selector!(".tt_lect_row")),
        module_id: field(cell, selector!(".tt_module_id_row")),
        weeks_raw: field(cell, selector!(".tt_weeks_row")),
    };

    TimetableCell {
        span,
        is_session,
        is_on_demand,
        fields,
    }
}

fn field(cell: ElementRef, selector: &Selector) -> String {
    cell.select(selector).next().map(text_of).unwrap_or_default()
}

fn text_of(element: ElementRef) -> String {
    element.text().collect::<String>().trim().to_string()
}

fn has_class(element: ElementRef, class: &str) -> bool {
    element.value().classes().any(|name| name == class)
}

/// Integer made of the leading ASCII digits of `s`, ignoring leading
/// whitespace. `"2"` and `"2 slots"` are both 2; `"x2"` is `None`.
pub(crate) fn leading_integer(s: &str) -> Option<u32> {
    let s = s.trim_start();
    let end = s
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(s.len());

    s[..end].parse().ok()
}
