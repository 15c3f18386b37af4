use ics::{
    escape_text,
    properties::{Description, DtEnd, DtStart, Location, Summary},
    ICalendar,
};

use crate::error::{Error, Result};
use crate::{Calendar, Event};

pub const PRODUCT_ID: &str = "-//Lboro Timetable Scraper (Temporal)//EN";

/// File name the calendar is offered under.
pub const FILE_NAME: &str = "timetable.ics";

pub const CONTENT_TYPE: &str = "text/calendar";

impl Calendar {
    /// Builds the iCalendar document. Lines end in CRLF once rendered with
    /// `to_string`.
    pub fn to_ics(&self) -> Result<ICalendar<'_>> {
        if self.events.is_empty() {
            return Err(Error::EmptyResult);
        }

        let mut icalendar = ICalendar::new("2.0", PRODUCT_ID);

        for event in &self.events {
            icalendar.add_event(event.to_ics());
        }

        Ok(icalendar)
    }
}

impl Event {
    #[must_use]
    pub fn to_ics(&self) -> ics::Event<'_> {
        let stamp = self.generated_at.format("%Y%m%dT%H%M%SZ").to_string();

        let mut ics_event = ics::Event::new(self.uid.clone(), stamp);

        ics_event.push(DtStart::new(self.start.format("%Y%m%dT%H%M%S").to_string()));
        ics_event.push(DtEnd::new(self.end.format("%Y%m%dT%H%M%S").to_string()));
        ics_event.push(Summary::new(escape_text(self.summary.as_str())));
        ics_event.push(Location::new(escape_text(self.location.as_str())));
        ics_event.push(Description::new(escape_text(self.description.as_str())));

        ics_event
    }
}
