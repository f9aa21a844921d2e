use chrono::{Local, Months, NaiveDate};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Inclusive date window used for invoice listing and reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// Default dashboard window: one month back through today.
    pub fn last_month() -> Self {
        let today = Local::now().date_naive();
        let start = today
            .checked_sub_months(Months::new(1))
            .unwrap_or(today);
        Self { start, end: today }
    }

    pub fn start_param(&self) -> String {
        self.start.format(DATE_FORMAT).to_string()
    }

    pub fn end_param(&self) -> String {
        self.end.format(DATE_FORMAT).to_string()
    }
}

pub fn parse_date(value: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT)
        .map_err(|_| format!("expected YYYY-MM-DD, got {}", value))
}

pub fn today_stamp() -> String {
    Local::now().date_naive().format(DATE_FORMAT).to_string()
}
