//! Display modes, line templates and the quote-of-the-day fallback.

use chant_types::{AttorneyRecord, CueKind, RecordPayload};
use clap::ValueEnum;
use serde::Deserialize;
use time::Date;

/// One row of the mode lookup table: which endpoint the chant reads and how
/// each record becomes a line.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub(crate) enum DisplayMode {
    /// Attorneys newly entered on the register.
    #[default]
    Registrations,
    /// Attorneys who changed firm.
    Movements,
    /// Attorneys whose registration lapsed.
    Lapses,
    /// Current attorneys, longest names first.
    LongestNames,
    /// Firms on the register, by name.
    Firms,
}

impl DisplayMode {
    pub(crate) const ALL: [DisplayMode; 5] = [
        DisplayMode::Registrations,
        DisplayMode::Movements,
        DisplayMode::Lapses,
        DisplayMode::LongestNames,
        DisplayMode::Firms,
    ];

    pub(crate) fn title(self) -> &'static str {
        match self {
            DisplayMode::Registrations => "Registrations",
            DisplayMode::Movements => "Movements",
            DisplayMode::Lapses => "Lapses",
            DisplayMode::LongestNames => "Longest names",
            DisplayMode::Firms => "Firms",
        }
    }

    fn endpoint(self) -> &'static str {
        match self {
            DisplayMode::Registrations => "/api/registrations",
            DisplayMode::Movements => "/api/movements",
            DisplayMode::Lapses => "/api/lapses",
            DisplayMode::LongestNames => "/api/attorneys",
            DisplayMode::Firms => "/api/firms",
        }
    }

    fn fixed_params(self) -> &'static [(&'static str, &'static str)] {
        match self {
            DisplayMode::LongestNames => &[("orderBy", "-name_length")],
            DisplayMode::Firms => &[("orderBy", "+name")],
            _ => &[],
        }
    }

    /// Change-log endpoints read a `first_date..=last_date` window; the
    /// others are a snapshot of the register on a single `date`.
    fn reads_window(self) -> bool {
        matches!(
            self,
            DisplayMode::Registrations | DisplayMode::Movements | DisplayMode::Lapses
        )
    }

    /// Render one record with this mode's template. Records missing a field
    /// the template needs fall back to `"{name}."`.
    pub(crate) fn render_line(self, record: &AttorneyRecord) -> String {
        let name = record.name.trim();
        match (self, record.firm.as_deref(), record.old_firm.as_deref()) {
            (DisplayMode::Registrations, Some(firm), _) => format!("{name} of {firm}."),
            (DisplayMode::Lapses, Some(firm), _) => format!("{name}, formerly of {firm}."),
            (DisplayMode::Movements, Some(firm), Some(old)) => format!("{name}, {old} to {firm}."),
            (DisplayMode::LongestNames, _, _) => {
                format!("{name} ({} letters).", record.name_length())
            }
            _ => format!("{name}."),
        }
    }

    /// Table headers and the dotted field paths that fill each column.
    pub(crate) fn table_columns(self) -> (&'static [&'static str], &'static [&'static str]) {
        match self {
            DisplayMode::Registrations => (
                &["Name", "Firm", "Registered"],
                &["name", "firm", "valid_from"],
            ),
            DisplayMode::Movements => (
                &["Name", "From", "To", "Moved"],
                &["new.name", "old.firm", "new.firm", "new.valid_from"],
            ),
            DisplayMode::Lapses => (
                &["Name", "Firm", "Lapsed"],
                &["name", "firm", "valid_to"],
            ),
            DisplayMode::LongestNames => (&["Name", "Firm", "Email"], &["name", "firm", "email"]),
            DisplayMode::Firms => (
                &["Firm", "Phone", "Email", "Website"],
                &["name", "phone", "email", "website"],
            ),
        }
    }

    pub(crate) fn index(self) -> usize {
        DisplayMode::ALL
            .iter()
            .position(|m| *m == self)
            .unwrap_or(0)
    }
}

/// Register filter understood by every collection endpoint.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub(crate) enum Filter {
    /// Patent attorneys only.
    Pat,
    /// Trade mark attorneys only.
    Tm,
}

impl Filter {
    fn as_param(self) -> &'static str {
        match self {
            Filter::Pat => "pat",
            Filter::Tm => "tm",
        }
    }
}

const DATE_FORMAT: &[time::format_description::BorrowedFormatItem<'static>] =
    time::macros::format_description!("[year]-[month]-[day]");

/// Parse an ISO `YYYY-MM-DD` date.
pub(crate) fn parse_date(raw: &str) -> Result<Date, String> {
    Date::parse(raw.trim(), DATE_FORMAT).map_err(|e| format!("invalid date {raw:?}: {e}"))
}

fn format_date(date: Date) -> String {
    date.format(DATE_FORMAT)
        .unwrap_or_else(|_| date.to_string())
}

/// Optional date bounds. Unset bounds are left to the server, which ends
/// the window today and starts it a week earlier.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct DateWindow {
    pub(crate) first: Option<Date>,
    pub(crate) last: Option<Date>,
}

impl DateWindow {
    pub(crate) fn new(first: Option<Date>, last: Option<Date>) -> Result<Self, String> {
        if let (Some(first), Some(last)) = (first, last) {
            if first > last {
                return Err(format!(
                    "first date {} is after last date {}",
                    format_date(first),
                    format_date(last)
                ));
            }
        }
        Ok(Self { first, last })
    }

    fn params(&self, mode: DisplayMode) -> Vec<String> {
        if mode.reads_window() {
            [("first_date", self.first), ("last_date", self.last)]
                .into_iter()
                .filter_map(|(key, date)| date.map(|d| format!("{key}={}", format_date(d))))
                .collect()
        } else {
            self.last
                .map(|d| vec![format!("date={}", format_date(d))])
                .unwrap_or_default()
        }
    }
}

/// Mode, filters and date window; resolves to the collection URL both the
/// chant and the table read.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct DataQuery {
    pub(crate) mode: DisplayMode,
    pub(crate) filters: Vec<Filter>,
    pub(crate) window: DateWindow,
}

impl DataQuery {
    pub(crate) fn url(&self, server: &str) -> String {
        let mut params: Vec<String> = self
            .mode
            .fixed_params()
            .iter()
            .map(|(k, v)| format!("{k}={}", urlencoding::encode(v)))
            .collect();
        params.extend(
            self.filters
                .iter()
                .map(|f| format!("filter={}", f.as_param())),
        );
        params.extend(self.window.params(self.mode));
        let base = format!("{}{}", server.trim_end_matches('/'), self.mode.endpoint());
        if params.is_empty() {
            base
        } else {
            format!("{base}?{}", params.join("&"))
        }
    }
}

/// Turn API records into chant lines, one per record, in response order.
pub(crate) fn render_lines(mode: DisplayMode, records: Vec<RecordPayload>) -> Vec<String> {
    records
        .into_iter()
        .map(|payload| mode.render_line(&payload.into_record()))
        .collect()
}

const DEFAULT_QUOTES: &[&str] = &[
    "The patent system added the fuel of interest to the fire of genius. - Abraham Lincoln",
    "Where law ends, tyranny begins. - William Pitt",
    "Necessity is the mother of invention. - Proverb",
    "Genius is one percent inspiration and ninety-nine percent perspiration. - Thomas Edison",
    "The law is reason, free from passion. - Aristotle",
    "Knowledge is power. - Francis Bacon",
    "Nothing is particularly hard if you divide it into small jobs. - Henry Ford",
];

/// Fixed pool of fallback lines. Never empty.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct QuotePool(Vec<String>);

impl Default for QuotePool {
    fn default() -> Self {
        Self(DEFAULT_QUOTES.iter().map(|q| q.to_string()).collect())
    }
}

impl QuotePool {
    /// Use `quotes` unless it has no non-blank entries.
    pub(crate) fn from_quotes(quotes: Vec<String>) -> Self {
        let quotes: Vec<String> = quotes
            .into_iter()
            .map(|q| q.trim().to_string())
            .filter(|q| !q.is_empty())
            .collect();
        if quotes.is_empty() {
            Self::default()
        } else {
            Self(quotes)
        }
    }

    /// Deterministic quote of the day: `pool[day_of_month % len]`.
    pub(crate) fn quote_for_day(&self, day_of_month: u32) -> &str {
        &self.0[day_of_month as usize % self.0.len()]
    }
}

/// Non-empty, immutable sequence of lines for one session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct LineSequence(Vec<String>);

impl LineSequence {
    /// Real lines play with the normal cue; an empty input becomes the
    /// quote of the day with the fallback cue.
    pub(crate) fn resolve(lines: Vec<String>, quotes: &QuotePool, day_of_month: u32) -> (Self, CueKind) {
        if lines.is_empty() {
            (
                Self(vec![quotes.quote_for_day(day_of_month).to_string()]),
                CueKind::Fallback,
            )
        } else {
            (Self(lines), CueKind::Normal)
        }
    }

    pub(crate) fn get(&self, index: usize) -> Option<&str> {
        self.0.get(index).map(String::as_str)
    }

    pub(crate) fn len(&self) -> usize {
        self.0.len()
    }
}

/// Local day of month (1..=31), falling back to UTC when the local offset
/// cannot be determined.
pub(crate) fn today_day_of_month() -> u32 {
    let now = time::OffsetDateTime::now_local().unwrap_or_else(|_| time::OffsetDateTime::now_utc());
    u32::from(now.day())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str, firm: Option<&str>, old_firm: Option<&str>) -> AttorneyRecord {
        AttorneyRecord {
            name: name.to_string(),
            firm: firm.map(str::to_string),
            old_firm: old_firm.map(str::to_string),
            name_length: None,
        }
    }

    #[test]
    fn registrations_template_names_the_firm() {
        let line = DisplayMode::Registrations.render_line(&record("Alpha", Some("Firm"), None));
        assert_eq!(line, "Alpha of Firm.");
    }

    #[test]
    fn movements_template_names_both_firms() {
        let line =
            DisplayMode::Movements.render_line(&record("Beta", Some("New Ltd"), Some("Old & Co")));
        assert_eq!(line, "Beta, Old & Co to New Ltd.");
    }

    #[test]
    fn longest_names_template_counts_characters() {
        let line = DisplayMode::LongestNames.render_line(&record("Ana María", None, None));
        assert_eq!(line, "Ana María (9 letters).");
    }

    #[test]
    fn missing_template_fields_fall_back_to_name() {
        assert_eq!(
            DisplayMode::Registrations.render_line(&record("Solo", None, None)),
            "Solo."
        );
        assert_eq!(
            DisplayMode::Movements.render_line(&record("Solo", Some("Firm"), None)),
            "Solo."
        );
    }

    #[test]
    fn render_lines_keeps_response_order() {
        let records = vec![
            RecordPayload::Flat(record("Alpha", Some("Firm"), None)),
            RecordPayload::Flat(record("Beta", Some("Firm"), None)),
        ];
        assert_eq!(
            render_lines(DisplayMode::Registrations, records),
            vec!["Alpha of Firm.".to_string(), "Beta of Firm.".to_string()]
        );
    }

    #[test]
    fn url_includes_fixed_params_and_filters() {
        let query = DataQuery {
            mode: DisplayMode::LongestNames,
            filters: vec![Filter::Pat, Filter::Tm],
            ..DataQuery::default()
        };
        assert_eq!(
            query.url("http://localhost:5000/"),
            "http://localhost:5000/api/attorneys?orderBy=-name_length&filter=pat&filter=tm"
        );
    }

    #[test]
    fn url_without_params_has_no_query() {
        let query = DataQuery {
            mode: DisplayMode::Lapses,
            ..DataQuery::default()
        };
        assert_eq!(query.url("http://h"), "http://h/api/lapses");
    }

    #[test]
    fn firms_are_ordered_by_name() {
        let query = DataQuery {
            mode: DisplayMode::Firms,
            filters: vec![Filter::Tm],
            ..DataQuery::default()
        };
        assert_eq!(
            query.url("http://h"),
            "http://h/api/firms?orderBy=%2Bname&filter=tm"
        );
        assert_eq!(
            DisplayMode::Firms.render_line(&record("Acme IP", None, None)),
            "Acme IP."
        );
    }

    #[test]
    fn change_log_modes_send_the_date_window() {
        let window = DateWindow::new(
            Some(parse_date("2024-03-01").unwrap()),
            Some(parse_date("2024-03-31").unwrap()),
        )
        .unwrap();
        let query = DataQuery {
            mode: DisplayMode::Movements,
            filters: vec![Filter::Pat],
            window,
        };
        assert_eq!(
            query.url("http://h"),
            "http://h/api/movements?filter=pat&first_date=2024-03-01&last_date=2024-03-31"
        );
    }

    #[test]
    fn snapshot_modes_read_the_register_on_the_last_date() {
        let window = DateWindow::new(
            Some(parse_date("2024-03-01").unwrap()),
            Some(parse_date("2024-03-31").unwrap()),
        )
        .unwrap();
        let query = DataQuery {
            mode: DisplayMode::LongestNames,
            window,
            ..DataQuery::default()
        };
        assert_eq!(
            query.url("http://h"),
            "http://h/api/attorneys?orderBy=-name_length&date=2024-03-31"
        );

        let only_first = DataQuery {
            mode: DisplayMode::Firms,
            window: DateWindow::new(Some(parse_date("2024-03-01").unwrap()), None).unwrap(),
            ..DataQuery::default()
        };
        assert_eq!(only_first.url("http://h"), "http://h/api/firms?orderBy=%2Bname");
    }

    #[test]
    fn inverted_window_is_rejected() {
        let first = parse_date("2024-04-02").unwrap();
        let last = parse_date("2024-04-01").unwrap();
        let err = DateWindow::new(Some(first), Some(last)).unwrap_err();
        assert_eq!(err, "first date 2024-04-02 is after last date 2024-04-01");
        assert!(parse_date("2024-13-01").is_err());
        assert!(parse_date("yesterday").is_err());
    }

    #[test]
    fn quote_of_the_day_wraps_by_pool_size() {
        let pool = QuotePool::from_quotes(vec!["a".into(), "b".into(), "c".into()]);
        assert_eq!(pool.quote_for_day(1), "b");
        assert_eq!(pool.quote_for_day(3), "a");
        assert_eq!(pool.quote_for_day(31), "b");
    }

    #[test]
    fn blank_quote_override_keeps_default_pool() {
        let pool = QuotePool::from_quotes(vec!["  ".into()]);
        assert_eq!(pool, QuotePool::default());
        assert_eq!(pool.quote_for_day(0), DEFAULT_QUOTES[0]);
    }

    #[test]
    fn empty_lines_resolve_to_fallback_quote() {
        let pool = QuotePool::default();
        let (seq, cue) = LineSequence::resolve(Vec::new(), &pool, 19);
        assert_eq!(cue, CueKind::Fallback);
        assert_eq!(seq.len(), 1);
        assert_eq!(seq.get(0), Some(pool.quote_for_day(19)));
    }

    #[test]
    fn real_lines_resolve_to_normal_cue() {
        let (seq, cue) = LineSequence::resolve(vec!["x".into()], &QuotePool::default(), 1);
        assert_eq!(cue, CueKind::Normal);
        assert_eq!(seq.get(0), Some("x"));
        assert_eq!(seq.get(1), None);
    }

    #[test]
    fn mode_index_matches_tab_order() {
        for (i, mode) in DisplayMode::ALL.iter().enumerate() {
            assert_eq!(mode.index(), i);
        }
    }

    #[test]
    fn today_is_a_calendar_day() {
        let day = today_day_of_month();
        assert!((1..=31).contains(&day));
    }
}
