//! Paginated table model over a collection endpoint.
//!
//! Columns are addressed by dotted field paths (`new.firm`). Fetching happens
//! off the UI thread: `change_page` hands back the URL to load and
//! `apply_page` takes the decoded response.

use chant_types::{Page, PageLinks, PageMeta};
use serde_json::Value;

/// A page load the table is waiting on. Responses carrying an older
/// generation are dropped.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct PageRequest {
    pub(crate) url: String,
    pub(crate) generation: u64,
}

#[derive(Debug)]
pub(crate) struct PaginationTable {
    api_url: String,
    headers: Vec<String>,
    keys: Vec<String>,
    per_page: Option<u32>,
    current_page: u32,
    rows: Vec<Vec<String>>,
    indicator: String,
    prev_enabled: bool,
    next_enabled: bool,
    generation: u64,
}

impl PaginationTable {
    pub(crate) fn new(api_url: impl Into<String>, headers: &[&str], keys: &[&str]) -> Self {
        Self {
            api_url: api_url.into(),
            headers: headers.iter().map(|h| h.to_string()).collect(),
            keys: keys.iter().map(|k| k.to_string()).collect(),
            per_page: None,
            current_page: 1,
            rows: Vec::new(),
            indicator: String::new(),
            prev_enabled: false,
            next_enabled: false,
            generation: 0,
        }
    }

    pub(crate) fn with_per_page(mut self, per_page: Option<u32>) -> Self {
        self.per_page = per_page.filter(|n| *n > 0);
        self
    }

    /// Point the table at another endpoint and column set, back on page 1.
    pub(crate) fn retarget(&mut self, api_url: impl Into<String>, headers: &[&str], keys: &[&str]) -> PageRequest {
        let per_page = self.per_page;
        let generation = self.generation;
        *self = Self::new(api_url, headers, keys).with_per_page(per_page);
        self.generation = generation;
        self.change_page(1)
    }

    /// URL for `page` of the current endpoint.
    pub(crate) fn page_url(&self, page: u32) -> String {
        let sep = if self.api_url.contains('?') { '&' } else { '?' };
        let mut url = format!("{}{sep}page={page}", self.api_url);
        if let Some(per_page) = self.per_page {
            url.push_str(&format!("&per_page={per_page}"));
        }
        url
    }

    /// Reload the current page.
    pub(crate) fn fetch_data(&mut self) -> PageRequest {
        self.change_page(self.current_page)
    }

    pub(crate) fn change_page(&mut self, page: u32) -> PageRequest {
        self.current_page = page.max(1);
        self.generation += 1;
        PageRequest {
            url: self.page_url(self.current_page),
            generation: self.generation,
        }
    }

    /// Go back one page; `None` while the previous control is disabled.
    pub(crate) fn prev_page(&mut self) -> Option<PageRequest> {
        if !self.prev_enabled {
            return None;
        }
        Some(self.change_page(self.current_page.saturating_sub(1)))
    }

    /// Go forward one page; `None` while the next control is disabled.
    pub(crate) fn next_page(&mut self) -> Option<PageRequest> {
        if !self.next_enabled {
            return None;
        }
        Some(self.change_page(self.current_page + 1))
    }

    /// Install a fetched page. Returns `false` for a stale response.
    pub(crate) fn apply_page(&mut self, generation: u64, page: Page) -> bool {
        if !self.is_current(generation) {
            return false;
        }
        self.render_table(&page.items);
        self.render_pagination(&page.meta, &page.links);
        true
    }

    pub(crate) fn render_table(&mut self, items: &[Value]) {
        self.rows = items
            .iter()
            .map(|item| {
                self.keys
                    .iter()
                    .map(|key| cell_text(resolve_path(item, key)))
                    .collect()
            })
            .collect();
    }

    pub(crate) fn render_pagination(&mut self, meta: &PageMeta, links: &PageLinks) {
        self.current_page = meta.page;
        self.indicator = format!("Page {} of {}", meta.page, meta.total_pages);
        self.prev_enabled = links.prev.is_some();
        self.next_enabled = links.next.is_some();
    }

    /// Whether a response for `generation` would still be applied.
    pub(crate) fn is_current(&self, generation: u64) -> bool {
        generation == self.generation
    }

    pub(crate) fn headers(&self) -> &[String] {
        &self.headers
    }

    pub(crate) fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub(crate) fn indicator(&self) -> &str {
        &self.indicator
    }

    pub(crate) fn prev_enabled(&self) -> bool {
        self.prev_enabled
    }

    pub(crate) fn next_enabled(&self) -> bool {
        self.next_enabled
    }

    pub(crate) fn current_page(&self) -> u32 {
        self.current_page
    }
}

/// Follow a dotted path (`a.b.0`) into `value`.
pub(crate) fn resolve_path<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(value, |current, segment| match current {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

/// Cell text for a resolved value. Containers list their values in order,
/// separated by `", "`.
pub(crate) fn cell_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Object(map)) => join_values(map.values()),
        Some(Value::Array(items)) => join_values(items.iter()),
        Some(other) => other.to_string(),
    }
}

fn join_values<'a>(values: impl Iterator<Item = &'a Value>) -> String {
    values
        .map(|v| cell_text(Some(v)))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn table() -> PaginationTable {
        PaginationTable::new("http://h/api/things", &["A", "B"], &["a", "b"])
    }

    fn page(value: Value) -> Page {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn scenario_nested_object_cells_and_pagination_controls() {
        let mut t = table();
        let req = t.fetch_data();
        assert_eq!(req.url, "http://h/api/things?page=1");
        let applied = t.apply_page(
            req.generation,
            page(json!({
                "items": [{"a": 1, "b": {"x": 2, "y": 3}}],
                "_meta": {"page": 1, "total_pages": 3},
                "_links": {"next": "..."}
            })),
        );
        assert!(applied);
        assert_eq!(t.rows(), &[vec!["1".to_string(), "2, 3".to_string()]]);
        assert!(!t.prev_enabled());
        assert!(t.next_enabled());
        assert_eq!(t.indicator(), "Page 1 of 3");
    }

    #[test]
    fn page_param_appends_to_existing_query() {
        let t = PaginationTable::new("http://h/api/attorneys?orderBy=-name_length", &[], &[])
            .with_per_page(Some(25));
        assert_eq!(
            t.page_url(2),
            "http://h/api/attorneys?orderBy=-name_length&page=2&per_page=25"
        );
    }

    #[test]
    fn dotted_paths_resolve_into_objects_and_arrays() {
        let v = json!({"new": {"firm": "F", "tags": ["x", "y"]}});
        assert_eq!(resolve_path(&v, "new.firm"), Some(&json!("F")));
        assert_eq!(resolve_path(&v, "new.tags.1"), Some(&json!("y")));
        assert_eq!(resolve_path(&v, "new.missing"), None);
        assert_eq!(resolve_path(&v, "new.firm.deeper"), None);
    }

    #[test]
    fn cell_text_formats_each_json_kind() {
        assert_eq!(cell_text(None), "");
        assert_eq!(cell_text(Some(&Value::Null)), "");
        assert_eq!(cell_text(Some(&json!("text"))), "text");
        assert_eq!(cell_text(Some(&json!(4.5))), "4.5");
        assert_eq!(cell_text(Some(&json!(true))), "true");
        assert_eq!(cell_text(Some(&json!(["a", 1]))), "a, 1");
        assert_eq!(cell_text(Some(&json!({"k": "v", "n": null}))), "v, ");
    }

    #[test]
    fn disabled_controls_ignore_navigation() {
        let mut t = table();
        assert_eq!(t.prev_page(), None);
        assert_eq!(t.next_page(), None);

        let req = t.fetch_data();
        t.apply_page(
            req.generation,
            page(json!({
                "items": [],
                "_meta": {"page": 2, "total_pages": 3},
                "_links": {"prev": "p", "next": "n"}
            })),
        );
        assert_eq!(t.next_page().map(|r| r.url), Some("http://h/api/things?page=3".to_string()));
        assert_eq!(t.current_page(), 3);
    }

    #[test]
    fn stale_responses_are_dropped() {
        let mut t = table();
        let first = t.change_page(1);
        let second = t.change_page(2);
        let body = json!({"items": [{"a": "x"}], "_meta": {"page": 1, "total_pages": 2}});
        assert!(!t.apply_page(first.generation, page(body.clone())));
        assert!(t.rows().is_empty());
        assert!(t.apply_page(second.generation, page(body)));
        assert_eq!(t.rows().len(), 1);
    }

    #[test]
    fn retarget_resets_to_first_page_and_invalidates_pending_loads() {
        let mut t = table().with_per_page(Some(10));
        let pending = t.change_page(4);
        let req = t.retarget("http://h/api/lapses", &["Name"], &["name"]);
        assert_eq!(req.url, "http://h/api/lapses?page=1&per_page=10");
        assert_eq!(t.headers(), &["Name".to_string()]);
        assert_ne!(pending.generation, req.generation);
        assert!(!t.apply_page(
            pending.generation,
            page(json!({"items": [], "_meta": {"page": 4, "total_pages": 4}}))
        ));
    }
}
