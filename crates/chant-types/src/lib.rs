use serde::{Deserialize, Serialize};

/// Which audio cue accompanies a chant session.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum CueKind {
    /// Played when the line sequence came from real API records.
    Normal,
    /// Played with the quote-of-the-day line when the API returned nothing.
    Fallback,
}

impl CueKind {
    pub fn label(self) -> &'static str {
        match self {
            CueKind::Normal => "normal",
            CueKind::Fallback => "fallback",
        }
    }
}

/// Attorney record as returned by the register API.
///
/// Only the fields the chant templates read are modelled; everything else in
/// the payload is ignored.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct AttorneyRecord {
    /// Display name.
    pub name: String,
    /// Current firm, if the attorney has one.
    #[serde(default)]
    pub firm: Option<String>,
    /// Firm before a movement (flat movement payloads only).
    #[serde(default, alias = "previous_firm")]
    pub old_firm: Option<String>,
    /// Length of `name`, when the server computed it.
    #[serde(default)]
    pub name_length: Option<u32>,
}

impl AttorneyRecord {
    /// Character count of the name, preferring the server-computed value.
    pub fn name_length(&self) -> u32 {
        self.name_length
            .unwrap_or_else(|| self.name.chars().count() as u32)
    }
}

/// One element of a chant data response.
///
/// The movements endpoint pairs the old and new registration of the same
/// attorney; every other endpoint returns flat records.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum RecordPayload {
    Movement {
        old: AttorneyRecord,
        new: AttorneyRecord,
    },
    Flat(AttorneyRecord),
}

impl RecordPayload {
    /// Collapse into a single record: a movement keeps the new registration
    /// and carries the old firm in `old_firm`.
    pub fn into_record(self) -> AttorneyRecord {
        match self {
            RecordPayload::Flat(record) => record,
            RecordPayload::Movement { old, new } => AttorneyRecord {
                old_firm: old.firm.or(new.old_firm.clone()),
                ..new
            },
        }
    }
}

/// Chant data response: either `{"items": [...]}` or a bare array.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ItemsPayload<T> {
    Envelope { items: Vec<T> },
    Bare(Vec<T>),
}

impl<T> ItemsPayload<T> {
    pub fn into_items(self) -> Vec<T> {
        match self {
            ItemsPayload::Envelope { items } => items,
            ItemsPayload::Bare(items) => items,
        }
    }
}

/// Pagination metadata of a collection response.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PageMeta {
    /// 1-based page number of this response.
    pub page: u32,
    #[serde(default)]
    pub per_page: Option<u32>,
    pub total_pages: u32,
    #[serde(default)]
    pub total_items: Option<u64>,
}

/// Navigation links of a collection response. Absent and `null` links are
/// both treated as "no such page".
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PageLinks {
    #[serde(default, rename = "self")]
    pub self_link: Option<String>,
    #[serde(default)]
    pub prev: Option<String>,
    #[serde(default)]
    pub next: Option<String>,
}

/// Paginated collection envelope returned by the register API.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Page<T = serde_json::Value> {
    pub items: Vec<T>,
    #[serde(rename = "_meta")]
    pub meta: PageMeta,
    #[serde(rename = "_links", default)]
    pub links: PageLinks,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn items_payload_accepts_envelope_and_bare_array() {
        let wrapped: ItemsPayload<AttorneyRecord> =
            serde_json::from_str(r#"{"items":[{"name":"Alpha","firm":"Firm"}]}"#).unwrap();
        let bare: ItemsPayload<AttorneyRecord> =
            serde_json::from_str(r#"[{"name":"Alpha","firm":"Firm"}]"#).unwrap();
        assert_eq!(wrapped.into_items(), bare.into_items());
    }

    #[test]
    fn movement_payload_flattens_to_new_record_with_old_firm() {
        let payload: RecordPayload = serde_json::from_str(
            r#"{"old":{"name":"Beta","firm":"Old & Co"},"new":{"name":"Beta","firm":"New Ltd"}}"#,
        )
        .unwrap();
        let record = payload.into_record();
        assert_eq!(record.name, "Beta");
        assert_eq!(record.firm.as_deref(), Some("New Ltd"));
        assert_eq!(record.old_firm.as_deref(), Some("Old & Co"));
    }

    #[test]
    fn flat_payload_accepts_previous_firm_alias() {
        let payload: RecordPayload =
            serde_json::from_str(r#"{"name":"Gamma","firm":"B","previous_firm":"A"}"#).unwrap();
        let record = payload.into_record();
        assert_eq!(record.old_firm.as_deref(), Some("A"));
    }

    #[test]
    fn name_length_falls_back_to_char_count() {
        let record = AttorneyRecord {
            name: "Zoë".to_string(),
            ..Default::default()
        };
        assert_eq!(record.name_length(), 3);
        let record = AttorneyRecord {
            name_length: Some(42),
            ..record
        };
        assert_eq!(record.name_length(), 42);
    }

    #[test]
    fn page_treats_missing_and_null_links_alike() {
        let page: Page = serde_json::from_str(
            r#"{"items":[],"_meta":{"page":2,"total_pages":2},"_links":{"prev":"/p1","next":null}}"#,
        )
        .unwrap();
        assert_eq!(page.meta.page, 2);
        assert_eq!(page.links.prev.as_deref(), Some("/p1"));
        assert!(page.links.next.is_none());

        let page: Page =
            serde_json::from_str(r#"{"items":[],"_meta":{"page":1,"total_pages":1}}"#).unwrap();
        assert_eq!(page.links, PageLinks::default());
    }
}
