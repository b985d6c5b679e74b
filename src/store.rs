//! Local key-value persistence: saved diagrams, feature maps, flags and
//! settings.
//!
//! Every value is a JSON string. Keys are partitioned by shape:
//!
//! | Key | Value |
//! |-----|-------|
//! | `<timestamp>` | [`SavedDiagram`] |
//! | `$<timestamp>` | [`FeatureMap`] |
//! | [`FLAGS_KEY`] | array of flagged diagram names |
//! | [`SETTINGS_KEY`] | [`Settings`] |
//! | [`MATRIX_SELECTION_KEY`] | column selection bitstring (owned by the matrix page) |

#[cfg(test)]
#[path = "store_test.rs"]
mod store_test;

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::settings::Settings;

pub const FLAGS_KEY: &str = "flags";
pub const SETTINGS_KEY: &str = "settings";
pub const MATRIX_SELECTION_KEY: &str = "matrix-selection";

/// Prefix distinguishing feature map keys from saved diagram keys.
pub const FEATURE_MAP_PREFIX: char = '$';

/// A string key-value store with browser `localStorage` semantics.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: String);
    fn remove(&mut self, key: &str);
    /// All keys, in no particular order.
    fn keys(&self) -> Vec<String>;
}

/// In-memory store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MemoryStore {
    entries: BTreeMap<String, String>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: String) {
        self.entries.insert(key.to_owned(), value);
    }

    fn remove(&mut self, key: &str) {
        self.entries.remove(key);
    }

    fn keys(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("no saved diagram key given")]
    MissingDetails,
    #[error("saved diagram not found: {0}")]
    NotFound(String),
    #[error("saved diagram {key} is not valid JSON: {source}")]
    InvalidJson { key: String, source: serde_json::Error },
    #[error("saved diagram {0} has no SvgXml")]
    MissingXml(String),
    #[error("feature map not found: {0}")]
    MapNotFound(String),
    #[error("feature map {key} is unreadable: {source}")]
    InvalidMap { key: String, source: serde_json::Error },
    #[error("serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl StoreError {
    /// Message shown to the user in a blocking dialog.
    #[must_use]
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::MissingDetails => "Missing saved diagram details",
            Self::NotFound(_) => "Failed to locate saved diagram",
            Self::InvalidJson { .. } | Self::MissingXml(_) => "Failed to process saved diagram data",
            Self::MapNotFound(_) => "Failed to locate saved feature map",
            Self::InvalidMap { .. } => "Failed to process saved feature map",
            Self::Serialize(_) => "Failed to save diagram",
        }
    }

    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::MissingDetails => "E_MISSING_DETAILS",
            Self::NotFound(_) => "E_DIAGRAM_NOT_FOUND",
            Self::InvalidJson { .. } => "E_DIAGRAM_JSON",
            Self::MissingXml(_) => "E_DIAGRAM_XML",
            Self::MapNotFound(_) => "E_MAP_NOT_FOUND",
            Self::InvalidMap { .. } => "E_MAP_JSON",
            Self::Serialize(_) => "E_SERIALIZE",
        }
    }
}

// =============================================================================
// Records
// =============================================================================

/// A saved, annotated copy of a diagram.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SavedDiagram {
    pub title: String,
    pub svg_xml: String,
}

/// A named overlay of annotations keyed by feature id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct FeatureMap {
    pub title: String,
    #[serde(default)]
    pub features: Vec<FeatureEntry>,
}

/// Annotations for every element carrying one `data-feature` id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct FeatureEntry {
    pub feature: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub highlight: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub glyph: Option<GlyphRef>,
    /// An empty link removes an existing one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Gallery glyph placed relative to a feature's box.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct GlyphRef {
    pub label: String,
    /// Space separated alignment keywords, e.g. `"Middle Right"`.
    #[serde(default)]
    pub align: String,
}

/// One row of a saved-diagram or feature-map listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogueEntry {
    /// Storage key without any prefix.
    pub key: String,
    pub title: String,
}

// =============================================================================
// Keys
// =============================================================================

/// Keys owned by the site rather than by a saved record.
#[must_use]
pub fn is_reserved(key: &str) -> bool {
    matches!(key, FLAGS_KEY | SETTINGS_KEY | MATRIX_SELECTION_KEY)
}

/// Storage key for a record created at `now_ms` (milliseconds since the epoch).
#[must_use]
pub fn new_key(now_ms: u128) -> String {
    now_ms.to_string()
}

#[must_use]
pub fn feature_map_key(id: &str) -> String {
    format!("{FEATURE_MAP_PREFIX}{id}")
}

/// Numeric order; non-numeric keys sort after all numeric ones.
fn sort_numeric(keys: &mut [String]) {
    keys.sort_by(|a, b| {
        let na = a.parse::<i128>();
        let nb = b.parse::<i128>();
        match (na, nb) {
            (Ok(x), Ok(y)) => x.cmp(&y),
            (Ok(_), Err(_)) => std::cmp::Ordering::Less,
            (Err(_), Ok(_)) => std::cmp::Ordering::Greater,
            (Err(_), Err(_)) => a.cmp(b),
        }
    });
}

// =============================================================================
// Saved diagrams
// =============================================================================

static COMMENT: LazyLock<Result<Regex, regex::Error>> = LazyLock::new(|| Regex::new(r"(?s)<!--.*?-->"));
static PROLOG: LazyLock<Result<Regex, regex::Error>> = LazyLock::new(|| Regex::new(r"(?i)<\?xml.+?\?>"));
static DOCTYPE: LazyLock<Result<Regex, regex::Error>> = LazyLock::new(|| Regex::new(r"(?i)<!doctype[^>]*>"));

/// Remove comments, the XML prolog and any doctype from stored markup, along
/// with leading line breaks.
#[must_use]
pub fn clean_markup(markup: &str) -> String {
    let mut text = markup.to_owned();
    for (pattern, all) in [(&COMMENT, true), (&PROLOG, false), (&DOCTYPE, false)] {
        match pattern.as_ref() {
            Ok(re) if all => text = re.replace_all(&text, "").into_owned(),
            Ok(re) => text = re.replace(&text, "").into_owned(),
            Err(e) => tracing::error!(error = %e, "markup pattern failed to compile"),
        }
    }
    text.trim_start_matches(['\n', '\r']).to_owned()
}

/// Read a saved diagram.
///
/// # Errors
///
/// [`StoreError::MissingDetails`] for an empty key, [`StoreError::NotFound`]
/// when nothing is stored, [`StoreError::InvalidJson`] or
/// [`StoreError::MissingXml`] when the record is unusable.
pub fn load_saved_diagram(store: &dyn KeyValueStore, key: &str) -> Result<SavedDiagram, StoreError> {
    if key.is_empty() {
        return Err(StoreError::MissingDetails);
    }
    let json = store.get(key).filter(|j| !j.is_empty()).ok_or_else(|| StoreError::NotFound(key.to_owned()))?;
    let value: Value =
        serde_json::from_str(&json).map_err(|source| StoreError::InvalidJson { key: key.to_owned(), source })?;

    let svg_xml = match value.get("SvgXml") {
        Some(Value::String(xml)) if !xml.is_empty() => xml.clone(),
        _ => return Err(StoreError::MissingXml(key.to_owned())),
    };
    let title = match value.get("Title") {
        Some(Value::String(t)) => t.clone(),
        _ => String::new(),
    };
    debug!(%key, %title, bytes = svg_xml.len(), "loaded saved diagram");
    Ok(SavedDiagram { title, svg_xml })
}

/// Write a saved diagram, replacing any record under `key`.
///
/// # Errors
///
/// Propagates serializer failures.
pub fn save_diagram(store: &mut dyn KeyValueStore, key: &str, diagram: &SavedDiagram) -> Result<(), StoreError> {
    let json = serde_json::to_string(diagram)?;
    store.set(key, json);
    info!(%key, title = %diagram.title, "saved diagram");
    Ok(())
}

/// Saved diagrams in creation order. Unreadable records are skipped.
#[must_use]
pub fn list_saved(store: &dyn KeyValueStore) -> Vec<CatalogueEntry> {
    let mut keys: Vec<String> =
        store.keys().into_iter().filter(|k| !is_reserved(k) && !k.starts_with(FEATURE_MAP_PREFIX)).collect();
    sort_numeric(&mut keys);
    keys.into_iter()
        .filter_map(|key| match load_saved_diagram(store, &key) {
            Ok(d) => Some(CatalogueEntry { key, title: d.title }),
            Err(e) => {
                warn!(%key, error = %e, "skipping unreadable saved diagram");
                None
            }
        })
        .collect()
}

/// Change the title of a saved diagram. An empty title is ignored.
/// Returns whether anything was written.
///
/// # Errors
///
/// As for [`load_saved_diagram`].
pub fn rename_saved(store: &mut dyn KeyValueStore, key: &str, title: &str) -> Result<bool, StoreError> {
    let title = title.trim();
    if title.is_empty() {
        return Ok(false);
    }
    let mut diagram = load_saved_diagram(store, key)?;
    diagram.title = title.to_owned();
    save_diagram(store, key, &diagram)?;
    Ok(true)
}

/// Remove a saved diagram. Returns whether it existed.
pub fn delete_saved(store: &mut dyn KeyValueStore, key: &str) -> bool {
    if is_reserved(key) || store.get(key).is_none() {
        return false;
    }
    store.remove(key);
    info!(%key, "deleted saved diagram");
    true
}

// =============================================================================
// Feature maps
// =============================================================================

/// Read a feature map by id (without the `$` prefix).
///
/// # Errors
///
/// [`StoreError::MapNotFound`] when nothing is stored and
/// [`StoreError::InvalidMap`] when the record does not parse.
pub fn load_feature_map(store: &dyn KeyValueStore, id: &str) -> Result<FeatureMap, StoreError> {
    let key = feature_map_key(id);
    let json = store.get(&key).filter(|j| !j.is_empty()).ok_or_else(|| StoreError::MapNotFound(id.to_owned()))?;
    serde_json::from_str(&json).map_err(|source| StoreError::InvalidMap { key, source })
}

/// Write a feature map under `id`.
///
/// # Errors
///
/// Propagates serializer failures.
pub fn save_feature_map(store: &mut dyn KeyValueStore, id: &str, map: &FeatureMap) -> Result<(), StoreError> {
    store.set(&feature_map_key(id), serde_json::to_string(map)?);
    Ok(())
}

/// Feature maps in creation order, keyed by id. Unreadable records are skipped.
#[must_use]
pub fn list_feature_maps(store: &dyn KeyValueStore) -> Vec<CatalogueEntry> {
    let mut ids: Vec<String> = store
        .keys()
        .into_iter()
        .filter(|k| !is_reserved(k))
        .filter_map(|k| k.strip_prefix(FEATURE_MAP_PREFIX).map(str::to_owned))
        .collect();
    sort_numeric(&mut ids);
    ids.into_iter()
        .filter_map(|id| match load_feature_map(store, &id) {
            Ok(map) => Some(CatalogueEntry { key: id, title: map.title }),
            Err(e) => {
                warn!(%id, error = %e, "skipping unreadable feature map");
                None
            }
        })
        .collect()
}

// =============================================================================
// Flags and settings
// =============================================================================

/// Flagged built-in diagram names.
#[must_use]
pub fn load_flags(store: &dyn KeyValueStore) -> Vec<String> {
    let Some(json) = store.get(FLAGS_KEY) else {
        return Vec::new();
    };
    serde_json::from_str(&json).unwrap_or_else(|e| {
        warn!(error = %e, "ignoring unreadable flags");
        Vec::new()
    })
}

#[must_use]
pub fn is_flagged(store: &dyn KeyValueStore, name: &str) -> bool {
    load_flags(store).iter().any(|f| f == name)
}

/// Flag or unflag a diagram. Returns whether it is flagged afterwards.
///
/// # Errors
///
/// Propagates serializer failures.
pub fn toggle_flag(store: &mut dyn KeyValueStore, name: &str) -> Result<bool, StoreError> {
    let mut flags = load_flags(store);
    let flagged = if let Some(pos) = flags.iter().position(|f| f == name) {
        flags.remove(pos);
        false
    } else {
        flags.push(name.to_owned());
        true
    };
    store.set(FLAGS_KEY, serde_json::to_string(&flags)?);
    debug!(%name, flagged, "toggled flag");
    Ok(flagged)
}

/// Stored settings over defaults.
#[must_use]
pub fn load_settings(store: &dyn KeyValueStore) -> Settings {
    Settings::from_json_or_default(store.get(SETTINGS_KEY).as_deref())
}

/// Persist settings.
///
/// # Errors
///
/// Propagates serializer failures.
pub fn save_settings(store: &mut dyn KeyValueStore, settings: &Settings) -> Result<(), StoreError> {
    store.set(SETTINGS_KEY, serde_json::to_string(settings)?);
    Ok(())
}
