//! Hash-fragment addressing.
//!
//! A built-in diagram is identified by its page path (`/Licensing/E5.htm`
//! → `E5`). The saved-diagram page lives at [`SAVED_PAGE`] and picks its
//! diagram from the hash. Hash segments are separated by `/`, are
//! order-independent and are recognised by prefix:
//!
//! | Segment | Meaning |
//! |---------|---------|
//! | `*<key>` | Saved diagram under `<key>` |
//! | `$<id>` | Feature map `$<id>` applied on top |
//! | `compare` | Embedded in the comparison page: no menus, no saving |

#[cfg(test)]
#[path = "route_test.rs"]
mod route_test;

/// Page that renders saved diagrams.
pub const SAVED_PAGE: &str = "/viewsvg.htm";

/// Where a page address points.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Route {
    /// Built-in diagram name, or the storage key of a saved diagram.
    pub filename: Option<String>,
    /// Feature map id, without the `$` prefix.
    pub feature_map: Option<String>,
    pub saved: bool,
    pub comparing: bool,
    /// Old-style `/viewsvg.htm#Name` address, to be replaced by `/Name.htm`.
    pub redirect: Option<String>,
}

/// What must happen after the hash changes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RouteChange {
    /// A different diagram is addressed, or a feature map was removed.
    pub reload: bool,
    /// A feature map must be (re)applied.
    pub apply_feature_map: bool,
}

impl Route {
    /// Parse a page path and hash fragment (with or without the leading `#`).
    #[must_use]
    pub fn parse(path: &str, hash: &str) -> Self {
        let mut route = Self::default();
        let hash = hash.strip_prefix('#').unwrap_or(hash);

        if path.eq_ignore_ascii_case(SAVED_PAGE) {
            route.saved = true;
            if !hash.is_empty() && !hash.starts_with('*') {
                route.redirect = Some(format!("/{hash}.htm"));
            }
        } else {
            route.filename = Some(page_name(path).to_owned());
        }

        for segment in hash.split('/') {
            if segment == "compare" {
                route.comparing = true;
            }
            if let Some(key) = segment.strip_prefix('*') {
                route.filename = Some(key.to_owned());
            }
            if let Some(id) = segment.strip_prefix('$') {
                route.feature_map = Some(id.to_owned());
            }
        }
        route
    }

    /// Compare against the route in effect before a hash change.
    #[must_use]
    pub fn changes_from(&self, previous: &Self) -> RouteChange {
        let diagram_changed = self.filename != previous.filename;
        let map_removed = self.feature_map.is_none() && previous.feature_map.is_some();
        let apply_feature_map =
            self.feature_map.is_some() && (self.feature_map != previous.feature_map || diagram_changed);
        RouteChange { reload: diagram_changed || map_removed, apply_feature_map }
    }

    /// The saved-diagram key, when this route addresses a saved diagram.
    #[must_use]
    pub fn saved_key(&self) -> Option<&str> {
        if self.saved { self.filename.as_deref() } else { None }
    }

    /// Address of the same diagram with `map_id` applied.
    #[must_use]
    pub fn with_feature_map(&self, path: &str, map_id: &str) -> String {
        match self.saved_key() {
            Some(key) => format!("{path}#*{key}/${map_id}"),
            None => format!("{path}#${map_id}"),
        }
    }
}

/// Address of a saved diagram.
#[must_use]
pub fn saved_url(key: &str) -> String {
    format!("{SAVED_PAGE}#*{key}")
}

/// File stem of the last path segment.
fn page_name(path: &str) -> &str {
    let name = path.rsplit('/').next().unwrap_or(path);
    match name.rfind('.') {
        Some(dot) => &name[..dot],
        None => name,
    }
}
