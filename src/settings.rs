//! User settings: highlight palette, theme, zoom mode, menu preference and
//! image filter values.
//!
//! Stored as PascalCase JSON under the `settings` key. Loading starts from
//! defaults and overlays every stored value that is present and non-empty, so
//! older or partial records keep working.

#[cfg(test)]
#[path = "settings_test.rs"]
mod settings_test;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::camera::{FitMode, FitModeError};

/// Errors interpreting stored settings.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("settings are not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unexpected theme: {0}")]
    Theme(String),
    #[error(transparent)]
    Zoom(#[from] FitModeError),
}

/// Colour scheme preference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Theme {
    Light,
    Dark,
    #[default]
    System,
}

impl FromStr for Theme {
    type Err = SettingsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "light" => Ok(Self::Light),
            "dark" => Ok(Self::Dark),
            "system" => Ok(Self::System),
            _ => Err(SettingsError::Theme(s.to_owned())),
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Image filter slider values. Brightness, contrast and saturation are in
/// tenths (10 = 100%); hue is in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Filters {
    pub brightness: f64,
    pub contrast: f64,
    pub hue: f64,
    pub saturation: f64,
}

impl Default for Filters {
    fn default() -> Self {
        Self { brightness: 10.0, contrast: 10.0, hue: 0.0, saturation: 10.0 }
    }
}

impl Filters {
    /// CSS `filter` value for these settings.
    #[must_use]
    pub fn css(&self) -> String {
        format!(
            "brightness({:.1}) contrast({:.1}) hue-rotate({}deg) saturate({:.1})",
            self.brightness / 10.0,
            self.contrast / 10.0,
            self.hue,
            self.saturation / 10.0,
        )
    }

    /// Read values back from a CSS `filter` value. Functions that are missing
    /// or unparsable keep the value from `base`. Returns `None` for an empty filter.
    #[must_use]
    pub fn from_css(css: &str, base: Self) -> Option<Self> {
        if css.trim().is_empty() {
            return None;
        }
        let mut filters = base;
        if let Some(v) = css_argument(css, "brightness", ")") {
            filters.brightness = v * 10.0;
        }
        if let Some(v) = css_argument(css, "contrast", ")") {
            filters.contrast = v * 10.0;
        }
        if let Some(v) = css_argument(css, "hue-rotate", "deg") {
            filters.hue = v;
        }
        if let Some(v) = css_argument(css, "saturate", ")") {
            filters.saturation = v * 10.0;
        }
        Some(filters)
    }
}

fn css_argument(css: &str, function: &str, close: &str) -> Option<f64> {
    let start = css.find(function)?;
    let rest = &css[start..];
    let open = rest.find('(')?;
    let rest = &rest[open + 1..];
    let end = rest.find(close)?;
    parse_number(&rest[..end])
}

fn parse_number(text: &str) -> Option<f64> {
    match text.trim().parse::<f64>() {
        Ok(v) if v.is_finite() => Some(v),
        _ => None,
    }
}

/// Persisted user settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Settings {
    pub filters: Filters,
    pub highlight1: String,
    pub highlight2: String,
    pub highlight3: String,
    pub highlight4: String,
    pub highlight5: String,
    pub highlight6: String,
    pub highlight7: String,
    pub highlight8: String,
    pub highlight9: String,
    pub highlight0: String,
    pub menu: String,
    pub theme: String,
    pub zoom: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            filters: Filters::default(),
            highlight1: "#CCCC00".into(),
            highlight2: "#AA00CC".into(),
            highlight3: "#00CCBB".into(),
            highlight4: "#222222".into(),
            highlight5: "#3BAF53".into(),
            highlight6: "#4F73C2".into(),
            highlight7: "#F20F19".into(),
            highlight8: "#F79ACC".into(),
            highlight9: "#808080".into(),
            highlight0: "#F8C026".into(),
            menu: "Open".into(),
            theme: "System".into(),
            zoom: "Fit".into(),
        }
    }
}

impl Settings {
    /// Defaults overlaid with the non-empty values of a stored JSON record.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::Json`] when `json` does not parse.
    pub fn from_json(json: &str) -> Result<Self, SettingsError> {
        let stored: Value = serde_json::from_str(json)?;
        let mut settings = Self::default();
        settings.overlay(&stored);
        Ok(settings)
    }

    /// Defaults overlaid with `json`; malformed JSON is logged and ignored.
    #[must_use]
    pub fn from_json_or_default(json: Option<&str>) -> Self {
        let Some(json) = json else {
            return Self::default();
        };
        Self::from_json(json).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "ignoring stored settings");
            Self::default()
        })
    }

    fn overlay(&mut self, stored: &Value) {
        if let Some(filters) = stored.get("Filters") {
            overlay_number(&mut self.filters.brightness, filters.get("Brightness"));
            overlay_number(&mut self.filters.contrast, filters.get("Contrast"));
            overlay_number(&mut self.filters.hue, filters.get("Hue"));
            overlay_number(&mut self.filters.saturation, filters.get("Saturation"));
        }

        let keys = ["Highlight1", "Highlight2", "Highlight3", "Highlight4", "Highlight5"];
        let slots = [
            &mut self.highlight1,
            &mut self.highlight2,
            &mut self.highlight3,
            &mut self.highlight4,
            &mut self.highlight5,
        ];
        for (key, slot) in keys.into_iter().zip(slots) {
            overlay_string(slot, stored.get(key));
        }
        let keys = ["Highlight6", "Highlight7", "Highlight8", "Highlight9", "Highlight0", "Menu", "Theme", "Zoom"];
        let slots = [
            &mut self.highlight6,
            &mut self.highlight7,
            &mut self.highlight8,
            &mut self.highlight9,
            &mut self.highlight0,
            &mut self.menu,
            &mut self.theme,
            &mut self.zoom,
        ];
        for (key, slot) in keys.into_iter().zip(slots) {
            overlay_string(slot, stored.get(key));
        }
    }

    /// Serialize for storage.
    ///
    /// # Errors
    ///
    /// Propagates serializer failures.
    pub fn to_json(&self) -> Result<String, SettingsError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Palette colour for a number key: `1`..`9` are slots 1-9, `0` is slot 10.
    #[must_use]
    pub fn palette_for_digit(&self, digit: char) -> Option<&str> {
        let colour = match digit {
            '1' => &self.highlight1,
            '2' => &self.highlight2,
            '3' => &self.highlight3,
            '4' => &self.highlight4,
            '5' => &self.highlight5,
            '6' => &self.highlight6,
            '7' => &self.highlight7,
            '8' => &self.highlight8,
            '9' => &self.highlight9,
            '0' => &self.highlight0,
            _ => return None,
        };
        Some(colour)
    }

    /// The four quick-highlight colours, in slot order.
    #[must_use]
    pub fn quick_highlights(&self) -> [&str; 4] {
        [&self.highlight1, &self.highlight2, &self.highlight3, &self.highlight4]
    }

    /// Parsed zoom mode.
    ///
    /// # Errors
    ///
    /// Returns [`FitModeError`] for an unrecognised mode name.
    pub fn fit_mode(&self) -> Result<FitMode, FitModeError> {
        self.zoom.parse()
    }

    /// Parsed theme.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::Theme`] for an unrecognised theme name.
    pub fn theme(&self) -> Result<Theme, SettingsError> {
        self.theme.parse()
    }

    /// Whether the menu starts open.
    #[must_use]
    pub fn menu_open(&self) -> bool {
        !self.menu.eq_ignore_ascii_case("closed")
    }
}

fn overlay_string(slot: &mut String, value: Option<&Value>) {
    if let Some(Value::String(s)) = value {
        if !s.is_empty() {
            slot.clone_from(s);
        }
    }
}

/// Slider values were historically stored as strings; accept both forms.
/// Zero and empty values are treated as absent.
fn overlay_number(slot: &mut f64, value: Option<&Value>) {
    let parsed = match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => parse_number(s),
        _ => None,
    };
    if let Some(v) = parsed.filter(|v| *v != 0.0 && v.is_finite()) {
        *slot = v;
    }
}
