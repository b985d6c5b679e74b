//! SVG `transform` attribute strings for annotation nodes.
//!
//! Annotation nodes are positioned entirely through `transform`; their x/y
//! attributes stay at 0. The attribute is always written in the fixed order
//! `translate(x y) rotate(deg) scale(s)`, omitting identity components.

#[cfg(test)]
#[path = "transform_test.rs"]
mod transform_test;

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

use crate::camera::{Point, round_to};

/// Error parsing a transform attribute written by the editor.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransformError {
    #[error("unexpected transform component: {0}")]
    UnknownComponent(String),
    #[error("invalid number in transform: {0:?}")]
    InvalidNumber(String),
}

/// Translate, rotate and scale components of an annotation node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub translate: Point,
    /// Degrees clockwise.
    pub rotate: f64,
    pub scale: f64,
}

impl Default for Transform {
    fn default() -> Self {
        Self { translate: Point::default(), rotate: 0.0, scale: 1.0 }
    }
}

impl Transform {
    #[must_use]
    pub fn at(x: f64, y: f64) -> Self {
        Self { translate: Point::new(x, y), ..Self::default() }
    }

    /// Parse a transform attribute. An empty string is the identity.
    ///
    /// # Errors
    ///
    /// Returns [`TransformError`] for any function other than translate,
    /// rotate or scale, or for an argument that is not a number.
    pub fn parse(value: &str) -> Result<Self, TransformError> {
        let mut transform = Self::default();
        for function in value.split(')').map(str::trim).filter(|f| !f.is_empty()) {
            let (name, args) = function.split_once('(').unwrap_or((function, ""));
            let name = name.trim();
            let mut args = args.split([',', ' ', '\t', '\n', '\r']).filter(|a| !a.is_empty());
            match name.to_ascii_lowercase().as_str() {
                "translate" => {
                    transform.translate.x = number(args.next())?;
                    transform.translate.y = args.next().map_or(Ok(0.0), |y| number(Some(y)))?;
                }
                "rotate" => transform.rotate = number(args.next())?,
                "scale" => transform.scale = number(args.next())?,
                _ => return Err(TransformError::UnknownComponent(name.to_owned())),
            }
        }
        Ok(transform)
    }

    /// Serialize with positions and rotation to 1 decimal and scale to 2.
    #[must_use]
    pub fn build(&self) -> String {
        let mut parts = Vec::with_capacity(3);

        let x = round_to(self.translate.x, 1);
        let y = round_to(self.translate.y, 1);
        if x != 0.0 || y != 0.0 {
            parts.push(format!("translate({x:.1} {y:.1})"));
        }

        let rotate = round_to(self.rotate, 1);
        if rotate != 0.0 {
            parts.push(format!("rotate({rotate:.1})"));
        }

        let scale = round_to(self.scale, 2);
        if (scale - 1.0).abs() > f64::EPSILON {
            parts.push(format!("scale({scale:.2})"));
        }

        parts.join(" ")
    }

    /// Advance rotation by `step` degrees, snapping to a multiple of `step` within one turn.
    pub fn step_rotation(&mut self, step: f64) {
        let rotation = (self.rotate + step) % 360.0;
        self.rotate = (rotation / step).floor() * step;
    }

    pub fn reset_scale(&mut self) {
        self.scale = 1.0;
    }
}

impl fmt::Display for Transform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.build())
    }
}

/// A required argument. A missing one is an empty invalid number.
fn number(token: Option<&str>) -> Result<f64, TransformError> {
    let token = token.unwrap_or_default();
    token.parse::<f64>().map_err(|_| TransformError::InvalidNumber(token.to_owned()))
}

static TRANSLATE: LazyLock<Result<Regex, regex::Error>> =
    LazyLock::new(|| Regex::new(r"translate\(\s*(-?[\d.]*)\s*[,\s]\s*(-?[\d.]*)\s*"));

/// Extract the translate offset of an arbitrary source transform, such as
/// `translate(10, 20)` or `matrix(...) translate(10 20)`.
///
/// Returns `None` when the attribute has no translate component.
#[must_use]
pub fn translate_of(value: &str) -> Option<Point> {
    let re = match TRANSLATE.as_ref() {
        Ok(re) => re,
        Err(e) => {
            tracing::error!(error = %e, "translate pattern failed to compile");
            return None;
        }
    };
    let caps = re.captures(value)?;
    let x = caps.get(1).map_or(0.0, |m| m.as_str().parse().unwrap_or(0.0));
    let y = caps.get(2).map_or(0.0, |m| m.as_str().parse().unwrap_or(0.0));
    Some(Point::new(x, y))
}
