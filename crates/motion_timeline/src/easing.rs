// SPDX-License-Identifier: MIT OR Apache-2.0
//! Easing descriptors.
//!
//! The engine never evaluates easing curves; it only validates and carries
//! them to the animation player. Descriptors use the CSS timing-function
//! syntax so snapshots stay readable by web-based players.

use crate::error::{Result, TimelineError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Named cubic-bezier presets, keyed by their camel-case name.
const PRESETS: &[(&str, [f64; 4])] = &[
    ("easeInQuad", [0.55, 0.085, 0.68, 0.53]),
    ("easeOutQuad", [0.25, 0.46, 0.45, 0.94]),
    ("easeInOutQuad", [0.455, 0.03, 0.515, 0.955]),
    ("easeInCubic", [0.55, 0.055, 0.675, 0.19]),
    ("easeOutCubic", [0.215, 0.61, 0.355, 1.0]),
    ("easeInOutCubic", [0.645, 0.045, 0.355, 1.0]),
    ("easeInQuart", [0.895, 0.03, 0.685, 0.22]),
    ("easeOutQuart", [0.165, 0.84, 0.44, 1.0]),
    ("easeInOutQuart", [0.77, 0.0, 0.175, 1.0]),
    ("easeInQuint", [0.755, 0.05, 0.855, 0.06]),
    ("easeOutQuint", [0.23, 1.0, 0.32, 1.0]),
    ("easeInOutQuint", [0.86, 0.0, 0.07, 1.0]),
];

/// Interpolation curve applied when transitioning into a keyframe
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum Easing {
    /// Constant speed
    #[default]
    Linear,
    /// CSS `ease`
    Ease,
    /// CSS `ease-in`
    EaseIn,
    /// CSS `ease-out`
    EaseOut,
    /// CSS `ease-in-out`
    EaseInOut,
    /// Jump at the start of the segment
    StepStart,
    /// Jump at the end of the segment
    StepEnd,
    /// Cubic bezier with control points (x1, y1, x2, y2)
    CubicBezier([f64; 4]),
    /// Player-specific identifier, carried verbatim
    Custom(String),
}

impl Easing {
    /// Parse an easing descriptor.
    ///
    /// Accepts CSS keywords, `cubic-bezier(...)` and the camel-case preset
    /// names. Any other identifier becomes [`Easing::Custom`]; malformed
    /// `cubic-bezier` input and empty strings are rejected.
    pub fn parse(value: &str) -> Result<Self> {
        let trimmed = value.trim();
        let easing = match trimmed {
            "" => return Err(invalid(value, "empty easing")),
            "linear" => Self::Linear,
            "ease" => Self::Ease,
            "ease-in" => Self::EaseIn,
            "ease-out" => Self::EaseOut,
            "ease-in-out" => Self::EaseInOut,
            "step-start" => Self::StepStart,
            "step-end" => Self::StepEnd,
            _ => {
                if let Some(args) = trimmed
                    .strip_prefix("cubic-bezier(")
                    .and_then(|rest| rest.strip_suffix(')'))
                {
                    Self::CubicBezier(parse_bezier(value, args)?)
                } else if let Some(curve) = Self::preset(trimmed) {
                    curve
                } else {
                    Self::Custom(trimmed.to_string())
                }
            }
        };
        Ok(easing)
    }

    /// Look up a named preset such as `easeOutCubic`
    pub fn preset(name: &str) -> Option<Self> {
        PRESETS
            .iter()
            .find(|(preset, _)| *preset == name)
            .map(|(_, points)| Self::CubicBezier(*points))
    }

    /// Names of all built-in presets
    pub fn preset_names() -> impl Iterator<Item = &'static str> {
        PRESETS.iter().map(|(name, _)| *name)
    }
}

fn invalid(value: &str, reason: impl Into<String>) -> TimelineError {
    TimelineError::InvalidEasing {
        value: value.to_string(),
        reason: reason.into(),
    }
}

fn parse_bezier(value: &str, args: &str) -> Result<[f64; 4]> {
    let parts: Vec<&str> = args.split(',').map(str::trim).collect();
    if parts.len() != 4 {
        return Err(invalid(value, "cubic-bezier takes exactly 4 numbers"));
    }

    let mut points = [0.0; 4];
    for (slot, part) in points.iter_mut().zip(&parts) {
        *slot = part
            .parse::<f64>()
            .map_err(|_| invalid(value, format!("'{part}' is not a number")))?;
        if !slot.is_finite() {
            return Err(invalid(value, "control points must be finite"));
        }
    }

    // x coordinates must stay inside the unit interval
    if !(0.0..=1.0).contains(&points[0]) || !(0.0..=1.0).contains(&points[2]) {
        return Err(invalid(value, "x control points must be within [0, 1]"));
    }
    Ok(points)
}

impl fmt::Display for Easing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Linear => f.write_str("linear"),
            Self::Ease => f.write_str("ease"),
            Self::EaseIn => f.write_str("ease-in"),
            Self::EaseOut => f.write_str("ease-out"),
            Self::EaseInOut => f.write_str("ease-in-out"),
            Self::StepStart => f.write_str("step-start"),
            Self::StepEnd => f.write_str("step-end"),
            Self::CubicBezier([x1, y1, x2, y2]) => {
                write!(f, "cubic-bezier({x1}, {y1}, {x2}, {y2})")
            }
            Self::Custom(name) => f.write_str(name),
        }
    }
}

impl FromStr for Easing {
    type Err = TimelineError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl From<Easing> for String {
    fn from(easing: Easing) -> Self {
        easing.to_string()
    }
}

impl TryFrom<String> for Easing {
    type Error = TimelineError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}
