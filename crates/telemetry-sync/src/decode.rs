//! Decoding of raw sensor values into labelled numeric components.

use std::borrow::Cow;

/// Separates components of a multi-valued reading.
pub const COMPONENT_SEPARATOR: char = ',';
/// Separates a component label from its number.
pub const LABEL_DELIMITER: char = ':';
/// Label given to the only component of a plain numeric reading.
pub const SINGLE_LABEL: &str = "value";
/// Sensor name fragment that marks a tilt-direction code.
pub const TILT_TAG: &str = "TiltDirection";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeKind {
    /// Nothing numeric could be extracted.
    Empty,
    /// A plain number, labelled [`SINGLE_LABEL`].
    Single,
    /// A `label:number` list; malformed parts were dropped.
    Multi,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Component {
    pub label: String,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Decoded {
    pub kind: DecodeKind,
    pub components: Vec<Component>,
}

impl Decoded {
    pub fn empty() -> Self {
        Self {
            kind: DecodeKind::Empty,
            components: Vec::new(),
        }
    }

    /// The reading had no numeric content. Not an error, only worth a trace.
    pub fn is_unrecognized(&self) -> bool {
        self.kind == DecodeKind::Empty
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    pub fn pairs(&self) -> Vec<(&str, f64)> {
        self.components
            .iter()
            .map(|c| (c.label.as_str(), c.value))
            .collect()
    }
}

/// Decode a raw reading. Never fails; unusable input yields [`DecodeKind::Empty`].
pub fn decode(raw: &str) -> Decoded {
    if raw.contains(COMPONENT_SEPARATOR) {
        let components: Vec<Component> = raw
            .split(COMPONENT_SEPARATOR)
            .filter_map(|part| {
                let (label, number) = part.split_once(LABEL_DELIMITER)?;
                Some(Component {
                    label: label.trim().to_string(),
                    value: parse_number(number)?,
                })
            })
            .collect();
        if !components.is_empty() {
            return Decoded {
                kind: DecodeKind::Multi,
                components,
            };
        }
    }

    match parse_number(raw) {
        Some(value) => Decoded {
            kind: DecodeKind::Single,
            components: vec![Component {
                label: SINGLE_LABEL.to_string(),
                value,
            }],
        },
        None => Decoded::empty(),
    }
}

fn parse_number(s: &str) -> Option<f64> {
    // `f64::from_str` accepts "NaN" and "inf"; neither is a plottable value.
    s.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TiltDirection {
    Front,
    Left,
    Right,
    Back,
    Neutral,
    Flipped,
    Error,
}

impl TiltDirection {
    pub fn from_code(raw: &str) -> Option<Self> {
        match raw.trim() {
            "0" => Some(TiltDirection::Front),
            "1" => Some(TiltDirection::Left),
            "2" => Some(TiltDirection::Right),
            "3" => Some(TiltDirection::Back),
            "4" => Some(TiltDirection::Neutral),
            "5" => Some(TiltDirection::Flipped),
            "6" => Some(TiltDirection::Error),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            TiltDirection::Front => "Front",
            TiltDirection::Left => "Left",
            TiltDirection::Right => "Right",
            TiltDirection::Back => "Back",
            TiltDirection::Neutral => "Neutral",
            TiltDirection::Flipped => "Flipped",
            TiltDirection::Error => "Error",
        }
    }
}

pub fn tilt_label(raw: &str) -> &'static str {
    TiltDirection::from_code(raw).map_or("Unknown", |d| d.label())
}

/// Text shown next to a sensor's chart. Only affects rendering; the numeric
/// series still receive the decoded code.
pub fn display_value<'a>(name: &str, raw: &'a str) -> Cow<'a, str> {
    if name.contains(TILT_TAG) {
        Cow::Borrowed(tilt_label(raw))
    } else {
        Cow::Borrowed(raw)
    }
}
