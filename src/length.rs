//! Page measurements: lengths with unit suffixes, paper formats and
//! orientation.

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

use crate::error::Error;

/// Points per CSS pixel at 96 dpi.
const PT_PER_PX: f64 = 0.75;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unit {
    In,
    Cm,
    Mm,
    Pt,
    Px,
    Em,
}

impl Unit {
    fn suffix(self) -> &'static str {
        match self {
            Unit::In => "in",
            Unit::Cm => "cm",
            Unit::Mm => "mm",
            Unit::Pt => "pt",
            Unit::Px => "px",
            Unit::Em => "em",
        }
    }
}

/// A non-negative length such as `1in` or `2.5cm`.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(try_from = "String")]
pub struct Length {
    pub value: f64,
    pub unit: Unit,
}

impl Length {
    pub const fn new(value: f64, unit: Unit) -> Self {
        Self { value, unit }
    }

    /// Typst length literal. Pixels have no Typst unit and become points.
    pub fn to_typst(&self) -> String {
        match self.unit {
            Unit::Px => format!("{}pt", trim_float(self.value * PT_PER_PX)),
            unit => format!("{}{}", trim_float(self.value), unit.suffix()),
        }
    }
}

fn trim_float(value: f64) -> String {
    let s = format!("{value:.4}");
    s.trim_end_matches('0').trim_end_matches('.').to_string()
}

impl fmt::Display for Length {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", trim_float(self.value), self.unit.suffix())
    }
}

impl FromStr for Length {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let invalid = || Error::InvalidLength(s.to_string());

        let split = s
            .find(|c: char| c.is_ascii_alphabetic())
            .unwrap_or(s.len());
        let (number, suffix) = s.split_at(split);
        let value: f64 = number.trim().parse().map_err(|_| invalid())?;
        if !value.is_finite() || value < 0.0 {
            return Err(invalid());
        }

        let unit = match suffix.to_ascii_lowercase().as_str() {
            "in" => Unit::In,
            "cm" => Unit::Cm,
            "mm" => Unit::Mm,
            "pt" => Unit::Pt,
            "px" => Unit::Px,
            "em" | "rem" => Unit::Em,
            // Only zero may omit its unit
            "" if value == 0.0 => Unit::Pt,
            _ => return Err(invalid()),
        };
        Ok(Self { value, unit })
    }
}

impl TryFrom<String> for Length {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Paper sizes understood by the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(try_from = "String")]
pub enum PaperFormat {
    A3,
    #[default]
    A4,
    A5,
    Legal,
    Letter,
    Tabloid,
}

impl PaperFormat {
    /// Name of the matching Typst paper preset.
    pub fn typst_name(self) -> &'static str {
        match self {
            PaperFormat::A3 => "a3",
            PaperFormat::A4 => "a4",
            PaperFormat::A5 => "a5",
            PaperFormat::Legal => "us-legal",
            PaperFormat::Letter => "us-letter",
            PaperFormat::Tabloid => "us-tabloid",
        }
    }
}

impl FromStr for PaperFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "a3" => Ok(PaperFormat::A3),
            "a4" => Ok(PaperFormat::A4),
            "a5" => Ok(PaperFormat::A5),
            "legal" => Ok(PaperFormat::Legal),
            "letter" => Ok(PaperFormat::Letter),
            "tabloid" => Ok(PaperFormat::Tabloid),
            _ => Err(Error::UnknownPaperFormat(s.to_string())),
        }
    }
}

impl TryFrom<String> for PaperFormat {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    #[default]
    Portrait,
    Landscape,
}
