//! Page-length values.
//!
//! A [`Length`] carries the point value used for layout together with a
//! normalized copy of what the user typed, so `6-7/8 pt` is shown back as
//! `6 7/8pt` rather than `6.875pt`.
//!
//! Accepted input is a magnitude followed by a mandatory unit:
//!
//! ```text
//! 12pt   1.5 cm   .25in   6 7/8"   6-7/8 pt   7/8mm   250 mil
//! ```

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;
use thiserror::Error;

const DECIMAL_PATTERN: &str = r"\d+(?:\.\d*)?|\.\d+";
const FRACTION_PATTERN: &str = r"(?:\d+(?:\s+|-))?\d+/[1-9]\d*";
const UNIT_PATTERN: &str = r#""|[A-Za-z]+"#;

/// Every unit token [`Unit::from_token`] recognizes.
const UNIT_TOKENS: [&str; 6] = ["\"", "in", "mil", "pt", "cm", "mm"];

/// Full grammar: whitespace, magnitude, whitespace, unit token, whitespace.
static LENGTH_RE: LazyLock<Regex> = LazyLock::new(|| {
    let pattern =
        format!(r"^\s*({DECIMAL_PATTERN}|{FRACTION_PATTERN})\s*({UNIT_PATTERN})\s*$");
    Regex::new(&pattern).expect("length pattern is a valid regex")
});

/// The same grammar restricted to recognized unit tokens.
static ACCEPTED_RE: LazyLock<Regex> = LazyLock::new(|| {
    let units: Vec<String> = UNIT_TOKENS.iter().map(|t| regex::escape(t)).collect();
    let pattern = format!(
        r"^\s*({DECIMAL_PATTERN}|{FRACTION_PATTERN})\s*({})\s*$",
        units.join("|")
    );
    Regex::new(&pattern).expect("accepted length pattern is a valid regex")
});

/// Splits a mixed fraction into whole part, numerator and denominator.
static FRACTION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:(\d+)(?:\s+|-))?(\d+)/(\d+)$").expect("fraction pattern is a valid regex")
});

/// Errors that can occur when parsing a length
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LengthError {
    #[error("Invalid length: {0:?}")]
    InvalidLength(String),

    #[error("Invalid unit: {0:?}")]
    InvalidUnit(String),
}

/// Units a length may be written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Unit {
    Points,
    Inches,
    Mils,
    Centimeters,
    Millimeters,
}

impl Unit {
    pub const ALL: [Unit; 5] = [
        Unit::Points,
        Unit::Inches,
        Unit::Mils,
        Unit::Centimeters,
        Unit::Millimeters,
    ];

    /// Looks up the unit for a token as written in a length string.
    ///
    /// Both `"` and `in` name inches. Tokens are case-sensitive.
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "\"" | "in" => Some(Unit::Inches),
            "mil" => Some(Unit::Mils),
            "pt" => Some(Unit::Points),
            "cm" => Some(Unit::Centimeters),
            "mm" => Some(Unit::Millimeters),
            _ => None,
        }
    }

    /// Scale from this unit to points.
    pub fn points_per_unit(self) -> f64 {
        match self {
            Unit::Points => 1.0,
            Unit::Inches => 72.0,
            Unit::Mils => 0.072,
            Unit::Centimeters => 72.0 / 2.54,
            Unit::Millimeters => 72.0 / 25.4,
        }
    }

    /// The normalized token for this unit.
    pub fn symbol(self) -> &'static str {
        match self {
            Unit::Points => "pt",
            Unit::Inches => "\"",
            Unit::Mils => "mil",
            Unit::Centimeters => "cm",
            Unit::Millimeters => "mm",
        }
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl FromStr for Unit {
    type Err = LengthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Unit::from_token(s.trim()).ok_or_else(|| LengthError::InvalidUnit(s.to_string()))
    }
}

/// A page length such as a margin, font size or page dimension.
///
/// Immutable once built. The default value has no definition and renders
/// as `0pt`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Length {
    definition: String,
    points: f64,
}

impl Length {
    /// Parses a length string, normalizing its textual form.
    pub fn parse(input: &str) -> Result<Self, LengthError> {
        let invalid = || LengthError::InvalidLength(input.to_string());

        let caps = LENGTH_RE.captures(input).ok_or_else(invalid)?;
        let (magnitude_text, magnitude) = parse_magnitude(&caps[1]).ok_or_else(invalid)?;

        let unit_token = &caps[2];
        let unit = Unit::from_token(unit_token)
            .ok_or_else(|| LengthError::InvalidUnit(unit_token.to_string()))?;

        Ok(Self {
            definition: format!("{}{}", magnitude_text, unit.symbol()),
            points: magnitude * unit.points_per_unit(),
        })
    }

    /// Wraps a raw point value.
    ///
    /// The display form is `<points>pt`. The grammar has no sign and no
    /// `NaN`/`inf` spelling, so only finite, non-negative values give a
    /// display form that parses back.
    pub fn from_points(points: f64) -> Self {
        Self {
            definition: format!("{}pt", points),
            points,
        }
    }

    /// The length in points.
    pub fn points(&self) -> f64 {
        self.points
    }

    /// The length expressed in `unit`.
    pub fn to_unit(&self, unit: Unit) -> f64 {
        self.points / unit.points_per_unit()
    }

    /// Whether this length was built from a definition (as opposed to `Default`).
    pub fn is_defined(&self) -> bool {
        !self.definition.is_empty()
    }

    /// The source of the length grammar, for clients that validate input
    /// before submitting it. Only recognized units match, so any string it
    /// accepts also parses.
    pub fn pattern() -> &'static str {
        ACCEPTED_RE.as_str()
    }
}

/// Parses a decimal or mixed-fraction magnitude into its normalized text and value.
fn parse_magnitude(text: &str) -> Option<(String, f64)> {
    if !text.contains('/') {
        let value = text.parse::<f64>().ok()?;
        return Some((text.to_string(), value));
    }

    let caps = FRACTION_RE.captures(text)?;
    let numerator: f64 = caps[2].parse().ok()?;
    let denominator: f64 = caps[3].parse().ok()?;
    if denominator == 0.0 {
        return None;
    }

    let mut value = numerator / denominator;
    let mut normalized = String::new();
    if let Some(whole) = caps.get(1) {
        value += whole.as_str().parse::<f64>().ok()?;
        normalized.push_str(whole.as_str());
        normalized.push(' ');
    }
    normalized.push_str(&caps[2]);
    normalized.push('/');
    normalized.push_str(&caps[3]);

    Some((normalized, value))
}

impl fmt::Display for Length {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.definition.is_empty() {
            f.write_str("0pt")
        } else {
            f.write_str(&self.definition)
        }
    }
}

impl FromStr for Length {
    type Err = LengthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for Length {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Length {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-9,
            "expected {} but got {}",
            expected,
            actual
        );
    }

    #[test]
    fn test_known_lengths() {
        let cases = [
            ("1 cm", "1cm", 72.0 / 2.54),
            ("1in", "1\"", 72.0),
            ("6-7/8 pt", "6 7/8pt", 6.875),
            ("250 mil", "250mil", 18.0),
            ("10\"", "10\"", 720.0),
        ];

        for (input, normalized, points) in cases {
            let length = Length::parse(input).unwrap();
            assert_eq!(length.to_string(), normalized, "normalized form of {:?}", input);
            assert_close(length.points(), points);
        }

        assert_eq!(Length::parse("1 cm").unwrap().points(), 72.0 / 2.54);
        assert_eq!(Length::parse("6-7/8 pt").unwrap().points(), 6.875);
    }

    #[test]
    fn test_unit_is_mandatory() {
        assert_eq!(
            Length::parse("12"),
            Err(LengthError::InvalidLength("12".to_string()))
        );
        assert!(Length::parse("6  7/8").is_err());
        assert!(Length::parse("").is_err());
        assert!(Length::parse("pt").is_err());
    }

    #[test]
    fn test_unknown_unit() {
        assert_eq!(
            Length::parse("3 furlongs"),
            Err(LengthError::InvalidUnit("furlongs".to_string()))
        );
        // Unit tokens are case-sensitive
        assert_eq!(
            Length::parse("2CM"),
            Err(LengthError::InvalidUnit("CM".to_string()))
        );
    }

    #[test]
    fn test_fraction_without_whole_part() {
        let length = Length::parse("7/8 pt").unwrap();
        assert_eq!(length.to_string(), "7/8pt");
        assert_eq!(length.points(), 0.875);
    }

    #[test]
    fn test_fraction_whitespace_collapses() {
        let length = Length::parse("  6   7/8   pt ").unwrap();
        assert_eq!(length.to_string(), "6 7/8pt");
        assert_eq!(length.points(), 6.875);

        let (normalized, value) = parse_magnitude("6  7/8").unwrap();
        assert_eq!(normalized, "6 7/8");
        assert_eq!(value, 6.875);
    }

    #[test]
    fn test_zero_denominator_rejected() {
        assert!(Length::parse("1/0 pt").is_err());
        assert!(Length::parse("3 1/0in").is_err());
    }

    #[test]
    fn test_decimal_keeps_digit_text() {
        assert_eq!(Length::parse("1.50 cm").unwrap().to_string(), "1.50cm");
        assert_eq!(Length::parse(".5in").unwrap().to_string(), ".5\"");
        assert_eq!(Length::parse("5.mm").unwrap().to_string(), "5.mm");
    }

    #[test]
    fn test_reparse_preserves_points() {
        let magnitudes = ["0", "1", "2.5", ".75", "12.125", "1000"];
        for unit in Unit::ALL {
            for magnitude in magnitudes {
                let input = format!("{} {}", magnitude, unit.symbol());
                let first = Length::parse(&input).unwrap();
                let second = Length::parse(&first.to_string()).unwrap();

                let expected = magnitude.parse::<f64>().unwrap() * unit.points_per_unit();
                assert_close(second.points(), expected);
                assert_eq!(first, second);
            }
        }
    }

    #[test]
    fn test_from_points() {
        let length = Length::from_points(12.0);
        assert_eq!(length.to_string(), "12pt");
        assert_eq!(length.points(), 12.0);

        let length = Length::from_points(12.5);
        assert_eq!(length.to_string(), "12.5pt");
        assert_eq!(Length::parse(&length.to_string()).unwrap(), length);
    }

    #[test]
    fn test_default_renders_zero() {
        let length = Length::default();
        assert_eq!(length.to_string(), "0pt");
        assert_eq!(length.points(), 0.0);
        assert!(!length.is_defined());
    }

    #[test]
    fn test_to_unit() {
        let length = Length::parse("8.5in").unwrap();
        assert_close(length.to_unit(Unit::Points), 612.0);
        assert_close(length.to_unit(Unit::Centimeters), 21.59);
        assert_close(length.to_unit(Unit::Mils), 8500.0);
    }

    #[test]
    fn test_unit_from_str() {
        assert_eq!("in".parse::<Unit>().unwrap(), Unit::Inches);
        assert_eq!("\"".parse::<Unit>().unwrap(), Unit::Inches);
        assert_eq!("mm".parse::<Unit>().unwrap(), Unit::Millimeters);
        assert!("yd".parse::<Unit>().is_err());
    }

    #[test]
    fn test_serialization() {
        let length = Length::parse("6-7/8 pt").unwrap();
        let json = serde_json::to_string(&length).unwrap();
        assert_eq!(json, "\"6 7/8pt\"");

        let decoded: Length = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, length);

        // An undefined length still serializes to something parseable
        let json = serde_json::to_string(&Length::default()).unwrap();
        assert_eq!(json, "\"0pt\"");
        let decoded: Length = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded.points(), 0.0);
    }

    #[test]
    fn test_deserialize_failure_is_an_error() {
        let result: Result<Length, _> = serde_json::from_str("\"12\"");
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("Invalid length"));

        let result: Result<Length, _> = serde_json::from_str("12");
        assert!(result.is_err());
    }

    #[test]
    fn test_pattern_is_exposed() {
        let pattern = Length::pattern();
        assert!(pattern.starts_with('^'));
        assert!(pattern.ends_with('$'));
        assert!(Regex::new(pattern).unwrap().is_match("6 7/8pt"));
    }

    #[test]
    fn test_pattern_agrees_with_parse() {
        let re = Regex::new(Length::pattern()).unwrap();
        for input in [
            "12pt", "1.5 cm", ".25in", "6 7/8\"", "6-7/8 pt", "7/8mm", "250 mil",
            "3 furlongs", "3 PT", "12", "1/0pt", "abc",
        ] {
            assert_eq!(
                re.is_match(input),
                Length::parse(input).is_ok(),
                "pattern and parser disagree on {:?}",
                input
            );
        }
    }

    #[test]
    fn test_unit_tokens_are_recognized() {
        for token in UNIT_TOKENS {
            assert!(Unit::from_token(token).is_some(), "{:?}", token);
        }
        for unit in Unit::ALL {
            assert!(UNIT_TOKENS.contains(&unit.symbol()));
        }
    }

    #[test]
    fn test_from_points_round_trips_when_non_negative() {
        for points in [0.0, 1e-7, 12.0, 0.1 + 0.2, 1e21] {
            let length = Length::from_points(points);
            let reparsed = Length::parse(&length.to_string()).unwrap();
            assert_eq!(reparsed.points(), points);
        }
    }

    #[test]
    fn test_from_points_outside_grammar() {
        // Still constructed, but the text form has no parse
        let negative = Length::from_points(-3.0);
        assert_eq!(negative.points(), -3.0);
        assert!(Length::parse(&negative.to_string()).is_err());
        assert!(Length::parse(&Length::from_points(f64::NAN).to_string()).is_err());
    }
}
