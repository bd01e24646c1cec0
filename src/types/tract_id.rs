use std::{fmt, sync::{Arc, OnceLock}};

use regex::Regex;

use super::Borough;

/// Errors produced when a tract identifier cannot be interpreted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TractIdError {
    /// The value has no usable digit run, or one of an unexpected length.
    Malformed(String),
    /// The county portion of a GEOID is not one of the five NYC counties.
    UnknownCounty(String),
}

impl fmt::Display for TractIdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TractIdError::Malformed(s) => write!(f, "malformed tract identifier: {s:?}"),
            TractIdError::UnknownCounty(s) => write!(f, "county {s:?} is not an NYC borough"),
        }
    }
}

impl std::error::Error for TractIdError {}

/// Borough tract code: one borough digit followed by the six-digit census tract number,
/// e.g. "1000100" for Manhattan tract 001.00. Keeps the code text (with leading zeros)
/// without repeated owned Strings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TractId(Arc<str>);

impl TractId {
    /// Number of characters in a borough tract code.
    pub const LEN: usize = 7;

    /// Build from an exact 7-digit borough tract code.
    pub fn new(code: &str) -> Result<Self, TractIdError> {
        let valid = code.len() == Self::LEN
            && code.bytes().all(|b| b.is_ascii_digit())
            && code.chars().next().and_then(Borough::from_digit).is_some();
        if !valid {
            return Err(TractIdError::Malformed(code.to_string()));
        }
        Ok(Self(Arc::from(code)))
    }

    /// Build from a county FIPS code (3 or 5 digits) and a 6-digit tract number.
    pub fn from_county_tract(county: &str, tract: &str) -> Result<Self, TractIdError> {
        let borough = Borough::from_county_fips(county)
            .ok_or_else(|| TractIdError::UnknownCounty(county.to_string()))?;
        if tract.len() != 6 || !tract.bytes().all(|b| b.is_ascii_digit()) {
            return Err(TractIdError::Malformed(tract.to_string()));
        }
        Ok(Self(Arc::from(format!("{}{tract}", borough.digit()))))
    }

    /// Interpret whatever tract-like value a source file carries:
    /// - a 15-digit block geocode (state + county + tract + block),
    /// - an 11-digit tract GEOID (state + county + tract),
    /// - a borough tract code, possibly with its leading zeros stripped.
    ///
    /// Only the first run of digits is considered, so values such as "1000100.0" or
    /// quoted ids are accepted.
    pub fn parse(value: &str) -> Result<Self, TractIdError> {
        static DIGITS: OnceLock<Regex> = OnceLock::new();
        let digits = DIGITS.get_or_init(|| Regex::new(r"\d+").expect("valid regex"))
            .find(value)
            .map(|m| m.as_str())
            .ok_or_else(|| TractIdError::Malformed(value.to_string()))?;

        match digits.len() {
            15 => Self::from_county_tract(&digits[..5], &digits[5..11]),
            11 => Self::from_county_tract(&digits[..5], &digits[5..]),
            1..=7 => Self::new(&format!("{digits:0>width$}", width = Self::LEN)),
            _ => Err(TractIdError::Malformed(value.to_string())),
        }
    }

    /// Get the code as a string slice.
    #[inline] pub fn as_str(&self) -> &str { &self.0 }

    /// Borough encoded by the leading digit.
    #[inline]
    pub fn borough(&self) -> Borough {
        // Validated on construction.
        self.0.chars().next().and_then(Borough::from_digit).unwrap_or(Borough::Manhattan)
    }
}

impl fmt::Display for TractId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for TractId {
    type Err = TractIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> { Self::parse(s) }
}
