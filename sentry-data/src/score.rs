/*!
Risk scale values as published by the Sentry API
*/

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize, Serializer};

use crate::error::DataError;

/// A Palermo or Torino scale value.
///
/// Sentry publishes scores as decimal strings such as `"-1.80"`. The text is
/// kept alongside the parsed value so that a saved snapshot reproduces what
/// the API sent, while comparisons use the number.
#[derive(Debug, Clone)]
pub struct Score {
    raw: String,
    value: f64,
}

impl Score {
    /// Numeric value used for comparisons
    pub fn value(&self) -> f64 {
        self.value
    }

    /// Text as received
    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl FromStr for Score {
    type Err = DataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let value: f64 = trimmed
            .parse()
            .map_err(|_| DataError::InvalidScore(s.to_string()))?;

        // `f64::from_str` accepts "NaN" and "inf", neither of which orders.
        if !value.is_finite() {
            return Err(DataError::InvalidScore(s.to_string()));
        }

        Ok(Self {
            raw: trimmed.to_string(),
            value,
        })
    }
}

impl TryFrom<f64> for Score {
    type Error = DataError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        if !value.is_finite() {
            return Err(DataError::InvalidScore(value.to_string()));
        }
        Ok(Self {
            raw: value.to_string(),
            value,
        })
    }
}

impl PartialEq for Score {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl PartialOrd for Score {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        self.value.partial_cmp(&other.value)
    }
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl Serialize for Score {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.raw)
    }
}

impl<'de> Deserialize<'de> for Score {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Wire {
            Text(String),
            Number(f64),
        }

        match Wire::deserialize(deserializer)? {
            Wire::Text(text) => text.parse().map_err(de::Error::custom),
            Wire::Number(number) => Score::try_from(number).map_err(de::Error::custom),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_original_text() {
        let score: Score = "-1.80".parse().unwrap();
        assert_eq!(score.as_str(), "-1.80");
        assert_eq!(score.value(), -1.8);
        assert_eq!(score.to_string(), "-1.80");
    }

    #[test]
    fn compares_numerically() {
        let a: Score = "-1.80".parse().unwrap();
        let b: Score = "-1.8".parse().unwrap();
        let c: Score = "-1.55".parse().unwrap();
        assert_eq!(a, b);
        assert!(c > a);
        assert!(!(a > b));
    }

    #[test]
    fn rejects_non_numeric_text() {
        assert!("".parse::<Score>().is_err());
        assert!("high".parse::<Score>().is_err());
        assert!("NaN".parse::<Score>().is_err());
        assert!("inf".parse::<Score>().is_err());
    }

    #[test]
    fn accepts_numbers_and_strings_on_the_wire() {
        let from_text: Score = serde_json::from_str("\"2\"").unwrap();
        let from_number: Score = serde_json::from_str("2").unwrap();
        assert_eq!(from_text, from_number);
        assert!(serde_json::from_str::<Score>("true").is_err());
        assert!(serde_json::from_str::<Score>("\"x\"").is_err());
    }

    #[test]
    fn serializes_as_string() {
        let score: Score = "-2.50".parse().unwrap();
        assert_eq!(serde_json::to_string(&score).unwrap(), "\"-2.50\"");
    }
}
