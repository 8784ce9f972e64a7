//! The fixed sentiment label set.
//!
//! Label order matches the classification head of the base model, so
//! [`Sentiment::index`] doubles as the logit column and the training target.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::error::LabelError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Negative,
    Neutral,
    Positive,
}

impl Sentiment {
    /// All labels in index order.
    pub const ALL: [Sentiment; 3] = [Sentiment::Negative, Sentiment::Neutral, Sentiment::Positive];

    pub const fn index(self) -> usize {
        match self {
            Sentiment::Negative => 0,
            Sentiment::Neutral => 1,
            Sentiment::Positive => 2,
        }
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Lowercase label as stored in the correction log and `config.json`.
    pub const fn as_str(self) -> &'static str {
        match self {
            Sentiment::Negative => "negative",
            Sentiment::Neutral => "neutral",
            Sentiment::Positive => "positive",
        }
    }

    /// Capitalized label for display.
    pub const fn display_name(self) -> &'static str {
        match self {
            Sentiment::Negative => "Negative",
            Sentiment::Neutral => "Neutral",
            Sentiment::Positive => "Positive",
        }
    }
}

impl fmt::Display for Sentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Sentiment {
    type Err = LabelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|label| label.as_str() == normalized)
            .ok_or_else(|| LabelError::Unknown(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_case_insensitively() {
        assert_eq!("Positive".parse::<Sentiment>().unwrap(), Sentiment::Positive);
        assert_eq!("  NEGATIVE ".parse::<Sentiment>().unwrap(), Sentiment::Negative);
        assert_eq!("neutral".parse::<Sentiment>().unwrap(), Sentiment::Neutral);
    }

    #[test]
    fn rejects_labels_outside_the_set() {
        let err = "positivo".parse::<Sentiment>().unwrap_err();
        assert!(matches!(err, LabelError::Unknown(ref l) if l == "positivo"));
        assert!("".parse::<Sentiment>().is_err());
    }

    #[test]
    fn index_lookup_is_a_bijection() {
        for (i, label) in Sentiment::ALL.iter().enumerate() {
            assert_eq!(label.index(), i);
            assert_eq!(Sentiment::from_index(i), Some(*label));
        }
        assert_eq!(Sentiment::from_index(3), None);
    }
}
