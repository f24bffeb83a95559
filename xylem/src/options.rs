//! Matching configuration.

use core::fmt;
use core::str::FromStr;

use facet::Facet;

use crate::error::DiffError;

/// How attribute (and object key) order participates in equality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Facet)]
#[repr(u8)]
pub enum AttributeOrder {
    /// Same keys and values in the same order
    #[default]
    Strict,
    /// Same keys and values in any order
    Ignore,
}

impl FromStr for AttributeOrder {
    type Err = DiffError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "strict" => Ok(AttributeOrder::Strict),
            "ignore" => Ok(AttributeOrder::Ignore),
            other => Err(DiffError::UnknownBehavior {
                value: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for AttributeOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AttributeOrder::Strict => "strict",
            AttributeOrder::Ignore => "ignore",
        })
    }
}

/// How text values are compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Facet)]
#[repr(u8)]
pub enum TextContent {
    /// Exact byte equality
    #[default]
    Strict,
    /// Whitespace runs collapsed and trimmed before comparing
    Normalize,
}

impl FromStr for TextContent {
    type Err = DiffError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "strict" => Ok(TextContent::Strict),
            "normalize" | "normalized" => Ok(TextContent::Normalize),
            other => Err(DiffError::UnknownBehavior {
                value: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for TextContent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TextContent::Strict => "strict",
            TextContent::Normalize => "normalize",
        })
    }
}

/// Options for [`match_trees`](crate::match_trees) and
/// [`diff_trees`](crate::diff_trees).
#[derive(Debug, Clone, PartialEq, Facet)]
pub struct MatchOptions {
    /// Minimum Jaccard score (exclusive) for a similarity match.
    pub similarity_threshold: f64,

    /// Run the exact-subtree phase.
    pub enable_hash_matching: bool,

    /// Run the content-similarity phase.
    pub enable_similarity_matching: bool,

    /// Run the structural propagation phase.
    pub enable_propagation: bool,

    /// Attribute and object key order policy.
    pub attribute_order: AttributeOrder,

    /// Text comparison policy.
    pub text_content: TextContent,

    /// Weight unit `W0` in the propagation depth budget `1 + floor(weight / W0)`.
    pub propagation_base_weight: f64,
}

impl Default for MatchOptions {
    fn default() -> Self {
        Self {
            similarity_threshold: 0.95,
            enable_hash_matching: true,
            enable_similarity_matching: true,
            enable_propagation: true,
            attribute_order: AttributeOrder::default(),
            text_content: TextContent::default(),
            propagation_base_weight: 10.0,
        }
    }
}

impl MatchOptions {
    /// Reject values the matchers cannot work with.
    pub fn validate(&self) -> Result<(), DiffError> {
        if !(0.0..=1.0).contains(&self.similarity_threshold) {
            return Err(DiffError::InvalidSimilarityThreshold {
                value: self.similarity_threshold,
            });
        }
        if !(self.propagation_base_weight.is_finite() && self.propagation_base_weight > 0.0) {
            return Err(DiffError::InvalidBaseWeight {
                value: self.propagation_base_weight,
            });
        }
        Ok(())
    }

    /// Builder-style setter for the attribute order policy.
    pub fn with_attribute_order(mut self, order: AttributeOrder) -> Self {
        self.attribute_order = order;
        self
    }

    /// Builder-style setter for the text policy.
    pub fn with_text_content(mut self, mode: TextContent) -> Self {
        self.text_content = mode;
        self
    }

    /// Builder-style setter for the similarity threshold.
    pub fn with_similarity_threshold(mut self, threshold: f64) -> Self {
        self.similarity_threshold = threshold;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = MatchOptions::default();
        assert_eq!(options.similarity_threshold, 0.95);
        assert!(options.enable_hash_matching);
        assert!(options.enable_similarity_matching);
        assert!(options.enable_propagation);
        assert_eq!(options.propagation_base_weight, 10.0);
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_parse_behaviors() {
        assert_eq!("ignore".parse::<AttributeOrder>(), Ok(AttributeOrder::Ignore));
        assert_eq!("normalized".parse::<TextContent>(), Ok(TextContent::Normalize));
        assert_eq!("normalize".parse::<TextContent>(), Ok(TextContent::Normalize));
        assert!(matches!(
            "sloppy".parse::<TextContent>(),
            Err(DiffError::UnknownBehavior { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let nan = MatchOptions::default().with_similarity_threshold(f64::NAN);
        assert!(nan.validate().is_err());

        let too_high = MatchOptions::default().with_similarity_threshold(1.5);
        assert!(matches!(
            too_high.validate(),
            Err(DiffError::InvalidSimilarityThreshold { .. })
        ));

        let zero_weight = MatchOptions {
            propagation_base_weight: 0.0,
            ..MatchOptions::default()
        };
        assert!(matches!(
            zero_weight.validate(),
            Err(DiffError::InvalidBaseWeight { .. })
        ));
    }
}
