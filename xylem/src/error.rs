use facet::Facet;

/// Errors surfaced by the comparison core.
///
/// Arbitrary trees never fail; only malformed configuration and unknown
/// operation type names do.
#[derive(Facet, Debug, Clone, PartialEq)]
#[facet(derive(Error))]
#[repr(u8)]
pub enum DiffError {
    /// invalid operation type: {name}
    InvalidOperationType { name: String },

    /// unknown comparison dimension: {name}
    UnknownDimension { name: String },

    /// unknown match behavior: {value}
    UnknownBehavior { value: String },

    /// similarity threshold must be within 0.0..=1.0, got {value}
    InvalidSimilarityThreshold { value: f64 },

    /// propagation base weight must be positive, got {value}
    InvalidBaseWeight { value: f64 },
}

impl DiffError {
    /// Whether this error comes from configuration rather than from an
    /// operation.
    pub fn is_configuration_error(&self) -> bool {
        !matches!(self, DiffError::InvalidOperationType { .. })
    }
}
