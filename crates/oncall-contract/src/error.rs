//! Error types for contract construction
//!
//! Non-conforming documents are never errors: they produce violations.
//! These errors describe malformed contracts, which are programming
//! mistakes and must abort whatever tried to build them.

/// A contract definition is malformed
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ContractError {
    /// Field key is empty
    #[error("contract '{contract}' declares a field with an empty key")]
    EmptyKey { contract: String },

    /// Same key declared twice in one contract
    #[error("contract '{contract}' declares key '{key}' more than once")]
    DuplicateKey { contract: String, key: String },

    /// Enum shape with no allowed values
    #[error("contract '{contract}' key '{key}' declares an empty enum")]
    EmptyEnum { contract: String, key: String },

    /// Numeric bounds are NaN or inverted
    #[error("contract '{contract}' key '{key}' has invalid bounds [{min:?}, {max:?}]")]
    InvalidBounds {
        contract: String,
        key: String,
        min: Option<f64>,
        max: Option<f64>,
    },
}

impl ContractError {
    /// Name of the contract that failed to build
    #[must_use]
    pub fn contract(&self) -> &str {
        match self {
            Self::EmptyKey { contract }
            | Self::DuplicateKey { contract, .. }
            | Self::EmptyEnum { contract, .. }
            | Self::InvalidBounds { contract, .. } => contract,
        }
    }
}
