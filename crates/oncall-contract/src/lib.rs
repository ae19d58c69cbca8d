//! On-Call Copilot Contracts
//!
//! Declarative shape contracts for untrusted JSON documents.
//!
//! # Core Concepts
//!
//! - [`Contract`]: closed set of recognized keys, each with a [`FieldSpec`]
//! - [`Shape`]: primitive, enum, bounded number, nested object or array
//! - [`validate`]: total structural validation returning every [`Violation`]
//! - [`BuiltinContracts`]: the incident envelope and merged analysis contracts
//!
//! Unknown keys are ignored, so callers may attach extra context without
//! tripping validation.
//!
//! # Example
//!
//! ```rust,ignore
//! use oncall_contract::{validate, BuiltinContracts};
//!
//! let contracts = BuiltinContracts::load()?;
//! let outcome = validate(&payload, &contracts.incident);
//! for violation in outcome.violations() {
//!     eprintln!("{violation}");
//! }
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

mod contract;
mod error;
mod json_schema;
mod schemas;
mod validate;

pub use contract::{Contract, ContractBuilder, FieldSpec, Presence, Primitive, Shape};
pub use error::ContractError;
pub use schemas::{
    analysis_contract, incident_contract, incident_keys, keys, BuiltinContracts, PRIORITIES,
    SEVERITIES, SPECIALIST_STATUSES,
};
pub use validate::{type_name, validate, ValidationOutcome, Violation, ViolationKind};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
