//! On-Call Copilot Composition
//!
//! Turns raw specialist text into one merged analysis.
//!
//! # Core Concepts
//!
//! - [`extract_fragments`]: recover leading JSON objects from noisy text
//! - [`ResultMerger`]: order fragments by role priority and fold them
//! - [`MergedResult`]: shallow key union, later writer wins
//! - [`TelemetryRecord`]: process-computed facts stamped over `telemetry`
//!
//! # Example
//!
//! ```rust,ignore
//! use oncall_composition::{extract_fragments, ResultMerger, RoleId, TelemetryRecord};
//!
//! let merger = ResultMerger::new(["triage", "summary", "comms", "pir"]);
//! let mut fragments = Vec::new();
//! for (role, text) in outputs {
//!     fragments.extend(extract_fragments(&role, &text));
//! }
//! let merged = merger.merge_stamped(fragments, &TelemetryRecord::new(id, "model-router"));
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

mod fragment;
mod merge;
mod role;
mod telemetry;

pub use fragment::{extract_fragments, strip_fence, Fragment};
pub use merge::{MergedResult, ResultMerger};
pub use role::RoleId;
pub use telemetry::{SpecialistStatus, SpecialistTelemetry, TelemetryRecord, TokenUsage};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
