//! Domain layer containing the flow model and its rules.
//!
//! # Module Organization
//!
//! - `foundation` - Shared primitives (identifiers, errors)
//! - `flow` - Step Definition Model
//! - `randomization` - Shuffles, weighted draws, branch resolution
//! - `response` - Answers and advance payloads
//! - `survey` - Question ordering and submission validation
//! - `execution` - Per-participant execution state and step descriptors

pub mod execution;
pub mod flow;
pub mod foundation;
pub mod randomization;
pub mod response;
pub mod survey;
