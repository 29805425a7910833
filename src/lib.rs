//! Experiment Flow - participant-side engine for behavioral experiments.
//!
//! Walks a participant through a server-defined sequence of consent,
//! instruction, survey, randomizer, chat, branch, AI evaluation and
//! debriefing steps. The experiment server owns progress; this crate
//! renders steps, validates answers and drives the advance protocol.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
