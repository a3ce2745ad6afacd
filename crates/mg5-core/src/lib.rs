//! Driver for MadGraph5_aMC@NLO: renders command scripts, runs `mg5_aMC`,
//! places cards and scrapes run summaries from its output.

pub mod common;
pub mod domain;
pub mod modules;

pub use domain::{
    LastStep, LaunchRequest, Mg5Error, Mg5ErrorCategory, Mg5Result, OutputRequest, RunResult,
};
pub use modules::session::{OutputHandle, OutputStatus, Session};
