//! boilersync core library.
//!
//! This crate provides the decision engine for keeping a project fork
//! reconciled with the boilerplate it was generated from: per-file history
//! and content comparison, merge-risk classification, customization
//! (swizzle) tracking, strategy resolution, the analysis pipeline, and the
//! merge/resolution orchestrator.

pub mod analyzer;
pub mod blob;
pub mod errors;
pub mod history;
pub mod models;
pub mod orchestrator;
pub mod risk;
pub mod settings;
pub mod strategy;
pub mod swizzle;
pub mod threeway;
pub mod vcs;

// Re-exports for convenience.
pub use analyzer::{AnalysisOutcome, Analyzer};
pub use errors::CoreError;
pub use orchestrator::{ConfirmGate, SyncOrchestrator};
pub use settings::SyncSettings;
pub use swizzle::{SwizzleStore, SwizzleTracker};
pub use vcs::{GitVcs, MemoryVcs, VersionControl};
