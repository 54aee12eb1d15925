// SupportSleuth - app/mod.rs
//
// Application layer: pipeline orchestration, the support-package context,
// background ingestion.
// Dependencies: core layer.
// Must NOT depend on: platform specifics.

pub mod ingest;
pub mod state;
pub mod worker;
