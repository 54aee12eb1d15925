// SupportSleuth - lib.rs
//
// Library entry point, exposing the ingestion pipeline, log database and
// platform helpers for the command-line binary and for integration testing.

pub mod app;
pub mod core;
pub mod platform;
pub mod util;
