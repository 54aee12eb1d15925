// SupportSleuth - platform/mod.rs
//
// Platform abstraction layer.
// Dependencies: util, standard library, directories and memmap2 crates.
// Must NOT depend on: core, app.

pub mod config;
pub mod fs;
