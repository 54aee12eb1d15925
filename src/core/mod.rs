// SupportSleuth - core/mod.rs
//
// Core business logic layer: pure transformations over in-memory data.
// Dependencies: util, plus codec crates (flate2, tar, prost, serde_json).
// Must NOT depend on: app, platform, or touch the filesystem.

pub mod archive;
pub mod consolidate;
pub mod database;
pub mod export;
pub mod filter;
pub mod frame;
pub mod legacy;
pub mod model;
pub mod parser;
pub mod store;
pub mod upload;
