// THEORY:
// This file is the main entry point for the `landwatch` library crate.
// It follows the standard Rust convention of using `lib.rs` to define the public
// API that will be exposed to external consumers (the `landwatch_tester` CLI and
// the `landwatch_server` HTTP surface).
//
// The primary goal is to export the `ChangeDetectionPipeline` and its associated
// data structures (`PipelineConfig`, `AnalysisResult`, `Deviation`, ...) as the
// clean, high-level interface for the change detector. The individual stages
// (`core_modules`) stay public for callers that want a single stage, but the
// pipeline is the intended way in.

pub mod core_modules;
pub mod error;
pub mod parallel_pipeline;
pub mod pipeline;

pub use error::{Error, Result};
pub use parallel_pipeline::AnalysisPool;
pub use pipeline::{AnalysisResult, ChangeDetectionPipeline, PipelineConfig};
