//! Android WebView wrapper build pipeline.
//!
//! Turns a small declarative description of a website into a buildable
//! Android WebView wrapper project, drives an external build toolchain with
//! bounded retry, and publishes the produced package, optionally as a tagged
//! release.
//!
//! Stages, leaf first: [`config`] validates and normalizes the request,
//! [`generator`] deterministically derives resources, [`templater`] merges
//! them into a content-addressed project tree, [`orchestrator`] drives the
//! build state machine, and [`publisher`] stores the artifact exactly once
//! per job. [`pipeline`] wires the stages together.

pub mod cli;
pub mod config;
pub mod error;
pub mod generator;
pub mod notify;
pub mod orchestrator;
pub mod pipeline;
pub mod publisher;
pub mod registry;
pub mod templater;

// Re-export commonly used types
pub use config::{BuildConfig, RawConfig};
pub use error::{BuildError, GenerationError, PipelineError, PublishError, Result};
pub use pipeline::{JobReport, JobState, Pipeline};
