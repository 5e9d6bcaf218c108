//! Tiling and merge processes for GRASS GIS projects, served over HTTP.
//!
//! A grid tiling job splits the region of a mapset into vector tiles; a patch
//! merge job combines the per-tile results of several mapsets into one. Jobs
//! describe their work as process chains ([`process_chain`]), run them through
//! a [`engine::ProcessExecutor`] inside temporary environments managed by a
//! [`workspace::WorkspaceManager`], and report progress to the job queue
//! ([`job_controller`]).

pub mod config;
pub mod engine;
pub mod error;
pub mod job_controller;
pub mod process_chain;
pub mod processing;
pub mod services;
pub mod workspace;
