//! # exif-bridge
//!
//! Image metadata via the exiftool command line — query and rewrite capture
//! timestamps and dimensions by driving the external `exiftool` binary as a
//! subprocess and interpreting its textual report, with no native EXIF/IPTC
//! binary parsing anywhere in the crate.
//!
//! ## Quick Start
//!
//! The whole public surface lives on [`handler::ExifToolHandler`]:
//!
//! ```rust,no_run
//! use exif_bridge::config::ToolConfig;
//! use exif_bridge::handler::ExifToolHandler;
//! use std::path::Path;
//!
//! fn main() {
//!     // Load config from file (tool name, install dir, timeout)
//!     let config = ToolConfig::load(None).unwrap_or_default();
//!
//!     // Construction provisions the bundled tool on first use
//!     let handler = ExifToolHandler::new(config);
//!
//!     // Full record for one image
//!     let meta = handler.metadata(Path::new("photo.jpg"));
//!     println!("Taken: {:?}", meta.capture_timestamp);
//!     println!("Size:  {:?}x{:?}", meta.width, meta.height);
//!
//!     // One batched invocation for a whole folder
//!     if let Some(dates) = handler.capture_timestamps_for_folder(Path::new("./photos")) {
//!         for (file, taken) in &dates {
//!             println!("{}: {taken}", file.display());
//!         }
//!     }
//! }
//! ```
//!
//! ## Failure Model
//!
//! Operations never panic and never return `Err`: execution failures
//! (missing tool, non-zero exit, timeout) and malformed report lines are
//! logged and degrade to absence (`None`, `false`, or an all-absent
//! record). An empty report with exit code 0 means "no fields present",
//! which is a valid answer, not an anomaly.
//!
//! Calls block for the duration of one subprocess invocation. Concurrent
//! calls are safe — the only shared state is the read-only
//! [`config::ToolConfig`].
//!
//! ## Modules
//!
//! - [`config`] — the immutable command descriptor and its JSON loading
//! - [`metadata`] — the typed metadata record and timestamp format
//! - [`tool`] — provisioning, argument building, process execution, parsing
//! - [`handler`] — the public metadata operations

pub mod config;
pub mod handler;
pub mod metadata;
pub mod tool;

pub use config::ToolConfig;
pub use handler::ExifToolHandler;
pub use metadata::ImageMetadata;
