//! Interactive viewer for rasters served by a remote tile service.
//!
//! The backend owns the source image and serves one decimated frame at a
//! time; this crate provides the canvas-based GUI that drives it and a
//! headless CLI for scripted use.

pub mod backend;
pub mod geometry;
pub mod gui_app;
pub mod logging;
