//! High-level facade crate for the `court-calib-*` workspace.
//!
//! This crate provides:
//! - re-exports of the geometry core, the session layer and the overlay,
//! - [`workflow`] helpers that run a whole calibrate / project / render step
//!   against a [`CourtStore`](session::CourtStore),
//! - the `court-calib` command line tool (feature `cli`, on by default).
//!
//! ## Quickstart
//!
//! ```
//! use court_calib::session::{
//!     CalibrationSession, CourtStore, MemoryStore, StaticVideo, UploadId,
//! };
//! use nalgebra::Point2;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let video = StaticVideo::new(1280, 720).at(3.0);
//! let mut wizard = CalibrationSession::default();
//! wizard.capture(&video)?;
//! for (x, y) in [(180.0, 620.0), (1100.0, 630.0), (900.0, 300.0), (360.0, 295.0)] {
//!     wizard.click(Point2::new(x, y))?;
//! }
//! wizard.advance()?;
//! wizard.click(Point2::new(270.0, 450.0))?;
//! wizard.click(Point2::new(1000.0, 455.0))?;
//! wizard.advance()?;
//!
//! let mut store = MemoryStore::new();
//! let upload = UploadId::new("match-1");
//! let calibration = wizard.save(&mut store, &upload)?;
//! let zone = calibration.mapping().zone_at(Point2::new(640.0, 560.0));
//! println!("{zone:?}");
//! # Ok(())
//! # }
//! ```
//!
//! ## API map
//! - `court_calib::core`: linear solver, homography, court template, zones, layout.
//! - `court_calib::session`: calibration wizard, draft engine, stores.
//! - `court_calib::overlay`: scene building and SVG export.

pub use court_calib_core as core;
pub use court_calib_overlay as overlay;
pub use court_calib_session as session;

pub use court_calib_core::{
    classify_zone, compute_homography, CourtMapping, CourtTemplate, CourtZone, Homography,
    HomographyError, LayoutMetrics, INDOOR_FIVB_18X9,
};
pub use court_calib_overlay::{OverlayConfig, OverlayRenderer, Scene};
pub use court_calib_session::{
    AnnotationDraftEngine, CalibrationSession, CourtStore, FileStore, MemoryStore, SessionConfig,
    SessionError,
};

pub mod workflow;
