//! Geometry core for planar court calibration.
//!
//! This crate is purely numeric. It knows nothing about video elements,
//! canvases or persistence:
//! - [`linalg`]: Gauss-Jordan elimination and 3×3 inversion with an explicit
//!   pivot threshold,
//! - [`compute_homography`]: exact 4-point DLT with degeneracy checks,
//! - [`CourtMapping`]: image ↔ court projection and zone lookup,
//! - [`LayoutMetrics`]: image / normalized / display conversions for a
//!   letterboxed video element.
//!
//! ```
//! use court_calib_core::{CourtMapping, INDOOR_FIVB_18X9};
//! use nalgebra::Point2;
//!
//! let clicks = [
//!     Point2::new(180.0, 620.0),
//!     Point2::new(1100.0, 630.0),
//!     Point2::new(900.0, 300.0),
//!     Point2::new(360.0, 295.0),
//! ];
//! let mapping = CourtMapping::from_corners(&clicks, INDOOR_FIVB_18X9).unwrap();
//! let zone = mapping.zone_at(Point2::new(640.0, 560.0)).unwrap();
//! println!("{zone}");
//! ```

mod court;
mod homography;
mod layout;
pub mod linalg;
mod mapping;

pub use court::{
    classify_zone, CourtTemplate, CourtZone, Depth, Lane, Segment, INDOOR_FIVB_18X9,
};
pub use homography::{compute_homography, Homography, HomographyError, PointSet, INFINITY_EPS};
pub use layout::LayoutMetrics;
pub use linalg::{invert3x3, solve, solve_checked, PIVOT_EPS};
pub use mapping::CourtMapping;
