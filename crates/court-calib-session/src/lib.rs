//! Stateful layer on top of `court-calib-core`.
//!
//! - [`CalibrationSession`]: the four-step calibration wizard,
//! - [`AnnotationDraftEngine`]: box drawing over the video and zone feedback,
//! - [`CourtStore`]: persistence of calibrations and annotations, with
//!   [`MemoryStore`] and the JSON [`FileStore`],
//! - [`VideoSource`]: the read-only video the overlay sits on.
//!
//! Everything is synchronous and single-threaded; callers drive the state
//! machines from their own event loop.

mod config;
mod draft;
mod error;
mod records;
mod store;
mod video;
mod wizard;

pub use config::{ConfigError, SessionConfig};
pub use draft::{AnnotationDraftEngine, DraftShape, DrawTool, ToolStore};
pub use error::{SessionError, StoreError};
pub use records::{
    Annotation, AnnotationRequest, AnnotationShape, Calibration, CalibrationRecordError,
    CalibrationRequest, NormPolygon, NormRect, ShapeError, UploadId,
};
pub use store::{CourtStore, FileStore, MemoryStore};
pub use video::{FrameCapture, StaticVideo, VideoSource};
pub use wizard::{CalibrationPreview, CalibrationSession, WizardEvent, WizardStep};
