use crate::records::{CalibrationRecordError, ShapeError};
use crate::wizard::WizardStep;
use court_calib_core::HomographyError;

/// Failures of a [`CourtStore`](crate::CourtStore) implementation.
#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error("invalid annotation shape: {0}")]
    InvalidShape(#[from] ShapeError),
    #[error("calibration rejected: {0}")]
    Calibration(#[from] CalibrationRecordError),
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Errors surfaced to the UI by the calibration wizard and the draft engine.
///
/// All of them are recoverable: the caller shows the message and lets the
/// user retry or adjust.
#[derive(thiserror::Error, Debug)]
pub enum SessionError {
    #[error("degenerate calibration: {0}")]
    DegenerateCalibration(#[from] HomographyError),
    #[error("{step} step needs {expected} input(s), has {got}")]
    CalibrationIncomplete {
        step: WizardStep,
        expected: usize,
        got: usize,
    },
    #[error("video frame is not available for capture")]
    CaptureFailed,
    #[error("no upload is open")]
    UploadRequired,
    #[error("persistence failed: {0}")]
    PersistenceFailed(#[from] StoreError),
    #[error("action belongs to the {expected} step, wizard is at {actual}")]
    WrongStep {
        expected: WizardStep,
        actual: WizardStep,
    },
}
