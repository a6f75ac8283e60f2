//! End-to-end helpers over a [`CourtStore`]: calibrate an upload, project
//! points with its stored matrices, export its overlay.

use crate::overlay::{OverlayConfig, OverlayInput, OverlayRenderer, RenderTrigger};
use crate::session::{
    Annotation, Calibration, CalibrationRequest, CourtStore, StaticVideo, StoreError, UploadId,
};
use court_calib_core::CourtZone;
use nalgebra::Point2;

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Errors produced by the facade helpers.
#[derive(thiserror::Error, Debug)]
pub enum WorkflowError {
    #[error("upload `{0}` has no calibration")]
    NotCalibrated(UploadId),

    #[error("video has no intrinsic size")]
    NoVideoMetadata,

    #[error("invalid {what} `{input}`")]
    Parse { what: &'static str, input: String },

    #[error(transparent)]
    Store(#[from] StoreError),
}

fn parse_pair(input: &str, sep: char, what: &'static str) -> Result<(f64, f64), WorkflowError> {
    let err = || WorkflowError::Parse {
        what,
        input: input.to_string(),
    };
    let (a, b) = input.split_once(sep).ok_or_else(err)?;
    let a: f64 = a.trim().parse().map_err(|_| err())?;
    let b: f64 = b.trim().parse().map_err(|_| err())?;
    if !(a.is_finite() && b.is_finite()) {
        return Err(err());
    }
    Ok((a, b))
}

/// Parse `x,y`.
pub fn parse_point(input: &str) -> Result<Point2<f64>, WorkflowError> {
    let (x, y) = parse_pair(input, ',', "point")?;
    Ok(Point2::new(x, y))
}

/// Parse `WxH` into a positive integer size.
pub fn parse_size(input: &str) -> Result<[u32; 2], WorkflowError> {
    let err = || WorkflowError::Parse {
        what: "size",
        input: input.to_string(),
    };
    let (w, h) = input.split_once(['x', 'X']).ok_or_else(err)?;
    let w: u32 = w.trim().parse().map_err(|_| err())?;
    let h: u32 = h.trim().parse().map_err(|_| err())?;
    if w == 0 || h == 0 {
        return Err(err());
    }
    Ok([w, h])
}

/// Stored calibration, or [`WorkflowError::NotCalibrated`].
pub fn require_calibration(
    store: &dyn CourtStore,
    upload: &UploadId,
) -> Result<Calibration, WorkflowError> {
    store
        .load_calibration(upload)?
        .ok_or_else(|| WorkflowError::NotCalibrated(upload.clone()))
}

/// Compute and persist a calibration from a request file's payload.
#[cfg_attr(feature = "tracing", instrument(level = "info", skip(store, req)))]
pub fn calibrate_upload(
    store: &mut dyn CourtStore,
    upload: &UploadId,
    req: &CalibrationRequest,
) -> Result<Calibration, WorkflowError> {
    Ok(store.save_calibration(upload, req)?)
}

/// Image pixels → court meters with the upload's stored matrix.
pub fn project_to_court(
    store: &dyn CourtStore,
    upload: &UploadId,
    pts: &[Point2<f64>],
) -> Result<Vec<Option<Point2<f64>>>, WorkflowError> {
    Ok(require_calibration(store, upload)?.mapping().to_court_all(pts))
}

/// Court meters → image pixels with the upload's stored inverse.
pub fn project_to_image(
    store: &dyn CourtStore,
    upload: &UploadId,
    pts: &[Point2<f64>],
) -> Result<Vec<Option<Point2<f64>>>, WorkflowError> {
    Ok(require_calibration(store, upload)?.mapping().to_image_all(pts))
}

/// Annotations of an upload paired with their zone, when calibrated.
pub fn annotations_with_zones(
    store: &dyn CourtStore,
    upload: &UploadId,
) -> Result<Vec<(Annotation, Option<CourtZone>)>, WorkflowError> {
    let calibration = store.load_calibration(upload)?;
    Ok(store
        .load_annotations(upload)?
        .into_iter()
        .map(|ann| {
            let zone = calibration.as_ref().and_then(|c| c.zone_of(&ann.shape));
            (ann, zone)
        })
        .collect())
}

/// Render the upload's overlay for a given video state as an SVG document.
#[cfg_attr(feature = "tracing", instrument(level = "info", skip(store, video, config)))]
pub fn render_overlay_svg(
    store: &dyn CourtStore,
    upload: &UploadId,
    video: &StaticVideo,
    config: OverlayConfig,
) -> Result<String, WorkflowError> {
    let calibration = store.load_calibration(upload)?;
    let annotations = store.load_annotations(upload)?;
    let input = OverlayInput {
        video,
        calibration: calibration.as_ref(),
        annotations: &annotations,
        draft: None,
    };
    let scene = OverlayRenderer::new(config)
        .render(&input, RenderTrigger::LoadedMetadata)
        .ok_or(WorkflowError::NoVideoMetadata)?;
    log::info!("overlay for {upload}: {} primitive(s)", scene.len());
    Ok(scene.to_svg())
}
