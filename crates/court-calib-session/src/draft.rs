//! Pointer-driven box drawing over the playing video.
//!
//! The engine owns the open upload's annotation list and its calibration, and
//! turns one pointer-down / move / up sequence into a persisted rectangle.
//! The selected tool lives in a [`ToolStore`] the caller owns and passes in.

use crate::error::{SessionError, StoreError};
use crate::records::{Annotation, AnnotationRequest, AnnotationShape, Calibration, UploadId};
use crate::store::CourtStore;
use crate::video::VideoSource;
use crate::SessionConfig;
use court_calib_core::{CourtZone, LayoutMetrics};
use nalgebra::Point2;
use serde::{Deserialize, Serialize};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Drawing tools. Only `Box` creates drafts; `Lasso` is selectable but draws
/// nothing yet.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DrawTool {
    #[default]
    Select,
    Box,
    Lasso,
}

/// Tool selection plus the metadata stamped on new annotations.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ToolStore {
    tool: DrawTool,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub jersey: Option<u32>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl ToolStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &SessionConfig) -> Self {
        Self {
            label: config.default_label.clone(),
            ..Self::default()
        }
    }

    pub fn tool(&self) -> DrawTool {
        self.tool
    }

    /// Switch tools. Returns `true` if the selection changed.
    pub fn select(&mut self, tool: DrawTool) -> bool {
        let changed = self.tool != tool;
        self.tool = tool;
        changed
    }
}

/// Box being dragged, in image pixels.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct DraftShape {
    pub start: Point2<f64>,
    pub current: Point2<f64>,
}

impl DraftShape {
    pub fn at(p: Point2<f64>) -> Self {
        Self { start: p, current: p }
    }

    /// Top-left and bottom-right corners.
    pub fn bounds(&self) -> (Point2<f64>, Point2<f64>) {
        (
            Point2::new(self.start.x.min(self.current.x), self.start.y.min(self.current.y)),
            Point2::new(self.start.x.max(self.current.x), self.start.y.max(self.current.y)),
        )
    }

    pub fn center(&self) -> Point2<f64> {
        nalgebra::center(&self.start, &self.current)
    }

    pub fn width(&self) -> f64 {
        (self.current.x - self.start.x).abs()
    }

    pub fn height(&self) -> f64 {
        (self.current.y - self.start.y).abs()
    }

    /// Both corners clamped to the video frame.
    pub fn clamped(&self, layout: &LayoutMetrics) -> Self {
        Self {
            start: layout.clamp_image(self.start),
            current: layout.clamp_image(self.current),
        }
    }
}

/// Annotation drafting state for one open upload.
#[derive(Debug)]
pub struct AnnotationDraftEngine {
    min_box_px: f64,
    upload: Option<UploadId>,
    calibration: Option<Calibration>,
    annotations: Vec<Annotation>,
    draft: Option<DraftShape>,
    live_zone: Option<CourtZone>,
}

impl Default for AnnotationDraftEngine {
    fn default() -> Self {
        Self::new(&SessionConfig::default())
    }
}

impl AnnotationDraftEngine {
    pub fn new(config: &SessionConfig) -> Self {
        Self {
            min_box_px: config.min_box_px,
            upload: None,
            calibration: None,
            annotations: Vec::new(),
            draft: None,
            live_zone: None,
        }
    }

    pub fn upload(&self) -> Option<&UploadId> {
        self.upload.as_ref()
    }

    pub fn calibration(&self) -> Option<&Calibration> {
        self.calibration.as_ref()
    }

    pub fn annotations(&self) -> &[Annotation] {
        &self.annotations
    }

    pub fn draft(&self) -> Option<&DraftShape> {
        self.draft.as_ref()
    }

    /// Zone under the draft centre from the last pointer move.
    pub fn live_zone(&self) -> Option<CourtZone> {
        self.live_zone
    }

    /// Load an upload's annotations and calibration. Any open draft is
    /// dropped; on error the previous upload stays closed.
    pub fn open_upload(
        &mut self,
        store: &dyn CourtStore,
        upload: UploadId,
    ) -> Result<(), SessionError> {
        self.close_upload();
        let annotations = store.load_annotations(&upload)?;
        let calibration = store.load_calibration(&upload)?;
        log::debug!(
            "opened upload {upload}: {} annotation(s), calibrated={}",
            annotations.len(),
            calibration.is_some()
        );
        self.annotations = annotations;
        self.set_calibration(calibration);
        self.upload = Some(upload);
        Ok(())
    }

    pub fn close_upload(&mut self) {
        self.upload = None;
        self.annotations.clear();
        self.set_calibration(None);
        self.discard();
    }

    /// Replace the active calibration, e.g. right after the wizard saved.
    pub fn set_calibration(&mut self, calibration: Option<Calibration>) {
        self.calibration = calibration;
        self.live_zone = None;
    }

    /// Start a draft. Returns `true` if one was opened.
    pub fn on_pointer_down(
        &mut self,
        tools: &ToolStore,
        layout: &LayoutMetrics,
        display_pt: Point2<f64>,
    ) -> Result<bool, SessionError> {
        if self.upload.is_none() {
            return Err(SessionError::UploadRequired);
        }
        if tools.tool() != DrawTool::Box {
            return Ok(false);
        }
        let Some(p) = layout.display_to_image_within(display_pt) else {
            return Ok(false);
        };
        self.draft = Some(DraftShape::at(p));
        self.live_zone = None;
        Ok(true)
    }

    /// Track the pointer while dragging. Points past the frame edge are kept
    /// and clamped on release.
    ///
    /// The zone is looked up through normalized coordinates, so it agrees
    /// with [`Calibration::zone_of`] on the saved box even when the video
    /// plays at another resolution than the calibrated frame.
    pub fn on_pointer_move(
        &mut self,
        layout: &LayoutMetrics,
        display_pt: Point2<f64>,
    ) -> Option<CourtZone> {
        let draft = self.draft.as_mut()?;
        draft.current = layout.display_to_image(display_pt);
        let center = layout.image_to_normalized(draft.clamped(layout).center());
        self.live_zone = self
            .calibration
            .as_ref()
            .and_then(|c| c.zone_at_normalized(center));
        self.live_zone
    }

    /// Finish the drag and persist the box.
    ///
    /// Returns `Ok(None)` when there was no draft or it was smaller than the
    /// minimum box size. The draft is gone afterwards whatever the outcome.
    #[cfg_attr(feature = "tracing", instrument(level = "debug", skip_all))]
    pub fn on_pointer_up(
        &mut self,
        store: &mut dyn CourtStore,
        tools: &ToolStore,
        video: &dyn VideoSource,
    ) -> Result<Option<Annotation>, SessionError> {
        let Some(draft) = self.draft.take() else {
            return Ok(None);
        };
        self.live_zone = None;
        let Some(upload) = self.upload.clone() else {
            return Err(SessionError::UploadRequired);
        };
        let Some(layout) = video.layout() else {
            log::debug!("draft dropped: video has no metadata");
            return Ok(None);
        };

        let draft = draft.clamped(&layout);
        if draft.width() < self.min_box_px || draft.height() < self.min_box_px {
            log::debug!(
                "draft {:.1}x{:.1}px below {}px, discarded",
                draft.width(),
                draft.height(),
                self.min_box_px
            );
            return Ok(None);
        }

        let (min, max) = draft.bounds();
        let min = layout.image_to_normalized(min);
        let max = layout.image_to_normalized(max);
        let shape = AnnotationShape::rect(min.x, min.y, max.x - min.x, max.y - min.y)
            .map_err(StoreError::from)?;

        let req = AnnotationRequest {
            frame_t: video.current_time(),
            shape,
            jersey: tools.jersey,
            label: tools.label.clone(),
            notes: tools.notes.clone(),
        };
        let record = store.save_annotation(&upload, &req)?;
        self.annotations.push(record.clone());
        Ok(Some(record))
    }

    /// Pointer left the element mid-drag: finalize like a release.
    pub fn on_pointer_leave(
        &mut self,
        store: &mut dyn CourtStore,
        tools: &ToolStore,
        video: &dyn VideoSource,
    ) -> Result<Option<Annotation>, SessionError> {
        self.on_pointer_up(store, tools, video)
    }

    /// Drop the open draft without saving.
    pub fn discard(&mut self) {
        self.draft = None;
        self.live_zone = None;
    }

    /// Zone label for a stored annotation, when calibrated.
    pub fn zone_of(&self, annotation: &Annotation) -> Option<CourtZone> {
        self.calibration.as_ref()?.zone_of(&annotation.shape)
    }
}
