//! Calibration wizard: capture a still frame, click the four court corners and
//! the two net posts, confirm the projected grid, save.
//!
//! The wizard is a plain state machine. It never draws anything; callers read
//! [`CalibrationSession::preview`] to render the confirmation overlay.

use crate::error::SessionError;
use crate::records::{Calibration, CalibrationRequest, UploadId};
use crate::store::CourtStore;
use crate::video::{FrameCapture, VideoSource};
use crate::SessionConfig;
use court_calib_core::{CourtMapping, CourtTemplate, HomographyError, LayoutMetrics, Segment};
use nalgebra::Point2;
use std::fmt;

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Wizard steps, in order.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum WizardStep {
    #[default]
    Frame,
    Court,
    Net,
    Confirm,
}

impl WizardStep {
    pub fn next(self) -> Option<Self> {
        match self {
            Self::Frame => Some(Self::Court),
            Self::Court => Some(Self::Net),
            Self::Net => Some(Self::Confirm),
            Self::Confirm => None,
        }
    }

    pub fn back(self) -> Option<Self> {
        match self {
            Self::Frame => None,
            Self::Court => Some(Self::Frame),
            Self::Net => Some(Self::Court),
            Self::Confirm => Some(Self::Net),
        }
    }

    /// Inputs the step needs before it can advance: one captured frame, four
    /// corners or two net points.
    pub fn required_points(self) -> usize {
        match self {
            Self::Frame => 1,
            Self::Court => 4,
            Self::Net => 2,
            Self::Confirm => 0,
        }
    }
}

impl fmt::Display for WizardStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Frame => "frame",
            Self::Court => "court",
            Self::Net => "net",
            Self::Confirm => "confirm",
        };
        f.write_str(s)
    }
}

/// UI input routed through [`CalibrationSession::handle`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum WizardEvent {
    Capture,
    /// Click in display coordinates of the video element.
    Click(Point2<f64>),
    Back,
    Advance,
    Reset,
}

/// What the confirmation step shows: both matrices, the template lines in
/// image space and the clicked net line.
#[derive(Clone, Debug, PartialEq)]
pub struct CalibrationPreview {
    pub mapping: CourtMapping,
    pub grid: Vec<Segment>,
    pub net_line: Segment,
}

impl CalibrationPreview {
    fn compute(
        court_points: &[Point2<f64>; 4],
        net_points: &[Point2<f64>; 2],
        template: CourtTemplate,
    ) -> Result<Self, HomographyError> {
        let mapping = CourtMapping::from_corners(court_points, template)?;
        Ok(Self {
            grid: mapping.project_reference_lines(),
            net_line: Segment::new(net_points[0], net_points[1]),
            mapping,
        })
    }
}

/// One run of the calibration wizard.
#[derive(Clone, Debug, Default)]
pub struct CalibrationSession {
    step: WizardStep,
    template: CourtTemplate,
    capture: Option<FrameCapture>,
    court_points: Vec<Point2<f64>>,
    net_points: Vec<Point2<f64>>,
    preview: Option<Result<CalibrationPreview, HomographyError>>,
    saved: Option<Calibration>,
}

impl CalibrationSession {
    pub fn new(template: CourtTemplate) -> Self {
        Self {
            template,
            ..Self::default()
        }
    }

    /// Session for the template named in the config; unknown ids fall back
    /// to the default court.
    pub fn from_config(config: &SessionConfig) -> Self {
        let template = match CourtTemplate::by_id(&config.court_template) {
            Some(t) => *t,
            None => {
                log::warn!(
                    "unknown court template `{}`, using {}",
                    config.court_template,
                    CourtTemplate::default().id
                );
                CourtTemplate::default()
            }
        };
        Self::new(template)
    }

    pub fn step(&self) -> WizardStep {
        self.step
    }

    pub fn template(&self) -> CourtTemplate {
        self.template
    }

    pub fn frame(&self) -> Option<&FrameCapture> {
        self.capture.as_ref()
    }

    pub fn court_points(&self) -> &[Point2<f64>] {
        &self.court_points
    }

    pub fn net_points(&self) -> &[Point2<f64>] {
        &self.net_points
    }

    /// Confirmation preview. `Some(Err(_))` when the clicks were degenerate.
    pub fn preview(&self) -> Option<&Result<CalibrationPreview, HomographyError>> {
        self.preview.as_ref()
    }

    /// Last record returned by the store.
    pub fn saved(&self) -> Option<&Calibration> {
        self.saved.as_ref()
    }

    fn ensure_step(&self, expected: WizardStep) -> Result<(), SessionError> {
        if self.step == expected {
            Ok(())
        } else {
            Err(SessionError::WrongStep {
                expected,
                actual: self.step,
            })
        }
    }

    fn inputs(&self, step: WizardStep) -> usize {
        match step {
            WizardStep::Frame => usize::from(self.capture.is_some()),
            WizardStep::Court => self.court_points.len(),
            WizardStep::Net => self.net_points.len(),
            WizardStep::Confirm => 0,
        }
    }

    fn incomplete(&self) -> SessionError {
        SessionError::CalibrationIncomplete {
            step: self.step,
            expected: self.step.required_points(),
            got: self.inputs(self.step),
        }
    }

    /// Grab the current video frame and move on to corner clicks.
    pub fn capture(&mut self, video: &dyn VideoSource) -> Result<(), SessionError> {
        self.ensure_step(WizardStep::Frame)?;
        let capture = FrameCapture::from_video(video).ok_or(SessionError::CaptureFailed)?;
        log::debug!(
            "captured frame t={:.3}s size={}x{}",
            capture.frame_t,
            capture.image_size[0],
            capture.image_size[1]
        );
        self.capture = Some(capture);
        self.step = WizardStep::Court;
        Ok(())
    }

    /// Record a click in image coordinates. Returns `false` when the step
    /// already has all its points.
    pub fn click(&mut self, image_pt: Point2<f64>) -> Result<bool, SessionError> {
        let (points, cap) = match self.step {
            WizardStep::Court => (&mut self.court_points, 4),
            WizardStep::Net => (&mut self.net_points, 2),
            actual => {
                return Err(SessionError::WrongStep {
                    expected: WizardStep::Court,
                    actual,
                })
            }
        };
        if points.len() >= cap || !(image_pt.x.is_finite() && image_pt.y.is_finite()) {
            return Ok(false);
        }
        points.push(image_pt);
        Ok(true)
    }

    /// Record a click given in display coordinates. Clicks on the letterbox
    /// are ignored.
    pub fn click_display(
        &mut self,
        display_pt: Point2<f64>,
        layout: &LayoutMetrics,
    ) -> Result<bool, SessionError> {
        if !matches!(self.step, WizardStep::Court | WizardStep::Net) {
            return Err(SessionError::WrongStep {
                expected: WizardStep::Court,
                actual: self.step,
            });
        }
        match layout.display_to_image_within(display_pt) {
            Some(p) => self.click(p),
            None => Ok(false),
        }
    }

    /// Undo the last click, or step back when the current step has none.
    pub fn back(&mut self) -> WizardStep {
        match self.step {
            WizardStep::Frame => {}
            WizardStep::Court => {
                if self.court_points.pop().is_none() {
                    self.step = WizardStep::Frame;
                }
            }
            WizardStep::Net => {
                if self.net_points.pop().is_none() {
                    self.step = WizardStep::Court;
                }
            }
            WizardStep::Confirm => {
                self.preview = None;
                self.step = WizardStep::Net;
            }
        }
        self.step
    }

    /// Move to the next step once the current one is complete. Entering
    /// `Confirm` computes the preview; a degenerate click set leaves the
    /// wizard in `Confirm` with every point kept, so the user can go back.
    #[cfg_attr(feature = "tracing", instrument(level = "debug", skip(self), fields(step = %self.step)))]
    pub fn advance(&mut self) -> Result<WizardStep, SessionError> {
        match self.step {
            WizardStep::Frame => {
                if self.capture.is_none() {
                    return Err(self.incomplete());
                }
                self.step = WizardStep::Court;
            }
            WizardStep::Court | WizardStep::Net => {
                if self.inputs(self.step) < self.step.required_points() {
                    return Err(self.incomplete());
                }
                if self.step == WizardStep::Court {
                    self.step = WizardStep::Net;
                } else {
                    self.step = WizardStep::Confirm;
                    return self.enter_confirm();
                }
            }
            WizardStep::Confirm => {}
        }
        Ok(self.step)
    }

    fn enter_confirm(&mut self) -> Result<WizardStep, SessionError> {
        let (court, net) = self.click_arrays().ok_or_else(|| self.incomplete())?;
        let preview = CalibrationPreview::compute(&court, &net, self.template);
        let result = match &preview {
            Ok(p) => {
                log::debug!("preview ready with {} grid segments", p.grid.len());
                Ok(self.step)
            }
            Err(e) => {
                log::warn!("degenerate calibration clicks: {e}");
                Err(SessionError::DegenerateCalibration(e.clone()))
            }
        };
        self.preview = Some(preview);
        result
    }

    fn click_arrays(&self) -> Option<([Point2<f64>; 4], [Point2<f64>; 2])> {
        let court: [Point2<f64>; 4] = self.court_points.as_slice().try_into().ok()?;
        let net: [Point2<f64>; 2] = self.net_points.as_slice().try_into().ok()?;
        Some((court, net))
    }

    /// Payload for the store, available once every input is collected.
    pub fn request(&self) -> Option<CalibrationRequest> {
        let capture = self.capture?;
        let (image_points, net_points) = self.click_arrays()?;
        Some(CalibrationRequest {
            frame_t: capture.frame_t,
            image_size: capture.image_size,
            image_points,
            court_template: self.template.id.to_string(),
            net_points,
        })
    }

    /// Persist the confirmed calibration. On success the wizard resets and
    /// keeps the stored record; on any error it stays in `Confirm`.
    pub fn save(
        &mut self,
        store: &mut dyn CourtStore,
        upload: &UploadId,
    ) -> Result<Calibration, SessionError> {
        if self.step != WizardStep::Confirm {
            return Err(self.incomplete());
        }
        match &self.preview {
            Some(Ok(_)) => {}
            Some(Err(e)) => return Err(SessionError::DegenerateCalibration(e.clone())),
            None => return Err(self.incomplete()),
        }
        let req = self.request().ok_or_else(|| self.incomplete())?;

        let record = store.save_calibration(upload, &req)?;
        log::info!("calibration saved for {upload}");
        self.reset();
        self.saved = Some(record.clone());
        Ok(record)
    }

    /// Drop every unsaved input and return to `Frame`.
    pub fn reset(&mut self) {
        self.step = WizardStep::Frame;
        self.capture = None;
        self.court_points.clear();
        self.net_points.clear();
        self.preview = None;
    }

    /// Dispatch a UI event. Clicks are converted through the video's current
    /// layout.
    pub fn handle(
        &mut self,
        event: WizardEvent,
        video: &dyn VideoSource,
    ) -> Result<WizardStep, SessionError> {
        match event {
            WizardEvent::Capture => self.capture(video)?,
            WizardEvent::Click(p) => match video.layout() {
                Some(layout) => {
                    self.click_display(p, &layout)?;
                }
                None => log::debug!("click ignored: video has no metadata"),
            },
            WizardEvent::Back => {
                self.back();
            }
            WizardEvent::Advance => {
                self.advance()?;
            }
            WizardEvent::Reset => self.reset(),
        }
        Ok(self.step)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::video::StaticVideo;

    #[test]
    fn transition_table() {
        let mut s = WizardStep::Frame;
        let mut order = vec![s];
        while let Some(n) = s.next() {
            order.push(n);
            s = n;
        }
        assert_eq!(
            order,
            [
                WizardStep::Frame,
                WizardStep::Court,
                WizardStep::Net,
                WizardStep::Confirm
            ]
        );
        assert_eq!(WizardStep::Confirm.back(), Some(WizardStep::Net));
        assert_eq!(WizardStep::Frame.back(), None);
    }

    #[test]
    fn extra_clicks_are_ignored() {
        let mut session = CalibrationSession::default();
        session.capture(&StaticVideo::new(640, 360)).expect("capture");
        for i in 0..4 {
            assert!(session.click(Point2::new(10.0 * i as f64, 5.0)).expect("click"));
        }
        assert!(!session.click(Point2::new(1.0, 1.0)).expect("fifth"));
        assert_eq!(session.court_points().len(), 4);
    }

    #[test]
    fn click_before_capture_is_wrong_step() {
        let mut session = CalibrationSession::default();
        assert!(matches!(
            session.click(Point2::new(1.0, 1.0)),
            Err(SessionError::WrongStep {
                expected: WizardStep::Court,
                actual: WizardStep::Frame
            })
        ));
    }

    #[test]
    fn back_pops_then_leaves_step() {
        let mut session = CalibrationSession::default();
        session.capture(&StaticVideo::new(640, 360)).expect("capture");
        session.click(Point2::new(1.0, 1.0)).expect("click");
        assert_eq!(session.back(), WizardStep::Court);
        assert!(session.court_points().is_empty());
        assert_eq!(session.back(), WizardStep::Frame);
        assert_eq!(session.back(), WizardStep::Frame);
        assert!(session.frame().is_some());
    }

    #[test]
    fn letterbox_clicks_are_dropped() {
        let mut session = CalibrationSession::default();
        session.capture(&StaticVideo::new(1280, 720)).expect("capture");
        // 1280x720 in a 1280x1000 box: 140 px bars above and below.
        let layout = LayoutMetrics::contain([1280, 720], [1280.0, 1000.0]).expect("layout");
        assert!(!session
            .click_display(Point2::new(100.0, 50.0), &layout)
            .expect("click"));
        assert!(session
            .click_display(Point2::new(100.0, 200.0), &layout)
            .expect("click"));
        let p = session.court_points()[0];
        assert!((p.y - 60.0).abs() < 1e-9);
    }
}
