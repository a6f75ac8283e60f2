use crate::config::OverlayConfig;
use crate::scene::{Layer, Primitive, Scene, Style};
use court_calib_core::LayoutMetrics;
use court_calib_session::{
    Annotation, AnnotationDraftEngine, AnnotationShape, Calibration, DraftShape, VideoSource,
};
use nalgebra::{Point2, Vector2};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Why a redraw was requested. Every trigger causes a full redraw.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RenderTrigger {
    LoadedMetadata,
    TimeUpdate,
    Resize,
    AnnotationsChanged,
    CalibrationChanged,
    DraftChanged,
}

/// Inputs of one redraw.
#[derive(Clone, Copy)]
pub struct OverlayInput<'a> {
    pub video: &'a dyn VideoSource,
    pub calibration: Option<&'a Calibration>,
    pub annotations: &'a [Annotation],
    pub draft: Option<&'a DraftShape>,
}

impl<'a> OverlayInput<'a> {
    /// Everything the draft engine currently holds.
    pub fn from_engine(video: &'a dyn VideoSource, engine: &'a AnnotationDraftEngine) -> Self {
        Self {
            video,
            calibration: engine.calibration(),
            annotations: engine.annotations(),
            draft: engine.draft(),
        }
    }
}

const LABEL_OFFSET: f64 = 4.0;

/// Builds the overlay scene from scratch on every call.
#[derive(Clone, Debug, Default)]
pub struct OverlayRenderer {
    config: OverlayConfig,
}

impl OverlayRenderer {
    pub fn new(config: OverlayConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &OverlayConfig {
        &self.config
    }

    /// Draw grid, net, annotations and draft in that order.
    ///
    /// Returns `None` until the video reports its intrinsic size.
    #[cfg_attr(feature = "tracing", instrument(level = "trace", skip(self, input)))]
    pub fn render(&self, input: &OverlayInput<'_>, trigger: RenderTrigger) -> Option<Scene> {
        let layout = input.video.layout()?;
        let [bw, bh] = input.video.element_size();
        let mut scene = Scene::new(bw, bh);

        if let Some(calibration) = input.calibration {
            self.draw_calibration(&mut scene, &layout, calibration);
        }

        let now = input.video.current_time();
        for ann in input.annotations {
            if let Some(window) = self.config.annotation_window_s {
                if (ann.frame_t - now).abs() > window {
                    continue;
                }
            }
            self.draw_annotation(&mut scene, &layout, input.calibration, ann);
        }

        if let Some(draft) = input.draft {
            let (min, max) = draft.bounds();
            scene.push(
                Layer::Draft,
                Primitive::Rect {
                    min: layout.image_to_display(min),
                    max: layout.image_to_display(max),
                    style: Style::dashed(&self.config.draft_color, self.config.line_width),
                },
            );
        }

        log::trace!("{trigger:?}: {} primitive(s)", scene.len());
        Some(scene)
    }

    fn draw_calibration(&self, scene: &mut Scene, layout: &LayoutMetrics, calibration: &Calibration) {
        let to_display = |p: Point2<f64>| calibration_to_display(layout, calibration, p);
        let grid = Style::solid(&self.config.grid_color, self.config.line_width);

        for seg in calibration.mapping().project_reference_lines() {
            scene.push(
                Layer::Grid,
                Primitive::Line {
                    a: to_display(seg.a),
                    b: to_display(seg.b),
                    style: grid.clone(),
                },
            );
        }

        let [a, b] = calibration.net_points;
        scene.push(
            Layer::Net,
            Primitive::Line {
                a: to_display(a),
                b: to_display(b),
                style: Style::solid(&self.config.net_color, self.config.line_width * 1.5),
            },
        );
    }

    fn draw_annotation(
        &self,
        scene: &mut Scene,
        layout: &LayoutMetrics,
        calibration: Option<&Calibration>,
        ann: &Annotation,
    ) {
        // Loaded records are not re-validated by the store.
        if let Err(e) = ann.shape.validate() {
            log::warn!("not drawing annotation {}: {e}", ann.id);
            return;
        }
        let width = self.config.line_width;
        let primitive = match &ann.shape {
            AnnotationShape::Rect(r) => Primitive::Rect {
                min: layout.normalized_to_display(r.min()),
                max: layout.normalized_to_display(r.max()),
                style: Style::solid(&self.config.rect_color, width),
            },
            AnnotationShape::Polygon(_) => Primitive::Polygon {
                pts: ann
                    .shape
                    .vertices()
                    .into_iter()
                    .map(|p| layout.normalized_to_display(p))
                    .collect(),
                style: Style::solid(&self.config.polygon_color, width),
            },
        };
        scene.push(Layer::Annotation, primitive);

        if !self.config.zone_labels {
            return;
        }
        let Some(zone) = calibration.and_then(|c| c.zone_of(&ann.shape)) else {
            return;
        };
        let text = match &ann.label {
            Some(label) => format!("{label} · {zone}"),
            None => zone.to_string(),
        };
        let top_left = ann
            .shape
            .vertices()
            .into_iter()
            .fold(Point2::new(f64::INFINITY, f64::INFINITY), |acc, p| {
                Point2::new(acc.x.min(p.x), acc.y.min(p.y))
            });
        scene.push(
            Layer::Annotation,
            Primitive::Label {
                at: layout.normalized_to_display(top_left) - Vector2::new(0.0, LABEL_OFFSET),
                text,
                style: Style::solid(&self.config.label_color, 1.0),
            },
        );
    }
}

/// Calibration pixels may come from a frame of another resolution than the
/// playing video, so go through normalized space.
fn calibration_to_display(
    layout: &LayoutMetrics,
    calibration: &Calibration,
    p: Point2<f64>,
) -> Point2<f64> {
    let [w, h] = calibration.image_size;
    if w == 0 || h == 0 {
        return layout.image_to_display(p);
    }
    layout.normalized_to_display(Point2::new(p.x / w as f64, p.y / h as f64))
}
