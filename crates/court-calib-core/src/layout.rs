//! Coordinate conversions between the three spaces a video overlay touches:
//! intrinsic video pixels (image space), the `[0,1]` storage space, and the
//! on-screen element box (display space).

use nalgebra::Point2;
use serde::{Deserialize, Serialize};

/// How the video's intrinsic pixel grid sits inside its element box under
/// `object-fit: contain` (uniform scale, centred, letterboxed).
///
/// Display coordinates are relative to the element's top-left corner.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LayoutMetrics {
    pub video_width: f64,
    pub video_height: f64,
    pub display_width: f64,
    pub display_height: f64,
    pub offset_x: f64,
    pub offset_y: f64,
}

impl LayoutMetrics {
    /// Fit `video_size` into `element_size`.
    ///
    /// Returns `None` until the video reports a non-zero intrinsic size, or
    /// when the element box is empty.
    pub fn contain(video_size: [u32; 2], element_size: [f64; 2]) -> Option<Self> {
        let [vw, vh] = video_size;
        let [bw, bh] = element_size;
        if vw == 0 || vh == 0 || !(bw > 0.0) || !(bh > 0.0) || !bw.is_finite() || !bh.is_finite()
        {
            return None;
        }

        let (vw, vh) = (vw as f64, vh as f64);
        let scale = (bw / vw).min(bh / vh);
        let display_width = vw * scale;
        let display_height = vh * scale;

        Some(Self {
            video_width: vw,
            video_height: vh,
            display_width,
            display_height,
            offset_x: (bw - display_width) / 2.0,
            offset_y: (bh - display_height) / 2.0,
        })
    }

    /// Identity layout: the element box is exactly the video size.
    pub fn unscaled(video_size: [u32; 2]) -> Option<Self> {
        Self::contain(video_size, [video_size[0] as f64, video_size[1] as f64])
    }

    #[inline]
    pub fn scale_x(&self) -> f64 {
        self.display_width / self.video_width
    }

    #[inline]
    pub fn scale_y(&self) -> f64 {
        self.display_height / self.video_height
    }

    /// Whether a display-space point lies on the rendered video (letterbox excluded).
    pub fn contains_display(&self, p: Point2<f64>) -> bool {
        let x = p.x - self.offset_x;
        let y = p.y - self.offset_y;
        (0.0..=self.display_width).contains(&x) && (0.0..=self.display_height).contains(&y)
    }

    /// Display → image without bounds checks; used while dragging past the edge.
    pub fn display_to_image(&self, p: Point2<f64>) -> Point2<f64> {
        Point2::new(
            (p.x - self.offset_x) / self.scale_x(),
            (p.y - self.offset_y) / self.scale_y(),
        )
    }

    /// Display → image, `None` for points in the letterbox or outside the element.
    pub fn display_to_image_within(&self, p: Point2<f64>) -> Option<Point2<f64>> {
        self.contains_display(p).then(|| self.display_to_image(p))
    }

    pub fn image_to_display(&self, p: Point2<f64>) -> Point2<f64> {
        Point2::new(
            self.offset_x + p.x * self.scale_x(),
            self.offset_y + p.y * self.scale_y(),
        )
    }

    pub fn image_to_normalized(&self, p: Point2<f64>) -> Point2<f64> {
        Point2::new(p.x / self.video_width, p.y / self.video_height)
    }

    pub fn normalized_to_image(&self, p: Point2<f64>) -> Point2<f64> {
        Point2::new(p.x * self.video_width, p.y * self.video_height)
    }

    pub fn normalized_to_display(&self, p: Point2<f64>) -> Point2<f64> {
        self.image_to_display(self.normalized_to_image(p))
    }

    /// Clamp an image-space point to `[0, w] × [0, h]`.
    pub fn clamp_image(&self, p: Point2<f64>) -> Point2<f64> {
        Point2::new(
            p.x.clamp(0.0, self.video_width),
            p.y.clamp(0.0, self.video_height),
        )
    }
}
