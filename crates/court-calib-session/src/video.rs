//! Read-only view of the video element the overlay is attached to.

use court_calib_core::LayoutMetrics;
use serde::{Deserialize, Serialize};

/// What the engine reads from a playing video. Playback is never controlled
/// from here.
pub trait VideoSource {
    /// Intrinsic `[width, height]`; zero until metadata has loaded.
    fn intrinsic_size(&self) -> [u32; 2];
    /// Current playback position in seconds.
    fn current_time(&self) -> f64;
    /// Size of the element's bounding box in display pixels.
    fn element_size(&self) -> [f64; 2];

    fn layout(&self) -> Option<LayoutMetrics> {
        LayoutMetrics::contain(self.intrinsic_size(), self.element_size())
    }
}

/// Plain-value video state, useful for tests, the CLI and headless callers.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct StaticVideo {
    pub width: u32,
    pub height: u32,
    pub time: f64,
    pub element_width: f64,
    pub element_height: f64,
}

impl StaticVideo {
    /// A video shown at its intrinsic size.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            time: 0.0,
            element_width: width as f64,
            element_height: height as f64,
        }
    }

    pub fn with_element(mut self, width: f64, height: f64) -> Self {
        self.element_width = width;
        self.element_height = height;
        self
    }

    pub fn at(mut self, time: f64) -> Self {
        self.time = time;
        self
    }

    pub fn seek(&mut self, time: f64) {
        self.time = time;
    }
}

impl VideoSource for StaticVideo {
    fn intrinsic_size(&self) -> [u32; 2] {
        [self.width, self.height]
    }

    fn current_time(&self) -> f64 {
        self.time
    }

    fn element_size(&self) -> [f64; 2] {
        [self.element_width, self.element_height]
    }
}

/// Still frame chosen for calibration.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct FrameCapture {
    pub frame_t: f64,
    pub image_size: [u32; 2],
}

impl FrameCapture {
    /// Capture the current frame; `None` until the video reports its size.
    pub fn from_video(video: &dyn VideoSource) -> Option<Self> {
        let [w, h] = video.intrinsic_size();
        if w == 0 || h == 0 {
            return None;
        }
        Some(Self {
            frame_t: video.current_time(),
            image_size: [w, h],
        })
    }
}
