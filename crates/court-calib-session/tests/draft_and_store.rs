use approx::assert_abs_diff_eq;
use court_calib_core::LayoutMetrics;
use court_calib_session::{
    Annotation, AnnotationDraftEngine, AnnotationRequest, AnnotationShape, Calibration,
    CalibrationRequest, CourtStore, DrawTool, FileStore, MemoryStore, SessionConfig,
    SessionError, StaticVideo, StoreError, ToolStore, UploadId,
};
use nalgebra::Point2;

struct FailingStore;

impl CourtStore for FailingStore {
    fn save_calibration(
        &mut self,
        _: &UploadId,
        _: &CalibrationRequest,
    ) -> Result<Calibration, StoreError> {
        Err(StoreError::Unavailable("offline".into()))
    }

    fn load_calibration(&self, _: &UploadId) -> Result<Option<Calibration>, StoreError> {
        Ok(None)
    }

    fn save_annotation(
        &mut self,
        _: &UploadId,
        _: &AnnotationRequest,
    ) -> Result<Annotation, StoreError> {
        Err(StoreError::Unavailable("offline".into()))
    }

    fn load_annotations(&self, _: &UploadId) -> Result<Vec<Annotation>, StoreError> {
        Ok(Vec::new())
    }
}

fn init_logs() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn box_tools() -> ToolStore {
    let mut tools = ToolStore::new();
    tools.select(DrawTool::Box);
    tools.label = Some("blocker".into());
    tools.jersey = Some(12);
    tools
}

fn calibration_request() -> CalibrationRequest {
    CalibrationRequest {
        frame_t: 3.0,
        image_size: [1280, 720],
        image_points: [
            Point2::new(180.0, 620.0),
            Point2::new(1100.0, 630.0),
            Point2::new(900.0, 300.0),
            Point2::new(360.0, 295.0),
        ],
        court_template: "indoor_fivb_18x9".into(),
        net_points: [Point2::new(270.0, 450.0), Point2::new(1000.0, 455.0)],
    }
}

fn open(store: &dyn CourtStore) -> AnnotationDraftEngine {
    init_logs();
    let mut engine = AnnotationDraftEngine::new(&SessionConfig::default());
    engine
        .open_upload(store, UploadId::new("set-1"))
        .expect("open upload");
    engine
}

#[test]
fn tiny_drag_is_discarded() {
    let mut store = MemoryStore::new();
    let mut engine = open(&store);
    let tools = box_tools();
    let video = StaticVideo::new(1280, 720);
    let layout = LayoutMetrics::unscaled([1280, 720]).expect("layout");

    assert!(engine
        .on_pointer_down(&tools, &layout, Point2::new(100.0, 100.0))
        .expect("down"));
    engine.on_pointer_move(&layout, Point2::new(102.0, 101.0));
    let out = engine.on_pointer_up(&mut store, &tools, &video).expect("up");

    assert!(out.is_none());
    assert!(engine.draft().is_none());
    assert!(engine.annotations().is_empty());
    assert!(store
        .load_annotations(&UploadId::new("set-1"))
        .expect("load")
        .is_empty());
}

#[test]
fn drag_past_the_edge_is_clamped_and_normalized() {
    let mut store = MemoryStore::new();
    let mut engine = open(&store);
    let tools = box_tools();
    // 1280x720 in a 1280x1000 element: 140 px letterbox top and bottom.
    let video = StaticVideo::new(1280, 720)
        .with_element(1280.0, 1000.0)
        .at(17.25);
    let layout = video_layout(&video);

    assert!(engine
        .on_pointer_down(&tools, &layout, Point2::new(1180.0, 640.0))
        .expect("down"));
    engine.on_pointer_move(&layout, Point2::new(1400.0, 990.0));
    let ann = engine
        .on_pointer_up(&mut store, &tools, &video)
        .expect("up")
        .expect("annotation");

    let AnnotationShape::Rect(r) = ann.shape else {
        panic!("expected a rect");
    };
    assert_abs_diff_eq!(r.x, 1180.0 / 1280.0, epsilon = 1e-12);
    assert_abs_diff_eq!(r.y, 500.0 / 720.0, epsilon = 1e-12);
    assert_abs_diff_eq!(r.x + r.w, 1.0, epsilon = 1e-12);
    assert_abs_diff_eq!(r.y + r.h, 1.0, epsilon = 1e-12);
    assert_eq!(ann.frame_t, 17.25);
    assert_eq!(ann.label.as_deref(), Some("blocker"));
    assert_eq!(ann.jersey, Some(12));
    assert_eq!(engine.annotations(), &[ann]);
}

fn video_layout(video: &StaticVideo) -> LayoutMetrics {
    use court_calib_session::VideoSource;
    video.layout().expect("layout")
}

#[test]
fn non_box_tools_and_letterbox_do_not_start_drafts() {
    let store = MemoryStore::new();
    let mut engine = open(&store);
    let layout = LayoutMetrics::contain([1280, 720], [1280.0, 1000.0]).expect("layout");

    let select = ToolStore::new();
    assert!(!engine
        .on_pointer_down(&select, &layout, Point2::new(500.0, 500.0))
        .expect("select tool"));

    let mut lasso = ToolStore::new();
    lasso.select(DrawTool::Lasso);
    assert!(!engine
        .on_pointer_down(&lasso, &layout, Point2::new(500.0, 500.0))
        .expect("lasso tool"));

    assert!(!engine
        .on_pointer_down(&box_tools(), &layout, Point2::new(500.0, 20.0))
        .expect("letterbox"));
    assert!(engine.draft().is_none());
}

#[test]
fn failed_save_drops_the_draft() {
    let mut store = FailingStore;
    let mut engine = open(&store);
    let tools = box_tools();
    let video = StaticVideo::new(640, 360);
    let layout = LayoutMetrics::unscaled([640, 360]).expect("layout");

    engine
        .on_pointer_down(&tools, &layout, Point2::new(10.0, 10.0))
        .expect("down");
    engine.on_pointer_move(&layout, Point2::new(200.0, 150.0));
    assert!(matches!(
        engine.on_pointer_leave(&mut store, &tools, &video),
        Err(SessionError::PersistenceFailed(_))
    ));
    assert!(engine.draft().is_none());
    assert!(engine.annotations().is_empty());
}

#[test]
fn live_zone_follows_the_draft_center() {
    let mut store = MemoryStore::new();
    let upload = UploadId::new("set-1");
    let calibration = store
        .save_calibration(&upload, &calibration_request())
        .expect("calibrate");
    let mut engine = open(&store);
    assert!(engine.calibration().is_some());

    let layout = LayoutMetrics::unscaled([1280, 720]).expect("layout");
    let mapping = calibration.mapping();
    let target = mapping.to_image(Point2::new(15.0, 7.0)).expect("finite");

    engine
        .on_pointer_down(&box_tools(), &layout, target - nalgebra::Vector2::new(20.0, 20.0))
        .expect("down");
    let zone = engine
        .on_pointer_move(&layout, target + nalgebra::Vector2::new(20.0, 20.0))
        .expect("zone");
    assert_eq!(zone.to_string(), "Far Right");
    assert_eq!(engine.live_zone(), Some(zone));

    engine.discard();
    assert!(engine.live_zone().is_none());
    assert!(engine.on_pointer_move(&layout, target).is_none());
}

#[test]
fn live_zone_matches_saved_zone_at_another_resolution() {
    // Calibrated on a 1280x720 frame, annotated while playing at 1920x1080.
    let mut store = MemoryStore::new();
    let upload = UploadId::new("set-1");
    let calibration = store
        .save_calibration(&upload, &calibration_request())
        .expect("calibrate");
    let mut engine = open(&store);
    let tools = box_tools();
    let video = StaticVideo::new(1920, 1080).at(5.0);
    let layout = video_layout(&video);

    let at_720 = calibration
        .mapping()
        .to_image(Point2::new(15.0, 7.0))
        .expect("finite");
    let target = Point2::new(at_720.x * 1.5, at_720.y * 1.5);
    let offset = nalgebra::Vector2::new(30.0, 30.0);

    engine
        .on_pointer_down(&tools, &layout, target - offset)
        .expect("down");
    let live = engine.on_pointer_move(&layout, target + offset);
    let ann = engine
        .on_pointer_up(&mut store, &tools, &video)
        .expect("up")
        .expect("annotation");

    assert_eq!(live.map(|z| z.to_string()).as_deref(), Some("Far Right"));
    assert_eq!(live, engine.zone_of(&ann));
}

#[test]
fn file_store_round_trip_through_engine() {
    init_logs();
    let dir = tempfile::tempdir().expect("tempdir");
    let mut store = FileStore::open(dir.path()).expect("store");
    let upload = UploadId::new("set-1");
    store
        .save_calibration(&upload, &calibration_request())
        .expect("calibrate");

    let mut engine = open(&store);
    let tools = box_tools();
    let video = StaticVideo::new(1280, 720).at(8.0);
    let layout = LayoutMetrics::unscaled([1280, 720]).expect("layout");
    engine
        .on_pointer_down(&tools, &layout, Point2::new(600.0, 500.0))
        .expect("down");
    engine.on_pointer_move(&layout, Point2::new(680.0, 600.0));
    let ann = engine
        .on_pointer_up(&mut store, &tools, &video)
        .expect("up")
        .expect("annotation");
    assert!(engine.zone_of(&ann).is_some());

    let reopened = FileStore::open(dir.path()).expect("reopen");
    let mut fresh = AnnotationDraftEngine::default();
    fresh
        .open_upload(&reopened, upload.clone())
        .expect("reopen upload");
    assert_eq!(fresh.annotations(), &[ann]);
    assert_eq!(
        fresh.calibration(),
        reopened.load_calibration(&upload).expect("load").as_ref()
    );

    fresh.close_upload();
    assert!(fresh.upload().is_none());
    assert!(fresh.annotations().is_empty());
}
