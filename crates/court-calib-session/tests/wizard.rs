use approx::assert_abs_diff_eq;
use court_calib_session::{
    Annotation, AnnotationRequest, Calibration, CalibrationRequest, CalibrationSession,
    CourtStore, MemoryStore, SessionError, StaticVideo, StoreError, UploadId, WizardEvent,
    WizardStep,
};
use nalgebra::Point2;

/// Counts calls and optionally fails every save.
#[derive(Default)]
struct ProbeStore {
    inner: MemoryStore,
    saves: usize,
    fail: bool,
}

impl CourtStore for ProbeStore {
    fn save_calibration(
        &mut self,
        upload: &UploadId,
        req: &CalibrationRequest,
    ) -> Result<Calibration, StoreError> {
        self.saves += 1;
        if self.fail {
            return Err(StoreError::Unavailable("backend down".into()));
        }
        self.inner.save_calibration(upload, req)
    }

    fn load_calibration(&self, upload: &UploadId) -> Result<Option<Calibration>, StoreError> {
        self.inner.load_calibration(upload)
    }

    fn save_annotation(
        &mut self,
        upload: &UploadId,
        req: &AnnotationRequest,
    ) -> Result<Annotation, StoreError> {
        self.inner.save_annotation(upload, req)
    }

    fn load_annotations(&self, upload: &UploadId) -> Result<Vec<Annotation>, StoreError> {
        self.inner.load_annotations(upload)
    }
}

const CORNERS: [[f64; 2]; 4] = [
    [212.0, 901.0],
    [1702.0, 894.0],
    [1391.0, 402.0],
    [531.0, 410.0],
];

fn video() -> StaticVideo {
    let _ = env_logger::builder().is_test(true).try_init();
    StaticVideo::new(1920, 1080).at(42.5)
}

fn click_all(session: &mut CalibrationSession, pts: &[[f64; 2]]) {
    for &[x, y] in pts {
        assert!(session.click(Point2::new(x, y)).expect("click"));
    }
}

fn session_at_net() -> CalibrationSession {
    let mut session = CalibrationSession::default();
    session.capture(&video()).expect("capture");
    click_all(&mut session, &CORNERS);
    assert_eq!(session.advance().expect("court -> net"), WizardStep::Net);
    session
}

#[test]
fn full_run_saves_and_resets() {
    let mut session = session_at_net();
    click_all(&mut session, &[[380.0, 640.0], [1560.0, 635.0]]);
    assert_eq!(session.advance().expect("net -> confirm"), WizardStep::Confirm);

    let preview = session
        .preview()
        .expect("preview")
        .as_ref()
        .expect("valid preview");
    assert_eq!(preview.grid.len(), 9);
    assert_abs_diff_eq!(preview.grid[0].a, Point2::new(212.0, 901.0), epsilon = 1e-6);

    let mut store = ProbeStore::default();
    let upload = UploadId::new("rally-7");
    let saved = session.save(&mut store, &upload).expect("save");
    assert_eq!(store.saves, 1);
    assert_eq!(saved.frame_t, 42.5);
    assert_eq!(saved.image_size, [1920, 1080]);

    assert_eq!(session.step(), WizardStep::Frame);
    assert!(session.court_points().is_empty());
    assert_eq!(session.saved(), Some(&saved));
    assert_eq!(
        store.load_calibration(&upload).expect("load"),
        Some(saved)
    );
}

#[test]
fn leaving_court_step_early_is_incomplete() {
    let mut session = CalibrationSession::default();
    session.capture(&video()).expect("capture");
    click_all(&mut session, &CORNERS[..3]);
    match session.advance() {
        Err(SessionError::CalibrationIncomplete {
            step: WizardStep::Court,
            expected: 4,
            got: 3,
        }) => {}
        other => panic!("unexpected {other:?}"),
    }
    assert_eq!(session.step(), WizardStep::Court);
}

#[test]
fn degenerate_clicks_never_reach_the_store() {
    let mut session = CalibrationSession::default();
    session.capture(&video()).expect("capture");
    // Three corners on one line.
    click_all(
        &mut session,
        &[[100.0, 100.0], [200.0, 200.0], [300.0, 300.0], [100.0, 400.0]],
    );
    session.advance().expect("court -> net");
    click_all(&mut session, &[[150.0, 250.0], [250.0, 250.0]]);

    assert!(matches!(
        session.advance(),
        Err(SessionError::DegenerateCalibration(_))
    ));
    assert_eq!(session.step(), WizardStep::Confirm);
    assert_eq!(session.court_points().len(), 4);
    assert_eq!(session.net_points().len(), 2);

    let mut store = ProbeStore::default();
    assert!(matches!(
        session.save(&mut store, &UploadId::new("u")),
        Err(SessionError::DegenerateCalibration(_))
    ));
    assert_eq!(store.saves, 0);

    // Back out to fix the clicks.
    assert_eq!(session.back(), WizardStep::Net);
    assert!(session.preview().is_none());
}

#[test]
fn store_failure_keeps_confirm_state() {
    let mut session = session_at_net();
    click_all(&mut session, &[[380.0, 640.0], [1560.0, 635.0]]);
    session.advance().expect("confirm");

    let mut store = ProbeStore {
        fail: true,
        ..ProbeStore::default()
    };
    assert!(matches!(
        session.save(&mut store, &UploadId::new("u")),
        Err(SessionError::PersistenceFailed(StoreError::Unavailable(_)))
    ));
    assert_eq!(store.saves, 1);
    assert_eq!(session.step(), WizardStep::Confirm);
    assert!(session.saved().is_none());

    store.fail = false;
    session.save(&mut store, &UploadId::new("u")).expect("retry");
}

#[test]
fn save_outside_confirm_is_incomplete() {
    let mut session = session_at_net();
    let mut store = ProbeStore::default();
    assert!(matches!(
        session.save(&mut store, &UploadId::new("u")),
        Err(SessionError::CalibrationIncomplete {
            step: WizardStep::Net,
            ..
        })
    ));
    assert_eq!(store.saves, 0);
}

#[test]
fn capture_requires_metadata() {
    let mut session = CalibrationSession::default();
    assert!(matches!(
        session.capture(&StaticVideo::new(0, 0)),
        Err(SessionError::CaptureFailed)
    ));
    assert!(matches!(
        session.advance(),
        Err(SessionError::CalibrationIncomplete {
            step: WizardStep::Frame,
            expected: 1,
            got: 0,
        })
    ));
    assert_eq!(session.step(), WizardStep::Frame);
}

#[test]
fn events_drive_the_wizard() {
    // 1920x1080 shown at half size.
    let video = video().with_element(960.0, 540.0);
    let mut session = CalibrationSession::default();

    session.handle(WizardEvent::Capture, &video).expect("capture");
    for [x, y] in CORNERS {
        session
            .handle(WizardEvent::Click(Point2::new(x / 2.0, y / 2.0)), &video)
            .expect("click");
    }
    assert_abs_diff_eq!(session.court_points()[1], Point2::new(1702.0, 894.0), epsilon = 1e-9);

    assert_eq!(
        session.handle(WizardEvent::Advance, &video).expect("advance"),
        WizardStep::Net
    );
    assert_eq!(
        session.handle(WizardEvent::Back, &video).expect("back"),
        WizardStep::Court
    );
    assert_eq!(
        session.handle(WizardEvent::Reset, &video).expect("reset"),
        WizardStep::Frame
    );
    assert!(session.frame().is_none());
    assert!(matches!(
        session.handle(WizardEvent::Click(Point2::new(10.0, 10.0)), &video),
        Err(SessionError::WrongStep { .. })
    ));
}
