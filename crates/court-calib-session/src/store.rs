//! Persistence collaborator: one calibration and an append-only annotation
//! list per upload.

use crate::error::StoreError;
use crate::records::{Annotation, AnnotationRequest, Calibration, CalibrationRequest, UploadId};
use chrono::Utc;
use std::collections::HashMap;
use std::fs::{self, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Create/read access to calibrations and annotations.
///
/// Stores recompute the homography from the submitted points, so the record
/// returned by [`CourtStore::save_calibration`] is authoritative. A missing
/// calibration loads as `None` and a missing annotation list as empty.
pub trait CourtStore {
    fn save_calibration(
        &mut self,
        upload: &UploadId,
        req: &CalibrationRequest,
    ) -> Result<Calibration, StoreError>;

    fn load_calibration(&self, upload: &UploadId) -> Result<Option<Calibration>, StoreError>;

    fn save_annotation(
        &mut self,
        upload: &UploadId,
        req: &AnnotationRequest,
    ) -> Result<Annotation, StoreError>;

    fn load_annotations(&self, upload: &UploadId) -> Result<Vec<Annotation>, StoreError>;
}

fn new_annotation_id() -> String {
    Uuid::new_v4().to_string()
}

/// In-process store.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    calibrations: HashMap<UploadId, Calibration>,
    annotations: HashMap<UploadId, Vec<Annotation>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop everything owned by an upload.
    pub fn remove_upload(&mut self, upload: &UploadId) {
        self.calibrations.remove(upload);
        self.annotations.remove(upload);
    }
}

impl CourtStore for MemoryStore {
    fn save_calibration(
        &mut self,
        upload: &UploadId,
        req: &CalibrationRequest,
    ) -> Result<Calibration, StoreError> {
        let record = Calibration::from_request(req)?;
        self.calibrations.insert(upload.clone(), record.clone());
        Ok(record)
    }

    fn load_calibration(&self, upload: &UploadId) -> Result<Option<Calibration>, StoreError> {
        Ok(self.calibrations.get(upload).cloned())
    }

    fn save_annotation(
        &mut self,
        upload: &UploadId,
        req: &AnnotationRequest,
    ) -> Result<Annotation, StoreError> {
        req.shape.validate()?;
        let record = Annotation::from_request(new_annotation_id(), req, Utc::now());
        self.annotations
            .entry(upload.clone())
            .or_default()
            .push(record.clone());
        Ok(record)
    }

    fn load_annotations(&self, upload: &UploadId) -> Result<Vec<Annotation>, StoreError> {
        Ok(self.annotations.get(upload).cloned().unwrap_or_default())
    }
}

/// JSON files under a data root:
/// - `calib/<upload>.json`: pretty-printed calibration, overwritten on save,
/// - `ann/<upload>.jsonl`: one annotation per line, append-only.
#[derive(Clone, Debug)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    /// Open (and create if needed) a store rooted at `root`.
    pub fn open(root: impl AsRef<Path>) -> Result<Self, StoreError> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(root.join("calib"))?;
        fs::create_dir_all(root.join("ann"))?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn calibration_path(&self, upload: &UploadId) -> PathBuf {
        self.root
            .join("calib")
            .join(format!("{}.json", upload.storage_key()))
    }

    pub fn annotation_path(&self, upload: &UploadId) -> PathBuf {
        self.root
            .join("ann")
            .join(format!("{}.jsonl", upload.storage_key()))
    }

    /// Delete both files of an upload. Missing files are not an error.
    pub fn remove_upload(&self, upload: &UploadId) -> Result<(), StoreError> {
        for path in [self.calibration_path(upload), self.annotation_path(upload)] {
            match fs::remove_file(&path) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }
}

impl CourtStore for FileStore {
    fn save_calibration(
        &mut self,
        upload: &UploadId,
        req: &CalibrationRequest,
    ) -> Result<Calibration, StoreError> {
        let record = Calibration::from_request(req)?;
        let path = self.calibration_path(upload);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(&record)?;
        fs::write(&path, json)?;
        log::info!("saved calibration for {} to {}", upload, path.display());
        Ok(record)
    }

    fn load_calibration(&self, upload: &UploadId) -> Result<Option<Calibration>, StoreError> {
        let path = self.calibration_path(upload);
        if !path.exists() {
            return Ok(None);
        }
        let raw = fs::read_to_string(path)?;
        Ok(Some(serde_json::from_str(&raw)?))
    }

    fn save_annotation(
        &mut self,
        upload: &UploadId,
        req: &AnnotationRequest,
    ) -> Result<Annotation, StoreError> {
        req.shape.validate()?;
        let record = Annotation::from_request(new_annotation_id(), req, Utc::now());

        let path = self.annotation_path(upload);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut line = serde_json::to_string(&record)?;
        line.push('\n');
        let mut file = OpenOptions::new().create(true).append(true).open(&path)?;
        file.write_all(line.as_bytes())?;

        log::info!("appended annotation {} for {}", record.id, upload);
        Ok(record)
    }

    fn load_annotations(&self, upload: &UploadId) -> Result<Vec<Annotation>, StoreError> {
        let path = self.annotation_path(upload);
        if !path.exists() {
            return Ok(Vec::new());
        }

        let reader = BufReader::new(fs::File::open(&path)?);
        let mut out = Vec::new();
        for (lineno, line) in reader.lines().enumerate() {
            let line = line?;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            match serde_json::from_str::<Annotation>(line) {
                Ok(ann) => out.push(ann),
                Err(e) => log::warn!(
                    "skipping malformed annotation at {}:{}: {}",
                    path.display(),
                    lineno + 1,
                    e
                ),
            }
        }
        Ok(out)
    }
}
