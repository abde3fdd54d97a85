//! Resume upload with progress and cancellation.
//!
//! # Responsibility
//! - Validate and stream a PDF into blob storage on a worker thread.
//! - Report progress as a stream of events ending in exactly one terminal
//!   event.
//! - Point `settings/resume` at the uploaded object on success.
//!
//! # Invariants
//! - Progress values never decrease and stay within `0..=100`.
//! - A cancelled or failed upload leaves no object behind and does not touch
//!   the resume pointer.

use crate::logging::sanitize_message;
use crate::service::content_service::{ContentEditor, EditorError};
use crate::store::watch::lock_or_recover;
use crate::store::StoreHandle;
use log::{info, warn};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;
use uuid::Uuid;

pub const PDF_CONTENT_TYPE: &str = "application/pdf";
pub const MAX_RESUME_BYTES: usize = 5 * 1024 * 1024;
const CHUNK_SIZE: usize = 64 * 1024;
const RESUME_PREFIX: &str = "resume/resume-";

/// Blob backend failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobError(pub String);

impl Display for BlobError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "blob storage error: {}", self.0)
    }
}

impl Error for BlobError {}

/// Object storage for uploaded files.
pub trait BlobStorage: Send + Sync {
    /// Appends `chunk` to the named object, creating it on first write.
    fn put_chunk(&self, object: &str, chunk: &[u8]) -> Result<(), BlobError>;

    /// Seals the object and returns its public URL.
    fn finish(&self, object: &str, content_type: &str) -> Result<String, BlobError>;

    /// Removes the object. Missing objects are not an error.
    fn delete(&self, object: &str) -> Result<(), BlobError>;

    /// Maps a URL returned by `finish` back to its object name.
    fn object_for_url(&self, url: &str) -> Option<String>;
}

#[derive(Debug, Clone, Default)]
struct StoredBlob {
    bytes: Vec<u8>,
    content_type: Option<String>,
}

/// In-process blob storage.
#[derive(Debug, Default)]
pub struct MemoryBlobStorage {
    objects: Mutex<BTreeMap<String, StoredBlob>>,
    chunk_delay: Mutex<Option<Duration>>,
    fail_after_chunks: Mutex<Option<usize>>,
    chunks_written: AtomicUsize,
}

impl MemoryBlobStorage {
    const URL_PREFIX: &'static str = "memory://blobs/";

    pub fn new() -> Self {
        Self::default()
    }

    /// Slows every chunk write down, to make uploads observable.
    pub fn set_chunk_delay(&self, delay: Option<Duration>) {
        *lock_or_recover(&self.chunk_delay) = delay;
    }

    /// Fails every chunk write after `count` successful ones.
    pub fn fail_after_chunks(&self, count: Option<usize>) {
        *lock_or_recover(&self.fail_after_chunks) = count;
        self.chunks_written.store(0, Ordering::SeqCst);
    }

    pub fn object(&self, name: &str) -> Option<Vec<u8>> {
        lock_or_recover(&self.objects)
            .get(name)
            .map(|blob| blob.bytes.clone())
    }

    pub fn content_type(&self, name: &str) -> Option<String> {
        lock_or_recover(&self.objects)
            .get(name)
            .and_then(|blob| blob.content_type.clone())
    }

    pub fn object_count(&self) -> usize {
        lock_or_recover(&self.objects).len()
    }
}

impl BlobStorage for MemoryBlobStorage {
    fn put_chunk(&self, object: &str, chunk: &[u8]) -> Result<(), BlobError> {
        let delay = *lock_or_recover(&self.chunk_delay);
        if let Some(delay) = delay {
            std::thread::sleep(delay);
        }
        if let Some(limit) = *lock_or_recover(&self.fail_after_chunks) {
            if self.chunks_written.load(Ordering::SeqCst) >= limit {
                return Err(BlobError("connection reset".to_string()));
            }
        }
        self.chunks_written.fetch_add(1, Ordering::SeqCst);
        lock_or_recover(&self.objects)
            .entry(object.to_string())
            .or_default()
            .bytes
            .extend_from_slice(chunk);
        Ok(())
    }

    fn finish(&self, object: &str, content_type: &str) -> Result<String, BlobError> {
        let mut objects = lock_or_recover(&self.objects);
        let blob = objects
            .get_mut(object)
            .ok_or_else(|| BlobError(format!("object `{object}` has no data")))?;
        blob.content_type = Some(content_type.to_string());
        Ok(format!("{}{object}", Self::URL_PREFIX))
    }

    fn delete(&self, object: &str) -> Result<(), BlobError> {
        lock_or_recover(&self.objects).remove(object);
        Ok(())
    }

    fn object_for_url(&self, url: &str) -> Option<String> {
        url.strip_prefix(Self::URL_PREFIX)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
    }
}

#[derive(Debug)]
pub enum UploadError {
    /// Only PDF files are accepted.
    InvalidType(String),
    TooLarge { size: usize, limit: usize },
    Empty,
    Cancelled,
    Storage(BlobError),
    /// The file was stored but the resume pointer could not be written.
    Pointer(EditorError),
}

impl Display for UploadError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidType(content_type) => {
                write!(f, "please upload a PDF file (got `{content_type}`)")
            }
            Self::TooLarge { size, limit } => {
                write!(f, "file size {size} exceeds the {limit} byte limit")
            }
            Self::Empty => write!(f, "file is empty"),
            Self::Cancelled => write!(f, "upload cancelled"),
            Self::Storage(err) => write!(f, "{err}"),
            Self::Pointer(err) => write!(f, "{err}"),
        }
    }
}

impl Error for UploadError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Storage(err) => Some(err),
            Self::Pointer(err) => Some(err),
            _ => None,
        }
    }
}

impl From<BlobError> for UploadError {
    fn from(value: BlobError) -> Self {
        Self::Storage(value)
    }
}

/// One step of an upload.
#[derive(Debug)]
pub enum UploadEvent {
    /// Percent of bytes transferred.
    Progress(u8),
    Completed { url: String },
    Failed(UploadError),
}

impl UploadEvent {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Progress(_))
    }
}

/// Handle on a running upload.
pub struct UploadTask {
    object: String,
    events: Receiver<UploadEvent>,
    cancelled: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

impl UploadTask {
    pub fn object_name(&self) -> &str {
        &self.object
    }

    /// Requests cancellation; the task then ends with `Failed(Cancelled)`
    /// unless it already finished.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Blocks for the next event; `None` once the stream has ended.
    pub fn next_event(&self) -> Option<UploadEvent> {
        self.events.recv().ok()
    }

    /// Drains the stream and returns the terminal result together with the
    /// progress values seen on the way.
    pub fn wait(mut self) -> (Vec<u8>, Result<String, UploadError>) {
        let mut progress = Vec::new();
        let mut result = Err(UploadError::Cancelled);
        while let Some(event) = self.next_event() {
            match event {
                UploadEvent::Progress(percent) => progress.push(percent),
                UploadEvent::Completed { url } => result = Ok(url),
                UploadEvent::Failed(err) => result = Err(err),
            }
        }
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                warn!("event=resume_upload module=service status=error reason=worker_panicked");
            }
        }
        (progress, result)
    }
}

impl Drop for UploadTask {
    fn drop(&mut self) {
        if let Some(worker) = self.worker.take() {
            self.cancelled.store(true, Ordering::SeqCst);
            let _ = worker.join();
        }
    }
}

/// Starts and deletes resume uploads.
pub struct ResumeUploader {
    blobs: Arc<dyn BlobStorage>,
    store: StoreHandle,
}

impl ResumeUploader {
    pub fn new(blobs: Arc<dyn BlobStorage>, store: StoreHandle) -> Self {
        Self { blobs, store }
    }

    /// Validates the file and starts streaming it on a worker thread.
    ///
    /// # Errors
    /// - `InvalidType` unless `content_type` is `application/pdf`.
    /// - `TooLarge` above 5 MiB; `Empty` for zero bytes.
    pub fn start(
        &self,
        file_name: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<UploadTask, UploadError> {
        if !content_type.trim().eq_ignore_ascii_case(PDF_CONTENT_TYPE) {
            return Err(UploadError::InvalidType(content_type.to_string()));
        }
        if bytes.is_empty() {
            return Err(UploadError::Empty);
        }
        if bytes.len() > MAX_RESUME_BYTES {
            return Err(UploadError::TooLarge {
                size: bytes.len(),
                limit: MAX_RESUME_BYTES,
            });
        }

        let object = format!("{RESUME_PREFIX}{}.pdf", Uuid::new_v4().simple());
        let (sender, events) = mpsc::channel();
        let cancelled = Arc::new(AtomicBool::new(false));
        let job = UploadJob {
            object: object.clone(),
            file_name: file_name.to_string(),
            bytes,
            blobs: Arc::clone(&self.blobs),
            store: self.store.clone(),
            cancelled: Arc::clone(&cancelled),
            events: sender,
        };

        info!(
            "event=resume_upload module=service status=start size={} file={}",
            job.bytes.len(),
            sanitize_message(file_name, 64)
        );
        let worker = std::thread::Builder::new()
            .name("resume-upload".to_string())
            .spawn(move || job.run())
            .map_err(|err| UploadError::Storage(BlobError(format!("spawn failed: {err}"))))?;

        Ok(UploadTask {
            object,
            events,
            cancelled,
            worker: Some(worker),
        })
    }

    /// Deletes the stored file behind `url` and clears the resume pointer.
    ///
    /// The file deletion is best-effort; the pointer is cleared regardless.
    pub fn delete_resume(&self, url: Option<&str>) -> Result<(), EditorError> {
        if let Some(object) = url.and_then(|url| self.blobs.object_for_url(url)) {
            if let Err(err) = self.blobs.delete(&object) {
                warn!("event=resume_delete module=service status=error error={err}");
            }
        }
        ContentEditor::new(self.store.clone()).clear_resume()
    }
}

struct UploadJob {
    object: String,
    file_name: String,
    bytes: Vec<u8>,
    blobs: Arc<dyn BlobStorage>,
    store: StoreHandle,
    cancelled: Arc<AtomicBool>,
    events: Sender<UploadEvent>,
}

impl UploadJob {
    fn run(self) {
        let terminal = match self.transfer() {
            Ok(url) => {
                info!("event=resume_upload module=service status=ok");
                UploadEvent::Completed { url }
            }
            Err(err) => {
                if let Err(cleanup) = self.blobs.delete(&self.object) {
                    warn!("event=resume_upload_cleanup module=service status=error error={cleanup}");
                }
                warn!("event=resume_upload module=service status=error error={err}");
                UploadEvent::Failed(err)
            }
        };
        // Receiver may be gone when the task was dropped.
        let _ = self.events.send(terminal);
    }

    fn transfer(&self) -> Result<String, UploadError> {
        let total = self.bytes.len();
        let mut sent = 0usize;
        let mut last_percent = 0u8;
        self.emit(UploadEvent::Progress(0));

        for chunk in self.bytes.chunks(CHUNK_SIZE) {
            self.check_cancelled()?;
            self.blobs.put_chunk(&self.object, chunk)?;
            sent += chunk.len();
            let percent = u8::try_from(sent * 100 / total).unwrap_or(100);
            if percent > last_percent {
                last_percent = percent;
                self.emit(UploadEvent::Progress(percent));
            }
        }

        self.check_cancelled()?;
        let url = self.blobs.finish(&self.object, PDF_CONTENT_TYPE)?;
        ContentEditor::new(self.store.clone())
            .set_resume_url(&url, Some(&self.file_name))
            .map_err(UploadError::Pointer)?;
        Ok(url)
    }

    fn check_cancelled(&self) -> Result<(), UploadError> {
        if self.cancelled.load(Ordering::SeqCst) {
            return Err(UploadError::Cancelled);
        }
        Ok(())
    }

    fn emit(&self, event: UploadEvent) {
        let _ = self.events.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::{BlobStorage, MemoryBlobStorage, ResumeUploader, UploadError, MAX_RESUME_BYTES};
    use crate::store::StoreHandle;
    use std::sync::Arc;

    fn uploader() -> ResumeUploader {
        ResumeUploader::new(Arc::new(MemoryBlobStorage::new()), StoreHandle::Unavailable)
    }

    #[test]
    fn rejects_non_pdf_and_oversized_files_before_upload() {
        let uploader = uploader();
        assert!(matches!(
            uploader.start("cv.docx", "application/msword", vec![1]),
            Err(UploadError::InvalidType(_))
        ));
        assert!(matches!(
            uploader.start("cv.pdf", "application/pdf", vec![0; MAX_RESUME_BYTES + 1]),
            Err(UploadError::TooLarge { .. })
        ));
        assert!(matches!(
            uploader.start("cv.pdf", "application/pdf", Vec::new()),
            Err(UploadError::Empty)
        ));
    }

    #[test]
    fn memory_urls_map_back_to_objects() {
        let blobs = MemoryBlobStorage::new();
        blobs.put_chunk("resume/a.pdf", b"%PDF").unwrap();
        let url = blobs.finish("resume/a.pdf", "application/pdf").unwrap();
        assert_eq!(blobs.object_for_url(&url).as_deref(), Some("resume/a.pdf"));
        assert_eq!(blobs.object_for_url("https://elsewhere/x.pdf"), None);
    }
}
