//! Runs one job off the foreground thread.
//!
//! A job walks `Requested → (Translating) → Generating → Downloading` and ends
//! with exactly one terminal event. Cancellation is a flag that is only
//! looked at between stages: once the generation request is out, the video
//! is still downloaded and saved, and the job ends `Cancelled` with its path.

use std::fs::File;
use std::io::{self, Read};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;
use chrono::Local;
use tracing::{error, info, warn};
use crate::api::MotionBackend;
use crate::error::ClientError;
use crate::events::{ClientEvent, JobEvent};
use crate::filename::output_path;
use crate::job::{JobParams, JobStatus};

pub struct JobWorker {
    cancel: Arc<AtomicBool>,
    thread_handle: Option<JoinHandle<()>>,
}

impl JobWorker {
    pub fn spawn(backend: Arc<dyn MotionBackend>, params: JobParams, events: Sender<ClientEvent>) -> Self {
        let cancel = Arc::new(AtomicBool::new(false));
        let job = Job {
            backend,
            params,
            events,
            cancel: cancel.clone(),
        };
        let thread_handle = thread::spawn(move || job.run());

        Self {
            cancel,
            thread_handle: Some(thread_handle),
        }
    }

    /// Ask the job to stop at its next stage boundary.
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::SeqCst);
    }

    pub fn is_finished(&self) -> bool {
        self.thread_handle.as_ref().is_none_or(|h| h.is_finished())
    }

    pub fn join(&mut self) {
        if let Some(handle) = self.thread_handle.take() {
            let _ = handle.join();
        }
    }
}

enum Outcome {
    Completed(PathBuf),
    Cancelled(Option<PathBuf>),
}

struct Job {
    backend: Arc<dyn MotionBackend>,
    params: JobParams,
    events: Sender<ClientEvent>,
    cancel: Arc<AtomicBool>,
}

impl Job {
    fn run(self) {
        let terminal = match self.execute() {
            Ok(Outcome::Completed(path)) => {
                self.enter(JobStatus::Completed);
                JobEvent::Completed { path }
            }
            Ok(Outcome::Cancelled(path)) => {
                self.enter(JobStatus::Cancelled);
                JobEvent::Cancelled { path }
            }
            Err(e) => {
                error!("job failed: {e}");
                self.enter(JobStatus::Failed);
                JobEvent::Failed { message: e.to_string() }
            }
        };
        self.emit(terminal);
    }

    fn execute(&self) -> Result<Outcome, ClientError> {
        self.enter(JobStatus::Requested);
        if self.is_cancelled() {
            return Ok(Outcome::Cancelled(None));
        }

        let mut prompt = self.params.prompt.clone();
        if self.params.translate {
            self.enter(JobStatus::Translating);
            self.log(format!("Translating prompt to {}", self.params.target_lang));
            prompt = self
                .backend
                .translate(&prompt, &self.params.target_lang)
                .map_err(|e| match e {
                    // the server's detail already names the failed translation
                    remote @ ClientError::Remote { .. } => remote,
                    other => ClientError::Translation(Box::new(other)),
                })?;
            self.log(format!("Translated: {prompt}"));

            if self.is_cancelled() {
                return Ok(Outcome::Cancelled(None));
            }
        }

        self.enter(JobStatus::Generating);
        self.log(format!("Requesting {} frames (seed: {})", self.params.frames.get(), self.params.seed));
        let body = self.backend.generate(&self.params.request(&prompt))?;

        self.enter(JobStatus::Downloading);
        let path = self.download(body, &prompt)?;

        if self.is_cancelled() {
            warn!(path = %path.display(), "job cancelled after generation, keeping the video");
            Ok(Outcome::Cancelled(Some(path)))
        } else {
            Ok(Outcome::Completed(path))
        }
    }

    fn download(&self, mut body: Box<dyn Read + Send>, prompt: &str) -> Result<PathBuf, ClientError> {
        std::fs::create_dir_all(&self.params.output_dir)?;
        let path = output_path(&self.params.output_dir, prompt, Local::now());

        let started = Instant::now();
        let mut file = File::create(&path)?;
        let written = match io::copy(&mut body, &mut file) {
            Ok(n) => n,
            Err(e) => {
                drop(file);
                let _ = std::fs::remove_file(&path);
                return Err(e.into());
            }
        };

        let elapsed = started.elapsed();
        info!(path = %path.display(), bytes = written, elapsed_ms = elapsed.as_millis() as u64, "video saved");
        self.log(format!("Download finished in {:.2}s", elapsed.as_secs_f64()));
        Ok(path)
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::SeqCst)
    }

    fn enter(&self, status: JobStatus) {
        self.emit(JobEvent::State(status));
        if status.milestone() > 0 {
            self.emit(JobEvent::Progress(status.milestone()));
        }
    }

    fn log(&self, message: String) {
        self.emit(JobEvent::Log(message));
    }

    fn emit(&self, event: JobEvent) {
        let _ = self.events.send(ClientEvent::Job(event));
    }
}
