//! Terminal foreground. Owns at most one running job and reacts to events
//! from the input thread and the job worker, all read from one channel.

use std::path::PathBuf;
use std::sync::mpsc::Sender;
use std::sync::Arc;
use crate::api::MotionBackend;
use crate::events::{ClientEvent, JobEvent, UiCommand};
use crate::job::{JobParams, JobStatus};
use crate::worker::JobWorker;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

/// Turn one line of user input into a command. `template` supplies every
/// job setting except the prompt.
pub fn parse_line(line: &str, template: &JobParams) -> Option<UiCommand> {
    match line.trim() {
        "" => None,
        ":cancel" | ":c" => Some(UiCommand::Cancel),
        ":history" | ":h" => Some(UiCommand::History),
        ":quit" | ":q" => Some(UiCommand::Quit),
        prompt => Some(UiCommand::Submit(JobParams {
            prompt: prompt.to_string(),
            ..template.clone()
        })),
    }
}

pub struct App {
    backend: Arc<dyn MotionBackend>,
    events: Sender<ClientEvent>,
    worker: Option<JobWorker>,
    status: JobStatus,
    history: Vec<PathBuf>,
    last_terminal: Option<JobEvent>,
    exit_when_idle: bool,
}

impl App {
    pub fn new(backend: Arc<dyn MotionBackend>, events: Sender<ClientEvent>) -> Self {
        Self {
            backend,
            events,
            worker: None,
            status: JobStatus::Idle,
            history: Vec::new(),
            last_terminal: None,
            exit_when_idle: false,
        }
    }

    /// Leave the event loop as soon as the current job has finished.
    pub fn exit_when_idle(mut self) -> Self {
        self.exit_when_idle = true;
        self
    }

    pub fn status(&self) -> JobStatus {
        self.status
    }

    /// Videos saved during this session, oldest first.
    pub fn history(&self) -> &[PathBuf] {
        &self.history
    }

    pub fn last_terminal(&self) -> Option<&JobEvent> {
        self.last_terminal.as_ref()
    }

    pub fn on_event(&mut self, event: ClientEvent) -> Flow {
        match event {
            ClientEvent::Ui(command) => self.on_ui_command(command),
            ClientEvent::Job(event) => self.on_job_event(event),
        }
    }

    fn on_ui_command(&mut self, command: UiCommand) -> Flow {
        match command {
            UiCommand::Submit(params) => {
                if self.status.is_active() {
                    println!("A job is already running, use :cancel to stop it first");
                } else {
                    self.start(params);
                }
            }
            UiCommand::Cancel => match &self.worker {
                Some(worker) if self.status.is_active() => {
                    worker.cancel();
                    println!("Cancelling...");
                }
                _ => println!("Nothing to cancel"),
            },
            UiCommand::History => {
                if self.history.is_empty() {
                    println!("No videos yet");
                }
                for (i, path) in self.history.iter().enumerate() {
                    println!("{:>3}. {}", i + 1, path.display());
                }
            }
            UiCommand::Quit => {
                if let Some(worker) = &self.worker {
                    worker.cancel();
                }
                return Flow::Exit;
            }
        }
        Flow::Continue
    }

    fn on_job_event(&mut self, event: JobEvent) -> Flow {
        match &event {
            JobEvent::State(status) => {
                self.status = *status;
                println!("[{status}]");
            }
            JobEvent::Progress(percent) => println!("{percent:>3}%"),
            JobEvent::Log(message) => println!("    {message}"),
            JobEvent::Completed { path } => {
                println!("Saved {}", path.display());
                self.history.push(path.clone());
            }
            JobEvent::Failed { message } => eprintln!("Error: {message}"),
            JobEvent::Cancelled { path } => match path {
                Some(path) => {
                    println!("Cancelled, the video was already generated and kept at {}", path.display());
                    self.history.push(path.clone());
                }
                None => println!("Cancelled"),
            },
        }

        if event.is_terminal() {
            if let Some(mut worker) = self.worker.take() {
                worker.join();
            }
            self.last_terminal = Some(event);
            if self.exit_when_idle {
                return Flow::Exit;
            }
        }
        Flow::Continue
    }

    fn start(&mut self, params: JobParams) {
        self.status = JobStatus::Requested;
        self.worker = Some(JobWorker::spawn(self.backend.clone(), params, self.events.clone()));
    }
}
