use std::thread;

use crossbeam_channel::{Receiver, Sender};

use crate::pipeline::pipeline_logger::PipelineLogger;
use crate::shared::error::PipelineError;

/// Events streamed from a background run to the thread that spawned it.
#[derive(Debug, Clone, PartialEq)]
pub enum RunEvent {
    Progress {
        current: usize,
        total: usize,
        label: String,
    },
    Timing {
        stage: String,
        duration_ms: f64,
    },
    Metric {
        name: String,
        value: f64,
    },
    Info(String),
}

/// Forwards logger calls over a channel. Send errors are ignored: a caller
/// that stopped listening does not stop the run.
pub struct ChannelPipelineLogger {
    tx: Sender<RunEvent>,
}

impl ChannelPipelineLogger {
    pub fn new(tx: Sender<RunEvent>) -> Self {
        Self { tx }
    }
}

impl PipelineLogger for ChannelPipelineLogger {
    fn progress(&mut self, current: usize, total: usize, label: &str) {
        let _ = self.tx.send(RunEvent::Progress {
            current,
            total,
            label: label.to_string(),
        });
    }

    fn timing(&mut self, stage: &str, duration_ms: f64) {
        let _ = self.tx.send(RunEvent::Timing {
            stage: stage.to_string(),
            duration_ms,
        });
    }

    fn metric(&mut self, name: &str, value: f64) {
        let _ = self.tx.send(RunEvent::Metric {
            name: name.to_string(),
            value,
        });
    }

    fn info(&mut self, message: &str) {
        let _ = self.tx.send(RunEvent::Info(message.to_string()));
    }
}

/// A pipeline job running on its own thread.
pub struct PipelineHandle<T> {
    events: Receiver<RunEvent>,
    handle: thread::JoinHandle<Result<T, PipelineError>>,
}

impl<T> PipelineHandle<T> {
    pub fn events(&self) -> &Receiver<RunEvent> {
        &self.events
    }

    /// Replays every event into `logger` until the job finishes, then
    /// returns the job's result.
    pub fn forward_to(self, logger: &mut dyn PipelineLogger) -> Result<T, PipelineError> {
        for event in self.events.iter() {
            match event {
                RunEvent::Progress {
                    current,
                    total,
                    label,
                } => logger.progress(current, total, &label),
                RunEvent::Timing { stage, duration_ms } => logger.timing(&stage, duration_ms),
                RunEvent::Metric { name, value } => logger.metric(&name, value),
                RunEvent::Info(message) => logger.info(&message),
            }
        }
        self.join()
    }

    /// Waits for the job. A panic on the worker becomes `WorkerPanicked`.
    pub fn join(self) -> Result<T, PipelineError> {
        self.handle
            .join()
            .map_err(|_| PipelineError::WorkerPanicked)?
    }
}

/// Runs `job` on a named worker thread, handing it a logger whose events
/// arrive on the returned handle's channel.
pub fn spawn_pipeline<T, F>(name: &str, job: F) -> Result<PipelineHandle<T>, PipelineError>
where
    T: Send + 'static,
    F: FnOnce(&mut dyn PipelineLogger) -> Result<T, PipelineError> + Send + 'static,
{
    let (tx, rx) = crossbeam_channel::unbounded::<RunEvent>();
    let handle = thread::Builder::new()
        .name(name.to_string())
        .spawn(move || {
            let mut logger = ChannelPipelineLogger::new(tx);
            let result = job(&mut logger);
            if let Err(e) = &result {
                log::debug!("Background pipeline failed: {e}");
            }
            result
        })?;
    Ok(PipelineHandle { events: rx, handle })
}
