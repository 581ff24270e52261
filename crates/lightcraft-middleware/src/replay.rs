//! [`ReplaySource`] – recorded takes played back from newline-delimited JSON.
//!
//! Each non-blank line holds one serialised [`MocapFrame`].  Lines that fail
//! to parse are logged and skipped; a read error ends the run with
//! [`RelayError::SourceDisconnected`].  By default frames are delivered as
//! fast as the sink accepts them; [`ReplaySource::with_rate`] paces them.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use lightcraft_types::{MocapFrame, RelayError};

use crate::source::{FrameSink, MotionSource, frame_period};

enum Input {
    Path(PathBuf),
    Reader(Box<dyn BufRead + Send>),
}

pub struct ReplaySource {
    name: String,
    pending: Option<Input>,
    reader: Option<Box<dyn BufRead + Send>>,
    period: Option<Duration>,
    delivered: u64,
    skipped: u64,
}

impl ReplaySource {
    /// Replay the file at `path`.  The file is opened by
    /// [`connect`](MotionSource::connect).
    pub fn new(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        Self {
            name: format!("replay:{}", path.display()),
            pending: Some(Input::Path(path)),
            reader: None,
            period: None,
            delivered: 0,
            skipped: 0,
        }
    }

    /// Replay from an already-open reader.
    pub fn from_reader(name: impl Into<String>, reader: impl BufRead + Send + 'static) -> Self {
        Self {
            name: name.into(),
            pending: Some(Input::Reader(Box::new(reader))),
            reader: None,
            period: None,
            delivered: 0,
            skipped: 0,
        }
    }

    /// Deliver at most `rate_hz` frames per second.  An unusable rate
    /// leaves the replay unpaced.
    pub fn with_rate(mut self, rate_hz: f64) -> Self {
        self.period = frame_period(rate_hz);
        if self.period.is_none() {
            warn!(source = %self.name, rate_hz, "unusable replay rate, delivering unpaced");
        }
        self
    }

    pub fn frames_delivered(&self) -> u64 {
        self.delivered
    }

    /// Lines that were not valid frames.
    pub fn lines_skipped(&self) -> u64 {
        self.skipped
    }
}

impl MotionSource for ReplaySource {
    fn name(&self) -> &str {
        &self.name
    }

    fn connect(&mut self) -> Result<(), RelayError> {
        let reader: Box<dyn BufRead + Send> = match self.pending.take() {
            Some(Input::Path(path)) => {
                let file = File::open(&path).map_err(|e| {
                    RelayError::SourceDisconnected(format!("{}: {e}", path.display()))
                })?;
                Box::new(BufReader::new(file))
            }
            Some(Input::Reader(reader)) => reader,
            None => {
                return Err(RelayError::SourceDisconnected(format!(
                    "{} was already consumed",
                    self.name
                )));
            }
        };
        self.reader = Some(reader);
        info!(source = %self.name, "replay source connected");
        Ok(())
    }

    fn run(&mut self, sink: &mut dyn FrameSink, shutdown: &AtomicBool) -> Result<(), RelayError> {
        let mut reader = self.reader.take().ok_or(RelayError::NotConnected)?;
        let mut line = String::new();
        let mut line_no = 0u64;
        let mut deadline = Instant::now();

        while !shutdown.load(Ordering::Acquire) {
            line.clear();
            let read = reader
                .read_line(&mut line)
                .map_err(|e| RelayError::SourceDisconnected(format!("{}: {e}", self.name)))?;
            if read == 0 {
                debug!(source = %self.name, frames = self.delivered, "replay finished");
                break;
            }
            line_no += 1;

            let text = line.trim();
            if text.is_empty() {
                continue;
            }
            let frame: MocapFrame = match serde_json::from_str(text) {
                Ok(frame) => frame,
                Err(e) => {
                    warn!(source = %self.name, line = line_no, error = %e, "skipping malformed replay line");
                    self.skipped += 1;
                    continue;
                }
            };

            sink.deliver(&frame);
            self.delivered += 1;

            if let Some(period) = self.period {
                deadline += period;
                let now = Instant::now();
                if deadline > now {
                    thread::sleep(deadline - now);
                } else {
                    deadline = now;
                }
            }
        }
        Ok(())
    }
}
