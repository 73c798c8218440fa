use crate::app::ports::{LineSource, LineSourceFactory};
use crate::constants;
use crate::error::{MonitorError, Result};
use crate::types::LogSource;
use async_trait::async_trait;
use std::io::SeekFrom;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, AsyncSeekExt, BufReader};
use tracing::{debug, warn};

/// Follows a file from its current end, like `tail -f` without the subprocess.
///
/// Lines are yielded only once their terminating newline has been written, so
/// a writer flushing half a line never produces a truncated sample. A line
/// longer than `max_line_bytes` is dropped up to its newline instead of being
/// buffered.
pub struct FileTailer {
    path: PathBuf,
    reader: BufReader<File>,
    pending: Vec<u8>,
    discarding: bool,
    poll_interval: Duration,
    max_line_bytes: usize,
}

impl FileTailer {
    pub async fn attach(path: impl AsRef<Path>, poll_interval: Duration) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let attach_error = |source: std::io::Error| MonitorError::TailAttach {
            path: path.clone(),
            source,
        };

        let mut file = File::open(&path).await.map_err(attach_error)?;
        let metadata = file.metadata().await.map_err(attach_error)?;
        if metadata.is_dir() {
            return Err(attach_error(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "path is a directory",
            )));
        }
        let offset = file.seek(SeekFrom::End(0)).await.map_err(attach_error)?;
        debug!(path = %path.display(), offset, "attached at end of file");

        Ok(Self {
            path,
            reader: BufReader::new(file),
            pending: Vec::new(),
            discarding: false,
            poll_interval,
            max_line_bytes: constants::DEFAULT_MAX_LINE_BYTES,
        })
    }

    pub fn with_max_line_bytes(mut self, max_line_bytes: usize) -> Self {
        self.max_line_bytes = max_line_bytes.max(1);
        self
    }

    /// Bytes of an unfinished line currently held
    pub fn buffered_bytes(&self) -> usize {
        self.pending.len()
    }
}

#[async_trait]
impl LineSource for FileTailer {
    async fn next_line(&mut self) -> Result<Option<String>> {
        loop {
            let available = self.reader.fill_buf().await.map_err(|source| MonitorError::TailRead {
                path: self.path.clone(),
                source,
            })?;

            if available.is_empty() {
                // At end of file; wait for the writer to append more
                tokio::time::sleep(self.poll_interval).await;
                continue;
            }

            let (taken, complete) = match available.iter().position(|b| *b == b'\n') {
                Some(newline) => (newline + 1, true),
                None => (available.len(), false),
            };
            if !self.discarding {
                self.pending.extend_from_slice(&available[..taken]);
            }
            self.reader.consume(taken);

            if self.discarding {
                self.discarding = !complete;
                continue;
            }

            if self.pending.len() > self.max_line_bytes {
                warn!(
                    path = %self.path.display(),
                    limit = self.max_line_bytes,
                    "line exceeds length limit; discarding it"
                );
                self.pending.clear();
                self.discarding = !complete;
                continue;
            }

            if complete {
                self.pending.pop();
                if self.pending.last() == Some(&b'\r') {
                    self.pending.pop();
                }
                let line = String::from_utf8_lossy(&self.pending).into_owned();
                self.pending.clear();
                return Ok(Some(line));
            }
        }
    }
}

/// Attaches a `FileTailer` to each source's path
pub struct FileTailFactory {
    poll_interval: Duration,
    max_line_bytes: usize,
}

impl FileTailFactory {
    pub fn new(poll_interval: Duration) -> Self {
        Self {
            poll_interval,
            max_line_bytes: constants::DEFAULT_MAX_LINE_BYTES,
        }
    }

    pub fn with_max_line_bytes(mut self, max_line_bytes: usize) -> Self {
        self.max_line_bytes = max_line_bytes;
        self
    }
}

#[async_trait]
impl LineSourceFactory for FileTailFactory {
    async fn attach(&self, source: &LogSource) -> Result<Box<dyn LineSource>> {
        let tailer = FileTailer::attach(&source.path, self.poll_interval)
            .await?
            .with_max_line_bytes(self.max_line_bytes);
        Ok(Box::new(tailer))
    }
}
