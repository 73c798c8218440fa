use crate::error::Result;
use crate::types::{LogSource, PushTarget, Sample};
use async_trait::async_trait;

/// A follower of one log file. Yields each appended line in order and
/// suspends while none is available.
#[async_trait]
pub trait LineSource: Send {
    /// `Ok(None)` means the source has ended for good; file followers never
    /// return it, scripted fixtures do once their lines run out.
    async fn next_line(&mut self) -> Result<Option<String>>;
}

/// Attaches a `LineSource` for a configured log source
#[async_trait]
pub trait LineSourceFactory: Send + Sync {
    async fn attach(&self, source: &LogSource) -> Result<Box<dyn LineSource>>;
}

/// One-shot push of a single gauge value under the target's grouping key
#[async_trait]
pub trait MetricPublisher: Send + Sync {
    async fn publish(&self, sample: &Sample, target: &PushTarget) -> Result<()>;
}
