//! Update sources.
//!
//! An [`UpdateSource`] is where the runtime pulls updates from once the bot
//! is ready: a long-polling client, a webhook receiver, or the in-process
//! [`ChannelSource`] used by tests and embedders.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::debug;

use crate::error::ApiResult;
use crate::update::Update;

/// Options passed to [`UpdateSource::start`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LaunchOptions {
    /// Discard updates that queued up while the bot was offline.
    pub drop_pending_updates: bool,
}

/// A stream of incoming updates.
#[async_trait]
pub trait UpdateSource: Send {
    /// Prepares the source; called once before the first `next_update`.
    async fn start(&mut self, options: LaunchOptions) -> ApiResult<()>;

    /// Waits for the next update; `None` once the source is exhausted.
    async fn next_update(&mut self) -> Option<Update>;
}

/// An update source fed through a tokio channel.
#[derive(Debug)]
pub struct ChannelSource {
    rx: mpsc::Receiver<Update>,
}

impl ChannelSource {
    /// Creates a source and the sender that feeds it.
    ///
    /// `buffer` is raised to at least one slot.
    pub fn new(buffer: usize) -> (mpsc::Sender<Update>, Self) {
        let (tx, rx) = mpsc::channel(buffer.max(1));
        (tx, Self { rx })
    }
}

#[async_trait]
impl UpdateSource for ChannelSource {
    async fn start(&mut self, options: LaunchOptions) -> ApiResult<()> {
        if options.drop_pending_updates {
            let mut dropped = 0usize;
            while self.rx.try_recv().is_ok() {
                dropped += 1;
            }
            debug!(dropped, "Dropped pending updates");
        }
        Ok(())
    }

    async fn next_update(&mut self) -> Option<Update> {
        self.rx.recv().await
    }
}
