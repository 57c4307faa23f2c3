use crate::compositor::{compose, ComposeError};
use crate::delivery::{Acknowledged, DeliveryError, TelegramClient};
use futures_util::future::BoxFuture;
use lovelens_common::filter::FilterKind;
use lovelens_common::frame::CapturedFrame;
use tokio::sync::watch;
use tracing::debug;

/// Why a pipeline fire happened. Manual fires surface their outcome to the
/// user; auto-send fires only log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FireTrigger {
    Manual,
    AutoSend,
}

#[derive(Debug, thiserror::Error)]
pub enum FireError {
    #[error(transparent)]
    Compose(#[from] ComposeError),
    #[error(transparent)]
    Delivery(#[from] DeliveryError),
}

/// One full capture-and-deliver run. Behind a trait so the scheduler's timing
/// behavior is testable against fakes.
pub trait CapturePipeline: Send + Sync + 'static {
    fn fire(&self, trigger: FireTrigger) -> BoxFuture<'_, Result<Acknowledged, FireError>>;
}

/// Production pipeline: latest camera frame -> square filtered still -> PNG
/// -> Telegram. Reads the selected filter at fire time, so every fire uses
/// exactly what the preview shows.
pub struct PhotoPipeline {
    frames: watch::Receiver<Option<CapturedFrame>>,
    filter: watch::Receiver<FilterKind>,
    client: TelegramClient,
}

impl PhotoPipeline {
    pub fn new(
        frames: watch::Receiver<Option<CapturedFrame>>,
        filter: watch::Receiver<FilterKind>,
        client: TelegramClient,
    ) -> Self {
        Self {
            frames,
            filter,
            client,
        }
    }
}

impl CapturePipeline for PhotoPipeline {
    fn fire(&self, trigger: FireTrigger) -> BoxFuture<'_, Result<Acknowledged, FireError>> {
        Box::pin(async move {
            let frame = self
                .frames
                .borrow()
                .clone()
                .ok_or(ComposeError::FrameNotReady)?;
            let filter = *self.filter.borrow();
            let still = compose(&frame, filter)?;
            let png = still.encode_png()?;
            debug!(
                ?trigger,
                seq = frame.seq,
                filter = filter.id(),
                size_px = still.size_px(),
                bytes = png.len(),
                "delivering still"
            );
            let ack = self.client.send_photo(png).await?;
            Ok(ack)
        })
    }
}
