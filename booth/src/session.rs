use crate::compositor::StillImage;
use crate::source::CameraStream;
use lovelens_common::filter::FilterKind;
use lovelens_common::frame::CapturedFrame;
use tokio::sync::watch;

/// Per-run capture state: the single active camera stream, the currently
/// selected filter, and the last still kept for review and export.
///
/// The stream is exclusively owned here: attaching a new one always releases
/// the previous one, so exactly one stream is ever live.
pub struct Session {
    stream: Option<CameraStream>,
    filter: watch::Sender<FilterKind>,
    pub last_still: Option<StillImage>,
}

impl Session {
    pub fn new(initial_filter: FilterKind) -> Self {
        let (filter, _) = watch::channel(initial_filter);
        Self {
            stream: None,
            filter,
            last_still: None,
        }
    }

    /// Install a newly acquired stream, releasing any previous one first.
    pub fn attach(&mut self, stream: CameraStream) {
        if let Some(mut old) = self.stream.take() {
            old.release();
        }
        self.stream = Some(stream);
    }

    /// Release the active stream, if any. Safe to call repeatedly.
    pub fn detach(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            stream.release();
        }
    }

    pub fn stream(&self) -> Option<&CameraStream> {
        self.stream.as_ref()
    }

    pub fn latest_frame(&self) -> Option<CapturedFrame> {
        self.stream.as_ref().and_then(|s| s.latest())
    }

    /// Change the active filter. Pipelines observing the watch pick it up at
    /// their next fire, keeping capture identical to the preview.
    pub fn select_filter(&self, kind: FilterKind) {
        self.filter.send_replace(kind);
    }

    pub fn selected_filter(&self) -> FilterKind {
        *self.filter.borrow()
    }

    pub fn filter_watch(&self) -> watch::Receiver<FilterKind> {
        self.filter.subscribe()
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.detach();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn attach_releases_the_previous_stream() {
        let mut session = Session::new(FilterKind::None);
        let first = CameraStream::stub();
        let mut first_frames = first.frames();
        session.attach(first);
        session.attach(CameraStream::stub());

        // The first reader task was aborted, so its sender side is gone.
        assert!(first_frames.changed().await.is_err());
        // Exactly one stream remains, and it is the live one.
        assert!(session.stream().is_some_and(|s| s.is_live()));
    }

    #[tokio::test]
    async fn detach_is_idempotent() {
        let mut session = Session::new(FilterKind::None);
        session.attach(CameraStream::stub());
        session.detach();
        session.detach();
        assert!(session.stream().is_none());
    }

    #[tokio::test]
    async fn selected_filter_flows_through_the_watch() {
        let session = Session::new(FilterKind::None);
        let watch = session.filter_watch();
        session.select_filter(FilterKind::Monochrome);
        assert_eq!(session.selected_filter(), FilterKind::Monochrome);
        assert_eq!(*watch.borrow(), FilterKind::Monochrome);
    }
}
