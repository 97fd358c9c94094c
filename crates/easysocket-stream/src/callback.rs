use crate::error::StreamError;

/// Lifecycle notifications from a background processor.
///
/// Both hooks run on whichever thread triggered the transition, which may be
/// the processor's own background thread.
pub trait Callback: Send + Sync + 'static {
    /// A condition stopped the processor and cannot be retried.
    fn on_fatal(&self, _err: &StreamError) {}

    /// The processor completed a shutdown transition.
    fn on_shutdown(&self) {}
}

/// Ignores every notification.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopCallback;

impl Callback for NoopCallback {}

impl<T: Callback> Callback for std::sync::Arc<T> {
    fn on_fatal(&self, err: &StreamError) {
        (**self).on_fatal(err);
    }

    fn on_shutdown(&self) {
        (**self).on_shutdown();
    }
}
