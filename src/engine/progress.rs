/// Receives progress notifications from a running engine.
///
/// `increment` is called from worker tasks once per finished request, so
/// implementations must return quickly and must not block.
pub trait ProgressSink: Send + Sync {
    fn increment(&self);

    /// Called once after every worker has exited.
    fn finish(&self);
}
