use std::fmt;
use std::sync::Arc;

/// Host hook that routes every pointer event to the active gesture, even when
/// the pointer leaves the canvas.
pub trait PointerCapture: Send + Sync {
    fn acquire(&self);
    fn release(&self);
}

impl fmt::Debug for dyn PointerCapture {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str("PointerCapture")
    }
}

/// For hosts that already deliver every pointer event to the engine.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoCapture;

impl PointerCapture for NoCapture {
    fn acquire(&self) {}
    fn release(&self) {}
}

/// Holds the capture for one gesture and releases it exactly once on drop.
pub struct CaptureGuard {
    capture: Arc<dyn PointerCapture>,
}

impl CaptureGuard {
    pub fn acquire(capture: &Arc<dyn PointerCapture>) -> Self {
        capture.acquire();
        Self {
            capture: Arc::clone(capture),
        }
    }
}

impl Drop for CaptureGuard {
    fn drop(&mut self) {
        self.capture.release();
    }
}

impl fmt::Debug for CaptureGuard {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str("CaptureGuard")
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Counts acquire/release calls so tests can check pairing.
    #[derive(Debug, Default)]
    pub(crate) struct CountingCapture {
        pub acquired: AtomicUsize,
        pub released: AtomicUsize,
    }

    impl CountingCapture {
        pub(crate) fn counts(&self) -> (usize, usize) {
            (
                self.acquired.load(Ordering::SeqCst),
                self.released.load(Ordering::SeqCst),
            )
        }
    }

    impl PointerCapture for CountingCapture {
        fn acquire(&self) {
            self.acquired.fetch_add(1, Ordering::SeqCst);
        }

        fn release(&self) {
            self.released.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn guard_releases_once_on_drop() {
        let counter = Arc::new(CountingCapture::default());
        let capture: Arc<dyn PointerCapture> = counter.clone();
        {
            let _guard = CaptureGuard::acquire(&capture);
            assert_eq!(counter.counts(), (1, 0));
        }
        assert_eq!(counter.counts(), (1, 1));
    }
}
