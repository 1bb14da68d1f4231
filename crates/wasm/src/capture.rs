use std::sync::atomic::{AtomicUsize, Ordering};

use signflow_editor::PointerCapture;

/// Pointer capture the host mirrors by polling.
///
/// DOM handles cannot live in `Send` types, so gestures only flip this count
/// and the host applies `setPointerCapture` itself.
#[derive(Debug, Default)]
pub(crate) struct FlagCapture {
    holders: AtomicUsize,
}

impl FlagCapture {
    pub(crate) fn is_held(&self) -> bool {
        self.holders.load(Ordering::SeqCst) > 0
    }
}

impl PointerCapture for FlagCapture {
    fn acquire(&self) {
        self.holders.fetch_add(1, Ordering::SeqCst);
    }

    fn release(&self) {
        let _ = self
            .holders
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |count| {
                count.checked_sub(1)
            });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn release_never_underflows() {
        let capture = FlagCapture::default();
        capture.release();
        assert!(!capture.is_held());

        capture.acquire();
        assert!(capture.is_held());
        capture.release();
        assert!(!capture.is_held());
    }
}
