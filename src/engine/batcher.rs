//! Coalesces buffer mutations into at most one upload per frame.

/// Pending-upload marker.
///
/// A boolean rather than a counter: how many mutations happened since the last
/// frame does not matter, only that one did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UploadBatcher {
    dirty: bool,
}

impl UploadBatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark(&mut self) {
        self.dirty = true;
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Return whether an upload is pending and reset the flag.
    pub fn take(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_many_marks_yield_one_upload() {
        let mut batcher = UploadBatcher::new();
        for _ in 0..100 {
            batcher.mark();
        }
        assert!(batcher.take());
        assert!(!batcher.take());
        assert!(!batcher.is_dirty());
    }
}
