//! Per-chunk progress reporting

/// Stage name reported while writing
pub const STAGE_COMPRESS: &str = "compress";
/// Stage name reported while reading
pub const STAGE_DECOMPRESS: &str = "decompress";

/// Snapshot reported once per completed chunk
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Progress {
    /// Raw bytes handled so far
    pub bytes_processed: u64,
    /// Raw bytes expected in total
    pub total_bytes: u64,
    /// `bytes_processed / total_bytes`, clamped to `0.0..=1.0`
    pub fraction: f64,
    /// [`STAGE_COMPRESS`] or [`STAGE_DECOMPRESS`]
    pub stage: &'static str,
}

impl Progress {
    /// Build a snapshot, deriving the fraction. An empty total counts as done.
    pub fn new(stage: &'static str, bytes_processed: u64, total_bytes: u64) -> Self {
        let fraction = if total_bytes == 0 {
            1.0
        } else {
            (bytes_processed as f64 / total_bytes as f64).min(1.0)
        };
        Self {
            bytes_processed,
            total_bytes,
            fraction,
            stage,
        }
    }
}

/// Receives progress snapshots on the thread doing the I/O
pub trait ProgressObserver {
    /// Called after each chunk is compressed or decompressed
    fn on_progress(&mut self, progress: &Progress);
}

impl<F> ProgressObserver for F
where
    F: FnMut(&Progress),
{
    fn on_progress(&mut self, progress: &Progress) {
        self(progress)
    }
}

/// Observer that ignores every report
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressObserver for NoProgress {
    fn on_progress(&mut self, _progress: &Progress) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fraction_is_clamped() {
        assert_eq!(Progress::new(STAGE_COMPRESS, 5, 10).fraction, 0.5);
        assert_eq!(Progress::new(STAGE_COMPRESS, 15, 10).fraction, 1.0);
        assert_eq!(Progress::new(STAGE_DECOMPRESS, 0, 0).fraction, 1.0);
    }

    #[test]
    fn test_closures_observe() {
        let mut seen = Vec::new();
        {
            let mut observer = |p: &Progress| seen.push(p.bytes_processed);
            let dynamic: &mut dyn ProgressObserver = &mut observer;
            dynamic.on_progress(&Progress::new(STAGE_COMPRESS, 1, 2));
            dynamic.on_progress(&Progress::new(STAGE_COMPRESS, 2, 2));
        }
        assert_eq!(seen, vec![1, 2]);
    }
}
