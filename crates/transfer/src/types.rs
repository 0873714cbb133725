use std::fmt;
use std::time::Duration;

/// Bytes already present at the remote destination.
///
/// Always within `0..=local_size`: a remote file longer than the local
/// source reconciles to the local size, leaving nothing to send.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ResumeOffset(u64);

impl ResumeOffset {
    /// Nothing uploaded yet.
    pub const ZERO: Self = Self(0);

    /// Derives the offset from the remote size, capped at the local size.
    pub fn reconcile(remote_size: u64, local_size: u64) -> Self {
        Self(remote_size.min(local_size))
    }

    /// Offset in bytes from the start of the local file.
    pub fn bytes(self) -> u64 {
        self.0
    }

    /// Bytes still to send for a local file of `local_size` bytes.
    pub fn remaining(self, local_size: u64) -> u64 {
        local_size.saturating_sub(self.0)
    }

    /// Whether the remote side already holds the whole local file.
    pub fn is_complete(self, local_size: u64) -> bool {
        self.0 >= local_size
    }
}

impl fmt::Display for ResumeOffset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// Outcome of a successful attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct AttemptReport {
    /// Where streaming started.
    pub resume_offset: ResumeOffset,
    /// Local source size when the attempt opened it.
    pub local_size: u64,
    /// Bytes appended to the remote file by this attempt.
    pub bytes_sent: u64,
    /// Wall time of the attempt, session to release.
    pub elapsed: Duration,
}

impl AttemptReport {
    /// Remote size implied by this attempt.
    pub fn final_offset(&self) -> u64 {
        self.resume_offset.bytes() + self.bytes_sent
    }

    /// `true` when the remote side was already complete.
    pub fn was_noop(&self) -> bool {
        self.bytes_sent == 0
    }
}

/// Streaming progress within one attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferProgress {
    /// Bytes appended by the current attempt so far.
    pub bytes_sent: u64,
    /// Absolute position in the local file.
    pub offset: u64,
    /// Local file size.
    pub total_bytes: u64,
}

impl TransferProgress {
    /// Fraction of the whole file now at the remote side, in `0.0..=1.0`.
    pub fn fraction(&self) -> f64 {
        if self.total_bytes == 0 {
            return 1.0;
        }
        (self.offset as f64 / self.total_bytes as f64).min(1.0)
    }
}
