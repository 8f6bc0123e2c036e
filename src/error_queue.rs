//! Fixed-capacity FIFO of recorded error events, shared by every scheme.
//!
//! Errors are never raised as exceptions in this crate; they are recorded here and
//! reported through `Result`/status codes at every public entry point (see the
//! `scheme` module's dispatch guard). Capacity is fixed at 8 entries; once full,
//! further pushes are silently discarded so that a runaway caller cannot turn error
//! reporting into unbounded memory growth.

const CAPACITY: usize = 8;
const MAX_FILE_LEN: usize = 32;

/// The category of a recorded error.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// A required pointer/handle was null or otherwise absent.
    NullPointer,
    /// An index or length fell outside its valid range.
    OutOfBounds,
    /// The scheme's dispatch row has no hook for the requested operation.
    InvalidFunctionCall,
    /// The feature was compiled out of this build.
    DisabledAtCompile,
    /// A rejection-sampling loop (BLISS-B signing, Dilithium signing, key inversion retries)
    /// exhausted its retry budget without producing an acceptable sample.
    RejectionLimitExceeded,
    /// A candidate key polynomial had no modular inverse after every retry.
    InvertibilityFailed,
    /// A `MakeHint`/`UseHint` pass produced more non-zero hint bits than the scheme allows.
    HintWeightOverflow,
    /// An operation was attempted before `set_scratch`/internal allocation made the
    /// scratch buffer ready.
    ScratchNotReady,
    /// Catch-all for scheme-specific failures not covered by a dedicated variant.
    General,
}

impl core::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let msg = match self {
            Self::NullPointer => "null pointer or handle",
            Self::OutOfBounds => "index or length out of bounds",
            Self::InvalidFunctionCall => "operation not supported by this scheme",
            Self::DisabledAtCompile => "feature disabled at compile time",
            Self::RejectionLimitExceeded => "rejection sampling retry limit exceeded",
            Self::InvertibilityFailed => "key polynomial has no modular inverse",
            Self::HintWeightOverflow => "hint vector exceeded its maximum weight",
            Self::ScratchNotReady => "scratch buffer not ready",
            Self::General => "scheme-specific failure",
        };
        f.write_str(msg)
    }
}

/// One recorded error: its kind plus a (truncated) source location.
#[derive(Clone, Copy, Debug)]
pub struct ErrorRecord {
    /// The category of failure.
    pub kind: ErrorKind,
    /// Truncated, NUL-terminated source file name.
    file: [u8; MAX_FILE_LEN],
    file_len: usize,
    /// Source line; always non-negative, matching the "negative line is invalid" rule.
    pub line: u32,
}

impl ErrorRecord {
    fn new(kind: ErrorKind, file: &str, line: u32) -> Self {
        let mut buf = [0u8; MAX_FILE_LEN];
        let bytes = file.as_bytes();
        let copy_len = bytes.len().min(MAX_FILE_LEN - 1); // keep room for the NUL
        buf[..copy_len].copy_from_slice(&bytes[..copy_len]);
        // buf[copy_len] stays 0, giving explicit NUL termination.
        Self { kind, file: buf, file_len: copy_len, line }
    }

    /// The (possibly truncated) file name, with the trailing NUL stripped.
    #[must_use]
    pub fn file(&self) -> &str {
        core::str::from_utf8(&self.file[..self.file_len]).unwrap_or("<invalid>")
    }
}

/// Fixed-capacity ring buffer of `(kind, file, line)` records, capacity 8, FIFO eviction
/// by discard-on-overflow (new pushes are dropped once full, not oldest entries).
#[derive(Clone, Copy, Debug, Default)]
pub struct ErrorQueue {
    entries: [Option<ErrorRecord>; CAPACITY],
    len: usize,
}

impl ErrorQueue {
    /// An empty queue.
    #[must_use]
    pub const fn new() -> Self { Self { entries: [None; CAPACITY], len: 0 } }

    /// Records an error. Silently discards if the queue is full, or if `line` doesn't
    /// fit a `u32` (the "negative line" case from the source contract).
    pub fn add_err_code(&mut self, kind: ErrorKind, file: &str, line: i64) {
        if self.len >= CAPACITY || line < 0 {
            return;
        }
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let line = line as u32;
        self.entries[self.len] = Some(ErrorRecord::new(kind, file, line));
        self.len += 1;
    }

    /// Returns the head of the queue without consuming it.
    #[must_use]
    pub fn peek_error(&self) -> Option<ErrorRecord> { self.entries[0] }

    /// Consumes and returns the head of the queue, shifting the remainder forward.
    pub fn get_error(&mut self) -> Option<ErrorRecord> {
        if self.len == 0 {
            return None;
        }
        let head = self.entries[0];
        for i in 1..self.len {
            self.entries[i - 1] = self.entries[i];
        }
        self.entries[self.len - 1] = None;
        self.len -= 1;
        head
    }

    /// Discards every recorded entry.
    pub fn clear(&mut self) {
        self.entries = [None; CAPACITY];
        self.len = 0;
    }

    /// Number of entries currently recorded (0..=8).
    #[must_use]
    pub fn len(&self) -> usize { self.len }

    /// True when no errors are recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool { self.len == 0 }
}


#[cfg(test)]
mod tests {
    use super::{ErrorKind, ErrorQueue};

    #[test]
    fn overflow_keeps_first_eight_in_order() {
        let mut q = ErrorQueue::new();
        for i in 0..12u32 {
            q.add_err_code(ErrorKind::General, "f.rs", i64::from(i));
        }
        assert_eq!(q.len(), 8);
        for i in 0..8u32 {
            let rec = q.get_error().unwrap();
            assert_eq!(rec.line, i);
        }
        assert!(q.get_error().is_none());
    }

    #[test]
    fn negative_line_and_full_queue_are_silently_dropped() {
        let mut q = ErrorQueue::new();
        q.add_err_code(ErrorKind::General, "f.rs", -1);
        assert!(q.is_empty());
        for _ in 0..8 {
            q.add_err_code(ErrorKind::NullPointer, "f.rs", 1);
        }
        q.add_err_code(ErrorKind::NullPointer, "f.rs", 2);
        assert_eq!(q.len(), 8);
    }

    #[test]
    fn peek_does_not_consume() {
        let mut q = ErrorQueue::new();
        q.add_err_code(ErrorKind::OutOfBounds, "f.rs", 7);
        assert_eq!(q.peek_error().unwrap().line, 7);
        assert_eq!(q.peek_error().unwrap().line, 7);
        assert_eq!(q.get_error().unwrap().line, 7);
        assert!(q.peek_error().is_none());
    }

    #[test]
    fn long_filename_is_truncated_with_nul_termination() {
        let mut q = ErrorQueue::new();
        let long_name = "a_very_long_source_file_name_that_exceeds_the_cap.rs";
        q.add_err_code(ErrorKind::General, long_name, 1);
        let rec = q.peek_error().unwrap();
        assert!(rec.file().len() < long_name.len());
        assert!(long_name.starts_with(rec.file()));
    }
}
