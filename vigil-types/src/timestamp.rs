use serde::{Deserialize, Serialize};

/// Reserved time value indicating the time axis is absent.
pub const INVALID_TIME: f64 = -1e300;

/// Reserved frame number indicating the frame axis is absent.
pub const INVALID_FRAME_NUMBER: u32 = u32::MAX;

/// A position in a video stream along two independent, optionally-present
/// axes: a continuous time (microseconds by convention, unitless to this
/// type) and a discrete frame number.
///
/// Absent axes are sentineled by [INVALID_TIME] and [INVALID_FRAME_NUMBER]
/// rather than wrapped in `Option` so that a timestamp stays a flat `Copy`
/// value in frame metadata and on-disk indices. A timestamp is *valid* iff
/// at least one axis is present.
///
/// Ordering is exposed through [is_before](Timestamp::is_before) and
/// friends rather than `PartialOrd`: two timestamps compare on the time
/// axis when both carry one, otherwise on the frame axis when both carry
/// one, and otherwise every comparison returns `false`. That last case
/// makes axis-incompatible pairs "unordered-equal" to callers probing in
/// both directions, which is a long-standing documented quirk of this model
/// and is deliberately preserved rather than fixed. A lawful `PartialOrd`
/// cannot express it (equality on two wholly-invalid timestamps would have
/// to disagree with `partial_cmp`), hence named methods.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Timestamp {
    pub time: f64,
    pub frame_number: u32,
}

impl Default for Timestamp {
    fn default() -> Self {
        Self::invalid()
    }
}

impl Timestamp {
    /// Default tolerance, in time units, for [fuzzy_equals](Self::fuzzy_equals).
    pub const DEFAULT_FUZZY_TOLERANCE: f64 = 1e-5;

    /// A timestamp with both axes absent.
    pub fn invalid() -> Self {
        Self {
            time: INVALID_TIME,
            frame_number: INVALID_FRAME_NUMBER,
        }
    }

    pub fn from_time(time: f64) -> Self {
        Self {
            time,
            frame_number: INVALID_FRAME_NUMBER,
        }
    }

    pub fn from_frame_number(frame_number: u32) -> Self {
        Self {
            time: INVALID_TIME,
            frame_number,
        }
    }

    pub fn new(time: f64, frame_number: u32) -> Self {
        Self { time, frame_number }
    }

    pub fn has_time(&self) -> bool {
        self.time != INVALID_TIME
    }

    pub fn has_frame_number(&self) -> bool {
        self.frame_number != INVALID_FRAME_NUMBER
    }

    pub fn is_valid(&self) -> bool {
        self.has_time() || self.has_frame_number()
    }

    /// Strict ordering over the first axis both operands carry.
    ///
    /// Returns `false` when the operands share no valid axis.
    pub fn is_before(&self, other: &Timestamp) -> bool {
        if self.has_time() && other.has_time() {
            return self.time < other.time;
        }
        if self.has_frame_number() && other.has_frame_number() {
            return self.frame_number < other.frame_number;
        }
        false
    }

    /// Non-strict ordering; `false` when the operands share no valid axis.
    pub fn is_at_or_before(&self, other: &Timestamp) -> bool {
        if self.has_time() && other.has_time() {
            return self.time <= other.time;
        }
        if self.has_frame_number() && other.has_frame_number() {
            return self.frame_number <= other.frame_number;
        }
        false
    }

    pub fn is_after(&self, other: &Timestamp) -> bool {
        other.is_before(self)
    }

    pub fn is_at_or_after(&self, other: &Timestamp) -> bool {
        other.is_at_or_before(self)
    }

    /// Axis-wise difference, used for nearest-seek distance comparison.
    ///
    /// The time axis is subtracted when both operands carry one. The frame
    /// axis is subtracted only when `self.frame_number > other.frame_number`
    /// (the axis is unsigned); otherwise it is left absent.
    pub fn diff(&self, other: &Timestamp) -> Timestamp {
        let mut result = Timestamp::invalid();
        if self.has_time() && other.has_time() {
            result.time = self.time - other.time;
        }
        if self.has_frame_number() && self.frame_number > other.frame_number {
            result.frame_number = self.frame_number - other.frame_number;
        }
        result
    }

    /// Equality with [DEFAULT_FUZZY_TOLERANCE](Self::DEFAULT_FUZZY_TOLERANCE)
    /// on the time axis.
    pub fn fuzzy_equals(&self, other: &Timestamp) -> bool {
        self.fuzzy_equals_with(other, Self::DEFAULT_FUZZY_TOLERANCE)
    }

    /// Equality with a caller-supplied tolerance on the time axis.
    ///
    /// When both operands also carry frame numbers, those must match
    /// exactly. Without a shared time axis this falls back to exact
    /// frame-number comparison.
    pub fn fuzzy_equals_with(&self, other: &Timestamp, tolerance: f64) -> bool {
        if self.has_time() && other.has_time() {
            if (self.time - other.time).abs() >= tolerance {
                return false;
            }
            if self.has_frame_number() && other.has_frame_number() {
                return self.frame_number == other.frame_number;
            }
            true
        } else if self.has_frame_number() && other.has_frame_number() {
            self.frame_number == other.frame_number
        } else {
            false
        }
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (self.has_time(), self.has_frame_number()) {
            (true, true) => write!(f, "t={:.6} f={}", self.time, self.frame_number),
            (true, false) => write!(f, "t={:.6}", self.time),
            (false, true) => write!(f, "f={}", self.frame_number),
            (false, false) => write!(f, "(invalid)"),
        }
    }
}
