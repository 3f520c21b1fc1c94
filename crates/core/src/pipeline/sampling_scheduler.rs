/// Whether the frame at `frame_index` is due for analysis.
pub fn should_sample(frame_index: u64, period: u64) -> bool {
    period != 0 && frame_index % period == 0
}

/// Picks every Nth frame for analysis; frames in between reuse the cache.
///
/// Frame indices start at 1, so the first analyzed frame is frame `period`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SamplingScheduler {
    period: u64,
}

impl SamplingScheduler {
    pub fn new(period: u64) -> Result<Self, &'static str> {
        if period < 1 {
            return Err("sampling period must be >= 1");
        }
        Ok(Self { period })
    }

    pub fn period(&self) -> u64 {
        self.period
    }

    pub fn is_due(&self, frame_index: u64) -> bool {
        should_sample(frame_index, self.period)
    }
}
