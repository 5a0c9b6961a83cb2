//! Fixed-depth smoothing.

/// Depth of the published speed average.
pub const SPEED_FILTER_DEPTH: usize = 8;
/// Depth of the published RPM average.
pub const RPM_FILTER_DEPTH: usize = 4;

/// Ring-buffer moving average over the last `N` samples.
///
/// Until `N` samples have been pushed the average covers only the samples
/// seen so far.
#[derive(Debug, Clone)]
pub struct MovingAverage<const N: usize> {
    buf: [f32; N],
    head: usize,
    filled: usize,
}

impl<const N: usize> Default for MovingAverage<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> MovingAverage<N> {
    pub const fn new() -> Self {
        Self {
            buf: [0.0; N],
            head: 0,
            filled: 0,
        }
    }

    #[inline]
    pub fn push(&mut self, value: f32) {
        if N == 0 {
            return;
        }
        self.buf[self.head] = value;
        self.head = (self.head + 1) % N;
        if self.filled < N {
            self.filled += 1;
        }
    }

    /// Mean of the valid samples; 0.0 when empty.
    #[inline]
    pub fn average(&self) -> f32 {
        if self.filled == 0 {
            return 0.0;
        }
        let sum: f32 = self.buf[..self.filled.min(N)].iter().sum();
        sum / self.filled as f32
    }

    pub fn reset(&mut self) {
        self.buf = [0.0; N];
        self.head = 0;
        self.filled = 0;
    }

    pub fn len(&self) -> usize {
        self.filled
    }

    pub fn is_empty(&self) -> bool {
        self.filled == 0
    }

    pub const fn capacity(&self) -> usize {
        N
    }
}
