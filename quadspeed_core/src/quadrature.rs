//! Quadrature transition decoding.

/// Two-channel level pair encoded as `A << 1 | B`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct QuadratureState(u8);

impl QuadratureState {
    pub const fn from_levels(a: bool, b: bool) -> Self {
        Self(((a as u8) << 1) | b as u8)
    }

    /// Low two bits of `bits`; higher bits are ignored.
    pub const fn from_bits(bits: u8) -> Self {
        Self(bits & 0b11)
    }

    pub const fn bits(self) -> u8 {
        self.0
    }

    pub const fn levels(self) -> (bool, bool) {
        (self.0 & 0b10 != 0, self.0 & 0b01 != 0)
    }
}

/// Vote per `(previous, new)` pair, rows indexed by previous state.
///
/// Forward is 11 -> 01 -> 00 -> 10 -> 11; unchanged and two-step jumps vote 0.
const TRANSITIONS: [[i8; 4]; 4] = [
    [0, -1, 1, 0],
    [1, 0, 0, -1],
    [-1, 0, 0, 1],
    [0, 1, -1, 0],
];

#[inline]
pub const fn decode(previous: QuadratureState, new: QuadratureState) -> i8 {
    TRANSITIONS[previous.0 as usize][new.0 as usize]
}
