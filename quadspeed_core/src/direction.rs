use quadspeed_traits::Direction;

/// Turns the clamped vote accumulator into a stable direction.
///
/// The published direction changes only once the votes leave the
/// `[-threshold, +threshold]` band; inside it the previous answer stands.
#[derive(Debug, Clone)]
pub struct DirectionResolver {
    threshold: i32,
    current: Direction,
}

impl DirectionResolver {
    pub fn new(threshold: i32) -> Self {
        Self {
            threshold: threshold.max(0),
            current: Direction::Stopped,
        }
    }

    pub fn resolve(&mut self, votes: i32) -> Direction {
        if votes > self.threshold {
            self.current = Direction::Forward;
        } else if votes < -self.threshold {
            self.current = Direction::Reverse;
        }
        self.current
    }

    pub fn force_stopped(&mut self) {
        self.current = Direction::Stopped;
    }

    pub fn current(&self) -> Direction {
        self.current
    }
}
