/// Virtual time in milliseconds.
///
/// Timers and request orchestration are driven by explicit timestamps rather
/// than a wall clock so they can be replayed in tests.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Millis(pub u64);

impl Millis {
    pub const ZERO: Millis = Millis(0);

    pub fn after(self, delay_ms: u64) -> Self {
        Millis(self.0.saturating_add(delay_ms))
    }

    /// Milliseconds from `self` until `later`, zero if `later` is in the past.
    pub fn until(self, later: Millis) -> u64 {
        later.0.saturating_sub(self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::Millis;

    #[test]
    fn after_saturates() {
        assert_eq!(Millis(10).after(5), Millis(15));
        assert_eq!(Millis(u64::MAX).after(1), Millis(u64::MAX));
    }

    #[test]
    fn until_never_goes_negative() {
        assert_eq!(Millis(10).until(Millis(25)), 15);
        assert_eq!(Millis(25).until(Millis(10)), 0);
    }
}
