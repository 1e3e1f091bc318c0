use std::time::{Duration, Instant};

pub const TYPING_QUIET_PERIOD: Duration = Duration::from_millis(1500);

/// The "is typing" flag with a single pending flip back to false.
///
/// Every edit raises the flag and replaces the pending deadline; the flag
/// drops only once a full quiet period has passed since the latest edit.
#[derive(Debug, Clone)]
pub struct TypingDebounce {
    quiet: Duration,
    is_typing: bool,
    deadline: Option<Instant>,
}

impl Default for TypingDebounce {
    fn default() -> Self {
        Self::new(TYPING_QUIET_PERIOD)
    }
}

impl TypingDebounce {
    pub fn new(quiet: Duration) -> Self {
        Self {
            quiet,
            is_typing: false,
            deadline: None,
        }
    }

    pub fn is_typing(&self) -> bool {
        self.is_typing
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn on_edit(&mut self, now: Instant) {
        self.is_typing = true;
        self.deadline = Some(now + self.quiet);
    }

    /// Fires the pending flip when its deadline has passed. Returns whether
    /// `is_typing` changed.
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                let changed = self.is_typing;
                self.is_typing = false;
                changed
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use super::{TypingDebounce, TYPING_QUIET_PERIOD};

    fn ms(value: u64) -> Duration {
        Duration::from_millis(value)
    }

    #[test]
    fn burst_of_edits_flips_back_once_from_the_last_edit() {
        let start = Instant::now();
        let mut typing = TypingDebounce::default();
        assert!(!typing.is_typing());

        for offset in [0, 400, 900, 1300] {
            typing.on_edit(start + ms(offset));
            assert!(typing.is_typing());
        }

        let mut transitions = 0;
        let mut flipped_at = None;
        for tick in (0..=4000).step_by(50) {
            if typing.poll(start + ms(tick)) {
                transitions += 1;
                flipped_at = Some(tick);
            }
        }
        assert_eq!(transitions, 1);
        assert_eq!(flipped_at, Some(1300 + 1500));
        assert!(!typing.is_typing());
        assert_eq!(typing.deadline(), None);
        assert_eq!(TYPING_QUIET_PERIOD, ms(1500));
    }

    #[test]
    fn poll_before_deadline_keeps_typing() {
        let start = Instant::now();
        let mut typing = TypingDebounce::new(ms(100));
        typing.on_edit(start);
        assert!(!typing.poll(start + ms(99)));
        assert!(typing.is_typing());
        assert!(typing.poll(start + ms(100)));
    }
}
