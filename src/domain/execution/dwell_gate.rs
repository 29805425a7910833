/// Hides an instruction's advance control until a dwell time has elapsed.
///
/// The gate is driven by one-second ticks from the engine's timer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DwellGate {
    remaining_seconds: u32,
    show_timer: bool,
}

impl DwellGate {
    pub fn new(seconds: u32, show_timer: bool) -> Self {
        Self {
            remaining_seconds: seconds,
            show_timer,
        }
    }

    pub fn is_open(&self) -> bool {
        self.remaining_seconds == 0
    }

    pub fn remaining_seconds(&self) -> u32 {
        self.remaining_seconds
    }

    /// Counts down one second. Returns true when this tick opened the gate.
    pub fn tick(&mut self) -> bool {
        if self.remaining_seconds == 0 {
            return false;
        }
        self.remaining_seconds -= 1;
        self.remaining_seconds == 0
    }

    /// Countdown text while closed, only when the timer is shown.
    pub fn countdown_text(&self) -> Option<String> {
        (self.show_timer && !self.is_open()).then(|| {
            format!(
                "The button will appear in {} seconds...",
                self.remaining_seconds
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opens_after_the_configured_ticks() {
        let mut gate = DwellGate::new(3, true);
        assert!(!gate.tick());
        assert!(!gate.tick());
        assert!(gate.tick());
        assert!(gate.is_open());
        assert!(!gate.tick());
    }

    #[test]
    fn countdown_decrements_then_disappears() {
        let mut gate = DwellGate::new(2, true);
        assert_eq!(
            gate.countdown_text().as_deref(),
            Some("The button will appear in 2 seconds...")
        );
        gate.tick();
        assert_eq!(
            gate.countdown_text().as_deref(),
            Some("The button will appear in 1 seconds...")
        );
        gate.tick();
        assert_eq!(gate.countdown_text(), None);
    }

    #[test]
    fn silent_gate_has_no_countdown() {
        let gate = DwellGate::new(5, false);
        assert!(!gate.is_open());
        assert_eq!(gate.countdown_text(), None);
    }
}
