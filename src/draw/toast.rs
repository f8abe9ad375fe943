use std::time::{Duration, Instant};

/// Transient notification that hides itself once its deadline passes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    duration: Duration,
    deadline: Option<Instant>,
}

impl Toast {
    pub fn new(duration: Duration) -> Self {
        Self {
            duration,
            deadline: None,
        }
    }

    pub fn show(&mut self, now: Instant) {
        self.deadline = Some(now + self.duration);
    }

    pub fn is_visible(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Hides an expired toast. Returns true when visibility changed.
    pub fn tick(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toast_hides_at_deadline() {
        let start = Instant::now();
        let mut toast = Toast::new(Duration::from_millis(2000));
        assert!(!toast.is_visible());

        toast.show(start);
        assert!(toast.is_visible());
        assert!(!toast.tick(start + Duration::from_millis(1999)));
        assert!(toast.is_visible());
        assert!(toast.tick(start + Duration::from_millis(2000)));
        assert!(!toast.is_visible());
        assert!(!toast.tick(start + Duration::from_millis(5000)));
    }

    #[test]
    fn showing_again_extends_the_deadline() {
        let start = Instant::now();
        let mut toast = Toast::new(Duration::from_millis(100));
        toast.show(start);
        toast.show(start + Duration::from_millis(80));
        assert!(!toast.tick(start + Duration::from_millis(150)));
        assert!(toast.tick(start + Duration::from_millis(180)));
    }
}
