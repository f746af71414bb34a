/// Actions waiting on the autopilot's clock. Superseding behaviour cancels
/// entries outright instead of letting stale ones fire later.
#[derive(Debug, Clone)]
pub struct ScheduledActions<A> {
    entries: Vec<Scheduled<A>>,
    next_seq: u64,
}

#[derive(Debug, Clone)]
struct Scheduled<A> {
    due: f64,
    seq: u64,
    action: A,
}

impl<A> Default for ScheduledActions<A> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            next_seq: 0,
        }
    }
}

impl<A> ScheduledActions<A> {
    pub fn schedule(&mut self, now: f64, delay: f32, action: A) {
        self.entries.push(Scheduled {
            due: now + f64::from(delay.max(0.0)),
            seq: self.next_seq,
            action,
        });
        self.next_seq += 1;
    }

    pub fn cancel_all(&mut self) {
        self.entries.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Removes and returns everything due by `now`, earliest first, ties in scheduling order
    pub fn take_due(&mut self, now: f64) -> Vec<A> {
        let (mut due, pending): (Vec<_>, Vec<_>) =
            self.entries.drain(..).partition(|entry| entry.due <= now);
        self.entries = pending;
        due.sort_by(|a, b| a.due.total_cmp(&b.due).then(a.seq.cmp(&b.seq)));
        due.into_iter().map(|entry| entry.action).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_due_actions_come_out_in_order() {
        let mut actions = ScheduledActions::default();
        actions.schedule(0.0, 3.0, "late");
        actions.schedule(0.0, 1.0, "early");
        actions.schedule(0.0, 1.0, "early-second");

        assert!(actions.take_due(0.5).is_empty());
        assert_eq!(actions.take_due(2.0), vec!["early", "early-second"]);
        assert!(!actions.is_empty());
        assert_eq!(actions.take_due(3.0), vec!["late"]);
        assert!(actions.is_empty());
    }

    #[test]
    fn test_cancel_drops_everything() {
        let mut actions = ScheduledActions::default();
        actions.schedule(1.0, 1.0, 1);
        actions.schedule(1.0, 5.0, 2);
        actions.cancel_all();
        assert!(actions.take_due(100.0).is_empty());
    }

    #[test]
    fn test_due_times_hold_late_in_a_session() {
        let mut actions = ScheduledActions::default();
        let now = 10_000_000.0;
        actions.schedule(now, 0.25, "late");
        assert!(actions.take_due(now + 0.2).is_empty());
        assert_eq!(actions.take_due(now + 0.25), vec!["late"]);
    }
}
