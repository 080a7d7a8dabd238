//! Overlay lifecycle: inventory refresh polling and delayed visits
//!
//! The session is driven by the caller's clock. `tick` returns the events
//! that are due at `now`; nothing fires between `stop` and the next `start`.

use std::time::{Duration, Instant};

use tracing::debug;

use crate::models::OtherPlayer;

/// How often the dirty inventory flag is checked.
pub const POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Delay between a visit notification and showing the other city.
pub const OTHER_PLAYER_DELAY: Duration = Duration::from_millis(200);

#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// Re-run the inventory resolution pass.
    RefreshInventory,
    /// Switch the display to a visited player's city.
    ShowOther(OtherPlayer),
}

#[derive(Debug, Default)]
pub struct Session {
    running: bool,
    dirty: bool,
    showing_other: bool,
    next_poll: Option<Instant>,
    pending_visit: Option<(Instant, OtherPlayer)>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start polling. The first poll refreshes the inventory.
    pub fn start(&mut self, now: Instant) {
        self.running = true;
        self.dirty = true;
        self.showing_other = false;
        self.next_poll = Some(now + POLL_INTERVAL);
        debug!("session started");
    }

    /// Stop polling and discard any pending visit.
    pub fn stop(&mut self) {
        self.running = false;
        self.next_poll = None;
        if self.pending_visit.take().is_some() {
            debug!("pending visit discarded");
        }
        debug!("session stopped");
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn is_showing_other(&self) -> bool {
        self.showing_other
    }

    /// The inventory changed in the game.
    pub fn mark_inventory_dirty(&mut self) {
        if self.running {
            self.dirty = true;
        }
    }

    /// Another player's city was opened; it is shown after a short delay.
    pub fn on_visit_player(&mut self, visit: OtherPlayer, now: Instant) {
        if !self.running {
            debug!(player = %visit.name, "visit after stop dropped");
            return;
        }
        self.pending_visit = Some((now + OTHER_PLAYER_DELAY, visit));
    }

    /// Return to the own city.
    pub fn show_own(&mut self) {
        self.showing_other = false;
        self.dirty = true;
    }

    pub fn tick(&mut self, now: Instant) -> Vec<SessionEvent> {
        let mut events = Vec::new();
        if !self.running {
            return events;
        }

        if self.pending_visit.as_ref().is_some_and(|(due, _)| now >= *due) {
            if let Some((_, visit)) = self.pending_visit.take() {
                debug!(player = %visit.name, "showing visited city");
                self.showing_other = true;
                events.push(SessionEvent::ShowOther(visit));
            }
        }

        if self.next_poll.is_some_and(|due| now >= due) {
            self.next_poll = Some(now + POLL_INTERVAL);
            if self.dirty && !self.showing_other {
                self.dirty = false;
                events.push(SessionEvent::RefreshInventory);
            }
        }

        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn visit(name: &str) -> OtherPlayer {
        OtherPlayer {
            name: name.to_string(),
            era: "IronAge".to_string(),
            city: Vec::new(),
        }
    }

    fn refreshes(events: &[SessionEvent]) -> usize {
        events
            .iter()
            .filter(|e| matches!(e, SessionEvent::RefreshInventory))
            .count()
    }

    #[test]
    fn refresh_only_on_poll_when_dirty() {
        let t0 = Instant::now();
        let mut session = Session::new();
        session.start(t0);

        assert!(session.tick(t0 + Duration::from_millis(500)).is_empty());
        assert_eq!(refreshes(&session.tick(t0 + POLL_INTERVAL)), 1);

        session.mark_inventory_dirty();
        session.mark_inventory_dirty();
        assert_eq!(refreshes(&session.tick(t0 + Duration::from_millis(1500))), 0);
        assert_eq!(refreshes(&session.tick(t0 + 2 * POLL_INTERVAL)), 1);
        assert_eq!(refreshes(&session.tick(t0 + 3 * POLL_INTERVAL)), 0);
    }

    #[test]
    fn visit_is_delayed_and_suppresses_refresh() {
        let t0 = Instant::now();
        let mut session = Session::new();
        session.start(t0);
        session.on_visit_player(visit("them"), t0);

        assert!(session.tick(t0 + Duration::from_millis(100)).is_empty());
        let events = session.tick(t0 + OTHER_PLAYER_DELAY);
        assert!(matches!(&events[..], [SessionEvent::ShowOther(v)] if v.name == "them"));
        assert!(session.is_showing_other());

        session.mark_inventory_dirty();
        assert_eq!(refreshes(&session.tick(t0 + POLL_INTERVAL)), 0);

        session.show_own();
        assert_eq!(refreshes(&session.tick(t0 + 2 * POLL_INTERVAL)), 1);
    }

    #[test]
    fn stopped_session_is_silent() {
        let t0 = Instant::now();
        let mut session = Session::new();
        session.start(t0);
        session.on_visit_player(visit("pending"), t0);
        session.stop();

        session.on_visit_player(visit("late"), t0);
        session.mark_inventory_dirty();
        assert!(session.tick(t0 + 5 * POLL_INTERVAL).is_empty());

        session.start(t0 + 5 * POLL_INTERVAL);
        let events = session.tick(t0 + 6 * POLL_INTERVAL);
        assert_eq!(events.len(), 1);
        assert_eq!(refreshes(&events), 1);
    }
}
