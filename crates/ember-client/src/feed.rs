//! Bounded in-memory chat feed.
//!
//! Owns the most recent messages for one view: dedup against the visible
//! window, FIFO eviction past capacity, transient "new message" highlight
//! markers, and the scroll policy. Time is injected through [`Clock`] so the
//! highlight expiry is testable without real delays.

use ember_common::ChatMessage;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Messages kept client-side; older ones drop out of memory, not storage.
pub const WINDOW_CAPACITY: usize = 20;

/// A live append auto-scrolls only when the viewport was already this close
/// to the bottom, so a reader scrolled back into history is not yanked down.
pub const AUTO_SCROLL_THRESHOLD_PX: f64 = 100.0;

/// How long a freshly appended message keeps its highlight.
pub const HIGHLIGHT_TTL: Duration = Duration::from_millis(1000);

pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// What the view should do with its viewport after a store operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollCue {
    /// Leave the viewport alone.
    Stay,
    /// One-time instant jump to the bottom, after the initial history load.
    Jump,
    /// Animated scroll to the bottom for a live append near the bottom.
    Smooth,
}

pub struct ChatFeed {
    window: VecDeque<ChatMessage>,
    capacity: usize,
    /// message id -> highlight expiry.
    highlights: HashMap<String, Instant>,
    highlight_ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl Default for ChatFeed {
    fn default() -> Self {
        Self::new()
    }
}

impl ChatFeed {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            window: VecDeque::new(),
            capacity: WINDOW_CAPACITY,
            highlights: HashMap::new(),
            highlight_ttl: HIGHLIGHT_TTL,
            clock,
        }
    }

    /// Install the initial history window (oldest-first input, trimmed to
    /// capacity). Returns the one-time non-animated jump cue. Nothing in the
    /// history is marked as new.
    pub fn load_history(&mut self, messages: Vec<ChatMessage>) -> ScrollCue {
        self.window.clear();
        self.highlights.clear();
        let skip = messages.len().saturating_sub(self.capacity);
        self.window.extend(messages.into_iter().skip(skip));
        ScrollCue::Jump
    }

    /// Append a live message unless the window already holds it (same `id`
    /// or cross-matching upstream id). `bottom_distance_px` is the viewport's
    /// distance from the bottom at append time.
    pub fn append_if_new(&mut self, message: ChatMessage, bottom_distance_px: f64) -> ScrollCue {
        self.prune_highlights();
        if self.window.iter().any(|m| m.matches(&message)) {
            return ScrollCue::Stay;
        }

        self.highlights
            .insert(message.id.clone(), self.clock.now() + self.highlight_ttl);
        self.window.push_back(message);
        while self.window.len() > self.capacity {
            if let Some(evicted) = self.window.pop_front() {
                self.highlights.remove(&evicted.id);
            }
        }

        if bottom_distance_px < AUTO_SCROLL_THRESHOLD_PX {
            ScrollCue::Smooth
        } else {
            ScrollCue::Stay
        }
    }

    /// Whether the message still carries its transient highlight.
    pub fn is_new(&self, id: &str) -> bool {
        self.highlights
            .get(id)
            .map(|expiry| *expiry > self.clock.now())
            .unwrap_or(false)
    }

    pub fn messages(&self) -> impl Iterator<Item = &ChatMessage> {
        self.window.iter()
    }

    pub fn len(&self) -> usize {
        self.window.len()
    }

    pub fn is_empty(&self) -> bool {
        self.window.is_empty()
    }

    fn prune_highlights(&mut self) {
        let now = self.clock.now();
        self.highlights.retain(|_, expiry| *expiry > now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    /// Clock whose `now` only moves when the test advances it.
    struct ManualClock {
        now: Mutex<Instant>,
    }

    impl ManualClock {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                now: Mutex::new(Instant::now()),
            })
        }

        fn advance(&self, by: Duration) {
            let mut now = self.now.lock();
            *now += by;
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> Instant {
            *self.now.lock()
        }
    }

    fn msg(id: &str) -> ChatMessage {
        ChatMessage::new("steve").with_id(id).with_content("hello")
    }

    const AT_BOTTOM: f64 = 0.0;

    #[test]
    fn duplicate_ids_grow_window_by_at_most_one() {
        let mut feed = ChatFeed::new();
        feed.append_if_new(msg("a"), AT_BOTTOM);
        feed.append_if_new(msg("a"), AT_BOTTOM);
        assert_eq!(feed.len(), 1);

        // Bridged echo of an optimistic local send: different id, upstream
        // id pointing at the one we already rendered.
        feed.append_if_new(msg("echo").with_upstream_id("a"), AT_BOTTOM);
        assert_eq!(feed.len(), 1);
    }

    #[test]
    fn window_keeps_newest_twenty_fifo() {
        let mut feed = ChatFeed::new();
        for i in 0..25 {
            feed.append_if_new(msg(&format!("m{i}")), AT_BOTTOM);
        }
        assert_eq!(feed.len(), WINDOW_CAPACITY);
        let ids: Vec<&str> = feed.messages().map(|m| m.id.as_str()).collect();
        assert_eq!(ids.first(), Some(&"m5"));
        assert_eq!(ids.last(), Some(&"m24"));
    }

    #[test]
    fn auto_scroll_only_near_the_bottom() {
        let mut feed = ChatFeed::new();
        assert_eq!(feed.append_if_new(msg("a"), 0.0), ScrollCue::Smooth);
        assert_eq!(feed.append_if_new(msg("b"), 99.9), ScrollCue::Smooth);
        // Threshold is exclusive: exactly 100px counts as scrolled away.
        assert_eq!(feed.append_if_new(msg("c"), 100.0), ScrollCue::Stay);
        assert_eq!(feed.append_if_new(msg("d"), 450.0), ScrollCue::Stay);
        // A duplicate never scrolls, wherever the viewport is.
        assert_eq!(feed.append_if_new(msg("a"), 0.0), ScrollCue::Stay);
    }

    #[test]
    fn history_load_jumps_once_and_trims() {
        let mut feed = ChatFeed::new();
        let history: Vec<ChatMessage> = (0..30).map(|i| msg(&format!("h{i}"))).collect();
        assert_eq!(feed.load_history(history), ScrollCue::Jump);
        assert_eq!(feed.len(), WINDOW_CAPACITY);
        let ids: Vec<&str> = feed.messages().map(|m| m.id.as_str()).collect();
        assert_eq!(ids.first(), Some(&"h10"));
        assert_eq!(ids.last(), Some(&"h29"));
        assert!(!feed.is_new("h29"));
    }

    #[test]
    fn highlight_expires_after_ttl() {
        let clock = ManualClock::new();
        let mut feed = ChatFeed::with_clock(clock.clone());

        feed.append_if_new(msg("a"), AT_BOTTOM);
        assert!(feed.is_new("a"));

        clock.advance(Duration::from_millis(999));
        assert!(feed.is_new("a"));

        clock.advance(Duration::from_millis(2));
        assert!(!feed.is_new("a"));
    }

    #[test]
    fn eviction_drops_the_highlight_with_the_message() {
        let clock = ManualClock::new();
        let mut feed = ChatFeed::with_clock(clock.clone());
        for i in 0..=WINDOW_CAPACITY {
            feed.append_if_new(msg(&format!("m{i}")), AT_BOTTOM);
        }
        assert!(!feed.is_new("m0"));
        assert!(feed.is_new(&format!("m{WINDOW_CAPACITY}")));
    }

    #[test]
    fn history_then_push_then_redelivery() {
        let mut feed = ChatFeed::new();
        feed.load_history(vec![msg("1"), msg("2")]);
        feed.append_if_new(msg("3"), AT_BOTTOM);

        let ids: Vec<&str> = feed.messages().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2", "3"]);

        // Redelivered frame must not re-append.
        feed.append_if_new(msg("1"), AT_BOTTOM);
        assert_eq!(feed.len(), 3);
    }
}
