//! Person presence from the skeleton stream.
//!
//! The stream only delivers frames while someone is tracked, so presence
//! is inferred from when a head was last seen.  Callers pass timestamps
//! in; the monitor never reads a clock.

use tracing::info;

#[derive(Debug, Clone, PartialEq)]
pub struct PresenceConfig {
    /// Time without a head after which the person is considered gone.
    pub lookup_interval_ms: u64,
}

impl Default for PresenceConfig {
    fn default() -> Self {
        Self {
            lookup_interval_ms: 1000,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresenceEvent {
    Entered,
    Left,
}

impl PresenceEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Entered => "entered",
            Self::Left => "left",
        }
    }
}

#[derive(Debug, Clone)]
pub struct PresenceMonitor {
    pub config: PresenceConfig,
    present: bool,
    last_seen_ms: Option<u64>,
}

impl Default for PresenceMonitor {
    fn default() -> Self {
        Self::new(PresenceConfig::default())
    }
}

impl PresenceMonitor {
    pub fn new(config: PresenceConfig) -> Self {
        Self {
            config,
            present: false,
            last_seen_ms: None,
        }
    }

    pub fn is_present(&self) -> bool {
        self.present
    }

    /// Record one instant.  `has_head` is whether a head was tracked at
    /// `now_ms`; call it with `false` on a timer tick with no frame.
    pub fn observe(&mut self, has_head: bool, now_ms: u64) -> Option<PresenceEvent> {
        if has_head {
            self.last_seen_ms = Some(now_ms);
            if !self.present {
                self.present = true;
                info!(time_ms = now_ms, "presence: person entered");
                return Some(PresenceEvent::Entered);
            }
            return None;
        }

        let gone = self
            .last_seen_ms
            .map_or(true, |seen| now_ms.saturating_sub(seen) > self.config.lookup_interval_ms);
        if self.present && gone {
            self.present = false;
            info!(time_ms = now_ms, "presence: person left");
            return Some(PresenceEvent::Left);
        }
        None
    }
}
