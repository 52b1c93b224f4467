//! The poll/debounce/cooldown loop.
//!
//! Checks the event page every poll interval. Two consecutive over-threshold
//! observations ("strikes") trigger one alert followed by a cooldown sleep so
//! the chat is not flooded while staff react. Both sleeps abort early on the
//! shutdown flag, and a liveness marker in the state store brackets the run
//! for external monitors.

mod shutdown;

pub use shutdown::ShutdownFlag;

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info};

use crate::alerts::AlertChannel;
use crate::config::{Config, COOLDOWN, POLL_INTERVAL, TRIGGER_STRIKES};
use crate::monitors::{EventSnapshot, EventSource};
use crate::store::StateStore;

/// State-store key the liveness flag lives under.
pub const RUNNING_KEY: &str = "is_running";

/// Everything the loop needs to make decisions, detached from [`Config`] so
/// tests can shrink the waits.
#[derive(Debug, Clone)]
pub struct WatchSettings {
    pub page_url: String,
    pub max_count: usize,
    pub max_delay_minutes: u64,
    pub poll_interval: Duration,
    pub cooldown: Duration,
    pub trigger_strikes: u32,
}

impl WatchSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            page_url: config.url.clone(),
            max_count: config.max_count,
            max_delay_minutes: config.max_delay_minutes,
            poll_interval: POLL_INTERVAL,
            cooldown: COOLDOWN,
            trigger_strikes: TRIGGER_STRIKES,
        }
    }

    /// Threshold test; hitting either limit exactly counts as exceeding.
    fn exceeds(&self, snapshot: &EventSnapshot) -> bool {
        snapshot.count >= self.max_count || snapshot.staleness_minutes >= self.max_delay_minutes
    }
}

pub struct Watcher<'a, S, C> {
    source: S,
    channel: C,
    store: &'a StateStore,
    stop: Arc<ShutdownFlag>,
    settings: WatchSettings,
}

impl<'a, S: EventSource, C: AlertChannel> Watcher<'a, S, C> {
    pub fn new(
        source: S,
        channel: C,
        store: &'a StateStore,
        stop: Arc<ShutdownFlag>,
        settings: WatchSettings,
    ) -> Self {
        Self {
            source,
            channel,
            store,
            stop,
            settings,
        }
    }

    /// Run until the shutdown flag is raised.
    pub fn run(&mut self) {
        self.store.set_parameter(RUNNING_KEY, "true");
        let mut strikes = 0u32;
        loop {
            let snapshot = self.source.check();
            if self.settings.exceeds(&snapshot) {
                strikes += 1;
                debug!(
                    "threshold exceeded ({} events, {} min stale), strike {strikes}",
                    snapshot.count, snapshot.staleness_minutes
                );
            } else {
                strikes = 0;
            }
            if strikes >= self.settings.trigger_strikes {
                strikes = 0;
                self.alert();
                // Cooldown; a shutdown request still cuts it short.
                self.stop.wait_timeout(self.settings.cooldown);
            }
            if self.stop.is_set() || self.stop.wait_timeout(self.settings.poll_interval) {
                break;
            }
        }
        self.store.set_parameter(RUNNING_KEY, "false");
        info!("boardwatch terminated");
    }

    fn alert(&self) {
        let text = format!("Response needed:\n{}", self.settings.page_url);
        info!("alerting chat about {}", self.settings.page_url);
        if let Err(e) = self.channel.send(&text) {
            error!("{e:#}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::time::Instant;

    const URL: &str = "http://events.internal/list";

    fn settings() -> WatchSettings {
        WatchSettings {
            page_url: URL.to_string(),
            max_count: 6,
            max_delay_minutes: 10,
            poll_interval: Duration::from_millis(1),
            cooldown: Duration::from_millis(1),
            trigger_strikes: 2,
        }
    }

    fn busy() -> EventSnapshot {
        EventSnapshot {
            count: 7,
            staleness_minutes: 12,
        }
    }

    /// Replays a fixed sequence of observations, then (optionally) raises the
    /// shutdown flag so the loop ends after the last one.
    struct ScriptedSource {
        script: VecDeque<EventSnapshot>,
        stop: Arc<ShutdownFlag>,
        stop_when_exhausted: bool,
    }

    impl ScriptedSource {
        fn new(script: &[EventSnapshot], stop: Arc<ShutdownFlag>) -> Self {
            Self {
                script: script.iter().copied().collect(),
                stop,
                stop_when_exhausted: true,
            }
        }
    }

    impl EventSource for ScriptedSource {
        fn check(&mut self) -> EventSnapshot {
            let snapshot = self.script.pop_front().unwrap_or_default();
            if self.script.is_empty() && self.stop_when_exhausted {
                self.stop.set();
            }
            snapshot
        }
    }

    #[derive(Clone, Default)]
    struct RecordingChannel {
        sent: Arc<Mutex<Vec<String>>>,
    }

    impl AlertChannel for RecordingChannel {
        fn send(&self, message: &str) -> anyhow::Result<()> {
            self.sent.lock().unwrap().push(message.to_string());
            Ok(())
        }
    }

    fn run_script(script: &[EventSnapshot]) -> Vec<String> {
        let store = StateStore::open(":memory:").unwrap();
        let stop = Arc::new(ShutdownFlag::new());
        let channel = RecordingChannel::default();
        let sent = channel.sent.clone();
        let source = ScriptedSource::new(script, stop.clone());

        Watcher::new(source, channel, &store, stop, settings()).run();

        let sent = sent.lock().unwrap();
        sent.clone()
    }

    #[test]
    fn test_single_strike_does_not_alert() {
        let sent = run_script(&[busy(), EventSnapshot::quiet()]);
        assert!(sent.is_empty());
    }

    #[test]
    fn test_quiet_cycle_resets_the_count() {
        let sent = run_script(&[busy(), EventSnapshot::quiet(), busy()]);
        assert!(sent.is_empty());
    }

    #[test]
    fn test_two_strikes_alert_once_with_url() {
        let sent = run_script(&[busy(), busy()]);
        assert_eq!(sent.len(), 1);
        assert!(sent[0].contains(URL));
    }

    #[test]
    fn test_alert_resets_the_count() {
        // Four straight strikes fire on the second and the fourth.
        let sent = run_script(&[busy(), busy(), busy(), busy()]);
        assert_eq!(sent.len(), 2);
    }

    #[test]
    fn test_threshold_boundary_counts_as_exceeding() {
        let exactly_six = EventSnapshot {
            count: 6,
            staleness_minutes: 0,
        };
        let exactly_ten_min = EventSnapshot {
            count: 0,
            staleness_minutes: 10,
        };
        assert!(settings().exceeds(&exactly_six));
        assert!(settings().exceeds(&exactly_ten_min));
        assert!(!settings().exceeds(&EventSnapshot {
            count: 5,
            staleness_minutes: 9,
        }));

        let sent = run_script(&[exactly_six, exactly_ten_min]);
        assert_eq!(sent.len(), 1);
    }

    #[test]
    fn test_liveness_flag_brackets_the_run() {
        /// Asserts the flag reads "true" while the loop is live.
        struct LivenessProbe<'a> {
            store: &'a StateStore,
            stop: Arc<ShutdownFlag>,
        }

        impl EventSource for LivenessProbe<'_> {
            fn check(&mut self) -> EventSnapshot {
                assert_eq!(
                    self.store.get_parameter(RUNNING_KEY).unwrap().as_deref(),
                    Some("true")
                );
                self.stop.set();
                EventSnapshot::quiet()
            }
        }

        let store = StateStore::open(":memory:").unwrap();
        let stop = Arc::new(ShutdownFlag::new());
        let source = LivenessProbe {
            store: &store,
            stop: stop.clone(),
        };

        Watcher::new(source, RecordingChannel::default(), &store, stop, settings()).run();

        assert_eq!(
            store.get_parameter(RUNNING_KEY).unwrap().as_deref(),
            Some("false")
        );
    }

    #[test]
    fn test_shutdown_cuts_the_cooldown_short() {
        let store = StateStore::open(":memory:").unwrap();
        let stop = Arc::new(ShutdownFlag::new());
        let channel = RecordingChannel::default();
        let sent = channel.sent.clone();

        let mut source = ScriptedSource::new(&[busy(), busy()], stop.clone());
        source.stop_when_exhausted = false;

        let mut settings = settings();
        settings.cooldown = Duration::from_secs(60);

        let setter = {
            let stop = stop.clone();
            std::thread::spawn(move || {
                std::thread::sleep(Duration::from_millis(50));
                stop.set();
            })
        };

        let start = Instant::now();
        Watcher::new(source, channel, &store, stop, settings).run();

        // The loop exited inside the 60 s cooldown, not after it.
        assert!(start.elapsed() < Duration::from_secs(10));
        assert_eq!(sent.lock().unwrap().len(), 1);
        setter.join().unwrap();
    }
}
