//! Poll scheduler: owns the timers; pollers never do.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use miotac_domain::entity::Entity;
use miotac_domain::event::{Event, EventType};
use miotac_domain::status::StatusSnapshot;

use crate::polling::coordinator::UpdateFailed;
use crate::polling::state::SnapshotReceiver;
use crate::ports::EventPublisher;

/// Something that fetches device status when the scheduler tells it to.
pub trait Poller: Send + Sync + 'static {
    fn name(&self) -> &str;

    /// Fetch once and update availability.
    fn poll(&self) -> impl Future<Output = Result<(), UpdateFailed>> + Send;

    fn is_available(&self) -> bool;

    fn current_snapshot(&self) -> Option<Arc<StatusSnapshot>>;

    /// Change notifications for snapshot and availability.
    fn subscribe(&self) -> SnapshotReceiver;
}

/// Background tasks of one device. Dropping the scheduler aborts them.
#[derive(Default)]
pub struct PollScheduler {
    tasks: Vec<JoinHandle<()>>,
}

impl PollScheduler {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Poll `poller` every `period`, starting one period from now.
    ///
    /// Ticks that fall due while a fetch is still running are delayed, so
    /// at most one fetch per poller is in flight.
    pub fn schedule<P: Poller>(&mut self, poller: Arc<P>, period: Duration) {
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                if let Err(error) = poller.poll().await {
                    tracing::debug!(poller = %poller.name(), error = %error, "scheduled poll failed");
                }
            }
        });
        self.tasks.push(handle);
    }

    /// Tie an already spawned task to this scheduler's lifetime.
    pub fn attach(&mut self, task: JoinHandle<()>) {
        self.tasks.push(task);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Abort every task.
    pub fn stop(&mut self) {
        for task in self.tasks.drain(..) {
            task.abort();
        }
    }
}

impl Drop for PollScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Publish entity state changes whenever `changes` fires.
///
/// `views` renders the current entities of one poller. Each notification is
/// diffed against the previous rendering (state, attributes and
/// availability; timestamps are ignored); every changed entity yields a
/// `state_changed` event, plus an `entity_unavailable` event when it just
/// lost availability.
pub fn spawn_state_publisher<P, F>(
    mut changes: SnapshotReceiver,
    publisher: P,
    views: F,
) -> JoinHandle<()>
where
    P: EventPublisher + Send + Sync + 'static,
    F: Fn() -> Vec<Entity> + Send + 'static,
{
    tokio::spawn(async move {
        let mut known: HashMap<String, Entity> = views()
            .into_iter()
            .map(|entity| (entity.entity_id.clone(), entity))
            .collect();
        while changes.changed().await.is_ok() {
            for entity in views() {
                let previous = known.get(&entity.entity_id);
                if previous.is_some_and(|previous| same_state(previous, &entity)) {
                    continue;
                }
                for event in state_events(previous, &entity) {
                    if let Err(error) = publisher.publish(event).await {
                        tracing::warn!(error = %error, "failed to publish state change");
                    }
                }
                known.insert(entity.entity_id.clone(), entity);
            }
        }
    })
}

fn same_state(a: &Entity, b: &Entity) -> bool {
    a.state == b.state && a.available == b.available && a.attributes == b.attributes
}

fn state_events(previous: Option<&Entity>, current: &Entity) -> Vec<Event> {
    let mut events = vec![Event::new(
        EventType::StateChanged,
        Some(current.entity_id.clone()),
        serde_json::json!({
            "old_state": previous.map(|p| p.state),
            "new_state": current.state,
            "attributes": current.attributes,
        }),
    )];
    if previous.is_some_and(|p| p.available) && !current.available {
        events.push(Event::new(
            EventType::EntityUnavailable,
            Some(current.entity_id.clone()),
            serde_json::json!({}),
        ));
    }
    events
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use miotac_domain::entity::EntityState;
    use tokio::sync::broadcast::error::TryRecvError;

    use super::*;
    use crate::event_bus::InProcessEventBus;
    use crate::polling::state::PolledState;

    struct CountingPoller {
        polls: AtomicUsize,
        state: PolledState,
    }

    impl CountingPoller {
        fn new() -> Self {
            Self {
                polls: AtomicUsize::new(0),
                state: PolledState::new("counting", 3),
            }
        }
    }

    impl Poller for CountingPoller {
        fn name(&self) -> &str {
            "counting"
        }

        async fn poll(&self) -> Result<(), UpdateFailed> {
            self.polls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn is_available(&self) -> bool {
            true
        }

        fn current_snapshot(&self) -> Option<Arc<StatusSnapshot>> {
            None
        }

        fn subscribe(&self) -> SnapshotReceiver {
            self.state.subscribe()
        }
    }

    fn switch_view(state: &PolledState) -> Vec<Entity> {
        let on = state.current().is_some_and(|s| s.eco);
        vec![
            Entity::builder()
                .entity_id("switch.bedroom_eco")
                .friendly_name("Bedroom eco mode")
                .state(EntityState::from_bool(on))
                .available(state.is_available())
                .build()
                .unwrap(),
        ]
    }

    #[tokio::test(start_paused = true)]
    async fn should_poll_once_per_period_after_first_period() {
        let poller = Arc::new(CountingPoller::new());
        let mut scheduler = PollScheduler::new();
        scheduler.schedule(Arc::clone(&poller), Duration::from_secs(60));

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(poller.polls.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_secs(31)).await;
        assert_eq!(poller.polls.load(Ordering::SeqCst), 1);

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(poller.polls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn should_stop_polling_when_dropped() {
        let poller = Arc::new(CountingPoller::new());
        let mut scheduler = PollScheduler::new();
        scheduler.schedule(Arc::clone(&poller), Duration::from_secs(10));
        tokio::time::sleep(Duration::from_secs(11)).await;
        assert_eq!(poller.polls.load(Ordering::SeqCst), 1);

        drop(scheduler);
        tokio::time::sleep(Duration::from_secs(100)).await;
        assert_eq!(poller.polls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn should_publish_state_changes_and_unavailability() {
        let state = Arc::new(PolledState::new("switches", 1));
        state
            .record(Ok(StatusSnapshot {
                eco: false,
                ..StatusSnapshot::default()
            }))
            .unwrap();
        let bus = Arc::new(InProcessEventBus::new(16));
        let mut rx = bus.subscribe();
        let view_state = Arc::clone(&state);
        let task = spawn_state_publisher(state.subscribe(), Arc::clone(&bus), move || {
            switch_view(&view_state)
        });
        tokio::task::yield_now().await;

        state
            .record(Ok(StatusSnapshot {
                eco: true,
                ..StatusSnapshot::default()
            }))
            .unwrap();
        let event = rx.recv().await.unwrap();
        assert_eq!(event.event_type, EventType::StateChanged);
        assert_eq!(event.data["old_state"], "off");
        assert_eq!(event.data["new_state"], "on");

        let _ = state.record(Err(miotac_domain::error::DeviceError::Timeout));
        let event = rx.recv().await.unwrap();
        assert_eq!(event.data["new_state"], "unavailable");
        let event = rx.recv().await.unwrap();
        assert_eq!(event.event_type, EventType::EntityUnavailable);
        assert_eq!(event.entity_id.as_deref(), Some("switch.bedroom_eco"));

        task.abort();
    }

    #[tokio::test]
    async fn should_stay_quiet_when_nothing_changed() {
        let state = Arc::new(PolledState::new("switches", 3));
        state.record(Ok(StatusSnapshot::default())).unwrap();
        let bus = Arc::new(InProcessEventBus::new(16));
        let mut rx = bus.subscribe();
        let view_state = Arc::clone(&state);
        let task = spawn_state_publisher(state.subscribe(), Arc::clone(&bus), move || {
            switch_view(&view_state)
        });
        tokio::task::yield_now().await;

        state.record(Ok(StatusSnapshot::default())).unwrap();
        tokio::task::yield_now().await;
        tokio::task::yield_now().await;

        assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));
        task.abort();
    }
}
