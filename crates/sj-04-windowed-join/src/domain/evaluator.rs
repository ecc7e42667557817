//! Symmetric windowed join over two keyed streams.
//!
//! For each event `e` arriving on side S (other side O):
//!
//! 1. Compute `[e.t - window, e.t + window]`.
//! 2. Probe O's buffer for `e.key` within those bounds.
//! 3. Emit one combined record per match, ascending by O's timestamp.
//! 4. Insert `e` into S's buffer, then expire S.
//!
//! Because `e` probes before it is inserted, a pair is produced only by
//! whichever member arrives second.

use shared_types::{Event, EventTime};
use std::time::{Duration, Instant};
use tracing::{debug, trace};

use super::buffer::{BufferStats, Inserted, WindowBuffer};
use super::config::JoinConfig;
use super::error::{BufferError, JoinError};
use super::joiner::Joiner;
use super::window::JoinWindow;

/// Which input of the join an event arrived on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JoinSide {
    Left,
    Right,
}

impl JoinSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Left => "left",
            Self::Right => "right",
        }
    }

    pub fn other(&self) -> Self {
        match self {
            Self::Left => Self::Right,
            Self::Right => Self::Left,
        }
    }
}

/// What happened when one event was fed to the join.
#[derive(Debug, Clone, PartialEq)]
pub struct JoinOutcome<O> {
    /// Side the trigger arrived on.
    pub side: JoinSide,
    /// Joined records, ascending by the matched entry's timestamp.
    pub emitted: Vec<Event<O>>,
    /// Whether the trigger was stored for future matches.
    pub buffered: bool,
    /// Set when the per-key bound refused the trigger.
    pub rejected: Option<BufferError>,
    /// Entries displaced by the per-key bound (0 or 1).
    pub overflow_evicted: usize,
    /// Entries purged by retention after the insert.
    pub expired: usize,
    /// Time spent probing the other side.
    pub probe_duration: Duration,
}

/// Lifetime counters for one join.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JoinStats {
    pub left_received: u64,
    pub right_received: u64,
    pub emitted: u64,
}

/// Sliding-window inner join owning both side buffers.
pub struct WindowedJoin<L, R, J> {
    config: JoinConfig,
    window: JoinWindow,
    joiner: J,
    left: WindowBuffer<L>,
    right: WindowBuffer<R>,
    stats: JoinStats,
}

impl<L, R, J> WindowedJoin<L, R, J>
where
    J: Joiner<L, R>,
{
    /// # Errors
    ///
    /// `JoinError::InvalidConfig` if the configuration does not validate.
    pub fn new(config: JoinConfig, joiner: J) -> Result<Self, JoinError> {
        config.validate()?;
        Ok(Self {
            config,
            window: JoinWindow::symmetric(config.window_ms),
            joiner,
            left: WindowBuffer::with_bound(config.retention_ms, config.per_key_bound),
            right: WindowBuffer::with_bound(config.retention_ms, config.per_key_bound),
            stats: JoinStats::default(),
        })
    }

    /// Feed an event arriving on the left input.
    pub fn on_left(&mut self, event: Event<L>) -> JoinOutcome<J::Output> {
        self.stats.left_received += 1;
        let Self {
            window,
            joiner,
            left,
            right,
            ..
        } = self;
        let outcome = evaluate(JoinSide::Left, *window, event, left, right, |l, r| {
            joiner.combine(l, r)
        });
        self.stats.emitted += outcome.emitted.len() as u64;
        outcome
    }

    /// Feed an event arriving on the right input.
    pub fn on_right(&mut self, event: Event<R>) -> JoinOutcome<J::Output> {
        self.stats.right_received += 1;
        let Self {
            window,
            joiner,
            left,
            right,
            ..
        } = self;
        let outcome = evaluate(JoinSide::Right, *window, event, right, left, |r, l| {
            joiner.combine(l, r)
        });
        self.stats.emitted += outcome.emitted.len() as u64;
        outcome
    }

    pub fn config(&self) -> &JoinConfig {
        &self.config
    }

    pub fn window(&self) -> JoinWindow {
        self.window
    }

    pub fn stats(&self) -> JoinStats {
        self.stats
    }

    pub fn left_len(&self) -> usize {
        self.left.len()
    }

    pub fn right_len(&self) -> usize {
        self.right.len()
    }

    pub fn buffer_stats(&self, side: JoinSide) -> BufferStats {
        match side {
            JoinSide::Left => self.left.stats(),
            JoinSide::Right => self.right.stats(),
        }
    }

    /// Drop both buffers. Returns how many entries were released.
    pub fn clear(&mut self) -> usize {
        let released = self.left.clear() + self.right.clear();
        debug!(released, "Join buffers released");
        released
    }
}

/// Probe `other`, then buffer the trigger in `own`.
///
/// `combine` receives `(trigger, match)`; callers reorder into
/// `(left, right)`.
fn evaluate<S, O, Out>(
    side: JoinSide,
    window: JoinWindow,
    event: Event<S>,
    own: &mut WindowBuffer<S>,
    other: &mut WindowBuffer<O>,
    combine: impl Fn(&Event<S>, &Event<O>) -> Out,
) -> JoinOutcome<Out> {
    let (low, high) = window.bounds(event.event_time);

    let started = Instant::now();
    let emitted: Vec<Event<Out>> = other
        .range_query(&event.key, low, high)
        .map(|matched| {
            Event::new(
                event.key.clone(),
                combine(&event, matched),
                joined_time(event.event_time, matched.event_time),
                event.sequence,
            )
        })
        .collect();
    let probe_duration = started.elapsed();
    other.record_lookup(emitted.len());

    trace!(
        side = side.as_str(),
        key = %event.key,
        event_time = event.event_time,
        low,
        high,
        matches = emitted.len(),
        "Join probe"
    );

    let mut outcome = JoinOutcome {
        side,
        emitted,
        buffered: false,
        rejected: None,
        overflow_evicted: 0,
        expired: 0,
        probe_duration,
    };

    match own.insert(event) {
        Ok(Inserted::Stored) => outcome.buffered = true,
        Ok(Inserted::Displaced(_)) => {
            outcome.buffered = true;
            outcome.overflow_evicted = 1;
        }
        Err(err) => {
            debug!(side = side.as_str(), error = %err, "Trigger not buffered");
            outcome.rejected = Some(err);
        }
    }
    outcome.expired = own.expire();

    outcome
}

fn joined_time(a: EventTime, b: EventTime) -> EventTime {
    a.max(b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::config::OverflowPolicy;
    use crate::domain::joiner::PurchaseJoiner;
    use proptest::prelude::*;
    use rand::rngs::StdRng;
    use rand::seq::SliceRandom;
    use rand::SeedableRng;
    use shared_types::Purchase;
    use std::collections::HashSet;

    type PairJoin = WindowedJoin<u64, u64, fn(&Event<u64>, &Event<u64>) -> (u64, u64)>;

    fn pair(l: &Event<u64>, r: &Event<u64>) -> (u64, u64) {
        (l.payload, r.payload)
    }

    fn pair_join(window_ms: i64) -> PairJoin {
        pair_join_with(JoinConfig::new(window_ms))
    }

    fn pair_join_with(config: JoinConfig) -> PairJoin {
        WindowedJoin::new(config, pair as fn(&_, &_) -> _).unwrap()
    }

    fn ev(key: &str, t: EventTime, id: u64) -> Event<u64> {
        Event::new(key, id, t, id)
    }

    fn purchase(customer: &str, department: &str, item: &str, price: f64) -> Purchase {
        Purchase {
            customer_id: customer.into(),
            department: department.into(),
            item_purchased: item.into(),
            price,
            quantity: 1,
            ..Default::default()
        }
    }

    #[test]
    fn test_rejects_invalid_config() {
        let result = WindowedJoin::<Purchase, Purchase, _>::new(JoinConfig::new(-1), PurchaseJoiner);
        assert!(matches!(result, Err(JoinError::InvalidConfig(_))));
    }

    #[test]
    fn test_purchases_within_twenty_minutes_join() {
        let mut join = WindowedJoin::new(JoinConfig::new(1_200_000), PurchaseJoiner).unwrap();

        let coffee = Event::new("c1", purchase("c1", "coffee", "latte", 4.0), 0, 0);
        let electronics = Event::new("c1", purchase("c1", "electronics", "phone", 300.0), 500_000, 1);

        assert!(join.on_left(coffee).emitted.is_empty());
        let outcome = join.on_right(electronics);

        assert_eq!(outcome.emitted.len(), 1);
        let joined = &outcome.emitted[0];
        assert_eq!(joined.key, "c1");
        assert_eq!(joined.event_time, 500_000);
        assert_eq!(joined.payload.items_purchased, vec!["latte", "phone"]);
        assert_eq!(joined.payload.first_purchase_time, 0);
        assert_eq!(joined.payload.second_purchase_time, 500_000);
    }

    #[test]
    fn test_purchases_outside_window_do_not_join() {
        let mut join = WindowedJoin::new(JoinConfig::new(300_000), PurchaseJoiner).unwrap();

        join.on_left(Event::new("c1", purchase("c1", "coffee", "latte", 4.0), 0, 0));
        let outcome = join.on_right(Event::new(
            "c1",
            purchase("c1", "electronics", "phone", 300.0),
            500_000,
            1,
        ));

        assert!(outcome.emitted.is_empty());
    }

    #[test]
    fn test_right_trigger_still_combines_left_first() {
        let mut join = pair_join(100);
        join.on_right(ev("k", 10, 7));
        let outcome = join.on_left(ev("k", 20, 3));

        assert_eq!(outcome.side, JoinSide::Left);
        assert_eq!(outcome.emitted[0].payload, (3, 7));

        let mut join = pair_join(100);
        join.on_left(ev("k", 20, 3));
        let outcome = join.on_right(ev("k", 10, 7));
        assert_eq!(outcome.emitted[0].payload, (3, 7));
    }

    #[test]
    fn test_window_edges_are_inclusive() {
        let mut join = pair_join(100);
        join.on_left(ev("k", 1_000, 1));

        assert_eq!(join.on_right(ev("k", 1_100, 2)).emitted.len(), 1);
        assert_eq!(join.on_right(ev("k", 900, 3)).emitted.len(), 1);
        assert_eq!(join.on_right(ev("k", 1_101, 4)).emitted.len(), 0);
    }

    #[test]
    fn test_zero_window_joins_only_simultaneous_events() {
        let mut join = pair_join(0);
        join.on_left(ev("k", 1_000, 1));

        assert_eq!(join.on_right(ev("k", 1_000, 2)).emitted.len(), 1);
        assert_eq!(join.on_right(ev("k", 1_001, 3)).emitted.len(), 0);
        assert_eq!(join.on_right(ev("k", 999, 4)).emitted.len(), 0);
    }

    #[test]
    fn test_keys_never_cross() {
        let mut join = pair_join(100);
        join.on_left(ev("a", 0, 1));
        assert!(join.on_right(ev("b", 0, 2)).emitted.is_empty());
    }

    #[test]
    fn test_multiple_matches_emitted_in_timestamp_order() {
        let mut join = pair_join(1_000);
        join.on_left(ev("k", 300, 1));
        join.on_left(ev("k", 100, 2));
        join.on_left(ev("k", 200, 3));

        let outcome = join.on_right(ev("k", 250, 9));
        let lefts: Vec<u64> = outcome.emitted.iter().map(|e| e.payload.0).collect();
        assert_eq!(lefts, vec![2, 3, 1]);
        assert_eq!(join.stats().emitted, 3);
    }

    #[test]
    fn test_expired_entries_never_match_late_data() {
        let mut join = pair_join(100);
        join.on_left(ev("k", 0, 1));
        // Advances the left horizon to 101, evicting the entry at 0
        let outcome = join.on_left(ev("k", 201, 2));
        assert_eq!(outcome.expired, 1);

        // Late right event within window of the evicted entry
        assert!(join.on_right(ev("k", 50, 3)).emitted.is_empty());
    }

    #[test]
    fn test_late_data_matches_surviving_entries() {
        let mut join = pair_join(100);
        join.on_left(ev("k", 1_000, 1));
        join.on_right(ev("k", 5_000, 2));

        // Right buffer horizon is far ahead but the left entry survives
        let outcome = join.on_right(ev("k", 950, 3));
        assert_eq!(outcome.emitted.len(), 1);
        assert_eq!(outcome.emitted[0].event_time, 1_000);
    }

    #[test]
    fn test_reject_new_bound_reports_overflow() {
        let config = JoinConfig::new(1_000).with_per_key_bound(1, OverflowPolicy::RejectNew);
        let mut join = pair_join_with(config);

        join.on_right(ev("k", 0, 1));
        join.on_left(ev("k", 10, 2));
        let outcome = join.on_left(ev("k", 20, 3));

        // Probe still happens; only buffering is refused
        assert_eq!(outcome.emitted.len(), 1);
        assert!(!outcome.buffered);
        assert!(matches!(outcome.rejected, Some(BufferError::Overflow { bound: 1, .. })));
        assert_eq!(join.left_len(), 1);
        assert_eq!(join.buffer_stats(JoinSide::Left).rejected, 1);
    }

    #[test]
    fn test_evict_oldest_bound_keeps_newest() {
        let config = JoinConfig::new(1_000).with_per_key_bound(2, OverflowPolicy::EvictOldest);
        let mut join = pair_join_with(config);

        join.on_left(ev("k", 10, 1));
        join.on_left(ev("k", 20, 2));
        let outcome = join.on_left(ev("k", 30, 3));
        assert!(outcome.buffered);
        assert_eq!(outcome.overflow_evicted, 1);

        let lefts: Vec<u64> = join
            .on_right(ev("k", 20, 9))
            .emitted
            .iter()
            .map(|e| e.payload.0)
            .collect();
        assert_eq!(lefts, vec![2, 3]);
    }

    #[test]
    fn test_clear_releases_both_sides() {
        let mut join = pair_join(100);
        join.on_left(ev("a", 0, 1));
        join.on_right(ev("b", 0, 2));

        assert_eq!(join.clear(), 2);
        assert_eq!(join.left_len() + join.right_len(), 0);
    }

    #[test]
    fn test_arrival_order_does_not_change_result_set() {
        let mut rng = StdRng::seed_from_u64(7);
        let window = 50;
        let events: Vec<(JoinSide, Event<u64>)> = (0..60u64)
            .map(|id| {
                let side = if id % 2 == 0 { JoinSide::Left } else { JoinSide::Right };
                let key = if id % 3 == 0 { "a" } else { "b" };
                (side, ev(key, (id as i64 * 7) % 120, id))
            })
            .collect();

        let mut expected = HashSet::new();
        for (ls, l) in &events {
            for (rs, r) in &events {
                if *ls == JoinSide::Left && *rs == JoinSide::Right && l.key == r.key
                    && (l.event_time - r.event_time).abs() <= window
                {
                    expected.insert((l.payload, r.payload));
                }
            }
        }

        for _ in 0..5 {
            let mut shuffled = events.clone();
            shuffled.shuffle(&mut rng);

            // Retention large enough that nothing expires mid-run
            let config = JoinConfig::new(window).with_retention(10_000);
            let mut join = pair_join_with(config);
            let mut produced = Vec::new();
            for (side, event) in shuffled {
                let outcome = match side {
                    JoinSide::Left => join.on_left(event),
                    JoinSide::Right => join.on_right(event),
                };
                produced.extend(outcome.emitted.into_iter().map(|e| e.payload));
            }

            let unique: HashSet<_> = produced.iter().copied().collect();
            assert_eq!(unique.len(), produced.len(), "duplicate emission");
            assert_eq!(unique, expected);
        }
    }

    proptest! {
        #[test]
        fn prop_buffers_bounded_by_retention(
            steps in proptest::collection::vec((1i64..50, any::<bool>()), 1..300),
            window in 1i64..200,
        ) {
            let mut join = pair_join(window);
            let mut t = 0i64;
            for (id, (step, left)) in steps.into_iter().enumerate() {
                t += step;
                if left {
                    join.on_left(ev("k", t, id as u64));
                } else {
                    join.on_right(ev("k", t, id as u64));
                }
                // Strictly increasing timestamps: at most window+1 instants survive
                let live = window as usize + 1;
                prop_assert!(join.left_len() <= live);
                prop_assert!(join.right_len() <= live);
            }
        }

        #[test]
        fn prop_pair_emitted_iff_within_window(
            a in -10_000i64..10_000,
            b in -10_000i64..10_000,
            window in 0i64..5_000,
            left_first in any::<bool>(),
        ) {
            let config = JoinConfig::new(window.max(1)).with_retention(100_000);
            let window = config.window_ms;
            let mut join = pair_join_with(config);
            let emitted = if left_first {
                join.on_left(ev("k", a, 1));
                join.on_right(ev("k", b, 2)).emitted
            } else {
                join.on_right(ev("k", b, 2));
                join.on_left(ev("k", a, 1)).emitted
            };
            prop_assert_eq!(emitted.len() == 1, (a - b).abs() <= window);
        }
    }
}
