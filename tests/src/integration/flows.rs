//! # Stage Chain Flows
//!
//! Drives sj-01 through sj-05 by hand, without the runtime, to check that
//! the stages compose:
//!
//! 1. **Event time → transform → route → join**: purchases by one customer in
//!    the two joined departments correlate only inside the window.
//! 2. **Routing**: every purchase lands in at most one category.
//! 3. **View and log**: the same tick stream yields a latest-value table and
//!    a complete ordered history.

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use proptest::prelude::*;
    use shared_bus::{EventPublisher, InMemoryEventBus, StreamEvent};
    use shared_types::{CorrelatedPurchase, Event, Purchase, SourceRecord, StockTicker};
    use sj_01_event_time::{EventTimeApi, ManualTimeSource, SequenceGenerator, TimestampPolicy};
    use sj_02_record_transform::RecordTransformApi;
    use sj_03_branch_router::Route;
    use sj_04_windowed_join::{JoinConfig, JoinSide, PurchaseJoiner, WindowedJoin};
    use sj_05_view_log::{EventLog, MaterializedView, StreamConsumer, ViewLogConsumer};
    use tokio::sync::watch;

    use pipeline_runtime::handlers::policy_assigner;
    use pipeline_runtime::PurchaseTopology;

    // =========================================================================
    // TEST FIXTURES
    // =========================================================================

    fn purchase(customer: &str, department: &str, item: &str, date: Option<&str>) -> Purchase {
        Purchase {
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
            customer_id: customer.into(),
            credit_card_number: "4111-1111-1111-1234".into(),
            item_purchased: item.into(),
            department: department.into(),
            quantity: 1,
            price: 10.0,
            purchase_date: date.map(str::to_string),
            ..Default::default()
        }
    }

    /// Runs records through every purchase stage in arrival order.
    struct Chain {
        topology: PurchaseTopology,
        join: WindowedJoin<Purchase, Purchase, PurchaseJoiner>,
        clock: ManualTimeSource,
        sequence: Arc<SequenceGenerator>,
    }

    impl Chain {
        fn new(window_ms: i64) -> Self {
            let topology = PurchaseTopology::correlated_purchases().unwrap();
            let join = WindowedJoin::new(JoinConfig::new(window_ms), topology.joiner).unwrap();
            Self {
                topology,
                join,
                clock: ManualTimeSource::new(0),
                sequence: Arc::new(SequenceGenerator::new()),
            }
        }

        fn run(&mut self, records: Vec<SourceRecord<Purchase>>) -> Vec<Event<CorrelatedPurchase>> {
            let mut assigner = policy_assigner(
                TimestampPolicy::DeclaredField,
                self.clock.clone(),
                self.sequence.clone(),
            );
            let mut out = Vec::new();
            for record in records {
                let event = self.topology.transforms.transform(assigner.assign(record).event);
                let Route::Category(category) = self.topology.router.route(&event) else {
                    continue;
                };
                let outcome = match self.topology.side_of(&category) {
                    Some(JoinSide::Left) => self.join.on_left(event),
                    Some(JoinSide::Right) => self.join.on_right(event),
                    None => continue,
                };
                out.extend(outcome.emitted);
            }
            out
        }
    }

    fn records(purchases: Vec<Purchase>) -> Vec<SourceRecord<Purchase>> {
        purchases
            .into_iter()
            .enumerate()
            .map(|(offset, p)| SourceRecord::unkeyed(0, offset as u64, p))
            .collect()
    }

    // =========================================================================
    // JOIN FLOWS
    // =========================================================================

    #[test]
    fn test_same_customer_within_window_correlates() {
        let mut chain = Chain::new(1_200_000);
        let joined = chain.run(records(vec![
            purchase("c1", "coffee", "latte", Some("1970-01-01T00:00:00Z")),
            purchase("c1", "electronics", "headphones", Some("1970-01-01T00:08:20Z")),
        ]));

        assert_eq!(joined.len(), 1);
        let record = &joined[0];
        assert_eq!(record.key, "c1");
        assert_eq!(record.event_time, 500_000);
        assert_eq!(record.payload.customer_id, "c1");
        assert_eq!(record.payload.items_purchased, vec!["latte", "headphones"]);
        assert_eq!(record.payload.first_purchase_time, 0);
        assert_eq!(record.payload.second_purchase_time, 500_000);
        assert!((record.payload.total_amount - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_same_pair_outside_narrow_window_does_not_correlate() {
        let mut chain = Chain::new(300_000);
        let joined = chain.run(records(vec![
            purchase("c1", "coffee", "latte", Some("1970-01-01T00:00:00Z")),
            purchase("c1", "electronics", "headphones", Some("1970-01-01T00:08:20Z")),
        ]));
        assert!(joined.is_empty());
    }

    #[test]
    fn test_late_left_arrival_still_correlates() {
        let mut chain = Chain::new(1_200_000);
        let joined = chain.run(records(vec![
            purchase("c1", "electronics", "tablet", Some("1970-01-01T00:10:00Z")),
            purchase("c1", "coffee", "espresso", Some("1970-01-01T00:02:00Z")),
        ]));

        assert_eq!(joined.len(), 1);
        // Left is always coffee, whichever side arrived first
        assert_eq!(joined[0].payload.items_purchased, vec!["espresso", "tablet"]);
        assert_eq!(joined[0].event_time, 600_000);
    }

    #[test]
    fn test_different_customers_never_correlate() {
        let mut chain = Chain::new(1_200_000);
        let joined = chain.run(records(vec![
            purchase("c1", "coffee", "latte", Some("1970-01-01T00:00:00Z")),
            purchase("c2", "electronics", "tablet", Some("1970-01-01T00:00:00Z")),
        ]));
        assert!(joined.is_empty());
    }

    #[test]
    fn test_every_matching_pair_is_emitted_once() {
        let mut chain = Chain::new(1_200_000);
        let joined = chain.run(records(vec![
            purchase("c1", "coffee", "latte", Some("1970-01-01T00:00:00Z")),
            purchase("c1", "coffee", "beans", Some("1970-01-01T00:01:00Z")),
            purchase("c1", "electronics", "charger", Some("1970-01-01T00:02:00Z")),
            purchase("c1", "electronics", "watch", Some("1970-01-01T00:03:00Z")),
        ]));
        assert_eq!(joined.len(), 4);
        assert_eq!(chain.join.stats().emitted, 4);
    }

    #[test]
    fn test_malformed_date_is_stamped_and_still_joins() {
        let mut chain = Chain::new(1_200_000);
        let joined = chain.run(records(vec![
            purchase("c1", "coffee", "latte", Some("1970-01-01T00:05:00Z")),
            // Falls back to the partition's last known time, 300_000
            purchase("c1", "electronics", "charger", Some("yesterday")),
        ]));

        assert_eq!(joined.len(), 1);
        assert_eq!(joined[0].payload.second_purchase_time, 300_000);
    }

    #[test]
    fn test_unrouted_purchases_leave_join_buffers_empty() {
        let mut chain = Chain::new(1_200_000);
        let joined = chain.run(records(vec![
            purchase("c1", "books", "atlas", Some("1970-01-01T00:00:00Z")),
            purchase("c1", "grocery", "bread", Some("1970-01-01T00:00:00Z")),
        ]));

        assert!(joined.is_empty());
        assert_eq!(chain.join.left_len() + chain.join.right_len(), 0);
        assert_eq!(chain.topology.router.stats().unrouted(), 2);
    }

    #[test]
    fn test_buffered_purchases_are_masked_and_rekeyed() {
        let topology = PurchaseTopology::correlated_purchases().unwrap();
        let mut assigner = policy_assigner(
            TimestampPolicy::DeclaredField,
            ManualTimeSource::new(0),
            Arc::new(SequenceGenerator::new()),
        );
        let record = SourceRecord::keyed(
            0,
            0,
            "transport-key",
            purchase("c9", "coffee", "latte", Some("1970-01-01T00:00:00Z")),
        );

        let event = topology.transforms.transform(assigner.assign(record).event);
        assert_eq!(event.key, "c9");
        assert_eq!(event.payload.credit_card_number, "xxxx-xxxx-xxxx-1234");
    }

    // =========================================================================
    // ROUTING
    // =========================================================================

    proptest! {
        #[test]
        fn test_each_purchase_routes_to_at_most_one_category(
            departments in proptest::collection::vec(
                prop_oneof![
                    Just("coffee"),
                    Just("Coffee"),
                    Just("electronics"),
                    Just("books"),
                    Just(""),
                ],
                1..40,
            )
        ) {
            let topology = PurchaseTopology::correlated_purchases().unwrap();
            let events: Vec<_> = departments
                .iter()
                .enumerate()
                .map(|(i, d)| Event::new("c1", purchase("c1", d, "item", None), 0, i as u64))
                .collect();

            let split = topology.router.split(events.clone());
            let routed: usize = split.iter().map(Vec::len).sum();
            let expected = departments
                .iter()
                .filter(|d| d.eq_ignore_ascii_case("coffee") || **d == "electronics")
                .count();
            prop_assert_eq!(routed, expected);

            for event in &events {
                if let Route::Category(category) = topology.router.route(event) {
                    prop_assert!(topology.side_of(&category).is_some());
                }
            }
        }
    }

    // =========================================================================
    // VIEW AND LOG
    // =========================================================================

    fn tick(symbol: &str, price: f64, time: i64, sequence: u64) -> Event<StockTicker> {
        Event::new(symbol, StockTicker::new(symbol, price), time, sequence)
    }

    #[test]
    fn test_view_holds_latest_while_log_holds_history() {
        let mut view = MaterializedView::new();
        let mut log = EventLog::new();

        for event in [tick("AAPL", 100.0, 1, 0), tick("AAPL", 101.0, 2, 1)] {
            view.consume(event.clone());
            log.consume(event);
        }

        assert_eq!(view.len(), 1);
        assert_eq!(view.get("AAPL").map(|e| e.payload.price), Some(101.0));

        let prices: Vec<f64> = log.reader().map(|(_, e)| e.payload.price).collect();
        assert_eq!(prices, vec![100.0, 101.0]);
    }

    #[tokio::test]
    async fn test_bus_consumers_see_the_same_ticks_independently() {
        let bus = Arc::new(InMemoryEventBus::new());
        let (stop_tx, stop_rx) = watch::channel(false);
        let consumers = ViewLogConsumer::start(bus.as_ref(), stop_rx);

        let ticks = [
            tick("AAPL", 100.0, 1, 0),
            tick("MSFT", 300.0, 1, 1),
            tick("AAPL", 101.0, 2, 2),
        ];
        for t in ticks {
            bus.publish(StreamEvent::StockTick(t)).await;
        }

        stop_tx.send(true).unwrap();
        let report = consumers.join().await;

        assert_eq!(report.view_keys, 2);
        assert_eq!(report.log_length, 3);
        assert_eq!(report.view_updates, 3);
    }
}
