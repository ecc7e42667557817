//! # End-to-End Pipeline
//!
//! The full runtime: ingest workers, key-sharded join workers, the ticker
//! worker and both bus consumers, driven through `Pipeline` and the sample
//! sources.

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use shared_bus::{EventFilter, EventTopic, InMemoryEventBus, StreamEvent, Subscription};
    use shared_types::{PipelineState, Purchase, SourceRecord};
    use sj_01_event_time::ManualTimeSource;
    use sj_04_windowed_join::{OverflowPolicy, PerKeyBound};
    use tokio::sync::watch;

    use pipeline_runtime::{
        pump, MockPurchaseSource, MockTickerSource, Pipeline, PipelineConfig, PipelineError,
        ProducerConfig, PurchaseTopology, TickerConfig,
    };

    fn purchase(customer: &str, department: &str, date: &str) -> Purchase {
        Purchase {
            customer_id: customer.into(),
            department: department.into(),
            item_purchased: format!("{department} item"),
            credit_card_number: "4111-1111-1111-1111".into(),
            quantity: 2,
            price: 3.0,
            purchase_date: Some(date.into()),
            ..Default::default()
        }
    }

    fn start(config: PipelineConfig, bus: Arc<InMemoryEventBus>) -> Pipeline {
        let topology = PurchaseTopology::correlated_purchases().unwrap();
        Pipeline::start_with_clock(config, topology, bus, ManualTimeSource::new(0)).unwrap()
    }

    fn drain_joined(subscription: &mut Subscription) -> Vec<String> {
        let mut keys = Vec::new();
        while let Ok(Some(event)) = subscription.try_recv() {
            if let StreamEvent::Joined(joined) = event {
                keys.push(joined.key);
            }
        }
        keys
    }

    #[tokio::test]
    async fn test_customers_spread_over_partitions_and_shards() {
        let bus = Arc::new(InMemoryEventBus::with_capacity(4096));
        let mut joined = bus.subscribe(EventFilter::topics(vec![EventTopic::JoinedOutput]));
        let config = PipelineConfig {
            partitions: 3,
            join_workers: 4,
            ..PipelineConfig::default()
        };
        let pipeline = start(config, bus);

        // Coffee on one partition, electronics on another, per customer
        let customers = 20;
        for c in 0..customers {
            let customer = format!("c{c}");
            pipeline
                .submit_purchase(SourceRecord::unkeyed(0, c, purchase(&customer, "coffee", "2024-05-01T10:00:00Z")))
                .await
                .unwrap();
            pipeline
                .submit_purchase(SourceRecord::unkeyed(
                    1,
                    c,
                    purchase(&customer, "electronics", "2024-05-01T10:15:00Z"),
                ))
                .await
                .unwrap();
        }

        let report = pipeline.shutdown().await.unwrap();
        assert_eq!(report.total_ingested(), 2 * customers);
        assert_eq!(report.total_joined(), customers);
        assert_eq!(report.ingest.len(), 3);
        assert_eq!(report.joins.len(), 4);

        let mut keys = drain_joined(&mut joined);
        keys.sort();
        keys.dedup();
        assert_eq!(keys.len(), customers as usize);
    }

    #[tokio::test]
    async fn test_outside_window_is_not_joined() {
        let bus = Arc::new(InMemoryEventBus::new());
        let mut joined = bus.subscribe(EventFilter::topics(vec![EventTopic::JoinedOutput]));
        let pipeline = start(PipelineConfig::default(), bus);

        pipeline
            .submit_purchase(SourceRecord::unkeyed(0, 0, purchase("c1", "coffee", "2024-05-01T10:00:00Z")))
            .await
            .unwrap();
        pipeline
            .submit_purchase(SourceRecord::unkeyed(0, 1, purchase("c1", "electronics", "2024-05-01T10:30:00Z")))
            .await
            .unwrap();

        let report = pipeline.shutdown().await.unwrap();
        assert_eq!(report.total_joined(), 0);
        assert!(drain_joined(&mut joined).is_empty());
    }

    #[tokio::test]
    async fn test_per_key_bound_rejects_are_reported() {
        let config = PipelineConfig {
            join_workers: 1,
            per_key_bound: Some(PerKeyBound {
                max_entries: 1,
                policy: OverflowPolicy::RejectNew,
            }),
            ..PipelineConfig::default()
        };
        let pipeline = start(config, Arc::new(InMemoryEventBus::new()));

        for offset in 0..3 {
            pipeline
                .submit_purchase(SourceRecord::unkeyed(0, offset, purchase("c1", "coffee", "2024-05-01T10:00:00Z")))
                .await
                .unwrap();
        }

        let report = pipeline.shutdown().await.unwrap();
        assert_eq!(report.joins[0].rejected, 2);
        assert_eq!(report.released(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sample_sources_run_to_completion() {
        let bus = Arc::new(InMemoryEventBus::with_capacity(8192));
        let config = PipelineConfig {
            producer: ProducerConfig {
                purchases_per_batch: 50,
                batches: 4,
                customers: 5,
                batch_interval_ms: 1_000,
                malformed_ratio: 0.1,
                seed: 11,
            },
            tickers: TickerConfig {
                companies: 3,
                iterations: 2,
                interval_ms: 500,
            },
            ..PipelineConfig::default()
        };
        let pipeline = Arc::new(start(config.clone(), bus));

        let purchases = MockPurchaseSource::new(config.producer.clone(), config.partitions, 0);
        let tickers = MockTickerSource::new(&config.tickers, 3);
        let period = Duration::from_millis(config.producer.batch_interval_ms);
        let tick_period = Duration::from_millis(config.tickers.interval_ms);

        let (sent_purchases, sent_ticks) = tokio::join!(
            pump("purchases", purchases, pipeline.as_ref(), period, pipeline.shutdown_signal()),
            pump("tickers", tickers, pipeline.as_ref(), tick_period, pipeline.shutdown_signal()),
        );
        assert_eq!(sent_purchases, 200);
        assert_eq!(sent_ticks, 6);

        let report = pipeline.shutdown().await.unwrap();
        assert_eq!(pipeline.state(), PipelineState::Stopped);
        assert_eq!(report.total_ingested(), 200);
        let fallbacks: u64 = report.ingest.iter().map(|r| r.fallbacks).sum();
        assert!(fallbacks > 0);
        assert!(report.total_joined() > 0);
        assert_eq!(report.views.view_keys, 3);
        assert_eq!(report.views.log_length, 6);
    }

    #[tokio::test]
    async fn test_pump_stops_when_pipeline_shuts_down() {
        let config = PipelineConfig::default();
        let pipeline = Arc::new(start(config.clone(), Arc::new(InMemoryEventBus::new())));
        pipeline.shutdown().await.unwrap();

        let source = MockPurchaseSource::new(config.producer, config.partitions, 0);
        let (_tx, rx) = watch::channel(false);
        let accepted = pump("purchases", source, pipeline.as_ref(), Duration::from_millis(1), rx).await;

        assert_eq!(accepted, 0);
        let late = pipeline.submit_tick(SourceRecord::keyed(0, 0, "AAPL", shared_types::StockTicker::new("AAPL", 1.0))).await;
        assert!(matches!(late, Err(PipelineError::Stopped)));
    }
}
