//! # Sample Sources
//!
//! Seeded generators standing in for the external producers. Each source is
//! a finite sequence of batches; the runtime paces batches on an interval.

use chrono::{SecondsFormat, TimeZone, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use shared_types::{EventTime, Purchase, SourceRecord, StockTicker};

use crate::container::{ProducerConfig, TickerConfig};

/// Lazy, finite source of record batches.
pub trait RecordSource<P>: Send {
    /// Next batch, or `None` once the source is exhausted.
    fn next_batch(&mut self) -> Option<Vec<SourceRecord<P>>>;

    /// Batches not yet produced.
    fn remaining(&self) -> usize;
}

const FIRST_NAMES: &[&str] = &["Ada", "Grace", "Alan", "Edsger", "Barbara", "Ken", "Frances"];
const LAST_NAMES: &[&str] = &["Lovelace", "Hopper", "Turing", "Dijkstra", "Liskov", "Thompson", "Allen"];

/// Departments and what is sold in each.
const DEPARTMENTS: &[(&str, &[&str])] = &[
    ("coffee", &["espresso", "latte", "cold brew", "beans"]),
    ("electronics", &["headphones", "phone charger", "tablet", "smart watch"]),
    ("books", &["novel", "cookbook", "atlas"]),
    ("grocery", &["bread", "apples", "cheese"]),
    ("apparel", &["jacket", "scarf", "sneakers"]),
];

/// Purchases spread across a fixed set of customers.
///
/// Records carry no transport key. Purchase dates fall within a few minutes
/// of the batch's nominal time; a configured fraction is missing or garbled.
pub struct MockPurchaseSource {
    rng: StdRng,
    config: ProducerConfig,
    partitions: u32,
    offsets: Vec<u64>,
    produced_batches: usize,
    start_ms: EventTime,
}

impl MockPurchaseSource {
    /// `start_ms` is the nominal time of the first batch.
    pub fn new(config: ProducerConfig, partitions: u32, start_ms: EventTime) -> Self {
        let partitions = partitions.max(1);
        Self {
            rng: StdRng::seed_from_u64(config.seed),
            config,
            partitions,
            offsets: vec![0; partitions as usize],
            produced_batches: 0,
            start_ms,
        }
    }

    fn purchase(&mut self, batch_time: EventTime) -> Purchase {
        let customer = self.rng.gen_range(0..self.config.customers);
        let (department, items) = DEPARTMENTS[self.rng.gen_range(0..DEPARTMENTS.len())];
        let item = items[self.rng.gen_range(0..items.len())];

        Purchase {
            first_name: FIRST_NAMES[customer % FIRST_NAMES.len()].to_string(),
            last_name: LAST_NAMES[customer % LAST_NAMES.len()].to_string(),
            customer_id: format!("customer-{customer}"),
            credit_card_number: format!(
                "{:04}-{:04}-{:04}-{:04}",
                self.rng.gen_range(0..10_000),
                self.rng.gen_range(0..10_000),
                self.rng.gen_range(0..10_000),
                self.rng.gen_range(0..10_000)
            ),
            item_purchased: item.to_string(),
            department: department.to_string(),
            employee_id: format!("emp-{}", self.rng.gen_range(100..200)),
            quantity: self.rng.gen_range(1..=5),
            price: f64::from(self.rng.gen_range(100u32..50_000)) / 100.0,
            purchase_date: self.purchase_date(batch_time),
            zip_code: format!("{:05}", self.rng.gen_range(10_000..99_999)),
            store_id: format!("store-{}", self.rng.gen_range(1..=20)),
        }
    }

    fn purchase_date(&mut self, batch_time: EventTime) -> Option<String> {
        if self.rng.gen_bool(self.config.malformed_ratio) {
            return if self.rng.gen_bool(0.5) {
                None
            } else {
                Some("not-a-date".to_string())
            };
        }
        // Up to five minutes either side of the batch time
        let jitter = self.rng.gen_range(-300_000..=300_000);
        format_millis(batch_time + jitter)
    }
}

impl RecordSource<Purchase> for MockPurchaseSource {
    fn next_batch(&mut self) -> Option<Vec<SourceRecord<Purchase>>> {
        if self.produced_batches >= self.config.batches {
            return None;
        }
        let batch_time = self.start_ms
            + (self.produced_batches as i64) * (self.config.batch_interval_ms as i64);
        self.produced_batches += 1;

        let mut batch = Vec::with_capacity(self.config.purchases_per_batch);
        for i in 0..self.config.purchases_per_batch {
            let partition = (i as u32) % self.partitions;
            let purchase = self.purchase(batch_time);
            let offset = &mut self.offsets[partition as usize];
            batch.push(SourceRecord::unkeyed(partition, *offset, purchase));
            *offset += 1;
        }
        Some(batch)
    }

    fn remaining(&self) -> usize {
        self.config.batches.saturating_sub(self.produced_batches)
    }
}

const SYMBOLS: &[&str] = &["AAPL", "MSFT", "GOOG", "AMZN", "NFLX", "ORCL", "INTC", "IBM"];

/// Price updates for a fixed set of companies, keyed by symbol.
pub struct MockTickerSource {
    rng: StdRng,
    prices: Vec<(String, f64)>,
    iterations: usize,
    produced: usize,
    offset: u64,
}

impl MockTickerSource {
    pub fn new(config: &TickerConfig, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let prices = (0..config.companies)
            .map(|i| {
                let symbol = SYMBOLS
                    .get(i)
                    .map_or_else(|| format!("SYM{i}"), |s| (*s).to_string());
                (symbol, rng.gen_range(50.0..500.0))
            })
            .collect();

        Self {
            rng,
            prices,
            iterations: config.iterations,
            produced: 0,
            offset: 0,
        }
    }
}

impl RecordSource<StockTicker> for MockTickerSource {
    fn next_batch(&mut self) -> Option<Vec<SourceRecord<StockTicker>>> {
        if self.produced >= self.iterations {
            return None;
        }
        self.produced += 1;

        let mut batch = Vec::with_capacity(self.prices.len());
        for (symbol, price) in &mut self.prices {
            // Move up to 5% either way, rounded to cents
            let change = self.rng.gen_range(-0.05..0.05);
            *price = ((*price * (1.0 + change)) * 100.0).round() / 100.0;
            batch.push(SourceRecord::keyed(
                0,
                self.offset,
                symbol.clone(),
                StockTicker::new(symbol.clone(), *price),
            ));
            self.offset += 1;
        }
        Some(batch)
    }

    fn remaining(&self) -> usize {
        self.iterations.saturating_sub(self.produced)
    }
}

fn format_millis(ms: EventTime) -> Option<String> {
    Utc.timestamp_millis_opt(ms)
        .single()
        .map(|dt| dt.to_rfc3339_opts(SecondsFormat::Millis, true))
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::DeclaredTimestamp;

    fn producer(batches: usize, per_batch: usize, malformed_ratio: f64) -> ProducerConfig {
        ProducerConfig {
            purchases_per_batch: per_batch,
            batches,
            customers: 5,
            batch_interval_ms: 60_000,
            malformed_ratio,
            seed: 7,
        }
    }

    #[test]
    fn test_purchase_source_is_finite() {
        let mut source = MockPurchaseSource::new(producer(3, 4, 0.0), 2, 0);
        assert_eq!(source.remaining(), 3);

        let mut total = 0;
        while let Some(batch) = source.next_batch() {
            total += batch.len();
        }
        assert_eq!(total, 12);
        assert_eq!(source.remaining(), 0);
        assert!(source.next_batch().is_none());
    }

    #[test]
    fn test_purchase_source_is_deterministic() {
        let a = MockPurchaseSource::new(producer(1, 10, 0.1), 2, 0).next_batch();
        let b = MockPurchaseSource::new(producer(1, 10, 0.1), 2, 0).next_batch();
        assert_eq!(a, b);
    }

    #[test]
    fn test_purchases_unkeyed_with_monotonic_offsets() {
        let mut source = MockPurchaseSource::new(producer(2, 6, 0.0), 3, 0);
        let records: Vec<_> = std::iter::from_fn(|| source.next_batch()).flatten().collect();

        assert!(records.iter().all(|r| r.key.is_none()));
        for partition in 0..3 {
            let offsets: Vec<u64> = records
                .iter()
                .filter(|r| r.partition == partition)
                .map(|r| r.offset)
                .collect();
            assert_eq!(offsets, vec![0, 1, 2, 3]);
        }
    }

    #[test]
    fn test_dates_near_batch_time() {
        let start = 1_700_000_000_000;
        let mut source = MockPurchaseSource::new(producer(1, 50, 0.0), 1, start);
        for record in source.next_batch().unwrap() {
            let t = record.payload.declared_timestamp().unwrap();
            assert!((t - start).abs() <= 300_000);
            assert!(record.payload.customer_id.starts_with("customer-"));
        }
    }

    #[test]
    fn test_malformed_ratio_one_breaks_every_date() {
        let mut source = MockPurchaseSource::new(producer(1, 20, 1.0), 1, 0);
        for record in source.next_batch().unwrap() {
            assert!(record.payload.declared_timestamp().is_err());
        }
    }

    #[test]
    fn test_ticker_source_rounds() {
        let config = TickerConfig {
            companies: 2,
            iterations: 3,
            interval_ms: 0,
        };
        let mut source = MockTickerSource::new(&config, 1);
        let batches: Vec<_> = std::iter::from_fn(|| source.next_batch()).collect();

        assert_eq!(batches.len(), 3);
        for batch in &batches {
            let keys: Vec<_> = batch.iter().map(|r| r.key.clone().unwrap()).collect();
            assert_eq!(keys, vec!["AAPL", "MSFT"]);
        }
        assert!(batches.iter().flatten().all(|r| r.payload.price > 0.0));
    }
}
