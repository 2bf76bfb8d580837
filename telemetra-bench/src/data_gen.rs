//! Data generators for benchmarks

use chrono::{Duration, TimeZone, Utc};
use fake::faker::address::en::CityName;
use fake::faker::lorem::en::*;
use fake::faker::name::en::*;
use fake::Fake;
use rand::Rng;
use serde_json::{json, Value};
use telemetra::errors::TelemetraResult;
use telemetra::event::{Event, MetricValue, Producer};
use telemetra::filter::*;
use telemetra::spatial::GeoPoint;

const DATASETS: [&str; 4] = ["d1", "d2", "d3", "d4"];
const METRICS: [&str; 3] = ["temperature", "humidity", "pressure"];

/// Generate numeric telemetry events spread over one day, half of them
/// tagged and located
pub fn generate_events(count: usize) -> TelemetraResult<Vec<Event>> {
    let mut rng = rand::thread_rng();
    let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).single().unwrap_or_default();

    let mut events = Vec::with_capacity(count);
    for i in 0..count {
        let user: String = FirstName().fake();
        let offset = Duration::seconds(rng.gen_range(0..86_400));
        let mut event = Event::new(
            start + offset,
            DATASETS[i % DATASETS.len()],
            METRICS[rng.gen_range(0..METRICS.len())],
            Producer::new(&user.to_lowercase()),
            MetricValue::Number(rng.gen_range(-20.0..40.0)),
        )
        .with_source(&format!("e{}", i));

        if rng.gen_bool(0.5) {
            let tag: String = Word().fake();
            let location = GeoPoint::new(rng.gen_range(44.0..46.0), rng.gen_range(7.0..10.0))?;
            event = event.with_tags([tag]).with_location(location);
        }
        events.push(event);
    }
    Ok(events)
}

/// Generate generic JSON records with nested metadata and low-cardinality
/// sort keys, so orderings contain long tie runs
pub fn generate_records(count: usize) -> Vec<Value> {
    let mut rng = rand::thread_rng();
    (0..count)
        .map(|i| {
            let city: String = CityName().fake();
            json!({
                "id": i,
                "dataset": DATASETS[i % DATASETS.len()],
                "value": rng.gen_range(0..1_000),
                "bucket": rng.gen_range(0..10),
                "meta": {
                    "sensor": format!("sensor-{}", rng.gen_range(0..50)),
                    "city": city
                },
                "readings": (0..rng.gen_range(1..6)).map(|_| rng.gen_range(0..100)).collect::<Vec<i32>>()
            })
        })
        .collect()
}

/// Generate a disjunction of `width` random leaf predicates over the record
/// fields produced by [`generate_records`]
pub fn generate_filter(width: usize) -> TelemetraResult<FilterExpression> {
    let mut rng = rand::thread_rng();
    let mut operands = Vec::with_capacity(width);
    for _ in 0..width {
        let leaf = match rng.gen_range(0..6) {
            0 => field("dataset")?.eq(DATASETS[rng.gen_range(0..DATASETS.len())]),
            1 => field("value")?.gt(rng.gen_range(0..1_000)),
            2 => field("bucket")?.in_values((0..3).map(|_| rng.gen_range(0..10)))?,
            3 => field("meta->sensor")?.regex(&format!("sensor-{}.*", rng.gen_range(0..5)))?,
            4 => field("meta->city")?.starts_with(&Word().fake::<String>()),
            _ => and(vec![field("readings")?.eq(rng.gen_range(0..100)), field("meta")?.exists()]),
        };
        operands.push(leaf);
    }
    Ok(or(operands))
}
