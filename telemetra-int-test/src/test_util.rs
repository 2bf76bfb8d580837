use chrono::{DateTime, Duration, TimeZone, Utc};
use serde_json::{json, Value};
use std::backtrace::Backtrace;
use std::time::Instant;
use telemetra::cursor::{KeysetCursor, OrderBy};
use telemetra::errors::{ErrorKind, TelemetraError, TelemetraResult};
use telemetra::evaluator::{Evaluator, Record};
use telemetra::event::{Event, MetricValue, Producer};
use telemetra::filter::FilterExpression;
use telemetra::spatial::GeoPoint;

/// Runs `test` between `before` and `after`, reporting errors and panics
/// with the elapsed time. `after` runs even when the test fails.
pub fn run_test<T, B, A>(before: B, test: T, after: A)
where
    T: Fn(TestContext) -> TelemetraResult<()> + std::panic::UnwindSafe + std::panic::RefUnwindSafe,
    B: Fn() -> TelemetraResult<TestContext> + std::panic::UnwindSafe + std::panic::RefUnwindSafe,
    A: Fn(TestContext) -> TelemetraResult<()> + std::panic::UnwindSafe + std::panic::RefUnwindSafe,
{
    let start_time = Instant::now();

    let result = std::panic::catch_unwind(|| {
        let backtrace = Backtrace::capture();
        match before() {
            Ok(ctx) => match test(ctx.clone()) {
                Ok(_) => after(ctx).map_err(|e| (format!("After run failed: {:?}", e), backtrace.to_string())),
                Err(e) => {
                    let _ = after(ctx);
                    Err((format!("Test failed: {:?}", e), backtrace.to_string()))
                }
            },
            Err(e) => Err((format!("Before run failed: {:?}", e), backtrace.to_string())),
        }
    });

    let elapsed = start_time.elapsed();
    let (error, backtrace) = match result {
        Ok(Ok(_)) => return,
        Ok(Err((error, backtrace))) => (error, backtrace),
        Err(panic_err) => {
            let message = if let Some(s) = panic_err.downcast_ref::<&str>() {
                s.to_string()
            } else if let Some(s) = panic_err.downcast_ref::<String>() {
                s.clone()
            } else {
                "Unknown panic".to_string()
            };
            (format!("Panic: {}", message), Backtrace::capture().to_string())
        }
    };

    eprintln!("\n==================== TEST FAILED ====================");
    eprintln!("Failed after {:?}", elapsed);
    eprintln!("Error: {}", error);
    if !backtrace.is_empty() && !backtrace.contains("disabled") {
        eprintln!("\nBacktrace:\n{}", backtrace);
    }
    eprintln!("=====================================================\n");

    panic!("Test failed: {}", error);
}

/// Shared state of one integration test: an isolated evaluator plus the
/// fixture records.
#[derive(Clone)]
pub struct TestContext {
    evaluator: Evaluator,
    events: Vec<Event>,
    records: Vec<Value>,
}

impl TestContext {
    pub fn evaluator(&self) -> &Evaluator {
        &self.evaluator
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn records(&self) -> &[Value] {
        &self.records
    }

    /// Ids of the fixture events matching `filter`, in fixture order.
    pub fn matching_events(&self, filter: &FilterExpression) -> TelemetraResult<Vec<String>> {
        let mut ids = Vec::new();
        for event in &self.events {
            if self.evaluator.matches(event, filter)? {
                ids.push(event_id(event));
            }
        }
        Ok(ids)
    }

    /// Ids of the fixture records matching `filter`, in fixture order.
    pub fn matching_records(&self, filter: &FilterExpression) -> TelemetraResult<Vec<i64>> {
        let mut ids = Vec::new();
        for record in &self.records {
            if self.evaluator.matches(record, filter)? {
                ids.push(record_id(record));
            }
        }
        Ok(ids)
    }
}

pub fn create_test_context() -> TelemetraResult<TestContext> {
    let evaluator = Evaluator::builder().regex_cache_capacity(16).build()?;
    Ok(TestContext {
        evaluator,
        events: sample_events()?,
        records: sample_records(),
    })
}

pub fn cleanup(ctx: TestContext) -> TelemetraResult<()> {
    let purged = ctx.evaluator.regex_cache().purge_expired();
    log::debug!(
        "Test context released, {} cached patterns, {} purged",
        ctx.evaluator.regex_cache().len(),
        purged
    );
    Ok(())
}

pub fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).single().unwrap_or_default()
}

/// The fixture events. The event id is carried in `source`.
pub fn sample_events() -> TelemetraResult<Vec<Event>> {
    let turin = GeoPoint::new(45.0703, 7.6869)?;
    let milan = GeoPoint::new(45.4642, 9.19)?;

    Ok(vec![
        Event::new(base_time(), "d1", "temperature", Producer::with_client("u1", "c1"), MetricValue::Number(21.5))
            .with_source("e1")
            .with_tags(["calibrated", "outdoor"])
            .with_location(turin)
            .with_elevation(240.0),
        Event::new(
            base_time() + Duration::minutes(1),
            "d1",
            "temperature",
            Producer::new("u2"),
            MetricValue::Number(9.0),
        )
        .with_source("e2")
        .with_tags(["indoor"])
        .with_location(milan),
        Event::new(
            base_time() + Duration::minutes(2),
            "d2",
            "door",
            Producer::new("u1"),
            MetricValue::Bool(true),
        )
        .with_source("e3"),
        Event::new(
            base_time() + Duration::minutes(3),
            "d2",
            "status",
            Producer::with_client("u3", "c9"),
            MetricValue::Text("ok".into()),
        )
        .with_source("e4")
        .with_received_timestamp(base_time() + Duration::minutes(4)),
        Event::new(
            base_time() + Duration::minutes(4),
            "d3",
            "summary",
            Producer::new("u2"),
            MetricValue::Json(json!({
                "readings": [4, 8, 15],
                "stats": {"max": 15, "unit": "C"},
                "label": "hourly"
            })),
        )
        .with_source("e5")
        .with_tags(["derived"]),
    ])
}

/// Generic records with an `id`, a `dataset`, a numeric `value` and
/// optional nested data.
pub fn sample_records() -> Vec<Value> {
    vec![
        json!({"id": 1, "dataset": "d1", "value": 15, "meta": {"sensor": "sensor-1"}, "readings": [1, 2, 3]}),
        json!({"id": 2, "dataset": "d1", "value": 5, "meta": {"sensor": "sensor-2"}}),
        json!({"id": 3, "dataset": "d2", "value": 25.5, "meta": null, "readings": [7]}),
        json!({"id": 4, "dataset": "d2", "value": "n/a"}),
        json!({"id": 5, "dataset": "d3", "flag": true}),
    ]
}

pub fn event_id(event: &Event) -> String {
    event.source.clone().unwrap_or_default()
}

pub fn record_id(record: &Value) -> i64 {
    record["id"].as_i64().unwrap_or(-1)
}

/// Pages through `data` the way a query service would: evaluate, sort, trim
/// the delivered ties, take `page_size`, then build the next cursor.
///
/// Every cursor is passed through its transport token.
pub fn page_through<R: Record + Clone>(
    evaluator: &Evaluator,
    data: &[R],
    order: &OrderBy,
    base: &FilterExpression,
    page_size: usize,
) -> TelemetraResult<Vec<Vec<R>>> {
    if page_size == 0 {
        return Err(TelemetraError::new("Page size must be positive", ErrorKind::ConfigError));
    }

    let mut cursor: Option<KeysetCursor> = None;
    let mut pages = Vec::new();
    loop {
        let filter = match &cursor {
            None => base.clone(),
            Some(cursor) => cursor.resume(base.clone(), order)?,
        };

        let mut matching = Vec::new();
        for record in data {
            if evaluator.matches(record, &filter)? {
                matching.push(record.clone());
            }
        }
        order.sort(&mut matching)?;
        if let Some(cursor) = &cursor {
            matching = cursor.trim_tied(order, matching)?;
        }

        let page: Vec<R> = matching.into_iter().take(page_size).collect();
        if page.is_empty() {
            return Ok(pages);
        }

        cursor = match KeysetCursor::generate_after(cursor.as_ref(), order, &page)? {
            Some(next) => Some(KeysetCursor::decode(&next.encode()?)?),
            None => None,
        };
        pages.push(page);
    }
}
