use telemetra::codec;
use telemetra::errors::ErrorKind;
use telemetra::filter::*;
use telemetra::spatial::GeoPoint;
use telemetra_int_test::test_util::{base_time, cleanup, create_test_context, run_test};

#[ctor::ctor]
fn init() {
    colog::init();
}

#[test]
fn test_well_known_fields() {
    run_test(
        || create_test_context(),
        |ctx| {
            assert_eq!(ctx.matching_events(&field("dataset")?.eq("d1"))?, vec!["e1", "e2"]);
            assert_eq!(ctx.matching_events(&field("metricId")?.in_values(["door", "status"])?)?, vec!["e3", "e4"]);
            assert_eq!(ctx.matching_events(&field("producer->userId")?.eq("u2"))?, vec!["e2", "e5"]);
            assert_eq!(ctx.matching_events(&field("producer->clientId")?.exists())?, vec!["e1", "e4"]);
            assert_eq!(ctx.matching_events(&field("receivedTimestamp")?.exists())?, vec!["e4"]);
            assert_eq!(ctx.matching_events(&field("elevation")?.gt(100))?, vec!["e1"]);
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_timestamps_are_epoch_millis() {
    run_test(
        || create_test_context(),
        |ctx| {
            let cutoff = base_time().timestamp_millis() + 2 * 60_000;
            assert_eq!(ctx.matching_events(&field("timestamp")?.gte(cutoff))?, vec!["e3", "e4", "e5"]);
            assert_eq!(ctx.matching_events(&field("timestamp")?.lt(cutoff))?, vec!["e1", "e2"]);
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_value_across_metric_types() {
    run_test(
        || create_test_context(),
        |ctx| {
            let numeric = and(vec![field("metricId")?.eq("temperature"), field("value")?.gt(10)]);
            assert_eq!(ctx.matching_events(&numeric)?, vec!["e1"]);
            assert_eq!(ctx.matching_events(&field("value")?.eq(true))?, vec!["e3"]);
            assert_eq!(ctx.matching_events(&field("value")?.eq("ok"))?, vec!["e4"]);

            // comparing the whole mixed-type column is a type error
            let err = ctx.matching_events(&field("value")?.gt(10)).unwrap_err();
            assert_eq!(err.kind(), &ErrorKind::TypeError);
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_json_metric_sub_paths() {
    run_test(
        || create_test_context(),
        |ctx| {
            let derived = field("dataset")?.eq("d3");
            let filters = vec![
                field("value->readings")?.eq(15),
                field("value->readings->[2]")?.eq(8),
                field("value->stats->max")?.gte(15),
                field("value->label")?.starts_with("hour"),
                field("value->stats->unit")?.regex_ignore_case("c")?,
            ];
            for filter in filters {
                let scoped = derived.clone().and(filter.clone());
                assert_eq!(ctx.matching_events(&scoped)?, vec!["e5"], "{}", filter);
            }
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_tags() {
    run_test(
        || create_test_context(),
        |ctx| {
            assert_eq!(ctx.matching_events(&has_tag("calibrated"))?, vec!["e1"]);
            assert_eq!(ctx.matching_events(&has_any_tag(["indoor", "derived"]))?, vec!["e2", "e5"]);
            assert_eq!(ctx.matching_events(&has_tag("calibrated").not())?, vec!["e2", "e3", "e4", "e5"]);
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_geo_predicates_on_events() {
    run_test(
        || create_test_context(),
        |ctx| {
            let turin_centre = GeoPoint::new(45.0703, 7.6869)?;
            let near_turin = location_in_circle(turin_centre, 5_000.0)?;
            assert_eq!(ctx.matching_events(&near_turin)?, vec!["e1"]);

            let wide = location_in_circle(turin_centre, 200_000.0)?;
            assert_eq!(ctx.matching_events(&wide)?, vec!["e1", "e2"]);

            let lombardy = location_in_polygon(vec![
                GeoPoint::new(45.0, 8.5)?,
                GeoPoint::new(45.0, 10.0)?,
                GeoPoint::new(46.0, 10.0)?,
                GeoPoint::new(46.0, 8.5)?,
            ])?;
            assert_eq!(ctx.matching_events(&lombardy)?, vec!["e2"]);
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_unknown_event_field_fails_the_query() {
    run_test(
        || create_test_context(),
        |ctx| {
            let filter = codec::decode_str(r#"{"speed":{"_gt":3}}"#)?;
            let err = ctx.matching_events(&filter).unwrap_err();
            assert_eq!(err.kind(), &ErrorKind::FieldPathError);
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}
