//! End-to-end scenarios over the forecast pipeline

use chrono::{NaiveDate, NaiveDateTime};
use skycast_core::{
    group_by_day, CloudCategory, DayPart, ForecastPipeline, PipelineConfig, RainIntensity,
    RawSample, Sample, StormFrequency, TieBreak,
};

fn at(day: u32, hour: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 11, day)
        .unwrap()
        .and_hms_opt(hour, 0, 0)
        .unwrap()
}

fn hourly_day(build: impl Fn(u32) -> Sample) -> Vec<Sample> {
    (0..24).map(build).collect()
}

#[test]
fn clear_dry_day() {
    let samples = hourly_day(|h| {
        Sample::new(at(1, h))
            .with_cloud_cover(5.0)
            .with_precipitation(0.0)
            .with_temperature(15.0 + h as f64 / 2.0)
            .with_humidity(60.0)
    });
    let report = ForecastPipeline::default().run(&samples);

    assert_eq!(report.days.len(), 1);
    let day = &report.days[0];
    assert_eq!(day.sky, Some(CloudCategory::Clear));
    assert_eq!(day.summary.precipitation, Some(0.0));
    assert_eq!(day.headline.as_deref(), Some("clear sky"));
    assert!(day.nebulosity.is_none());
    for (_, part) in day.parts.iter() {
        assert_eq!(part.rain, None);
        assert_eq!(part.description.as_deref(), Some("clear sky"));
    }
    assert_eq!(report.total_precipitation, 0.0);
}

#[test]
fn moderate_rain_day() {
    let rain = [0.0, 0.0, 2.0, 3.0, 0.0, 1.0];
    let samples = hourly_day(|h| {
        let mm = rain.get(h as usize).copied().unwrap_or(0.0);
        Sample::new(at(2, h)).with_cloud_cover(70.0).with_precipitation(mm)
    });
    let report = ForecastPipeline::default().run(&samples);
    let day = &report.days[0];

    assert_eq!(day.summary.precipitation, Some(6.0));
    assert_eq!(day.headline.as_deref(), Some("mostly cloudy / moderate rain"));

    // all the rain fell at dawn
    let dawn = day.parts.get(DayPart::Dawn);
    assert_eq!(dawn.rain, Some(RainIntensity::Moderate));
    assert_eq!(
        dawn.description.as_deref(),
        Some("mostly cloudy / moderate rain")
    );
    assert_eq!(day.parts.morning.rain, None);
}

#[test]
fn storm_with_rain_merges() {
    let samples = hourly_day(|h| {
        let s = Sample::new(at(3, h)).with_cloud_cover(95.0);
        if (14..16).contains(&h) {
            s.with_weather_code(95).with_precipitation(4.0)
        } else {
            s.with_weather_code(3).with_precipitation(0.0)
        }
    });
    let report = ForecastPipeline::default().run(&samples);
    let day = &report.days[0];

    assert_eq!(day.parts.afternoon.storm, Some(StormFrequency::Isolated));
    assert_eq!(
        day.parts.afternoon.description.as_deref(),
        Some("moderate rain with thunderstorms")
    );
    assert_eq!(day.headline.as_deref(), Some("moderate rain with thunderstorms"));
    assert_eq!(day.parts.morning.description.as_deref(), Some("overcast"));
}

#[test]
fn frequent_dry_storms() {
    let samples = hourly_day(|h| {
        let s = Sample::new(at(4, h)).with_cloud_cover(50.0);
        if h >= 18 {
            s.with_weather_code(96)
        } else {
            s
        }
    });
    let report = ForecastPipeline::default().run(&samples);
    let night = &report.days[0].parts.night;
    assert_eq!(night.storm, Some(StormFrequency::Frequent));
    assert_eq!(night.description.as_deref(), Some("frequent thunderstorms"));
}

#[test]
fn tie_break_is_order_independent() {
    // morning: three clear hours and three overcast hours
    let covers = [2.0, 95.0, 4.0, 97.0, 8.0, 99.0];
    let build = |order: &[f64]| -> Vec<Sample> {
        order
            .iter()
            .enumerate()
            .map(|(i, cover)| Sample::new(at(5, 6 + i as u32)).with_cloud_cover(*cover))
            .collect()
    };
    let mut reversed = covers;
    reversed.reverse();
    let shuffled = [97.0, 2.0, 99.0, 8.0, 95.0, 4.0];

    for tie_break in [TieBreak::MostCloudy, TieBreak::LeastCloudy, TieBreak::Mean] {
        let pipeline = ForecastPipeline::new(PipelineConfig {
            tie_break,
            ..PipelineConfig::default()
        })
        .unwrap();
        let sky = |order: &[f64]| pipeline.run(&build(order)).days[0].parts.morning.sky;
        let expected = sky(&covers[..]);
        assert!(expected.is_some());
        assert_eq!(sky(&reversed[..]), expected);
        assert_eq!(sky(&shuffled[..]), expected);
    }

    let default_sky = ForecastPipeline::default().run(&build(&covers[..])).days[0]
        .parts
        .morning
        .sky;
    assert_eq!(default_sky, Some(CloudCategory::Overcast));
}

#[test]
fn empty_parts_and_missing_fields_degrade() {
    // only afternoon hours, no temperature or cloud data
    let samples: Vec<Sample> = (12..18).map(|h| Sample::new(at(6, h))).collect();
    let report = ForecastPipeline::default().run(&samples);
    let day = &report.days[0];

    assert_eq!(day.summary.temperature, None);
    assert_eq!(day.summary.humidity, None);
    assert_eq!(day.parts.dawn.sample_count, 0);
    assert_eq!(day.parts.dawn.precipitation, None);
    assert_eq!(day.parts.dawn.description, None);
    assert_eq!(day.sky, None);

    // no cloud data: headline falls back to the inferred cloudiness
    let nebulosity = day.nebulosity.expect("inferred cloudiness");
    assert_eq!(day.headline.as_deref(), Some(nebulosity.phrase));

    let json = serde_json::to_string(&report).unwrap();
    assert!(!json.contains("inf"));
    assert!(!json.contains("NaN"));
}

#[test]
fn bucketing_preserves_every_sample() {
    let samples: Vec<Sample> = (1..=3)
        .flat_map(|d| (0..24).map(move |h| Sample::new(at(d, h)).with_temperature(h as f64)))
        .collect();
    let buckets = group_by_day(samples.clone());
    assert_eq!(buckets.len(), 3);

    let pipeline = ForecastPipeline::default();
    let report = pipeline.run(&samples);
    for day in &report.days {
        let counted: usize = day.parts.iter().map(|(_, p)| p.sample_count).sum();
        assert_eq!(counted, 24);
        let t = day.summary.temperature.unwrap();
        assert!(t.min <= t.max);
    }
}

#[test]
fn night_wraparound_moves_dawn_rain() {
    let samples: Vec<Sample> = (1..=2)
        .flat_map(|d| {
            (0..24).map(move |h| {
                let mm = if d == 2 && h == 3 { 6.0 } else { 0.0 };
                Sample::new(at(d, h)).with_cloud_cover(20.0).with_precipitation(mm)
            })
        })
        .collect();

    let plain = ForecastPipeline::default().run(&samples);
    assert_eq!(plain.days[0].parts.night.rain, None);
    assert_eq!(plain.days[1].parts.dawn.rain, Some(RainIntensity::Moderate));

    let wrapped = ForecastPipeline::new(PipelineConfig {
        night_wraparound: true,
        ..PipelineConfig::default()
    })
    .unwrap()
    .run(&samples);
    assert_eq!(wrapped.days[0].parts.night.sample_count, 12);
    assert_eq!(wrapped.days[0].parts.night.rain, Some(RainIntensity::Moderate));
    assert_eq!(wrapped.days[1].parts.dawn.sample_count, 0);
    // the calendar-day totals do not move
    assert_eq!(wrapped.days[1].summary.precipitation, Some(6.0));
    assert_eq!(wrapped.total_precipitation, 6.0);
}

#[test]
fn horizon_is_capped() {
    let samples: Vec<Sample> = (1..=20)
        .map(|d| Sample::new(at(d, 12)).with_precipitation(1.0))
        .collect();
    let report = ForecastPipeline::default().run(&samples);
    assert_eq!(report.days.len(), 15);
    assert_eq!(report.total_precipitation, 15.0);
}

#[test]
fn total_precipitation_matches_reported_days() {
    let samples: Vec<Sample> = (1..=6)
        .map(|d| Sample::new(at(d, 12)).with_precipitation(d as f64))
        .collect();
    let report = ForecastPipeline::new(PipelineConfig {
        max_days: 3,
        ..PipelineConfig::default()
    })
    .unwrap()
    .run(&samples);

    let reported: f64 = report
        .days
        .iter()
        .filter_map(|day| day.summary.precipitation)
        .sum();
    assert_eq!(report.days.len(), 3);
    // days 4-6 are past the horizon and do not count
    assert_eq!(report.total_precipitation, 6.0);
    assert_eq!(report.total_precipitation, reported);
}

#[test]
fn raw_rows_are_validated_first() {
    let rows = vec![
        RawSample {
            time: Some("2024-11-07T00:00".into()),
            cloud_cover: Some(130.0),
            ..RawSample::default()
        },
        RawSample {
            time: Some("2024-11-07T01:00".into()),
            cloud_cover: Some(-5.0),
            ..RawSample::default()
        },
    ];
    let report = ForecastPipeline::default().run_raw(rows).unwrap();
    // one overcast hour, one clear hour; default tie-break favours cloud
    assert_eq!(report.days[0].parts.dawn.sky, Some(CloudCategory::Overcast));
}
