use crate::models::PriceSample;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Rolling-window averages used by the listing price pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PriceAverages {
    pub last_30d: f64,
    pub last_90d: f64,
    pub last_180d: f64,
}

/// Windowed means over a record's price history.
pub struct TimeSeriesAggregator;

impl TimeSeriesAggregator {
    /// Mean of the samples recorded at or after `now - window_days`, or `0.0` when the
    /// window holds no samples.
    pub fn average(history: &[PriceSample], window_days: i64, now: DateTime<Utc>) -> f64 {
        let since = now - Duration::days(window_days);
        let (sum, count) = history
            .iter()
            .filter(|sample| sample.recorded_at >= since)
            .fold((0.0, 0_usize), |(sum, count), sample| {
                (sum + sample.price, count + 1)
            });

        if count == 0 {
            0.0
        } else {
            sum / count as f64
        }
    }

    pub fn averages(history: &[PriceSample], now: DateTime<Utc>) -> PriceAverages {
        PriceAverages {
            last_30d: Self::average(history, 30, now),
            last_90d: Self::average(history, 90, now),
            last_180d: Self::average(history, 180, now),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use proptest::prelude::*;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn empty_history_averages_to_zero() {
        assert_eq!(TimeSeriesAggregator::average(&[], 30, now()), 0.0);
    }

    #[test]
    fn single_in_window_sample_is_the_average() {
        let history = [PriceSample::new(100.0, now() - Duration::days(3))];
        assert_eq!(TimeSeriesAggregator::average(&history, 30, now()), 100.0);
    }

    #[test]
    fn samples_outside_the_window_are_ignored() {
        let history = [
            PriceSample::new(10_000.0, now() - Duration::days(45)),
            PriceSample::new(100.0, now() - Duration::days(10)),
            PriceSample::new(200.0, now() - Duration::days(1)),
        ];

        let averages = TimeSeriesAggregator::averages(&history, now());
        assert_eq!(averages.last_30d, 150.0);
        assert!((averages.last_90d - 3_433.333).abs() < 0.001);
        assert_eq!(averages.last_90d, averages.last_180d);
    }

    #[test]
    fn window_boundary_is_inclusive() {
        let history = [PriceSample::new(50.0, now() - Duration::days(30))];
        assert_eq!(TimeSeriesAggregator::average(&history, 30, now()), 50.0);
    }

    proptest! {
        #[test]
        fn average_lies_within_sample_range(
            prices in prop::collection::vec(0.0_f64..100_000.0, 1..40),
            ages in prop::collection::vec(0_i64..29, 40),
        ) {
            let history: Vec<_> = prices
                .iter()
                .zip(ages.iter())
                .map(|(price, age)| PriceSample::new(*price, now() - Duration::days(*age)))
                .collect();

            let average = TimeSeriesAggregator::average(&history, 30, now());
            let min = prices.iter().cloned().fold(f64::INFINITY, f64::min);
            let max = prices.iter().cloned().fold(f64::NEG_INFINITY, f64::max);

            prop_assert!(average >= min - 1e-6 && average <= max + 1e-6);
        }
    }
}
