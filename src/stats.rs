//! Descriptive statistics over profit values
//!
//! Every reduction skips NaN and infinite inputs. Reductions that have no defined value
//! for the remaining inputs (mean of nothing, sample deviation of a single
//! value) return NaN rather than an error.

use serde::Serialize;
use std::collections::BTreeMap;

fn finite(values: &[f64]) -> Vec<f64> {
    values.iter().copied().filter(|v| v.is_finite()).collect()
}

/// Sum of the finite values; zero for an empty slice
pub fn sum(values: &[f64]) -> f64 {
    values.iter().filter(|v| v.is_finite()).sum()
}

pub fn mean(values: &[f64]) -> f64 {
    let values = finite(values);
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

pub fn median(values: &[f64]) -> f64 {
    let mut values = finite(values);
    if values.is_empty() {
        return f64::NAN;
    }
    values.sort_by(f64::total_cmp);
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        (values[mid - 1] + values[mid]) / 2.0
    } else {
        values[mid]
    }
}

/// Sample standard deviation (N-1 denominator)
pub fn sample_std_dev(values: &[f64]) -> f64 {
    let values = finite(values);
    if values.len() < 2 {
        return f64::NAN;
    }
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    let variance = values
        .iter()
        .map(|&x| {
            let diff = x - mean;
            diff * diff
        })
        .sum::<f64>()
        / (values.len() - 1) as f64;
    variance.sqrt()
}

/// Mean, median and spread of Net Profit Change over a selection
#[derive(Clone, Copy, Debug, Serialize)]
pub struct ChangeSummary {
    pub count: usize,
    pub mean: f64,
    pub median: f64,
    pub std_dev: f64,
}

impl ChangeSummary {
    pub fn from_values(values: &[f64]) -> Self {
        ChangeSummary {
            count: values.len(),
            mean: mean(values),
            median: median(values),
            std_dev: sample_std_dev(values),
        }
    }
}

/// Profit totals over the whole loaded table
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct GrandTotals {
    pub net_profit: f64,
    pub highest_net_profit: f64,
    pub change: f64,
}

impl GrandTotals {
    pub fn new(net_profit: f64, highest_net_profit: f64) -> Self {
        GrandTotals {
            net_profit,
            highest_net_profit,
            change: highest_net_profit - net_profit,
        }
    }
}

/// A labelled sum, one bar of a grouped chart
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct GroupTotal {
    pub key: String,
    pub total: f64,
}

/// Sum `value` per key, keys in sorted order
///
/// Items whose key is `None` are left out, as are NaN and infinite values.
pub fn group_sum<'a, T: 'a>(
    items: impl IntoIterator<Item = &'a T>,
    key: impl Fn(&T) -> Option<&str>,
    value: impl Fn(&T) -> f64,
) -> Vec<GroupTotal> {
    let mut groups: BTreeMap<&str, f64> = BTreeMap::new();
    for item in items {
        if let Some(k) = key(item) {
            let total = groups.entry(k).or_insert(0.0);
            let v = value(item);
            if v.is_finite() {
                *total += v;
            }
        }
    }
    groups
        .into_iter()
        .map(|(key, total)| GroupTotal {
            key: key.to_string(),
            total,
        })
        .collect()
}

/// One histogram bucket, `[start, end)` except the last which is closed
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Bin {
    pub start: f64,
    pub end: f64,
    pub count: usize,
}

/// Equal-width histogram of the finite values
///
/// A single distinct value gets one bin of width 1 centred on it; an empty
/// input gets no bins.
pub fn histogram(values: &[f64], bins: usize) -> Vec<Bin> {
    let values = finite(values);
    if values.is_empty() || bins == 0 {
        return Vec::new();
    }

    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if min == max {
        return vec![Bin {
            start: min - 0.5,
            end: max + 0.5,
            count: values.len(),
        }];
    }

    let width = (max - min) / bins as f64;
    let mut result: Vec<Bin> = (0..bins)
        .map(|i| Bin {
            start: min + width * i as f64,
            end: if i + 1 == bins {
                max
            } else {
                min + width * (i + 1) as f64
            },
            count: 0,
        })
        .collect();

    for v in values {
        let index = (((v - min) / width) as usize).min(bins - 1);
        result[index].count += 1;
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_of_two_changes() {
        let summary = ChangeSummary::from_values(&[50.0, -20.0]);
        assert_eq!(summary.count, 2);
        assert_eq!(summary.mean, 15.0);
        assert_eq!(summary.median, 15.0);
        assert!((summary.std_dev - 49.49747468305833).abs() < 1e-9);
    }

    #[test]
    fn undefined_statistics_are_nan() {
        let empty = ChangeSummary::from_values(&[]);
        assert!(empty.mean.is_nan());
        assert!(empty.median.is_nan());
        assert!(empty.std_dev.is_nan());

        let single = ChangeSummary::from_values(&[4.0]);
        assert_eq!(single.mean, 4.0);
        assert_eq!(single.median, 4.0);
        assert!(single.std_dev.is_nan());
    }

    #[test]
    fn nan_values_are_skipped() {
        let values = [1.0, f64::NAN, 3.0];
        assert_eq!(sum(&values), 4.0);
        assert_eq!(mean(&values), 2.0);
        assert_eq!(median(&values), 2.0);
        assert_eq!(sum(&[]), 0.0);
    }

    #[test]
    fn infinite_values_are_skipped() {
        let values = [2.0, f64::INFINITY, 4.0, f64::NEG_INFINITY];
        assert_eq!(sum(&values), 6.0);
        assert_eq!(mean(&values), 3.0);
        assert_eq!(median(&values), 3.0);
        assert!(sample_std_dev(&[1.0, f64::INFINITY]).is_nan());

        let bins = histogram(&values, 20);
        assert_eq!(bins.len(), 20);
        assert_eq!(bins[0].start, 2.0);
        assert_eq!(bins[19].end, 4.0);
        assert_eq!(bins.iter().map(|b| b.count).sum::<usize>(), 2);
        assert!(histogram(&[f64::INFINITY], 20).is_empty());
    }

    #[test]
    fn median_of_odd_count() {
        assert_eq!(median(&[9.0, 1.0, 5.0]), 5.0);
    }

    #[test]
    fn group_sum_sorts_keys_and_skips_missing() {
        let items = vec![
            (Some("dr b"), 10.0),
            (Some("dr a"), 1.0),
            (None, 100.0),
            (Some("dr b"), 5.0),
            (Some("dr a"), f64::NAN),
        ];
        let totals = group_sum(&items, |(k, _)| *k, |(_, v)| *v);
        assert_eq!(
            totals,
            vec![
                GroupTotal { key: "dr a".into(), total: 1.0 },
                GroupTotal { key: "dr b".into(), total: 15.0 },
            ]
        );

        let none: Vec<(Option<&str>, f64)> = Vec::new();
        assert!(group_sum(&none, |(k, _)| *k, |(_, v)| *v).is_empty());
    }

    #[test]
    fn histogram_counts_every_value() {
        let values = [0.0, 1.0, 2.0, 3.0, 10.0];
        let bins = histogram(&values, 5);
        assert_eq!(bins.len(), 5);
        assert_eq!(bins.iter().map(|b| b.count).sum::<usize>(), 5);
        assert_eq!(bins[0].count, 2);
        assert_eq!(bins[4].count, 1);
        assert_eq!(bins[4].end, 10.0);
    }

    #[test]
    fn histogram_edge_cases() {
        assert!(histogram(&[], 20).is_empty());
        let single = histogram(&[7.0, 7.0], 20);
        assert_eq!(single.len(), 1);
        assert_eq!(single[0].count, 2);
    }
}
