//! Numeric kernels over one market's date-ordered series.
//!
//! All kernels treat `None` as missing and never produce NaN or infinity:
//! a result that would be non-finite is returned as `None`.

use std::collections::VecDeque;

/// Minimum and maximum of a window; both `None` until the window is warm.
pub type Extrema = (Option<f64>, Option<f64>);

fn finite(value: f64) -> Option<f64> {
    value.is_finite().then_some(value)
}

/// Element-wise combination of two aligned series.
#[must_use]
pub fn zip_with(
    a: &[Option<f64>],
    b: &[Option<f64>],
    f: impl Fn(f64, f64) -> f64,
) -> Vec<Option<f64>> {
    a.iter()
        .zip(b)
        .map(|(x, y)| match (x, y) {
            (Some(x), Some(y)) => finite(f(*x, *y)),
            _ => None,
        })
        .collect()
}

/// Element-wise transform of one series.
#[must_use]
pub fn map(values: &[Option<f64>], f: impl Fn(f64) -> f64) -> Vec<Option<f64>> {
    values.iter().map(|v| v.and_then(|x| finite(f(x)))).collect()
}

/// The series shifted down by `lag` rows.
#[must_use]
pub fn lagged(values: &[Option<f64>], lag: usize) -> Vec<Option<f64>> {
    (0..values.len())
        .map(|i| if i >= lag { values[i - lag] } else { None })
        .collect()
}

/// `current - value lag rows earlier`.
#[must_use]
pub fn diff(values: &[Option<f64>], lag: usize) -> Vec<Option<f64>> {
    zip_with(values, &lagged(values, lag), |cur, prev| cur - prev)
}

/// `(current - previous) / |previous|`, null when the previous value is zero.
#[must_use]
pub fn pct_change(values: &[Option<f64>], lag: usize) -> Vec<Option<f64>> {
    let prev = lagged(values, lag);
    values
        .iter()
        .zip(&prev)
        .map(|(cur, prev)| safe_ratio(cur.zip(*prev).map(|(c, p)| c - p), prev.map(f64::abs)))
        .collect()
}

/// `numerator / denominator`, null on a missing or zero denominator.
#[must_use]
pub fn safe_ratio(numerator: Option<f64>, denominator: Option<f64>) -> Option<f64> {
    match (numerator, denominator) {
        (Some(n), Some(d)) if d != 0.0 => finite(n / d),
        _ => None,
    }
}

/// Element-wise [`safe_ratio`].
#[must_use]
pub fn safe_ratios(numerator: &[Option<f64>], denominator: &[Option<f64>]) -> Vec<Option<f64>> {
    numerator
        .iter()
        .zip(denominator)
        .map(|(n, d)| safe_ratio(*n, *d))
        .collect()
}

/// Position of `value` inside `[min, max]`, null when the range is degenerate.
#[must_use]
pub fn heat_position(value: Option<f64>, min: Option<f64>, max: Option<f64>) -> Option<f64> {
    match (value, min, max) {
        (Some(v), Some(lo), Some(hi)) if hi > lo => finite((v - lo) / (hi - lo)),
        _ => None,
    }
}

/// Minimum and maximum over every non-null value.
#[must_use]
pub fn global_extrema(values: &[Option<f64>]) -> Extrema {
    values.iter().flatten().fold((None, None), |(lo, hi), &v| {
        (
            Some(lo.map_or(v, |lo: f64| lo.min(v))),
            Some(hi.map_or(v, |hi: f64| hi.max(v))),
        )
    })
}

/// Trailing `window`-row minimum and maximum.
///
/// A row gets extrema once its window holds at least `min_periods` non-null
/// values. Runs in linear time with two monotonic deques of row indices.
#[must_use]
pub fn rolling_extrema(values: &[Option<f64>], window: usize, min_periods: usize) -> Vec<Extrema> {
    let mut out = Vec::with_capacity(values.len());
    let mut lows: VecDeque<usize> = VecDeque::new();
    let mut highs: VecDeque<usize> = VecDeque::new();
    let mut observed = 0usize;

    for (i, value) in values.iter().enumerate() {
        if i >= window {
            let leaving = i - window;
            if values[leaving].is_some() {
                observed -= 1;
            }
            if lows.front() == Some(&leaving) {
                lows.pop_front();
            }
            if highs.front() == Some(&leaving) {
                highs.pop_front();
            }
        }

        if let Some(v) = *value {
            observed += 1;
            while lows.back().and_then(|&j| values[j]).is_some_and(|w| w >= v) {
                lows.pop_back();
            }
            lows.push_back(i);
            while highs.back().and_then(|&j| values[j]).is_some_and(|w| w <= v) {
                highs.pop_back();
            }
            highs.push_back(i);
        }

        if observed >= min_periods.max(1) {
            out.push((
                lows.front().and_then(|&j| values[j]),
                highs.front().and_then(|&j| values[j]),
            ));
        } else {
            out.push((None, None));
        }
    }
    out
}

/// True when the previous and current values are non-zero with opposite signs.
#[must_use]
pub fn is_sign_flip(previous: Option<f64>, current: Option<f64>) -> bool {
    match (previous, current) {
        (Some(p), Some(c)) => p != 0.0 && c != 0.0 && (p > 0.0) != (c > 0.0),
        _ => false,
    }
}

/// [`is_sign_flip`] against the prior row; the first row is never a flip.
#[must_use]
pub fn sign_flips(values: &[Option<f64>]) -> Vec<Option<bool>> {
    (0..values.len())
        .map(|i| Some(i > 0 && is_sign_flip(values[i - 1], values[i])))
        .collect()
}
