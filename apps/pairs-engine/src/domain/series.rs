//! Timestamp-Indexed Series
//!
//! A minimal column type for analytics: an ascending millisecond index and one
//! optional value per index position. `None` marks a missing value (not enough
//! data for a rolling window, a degenerate window, or a gap after alignment).

use crate::domain::market::Bar;

/// Series of optional values keyed by millisecond timestamps.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TimeSeries {
    index: Vec<i64>,
    values: Vec<Option<f64>>,
}

impl TimeSeries {
    /// Build from parallel index/value vectors.
    ///
    /// Non-finite values are stored as missing. Panics in debug builds when
    /// the lengths differ; release builds truncate to the shorter side.
    #[must_use]
    pub fn new(index: Vec<i64>, values: Vec<Option<f64>>) -> Self {
        debug_assert_eq!(index.len(), values.len(), "index/value length mismatch");
        let len = index.len().min(values.len());
        let mut index = index;
        let mut values = values;
        index.truncate(len);
        values.truncate(len);
        for v in &mut values {
            if v.is_some_and(|x| !x.is_finite()) {
                *v = None;
            }
        }
        Self { index, values }
    }

    /// Build from fully-populated `(timestamp, value)` points.
    #[must_use]
    pub fn from_points<I>(points: I) -> Self
    where
        I: IntoIterator<Item = (i64, f64)>,
    {
        let (index, values): (Vec<i64>, Vec<Option<f64>>) =
            points.into_iter().map(|(t, v)| (t, Some(v))).unzip();
        Self::new(index, values)
    }

    /// Close prices of a bar sequence, indexed by period start.
    #[must_use]
    pub fn closes(bars: &[Bar]) -> Self {
        Self::from_points(bars.iter().map(|b| (b.period_start_ms, b.close)))
    }

    /// Series with the given index and every value missing.
    #[must_use]
    pub fn missing(index: Vec<i64>) -> Self {
        let values = vec![None; index.len()];
        Self { index, values }
    }

    /// Number of index positions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// Whether the series has no index positions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Timestamps.
    #[must_use]
    pub fn index(&self) -> &[i64] {
        &self.index
    }

    /// Values (missing as `None`).
    #[must_use]
    pub fn values(&self) -> &[Option<f64>] {
        &self.values
    }

    /// Value at a position, if present and defined.
    #[must_use]
    pub fn get(&self, pos: usize) -> Option<f64> {
        self.values.get(pos).copied().flatten()
    }

    /// Iterate `(timestamp, value)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (i64, Option<f64>)> + '_ {
        self.index.iter().copied().zip(self.values.iter().copied())
    }

    /// Only the defined points, in index order.
    pub fn defined(&self) -> impl Iterator<Item = (i64, f64)> + '_ {
        self.iter().filter_map(|(t, v)| v.map(|v| (t, v)))
    }

    /// Number of defined values.
    #[must_use]
    pub fn count_defined(&self) -> usize {
        self.values.iter().filter(|v| v.is_some()).count()
    }

    /// Last defined value, if any.
    #[must_use]
    pub fn last_defined(&self) -> Option<f64> {
        self.values.iter().rev().find_map(|v| *v)
    }

    /// Copy of the series without missing positions.
    #[must_use]
    pub fn dropna(&self) -> Self {
        Self::from_points(self.defined())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_finite_values_become_missing() {
        let s = TimeSeries::new(vec![1, 2, 3], vec![Some(1.0), Some(f64::NAN), None]);
        assert_eq!(s.values(), &[Some(1.0), None, None]);
        assert_eq!(s.count_defined(), 1);
    }

    #[test]
    fn last_defined_skips_trailing_gaps() {
        let s = TimeSeries::new(vec![1, 2, 3], vec![Some(1.0), Some(2.0), None]);
        assert_eq!(s.last_defined(), Some(2.0));
        assert_eq!(TimeSeries::missing(vec![1, 2]).last_defined(), None);
    }

    #[test]
    fn dropna_keeps_index_of_defined_points() {
        let s = TimeSeries::new(vec![1, 2, 3], vec![None, Some(2.0), Some(3.0)]);
        let d = s.dropna();
        assert_eq!(d.index(), &[2, 3]);
        assert_eq!(d.values(), &[Some(2.0), Some(3.0)]);
    }
}
