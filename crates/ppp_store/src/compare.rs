//! Purchasing-power arithmetic on top of the stored factors.

use common::{is_valid_factor, YearPoint};
use serde::Serialize;

/// `amount` in the `from` country expressed with equal purchasing power in the `to` country.
///
/// ```
/// assert_eq!(ppp_store::compare::equivalent_amount(100.0, 20.0, 4.0), Some(20.0));
/// ```
pub fn equivalent_amount(amount: f64, from_factor: f64, to_factor: f64) -> Option<f64> {
    if !is_valid_factor(from_factor) || !to_factor.is_finite() {
        return None;
    }
    Some(amount * (to_factor / from_factor))
}

/// `to / from` for a single year.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RatioPoint {
    pub year: i32,
    pub ratio: f64,
}

/// Ratio over the years both series share, ascending by year.
pub fn ratio_series(from: &[YearPoint], to: &[YearPoint]) -> Vec<RatioPoint> {
    let mut out = Vec::new();
    let (mut i, mut j) = (0, 0);

    // Both inputs are sorted ascending by year.
    while i < from.len() && j < to.len() {
        let (a, b) = (from[i], to[j]);
        match a.year.cmp(&b.year) {
            std::cmp::Ordering::Less => i += 1,
            std::cmp::Ordering::Greater => j += 1,
            std::cmp::Ordering::Equal => {
                if let Some(ratio) = equivalent_amount(1.0, a.factor, b.factor) {
                    out.push(RatioPoint { year: a.year, ratio });
                }
                i += 1;
                j += 1;
            }
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(year: i32, factor: f64) -> YearPoint {
        YearPoint { year, factor }
    }

    #[test]
    fn test_equivalent_amount() {
        assert_eq!(equivalent_amount(100.0, 20.0, 4.0), Some(20.0));
        assert_eq!(equivalent_amount(100.0, 0.0, 4.0), None);
        assert_eq!(equivalent_amount(100.0, f64::NAN, 4.0), None);
    }

    #[test]
    fn test_ratio_series_intersects_years() {
        let from = vec![p(2000, 2.0), p(2001, 4.0), p(2003, 5.0)];
        let to = vec![p(1999, 1.0), p(2001, 2.0), p(2002, 3.0), p(2003, 10.0)];
        assert_eq!(
            ratio_series(&from, &to),
            vec![
                RatioPoint { year: 2001, ratio: 0.5 },
                RatioPoint { year: 2003, ratio: 2.0 },
            ]
        );
        assert!(ratio_series(&from, &[]).is_empty());
    }
}
