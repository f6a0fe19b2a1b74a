//! Figures drawn with `plotters` into PNG files, all sharing one [`Style`].
//!
//! [`Style`]: crate::style::Style

use {
    anyhow::{Context, Result},
    std::{fs, ops::Range, path::Path},
};

pub mod contour;
pub mod convergence;
pub mod forces;
pub mod gridline;

/// Smallest and largest finite values, `None` if there are none
pub fn data_range<I: IntoIterator<Item = f64>>(values: I) -> Option<(f64, f64)> {
    values
        .into_iter()
        .filter(|v| v.is_finite())
        .fold(None, |range, v| match range {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
}

/// Axis range from configured limits, missing or infinite ones replaced by the data bounds.
///
/// A degenerate range is widened by one unit around its value.
pub fn axis_range(limits: [Option<f64>; 2], data: (f64, f64)) -> Range<f64> {
    let pick = |limit: Option<f64>, fallback: f64| match limit {
        Some(l) if l.is_finite() => l,
        _ => fallback,
    };
    let (lower, upper) = (pick(limits[0], data.0), pick(limits[1], data.1));

    if upper > lower {
        lower..upper
    } else {
        lower - 0.5..lower + 0.5
    }
}

/// Splits a polyline into the visible pieces of a dashed line, `length` segments each.
pub fn dashes(points: &[(f64, f64)], length: usize) -> Vec<Vec<(f64, f64)>> {
    let length = length.max(1);
    let last = points.len().saturating_sub(1);

    (0..last)
        .step_by(2 * length)
        .map(|start| points[start..=(start + length).min(last)].to_vec())
        .collect()
}

/// Creates the directory that will hold `path`.
pub fn create_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }

    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn ranges() {
        assert_eq!(data_range(vec![2.0, f64::NAN, -1.0, f64::INFINITY]), Some((-1.0, 2.0)));
        assert_eq!(data_range(vec![f64::NAN]), None);

        assert_eq!(axis_range([None, Some(3.0)], (-1.0, 2.0)), -1.0..3.0);
        assert_eq!(axis_range([Some(f64::NEG_INFINITY), None], (-1.0, 2.0)), -1.0..2.0);
        assert_eq!(axis_range([None, None], (1.0, 1.0)), 0.5..1.5);
    }

    #[test]
    fn dashed_polyline() {
        let points = (0..10).map(|i| (i as f64, 0.0)).collect::<Vec<_>>();
        let pieces = dashes(&points, 2);

        assert_eq!(pieces.len(), 3);
        assert_eq!(pieces[0], points[0..=2].to_vec());
        assert_eq!(pieces[1], points[4..=6].to_vec());
        assert_eq!(pieces[2], points[8..=9].to_vec());
        assert!(dashes(&points[..1], 2).is_empty());
    }
}
