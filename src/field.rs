//! Two-dimensional fields on Cartesian stations.

use {
    anyhow::{ensure, Context, Result},
    ndarray::{Array1, Array2, Axis, Zip},
    serde::{Deserialize, Serialize},
};

/// Tolerance used to decide whether a gridline position matches a station
const GRIDLINE_TOLERANCE: f64 = 1.0E-06;

/// Absolute tolerance defining shared nodes between two grids
pub const RESTRICTION_TOLERANCE: f64 = 1.0E-12;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Norm {
    L2,
    Linf,
}

impl Norm {
    /// Frobenius norm for `L2`, maximum absolute row sum for `Linf`.
    pub fn of(self, values: &Array2<f64>) -> f64 {
        match self {
            Norm::L2 => values.iter().map(|v| v * v).sum::<f64>().sqrt(),
            Norm::Linf => values
                .axis_iter(Axis(0))
                .map(|row| row.iter().map(|v| v.abs()).sum::<f64>())
                .fold(0.0, f64::max),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Norm::L2 => "L2",
            Norm::Linf => "Linf",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub label: String,
    pub time_step: Option<usize>,
    pub x: Array1<f64>,
    pub y: Array1<f64>,
    /// Nodal values indexed `[j, i]`, row `j` along y and column `i` along x
    pub values: Array2<f64>,
}

impl Field {
    pub fn new<S: Into<String>>(
        label: S,
        time_step: Option<usize>,
        x: Array1<f64>,
        y: Array1<f64>,
        values: Array2<f64>,
    ) -> Result<Self> {
        let label = label.into();
        ensure!(
            values.dim() == (y.len(), x.len()),
            "{} values have shape {:?}, stations need ({}, {})",
            label,
            values.dim(),
            y.len(),
            x.len()
        );

        Ok(Self {
            label,
            time_step,
            x,
            y,
            values,
        })
    }

    /// Builds a field from a flat row-major vector of values
    pub fn from_vec<S: Into<String>>(
        label: S,
        time_step: Option<usize>,
        x: Array1<f64>,
        y: Array1<f64>,
        values: Vec<f64>,
    ) -> Result<Self> {
        let label = label.into();
        let values = Array2::from_shape_vec((y.len(), x.len()), values)
            .with_context(|| format!("Cannot shape {} values onto the stations", label))?;

        Self::new(label, time_step, x, y, values)
    }

    pub fn min(&self) -> f64 {
        self.values.iter().cloned().fold(f64::INFINITY, f64::min)
    }

    pub fn max(&self) -> f64 {
        self.values.iter().cloned().fold(f64::NEG_INFINITY, f64::max)
    }

    pub fn is_uniform(&self) -> bool {
        (self.max() - self.min()).abs() <= 1.0E-06
    }

    /// Difference between this field and `other`, which must share the same shape.
    pub fn subtract(&self, other: &Field, label: Option<&str>) -> Result<Field> {
        ensure!(
            self.values.dim() == other.values.dim(),
            "Cannot subtract {} {:?} from {} {:?}",
            other.label,
            other.values.dim(),
            self.label,
            self.values.dim()
        );

        Field::new(
            label.unwrap_or(&self.label),
            self.time_step,
            self.x.clone(),
            self.y.clone(),
            &self.values - &other.values,
        )
    }

    /// Restriction onto a coarser grid whose stations all exist in this grid
    pub fn restriction(&self, x: &Array1<f64>, y: &Array1<f64>, atol: f64) -> Result<Field> {
        let columns = shared_indices(&self.x, x, atol);
        let rows = shared_indices(&self.y, y, atol);
        ensure!(
            columns.len() == x.len() && rows.len() == y.len(),
            "{} grid does not contain all the {}x{} coarse nodes (found {}x{})",
            self.label,
            x.len(),
            y.len(),
            columns.len(),
            rows.len()
        );

        Field::new(
            format!("{}-restricted", self.label),
            self.time_step,
            self.x.select(Axis(0), &columns),
            self.y.select(Axis(0), &rows),
            self.values.select(Axis(0), &rows).select(Axis(1), &columns),
        )
    }

    /// Norm of the difference with `exact`, both restricted onto the `mask` stations.
    pub fn difference(&self, exact: &Field, mask: &Field, norm: Norm) -> Result<f64> {
        let field = self.restriction(&mask.x, &mask.y, RESTRICTION_TOLERANCE)?;
        let exact = exact.restriction(&mask.x, &mask.y, RESTRICTION_TOLERANCE)?;

        Ok(norm.of(&(&field.values - &exact.values)))
    }

    /// Values along the vertical gridline at `x`, interpolated between gridlines if needed.
    pub fn vertical_gridline(&self, x: f64) -> Result<(Array1<f64>, Array1<f64>)> {
        let values = match gridline_weights(&self.x, x) {
            Some(Weights::Exact(i)) => self.values.column(i).to_owned(),
            Some(Weights::Between(i, wl, wr)) => {
                let mut values = self.values.column(i - 1).to_owned();
                Zip::from(&mut values)
                    .and(self.values.column(i))
                    .apply(|l, &r| *l = wl * *l + wr * r);
                values
            }
            None => anyhow::bail!("x={} lies outside the {} stations", x, self.label),
        };

        Ok((self.y.clone(), values))
    }

    /// Values along the horizontal gridline at `y`, interpolated between gridlines if needed.
    pub fn horizontal_gridline(&self, y: f64) -> Result<(Array1<f64>, Array1<f64>)> {
        let values = match gridline_weights(&self.y, y) {
            Some(Weights::Exact(j)) => self.values.row(j).to_owned(),
            Some(Weights::Between(j, wl, wr)) => {
                let mut values = self.values.row(j - 1).to_owned();
                Zip::from(&mut values)
                    .and(self.values.row(j))
                    .apply(|l, &r| *l = wl * *l + wr * r);
                values
            }
            None => anyhow::bail!("y={} lies outside the {} stations", y, self.label),
        };

        Ok((self.x.clone(), values))
    }
}

/// Indices of `fine` stations lying within `atol` of any `coarse` station
fn shared_indices(fine: &Array1<f64>, coarse: &Array1<f64>, atol: f64) -> Vec<usize> {
    fine.iter()
        .enumerate()
        .filter(|(_, f)| coarse.iter().any(|c| (*f - c).abs() <= atol))
        .map(|(i, _)| i)
        .collect()
}

enum Weights {
    Exact(usize),
    /// Index of the station after the position, weights of the previous and next stations
    Between(usize, f64, f64),
}

fn gridline_weights(stations: &Array1<f64>, position: f64) -> Option<Weights> {
    if let Some(i) = stations
        .iter()
        .position(|s| (s - position).abs() <= GRIDLINE_TOLERANCE)
    {
        return Some(Weights::Exact(i));
    }

    let i = stations.iter().position(|&s| s > position)?;
    if i == 0 {
        return None;
    }

    let width = (stations[i] - stations[i - 1]).abs();
    Some(Weights::Between(
        i,
        (stations[i] - position).abs() / width,
        (stations[i - 1] - position).abs() / width,
    ))
}

/// Keeps the stations (and matching values) lying within `[start, end]`
pub fn clip(stations: &Array1<f64>, values: &Array1<f64>, start: f64, end: f64) -> (Vec<f64>, Vec<f64>) {
    stations
        .iter()
        .zip(values.iter())
        .filter(|(s, _)| **s >= start && **s <= end)
        .map(|(s, v)| (*s, *v))
        .unzip()
}

#[cfg(test)]
mod test {
    use {
        super::*,
        approx::assert_abs_diff_eq,
        ndarray::{arr1, arr2, Array},
    };

    fn ramp() -> Field {
        // f(x, y) = x + 10 y on x = [0, 1, 2, 3], y = [0, 1, 2]
        let x = Array::linspace(0.0, 3.0, 4);
        let y = Array::linspace(0.0, 2.0, 3);
        let values = Array2::from_shape_fn((3, 4), |(j, i)| i as f64 + 10.0 * j as f64);
        Field::new("pressure", Some(100), x, y, values).unwrap()
    }

    #[test]
    fn shape_mismatch_is_rejected() {
        assert!(Field::new(
            "pressure",
            None,
            arr1(&[0.0, 1.0]),
            arr1(&[0.0]),
            Array2::<f64>::zeros((2, 2))
        )
        .is_err());
    }

    #[test]
    fn extrema_and_uniformity() {
        let f = ramp();
        assert_abs_diff_eq!(f.min(), 0.0);
        assert_abs_diff_eq!(f.max(), 23.0);
        assert!(!f.is_uniform());

        let mut g = f.clone();
        g.values.fill(1.5);
        assert!(g.is_uniform());
    }

    #[test]
    fn subtract_keeps_label_unless_given() {
        let f = ramp();
        let zero = f.subtract(&f, None).unwrap();
        assert_eq!(zero.label, "pressure");
        assert_abs_diff_eq!(zero.values, Array2::<f64>::zeros((3, 4)));

        let named = f.subtract(&f, Some("pressure-subtracted")).unwrap();
        assert_eq!(named.label, "pressure-subtracted");

        let mut other = f.clone();
        other.values = Array2::<f64>::zeros((2, 2));
        assert!(f.subtract(&other, None).is_err());
    }

    #[test]
    fn restriction_onto_coarse_stations() {
        let f = ramp();
        let r = f
            .restriction(&arr1(&[0.0, 2.0]), &arr1(&[0.0, 2.0]), RESTRICTION_TOLERANCE)
            .unwrap();

        assert_eq!(r.label, "pressure-restricted");
        assert_abs_diff_eq!(r.values, arr2(&[[0.0, 2.0], [20.0, 22.0]]));

        assert!(f
            .restriction(&arr1(&[0.5]), &arr1(&[0.0]), RESTRICTION_TOLERANCE)
            .is_err());
    }

    #[test]
    fn difference_norms() {
        let f = ramp();
        let mut exact = f.clone();
        exact.values.mapv_inplace(|v| v - 1.0);
        let mask = f
            .restriction(&arr1(&[0.0, 1.0]), &arr1(&[0.0, 1.0]), RESTRICTION_TOLERANCE)
            .unwrap();

        // 2x2 block of ones
        assert_abs_diff_eq!(f.difference(&exact, &mask, Norm::L2).unwrap(), 2.0);
        assert_abs_diff_eq!(f.difference(&exact, &mask, Norm::Linf).unwrap(), 2.0);
    }

    #[test]
    fn vertical_gridline() {
        let f = ramp();

        let (y, exact) = f.vertical_gridline(1.0).unwrap();
        assert_abs_diff_eq!(y, f.y);
        assert_abs_diff_eq!(exact, arr1(&[1.0, 11.0, 21.0]));

        let (_, interpolated) = f.vertical_gridline(1.25).unwrap();
        assert_abs_diff_eq!(interpolated, arr1(&[1.25, 11.25, 21.25]), epsilon = 1.0E-12);

        assert!(f.vertical_gridline(-1.0).is_err());
        assert!(f.vertical_gridline(4.0).is_err());
    }

    #[test]
    fn horizontal_gridline() {
        let f = ramp();

        let (x, exact) = f.horizontal_gridline(2.0).unwrap();
        assert_abs_diff_eq!(x, f.x);
        assert_abs_diff_eq!(exact, arr1(&[20.0, 21.0, 22.0, 23.0]));

        let (x, interpolated) = f.horizontal_gridline(0.5).unwrap();
        assert_abs_diff_eq!(x, f.x);
        assert_abs_diff_eq!(interpolated, arr1(&[5.0, 6.0, 7.0, 8.0]), epsilon = 1.0E-12);
    }

    #[test]
    fn clip_to_boundaries() {
        let (s, v) = clip(&arr1(&[0.0, 1.0, 2.0, 3.0]), &arr1(&[5.0, 6.0, 7.0, 8.0]), 0.5, 2.0);
        assert_eq!(s, vec![1.0, 2.0]);
        assert_eq!(v, vec![6.0, 7.0]);
    }
}
