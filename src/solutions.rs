//! Analytical solutions used as exact references in convergence studies.

use {
    crate::{
        field::Field,
        grid::Grid,
        petsc::write_vec,
        simulation::{Direction, FieldName},
        utils::time_step_directory,
    },
    anyhow::{Context, Result},
    log::info,
    ndarray::{s, Array1, Array2, Axis},
    std::{
        collections::BTreeMap,
        f64::consts::PI,
        fs,
        path::{Path, PathBuf},
    },
};

/// Taylor-Green like vortices advected diagonally, on a domain mapped to `[0, 2π]²`.
#[derive(Debug, Clone, PartialEq)]
pub struct MovingVortices {
    bottom_left: [f64; 2],
    top_right: [f64; 2],
    time: f64,
}

impl MovingVortices {
    pub fn new(grid: &Grid, time: f64) -> Self {
        let [x0, y0, x1, y1] = grid.bounds();

        Self {
            bottom_left: [x0, y0],
            top_right: [x1, y1],
            time,
        }
    }

    /// Position mapped onto `[0, 2π]` and shifted by the advection
    fn phase(&self, s: f64, direction: usize) -> f64 {
        let (lo, hi) = (self.bottom_left[direction], self.top_right[direction]);
        2.0 * PI * (s - lo) / (hi - lo) - 2.0 * PI * self.time
    }

    /// Both velocity components at every `(x[i], y[j])`, indexed `[j, i]`
    pub fn velocity(&self, x: &Array1<f64>, y: &Array1<f64>) -> (Array2<f64>, Array2<f64>) {
        let shape = (y.len(), x.len());
        let u = Array2::from_shape_fn(shape, |(j, i)| {
            1.0 - 2.0 * self.phase(x[i], 0).cos() * self.phase(y[j], 1).sin()
        });
        let v = Array2::from_shape_fn(shape, |(j, i)| {
            1.0 + 2.0 * self.phase(x[i], 0).sin() * self.phase(y[j], 1).cos()
        });

        (u, v)
    }

    pub fn pressure(&self, x: &Array1<f64>, y: &Array1<f64>) -> Array2<f64> {
        Array2::from_shape_fn((y.len(), x.len()), |(j, i)| {
            -(2.0 * self.phase(x[i], 0)).cos() - (2.0 * self.phase(y[j], 1)).cos()
        })
    }

    /// Velocity components and pressure at the staggered locations of `grid`.
    pub fn fields(&self, grid: &Grid, time_step: Option<usize>) -> Result<BTreeMap<String, Field>> {
        let (xu, yu) = (grid.interior(0), grid.centers(1));
        let (xv, yv) = (grid.centers(0), grid.interior(1));
        let (u, _) = self.velocity(&xu, &yu);
        let (_, v) = self.velocity(&xv, &yv);
        let p = self.pressure(&grid.centers(0), &grid.centers(1));

        Ok(vec![
            Field::new(FieldName::XVelocity.as_str(), time_step, xu, yu, u)?,
            Field::new(FieldName::YVelocity.as_str(), time_step, xv, yv, v)?,
            Field::new(FieldName::Pressure.as_str(), time_step, grid.centers(0), grid.centers(1), p)?,
        ]
        .into_iter()
        .map(|field| (field.label.clone(), field))
        .collect())
    }

    /// Writes the fluxes and a zero pressure as PETSc vectors in `<case>/0000000`.
    ///
    /// A periodic direction keeps the face on the last station.
    pub fn write_petsc_initial_conditions(
        &self,
        grid: &Grid,
        periodic: &[Direction],
        case: &Path,
    ) -> Result<PathBuf> {
        let (x, y) = (grid.x(), grid.y());

        let n_xu = x.len() - if periodic.contains(&Direction::X) { 1 } else { 2 };
        let xu = x.slice(s![1..=n_xu]).to_owned();
        let (u, _) = self.velocity(&xu, &grid.centers(1));
        let qx = u * &grid.widths(1).insert_axis(Axis(1));

        let n_yv = y.len() - if periodic.contains(&Direction::Y) { 1 } else { 2 };
        let yv = y.slice(s![1..=n_yv]).to_owned();
        let (_, v) = self.velocity(&grid.centers(0), &yv);
        let qy = v * &grid.widths(0);

        let directory = time_step_directory(case, 0);
        fs::create_dir_all(&directory)
            .with_context(|| format!("Failed to create {}", directory.display()))?;

        info!("Writing the x-fluxes ({}x{})", qx.nrows(), qx.ncols());
        write_vec(directory.join("qx.dat"), &qx.iter().cloned().collect::<Vec<_>>())?;
        info!("Writing the y-fluxes ({}x{})", qy.nrows(), qy.ncols());
        write_vec(directory.join("qy.dat"), &qy.iter().cloned().collect::<Vec<_>>())?;
        info!("Writing a zero pressure");
        write_vec(
            directory.join("phi.dat"),
            &vec![0.0; grid.n_cells(0) * grid.n_cells(1)],
        )?;

        Ok(directory)
    }
}

#[cfg(test)]
mod test {
    use {
        super::*,
        crate::{
            petsc::read_vec,
            simulation::{Simulation, Software},
        },
        approx::assert_abs_diff_eq,
        ndarray::arr1,
        tempdir::TempDir,
    };

    fn unit_square(n: usize) -> Grid {
        Grid::uniform(&[0.0, 0.0], &[1.0, 1.0], &[n, n]).unwrap()
    }

    #[test]
    fn analytical_values() {
        let exact = MovingVortices::new(&unit_square(4), 0.0);
        let (u, v) = exact.velocity(&arr1(&[0.0, 0.25]), &arr1(&[0.25]));
        let p = exact.pressure(&arr1(&[0.0]), &arr1(&[0.25]));

        assert_abs_diff_eq!(u[[0, 0]], -1.0, epsilon = 1.0E-12);
        assert_abs_diff_eq!(u[[0, 1]], 1.0, epsilon = 1.0E-12);
        assert_abs_diff_eq!(v[[0, 0]], 1.0, epsilon = 1.0E-12);
        assert_abs_diff_eq!(p[[0, 0]], 0.0, epsilon = 1.0E-12);
    }

    #[test]
    fn vortices_are_advected() {
        let exact = MovingVortices::new(&unit_square(4), 0.25);
        let (u, v) = exact.velocity(&arr1(&[0.25]), &arr1(&[0.25]));
        let p = exact.pressure(&arr1(&[0.25]), &arr1(&[0.25]));

        assert_abs_diff_eq!(u[[0, 0]], 1.0, epsilon = 1.0E-12);
        assert_abs_diff_eq!(v[[0, 0]], 1.0, epsilon = 1.0E-12);
        assert_abs_diff_eq!(p[[0, 0]], -2.0, epsilon = 1.0E-12);
    }

    #[test]
    fn staggered_fields() {
        let grid = unit_square(4);
        let fields = MovingVortices::new(&grid, 0.0).fields(&grid, Some(0)).unwrap();

        assert_eq!(fields["x-velocity"].values.dim(), (4, 3));
        assert_eq!(fields["y-velocity"].values.dim(), (3, 4));
        assert_eq!(fields["pressure"].values.dim(), (4, 4));
    }

    #[test]
    fn initial_conditions_read_back() {
        let dir = TempDir::new("flowpost").unwrap();
        fs::write(
            dir.path().join("grid.txt"),
            "4 4\n0\n0.25\n0.5\n0.75\n1\n0\n0.25\n0.5\n0.75\n1\n",
        )
        .unwrap();
        let grid = unit_square(4);
        let exact = MovingVortices::new(&grid, 0.0);

        let directory = exact
            .write_petsc_initial_conditions(&grid, &[Direction::X], dir.path())
            .unwrap();
        assert_eq!(read_vec(directory.join("qx.dat")).unwrap().len(), 16);
        assert_eq!(read_vec(directory.join("qy.dat")).unwrap().len(), 12);
        assert!(read_vec(directory.join("phi.dat"))
            .unwrap()
            .iter()
            .all(|&p| p == 0.0));

        let mut simulation = Simulation::new(None, dir.path(), Software::PetIBM);
        let (u, v) = simulation.read_velocity(0, &[Direction::X]).unwrap();
        let fields = exact.fields(&grid, Some(0)).unwrap();
        assert_abs_diff_eq!(u.values, fields["x-velocity"].values, epsilon = 1.0E-12);
        assert_abs_diff_eq!(v.values, fields["y-velocity"].values, epsilon = 1.0E-12);
    }
}
