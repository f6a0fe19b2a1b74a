//! Grid-convergence analysis of solutions computed on grids with a constant refinement ratio.

use {
    crate::{
        field::{Field, Norm, RESTRICTION_TOLERANCE},
        simulation::{Direction, FieldName, Simulation, Software},
        solutions::MovingVortices,
        utils::time_step_name,
    },
    anyhow::{anyhow, ensure, Context, Result},
    log::info,
    ndarray::Zip,
    serde::Deserialize,
    std::{
        collections::BTreeMap,
        fmt::Write as _,
        fs,
        path::{Path, PathBuf},
    },
};

/// Safety factor of the grid convergence index when three grids are used
pub const SAFETY_FACTOR: f64 = 1.25;

/// Values smaller than this are excluded from relative differences
const SMALL_VALUE: f64 = 1.0E-06;

fn restrict(field: &Field, mask: &Field) -> Result<Field> {
    field.restriction(&mask.x, &mask.y, RESTRICTION_TOLERANCE)
}

/// Observed order of convergence from three consecutive solutions restricted onto `mask`.
pub fn observed_order(
    coarse: &Field,
    medium: &Field,
    fine: &Field,
    ratio: f64,
    mask: &Field,
    norm: Norm,
) -> Result<f64> {
    let (c, m, f) = (restrict(coarse, mask)?, restrict(medium, mask)?, restrict(fine, mask)?);

    Ok((norm.of(&(&m.values - &c.values)) / norm.of(&(&f.values - &m.values))).ln() / ratio.ln())
}

/// Grid convergence index (in percent) of two consecutive solutions, point by point.
///
/// Points where either solution is smaller than `1e-6` in magnitude are NaN.
pub fn grid_convergence_index(
    coarse: &Field,
    fine: &Field,
    order: f64,
    ratio: f64,
    mask: &Field,
) -> Result<Field> {
    let (c, f) = (restrict(coarse, mask)?, restrict(fine, mask)?);

    let mut gci = c.values.clone();
    Zip::from(&mut gci).and(&f.values).apply(|c, &f| {
        *c = if c.abs() < SMALL_VALUE || f.abs() < SMALL_VALUE {
            f64::NAN
        } else {
            SAFETY_FACTOR * ((*c - f) / f).abs() / (ratio.powf(order) - 1.0) * 100.0
        }
    });

    Field::new(format!("GCI-{}", coarse.label), coarse.time_step, mask.x.clone(), mask.y.clone(), gci)
}

/// Ratio of the coarse and fine grid convergence indices; values close to one mean the
/// solutions lie in the asymptotic range.
pub fn asymptotic_range(
    coarse: &Field,
    medium: &Field,
    fine: &Field,
    order: f64,
    ratio: f64,
    mask: &Field,
) -> Result<Field> {
    let gci_23 = grid_convergence_index(coarse, medium, order, ratio, mask)?;
    let gci_12 = grid_convergence_index(medium, fine, order, ratio, mask)?;

    Field::new(
        format!("asymptotic-range-{}", coarse.label),
        coarse.time_step,
        mask.x.clone(),
        mask.y.clone(),
        gci_23.values / (gci_12.values * ratio.powf(order)),
    )
}

/// Analytical solution used as the exact reference
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Analytical {
    MovingVortices { time: f64 },
}

/// Settings of a convergence study
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct StudyParameters {
    /// Directory holding one sub-directory per grid
    pub directory: PathBuf,
    pub software: Software,
    /// Sub-directories, from the coarsest to the finest grid
    pub cases: Vec<String>,
    /// Case whose stations restrict every solution; defaults to the coarsest
    pub mask: Option<String>,
    pub time_step: usize,
    pub fields: Vec<FieldName>,
    pub norms: Vec<Norm>,
    /// Triplets (coarse, medium, fine) used to estimate observed orders
    pub observed_orders: Vec<[String; 3]>,
    /// Estimate the observed orders with the three finest grids
    pub last_three: bool,
    pub periodic: Vec<Direction>,
    pub analytical: Option<Analytical>,
    /// Write contours of the asymptotic range of each triplet
    pub asymptotic_ranges: bool,
    pub save_name: Option<String>,
}

impl Default for StudyParameters {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("."),
            software: Software::PetIBM,
            cases: vec![],
            mask: None,
            time_step: 0,
            fields: vec![FieldName::Pressure, FieldName::XVelocity, FieldName::YVelocity],
            norms: vec![Norm::L2],
            observed_orders: vec![],
            last_three: false,
            periodic: vec![],
            analytical: None,
            asymptotic_ranges: false,
            save_name: None,
        }
    }
}

/// Errors of one field in one norm, per grid
#[derive(Debug, Clone, PartialEq)]
pub struct Errors {
    pub field: FieldName,
    pub norm: Norm,
    pub spacings: Vec<f64>,
    pub values: Vec<f64>,
}

/// Solutions of a convergence study, coarsest first
pub struct Study {
    pub simulations: Vec<Simulation>,
    pub params: StudyParameters,
}

impl Study {
    pub fn load(params: &StudyParameters) -> Result<Self> {
        ensure!(!params.cases.is_empty(), "No case listed for the convergence study");

        let simulations = params
            .cases
            .iter()
            .map(|case| {
                let mut s = Simulation::new(
                    Some(case.as_str()),
                    params.directory.join(case),
                    params.software,
                );
                s.read_fields(&params.fields, params.time_step, &params.periodic)?;
                Ok(s)
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            simulations,
            params: params.clone(),
        })
    }

    pub fn simulation(&self, description: &str) -> Result<&Simulation> {
        self.simulations
            .iter()
            .find(|s| s.description == description)
            .ok_or_else(|| anyhow!("No case {} in the convergence study", description))
    }

    fn mask(&self) -> Result<&Simulation> {
        match &self.params.mask {
            Some(name) => self.simulation(name),
            None => self
                .simulations
                .first()
                .ok_or_else(|| anyhow!("Empty convergence study")),
        }
    }

    /// Triplets configured for observed orders, or the three finest grids
    pub fn triplets(&self) -> Result<Vec<[&Simulation; 3]>> {
        if self.params.last_three {
            let n = self.simulations.len();
            ensure!(n >= 3, "Three grids are needed, got {}", n);
            return Ok(vec![[
                &self.simulations[n - 3],
                &self.simulations[n - 2],
                &self.simulations[n - 1],
            ]]);
        }

        self.params
            .observed_orders
            .iter()
            .map(|[c, m, f]| Ok([self.simulation(c)?, self.simulation(m)?, self.simulation(f)?]))
            .collect()
    }

    /// Observed order of every field for the triplet, using the first configured norm.
    pub fn observed_orders(&self, triplet: [&Simulation; 3]) -> Result<BTreeMap<FieldName, f64>> {
        let [coarse, medium, fine] = triplet;
        info!(
            "Computing observed orders of convergence using the grids {}, {} and {}",
            coarse.description, medium.description, fine.description
        );
        let ratio = coarse.grid()?.spacing() / medium.grid()?.spacing();
        let norm = self.params.norms.first().copied().unwrap_or(Norm::L2);
        let mask = self.mask()?;

        let mut orders = BTreeMap::new();
        for &name in &self.params.fields {
            let name_str = name.as_str();
            let order = observed_order(
                coarse.field(name_str)?,
                medium.field(name_str)?,
                fine.field(name_str)?,
                ratio,
                mask.field(name_str)?,
                norm,
            )?;
            info!("\t{}: {}", name, order);
            orders.insert(name, order);
        }

        Ok(orders)
    }

    /// Asymptotic-range fields of the triplet given the observed orders
    pub fn asymptotic_ranges(
        &self,
        triplet: [&Simulation; 3],
        orders: &BTreeMap<FieldName, f64>,
    ) -> Result<Vec<Field>> {
        let [coarse, medium, fine] = triplet;
        let ratio = coarse.grid()?.spacing() / medium.grid()?.spacing();
        let mask = self.mask()?;

        orders
            .iter()
            .map(|(name, &order)| {
                let name = name.as_str();
                asymptotic_range(
                    coarse.field(name)?,
                    medium.field(name)?,
                    fine.field(name)?,
                    order,
                    ratio,
                    mask.field(name)?,
                )
            })
            .collect()
    }

    /// Exact fields and the simulations to compare with them.
    ///
    /// Without an analytical solution the finest simulation is the reference and is
    /// left out of the comparison.
    pub fn reference(&self) -> Result<(BTreeMap<String, Field>, &[Simulation])> {
        let (finest, others) = self
            .simulations
            .split_last()
            .ok_or_else(|| anyhow!("Empty convergence study"))?;

        match self.params.analytical {
            Some(Analytical::MovingVortices { time }) => {
                let grid = finest.grid()?;
                info!("Computing the moving vortices at t={} on the {} grid", time, finest.description);
                let exact = MovingVortices::new(grid, time).fields(grid, Some(self.params.time_step))?;
                Ok((exact, &self.simulations[..]))
            }
            None => Ok((finest.fields.clone(), others)),
        }
    }

    /// Errors versus grid spacing for every configured field and norm
    pub fn errors(&self) -> Result<Vec<Errors>> {
        let (exact, simulations) = self.reference()?;
        let mask = self.mask()?;

        let mut errors = vec![];
        for &field in &self.params.fields {
            let name = field.as_str();
            let reference = exact
                .get(name)
                .ok_or_else(|| anyhow!("No exact {} field", name))?;
            for &norm in &self.params.norms {
                let mut spacings = vec![];
                let mut values = vec![];
                for s in simulations {
                    spacings.push(s.grid()?.spacing());
                    values.push(s.field(name)?.difference(reference, mask.field(name)?, norm)?);
                }
                info!("{} errors ({}-norm): {:?}", name, norm.label(), values);
                errors.push(Errors {
                    field,
                    norm,
                    spacings,
                    values,
                });
            }
        }

        Ok(errors)
    }
}

/// Writes `name: order` lines into `<directory>/<save_name>_<c>_<m>_<f>_<ts>.dat`.
pub fn write_orders(
    directory: &Path,
    save_name: &str,
    triplet: [&Simulation; 3],
    time_step: usize,
    orders: &BTreeMap<FieldName, f64>,
) -> Result<PathBuf> {
    let [coarse, medium, fine] = triplet;
    let path = directory.join(format!(
        "{}_{}_{}_{}_{}.dat",
        save_name,
        coarse.description,
        medium.description,
        fine.description,
        time_step_name(time_step)
    ));

    let mut text = String::new();
    for (name, order) in orders {
        let _ = writeln!(text, "{}: {}", name, order);
    }
    fs::create_dir_all(directory)?;
    fs::write(&path, text).with_context(|| format!("Failed to write {}", path.display()))?;
    info!("Observed orders written into {}", path.display());

    Ok(path)
}

#[cfg(test)]
mod test {
    use {
        super::*,
        approx::assert_abs_diff_eq,
        lazy_static::lazy_static,
        ndarray::{Array1, Array2},
        tempdir::TempDir,
    };

    /// `f(x) = 1 + x + e h^2` sampled on `[0, 1]` with `n` cells
    fn second_order(n: usize) -> Field {
        let h = 1.0 / n as f64;
        let x = Array1::linspace(0.0, 1.0, n + 1);
        let y = Array1::linspace(0.0, 1.0, n + 1);
        let values = Array2::from_shape_fn((n + 1, n + 1), |(_, i)| 1.0 + x[i] + 0.5 * h * h);
        Field::new("pressure", Some(10), x, y, values).unwrap()
    }

    lazy_static! {
        static ref COARSE: Field = second_order(4);
        static ref MEDIUM: Field = second_order(8);
        static ref FINE: Field = second_order(16);
    }

    #[test]
    fn order_of_a_second_order_error() {
        for &norm in &[Norm::L2, Norm::Linf] {
            let p = observed_order(&COARSE, &MEDIUM, &FINE, 2.0, &COARSE, norm).unwrap();
            assert_abs_diff_eq!(p, 2.0, epsilon = 1.0E-10);
        }
    }

    #[test]
    fn gci_masks_small_values() {
        let mut coarse = COARSE.clone();
        coarse.values[[0, 0]] = 0.0;

        let gci = grid_convergence_index(&coarse, &MEDIUM, 2.0, 2.0, &COARSE).unwrap();
        assert_eq!(gci.label, "GCI-pressure");
        assert!(gci.values[[0, 0]].is_nan());

        // |c - f| / f at x = 1: (3/128) / (2 + 1/128), scaled by 1.25 / 3 * 100
        let expected = 1.25 * (3.0 / 128.0) / (2.0 + 1.0 / 128.0) / 3.0 * 100.0;
        assert_abs_diff_eq!(gci.values[[0, 4]], expected, epsilon = 1.0E-12);
    }

    #[test]
    fn asymptotic_range_near_one() {
        let range = asymptotic_range(&COARSE, &MEDIUM, &FINE, 2.0, 2.0, &COARSE).unwrap();
        assert_eq!(range.label, "asymptotic-range-pressure");
        assert_eq!(range.values.dim(), (5, 5));
        assert!(range.values.iter().all(|v| (v - 1.0).abs() < 1.0E-02));
    }

    #[test]
    fn orders_file() {
        let dir = TempDir::new("flowpost").unwrap();
        let triplet = [
            Simulation::new(Some("20"), dir.path(), Software::PetIBM),
            Simulation::new(Some("60"), dir.path(), Software::PetIBM),
            Simulation::new(Some("180"), dir.path(), Software::PetIBM),
        ];
        let mut orders = BTreeMap::new();
        orders.insert(FieldName::Pressure, 1.5);
        orders.insert(FieldName::XVelocity, 2.0);

        let path = write_orders(
            dir.path(),
            "orders",
            [&triplet[0], &triplet[1], &triplet[2]],
            500,
            &orders,
        )
        .unwrap();

        assert_eq!(path.file_name().unwrap(), "orders_20_60_180_0000500.dat");
        assert_eq!(
            fs::read_to_string(path).unwrap(),
            "pressure: 1.5\nx-velocity: 2\n"
        );
    }

    #[test]
    fn study_parameters() {
        let params = serde_yaml::from_str::<StudyParameters>(
            "cases: ['20', '60']\nnorms: [L2, Linf]\nanalytical:\n  moving-vortices:\n    time: 0.25\n",
        )
        .unwrap();

        assert_eq!(params.cases, vec!["20", "60"]);
        assert_eq!(params.norms, vec![Norm::L2, Norm::Linf]);
        assert_eq!(
            params.analytical,
            Some(Analytical::MovingVortices { time: 0.25 })
        );
        assert_eq!(params.fields.len(), 3);
    }
}
