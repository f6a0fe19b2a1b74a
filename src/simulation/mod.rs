//! Simulations registered from a case directory, with the readers of each solver's output.


mod cuibm;
mod openfoam;
mod petibm;

use {
    crate::{
        field::Field,
        forces::Force,
        grid::Grid,
        utils::{midpoints, read_columns, widths},
    },
    anyhow::{anyhow, bail, ensure, Result},
    log::info,
    ndarray::{s, Array1, Axis},
    serde::{Deserialize, Serialize},
    std::{collections::BTreeMap, convert::TryFrom, fmt, path::PathBuf, str::FromStr},
};

/// Solver that produced the case directory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum Software {
    PetIBM,
    CuIBM,
    IBAMR,
    OpenFOAM,
}

impl Software {
    pub const NAMES: [&'static str; 4] = ["petibm", "cuibm", "ibamr", "openfoam"];

    pub fn as_str(self) -> &'static str {
        match self {
            Software::PetIBM => "petibm",
            Software::CuIBM => "cuibm",
            Software::IBAMR => "ibamr",
            Software::OpenFOAM => "openfoam",
        }
    }
}

impl fmt::Display for Software {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Software {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "petibm" => Ok(Software::PetIBM),
            "cuibm" => Ok(Software::CuIBM),
            "ibamr" => Ok(Software::IBAMR),
            "openfoam" => Ok(Software::OpenFOAM),
            _ => bail!(
                "Unknown software \"{}\", choose one of: {}",
                s,
                Software::NAMES.join(", ")
            ),
        }
    }
}

impl TryFrom<String> for Software {
    type Error = anyhow::Error;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    X,
    Y,
    Z,
}

/// Fields that can be read or derived from a time-step directory
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FieldName {
    Pressure,
    XFlux,
    YFlux,
    XVelocity,
    YVelocity,
    Vorticity,
}

impl FieldName {
    pub fn as_str(self) -> &'static str {
        match self {
            FieldName::Pressure => "pressure",
            FieldName::XFlux => "x-flux",
            FieldName::YFlux => "y-flux",
            FieldName::XVelocity => "x-velocity",
            FieldName::YVelocity => "y-velocity",
            FieldName::Vorticity => "vorticity",
        }
    }
}

impl fmt::Display for FieldName {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct Simulation {
    pub description: String,
    pub directory: PathBuf,
    pub software: Software,
    pub grid: Option<Grid>,
    /// Fields read or derived so far, keyed by label
    pub fields: BTreeMap<String, Field>,
}

impl Simulation {
    /// Registers a simulation; the description defaults to the directory name.
    pub fn new<P: Into<PathBuf>>(description: Option<&str>, directory: P, software: Software) -> Self {
        let directory = directory.into();
        let description = description.map(str::to_owned).unwrap_or_else(|| {
            directory
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| directory.display().to_string())
        });

        info!("Registering simulation");
        info!("\tdirectory: {}", directory.display());
        info!("\tdescription: {}", description);
        info!("\tsoftware: {}", software);

        Self {
            description,
            directory,
            software,
            grid: None,
            fields: BTreeMap::new(),
        }
    }

    pub fn read_grid(&mut self) -> Result<&Grid> {
        let grid = match self.software {
            Software::PetIBM => petibm::read_grid(&self.directory)?,
            Software::CuIBM => Grid::read_cuibm(self.directory.join("grid"))?,
            other => bail!("Reading the grid of a {} simulation is not supported", other),
        };
        self.grid = Some(grid);

        self.grid()
    }

    pub fn grid(&self) -> Result<&Grid> {
        self.grid
            .as_ref()
            .ok_or_else(|| anyhow!("The grid of {} has not been read", self.description))
    }

    fn ensure_grid(&mut self) -> Result<()> {
        if self.grid.is_none() {
            self.read_grid()?;
        }
        Ok(())
    }

    /// Fluxes through the cell faces normal to x and to y
    pub fn read_fluxes(&mut self, time_step: usize, periodic: &[Direction]) -> Result<(Field, Field)> {
        self.ensure_grid()?;
        let grid = self.grid()?;
        info!("[time-step {}] Reading the fluxes of {}", time_step, self.description);

        match self.software {
            Software::PetIBM => petibm::read_fluxes(&self.directory, grid, time_step, periodic),
            Software::CuIBM => cuibm::read_fluxes(&self.directory, grid, time_step),
            other => bail!("Reading the fluxes of a {} simulation is not supported", other),
        }
    }

    pub fn read_pressure(&mut self, time_step: usize) -> Result<Field> {
        self.ensure_grid()?;
        let grid = self.grid()?;
        info!("[time-step {}] Reading the pressure of {}", time_step, self.description);

        match self.software {
            Software::PetIBM => petibm::read_pressure(&self.directory, grid, time_step),
            Software::CuIBM => cuibm::read_pressure(&self.directory, grid, time_step),
            other => bail!("Reading the pressure of a {} simulation is not supported", other),
        }
    }

    /// Staggered velocity components, obtained by dividing the fluxes by the face widths.
    pub fn read_velocity(&mut self, time_step: usize, periodic: &[Direction]) -> Result<(Field, Field)> {
        let (qx, qy) = self.read_fluxes(time_step, periodic)?;

        velocity(self.grid()?, qx, qy)
    }

    /// Reads (or derives) the requested fields and stores them under their labels.
    pub fn read_fields(
        &mut self,
        names: &[FieldName],
        time_step: usize,
        periodic: &[Direction],
    ) -> Result<()> {
        let wants = |choices: &[FieldName]| names.iter().any(|n| choices.contains(n));

        if wants(&[FieldName::Pressure]) {
            let p = self.read_pressure(time_step)?;
            self.insert(p);
        }
        if wants(&[FieldName::XFlux, FieldName::YFlux]) {
            let (qx, qy) = self.read_fluxes(time_step, periodic)?;
            self.insert(qx);
            self.insert(qy);
        }
        if wants(&[FieldName::XVelocity, FieldName::YVelocity, FieldName::Vorticity]) {
            let (u, v) = self.read_velocity(time_step, periodic)?;
            if wants(&[FieldName::Vorticity]) {
                info!("[time-step {}] Computing the vorticity", time_step);
                self.insert(vorticity(&u, &v)?);
            }
            self.insert(u);
            self.insert(v);
        }

        Ok(())
    }

    pub fn insert(&mut self, field: Field) {
        self.fields.insert(field.label.clone(), field);
    }

    pub fn field(&self, name: &str) -> Result<&Field> {
        self.fields
            .get(name)
            .ok_or_else(|| anyhow!("No {} field in {}", name, self.description))
    }

    /// Stores the difference of field `name` with the one of `other`, labelled
    /// `label` or `<name>-subtracted`.
    pub fn subtract(&mut self, other: &Simulation, name: &str, label: Option<&str>) -> Result<()> {
        let label = label
            .map(str::to_owned)
            .unwrap_or_else(|| format!("{}-subtracted", name));
        let difference = self.field(name)?.subtract(other.field(name)?, Some(&label))?;
        self.insert(difference);

        Ok(())
    }

    /// Drag-like and lift-like force histories, multiplied by `scale`.
    pub fn read_forces(&self, coefficients: bool, scale: f64) -> Result<(Force, Force)> {
        let columns = match self.software {
            Software::PetIBM => read_columns(self.directory.join("forces.txt"), &[0, 1, 2], false)?,
            Software::CuIBM => read_columns(self.directory.join("forces"), &[0, 1, 2], false)?,
            Software::IBAMR => read_columns(
                self.directory.join("dataIB").join("ib_Drag_force_struct_no_0"),
                &[0, 4, 5],
                false,
            )?,
            Software::OpenFOAM => openfoam::read_forces(&self.directory, coefficients)?,
        };
        let (times, fx, fy) = match <[Vec<f64>; 3]>::try_from(columns) {
            Ok([times, fx, fy]) => (times, fx, fy),
            Err(_) => bail!("Expected three force columns for {}", self.description),
        };
        let (x, y) = if coefficients { ("Cd", "Cl") } else { ("Fx", "Fy") };
        info!(
            "Read {} force samples of {} (t = {:?} to {:?})",
            times.len(),
            self.description,
            times.first(),
            times.last()
        );

        Ok((
            Force::new(x, times.clone(), fx)?.scaled(scale),
            Force::new(y, times, fy)?.scaled(scale),
        ))
    }
}

/// Divides x-fluxes by the cell heights and y-fluxes by the cell widths.
pub fn velocity(grid: &Grid, qx: Field, qy: Field) -> Result<(Field, Field)> {
    let (dx, dy) = (grid.widths(0), grid.widths(1));
    ensure!(
        qx.values.nrows() == dy.len() && qy.values.ncols() == dx.len(),
        "Fluxes {:?} and {:?} do not match a {}x{} grid",
        qx.values.dim(),
        qy.values.dim(),
        dx.len(),
        dy.len()
    );

    let mut u = qx;
    u.label = FieldName::XVelocity.to_string();
    u.values /= &dy.insert_axis(Axis(1));

    let mut v = qy;
    v.label = FieldName::YVelocity.to_string();
    v.values /= &dx;

    Ok((u, v))
}

fn within(stations: &Array1<f64>, lower: f64, upper: f64) -> Vec<usize> {
    stations
        .iter()
        .enumerate()
        .filter(|&(_, &s)| s > lower && s < upper)
        .map(|(i, _)| i)
        .collect()
}

/// `dv/dx - du/dy` at the cell vertices enclosed by both staggered components.
pub fn vorticity(u: &Field, v: &Field) -> Result<Field> {
    ensure!(
        v.x.len() >= 2 && u.y.len() >= 2,
        "Not enough stations to compute the vorticity"
    );
    let columns = within(&u.x, v.x[0], v.x[v.x.len() - 1]);
    let rows = within(&v.y, u.y[0], u.y[u.y.len() - 1]);

    let (vx, uy) = (v.x.to_vec(), u.y.to_vec());
    let (dx, dy) = (Array1::from(widths(&vx)), Array1::from(widths(&uy)));

    let v_rows = v.values.select(Axis(0), &rows);
    let u_columns = u.values.select(Axis(1), &columns);
    let dvdx = (&v_rows.slice(s![.., 1..]) - &v_rows.slice(s![.., ..-1])) / &dx;
    let dudy = (&u_columns.slice(s![1.., ..]) - &u_columns.slice(s![..-1, ..])) / &dy.insert_axis(Axis(1));
    ensure!(
        dvdx.dim() == dudy.dim(),
        "Velocity derivatives have shapes {:?} and {:?}",
        dvdx.dim(),
        dudy.dim()
    );

    Field::new(
        FieldName::Vorticity.as_str(),
        u.time_step,
        Array1::from(midpoints(&vx)),
        Array1::from(midpoints(&uy)),
        dvdx - dudy,
    )
}

/// Averages the staggered components onto the interior cell centres.
pub fn velocity_cell_centers(u: &Field, v: &Field) -> Result<(Field, Field)> {
    ensure!(
        u.values.nrows() >= 2 && u.values.ncols() >= 2 && v.values.nrows() >= 2 && v.values.ncols() >= 2,
        "Not enough faces to centre the velocity"
    );

    let x = v.x.slice(s![1..-1]).to_owned();
    let y = u.y.slice(s![1..-1]).to_owned();
    let uc = (&u.values.slice(s![1..-1, ..-1]) + &u.values.slice(s![1..-1, 1..])) * 0.5;
    let vc = (&v.values.slice(s![..-1, 1..-1]) + &v.values.slice(s![1.., 1..-1])) * 0.5;

    Ok((
        Field::new(FieldName::XVelocity.as_str(), u.time_step, x.clone(), y.clone(), uc)?,
        Field::new(FieldName::YVelocity.as_str(), v.time_step, x, y, vc)?,
    ))
}
