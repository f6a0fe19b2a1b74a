use {
    crate::{
        convergence::StudyParameters,
        job::JobConfig,
        meshing::MeshingConfig,
        plot::{contour, forces, gridline},
        simulation::{Direction, FieldName, Simulation, Software},
        stretching::StretchingParameters,
    },
    anyhow::{anyhow, Result},
    serde::Deserialize,
    std::path::PathBuf,
};

/// Post-processing parameters, one section per subcommand
#[derive(Debug, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct Parameters {
    pub environment: Environment,
    pub simulation: SimulationParameters,
    pub fields: Option<FieldsParameters>,
    pub forces: Option<ForcesParameters>,
    pub gridline: Option<GridlineParameters>,
    pub convergence: Option<StudyParameters>,
    pub grid: Option<StretchingParameters>,
    pub vortices: VorticesParameters,
    pub obj: Option<ObjParameters>,
    pub job: Option<JobConfig>,
    pub meshing: Option<MeshingConfig>,
}

/// Section of a subcommand, which must be present in the parameters file
pub fn section<'a, T>(section: &'a Option<T>, name: &str) -> Result<&'a T> {
    section
        .as_ref()
        .ok_or_else(|| anyhow!("The {} section is missing from the parameters file", name))
}

#[derive(Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct Environment {
    /// Where figures go, relative to the case directory
    pub images_directory: PathBuf,
    /// Style sheet of the figures
    pub style: Option<PathBuf>,
}

impl Default for Environment {
    fn default() -> Self {
        Environment {
            images_directory: PathBuf::from("images"),
            style: None,
        }
    }
}

/// The case being post-processed
#[derive(Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct SimulationParameters {
    pub directory: PathBuf,
    pub description: Option<String>,
    pub software: Software,
    pub periodic: Vec<Direction>,
    /// `[start, end, stride]`, every saved time-step otherwise
    pub time_steps: Option<[usize; 3]>,
    /// Coordinates files of the immersed bodies
    pub bodies: Vec<PathBuf>,
}

impl Default for SimulationParameters {
    fn default() -> Self {
        SimulationParameters {
            directory: PathBuf::from("."),
            description: None,
            software: Software::PetIBM,
            periodic: vec![],
            time_steps: None,
            bodies: vec![],
        }
    }
}

impl SimulationParameters {
    pub fn simulation(&self) -> Simulation {
        Simulation::new(self.description.as_deref(), self.directory.clone(), self.software)
    }
}

/// Another simulation to compare with
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct OtherSimulation {
    pub directory: PathBuf,
    pub description: Option<String>,
    pub software: Software,
}

impl OtherSimulation {
    pub fn simulation(&self) -> Simulation {
        Simulation::new(self.description.as_deref(), self.directory.clone(), self.software)
    }
}

#[derive(Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct FieldsParameters {
    pub names: Vec<FieldName>,
    /// Simulation whose fields are subtracted before plotting
    pub subtract: Option<OtherSimulation>,
    pub contours: bool,
    pub figure: contour::Figure,
    /// Also writes VTK files of the fields
    pub vtk: bool,
    pub stride: usize,
}

impl Default for FieldsParameters {
    fn default() -> Self {
        FieldsParameters {
            names: vec![FieldName::Pressure],
            subtract: None,
            contours: true,
            figure: contour::Figure::default(),
            vtk: false,
            stride: 1,
        }
    }
}

#[derive(Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct StrouhalParameters {
    /// Characteristic length
    pub length: f64,
    /// Characteristic velocity
    pub velocity: f64,
    pub periods: usize,
    /// Minima after this time are ignored
    pub end_time: Option<f64>,
}

impl Default for StrouhalParameters {
    fn default() -> Self {
        StrouhalParameters {
            length: 1.0,
            velocity: 1.0,
            periods: 1,
            end_time: None,
        }
    }
}

#[derive(Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct ForcesParameters {
    /// Labels the forces as coefficients, and selects OpenFOAM's `forceCoeffs`
    pub coefficients: bool,
    /// Multiplies every force value
    pub scale: f64,
    /// `[start, end]` of the time-averaging window, the whole history otherwise
    pub average: Option<[f64; 2]>,
    /// Averages over the last period instead
    pub last_period: bool,
    pub strouhal: Option<StrouhalParameters>,
    pub others: Vec<OtherSimulation>,
    pub figure: forces::Figure,
    /// Writes the table of mean values into `<images>/<summary>.txt`
    pub summary: Option<String>,
}

impl Default for ForcesParameters {
    fn default() -> Self {
        ForcesParameters {
            coefficients: false,
            scale: 1.0,
            average: None,
            last_period: false,
            strouhal: None,
            others: vec![],
            figure: forces::Figure::default(),
            summary: None,
        }
    }
}

#[derive(Debug, PartialEq, Deserialize)]
pub struct ValidationData {
    pub path: PathBuf,
    pub label: String,
}

#[derive(Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct GridlineParameters {
    pub field: FieldName,
    pub orientation: gridline::Orientation,
    pub positions: Vec<f64>,
    pub time_step: usize,
    /// Keeps the stations within `[start, end]`
    pub boundaries: Option<[f64; 2]>,
    pub validation: Option<ValidationData>,
    pub others: Vec<OtherSimulation>,
    pub figure: gridline::Figure,
}

impl Default for GridlineParameters {
    fn default() -> Self {
        GridlineParameters {
            field: FieldName::XVelocity,
            orientation: gridline::Orientation::Vertical,
            positions: vec![],
            time_step: 0,
            boundaries: None,
            validation: None,
            others: vec![],
            figure: gridline::Figure::default(),
        }
    }
}

#[derive(Debug, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct VorticesParameters {
    /// Time at which the initial conditions are evaluated
    pub time: f64,
}

#[derive(Debug, PartialEq, Deserialize)]
pub struct BoxParameters {
    pub name: String,
    pub bottom_left: [f64; 2],
    pub top_right: [f64; 2],
    /// Points along x and y, corners included
    pub points: [usize; 2],
    #[serde(default)]
    pub z: f64,
}

#[derive(Debug, PartialEq, Deserialize)]
pub struct ExtrudedBody {
    pub name: String,
    pub path: PathBuf,
}

#[derive(Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct ObjParameters {
    /// Output directory, relative to the case directory
    pub directory: PathBuf,
    pub boxes: Vec<BoxParameters>,
    pub bodies: Vec<ExtrudedBody>,
}

impl Default for ObjParameters {
    fn default() -> Self {
        ObjParameters {
            directory: PathBuf::from("constant/triSurface"),
            boxes: vec![],
            bodies: vec![],
        }
    }
}
