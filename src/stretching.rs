//! Stretched Cartesian grids: a uniform region surrounded by geometrically stretched ones.
//!
//! The grid is described per direction and written as the `cartesianMesh.yaml` input of
//! the solver.

use {
    crate::simulation::Direction,
    anyhow::{ensure, Context, Result},
    log::info,
    serde::{Deserialize, Serialize},
    std::{
        fs,
        path::{Path, PathBuf},
    },
};

/// Tolerance on the number of cells of the uniform region
const UNIFORM_TOLERANCE: f64 = 1.0E-08;

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DirectionParameters {
    pub direction: Direction,
    pub start: f64,
    pub uniform_start: f64,
    pub uniform_end: f64,
    pub end: f64,
    /// Grid spacing of the uniform region
    pub spacing: f64,
    /// Maximum ratio between the largest and smallest cell, before and after the
    /// uniform region
    pub aspect_ratios: [f64; 2],
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StretchingParameters {
    /// Number of decimal places of the stretching ratios
    #[serde(default = "default_precision")]
    pub precision: u32,
    pub directions: Vec<DirectionParameters>,
}

fn default_precision() -> u32 {
    2
}

impl Default for StretchingParameters {
    fn default() -> Self {
        Self {
            precision: default_precision(),
            directions: vec![],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubDomain {
    pub end: f64,
    pub cells: usize,
    pub stretch_ratio: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MeshDirection {
    pub direction: Direction,
    pub start: f64,
    pub sub_domains: Vec<SubDomain>,
}

/// Largest stretching ratio, found digit by digit, whose aspect ratio stays below `max_ar`.
///
/// Returns the ratio and the number of cells covering `length`, starting from a cell of
/// size `spacing`.
pub fn stretching_ratio(length: f64, spacing: f64, max_ar: f64, precision: u32) -> Result<(f64, usize)> {
    ensure!(precision > 0, "Precision must be at least one digit");
    ensure!(max_ar > 1.0, "Maximum aspect ratio must exceed 1, got {}", max_ar);
    ensure!(
        length >= 0.0 && spacing > 0.0,
        "Invalid stretched region of length {} with spacing {}",
        length,
        spacing
    );

    let mut digit = 1;
    let mut next = 2.0;
    let mut found = (next, 0);
    while digit <= precision {
        let r: f64 = next;
        ensure!(r > 1.0, "No stretching ratio satisfies the aspect ratio {}", max_ar);

        let n = ((1.0 - length / spacing * (1.0 - r)).ln() / r.ln()).round() as usize;
        let ar = r.powi(n as i32 - 1);
        if ar < max_ar {
            next += 0.1f64.powi(digit as i32);
            digit += 1;
        } else {
            next -= 0.1f64.powi(digit as i32);
        }
        found = (r, n);
    }

    Ok(found)
}

impl DirectionParameters {
    pub fn sub_domains(&self, precision: u32) -> Result<MeshDirection> {
        let h = self.spacing;

        let (r, n) = stretching_ratio(self.uniform_start - self.start, h, self.aspect_ratios[0], precision)
            .with_context(|| format!("{:?}-direction, before the uniform region", self.direction))?;
        let before = SubDomain {
            end: self.uniform_start,
            cells: n,
            stretch_ratio: 1.0 / r,
        };

        let l = self.uniform_end - self.uniform_start;
        let n = (l / h).round();
        ensure!(
            (n - l / h).abs() <= UNIFORM_TOLERANCE,
            "{:?}-direction: the uniform length {} is not a multiple of the spacing {} (l/h={})",
            self.direction,
            l,
            h,
            l / h
        );
        let uniform = SubDomain {
            end: self.uniform_end,
            cells: n as usize,
            stretch_ratio: 1.0,
        };

        let (r, n) = stretching_ratio(self.end - self.uniform_end, h, self.aspect_ratios[1], precision)
            .with_context(|| format!("{:?}-direction, after the uniform region", self.direction))?;
        let after = SubDomain {
            end: self.end,
            cells: n,
            stretch_ratio: r,
        };

        Ok(MeshDirection {
            direction: self.direction,
            start: self.start,
            sub_domains: vec![before, uniform, after],
        })
    }
}

impl StretchingParameters {
    pub fn mesh(&self) -> Result<Vec<MeshDirection>> {
        self.directions
            .iter()
            .map(|d| d.sub_domains(self.precision))
            .collect()
    }

    /// Writes `cartesianMesh.yaml` into the case directory.
    pub fn write(&self, case: &Path) -> Result<PathBuf> {
        let mesh = self.mesh()?;
        for d in &mesh {
            info!(
                "{:?}-direction: {} cells",
                d.direction,
                d.sub_domains.iter().map(|s| s.cells).sum::<usize>()
            );
        }

        let path = case.join("cartesianMesh.yaml");
        fs::write(&path, serde_yaml::to_string(&mesh)?)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        info!("cartesianMesh.yaml written into {}", case.display());

        Ok(path)
    }
}
