//! Runs the OpenFOAM meshing utilities on a case, one after the other.

use {
    anyhow::{ensure, Context, Result},
    log::info,
    serde::Deserialize,
    std::{
        fs::{self, File},
        path::{Path, PathBuf},
        process::Command,
    },
};

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct MeshingConfig {
    /// Only logs the commands
    pub dry_run: bool,
}

/// One external program and its arguments
#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    pub program: String,
    pub args: Vec<String>,
}

impl Step {
    pub fn new(program: &str, args: &[&str]) -> Self {
        Self {
            program: program.to_owned(),
            args: args.iter().map(|&a| a.to_owned()).collect(),
        }
    }

    pub fn command(&self) -> String {
        let mut words = vec![self.program.as_str()];
        words.extend(self.args.iter().map(String::as_str));
        words.join(" ")
    }
}

pub fn openfoam_steps() -> Vec<Step> {
    vec![
        Step::new("blockMesh", &[]),
        Step::new("surfaceFeatureExtract", &[]),
        Step::new("snappyHexMesh", &["-overwrite"]),
        Step::new("extrudeMesh", &[]),
        Step::new("checkMesh", &[]),
    ]
}

/// Runs `step` in `case`, its output going to `log.<program>`, which then moves to
/// `<case>/logs/`.
pub fn run_step(case: &Path, step: &Step) -> Result<PathBuf> {
    let name = format!("log.{}", step.program);
    let log = case.join(&name);
    let out = File::create(&log).with_context(|| format!("Failed to create {}", log.display()))?;
    let err = out.try_clone()?;

    info!("Running {} in {}", step.command(), case.display());
    let status = Command::new(&step.program)
        .args(&step.args)
        .current_dir(case)
        .stdout(out)
        .stderr(err)
        .status();

    let logs = case.join("logs");
    fs::create_dir_all(&logs).with_context(|| format!("Failed to create {}", logs.display()))?;
    let moved = logs.join(&name);
    fs::rename(&log, &moved)
        .with_context(|| format!("Failed to move {} into {}", log.display(), logs.display()))?;
    let status = status.with_context(|| format!("Failed to run {}", step.program))?;

    ensure!(
        status.success(),
        "{} failed ({}), see {}",
        step.program,
        status,
        moved.display()
    );

    Ok(moved)
}

/// Runs every step, stopping at the first failure.
pub fn run_steps(case: &Path, steps: &[Step], config: &MeshingConfig) -> Result<Vec<PathBuf>> {
    ensure!(case.is_dir(), "{} is not a case directory", case.display());

    if config.dry_run {
        for step in steps {
            info!("[dry run] {}", step.command());
        }
        return Ok(vec![]);
    }

    let logs = steps
        .iter()
        .map(|step| run_step(case, step))
        .collect::<Result<Vec<_>>>()?;
    info!("Mesh of {} generated", case.display());

    Ok(logs)
}
