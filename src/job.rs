//! Batch scripts launching a solver on a cluster, and their submission to the scheduler.

use {
    anyhow::{bail, Context, Result},
    log::info,
    serde::Deserialize,
    std::{
        fmt::Write as _,
        fs,
        path::{Path, PathBuf},
        process::Command,
    },
};

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scheduler {
    Slurm,
    Pbs,
}

impl Scheduler {
    pub fn extension(self) -> &'static str {
        match self {
            Scheduler::Slurm => "slurm",
            Scheduler::Pbs => "pbs",
        }
    }

    /// Program submitting a script
    pub fn submitter(self) -> &'static str {
        match self {
            Scheduler::Slurm => "sbatch",
            Scheduler::Pbs => "qsub",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct JobConfig {
    pub scheduler: Scheduler,
    pub job_name: String,
    pub queue: Option<String>,
    pub walltime: String,
    pub nodes: usize,
    pub tasks_per_node: usize,
    /// Scheduler log, `<job_name>.log` otherwise
    pub output: Option<String>,
    /// Environment modules loaded before the run
    pub modules: Vec<String>,
    pub binary: PathBuf,
    pub launcher: String,
    /// Command-line options of the solver, in order; empty values are bare flags
    pub options: Vec<(String, String)>,
    /// Writes the script without submitting it
    pub dry_run: bool,
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            scheduler: Scheduler::Slurm,
            job_name: "flowpost".to_owned(),
            queue: None,
            walltime: "01:00:00".to_owned(),
            nodes: 1,
            tasks_per_node: 1,
            output: None,
            modules: vec![],
            binary: PathBuf::from("petibm2d"),
            launcher: "mpiexec".to_owned(),
            options: vec![],
            dry_run: false,
        }
    }
}

/// Single-quotes words the shell would otherwise split or expand
fn quote(word: &str) -> String {
    let plain = |c: char| c.is_ascii_alphanumeric() || "_-./=:,+@%".contains(c);
    if !word.is_empty() && word.chars().all(plain) {
        word.to_owned()
    } else {
        format!("'{}'", word.replace('\'', "'\\''"))
    }
}

/// Outcome of a submission
#[derive(Debug, Clone, PartialEq)]
pub struct Submission {
    pub script: PathBuf,
    /// What the scheduler answered, `None` on a dry run
    pub answer: Option<String>,
}

impl JobConfig {
    pub fn command_line(&self, case: &Path) -> Vec<String> {
        let mut words = vec![
            self.launcher.clone(),
            "-n".to_owned(),
            (self.nodes * self.tasks_per_node).to_string(),
            self.binary.display().to_string(),
            "-directory".to_owned(),
            case.display().to_string(),
        ];
        for (name, value) in &self.options {
            words.push(name.clone());
            if !value.is_empty() {
                words.push(value.clone());
            }
        }

        words
    }

    fn directives(&self) -> Vec<String> {
        let output = self
            .output
            .clone()
            .unwrap_or_else(|| format!("{}.log", self.job_name));

        match self.scheduler {
            Scheduler::Slurm => {
                let mut lines = vec![format!("#SBATCH --job-name={}", self.job_name)];
                lines.extend(self.queue.iter().map(|q| format!("#SBATCH --partition={}", q)));
                lines.push(format!("#SBATCH --time={}", self.walltime));
                lines.push(format!("#SBATCH --nodes={}", self.nodes));
                lines.push(format!("#SBATCH --ntasks-per-node={}", self.tasks_per_node));
                lines.push(format!("#SBATCH --output={}", output));
                lines
            }
            Scheduler::Pbs => {
                let mut lines = vec![format!("#PBS -N {}", self.job_name)];
                lines.extend(self.queue.iter().map(|q| format!("#PBS -q {}", q)));
                lines.push(format!("#PBS -l walltime={}", self.walltime));
                lines.push(format!("#PBS -l nodes={}:ppn={}", self.nodes, self.tasks_per_node));
                lines.push(format!("#PBS -o {}", output));
                lines.push("#PBS -j oe".to_owned());
                lines
            }
        }
    }

    pub fn script(&self, case: &Path) -> String {
        let mut script = String::from("#!/bin/bash\n");
        for line in self.directives() {
            let _ = writeln!(script, "{}", line);
        }
        script.push('\n');

        if !self.modules.is_empty() {
            for module in &self.modules {
                let _ = writeln!(script, "module load {}", module);
            }
            script.push('\n');
        }

        let command = self
            .command_line(case)
            .iter()
            .map(|w| quote(w))
            .collect::<Vec<_>>()
            .join(" ");
        let _ = writeln!(script, "{}", command);

        script
    }

    /// Writes `<case>/<job_name>.<ext>` and hands it to the scheduler.
    pub fn submit(&self, case: &Path) -> Result<Submission> {
        let path = case.join(format!("{}.{}", self.job_name, self.scheduler.extension()));
        fs::write(&path, self.script(case))
            .with_context(|| format!("Failed to write {}", path.display()))?;
        info!("Job script written into {}", path.display());

        if self.dry_run {
            info!("Dry run, {} not submitted", path.display());
            return Ok(Submission {
                script: path,
                answer: None,
            });
        }

        let submitter = self.scheduler.submitter();
        info!("Submitting {} with {}", path.display(), submitter);
        let output = Command::new(submitter)
            .arg(&path)
            .current_dir(case)
            .output()
            .with_context(|| format!("Failed to run {}", submitter))?;
        if !output.status.success() {
            bail!(
                "{} failed ({}): {}",
                submitter,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }

        let answer = String::from_utf8_lossy(&output.stdout).trim().to_owned();
        info!("{}", answer);

        Ok(Submission {
            script: path,
            answer: Some(answer),
        })
    }
}
