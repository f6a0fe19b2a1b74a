//! Force histories acting on immersed bodies and the quantities derived from them.

use {
    anyhow::{bail, ensure, Context, Result},
    log::info,
    serde::{Deserialize, Serialize},
    std::{fmt::Write as _, fs, path::Path},
};

#[derive(Debug, Clone, PartialEq)]
pub struct Force {
    pub label: String,
    pub times: Vec<f64>,
    pub values: Vec<f64>,
}

/// Time-averaged value and the window it was averaged over
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Mean {
    pub value: f64,
    pub start: f64,
    pub end: f64,
}

/// How the averaging window is chosen
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Window {
    /// Samples with time in `[start, end]`
    Limits(f64, f64),
    /// Last full period of the signal, delimited by its last two minima or maxima
    LastPeriod,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Deviations {
    pub min: Vec<f64>,
    pub max: Vec<f64>,
}

impl Force {
    pub fn new<S: Into<String>>(label: S, times: Vec<f64>, values: Vec<f64>) -> Result<Self> {
        let label = label.into();
        ensure!(
            times.len() == values.len(),
            "{} has {} times but {} values",
            label,
            times.len(),
            values.len()
        );

        Ok(Self {
            label,
            times,
            values,
        })
    }

    /// Multiplies every value, e.g. to turn a force into a force coefficient.
    pub fn scaled(mut self, coefficient: f64) -> Self {
        self.values.iter_mut().for_each(|v| *v *= coefficient);
        self
    }

    /// Indices of the local minima and maxima.
    ///
    /// A sample is an extremum if it is `<=` (minimum) or `>=` (maximum) every sample
    /// within `order` neighbours on each side, windows being clipped at both ends. The
    /// last candidate is discarded and candidates within `order` samples of the previous
    /// candidate are removed.
    pub fn extrema(&self, order: usize) -> (Vec<usize>, Vec<usize>) {
        (
            relative_extrema(&self.values, order, |a, b| a <= b),
            relative_extrema(&self.values, order, |a, b| a >= b),
        )
    }

    pub fn mean(&self, window: Window, order: usize) -> Result<Mean> {
        let indices = match window {
            Window::Limits(start, end) => self
                .times
                .iter()
                .enumerate()
                .filter(|&(_, &t)| t >= start && t <= end)
                .map(|(i, _)| i)
                .collect::<Vec<_>>(),
            Window::LastPeriod => {
                let (minima, maxima) = self.extrema(order);
                let bounds = match (minima.last(), maxima.last()) {
                    (Some(min), Some(max)) if min > max => last_two(&minima),
                    (_, Some(_)) => last_two(&maxima),
                    _ => None,
                };
                match bounds {
                    Some((a, b)) => (a..=b).collect(),
                    None => bail!("{} does not hold a full period", self.label),
                }
            }
        };

        let (first, last) = match (indices.first(), indices.last()) {
            (Some(&first), Some(&last)) => (first, last),
            _ => bail!("No {} sample in the averaging window", self.label),
        };

        Ok(Mean {
            value: indices.iter().map(|&i| self.values[i]).sum::<f64>() / indices.len() as f64,
            start: self.times[first],
            end: self.times[last],
        })
    }

    /// Distances between the extrema and the mean value
    pub fn deviations(&self, window: Window, order: usize) -> Result<Deviations> {
        let mean = self.mean(window, order)?.value;
        let (minima, maxima) = self.extrema(order);

        let distances = |indices: &[usize]| {
            indices
                .iter()
                .map(|&i| (self.values[i] - mean).abs())
                .collect::<Vec<_>>()
        };

        Ok(match window {
            Window::LastPeriod => Deviations {
                min: minima.last().map(|&i| distances(&[i])).unwrap_or_default(),
                max: maxima.last().map(|&i| distances(&[i])).unwrap_or_default(),
            },
            Window::Limits(..) => Deviations {
                min: distances(&minima),
                max: distances(&maxima),
            },
        })
    }
}

fn last_two(indices: &[usize]) -> Option<(usize, usize)> {
    match indices {
        [.., a, b] => Some((*a, *b)),
        _ => None,
    }
}

fn relative_extrema<F: Fn(f64, f64) -> bool>(values: &[f64], order: usize, cmp: F) -> Vec<usize> {
    let n = values.len();
    if n == 0 {
        return vec![];
    }

    let mut candidates = (0..n)
        .filter(|&i| {
            (1..=order).all(|shift| {
                let after = (i + shift).min(n - 1);
                let before = i.saturating_sub(shift);
                cmp(values[i], values[after]) && cmp(values[i], values[before])
            })
        })
        .collect::<Vec<_>>();
    candidates.pop();

    let mut kept: Vec<usize> = Vec::with_capacity(candidates.len());
    let mut previous: Option<usize> = None;
    for i in candidates {
        if previous.map_or(true, |p| i - p > order) {
            kept.push(i);
        }
        previous = Some(i);
    }

    kept
}

/// Strouhal number from the lift history.
///
/// The period is measured between consecutive minima of the lift occurring before
/// `end_time`; the last `n_periods` values are averaged.
pub fn strouhal(
    lift: &Force,
    length: f64,
    velocity: f64,
    n_periods: usize,
    end_time: f64,
    order: usize,
) -> Result<(f64, Vec<f64>)> {
    ensure!(n_periods > 0, "At least one period is needed");

    let (minima, _) = lift.extrema(order);
    let minima = minima
        .into_iter()
        .filter(|&i| lift.times[i] <= end_time)
        .collect::<Vec<_>>();
    ensure!(
        minima.len() > n_periods,
        "{} minima found in {}, {} needed for {} period(s)",
        minima.len(),
        lift.label,
        n_periods + 1,
        n_periods
    );

    let strouhals = minima[minima.len() - n_periods - 1..]
        .windows(2)
        .map(|w| length / velocity / (lift.times[w[1]] - lift.times[w[0]]))
        .collect::<Vec<_>>();
    let mean = strouhals.iter().sum::<f64>() / strouhals.len() as f64;

    info!(
        "Strouhal number over the last {} period(s): {} (values used: {:?})",
        n_periods, mean, strouhals
    );

    Ok((mean, strouhals))
}

/// Time-averaged forces of one simulation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForceSummary {
    pub description: String,
    pub coefficients: bool,
    pub drag: Mean,
    pub lift: Mean,
    pub strouhal: Option<f64>,
}

/// Renders summaries as a fixed-width table, one simulation per row.
pub fn summary_table(summaries: &[ForceSummary]) -> String {
    let coefficients = summaries.iter().any(|s| s.coefficients);
    let (drag, lift) = if coefficients {
        ("<Cd>", "<Cl>")
    } else {
        ("<Fx>", "<Fy>")
    };
    let with_strouhal = summaries.iter().any(|s| s.strouhal.is_some());
    let width = summaries
        .iter()
        .map(|s| s.description.len())
        .max()
        .unwrap_or(0)
        .max(16);

    let mut table = format!(
        "{:<width$} {:>10} {:>10}",
        "simulation",
        drag,
        lift,
        width = width
    );
    if with_strouhal {
        let _ = write!(table, " {:>10}", "<St>");
    }
    table.push('\n');

    for s in summaries {
        let _ = write!(
            table,
            "{:<width$} {:>10.4} {:>10.4}",
            s.description,
            s.drag.value,
            s.lift.value,
            width = width
        );
        if with_strouhal {
            match s.strouhal {
                Some(st) => {
                    let _ = write!(table, " {:>10.4}", st);
                }
                None => {
                    let _ = write!(table, " {:>10}", "-");
                }
            }
        }
        table.push('\n');
    }

    table
}

pub fn write_summary<P: AsRef<Path>>(path: P, summaries: &[ForceSummary]) -> Result<()> {
    let path = path.as_ref();
    fs::write(path, summary_table(summaries))
        .with_context(|| format!("Failed to write {}", path.display()))?;
    info!("Force summary written into {}", path.display());

    Ok(())
}
