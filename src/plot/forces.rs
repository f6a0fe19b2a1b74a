//! Force histories versus time.

use {
    super::{axis_range, create_parent, dashes, data_range},
    crate::{forces::Force, style::Style},
    anyhow::{bail, Result},
    log::info,
    plotters::prelude::*,
    serde::Deserialize,
    std::{iter, ops::Range, path::Path},
};

/// Number of segments in each dash of the other simulations
const DASH: usize = 4;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Figure {
    pub save_name: String,
    /// `[t_min, t_max, y_min, y_max]`, missing or infinite bounds follow the data
    pub limits: [Option<f64>; 4],
    /// Marks the minima and maxima of the histories
    pub extrema: bool,
    /// Horizontal guides at the last minimum and maximum
    pub guides: bool,
    /// Neighbours on each side a value is compared to when looking for extrema
    pub order: usize,
}

impl Default for Figure {
    fn default() -> Self {
        Self {
            save_name: "forces".to_owned(),
            limits: [None; 4],
            extrema: false,
            guides: false,
            order: 5,
        }
    }
}

/// Forces of one simulation
#[derive(Debug, Clone, Copy)]
pub struct Histories<'a> {
    pub description: &'a str,
    pub forces: &'a [Force],
}

impl Figure {
    /// Axis ranges; the y-range follows the samples inside the time range.
    pub fn ranges(&self, forces: &[&Force]) -> Result<(Range<f64>, Range<f64>)> {
        let times = match data_range(forces.iter().flat_map(|f| f.times.iter().copied())) {
            Some(range) => range,
            None => bail!("No force history to plot"),
        };
        let x = axis_range([self.limits[0], self.limits[1]], times);

        let values = data_range(forces.iter().flat_map(|f| visible(f, &x)).map(|(_, v)| v))
            .unwrap_or((0.0, 1.0));
        let y = axis_range([self.limits[2], self.limits[3]], values);

        Ok((x, y))
    }
}

/// Samples with time inside `x`
fn visible(force: &Force, x: &Range<f64>) -> Vec<(f64, f64)> {
    force
        .times
        .iter()
        .zip(&force.values)
        .filter(|&(&t, _)| t >= x.start && t <= x.end)
        .map(|(&t, &v)| (t, v))
        .collect()
}

/// Values of the last minimum and last maximum
pub fn last_extrema(force: &Force, order: usize) -> Vec<f64> {
    let (minima, maxima) = force.extrema(order);
    minima
        .last()
        .into_iter()
        .chain(maxima.last())
        .map(|&i| force.values[i])
        .collect()
}

/// Draws the histories of `main` as solid lines and those of `others` dashed.
pub fn plot_forces(
    path: &Path,
    style: &Style,
    figure: &Figure,
    y_label: &str,
    main: Histories,
    others: &[Histories],
) -> Result<()> {
    let all = iter::once(&main)
        .chain(others)
        .flat_map(|h| h.forces.iter())
        .collect::<Vec<_>>();
    let (x, y) = figure.ranges(&all)?;
    create_parent(path)?;

    let root = BitMapBackend::new(path, style.pixels()).into_drawing_area();
    root.fill(&WHITE)?;
    let mut chart = ChartBuilder::on(&root)
        .margin(20)
        .x_label_area_size(60)
        .y_label_area_size(80)
        .build_cartesian_2d(x.clone(), y)?;

    let mut mesh = chart.configure_mesh();
    mesh.x_desc("time")
        .y_desc(y_label)
        .label_style(style.font())
        .axis_desc_style(style.font());
    if !style.grid {
        mesh.disable_mesh();
    }
    mesh.draw()?;

    let mut color = 0;
    for force in main.forces {
        let line = style.color(color).stroke_width(style.line_width);
        let legend = line.clone();
        chart
            .draw_series(LineSeries::new(visible(force, &x), line.clone()))?
            .label(format!("{} ({})", force.label, main.description))
            .legend(move |(px, py)| PathElement::new(vec![(px, py), (px + 20, py)], legend.clone()));

        if figure.extrema {
            let (minima, maxima) = force.extrema(figure.order);
            let marker = style.color(color).filled();
            chart.draw_series(
                minima
                    .into_iter()
                    .chain(maxima)
                    .filter(|&i| x.contains(&force.times[i]))
                    .map(|i| Circle::new((force.times[i], force.values[i]), 4, marker.clone())),
            )?;
        }
        if figure.guides {
            for value in last_extrema(force, figure.order) {
                chart.draw_series(iter::once(PathElement::new(
                    vec![(x.start, value), (x.end, value)],
                    BLACK.stroke_width(1),
                )))?;
            }
        }
        color += 1;
    }

    for histories in others {
        for force in histories.forces {
            let line = style.color(color).stroke_width(style.line_width);
            let legend = line.clone();
            chart
                .draw_series(
                    dashes(&visible(force, &x), DASH)
                        .into_iter()
                        .map(|piece| PathElement::new(piece, line.clone())),
                )?
                .label(format!("{} ({})", force.label, histories.description))
                .legend(move |(px, py)| PathElement::new(vec![(px, py), (px + 20, py)], legend.clone()));
            color += 1;
        }
    }

    chart
        .configure_series_labels()
        .label_font(style.font())
        .background_style(&WHITE.mix(0.8))
        .border_style(&BLACK)
        .draw()?;
    root.present()?;
    info!("Force histories plotted into {}", path.display());

    Ok(())
}
