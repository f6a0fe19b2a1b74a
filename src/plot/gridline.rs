//! Profiles of a field along a gridline, compared with validation data.

use {
    super::{axis_range, create_parent, data_range},
    crate::{
        field::{clip, Field},
        style::Style,
        utils::read_columns,
    },
    anyhow::{bail, Result},
    log::info,
    plotters::prelude::*,
    serde::Deserialize,
    std::path::Path,
};

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    /// Constant x, values along y
    Vertical,
    /// Constant y, values along x
    Horizontal,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Profile {
    pub label: String,
    pub stations: Vec<f64>,
    pub values: Vec<f64>,
}

impl Profile {
    /// Values of `field` along the gridline at `position`, kept within `boundaries`.
    pub fn extract<S: Into<String>>(
        label: S,
        field: &Field,
        orientation: Orientation,
        position: f64,
        boundaries: Option<[f64; 2]>,
    ) -> Result<Self> {
        let (stations, values) = match orientation {
            Orientation::Vertical => field.vertical_gridline(position)?,
            Orientation::Horizontal => field.horizontal_gridline(position)?,
        };
        let [start, end] = boundaries.unwrap_or([f64::NEG_INFINITY, f64::INFINITY]);
        let (stations, values) = clip(&stations, &values, start, end);

        Ok(Self {
            label: label.into(),
            stations,
            values,
        })
    }

    /// Validation data: stations in the first column, values in the second.
    pub fn read<P: AsRef<Path>, S: Into<String>>(label: S, path: P) -> Result<Self> {
        let mut columns = read_columns(path, &[0, 1], false)?;
        let values = columns.pop().unwrap_or_default();
        let stations = columns.pop().unwrap_or_default();

        Ok(Self {
            label: label.into(),
            stations,
            values,
        })
    }

    /// Plotted points, values horizontal for a vertical gridline
    pub fn points(&self, orientation: Orientation) -> Vec<(f64, f64)> {
        self.stations
            .iter()
            .zip(&self.values)
            .map(|(&s, &v)| match orientation {
                Orientation::Vertical => (v, s),
                Orientation::Horizontal => (s, v),
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Figure {
    pub save_name: String,
    /// `[x_min, x_max, y_min, y_max]`
    pub limits: [Option<f64>; 4],
}

impl Default for Figure {
    fn default() -> Self {
        Self {
            save_name: "gridline".to_owned(),
            limits: [None; 4],
        }
    }
}

pub fn plot_gridline(
    path: &Path,
    style: &Style,
    figure: &Figure,
    orientation: Orientation,
    field_label: &str,
    profiles: &[Profile],
    validation: Option<&Profile>,
) -> Result<()> {
    let points = profiles
        .iter()
        .chain(validation)
        .map(|p| p.points(orientation))
        .collect::<Vec<_>>();
    let (x, y) = match (
        data_range(points.iter().flatten().map(|p| p.0)),
        data_range(points.iter().flatten().map(|p| p.1)),
    ) {
        (Some(x), Some(y)) => (x, y),
        _ => bail!("No {} profile to plot", field_label),
    };
    let x = axis_range([figure.limits[0], figure.limits[1]], x);
    let y = axis_range([figure.limits[2], figure.limits[3]], y);
    let (x_desc, y_desc) = match orientation {
        Orientation::Vertical => (field_label, "y"),
        Orientation::Horizontal => ("x", field_label),
    };
    create_parent(path)?;

    let root = BitMapBackend::new(path, style.pixels()).into_drawing_area();
    root.fill(&WHITE)?;
    let mut chart = ChartBuilder::on(&root)
        .margin(20)
        .x_label_area_size(60)
        .y_label_area_size(80)
        .build_cartesian_2d(x, y)?;

    let mut mesh = chart.configure_mesh();
    mesh.x_desc(x_desc)
        .y_desc(y_desc)
        .label_style(style.font())
        .axis_desc_style(style.font());
    if !style.grid {
        mesh.disable_mesh();
    }
    mesh.draw()?;

    for (k, profile) in profiles.iter().enumerate() {
        let line = style.color(k).stroke_width(style.line_width);
        let legend = line.clone();
        chart
            .draw_series(LineSeries::new(points[k].clone(), line))?
            .label(profile.label.clone())
            .legend(move |(px, py)| PathElement::new(vec![(px, py), (px + 20, py)], legend.clone()));
    }
    if let Some(validation) = validation {
        chart
            .draw_series(
                points[profiles.len()]
                    .iter()
                    .map(|&p| Circle::new(p, 4, BLACK.filled())),
            )?
            .label(validation.label.clone())
            .legend(|(px, py)| Circle::new((px + 10, py), 4, BLACK.filled()));
    }

    chart
        .configure_series_labels()
        .label_font(style.font())
        .background_style(&WHITE.mix(0.8))
        .border_style(&BLACK)
        .draw()?;
    root.present()?;
    info!("{} gridline plotted into {}", field_label, path.display());

    Ok(())
}
