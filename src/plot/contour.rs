//! Filled contours of 2D fields.

use {
    super::create_parent,
    crate::{body::Body, field::Field, style::Style, utils::{midpoints, time_step_name}},
    anyhow::{ensure, Result},
    log::{info, warn},
    plotters::prelude::*,
    serde::Deserialize,
    std::{
        iter,
        path::{Path, PathBuf},
    },
};

/// Number of levels when no range is given
pub const DATA_LEVELS: usize = 101;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Figure {
    /// `[min, max, number of levels]`
    pub range: Option<[f64; 3]>,
    /// `[x_min, y_min, x_max, y_max]`, missing or infinite bounds follow the field
    pub view: [Option<f64>; 4],
    pub colorbar: bool,
    /// Prefix of the image files, the field label otherwise
    pub save_name: Option<String>,
    /// Time-increment of the simulation, to print the time on the figure
    pub time_increment: Option<f64>,
}

impl Default for Figure {
    fn default() -> Self {
        Self {
            range: None,
            view: [None; 4],
            colorbar: true,
            save_name: None,
            time_increment: None,
        }
    }
}

impl Figure {
    /// Settings of one of `fields` fields plotted together, the label prefixing a shared
    /// save name.
    pub fn labelled(&self, label: &str, fields: usize) -> Self {
        let save_name = match &self.save_name {
            Some(name) if fields > 1 => format!("{}_{}", label, name),
            Some(name) => name.clone(),
            None => label.to_owned(),
        };

        Self {
            save_name: Some(save_name),
            ..self.clone()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ColorMap {
    Jet,
    /// Blue to white to red
    BlueRed,
}

impl ColorMap {
    pub fn for_label(label: &str) -> Self {
        match label {
            "pressure" => ColorMap::Jet,
            _ => ColorMap::BlueRed,
        }
    }

    /// Colour at `t` in `[0, 1]`
    pub fn color(self, t: f64) -> RGBColor {
        let t = t.max(0.0).min(1.0);
        let channel = |c: f64| (255.0 * c.max(0.0).min(1.0)).round() as u8;

        match self {
            ColorMap::Jet => RGBColor(
                channel(1.5 - (4.0 * t - 3.0).abs()),
                channel(1.5 - (4.0 * t - 2.0).abs()),
                channel(1.5 - (4.0 * t - 1.0).abs()),
            ),
            ColorMap::BlueRed => {
                const BLUE: [f64; 3] = [33.0, 102.0, 172.0];
                const WHITE: [f64; 3] = [247.0, 247.0, 247.0];
                const RED: [f64; 3] = [178.0, 24.0, 43.0];

                let (from, to, s) = if t < 0.5 {
                    (BLUE, WHITE, 2.0 * t)
                } else {
                    (WHITE, RED, 2.0 * t - 1.0)
                };
                let mix = |k: usize| (from[k] + s * (to[k] - from[k])).round() as u8;
                RGBColor(mix(0), mix(1), mix(2))
            }
        }
    }
}

/// Contour levels: `[min, max, n]` evenly spaced, or `DATA_LEVELS` spanning the field.
pub fn levels(field: &Field, range: Option<[f64; 3]>) -> Result<Vec<f64>> {
    let (min, max, n) = match range {
        Some([min, max, n]) => (min, max, n as usize),
        None => (field.min(), field.max(), DATA_LEVELS),
    };
    ensure!(n >= 2 && max > min, "Invalid contour levels: [{}, {}, {}]", min, max, n);

    let step = (max - min) / (n - 1) as f64;
    Ok((0..n).map(|k| min + k as f64 * step).collect())
}

/// Index of the band holding `value`, values outside the levels taking the end bands
pub fn band(levels: &[f64], value: f64) -> usize {
    let bands = levels.len() - 1;
    levels[1..bands].iter().take_while(|&&l| value >= l).count()
}

/// Limits of the cells surrounding each station
fn edges(stations: &[f64]) -> Vec<f64> {
    let mut edges = Vec::with_capacity(stations.len() + 1);
    edges.extend(stations.first());
    edges.extend(midpoints(stations));
    edges.extend(stations.last());
    edges
}

/// Plotted window, `[x_min, y_min, x_max, y_max]`
pub fn window(field: &Field, view: [Option<f64>; 4]) -> [f64; 4] {
    let bounds = [
        field.x[0],
        field.y[0],
        field.x[field.x.len() - 1],
        field.y[field.y.len() - 1],
    ];
    let mut window = bounds;
    for (w, v) in window.iter_mut().zip(&view) {
        if let Some(v) = v.filter(|v| v.is_finite()) {
            *w = v;
        }
    }
    window
}

/// `<directory>/<save_name><time-step>.png`
pub fn contour_path(directory: &Path, save_name: &str, time_step: Option<usize>) -> PathBuf {
    directory.join(format!(
        "{}{}.png",
        save_name,
        time_step.map(time_step_name).unwrap_or_default()
    ))
}

/// Plots the field into `directory`; uniform fields are skipped and give `None`.
pub fn plot_contour(
    directory: &Path,
    style: &Style,
    field: &Field,
    figure: &Figure,
    bodies: &[Body],
) -> Result<Option<PathBuf>> {
    if field.is_uniform() {
        warn!("Uniform {} field, contour skipped", field.label);
        return Ok(None);
    }
    let levels = levels(field, figure.range)?;
    let map = ColorMap::for_label(&field.label);
    let bands = levels.len() - 1;
    let color = |k: usize| map.color((k as f64 + 0.5) / bands as f64);

    let view = window(field, figure.view);
    let (width, height) = (view[2] - view[0], view[3] - view[1]);
    ensure!(width > 0.0 && height > 0.0, "Empty view {:?}", view);
    let pixels = style.pixels().0;
    let size = (pixels, ((f64::from(pixels) * height / width).round() as u32).max(1));

    let path = contour_path(
        directory,
        figure.save_name.as_deref().unwrap_or(&field.label),
        field.time_step,
    );
    create_parent(&path)?;
    info!(
        "Plotting the {} contour (min={}, max={}, levels={})",
        field.label,
        field.min(),
        field.max(),
        levels.len()
    );

    {
        let root = BitMapBackend::new(&path, size).into_drawing_area();
        root.fill(&WHITE)?;
        let mut chart = ChartBuilder::on(&root).build_cartesian_2d(view[0]..view[2], view[1]..view[3])?;

        let (xe, ye) = (edges(&field.x.to_vec()), edges(&field.y.to_vec()));
        let inside = |lo: f64, hi: f64, min: f64, max: f64| hi > min && lo < max;
        let columns = (0..field.x.len())
            .filter(|&i| inside(xe[i], xe[i + 1], view[0], view[2]))
            .collect::<Vec<_>>();
        let rows = (0..field.y.len())
            .filter(|&j| inside(ye[j], ye[j + 1], view[1], view[3]))
            .collect::<Vec<_>>();
        let cells = rows
            .iter()
            .flat_map(|&j| columns.iter().map(move |&i| (i, j)))
            .map(|(i, j)| {
                Rectangle::new(
                    [(xe[i], ye[j]), (xe[i + 1], ye[j + 1])],
                    color(band(&levels, field.values[[j, i]])).filled(),
                )
            });
        chart.draw_series(cells)?;

        for body in bodies {
            chart.draw_series(LineSeries::new(
                body.x.iter().copied().zip(body.y.iter().copied()),
                BLACK.stroke_width(1),
            ))?;
        }

        if figure.colorbar {
            let (x0, y0) = (view[0] + 0.05 * width, view[1] + 0.05 * height);
            let step = 0.3 * width / bands as f64;
            chart.draw_series((0..bands).map(|k| {
                Rectangle::new(
                    [
                        (x0 + k as f64 * step, y0),
                        (x0 + (k + 1) as f64 * step, y0 + 0.02 * height),
                    ],
                    color(k).filled(),
                )
            }))?;
            chart.draw_series(
                [(x0, levels[0]), (x0 + 0.3 * width, levels[bands])]
                    .iter()
                    .map(|&(x, level)| Text::new(format!("{:.4}", level), (x, y0 + 0.03 * height), style.font())),
            )?;
        }

        if let (Some(dt), Some(ts)) = (figure.time_increment, field.time_step) {
            chart.draw_series(iter::once(Text::new(
                format!("{} time-units", dt * ts as f64),
                (view[0] + 0.05 * width, view[1] + 0.9 * height),
                style.font(),
            )))?;
        }

        root.present()?;
    }
    info!("{} contour saved into {}", field.label, path.display());

    Ok(Some(path))
}

#[cfg(test)]
mod test {
    use {
        super::*,
        approx::assert_abs_diff_eq,
        ndarray::{arr1, arr2},
        tempdir::TempDir,
    };

    fn field(label: &str) -> Field {
        Field::new(
            label,
            Some(500),
            arr1(&[0.0, 1.0, 2.0]),
            arr1(&[0.0, 2.0]),
            arr2(&[[0.0, 1.0, 2.0], [3.0, 4.0, 5.0]]),
        )
        .unwrap()
    }

    #[test]
    fn data_and_configured_levels() {
        let p = field("pressure");

        let data = levels(&p, None).unwrap();
        assert_eq!(data.len(), DATA_LEVELS);
        assert_abs_diff_eq!(data[50], 2.5, epsilon = 1.0E-12);
        assert_abs_diff_eq!(data[100], 5.0, epsilon = 1.0E-12);

        assert_eq!(levels(&p, Some([-1.0, 1.0, 5.0])).unwrap(), vec![-1.0, -0.5, 0.0, 0.5, 1.0]);
        assert!(levels(&p, Some([1.0, 1.0, 5.0])).is_err());
        assert!(levels(&p, Some([0.0, 1.0, 1.0])).is_err());
    }

    #[test]
    fn bands_extend_both_ways() {
        let levels = [0.0, 1.0, 2.0, 3.0];
        assert_eq!(band(&levels, -5.0), 0);
        assert_eq!(band(&levels, 0.5), 0);
        assert_eq!(band(&levels, 1.0), 1);
        assert_eq!(band(&levels, 2.9), 2);
        assert_eq!(band(&levels, 30.0), 2);
    }

    #[test]
    fn color_maps() {
        assert_eq!(ColorMap::for_label("pressure"), ColorMap::Jet);
        assert_eq!(ColorMap::for_label("vorticity"), ColorMap::BlueRed);

        assert_eq!(ColorMap::Jet.color(0.0), RGBColor(0, 0, 128));
        assert_eq!(ColorMap::Jet.color(0.5), RGBColor(128, 255, 128));
        assert_eq!(ColorMap::Jet.color(2.0), RGBColor(128, 0, 0));
        assert_eq!(ColorMap::BlueRed.color(0.0), RGBColor(33, 102, 172));
        assert_eq!(ColorMap::BlueRed.color(0.5), RGBColor(247, 247, 247));
        assert_eq!(ColorMap::BlueRed.color(1.0), RGBColor(178, 24, 43));
    }

    #[test]
    fn windows_and_paths() {
        let p = field("pressure");
        assert_eq!(window(&p, [None; 4]), [0.0, 0.0, 2.0, 2.0]);
        assert_eq!(
            window(&p, [Some(0.5), Some(f64::NEG_INFINITY), None, Some(1.0)]),
            [0.5, 0.0, 2.0, 1.0]
        );
        assert_eq!(edges(&[0.0, 1.0, 3.0]), vec![0.0, 0.5, 2.0, 3.0]);

        let dir = Path::new("images");
        assert_eq!(contour_path(dir, "p", Some(500)), dir.join("p0000500.png"));
        assert_eq!(contour_path(dir, "p", None), dir.join("p.png"));
    }

    #[test]
    fn shared_save_name() {
        let figure = Figure {
            save_name: Some("wake".to_owned()),
            ..Figure::default()
        };

        assert_eq!(figure.labelled("pressure", 1).save_name.as_deref(), Some("wake"));
        assert_eq!(figure.labelled("pressure", 2).save_name.as_deref(), Some("pressure_wake"));
        assert_eq!(
            Figure::default().labelled("vorticity", 2).save_name.as_deref(),
            Some("vorticity")
        );
    }

    #[test]
    fn several_fields_keep_their_images() {
        let dir = TempDir::new("flowpost").unwrap();
        let figure = Figure {
            save_name: Some("wake".to_owned()),
            colorbar: false,
            ..Figure::default()
        };
        let fields = [field("pressure"), field("vorticity")];

        let written = fields
            .iter()
            .map(|f| {
                plot_contour(dir.path(), &Style::default(), f, &figure.labelled(&f.label, fields.len()), &[])
                    .unwrap()
                    .unwrap()
            })
            .collect::<Vec<_>>();

        assert_eq!(
            written,
            vec![
                dir.path().join("pressure_wake0000500.png"),
                dir.path().join("vorticity_wake0000500.png"),
            ]
        );
        assert!(written.iter().all(|path| path.is_file()));
    }

    #[test]
    fn uniform_fields_are_skipped() {
        let dir = TempDir::new("flowpost").unwrap();
        let mut p = field("pressure");
        p.values.fill(1.0);

        let written = plot_contour(dir.path(), &Style::default(), &p, &Figure::default(), &[]).unwrap();
        assert_eq!(written, None);
        assert!(!contour_path(dir.path(), "pressure", Some(500)).exists());
    }

    #[test]
    #[ignore = "needs system fonts"]
    fn render() {
        let dir = TempDir::new("flowpost").unwrap();
        let body = Body::new(vec![0.5, 1.5, 1.0], vec![0.5, 0.5, 1.5]).unwrap();
        let figure = Figure {
            time_increment: Some(0.01),
            ..Figure::default()
        };

        let path = plot_contour(dir.path(), &Style::default(), &field("vorticity"), &figure, &[body])
            .unwrap()
            .unwrap();
        assert_eq!(path, dir.path().join("vorticity0000500.png"));
        assert!(path.is_file());
    }
}
