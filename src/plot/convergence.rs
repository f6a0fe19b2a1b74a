//! Log-log figure of the errors versus the grid spacing.

use {
    super::{create_parent, data_range},
    crate::{convergence::Errors, style::Style, utils::time_step_name},
    anyhow::{bail, Result},
    log::info,
    plotters::prelude::*,
    std::{
        ops::Range,
        path::{Path, PathBuf},
    },
};

/// `<images>/<save_name><time-step>.png`
pub fn convergence_path(images: &Path, save_name: &str, time_step: usize) -> PathBuf {
    images.join(format!("{}{}.png", save_name, time_step_name(time_step)))
}

/// Axes spanning a decade beyond the spacings and the errors
pub fn ranges(errors: &[Errors]) -> Result<(Range<f64>, Range<f64>)> {
    let positive = |values: Vec<f64>| data_range(values.into_iter().filter(|&v| v > 0.0));
    let spacings = positive(errors.iter().flat_map(|e| e.spacings.clone()).collect());
    let values = positive(errors.iter().flat_map(|e| e.values.clone()).collect());

    match (spacings, values) {
        (Some((h0, h1)), Some((e0, e1))) => Ok((0.1 * h0..10.0 * h1, 0.1 * e0..10.0 * e1)),
        _ => bail!("No positive error to plot on logarithmic axes"),
    }
}

pub fn plot_convergence(path: &Path, style: &Style, errors: &[Errors]) -> Result<()> {
    let (x, y) = ranges(errors)?;
    create_parent(path)?;
    info!("Plotting the grid convergence");

    let side = style.pixels().1;
    let root = BitMapBackend::new(path, (side, side)).into_drawing_area();
    root.fill(&WHITE)?;
    let mut chart = ChartBuilder::on(&root)
        .margin(20)
        .x_label_area_size(60)
        .y_label_area_size(80)
        .build_cartesian_2d(x.log_scale(), y.log_scale())?;

    let mut mesh = chart.configure_mesh();
    mesh.x_desc("grid-spacing")
        .y_desc("errors")
        .label_style(style.font())
        .axis_desc_style(style.font());
    if !style.grid {
        mesh.disable_mesh();
    }
    mesh.draw()?;

    for (k, e) in errors.iter().enumerate() {
        let color = style.color(k);
        let line = color.stroke_width(style.line_width);
        let legend = line.clone();
        let points = e
            .spacings
            .iter()
            .copied()
            .zip(e.values.iter().copied())
            .filter(|&(h, v)| h > 0.0 && v > 0.0)
            .collect::<Vec<_>>();

        chart
            .draw_series(LineSeries::new(points.clone(), line))?
            .label(format!("{} - {}-norm", e.field, e.norm.label()))
            .legend(move |(px, py)| PathElement::new(vec![(px, py), (px + 20, py)], legend.clone()));
        chart.draw_series(points.into_iter().map(|p| Circle::new(p, 4, color.filled())))?;
    }

    chart
        .configure_series_labels()
        .label_font(style.font())
        .background_style(&WHITE.mix(0.8))
        .border_style(&BLACK)
        .draw()?;
    root.present()?;
    info!("Grid convergence plotted into {}", path.display());

    Ok(())
}

#[cfg(test)]
mod test {
    use {
        super::*,
        crate::{field::Norm, simulation::FieldName},
        approx::assert_abs_diff_eq,
        tempdir::TempDir,
    };

    fn errors() -> Vec<Errors> {
        vec![
            Errors {
                field: FieldName::Pressure,
                norm: Norm::L2,
                spacings: vec![0.1, 0.05],
                values: vec![4.0E-02, 1.0E-02],
            },
            Errors {
                field: FieldName::XVelocity,
                norm: Norm::Linf,
                spacings: vec![0.1, 0.05],
                values: vec![2.0E-01, 0.0],
            },
        ]
    }

    #[test]
    fn decade_margins() {
        let (x, y) = ranges(&errors()).unwrap();

        assert_abs_diff_eq!(x.start, 0.005, epsilon = 1.0E-12);
        assert_abs_diff_eq!(x.end, 1.0, epsilon = 1.0E-12);
        assert_abs_diff_eq!(y.start, 0.001, epsilon = 1.0E-12);
        assert_abs_diff_eq!(y.end, 2.0, epsilon = 1.0E-12);

        let mut zeros = errors();
        zeros.iter_mut().for_each(|e| e.values = vec![0.0, 0.0]);
        assert!(ranges(&zeros).is_err());
    }

    #[test]
    fn image_name() {
        assert_eq!(
            convergence_path(Path::new("images"), "convergence", 500),
            Path::new("images").join("convergence0000500.png")
        );
    }

    #[test]
    #[ignore = "needs system fonts"]
    fn render() {
        let dir = TempDir::new("flowpost").unwrap();
        let path = convergence_path(dir.path(), "convergence", 500);

        plot_convergence(&path, &Style::default(), &errors()).unwrap();
        assert!(path.is_file());
    }
}
