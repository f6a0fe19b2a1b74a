//! Legacy VTK files (ASCII, rectilinear grid) for visualisation in ParaView or VisIt.

use {
    crate::{field::Field, utils::time_step_name},
    anyhow::{ensure, Context, Result},
    log::info,
    std::{
        fs::{self, File},
        io::{BufWriter, Write},
        path::{Path, PathBuf},
    },
};

/// Data attached to the grid points
#[derive(Debug, Clone, Copy)]
pub enum Data<'a> {
    Scalar(&'a Field),
    /// Two components sharing the same stations
    Vector(&'a Field, &'a Field),
}

impl<'a> Data<'a> {
    fn first(&self) -> &'a Field {
        match *self {
            Data::Scalar(f) | Data::Vector(f, _) => f,
        }
    }
}

/// Indices of the stations strictly inside `(lower, upper)`, keeping every `stride`-th one
fn window(stations: &[f64], lower: f64, upper: f64, stride: usize) -> Vec<usize> {
    stations
        .iter()
        .enumerate()
        .filter(|&(_, &s)| s > lower && s < upper)
        .map(|(i, _)| i)
        .step_by(stride)
        .collect()
}

/// Writes the data lying inside the `[x0, y0, x1, y1]` view, one station out of `stride`.
pub fn render<W: Write>(out: &mut W, data: Data, name: &str, view: [f64; 4], stride: usize) -> Result<()> {
    ensure!(stride > 0, "Stride must be positive");
    let field = data.first();
    if let Data::Vector(x, y) = data {
        ensure!(
            x.x == y.x && x.y == y.y,
            "Vector components {} and {} are not collocated",
            x.label,
            y.label
        );
    }

    let columns = window(&field.x.to_vec(), view[0], view[2], stride);
    let rows = window(&field.y.to_vec(), view[1], view[3], stride);
    let (nx, ny) = (columns.len(), rows.len());

    writeln!(out, "# vtk DataFile Version 3.0")?;
    writeln!(out, "contains {} field", name)?;
    writeln!(out, "ASCII")?;
    writeln!(out, "DATASET RECTILINEAR_GRID")?;
    writeln!(out, "DIMENSIONS {} {} 1", nx, ny)?;
    writeln!(out, "X_COORDINATES {} double", nx)?;
    for &i in &columns {
        writeln!(out, "{:.6}", field.x[i])?;
    }
    writeln!(out, "Y_COORDINATES {} double", ny)?;
    for &j in &rows {
        writeln!(out, "{:.6}", field.y[j])?;
    }
    writeln!(out, "Z_COORDINATES 1 double")?;
    writeln!(out, "0.0")?;
    writeln!(out, "POINT_DATA {}", nx * ny)?;

    match data {
        Data::Scalar(f) => {
            writeln!(out, "\nSCALARS {} double 1\nLOOKUP_TABLE default", name)?;
            for &j in &rows {
                for &i in &columns {
                    writeln!(out, "{:.6}", f.values[[j, i]])?;
                }
            }
        }
        Data::Vector(u, v) => {
            writeln!(out, "\nVECTORS {} double", name)?;
            for &j in &rows {
                for &i in &columns {
                    writeln!(out, "{:.6}\t{:.6}\t0.0", u.values[[j, i]], v.values[[j, i]])?;
                }
            }
        }
    }

    Ok(())
}

/// Writes `<case>/vtk_files/<name>/<name><time-step>.vtk`.
pub fn write_vtk(
    data: Data,
    case: &Path,
    time_step: usize,
    name: &str,
    view: [f64; 4],
    stride: usize,
) -> Result<PathBuf> {
    let directory = case.join("vtk_files").join(name);
    fs::create_dir_all(&directory)
        .with_context(|| format!("Failed to create {}", directory.display()))?;
    let path = directory.join(format!("{}{}.vtk", name, time_step_name(time_step)));
    info!("Writing the {} field into {}", name, path.display());

    let mut out = BufWriter::new(
        File::create(&path).with_context(|| format!("Failed to create {}", path.display()))?,
    );
    render(&mut out, data, name, view, stride)?;
    out.flush()?;

    Ok(path)
}

#[cfg(test)]
mod test {
    use {
        super::*,
        insta::assert_debug_snapshot,
        ndarray::{arr1, arr2},
        tempdir::TempDir,
    };

    fn field(label: &str, offset: f64) -> Field {
        Field::new(
            label,
            Some(20),
            arr1(&[0.0, 0.5, 1.0]),
            arr1(&[0.0, 1.0]),
            arr2(&[[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]]) + offset,
        )
        .unwrap()
    }

    fn everything() -> [f64; 4] {
        [f64::NEG_INFINITY, f64::NEG_INFINITY, f64::INFINITY, f64::INFINITY]
    }

    #[test]
    fn scalar_field() {
        let p = field("pressure", 0.0);
        let mut out = Vec::new();
        render(&mut out, Data::Scalar(&p), "pressure", [-1.0, -1.0, 0.75, 2.0], 1).unwrap();
        let text = String::from_utf8(out).unwrap();

        assert_debug_snapshot!(text.lines().collect::<Vec<_>>(), @r###"
[
    "# vtk DataFile Version 3.0",
    "contains pressure field",
    "ASCII",
    "DATASET RECTILINEAR_GRID",
    "DIMENSIONS 2 2 1",
    "X_COORDINATES 2 double",
    "0.000000",
    "0.500000",
    "Y_COORDINATES 2 double",
    "0.000000",
    "1.000000",
    "Z_COORDINATES 1 double",
    "0.0",
    "POINT_DATA 4",
    "",
    "SCALARS pressure double 1",
    "LOOKUP_TABLE default",
    "1.000000",
    "2.000000",
    "4.000000",
    "5.000000",
]
"###);
    }

    #[test]
    fn strided_vector_field() {
        let (u, v) = (field("x-velocity", 0.0), field("y-velocity", 10.0));
        let mut out = Vec::new();
        render(&mut out, Data::Vector(&u, &v), "velocity", everything(), 2).unwrap();
        let text = String::from_utf8(out).unwrap();

        assert!(text.contains("DIMENSIONS 2 1 1\n"));
        assert!(text.contains("\nVECTORS velocity double\n1.000000\t11.000000\t0.0\n3.000000\t13.000000\t0.0\n"));
    }

    #[test]
    fn file_location() {
        let dir = TempDir::new("flowpost").unwrap();
        let p = field("pressure", 0.0);

        let path = write_vtk(Data::Scalar(&p), dir.path(), 20, "pressure", everything(), 1).unwrap();
        assert_eq!(
            path,
            dir.path().join("vtk_files").join("pressure").join("pressure0000020.vtk")
        );
        assert!(fs::read_to_string(path).unwrap().ends_with("6.000000\n"));
    }
}
