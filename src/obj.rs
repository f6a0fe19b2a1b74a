//! Wavefront OBJ surfaces used by the OpenFOAM mesh generator.

use {
    crate::body::Body,
    anyhow::{ensure, Context, Result},
    log::info,
    ndarray::Array1,
    std::{
        fs::File,
        io::{BufWriter, Write},
        path::{Path, PathBuf},
    },
};

fn header<W: Write>(out: &mut W, points: usize, faces: usize, name: &str) -> Result<()> {
    write!(
        out,
        "# Wavefront OBJ file\n# points: {}\n# faces: {}\n# zones: 1\n# regions: 0 {}\n",
        points, faces, name
    )?;
    Ok(())
}

fn create<P: AsRef<Path>>(directory: P, name: &str) -> Result<(PathBuf, BufWriter<File>)> {
    let path = directory.as_ref().join(format!("{}.obj", name));
    info!("Writing {}", path.display());
    let file = File::create(&path).with_context(|| format!("Failed to create {}", path.display()))?;

    Ok((path, BufWriter::new(file)))
}

/// Planar rectangle triangulated on a regular lattice of points
#[derive(Debug, Clone, PartialEq)]
pub struct Box2d {
    pub name: String,
    pub x: Array1<f64>,
    pub y: Array1<f64>,
    pub z: f64,
}

impl Box2d {
    /// `n` is the number of points along each direction, corners included.
    pub fn new<S: Into<String>>(
        name: S,
        bottom_left: [f64; 2],
        top_right: [f64; 2],
        n: [usize; 2],
        z: f64,
    ) -> Result<Self> {
        ensure!(n[0] >= 2 && n[1] >= 2, "A box needs at least two points per direction");

        Ok(Self {
            name: name.into(),
            x: Array1::linspace(bottom_left[0], top_right[0], n[0]),
            y: Array1::linspace(bottom_left[1], top_right[1], n[1]),
            z,
        })
    }

    /// Zero-based vertex indices of the triangles, lower and upper triangle of each quad
    /// in turn
    pub fn faces(&self) -> Vec<[usize; 3]> {
        let (nx, ny) = (self.x.len(), self.y.len());
        let mut faces = Vec::with_capacity(2 * (nx - 1) * (ny - 1));

        for j in 0..ny - 1 {
            for i in 0..nx - 1 {
                faces.push([j * nx + i, j * nx + i + 1, (j + 1) * nx + i]);
                faces.push([(j + 1) * nx + i + 1, (j + 1) * nx + i, j * nx + i + 1]);
            }
        }

        faces
    }

    pub fn render<W: Write>(&self, out: &mut W) -> Result<()> {
        let faces = self.faces();
        header(out, self.x.len() * self.y.len(), faces.len(), &self.name)?;

        for y in &self.y {
            for x in &self.x {
                writeln!(out, "v {:?} {:?} {:?}", x, y, self.z)?;
            }
        }
        writeln!(out, "g {}", self.name)?;
        for [a, b, c] in faces {
            writeln!(out, "f {} {} {}", a + 1, b + 1, c + 1)?;
        }

        Ok(())
    }

    pub fn write<P: AsRef<Path>>(&self, directory: P) -> Result<PathBuf> {
        let (path, mut out) = create(directory, &self.name)?;
        self.render(&mut out)?;
        out.flush()?;

        Ok(path)
    }
}

/// Extrudes a closed 2D body between `z = 1` and `z = 0` as a band of triangles.
pub fn render_extruded<W: Write>(out: &mut W, name: &str, body: &Body) -> Result<()> {
    let n = body.len();
    header(out, 2 * n, 2 * n, name)?;

    for (x, y) in body.x.iter().zip(&body.y) {
        writeln!(out, "v {:?} {:?} 1", x, y)?;
        writeln!(out, "v {:?} {:?} 0", x, y)?;
    }
    writeln!(out, "g {}", name)?;
    for i in 1..n {
        writeln!(out, "f {} {} {}", 2 * i, 2 * i - 1, 2 * i + 1)?;
        writeln!(out, "f {} {} {}", 2 * i + 1, 2 * (i + 1), 2 * i)?;
    }
    writeln!(out, "f {} {} {}", 2 * n, 2 * n - 1, 1)?;
    writeln!(out, "f {} {} {}", 1, 2, 2 * n)?;

    Ok(())
}

pub fn write_extruded<P: AsRef<Path>>(directory: P, name: &str, body: &Body) -> Result<PathBuf> {
    let (path, mut out) = create(directory, name)?;
    render_extruded(&mut out, name, body)?;
    out.flush()?;

    Ok(path)
}
