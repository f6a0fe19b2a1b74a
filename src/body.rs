//! Immersed bodies described by the coordinates of their boundary points.

use {
    crate::utils::parse_numbers,
    anyhow::{ensure, Context, Result},
    log::info,
    std::{fs, path::Path},
};

/// Distance under which the first and last points are considered identical
const CLOSURE_TOLERANCE: f64 = 1.0E-06;

#[derive(Debug, Clone, PartialEq)]
pub struct Body {
    pub x: Vec<f64>,
    pub y: Vec<f64>,
}

impl Body {
    pub fn new(mut x: Vec<f64>, mut y: Vec<f64>) -> Result<Self> {
        ensure!(x.len() == y.len(), "{} x-coordinates for {} y-coordinates", x.len(), y.len());
        ensure!(!x.is_empty(), "Body without points");

        let n = x.len() - 1;
        if (x[0] - x[n]).hypot(y[0] - y[n]) > CLOSURE_TOLERANCE {
            x.push(x[0]);
            y.push(y[0]);
        }

        Ok(Self { x, y })
    }

    /// Reads a coordinates file: a header line (usually the number of points), then one
    /// `x y` pair per line. The returned loop is closed.
    pub fn read<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!("Reading the body coordinates from {}", path.display());
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;

        let (mut x, mut y) = (vec![], vec![]);
        for (n, line) in text.lines().enumerate().skip(1) {
            if line.trim().is_empty() {
                continue;
            }
            let values = parse_numbers(line)
                .with_context(|| format!("{}: invalid line {}", path.display(), n + 1))?;
            ensure!(
                values.len() >= 2,
                "{}: line {} does not hold two coordinates",
                path.display(),
                n + 1
            );
            x.push(values[0]);
            y.push(values[1]);
        }

        Self::new(x, y).with_context(|| format!("Invalid body in {}", path.display()))
    }

    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }
}

#[cfg(test)]
mod test {
    use {super::*, tempdir::TempDir};

    #[test]
    fn loop_is_closed() {
        let body = Body::new(vec![0.0, 1.0, 1.0], vec![0.0, 0.0, 1.0]).unwrap();
        assert_eq!(body.x, vec![0.0, 1.0, 1.0, 0.0]);
        assert_eq!(body.y, vec![0.0, 0.0, 1.0, 0.0]);

        let closed = Body::new(body.x.clone(), body.y.clone()).unwrap();
        assert_eq!(closed.len(), 4);
    }

    #[test]
    fn coordinates_file() {
        let dir = TempDir::new("flowpost").unwrap();
        let path = dir.path().join("square.body");
        fs::write(&path, "4\n0.0\t0.0\n1.0\t0.0\n1.0\t1.0\n0.0\t1.0\n").unwrap();

        let body = Body::read(&path).unwrap();
        assert_eq!(body.len(), 5);
        assert_eq!(body.x[4], 0.0);
        assert_eq!(body.y[2], 1.0);

        fs::write(&path, "1\n0.0\n").unwrap();
        assert!(Body::read(&path).is_err());
    }
}
