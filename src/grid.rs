//! Cartesian grids as stations of the cell vertices along each direction.

use {
    crate::utils::{is_binary, midpoints, parse_numbers, widths},
    anyhow::{anyhow, bail, ensure, Context, Result},
    byteorder::{ByteOrder, LittleEndian},
    log::info,
    ndarray::Array1,
    std::{fs, path::Path},
};

#[derive(Debug, Clone, PartialEq)]
pub struct Grid {
    stations: Vec<Array1<f64>>,
}

impl Grid {
    pub fn new(stations: Vec<Array1<f64>>) -> Result<Self> {
        ensure!(
            stations.len() == 2 || stations.len() == 3,
            "Grid must be two- or three-dimensional, got {} directions",
            stations.len()
        );
        for (d, s) in stations.iter().enumerate() {
            ensure!(s.len() >= 2, "Direction {} needs at least two stations", d);
        }

        Ok(Self { stations })
    }

    /// Evenly spaced grid with `n_cells[d]` cells between the two corners.
    pub fn uniform(bottom_left: &[f64], top_right: &[f64], n_cells: &[usize]) -> Result<Self> {
        ensure!(
            bottom_left.len() == n_cells.len() && top_right.len() == n_cells.len(),
            "Corners and cell counts must have the same dimension"
        );

        Self::new(
            n_cells
                .iter()
                .enumerate()
                .map(|(d, &n)| Array1::linspace(bottom_left[d], top_right[d], n + 1))
                .collect(),
        )
    }

    /// Reads a PetIBM grid file, either binary or text.
    pub fn read_petibm<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!("Reading the grid from {}", path.display());

        let grid = if is_binary(path)? {
            Self::decode_binary(&fs::read(path)?)
        } else {
            let text = fs::read_to_string(path)?;
            let mut lines = text.lines();
            let counts = lines
                .next()
                .map(parse_numbers)
                .transpose()?
                .unwrap_or_default();
            let coords = parse_numbers(&lines.collect::<Vec<_>>().join(" "))?;

            split_stations(&counts, &coords)
        }
        .with_context(|| format!("Invalid grid file {}", path.display()))?;

        grid.log_size();
        Ok(grid)
    }

    /// Reads a cuIBM grid file, either binary or text.
    pub fn read_cuibm<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!("Reading the grid from {}", path.display());

        let grid = if is_binary(path)? {
            Self::decode_binary(&fs::read(path)?)
        } else {
            decode_interleaved(&parse_numbers(&fs::read_to_string(path)?)?)
        }
        .with_context(|| format!("Invalid grid file {}", path.display()))?;

        grid.log_size();
        Ok(grid)
    }

    /// Sequence of `i32` cell count followed by `n + 1` native `f64` stations, per direction.
    fn decode_binary(bytes: &[u8]) -> Result<Self> {
        let mut stations = vec![];
        let mut offset = 0;

        while offset < bytes.len() {
            ensure!(bytes.len() >= offset + 4, "Truncated cell count");
            let n = LittleEndian::read_i32(&bytes[offset..offset + 4]);
            ensure!(n > 0, "Invalid cell count {}", n);
            offset += 4;

            let end = offset + 8 * (n as usize + 1);
            ensure!(bytes.len() >= end, "Truncated stations");
            stations.push(
                bytes[offset..end]
                    .chunks(8)
                    .map(LittleEndian::read_f64)
                    .collect::<Array1<f64>>(),
            );
            offset = end;
        }

        Self::new(stations)
    }

    fn log_size(&self) {
        info!(
            "Grid size: {}",
            self.stations
                .iter()
                .map(|s| (s.len() - 1).to_string())
                .collect::<Vec<_>>()
                .join("x")
        );
    }

    pub fn dimensions(&self) -> usize {
        self.stations.len()
    }

    pub fn stations(&self, direction: usize) -> &Array1<f64> {
        &self.stations[direction]
    }

    pub fn x(&self) -> &Array1<f64> {
        &self.stations[0]
    }

    pub fn y(&self) -> &Array1<f64> {
        &self.stations[1]
    }

    pub fn z(&self) -> Option<&Array1<f64>> {
        self.stations.get(2)
    }

    pub fn n_cells(&self, direction: usize) -> usize {
        self.stations[direction].len() - 1
    }

    pub fn centers(&self, direction: usize) -> Array1<f64> {
        Array1::from(midpoints(self.stations[direction].as_slice().unwrap_or(&[])))
    }

    pub fn widths(&self, direction: usize) -> Array1<f64> {
        Array1::from(widths(self.stations[direction].as_slice().unwrap_or(&[])))
    }

    /// Stations strictly inside the domain (the interior faces of the cells)
    pub fn interior(&self, direction: usize) -> Array1<f64> {
        let s = &self.stations[direction];
        s.iter().skip(1).take(s.len() - 2).cloned().collect()
    }

    /// Grid-spacing along x, assuming a uniform grid
    pub fn spacing(&self) -> f64 {
        let x = self.x();
        (x[x.len() - 1] - x[0]) / (x.len() - 1) as f64
    }

    /// Bottom-left and top-right corners in the x-y plane
    pub fn bounds(&self) -> [f64; 4] {
        let (x, y) = (self.x(), self.y());
        [x[0], y[0], x[x.len() - 1], y[y.len() - 1]]
    }
}

fn split_stations(counts: &[f64], coords: &[f64]) -> Result<Grid> {
    if counts.is_empty() {
        bail!("Missing cell counts");
    }

    let mut stations = vec![];
    let mut offset = 0;
    for &n in counts {
        let n = cell_count(n)?;
        let end = offset + n + 1;
        ensure!(coords.len() >= end, "Not enough stations for {} cells", n);
        stations.push(Array1::from(coords[offset..end].to_vec()));
        offset = end;
    }
    ensure!(
        offset == coords.len(),
        "{} trailing values after the stations",
        coords.len() - offset
    );

    Grid::new(stations)
}

/// Cell count stored as a number, a positive integer
fn cell_count(value: f64) -> Result<usize> {
    ensure!(
        value.is_finite() && value >= 1.0 && value.fract() == 0.0 && value <= u32::MAX as f64,
        "Invalid cell count {}",
        value
    );
    Ok(value as usize)
}

fn decode_interleaved(values: &[f64]) -> Result<Grid> {
    let mut stations = vec![];
    let mut offset = 0;

    while offset < values.len() {
        let n = cell_count(values[offset])?;
        let end = offset
            .checked_add(n + 2)
            .filter(|&end| end <= values.len())
            .ok_or_else(|| anyhow!("Not enough stations for {} cells", n))?;
        stations.push(Array1::from(values[offset + 1..end].to_vec()));
        offset = end;
    }

    Grid::new(stations)
}

#[cfg(test)]
mod test {
    use {
        super::*, crate::utils::assert_approx_eq_slice, approx::assert_abs_diff_eq, std::io::Write,
        tempdir::TempDir,
    };

    #[test]
    fn uniform_grid() {
        let grid = Grid::uniform(&[0.0, -1.0], &[1.0, 1.0], &[4, 2]).unwrap();

        assert_eq!(grid.dimensions(), 2);
        assert_approx_eq_slice(grid.x().as_slice().unwrap(), &[0.0, 0.25, 0.5, 0.75, 1.0]);
        assert_approx_eq_slice(grid.y().as_slice().unwrap(), &[-1.0, 0.0, 1.0]);
        assert_abs_diff_eq!(grid.spacing(), 0.25);
        assert_eq!(grid.bounds(), [0.0, -1.0, 1.0, 1.0]);
        assert!(Grid::uniform(&[0.0], &[1.0, 1.0], &[4, 2]).is_err());
    }

    #[test]
    fn staggered_stations() {
        let grid = Grid::uniform(&[0.0, 0.0], &[2.0, 1.0], &[4, 2]).unwrap();

        assert_approx_eq_slice(grid.centers(0).as_slice().unwrap(), &[0.25, 0.75, 1.25, 1.75]);
        assert_approx_eq_slice(grid.interior(0).as_slice().unwrap(), &[0.5, 1.0, 1.5]);
        assert_approx_eq_slice(grid.widths(1).as_slice().unwrap(), &[0.5, 0.5]);
    }

    #[test]
    fn petibm_text() {
        let dir = TempDir::new("flowpost").unwrap();
        let path = dir.path().join("grid.txt");
        fs::write(&path, "2 1\n0.0\n0.5\n1.0\n-1.0\n1.0\n").unwrap();

        let grid = Grid::read_petibm(&path).unwrap();
        assert_eq!(grid.n_cells(0), 2);
        assert_eq!(grid.n_cells(1), 1);
        assert_approx_eq_slice(grid.y().as_slice().unwrap(), &[-1.0, 1.0]);

        fs::write(&path, "2 1\n0.0\n0.5\n1.0\n-1.0\n").unwrap();
        assert!(Grid::read_petibm(&path).is_err());
    }

    #[test]
    fn binary_grid() {
        let dir = TempDir::new("flowpost").unwrap();
        let path = dir.path().join("grid");

        let mut f = fs::File::create(&path).unwrap();
        f.write_all(&2i32.to_le_bytes()).unwrap();
        for x in &[0.0f64, 0.5, 1.0] {
            f.write_all(&x.to_le_bytes()).unwrap();
        }
        f.write_all(&1i32.to_le_bytes()).unwrap();
        for y in &[0.0f64, 2.0] {
            f.write_all(&y.to_le_bytes()).unwrap();
        }
        drop(f);

        let grid = Grid::read_cuibm(&path).unwrap();
        assert_eq!(grid, Grid::read_petibm(&path).unwrap());
        assert_approx_eq_slice(grid.x().as_slice().unwrap(), &[0.0, 0.5, 1.0]);
        assert_approx_eq_slice(grid.y().as_slice().unwrap(), &[0.0, 2.0]);
    }

    #[test]
    fn cuibm_text() {
        let dir = TempDir::new("flowpost").unwrap();
        let path = dir.path().join("grid");
        fs::write(&path, "2\n0.0\n0.5\n1.0\n2\n0.0\n1.0\n2.0\n").unwrap();

        let grid = Grid::read_cuibm(&path).unwrap();
        assert_eq!(grid.n_cells(0), 2);
        assert_approx_eq_slice(grid.y().as_slice().unwrap(), &[0.0, 1.0, 2.0]);
    }

    #[test]
    fn corrupt_cell_counts() {
        assert!(decode_interleaved(&[1.0E+300, 0.0, 1.0]).is_err());
        assert!(decode_interleaved(&[-3.0, 0.0, 1.0]).is_err());
        assert!(decode_interleaved(&[f64::NAN, 0.0, 1.0]).is_err());
        assert!(decode_interleaved(&[1.5, 0.0, 1.0]).is_err());
        assert!(decode_interleaved(&[4.0, 0.0, 1.0]).is_err());
        assert!(split_stations(&[-1.0], &[0.0]).is_err());

        let grid = decode_interleaved(&[1.0, 0.0, 1.0, 1.0, -1.0, 1.0]).unwrap();
        assert_eq!(grid.n_cells(1), 1);
    }
}
