use {
    super::{Direction, FieldName},
    crate::{field::Field, grid::Grid, petsc::read_vec, utils::time_step_directory},
    anyhow::{ensure, Result},
    ndarray::{s, Array2},
    std::path::Path,
};

/// `grid.dat`, or `grid.txt` when the former is absent
pub fn read_grid(directory: &Path) -> Result<Grid> {
    let path = directory.join("grid.dat");
    if path.exists() {
        Grid::read_petibm(path)
    } else {
        Grid::read_petibm(directory.join("grid.txt"))
    }
}

/// Reshapes a flux vector into `(rows, columns)`, dropping the duplicated periodic face.
fn reshape_flux(
    values: Vec<f64>,
    rows: usize,
    columns: usize,
    periodic_rows: bool,
    periodic_columns: bool,
) -> Result<Array2<f64>> {
    let shape = (rows + periodic_rows as usize, columns + periodic_columns as usize);
    ensure!(
        values.len() == shape.0 * shape.1,
        "Flux vector holds {} values, expected {}x{}",
        values.len(),
        shape.0,
        shape.1
    );
    let values = Array2::from_shape_vec(shape, values)?;

    Ok(values.slice(s![..rows, ..columns]).to_owned())
}

pub fn read_fluxes(
    directory: &Path,
    grid: &Grid,
    time_step: usize,
    periodic: &[Direction],
) -> Result<(Field, Field)> {
    let directory = time_step_directory(directory, time_step);
    let (nx, ny) = (grid.n_cells(0), grid.n_cells(1));
    let (px, py) = (periodic.contains(&Direction::X), periodic.contains(&Direction::Y));

    let qx = reshape_flux(read_vec(directory.join("qx.dat"))?, ny, nx - 1, false, px)?;
    let qy = reshape_flux(read_vec(directory.join("qy.dat"))?, ny - 1, nx, py, false)?;

    Ok((
        Field::new(
            FieldName::XFlux.as_str(),
            Some(time_step),
            grid.interior(0),
            grid.centers(1),
            qx,
        )?,
        Field::new(
            FieldName::YFlux.as_str(),
            Some(time_step),
            grid.centers(0),
            grid.interior(1),
            qy,
        )?,
    ))
}

pub fn read_pressure(directory: &Path, grid: &Grid, time_step: usize) -> Result<Field> {
    let path = time_step_directory(directory, time_step).join("phi.dat");

    Field::from_vec(
        FieldName::Pressure.as_str(),
        Some(time_step),
        grid.centers(0),
        grid.centers(1),
        read_vec(path)?,
    )
}
