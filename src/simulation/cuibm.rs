use {
    super::FieldName,
    crate::{
        field::Field,
        grid::Grid,
        utils::{is_binary, parse_numbers, time_step_directory},
    },
    anyhow::{ensure, Context, Result},
    byteorder::{ByteOrder, LittleEndian},
    std::{fs, path::Path},
};

/// Solution vector, either binary (`i32` length then values) or text (length line then values).
fn read_solution(path: &Path) -> Result<Vec<f64>> {
    let values = if is_binary(path)? {
        let bytes = fs::read(path)?;
        ensure!(bytes.len() >= 4, "Missing vector length");
        let n = LittleEndian::read_i32(&bytes[..4]);
        ensure!(n >= 0, "Negative vector length {}", n);
        let end = 4 + 8 * n as usize;
        ensure!(bytes.len() >= end, "Vector of length {} is truncated", n);

        bytes[4..end].chunks(8).map(LittleEndian::read_f64).collect()
    } else {
        let text = fs::read_to_string(path)?;
        let mut lines = text.splitn(2, '\n');
        let n = lines
            .next()
            .unwrap_or_default()
            .trim()
            .parse::<usize>()
            .context("Missing vector length")?;
        let values = parse_numbers(lines.next().unwrap_or_default())?;
        ensure!(
            values.len() >= n,
            "Vector of length {} holds {} values",
            n,
            values.len()
        );

        values
    };

    Ok(values)
}

pub fn read_fluxes(directory: &Path, grid: &Grid, time_step: usize) -> Result<(Field, Field)> {
    let path = time_step_directory(directory, time_step).join("q");
    let q = read_solution(&path).with_context(|| format!("Invalid flux file {}", path.display()))?;

    let (nx, ny) = (grid.n_cells(0), grid.n_cells(1));
    let offset = (nx - 1) * ny;
    ensure!(
        q.len() >= offset + (ny - 1) * nx,
        "{} holds {} fluxes, a {}x{} grid needs {}",
        path.display(),
        q.len(),
        nx,
        ny,
        offset + (ny - 1) * nx
    );

    Ok((
        Field::from_vec(
            FieldName::XFlux.as_str(),
            Some(time_step),
            grid.interior(0),
            grid.centers(1),
            q[..offset].to_vec(),
        )?,
        Field::from_vec(
            FieldName::YFlux.as_str(),
            Some(time_step),
            grid.centers(0),
            grid.interior(1),
            q[offset..offset + (ny - 1) * nx].to_vec(),
        )?,
    ))
}

/// The pressure is stored ahead of the body forces in `lambda`.
pub fn read_pressure(directory: &Path, grid: &Grid, time_step: usize) -> Result<Field> {
    let path = time_step_directory(directory, time_step).join("lambda");
    let lambda = read_solution(&path).with_context(|| format!("Invalid file {}", path.display()))?;

    let n = grid.n_cells(0) * grid.n_cells(1);
    ensure!(
        lambda.len() >= n,
        "{} holds {} values, fewer than the {} cells",
        path.display(),
        lambda.len(),
        n
    );

    Field::from_vec(
        FieldName::Pressure.as_str(),
        Some(time_step),
        grid.centers(0),
        grid.centers(1),
        lambda[..n].to_vec(),
    )
}
