use {
    crate::utils::read_columns,
    anyhow::{Context, Result},
    log::info,
    std::{fs, path::Path},
};

/// Time, x and y columns of the OpenFOAM force function objects.
///
/// Every time sub-directory of `postProcessing/forceCoeffs` (or `postProcessing/forces`)
/// holds a `<name>.dat` file; they are concatenated in name order. Older versions write
/// into `<case>/forces` with the components in the first columns.
pub fn read_forces(case: &Path, coefficients: bool) -> Result<Vec<Vec<f64>>> {
    let name = if coefficients { "forceCoeffs" } else { "forces" };
    let (directory, name, usecols) = {
        let directory = case.join("postProcessing").join(name);
        if directory.is_dir() {
            (directory, name, [0, 2, 3])
        } else {
            (case.join("forces"), "forces", [0, 1, 2])
        }
    };
    info!("Reading {} in {}", name, directory.display());

    let mut subdirectories = fs::read_dir(&directory)
        .with_context(|| format!("Failed to list {}", directory.display()))?
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.path().is_dir())
        .map(|entry| entry.path())
        .collect::<Vec<_>>();
    subdirectories.sort();

    let mut columns = vec![Vec::new(); usecols.len()];
    for subdirectory in subdirectories {
        let part = read_columns(subdirectory.join(format!("{}.dat", name)), &usecols, true)?;
        for (column, values) in columns.iter_mut().zip(part) {
            column.extend(values);
        }
    }

    Ok(columns)
}
