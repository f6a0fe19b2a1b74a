use {
    anyhow::{bail, Context, Result},
    std::{
        fs::{self, File},
        io::Read,
        path::{Path, PathBuf},
    },
};

/// Number of leading bytes inspected when deciding whether a file is binary
const SNIFF_LENGTH: u64 = 1024;

fn is_text_byte(b: u8) -> bool {
    matches!(b, 7 | 8 | 9 | 10 | 12 | 13 | 27) || (b >= 0x20 && b != 0x7f)
}

/// Returns true if any of the first 1024 bytes of the file falls outside the printable set.
pub fn is_binary<P: AsRef<Path>>(path: P) -> Result<bool> {
    let path = path.as_ref();
    let mut head = Vec::new();
    File::open(path)
        .with_context(|| format!("Failed to open {}", path.display()))?
        .take(SNIFF_LENGTH)
        .read_to_end(&mut head)?;

    Ok(head.iter().any(|&b| !is_text_byte(b)))
}

/// Name of the sub-directory holding the solution at `time_step`
pub fn time_step_name(time_step: usize) -> String {
    format!("{:0>7}", time_step)
}

pub fn time_step_directory<P: AsRef<Path>>(case: P, time_step: usize) -> PathBuf {
    case.as_ref().join(time_step_name(time_step))
}

/// Time-steps to post-process.
///
/// An explicit `[start, end, stride]` range is inclusive of `end`. Without a range, every
/// sub-directory of the case whose name starts with `0` is parsed as a time-step.
pub fn time_steps<P: AsRef<Path>>(case: P, range: Option<[usize; 3]>) -> Result<Vec<usize>> {
    if let Some([start, end, stride]) = range {
        if stride == 0 {
            bail!("Time-step stride must be positive");
        }
        return Ok((start..=end).step_by(stride).collect());
    }

    let case = case.as_ref();
    let mut steps = fs::read_dir(case)
        .with_context(|| format!("Failed to list {}", case.display()))?
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.path().is_dir())
        .filter_map(|entry| entry.file_name().into_string().ok())
        .filter(|name| name.starts_with('0'))
        .filter_map(|name| name.parse::<usize>().ok())
        .collect::<Vec<_>>();
    steps.sort_unstable();

    Ok(steps)
}

/// Parses every whitespace separated number of `text`.
pub fn parse_numbers(text: &str) -> Result<Vec<f64>> {
    text.split_whitespace()
        .map(|s| {
            s.parse::<f64>()
                .with_context(|| format!("Invalid number \"{}\"", s))
        })
        .collect()
}

/// Reads selected columns of a whitespace separated table.
///
/// Blank lines and lines starting with `#` are skipped. With `strip_parentheses`, the
/// OpenFOAM vector syntax `(a b c)` is flattened before splitting.
pub fn read_columns<P: AsRef<Path>>(
    path: P,
    usecols: &[usize],
    strip_parentheses: bool,
) -> Result<Vec<Vec<f64>>> {
    let path = path.as_ref();
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    parse_columns(&text, usecols, strip_parentheses)
        .with_context(|| format!("Failed to parse {}", path.display()))
}

pub fn parse_columns(
    text: &str,
    usecols: &[usize],
    strip_parentheses: bool,
) -> Result<Vec<Vec<f64>>> {
    let mut columns = vec![Vec::new(); usecols.len()];

    for (n, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let line = if strip_parentheses {
            line.replace(|c| c == '(' || c == ')', " ")
        } else {
            line.to_owned()
        };
        let tokens = line.split_whitespace().collect::<Vec<_>>();

        for (column, &index) in columns.iter_mut().zip(usecols) {
            let token = match tokens.get(index) {
                Some(token) => token,
                None => bail!("Line {} has no column {}", n + 1, index),
            };
            column.push(
                token
                    .parse::<f64>()
                    .with_context(|| format!("Line {}: invalid number \"{}\"", n + 1, token))?,
            );
        }
    }

    Ok(columns)
}

/// Coordinates halfway between consecutive stations
pub fn midpoints(stations: &[f64]) -> Vec<f64> {
    stations.windows(2).map(|w| 0.5 * (w[0] + w[1])).collect()
}

/// Distances between consecutive stations
pub fn widths(stations: &[f64]) -> Vec<f64> {
    stations.windows(2).map(|w| w[1] - w[0]).collect()
}

#[cfg(test)]
pub(crate) fn assert_approx_eq_slice(a: &[f64], b: &[f64]) {
    assert_eq!(a.len(), b.len());
    for (i, e) in a.iter().enumerate() {
        approx::assert_abs_diff_eq!(*e, b[i], epsilon = 1.0E-12);
    }
}

#[cfg(test)]
mod test {
    use {super::*, std::io::Write, tempdir::TempDir};

    #[test]
    fn sniff_text_and_binary() {
        let dir = TempDir::new("flowpost").unwrap();

        let text = dir.path().join("grid.txt");
        fs::write(&text, "2 2\n0.0\n0.5\n1.0\n").unwrap();
        assert!(!is_binary(&text).unwrap());

        let binary = dir.path().join("grid.bin");
        let mut f = File::create(&binary).unwrap();
        f.write_all(&2i32.to_le_bytes()).unwrap();
        f.write_all(&0.5f64.to_le_bytes()).unwrap();
        assert!(is_binary(&binary).unwrap());
    }

    #[test]
    fn explicit_range_is_inclusive() {
        assert_eq!(
            time_steps("/nonexistent", Some([100, 500, 200])).unwrap(),
            vec![100, 300, 500]
        );
        assert!(time_steps("/nonexistent", Some([0, 10, 0])).is_err());
    }

    #[test]
    fn time_steps_from_directories() {
        let dir = TempDir::new("flowpost").unwrap();
        for name in &["0000200", "0000100", "0001000", "images", "forces"] {
            fs::create_dir(dir.path().join(name)).unwrap();
        }
        File::create(dir.path().join("0000300")).unwrap();

        assert_eq!(time_steps(dir.path(), None).unwrap(), vec![100, 200, 1000]);
    }

    #[test]
    fn columns_skip_comments() {
        let text = "# time fx fy\n0.0 1.0 2.0\n\n0.1 1.5 2.5 # trailing\n";
        let columns = parse_columns(text, &[0, 2], false).unwrap();

        assert_approx_eq_slice(&columns[0], &[0.0, 0.1]);
        assert_approx_eq_slice(&columns[1], &[2.0, 2.5]);
    }

    #[test]
    fn columns_strip_parentheses() {
        let text = "0.5\t((1 2 3) (4 5 6))\n";
        let columns = parse_columns(text, &[0, 1, 2], true).unwrap();

        assert_eq!(columns, vec![vec![0.5], vec![1.0], vec![2.0]]);
    }

    #[test]
    fn missing_column_is_an_error() {
        assert!(parse_columns("1 2\n", &[0, 4], false).is_err());
    }

    #[test]
    fn staggered_helpers() {
        assert_approx_eq_slice(&midpoints(&[0.0, 1.0, 3.0]), &[0.5, 2.0]);
        assert_approx_eq_slice(&widths(&[0.0, 1.0, 3.0]), &[1.0, 2.0]);
    }
}
