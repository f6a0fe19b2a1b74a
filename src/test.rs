use {
    crate::{
        convergence::{Analytical, Study, StudyParameters},
        field::Norm,
        grid::Grid,
        simulation::{Direction, FieldName, Software},
        solutions::MovingVortices,
    },
    lazy_static::lazy_static,
    std::{fmt::Write as _, fs, path::Path},
    tempdir::TempDir,
};

/// Cells per direction of the three grids, refined by a ratio of 3
const RESOLUTIONS: [usize; 3] = [4, 12, 36];

/// PetIBM cases holding the moving vortices at the initial time-step
struct Cases {
    directory: TempDir,
}

fn write_grid(case: &Path, grid: &Grid) {
    let mut text = format!("{} {}\n", grid.n_cells(0), grid.n_cells(1));
    for s in grid.x().iter().chain(grid.y()) {
        writeln!(text, "{}", s).unwrap();
    }
    fs::write(case.join("grid.txt"), text).unwrap();
}

lazy_static! {
    static ref VORTICES: Cases = {
        let directory = TempDir::new("flowpost").unwrap();
        for &n in &RESOLUTIONS {
            let case = directory.path().join(n.to_string());
            fs::create_dir(&case).unwrap();

            let grid = Grid::uniform(&[0.0, 0.0], &[1.0, 1.0], &[n, n]).unwrap();
            write_grid(&case, &grid);
            MovingVortices::new(&grid, 0.0)
                .write_petsc_initial_conditions(&grid, &[Direction::X], &case)
                .unwrap();
        }

        Cases { directory }
    };
}

fn params(analytical: bool) -> StudyParameters {
    StudyParameters {
        directory: VORTICES.directory.path().to_owned(),
        software: Software::PetIBM,
        cases: RESOLUTIONS.iter().map(usize::to_string).collect(),
        fields: vec![FieldName::XVelocity, FieldName::YVelocity],
        norms: vec![Norm::L2, Norm::Linf],
        periodic: vec![Direction::X],
        analytical: if analytical {
            Some(Analytical::MovingVortices { time: 0.0 })
        } else {
            None
        },
        ..StudyParameters::default()
    }
}

#[test]
fn initial_conditions_match_the_analytical_solution() {
    let study = Study::load(&params(true)).unwrap();
    let errors = study.errors().unwrap();

    assert_eq!(errors.len(), 4);
    for e in &errors {
        assert_eq!(e.spacings.len(), 3);
        assert!(e.spacings[0] > e.spacings[1] && e.spacings[1] > e.spacings[2]);
        assert!(e.values.iter().all(|&v| v < 1.0E-10), "{:?}", e);
    }
}

#[test]
fn finest_grid_as_reference() {
    let study = Study::load(&params(false)).unwrap();
    let (exact, simulations) = study.reference().unwrap();

    assert_eq!(simulations.len(), 2);
    assert_eq!(exact["x-velocity"].values.dim(), (36, 35));

    let errors = study.errors().unwrap();
    assert!(errors.iter().all(|e| e.spacings.len() == 2));
}

#[test]
fn last_three_grids() {
    let study = Study::load(&StudyParameters {
        last_three: true,
        ..params(true)
    })
    .unwrap();
    let triplets = study.triplets().unwrap();

    assert_eq!(triplets.len(), 1);
    let names = triplets[0]
        .iter()
        .map(|s| s.description.as_str())
        .collect::<Vec<_>>();
    assert_eq!(names, vec!["4", "12", "36"]);
}
