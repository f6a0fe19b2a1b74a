#[macro_use]
extern crate clap;

use {
    anyhow::{bail, ensure, Result},
    flowpost::{
        body::Body,
        convergence::{write_orders, Study},
        forces::{strouhal, summary_table, write_summary, ForceSummary, Window},
        meshing::{openfoam_steps, run_steps},
        obj::{write_extruded, Box2d},
        parameters::{section, Parameters},
        plot::{
            contour::{self, plot_contour},
            convergence::{convergence_path, plot_convergence},
            create_parent,
            forces::{plot_forces, Histories},
            gridline::{plot_gridline, Orientation, Profile},
        },
        simulation::{velocity_cell_centers, FieldName, Software},
        solutions::MovingVortices,
        style::Style,
        utils::{time_step_name, time_steps},
        vtk::{write_vtk, Data},
    },
    log::{error, info},
    rayon::prelude::*,
    simplelog::{Config as LogConfig, LevelFilter, TermLogger, TerminalMode},
    std::{
        fs::{create_dir_all, File},
        path::PathBuf,
    },
};

#[quit::main]
fn main() {
    let matches = clap_app!(flowpost =>
        (version: crate_version!())
        (about: "Post-processing and job submission for PetIBM, cuIBM, IBAMR and OpenFOAM cases.")
        (@arg PARAMETERS: -p --parameters +takes_value +required "Path to file containing post-processing parameters.")
        (@subcommand grid =>
            (about: "Writes the stretched Cartesian grid of the case (cartesianMesh.yaml).")
        )
        (@subcommand forces =>
            (about: "Time-averages and plots the force histories of the case and of other simulations.")
        )
        (@subcommand fields =>
            (about: "Plots the contours of 2D fields at every saved time-step, optionally writing VTK files.")
        )
        (@subcommand gridline =>
            (about: "Plots field values along vertical or horizontal gridlines, with validation data.")
        )
        (@subcommand convergence =>
            (about: "Grid-convergence study: errors, observed orders of convergence and asymptotic ranges.")
        )
        (@subcommand vortices =>
            (about: "Writes the moving vortices as PetIBM initial conditions.")
        )
        (@subcommand obj =>
            (about: "Writes the OBJ surfaces of refinement boxes and extruded bodies.")
        )
        (@subcommand submit =>
            (about: "Writes the batch script running the solver and submits it to the scheduler.")
        )
        (@subcommand mesh =>
            (about: "Runs the OpenFOAM meshing utilities on the case.")
        )
    )
    .get_matches();

    TermLogger::init(
        LevelFilter::Debug,
        LogConfig::default(),
        TerminalMode::Mixed,
    )
    .expect("Failed to initialize logger");

    let params = {
        // Should never panic as clap should return an error if the argument was not supplied
        let path = matches
            .value_of("PARAMETERS")
            .expect("Path to parameters file not supplied");

        let file = File::open(path).unwrap_or_else(|e| {
            error!("Failed to open {}: \"{}\"", path, e);
            quit::with_code(1);
        });

        let params = serde_yaml::from_reader::<_, Parameters>(file).unwrap_or_else(|e| {
            error!("Failed to parse parameters from {}: \"{}\"", path, e);
            quit::with_code(1);
        });

        info!(
            "Successfully loaded parameters from \"{}\": \n{:#?}",
            path, params
        );

        params
    };

    run_subcommand(matches.subcommand_name(), params).unwrap_or_else(|e| {
        error!("Error: \"{:#}\"", e);
        quit::with_code(1);
    });
}

fn run_subcommand(subcmd: Option<&str>, params: Parameters) -> Result<()> {
    let subcmd = match subcmd {
        Some(s) => s,
        None => bail!("No subcommand selected"),
    };

    info!("Starting {}", subcmd);

    match subcmd {
        "grid" => {
            let grid = section(&params.grid, "grid")?;
            ensure!(
                !grid.directions.is_empty(),
                "The grid section does not describe any direction"
            );
            grid.write(&params.simulation.directory)?;
        }
        "forces" => forces(&params)?,
        "fields" => fields(&params)?,
        "gridline" => gridline(&params)?,
        "convergence" => convergence(&params)?,
        "vortices" => {
            let mut simulation = params.simulation.simulation();
            ensure!(
                simulation.software == Software::PetIBM,
                "Initial conditions can only be written for PetIBM, not {}",
                simulation.software
            );
            let grid = simulation.read_grid()?;
            MovingVortices::new(grid, params.vortices.time).write_petsc_initial_conditions(
                grid,
                &params.simulation.periodic,
                &params.simulation.directory,
            )?;
        }
        "obj" => {
            let p = section(&params.obj, "obj")?;
            ensure!(
                !p.boxes.is_empty() || !p.bodies.is_empty(),
                "The obj section lists neither boxes nor bodies"
            );
            let directory = params.simulation.directory.join(&p.directory);
            create_dir_all(&directory)?;

            for b in &p.boxes {
                Box2d::new(b.name.as_str(), b.bottom_left, b.top_right, b.points, b.z)?
                    .write(&directory)?;
            }
            for b in &p.bodies {
                write_extruded(&directory, &b.name, &Body::read(&b.path)?)?;
            }
        }
        "submit" => {
            section(&params.job, "job")?.submit(&params.simulation.directory)?;
        }
        "mesh" => {
            let meshing = section(&params.meshing, "meshing")?;
            run_steps(&params.simulation.directory, &openfoam_steps(), meshing)?;
        }
        _ => {
            // Should be unreachable due to clap catching this error
            bail!("Unrecognized subcommand");
        }
    }

    info!("Finished {}", subcmd);

    Ok(())
}

fn images_directory(params: &Parameters) -> PathBuf {
    params
        .simulation
        .directory
        .join(&params.environment.images_directory)
}

fn forces(params: &Parameters) -> Result<()> {
    let p = section(&params.forces, "forces")?;
    let style = Style::load(params.environment.style.as_deref())?;
    let order = p.figure.order;
    let window = match (p.last_period, p.average) {
        (true, _) => Window::LastPeriod,
        (false, Some([start, end])) => Window::Limits(start, end),
        (false, None) => Window::Limits(f64::NEG_INFINITY, f64::INFINITY),
    };

    let mut simulations = vec![params.simulation.simulation()];
    simulations.extend(p.others.iter().map(|o| o.simulation()));
    let histories = simulations
        .iter()
        .map(|s| -> Result<_> {
            let (drag, lift) = s.read_forces(p.coefficients, p.scale)?;
            Ok(vec![drag, lift])
        })
        .collect::<Result<Vec<_>>>()?;

    let mut summaries = vec![];
    for (s, forces) in simulations.iter().zip(&histories) {
        let (drag, lift) = (&forces[0], &forces[1]);
        let strouhal = match &p.strouhal {
            Some(st) => {
                let deviations = lift.deviations(window, order)?;
                info!("{}: {} deviations from the mean {:?}", s.description, lift.label, deviations);
                let end_time = st.end_time.unwrap_or(f64::INFINITY);
                Some(strouhal(lift, st.length, st.velocity, st.periods, end_time, order)?.0)
            }
            None => None,
        };
        summaries.push(ForceSummary {
            description: s.description.clone(),
            coefficients: p.coefficients,
            drag: drag.mean(window, order)?,
            lift: lift.mean(window, order)?,
            strouhal,
        });
    }
    info!("Time-averaged forces:\n{}", summary_table(&summaries));

    let images = images_directory(params);
    if let Some(name) = &p.summary {
        let path = images.join(format!("{}.txt", name));
        create_parent(&path)?;
        write_summary(path, &summaries)?;
    }

    let mut all = simulations.iter().zip(&histories).map(|(s, forces)| Histories {
        description: &s.description,
        forces,
    });
    let main = match all.next() {
        Some(main) => main,
        None => bail!("No simulation to plot"),
    };
    let others = all.collect::<Vec<_>>();
    let y_label = if p.coefficients { "force coefficients" } else { "forces" };

    plot_forces(
        &images.join(format!("{}.png", p.figure.save_name)),
        &style,
        &p.figure,
        y_label,
        main,
        &others,
    )
}

fn fields(params: &Parameters) -> Result<()> {
    let p = section(&params.fields, "fields")?;
    let case = &params.simulation;
    ensure!(!p.names.is_empty(), "The fields section does not name any field");
    ensure!(p.stride > 0, "The VTK stride must be positive");

    let style = Style::load(params.environment.style.as_deref())?;
    let bodies = case
        .bodies
        .iter()
        .map(Body::read)
        .collect::<Result<Vec<_>>>()?;
    let images = images_directory(params);
    let view = [
        p.figure.view[0].unwrap_or(f64::NEG_INFINITY),
        p.figure.view[1].unwrap_or(f64::NEG_INFINITY),
        p.figure.view[2].unwrap_or(f64::INFINITY),
        p.figure.view[3].unwrap_or(f64::INFINITY),
    ];
    let velocity = p.names.contains(&FieldName::XVelocity) && p.names.contains(&FieldName::YVelocity);

    let steps = time_steps(&case.directory, case.time_steps)?;
    info!("{} time-step(s) to post-process", steps.len());

    steps
        .par_iter()
        .map(|&time_step| -> Result<()> {
            let mut simulation = case.simulation();
            simulation.read_fields(&p.names, time_step, &case.periodic)?;

            let mut labels = p.names.iter().map(|n| n.as_str().to_owned()).collect::<Vec<_>>();
            if let Some(other) = &p.subtract {
                let mut other = other.simulation();
                other.read_fields(&p.names, time_step, &case.periodic)?;
                for label in &mut labels {
                    simulation.subtract(&other, label.as_str(), None)?;
                    *label = format!("{}-subtracted", label);
                }
            }

            for label in &labels {
                let field = simulation.field(label)?;
                if p.contours {
                    plot_contour(&images, &style, field, &p.figure.labelled(label, labels.len()), &bodies)?;
                }
                if p.vtk {
                    write_vtk(Data::Scalar(field), &case.directory, time_step, label, view, p.stride)?;
                }
            }
            if p.vtk && velocity && p.subtract.is_none() {
                let (u, v) = velocity_cell_centers(
                    simulation.field(FieldName::XVelocity.as_str())?,
                    simulation.field(FieldName::YVelocity.as_str())?,
                )?;
                write_vtk(Data::Vector(&u, &v), &case.directory, time_step, "velocity", view, p.stride)?;
            }

            Ok(())
        })
        .collect::<Result<Vec<()>>>()?;

    Ok(())
}

fn gridline(params: &Parameters) -> Result<()> {
    let p = section(&params.gridline, "gridline")?;
    ensure!(!p.positions.is_empty(), "The gridline section does not give any position");
    let style = Style::load(params.environment.style.as_deref())?;
    let axis = match p.orientation {
        Orientation::Vertical => "x",
        Orientation::Horizontal => "y",
    };

    let mut simulations = vec![params.simulation.simulation()];
    simulations.extend(p.others.iter().map(|o| o.simulation()));

    let mut profiles = vec![];
    for simulation in &mut simulations {
        simulation.read_fields(&[p.field], p.time_step, &params.simulation.periodic)?;
        let field = simulation.field(p.field.as_str())?;
        for &position in &p.positions {
            let label = if p.positions.len() > 1 {
                format!("{} ({}={})", simulation.description, axis, position)
            } else {
                simulation.description.clone()
            };
            profiles.push(Profile::extract(label, field, p.orientation, position, p.boundaries)?);
        }
    }
    let validation = match &p.validation {
        Some(v) => Some(Profile::read(v.label.as_str(), &v.path)?),
        None => None,
    };

    let path = images_directory(params).join(format!(
        "{}{}.png",
        p.figure.save_name,
        time_step_name(p.time_step)
    ));
    plot_gridline(
        &path,
        &style,
        &p.figure,
        p.orientation,
        p.field.as_str(),
        &profiles,
        validation.as_ref(),
    )
}

fn convergence(params: &Parameters) -> Result<()> {
    let p = section(&params.convergence, "convergence")?;
    let style = Style::load(params.environment.style.as_deref())?;
    let study = Study::load(p)?;
    let save_name = p.save_name.as_deref().unwrap_or("convergence");
    let images = p.directory.join(&params.environment.images_directory);

    for triplet in study.triplets()? {
        let orders = study.observed_orders(triplet)?;
        write_orders(&p.directory, save_name, triplet, p.time_step, &orders)?;

        if p.asymptotic_ranges {
            let [coarse, medium, fine] = triplet;
            for field in study.asymptotic_ranges(triplet, &orders)? {
                let figure = contour::Figure {
                    range: Some([0.0, 2.0, 101.0]),
                    save_name: Some(format!(
                        "{}_{}_{}_{}_",
                        field.label, coarse.description, medium.description, fine.description
                    )),
                    ..contour::Figure::default()
                };
                plot_contour(&images, &style, &field, &figure, &[])?;
            }
        }
    }

    let errors = study.errors()?;
    plot_convergence(&convergence_path(&images, save_name, p.time_step), &style, &errors)
}

#[cfg(test)]
mod test {
    use {
        super::*,
        flowpost::{job::JobConfig, parameters::SimulationParameters},
        std::fs,
        tempdir::TempDir,
    };

    fn case(dir: &TempDir) -> Parameters {
        Parameters {
            simulation: SimulationParameters {
                directory: dir.path().to_owned(),
                ..SimulationParameters::default()
            },
            ..Parameters::default()
        }
    }

    #[test]
    fn missing_sections_are_reported() {
        let dir = TempDir::new("flowpost").unwrap();

        for (subcmd, name) in &[
            ("submit", "job"),
            ("mesh", "meshing"),
            ("fields", "fields"),
            ("forces", "forces"),
            ("gridline", "gridline"),
            ("convergence", "convergence"),
            ("grid", "grid"),
            ("obj", "obj"),
        ] {
            let error = run_subcommand(Some(*subcmd), case(&dir)).unwrap_err();
            assert_eq!(
                error.to_string(),
                format!("The {} section is missing from the parameters file", name)
            );
        }
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn configured_job_is_written() {
        let dir = TempDir::new("flowpost").unwrap();
        let params = Parameters {
            job: Some(JobConfig {
                dry_run: true,
                ..JobConfig::default()
            }),
            ..case(&dir)
        };

        run_subcommand(Some("submit"), params).unwrap();
        assert!(dir.path().join("flowpost.slurm").is_file());
    }
}
