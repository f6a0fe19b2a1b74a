#[cfg(test)]
mod test;

pub mod body;
pub mod field;
pub mod forces;
pub mod grid;
pub mod simulation;
pub mod solutions;

pub mod convergence;
pub mod stretching;

pub mod obj;
pub mod petsc;
pub mod vtk;

pub mod plot;
pub mod style;

pub mod job;
pub mod meshing;

pub mod parameters;
pub mod utils;
