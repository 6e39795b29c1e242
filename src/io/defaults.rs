// JOB INPUT
// config file read by the driver when none is given
pub const CONFIG_FILE_NAME: &str = "job.yml";
// number of periodic lattice directions
pub const DIMENSION: usize = 3;
// integral screening threshold for AO pair products
pub const PRECISION: f64 = 1.0e-8;
// Monkhorst-Pack mesh, gamma point only
pub const KMESH: [usize; 3] = [1, 1, 1];
pub const KMESH_WITH_GAMMA: bool = true;

// J/K BUILD
// kinetic energy cutoff in Hartree used when no explicit mesh is given
pub const KE_CUTOFF: f64 = 40.0;
// memory ceiling in MB for the transform buffers of one build
pub const MAX_MEMORY: f64 = 4000.0;
