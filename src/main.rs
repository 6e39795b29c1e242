use anyhow::{Context, Result};
use clap::Parser;
use log::info;

use rust_pbc::io::defaults;
use rust_pbc::utils::Timer;
use rust_pbc::{inverse_overlap_guess, read_job_config, AftJk, Hermi};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Job description in YAML.
    #[arg(short, long, default_value = defaults::CONFIG_FILE_NAME)]
    config: String,
    /// Print debug messages of the J/K builders.
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
    let timer = Timer::start();

    let job = read_job_config(&args.config)
        .with_context(|| format!("failed to read job file {}", args.config))?;
    let cell = job.cell.build().context("invalid cell")?;
    let kpts = job.kpts(&cell);
    info!(
        "cell: {} atoms, {} AOs, dimension {}, {} k-points",
        cell.atoms.len(),
        cell.nao(),
        cell.dimension,
        kpts.len()
    );

    let jk = AftJk::new(&cell, &job.jk)?;
    let ovlp = jk.provider().overlap(&kpts);
    let dm = inverse_overlap_guess(&ovlp, job.nelectron).context("density guess")?;

    let (vj, vk) = jk.get_jk_kpts(
        &dm,
        Hermi::Hermitian,
        &kpts,
        None,
        job.with_j,
        job.with_k,
        job.jk.exxdiv.as_deref(),
    )?;

    // per-cell energies average over the k-point mesh
    let nk = kpts.len() as f64;
    println!("AFT J/K build");
    println!("----------------------------------------");
    if let Some(vj) = vj {
        let ej = vj.trace_with(&dm)?;
        println!("Coulomb energy:  {:>18.12} Ha", 0.5 * ej.re / nk);
        println!("J hermiticity:   {:>18.3e}", vj.hermiticity_error());
    }
    if let Some(vk) = vk {
        let ek = vk.trace_with(&dm)?;
        println!("Exchange energy: {:>18.12} Ha", -0.25 * ek.re / nk);
        println!("K hermiticity:   {:>18.3e}", vk.hermiticity_error());
    }
    info!("{:>40} {}", "total:", timer);
    Ok(())
}
