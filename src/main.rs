use anyhow::{bail, Context};
use clap::{Parser, Subcommand, ValueEnum};
use partscan::config::InspectionConfig;
use partscan::logging::init_logging;
use partscan::pipeline::{inspect, InspectionOutcome};
use partscan_core::{PointCloud, ReferenceModel};
use partscan_inspection::Verdict;
use partscan_io::{
    read_device_stream, read_stl, read_xyz, sample_mesh_vertices, write_stl_ascii,
    write_stl_binary, write_xyz,
};
use partscan_mesh::{reconstruct, ReconstructionMethod};
use partscan_simulation::{generate_with, DefectKind, DefectSpec, GenerateOptions, Jitter};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "partscan")]
#[command(about = "Point-cloud inspection of manufactured parts")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// TOML config file; built-in defaults are used when absent
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Clone, Copy, ValueEnum)]
enum ShapeArg {
    Cylinder,
    Sphere,
}

#[derive(Subcommand)]
enum Command {
    /// Generate a synthetic part, optionally with a defect
    Simulate {
        #[arg(long, value_enum, default_value_t = ShapeArg::Cylinder)]
        shape: ShapeArg,

        /// none, side-hole, top-hole, dent, stretch, missing-cap or broken
        #[arg(short, long, default_value = "none")]
        defect: DefectKind,

        /// Override the configured point density
        #[arg(short = 'n', long)]
        density: Option<usize>,

        /// Uniform noise amplitude per coordinate (mm)
        #[arg(long)]
        jitter: Option<f64>,

        #[arg(long, default_value_t = 0)]
        seed: u64,

        #[arg(short, long)]
        output: PathBuf,
    },

    /// Align a sample to a reference and report defects
    Inspect {
        /// Reference part as .xyz or .stl
        #[arg(short, long)]
        reference: PathBuf,

        /// Scanned or simulated sample as .xyz
        #[arg(short, long)]
        sample: PathBuf,

        /// Override the configured tolerance (mm)
        #[arg(short, long)]
        tolerance: Option<f64>,

        /// Print a JSON summary instead of text
        #[arg(long)]
        json: bool,
    },

    /// Reconstruct a surface from a point cloud and write it as STL
    ExportStl {
        #[arg(short, long)]
        input: PathBuf,

        /// hull or delaunay
        #[arg(short, long, default_value = "hull")]
        method: ReconstructionMethod,

        #[arg(long)]
        ascii: bool,

        #[arg(short, long)]
        output: PathBuf,
    },

    /// Convert a recorded scanner stream to .xyz
    Capture {
        #[arg(short, long)]
        input: PathBuf,

        #[arg(short, long)]
        output: PathBuf,
    },

    /// Print the effective configuration as TOML
    ShowConfig,
}

fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => InspectionConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => InspectionConfig::default(),
    };
    let _log_guard = init_logging(&config.logging, cli.verbose)?;

    match cli.command {
        Command::Simulate {
            shape,
            defect,
            density,
            jitter,
            seed,
            output,
        } => {
            let shape = match shape {
                ShapeArg::Cylinder => config.simulation.cylinder(),
                ShapeArg::Sphere => config.simulation.sphere(),
            };
            let spec = match defect {
                DefectKind::None => None,
                kind => Some(
                    DefectSpec::preset(kind, &shape)
                        .with_context(|| format!("no {kind} preset for a {}", shape.name()))?,
                ),
            };
            let options = GenerateOptions {
                jitter: jitter.map(|amplitude| Jitter { amplitude, seed }),
                pose: None,
            };
            let density = density.unwrap_or(config.simulation.density);
            let cloud = generate_with(&shape, density, spec.as_ref(), &options)
                .context("generating synthetic part")?;
            write_xyz(&output, &cloud).with_context(|| format!("writing {}", output.display()))?;
            info!(points = cloud.len(), shape = shape.name(), %defect, "simulated part written");
        }

        Command::Inspect {
            reference,
            sample,
            tolerance,
            json,
        } => {
            if let Some(t) = tolerance {
                config.inspection.tolerance_mm = t;
            }
            let reference = load_reference(&reference, &config)?;
            let sample = read_xyz(&sample)
                .with_context(|| format!("reading sample {}", sample.display()))?;
            let outcome = inspect(&sample, &reference, &config).context("inspection failed")?;

            if json {
                println!("{}", serde_json::to_string_pretty(&outcome.summary())?);
            } else {
                print_outcome(&outcome);
            }
            return Ok(match outcome.verdict() {
                Verdict::Approved => ExitCode::SUCCESS,
                Verdict::Rejected { .. } => ExitCode::from(2),
                Verdict::Inconclusive => ExitCode::from(3),
            });
        }

        Command::ExportStl {
            input,
            method,
            ascii,
            output,
        } => {
            let cloud = read_xyz(&input).with_context(|| format!("reading {}", input.display()))?;
            let mesh = reconstruct(&cloud, method).context("surface reconstruction failed")?;
            let written = if ascii {
                let name = output
                    .file_stem()
                    .and_then(|s| s.to_str())
                    .unwrap_or("part");
                write_stl_ascii(&output, &mesh, name)
            } else {
                write_stl_binary(&output, &mesh)
            };
            written.with_context(|| format!("writing {}", output.display()))?;
            info!(
                triangles = mesh.triangle_count(),
                area_mm2 = mesh.surface_area(),
                %method,
                "mesh exported"
            );
        }

        Command::Capture { input, output } => {
            let file = File::open(&input).with_context(|| format!("opening {}", input.display()))?;
            let capture = read_device_stream(BufReader::new(file), &config.device)
                .with_context(|| format!("reading stream {}", input.display()))?;
            if !capture.terminated {
                warn!("stream ended without the end-of-capture line");
            }
            if capture.cloud.is_empty() {
                bail!("no valid readings in {}", input.display());
            }
            write_xyz(&output, &capture.cloud)
                .with_context(|| format!("writing {}", output.display()))?;
        }

        Command::ShowConfig => {
            print!("{}", config.to_toml_string()?);
        }
    }

    Ok(ExitCode::SUCCESS)
}

/// Loads a reference from `.xyz`, or samples mesh vertices from `.stl`.
fn load_reference(path: &Path, config: &InspectionConfig) -> anyhow::Result<ReferenceModel> {
    let is_stl = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("stl"));

    let cloud: PointCloud = if is_stl {
        let mesh = read_stl(path).with_context(|| format!("reading reference {}", path.display()))?;
        sample_mesh_vertices(
            &mesh,
            config.inspection.stl_sample_points,
            config.inspection.stl_sample_seed,
        )
    } else {
        read_xyz(path).with_context(|| format!("reading reference {}", path.display()))?
    };
    Ok(ReferenceModel::new(cloud))
}

fn print_outcome(outcome: &InspectionOutcome) {
    let report = &outcome.report;
    let alignment = &outcome.alignment;

    match outcome.verdict() {
        Verdict::Approved => println!("APPROVED"),
        Verdict::Rejected { class } => println!("REJECTED: {class}"),
        Verdict::Inconclusive => println!("INCONCLUSIVE"),
    }
    println!(
        "  out of tolerance: {:.2}% (tolerance {} mm)",
        100.0 * report.fraction_out_of_tolerance,
        report.tolerance
    );
    println!(
        "  sample deviation: mean {:.3} / max {:.3} / rms {:.3} mm",
        report.stats.mean, report.stats.max, report.stats.rms
    );
    println!(
        "  coverage gap:     mean {:.3} / max {:.3} mm",
        report.coverage_stats.mean, report.coverage_stats.max
    );
    println!(
        "  icp: {} iterations, error {:.4} mm, {}",
        alignment.iterations,
        alignment.final_error,
        if alignment.converged { "converged" } else { "not converged" }
    );
    for w in &alignment.warnings {
        println!("  warning: {w:?}");
    }
    for c in &report.conditions {
        println!("  condition: {c:?}");
    }
}
