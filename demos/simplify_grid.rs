//! Simplify a generated height field with each of the meshlod simplifiers
//!
//! Run with `RUST_LOG=meshlod_simplification=debug` to see the per-pass trace.

use anyhow::{bail, Result};
use clap::{Parser, ValueEnum};
use meshlod_core::{Point3f, PointCloud, TriangleMesh};
use meshlod_simplification::{
    ClusteringSimplifier, EdgeCollapseSimplifier, MeshSimplifier, PointSimplifier,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::Instant;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Method {
    /// Quadric error edge collapse
    Precise,
    /// Precise, falling back to grid clustering when stuck
    Aggressive,
    /// Grid clustering
    Sloppy,
    /// Point cloud reduction over the grid vertices
    Points,
}

#[derive(Debug, Parser)]
#[command(about = "Simplify a generated wavy grid")]
struct Args {
    /// Vertices per grid side
    #[arg(long, default_value_t = 128)]
    size: u32,

    /// Fraction of faces (or points) to remove, 0.0 to 1.0
    #[arg(long, default_value_t = 0.9)]
    ratio: f32,

    /// Largest allowed error relative to the mesh extent
    #[arg(long, default_value_t = 1e-2)]
    error: f32,

    /// Height noise amplitude
    #[arg(long, default_value_t = 0.0)]
    noise: f32,

    #[arg(long, value_enum, default_value_t = Method::Precise)]
    method: Method,

    #[arg(long, default_value_t = 42)]
    seed: u64,
}

fn generate_grid(size: u32, noise: f32, seed: u64) -> TriangleMesh {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut mesh = TriangleMesh::new();

    for y in 0..size {
        for x in 0..size {
            let fx = x as f32 / (size - 1) as f32 * std::f32::consts::TAU;
            let fy = y as f32 / (size - 1) as f32 * std::f32::consts::TAU;
            let jitter = if noise > 0.0 { rng.gen_range(-noise..noise) } else { 0.0 };
            mesh.add_vertex(Point3f::new(x as f32, y as f32, fx.sin() * fy.cos() * 4.0 + jitter));
        }
    }

    for y in 0..size - 1 {
        for x in 0..size - 1 {
            let v = y * size + x;
            mesh.add_face([v, v + size, v + 1]);
            mesh.add_face([v + 1, v + size, v + size + 1]);
        }
    }

    mesh
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    if args.size < 2 {
        bail!("grid size must be at least 2, got {}", args.size);
    }

    let mesh = generate_grid(args.size, args.noise, args.seed);
    info!(
        "generated grid: {} vertices, {} faces",
        mesh.vertex_count(),
        mesh.face_count()
    );

    let start = Instant::now();

    match args.method {
        Method::Points => {
            let cloud = PointCloud::from_points(mesh.vertices.clone());
            let result = PointSimplifier::new().simplify(&cloud, args.ratio)?;
            println!(
                "points: {} -> {} in {:.2?}",
                cloud.len(),
                result.len(),
                start.elapsed()
            );
        }
        method => {
            let simplifier: Box<dyn MeshSimplifier> = match method {
                Method::Precise => Box::new(EdgeCollapseSimplifier::with_params(args.error, false, 50)),
                Method::Aggressive => Box::new(EdgeCollapseSimplifier::with_params(args.error, true, 50)),
                _ => Box::new(ClusteringSimplifier::new()),
            };

            let result = simplifier.simplify(&mesh, args.ratio)?;
            println!(
                "{:?}: {} -> {} faces ({} vertices referenced) in {:.2?}",
                method,
                mesh.face_count(),
                result.face_count(),
                result.referenced_vertex_count(),
                start.elapsed()
            );
        }
    }

    Ok(())
}
