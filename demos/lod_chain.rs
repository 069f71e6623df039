//! Build a level-of-detail chain for a generated sphere and print per-level statistics

use anyhow::Result;
use clap::Parser;
use meshlod_core::{Point3f, TriangleMesh};
use meshlod_simplification::LodChainBuilder;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(about = "Generate LOD levels for a UV sphere")]
struct Args {
    /// Sphere segments around the equator
    #[arg(long, default_value_t = 96)]
    segments: u32,

    #[arg(long, default_value_t = 6)]
    levels: usize,

    /// Triangle ratio between consecutive levels
    #[arg(long, default_value_t = 0.5)]
    ratio: f32,

    #[arg(long, default_value_t = 1e-2)]
    error: f32,
}

/// UV sphere with a duplicated seam column, the way texture coordinates split it
fn generate_sphere(segments: u32) -> TriangleMesh {
    let rings = (segments / 2).max(2);
    let mut mesh = TriangleMesh::new();

    for r in 0..=rings {
        let phi = r as f32 / rings as f32 * std::f32::consts::PI;
        for s in 0..=segments {
            let theta = s as f32 / segments as f32 * std::f32::consts::TAU;
            // close the seam bit-exactly so the seam columns share positions
            let theta = if s == segments { 0.0 } else { theta };
            mesh.add_vertex(Point3f::new(
                phi.sin() * theta.cos(),
                phi.cos(),
                phi.sin() * theta.sin(),
            ));
        }
    }

    let row = segments + 1;
    for r in 0..rings {
        for s in 0..segments {
            let v = r * row + s;
            if r > 0 {
                mesh.add_face([v, v + 1, v + row]);
            }
            if r + 1 < rings {
                mesh.add_face([v + 1, v + row + 1, v + row]);
            }
        }
    }

    mesh
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let mesh = generate_sphere(args.segments.max(3));

    let builder = LodChainBuilder::with_params(args.levels, args.ratio, args.error);
    let chain = builder.build(&mesh)?;

    println!("LOD chain for sphere with {} faces", mesh.face_count());
    println!("=====================================");
    for (level, lod) in chain.iter().enumerate() {
        let target = builder.target_index_count(mesh.index_count(), level) / 3;
        println!(
            "level {}: {:>6} faces (target {:>6}), {:>6} vertices referenced",
            level,
            lod.face_count(),
            target,
            lod.referenced_vertex_count()
        );
    }

    Ok(())
}
