use std::path::PathBuf;
use std::time::Instant;

use anyhow::Result;
use clap::{Parser, ValueEnum};
use env_logger::Env;
use log::info;
use nalgebra::Vector3;

use marrow::mesh::{self, Settings};
use marrow::skeleton::{Ball, BallKind, Bone, Skeleton};

/// Generates a canned figure and writes it out as binary STL
#[derive(Parser)]
#[clap(author, version, about, long_about = None)]
struct Args {
    /// Figure to generate
    #[clap(short, long, value_enum, default_value_t = Figure::Tentacle)]
    figure: Figure,

    /// Resampling step distance
    #[clap(short, long, default_value_t = mesh::DEFAULT_STEP)]
    step: f32,

    /// Name of a `.stl` file to write
    #[clap(short, long)]
    out: Option<PathBuf>,
}

#[derive(ValueEnum, Clone, Copy)]
enum Figure {
    /// A single tapering limb with a gentle curve
    Tentacle,
    /// A torso with head, arms and legs
    Biped,
}

fn tentacle() -> Result<Skeleton> {
    let mut skel = Skeleton::new();
    let spine = [
        (0.0, 0.0, 0.0, 0.50),
        (0.0, 1.0, 0.2, 0.42),
        (0.3, 1.9, 0.5, 0.33),
        (0.9, 2.6, 0.7, 0.24),
        (1.7, 3.0, 0.7, 0.15),
        (2.5, 3.1, 0.5, 0.08),
    ];
    let mut prev = None;
    for (i, &(x, y, z, r)) in spine.iter().enumerate() {
        let kind = if i == 0 { BallKind::Root } else { BallKind::Key };
        let ball = skel.add_ball(Ball::new(kind, Vector3::new(x, y, z), r))?;
        if let Some(prev) = prev {
            skel.add_bone(Bone { first: prev, second: ball })?;
        }
        prev = Some(ball);
    }
    Ok(skel)
}

fn biped() -> Result<Skeleton> {
    let mut skel = Skeleton::new();
    let ball = |skel: &mut Skeleton, kind, x, y, z, r| {
        skel.add_ball(Ball::new(kind, Vector3::new(x, y, z), r))
    };
    let hip = ball(&mut skel, BallKind::Root, 0.0, 1.0, 0.0, 0.45)?;
    let chest = ball(&mut skel, BallKind::Key, 0.0, 2.0, 0.0, 0.50)?;
    let head = ball(&mut skel, BallKind::Key, 0.0, 2.9, 0.1, 0.35)?;
    let left_hand = ball(&mut skel, BallKind::Key, 1.3, 1.2, 0.1, 0.12)?;
    let right_hand = ball(&mut skel, BallKind::Key, -1.3, 1.2, 0.1, 0.12)?;
    let left_foot = ball(&mut skel, BallKind::Key, 0.4, -0.6, 0.1, 0.15)?;
    let right_foot = ball(&mut skel, BallKind::Key, -0.4, -0.6, 0.1, 0.15)?;
    for (first, second) in [
        (hip, chest),
        (chest, head),
        (chest, left_hand),
        (chest, right_hand),
        (hip, left_foot),
        (hip, right_foot),
    ] {
        skel.add_bone(Bone { first, second })?;
    }
    Ok(skel)
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .init();
    let args = Args::parse();

    let skel = match args.figure {
        Figure::Tentacle => tentacle()?,
        Figure::Biped => biped()?,
    };
    info!(
        "Built skeleton with {} balls, {} bones",
        skel.ball_count(),
        skel.bone_count()
    );

    let settings = Settings {
        step: args.step,
        ..Settings::default()
    };
    let start = Instant::now();
    let mesh = mesh::build(&skel, settings)?;
    info!(
        "Generated {} vertices, {} faces in {:?}",
        mesh.vertices.len(),
        mesh.faces.len(),
        start.elapsed()
    );

    if let Some(out) = args.out {
        info!("Writing STL to {out:?}");
        mesh.write_stl(&mut std::fs::File::create(out)?)?;
    }
    Ok(())
}
