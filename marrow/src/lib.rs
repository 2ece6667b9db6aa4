//! Marrow turns a sparse **ball-and-bone skeleton** into a continuous,
//! closed 3D surface of mixed triangle and quad faces.
//!
//! A skeleton is a set of joints ("balls") with positions and radii,
//! connected by undirected bones into a tree.  Generation resamples every
//! bone so cross-sections are never more than a step apart, sweeps a
//! minimally-twisting local frame along each limb, stitches branch joints
//! with incrementally-wrapped convex hulls, and walls the remaining
//! cross-sections together into the finished surface:
//!
//! ```
//! use marrow::skeleton::{Ball, BallKind, Bone, Skeleton};
//! use nalgebra::Vector3;
//!
//! let mut skel = Skeleton::new();
//! let hip = skel.add_ball(Ball::new(
//!     BallKind::Root,
//!     Vector3::new(0.0, 0.0, 0.0),
//!     0.5,
//! ))?;
//! let knee = skel.add_ball(Ball::new(
//!     BallKind::Key,
//!     Vector3::new(0.0, -1.0, 0.1),
//!     0.3,
//! ))?;
//! skel.add_bone(Bone { first: hip, second: knee })?;
//!
//! let mesh = marrow::mesh::build(&skel, marrow::mesh::Settings::default())?;
//! assert!(!mesh.faces.is_empty());
//! # Ok::<(), marrow::Error>(())
//! ```
//!
//! The resulting [`mesh::Mesh`] is a plain vertex buffer plus face list;
//! downstream consumers compute normals, render, or export it
//! ([`mesh::Mesh::write_stl`] writes binary STL directly).
//!
//! Generation is single-threaded and deterministic: identical input
//! produces an identical mesh, and every pass owns its storage
//! exclusively, so independent figures may be generated on separate
//! threads.
mod arena;
mod dict;
mod error;

pub mod mesh;
pub mod skeleton;

pub use error::Error;
