//! Surface generation from a ball-and-bone skeleton
//!
//! [`build`] turns a [`Skeleton`] into a [`Mesh`] in four passes over a
//! private clone of the graph:
//!
//! 1. **Resample**: insert inbetween balls so no two linked balls are
//!    farther apart than [`Settings::step`].
//! 2. **Sweep**: propagate minimally-twisting local frames from the root
//!    outward.
//! 3. **Stitch**: at every branch ball, build the convex hull of the
//!    limbs' cross-section rings and emit it.
//! 4. **Assemble**: wall consecutive cross-sections together and cap the
//!    open ends.
//!
//! The output is an unordered face list (mixed triangles and quads) over a
//! shared vertex buffer; consumers that need pure triangles split the quads
//! themselves, as [`Mesh::write_stl`] does.
use nalgebra::Vector3;

use crate::skeleton::Skeleton;
use crate::Error;

mod builder;
mod frame;
mod hull;
mod output;
mod resample;
mod sweep;
mod wall;

pub use frame::Frame;

use builder::SurfaceBuilder;

/// Default resampling step distance, in world units
pub const DEFAULT_STEP: f32 = 0.2;

/// Default bound on traversal depth
pub const DEFAULT_MAX_DEPTH: usize = 1024;

static_assertions::const_assert!(DEFAULT_MAX_DEPTH >= 1);

/// Balls thinner than this are treated as radius-less (interior)
pub(crate) const RADIUS_EPSILON: f32 = 1e-6;

/// Generation parameters
#[derive(Copy, Clone, Debug)]
pub struct Settings {
    /// Maximum distance between directly-linked balls after resampling
    pub step: f32,

    /// Depth bound for every traversal; exceeding it aborts generation
    /// with [`Error::DepthExceeded`]
    pub max_depth: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            step: DEFAULT_STEP,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl Settings {
    fn validate(&self) -> Result<(), Error> {
        if !(self.step.is_finite() && self.step > 0.0) {
            return Err(Error::BadSettings("step must be positive"));
        }
        if self.max_depth == 0 {
            return Err(Error::BadSettings("max depth must be at least 1"));
        }
        Ok(())
    }
}

/// A single output face
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Face {
    Triangle([usize; 3]),
    Quad([usize; 4]),
}

impl Face {
    /// The face's vertex indices, in winding order
    pub fn vertices(&self) -> &[usize] {
        match self {
            Face::Triangle(v) => v,
            Face::Quad(v) => v,
        }
    }
}

/// An indexed surface of mixed triangle and quad faces
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Mesh {
    pub vertices: Vec<Vector3<f32>>,
    pub faces: Vec<Face>,
}

impl Mesh {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Generates the surface for a skeleton
///
/// The skeleton itself is untouched; generation works on a clone, so the
/// caller may keep editing and regenerating.  Structural problems (no
/// root, out-of-range bones were already rejected at add time, excessive
/// depth) and allocation failures abort this figure's generation with an
/// error; geometric degeneracies (coincident balls, parallel directions,
/// flat hulls) are absorbed and produce degenerate local output instead.
pub fn build(skeleton: &Skeleton, settings: Settings) -> Result<Mesh, Error> {
    settings.validate()?;
    let root = skeleton.root().ok_or(Error::MissingRoot)?;
    let mut skel = skeleton.clone();
    resample::resample(&mut skel, root, &settings)?;
    sweep::sweep(&mut skel, root, &settings)?;
    let mut builder = SurfaceBuilder::new(skel.ball_count())?;
    hull::stitch(&mut skel, root, &settings, &mut builder)?;
    wall::emit_walls(&mut skel, root, &settings, &mut builder)?;
    Ok(builder.take())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::skeleton::{Ball, BallKind, Bone};
    use std::collections::HashMap;

    fn single_bone() -> Skeleton {
        let mut skel = Skeleton::new();
        let root = skel
            .add_ball(Ball::new(BallKind::Root, Vector3::zeros(), 1.0))
            .unwrap();
        let tip = skel
            .add_ball(Ball::new(
                BallKind::Key,
                Vector3::new(1.0, 0.0, 0.0),
                0.2,
            ))
            .unwrap();
        skel.add_bone(Bone { first: root, second: tip }).unwrap();
        skel
    }

    fn three_limb_star() -> Skeleton {
        let mut skel = Skeleton::new();
        let hub = skel
            .add_ball(Ball::new(BallKind::Root, Vector3::zeros(), 0.3))
            .unwrap();
        for tip in [
            Vector3::new(1.5, 0.1, 0.0),
            Vector3::new(-0.2, 1.5, 0.3),
            Vector3::new(-0.6, -1.2, 0.9),
        ] {
            let end = skel
                .add_ball(Ball::new(BallKind::Key, tip, 0.2))
                .unwrap();
            skel.add_bone(Bone { first: hub, second: end }).unwrap();
        }
        skel
    }

    /// Counts how many faces share each undirected edge
    fn edge_counts(mesh: &Mesh) -> HashMap<(usize, usize), usize> {
        let mut counts = HashMap::new();
        for face in &mesh.faces {
            let verts = face.vertices();
            for i in 0..verts.len() {
                let (a, b) = (verts[i], verts[(i + 1) % verts.len()]);
                let key = (a.min(b), a.max(b));
                *counts.entry(key).or_insert(0) += 1;
            }
        }
        counts
    }

    #[test]
    fn single_bone_tube_is_watertight() {
        let mesh = build(&single_bone(), Settings::default()).unwrap();

        // 6-ball chain: 5 wall rings, plus two caps of two rings and a
        // flat quad each
        assert_eq!(mesh.faces.len(), 5 * 4 + 2 * (2 * 4 + 1));
        assert_eq!(mesh.vertices.len(), 6 * 4 + 2 * (2 * 4));

        // a tube with both ends capped is a closed surface
        let counts = edge_counts(&mesh);
        for (edge, count) in &counts {
            assert_eq!(*count, 2, "edge {edge:?} has {count} faces");
        }

        // and satisfies Euler's formula
        let v = mesh.vertices.len() as isize;
        let e = counts.len() as isize;
        let f = mesh.faces.len() as isize;
        assert_eq!(v - e + f, 2);
    }

    #[test]
    fn branch_figure_generates_a_hull() {
        let skel = three_limb_star();
        let mesh = build(&skel, Settings::default()).unwrap();
        assert!(!mesh.vertices.is_empty());
        // three limbs of walls and caps, plus hull side faces; the hub's
        // own promotion happens on the working clone only
        assert!(mesh.faces.len() > 3 * 9);
        assert_eq!(skel.ball(0).kind, BallKind::Root);
        assert_eq!(skel.ball_count(), 4);
    }

    #[test]
    fn generation_is_deterministic() {
        let skel = three_limb_star();
        let first = build(&skel, Settings::default()).unwrap();
        let second = build(&skel, Settings::default()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn missing_root_is_an_error() {
        let mut skel = Skeleton::new();
        skel.add_ball(Ball::new(BallKind::Key, Vector3::zeros(), 1.0))
            .unwrap();
        let err = build(&skel, Settings::default()).unwrap_err();
        assert!(matches!(err, Error::MissingRoot));
    }

    #[test]
    fn settings_are_validated() {
        let skel = single_bone();
        for bad in [
            Settings {
                step: 0.0,
                ..Settings::default()
            },
            Settings {
                step: f32::NAN,
                ..Settings::default()
            },
            Settings {
                step: 0.2,
                max_depth: 0,
            },
        ] {
            let err = build(&skel, bad).unwrap_err();
            assert!(matches!(err, Error::BadSettings(_)));
        }
    }

    #[test]
    fn depth_bound_aborts_generation() {
        let skel = single_bone();
        let err = build(
            &skel,
            Settings {
                step: 0.2,
                max_depth: 2,
            },
        )
        .unwrap_err();
        assert!(matches!(err, Error::DepthExceeded(2)));
    }
}
