//! Frame sweep propagation
//!
//! Refines the first-pass frames assigned during resampling so that
//! cross-sections twist minimally along a limb.  Walking depth-first from
//! the root, a ball with exactly one child rotates its parent's direction
//! halfway toward the naive child direction, which spreads a bend's twist
//! over both of its joints instead of concentrating it at one.
use nalgebra::Unit;

use super::frame::{rotate_about, Frame, DIRECTION_EPSILON, PARALLEL_EPSILON};
use super::Settings;
use crate::skeleton::Skeleton;
use crate::Error;

pub(crate) fn sweep(
    skel: &mut Skeleton,
    root: usize,
    settings: &Settings,
) -> Result<(), Error> {
    let pass = skel.begin_pass();
    skel.visit(root, pass);
    let mut stack = vec![(None::<usize>, root, 0usize)];
    while let Some((parent, ball, depth)) = stack.pop() {
        let children: Vec<usize> = skel
            .children(ball)
            .filter(|&c| skel.ball(c).visit_mark != pass)
            .collect();

        if let Some(parent) = parent {
            if let Some(inherited) = skel.ball(parent).frame {
                let frame = match children.as_slice() {
                    [child] => {
                        swept_frame(skel, ball, *child, &inherited)
                    }
                    // tips take the parent frame wholesale; so do branch
                    // balls, which sweep into each limb independently
                    _ => inherited,
                };
                skel.ball_mut(ball).frame = Some(frame);
            }
        }

        for child in children {
            skel.visit(child, pass);
            if depth + 1 > settings.max_depth {
                return Err(Error::DepthExceeded(settings.max_depth));
            }
            stack.push((Some(ball), child, depth + 1));
        }
    }
    Ok(())
}

/// Frame for a single-child ball: the inherited direction rotated by half
/// the bend angle toward the naive child direction
fn swept_frame(
    skel: &Skeleton,
    ball: usize,
    child: usize,
    inherited: &Frame,
) -> Frame {
    let naive = skel.ball(child).position - skel.ball(ball).position;
    if naive.norm() <= DIRECTION_EPSILON {
        return *inherited;
    }
    let naive = naive.normalize();
    let axis = inherited.direction.cross(&naive);
    if axis.norm() <= PARALLEL_EPSILON {
        // straight (or exactly reversed) continuation: nothing to rotate
        return *inherited;
    }
    let angle = inherited.direction.angle(&naive) * 0.5;
    let direction =
        rotate_about(inherited.direction, Unit::new_normalize(axis), angle);
    Frame::from_direction(direction)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::mesh::resample::resample;
    use crate::skeleton::{Ball, BallKind, Bone};
    use approx::assert_relative_eq;
    use nalgebra::Vector3;

    fn build_chain(points: &[(f32, f32, f32)]) -> Skeleton {
        let mut skel = Skeleton::new();
        let mut prev = None;
        for (i, &(x, y, z)) in points.iter().enumerate() {
            let kind = if i == 0 { BallKind::Root } else { BallKind::Key };
            let slot = skel
                .add_ball(Ball::new(kind, Vector3::new(x, y, z), 0.2))
                .unwrap();
            if let Some(prev) = prev {
                skel.add_bone(Bone { first: prev, second: slot }).unwrap();
            }
            prev = Some(slot);
        }
        skel
    }

    fn run(skel: &mut Skeleton, step: f32) {
        let settings = Settings {
            step,
            ..Settings::default()
        };
        resample(skel, 0, &settings).unwrap();
        sweep(skel, 0, &settings).unwrap();
    }

    #[test]
    fn straight_chain_keeps_its_direction() {
        let mut skel = build_chain(&[(0.0, 0.0, 0.0), (1.0, 0.0, 0.0)]);
        run(&mut skel, 0.2);
        for slot in 0..skel.ball_count() {
            let frame = skel.ball(slot).frame.unwrap();
            assert_relative_eq!(
                frame.direction.dot(&Vector3::x()),
                1.0,
                epsilon = 1e-4
            );
        }
    }

    #[test]
    fn elbow_bends_half_the_angle() {
        // A right-angle elbow; the corner ball's direction should split
        // the difference at 45 degrees
        let mut skel = build_chain(&[
            (0.0, 0.0, 0.0),
            (1.0, 0.0, 0.0),
            (1.0, 1.0, 0.0),
        ]);
        // a large step keeps the chain free of inbetweens
        run(&mut skel, 10.0);

        let corner = skel.ball(1).frame.unwrap();
        let expected = Vector3::new(1.0, 1.0, 0.0).normalize();
        assert_relative_eq!(
            corner.direction.dot(&expected),
            1.0,
            epsilon = 1e-4
        );

        // the tip inherits the corner frame wholesale
        let tip = skel.ball(2).frame.unwrap();
        assert_relative_eq!(
            tip.direction.dot(&corner.direction),
            1.0,
            epsilon = 1e-5
        );
    }

    #[test]
    fn swept_frames_stay_orthonormal() {
        let mut skel = build_chain(&[
            (0.0, 0.0, 0.0),
            (0.7, 0.1, 0.0),
            (1.2, 0.6, 0.2),
            (1.2, 1.4, 0.5),
        ]);
        run(&mut skel, 0.2);
        for slot in 0..skel.ball_count() {
            let f = skel.ball(slot).frame.unwrap();
            assert_relative_eq!(f.direction.norm(), 1.0, epsilon = 1e-4);
            assert_relative_eq!(f.local_y.norm(), 1.0, epsilon = 1e-4);
            assert_relative_eq!(f.local_z.norm(), 1.0, epsilon = 1e-4);
            assert_relative_eq!(
                f.direction.dot(&f.local_y),
                0.0,
                epsilon = 1e-4
            );
            assert_relative_eq!(
                f.direction.dot(&f.local_z),
                0.0,
                epsilon = 1e-4
            );
            assert_relative_eq!(
                f.local_y.dot(&f.local_z),
                0.0,
                epsilon = 1e-4
            );
        }
    }

    #[test]
    fn branch_ball_inherits_parent_frame() {
        let mut skel = Skeleton::new();
        let root = skel
            .add_ball(Ball::new(BallKind::Root, Vector3::zeros(), 0.2))
            .unwrap();
        let branch = skel
            .add_ball(Ball::new(
                BallKind::Key,
                Vector3::new(1.0, 0.0, 0.0),
                0.2,
            ))
            .unwrap();
        let up = skel
            .add_ball(Ball::new(
                BallKind::Key,
                Vector3::new(1.5, 1.0, 0.0),
                0.2,
            ))
            .unwrap();
        let down = skel
            .add_ball(Ball::new(
                BallKind::Key,
                Vector3::new(1.5, -1.0, 0.0),
                0.2,
            ))
            .unwrap();
        skel.add_bone(Bone { first: root, second: branch }).unwrap();
        skel.add_bone(Bone { first: branch, second: up }).unwrap();
        skel.add_bone(Bone { first: branch, second: down }).unwrap();
        run(&mut skel, 10.0);

        // two children: no half-angle rotation, the parent frame carries
        let root_frame = skel.ball(root).frame.unwrap();
        let branch_frame = skel.ball(branch).frame.unwrap();
        assert_relative_eq!(
            branch_frame.direction.dot(&root_frame.direction),
            1.0,
            epsilon = 1e-5
        );
    }
}
