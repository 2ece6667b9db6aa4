//! Side walls and end caps
//!
//! The final assembly pass.  It runs after stitching, so every ball interior
//! to a joint has already lost its radius: a wall is emitted between each
//! remaining parent/child pair of cross-sections, and the figure's open ends
//! (tips, and a root with a single limb) are closed with shrinking caps.
//! Wall rings reference the same `(section, corner)` vertices as the hull
//! rings, so tubes and joints weld along their shared cross-sections.
use nalgebra::Vector3;

use super::builder::SurfaceBuilder;
use super::frame::Frame;
use super::{Settings, RADIUS_EPSILON};
use crate::skeleton::Skeleton;
use crate::Error;

pub(crate) fn emit_walls(
    skel: &mut Skeleton,
    root: usize,
    settings: &Settings,
    builder: &mut SurfaceBuilder,
) -> Result<(), Error> {
    let pass = skel.begin_pass();
    skel.visit(root, pass);
    let mut stack = vec![(None::<usize>, false, root, 0usize)];
    while let Some((parent, parent_is_site, ball, depth)) = stack.pop() {
        let children: Vec<usize> = skel
            .children(ball)
            .filter(|&c| skel.ball(c).visit_mark != pass)
            .collect();
        for &child in &children {
            skel.visit(child, pass);
        }
        let is_site = children.len() >= 2;

        if let Some(parent) = parent {
            // stitch sites are covered by their hulls; walls only run
            // along plain tube segments
            if !parent_is_site && !is_site {
                wall_between(skel, parent, ball, builder)?;
            }
        }

        match (parent, children.len()) {
            // a tip closes forward
            (Some(_), 0) => cap(skel, ball, false, builder)?,
            // a single-limb root is the figure's other end and closes
            // backward; an isolated ball emits nothing
            (None, 1) => cap(skel, ball, true, builder)?,
            _ => {}
        }

        for child in children {
            if depth + 1 > settings.max_depth {
                return Err(Error::DepthExceeded(settings.max_depth));
            }
            stack.push((Some(ball), is_site, child, depth + 1));
        }
    }
    Ok(())
}

/// Emits the four wall quads between two adjacent cross-sections
fn wall_between(
    skel: &Skeleton,
    parent: usize,
    ball: usize,
    builder: &mut SurfaceBuilder,
) -> Result<(), Error> {
    let near = skel.ball(parent);
    let far = skel.ball(ball);
    if near.radius <= RADIUS_EPSILON || far.radius <= RADIUS_EPSILON {
        return Ok(());
    }
    let (Some(near_frame), Some(far_frame)) = (near.frame, far.frame) else {
        return Ok(());
    };
    let near_quad = near_frame.cross_section(near.position, near.radius);
    let far_quad = far_frame.cross_section(far.position, far.radius);
    let mut near_ids = [0usize; 4];
    let mut far_ids = [0usize; 4];
    for i in 0..4 {
        near_ids[i] = builder.vertex(parent, i as u8, near_quad[i])?;
        far_ids[i] = builder.vertex(ball, i as u8, far_quad[i])?;
    }
    ring_walls(
        builder,
        &near_quad,
        &near_ids,
        &far_quad,
        &far_ids,
        near.position,
    );
    Ok(())
}

/// Walls corner `i` of one ring to corner `i` of the next
///
/// A quad whose normal points at the near cross-section's center is
/// reversed, so the finished tube faces outward.
fn ring_walls(
    builder: &mut SurfaceBuilder,
    near_quad: &[Vector3<f32>; 4],
    near_ids: &[usize; 4],
    far_quad: &[Vector3<f32>; 4],
    far_ids: &[usize; 4],
    center: Vector3<f32>,
) {
    for i in 0..4 {
        let j = (i + 1) % 4;
        let corners =
            [near_quad[i], far_quad[i], far_quad[j], near_quad[j]];
        let mut ids = [near_ids[i], far_ids[i], far_ids[j], near_ids[j]];
        let normal =
            (corners[1] - corners[0]).cross(&(corners[2] - corners[0]));
        if normal.dot(&(corners[0] - center)) < 0.0 {
            ids.reverse();
        }
        builder.push_quad(ids);
    }
}

/// Closes an open tube end with shrinking rings and a flat quad
///
/// Fake cross-sections step along the bone direction (backward for the
/// root end), halving their radius, until the travel reaches the ball's
/// own radius; each ring is walled to the previous one and the last is
/// closed flat.
fn cap(
    skel: &Skeleton,
    slot: usize,
    backward: bool,
    builder: &mut SurfaceBuilder,
) -> Result<(), Error> {
    let ball = skel.ball(slot);
    if ball.radius <= RADIUS_EPSILON {
        return Ok(());
    }
    let Some(frame) = ball.frame else {
        return Ok(());
    };
    let direction = if backward {
        -frame.direction
    } else {
        frame.direction
    };
    let ring_frame = Frame {
        direction,
        local_y: frame.local_y,
        local_z: frame.local_z,
    };

    let mut near_center = ball.position;
    let mut near_quad = frame.cross_section(ball.position, ball.radius);
    let mut near_ids = [0usize; 4];
    for i in 0..4 {
        near_ids[i] = builder.vertex(slot, i as u8, near_quad[i])?;
    }

    let mut traveled = 0.0;
    let mut radius = ball.radius;
    while traveled < ball.radius {
        traveled = (traveled + ball.radius * 0.5).min(ball.radius);
        radius *= 0.5;
        let center = ball.position + direction * traveled;
        let quad = ring_frame.cross_section(center, radius);
        let section = builder.fresh_section();
        let mut ids = [0usize; 4];
        for i in 0..4 {
            ids[i] = builder.vertex(section, i as u8, quad[i])?;
        }
        ring_walls(builder, &near_quad, &near_ids, &quad, &ids, near_center);
        near_center = center;
        near_quad = quad;
        near_ids = ids;
    }

    // flat closing quad over the last ring, facing along the cap
    let normal =
        (near_quad[1] - near_quad[0]).cross(&(near_quad[2] - near_quad[0]));
    let mut ids = near_ids;
    if normal.dot(&direction) < 0.0 {
        ids.reverse();
    }
    builder.push_quad(ids);
    Ok(())
}
