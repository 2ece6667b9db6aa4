//! Inbetween-ball resampling
//!
//! Walks every bone of the rooted skeleton and inserts interpolated
//! [`BallKind::Inbetween`] balls so that no two directly-linked balls are
//! farther apart than the configured step distance.  Inserted balls are
//! spliced into the child lists in both directions, keeping the mirror
//! invariant intact through the chain, and receive a first-pass local frame
//! from the bone direction alone; the sweep refines it afterwards.
use nalgebra::Vector3;

use super::frame::{Frame, DIRECTION_EPSILON};
use super::Settings;
use crate::skeleton::{Ball, BallKind, Skeleton};
use crate::Error;

/// Slack added before flooring `distance / step`, so that distances which
/// are an exact multiple of the step don't lose a segment to rounding
const SEGMENT_EPSILON: f32 = 1e-4;

pub(crate) fn resample(
    skel: &mut Skeleton,
    root: usize,
    settings: &Settings,
) -> Result<(), Error> {
    let pass = skel.begin_pass();
    skel.visit(root, pass);
    let mut stack = vec![(root, 0usize)];
    while let Some((ball, depth)) = stack.pop() {
        let mut cursor = skel.first_link(ball);
        while let Some(link) = cursor {
            let (child, next) = skel.link(link);
            cursor = next;
            if !skel.visit(child, pass) {
                // the ball we arrived from
                continue;
            }
            resample_bone(skel, ball, child, link, settings, pass)?;
            if depth + 1 > settings.max_depth {
                return Err(Error::DepthExceeded(settings.max_depth));
            }
            stack.push((child, depth + 1));
        }
    }
    Ok(())
}

/// Resamples the bone from `a` to `b`; `a_link` is `a`'s child link
/// pointing at `b`
fn resample_bone(
    skel: &mut Skeleton,
    a: usize,
    b: usize,
    a_link: usize,
    settings: &Settings,
    pass: u64,
) -> Result<(), Error> {
    let (pa, ra) = (skel.ball(a).position, skel.ball(a).radius);
    let (pb, rb) = (skel.ball(b).position, skel.ball(b).radius);
    let delta = pb - pa;
    let distance = delta.norm();

    // Coincident balls have no usable direction; fall back to whatever
    // frame the near ball already carries
    let direction = if distance > DIRECTION_EPSILON {
        delta / distance
    } else {
        skel.ball(a)
            .frame
            .map(|f| f.direction)
            .unwrap_or_else(Vector3::y)
    };
    let frame = Frame::from_direction(direction);
    if skel.ball(a).frame.is_none() {
        skel.ball_mut(a).frame = Some(frame);
    }
    skel.ball_mut(b).frame = Some(frame);

    if distance <= settings.step || distance <= DIRECTION_EPSILON {
        return Ok(());
    }

    let segments = ((distance / settings.step) + SEGMENT_EPSILON) as usize;
    let fractions: Vec<f32> = if segments <= 1 {
        // the step count would be zero; split the bone at its midpoint
        vec![0.5]
    } else {
        // n segments of step + remainder/n, i.e. fractions i/n; this
        // spreads the remainder instead of leaving a short trailing piece
        (1..segments).map(|i| i as f32 / segments as f32).collect()
    };

    let mut inserted = Vec::with_capacity(fractions.len());
    for fraction in fractions {
        let ball = Ball {
            position: pa + delta * fraction,
            radius: ra + (rb - ra) * fraction,
            kind: BallKind::Inbetween,
            frame: Some(frame),
            visit_mark: pass,
            child_head: None,
        };
        inserted.push(skel.add_ball(ball)?);
    }

    // Splice the chain in: a's link to b and b's link to a are repointed at
    // the chain ends, and each inserted ball links to both neighbors
    skel.retarget_link(a_link, inserted[0]);
    if let Some(b_link) = skel.find_link_to(b, a) {
        skel.retarget_link(b_link, inserted[inserted.len() - 1]);
    }
    for (k, &slot) in inserted.iter().enumerate() {
        let prev = if k == 0 { a } else { inserted[k - 1] };
        let next = if k + 1 == inserted.len() { b } else { inserted[k + 1] };
        skel.link_child(slot, next)?;
        skel.link_child(slot, prev)?;
    }
    Ok(())
}
