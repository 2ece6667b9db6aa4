//! Ball-and-bone skeleton graph
//!
//! A skeleton is a set of [`Ball`]s (spheres approximating limb thickness)
//! connected by undirected [`Bone`]s.  Adding a bone links its two balls as
//! children of each other, so the graph is stored as a symmetric adjacency
//! structure; rooted parent→child semantics fall out of traversal order,
//! using per-ball visit marks to avoid walking back up.
//!
//! Balls, bones and child links all live in [`Arena`] pools and reference
//! each other by slot, so the graph tolerates growth while traversals hold
//! link cursors.
use nalgebra::Vector3;

use crate::arena::Arena;
use crate::mesh::Frame;
use crate::Error;

/// Role of a ball within its figure
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum BallKind {
    /// The figure's designated root; exactly one per input skeleton.
    ///
    /// During generation, branch balls are promoted to this kind when they
    /// become stitch sites.
    Root,
    /// A user-authored joint
    #[default]
    Key,
    /// A ball inserted by resampling
    Inbetween,
}

/// A sphere node in the skeleton graph
#[derive(Copy, Clone, Debug, Default)]
pub struct Ball {
    pub position: Vector3<f32>,
    pub radius: f32,
    pub kind: BallKind,
    /// Local coordinate frame, populated during generation
    pub frame: Option<Frame>,
    /// Traversal generation mark; a ball is visited when this equals the
    /// current pass counter
    pub(crate) visit_mark: u64,
    /// Head of this ball's child link list
    pub(crate) child_head: Option<usize>,
}

impl Ball {
    pub fn new(kind: BallKind, position: Vector3<f32>, radius: f32) -> Self {
        Self {
            position,
            radius,
            kind,
            ..Self::default()
        }
    }
}

/// An undirected edge between two balls
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct Bone {
    pub first: usize,
    pub second: usize,
}

/// Cons cell in a ball's child list
#[derive(Copy, Clone, Debug, Default)]
struct ChildLink {
    ball: usize,
    next: Option<usize>,
}

/// The skeleton graph: balls, bones, and their child links
#[derive(Clone, Debug, Default)]
pub struct Skeleton {
    balls: Arena<Ball>,
    bones: Arena<Bone>,
    links: Arena<ChildLink>,
    root: Option<usize>,
    generation: u64,
}

impl Skeleton {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a ball, returning its slot
    ///
    /// The first [`BallKind::Root`] ball is recorded as the figure's root;
    /// a second one is an error.
    pub fn add_ball(&mut self, ball: Ball) -> Result<usize, Error> {
        if ball.kind == BallKind::Root {
            if let Some(root) = self.root {
                return Err(Error::MultipleRoots(root));
            }
        }
        let slot = self.balls.push(ball)?;
        if ball.kind == BallKind::Root {
            self.root = Some(slot);
        }
        Ok(slot)
    }

    /// Adds a bone, linking its two balls as children of each other
    pub fn add_bone(&mut self, bone: Bone) -> Result<usize, Error> {
        for slot in [bone.first, bone.second] {
            if slot >= self.balls.len() {
                return Err(Error::BadBallSlot(slot));
            }
        }
        if bone.first == bone.second {
            return Err(Error::SelfBone(bone.first));
        }
        let slot = self.bones.push(bone)?;
        self.link_child(bone.first, bone.second)?;
        self.link_child(bone.second, bone.first)?;
        Ok(slot)
    }

    /// Prepends `child` to `parent`'s child list
    pub(crate) fn link_child(
        &mut self,
        parent: usize,
        child: usize,
    ) -> Result<(), Error> {
        let link = self.links.push(ChildLink {
            ball: child,
            next: self.balls[parent].child_head,
        })?;
        self.balls[parent].child_head = Some(link);
        Ok(())
    }

    pub fn ball(&self, slot: usize) -> &Ball {
        &self.balls[slot]
    }

    pub(crate) fn ball_mut(&mut self, slot: usize) -> &mut Ball {
        &mut self.balls[slot]
    }

    pub fn ball_count(&self) -> usize {
        self.balls.len()
    }

    pub fn bone_count(&self) -> usize {
        self.bones.len()
    }

    pub fn bones(&self) -> impl Iterator<Item = &Bone> {
        self.bones.iter()
    }

    /// The designated root ball's slot, if one was added
    pub fn root(&self) -> Option<usize> {
        self.root
    }

    /// Iterates over a ball's children (adjacent balls)
    ///
    /// The iterator is restartable: any number of fresh iterators may be
    /// obtained at any time without disturbing each other.
    pub fn children(&self, ball: usize) -> Children<'_> {
        Children {
            skeleton: self,
            cursor: self.balls[ball].child_head,
        }
    }

    /// First link slot of a ball's child list, for cursor-style walks
    pub(crate) fn first_link(&self, ball: usize) -> Option<usize> {
        self.balls[ball].child_head
    }

    /// Reads a link: the child ball it points at, and the next link slot
    pub(crate) fn link(&self, slot: usize) -> (usize, Option<usize>) {
        let link = &self.links[slot];
        (link.ball, link.next)
    }

    /// Repoints an existing link at a different ball
    ///
    /// Used by the resampler to splice inbetween chains into place without
    /// reordering sibling lists.
    pub(crate) fn retarget_link(&mut self, slot: usize, ball: usize) {
        self.links[slot].ball = ball;
    }

    /// Finds the link in `from`'s child list that points at `to`
    pub(crate) fn find_link_to(&self, from: usize, to: usize) -> Option<usize> {
        let mut cursor = self.first_link(from);
        while let Some(slot) = cursor {
            let (ball, next) = self.link(slot);
            if ball == to {
                return Some(slot);
            }
            cursor = next;
        }
        None
    }

    /// Starts a new traversal pass, returning its generation counter
    pub(crate) fn begin_pass(&mut self) -> u64 {
        self.generation += 1;
        self.generation
    }

    /// Marks a ball as visited in `pass`; returns false if it already was
    pub(crate) fn visit(&mut self, ball: usize, pass: u64) -> bool {
        let mark = &mut self.balls[ball].visit_mark;
        if *mark == pass {
            false
        } else {
            *mark = pass;
            true
        }
    }
}

/// Lazy iterator over a ball's child slots
pub struct Children<'a> {
    skeleton: &'a Skeleton,
    cursor: Option<usize>,
}

impl Iterator for Children<'_> {
    type Item = usize;
    fn next(&mut self) -> Option<usize> {
        let slot = self.cursor?;
        let (ball, next) = self.skeleton.link(slot);
        self.cursor = next;
        Some(ball)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn ball_at(x: f32) -> Ball {
        Ball::new(BallKind::Key, Vector3::new(x, 0.0, 0.0), 0.5)
    }

    #[test]
    fn root_is_recorded_once() {
        let mut skel = Skeleton::new();
        assert_eq!(skel.root(), None);
        let a = skel
            .add_ball(Ball::new(BallKind::Root, Vector3::zeros(), 1.0))
            .unwrap();
        assert_eq!(skel.root(), Some(a));

        let err = skel
            .add_ball(Ball::new(BallKind::Root, Vector3::zeros(), 1.0))
            .unwrap_err();
        assert!(matches!(err, Error::MultipleRoots(slot) if slot == a));
    }

    #[test]
    fn bone_validates_slots() {
        let mut skel = Skeleton::new();
        let a = skel.add_ball(ball_at(0.0)).unwrap();
        let b = skel.add_ball(ball_at(1.0)).unwrap();

        let err = skel.add_bone(Bone { first: a, second: 7 }).unwrap_err();
        assert!(matches!(err, Error::BadBallSlot(7)));

        let err = skel.add_bone(Bone { first: b, second: b }).unwrap_err();
        assert!(matches!(err, Error::SelfBone(slot) if slot == b));

        skel.add_bone(Bone { first: a, second: b }).unwrap();
        assert_eq!(skel.bone_count(), 1);
        assert_eq!(
            skel.bones().next(),
            Some(&Bone { first: a, second: b })
        );
    }

    #[test]
    fn bone_links_both_directions() {
        let mut skel = Skeleton::new();
        let a = skel.add_ball(ball_at(0.0)).unwrap();
        let b = skel.add_ball(ball_at(1.0)).unwrap();
        let c = skel.add_ball(ball_at(2.0)).unwrap();
        skel.add_bone(Bone { first: a, second: b }).unwrap();
        skel.add_bone(Bone { first: a, second: c }).unwrap();

        // child lists are prepend-ordered
        let children: Vec<_> = skel.children(a).collect();
        assert_eq!(children, vec![c, b]);

        // the edge is mirrored
        assert_eq!(skel.children(b).collect::<Vec<_>>(), vec![a]);
        assert_eq!(skel.children(c).collect::<Vec<_>>(), vec![a]);
    }

    #[test]
    fn iterators_are_restartable() {
        let mut skel = Skeleton::new();
        let a = skel.add_ball(ball_at(0.0)).unwrap();
        for i in 1..4 {
            let b = skel.add_ball(ball_at(i as f32)).unwrap();
            skel.add_bone(Bone { first: a, second: b }).unwrap();
        }
        let first: Vec<_> = skel.children(a).collect();
        let mut outer = skel.children(a);
        outer.next();
        // a fresh iterator is unaffected by the partially-consumed one
        let second: Vec<_> = skel.children(a).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn visit_marks_are_per_pass() {
        let mut skel = Skeleton::new();
        let a = skel.add_ball(ball_at(0.0)).unwrap();

        let pass = skel.begin_pass();
        assert!(skel.visit(a, pass));
        assert!(!skel.visit(a, pass));

        let next = skel.begin_pass();
        assert!(skel.visit(a, next));
    }
}
