//! Convex hull stitching at branch joints
//!
//! A ball with two or more children is a stitch site: the tubes of its
//! limbs (and of its parent side) cannot be walled pairwise, so the site
//! collects one cross-section ring per limb, builds the convex hull of all
//! ring corners by gift wrapping, and emits the hull's side faces as the
//! joint's surface.  Ring faces (triangles whose corners all come from one
//! ring) are the flat caps where a tube continues; they are kept during
//! construction, so the hull closes and its topology can be checked, and
//! filtered when the faces are emitted.
//!
//! Balls closer to the site than `radius + step` are interior to the joint;
//! they lose their radius (walls over them collapse away) and the ring is
//! taken further along the limb.
use arrayvec::ArrayVec;
use nalgebra::Vector3;

use super::builder::SurfaceBuilder;
use super::frame::DIRECTION_EPSILON;
use super::{Settings, RADIUS_EPSILON};
use crate::arena::Arena;
use crate::dict::Dict;
use crate::skeleton::{BallKind, Skeleton};
use crate::Error;

/// Dihedral angles below this reject a candidate face as a degenerate
/// fold-back onto an existing face
const FOLD_EPSILON: f32 = 1e-3;

/// Two triangles merge into a quad when the angle between their normals is
/// below this
const MERGE_ANGLE: f32 = 40.0 * std::f32::consts::PI / 180.0;

const DICT_BUCKETS: usize = 64;

#[derive(Copy, Clone, Debug, Default)]
struct HullVertex {
    position: Vector3<f32>,
    /// Ball slot whose cross-section this corner belongs to
    section: usize,
    /// Corner order on that cross-section
    order: u8,
}

/// A 3- or 4-vertex polygon; an emptied vertex list marks a face consumed
/// by merging
#[derive(Clone, Debug, Default)]
struct HullFace {
    verts: ArrayVec<usize, 4>,
    /// Set when every corner comes from the same ring
    source: Option<usize>,
}

impl HullFace {
    fn alive(&self) -> bool {
        !self.verts.is_empty()
    }
}

/// An undirected edge and its incident faces
///
/// `hills` holds, per face, the face vertex opposite this edge; it orients
/// the wrap and the fold-back test without another face lookup.
#[derive(Copy, Clone, Debug, Default)]
struct HullEdge {
    a: usize,
    b: usize,
    faces: [usize; 2],
    hills: [usize; 2],
    count: u8,
}

/// A pending wrap step: an open edge plus the hill vertex of the face it
/// came from
#[derive(Copy, Clone, Debug, Default)]
struct Todo {
    p1: usize,
    p2: usize,
    hill: usize,
}

/// Per-site hull working set; built fresh for each stitch site
struct Hull {
    center: Vector3<f32>,
    verts: Arena<HullVertex>,
    faces: Arena<HullFace>,
    edges: Arena<HullEdge>,
    edge_index: Dict<(usize, usize)>,
    face_index: Dict<[usize; 3]>,
    todos: Arena<Todo>,
    cursor: usize,
}

fn edge_key(a: usize, b: usize) -> (usize, usize) {
    if a < b {
        (a, b)
    } else {
        (b, a)
    }
}

fn face_key(a: usize, b: usize, c: usize) -> [usize; 3] {
    let mut key = [a, b, c];
    key.sort_unstable();
    key
}

impl Hull {
    fn new(center: Vector3<f32>) -> Result<Self, Error> {
        Ok(Self {
            center,
            verts: Arena::new(),
            faces: Arena::new(),
            edges: Arena::new(),
            edge_index: Dict::new(DICT_BUCKETS)?,
            face_index: Dict::new(DICT_BUCKETS)?,
            todos: Arena::new(),
            cursor: 0,
        })
    }

    /// Adds one ring's cross-section quad and seeds the wrap with its
    /// first triangle
    fn add_ring(
        &mut self,
        section: usize,
        quad: [Vector3<f32>; 4],
    ) -> Result<(), Error> {
        let base = self.verts.len();
        for (order, position) in quad.into_iter().enumerate() {
            self.verts.push(HullVertex {
                position,
                section,
                order: order as u8,
            })?;
        }
        self.todos.push(Todo {
            p1: base,
            p2: base + 1,
            hill: base + 2,
        })?;
        Ok(())
    }

    fn find_edge(&self, a: usize, b: usize) -> Option<usize> {
        self.edge_index.find(&edge_key(a, b))
    }

    /// In-plane direction of `x` as seen from edge `a→b`
    ///
    /// Projects `x - a` perpendicular to the edge; `None` when `x` sits on
    /// the edge line.
    fn across_edge(
        &self,
        a: usize,
        b: usize,
        x: usize,
    ) -> Option<Vector3<f32>> {
        let pa = self.verts[a].position;
        let edge = self.verts[b].position - pa;
        let norm = edge.norm();
        if norm <= DIRECTION_EPSILON {
            return None;
        }
        let edge = edge / norm;
        let v = self.verts[x].position - pa;
        let out = v - edge * v.dot(&edge);
        if out.norm() <= DIRECTION_EPSILON {
            None
        } else {
            Some(out)
        }
    }

    /// The wrap angle through edge `a→b` between vertex `x`'s side and
    /// vertex `y`'s side; `None` when either is degenerate
    fn fold_angle(
        &self,
        a: usize,
        b: usize,
        x: usize,
        y: usize,
    ) -> Option<f32> {
        let ux = self.across_edge(a, b, x)?;
        let uy = self.across_edge(a, b, y)?;
        Some(ux.angle(&uy))
    }

    /// Finds the vertex the hull wraps onto next through the given edge:
    /// the one whose face plane opens the widest angle from the hill side
    fn next_vertex(&self, todo: &Todo) -> Option<usize> {
        let hill = self.across_edge(todo.p1, todo.p2, todo.hill)?;
        let mut best: Option<(usize, f32)> = None;
        for slot in 0..self.verts.len() {
            if slot == todo.p1 || slot == todo.p2 {
                continue;
            }
            let Some(dir) = self.across_edge(todo.p1, todo.p2, slot) else {
                continue;
            };
            let angle = hill.angle(&dir);
            if best.map_or(true, |(_, a)| angle > a) {
                best = Some((slot, angle));
            }
        }
        best.map(|(slot, _)| slot)
    }

    /// Runs gift wrapping until no open edges remain
    fn generate(&mut self) -> Result<(), Error> {
        while self.cursor < self.todos.len() {
            let todo = self.todos[self.cursor];
            self.cursor += 1;
            if let Some(edge) = self.find_edge(todo.p1, todo.p2) {
                if self.edges[edge].count >= 2 {
                    continue;
                }
            }
            let Some(found) = self.next_vertex(&todo) else {
                continue;
            };
            if self.can_add_face(todo.p1, todo.p2, found) {
                self.add_face(todo.p1, todo.p2, found)?;
            }
        }
        Ok(())
    }

    /// Checks a candidate face against the existing hull: duplicate faces,
    /// closed edges, and near-coplanar fold-backs are all rejected
    fn can_add_face(&self, p1: usize, p2: usize, p3: usize) -> bool {
        if p1 == p2 || p2 == p3 || p3 == p1 {
            return false;
        }
        if self.face_index.find(&face_key(p1, p2, p3)).is_some() {
            return false;
        }
        for (a, b, opposite) in [(p1, p2, p3), (p2, p3, p1), (p3, p1, p2)] {
            let Some(slot) = self.find_edge(a, b) else {
                continue;
            };
            let edge = self.edges[slot];
            if edge.count >= 2 {
                return false;
            }
            if edge.count == 1 {
                let fold = self.fold_angle(a, b, edge.hills[0], opposite);
                if matches!(fold, Some(angle) if angle <= FOLD_EPSILON) {
                    return false;
                }
            }
        }
        true
    }

    fn add_face(
        &mut self,
        p1: usize,
        p2: usize,
        p3: usize,
    ) -> Result<(), Error> {
        let sections = [p1, p2, p3].map(|v| self.verts[v].section);
        let source = (sections[0] == sections[1]
            && sections[0] == sections[2])
            .then_some(sections[0]);
        let face = self.faces.push(HullFace {
            verts: [p1, p2, p3].into_iter().collect(),
            source,
        })?;
        self.face_index
            .get_or_insert_with(face_key(p1, p2, p3), || Ok(face))?;

        for (a, b, opposite) in [(p1, p2, p3), (p2, p3, p1), (p3, p1, p2)] {
            let slot = match self.find_edge(a, b) {
                Some(slot) => slot,
                None => {
                    let (lo, hi) = edge_key(a, b);
                    let slot = self.edges.push_default()?;
                    self.edges[slot].a = lo;
                    self.edges[slot].b = hi;
                    self.edge_index
                        .get_or_insert_with((lo, hi), || Ok(slot))?;
                    slot
                }
            };
            let open = {
                let edge = &mut self.edges[slot];
                let index = edge.count as usize;
                edge.faces[index] = face;
                edge.hills[index] = opposite;
                edge.count += 1;
                edge.count == 1
            };
            if open {
                // open boundary: wrap its far side later
                self.todos.push(Todo {
                    p1: b,
                    p2: a,
                    hill: opposite,
                })?;
            }
        }
        Ok(())
    }

    fn face_normal(&self, face: &HullFace) -> Vector3<f32> {
        let a = self.verts[face.verts[0]].position;
        let b = self.verts[face.verts[1]].position;
        let c = self.verts[face.verts[2]].position;
        (b - a).cross(&(c - a))
    }

    /// Reverses any face whose normal points at the site center
    fn unify_orientation(&mut self) {
        for slot in 0..self.faces.len() {
            let face = self.faces[slot].clone();
            if !face.alive() {
                continue;
            }
            let normal = self.face_normal(&face);
            let outward = self.verts[face.verts[0]].position - self.center;
            if normal.dot(&outward) < 0.0 {
                self.faces[slot].verts.reverse();
            }
        }
    }

    /// Merges coplanar-enough triangle pairs back into quads
    ///
    /// Internal edges are processed flattest first (then most world-up
    /// aligned first), which yields the cleanest quad layout; a face takes
    /// part in at most one merge because quads are skipped.
    fn merge_triangles(&mut self) {
        struct Seam {
            edge: usize,
            face_angle: f32,
            up_angle: f32,
        }
        let mut seams = Vec::new();
        for slot in 0..self.edges.len() {
            let edge = self.edges[slot];
            if edge.count != 2 {
                continue;
            }
            let n1 = self.face_normal(&self.faces[edge.faces[0]]);
            let n2 = self.face_normal(&self.faces[edge.faces[1]]);
            if n1.norm() <= DIRECTION_EPSILON || n2.norm() <= DIRECTION_EPSILON
            {
                continue;
            }
            let along =
                self.verts[edge.b].position - self.verts[edge.a].position;
            if along.norm() <= DIRECTION_EPSILON {
                continue;
            }
            seams.push(Seam {
                edge: slot,
                face_angle: n1.angle(&n2),
                up_angle: along.angle(&Vector3::y()),
            });
        }
        seams.sort_by(|x, y| {
            x.face_angle
                .total_cmp(&y.face_angle)
                .then(x.up_angle.total_cmp(&y.up_angle))
        });

        for seam in seams {
            if seam.face_angle >= MERGE_ANGLE {
                break;
            }
            let edge = self.edges[seam.edge];
            let (f1, f2) = (edge.faces[0], edge.faces[1]);
            let first = self.faces[f1].clone();
            let second = self.faces[f2].clone();
            if first.verts.len() != 3 || second.verts.len() != 3 {
                continue;
            }
            if first.source != second.source {
                continue;
            }
            // rotate the first triangle so its lone vertex leads, then
            // splice the second triangle's lone vertex into the shared edge
            let shared = [edge.a, edge.b];
            let Some(lead) =
                (0..3).find(|&i| !shared.contains(&first.verts[i]))
            else {
                continue;
            };
            let Some(tail) = second
                .verts
                .iter()
                .copied()
                .find(|v| !shared.contains(v))
            else {
                continue;
            };
            let quad = [
                first.verts[lead],
                first.verts[(lead + 1) % 3],
                tail,
                first.verts[(lead + 2) % 3],
            ];
            self.faces[f1] = HullFace {
                verts: quad.into_iter().collect(),
                source: first.source,
            };
            self.faces[f2].verts.clear();
        }
    }

    /// Emits the hull's surface faces, skipping ring caps (tubes continue
    /// through them)
    fn emit(&self, builder: &mut SurfaceBuilder) -> Result<(), Error> {
        for face in self.faces.iter() {
            if !face.alive() || face.source.is_some() {
                continue;
            }
            let mut out = ArrayVec::<usize, 4>::new();
            for &v in &face.verts {
                let vert = self.verts[v];
                out.push(
                    builder.vertex(vert.section, vert.order, vert.position)?,
                );
            }
            match *out.as_slice() {
                [a, b, c] => builder.push_triangle([a, b, c]),
                [a, b, c, d] => builder.push_quad([a, b, c, d]),
                _ => (),
            }
        }
        Ok(())
    }
}

////////////////////////////////////////////////////////////////////////////////

/// Walks the resampled skeleton and stitches a hull at every branch ball
pub(crate) fn stitch(
    skel: &mut Skeleton,
    root: usize,
    settings: &Settings,
    builder: &mut SurfaceBuilder,
) -> Result<(), Error> {
    let pass = skel.begin_pass();
    skel.visit(root, pass);
    let mut parents = Vec::new();
    stitch_walk(skel, root, &mut parents, pass, settings, builder)
}

fn stitch_walk(
    skel: &mut Skeleton,
    ball: usize,
    parents: &mut Vec<usize>,
    pass: u64,
    settings: &Settings,
    builder: &mut SurfaceBuilder,
) -> Result<(), Error> {
    if parents.len() >= settings.max_depth {
        return Err(Error::DepthExceeded(settings.max_depth));
    }
    let children: Vec<usize> = skel
        .children(ball)
        .filter(|&c| skel.ball(c).visit_mark != pass)
        .collect();
    for &child in &children {
        skel.visit(child, pass);
    }

    if children.len() >= 2 {
        skel.ball_mut(ball).kind = BallKind::Root;
        stitch_site(skel, ball, &children, parents, settings, builder)?;
    }

    parents.push(ball);
    for child in children {
        stitch_walk(skel, child, parents, pass, settings, builder)?;
    }
    parents.pop();
    Ok(())
}

/// Builds and emits the hull for one stitch site
fn stitch_site(
    skel: &mut Skeleton,
    site: usize,
    children: &[usize],
    parents: &[usize],
    settings: &Settings,
    builder: &mut SurfaceBuilder,
) -> Result<(), Error> {
    let center = skel.ball(site).position;
    let reach = skel.ball(site).radius + settings.step;
    let mut hull = Hull::new(center)?;

    // parent side: the nearest far-enough ancestor carries the inherited
    // cross-section; everything nearer is swallowed by the joint
    for index in (0..parents.len()).rev() {
        let ancestor = parents[index];
        if usable_ring(skel, ancestor, center, reach) {
            add_ball_ring(skel, ancestor, &mut hull)?;
            break;
        }
        skel.ball_mut(ancestor).radius = 0.0;
    }

    // child side: walk each limb outward until it clears the joint
    for &child in children {
        let mut prev = site;
        let mut ball = child;
        let mut steps = 0usize;
        loop {
            if usable_ring(skel, ball, center, reach) {
                add_ball_ring(skel, ball, &mut hull)?;
                break;
            }
            skel.ball_mut(ball).radius = 0.0;
            let next = skel.children(ball).find(|&c| c != prev);
            match next {
                Some(next) => {
                    prev = ball;
                    ball = next;
                }
                // the limb never leaves the joint; it contributes no ring
                None => break,
            }
            steps += 1;
            if steps > settings.max_depth {
                return Err(Error::DepthExceeded(settings.max_depth));
            }
        }
    }

    hull.generate()?;
    hull.unify_orientation();
    hull.merge_triangles();
    hull.emit(builder)
}

fn usable_ring(
    skel: &Skeleton,
    ball: usize,
    center: Vector3<f32>,
    reach: f32,
) -> bool {
    let ball = skel.ball(ball);
    ball.radius > RADIUS_EPSILON
        && ball.frame.is_some()
        && (ball.position - center).norm() >= reach
}

fn add_ball_ring(
    skel: &Skeleton,
    slot: usize,
    hull: &mut Hull,
) -> Result<(), Error> {
    let ball = skel.ball(slot);
    if let Some(frame) = ball.frame {
        hull.add_ring(slot, frame.cross_section(ball.position, ball.radius))?;
    }
    Ok(())
}
