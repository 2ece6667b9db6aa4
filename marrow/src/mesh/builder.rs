//! Container used during construction of a [`Mesh`]
use nalgebra::Vector3;

use super::{Face, Mesh};
use crate::dict::Dict;
use crate::Error;

/// Accumulates the output surface, welding shared vertices
///
/// Every surface vertex is a corner of some cross-section, so vertices are
/// deduplicated by `(section id, corner)` rather than by position: hull
/// rings, wall rings and caps that reference the same corner collapse onto
/// one output vertex and the seams stay watertight.  Real balls use their
/// slot as the section id; synthesized cap rings draw fresh ids from beyond
/// the ball range.
pub(crate) struct SurfaceBuilder {
    /// Map from `(section, corner)` to an output vertex index
    index: Dict<(usize, u8)>,
    next_section: usize,
    out: Mesh,
}

impl SurfaceBuilder {
    pub fn new(ball_count: usize) -> Result<Self, Error> {
        Ok(Self {
            index: Dict::new(256)?,
            next_section: ball_count,
            out: Mesh::new(),
        })
    }

    /// Looks up or creates the output vertex for a cross-section corner
    pub fn vertex(
        &mut self,
        section: usize,
        corner: u8,
        position: Vector3<f32>,
    ) -> Result<usize, Error> {
        let Self { index, out, .. } = self;
        index.get_or_insert_with((section, corner), || {
            out.vertices.push(position);
            Ok(out.vertices.len() - 1)
        })
    }

    /// Allocates a section id for a synthesized ring
    pub fn fresh_section(&mut self) -> usize {
        let section = self.next_section;
        self.next_section += 1;
        section
    }

    pub fn push_triangle(&mut self, verts: [usize; 3]) {
        self.out.faces.push(Face::Triangle(verts));
    }

    pub fn push_quad(&mut self, verts: [usize; 4]) {
        self.out.faces.push(Face::Quad(verts));
    }

    pub fn take(self) -> Mesh {
        self.out
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn corners_weld_across_consumers() {
        let mut builder = SurfaceBuilder::new(10).unwrap();
        let a = builder
            .vertex(3, 0, Vector3::new(1.0, 2.0, 3.0))
            .unwrap();
        // same corner requested again (e.g. once by a hull, once by a wall)
        let b = builder
            .vertex(3, 0, Vector3::new(1.0, 2.0, 3.0))
            .unwrap();
        assert_eq!(a, b);
        // a different corner of the same section is a fresh vertex
        let c = builder
            .vertex(3, 1, Vector3::new(1.0, 2.0, -3.0))
            .unwrap();
        assert_ne!(a, c);

        builder.push_triangle([a, b, c]);
        let mesh = builder.take();
        assert_eq!(mesh.vertices.len(), 2);
        assert_eq!(mesh.faces.len(), 1);
    }

    #[test]
    fn fresh_sections_start_past_the_ball_range() {
        let mut builder = SurfaceBuilder::new(7).unwrap();
        assert_eq!(builder.fresh_section(), 7);
        assert_eq!(builder.fresh_section(), 8);
    }
}
