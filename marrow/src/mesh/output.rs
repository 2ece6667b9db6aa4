//! Mesh output implementation
use std::io::{BufWriter, Write};

use super::{Face, Mesh};

impl Mesh {
    /// Writes a binary STL to the given output
    ///
    /// STL carries triangles only, so quad faces are split along their
    /// first diagonal on the way out.
    pub fn write_stl<F: Write>(&self, out: &mut F) -> Result<(), crate::Error> {
        // Many small writes, typically into a file; buffer them.
        let mut out = BufWriter::new(out);
        const HEADER: &[u8] = b"Binary STL exported by marrow";
        static_assertions::const_assert!(HEADER.len() <= 80);
        out.write_all(HEADER)?;
        out.write_all(&[0u8; 80 - HEADER.len()])?;

        let count: usize = self
            .faces
            .iter()
            .map(|f| match f {
                Face::Triangle(_) => 1,
                Face::Quad(_) => 2,
            })
            .sum();
        out.write_all(&(count as u32).to_le_bytes())?;

        for face in &self.faces {
            match *face {
                Face::Triangle([a, b, c]) => {
                    self.write_stl_triangle(&mut out, [a, b, c])?
                }
                Face::Quad([a, b, c, d]) => {
                    self.write_stl_triangle(&mut out, [a, b, c])?;
                    self.write_stl_triangle(&mut out, [a, c, d])?;
                }
            }
        }
        Ok(())
    }

    fn write_stl_triangle<F: Write>(
        &self,
        out: &mut F,
        verts: [usize; 3],
    ) -> Result<(), crate::Error> {
        let a = self.vertices[verts[0]];
        let b = self.vertices[verts[1]];
        let c = self.vertices[verts[2]];
        // Not the _best_ way to calculate a normal, but good enough
        let normal = (b - a).cross(&(c - a));
        for p in &normal {
            out.write_all(&p.to_le_bytes())?;
        }
        for v in verts {
            for p in &self.vertices[v] {
                out.write_all(&p.to_le_bytes())?;
            }
        }
        out.write_all(&[0u8; std::mem::size_of::<u16>()])?; // attributes
        Ok(())
    }
}
