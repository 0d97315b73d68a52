use num_traits::AsPrimitive;
use serde::{Deserialize, Serialize};

use crate::errors::FieldError;

/// Owned, normalized triangulation: `f64` coordinates, `u32` vertex indices.
///
/// Triangle identity is positional: triangle `i` is the i-th index triple.
#[derive(Default, Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct TriangleMesh
{
    points: Vec<[f64; 2]>,
    triangles: Vec<[u32; 3]>,
}

impl TriangleMesh
{
    /// Builds a mesh from caller-supplied arrays, normalizing coordinates to
    /// `f64` and vertex indices to `u32`.
    pub fn new<P, I>(points: &[[P; 2]], triangles: &[[I; 3]]) -> Result<Self, FieldError>
    where
        P: AsPrimitive<f64>,
        I: AsPrimitive<u32>,
    {
        if points.is_empty() || triangles.is_empty()
        {
            return Err(FieldError::EmptyMesh);
        }
        let points: Vec<[f64; 2]> = points.iter().map(|p| [p[0].as_(), p[1].as_()]).collect();
        let triangles: Vec<[u32; 3]> = triangles.iter().map(|t| [t[0].as_(), t[1].as_(), t[2].as_()]).collect();
        let num_points = points.len() as u32;
        if triangles.iter().flatten().any(|&v| v >= num_points)
        {
            return Err(FieldError::TriangleVertexOutOfRange);
        }
        Ok(Self { points, triangles })
    }

    #[inline]
    pub fn num_points(&self) -> usize
    {
        self.points.len()
    }

    #[inline]
    pub fn num_triangles(&self) -> usize
    {
        self.triangles.len()
    }

    #[inline]
    pub fn points(&self) -> &[[f64; 2]]
    {
        &self.points
    }

    #[inline]
    pub fn triangles(&self) -> &[[u32; 3]]
    {
        &self.triangles
    }

    /// Corner coordinates of triangle `tri` in storage order.
    #[inline]
    pub fn corners(&self, tri: usize) -> [[f64; 2]; 3]
    {
        let [a, b, c] = self.triangles[tri];
        [self.points[a as usize], self.points[b as usize], self.points[c as usize]]
    }

    /// Axis-aligned bounding box of the whole mesh as (lower, upper).
    pub fn bounds(&self) -> ([f64; 2], [f64; 2])
    {
        let mut lower = [f64::INFINITY; 2];
        let mut upper = [f64::NEG_INFINITY; 2];
        for p in &self.points
        {
            for d in 0..2
            {
                lower[d] = lower[d].min(p[d]);
                upper[d] = upper[d].max(p[d]);
            }
        }
        (lower, upper)
    }

    /// Axis-aligned bounding box of triangle `tri` as (lower, upper).
    pub fn triangle_bounds(&self, tri: usize) -> ([f64; 2], [f64; 2])
    {
        let corners = self.corners(tri);
        let mut lower = corners[0];
        let mut upper = corners[0];
        for p in &corners[1..]
        {
            for d in 0..2
            {
                lower[d] = lower[d].min(p[d]);
                upper[d] = upper[d].max(p[d]);
            }
        }
        (lower, upper)
    }

    /// Sign-based containment test. Points exactly on an edge or vertex count
    /// as inside; both windings are accepted.
    pub fn triangle_contains(&self, tri: usize, point: &[f64; 2]) -> bool
    {
        let [a, b, c] = self.corners(tri);
        let d1 = edge_sign(&a, &b, point);
        let d2 = edge_sign(&b, &c, point);
        let d3 = edge_sign(&c, &a, point);
        let has_neg = d1 < 0.0 || d2 < 0.0 || d3 < 0.0;
        let has_pos = d1 > 0.0 || d2 > 0.0 || d3 > 0.0;
        !(has_neg && has_pos)
    }
}

#[inline]
fn edge_sign(a: &[f64; 2], b: &[f64; 2], p: &[f64; 2]) -> f64
{
    (p[0] - b[0]) * (a[1] - b[1]) - (a[0] - b[0]) * (p[1] - b[1])
}

#[cfg(test)]
mod tests
{
    use super::*;

    fn unit_square() -> TriangleMesh
    {
        // Unit square split along the main diagonal.
        let points = [[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]];
        let triangles = [[0u32, 1, 2], [0, 2, 3]];
        TriangleMesh::new(&points, &triangles).unwrap()
    }

    #[test]
    fn rejects_out_of_range_vertex()
    {
        let points = [[0.0, 0.0], [1.0, 0.0], [0.0, 1.0]];
        let triangles = [[0u32, 1, 3]];
        assert_eq!(TriangleMesh::new(&points, &triangles), Err(FieldError::TriangleVertexOutOfRange));
    }

    #[test]
    fn rejects_empty()
    {
        let points: [[f64; 2]; 0] = [];
        let triangles = [[0u32, 1, 2]];
        assert_eq!(TriangleMesh::new(&points, &triangles), Err(FieldError::EmptyMesh));
    }

    #[test]
    fn normalizes_numeric_types()
    {
        let points = [[0.0f32, 0.0], [1.0, 0.0], [0.0, 1.0]];
        let triangles = [[0i64, 1, 2]];
        let mesh = TriangleMesh::new(&points, &triangles).unwrap();
        assert_eq!(mesh.points()[1], [1.0, 0.0]);
        assert_eq!(mesh.triangles()[0], [0, 1, 2]);
    }

    #[test]
    fn containment_interior_and_exterior()
    {
        let mesh = unit_square();
        assert!(mesh.triangle_contains(0, &[0.7, 0.2]));
        assert!(!mesh.triangle_contains(0, &[0.2, 0.7]));
        assert!(mesh.triangle_contains(1, &[0.2, 0.7]));
        assert!(!mesh.triangle_contains(0, &[2.0, 2.0]));
    }

    #[test]
    fn containment_on_shared_edge_and_vertex()
    {
        let mesh = unit_square();
        // The diagonal belongs to both triangles at this layer.
        assert!(mesh.triangle_contains(0, &[0.5, 0.5]));
        assert!(mesh.triangle_contains(1, &[0.5, 0.5]));
        assert!(mesh.triangle_contains(0, &[0.0, 0.0]));
    }

    #[test]
    fn containment_clockwise_winding()
    {
        let points = [[0.0, 0.0], [1.0, 0.0], [0.0, 1.0]];
        let triangles = [[0u32, 2, 1]];
        let mesh = TriangleMesh::new(&points, &triangles).unwrap();
        assert!(mesh.triangle_contains(0, &[0.25, 0.25]));
        assert!(!mesh.triangle_contains(0, &[0.75, 0.75]));
    }

    #[test]
    fn bounds_cover_all_points()
    {
        let mesh = unit_square();
        assert_eq!(mesh.bounds(), ([0.0, 0.0], [1.0, 1.0]));
        assert_eq!(mesh.triangle_bounds(1), ([0.0, 0.0], [1.0, 1.0]));
    }
}
