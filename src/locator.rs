use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::errors::FieldError;
use crate::mesh::TriangleMesh;

/// Locates query points within a fixed triangulation.
pub trait PointLocator
{
    /// Returns the identifier of the triangle containing `point`, or [`None`]
    /// if the point lies outside every triangle.
    fn locate_one(&self, point: &[f64; 2]) -> Option<usize>;

    /// Locates several query points.
    fn locate_many(&self, points: &[[f64; 2]]) -> Vec<Option<usize>>
    {
        points.iter().map(|point| self.locate_one(point)).collect()
    }

    /// Locates several query points in parallel.
    fn par_locate_many(&self, points: &[[f64; 2]]) -> Vec<Option<usize>>
    where
        Self: Sync,
    {
        points.par_iter().map(|point| self.locate_one(point)).collect()
    }
}

const MAX_BINS_PER_AXIS: usize = 1024;

/// Point-containment oracle over a [`TriangleMesh`].
///
/// A uniform bin grid over the mesh bounding box holds, per bin, the
/// identifiers of all triangles whose bounding box overlaps that bin. A query
/// tests only the candidate triangles of the query point's bin. The structure
/// is built once and immutable afterwards; queries through
/// [`PointLocator::locate_one`] are pure and safe to share across threads.
///
/// Where a point lies on an edge or vertex shared between triangles, the
/// candidate with the lowest position in bin insertion order wins, so exactly
/// one triangle is reported.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct TriangleLocator
{
    mesh: TriangleMesh,
    lower: [f64; 2],
    upper: [f64; 2],
    bins_per_axis: [usize; 2],
    bins: Vec<Vec<u32>>,
    // Transient view handle for the stateful `contains` protocol, rebuilt
    // empty on deserialization.
    #[serde(skip)]
    last_match: Option<usize>,
}

impl TriangleLocator
{
    pub fn new(mesh: TriangleMesh) -> Self
    {
        let (lower, upper) = mesh.bounds();
        let per_axis = ((mesh.num_triangles() as f64).sqrt().ceil() as usize)
            .clamp(1, MAX_BINS_PER_AXIS);
        let bins_per_axis = [per_axis, per_axis];
        let mut bins = vec![Vec::new(); bins_per_axis[0] * bins_per_axis[1]];
        for tri in 0..mesh.num_triangles()
        {
            let (tri_lower, tri_upper) = mesh.triangle_bounds(tri);
            let [ix0, iy0] = clamped_bin(&tri_lower, &lower, &upper, &bins_per_axis);
            let [ix1, iy1] = clamped_bin(&tri_upper, &lower, &upper, &bins_per_axis);
            for iy in iy0..=iy1
            {
                for ix in ix0..=ix1
                {
                    bins[iy * bins_per_axis[0] + ix].push(tri as u32);
                }
            }
        }
        Self { mesh, lower, upper, bins_per_axis, bins, last_match: None }
    }

    /// Builds the locator directly from raw geometry arrays.
    pub fn from_raw<P, I>(points: &[[P; 2]], triangles: &[[I; 3]]) -> Result<Self, FieldError>
    where
        P: num_traits::AsPrimitive<f64>,
        I: num_traits::AsPrimitive<u32>,
    {
        Ok(Self::new(TriangleMesh::new(points, triangles)?))
    }

    #[inline]
    pub fn mesh(&self) -> &TriangleMesh
    {
        &self.mesh
    }

    #[inline]
    pub fn num_triangles(&self) -> usize
    {
        self.mesh.num_triangles()
    }

    /// Tests whether `point` lies inside some triangle, recording the matched
    /// identifier for retrieval through [`last_triangle`](Self::last_triangle).
    ///
    /// The recorded identifier is only meaningful immediately after a `true`
    /// result. Taking `&mut self` keeps one match slot per locator owner, so
    /// interleaved queries from another thread cannot clobber it.
    pub fn contains(&mut self, point: &[f64; 2]) -> bool
    {
        self.last_match = self.locate_one(point);
        self.last_match.is_some()
    }

    /// Identifier recorded by the most recent successful [`contains`](Self::contains).
    #[inline]
    pub fn last_triangle(&self) -> Option<usize>
    {
        self.last_match
    }
}

impl PointLocator for TriangleLocator
{
    fn locate_one(&self, point: &[f64; 2]) -> Option<usize>
    {
        if point[0] < self.lower[0] || point[0] > self.upper[0]
            || point[1] < self.lower[1] || point[1] > self.upper[1]
        {
            return None;
        }
        let [ix, iy] = clamped_bin(point, &self.lower, &self.upper, &self.bins_per_axis);
        self.bins[iy * self.bins_per_axis[0] + ix]
            .iter()
            .map(|&tri| tri as usize)
            .find(|&tri| self.mesh.triangle_contains(tri, point))
    }
}

/// Bin coordinates of `point`, clamped onto the grid. Degenerate extents
/// (all points sharing one coordinate) collapse to bin 0 on that axis.
#[inline]
fn clamped_bin(point: &[f64; 2], lower: &[f64; 2], upper: &[f64; 2], bins_per_axis: &[usize; 2]) -> [usize; 2]
{
    let mut bin = [0usize; 2];
    for d in 0..2
    {
        let width = upper[d] - lower[d];
        if width > 0.0
        {
            let i = ((point[d] - lower[d]) / width * bins_per_axis[d] as f64) as usize;
            bin[d] = i.min(bins_per_axis[d] - 1);
        }
    }
    bin
}
