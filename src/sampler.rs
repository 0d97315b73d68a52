use std::sync::{Arc, PoisonError, RwLock};

use num_traits::AsPrimitive;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use serde_with::serde_as;

use crate::errors::FieldError;
use crate::locator::{PointLocator, TriangleLocator};
use crate::serialization::{self, SerializationFormat};

/// Shared handle to per-cell field values.
///
/// The owning application keeps its own clone of the handle and may rewrite
/// values in place between evaluations (e.g. when time-stepping); samplers
/// only ever read through it, and the next [`FieldSampler::evaluate`] call
/// observes the new contents without any rebuild.
pub type SharedValues<const DIM_OUT: usize> = Arc<RwLock<Vec<[f64; DIM_OUT]>>>;

/// Wraps per-cell values in a [`SharedValues`] handle.
pub fn shared_values<const DIM_OUT: usize>(values: Vec<[f64; DIM_OUT]>) -> SharedValues<DIM_OUT>
{
    Arc::new(RwLock::new(values))
}

/// Shared handle over one scalar value per cell.
pub fn scalar_values(values: &[f64]) -> SharedValues<1>
{
    shared_values(values.iter().map(|&v| [v]).collect())
}

/// Shared handle assembled from the three component rows (x, y, z) of a
/// vector field, one entry per cell.
pub fn vector_values_from_rows(x: &[f64], y: &[f64], z: &[f64]) -> Result<SharedValues<3>, FieldError>
{
    if x.len() != y.len() || x.len() != z.len()
    {
        return Err(FieldError::ComponentLengthMismatch);
    }
    Ok(shared_values(
        x.iter().zip(y).zip(z).map(|((&x, &y), &z)| [x, y, z]).collect(),
    ))
}

/// Maps a 2D query point to the field value of the grid cell owning the
/// enclosing mesh triangle.
///
/// The triangulation is finer than the data grid: many triangles share one
/// cell's value, and the returned value is constant across all of a cell's
/// triangles. Points outside the triangulation evaluate to zero rather than
/// an error, so bulk sampling over regions extending past the mesh needs no
/// miss handling.
///
/// The locator and triangle-to-cell map are immutable after construction and
/// shared between derived samplers; only the data handle varies per instance.
#[derive(Clone, Debug)]
pub struct FieldSampler<const DIM_OUT: usize>
{
    locator: Arc<TriangleLocator>,
    triangle_to_cell: Arc<Vec<u32>>,
    values: SharedValues<DIM_OUT>,
}

/// One real value per grid cell.
pub type ScalarFieldSampler = FieldSampler<1>;
/// Three components (x, y, z) per grid cell.
pub type VectorFieldSampler = FieldSampler<3>;

impl<const DIM_OUT: usize> FieldSampler<DIM_OUT>
{
    /// Builds a sampler from raw geometry, the triangle-to-cell map, and a
    /// shared data handle.
    ///
    /// Geometry is normalized into owned `f64`/`u32` storage and the locator
    /// is built from it once; `values` is held by reference via the handle,
    /// never copied. Fails if the map length does not equal the triangle
    /// count or any map entry is out of range of the data array.
    pub fn new<P, I, C>(
        points: &[[P; 2]],
        triangles: &[[I; 3]],
        triangle_to_cell: &[C],
        values: SharedValues<DIM_OUT>,
    ) -> Result<Self, FieldError>
    where
        P: AsPrimitive<f64>,
        I: AsPrimitive<u32>,
        C: AsPrimitive<u32>,
    {
        let locator = TriangleLocator::from_raw(points, triangles)?;
        let triangle_to_cell: Vec<u32> = triangle_to_cell.iter().map(|c| c.as_()).collect();
        Self::from_parts(Arc::new(locator), Arc::new(triangle_to_cell), values)
    }

    /// Assembles a sampler from an already-built locator and map, sharing
    /// both by reference. Used by [`restore`](Self::restore) and available to
    /// callers managing their own locator lifetime.
    pub fn from_parts(
        locator: Arc<TriangleLocator>,
        triangle_to_cell: Arc<Vec<u32>>,
        values: SharedValues<DIM_OUT>,
    ) -> Result<Self, FieldError>
    {
        if triangle_to_cell.len() != locator.num_triangles()
        {
            return Err(FieldError::CellMapLengthMismatch);
        }
        let num_cells = read_values(&values).len() as u32;
        if triangle_to_cell.iter().any(|&cell| cell >= num_cells)
        {
            return Err(FieldError::CellIndexOutOfRange);
        }
        Ok(Self { locator, triangle_to_cell, values })
    }

    /// Builds a sampler sharing `source`'s locator and triangle-to-cell map,
    /// with either the same data handle or `replacement` if given.
    ///
    /// The replacement's length is not checked against the cell-index range:
    /// a too-short replacement fails with an out-of-range panic at the first
    /// evaluation landing on a missing cell.
    pub fn derive_from(source: &Self, replacement: Option<SharedValues<DIM_OUT>>) -> Self
    {
        Self {
            locator: Arc::clone(&source.locator),
            triangle_to_cell: Arc::clone(&source.triangle_to_cell),
            values: replacement.unwrap_or_else(|| Arc::clone(&source.values)),
        }
    }

    /// Value of the grid cell owning the triangle that contains `(x, y)`,
    /// or the zero array if no triangle does. Total over the whole plane.
    pub fn evaluate(&self, x: f64, y: f64) -> [f64; DIM_OUT]
    {
        match self.locator.locate_one(&[x, y])
        {
            Some(tri) =>
            {
                let cell = self.triangle_to_cell[tri] as usize;
                read_values(&self.values)[cell]
            }
            None => [0.0; DIM_OUT],
        }
    }

    pub fn evaluate_many(&self, points: &[[f64; 2]]) -> Vec<[f64; DIM_OUT]>
    {
        points.iter().map(|p| self.evaluate(p[0], p[1])).collect()
    }

    pub fn par_evaluate_many(&self, points: &[[f64; 2]]) -> Vec<[f64; DIM_OUT]>
    {
        points.par_iter().map(|p| self.evaluate(p[0], p[1])).collect()
    }

    #[inline]
    pub fn num_triangles(&self) -> usize
    {
        self.locator.num_triangles()
    }

    #[inline]
    pub fn num_cells(&self) -> usize
    {
        read_values(&self.values).len()
    }

    #[inline]
    pub fn locator(&self) -> &Arc<TriangleLocator>
    {
        &self.locator
    }

    #[inline]
    pub fn triangle_to_cell(&self) -> &[u32]
    {
        &self.triangle_to_cell
    }

    /// Clone of the shared data handle, for in-place value updates.
    #[inline]
    pub fn values(&self) -> SharedValues<DIM_OUT>
    {
        Arc::clone(&self.values)
    }

    /// Captures the persisted state: data contents, triangle-to-cell map, and
    /// locator, as one bundle.
    pub fn snapshot(&self) -> SamplerSnapshot<DIM_OUT>
    {
        SamplerSnapshot {
            values: read_values(&self.values).clone(),
            triangle_to_cell: self.triangle_to_cell.as_ref().clone(),
            locator: self.locator.as_ref().clone(),
        }
    }

    /// Rebuilds a sampler from a snapshot with fresh shared handles. The
    /// locator is taken from the snapshot as-is, not rebuilt from geometry.
    pub fn restore(snapshot: SamplerSnapshot<DIM_OUT>) -> Result<Self, FieldError>
    {
        Self::from_parts(
            Arc::new(snapshot.locator),
            Arc::new(snapshot.triangle_to_cell),
            shared_values(snapshot.values),
        )
    }

    pub fn write(&self, path: &str, format: SerializationFormat) -> Result<(), FieldError>
    {
        use std::io::Write;
        let mut file = std::io::BufWriter::new(std::fs::File::create(path).map_err(|_| FieldError::FileIOError)?);
        let buffer = self.write_buffer(format)?;
        file.write_all(&buffer).map_err(|_| FieldError::WriteBufferFailed)
    }

    pub fn read<Reader: std::io::Read>(mut reader: Reader, format: SerializationFormat) -> Result<Self, FieldError>
    {
        let mut buffer = Vec::new();
        reader.read_to_end(&mut buffer).map_err(|_| FieldError::ReadBufferFailed)?;
        Self::read_buffer(&buffer, format)
    }

    pub fn write_buffer(&self, format: SerializationFormat) -> Result<Vec<u8>, FieldError>
    {
        serialization::serialize(&self.snapshot(), format)
    }

    pub fn read_buffer(buffer: &[u8], format: SerializationFormat) -> Result<Self, FieldError>
    {
        Self::restore(serialization::deserialize(buffer, format)?)
    }
}

impl ScalarFieldSampler
{
    #[inline]
    pub fn evaluate_scalar(&self, x: f64, y: f64) -> f64
    {
        self.evaluate(x, y)[0]
    }
}

impl VectorFieldSampler
{
    #[inline]
    pub fn evaluate_vector(&self, x: f64, y: f64) -> [f64; 3]
    {
        self.evaluate(x, y)
    }
}

/// Persisted sampler state: exactly (values, triangle-to-cell map, locator).
#[serde_as]
#[derive(Serialize, Deserialize, Clone)]
pub struct SamplerSnapshot<const DIM_OUT: usize>
{
    #[serde_as(as = "Vec<[_; DIM_OUT]>")]
    pub values: Vec<[f64; DIM_OUT]>,
    pub triangle_to_cell: Vec<u32>,
    pub locator: TriangleLocator,
}

// Read access recovers from poisoning: values are plain floats, and a writer
// panicking mid-update cannot leave them structurally invalid.
#[inline]
fn read_values<const DIM_OUT: usize>(values: &SharedValues<DIM_OUT>) -> std::sync::RwLockReadGuard<'_, Vec<[f64; DIM_OUT]>>
{
    values.read().unwrap_or_else(PoisonError::into_inner)
}
