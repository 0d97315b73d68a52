//! Point-location field sampling on unstructured triangular meshes.
//!
//! A [`sampler::FieldSampler`] maps a 2D query point to the data value of the
//! grid cell owning the enclosing mesh triangle, as used by plasma-simulation
//! data readers where a fine triangulation carries values defined on a
//! coarser grid partition. Scalar and vector fields share one generic
//! implementation; the expensive spatial index can be shared between samplers
//! while the data payload is swapped out per instance.

pub mod errors;
pub mod locator;
pub mod mesh;
pub mod sampler;
pub mod serialization;
