//! Snapshot persistence for samplers and locators.
//!
//! The persisted sampler state is exactly (values, triangle-to-cell map,
//! locator); see [`crate::sampler::SamplerSnapshot`]. Restoring a snapshot
//! reproduces identical query behavior without rebuilding the locator from
//! raw geometry.

use crate::errors::FieldError;
use serde::{de::DeserializeOwned, Serialize};

/// Serialization format options for snapshot data.
///
/// Each format has both compressed (Lz4) and uncompressed variants.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SerializationFormat {
    /// JSON format - human readable, larger size, widest compatibility
    Json,
    /// JSON format with LZ4 compression
    JsonLz4,
    /// Bitcode format - compact binary, good performance
    Bitcode,
    /// Bitcode format with LZ4 compression (default, best balance of size and speed)
    #[default]
    BitcodeLz4,
}

impl SerializationFormat {
    /// Returns true if this format uses LZ4 compression
    pub fn is_compressed(&self) -> bool {
        matches!(self, SerializationFormat::JsonLz4 | SerializationFormat::BitcodeLz4)
    }
}

fn serialize_serde<T: Serialize>(data: &T, format: SerializationFormat) -> Result<Vec<u8>, FieldError> {
    match format {
        SerializationFormat::Json | SerializationFormat::JsonLz4 => {
            serde_json::to_vec(data).map_err(|_| FieldError::SerializationFailed)
        }
        SerializationFormat::Bitcode | SerializationFormat::BitcodeLz4 => {
            bitcode::serialize(data).map_err(|_| FieldError::SerializationFailed)
        }
    }
}

fn deserialize_serde<T: DeserializeOwned>(data: &[u8], format: SerializationFormat) -> Result<T, FieldError> {
    match format {
        SerializationFormat::Json | SerializationFormat::JsonLz4 => {
            serde_json::from_slice(data).map_err(|_| FieldError::DeserializationFailed)
        }
        SerializationFormat::Bitcode | SerializationFormat::BitcodeLz4 => {
            bitcode::deserialize(data).map_err(|_| FieldError::DeserializationFailed)
        }
    }
}

/// Serialize data to bytes using the specified format.
/// Applies LZ4 compression if the format variant ends with Lz4.
pub fn serialize<T: Serialize>(data: &T, format: SerializationFormat) -> Result<Vec<u8>, FieldError> {
    let bytes = serialize_serde(data, format)?;
    if format.is_compressed() {
        Ok(lz4_flex::compress_prepend_size(&bytes))
    } else {
        Ok(bytes)
    }
}

/// Deserialize data from bytes using the specified format.
/// Applies LZ4 decompression if the format variant ends with Lz4.
pub fn deserialize<T: DeserializeOwned>(data: &[u8], format: SerializationFormat) -> Result<T, FieldError> {
    if format.is_compressed() {
        let decompressed = lz4_flex::decompress_size_prepended(data)
            .map_err(|_| FieldError::LZ4DecompressionFailed)?;
        deserialize_serde(&decompressed, format)
    } else {
        deserialize_serde(data, format)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sampler::{scalar_values, vector_values_from_rows, ScalarFieldSampler, VectorFieldSampler};

    const FORMATS: [SerializationFormat; 4] = [
        SerializationFormat::Json,
        SerializationFormat::JsonLz4,
        SerializationFormat::Bitcode,
        SerializationFormat::BitcodeLz4,
    ];

    #[derive(serde::Serialize, serde::Deserialize, Debug, PartialEq)]
    struct TestData {
        values: Vec<f64>,
        name: String,
    }

    #[test]
    fn test_format_roundtrips() {
        let data = TestData {
            values: vec![1.0, 2.0, 3.0],
            name: "test".to_string(),
        };
        for format in FORMATS {
            let bytes = serialize(&data, format).unwrap();
            let result: TestData = deserialize(&bytes, format).unwrap();
            assert_eq!(data, result);
        }
    }

    #[test]
    fn test_corrupt_compressed_buffer() {
        let data = TestData { values: vec![1.0], name: "x".to_string() };
        let mut bytes = serialize(&data, SerializationFormat::BitcodeLz4).unwrap();
        bytes.truncate(2);
        let result: Result<TestData, _> = deserialize(&bytes, SerializationFormat::BitcodeLz4);
        assert_eq!(result.unwrap_err(), FieldError::LZ4DecompressionFailed);
    }

    fn probe_points() -> Vec<[f64; 2]> {
        vec![[0.5, 0.5], [0.9, 0.1], [0.1, 0.9], [0.0, 0.0], [1.0, 1.0], [3.0, -2.0]]
    }

    #[test]
    fn test_scalar_sampler_roundtrip() {
        let points = [[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]];
        let triangles = [[0u32, 1, 2], [0, 2, 3]];
        let sampler =
            ScalarFieldSampler::new(&points, &triangles, &[1u32, 0], scalar_values(&[3.0, 8.0])).unwrap();
        for format in FORMATS {
            let bytes = sampler.write_buffer(format).unwrap();
            let restored = ScalarFieldSampler::read_buffer(&bytes, format).unwrap();
            for p in probe_points() {
                assert_eq!(restored.evaluate(p[0], p[1]), sampler.evaluate(p[0], p[1]));
            }
        }
    }

    #[test]
    fn test_vector_sampler_roundtrip() {
        let points = [[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]];
        let triangles = [[0u32, 1, 2], [0, 2, 3]];
        let data = vector_values_from_rows(&[1.0, 4.0], &[2.0, 5.0], &[3.0, 6.0]).unwrap();
        let sampler = VectorFieldSampler::new(&points, &triangles, &[0u32, 1], data).unwrap();
        let bytes = sampler.write_buffer(SerializationFormat::default()).unwrap();
        let restored = VectorFieldSampler::read_buffer(&bytes, SerializationFormat::default()).unwrap();
        for p in probe_points() {
            assert_eq!(restored.evaluate(p[0], p[1]), sampler.evaluate(p[0], p[1]));
        }
    }

    #[test]
    fn test_file_roundtrip() {
        let points = [[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]];
        let triangles = [[0u32, 1, 2], [0, 2, 3]];
        let sampler =
            ScalarFieldSampler::new(&points, &triangles, &[0u32, 0], scalar_values(&[42.0])).unwrap();
        let path = std::env::temp_dir().join("trifield_sampler_roundtrip.bin");
        let path = path.to_str().unwrap();
        sampler.write(path, SerializationFormat::Bitcode).unwrap();
        let restored = ScalarFieldSampler::read(
            std::fs::File::open(path).unwrap(),
            SerializationFormat::Bitcode,
        )
        .unwrap();
        assert_eq!(restored.evaluate_scalar(0.5, 0.5), 42.0);
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_restored_sampler_is_independent() {
        // The snapshot carries value contents, not the shared handle.
        let points = [[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]];
        let triangles = [[0u32, 1, 2], [0, 2, 3]];
        let data = scalar_values(&[42.0]);
        let sampler = ScalarFieldSampler::new(&points, &triangles, &[0u32, 0], data.clone()).unwrap();
        let restored = ScalarFieldSampler::restore(sampler.snapshot()).unwrap();
        data.write().unwrap()[0] = [7.0];
        assert_eq!(sampler.evaluate_scalar(0.5, 0.5), 7.0);
        assert_eq!(restored.evaluate_scalar(0.5, 0.5), 42.0);
    }
}
