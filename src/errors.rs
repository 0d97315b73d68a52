use std::fmt::Display;

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum FieldError
{
    EmptyMesh,
    TriangleVertexOutOfRange,
    CellMapLengthMismatch,
    CellIndexOutOfRange,
    ComponentLengthMismatch,
    LZ4DecompressionFailed,
    ReadBufferFailed,
    WriteBufferFailed,
    SerializationFailed,
    DeserializationFailed,
    FileIOError
}
impl std::error::Error for FieldError {}

impl Display for FieldError
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", *self)
    }
}
