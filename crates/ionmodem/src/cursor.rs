use crate::{Decimal, Int, IonType, RawSymbol, Result, Timestamp};

/// What an advance landed on.
///
/// Between two advances exactly one of these holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawEvent {
    /// A value header was parsed; its content has not been read yet.
    Value(IonType),
    /// The container stepped into has no more children.
    ContainerEnd,
    /// The input has no more top-level values.
    StreamEnd,
}

/// The cursor surface shared by the binary and text readers.
///
/// Content accessors (`read_*`) are only valid while positioned on a value of
/// a matching type and fail with
/// [`IllegalCursorState`](crate::ErrorKind::IllegalCursorState) otherwise.
/// A value's content may be read at most once; advancing without reading it
/// skips it.
pub trait RawReader {
    /// Moves to the next value at the current depth.
    fn next(&mut self) -> Result<RawEvent>;

    /// Descends into the current container value.
    fn step_in(&mut self) -> Result<()>;

    /// Skips the rest of the current container and resumes after it.
    fn step_out(&mut self) -> Result<()>;

    /// Number of containers stepped into.
    fn depth(&self) -> usize;

    /// Whether the current depth is directly inside a struct.
    fn is_in_struct(&self) -> bool;

    /// Type of the current value, or `None` when not on a value.
    fn ion_type(&self) -> Option<IonType>;

    /// Whether the current value is a typed null.
    fn is_null(&self) -> bool;

    /// Whether the current value is the encoding version marker, surfaced as
    /// a symbol.
    fn is_version_marker(&self) -> bool;

    /// Field name of the current value when inside a struct.
    fn field_name(&self) -> Option<&RawSymbol>;

    /// Annotations of the current value, in order, unresolved.
    fn annotations(&mut self) -> Result<Vec<RawSymbol>>;

    /// Reads the current bool.
    fn read_bool(&mut self) -> Result<bool>;

    /// Reads the current int at any magnitude.
    fn read_int(&mut self) -> Result<Int>;

    /// Reads an int that must fit in an `i64`.
    fn read_i64(&mut self) -> Result<i64>;

    /// Reads the current float.
    fn read_f64(&mut self) -> Result<f64>;

    /// Reads the current decimal, keeping the sign of a zero coefficient.
    fn read_decimal(&mut self) -> Result<Decimal>;

    /// Reads the current timestamp in its local fields.
    fn read_timestamp(&mut self) -> Result<Timestamp>;

    /// Reads the current symbol value without resolving it.
    fn read_symbol(&mut self) -> Result<RawSymbol>;

    /// Reads the current string.
    fn read_str(&mut self) -> Result<String>;

    /// Reads the whole body of a blob or clob.
    fn read_lob(&mut self) -> Result<Vec<u8>>;
}
