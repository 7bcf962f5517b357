/// Configuration shared by [`BinaryReader`](crate::BinaryReader) and
/// [`TextReader`](crate::TextReader).
///
/// # Default
///
/// 4 KiB refills, 64 KiB skip chunks, rooted at the datagram.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReaderOptions {
    /// How many bytes to request from the underlying reader per refill.
    ///
    /// # Default
    ///
    /// `4096`
    pub chunk_size: usize,

    /// Upper bound on the distance covered by a single skip over the
    /// underlying reader.
    ///
    /// Skipping past a large unread value is performed as a sequence of skips
    /// of at most this many bytes.
    ///
    /// # Default
    ///
    /// `65536`
    pub max_skip: usize,

    /// The container the text reader is rooted in.
    ///
    /// With anything other than [`RootKind::Datagram`] the reader parses a
    /// single value that was lifted out of a container of that kind. The
    /// synthetic outer container is invisible: the value is reported at depth
    /// 0 with no field name, and the container's separator or closing
    /// delimiter after it ends the stream.
    ///
    /// Ignored by the binary reader, whose input is always length-delimited.
    ///
    /// # Default
    ///
    /// [`RootKind::Datagram`]
    pub root: RootKind,
}

impl Default for ReaderOptions {
    fn default() -> Self {
        Self {
            chunk_size: 4096,
            max_skip: 64 * 1024,
            root: RootKind::Datagram,
        }
    }
}

/// What a reader's outermost frame represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RootKind {
    /// A stream of top-level values.
    #[default]
    Datagram,
    /// A single value originally contained in a struct.
    Struct,
    /// A single value originally contained in a list.
    List,
    /// A single value originally contained in an s-expression.
    Sexp,
}
