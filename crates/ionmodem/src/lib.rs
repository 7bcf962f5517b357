//! Raw pull decoders for the two physical Ion encodings.
//!
//! Both [`BinaryReader`] and [`TextReader`] expose the same cursor shape
//! through [`RawReader`]: advance with [`RawReader::next`], inspect the type,
//! field and annotations of the current value without materializing its
//! content, [`RawReader::step_in`] to iterate a container's children and
//! [`RawReader::step_out`] to resume after it.
//!
//! The readers never consult a symbol table. Field names and annotations are
//! surfaced as [`RawSymbol`]s: symbol ids for binary input, and either ids
//! (`$10`) or the literal text for text input.
//!
//! ```rust
//! use ionmodem::{IonType, RawEvent, RawReader, TextReader};
//!
//! let mut reader = TextReader::from_text("foo::bar::5 (1 2 3)");
//! assert_eq!(reader.next().unwrap(), RawEvent::Value(IonType::Int));
//! assert_eq!(reader.annotations().unwrap().len(), 2);
//! assert_eq!(reader.next().unwrap(), RawEvent::Value(IonType::Sexp));
//! reader.step_in().unwrap();
//! let mut sum = 0;
//! while let RawEvent::Value(_) = reader.next().unwrap() {
//!     sum += reader.read_i64().unwrap();
//! }
//! reader.step_out().unwrap();
//! assert_eq!(sum, 6);
//! assert_eq!(reader.next().unwrap(), RawEvent::StreamEnd);
//! ```

mod cursor;
mod descriptor;
mod error;
mod input;
mod options;
mod value;

pub mod binary;
pub mod text;

#[cfg(test)]
mod tests;

pub use binary::BinaryReader;
pub use cursor::{RawEvent, RawReader};
pub use error::{DecodeError, ErrorKind, Position, Result};
pub use options::{ReaderOptions, RootKind};
pub use text::TextReader;
pub use value::{Coefficient, Decimal, Int, IonType, Precision, RawSymbol, Timestamp};

/// Symbol id the version marker is reported as (`$ion_1_0` in the system
/// symbol table).
pub const VERSION_MARKER_SID: u64 = 2;
