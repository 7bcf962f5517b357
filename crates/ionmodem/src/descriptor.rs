//! The "current value" record both readers populate.

use crate::{IonType, RawSymbol};

/// How much of the current value's content the caller has consumed.
///
/// Readers consult this at the top of every advance to decide how much of
/// the previous value still has to be skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) enum Content {
    /// Nothing read yet; advancing must skip the whole body.
    #[default]
    Unread,
    /// Part of a lob body was read in chunks.
    Partial { consumed: usize },
    /// Fully read, stepped into, or never had a body.
    Consumed,
}

/// The value the cursor is positioned on.
///
/// `A` is the encoding's annotation storage: a save point over the
/// annotation bytes for binary input, the accumulated symbols for text.
#[derive(Debug, Default)]
pub(crate) struct ValueDescriptor<A> {
    pub(crate) ion_type: Option<IonType>,
    pub(crate) is_null: bool,
    /// Length of the body in bytes. Zero for null and bool.
    pub(crate) raw_length: usize,
    /// `None` outside structs; distinct from symbol id 0.
    pub(crate) field: Option<RawSymbol>,
    pub(crate) annotations: A,
    pub(crate) version_marker: bool,
    pub(crate) content: Content,
}

impl<A: Default> ValueDescriptor<A> {
    pub(crate) fn reset(&mut self) {
        *self = Self::default();
    }

    /// Bytes of the body not yet consumed.
    pub(crate) fn unread_length(&self) -> usize {
        match self.content {
            Content::Unread => self.raw_length,
            Content::Partial { consumed } => self.raw_length.saturating_sub(consumed),
            Content::Consumed => 0,
        }
    }

    /// `true` when positioned on a non-null container.
    pub(crate) fn is_steppable(&self) -> bool {
        !self.is_null && self.ion_type.is_some_and(IonType::is_container)
    }
}
