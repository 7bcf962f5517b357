//! The text grammar as a static `(state, token) -> action` table.
//!
//! The table only decides what a token means where it appears. Everything
//! that needs more than the token kind (field name colons, `::` lookahead,
//! matching closers, hoisting) is left to the reader.

use super::tokenizer::TokenKind;

/// Where in the grammar the reader is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum State {
    BeforeAnnotationDatagram,
    BeforeAnnotationContained,
    BeforeAnnotationSexp,
    BeforeFieldName,
    BeforeFieldValue,
    AfterValueContained,
    InClobDoubleQuoted,
    InClobTripleQuoted,
    InBlob,
    Eof,
}

impl State {
    const COUNT: usize = 10;

    pub(crate) fn name(self) -> &'static str {
        match self {
            Self::BeforeAnnotationDatagram => "BeforeAnnotationDatagram",
            Self::BeforeAnnotationContained => "BeforeAnnotationContained",
            Self::BeforeAnnotationSexp => "BeforeAnnotationSexp",
            Self::BeforeFieldName => "BeforeFieldName",
            Self::BeforeFieldValue => "BeforeFieldValue",
            Self::AfterValueContained => "AfterValueContained",
            Self::InClobDoubleQuoted => "InClobDoubleQuoted",
            Self::InClobTripleQuoted => "InClobTripleQuoted",
            Self::InBlob => "InBlob",
            Self::Eof => "Eof",
        }
    }

    pub(crate) fn is_lob(self) -> bool {
        matches!(
            self,
            Self::InClobDoubleQuoted | Self::InClobTripleQuoted | Self::InBlob
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Action {
    Error,
    LoadFieldName,
    /// A symbol that is either an annotation or the value itself.
    LoadAnnotation,
    StartStruct,
    StartList,
    StartSexp,
    StartLob,
    LoadScalar,
    InterpretComma,
    FinishContainer,
    FinishLob,
    FinishDatagram,
}

type Table = [[Action; TokenKind::COUNT]; State::COUNT];

static ACTIONS: Table = build_actions();

const SCALARS: &[TokenKind] = &[
    TokenKind::Number,
    TokenKind::Timestamp,
    TokenKind::PlusInf,
    TokenKind::MinusInf,
    TokenKind::String,
    TokenKind::LongString,
];

const SYMBOLS: &[TokenKind] = &[TokenKind::SymbolIdentifier, TokenKind::SymbolQuoted];

const CLOSERS: &[TokenKind] = &[
    TokenKind::CloseParen,
    TokenKind::CloseBracket,
    TokenKind::CloseBrace,
];

const FIELD_NAMES: &[TokenKind] = &[
    TokenKind::SymbolIdentifier,
    TokenKind::SymbolQuoted,
    TokenKind::String,
    TokenKind::LongString,
];

const fn set(table: &mut Table, state: State, kinds: &[TokenKind], action: Action) {
    let mut i = 0;
    while i < kinds.len() {
        table[state as usize][kinds[i] as usize] = action;
        i += 1;
    }
}

/// Everything that may start a value.
const fn set_values(table: &mut Table, state: State) {
    set(table, state, SCALARS, Action::LoadScalar);
    set(table, state, SYMBOLS, Action::LoadAnnotation);
    set(table, state, &[TokenKind::OpenParen], Action::StartSexp);
    set(table, state, &[TokenKind::OpenBracket], Action::StartList);
    set(table, state, &[TokenKind::OpenBrace], Action::StartStruct);
    set(table, state, &[TokenKind::OpenLob], Action::StartLob);
}

const fn build_actions() -> Table {
    let mut table = [[Action::Error; TokenKind::COUNT]; State::COUNT];

    set_values(&mut table, State::BeforeAnnotationDatagram);
    set(
        &mut table,
        State::BeforeAnnotationDatagram,
        &[TokenKind::Eof],
        Action::FinishDatagram,
    );

    set_values(&mut table, State::BeforeAnnotationContained);
    set(&mut table, State::BeforeAnnotationContained, CLOSERS, Action::FinishContainer);

    set_values(&mut table, State::BeforeAnnotationSexp);
    set(
        &mut table,
        State::BeforeAnnotationSexp,
        &[TokenKind::SymbolOperator],
        Action::LoadScalar,
    );
    set(&mut table, State::BeforeAnnotationSexp, CLOSERS, Action::FinishContainer);

    set(&mut table, State::BeforeFieldName, FIELD_NAMES, Action::LoadFieldName);
    set(&mut table, State::BeforeFieldName, CLOSERS, Action::FinishContainer);

    set_values(&mut table, State::BeforeFieldValue);

    set(
        &mut table,
        State::AfterValueContained,
        &[TokenKind::Comma],
        Action::InterpretComma,
    );
    set(&mut table, State::AfterValueContained, CLOSERS, Action::FinishContainer);

    set(&mut table, State::InClobDoubleQuoted, &[TokenKind::CloseLob], Action::FinishLob);
    set(&mut table, State::InClobTripleQuoted, &[TokenKind::CloseLob], Action::FinishLob);
    set(&mut table, State::InBlob, &[TokenKind::CloseLob], Action::FinishLob);

    set(&mut table, State::Eof, &[TokenKind::Eof], Action::FinishDatagram);
    table
}

#[inline]
pub(crate) fn action(state: State, kind: TokenKind) -> Action {
    ACTIONS[state as usize][kind as usize]
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(State::BeforeAnnotationDatagram, TokenKind::Eof, Action::FinishDatagram)]
    #[case(State::BeforeAnnotationDatagram, TokenKind::CloseParen, Action::Error)]
    #[case(State::BeforeAnnotationDatagram, TokenKind::SymbolOperator, Action::Error)]
    #[case(State::BeforeAnnotationDatagram, TokenKind::SymbolQuoted, Action::LoadAnnotation)]
    #[case(State::BeforeAnnotationContained, TokenKind::OpenLob, Action::StartLob)]
    #[case(State::BeforeAnnotationContained, TokenKind::Comma, Action::Error)]
    #[case(State::BeforeAnnotationContained, TokenKind::Eof, Action::Error)]
    #[case(State::BeforeAnnotationSexp, TokenKind::SymbolOperator, Action::LoadScalar)]
    #[case(State::BeforeAnnotationSexp, TokenKind::Comma, Action::Error)]
    #[case(State::BeforeAnnotationSexp, TokenKind::CloseBrace, Action::FinishContainer)]
    #[case(State::BeforeFieldName, TokenKind::LongString, Action::LoadFieldName)]
    #[case(State::BeforeFieldName, TokenKind::Number, Action::Error)]
    #[case(State::BeforeFieldValue, TokenKind::OpenBrace, Action::StartStruct)]
    #[case(State::BeforeFieldValue, TokenKind::CloseBrace, Action::Error)]
    #[case(State::AfterValueContained, TokenKind::Comma, Action::InterpretComma)]
    #[case(State::AfterValueContained, TokenKind::Number, Action::Error)]
    #[case(State::InBlob, TokenKind::CloseLob, Action::FinishLob)]
    #[case(State::InClobTripleQuoted, TokenKind::CloseBrace, Action::Error)]
    #[case(State::Eof, TokenKind::Eof, Action::FinishDatagram)]
    fn transitions(#[case] state: State, #[case] kind: TokenKind, #[case] expected: Action) {
        assert_eq!(action(state, kind), expected);
    }

    #[test]
    fn lob_states() {
        assert!(State::InBlob.is_lob());
        assert!(State::InClobDoubleQuoted.is_lob());
        assert!(!State::BeforeFieldValue.is_lob());
        assert_eq!(State::Eof as usize + 1, State::COUNT);
    }
}
