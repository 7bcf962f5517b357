#![expect(missing_docs)]

use ionmodem::{
    BinaryReader, ErrorKind, IonType, RawEvent, RawReader, RawSymbol, ReaderOptions, RootKind,
    TextReader, VERSION_MARKER_SID,
};
use rstest::rstest;

#[test]
fn binary_version_marker_alone() {
    let mut reader = BinaryReader::from_slice(&[0xE0, 0x01, 0x00, 0xEA]);
    assert_eq!(reader.next().unwrap(), RawEvent::Value(IonType::Symbol));
    assert!(reader.is_version_marker());
    assert_eq!(reader.read_symbol().unwrap(), RawSymbol::Id(VERSION_MARKER_SID));
    assert_eq!(reader.next().unwrap(), RawEvent::StreamEnd);
}

#[test]
fn binary_struct_with_one_field() {
    let mut reader = BinaryReader::from_slice(&[0xD3, 0x84, 0x81, b'x']);
    assert_eq!(reader.next().unwrap(), RawEvent::Value(IonType::Struct));
    reader.step_in().unwrap();
    assert!(reader.is_in_struct());
    assert_eq!(reader.next().unwrap(), RawEvent::Value(IonType::String));
    assert_eq!(reader.field_name(), Some(&RawSymbol::Id(4)));
    assert_eq!(reader.field_id(), Some(4));
    assert_eq!(reader.read_str().unwrap(), "x");
    assert_eq!(reader.next().unwrap(), RawEvent::ContainerEnd);
    reader.step_out().unwrap();
    assert_eq!(reader.depth(), 0);
    assert_eq!(reader.next().unwrap(), RawEvent::StreamEnd);
}

#[test]
fn text_annotations_stay_raw() {
    let mut reader = TextReader::from_text("foo::bar::5");
    assert_eq!(reader.next().unwrap(), RawEvent::Value(IonType::Int));
    assert_eq!(
        reader.annotations().unwrap(),
        [RawSymbol::from("foo"), RawSymbol::from("bar")]
    );
    assert_eq!(reader.read_i64().unwrap(), 5);
    assert_eq!(reader.next().unwrap(), RawEvent::StreamEnd);
}

#[test]
fn text_sexp_of_ints() {
    let mut reader = TextReader::from_text("(1 2 3)");
    assert_eq!(reader.next().unwrap(), RawEvent::Value(IonType::Sexp));
    reader.step_in().unwrap();
    let mut ints = Vec::new();
    while let RawEvent::Value(IonType::Int) = reader.next().unwrap() {
        ints.push(reader.read_i64().unwrap());
    }
    reader.step_out().unwrap();
    assert_eq!(ints, [1, 2, 3]);
    assert_eq!(reader.next().unwrap(), RawEvent::StreamEnd);
}

#[rstest]
#[case("(, 1 2 3)")]
#[case("(1, 2 3)")]
#[case("(1 2 3,)")]
#[case("((1 2), 3)")]
fn text_comma_in_sexp(#[case] text: &str) {
    let mut reader = TextReader::from_text(text);
    let err = loop {
        match reader.next() {
            Ok(RawEvent::Value(ion_type)) if ion_type.is_container() => {
                reader.step_in().unwrap();
            }
            Ok(RawEvent::ContainerEnd) => reader.step_out().unwrap(),
            Ok(RawEvent::StreamEnd) => panic!("{text} was accepted"),
            Ok(RawEvent::Value(_)) => {}
            Err(err) => break err,
        }
    };
    assert!(
        matches!(err.kind(), ErrorKind::SyntaxError { token: "','", .. }),
        "{err}"
    );
}

#[test]
fn text_blob() {
    let mut reader = TextReader::from_text("{{ aGVsbG8= }}");
    assert_eq!(reader.next().unwrap(), RawEvent::Value(IonType::Blob));
    assert_eq!(reader.read_lob().unwrap(), b"hello");
    assert_eq!(reader.next().unwrap(), RawEvent::StreamEnd);
}

#[test]
fn text_typed_null() {
    let mut reader = TextReader::from_text("null.struct");
    assert_eq!(reader.next().unwrap(), RawEvent::Value(IonType::Struct));
    assert!(reader.is_null());
    assert_eq!(reader.ion_type(), Some(IonType::Struct));
    assert_eq!(reader.next().unwrap(), RawEvent::StreamEnd);
}

#[test]
fn text_long_string_segments() {
    let mut reader = TextReader::from_text("'''a''' '''b'''");
    assert_eq!(reader.next().unwrap(), RawEvent::Value(IonType::String));
    assert_eq!(reader.read_str().unwrap(), "ab");
    assert_eq!(reader.next().unwrap(), RawEvent::StreamEnd);
}

#[rstest]
#[case(RootKind::Struct, "1 }")]
#[case(RootKind::List, "1, 2]")]
#[case(RootKind::Sexp, "1 2)")]
fn hoisted_reader_stops_after_one_value(#[case] root: RootKind, #[case] text: &str) {
    let options = ReaderOptions {
        root,
        ..ReaderOptions::default()
    };
    let mut reader = TextReader::with_options(text.as_bytes(), options);
    assert_eq!(reader.next().unwrap(), RawEvent::Value(IonType::Int));
    assert_eq!(reader.depth(), 0);
    assert!(!reader.is_in_struct());
    assert_eq!(reader.read_i64().unwrap(), 1);
    assert_eq!(reader.next().unwrap(), RawEvent::StreamEnd);
}

#[test]
fn readers_work_over_io_sources() {
    let bytes = std::io::Cursor::new(vec![0xB2, 0x21, 0x07]);
    let mut reader = BinaryReader::new(bytes);
    assert_eq!(reader.next().unwrap(), RawEvent::Value(IonType::List));
    reader.step_in().unwrap();
    assert_eq!(reader.next().unwrap(), RawEvent::Value(IonType::Int));
    assert_eq!(reader.read_i64().unwrap(), 7);

    let text = std::io::Cursor::new(b"[7]".to_vec());
    let mut reader = TextReader::new(text);
    assert_eq!(reader.next().unwrap(), RawEvent::Value(IonType::List));
    reader.step_in().unwrap();
    assert_eq!(reader.next().unwrap(), RawEvent::Value(IonType::Int));
    assert_eq!(reader.read_i64().unwrap(), 7);
}
