#![expect(missing_docs)]

mod common;

use common::render;
use ionmodem::{BinaryReader, ReaderOptions, TextReader};

const TEXT: &str = r#"
$ion_1_0
greeting::"hello"
{
  name: 'Ada',
  "born": 2007-02-23T12:14Z,
  ratio: 1.50,
  tiny: -0.0,
  weight: 2.5e0,
  tags: [math, poet::'''long''' /* joined */ '''er'''],
  nothing: null.list,
  code: (+ 1 $10),
  raw: {{ aGk= }},
}
"#;

#[test]
fn snapshot_text_stream() {
    let rendered = render(&mut TextReader::from_text(TEXT));
    insta::assert_snapshot!(rendered, @r#"
    symbol $2 (version marker)
    greeting::string "hello"
    struct
      name: symbol Ada
      born: timestamp 2007-02-23T12:14:00 (Minute, offset Some(0))
      ratio: decimal 150d-2
      tiny: decimal -0d-1
      weight: float 2.5
      tags: list
        symbol math
        poet::string "longer"
      end
      nothing: null.list
      code: sexp
        symbol +
        int 1
        symbol $10
      end
      raw: blob [104, 105]
    end
    end of stream
    "#);
}

#[test]
fn snapshot_text_stream_in_small_chunks() {
    let options = ReaderOptions {
        chunk_size: 1,
        max_skip: 1,
        ..ReaderOptions::default()
    };
    let chunked = render(&mut TextReader::with_options(TEXT.as_bytes(), options));
    assert_eq!(chunked, render(&mut TextReader::from_text(TEXT)));
}

#[test]
fn snapshot_text_error() {
    insta::assert_snapshot!(render(&mut TextReader::from_text("(1, 2)")), @r"
    sexp
      int 1
    error: syntax error: unexpected ',' in state BeforeAnnotationSexp at 1:4 (offset 3)
    ");
}

const BINARY: &[u8] = &[
    0xE0, 0x01, 0x00, 0xEA, // version marker
    0xE4, 0x81, 0x84, 0x21, 0x07, // $4::7
    0xD6, 0x8A, 0x21, 0x01, 0x8B, 0x81, 0x61, // {$10: 1, $11: "a"}
    0xB3, 0x10, 0x11, 0x0F, // [false, true, null]
    0x52, 0xC1, 0x0F, // 15d-1
    0x48, 0x40, 0x09, 0x21, 0xFB, 0x54, 0x44, 0x2D, 0x18, // pi
    0x2F, // null.int
    0xA2, 0x68, 0x69, // {{ aGk= }}
];

#[test]
fn snapshot_binary_stream() {
    insta::assert_snapshot!(render(&mut BinaryReader::from_slice(BINARY)), @r#"
    symbol $2 (version marker)
    $4::int 7
    struct
      $10: int 1
      $11: string "a"
    end
    list
      bool false
      bool true
      null
    end
    decimal 15d-1
    float 3.141592653589793
    null.int
    blob [104, 105]
    end of stream
    "#);
}
