//! A small value model with both encodings, used to drive the readers from
//! generated input.

use std::fmt::Write;

use quickcheck::{Arbitrary, Gen};

use crate::{IonType, RawEvent, RawReader, binary::varint::encode_var_uint};

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Node {
    pub(crate) annotations: Vec<u64>,
    pub(crate) kind: Kind,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Kind {
    Null,
    Bool(bool),
    Int(i64),
    Symbol(u64),
    String(String),
    List(Vec<Node>),
    Sexp(Vec<Node>),
    Struct(Vec<(u64, Node)>),
}

fn sid(g: &mut Gen) -> u64 {
    u64::from(u16::arbitrary(g))
}

impl Arbitrary for Node {
    fn arbitrary(g: &mut Gen) -> Self {
        fn gen_node(g: &mut Gen, depth: usize) -> Node {
            let annotations = (0..usize::arbitrary(g) % 3).map(|_| sid(g)).collect();
            let choices = if depth == 0 { 5 } else { 8 };
            let kind = match usize::arbitrary(g) % choices {
                0 => Kind::Null,
                1 => Kind::Bool(bool::arbitrary(g)),
                2 => Kind::Int(i64::arbitrary(g)),
                3 => Kind::Symbol(sid(g)),
                4 => Kind::String(String::arbitrary(g)),
                5 => Kind::List(children(g, depth)),
                6 => Kind::Sexp(children(g, depth)),
                _ => {
                    let len = usize::arbitrary(g) % 4;
                    Kind::Struct((0..len).map(|_| (sid(g), gen_node(g, depth - 1))).collect())
                }
            };
            Node { annotations, kind }
        }

        fn children(g: &mut Gen, depth: usize) -> Vec<Node> {
            let len = usize::arbitrary(g) % 4;
            (0..len).map(|_| gen_node(g, depth - 1)).collect()
        }

        let depth = usize::arbitrary(g) % 3;
        gen_node(g, depth)
    }
}

/// Writes a type descriptor for `body` followed by `body`.
fn typed(type_code: u8, body: &[u8], out: &mut Vec<u8>) {
    match u8::try_from(body.len()) {
        Ok(len) if len < 14 => out.push((type_code << 4) | len),
        _ => {
            out.push((type_code << 4) | 14);
            encode_var_uint(body.len() as u64, out);
        }
    }
    out.extend_from_slice(body);
}

fn magnitude(type_code: u8, value: u64, out: &mut Vec<u8>) {
    let bytes = value.to_be_bytes();
    let zeros = bytes.iter().take_while(|&&b| b == 0).count();
    typed(type_code, &bytes[zeros..], out);
}

fn quote(text: &str, out: &mut String) {
    out.push('"');
    for c in text.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            c if c.is_control() && u32::from(c) < 0x80 => {
                let _ = write!(out, "\\x{:02x}", u32::from(c));
            }
            c => out.push(c),
        }
    }
    out.push('"');
}

impl Node {
    pub(crate) fn scalar(kind: Kind) -> Self {
        Self {
            annotations: Vec::new(),
            kind,
        }
    }

    pub(crate) fn to_binary(&self, out: &mut Vec<u8>) {
        if self.annotations.is_empty() {
            self.kind.to_binary(out);
            return;
        }
        let mut sids = Vec::new();
        for &sid in &self.annotations {
            encode_var_uint(sid, &mut sids);
        }
        let mut body = Vec::new();
        encode_var_uint(sids.len() as u64, &mut body);
        body.extend(sids);
        self.kind.to_binary(&mut body);
        typed(0xE, &body, out);
    }

    pub(crate) fn to_text(&self, out: &mut String) {
        for sid in &self.annotations {
            let _ = write!(out, "${sid}::");
        }
        match &self.kind {
            Kind::Null => out.push_str("null"),
            Kind::Bool(value) => {
                let _ = write!(out, "{value}");
            }
            Kind::Int(value) => {
                let _ = write!(out, "{value}");
            }
            Kind::Symbol(sid) => {
                let _ = write!(out, "${sid}");
            }
            Kind::String(text) => quote(text, out),
            Kind::List(children) => {
                out.push('[');
                for (i, child) in children.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    child.to_text(out);
                }
                out.push(']');
            }
            Kind::Sexp(children) => {
                out.push('(');
                for (i, child) in children.iter().enumerate() {
                    if i > 0 {
                        out.push(' ');
                    }
                    child.to_text(out);
                }
                out.push(')');
            }
            Kind::Struct(fields) => {
                out.push('{');
                for (i, (sid, child)) in fields.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    let _ = write!(out, "${sid}: ");
                    child.to_text(out);
                }
                out.push('}');
            }
        }
    }

    /// The events [`trace`] should record for this node.
    pub(crate) fn expected(&self, field: Option<u64>, depth: usize, out: &mut Vec<String>) {
        let mut line = format!("{depth} ");
        if let Some(sid) = field {
            let _ = write!(line, "${sid}: ");
        }
        for sid in &self.annotations {
            let _ = write!(line, "${sid}::");
        }
        match &self.kind {
            Kind::Null => line.push_str("null"),
            Kind::Bool(value) => {
                let _ = write!(line, "bool {value}");
            }
            Kind::Int(value) => {
                let _ = write!(line, "int {value}");
            }
            Kind::Symbol(sid) => {
                let _ = write!(line, "symbol ${sid}");
            }
            Kind::String(text) => {
                let _ = write!(line, "string {text:?}");
            }
            Kind::List(children) | Kind::Sexp(children) => {
                let name = if matches!(self.kind, Kind::List(_)) { "list" } else { "sexp" };
                let _ = write!(line, "{name}");
                out.push(line);
                for child in children {
                    child.expected(None, depth + 1, out);
                }
                out.push(format!("{depth} end"));
                return;
            }
            Kind::Struct(fields) => {
                line.push_str("struct");
                out.push(line);
                for (sid, child) in fields {
                    child.expected(Some(*sid), depth + 1, out);
                }
                out.push(format!("{depth} end"));
                return;
            }
        }
        out.push(line);
    }
}

impl Kind {
    fn to_binary(&self, out: &mut Vec<u8>) {
        match self {
            Self::Null => out.push(0x0F),
            Self::Bool(value) => out.push(0x10 | u8::from(*value)),
            Self::Int(value) => {
                let type_code = if *value < 0 { 0x3 } else { 0x2 };
                magnitude(type_code, value.unsigned_abs(), out);
            }
            Self::Symbol(sid) => magnitude(0x7, *sid, out),
            Self::String(text) => typed(0x8, text.as_bytes(), out),
            Self::List(children) | Self::Sexp(children) => {
                let mut body = Vec::new();
                for child in children {
                    child.to_binary(&mut body);
                }
                let type_code = if matches!(self, Self::List(_)) { 0xB } else { 0xC };
                typed(type_code, &body, out);
            }
            Self::Struct(fields) => {
                let mut body = Vec::new();
                for (sid, child) in fields {
                    encode_var_uint(*sid, &mut body);
                    child.to_binary(&mut body);
                }
                typed(0xD, &body, out);
            }
        }
    }
}

pub(crate) fn binary(nodes: &[Node]) -> Vec<u8> {
    let mut out = Vec::new();
    for node in nodes {
        node.to_binary(&mut out);
    }
    out
}

pub(crate) fn text(nodes: &[Node]) -> String {
    let mut out = String::new();
    for node in nodes {
        node.to_text(&mut out);
        out.push('\n');
    }
    out
}

pub(crate) fn expected(nodes: &[Node]) -> Vec<String> {
    let mut out = Vec::new();
    for node in nodes {
        node.expected(None, 0, &mut out);
    }
    out
}

/// Describes the current value in the same shape as [`Node::expected`],
/// reading its content.
pub(crate) fn describe<R: RawReader>(reader: &mut R, ion_type: IonType) -> crate::Result<String> {
    let mut line = format!("{} ", reader.depth());
    if let Some(field) = reader.field_name() {
        let _ = write!(line, "{field}: ");
    }
    for annotation in reader.annotations()? {
        let _ = write!(line, "{annotation}::");
    }
    match ion_type {
        IonType::Null => line.push_str("null"),
        IonType::Bool => {
            let _ = write!(line, "bool {}", reader.read_bool()?);
        }
        IonType::Int => {
            let _ = write!(line, "int {}", reader.read_i64()?);
        }
        IonType::Symbol => {
            let _ = write!(line, "symbol {}", reader.read_symbol()?);
        }
        IonType::String => {
            let _ = write!(line, "string {:?}", reader.read_str()?);
        }
        other => line.push_str(other.name()),
    }
    Ok(line)
}

/// Reads every value of the stream, stepping into every container.
pub(crate) fn trace<R: RawReader>(reader: &mut R) -> crate::Result<Vec<String>> {
    let mut events = Vec::new();
    loop {
        match reader.next()? {
            RawEvent::StreamEnd => return Ok(events),
            RawEvent::ContainerEnd => {
                reader.step_out()?;
                events.push(format!("{} end", reader.depth()));
            }
            RawEvent::Value(ion_type) => {
                events.push(describe(reader, ion_type)?);
                if ion_type.is_container() {
                    reader.step_in()?;
                }
            }
        }
    }
}
