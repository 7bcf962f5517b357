#![no_main]

use arbitrary::Arbitrary;
use ionmodem::{BinaryReader, IonType, RawEvent, RawReader, ReaderOptions, RootKind, TextReader};
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
enum Root {
    Datagram,
    Struct,
    List,
    Sexp,
}

#[derive(Debug, Arbitrary)]
struct Case {
    text: bool,
    root: Root,
    chunk_size: u8,
    max_skip: u8,
    /// Per container: read it (even), or skip it (odd).
    plan: Vec<u8>,
    data: Vec<u8>,
}

fn read_scalar<R: RawReader>(reader: &mut R, ion_type: IonType) -> ionmodem::Result<()> {
    if reader.is_null() {
        return Ok(());
    }
    match ion_type {
        IonType::Bool => {
            let _ = reader.read_bool()?;
        }
        IonType::Int => {
            let _ = reader.read_int()?;
        }
        IonType::Float => {
            let _ = reader.read_f64()?;
        }
        IonType::Decimal => {
            let _ = reader.read_decimal()?;
        }
        IonType::Timestamp => {
            let _ = reader.read_timestamp()?;
        }
        IonType::Symbol => {
            let _ = reader.read_symbol()?;
        }
        IonType::String => {
            let _ = reader.read_str()?;
        }
        IonType::Clob | IonType::Blob => {
            let _ = reader.read_lob()?;
        }
        _ => {}
    }
    Ok(())
}

/// Walks the whole stream. Errors are expected; panics and hangs are not.
fn walk<R: RawReader>(reader: &mut R, plan: &[u8]) -> ionmodem::Result<()> {
    let mut plan = plan.iter().copied().cycle();
    let mut depth = 0usize;
    loop {
        match reader.next()? {
            RawEvent::StreamEnd => {
                assert_eq!(depth, 0);
                return Ok(());
            }
            RawEvent::ContainerEnd => {
                reader.step_out()?;
                depth -= 1;
            }
            RawEvent::Value(ion_type) => {
                assert_eq!(reader.depth(), depth);
                assert_eq!(reader.ion_type(), Some(ion_type));
                reader.annotations()?;
                if !ion_type.is_container() {
                    read_scalar(reader, ion_type)?;
                } else if !reader.is_null() && plan.next().unwrap_or(0) % 2 == 0 {
                    reader.step_in()?;
                    depth += 1;
                }
            }
        }
        assert_eq!(reader.depth(), depth);
    }
}

fn check<R: RawReader>(reader: &mut R, plan: &[u8]) {
    if walk(reader, plan).is_err() {
        // A failed reader stays failed.
        assert!(reader.next().is_err());
        assert!(reader.step_out().is_err());
    }
}

fuzz_target!(|case: Case| {
    let options = ReaderOptions {
        chunk_size: 1 + usize::from(case.chunk_size),
        max_skip: 1 + usize::from(case.max_skip),
        root: match case.root {
            Root::Datagram => RootKind::Datagram,
            Root::Struct => RootKind::Struct,
            Root::List => RootKind::List,
            Root::Sexp => RootKind::Sexp,
        },
    };
    if case.text {
        check(&mut TextReader::with_options(case.data.as_slice(), options), &case.plan);
    } else {
        check(&mut BinaryReader::with_options(case.data.as_slice(), options), &case.plan);
    }
});
