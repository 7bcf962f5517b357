#![allow(missing_docs, dead_code)]

use core::fmt::Write;

use ionmodem::{IonType, RawEvent, RawReader, Timestamp};

fn timestamp(ts: &Timestamp) -> String {
    format!(
        "{:04}-{:02}-{:02}T{:02}:{:02}:{:02} ({:?}, offset {:?})",
        ts.year, ts.month, ts.day, ts.hour, ts.minute, ts.second, ts.precision, ts.offset_minutes
    )
}

fn scalar<R: RawReader>(reader: &mut R, ion_type: IonType) -> ionmodem::Result<String> {
    if reader.is_null() {
        return Ok(match ion_type {
            IonType::Null => "null".to_owned(),
            other => format!("null.{other}"),
        });
    }
    Ok(match ion_type {
        IonType::Bool => format!("bool {}", reader.read_bool()?),
        IonType::Int => format!("int {}", reader.read_int()?.to_bigint()),
        IonType::Float => format!("float {:?}", reader.read_f64()?),
        IonType::Decimal => {
            let decimal = reader.read_decimal()?;
            let sign = if decimal.coefficient.is_negative() { "-" } else { "" };
            format!(
                "decimal {sign}{}d{}",
                decimal.coefficient.magnitude(),
                decimal.exponent
            )
        }
        IonType::Timestamp => format!("timestamp {}", timestamp(&reader.read_timestamp()?)),
        IonType::Symbol if reader.is_version_marker() => {
            format!("symbol {} (version marker)", reader.read_symbol()?)
        }
        IonType::Symbol => format!("symbol {}", reader.read_symbol()?),
        IonType::String => format!("string {:?}", reader.read_str()?),
        IonType::Clob => format!("clob {:?}", reader.read_lob()?),
        IonType::Blob => format!("blob {:?}", reader.read_lob()?),
        container => container.name().to_owned(),
    })
}

/// Renders every event of a stream, one per line, indented by depth. Stops
/// at the first error and renders it.
pub fn render<R: RawReader>(reader: &mut R) -> String {
    let mut out = String::new();
    if let Err(err) = render_into(reader, &mut out) {
        writeln!(out, "error: {err}").unwrap();
    }
    out
}

fn render_into<R: RawReader>(reader: &mut R, out: &mut String) -> ionmodem::Result<()> {
    loop {
        match reader.next()? {
            RawEvent::StreamEnd => {
                out.push_str("end of stream\n");
                return Ok(());
            }
            RawEvent::ContainerEnd => {
                reader.step_out()?;
                writeln!(out, "{}end", "  ".repeat(reader.depth())).unwrap();
            }
            RawEvent::Value(ion_type) => {
                let mut line = "  ".repeat(reader.depth());
                if let Some(field) = reader.field_name() {
                    write!(line, "{field}: ").unwrap();
                }
                for annotation in reader.annotations()? {
                    write!(line, "{annotation}::").unwrap();
                }
                line.push_str(&scalar(reader, ion_type)?);
                writeln!(out, "{line}").unwrap();
                if ion_type.is_container() && !reader.is_null() {
                    reader.step_in()?;
                }
            }
        }
    }
}
