use std::fmt;
use std::{io, result};

use slog::{Drain, Key, OwnedKVList, Record, KV};
use slog_term::{Decorator, RecordDecorator};

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3f%:z";

/// NodeFormat writes one line per record:
///
/// ```text
/// 2020-05-03T10:13:55.035+08:00 INFO  src/server/server.rs:72 node started node_id=1
/// ```
pub struct NodeFormat<D>
where
    D: Decorator,
{
    decorator: D,
}

impl<D> Drain for NodeFormat<D>
where
    D: Decorator,
{
    type Ok = ();
    type Err = io::Error;

    fn log(&self, record: &Record, values: &OwnedKVList) -> result::Result<Self::Ok, Self::Err> {
        self.format(record, values)
    }
}

impl<D> NodeFormat<D>
where
    D: Decorator,
{
    pub fn new(d: D) -> NodeFormat<D> {
        NodeFormat { decorator: d }
    }

    fn format(&self, record: &Record, values: &OwnedKVList) -> io::Result<()> {
        self.decorator.with_record(record, values, |decorator| {
            write_header(decorator, record)?;

            decorator.start_msg()?;
            write!(decorator, "{}", record.msg())?;

            let mut ser = PairSerializer { rd: &mut *decorator };
            record.kv().serialize(record, &mut ser)?;
            values.serialize(record, &mut ser)?;

            decorator.start_whitespace()?;
            writeln!(decorator)?;

            decorator.flush()
        })
    }
}

fn write_header(rd: &mut dyn RecordDecorator, record: &Record) -> io::Result<()> {
    rd.start_timestamp()?;
    write!(rd, "{}", chrono::Local::now().format(TIMESTAMP_FORMAT))?;

    rd.start_whitespace()?;
    write!(rd, " ")?;

    rd.start_level()?;
    write!(rd, "{:<5}", record.level().as_short_str())?;

    rd.start_whitespace()?;
    write!(rd, " ")?;

    rd.start_msg()?;
    write!(rd, "{}:{}", record.file(), record.line())?;

    rd.start_whitespace()?;
    write!(rd, " ")
}

/// PairSerializer writes every field as ` key=value`.
struct PairSerializer<'a> {
    rd: &'a mut dyn RecordDecorator,
}

impl<'a> slog::Serializer for PairSerializer<'a> {
    fn emit_arguments(&mut self, key: Key, val: &fmt::Arguments) -> slog::Result {
        self.rd.start_whitespace()?;
        write!(self.rd, " ")?;

        self.rd.start_key()?;
        write!(self.rd, "{}", key)?;

        self.rd.start_separator()?;
        write!(self.rd, "=")?;

        self.rd.start_value()?;
        write!(self.rd, "{}", val)?;
        Ok(())
    }
}
