use std::io;

use log::{
    Record,
    kv::{Error, Key, Value, VisitSource},
};
use log4rs::encode::pattern::PatternEncoder;
use log4rs::encode::{Color, Encode, Style, Write};
use serde::Deserialize;

pub const DEFAULT_PATTERN: &str = "{d(%H:%M:%S)} {l:5} {t} - {m}";

#[derive(Debug, Deserialize)]
pub struct StructuredConsoleEncoderConfig {
    pub pattern: Option<String>,
}

/// Pattern encoder that appends the record's key/value pairs as ` key=value`.
#[derive(Debug)]
pub struct StructuredConsoleEncoder {
    pattern: PatternEncoder,
}

impl StructuredConsoleEncoder {
    pub fn new(pattern: &str) -> Self {
        Self {
            pattern: PatternEncoder::new(pattern),
        }
    }
}

impl Default for StructuredConsoleEncoder {
    fn default() -> Self {
        Self::new(DEFAULT_PATTERN)
    }
}

impl Encode for StructuredConsoleEncoder {
    fn encode(&self, w: &mut dyn Write, record: &Record) -> anyhow::Result<()> {
        self.pattern.encode(w, record)?;

        let mut pairs = PairWriter { out: &mut *w, failed: None };
        let visited = record.key_values().visit(&mut pairs);
        if let Some(err) = pairs.failed {
            return Err(err.into());
        }
        if let Err(kv_err) = visited {
            write!(w, " [kv error: {}]", kv_err)?;
        }

        w.write_all(b"\n")?;
        Ok(())
    }
}

struct PairWriter<'a> {
    out: &'a mut dyn Write,
    failed: Option<io::Error>,
}

impl PairWriter<'_> {
    fn write_pair(&mut self, key: &Key<'_>, value: &Value<'_>) -> io::Result<()> {
        self.out.set_style(Style::new().text(Color::Cyan))?;
        write!(self.out, " {}=", key)?;
        self.out.set_style(&Style::default())?;
        write!(self.out, "{}", value)
    }
}

impl<'kvs> VisitSource<'kvs> for PairWriter<'_> {
    fn visit_pair(&mut self, key: Key<'kvs>, value: Value<'kvs>) -> Result<(), Error> {
        self.write_pair(&key, &value).map_err(|e| {
            self.failed = Some(e);
            Error::msg("write failed")
        })
    }
}

pub struct StructuredConsoleEncoderDeserializer;

impl log4rs::config::Deserialize for StructuredConsoleEncoderDeserializer {
    type Trait = dyn Encode;
    type Config = StructuredConsoleEncoderConfig;

    fn deserialize(
        &self,
        config: StructuredConsoleEncoderConfig,
        _: &log4rs::config::Deserializers,
    ) -> anyhow::Result<Box<dyn Encode>> {
        let pattern = config.pattern.as_deref().unwrap_or(DEFAULT_PATTERN);
        Ok(Box::new(StructuredConsoleEncoder::new(pattern)))
    }
}
