// Row readers for the two extract families. Both stream: one record or one
// line in memory at a time.

use std::borrow::Cow;
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use csv::ByteRecord;

use appraisal_common::RawFields;

use crate::error::{IngestError, Result};
use crate::layout::{Extract, Layout, ResolvedLayout, SourceFormat};

pub type Input = Box<dyn Read + Send>;

pub fn open_input(path: &Path) -> Result<Input> {
    let file = File::open(path).map_err(|source| IngestError::Source {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(Box::new(file))
}

/// How one record's bytes become text. Chosen once per record or line so
/// every cell of a row decodes the same way.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Charset {
    Utf8,
    /// Extract text is usually Latin-1; Windows-1252 is its superset.
    Windows1252,
}

impl Charset {
    fn detect(bytes: &[u8]) -> Self {
        if std::str::from_utf8(bytes).is_ok() {
            Charset::Utf8
        } else {
            Charset::Windows1252
        }
    }

    /// A fixed-width slice of a UTF-8 line can split a character; lossy
    /// decoding keeps the rest of the cell.
    fn decode(self, bytes: &[u8]) -> Cow<'_, str> {
        match self {
            Charset::Utf8 => String::from_utf8_lossy(bytes),
            Charset::Windows1252 => encoding_rs::WINDOWS_1252.decode_without_bom_handling(bytes).0,
        }
    }
}

/// UTF-8 when the bytes are valid UTF-8, Windows-1252 otherwise.
pub fn decode(bytes: &[u8]) -> Cow<'_, str> {
    Charset::detect(bytes).decode(bytes)
}

/// Bytes `start..end` of a line, clamped to its length.
fn slice(line: &[u8], start: usize, end: usize) -> &[u8] {
    let end = end.min(line.len());
    line.get(start..end).unwrap_or(&[])
}

enum Source {
    Delimited {
        reader: csv::Reader<Input>,
        record: ByteRecord,
    },
    FixedWidth {
        reader: BufReader<Input>,
        line: Vec<u8>,
    },
}

pub struct RowReader {
    resolved: ResolvedLayout,
    source: Source,
}

impl RowReader {
    /// Read the header when the layout has one and bind the layout to it.
    pub fn open(layout: &Layout, input: Input) -> Result<Self> {
        match &layout.format {
            SourceFormat::Delimited {
                delimiter,
                has_header,
            } => {
                if !delimiter.is_ascii() {
                    return Err(IngestError::layout(
                        &layout.name,
                        format!("delimiter {delimiter:?} is not a single byte"),
                    ));
                }
                let delimiter = *delimiter as u8;
                // Tab and pipe extracts carry stray quote characters in names.
                let mut reader = csv::ReaderBuilder::new()
                    .delimiter(delimiter)
                    .has_headers(false)
                    .flexible(true)
                    .quoting(delimiter == b',')
                    .from_reader(input);

                let header = if *has_header {
                    let mut record = ByteRecord::new();
                    reader.read_byte_record(&mut record)?;
                    Some(
                        record
                            .iter()
                            .map(|h| decode(h).trim().trim_start_matches('\u{feff}').to_string())
                            .collect::<Vec<_>>(),
                    )
                } else {
                    None
                };

                Ok(Self {
                    resolved: layout.resolve(header.as_deref())?,
                    source: Source::Delimited {
                        reader,
                        record: ByteRecord::new(),
                    },
                })
            }
            SourceFormat::FixedWidth => Ok(Self {
                resolved: layout.resolve(None)?,
                source: Source::FixedWidth {
                    reader: BufReader::new(input),
                    line: Vec::new(),
                },
            }),
        }
    }

    pub fn open_path(layout: &Layout, path: &Path) -> Result<Self> {
        Self::open(layout, open_input(path)?)
    }

    pub fn layout_name(&self) -> &str {
        &self.resolved.name
    }

    /// The next data row, or `None` at end of input. Blank lines are skipped.
    pub fn next_row(&mut self) -> Result<Option<RawFields>> {
        match &mut self.source {
            Source::Delimited { reader, record } => {
                if !reader.read_byte_record(record)? {
                    return Ok(None);
                }
                let record = &*record;
                let charset = Charset::detect(record.as_slice());
                Ok(Some(self.resolved.map_row(|extract| match extract {
                    Extract::Column(i) => record
                        .get(i)
                        .map(|cell| charset.decode(cell))
                        .unwrap_or_default(),
                    Extract::Bytes(..) => Cow::Borrowed(""),
                })))
            }
            Source::FixedWidth { reader, line } => loop {
                line.clear();
                if reader.read_until(b'\n', line)? == 0 {
                    return Ok(None);
                }
                while matches!(line.last(), Some(b'\n' | b'\r')) {
                    line.pop();
                }
                if line.iter().all(u8::is_ascii_whitespace) {
                    continue;
                }
                let line = &line[..];
                let charset = Charset::detect(line);
                return Ok(Some(self.resolved.map_row(|extract| match extract {
                    Extract::Bytes(start, end) => charset.decode(slice(line, start, end)),
                    Extract::Column(_) => Cow::Borrowed(""),
                })));
            },
        }
    }
}

impl Iterator for RowReader {
    type Item = Result<RawFields>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_row().transpose()
    }
}
