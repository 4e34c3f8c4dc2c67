//! Streaming rewrite of timestamp columns
//!
//! The source file is first renamed to `<path>.old`, then read back in chunks
//! of rows while the converted rows are written to `<path>`. The source is never
//! read and truncated at the same time, and it is only removed once every chunk
//! has been written.
//!
//! ```text
//! Start ──▶ SourceRenamed ──▶ StreamingChunk ──▶ Cleanup ──▶ Done
//!   │             │              │     ▲
//!   │             │              └─────┘
//!   └─────────────┴──────────────┴──────────▶ Error
//! ```
//!
//! A failure mid-stream leaves the partially written destination in place and
//! the original untouched at `<path>.old`.

use csv::{ReaderBuilder, StringRecord, Terminator, WriterBuilder};
use std::ffi::OsString;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use tracing::{debug, debug_span, error, info, warn};

use super::timestamp::{convert_column_zone, TimestampCell};
use super::{ConvertError, ConvertResult, DEFAULT_ROW_CHUNK_SIZE, ORIGINAL_SUFFIX};
use crate::range::ResolvedZone;
use crate::TIMESTAMP_COLUMNS;

const DEFAULT_BUFFER_SIZE: usize = 64 * 1024;

/// Outcome of a successful rewrite.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewriteSummary {
    /// The rewritten file
    pub path: PathBuf,
    /// Data rows written (header excluded)
    pub rows: u64,
    /// Row chunks processed
    pub chunks: u64,
    /// Where the original content is kept, if it was kept
    pub original: Option<PathBuf>,
}

/// Open reader/writer pair while chunks are streamed.
struct ChunkStream {
    original: PathBuf,
    reader: csv::Reader<BufReader<File>>,
    writer: csv::Writer<BufWriter<File>>,
    header: StringRecord,
    columns: Vec<(usize, String)>,
    rows: u64,
    chunks: u64,
}

enum RewriteState {
    Start,
    SourceRenamed { original: PathBuf },
    StreamingChunk(Box<ChunkStream>),
    Cleanup(Box<ChunkStream>),
    Done(RewriteSummary),
    Error(ConvertError),
}

/// Rewrites the timestamp columns of a history file into a target zone.
#[derive(Debug, Clone)]
pub struct TimestampRewriter {
    zone: ResolvedZone,
    keep_original: bool,
    chunk_size: usize,
}

impl TimestampRewriter {
    /// Rewriter for `zone` that removes the original and reads
    /// [`DEFAULT_ROW_CHUNK_SIZE`] rows per chunk.
    pub fn new(zone: ResolvedZone) -> Self {
        Self {
            zone,
            keep_original: false,
            chunk_size: DEFAULT_ROW_CHUNK_SIZE,
        }
    }

    /// Keep the original content at `<path>.old`.
    pub fn with_keep_original(mut self, keep_original: bool) -> Self {
        self.keep_original = keep_original;
        self
    }

    /// Rows per chunk (at least one).
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// Rewrite `path` in place.
    ///
    /// Errors are logged before being returned.
    pub fn rewrite(&self, path: &Path) -> ConvertResult<RewriteSummary> {
        debug!(
            "Converting data file {} from timestamp to timezone {}",
            path.display(),
            self.zone
        );

        let mut state = RewriteState::Start;
        loop {
            state = match state {
                RewriteState::Done(summary) => {
                    info!(
                        "Converted {} rows of {} to timezone {} in {} chunks",
                        summary.rows,
                        summary.path.display(),
                        self.zone,
                        summary.chunks
                    );
                    return Ok(summary);
                }
                RewriteState::Error(err) => {
                    error!("Unable to convert {}: {}", path.display(), err);
                    return Err(err);
                }
                RewriteState::Start => self.rename_source(path),
                RewriteState::SourceRenamed { original } => self.open_stream(path, original),
                RewriteState::StreamingChunk(stream) => self.stream_chunk(path, stream),
                RewriteState::Cleanup(stream) => self.cleanup(path, stream),
            };
        }
    }

    fn rename_source(&self, path: &Path) -> RewriteState {
        if let Err(e) = File::open(path) {
            return RewriteState::Error(ConvertError::ReadFailure(format!(
                "Unable to open csv file {} to convert: {}",
                path.display(),
                e
            )));
        }

        let original = original_path(path);
        // rename() would silently replace a kept original
        if original.symlink_metadata().is_ok() {
            return RewriteState::Error(ConvertError::RenameFailure(format!(
                "Unable to rename {} to {}: destination already exists",
                path.display(),
                original.display()
            )));
        }
        match std::fs::rename(path, &original) {
            Ok(()) => {
                debug!("Renamed {} to {}", path.display(), original.display());
                RewriteState::SourceRenamed { original }
            }
            Err(e) => RewriteState::Error(ConvertError::RenameFailure(format!(
                "Unable to rename {} to {}: {}",
                path.display(),
                original.display(),
                e
            ))),
        }
    }

    fn open_stream(&self, path: &Path, original: PathBuf) -> RewriteState {
        let file = match File::open(&original) {
            Ok(file) => file,
            Err(e) => {
                return RewriteState::Error(ConvertError::ReadFailure(format!(
                    "Unable to open {}: {}",
                    original.display(),
                    e
                )))
            }
        };
        let mut reader = ReaderBuilder::new()
            .flexible(true)
            .from_reader(BufReader::with_capacity(DEFAULT_BUFFER_SIZE, file));

        let header = match reader.headers() {
            Ok(header) => header.clone(),
            Err(e) => {
                return RewriteState::Error(ConvertError::ReadFailure(format!(
                    "Unable to read header of {}: {}",
                    original.display(),
                    e
                )))
            }
        };

        let columns = timestamp_columns(&header);
        if columns.len() < TIMESTAMP_COLUMNS.len() {
            debug!(
                "Only {} of {} timestamp columns present in {}",
                columns.len(),
                TIMESTAMP_COLUMNS.len(),
                original.display()
            );
        }

        let file = match File::create(path) {
            Ok(file) => file,
            Err(e) => {
                return RewriteState::Error(ConvertError::WriteFailure(format!(
                    "Unable to create {}: {}",
                    path.display(),
                    e
                )))
            }
        };
        let writer = WriterBuilder::new()
            .flexible(true)
            .terminator(Terminator::Any(b'\n'))
            .from_writer(BufWriter::with_capacity(DEFAULT_BUFFER_SIZE, file));

        RewriteState::StreamingChunk(Box::new(ChunkStream {
            original,
            reader,
            writer,
            header,
            columns,
            rows: 0,
            chunks: 0,
        }))
    }

    fn stream_chunk(&self, path: &Path, mut stream: Box<ChunkStream>) -> RewriteState {
        let mut batch = Vec::with_capacity(self.chunk_size.min(8192));
        let mut record = StringRecord::new();
        while batch.len() < self.chunk_size {
            match stream.reader.read_record(&mut record) {
                Ok(true) => batch.push(record.iter().map(String::from).collect::<Vec<_>>()),
                Ok(false) => break,
                Err(e) => {
                    return RewriteState::Error(ConvertError::ReadFailure(format!(
                        "Unable to read {} after {} rows: {}",
                        stream.original.display(),
                        stream.rows,
                        e
                    )))
                }
            }
        }

        // The header is written with the first chunk, even when it has no rows
        if stream.chunks > 0 && batch.is_empty() {
            return RewriteState::Cleanup(stream);
        }

        if stream.chunks == 0 && !stream.header.is_empty() {
            if let Err(e) = stream.writer.write_record(&stream.header) {
                return RewriteState::Error(ConvertError::WriteFailure(format!(
                    "Unable to write header to {}: {}",
                    path.display(),
                    e
                )));
            }
        }

        for (index, name) in &stream.columns {
            let _span = debug_span!("column", name = %name).entered();
            let cells = batch
                .iter()
                .map(|row| TimestampCell::from_field(row.get(*index).map_or("", String::as_str)))
                .collect();
            for (row, cell) in batch.iter_mut().zip(convert_column_zone(cells, &self.zone)) {
                if let Some(field) = row.get_mut(*index) {
                    *field = cell.render();
                }
            }
        }

        for row in &batch {
            if let Err(e) = stream.writer.write_record(row) {
                return RewriteState::Error(ConvertError::WriteFailure(format!(
                    "Unable to write to {} after {} rows: {}",
                    path.display(),
                    stream.rows,
                    e
                )));
            }
            stream.rows += 1;
        }
        if let Err(e) = stream.writer.flush() {
            return RewriteState::Error(ConvertError::WriteFailure(format!(
                "Unable to flush {}: {}",
                path.display(),
                e
            )));
        }

        stream.chunks += 1;
        debug!("Chunk {}: {} rows written so far", stream.chunks, stream.rows);

        if batch.is_empty() {
            RewriteState::Cleanup(stream)
        } else {
            RewriteState::StreamingChunk(stream)
        }
    }

    fn cleanup(&self, path: &Path, stream: Box<ChunkStream>) -> RewriteState {
        let ChunkStream {
            original,
            reader,
            writer,
            rows,
            chunks,
            ..
        } = *stream;
        drop(reader);

        let synced = writer
            .into_inner()
            .map_err(|e| e.to_string())
            .and_then(|buf| buf.into_inner().map_err(|e| e.to_string()))
            .and_then(|file| file.sync_all().map_err(|e| e.to_string()));
        if let Err(e) = synced {
            return RewriteState::Error(ConvertError::WriteFailure(format!(
                "Unable to finalize {}: {}",
                path.display(),
                e
            )));
        }

        let original = if self.keep_original {
            debug!("Keeping original content at {}", original.display());
            Some(original)
        } else {
            match std::fs::remove_file(&original) {
                Ok(()) => None,
                Err(e) => {
                    warn!("Unable to remove {}: {}", original.display(), e);
                    Some(original)
                }
            }
        };

        RewriteState::Done(RewriteSummary {
            path: path.to_path_buf(),
            rows,
            chunks,
            original,
        })
    }
}

/// `<path>.old`
pub fn original_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(ORIGINAL_SUFFIX);
    PathBuf::from(name)
}

fn timestamp_columns(header: &StringRecord) -> Vec<(usize, String)> {
    header
        .iter()
        .enumerate()
        .filter(|(_, name)| {
            TIMESTAMP_COLUMNS
                .iter()
                .any(|column| column.eq_ignore_ascii_case(name.trim()))
        })
        .map(|(index, name)| (index, name.trim().to_string()))
        .collect()
}

/// Rewrite the timestamp columns of `path` into `zone`.
pub fn rewrite_file(
    path: &Path,
    zone: ResolvedZone,
    keep_original: bool,
    chunk_size: usize,
) -> ConvertResult<RewriteSummary> {
    TimestampRewriter::new(zone)
        .with_keep_original(keep_original)
        .with_chunk_size(chunk_size)
        .rewrite(path)
}
