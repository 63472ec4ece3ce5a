use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use mcap::records::{ChunkIndex, Record};
use mcap::sans_io::indexed_reader::ReadOrder;
use mcap::sans_io::{
    IndexedReadEvent, IndexedReader, IndexedReaderOptions, LinearReadEvent, LinearReader,
    LinearReaderOptions,
};
use reduce_api::{
    Channel, ContainerError, LogSource, LogStatistics, Message, MessageIter, Schema,
};

/// Footer record (opcode, length, summary start, summary offset start, crc)
/// followed by the closing magic.
const FOOTER_LEN: usize = 1 + 8 + 8 + 8 + 4;
const TAIL_LEN: usize = FOOTER_LEN + 8;

// ════════════════════════════════════════════════════════════════
//  McapSource
// ════════════════════════════════════════════════════════════════

/// Indexed MCAP recording opened for reading.
///
/// Only the summary section is loaded up front: schemas, channels,
/// statistics and chunk indexes. Messages are read chunk by chunk through
/// the chunk index, in log-time order. A file without summary, statistics
/// or chunk index cannot be reduced.
///
/// Channel records are taken as written: a channel pointing at a schema the
/// summary does not contain keeps that id, and is left for the caller to
/// reject.
pub struct McapSource {
    path: PathBuf,
    file: File,
    schemas: Vec<Schema>,
    channels: Vec<Channel>,
    stats: LogStatistics,
    chunk_indexes: Vec<ChunkIndex>,
}

impl McapSource {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, ContainerError> {
        let path = path.as_ref();
        let mut file = File::open(path)
            .map_err(|e| ContainerError::open(format!("open {}: {e}", path.display())))?;
        let summary = read_summary(&mut file).map_err(|e| e.with_context(path.display()))?;

        tracing::debug!(
            input = %path.display(),
            schemas = summary.schemas.len(),
            channels = summary.channels.len(),
            chunks = summary.chunk_indexes.len(),
            start = summary.stats.message_start_time,
            end = summary.stats.message_end_time,
            "summary loaded"
        );

        Ok(Self {
            path: path.to_path_buf(),
            file,
            schemas: summary.schemas,
            channels: summary.channels,
            stats: summary.stats,
            chunk_indexes: summary.chunk_indexes,
        })
    }
}

impl LogSource for McapSource {
    fn schemas(&self) -> &[Schema] {
        &self.schemas
    }

    fn channels(&self) -> &[Channel] {
        &self.channels
    }

    fn statistics(&self) -> &LogStatistics {
        &self.stats
    }

    fn messages(&self) -> Result<MessageIter<'_>, ContainerError> {
        let index = mcap::Summary {
            chunk_indexes: self.chunk_indexes.clone(),
            ..Default::default()
        };
        let reader = IndexedReader::new_with_options(
            &index,
            IndexedReaderOptions::new().with_order(ReadOrder::LogTime),
        )
        .map_err(|e| ContainerError::open(format!("chunk index: {e}")))?;
        let file = self
            .file
            .try_clone()
            .map_err(|e| ContainerError::io(format!("{}: {e}", self.path.display())))?;

        Ok(Box::new(IndexedMessages {
            path: &self.path,
            file,
            reader,
            chunk: Vec::new(),
        }))
    }
}

// ════════════════════════════════════════════════════════════════
//  Message pass
// ════════════════════════════════════════════════════════════════

/// Pulls chunks from the file as the indexed reader asks for them. At most
/// the chunks overlapping the current log time are held in memory.
struct IndexedMessages<'a> {
    path: &'a Path,
    file: File,
    reader: IndexedReader,
    chunk: Vec<u8>,
}

impl<'a> IndexedMessages<'a> {
    fn load_chunk(&mut self, offset: u64, length: usize) -> Result<(), ContainerError> {
        self.chunk.resize(length, 0);
        self.file
            .seek(SeekFrom::Start(offset))
            .and_then(|_| self.file.read_exact(&mut self.chunk))
            .map_err(|e| {
                ContainerError::open(format!("{}: chunk at {offset}: {e}", self.path.display()))
            })?;
        self.reader
            .insert_chunk_record_data(offset, &self.chunk)
            .map_err(|e| {
                ContainerError::open(format!("{}: chunk at {offset}: {e}", self.path.display()))
            })
    }
}

impl<'a> Iterator for IndexedMessages<'a> {
    type Item = Result<Message<'a>, ContainerError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let event = match self.reader.next_event()? {
                Ok(event) => event,
                Err(e) => {
                    return Some(Err(ContainerError::open(format!(
                        "{}: read message: {e}",
                        self.path.display()
                    ))));
                }
            };
            match event {
                IndexedReadEvent::Message { header, data } => {
                    return Some(Ok(Message {
                        channel_id: header.channel_id,
                        sequence: header.sequence,
                        log_time: header.log_time,
                        publish_time: header.publish_time,
                        data: Cow::Owned(data.to_vec()),
                    }));
                }
                IndexedReadEvent::ReadChunkRequest { offset, length } => {
                    if let Err(e) = self.load_chunk(offset, length) {
                        return Some(Err(e));
                    }
                }
            }
        }
    }
}

// ════════════════════════════════════════════════════════════════
//  Summary section
// ════════════════════════════════════════════════════════════════

struct SummarySection {
    schemas: Vec<Schema>,
    channels: Vec<Channel>,
    stats: LogStatistics,
    chunk_indexes: Vec<ChunkIndex>,
}

fn read_summary(file: &mut File) -> Result<SummarySection, ContainerError> {
    let summary_start = read_footer(file)?;
    file.seek(SeekFrom::Start(summary_start))
        .map_err(|e| ContainerError::open(format!("seek to summary: {e}")))?;

    let mut reader =
        LinearReader::new_with_options(LinearReaderOptions::default().with_skip_start_magic(true));
    let mut schemas = BTreeMap::new();
    let mut channels = BTreeMap::new();
    let mut stats = None;
    let mut chunk_indexes = Vec::new();

    while let Some(event) = reader.next_event() {
        match event.map_err(|e| ContainerError::open(format!("summary: {e}")))? {
            LinearReadEvent::ReadRequest(n) => {
                let read = file
                    .read(reader.insert(n))
                    .map_err(|e| ContainerError::open(format!("read summary: {e}")))?;
                reader.notify_read(read);
            }
            LinearReadEvent::Record { data, opcode } => {
                let record = mcap::parse_record(opcode, data)
                    .map_err(|e| ContainerError::open(format!("summary record: {e}")))?;
                match record {
                    Record::Schema { header, data } => {
                        schemas.insert(
                            header.id,
                            Schema {
                                id: header.id,
                                name: header.name,
                                encoding: header.encoding,
                                data: data.into_owned(),
                            },
                        );
                    }
                    Record::Channel(c) => {
                        // schema id 0 marks a schemaless channel
                        let schema_id = (c.schema_id != 0).then_some(c.schema_id);
                        channels.insert(
                            c.id,
                            Channel {
                                id: c.id,
                                topic: c.topic,
                                schema_id,
                                message_encoding: c.message_encoding,
                                metadata: c.metadata,
                            },
                        );
                    }
                    Record::Statistics(s) => {
                        stats = Some(LogStatistics {
                            message_start_time: s.message_start_time,
                            message_end_time: s.message_end_time,
                            channel_message_counts: s.channel_message_counts,
                        });
                    }
                    Record::ChunkIndex(index) => chunk_indexes.push(index),
                    _ => {}
                }
            }
        }
    }

    let stats = stats.ok_or_else(|| ContainerError::open("summary has no statistics record"))?;
    let total: u64 = stats.channel_message_counts.values().sum();
    if total > 0 && chunk_indexes.is_empty() {
        return Err(ContainerError::open(
            "summary has no chunk index, messages cannot be read in log-time order",
        ));
    }

    Ok(SummarySection {
        schemas: schemas.into_values().collect(),
        channels: channels.into_values().collect(),
        stats,
        chunk_indexes,
    })
}

/// Offset of the summary section, taken from the footer.
fn read_footer(file: &mut File) -> Result<u64, ContainerError> {
    let size = file
        .seek(SeekFrom::End(0))
        .map_err(|e| ContainerError::open(format!("seek to footer: {e}")))?;
    if size < (TAIL_LEN + mcap::MAGIC.len()) as u64 {
        return Err(ContainerError::open("file too short to be an MCAP log"));
    }

    let mut tail = [0u8; TAIL_LEN];
    file.seek(SeekFrom::Start(size - TAIL_LEN as u64))
        .and_then(|_| file.read_exact(&mut tail))
        .map_err(|e| ContainerError::open(format!("read footer: {e}")))?;

    if &tail[FOOTER_LEN..] != mcap::MAGIC {
        return Err(ContainerError::open("bad closing magic"));
    }
    let footer = match mcap::parse_record(tail[0], &tail[9..FOOTER_LEN]) {
        Ok(Record::Footer(footer)) => footer,
        Ok(_) => return Err(ContainerError::open("last record is not a footer")),
        Err(e) => return Err(ContainerError::open(format!("footer: {e}"))),
    };
    if footer.summary_start == 0 {
        return Err(ContainerError::open("no summary section, the log is not indexed"));
    }
    Ok(footer.summary_start)
}

