use std::collections::HashMap;

use reduce_api::{Channel, ChannelId, LogSink, Schema, SchemaId};

use crate::error::RemapError;

/// Source → output id translation for one reduction run.
///
/// Filled while schemas and channels are copied into the sink, read-only
/// afterwards.
#[derive(Debug, Default)]
pub struct RemapTable {
    schemas: HashMap<SchemaId, SchemaId>,
    channels: HashMap<ChannelId, ChannelId>,
    skipped: Vec<RemapError>,
}

impl RemapTable {
    /// Copy every schema, then every channel, into `sink`.
    pub fn build<K: LogSink + ?Sized>(
        sink: &mut K,
        schemas: &[Schema],
        channels: &[Channel],
    ) -> Result<Self, RemapError> {
        let schema_map = register_schemas(sink, schemas)?;
        let (channel_map, skipped) = register_channels(sink, channels, &schema_map)?;
        Ok(Self {
            schemas: schema_map,
            channels: channel_map,
            skipped,
        })
    }

    pub fn schema(&self, source: SchemaId) -> Option<SchemaId> {
        self.schemas.get(&source).copied()
    }

    pub fn channel(&self, source: ChannelId) -> Option<ChannelId> {
        self.channels.get(&source).copied()
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Channels left out of the output, with the reason.
    pub fn skipped(&self) -> &[RemapError] {
        &self.skipped
    }
}

// ═══════════════════════════════════════════════════════════════
//  Registration
// ═══════════════════════════════════════════════════════════════

/// Register each source schema with the sink. The resulting map is
/// one-to-one: a sink answering with an id it already handed out fails the
/// run.
pub fn register_schemas<K: LogSink + ?Sized>(
    sink: &mut K,
    schemas: &[Schema],
) -> Result<HashMap<SchemaId, SchemaId>, RemapError> {
    let mut map = HashMap::with_capacity(schemas.len());
    let mut owners: HashMap<SchemaId, SchemaId> = HashMap::with_capacity(schemas.len());

    for schema in schemas {
        let output = sink
            .add_schema(schema)
            .map_err(|e| e.with_context(format!("schema {} ('{}')", schema.id, schema.name)))?;
        if let Some(&first) = owners.get(&output) {
            return Err(RemapError::DuplicateSchema {
                first,
                second: schema.id,
                output,
            });
        }
        owners.insert(output, schema.id);
        map.insert(schema.id, output);
    }

    Ok(map)
}

/// Register each source channel with its schema reference rewritten.
///
/// A channel without schema stays schemaless. A channel whose schema id is
/// missing from `schemas` is not registered; it is returned in the skip list
/// and its messages will be dropped as unmapped.
pub fn register_channels<K: LogSink + ?Sized>(
    sink: &mut K,
    channels: &[Channel],
    schemas: &HashMap<SchemaId, SchemaId>,
) -> Result<(HashMap<ChannelId, ChannelId>, Vec<RemapError>), RemapError> {
    let mut map = HashMap::with_capacity(channels.len());
    let mut owners: HashMap<ChannelId, ChannelId> = HashMap::with_capacity(channels.len());
    let mut skipped = Vec::new();

    for channel in channels {
        let schema_id = match channel.schema_id {
            None => None,
            Some(id) => match schemas.get(&id) {
                Some(&output) => Some(output),
                None => {
                    let err = RemapError::UnknownSchema {
                        channel: channel.id,
                        topic: channel.topic.clone(),
                        schema: id,
                    };
                    tracing::warn!(error = %err, "channel skipped");
                    skipped.push(err);
                    continue;
                }
            },
        };

        let output = sink
            .add_channel(&channel.with_schema(schema_id))
            .map_err(|e| e.with_context(format!("channel {} ('{}')", channel.id, channel.topic)))?;
        if let Some(&first) = owners.get(&output) {
            return Err(RemapError::DuplicateChannel {
                first,
                second: channel.id,
                output,
            });
        }
        owners.insert(output, channel.id);
        map.insert(channel.id, output);
    }

    Ok((map, skipped))
}
