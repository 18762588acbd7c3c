//! Graph model: blocks, connections, sparse updates, and the in-memory store.
//!
//! This module defines what is on the canvas (`Block`, `Connection`), the
//! sparse-update type used for incremental edits (`BlockPatch`), and the
//! runtime store that owns all live entities (`GraphStore`).
//!
//! Data flows into this layer from the host (snapshot and broadcasts) and from
//! the canvas controller (user gestures). Every mutation goes through a
//! `GraphStore` method; renderers only read. Structural errors leave the store
//! untouched.

#[cfg(test)]
#[path = "graph_test.rs"]
mod graph_test;

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::camera::{Point, Rect, content_bounds};
use crate::consts::DUPLICATE_OFFSET;
use crate::error::GraphError;
use crate::status::BlockStatus;

/// Unique identifier for a block.
pub type BlockId = Uuid;

/// Unique identifier for a connection.
pub type ConnectionId = Uuid;

/// The kind of a block. Selects icon, colors, and defaults; never behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BlockType {
    Dashboard,
    Analytics,
    Crm,
    Ecommerce,
    LandingPage,
    EmailMarketing,
    Leads,
    Workflows,
    MediaLibrary,
    AiAgent,
    AiLaboratory,
    AiContext,
    Aura,
    SocialBuffer,
    AdsTool,
    WebBrowser,
    Products,
    Integrations,
}

impl BlockType {
    /// Every block kind, in palette order.
    pub const ALL: [BlockType; 18] = [
        Self::Dashboard,
        Self::Analytics,
        Self::Crm,
        Self::Ecommerce,
        Self::LandingPage,
        Self::EmailMarketing,
        Self::Leads,
        Self::Workflows,
        Self::MediaLibrary,
        Self::AiAgent,
        Self::AiLaboratory,
        Self::AiContext,
        Self::Aura,
        Self::SocialBuffer,
        Self::AdsTool,
        Self::WebBrowser,
        Self::Products,
        Self::Integrations,
    ];

    /// Wire name, identical to the serde representation.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Dashboard => "dashboard",
            Self::Analytics => "analytics",
            Self::Crm => "crm",
            Self::Ecommerce => "ecommerce",
            Self::LandingPage => "landingPage",
            Self::EmailMarketing => "emailMarketing",
            Self::Leads => "leads",
            Self::Workflows => "workflows",
            Self::MediaLibrary => "mediaLibrary",
            Self::AiAgent => "aiAgent",
            Self::AiLaboratory => "aiLaboratory",
            Self::AiContext => "aiContext",
            Self::Aura => "aura",
            Self::SocialBuffer => "socialBuffer",
            Self::AdsTool => "adsTool",
            Self::WebBrowser => "webBrowser",
            Self::Products => "products",
            Self::Integrations => "integrations",
        }
    }

    /// Label given to a freshly created block of this kind.
    #[must_use]
    pub fn default_label(self) -> &'static str {
        match self {
            Self::Dashboard => "Dashboard",
            Self::Analytics => "Analytics",
            Self::Crm => "CRM",
            Self::Ecommerce => "E-commerce",
            Self::LandingPage => "Landing Page",
            Self::EmailMarketing => "Email Marketing",
            Self::Leads => "Leads",
            Self::Workflows => "Workflows",
            Self::MediaLibrary => "Media Library",
            Self::AiAgent => "AI Agent",
            Self::AiLaboratory => "AI Laboratory",
            Self::AiContext => "AI Context",
            Self::Aura => "Aura",
            Self::SocialBuffer => "Social Buffer",
            Self::AdsTool => "Ads Tool",
            Self::WebBrowser => "Web Browser",
            Self::Products => "Products",
            Self::Integrations => "Integrations",
        }
    }

    /// Metadata category given to a freshly created block of this kind.
    #[must_use]
    pub fn default_category(self) -> &'static str {
        match self {
            Self::Dashboard | Self::Analytics => "insights",
            Self::Crm | Self::Leads | Self::Ecommerce | Self::Products => "sales",
            Self::LandingPage | Self::EmailMarketing | Self::SocialBuffer | Self::AdsTool => "marketing",
            Self::Workflows | Self::Integrations => "automation",
            Self::MediaLibrary | Self::WebBrowser => "content",
            Self::AiAgent | Self::AiLaboratory | Self::AiContext | Self::Aura => "ai",
        }
    }
}

impl std::fmt::Display for BlockType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A metric value: numbers for counters and gauges, text for durations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetricValue {
    Number(f64),
    Text(String),
}

impl MetricValue {
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Text(_) => None,
        }
    }
}

impl std::fmt::Display for MetricValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

/// Display and runtime data of a block.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockData {
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Percentage in `[0, 100]`; clamped on every write.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<f64>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metrics: BTreeMap<String, MetricValue>,
    /// Host-supplied timestamp of the last activity, passed through verbatim.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_activity: Option<String>,
}

/// Descriptive metadata of a block.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockMetadata {
    pub version: String,
    pub category: String,
    /// Soft references; may name blocks that no longer exist.
    #[serde(default)]
    pub dependencies: Vec<BlockId>,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// A node on the canvas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub id: BlockId,
    #[serde(rename = "type")]
    pub block_type: BlockType,
    /// Top-left corner in world coordinates.
    pub position: Point,
    #[serde(default)]
    pub status: BlockStatus,
    pub data: BlockData,
    pub metadata: BlockMetadata,
}

impl Block {
    /// A fresh idle block with the defaults for `block_type`.
    #[must_use]
    pub fn new(block_type: BlockType, position: Point) -> Self {
        Self {
            id: Uuid::new_v4(),
            block_type,
            position,
            status: BlockStatus::Idle,
            data: BlockData { label: block_type.default_label().to_string(), ..BlockData::default() },
            metadata: BlockMetadata {
                version: "1.0.0".to_string(),
                category: block_type.default_category().to_string(),
                dependencies: Vec::new(),
                tags: Vec::new(),
            },
        }
    }

    fn clamp_progress(&mut self) {
        if let Some(p) = self.data.progress.as_mut() {
            *p = if p.is_finite() { p.clamp(0.0, 100.0) } else { 0.0 };
        }
    }
}

/// A directed edge between two blocks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connection {
    pub id: ConnectionId,
    pub source: BlockId,
    pub target: BlockId,
    #[serde(default)]
    pub animated: bool,
}

// =============================================================
// Sparse updates
// =============================================================

/// Sparse update for a block. Only present fields are applied.
///
/// Unknown fields are rejected at deserialization time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct BlockPatch {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub block_type: Option<BlockType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Point>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<BlockStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<BlockDataPatch>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<BlockMetadataPatch>,
}

/// Sparse update for [`BlockData`]. Metrics merge key by key.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct BlockDataPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metrics: Option<BTreeMap<String, MetricValue>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_activity: Option<String>,
}

/// Sparse update for [`BlockMetadata`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct BlockMetadataPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dependencies: Option<Vec<BlockId>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
}

impl BlockPatch {
    /// Parse a JSON merge-patch.
    ///
    /// # Errors
    ///
    /// Returns `Validation` for non-objects, unknown fields, wrong types, and
    /// values that fail [`BlockPatch::validate`].
    pub fn from_json(value: &serde_json::Value) -> Result<Self, GraphError> {
        if !value.is_object() {
            return Err(GraphError::Validation("patch must be a JSON object".into()));
        }
        let patch = Self::deserialize(value).map_err(|e| GraphError::Validation(e.to_string()))?;
        patch.validate()?;
        Ok(patch)
    }

    #[must_use]
    pub fn status(status: BlockStatus) -> Self {
        Self { status: Some(status), ..Self::default() }
    }

    #[must_use]
    pub fn position(position: Point) -> Self {
        Self { position: Some(position), ..Self::default() }
    }

    #[must_use]
    pub fn data(data: BlockDataPatch) -> Self {
        Self { data: Some(data), ..Self::default() }
    }

    /// Whether the patch would change nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Check values serde cannot reject on its own.
    ///
    /// # Errors
    ///
    /// Returns `Validation` for non-finite numbers or a blank label.
    pub fn validate(&self) -> Result<(), GraphError> {
        if let Some(p) = self.position {
            if !p.x.is_finite() || !p.y.is_finite() {
                return Err(GraphError::Validation("position must be finite".into()));
            }
        }
        let Some(data) = &self.data else {
            return Ok(());
        };
        if data.label.as_ref().is_some_and(|l| l.trim().is_empty()) {
            return Err(GraphError::Validation("label must not be blank".into()));
        }
        if data.progress.is_some_and(|p| !p.is_finite()) {
            return Err(GraphError::Validation("progress must be finite".into()));
        }
        if let Some(metrics) = &data.metrics {
            if let Some((key, _)) = metrics.iter().find(|(_, v)| v.as_f64().is_some_and(|n| !n.is_finite())) {
                return Err(GraphError::Validation(format!("metric `{key}` must be finite")));
            }
        }
        Ok(())
    }

    fn apply_to(&self, block: &mut Block) {
        if let Some(t) = self.block_type {
            block.block_type = t;
        }
        if let Some(p) = self.position {
            block.position = p;
        }
        if let Some(s) = self.status {
            block.status = s;
        }
        if let Some(data) = &self.data {
            if let Some(label) = &data.label {
                block.data.label.clone_from(label);
            }
            if let Some(description) = &data.description {
                block.data.description = Some(description.clone());
            }
            if let Some(progress) = data.progress {
                block.data.progress = Some(progress);
            }
            if let Some(metrics) = &data.metrics {
                for (k, v) in metrics {
                    block.data.metrics.insert(k.clone(), v.clone());
                }
            }
            if let Some(ts) = &data.last_activity {
                block.data.last_activity = Some(ts.clone());
            }
        }
        if let Some(meta) = &self.metadata {
            if let Some(v) = &meta.version {
                block.metadata.version.clone_from(v);
            }
            if let Some(c) = &meta.category {
                block.metadata.category.clone_from(c);
            }
            if let Some(d) = &meta.dependencies {
                block.metadata.dependencies.clone_from(d);
            }
            if let Some(t) = &meta.tags {
                block.metadata.tags.clone_from(t);
            }
        }
        block.clamp_progress();
    }
}

// =============================================================
// Store
// =============================================================

/// In-memory store of blocks and connections.
///
/// Blocks keep their insertion order, which is also the draw order.
#[derive(Debug, Clone, Default)]
pub struct GraphStore {
    blocks: HashMap<BlockId, Block>,
    order: Vec<BlockId>,
    connections: Vec<Connection>,
}

impl GraphStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace all blocks and connections with a host snapshot.
    ///
    /// Connections are taken as given; dangling ones are skipped at render time.
    pub fn load_snapshot(&mut self, blocks: Vec<Block>, connections: Vec<Connection>) {
        self.blocks.clear();
        self.order.clear();
        for block in blocks {
            self.insert_block(block);
        }
        self.connections = connections;
        tracing::debug!(blocks = self.blocks.len(), connections = self.connections.len(), "snapshot loaded");
    }

    /// Create a block of `block_type` at `position` with default data.
    pub fn add_block(&mut self, block_type: BlockType, position: Point) -> BlockId {
        self.insert_block(Block::new(block_type, position))
    }

    /// Insert or replace a host-supplied block. A replaced block keeps its draw slot.
    pub fn insert_block(&mut self, mut block: Block) -> BlockId {
        block.clamp_progress();
        let id = block.id;
        if self.blocks.insert(id, block).is_none() {
            self.order.push(id);
        }
        tracing::debug!(block_id = %id, "block inserted");
        id
    }

    /// Parse `patch` as a JSON merge-patch and apply it to block `id`.
    ///
    /// # Errors
    ///
    /// `Validation` if the patch is malformed, `InvalidReference` if the block
    /// does not exist. The block is unchanged on error.
    pub fn update_block(&mut self, id: &BlockId, patch: &serde_json::Value) -> Result<(), GraphError> {
        let patch = BlockPatch::from_json(patch)?;
        self.apply_patch(id, &patch)
    }

    /// Apply a typed sparse update to block `id`.
    ///
    /// # Errors
    ///
    /// `InvalidReference` if the block does not exist, `Validation` if the
    /// patch fails validation. The block is unchanged on error.
    pub fn apply_patch(&mut self, id: &BlockId, patch: &BlockPatch) -> Result<(), GraphError> {
        let block = self.blocks.get_mut(id).ok_or(GraphError::InvalidReference(*id))?;
        patch.validate()?;
        patch.apply_to(block);
        Ok(())
    }

    /// Remove a block, returning it if it was present.
    ///
    /// Connections that reference it are kept and become dangling.
    pub fn remove_block(&mut self, id: &BlockId) -> Option<Block> {
        let removed = self.blocks.remove(id)?;
        self.order.retain(|b| b != id);
        tracing::debug!(block_id = %id, "block removed");
        Some(removed)
    }

    /// Copy block `id` under a fresh id, offset so it does not overlap the original.
    ///
    /// The copy starts idle; data and metadata are cloned verbatim.
    ///
    /// # Errors
    ///
    /// `InvalidReference` if the block does not exist.
    pub fn duplicate_block(&mut self, id: &BlockId) -> Result<BlockId, GraphError> {
        let original = self.blocks.get(id).ok_or(GraphError::InvalidReference(*id))?;
        let copy = Block {
            id: Uuid::new_v4(),
            position: original.position.offset(DUPLICATE_OFFSET, DUPLICATE_OFFSET),
            status: BlockStatus::Idle,
            ..original.clone()
        };
        tracing::debug!(source = %id, block_id = %copy.id, "block duplicated");
        Ok(self.insert_block(copy))
    }

    /// Connect `source` to `target`.
    ///
    /// # Errors
    ///
    /// `InvalidReference` naming the first endpoint that does not exist.
    /// Nothing is inserted on error.
    pub fn add_connection(&mut self, source: &BlockId, target: &BlockId) -> Result<ConnectionId, GraphError> {
        for endpoint in [source, target] {
            if !self.blocks.contains_key(endpoint) {
                return Err(GraphError::InvalidReference(*endpoint));
            }
        }
        let id = Uuid::new_v4();
        self.connections.push(Connection { id, source: *source, target: *target, animated: false });
        tracing::debug!(connection_id = %id, %source, %target, "connection added");
        Ok(id)
    }

    /// Insert or replace a host-supplied connection without endpoint checks.
    pub fn insert_connection(&mut self, connection: Connection) {
        if let Some(existing) = self.connections.iter_mut().find(|c| c.id == connection.id) {
            *existing = connection;
        } else {
            self.connections.push(connection);
        }
    }

    /// Remove a connection, returning it if it was present.
    pub fn remove_connection(&mut self, id: &ConnectionId) -> Option<Connection> {
        let idx = self.connections.iter().position(|c| c.id == *id)?;
        Some(self.connections.remove(idx))
    }

    /// Connections whose source or target no longer resolves.
    pub fn dangling_connections(&self) -> impl Iterator<Item = &Connection> + '_ {
        self.connections
            .iter()
            .filter(|c| !self.blocks.contains_key(&c.source) || !self.blocks.contains_key(&c.target))
    }

    /// Connections with both endpoints resolved, paired with those endpoints.
    pub fn resolved_connections(&self) -> impl Iterator<Item = (&Connection, &Block, &Block)> + '_ {
        self.connections.iter().filter_map(|c| {
            let source = self.blocks.get(&c.source)?;
            let target = self.blocks.get(&c.target)?;
            Some((c, source, target))
        })
    }

    /// Return a reference to a block by id.
    #[must_use]
    pub fn get(&self, id: &BlockId) -> Option<&Block> {
        self.blocks.get(id)
    }

    #[must_use]
    pub fn contains(&self, id: &BlockId) -> bool {
        self.blocks.contains_key(id)
    }

    #[must_use]
    pub fn connection(&self, id: &ConnectionId) -> Option<&Connection> {
        self.connections.iter().find(|c| c.id == *id)
    }

    /// All blocks in draw order.
    pub fn blocks(&self) -> impl Iterator<Item = &Block> + '_ {
        self.order.iter().filter_map(|id| self.blocks.get(id))
    }

    /// All connections, including dangling ones.
    #[must_use]
    pub fn connections(&self) -> &[Connection] {
        &self.connections
    }

    /// Bounding box of all blocks at their nominal size.
    #[must_use]
    pub fn bounds(&self) -> Option<Rect> {
        content_bounds(self.blocks())
    }

    /// Number of blocks currently in the store.
    #[must_use]
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// Returns `true` if the store contains no blocks.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    #[must_use]
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }
}
