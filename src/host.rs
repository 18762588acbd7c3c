//! The host side of the canvas.
//!
//! Owns an [`EngineCore`], feeds it graph data and recorded input, and
//! receives every outbound [`Action`]. Mutations are written to a mirror
//! [`GraphStore`] standing in for the persistence layer. `RenderNeeded` is
//! coalesced into at most one frame per step.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use universe_canvas::block_view::BlockEvent;
use universe_canvas::camera::Point;
use universe_canvas::engine::{Action, EngineCore};
use universe_canvas::error::{ErrorCode, GraphError};
use universe_canvas::graph::{Block, BlockId, BlockType, Connection, GraphStore};
use universe_canvas::input::InputEvent;
use universe_canvas::status::BlockStatus;
use universe_canvas::telemetry::{Clock, ManualClock, SystemClock};
use uuid::Uuid;

use crate::config::HostConfig;

#[cfg(test)]
#[path = "host_test.rs"]
mod host_test;

#[derive(Debug, thiserror::Error)]
pub enum HostError {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("graph: {0}")]
    Graph(#[from] GraphError),
}

impl ErrorCode for HostError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Io(_) => "E_IO",
            Self::Json(_) => "E_JSON",
            Self::Graph(e) => e.error_code(),
        }
    }
}

/// Graph file accepted by `--graph`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphFile {
    #[serde(default)]
    pub blocks: Vec<Block>,
    #[serde(default)]
    pub connections: Vec<Connection>,
    /// Host broadcasts applied in order after the snapshot.
    #[serde(default)]
    pub updates: Vec<BlockUpdate>,
}

/// One host-side block update: a JSON merge-patch for block `id`.
#[derive(Debug, Clone, Deserialize)]
pub struct BlockUpdate {
    pub id: BlockId,
    pub patch: serde_json::Value,
}

/// End-of-run summary written to stdout.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub status_bar: String,
    pub selection: Vec<BlockId>,
    pub blocks: Vec<BlockReport>,
    pub dangling_connections: usize,
    pub frames: usize,
    pub actions: BTreeMap<&'static str, usize>,
    /// Whether the persisted mirror matches the canvas graph.
    pub in_sync: bool,
    pub elapsed_ms: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockReport {
    pub id: BlockId,
    pub label: String,
    pub block_type: BlockType,
    pub status: BlockStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<f64>,
}

pub struct Host {
    engine: EngineCore,
    /// Simulated time; `None` when the canvas reads the system clock.
    clock: Option<ManualClock>,
    mirror: GraphStore,
    actions: BTreeMap<&'static str, usize>,
    dirty: bool,
    frames: usize,
    status_bar: String,
}

impl Host {
    #[must_use]
    pub fn new(config: &HostConfig) -> Self {
        let (clock, source): (Option<ManualClock>, Box<dyn Clock>) = if config.realtime {
            (None, Box::new(SystemClock::new()))
        } else {
            let clock = ManualClock::new(0);
            (Some(clock.clone()), Box::new(clock))
        };
        let mut engine = EngineCore::with_clock(config.canvas_config(), source);
        engine.set_viewport(config.width, config.height, 1.0);
        let status_bar = engine.render().status_bar.text();
        Self {
            engine,
            clock,
            mirror: GraphStore::new(),
            actions: BTreeMap::new(),
            dirty: false,
            frames: 0,
            status_bar,
        }
    }

    /// Load a graph file from disk.
    ///
    /// # Errors
    ///
    /// `Io` if the file cannot be read, `Json` if it is not a graph file, and
    /// whatever [`Host::load`] rejects.
    pub fn load_path(&mut self, path: &Path) -> Result<(), HostError> {
        let raw = std::fs::read_to_string(path)?;
        let file: GraphFile = serde_json::from_str(&raw)?;
        tracing::info!(path = %path.display(), blocks = file.blocks.len(), "graph file read");
        self.load(file)
    }

    /// Hand a snapshot to the canvas, then apply the file's updates in order.
    ///
    /// # Errors
    ///
    /// `Graph` for the first rejected update. Earlier updates stay applied.
    pub fn load(&mut self, file: GraphFile) -> Result<(), HostError> {
        self.engine.load_snapshot(file.blocks.clone(), file.connections.clone());
        self.mirror.load_snapshot(file.blocks, file.connections);
        for update in file.updates {
            self.engine.apply_block_update(&update.id, &update.patch)?;
            self.mirror.update_block(&update.id, &update.patch)?;
        }
        self.dirty = true;
        self.present();
        Ok(())
    }

    /// A small pipeline with two running blocks and one animated edge.
    pub fn load_demo(&mut self) {
        let source = Block::new(BlockType::Dashboard, Point::new(0.0, 0.0));
        let agent = Block::new(BlockType::AiAgent, Point::new(400.0, 0.0));
        let sink = Block::new(BlockType::Analytics, Point::new(800.0, 0.0));
        let flows = Block::new(BlockType::Workflows, Point::new(400.0, 300.0));
        let connections = vec![
            Connection { id: Uuid::new_v4(), source: source.id, target: agent.id, animated: true },
            Connection { id: Uuid::new_v4(), source: agent.id, target: sink.id, animated: false },
            Connection { id: Uuid::new_v4(), source: agent.id, target: flows.id, animated: false },
        ];
        let running = [source.id, agent.id];
        let file = GraphFile { blocks: vec![source, agent, sink, flows], connections, updates: Vec::new() };
        if let Err(e) = self.load(file) {
            tracing::warn!(error = %e, "demo graph rejected");
            return;
        }
        for id in running {
            let actions = self.engine.block_event(&id, BlockEvent::Start);
            self.handle(actions);
        }
        self.present();
    }

    /// Replay recorded input through the canvas.
    pub fn replay(&mut self, events: Vec<InputEvent>) {
        tracing::info!(events = events.len(), "replaying input");
        for event in events {
            let actions = self.engine.dispatch(event);
            self.handle(actions);
        }
        self.present();
    }

    /// Advance simulated time by `elapsed_ms` and run the timers that came due.
    /// On the system clock only the timers run.
    pub fn step(&mut self, elapsed_ms: u64) {
        if let Some(clock) = &self.clock {
            clock.advance(elapsed_ms);
        }
        let actions = self.engine.tick();
        self.handle(actions);
        self.present();
    }

    /// Stop every timer the canvas owns.
    pub fn teardown(&mut self) {
        self.engine.teardown();
        tracing::info!(frames = self.frames, "host torn down");
    }

    #[must_use]
    pub fn in_sync(&self) -> bool {
        self.mirror.blocks().eq(self.engine.graph.blocks())
            && self.mirror.connections() == self.engine.graph.connections()
    }

    #[must_use]
    pub fn report(&self) -> Report {
        let blocks = self
            .engine
            .graph
            .blocks()
            .map(|b| BlockReport {
                id: b.id,
                label: b.data.label.clone(),
                block_type: b.block_type,
                status: b.status,
                progress: b.data.progress,
            })
            .collect();
        Report {
            status_bar: self.status_bar.clone(),
            selection: self.engine.selection().to_vec(),
            blocks,
            dangling_connections: self.engine.graph.dangling_connections().count(),
            frames: self.frames,
            actions: self.actions.clone(),
            in_sync: self.in_sync(),
            elapsed_ms: self.engine.now_ms(),
        }
    }

    fn handle(&mut self, actions: Vec<Action>) {
        for action in actions {
            *self.actions.entry(action_kind(&action)).or_default() += 1;
            self.persist(action);
        }
    }

    fn persist(&mut self, action: Action) {
        match action {
            Action::BlockCreated(block) => {
                tracing::info!(block_id = %block.id, "persist block create");
                self.mirror.insert_block(block);
            }
            Action::BlockUpdated { id, patch } => {
                if let Err(e) = self.mirror.apply_patch(&id, &patch) {
                    tracing::warn!(block_id = %id, error = %e, "persist block update rejected");
                }
            }
            Action::BlockDeleted { id } => {
                tracing::info!(block_id = %id, "persist block delete");
                self.mirror.remove_block(&id);
            }
            Action::BlockDuplicated { source, block } => {
                tracing::info!(source = %source, block_id = %block.id, "persist block duplicate");
                self.mirror.insert_block(block);
            }
            Action::ConnectionCreated(connection) => {
                tracing::info!(connection_id = %connection.id, "persist connection create");
                self.mirror.insert_connection(connection);
            }
            Action::ConnectionDeleted { id } => {
                tracing::info!(connection_id = %id, "persist connection delete");
                self.mirror.remove_connection(&id);
            }
            Action::ConfigureRequested { id } => tracing::info!(block_id = %id, "configure dialog requested"),
            Action::ViewRequested { id } => tracing::info!(block_id = %id, "block view requested"),
            Action::SetCursor(cursor) => tracing::trace!(cursor = %cursor, "cursor"),
            Action::RenderNeeded => self.dirty = true,
        }
    }

    /// Build at most one scene for all the render requests since the last frame.
    fn present(&mut self) {
        if !self.dirty {
            return;
        }
        self.dirty = false;
        let scene = self.engine.render();
        self.frames += 1;
        self.status_bar = scene.status_bar.text();
        tracing::debug!(
            frame = self.frames,
            blocks = scene.blocks.len(),
            connections = scene.connections.len(),
            status = %self.status_bar,
            "frame"
        );
    }
}

/// Read a JSON array of recorded input events.
///
/// # Errors
///
/// `Io` if the file cannot be read, `Json` if it is not an event list.
pub fn read_script(path: &Path) -> Result<Vec<InputEvent>, HostError> {
    let raw = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}

/// The wire name of an action, as it appears in the `kind` tag.
#[must_use]
pub fn action_kind(action: &Action) -> &'static str {
    match action {
        Action::BlockCreated(_) => "blockCreated",
        Action::BlockUpdated { .. } => "blockUpdated",
        Action::BlockDeleted { .. } => "blockDeleted",
        Action::BlockDuplicated { .. } => "blockDuplicated",
        Action::ConnectionCreated(_) => "connectionCreated",
        Action::ConnectionDeleted { .. } => "connectionDeleted",
        Action::ConfigureRequested { .. } => "configureRequested",
        Action::ViewRequested { .. } => "viewRequested",
        Action::SetCursor(_) => "setCursor",
        Action::RenderNeeded => "renderNeeded",
    }
}
