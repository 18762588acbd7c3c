//! Block renderer: a pure mapping from a block and its view flags to a visual.
//!
//! Nothing here owns state. [`block_view`] reads a [`Block`] plus the
//! selection/hover/expanded flags kept by the controller and produces a
//! [`BlockVisual`] that the scene and the painter consume. [`block_layout`]
//! is the single source of block geometry, shared with hit-testing. Hit-tests
//! on a hovered card undo its [`HOVER_SCALE`], so what is drawn is what can
//! be clicked.
//!
//! Icon and palette lookups are exhaustive matches over [`BlockType`] and
//! [`BlockStatus`]; adding a variant fails to compile until it is mapped.

#[cfg(test)]
#[path = "block_view_test.rs"]
mod block_view_test;

use serde::{Deserialize, Serialize};

use crate::camera::{Point, Rect};
use crate::consts::{ACTION_BUTTON_GAP, ACTION_BUTTON_SIZE, BLOCK_HEIGHT, BLOCK_WIDTH, DETAILS_HEIGHT, HOVER_SCALE};
use crate::graph::{Block, BlockId, BlockType, GraphStore, MetricValue};
use crate::input::SelectionSet;
use crate::status::BlockStatus;

/// Inner padding of a block card.
const PADDING: f64 = 12.0;

/// Status badge size.
const BADGE_WIDTH: f64 = 88.0;
const BADGE_HEIGHT: f64 = 24.0;

/// Height of the "details" toggle row.
const TOGGLE_HEIGHT: f64 = 24.0;

/// Number of action buttons shown while hovered.
pub const ACTION_COUNT: usize = 5;

/// z-index of a selected block; everything else sits at 0.
pub const SELECTED_Z_INDEX: i32 = 10;

// =============================================================
// Events
// =============================================================

/// Events a block card emits. The controller routes each one to the status
/// machine, the graph model, or the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BlockEvent {
    Select,
    Start,
    Stop,
    Configure,
    View,
    Duplicate,
    Delete,
    ToggleDetails,
}

// =============================================================
// Icons and palette
// =============================================================

/// Glyphs used by block cards. Names follow the lucide icon set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Icon {
    Target,
    TrendingUp,
    Users,
    Globe,
    Network,
    Zap,
    Database,
    Brain,
    Star,
    CheckCircle,
    RefreshCw,
    AlertCircle,
    Pause,
    Info,
    Play,
    Eye,
    Settings,
    Copy,
    Trash,
    Activity,
    Clock,
    Cpu,
    ChevronDown,
    ChevronRight,
}

impl Icon {
    /// Kebab-case icon name as used by the lucide set.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Target => "target",
            Self::TrendingUp => "trending-up",
            Self::Users => "users",
            Self::Globe => "globe",
            Self::Network => "network",
            Self::Zap => "zap",
            Self::Database => "database",
            Self::Brain => "brain",
            Self::Star => "star",
            Self::CheckCircle => "check-circle",
            Self::RefreshCw => "refresh-cw",
            Self::AlertCircle => "alert-circle",
            Self::Pause => "pause",
            Self::Info => "info",
            Self::Play => "play",
            Self::Eye => "eye",
            Self::Settings => "settings",
            Self::Copy => "copy",
            Self::Trash => "trash-2",
            Self::Activity => "activity",
            Self::Clock => "clock",
            Self::Cpu => "cpu",
            Self::ChevronDown => "chevron-down",
            Self::ChevronRight => "chevron-right",
        }
    }
}

/// Named color family. Each maps to a solid 500-weight RGB value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Hue {
    Blue,
    Green,
    Purple,
    Orange,
    Pink,
    Cyan,
    Indigo,
    Yellow,
    Teal,
    Violet,
    Amber,
    Emerald,
    Red,
    Sky,
    Rose,
    Slate,
    Gray,
}

impl Hue {
    /// Solid color as `#rrggbb`.
    #[must_use]
    pub fn hex(self) -> &'static str {
        match self {
            Self::Blue => "#3b82f6",
            Self::Green => "#22c55e",
            Self::Purple => "#a855f7",
            Self::Orange => "#f97316",
            Self::Pink => "#ec4899",
            Self::Cyan => "#06b6d4",
            Self::Indigo => "#6366f1",
            Self::Yellow => "#eab308",
            Self::Teal => "#14b8a6",
            Self::Violet => "#8b5cf6",
            Self::Amber => "#f59e0b",
            Self::Emerald => "#10b981",
            Self::Red => "#ef4444",
            Self::Sky => "#0ea5e9",
            Self::Rose => "#f43f5e",
            Self::Slate => "#64748b",
            Self::Gray => "#6b7280",
        }
    }

    /// The same color as `rgba(...)` with the given alpha.
    #[must_use]
    pub fn rgba(self, alpha: f64) -> String {
        let hex = self.hex().trim_start_matches('#');
        let channel = |i: usize| hex.get(i..i + 2).map_or(0, |c| u8::from_str_radix(c, 16).unwrap_or(0));
        format!("rgba({}, {}, {}, {alpha})", channel(0), channel(2), channel(4))
    }
}

/// Icon shown in the header of a block of this kind.
#[must_use]
pub fn block_icon(block_type: BlockType) -> Icon {
    match block_type {
        BlockType::Dashboard | BlockType::AdsTool => Icon::Target,
        BlockType::Analytics => Icon::TrendingUp,
        BlockType::Crm | BlockType::Leads => Icon::Users,
        BlockType::Ecommerce | BlockType::LandingPage | BlockType::WebBrowser | BlockType::Products => Icon::Globe,
        BlockType::EmailMarketing | BlockType::SocialBuffer | BlockType::Integrations => Icon::Network,
        BlockType::Workflows => Icon::Zap,
        BlockType::MediaLibrary => Icon::Database,
        BlockType::AiAgent | BlockType::AiLaboratory | BlockType::AiContext => Icon::Brain,
        BlockType::Aura => Icon::Star,
    }
}

/// Card tint for a block of this kind.
#[must_use]
pub fn block_hue(block_type: BlockType) -> Hue {
    match block_type {
        BlockType::Dashboard => Hue::Blue,
        BlockType::Analytics => Hue::Green,
        BlockType::Crm => Hue::Purple,
        BlockType::Ecommerce => Hue::Orange,
        BlockType::LandingPage => Hue::Pink,
        BlockType::EmailMarketing => Hue::Cyan,
        BlockType::Leads => Hue::Indigo,
        BlockType::Workflows => Hue::Yellow,
        BlockType::MediaLibrary => Hue::Teal,
        BlockType::AiAgent | BlockType::AiLaboratory | BlockType::AiContext => Hue::Violet,
        BlockType::Aura => Hue::Amber,
        BlockType::SocialBuffer => Hue::Emerald,
        BlockType::AdsTool => Hue::Red,
        BlockType::WebBrowser => Hue::Sky,
        BlockType::Products => Hue::Rose,
        BlockType::Integrations => Hue::Slate,
    }
}

/// Status pill in the block header.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusBadge {
    pub icon: Icon,
    pub hue: Hue,
    /// The icon rotates continuously.
    pub spinning: bool,
    pub label: String,
}

#[must_use]
pub fn status_badge(status: BlockStatus) -> StatusBadge {
    let (icon, hue, spinning) = match status {
        BlockStatus::Active => (Icon::CheckCircle, Hue::Green, false),
        BlockStatus::Processing => (Icon::RefreshCw, Hue::Blue, true),
        BlockStatus::Error => (Icon::AlertCircle, Hue::Red, false),
        BlockStatus::Paused => (Icon::Pause, Hue::Yellow, false),
        BlockStatus::Idle => (Icon::Info, Hue::Gray, false),
    };
    StatusBadge { icon, hue, spinning, label: capitalize(status.as_str()) }
}

/// The first action button toggles between start and stop.
#[must_use]
pub fn run_action(status: BlockStatus) -> BlockEvent {
    match status {
        BlockStatus::Active | BlockStatus::Processing => BlockEvent::Stop,
        BlockStatus::Idle | BlockStatus::Paused | BlockStatus::Error => BlockEvent::Start,
    }
}

/// Action buttons in display order for a block in `status`.
#[must_use]
pub fn action_events(status: BlockStatus) -> [BlockEvent; ACTION_COUNT] {
    [run_action(status), BlockEvent::View, BlockEvent::Configure, BlockEvent::Duplicate, BlockEvent::Delete]
}

fn action_style(event: BlockEvent) -> (Icon, Hue) {
    match event {
        BlockEvent::Start => (Icon::Play, Hue::Green),
        BlockEvent::Stop => (Icon::Pause, Hue::Red),
        BlockEvent::View => (Icon::Eye, Hue::Blue),
        BlockEvent::Configure => (Icon::Settings, Hue::Purple),
        BlockEvent::Duplicate => (Icon::Copy, Hue::Yellow),
        BlockEvent::Delete => (Icon::Trash, Hue::Red),
        BlockEvent::Select => (Icon::CheckCircle, Hue::Blue),
        BlockEvent::ToggleDetails => (Icon::ChevronRight, Hue::Gray),
    }
}

// =============================================================
// Layout
// =============================================================

/// World-space geometry of one block card.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlockLayout {
    /// Whole card, including the details panel when expanded.
    pub body: Rect,
    pub badge: Rect,
    /// Action button slots, in [`action_events`] order.
    pub actions: [Rect; ACTION_COUNT],
    pub details_toggle: Rect,
    pub details: Option<Rect>,
    /// Outgoing connection handle, right-center of the nominal card.
    pub source_handle: Point,
    /// Incoming connection handle, left-center of the nominal card.
    pub target_handle: Point,
}

/// Geometry of a block whose top-left corner is at `position`.
#[must_use]
pub fn block_layout(position: Point, expanded: bool) -> BlockLayout {
    let Point { x, y } = position;
    let height = if expanded { BLOCK_HEIGHT + DETAILS_HEIGHT } else { BLOCK_HEIGHT };
    let badge = Rect::new(x + BLOCK_WIDTH - PADDING - BADGE_WIDTH, y + PADDING, BADGE_WIDTH, BADGE_HEIGHT);

    let step = ACTION_BUTTON_SIZE + ACTION_BUTTON_GAP;
    #[allow(clippy::cast_precision_loss)]
    let row_width = ACTION_COUNT as f64 * step - ACTION_BUTTON_GAP;
    let row_x = badge.x - ACTION_BUTTON_GAP - row_width;
    let mut actions = [Rect::default(); ACTION_COUNT];
    for (i, slot) in actions.iter_mut().enumerate() {
        #[allow(clippy::cast_precision_loss)]
        let offset = i as f64 * step;
        *slot = Rect::new(row_x + offset, y + PADDING, ACTION_BUTTON_SIZE, ACTION_BUTTON_SIZE);
    }

    let details_toggle =
        Rect::new(x + PADDING, y + BLOCK_HEIGHT - PADDING - TOGGLE_HEIGHT, BLOCK_WIDTH - 2.0 * PADDING, TOGGLE_HEIGHT);
    let details = expanded.then(|| Rect::new(x, y + BLOCK_HEIGHT, BLOCK_WIDTH, DETAILS_HEIGHT));

    BlockLayout {
        body: Rect::new(x, y, BLOCK_WIDTH, height),
        badge,
        actions,
        details_toggle,
        details,
        source_handle: Point::new(x + BLOCK_WIDTH, y + BLOCK_HEIGHT * 0.5),
        target_handle: Point::new(x, y + BLOCK_HEIGHT * 0.5),
    }
}

// =============================================================
// Visual
// =============================================================

/// Per-block flags owned by the controller.
#[allow(clippy::struct_excessive_bools)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BlockViewState {
    pub selected: bool,
    pub hovered: bool,
    pub expanded: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressBar {
    /// Fill fraction in percent, `[0, 100]`.
    pub percent: f64,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricRow {
    pub icon: Icon,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActionButton {
    pub event: BlockEvent,
    pub icon: Icon,
    pub hue: Hue,
    pub rect: Rect,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetailsPanel {
    pub rect: Rect,
    pub version: String,
    pub category: String,
    pub dependency_count: usize,
    pub tag_count: usize,
    pub tags: Vec<String>,
    pub last_activity: Option<String>,
}

/// Everything needed to draw one block card.
#[allow(clippy::struct_excessive_bools)]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BlockVisual {
    pub id: BlockId,
    pub bounds: Rect,
    pub z_index: i32,
    /// Uniform scale about the card center; above 1.0 while hovered.
    pub scale: f64,
    pub selected: bool,
    pub hovered: bool,
    pub icon: Icon,
    pub hue: Hue,
    pub label: String,
    /// `"<type> • <category>"`.
    pub subtitle: String,
    pub description: Option<String>,
    pub badge: StatusBadge,
    pub badge_rect: Rect,
    /// Present only while the block is active.
    pub progress: Option<ProgressBar>,
    pub metrics: Vec<MetricRow>,
    pub details_toggle: Rect,
    pub details_icon: Icon,
    pub details: Option<DetailsPanel>,
    /// Empty unless hovered.
    pub actions: Vec<ActionButton>,
    pub source_handle: Point,
    pub target_handle: Point,
    pub handles_visible: bool,
}

/// Build the visual for `block` under `state`.
#[must_use]
pub fn block_view(block: &Block, state: BlockViewState) -> BlockVisual {
    let layout = block_layout(block.position, state.expanded);

    let progress = (block.status == BlockStatus::Active).then(|| {
        let percent = block.data.progress.unwrap_or(0.0).clamp(0.0, 100.0);
        ProgressBar { percent, label: format!("{}%", percent.round()) }
    });

    let actions = if state.hovered {
        action_events(block.status)
            .into_iter()
            .zip(layout.actions)
            .map(|(event, rect)| {
                let (icon, hue) = action_style(event);
                ActionButton { event, icon, hue, rect }
            })
            .collect()
    } else {
        Vec::new()
    };

    let details = layout.details.map(|rect| DetailsPanel {
        rect,
        version: block.metadata.version.clone(),
        category: block.metadata.category.clone(),
        dependency_count: block.metadata.dependencies.len(),
        tag_count: block.metadata.tags.len(),
        tags: block.metadata.tags.clone(),
        last_activity: block.data.last_activity.clone(),
    });

    BlockVisual {
        id: block.id,
        bounds: layout.body,
        z_index: if state.selected { SELECTED_Z_INDEX } else { 0 },
        scale: if state.hovered { HOVER_SCALE } else { 1.0 },
        selected: state.selected,
        hovered: state.hovered,
        icon: block_icon(block.block_type),
        hue: block_hue(block.block_type),
        label: block.data.label.clone(),
        subtitle: format!("{} • {}", block.block_type, block.metadata.category),
        description: block.data.description.clone(),
        badge: status_badge(block.status),
        badge_rect: layout.badge,
        progress,
        metrics: metric_rows(block),
        details_toggle: layout.details_toggle,
        details_icon: if state.expanded { Icon::ChevronDown } else { Icon::ChevronRight },
        details,
        actions,
        source_handle: layout.source_handle,
        target_handle: layout.target_handle,
        handles_visible: state.hovered,
    }
}

/// The four metric rows with their fallbacks for missing values.
fn metric_rows(block: &Block) -> Vec<MetricRow> {
    let metric = |key: &str, fallback: &str| {
        block.data.metrics.get(key).map_or_else(|| fallback.to_string(), MetricValue::to_string)
    };
    vec![
        MetricRow { icon: Icon::Activity, text: format!("{} exec", metric("executions", "0")) },
        MetricRow { icon: Icon::Clock, text: metric("uptime", "0s") },
        MetricRow { icon: Icon::Cpu, text: format!("{}% CPU", metric("cpuUsage", "0")) },
        MetricRow { icon: Icon::Database, text: format!("{}MB", metric("memoryUsage", "0")) },
    ]
}

/// Blocks in paint order: unselected first, then selected, each group in
/// graph order. Hit-testing walks the same list backwards.
#[must_use]
pub fn stacking_order<'a>(graph: &'a GraphStore, selection: &SelectionSet) -> Vec<&'a Block> {
    let (selected, rest): (Vec<&Block>, Vec<&Block>) = graph.blocks().partition(|b| selection.contains(&b.id));
    let mut order = rest;
    order.extend(selected);
    order
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
