//! Painting: replays a [`Scene`] onto a 2-D canvas context.
//!
//! This module is the only place that touches [`web_sys::CanvasRenderingContext2d`].
//! It reads a finished scene and produces pixels; it never mutates
//! application state.
//!
//! Canvas 2-D transforms are affine, so the perspective view cannot be set up
//! once on the context. Instead every world point is pushed through
//! [`RenderTransform::world_to_screen`] and drawn in screen space. Rectangles
//! become projected quads; lines stay lines under projection. In 2-D mode the
//! same path reduces to scale-and-translate.
//!
//! All fallible `Canvas2D` calls propagate errors via `Result<(), JsValue>`.
//! The top-level caller ([`crate::engine::Engine::render`]) handles the result.

use std::f64::consts::PI;

use wasm_bindgen::JsValue;
use web_sys::CanvasRenderingContext2d;

use crate::block_view::{BlockVisual, DetailsPanel, Icon};
use crate::camera::{Point, Rect, RenderTransform};
use crate::connection_view::ConnectionVisual;
use crate::consts::{ACTION_BUTTON_SIZE, BLOCK_WIDTH};
use crate::minimap::MinimapVisual;
use crate::render::{GridVisual, Scene};

const BACKGROUND: &str = "#030712";
const CARD_FILL: &str = "rgba(17, 24, 39, 0.9)";
const CARD_BORDER: &str = "rgba(255, 255, 255, 0.1)";
const SELECTED_BORDER: &str = "#60a5fa";
const TEXT_PRIMARY: &str = "#ffffff";
const TEXT_MUTED: &str = "#9ca3af";
const PANEL_FILL: &str = "rgba(0, 0, 0, 0.3)";
const CHROME_FILL: &str = "rgba(17, 24, 39, 0.8)";

/// Radius of connection handles in world units.
const HANDLE_RADIUS_WORLD: f64 = 6.0;

/// Below this on-screen spacing, grid lines are thinned out.
const GRID_MIN_SCREEN_SPACING: f64 = 8.0;

/// Draw the full scene.
///
/// `dpr` is the device pixel ratio; scene geometry is in CSS pixels.
///
/// # Errors
///
/// Returns `Err` if any `Canvas2D` call fails (e.g. invalid context state).
pub fn draw(ctx: &CanvasRenderingContext2d, scene: &Scene, dpr: f64) -> Result<(), JsValue> {
    let vw = scene.viewport.width;
    let vh = scene.viewport.height;

    // Layer 1: clear in screen space.
    ctx.set_transform(dpr, 0.0, 0.0, dpr, 0.0, 0.0)?;
    ctx.set_fill_style_str(BACKGROUND);
    ctx.fill_rect(0.0, 0.0, vw, vh);

    let flat = Surface::flat(ctx, &scene.transform);

    // Layer 2: grid.
    if let Some(grid) = &scene.grid {
        draw_grid(&flat, grid);
    }

    // Layer 3: connections beneath blocks.
    for conn in &scene.connections {
        draw_connection(&flat, conn)?;
    }

    // Layer 4: block cards, bottom first.
    for block in &scene.blocks {
        draw_block(ctx, &scene.transform, block)?;
    }

    // Layer 5: rubber band on top of everything in world space.
    if let Some(pending) = &scene.pending {
        draw_connection(&flat, pending)?;
    }

    // Layer 6: screen-space chrome.
    if let Some(minimap) = &scene.minimap {
        draw_minimap(ctx, minimap)?;
    }
    draw_status_bar(ctx, scene)?;

    Ok(())
}

// =============================================================
// Projection surface
// =============================================================

/// World-space drawing helper. Applies an optional uniform scale about
/// `focus` (the hover lift of a card) before projecting to the screen.
struct Surface<'a> {
    ctx: &'a CanvasRenderingContext2d,
    transform: &'a RenderTransform,
    focus: Point,
    scale: f64,
}

impl<'a> Surface<'a> {
    fn flat(ctx: &'a CanvasRenderingContext2d, transform: &'a RenderTransform) -> Self {
        Self { ctx, transform, focus: Point::default(), scale: 1.0 }
    }

    fn at(&self, world: Point) -> Option<Point> {
        let lifted = Point::new(
            self.focus.x + (world.x - self.focus.x) * self.scale,
            self.focus.y + (world.y - self.focus.y) * self.scale,
        );
        self.transform.world_to_screen(lifted)
    }

    /// Screen pixels per world unit near `world`.
    fn local_scale(&self, world: Point) -> f64 {
        match (self.at(world), self.at(world.offset(1.0, 0.0))) {
            (Some(a), Some(b)) => a.distance(b),
            _ => 0.0,
        }
    }

    /// Trace `rect` as a closed path. Returns `false` if any corner is behind
    /// the viewer, in which case nothing was traced.
    fn trace_rect(&self, rect: Rect) -> bool {
        let corners = [
            Point::new(rect.x, rect.y),
            Point::new(rect.right(), rect.y),
            Point::new(rect.right(), rect.bottom()),
            Point::new(rect.x, rect.bottom()),
        ];
        let Some(projected) = corners.into_iter().map(|c| self.at(c)).collect::<Option<Vec<_>>>() else {
            return false;
        };
        self.ctx.begin_path();
        for (i, p) in projected.iter().enumerate() {
            if i == 0 {
                self.ctx.move_to(p.x, p.y);
            } else {
                self.ctx.line_to(p.x, p.y);
            }
        }
        self.ctx.close_path();
        true
    }

    fn fill_rect(&self, rect: Rect, fill: &str) {
        if self.trace_rect(rect) {
            self.ctx.set_fill_style_str(fill);
            self.ctx.fill();
        }
    }

    fn stroke_rect(&self, rect: Rect, stroke: &str, width_world: f64) {
        if self.trace_rect(rect) {
            self.ctx.set_stroke_style_str(stroke);
            self.ctx.set_line_width(width_world * self.local_scale(rect.center()));
            self.ctx.stroke();
        }
    }

    fn segment(&self, a: Point, b: Point) -> bool {
        let (Some(a), Some(b)) = (self.at(a), self.at(b)) else {
            return false;
        };
        self.ctx.begin_path();
        self.ctx.move_to(a.x, a.y);
        self.ctx.line_to(b.x, b.y);
        true
    }

    fn dot(&self, center: Point, radius_world: f64, fill: &str) -> Result<(), JsValue> {
        let Some(c) = self.at(center) else {
            return Ok(());
        };
        self.ctx.begin_path();
        self.ctx.arc(c.x, c.y, radius_world * self.local_scale(center), 0.0, 2.0 * PI)?;
        self.ctx.set_fill_style_str(fill);
        self.ctx.fill();
        Ok(())
    }

    /// Left-aligned text with its baseline-middle at `at`, sized in world
    /// units and ellipsized to `max_w` world units.
    fn text(&self, text: &str, at: Point, size_world: f64, color: &str, max_w: f64) -> Result<(), JsValue> {
        let Some(p) = self.at(at) else {
            return Ok(());
        };
        let scale = self.local_scale(at);
        let size = size_world * scale;
        if size < 1.0 {
            return Ok(());
        }
        self.ctx.set_font(&format!("{size:.0}px sans-serif"));
        self.ctx.set_fill_style_str(color);
        self.ctx.set_text_align("left");
        self.ctx.set_text_baseline("middle");
        let fitted = fit_text_with_ellipsis(self.ctx, text, max_w * scale);
        self.ctx.fill_text(&fitted, p.x, p.y)
    }
}

// =============================================================
// Grid and connections
// =============================================================

fn draw_grid(surface: &Surface<'_>, grid: &GridVisual) {
    if grid.screen_spacing <= 0.0 || grid.extent.width <= 0.0 || grid.extent.height <= 0.0 {
        return;
    }
    let mut step = grid.spacing;
    let mut screen = grid.screen_spacing;
    while screen < GRID_MIN_SCREEN_SPACING {
        step *= 2.0;
        screen *= 2.0;
    }

    let ctx = surface.ctx;
    ctx.save();
    ctx.set_stroke_style_str(grid.stroke);
    ctx.set_line_width(1.0);

    let r = grid.extent;
    let mut x = (r.x / step).floor() * step;
    while x <= r.right() {
        if surface.segment(Point::new(x, r.y), Point::new(x, r.bottom())) {
            ctx.stroke();
        }
        x += step;
    }
    let mut y = (r.y / step).floor() * step;
    while y <= r.bottom() {
        if surface.segment(Point::new(r.x, y), Point::new(r.right(), y)) {
            ctx.stroke();
        }
        y += step;
    }
    ctx.restore();
}

fn draw_connection(surface: &Surface<'_>, conn: &ConnectionVisual) -> Result<(), JsValue> {
    let ctx = surface.ctx;
    let scale = surface.local_scale(conn.from);

    ctx.save();
    ctx.set_stroke_style_str(conn.stroke);
    ctx.set_line_width(conn.width * scale);
    if let Some([dash, gap]) = conn.dash {
        let dash_array = js_sys::Array::new();
        dash_array.push(&(dash * scale).into());
        dash_array.push(&(gap * scale).into());
        ctx.set_line_dash(&dash_array)?;
        ctx.set_line_dash_offset(conn.dash_offset * scale);
    }
    if surface.segment(conn.from, conn.to) {
        ctx.stroke();
    }
    ctx.restore();
    Ok(())
}

// =============================================================
// Block cards
// =============================================================

fn draw_block(ctx: &CanvasRenderingContext2d, transform: &RenderTransform, block: &BlockVisual) -> Result<(), JsValue> {
    let b = block.bounds;
    let surface = Surface { ctx, transform, focus: b.center(), scale: block.scale };

    ctx.save();

    // Card.
    surface.fill_rect(b, CARD_FILL);
    if block.selected {
        surface.stroke_rect(b, SELECTED_BORDER, 2.0);
    } else {
        surface.stroke_rect(b, CARD_BORDER, 1.0);
    }

    // Header: icon tile, label, subtitle, status badge.
    let tile = Rect::new(b.x + 12.0, b.y + 12.0, 32.0, 32.0);
    surface.fill_rect(tile, &block.hue.rgba(0.2));
    surface.text(glyph(block.icon), Point::new(tile.x + 9.0, tile.y + 16.0), 14.0, block.hue.hex(), 20.0)?;
    let text_x = tile.right() + 10.0;
    let text_w = block.badge_rect.x - text_x - 4.0;
    surface.text(&block.label, Point::new(text_x, b.y + 22.0), 14.0, TEXT_PRIMARY, text_w)?;
    surface.text(&block.subtitle, Point::new(text_x, b.y + 38.0), 11.0, TEXT_MUTED, text_w)?;

    let badge = block.badge_rect;
    surface.fill_rect(badge, &block.badge.hue.rgba(0.2));
    let badge_label = format!("{} {}", glyph(block.badge.icon), block.badge.label);
    surface.text(&badge_label, Point::new(badge.x + 6.0, badge.center().y), 11.0, block.badge.hue.hex(), badge.width - 8.0)?;

    // Body: description, progress, metrics.
    let inner_w = BLOCK_WIDTH - 24.0;
    if let Some(description) = &block.description {
        surface.text(description, Point::new(b.x + 12.0, b.y + 62.0), 12.0, TEXT_MUTED, inner_w)?;
    }
    if let Some(progress) = &block.progress {
        let track = Rect::new(b.x + 12.0, b.y + 80.0, inner_w, 6.0);
        surface.fill_rect(track, "rgba(255, 255, 255, 0.1)");
        let fill = Rect::new(track.x, track.y, track.width * progress.percent / 100.0, track.height);
        surface.fill_rect(fill, block.hue.hex());
        surface.text(&progress.label, Point::new(track.right() - 28.0, track.y - 8.0), 10.0, TEXT_MUTED, 28.0)?;
    }
    for (i, row) in block.metrics.iter().enumerate() {
        let col = (i % 2) as f64;
        let line = (i / 2) as f64;
        let at = Point::new(b.x + 12.0 + col * inner_w * 0.5, b.y + 108.0 + line * 20.0);
        let text = format!("{} {}", glyph(row.icon), row.text);
        surface.text(&text, at, 11.0, TEXT_MUTED, inner_w * 0.5 - 4.0)?;
    }

    // Details toggle and panel.
    let toggle = block.details_toggle;
    let toggle_text = format!("{} Details", glyph(block.details_icon));
    surface.text(&toggle_text, Point::new(toggle.x, toggle.center().y), 11.0, TEXT_MUTED, toggle.width)?;
    if let Some(details) = &block.details {
        draw_details(&surface, details)?;
    }

    // Hover chrome: action buttons and connection handles.
    for action in &block.actions {
        surface.fill_rect(action.rect, &action.hue.rgba(0.2));
        let at = Point::new(action.rect.x + 6.0, action.rect.center().y);
        surface.text(glyph(action.icon), at, 12.0, action.hue.hex(), ACTION_BUTTON_SIZE)?;
    }
    if block.handles_visible {
        surface.dot(block.source_handle, HANDLE_RADIUS_WORLD, block.hue.hex())?;
        surface.dot(block.target_handle, HANDLE_RADIUS_WORLD, block.hue.hex())?;
    }

    ctx.restore();
    Ok(())
}

fn draw_details(surface: &Surface<'_>, details: &DetailsPanel) -> Result<(), JsValue> {
    let r = details.rect;
    surface.fill_rect(r, PANEL_FILL);
    let mut lines = vec![
        format!("Version {}", details.version),
        format!("Category {}", details.category),
        format!("{} dependencies • {} tags", details.dependency_count, details.tag_count),
    ];
    if !details.tags.is_empty() {
        lines.push(details.tags.join(", "));
    }
    if let Some(last) = &details.last_activity {
        lines.push(format!("Last activity {last}"));
    }
    for (i, line) in lines.iter().enumerate() {
        let at = Point::new(r.x + 12.0, r.y + 16.0 + i as f64 * 20.0);
        surface.text(line, at, 11.0, TEXT_MUTED, r.width - 24.0)?;
    }
    Ok(())
}

/// Single-character stand-in for an icon on a plain 2-D canvas.
fn glyph(icon: Icon) -> &'static str {
    match icon {
        Icon::Play => "▶",
        Icon::Pause => "⏸",
        Icon::Eye => "◉",
        Icon::Settings => "⚙",
        Icon::Copy => "⧉",
        Icon::Trash => "✕",
        Icon::CheckCircle => "✓",
        Icon::RefreshCw => "↻",
        Icon::AlertCircle => "!",
        Icon::Info => "i",
        Icon::Star => "★",
        Icon::Zap => "⚡",
        Icon::TrendingUp => "↗",
        Icon::Clock => "◷",
        Icon::ChevronDown => "▾",
        Icon::ChevronRight => "▸",
        Icon::Target
        | Icon::Users
        | Icon::Globe
        | Icon::Network
        | Icon::Database
        | Icon::Brain
        | Icon::Activity
        | Icon::Cpu => "•",
    }
}

// =============================================================
// Screen-space chrome
// =============================================================

fn draw_minimap(ctx: &CanvasRenderingContext2d, minimap: &MinimapVisual) -> Result<(), JsValue> {
    let f = minimap.frame;
    ctx.save();
    ctx.set_fill_style_str(CHROME_FILL);
    ctx.fill_rect(f.x, f.y, f.width, f.height);
    ctx.set_stroke_style_str(CARD_BORDER);
    ctx.set_line_width(1.0);
    ctx.stroke_rect(f.x, f.y, f.width, f.height);
    for dot in &minimap.dots {
        ctx.begin_path();
        ctx.arc(dot.center.x, dot.center.y, dot.radius, 0.0, 2.0 * PI)?;
        ctx.set_fill_style_str(dot.hue.hex());
        ctx.fill();
    }
    ctx.restore();
    Ok(())
}

fn draw_status_bar(ctx: &CanvasRenderingContext2d, scene: &Scene) -> Result<(), JsValue> {
    let vh = scene.viewport.height;
    ctx.save();
    ctx.set_font("12px sans-serif");
    ctx.set_text_align("left");
    ctx.set_text_baseline("middle");

    let status = scene.status_bar.text();
    let width = measured_text_width(ctx, &status).min(scene.viewport.width) + 16.0;
    ctx.set_fill_style_str(CHROME_FILL);
    ctx.fill_rect(16.0, vh - 44.0, width, 28.0);
    ctx.set_fill_style_str(TEXT_MUTED);
    ctx.fill_text(&status, 24.0, vh - 30.0)?;

    if let Some(bar) = &scene.selection_bar {
        let text = bar.text();
        let w = measured_text_width(ctx, &text) + 16.0;
        let x = (scene.viewport.width - w) * 0.5;
        ctx.set_fill_style_str(CHROME_FILL);
        ctx.fill_rect(x, vh - 44.0, w, 28.0);
        ctx.set_fill_style_str(TEXT_PRIMARY);
        ctx.fill_text(&text, x + 8.0, vh - 30.0)?;
    }

    ctx.restore();
    Ok(())
}

// =============================================================
// Text
// =============================================================

fn fit_text_with_ellipsis(ctx: &CanvasRenderingContext2d, text: &str, max_w: f64) -> String {
    let trimmed = text.trim();
    if trimmed.is_empty() || measured_text_width(ctx, trimmed) <= max_w {
        return trimmed.to_owned();
    }
    let ellipsis = "…";
    let mut out = String::new();
    for ch in trimmed.chars() {
        let mut candidate = out.clone();
        candidate.push(ch);
        candidate.push_str(ellipsis);
        if measured_text_width(ctx, &candidate) > max_w {
            break;
        }
        out.push(ch);
    }
    out.push_str(ellipsis);
    out
}

fn measured_text_width(ctx: &CanvasRenderingContext2d, text: &str) -> f64 {
    match ctx.measure_text(text) {
        Ok(metrics) => metrics.width(),
        Err(_) => f64::INFINITY,
    }
}
