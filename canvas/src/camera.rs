//! Transform engine: view state, coordinate conversions, and the 3-D projection.
//!
//! Three coordinate spaces are involved:
//!
//! - **screen**: CSS pixels relative to the top-left of the canvas panel, as
//!   delivered by pointer and wheel events.
//! - **plane**: the panel's own surface before the optional 3-D transform is
//!   applied. In 2-D mode plane and screen coincide.
//! - **world**: the coordinate system blocks live in. `plane = world * zoom + pan`.
//!
//! [`Camera`] owns the mutable view parameters and clamps every mutation.
//! [`Camera::render_transform`] is the single pure mapping from view state to
//! the [`RenderTransform`] that renderers and hit-testing consume.

#[cfg(test)]
#[path = "camera_test.rs"]
mod camera_test;

use serde::{Deserialize, Serialize};

use crate::consts::{
    BLOCK_HEIGHT, BLOCK_WIDTH, DEPTH_MAX, DEPTH_MIN, FIT_MARGIN, PERSPECTIVE_DEFAULT, PERSPECTIVE_MAX,
    PERSPECTIVE_MIN, ZOOM_MAX, ZOOM_MIN,
};
use crate::graph::Block;

/// Below this magnitude a projective denominator is treated as degenerate.
const PROJECTION_EPSILON: f64 = 1e-9;

/// A point in screen, plane, or world space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    #[must_use]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Return this point shifted by `(dx, dy)`.
    #[must_use]
    pub fn offset(self, dx: f64, dy: f64) -> Self {
        Self { x: self.x + dx, y: self.y + dy }
    }

    /// Euclidean distance to `other`.
    #[must_use]
    pub fn distance(self, other: Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// Axis-aligned rectangle, top-left anchored.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    #[must_use]
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    /// Whether `pt` lies inside or on the border.
    #[must_use]
    pub fn contains(&self, pt: Point) -> bool {
        pt.x >= self.x && pt.x <= self.x + self.width && pt.y >= self.y && pt.y <= self.y + self.height
    }

    #[must_use]
    pub fn center(&self) -> Point {
        Point::new(self.x + self.width * 0.5, self.y + self.height * 0.5)
    }

    #[must_use]
    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    #[must_use]
    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    /// Smallest rectangle covering both `self` and `other`.
    #[must_use]
    pub fn union(&self, other: &Rect) -> Rect {
        let x = self.x.min(other.x);
        let y = self.y.min(other.y);
        Rect::new(x, y, self.right().max(other.right()) - x, self.bottom().max(other.bottom()) - y)
    }
}

/// Bounding box of a set of blocks using the nominal block extent.
///
/// Returns `None` for an empty set.
pub fn content_bounds<'a>(blocks: impl IntoIterator<Item = &'a Block>) -> Option<Rect> {
    blocks
        .into_iter()
        .map(|b| Rect::new(b.position.x, b.position.y, BLOCK_WIDTH, BLOCK_HEIGHT))
        .reduce(|acc, r| acc.union(&r))
}

/// Whether the panel is drawn flat or through the perspective transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ViewMode {
    #[default]
    #[serde(rename = "2d")]
    TwoD,
    #[serde(rename = "3d")]
    ThreeD,
}

/// Rotation axis for the 3-D view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    X,
    Y,
    Z,
}

/// Rotation about the three axes, in degrees, each kept in `[0, 360)`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Rotation {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// Size of the canvas panel in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

impl Viewport {
    #[must_use]
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    #[must_use]
    pub fn center(&self) -> Point {
        Point::new(self.width * 0.5, self.height * 0.5)
    }

    fn has_area(&self) -> bool {
        self.width > 0.0 && self.height > 0.0
    }
}

/// View state for pan/zoom and the optional 3-D perspective.
///
/// `pan` is in CSS pixels in plane space. `zoom` is a scale factor
/// (1.0 = no zoom). Fields are private: every mutator clamps zoom, depth, and
/// perspective and wraps rotation, so the view can never leave its bounds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    pan_x: f64,
    pan_y: f64,
    zoom: f64,
    mode: ViewMode,
    depth: f64,
    perspective: f64,
    rotation: Rotation,
    viewport: Viewport,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            pan_x: 0.0,
            pan_y: 0.0,
            zoom: 1.0,
            mode: ViewMode::TwoD,
            depth: 0.0,
            perspective: PERSPECTIVE_DEFAULT,
            rotation: Rotation::default(),
            viewport: Viewport::default(),
        }
    }
}

impl Camera {
    #[must_use]
    pub fn new(mode: ViewMode) -> Self {
        Self { mode, ..Self::default() }
    }

    // --- Accessors ---

    #[must_use]
    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    #[must_use]
    pub fn pan(&self) -> Point {
        Point::new(self.pan_x, self.pan_y)
    }

    #[must_use]
    pub fn mode(&self) -> ViewMode {
        self.mode
    }

    #[must_use]
    pub fn depth(&self) -> f64 {
        self.depth
    }

    #[must_use]
    pub fn perspective(&self) -> f64 {
        self.perspective
    }

    #[must_use]
    pub fn rotation(&self) -> Rotation {
        self.rotation
    }

    #[must_use]
    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    /// Zoom as a rounded percentage, as shown in the status bar.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn zoom_percent(&self) -> i64 {
        (self.zoom * 100.0).round() as i64
    }

    // --- Mutators ---

    /// Update the panel size. Negative or non-finite sizes collapse to zero.
    pub fn set_viewport(&mut self, width: f64, height: f64) {
        let sanitize = |v: f64| if v.is_finite() { v.max(0.0) } else { 0.0 };
        self.viewport = Viewport::new(sanitize(width), sanitize(height));
    }

    pub fn set_mode(&mut self, mode: ViewMode) {
        self.mode = mode;
    }

    /// Switch between 2-D and 3-D, returning the new mode.
    pub fn toggle_mode(&mut self) -> ViewMode {
        self.mode = match self.mode {
            ViewMode::TwoD => ViewMode::ThreeD,
            ViewMode::ThreeD => ViewMode::TwoD,
        };
        self.mode
    }

    /// Add `delta` to the zoom factor and clamp to `[ZOOM_MIN, ZOOM_MAX]`.
    ///
    /// With an `anchor` (a screen point such as the cursor), pan is recomputed
    /// so the world point under the anchor stays put:
    /// `pan' = anchor - (anchor - pan) * (new_zoom / old_zoom)`, evaluated in
    /// plane space. Without an anchor the pan is left alone.
    pub fn zoom_by(&mut self, delta: f64, anchor: Option<Point>) {
        if !delta.is_finite() {
            return;
        }
        let old = self.zoom;
        let new = (old + delta).clamp(ZOOM_MIN, ZOOM_MAX);
        if let Some(anchor_plane) = anchor.and_then(|a| self.screen_to_plane(a)) {
            let ratio = new / old;
            self.pan_x = anchor_plane.x - (anchor_plane.x - self.pan_x) * ratio;
            self.pan_y = anchor_plane.y - (anchor_plane.y - self.pan_y) * ratio;
        }
        self.zoom = new;
    }

    /// Shift the pan by a raw screen-space delta.
    pub fn pan_by(&mut self, delta: Point) {
        if !delta.is_finite() {
            return;
        }
        self.pan_x += delta.x;
        self.pan_y += delta.y;
    }

    /// Restore zoom, pan, rotation, and depth. Perspective and mode are kept.
    pub fn reset(&mut self) {
        self.zoom = 1.0;
        self.pan_x = 0.0;
        self.pan_y = 0.0;
        self.rotation = Rotation::default();
        self.depth = 0.0;
    }

    /// Scale and center the view so every block fits in the viewport.
    ///
    /// The scale never exceeds 1.0 before the margin is applied, and the
    /// result is clamped like any other zoom. No-op when there are no blocks
    /// or the viewport has no area yet.
    pub fn fit_to_content<'a>(&mut self, blocks: impl IntoIterator<Item = &'a Block>) {
        let Some(bounds) = content_bounds(blocks) else {
            return;
        };
        if !self.viewport.has_area() || bounds.width <= 0.0 || bounds.height <= 0.0 {
            return;
        }
        let scale_x = self.viewport.width / bounds.width;
        let scale_y = self.viewport.height / bounds.height;
        let scale = (scale_x.min(scale_y).min(1.0) * FIT_MARGIN).clamp(ZOOM_MIN, ZOOM_MAX);
        let center = bounds.center();
        self.zoom = scale;
        self.pan_x = self.viewport.width * 0.5 - center.x * scale;
        self.pan_y = self.viewport.height * 0.5 - center.y * scale;
    }

    /// Move the 3-D depth, clamped to `[DEPTH_MIN, DEPTH_MAX]`.
    pub fn adjust_depth(&mut self, delta: f64) {
        if delta.is_finite() {
            self.depth = (self.depth + delta).clamp(DEPTH_MIN, DEPTH_MAX);
        }
    }

    /// Move the perspective distance, clamped to `[PERSPECTIVE_MIN, PERSPECTIVE_MAX]`.
    pub fn adjust_perspective(&mut self, delta: f64) {
        if delta.is_finite() {
            self.perspective = (self.perspective + delta).clamp(PERSPECTIVE_MIN, PERSPECTIVE_MAX);
        }
    }

    /// Rotate about `axis` by `delta` degrees, wrapping into `[0, 360)`.
    pub fn adjust_rotation(&mut self, axis: Axis, delta: f64) {
        if !delta.is_finite() {
            return;
        }
        let slot = match axis {
            Axis::X => &mut self.rotation.x,
            Axis::Y => &mut self.rotation.y,
            Axis::Z => &mut self.rotation.z,
        };
        *slot = (*slot + delta).rem_euclid(360.0);
    }

    // --- Conversions ---

    /// The render transform for the current view state.
    #[must_use]
    pub fn render_transform(&self) -> RenderTransform {
        let projection = match self.mode {
            ViewMode::TwoD => None,
            ViewMode::ThreeD => Some(Projection {
                origin: self.viewport.center(),
                distance: self.perspective,
                depth: self.depth,
                rotation: rotation_matrix(self.rotation),
            }),
        };
        RenderTransform { zoom: self.zoom, pan: self.pan(), projection }
    }

    /// Convert a screen point to world coordinates.
    ///
    /// Returns `None` only in 3-D mode when the ray through `screen` misses
    /// the panel plane.
    #[must_use]
    pub fn screen_to_world(&self, screen: Point) -> Option<Point> {
        self.render_transform().screen_to_world(screen)
    }

    /// Convert a world point to screen coordinates.
    ///
    /// Returns `None` only in 3-D mode when the point lies behind the viewer.
    #[must_use]
    pub fn world_to_screen(&self, world: Point) -> Option<Point> {
        self.render_transform().world_to_screen(world)
    }

    /// Convert a screen-space distance (pixels) to world-space distance.
    #[must_use]
    pub fn screen_dist_to_world(&self, screen_dist: f64) -> f64 {
        screen_dist / self.zoom
    }

    fn screen_to_plane(&self, screen: Point) -> Option<Point> {
        self.render_transform().screen_to_plane(screen)
    }
}

// =============================================================
// Render transform
// =============================================================

/// Row-major 3×3 rotation matrix.
pub type Mat3 = [[f64; 3]; 3];

/// Row-major 4×4 homogeneous matrix.
pub type Mat4 = [[f64; 4]; 4];

/// Perspective part of the panel transform, applied around `origin`.
///
/// Equivalent to the CSS chain
/// `perspective(distance) rotateX rotateY rotateZ translateZ(depth)` with the
/// transform origin at the viewport center.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projection {
    pub origin: Point,
    pub distance: f64,
    pub depth: f64,
    pub rotation: Mat3,
}

impl Projection {
    /// Map a plane point to the screen.
    #[must_use]
    pub fn project(&self, plane: Point) -> Option<Point> {
        let v = [plane.x - self.origin.x, plane.y - self.origin.y, self.depth];
        let r = mat3_apply(&self.rotation, v);
        let w = 1.0 - r[2] / self.distance;
        if w <= PROJECTION_EPSILON {
            return None;
        }
        Some(Point::new(self.origin.x + r[0] / w, self.origin.y + r[1] / w))
    }

    /// Intersect the viewing ray through `screen` with the panel plane.
    #[must_use]
    pub fn unproject(&self, screen: Point) -> Option<Point> {
        let sx = screen.x - self.origin.x;
        let sy = screen.y - self.origin.y;
        let d = self.distance;
        let m = &self.rotation;
        let (a, b) = ([m[0][0], m[1][0], m[2][0]], [m[0][1], m[1][1], m[2][1]]);
        let q = [m[0][2] * self.depth, m[1][2] * self.depth, m[2][2] * self.depth];

        let a11 = a[0] + sx * a[2] / d;
        let a12 = b[0] + sx * b[2] / d;
        let a21 = a[1] + sy * a[2] / d;
        let a22 = b[1] + sy * b[2] / d;
        let r1 = sx - q[0] - sx * q[2] / d;
        let r2 = sy - q[1] - sy * q[2] / d;

        let det = a11 * a22 - a12 * a21;
        if det.abs() < PROJECTION_EPSILON {
            return None;
        }
        let x = (r1 * a22 - a12 * r2) / det;
        let y = (a11 * r2 - r1 * a21) / det;

        let z = x * a[2] + y * b[2] + q[2];
        if 1.0 - z / d <= PROJECTION_EPSILON {
            return None;
        }
        Some(Point::new(self.origin.x + x, self.origin.y + y))
    }

    /// The projection as a homogeneous matrix acting on plane points.
    #[must_use]
    pub fn matrix(&self) -> Mat4 {
        let (ox, oy) = (self.origin.x, self.origin.y);
        let r = &self.rotation;
        let rot = [
            [r[0][0], r[0][1], r[0][2], 0.0],
            [r[1][0], r[1][1], r[1][2], 0.0],
            [r[2][0], r[2][1], r[2][2], 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ];
        let mut persp = identity4();
        persp[3][2] = -1.0 / self.distance;
        let to_origin = translation4(-ox, -oy, 0.0);
        let back = translation4(ox, oy, 0.0);
        let depth = translation4(0.0, 0.0, self.depth);
        mat4_mul(&back, &mat4_mul(&persp, &mat4_mul(&rot, &mat4_mul(&depth, &to_origin))))
    }
}

/// Full world-to-screen mapping for one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderTransform {
    pub zoom: f64,
    pub pan: Point,
    pub projection: Option<Projection>,
}

impl RenderTransform {
    #[must_use]
    pub fn world_to_plane(&self, world: Point) -> Point {
        Point::new(world.x * self.zoom + self.pan.x, world.y * self.zoom + self.pan.y)
    }

    #[must_use]
    pub fn plane_to_world(&self, plane: Point) -> Point {
        Point::new((plane.x - self.pan.x) / self.zoom, (plane.y - self.pan.y) / self.zoom)
    }

    #[must_use]
    pub fn screen_to_plane(&self, screen: Point) -> Option<Point> {
        match &self.projection {
            None => Some(screen),
            Some(p) => p.unproject(screen),
        }
    }

    #[must_use]
    pub fn world_to_screen(&self, world: Point) -> Option<Point> {
        let plane = self.world_to_plane(world);
        match &self.projection {
            None => Some(plane),
            Some(p) => p.project(plane),
        }
    }

    #[must_use]
    pub fn screen_to_world(&self, screen: Point) -> Option<Point> {
        self.screen_to_plane(screen).map(|plane| self.plane_to_world(plane))
    }

    /// The complete transform as a homogeneous matrix acting on world points.
    ///
    /// Column-major output matches the argument order of CSS `matrix3d()`.
    #[must_use]
    pub fn css_matrix3d(&self) -> [f64; 16] {
        let mut scale_pan = identity4();
        scale_pan[0][0] = self.zoom;
        scale_pan[1][1] = self.zoom;
        scale_pan[0][3] = self.pan.x;
        scale_pan[1][3] = self.pan.y;
        let m = match &self.projection {
            None => scale_pan,
            Some(p) => mat4_mul(&p.matrix(), &scale_pan),
        };
        let mut out = [0.0; 16];
        for (col, chunk) in out.chunks_mut(4).enumerate() {
            for (row, slot) in chunk.iter_mut().enumerate() {
                *slot = m[row][col];
            }
        }
        out
    }
}

// =============================================================
// Matrix helpers
// =============================================================

fn rotation_matrix(rotation: Rotation) -> Mat3 {
    let (sx, cx) = rotation.x.to_radians().sin_cos();
    let (sy, cy) = rotation.y.to_radians().sin_cos();
    let (sz, cz) = rotation.z.to_radians().sin_cos();
    let rx = [[1.0, 0.0, 0.0], [0.0, cx, -sx], [0.0, sx, cx]];
    let ry = [[cy, 0.0, sy], [0.0, 1.0, 0.0], [-sy, 0.0, cy]];
    let rz = [[cz, -sz, 0.0], [sz, cz, 0.0], [0.0, 0.0, 1.0]];
    mat3_mul(&rx, &mat3_mul(&ry, &rz))
}

fn mat3_mul(a: &Mat3, b: &Mat3) -> Mat3 {
    let mut out = [[0.0; 3]; 3];
    for (i, row) in out.iter_mut().enumerate() {
        for (j, cell) in row.iter_mut().enumerate() {
            *cell = (0..3).map(|k| a[i][k] * b[k][j]).sum();
        }
    }
    out
}

fn mat3_apply(m: &Mat3, v: [f64; 3]) -> [f64; 3] {
    [
        m[0][0] * v[0] + m[0][1] * v[1] + m[0][2] * v[2],
        m[1][0] * v[0] + m[1][1] * v[1] + m[1][2] * v[2],
        m[2][0] * v[0] + m[2][1] * v[1] + m[2][2] * v[2],
    ]
}

fn identity4() -> Mat4 {
    let mut m = [[0.0; 4]; 4];
    for (i, row) in m.iter_mut().enumerate() {
        row[i] = 1.0;
    }
    m
}

fn translation4(x: f64, y: f64, z: f64) -> Mat4 {
    let mut m = identity4();
    m[0][3] = x;
    m[1][3] = y;
    m[2][3] = z;
    m
}

fn mat4_mul(a: &Mat4, b: &Mat4) -> Mat4 {
    let mut out = [[0.0; 4]; 4];
    for (i, row) in out.iter_mut().enumerate() {
        for (j, cell) in row.iter_mut().enumerate() {
            *cell = (0..4).map(|k| a[i][k] * b[k][j]).sum();
        }
    }
    out
}
