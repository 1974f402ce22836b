use iced::mouse::Cursor;
use iced::widget::canvas::{self, Frame, Geometry, LineDash, Program, Stroke, event};
use iced::{Color, Point, Rectangle, Size, Theme, Vector, mouse};

use crate::geometry::PixelWindow;

use super::app::Message;

const MIN_SCALE: f32 = 1.0 / 32.0;
const MAX_SCALE: f32 = 64.0;
const ZOOM_IN_FACTOR: f32 = 1.1;
const ZOOM_OUT_FACTOR: f32 = 0.9;
const CORNER_GRAB_DISTANCE: f32 = 8.0;
const CORNER_HANDLE_SIZE: f32 = 6.0;
// Assumed canvas size until the first layout-bearing event arrives.
const FALLBACK_VIEWPORT: Size = Size::new(800.0, 600.0);
const RECT_COLOR: Color = Color {
    r: 0.2,
    g: 0.45,
    b: 1.0,
    a: 1.0,
};

/// Mouse tool driving the interaction layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ToolMode {
    /// Drag to pan, wheel to zoom.
    #[default]
    Pan,
    /// Drag out a new rectangle.
    Draw,
    /// Grab a corner to resize a rectangle, or its interior to move it.
    Edit,
    /// Click inside a rectangle to delete it.
    Remove,
}

impl ToolMode {
    pub const ALL: [ToolMode; 4] = [
        ToolMode::Pan,
        ToolMode::Draw,
        ToolMode::Edit,
        ToolMode::Remove,
    ];

    pub fn label(self) -> &'static str {
        match self {
            ToolMode::Pan => "Pan",
            ToolMode::Draw => "Draw",
            ToolMode::Edit => "Edit",
            ToolMode::Remove => "Remove",
        }
    }
}

/// Events emitted by the interaction layer toward the application.
#[derive(Debug, Clone)]
pub enum MapEvent {
    Resized(Size),
    Pan { offset: Vector, bounds: Size },
    PanEnded { bounds: Size },
    Zoom { factor: f32, cursor: Point, bounds: Size },
    Refit,
    Hover { cursor: Point, bounds: Size },
    Leave,
    RectDrawn(PixelWindow),
    RectUpdated { index: usize, window: PixelWindow },
    RectRemoved(usize),
}

/// The frame currently on display, pinned to its pixel extent.
pub struct FrameOverlay {
    pub handle: iced::widget::image::Handle,
    pub extent: PixelWindow,
}

/// View state for the map canvas: the displayed frame, the user's
/// rectangles, and the world-to-screen transform.
pub struct MapView {
    overlay: Option<FrameOverlay>,
    rectangles: Vec<PixelWindow>,
    tool: ToolMode,
    scale: f32,
    offset: Vector,
    canvas_size: Size,
    hover_world: Option<(f64, f64)>,
    cache: canvas::Cache,
}

impl Default for MapView {
    fn default() -> Self {
        Self {
            overlay: None,
            rectangles: Vec::new(),
            tool: ToolMode::Pan,
            scale: 1.0,
            offset: Vector::new(0.0, 0.0),
            canvas_size: FALLBACK_VIEWPORT,
            hover_world: None,
            cache: canvas::Cache::default(),
        }
    }
}

impl MapView {
    pub fn tool(&self) -> ToolMode {
        self.tool
    }

    pub fn set_tool(&mut self, tool: ToolMode) {
        self.tool = tool;
    }

    pub fn has_overlay(&self) -> bool {
        self.overlay.is_some()
    }

    pub fn overlay_extent(&self) -> Option<PixelWindow> {
        self.overlay.as_ref().map(|overlay| overlay.extent)
    }

    /// Install or replace the displayed frame. The view transform is left
    /// untouched; the new frame lands wherever its extent says.
    pub fn set_overlay(&mut self, handle: iced::widget::image::Handle, extent: PixelWindow) {
        self.overlay = Some(FrameOverlay { handle, extent });
        self.invalidate();
    }

    pub fn rectangles(&self) -> &[PixelWindow] {
        &self.rectangles
    }

    pub fn hover_world(&self) -> Option<(f64, f64)> {
        self.hover_world
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    pub fn canvas_size(&self) -> Size {
        self.canvas_size
    }

    /// Canvas size in whole pixels, as reported to the backend.
    pub fn canvas_size_px(&self) -> (u32, u32) {
        (
            (self.canvas_size.width.round() as u32).max(1),
            (self.canvas_size.height.round() as u32).max(1),
        )
    }

    pub fn world_to_screen(&self, world: (f64, f64)) -> Point {
        Point::new(
            self.offset.x + world.0 as f32 * self.scale,
            self.offset.y + world.1 as f32 * self.scale,
        )
    }

    pub fn screen_to_world(&self, position: Point) -> (f64, f64) {
        (
            f64::from((position.x - self.offset.x) / self.scale),
            f64::from((position.y - self.offset.y) / self.scale),
        )
    }

    /// The pixel window currently covered by the canvas. Unclamped; it may
    /// extend past the raster on any side.
    pub fn visible_window(&self) -> PixelWindow {
        PixelWindow::from_corners(
            self.screen_to_world(Point::ORIGIN),
            self.screen_to_world(Point::new(self.canvas_size.width, self.canvas_size.height)),
        )
    }

    /// Center the window in the canvas at the largest scale that shows all
    /// of it.
    pub fn fit_to(&mut self, window: PixelWindow) {
        let width = window.width() as f32;
        let height = window.height() as f32;
        self.scale = if width > 0.0 && height > 0.0 {
            (self.canvas_size.width / width)
                .min(self.canvas_size.height / height)
                .clamp(MIN_SCALE, MAX_SCALE)
        } else {
            1.0
        };
        let (center_x, center_y) = window.center();
        self.offset = Vector::new(
            self.canvas_size.width / 2.0 - center_x as f32 * self.scale,
            self.canvas_size.height / 2.0 - center_y as f32 * self.scale,
        );
        self.invalidate();
    }

    /// Fold a canvas event into the view. Returns `true` when the view has
    /// come to rest in a new place and the served frame should be refreshed.
    pub fn apply(&mut self, event: MapEvent) -> bool {
        match event {
            MapEvent::Resized(size) => {
                self.set_canvas_size(size);
                false
            }
            MapEvent::Pan { offset, bounds } => {
                self.set_canvas_size(bounds);
                self.offset = offset;
                self.invalidate();
                false
            }
            MapEvent::PanEnded { bounds } => {
                self.set_canvas_size(bounds);
                true
            }
            MapEvent::Zoom {
                factor,
                cursor,
                bounds,
            } => {
                self.set_canvas_size(bounds);
                self.zoom_about(factor, cursor)
            }
            MapEvent::Refit => match self.overlay_extent() {
                Some(extent) => {
                    self.fit_to(extent);
                    true
                }
                None => false,
            },
            MapEvent::Hover { cursor, bounds } => {
                self.set_canvas_size(bounds);
                self.hover_world = Some(self.screen_to_world(cursor));
                false
            }
            MapEvent::Leave => {
                self.hover_world = None;
                false
            }
            MapEvent::RectDrawn(window) => {
                self.rectangles.push(window);
                false
            }
            MapEvent::RectUpdated { index, window } => {
                if let Some(slot) = self.rectangles.get_mut(index) {
                    *slot = window;
                }
                false
            }
            MapEvent::RectRemoved(index) => {
                if index < self.rectangles.len() {
                    self.rectangles.remove(index);
                }
                false
            }
        }
    }

    fn set_canvas_size(&mut self, size: Size) {
        let changed = (self.canvas_size.width - size.width).abs() > f32::EPSILON
            || (self.canvas_size.height - size.height).abs() > f32::EPSILON;
        if changed {
            self.canvas_size = size;
            self.invalidate();
        }
    }

    fn zoom_about(&mut self, factor: f32, cursor: Point) -> bool {
        let new_scale = (self.scale * factor).clamp(MIN_SCALE, MAX_SCALE);
        if (new_scale - self.scale).abs() <= f32::EPSILON {
            return false;
        }

        // Keep the pixel under the cursor stationary while the scale changes.
        let scale_ratio = new_scale / self.scale;
        self.offset = Vector::new(
            cursor.x - (cursor.x - self.offset.x) * scale_ratio,
            cursor.y - (cursor.y - self.offset.y) * scale_ratio,
        );
        self.scale = new_scale;
        self.invalidate();
        true
    }

    fn invalidate(&mut self) {
        self.cache.clear();
    }

    fn screen_rect(&self, window: PixelWindow) -> (Point, Size) {
        let top_left = self.world_to_screen((window.min_x, window.min_y));
        let size = Size::new(
            window.width() as f32 * self.scale,
            window.height() as f32 * self.scale,
        );
        (top_left, size)
    }

    fn corners(window: PixelWindow) -> [(f64, f64); 4] {
        [
            (window.min_x, window.min_y),
            (window.max_x, window.min_y),
            (window.min_x, window.max_y),
            (window.max_x, window.max_y),
        ]
    }

    /// Topmost rectangle corner within grab distance of `position`, along
    /// with the opposite corner to anchor a resize.
    fn grab_corner(&self, position: Point) -> Option<(usize, (f64, f64))> {
        for (index, window) in self.rectangles.iter().enumerate().rev() {
            let corners = Self::corners(*window);
            for (slot, corner) in corners.iter().enumerate() {
                let screen = self.world_to_screen(*corner);
                let distance = (screen.x - position.x).hypot(screen.y - position.y);
                if distance <= CORNER_GRAB_DISTANCE {
                    return Some((index, corners[3 - slot]));
                }
            }
        }
        None
    }

    /// Topmost rectangle whose interior contains `position`.
    fn window_at(&self, position: Point) -> Option<usize> {
        let (x, y) = self.screen_to_world(position);
        self.rectangles.iter().rposition(|window| window.contains(x, y))
    }
}

/// Transient mouse-drag state owned by the interaction canvas.
#[derive(Debug, Clone, Default)]
pub struct InteractionState {
    drag: Option<Drag>,
}

#[derive(Debug, Clone)]
enum Drag {
    Pan {
        origin: Point,
        start_offset: Vector,
        moved: bool,
    },
    Draw {
        anchor: (f64, f64),
    },
    Resize {
        index: usize,
        anchor: (f64, f64),
    },
    Move {
        index: usize,
        grab: (f64, f64),
        size: (f64, f64),
    },
}

fn local_position(cursor: Cursor, bounds: Rectangle) -> Option<Point> {
    cursor
        .position()
        .map(|global| Point::new(global.x - bounds.x, global.y - bounds.y))
}

// Bottom layer - draws the served frame with the view transform applied,
// no event handling.
pub struct RasterLayer<'a>(pub &'a MapView);

impl<'a> Program<Message> for RasterLayer<'a> {
    type State = ();

    fn draw(
        &self,
        _state: &Self::State,
        renderer: &iced::Renderer,
        _theme: &Theme,
        bounds: Rectangle,
        _cursor: Cursor,
    ) -> Vec<Geometry> {
        let view = self.0;
        let layer = view.cache.draw(renderer, bounds.size(), |frame| {
            frame.fill_rectangle(Point::ORIGIN, bounds.size(), Color::from_rgb8(18, 18, 18));

            if let Some(overlay) = &view.overlay {
                let (top_left, size) = view.screen_rect(overlay.extent);
                frame.draw_image(
                    Rectangle::new(top_left, size),
                    canvas::Image::new(overlay.handle.clone())
                        .filter_method(iced::widget::image::FilterMethod::Nearest),
                );
            } else {
                frame.fill_text(canvas::Text {
                    content: "No image loaded".to_string(),
                    position: Point::new(bounds.width / 2.0 - 70.0, bounds.height / 2.0),
                    color: Color::from_rgb8(200, 200, 200),
                    ..Default::default()
                });
            }
        });

        vec![layer]
    }
}

// Top layer - draws rectangles and the in-progress hint, handles all events.
pub struct InteractionLayer<'a>(pub &'a MapView);

impl<'a> Program<Message> for InteractionLayer<'a> {
    type State = InteractionState;

    fn draw(
        &self,
        state: &Self::State,
        renderer: &iced::Renderer,
        _theme: &Theme,
        bounds: Rectangle,
        cursor: Cursor,
    ) -> Vec<Geometry> {
        let view = self.0;
        let mut frame = Frame::new(renderer, bounds.size());

        let clip_region = Rectangle::new(Point::ORIGIN, bounds.size());
        frame.with_clip(clip_region, |frame| {
            for window in &view.rectangles {
                let (top_left, size) = view.screen_rect(*window);
                frame.stroke_rectangle(
                    top_left,
                    size,
                    Stroke::default().with_width(2.0).with_color(RECT_COLOR),
                );

                if view.tool == ToolMode::Edit {
                    for corner in MapView::corners(*window) {
                        let screen = view.world_to_screen(corner);
                        let half = CORNER_HANDLE_SIZE / 2.0;
                        frame.fill_rectangle(
                            Point::new(screen.x - half, screen.y - half),
                            Size::new(CORNER_HANDLE_SIZE, CORNER_HANDLE_SIZE),
                            RECT_COLOR,
                        );
                    }
                }
            }

            if let Some(Drag::Draw { anchor }) = &state.drag
                && let Some(position) = local_position(cursor, bounds)
            {
                let hint = PixelWindow::from_corners(*anchor, view.screen_to_world(position));
                let (top_left, size) = view.screen_rect(hint);
                frame.stroke_rectangle(
                    top_left,
                    size,
                    Stroke {
                        line_dash: LineDash {
                            segments: &[5.0, 5.0],
                            offset: 0,
                        },
                        ..Stroke::default().with_width(1.5).with_color(RECT_COLOR)
                    },
                );
            }
        });

        let border = Stroke::default()
            .with_width(1.0)
            .with_color(Color::from_rgb8(70, 70, 70));
        frame.stroke_rectangle(Point::ORIGIN, bounds.size(), border);

        vec![frame.into_geometry()]
    }

    fn update(
        &self,
        state: &mut Self::State,
        event: canvas::Event,
        bounds: Rectangle,
        cursor: Cursor,
    ) -> (event::Status, Option<Message>) {
        let view = self.0;

        // Layout is only observable here, so record size changes before
        // interpreting the event itself.
        if let canvas::Event::Mouse(_) = &event
            && view.canvas_size() != bounds.size()
        {
            return (
                event::Status::Ignored,
                Some(Message::Map(MapEvent::Resized(bounds.size()))),
            );
        }

        match event {
            canvas::Event::Mouse(mouse_event) => match mouse_event {
                mouse::Event::ButtonPressed(mouse::Button::Left) => {
                    let Some(position) = cursor.position_in(bounds) else {
                        return (event::Status::Ignored, None);
                    };

                    match view.tool() {
                        ToolMode::Pan => {
                            if let Some(global) = cursor.position() {
                                state.drag = Some(Drag::Pan {
                                    origin: global,
                                    start_offset: view.offset,
                                    moved: false,
                                });
                            }
                            (event::Status::Captured, None)
                        }
                        ToolMode::Draw => {
                            state.drag = Some(Drag::Draw {
                                anchor: view.screen_to_world(position),
                            });
                            (event::Status::Captured, None)
                        }
                        ToolMode::Edit => {
                            if let Some((index, anchor)) = view.grab_corner(position) {
                                state.drag = Some(Drag::Resize { index, anchor });
                            } else if let Some(index) = view.window_at(position) {
                                let window = view.rectangles()[index];
                                let (x, y) = view.screen_to_world(position);
                                state.drag = Some(Drag::Move {
                                    index,
                                    grab: (x - window.min_x, y - window.min_y),
                                    size: (window.width(), window.height()),
                                });
                            }
                            (event::Status::Captured, None)
                        }
                        ToolMode::Remove => match view.window_at(position) {
                            Some(index) => (
                                event::Status::Captured,
                                Some(Message::Map(MapEvent::RectRemoved(index))),
                            ),
                            None => (event::Status::Captured, None),
                        },
                    }
                }
                mouse::Event::ButtonReleased(mouse::Button::Left) => match state.drag.take() {
                    Some(Drag::Pan { moved: true, .. }) => (
                        event::Status::Captured,
                        Some(Message::Map(MapEvent::PanEnded {
                            bounds: bounds.size(),
                        })),
                    ),
                    Some(Drag::Draw { anchor }) => {
                        if let Some(position) = local_position(cursor, bounds) {
                            let window =
                                PixelWindow::from_corners(anchor, view.screen_to_world(position));
                            if !window.is_empty() {
                                return (
                                    event::Status::Captured,
                                    Some(Message::Map(MapEvent::RectDrawn(window))),
                                );
                            }
                        }
                        (event::Status::Captured, None)
                    }
                    _ => (event::Status::Captured, None),
                },
                mouse::Event::ButtonPressed(mouse::Button::Right) => {
                    if cursor.position_in(bounds).is_some() {
                        (
                            event::Status::Captured,
                            Some(Message::Map(MapEvent::Refit)),
                        )
                    } else {
                        (event::Status::Ignored, None)
                    }
                }
                mouse::Event::CursorMoved { .. } => match &mut state.drag {
                    Some(Drag::Pan {
                        origin,
                        start_offset,
                        moved,
                    }) => {
                        if let Some(current) = cursor.position() {
                            let displacement =
                                Vector::new(current.x - origin.x, current.y - origin.y);
                            if displacement.x.abs() > 1.0 || displacement.y.abs() > 1.0 {
                                *moved = true;
                            }
                            return (
                                event::Status::Captured,
                                Some(Message::Map(MapEvent::Pan {
                                    offset: *start_offset + displacement,
                                    bounds: bounds.size(),
                                })),
                            );
                        }
                        (event::Status::Captured, None)
                    }
                    Some(Drag::Draw { .. }) => {
                        // The hint rectangle follows the cursor in draw(); a
                        // hover keeps the pointer readout live meanwhile.
                        match cursor.position_in(bounds) {
                            Some(position) => (
                                event::Status::Captured,
                                Some(Message::Map(MapEvent::Hover {
                                    cursor: position,
                                    bounds: bounds.size(),
                                })),
                            ),
                            None => (event::Status::Captured, None),
                        }
                    }
                    Some(Drag::Resize { index, anchor }) => {
                        match local_position(cursor, bounds) {
                            Some(position) => {
                                let window = PixelWindow::from_corners(
                                    *anchor,
                                    view.screen_to_world(position),
                                );
                                (
                                    event::Status::Captured,
                                    Some(Message::Map(MapEvent::RectUpdated {
                                        index: *index,
                                        window,
                                    })),
                                )
                            }
                            None => (event::Status::Captured, None),
                        }
                    }
                    Some(Drag::Move { index, grab, size }) => {
                        match local_position(cursor, bounds) {
                            Some(position) => {
                                let (x, y) = view.screen_to_world(position);
                                let min_x = x - grab.0;
                                let min_y = y - grab.1;
                                let window =
                                    PixelWindow::new(min_x, min_y, min_x + size.0, min_y + size.1);
                                (
                                    event::Status::Captured,
                                    Some(Message::Map(MapEvent::RectUpdated {
                                        index: *index,
                                        window,
                                    })),
                                )
                            }
                            None => (event::Status::Captured, None),
                        }
                    }
                    None => match cursor.position_in(bounds) {
                        Some(position) => (
                            event::Status::Captured,
                            Some(Message::Map(MapEvent::Hover {
                                cursor: position,
                                bounds: bounds.size(),
                            })),
                        ),
                        None => (
                            event::Status::Captured,
                            Some(Message::Map(MapEvent::Leave)),
                        ),
                    },
                },
                mouse::Event::WheelScrolled { delta } => {
                    let steps = match delta {
                        mouse::ScrollDelta::Lines { y, .. } => y,
                        mouse::ScrollDelta::Pixels { y, .. } => y / 120.0,
                    };

                    if steps.abs() > f32::EPSILON {
                        let factor = if steps > 0.0 {
                            ZOOM_IN_FACTOR
                        } else {
                            ZOOM_OUT_FACTOR
                        };
                        let cursor_position = cursor.position_in(bounds).unwrap_or(Point::ORIGIN);
                        (
                            event::Status::Captured,
                            Some(Message::Map(MapEvent::Zoom {
                                factor,
                                cursor: cursor_position,
                                bounds: bounds.size(),
                            })),
                        )
                    } else {
                        (event::Status::Ignored, None)
                    }
                }
                mouse::Event::CursorLeft => (
                    event::Status::Captured,
                    Some(Message::Map(MapEvent::Leave)),
                ),
                _ => (event::Status::Ignored, None),
            },
            _ => (event::Status::Ignored, None),
        }
    }

    fn mouse_interaction(
        &self,
        state: &Self::State,
        bounds: Rectangle,
        cursor: Cursor,
    ) -> mouse::Interaction {
        if cursor.position_in(bounds).is_none() {
            return mouse::Interaction::default();
        }
        match (self.0.tool(), &state.drag) {
            (ToolMode::Pan, Some(Drag::Pan { .. })) => mouse::Interaction::Grabbing,
            (ToolMode::Pan, None) => mouse::Interaction::Grab,
            (ToolMode::Draw, _) => mouse::Interaction::Crosshair,
            _ => mouse::Interaction::default(),
        }
    }
}
