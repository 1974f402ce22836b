use iced::mouse::{self, Cursor};
use iced::widget::canvas::{self, Program, event};
use iced::{Point, Rectangle, Size};

use remote_raster_viewer::geometry::PixelWindow;
use remote_raster_viewer::gui_app::app::Message;
use remote_raster_viewer::gui_app::map_view::{
    InteractionLayer, InteractionState, MapEvent, MapView, ToolMode,
};

fn bounds() -> Rectangle {
    Rectangle::new(Point::ORIGIN, Size::new(800.0, 600.0))
}

fn press() -> canvas::Event {
    canvas::Event::Mouse(mouse::Event::ButtonPressed(mouse::Button::Left))
}

fn release() -> canvas::Event {
    canvas::Event::Mouse(mouse::Event::ButtonReleased(mouse::Button::Left))
}

fn moved(position: Point) -> (canvas::Event, Cursor) {
    (
        canvas::Event::Mouse(mouse::Event::CursorMoved { position }),
        Cursor::Available(position),
    )
}

fn map_event(message: Option<Message>) -> MapEvent {
    match message {
        Some(Message::Map(event)) => event,
        other => panic!("expected a map event, got {other:?}"),
    }
}

#[test]
fn default_view_is_the_identity_transform() {
    let map = MapView::default();
    assert_eq!(map.visible_window(), PixelWindow::new(0.0, 0.0, 800.0, 600.0));
    assert_eq!(map.canvas_size_px(), (800, 600));
}

#[test]
fn zoom_keeps_the_pixel_under_the_cursor() {
    let mut map = MapView::default();
    map.fit_to(PixelWindow::new(0.0, 0.0, 4000.0, 3000.0));

    let cursor = Point::new(250.0, 420.0);
    let before = map.screen_to_world(cursor);
    let settled = map.apply(MapEvent::Zoom {
        factor: 1.1,
        cursor,
        bounds: Size::new(800.0, 600.0),
    });
    let after = map.screen_to_world(cursor);

    assert!(settled);
    assert!((before.0 - after.0).abs() < 1e-2);
    assert!((before.1 - after.1).abs() < 1e-2);
    assert!((map.scale() - 0.22).abs() < 1e-3);
}

#[test]
fn zoom_against_the_scale_limit_does_not_settle() {
    let mut map = MapView::default();
    for _ in 0..200 {
        let _ = map.apply(MapEvent::Zoom {
            factor: 0.9,
            cursor: Point::new(400.0, 300.0),
            bounds: Size::new(800.0, 600.0),
        });
    }
    assert!((map.scale() - 1.0 / 32.0).abs() < 1e-6);

    let settled = map.apply(MapEvent::Zoom {
        factor: 0.9,
        cursor: Point::new(400.0, 300.0),
        bounds: Size::new(800.0, 600.0),
    });
    assert!(!settled);
}

#[test]
fn pan_drag_emits_offsets_and_settles_on_release() {
    let map = MapView::default();
    let layer = InteractionLayer(&map);
    let mut state = InteractionState::default();

    let start = Point::new(100.0, 100.0);
    let (status, message) = layer.update(&mut state, press(), bounds(), Cursor::Available(start));
    assert_eq!(status, event::Status::Captured);
    assert!(message.is_none());

    let (event, cursor) = moved(Point::new(130.0, 120.0));
    let (_, message) = layer.update(&mut state, event, bounds(), cursor);
    match map_event(message) {
        MapEvent::Pan { offset, .. } => {
            assert!((offset.x - 30.0).abs() < 1e-6);
            assert!((offset.y - 20.0).abs() < 1e-6);
        }
        other => panic!("expected a pan, got {other:?}"),
    }

    let (_, message) = layer.update(
        &mut state,
        release(),
        bounds(),
        Cursor::Available(Point::new(130.0, 120.0)),
    );
    assert!(matches!(map_event(message), MapEvent::PanEnded { .. }));
}

#[test]
fn a_click_without_movement_does_not_settle() {
    let map = MapView::default();
    let layer = InteractionLayer(&map);
    let mut state = InteractionState::default();

    let position = Cursor::Available(Point::new(100.0, 100.0));
    let _ = layer.update(&mut state, press(), bounds(), position);
    let (_, message) = layer.update(&mut state, release(), bounds(), position);
    assert!(message.is_none());
}

#[test]
fn draw_tool_commits_a_normalized_rectangle() {
    let mut map = MapView::default();
    map.set_tool(ToolMode::Draw);
    let layer = InteractionLayer(&map);
    let mut state = InteractionState::default();

    // Drag up-left so the corners need normalizing.
    let _ = layer.update(
        &mut state,
        press(),
        bounds(),
        Cursor::Available(Point::new(200.0, 150.0)),
    );
    let (event, cursor) = moved(Point::new(100.0, 100.0));
    let _ = layer.update(&mut state, event, bounds(), cursor);
    let (_, message) = layer.update(
        &mut state,
        release(),
        bounds(),
        Cursor::Available(Point::new(100.0, 100.0)),
    );

    match map_event(message) {
        MapEvent::RectDrawn(window) => {
            assert_eq!(window, PixelWindow::new(100.0, 100.0, 200.0, 150.0));
        }
        other => panic!("expected a drawn rectangle, got {other:?}"),
    }
}

#[test]
fn a_zero_area_draw_is_discarded() {
    let mut map = MapView::default();
    map.set_tool(ToolMode::Draw);
    let layer = InteractionLayer(&map);
    let mut state = InteractionState::default();

    let position = Cursor::Available(Point::new(200.0, 150.0));
    let _ = layer.update(&mut state, press(), bounds(), position);
    let (_, message) = layer.update(&mut state, release(), bounds(), position);
    assert!(message.is_none());
}

#[test]
fn edit_tool_resizes_from_the_grabbed_corner() {
    let mut map = MapView::default();
    map.apply(MapEvent::RectDrawn(PixelWindow::new(10.0, 10.0, 30.0, 30.0)));
    map.set_tool(ToolMode::Edit);
    let layer = InteractionLayer(&map);
    let mut state = InteractionState::default();

    // Grab the bottom-right corner and drag it outward.
    let _ = layer.update(
        &mut state,
        press(),
        bounds(),
        Cursor::Available(Point::new(30.0, 30.0)),
    );
    let (event, cursor) = moved(Point::new(50.0, 40.0));
    let (_, message) = layer.update(&mut state, event, bounds(), cursor);

    match map_event(message) {
        MapEvent::RectUpdated { index, window } => {
            assert_eq!(index, 0);
            assert_eq!(window, PixelWindow::new(10.0, 10.0, 50.0, 40.0));
        }
        other => panic!("expected a resize, got {other:?}"),
    }
}

#[test]
fn edit_tool_moves_a_grabbed_interior() {
    let mut map = MapView::default();
    map.apply(MapEvent::RectDrawn(PixelWindow::new(10.0, 10.0, 30.0, 30.0)));
    map.set_tool(ToolMode::Edit);
    let layer = InteractionLayer(&map);
    let mut state = InteractionState::default();

    let _ = layer.update(
        &mut state,
        press(),
        bounds(),
        Cursor::Available(Point::new(20.0, 20.0)),
    );
    let (event, cursor) = moved(Point::new(25.0, 27.0));
    let (_, message) = layer.update(&mut state, event, bounds(), cursor);

    match map_event(message) {
        MapEvent::RectUpdated { index, window } => {
            assert_eq!(index, 0);
            assert_eq!(window, PixelWindow::new(15.0, 17.0, 35.0, 37.0));
        }
        other => panic!("expected a move, got {other:?}"),
    }
}

#[test]
fn remove_tool_deletes_the_topmost_hit() {
    let mut map = MapView::default();
    map.apply(MapEvent::RectDrawn(PixelWindow::new(10.0, 10.0, 30.0, 30.0)));
    map.apply(MapEvent::RectDrawn(PixelWindow::new(15.0, 15.0, 40.0, 40.0)));
    map.set_tool(ToolMode::Remove);
    let layer = InteractionLayer(&map);
    let mut state = InteractionState::default();

    let (_, message) = layer.update(
        &mut state,
        press(),
        bounds(),
        Cursor::Available(Point::new(20.0, 20.0)),
    );
    assert!(matches!(map_event(message), MapEvent::RectRemoved(1)));

    // A miss removes nothing.
    let (_, message) = layer.update(
        &mut state,
        press(),
        bounds(),
        Cursor::Available(Point::new(500.0, 500.0)),
    );
    assert!(message.is_none());
}

#[test]
fn wheel_scroll_maps_to_anchored_zoom_steps() {
    let map = MapView::default();
    let layer = InteractionLayer(&map);
    let mut state = InteractionState::default();

    let cursor = Cursor::Available(Point::new(400.0, 300.0));
    let scroll_up = canvas::Event::Mouse(mouse::Event::WheelScrolled {
        delta: mouse::ScrollDelta::Lines { x: 0.0, y: 1.0 },
    });
    let (_, message) = layer.update(&mut state, scroll_up, bounds(), cursor);
    match map_event(message) {
        MapEvent::Zoom { factor, cursor, .. } => {
            assert!((factor - 1.1).abs() < 1e-6);
            assert_eq!(cursor, Point::new(400.0, 300.0));
        }
        other => panic!("expected a zoom, got {other:?}"),
    }

    let scroll_down = canvas::Event::Mouse(mouse::Event::WheelScrolled {
        delta: mouse::ScrollDelta::Pixels { x: 0.0, y: -240.0 },
    });
    let (_, message) = layer.update(&mut state, scroll_down, bounds(), cursor);
    match map_event(message) {
        MapEvent::Zoom { factor, .. } => assert!((factor - 0.9).abs() < 1e-6),
        other => panic!("expected a zoom, got {other:?}"),
    }
}

#[test]
fn hover_and_leave_are_forwarded() {
    let map = MapView::default();
    let layer = InteractionLayer(&map);
    let mut state = InteractionState::default();

    let (event, cursor) = moved(Point::new(120.0, 80.0));
    let (_, message) = layer.update(&mut state, event, bounds(), cursor);
    assert!(matches!(map_event(message), MapEvent::Hover { .. }));

    let left = canvas::Event::Mouse(mouse::Event::CursorLeft);
    let (_, message) = layer.update(&mut state, left, bounds(), Cursor::Unavailable);
    assert!(matches!(map_event(message), MapEvent::Leave));
}

#[test]
fn layout_changes_are_reported_before_interaction() {
    let map = MapView::default();
    let layer = InteractionLayer(&map);
    let mut state = InteractionState::default();

    let small = Rectangle::new(Point::ORIGIN, Size::new(640.0, 480.0));
    let (event, cursor) = moved(Point::new(10.0, 10.0));
    let (status, message) = layer.update(&mut state, event, small, cursor);

    assert_eq!(status, event::Status::Ignored);
    match map_event(message) {
        MapEvent::Resized(size) => assert_eq!(size, Size::new(640.0, 480.0)),
        other => panic!("expected a resize, got {other:?}"),
    }
}
