pub mod app;
pub mod map_view;

pub use app::run_viewer_app;
