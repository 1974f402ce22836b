use bytesize::ByteSize;
use iced::widget::canvas::Canvas;
use iced::widget::{button, column, container, row, stack, text, text_input};
use iced::{Color, Element, Length, Size, Task, Theme, window};
use std::path::PathBuf;
use tracing::{debug, info, warn};

use crate::backend::{BackendClient, BackendError, FramePayload};
use crate::geometry::{PixelWindow, RasterSize};

use super::map_view::{InteractionLayer, MapEvent, MapView, RasterLayer, ToolMode};

pub fn run_viewer_app(client: BackendClient, initial_path: Option<String>) -> iced::Result {
    iced::application("Remote Raster Viewer", ViewerApp::update, ViewerApp::view)
        .theme(ViewerApp::theme)
        .antialiasing(false)
        .window(window::Settings {
            size: Size::new(1100.0, 700.0),
            ..Default::default()
        })
        .run_with(move || ViewerApp::new(client, initial_path))
}

pub struct ViewerApp {
    client: BackendClient,
    map: MapView,
    path_input: String,
    ortho_input: String,
    status_text: String,
    raster_size: Option<RasterSize>,
    decimation: Option<u32>,
    // Monotonic refresh counter; completions carrying an older value are
    // responses to a view the user has already left.
    refresh_seq: u64,
    is_loading: bool,
}

#[derive(Debug, Clone)]
pub enum Message {
    PathInputChanged(String),
    OrthoInputChanged(String),
    LoadPressed,
    BrowsePressed,
    FilePicked(Option<PathBuf>),
    OrthoPressed,
    ToolSelected(ToolMode),
    Map(MapEvent),
    PathLoaded(Result<RasterSize, BackendError>),
    CropFinished {
        seq: u64,
        result: Result<(), BackendError>,
    },
    FrameFetched {
        seq: u64,
        result: Result<FramePayload, BackendError>,
    },
    OrthoFinished(Result<(), BackendError>),
}

impl ViewerApp {
    pub fn new(client: BackendClient, initial_path: Option<String>) -> (Self, Task<Message>) {
        (
            ViewerApp {
                client,
                map: MapView::default(),
                path_input: initial_path.unwrap_or_default(),
                ortho_input: String::new(),
                status_text: "Enter a source path to begin".to_string(),
                raster_size: None,
                decimation: None,
                refresh_seq: 0,
                is_loading: false,
            },
            Task::none(),
        )
    }

    pub fn update(&mut self, message: Message) -> Task<Message> {
        match message {
            Message::PathInputChanged(value) => {
                self.path_input = value;
                Task::none()
            }
            Message::OrthoInputChanged(value) => {
                self.ortho_input = value;
                Task::none()
            }
            Message::LoadPressed => self.start_load(),
            Message::BrowsePressed => {
                let dialog = rfd::AsyncFileDialog::new()
                    .add_filter("Rasters", &["ntf", "nitf", "tif", "tiff", "png", "jpg", "jpeg"])
                    .pick_file();

                Task::perform(dialog, |result| {
                    Message::FilePicked(result.map(|file| file.path().to_path_buf()))
                })
            }
            Message::FilePicked(Some(path)) => {
                self.path_input = path.display().to_string();
                self.start_load()
            }
            Message::FilePicked(None) => Task::none(),
            Message::OrthoPressed => {
                let destination = self.ortho_input.trim().to_string();
                if destination.is_empty() {
                    self.status_text = "Enter an output path for the ortho product".to_string();
                    return Task::none();
                }
                info!(%destination, "requesting orthorectified product");
                let client = self.client.clone();
                Task::perform(
                    async move { client.ortho_image(&destination).await },
                    Message::OrthoFinished,
                )
            }
            Message::ToolSelected(tool) => {
                self.map.set_tool(tool);
                Task::none()
            }
            Message::Map(event) => {
                if self.map.apply(event) {
                    self.request_crop()
                } else {
                    Task::none()
                }
            }
            Message::PathLoaded(Ok(size)) => {
                self.is_loading = false;
                self.raster_size = Some(size);
                info!(nx = size.nx, ny = size.ny, "source opened");
                self.status_text = format!("Opened source ({} x {} px)", size.nx, size.ny);
                self.request_frame()
            }
            Message::PathLoaded(Err(error)) => {
                self.is_loading = false;
                warn!(%error, "source open failed");
                self.status_text = format!("Load failed: {error}");
                Task::none()
            }
            Message::CropFinished { seq, result } => {
                if seq != self.refresh_seq {
                    debug!(seq, current = self.refresh_seq, "dropping stale crop response");
                    return Task::none();
                }
                match result {
                    Ok(()) => self.fetch_frame(seq),
                    Err(error) => {
                        warn!(%error, "crop request failed");
                        self.status_text = format!("Crop failed: {error}");
                        Task::none()
                    }
                }
            }
            Message::FrameFetched { seq, result } => {
                if seq != self.refresh_seq {
                    debug!(seq, current = self.refresh_seq, "dropping stale frame");
                    return Task::none();
                }
                match result {
                    Ok(frame) => self.install_frame(frame),
                    Err(error) => {
                        warn!(%error, "frame fetch failed");
                        self.status_text = format!("Frame fetch failed: {error}");
                        Task::none()
                    }
                }
            }
            Message::OrthoFinished(Ok(())) => {
                debug!("ortho request accepted");
                Task::none()
            }
            Message::OrthoFinished(Err(error)) => {
                warn!(%error, "ortho request failed");
                Task::none()
            }
        }
    }

    fn start_load(&mut self) -> Task<Message> {
        if self.is_loading {
            return Task::none();
        }
        let path = self.path_input.trim().to_string();
        if path.is_empty() {
            self.status_text = "Enter a source path to load".to_string();
            return Task::none();
        }

        self.is_loading = true;
        self.status_text = format!("Opening {path}...");
        let (tnx, tny) = self.map.canvas_size_px();
        let client = self.client.clone();
        Task::perform(
            async move { client.update_image_path(&path, tnx, tny).await },
            Message::PathLoaded,
        )
    }

    /// The window the next crop request will carry: the visible part of the
    /// canvas clamped to the raster. Dimensions count as zero until a source
    /// has been opened.
    pub fn crop_window(&self) -> PixelWindow {
        self.map
            .visible_window()
            .clamp_to(self.raster_size.unwrap_or_default())
    }

    fn request_crop(&mut self) -> Task<Message> {
        let window = self.crop_window();
        let (tnx, tny) = self.map.canvas_size_px();
        self.refresh_seq += 1;
        let seq = self.refresh_seq;
        debug!(seq, ?window, "view settled, requesting crop");
        let client = self.client.clone();
        Task::perform(
            async move { client.update_image_content(window, tnx, tny).await },
            move |result| Message::CropFinished { seq, result },
        )
    }

    fn request_frame(&mut self) -> Task<Message> {
        self.refresh_seq += 1;
        self.fetch_frame(self.refresh_seq)
    }

    fn fetch_frame(&self, seq: u64) -> Task<Message> {
        let client = self.client.clone();
        Task::perform(async move { client.get_frame().await }, move |result| {
            Message::FrameFetched { seq, result }
        })
    }

    fn install_frame(&mut self, frame: FramePayload) -> Task<Message> {
        self.decimation = Some(frame.decimation);
        self.status_text = format!(
            "Frame {} x {} px, decimation {}, {}",
            frame.width,
            frame.height,
            frame.decimation,
            ByteSize::b(frame.encoded_len as u64),
        );

        let first = !self.map.has_overlay();
        let extent = frame.extent;
        let handle =
            iced::widget::image::Handle::from_rgba(frame.width, frame.height, frame.pixels);
        self.map.set_overlay(handle, extent);

        if first {
            // The initial fit moves the view, so it schedules its own crop.
            self.map.fit_to(extent);
            return self.request_crop();
        }
        Task::none()
    }

    pub fn view(&self) -> Element<'_, Message> {
        row![self.map_section(), self.panel_section()].into()
    }

    fn map_section(&self) -> Element<'_, Message> {
        // Use Stack to layer: raster canvas on bottom, interaction canvas on
        // top. Both read the same view state for coordinates.
        let raster_canvas = Canvas::new(RasterLayer(&self.map))
            .width(Length::Fill)
            .height(Length::Fill);

        let interaction_canvas = Canvas::new(InteractionLayer(&self.map))
            .width(Length::Fill)
            .height(Length::Fill);

        let stacked = stack![
            container(raster_canvas)
                .width(Length::Fill)
                .height(Length::Fill)
                .clip(true),
            interaction_canvas
        ];

        container(stacked)
            .width(Length::Fill)
            .height(Length::Fill)
            .padding(0)
            .clip(true)
            .style(|_| container::Style {
                background: Some(Color::from_rgb8(24, 24, 24).into()),
                ..Default::default()
            })
            .into()
    }

    fn panel_section(&self) -> Element<'_, Message> {
        let path_input = text_input("path on the backend host", &self.path_input)
            .on_input(Message::PathInputChanged)
            .on_submit(Message::LoadPressed)
            .size(14);

        let load_button: Element<'_, Message> = if self.is_loading {
            button(text("Loading...").size(14))
                .width(Length::Fill)
                .into()
        } else {
            button(text("Load Image").size(14))
                .on_press(Message::LoadPressed)
                .width(Length::Fill)
                .into()
        };

        let browse_button = button(text("Browse...").size(14)).on_press(Message::BrowsePressed);

        let source_box = legend(
            " Source ",
            column![path_input, row![load_button, browse_button].spacing(8)]
                .spacing(8)
                .into(),
        );

        let tool_row = row(ToolMode::ALL.iter().map(|tool| {
            let style = if self.map.tool() == *tool {
                button::primary
            } else {
                button::secondary
            };
            button(text(tool.label()).size(14))
                .style(style)
                .on_press(Message::ToolSelected(*tool))
                .width(Length::Fill)
                .into()
        }))
        .spacing(8);

        let tools_box = legend(" Tools ", tool_row.into());

        let (pixel_x, pixel_y) = match self.map.hover_world() {
            Some((x, y)) => (format!("{x:.1}"), format!("{y:.1}")),
            None => ("--".to_string(), "--".to_string()),
        };
        let pointer_box = legend(
            " Pointer ",
            column![
                text(format!("Pixel X: {pixel_x}")).size(14),
                text(format!("Pixel Y: {pixel_y}")).size(14),
            ]
            .spacing(4)
            .into(),
        );

        let decimation_text = match self.decimation {
            Some(value) => format!("Decimation: {value}"),
            None => "Decimation: --".to_string(),
        };
        let frame_box = legend(" Frame ", text(decimation_text).size(14).into());

        let ortho_input = text_input("output path for ortho product", &self.ortho_input)
            .on_input(Message::OrthoInputChanged)
            .on_submit(Message::OrthoPressed)
            .size(14);
        let ortho_button = button(text("Write Ortho").size(14))
            .on_press(Message::OrthoPressed)
            .width(Length::Fill);
        let ortho_box = legend(
            " Ortho ",
            column![ortho_input, ortho_button].spacing(8).into(),
        );

        let status_box = legend(" Status ", text(&self.status_text).size(12).into());

        let panel = column![
            source_box,
            tools_box,
            pointer_box,
            frame_box,
            ortho_box,
            status_box,
        ]
        .spacing(16)
        .width(Length::Fill);

        container(panel)
            .width(Length::Fixed(300.0))
            .height(Length::Fill)
            .padding(20)
            .style(|_| container::Style {
                background: Some(Color::from_rgb8(32, 32, 32).into()),
                ..Default::default()
            })
            .into()
    }

    pub fn theme(&self) -> Theme {
        Theme::Dark
    }

    pub fn map(&self) -> &MapView {
        &self.map
    }

    pub fn raster_size(&self) -> Option<RasterSize> {
        self.raster_size
    }

    pub fn decimation(&self) -> Option<u32> {
        self.decimation
    }

    pub fn refresh_seq(&self) -> u64 {
        self.refresh_seq
    }

    pub fn status_text(&self) -> &str {
        &self.status_text
    }
}

// Legend-style frame shared by the side panel sections.
fn legend<'a>(title: &'static str, body: Element<'a, Message>) -> Element<'a, Message> {
    let frame_style = |_: &_| container::Style {
        background: None,
        border: iced::border::Border {
            color: Color::from_rgb8(100, 100, 100),
            width: 1.0,
            radius: 4.0.into(),
        },
        ..Default::default()
    };

    column![
        container(text(title).size(12)).style(|_| container::Style {
            background: Some(Color::from_rgb8(32, 32, 32).into()),
            ..Default::default()
        }),
        container(body)
            .padding(10)
            .width(Length::Fill)
            .style(frame_style)
    ]
    .spacing(0)
    .into()
}
