use clap::Parser;

use remote_raster_viewer::backend::BackendClient;
use remote_raster_viewer::gui_app;
use remote_raster_viewer::logging;

#[derive(Parser, Debug)]
#[command(
    name = "viewer_gui",
    about = "Interactive viewer for a remote raster service",
    version
)]
struct Cli {
    /// Base URL of the raster service
    #[arg(
        short = 'b',
        long = "backend",
        default_value = "http://127.0.0.1:5000/"
    )]
    backend: reqwest::Url,

    /// Session token sent in the X-CSRFToken header
    #[arg(short = 't', long = "token", default_value = "")]
    token: String,

    /// Prefill the source path input
    #[arg(short = 'i', long = "image")]
    image: Option<String>,
}

fn main() -> iced::Result {
    let cli = Cli::parse();
    logging::init("info");

    let client = BackendClient::new(cli.backend, cli.token);
    gui_app::run_viewer_app(client, cli.image)
}
