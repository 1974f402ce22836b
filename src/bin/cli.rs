use bytesize::ByteSize;
use clap::{ArgGroup, Parser};
use std::error::Error;
use std::path::PathBuf;

use remote_raster_viewer::backend::BackendClient;
use remote_raster_viewer::geometry::PixelWindow;
use remote_raster_viewer::logging;

#[derive(Parser, Debug)]
#[command(
    name = "viewer_cli",
    about = "Headless driver for a remote raster service",
    version,
    group(
        ArgGroup::new("action")
            .required(true)
            .multiple(true)
            .args(["fetch", "ortho"])
    )
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

    /// Source image path to open on the backend
    #[arg(short = 'i', long = "image")]
    image: String,

    /// Viewport size the service should target, as WIDTHxHEIGHT
    #[arg(long = "viewport", default_value = "800x600", value_parser = parse_viewport)]
    viewport: (u32, u32),

    /// Crop window to apply before fetching, as minx,miny,maxx,maxy
    #[arg(short = 'w', long = "window", value_parser = parse_window)]
    window: Option<PixelWindow>,

    /// Fetch the served frame and write it out
    #[arg(long = "fetch", short = 'f')]
    fetch: bool,

    /// Output file for the fetched frame
    #[arg(short = 'o', long = "out", default_value = "frame.png")]
    out: PathBuf,

    /// Ask the backend to write an orthorectified product to this path
    #[arg(long = "ortho")]
    ortho: Option<String>,
}

fn parse_viewport(value: &str) -> Result<(u32, u32), String> {
    let Some((width, height)) = value.split_once('x') else {
        return Err("expected WIDTHxHEIGHT".to_string());
    };
    let width = width.trim().parse::<u32>().map_err(|err| err.to_string())?;
    let height = height.trim().parse::<u32>().map_err(|err| err.to_string())?;
    if width == 0 || height == 0 {
        return Err("viewport dimensions must be non-zero".to_string());
    }
    Ok((width, height))
}

fn parse_window(value: &str) -> Result<PixelWindow, String> {
    let parts = value
        .split(',')
        .map(|part| part.trim().parse::<f64>().map_err(|err| err.to_string()))
        .collect::<Result<Vec<_>, _>>()?;
    let &[min_x, min_y, max_x, max_y] = parts.as_slice() else {
        return Err("expected minx,miny,maxx,maxy".to_string());
    };
    Ok(PixelWindow::new(min_x, min_y, max_x, max_y))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    logging::init("warn");

    let client = BackendClient::new(cli.backend, cli.token);
    let (tnx, tny) = cli.viewport;

    let size = client.update_image_path(&cli.image, tnx, tny).await?;
    println!("Opened {} ({} x {} px)", cli.image, size.nx, size.ny);

    if let Some(window) = cli.window {
        let clamped = window.clamp_to(size);
        client.update_image_content(clamped, tnx, tny).await?;
        println!(
            "Cropped to ({:.1}, {:.1}) - ({:.1}, {:.1})",
            clamped.min_x, clamped.min_y, clamped.max_x, clamped.max_y
        );
    }

    if cli.fetch {
        let frame = client.get_frame().await?;
        let buffer = image::RgbaImage::from_raw(frame.width, frame.height, frame.pixels)
            .ok_or("frame pixel buffer does not match its dimensions")?;
        buffer.save(&cli.out)?;
        println!(
            "Wrote {} ({} x {} px, decimation {}, {})",
            cli.out.display(),
            frame.width,
            frame.height,
            frame.decimation,
            ByteSize::b(frame.encoded_len as u64)
        );
        println!(
            "Extent: ({:.1}, {:.1}) - ({:.1}, {:.1})",
            frame.extent.min_x, frame.extent.min_y, frame.extent.max_x, frame.extent.max_y
        );
    }

    if let Some(destination) = cli.ortho {
        client.ortho_image(&destination).await?;
        println!("Ortho product requested at {destination}");
    }

    Ok(())
}
