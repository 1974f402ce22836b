//! HTTP client for the raster service.
//!
//! Every call is a form-encoded POST carrying the session token in the
//! `X-CSRFToken` header. Responses are either ignored (`update_image_content`,
//! `ortho_image`) or small JSON envelopes (`update_image_path`, `get_frame`).

use base64::{Engine as _, engine::general_purpose};
use serde::Deserialize;
use tracing::debug;

use crate::geometry::{PixelWindow, RasterSize, parse_extent};

/// Header carrying the session token on every request.
pub const TOKEN_HEADER: &str = "X-CSRFToken";

#[derive(Debug, Clone, thiserror::Error)]
pub enum BackendError {
    #[error("request to `{endpoint}` failed: {detail}")]
    Transport {
        endpoint: &'static str,
        detail: String,
    },

    #[error("`{endpoint}` returned HTTP {status}")]
    Status { endpoint: &'static str, status: u16 },

    #[error("malformed `{endpoint}` response: {detail}")]
    Malformed {
        endpoint: &'static str,
        detail: String,
    },

    #[error("frame raster is not valid base64: {0}")]
    RasterBase64(String),

    #[error("frame raster is not a decodable image: {0}")]
    RasterImage(String),

    #[error("frame extent is not a corner pair: {0}")]
    BadExtent(String),
}

/// One served frame, decoded to raw RGBA and ready for display.
#[derive(Debug, Clone)]
pub struct FramePayload {
    pub width: u32,
    pub height: u32,
    /// RGBA8 rows, top to bottom.
    pub pixels: Vec<u8>,
    /// Placement of the frame in full-resolution pixel coordinates.
    pub extent: PixelWindow,
    /// Downsampling factor the service applied to fit the viewport.
    pub decimation: u32,
    /// Size of the encoded raster before decoding.
    pub encoded_len: usize,
}

#[derive(Debug, Deserialize)]
struct FrameEnvelope {
    output_value: FrameBody,
}

#[derive(Debug, Deserialize)]
struct FrameBody {
    raster: String,
    extent: String,
    decimation: u32,
}

/// Client for one raster service session. Cheap to clone; clones share the
/// underlying connection pool.
#[derive(Debug, Clone)]
pub struct BackendClient {
    http: reqwest::Client,
    base: reqwest::Url,
    token: String,
}

impl BackendClient {
    pub fn new(base: reqwest::Url, token: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base,
            token: token.into(),
        }
    }

    /// Open a source image on the backend and size its tile pyramid for the
    /// given viewport. Returns the full-resolution raster dimensions.
    pub async fn update_image_path(
        &self,
        image_path: &str,
        tnx: u32,
        tny: u32,
    ) -> Result<RasterSize, BackendError> {
        const ENDPOINT: &str = "update_image_path";
        let form = load_form(image_path, tnx, tny);
        let response = self.post_form(ENDPOINT, &form).await?;
        response
            .json::<RasterSize>()
            .await
            .map_err(|err| BackendError::Malformed {
                endpoint: ENDPOINT,
                detail: err.to_string(),
            })
    }

    /// Ask the service to recompute the served frame for a pixel window and
    /// viewport size. The response body carries nothing of interest.
    pub async fn update_image_content(
        &self,
        window: PixelWindow,
        tnx: u32,
        tny: u32,
    ) -> Result<(), BackendError> {
        let form = crop_form(window, tnx, tny);
        self.post_form("update_image_content", &form).await?;
        Ok(())
    }

    /// Fetch the currently served frame and decode it for display.
    pub async fn get_frame(&self) -> Result<FramePayload, BackendError> {
        const ENDPOINT: &str = "get_frame";
        let response = self.post_form(ENDPOINT, &[]).await?;
        let envelope =
            response
                .json::<FrameEnvelope>()
                .await
                .map_err(|err| BackendError::Malformed {
                    endpoint: ENDPOINT,
                    detail: err.to_string(),
                })?;
        let body = envelope.output_value;
        decode_frame_parts(&body.raster, &body.extent, body.decimation)
    }

    /// Ask the backend to write an orthorectified product to `destination` on
    /// its own filesystem. Fire and forget; the response body is ignored.
    pub async fn ortho_image(&self, destination: &str) -> Result<(), BackendError> {
        let form = vec![("input", destination.to_string())];
        self.post_form("ortho_image", &form).await?;
        Ok(())
    }

    async fn post_form(
        &self,
        endpoint: &'static str,
        form: &[(&str, String)],
    ) -> Result<reqwest::Response, BackendError> {
        let url = self
            .base
            .join(endpoint)
            .map_err(|err| BackendError::Transport {
                endpoint,
                detail: err.to_string(),
            })?;
        debug!(endpoint, fields = form.len(), "posting form");
        let response = self
            .http
            .post(url)
            .header(TOKEN_HEADER, &self.token)
            .form(form)
            .send()
            .await
            .map_err(|err| BackendError::Transport {
                endpoint,
                detail: err.to_string(),
            })?;
        let status = response.status();
        if !status.is_success() {
            return Err(BackendError::Status {
                endpoint,
                status: status.as_u16(),
            });
        }
        Ok(response)
    }
}

/// Form fields for `update_image_path`.
pub fn load_form(image_path: &str, tnx: u32, tny: u32) -> Vec<(&'static str, String)> {
    vec![
        ("image_path", image_path.to_string()),
        ("tnx", tnx.to_string()),
        ("tny", tny.to_string()),
    ]
}

/// Form fields for `update_image_content`.
pub fn crop_form(window: PixelWindow, tnx: u32, tny: u32) -> Vec<(&'static str, String)> {
    vec![
        ("tnx", tnx.to_string()),
        ("tny", tny.to_string()),
        ("minx", window.min_x.to_string()),
        ("miny", window.min_y.to_string()),
        ("maxx", window.max_x.to_string()),
        ("maxy", window.max_y.to_string()),
    ]
}

/// Decode the three frame fields into a displayable payload: the raster is
/// base64 over an encoded image, the extent a JSON corner pair.
pub fn decode_frame_parts(
    raster_b64: &str,
    extent_json: &str,
    decimation: u32,
) -> Result<FramePayload, BackendError> {
    let encoded = general_purpose::STANDARD
        .decode(raster_b64.trim())
        .map_err(|err| BackendError::RasterBase64(err.to_string()))?;
    let image = image::load_from_memory(&encoded)
        .map_err(|err| BackendError::RasterImage(err.to_string()))?;
    let rgba = image.to_rgba8();
    let (width, height) = rgba.dimensions();
    let extent =
        parse_extent(extent_json).map_err(|err| BackendError::BadExtent(err.to_string()))?;
    Ok(FramePayload {
        width,
        height,
        pixels: rgba.into_raw(),
        extent,
        decimation,
        encoded_len: encoded.len(),
    })
}
