use base64::{Engine as _, engine::general_purpose};
use std::io::Cursor;

use remote_raster_viewer::backend::{BackendError, crop_form, decode_frame_parts, load_form};
use remote_raster_viewer::geometry::PixelWindow;

fn encoded_png(width: u32, height: u32) -> Vec<u8> {
    let image = image::RgbaImage::from_pixel(width, height, image::Rgba([40, 80, 120, 255]));
    let mut bytes = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
        .expect("failed to encode test png");
    bytes
}

#[test]
fn frame_decodes_to_rgba_with_extent() {
    let png = encoded_png(4, 3);
    let raster_b64 = general_purpose::STANDARD.encode(&png);

    let frame =
        decode_frame_parts(&raster_b64, "[[0.0, 0.0], [30.0, 40.0]]", 2).expect("decode failed");

    assert_eq!(frame.width, 4);
    assert_eq!(frame.height, 3);
    assert_eq!(frame.pixels.len(), 4 * 3 * 4);
    assert_eq!(&frame.pixels[..4], &[40, 80, 120, 255]);
    assert_eq!(frame.extent, PixelWindow::new(0.0, 0.0, 40.0, 30.0));
    assert_eq!(frame.decimation, 2);
    assert_eq!(frame.encoded_len, png.len());
}

#[test]
fn garbage_base64_is_reported_as_such() {
    let result = decode_frame_parts("!!not base64!!", "[[0, 0], [1, 1]]", 1);
    assert!(matches!(result, Err(BackendError::RasterBase64(_))));
}

#[test]
fn undecodable_raster_is_reported_as_such() {
    let raster_b64 = general_purpose::STANDARD.encode(b"this is no image");
    let result = decode_frame_parts(&raster_b64, "[[0, 0], [1, 1]]", 1);
    assert!(matches!(result, Err(BackendError::RasterImage(_))));
}

#[test]
fn malformed_extent_is_reported_as_such() {
    let raster_b64 = general_purpose::STANDARD.encode(encoded_png(2, 2));
    let result = decode_frame_parts(&raster_b64, "no corners here", 1);
    assert!(matches!(result, Err(BackendError::BadExtent(_))));
}

#[test]
fn load_form_carries_path_and_viewport() {
    let form = load_form("/data/scene.ntf", 800, 600);
    assert_eq!(
        form,
        vec![
            ("image_path", "/data/scene.ntf".to_string()),
            ("tnx", "800".to_string()),
            ("tny", "600".to_string()),
        ]
    );
}

#[test]
fn crop_form_carries_viewport_and_window() {
    let window = PixelWindow::new(0.0, 0.0, 100.5, 50.0);
    let form = crop_form(window, 800, 600);
    assert_eq!(
        form,
        vec![
            ("tnx", "800".to_string()),
            ("tny", "600".to_string()),
            ("minx", "0".to_string()),
            ("miny", "0".to_string()),
            ("maxx", "100.5".to_string()),
            ("maxy", "50".to_string()),
        ]
    );
}
