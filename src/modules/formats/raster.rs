//! Raster output and text-to-image rendering.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use ab_glyph::{Font, FontVec, PxScale, ScaleFont, point};
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage, Rgba, RgbaImage};

use crate::error::{ConvertError, Result};

const ICO_MAX: u32 = 256;

const TEXT_SCALE: f32 = 18.0;
const TEXT_PADDING: u32 = 24;
const MAX_LINES: usize = 400;
const MAX_LINE_CHARS: usize = 160;
const MAX_WIDTH: u32 = 4096;

pub fn image_format(extension: &str) -> Option<ImageFormat> {
    match extension.to_lowercase().as_str() {
        "jpg" | "jpeg" => Some(ImageFormat::Jpeg),
        "png" => Some(ImageFormat::Png),
        "bmp" => Some(ImageFormat::Bmp),
        "gif" => Some(ImageFormat::Gif),
        "tiff" | "tif" => Some(ImageFormat::Tiff),
        "webp" => Some(ImageFormat::WebP),
        "ico" => Some(ImageFormat::Ico),
        _ => None,
    }
}

pub fn open_image(path: &Path) -> Result<DynamicImage> {
    Ok(image::open(path)?)
}

/// Composites any transparency onto white.
pub fn flatten_alpha(img: &DynamicImage) -> RgbImage {
    if !img.color().has_alpha() {
        return img.to_rgb8();
    }
    let rgba = img.to_rgba8();
    RgbImage::from_fn(rgba.width(), rgba.height(), |x, y| {
        let Rgba([r, g, b, a]) = *rgba.get_pixel(x, y);
        let alpha = a as u16;
        let blend = |c: u8| ((c as u16 * alpha + 255 * (255 - alpha)) / 255) as u8;
        Rgb([blend(r), blend(g), blend(b)])
    })
}

pub fn save_image(img: &DynamicImage, path: &Path, extension: &str, jpeg_quality: u8) -> Result<()> {
    let format = image_format(extension)
        .ok_or_else(|| ConvertError::unsupported("image", extension))?;

    match format {
        ImageFormat::Jpeg => {
            let writer = BufWriter::new(File::create(path)?);
            let mut encoder = JpegEncoder::new_with_quality(writer, jpeg_quality.clamp(1, 100));
            encoder.encode_image(&flatten_alpha(img))?;
        }
        ImageFormat::Ico => {
            let mut icon = img.clone();
            if icon.width() > ICO_MAX || icon.height() > ICO_MAX {
                icon = icon.thumbnail(ICO_MAX, ICO_MAX);
            }
            DynamicImage::ImageRgba8(icon.to_rgba8()).save_with_format(path, ImageFormat::Ico)?;
        }
        other => {
            DynamicImage::ImageRgba8(img.to_rgba8()).save_with_format(path, other)?;
        }
    }
    Ok(())
}

/// egui's bundled monospace face, falling back to its proportional one.
pub fn load_font() -> Result<FontVec> {
    let defs = egui::FontDefinitions::default();
    let data = defs
        .font_data
        .get("Hack")
        .or_else(|| defs.font_data.get("Ubuntu-Light"))
        .ok_or(ConvertError::Font)?;
    FontVec::try_from_vec(data.font.to_vec()).map_err(|_| ConvertError::Font)
}

/// Draws `lines` in black on a white canvas sized to fit them.
pub fn render_text(lines: &[String]) -> Result<RgbaImage> {
    let font = load_font()?;
    let scaled = font.as_scaled(PxScale::from(TEXT_SCALE));
    let line_height = (scaled.height() + scaled.line_gap()).ceil();

    let mut lines: Vec<String> = lines
        .iter()
        .take(MAX_LINES)
        .map(|line| line.replace('\t', "    ").chars().take(MAX_LINE_CHARS).collect())
        .collect();
    if lines.is_empty() {
        lines.push(String::new());
    }

    let text_width = lines
        .iter()
        .map(|line| line.chars().map(|c| scaled.h_advance(font.glyph_id(c))).sum::<f32>())
        .fold(0.0f32, f32::max)
        .ceil() as u32;
    let width = (text_width + 2 * TEXT_PADDING).clamp(2 * TEXT_PADDING, MAX_WIDTH);
    let height = (line_height * lines.len() as f32).ceil() as u32 + 2 * TEXT_PADDING;

    let mut canvas = RgbaImage::from_pixel(width, height, Rgba([255, 255, 255, 255]));

    for (row, line) in lines.iter().enumerate() {
        let baseline = TEXT_PADDING as f32 + row as f32 * line_height + scaled.ascent();
        let mut x = TEXT_PADDING as f32;
        for c in line.chars() {
            let id = font.glyph_id(c);
            let glyph = id.with_scale_and_position(TEXT_SCALE, point(x, baseline));
            x += scaled.h_advance(id);
            let Some(outlined) = font.outline_glyph(glyph) else {
                continue;
            };
            let bounds = outlined.px_bounds();
            outlined.draw(|gx, gy, coverage| {
                let px = bounds.min.x as i32 + gx as i32;
                let py = bounds.min.y as i32 + gy as i32;
                if px < 0 || py < 0 || px as u32 >= width || py as u32 >= height {
                    return;
                }
                let shade = (255.0 * (1.0 - coverage.clamp(0.0, 1.0))) as u8;
                let pixel = canvas.get_pixel_mut(px as u32, py as u32);
                let current = pixel.0[0].min(shade);
                *pixel = Rgba([current, current, current, 255]);
            });
        }
    }

    Ok(canvas)
}
