//! Pixel data to 8-bit grayscale image.
//!
//! Only native (uncompressed) MONOCHROME1/MONOCHROME2 data with 8 or 16 bits
//! allocated is supported, and only the first frame is rendered.

use std::path::Path;

use image::GrayImage;
use tracing::{debug, info};

use crate::dataset::Dataset;
use crate::error::DicomError;
use crate::model::{DicomValue, Tag};
use crate::util;
use crate::CommonResult;

const MONOCHROME1: &str = "MONOCHROME1";
const MONOCHROME2: &str = "MONOCHROME2";

/// VOI window as (center, width)
type Window = (f64, f64);

fn required_u16(dataset: &Dataset, tag: Tag, name: &str) -> CommonResult<u16> {
    let value = dataset
        .value(tag)
        .and_then(DicomValue::first_number)
        .ok_or_else(|| DicomError::Lookup(format!("no {} ({}) in dataset", name, tag)))?;

    Ok(value as u16)
}

fn optional_number(dataset: &Dataset, tag: Tag) -> Option<f64> {
    dataset.value(tag).and_then(DicomValue::first_number)
}

/// Decode the first frame of the pixel data into a grayscale image.
pub fn generate_image(dataset: &Dataset) -> CommonResult<GrayImage> {
    let pixel_data = dataset
        .pixel_data()
        .ok_or_else(|| DicomError::Lookup("no pixel data (7fe0,0010) in dataset".to_string()))?;

    // 压缩的像素数据以分片形式封装，这里不做解码
    let encapsulated = dataset
        .transfer_syntax()
        .map(|ts| ts.encapsulated)
        .unwrap_or(false);
    if encapsulated || pixel_data.is_undefined_length() {
        return Err(DicomError::format(
            pixel_data.raw.offset(),
            "encapsulated pixel data is not supported",
        ));
    }

    let rows = required_u16(dataset, Tag::ROWS, "rows")?;
    let columns = required_u16(dataset, Tag::COLUMNS, "columns")?;
    let bits_allocated = required_u16(dataset, Tag::BITS_ALLOCATED, "bits allocated")?;
    let bits_stored = optional_number(dataset, Tag::BITS_STORED)
        .map(|v| v as u16)
        .unwrap_or(bits_allocated);
    let signed = optional_number(dataset, Tag::PIXEL_REPRESENTATION).unwrap_or(0.0) == 1.0;

    let photometric_interpretation = dataset
        .value(Tag::PHOTOMETRIC_INTERPRETATION)
        .and_then(DicomValue::as_str)
        .unwrap_or(MONOCHROME2)
        .to_string();
    if photometric_interpretation != MONOCHROME1 && photometric_interpretation != MONOCHROME2 {
        return Err(DicomError::format(
            pixel_data.raw.offset(),
            format!(
                "photometric interpretation {} is not supported",
                photometric_interpretation
            ),
        ));
    }

    let rescale_slope = optional_number(dataset, Tag::RESCALE_SLOPE).unwrap_or(1.0);
    let rescale_intercept = optional_number(dataset, Tag::RESCALE_INTERCEPT).unwrap_or(0.0);
    let window = match (
        optional_number(dataset, Tag::WINDOW_CENTER),
        optional_number(dataset, Tag::WINDOW_WIDTH),
    ) {
        (Some(center), Some(width)) if width > 0.0 => Some((center, width)),
        _ => None,
    };

    debug!(
        rows,
        columns,
        bits_allocated,
        bits_stored,
        signed,
        photometric = %photometric_interpretation,
        "pixel module"
    );

    let bytes_per_pixel = match bits_allocated {
        8 => 1,
        16 => 2,
        other => {
            return Err(DicomError::format(
                pixel_data.raw.offset(),
                format!("bits allocated {} is not supported", other),
            ));
        }
    };

    let pixel_count = rows as usize * columns as usize;
    let frame_length = pixel_count * bytes_per_pixel;
    let pixel_bytes = pixel_data.raw.as_slice();
    if pixel_bytes.len() < frame_length {
        return Err(DicomError::format(
            pixel_data.raw.offset(),
            format!(
                "pixel data has {} bytes, frame needs {}",
                pixel_bytes.len(),
                frame_length
            ),
        ));
    }

    let pixels = pixel_bytes[..frame_length]
        .chunks_exact(bytes_per_pixel)
        .map(|chunk| {
            let raw = if bytes_per_pixel == 1 {
                chunk[0] as u32
            } else {
                util::read_u16(chunk, dataset.little_endian) as u32
            };
            stored_value(raw, bits_stored, signed)
        })
        .collect::<Vec<f64>>();

    let identity = window.is_none()
        && bits_allocated == 8
        && !signed
        && rescale_slope == 1.0
        && rescale_intercept == 0.0;

    let processed_pixels = if identity {
        let pixels = pixels.iter().map(|v| *v as u8).collect::<Vec<u8>>();
        invert_if_needed(pixels, &photometric_interpretation)
    } else {
        process_image_pixels(
            &pixels,
            &photometric_interpretation,
            rescale_intercept,
            rescale_slope,
            window,
        )
    };

    GrayImage::from_raw(columns as u32, rows as u32, processed_pixels).ok_or_else(|| {
        DicomError::format(pixel_data.raw.offset(), "pixel buffer does not match image size")
    })
}

/// Keep the low `bits_stored` bits, sign extending for signed data.
fn stored_value(raw: u32, bits_stored: u16, signed: bool) -> f64 {
    let bits = bits_stored.clamp(1, 16) as u32;
    let value = raw & ((1u32 << bits) - 1);

    if signed && value & (1 << (bits - 1)) != 0 {
        (value as i64 - (1i64 << bits)) as f64
    } else {
        value as f64
    }
}

// 参考了https://github.com/ykuo2/dicom2jpg/blob/main/dicom2jpg/utils.py#L116
fn process_image_pixels(
    pixels: &[f64],
    photometric_interpretation: &str,
    rescale_intercept: f64,
    rescale_slope: f64,
    window: Option<Window>,
) -> Vec<u8> {
    let pixels = pixels
        .iter()
        .map(|v| v * rescale_slope + rescale_intercept)
        .collect::<Vec<f64>>();

    let pixels = match window {
        Some((window_center, window_width)) => {
            let lower = window_center - window_width / 2.0;
            let upper = window_center + window_width / 2.0;

            pixels
                .iter()
                .map(|v| {
                    if *v <= lower {
                        0.0
                    } else if *v > upper {
                        255.0
                    } else {
                        (v - lower) / window_width * 255.0
                    }
                })
                .map(|v| v.round() as u8)
                .collect::<Vec<u8>>()
        }
        None => {
            let pixel_min = pixels.iter().copied().fold(f64::INFINITY, f64::min);
            let pixel_max = pixels.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            let range = pixel_max - pixel_min;

            pixels
                .iter()
                .map(|v| {
                    if range > 0.0 {
                        (v - pixel_min) / range * 255.0
                    } else {
                        0.0
                    }
                })
                .map(|v| v.round() as u8)
                .collect::<Vec<u8>>()
        }
    };

    invert_if_needed(pixels, photometric_interpretation)
}

// 对MONOCHROME1的显示进行额外处理
fn invert_if_needed(pixels: Vec<u8>, photometric_interpretation: &str) -> Vec<u8> {
    if photometric_interpretation == MONOCHROME1 {
        pixels.into_iter().map(|v| 255 - v).collect()
    } else {
        pixels
    }
}

/// Encode `image` in the format implied by the extension of `path`.
pub fn write_image_pixels_to_file(image: &GrayImage, path: &Path) -> CommonResult<()> {
    image.save(path)?;

    info!(
        path = %path.display(),
        width = image.width(),
        height = image.height(),
        "image written"
    );

    Ok(())
}

pub fn export_image(dataset: &Dataset, path: &Path) -> CommonResult<()> {
    let image = generate_image(dataset)?;
    write_image_pixels_to_file(&image, path)
}
