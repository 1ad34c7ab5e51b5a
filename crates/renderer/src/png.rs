//! PNG encoding for radar images.
//!
//! Two encodings are produced:
//! - **Indexed PNG (color type 3)** with a `tRNS` chunk, used whenever an
//!   image has at most 256 distinct RGBA colours. Radar frames always do.
//! - **RGBA PNG (color type 6)** as the fallback for anything else.
//!
//! [`encode_auto`] picks the encoding from RGBA pixels; [`encode_indexed`]
//! takes a palette and index buffer directly.

use rayon::prelude::*;
use std::collections::HashMap;
use std::io::Write;
use thiserror::Error;

/// Maximum colors for indexed PNG (PNG8)
const MAX_PALETTE_SIZE: usize = 256;

/// Minimum pixels to benefit from parallel palette extraction
const PARALLEL_THRESHOLD: usize = 4096;

const SIGNATURE: [u8; 8] = [137, 80, 78, 71, 13, 10, 26, 10];

pub type Rgba = (u8, u8, u8, u8);

#[derive(Debug, Error)]
pub enum PngError {
    #[error("Image dimensions must be non-zero, got {width}x{height}")]
    EmptyImage { width: usize, height: usize },

    #[error("Expected {expected} bytes of pixel data, got {actual}")]
    SizeMismatch { expected: usize, actual: usize },

    #[error("Palette must hold 1..=256 entries, got {0}")]
    PaletteSize(usize),

    #[error("Index {index} is outside the {len}-entry palette")]
    IndexOutOfRange { index: u8, len: usize },

    #[error("Text chunk keyword must be 1-79 Latin-1 characters without NUL")]
    InvalidKeyword,

    #[error("Not a PNG stream")]
    NotPng,

    #[error("IDAT compression failed: {0}")]
    Compression(#[from] std::io::Error),
}

/// Encode RGBA pixels, choosing indexed output when the colours fit.
pub fn encode_auto(pixels: &[u8], width: usize, height: usize) -> Result<Vec<u8>, PngError> {
    check_len(pixels.len(), width, height, 4)?;

    let num_pixels = pixels.len() / 4;
    let palette_result = if num_pixels >= PARALLEL_THRESHOLD {
        extract_palette_parallel(pixels)
    } else {
        extract_palette_sequential(pixels)
    };

    match palette_result {
        Some((palette, indices)) => encode_indexed(width, height, &palette, &indices),
        None => encode_rgba(pixels, width, height),
    }
}

#[inline(always)]
fn pack_color(r: u8, g: u8, b: u8, a: u8) -> u32 {
    u32::from_le_bytes([r, g, b, a])
}

#[inline(always)]
fn unpack_color(packed: u32) -> Rgba {
    let [r, g, b, a] = packed.to_le_bytes();
    (r, g, b, a)
}

fn extract_palette_sequential(pixels: &[u8]) -> Option<(Vec<Rgba>, Vec<u8>)> {
    let mut color_to_index: HashMap<u32, u8> = HashMap::with_capacity(MAX_PALETTE_SIZE);
    let mut palette: Vec<Rgba> = Vec::with_capacity(MAX_PALETTE_SIZE);
    let mut indices: Vec<u8> = Vec::with_capacity(pixels.len() / 4);

    for px in pixels.chunks_exact(4) {
        let packed = pack_color(px[0], px[1], px[2], px[3]);
        let index = match color_to_index.get(&packed) {
            Some(&idx) => idx,
            None => {
                if palette.len() >= MAX_PALETTE_SIZE {
                    return None;
                }
                let idx = palette.len() as u8;
                palette.push((px[0], px[1], px[2], px[3]));
                color_to_index.insert(packed, idx);
                idx
            }
        };
        indices.push(index);
    }

    Some((palette, indices))
}

/// Collect distinct colours per chunk in parallel, merge them in chunk
/// order, then map pixels to indices in parallel.
fn extract_palette_parallel(pixels: &[u8]) -> Option<(Vec<Rgba>, Vec<u8>)> {
    let chunk_pixels = (pixels.len() / 4 / rayon::current_num_threads()).max(256);

    let per_chunk: Option<Vec<Vec<u32>>> = pixels
        .par_chunks(chunk_pixels * 4)
        .map(|chunk| {
            let mut seen: HashMap<u32, ()> = HashMap::with_capacity(MAX_PALETTE_SIZE);
            let mut ordered = Vec::new();
            for px in chunk.chunks_exact(4) {
                let packed = pack_color(px[0], px[1], px[2], px[3]);
                if seen.insert(packed, ()).is_none() {
                    if ordered.len() >= MAX_PALETTE_SIZE {
                        return None;
                    }
                    ordered.push(packed);
                }
            }
            Some(ordered)
        })
        .collect();

    let mut lookup: HashMap<u32, u8> = HashMap::with_capacity(MAX_PALETTE_SIZE);
    let mut palette: Vec<Rgba> = Vec::with_capacity(MAX_PALETTE_SIZE);
    for packed in per_chunk?.into_iter().flatten() {
        if lookup.contains_key(&packed) {
            continue;
        }
        if palette.len() >= MAX_PALETTE_SIZE {
            return None;
        }
        lookup.insert(packed, palette.len() as u8);
        palette.push(unpack_color(packed));
    }

    let indices: Vec<u8> = pixels
        .par_chunks_exact(4)
        .map(|px| {
            lookup
                .get(&pack_color(px[0], px[1], px[2], px[3]))
                .copied()
                .unwrap_or(0)
        })
        .collect();

    Some((palette, indices))
}

/// Create an indexed PNG (color type 3) from palette and indices.
///
/// A `tRNS` chunk is written when any palette entry is not fully opaque.
pub fn encode_indexed(
    width: usize,
    height: usize,
    palette: &[Rgba],
    indices: &[u8],
) -> Result<Vec<u8>, PngError> {
    check_len(indices.len(), width, height, 1)?;
    if palette.is_empty() || palette.len() > MAX_PALETTE_SIZE {
        return Err(PngError::PaletteSize(palette.len()));
    }
    if let Some(&index) = indices.iter().find(|&&i| i as usize >= palette.len()) {
        return Err(PngError::IndexOutOfRange {
            index,
            len: palette.len(),
        });
    }

    let mut png = Vec::new();
    png.extend_from_slice(&SIGNATURE);
    write_chunk(&mut png, b"IHDR", &ihdr(width, height, 3));

    let plte: Vec<u8> = palette.iter().flat_map(|&(r, g, b, _)| [r, g, b]).collect();
    write_chunk(&mut png, b"PLTE", &plte);

    if palette.iter().any(|&(_, _, _, a)| a < 255) {
        let trns: Vec<u8> = palette.iter().map(|&(_, _, _, a)| a).collect();
        write_chunk(&mut png, b"tRNS", &trns);
    }

    let idat = deflate_scanlines(indices, width, height, 1)?;
    write_chunk(&mut png, b"IDAT", &idat);
    write_chunk(&mut png, b"IEND", &[]);

    Ok(png)
}

/// Create a PNG image from RGBA pixel data (color type 6).
pub fn encode_rgba(pixels: &[u8], width: usize, height: usize) -> Result<Vec<u8>, PngError> {
    check_len(pixels.len(), width, height, 4)?;

    let mut png = Vec::new();
    png.extend_from_slice(&SIGNATURE);
    write_chunk(&mut png, b"IHDR", &ihdr(width, height, 6));

    let idat = deflate_scanlines(pixels, width, height, 4)?;
    write_chunk(&mut png, b"IDAT", &idat);
    write_chunk(&mut png, b"IEND", &[]);

    Ok(png)
}

/// Insert a `tEXt` chunk right before `IEND`.
pub fn with_text_chunk(mut png: Vec<u8>, keyword: &str, text: &str) -> Result<Vec<u8>, PngError> {
    if keyword.is_empty()
        || keyword.len() > 79
        || !keyword.bytes().all(|b| (32..=126).contains(&b))
    {
        return Err(PngError::InvalidKeyword);
    }
    // IEND is always the final 12 bytes: length, type, empty body, CRC.
    if png.len() < SIGNATURE.len() + 12
        || png[..8] != SIGNATURE
        || &png[png.len() - 8..png.len() - 4] != b"IEND"
    {
        return Err(PngError::NotPng);
    }

    let iend = png.split_off(png.len() - 12);
    let mut data = Vec::with_capacity(keyword.len() + 1 + text.len());
    data.extend_from_slice(keyword.as_bytes());
    data.push(0);
    data.extend_from_slice(text.as_bytes());
    write_chunk(&mut png, b"tEXt", &data);
    png.extend_from_slice(&iend);

    Ok(png)
}

fn check_len(actual: usize, width: usize, height: usize, bpp: usize) -> Result<(), PngError> {
    if width == 0 || height == 0 {
        return Err(PngError::EmptyImage { width, height });
    }
    let expected = width * height * bpp;
    if actual != expected {
        return Err(PngError::SizeMismatch { expected, actual });
    }
    Ok(())
}

fn ihdr(width: usize, height: usize, color_type: u8) -> [u8; 13] {
    let mut data = [0u8; 13];
    data[0..4].copy_from_slice(&(width as u32).to_be_bytes());
    data[4..8].copy_from_slice(&(height as u32).to_be_bytes());
    data[8] = 8; // bit depth
    data[9] = color_type;
    // compression, filter and interlace methods stay 0
    data
}

/// Write a PNG chunk
fn write_chunk(png: &mut Vec<u8>, chunk_type: &[u8; 4], data: &[u8]) {
    png.extend_from_slice(&(data.len() as u32).to_be_bytes());
    png.extend_from_slice(chunk_type);
    png.extend_from_slice(data);

    let mut hasher = crc32fast::Hasher::new();
    hasher.update(chunk_type);
    hasher.update(data);
    png.extend_from_slice(&hasher.finalize().to_be_bytes());
}

/// Prefix every scanline with filter type 0 and deflate.
fn deflate_scanlines(
    data: &[u8],
    width: usize,
    height: usize,
    bpp: usize,
) -> Result<Vec<u8>, std::io::Error> {
    let stride = width * bpp;
    let mut uncompressed = Vec::with_capacity(height * (1 + stride));
    for row in data.chunks_exact(stride) {
        uncompressed.push(0);
        uncompressed.extend_from_slice(row);
    }

    let mut encoder = flate2::write::ZlibEncoder::new(Vec::new(), flate2::Compression::default());
    encoder.write_all(&uncompressed)?;
    encoder.finish()
}
