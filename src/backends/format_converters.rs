// SPDX-License-Identifier: GPL-3.0-only

//! CPU converters from V4L2 wire formats into recorder frames
//!
//! Every converter returns exactly `width * height` pixels so the output
//! always satisfies the frame constructors; short input is zero-padded.

/// Convert packed UYVY 4:2:2 to RGBA (BT.601)
pub fn uyvy_to_rgba(data: &[u8], width: u32, height: u32) -> Vec<u8> {
    let pixel_count = width as usize * height as usize;
    let mut rgba = Vec::with_capacity(pixel_count * 4);

    // U0 Y0 V0 Y1 covers two pixels
    'outer: for chunk in data.chunks_exact(4) {
        let u = chunk[0] as f32 - 128.0;
        let v = chunk[2] as f32 - 128.0;

        for y in [chunk[1] as f32, chunk[3] as f32] {
            if rgba.len() >= pixel_count * 4 {
                break 'outer;
            }
            rgba.push((y + 1.402 * v).clamp(0.0, 255.0) as u8);
            rgba.push((y - 0.344 * u - 0.714 * v).clamp(0.0, 255.0) as u8);
            rgba.push((y + 1.772 * u).clamp(0.0, 255.0) as u8);
            rgba.push(255);
        }
    }

    rgba.resize(pixel_count * 4, 0);
    rgba
}

/// Convert Bayer GRBG to RGBA with a nearest-neighbour 2x2 demosaic
///
/// ```text
/// G R
/// B G
/// ```
/// A trailing odd row or column copies its neighbour block.
pub fn grbg_to_rgba(data: &[u8], width: u32, height: u32) -> Vec<u8> {
    let w = width as usize;
    let h = height as usize;
    let mut rgba = vec![0u8; w * h * 4];
    if data.len() < w * h || w < 2 || h < 2 {
        return rgba;
    }

    for y in 0..h {
        let by = (y & !1).min(h - 2);
        for x in 0..w {
            let bx = (x & !1).min(w - 2);
            let g0 = data[by * w + bx] as u16;
            let r = data[by * w + bx + 1];
            let b = data[(by + 1) * w + bx];
            let g1 = data[(by + 1) * w + bx + 1] as u16;

            let idx = (y * w + x) * 4;
            rgba[idx] = r;
            rgba[idx + 1] = ((g0 + g1) / 2) as u8;
            rgba[idx + 2] = b;
            rgba[idx + 3] = 255;
        }
    }

    rgba
}

/// Unpack Y10B (four 10-bit values in five bytes) to 16-bit samples
///
/// ```text
/// [A9:A2][B9:B2][C9:C2][D9:D2][D1:D0,C1:C0,B1:B0,A1:A0]
/// ```
pub fn unpack_y10b(data: &[u8], width: u32, height: u32) -> Vec<u16> {
    let pixel_count = width as usize * height as usize;
    let mut output = Vec::with_capacity(pixel_count);

    'outer: for chunk in data.chunks_exact(5) {
        let low = chunk[4] as u16;
        for (i, &high) in chunk[..4].iter().enumerate() {
            if output.len() >= pixel_count {
                break 'outer;
            }
            output.push(((high as u16) << 2) | ((low >> (2 * i)) & 0x03));
        }
    }

    output.resize(pixel_count, 0);
    output
}

/// Read little-endian Y16 samples
pub fn y16_to_u16(data: &[u8], width: u32, height: u32) -> Vec<u16> {
    let pixel_count = width as usize * height as usize;
    let mut output: Vec<u16> = data
        .chunks_exact(2)
        .take(pixel_count)
        .map(|c| u16::from_le_bytes([c[0], c[1]]))
        .collect();
    output.resize(pixel_count, 0);
    output
}
