//! Frame-buffer primitives. Every function clips against the frame bounds
//! and tolerates degenerate inputs by drawing nothing.

use super::sprites::LoadedSprite;

pub fn write_pixel_rgba_clipped(frame: &mut [u8], width: usize, x: i32, y: i32, color: [u8; 4]) {
    if x < 0 || y < 0 {
        return;
    }
    let x = x as usize;
    let y = y as usize;
    if width == 0 || x >= width {
        return;
    }
    let Some(pixel_offset) = y.checked_mul(width).and_then(|row| row.checked_add(x)) else {
        return;
    };
    let Some(byte_offset) = pixel_offset.checked_mul(4) else {
        return;
    };
    let Some(end) = byte_offset.checked_add(4) else {
        return;
    };
    if end > frame.len() {
        return;
    }
    frame[byte_offset..end].copy_from_slice(&color);
}

pub fn clear_frame(frame: &mut [u8], color: [u8; 4]) {
    for chunk in frame.chunks_exact_mut(4) {
        chunk.copy_from_slice(&color);
    }
}

/// Filled isometric diamond centered on `(cx, cy)`.
pub fn fill_diamond(
    frame: &mut [u8],
    width: u32,
    height: u32,
    cx: i32,
    cy: i32,
    half_w: i32,
    half_h: i32,
    color: [u8; 4],
) {
    if width == 0 || height == 0 || half_w <= 0 || half_h <= 0 {
        return;
    }
    for dy in -half_h..=half_h {
        let row_half_w =
            ((1.0 - dy.abs() as f32 / half_h as f32) * half_w as f32).round() as i32;
        let y = cy + dy;
        for x in (cx - row_half_w)..=(cx + row_half_w) {
            write_pixel_rgba_clipped(frame, width as usize, x, y, color);
        }
    }
}

/// Elevated tile placeholder: a diamond top raised by `rise_px` with darker
/// side walls dropping to the ground-plane footprint.
#[allow(clippy::too_many_arguments)]
pub fn fill_elevated_block(
    frame: &mut [u8],
    width: u32,
    height: u32,
    cx: i32,
    cy: i32,
    half_w: i32,
    half_h: i32,
    rise_px: i32,
    top_color: [u8; 4],
    side_color: [u8; 4],
) {
    if width == 0 || height == 0 || half_w <= 0 || half_h <= 0 {
        return;
    }
    for dx in -half_w..=half_w {
        let edge = ((1.0 - dx.abs() as f32 / half_w as f32) * half_h as f32).round() as i32;
        let bottom = cy + edge;
        for y in (bottom - rise_px)..=bottom {
            write_pixel_rgba_clipped(frame, width as usize, cx + dx, y, side_color);
        }
    }
    fill_diamond(
        frame,
        width,
        height,
        cx,
        cy - rise_px,
        half_w,
        half_h,
        top_color,
    );
}

pub fn draw_square(
    frame: &mut [u8],
    width: u32,
    height: u32,
    cx: i32,
    cy: i32,
    half_size: i32,
    color: [u8; 4],
) {
    for y in (cy - half_size)..=(cy + half_size) {
        for x in (cx - half_size)..=(cx + half_size) {
            if x < 0 || y < 0 || x >= width as i32 || y >= height as i32 {
                continue;
            }
            write_pixel_rgba_clipped(frame, width as usize, x, y, color);
        }
    }
}

/// Circle band at `radius` with the given thickness; the radial-burst
/// building block for transient overlay effects.
#[allow(clippy::too_many_arguments)]
pub fn draw_ring(
    frame: &mut [u8],
    width: u32,
    height: u32,
    cx: i32,
    cy: i32,
    radius: f32,
    thickness: f32,
    color: [u8; 4],
) {
    if !radius.is_finite() || radius <= 0.0 || thickness <= 0.0 {
        return;
    }
    let reach = (radius + thickness).ceil() as i32;
    for dy in -reach..=reach {
        let y = cy + dy;
        if y < 0 || y >= height as i32 {
            continue;
        }
        for dx in -reach..=reach {
            let distance = ((dx * dx + dy * dy) as f32).sqrt();
            if (distance - radius).abs() <= thickness {
                write_pixel_rgba_clipped(frame, width as usize, cx + dx, y, color);
            }
        }
    }
}

pub fn fill_circle(
    frame: &mut [u8],
    width: u32,
    height: u32,
    cx: i32,
    cy: i32,
    radius: f32,
    color: [u8; 4],
) {
    if !radius.is_finite() || radius <= 0.0 {
        return;
    }
    let reach = radius.ceil() as i32;
    for dy in -reach..=reach {
        let y = cy + dy;
        if y < 0 || y >= height as i32 {
            continue;
        }
        for dx in -reach..=reach {
            if ((dx * dx + dy * dy) as f32).sqrt() <= radius {
                write_pixel_rgba_clipped(frame, width as usize, cx + dx, y, color);
            }
        }
    }
}

/// Straight segment between two screen points, stepped at pixel resolution.
pub fn draw_line(
    frame: &mut [u8],
    width: u32,
    height: u32,
    from: (f32, f32),
    to: (f32, f32),
    color: [u8; 4],
) {
    let dx = to.0 - from.0;
    let dy = to.1 - from.1;
    if !dx.is_finite() || !dy.is_finite() {
        return;
    }
    let steps = dx.abs().max(dy.abs()).ceil() as i32;
    if steps <= 0 {
        let y = from.1.round() as i32;
        if y >= 0 && y < height as i32 {
            write_pixel_rgba_clipped(frame, width as usize, from.0.round() as i32, y, color);
        }
        return;
    }
    for step in 0..=steps {
        let t = step as f32 / steps as f32;
        let x = (from.0 + dx * t).round() as i32;
        let y = (from.1 + dy * t).round() as i32;
        if y < 0 || y >= height as i32 {
            continue;
        }
        write_pixel_rgba_clipped(frame, width as usize, x, y, color);
    }
}

fn normalized_sprite_scale(scale: f32) -> f32 {
    if scale.is_finite() && scale > 0.0 {
        scale
    } else {
        1.0
    }
}

/// Nearest-neighbor sprite blit centered on `(cx, cy)`, skipping fully
/// transparent source pixels.
pub fn draw_sprite_centered_scaled(
    frame: &mut [u8],
    width: u32,
    height: u32,
    cx: i32,
    cy: i32,
    sprite: &LoadedSprite,
    scale: f32,
) {
    if sprite.width == 0 || sprite.height == 0 || width == 0 || height == 0 {
        return;
    }
    let expected_rgba_len = sprite.width as usize * sprite.height as usize * 4;
    if sprite.rgba.len() < expected_rgba_len {
        return;
    }

    let scale = normalized_sprite_scale(scale);
    let inv_scale = scale.recip();
    let scaled_w = (sprite.width as f32 * scale).round().max(1.0) as u32;
    let scaled_h = (sprite.height as f32 * scale).round().max(1.0) as u32;
    let left = cx - (scaled_w as i32 / 2);
    let top = cy - (scaled_h as i32 / 2);

    let draw_left = left.max(0);
    let draw_top = top.max(0);
    let draw_right = (left + scaled_w as i32).min(width as i32);
    let draw_bottom = (top + scaled_h as i32).min(height as i32);
    if draw_left >= draw_right || draw_top >= draw_bottom {
        return;
    }

    let frame_width = width as usize;
    let sprite_width = sprite.width as usize;

    for out_y in draw_top..draw_bottom {
        let src_y = (((out_y - top) as f32) * inv_scale).floor() as u32;
        let src_y = src_y.min(sprite.height - 1) as usize;
        let src_row_offset = src_y * sprite_width * 4;
        let dst_row_offset = out_y as usize * frame_width * 4;

        for out_x in draw_left..draw_right {
            let src_x = (((out_x - left) as f32) * inv_scale).floor() as u32;
            let src_x = src_x.min(sprite.width - 1) as usize;
            let src_offset = src_row_offset + src_x * 4;
            let alpha = sprite.rgba[src_offset + 3];
            if alpha == 0 {
                continue;
            }
            let dst_offset = dst_row_offset + out_x as usize * 4;
            frame[dst_offset..dst_offset + 4].copy_from_slice(&sprite.rgba[src_offset..src_offset + 4]);
        }
    }
}
