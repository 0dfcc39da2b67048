//! View rendering for the calibration window.
//!
//! Every redraw rebuilds the image from scratch: crop the current frame,
//! scale it, rotate it, overlay every segment point colour-coded by status,
//! then append the diagnostic panel once scan results exist.

use image::imageops::{self, FilterType};
use image::{ImageBuffer, Rgba, RgbaImage};

use crate::calibration::coords::{Rotation, ViewTransform};
use crate::calibration::state::{Calibration, SegmentPoint};
use crate::calibration::wizard::Session;
use crate::decode::classify::sample_pixel;
use crate::decode::SegmentReading;
use crate::scanner::Scanner;

/// Color constants for point markers.
pub const COLOR_UNSELECTED: Rgba<u8> = Rgba([255, 0, 0, 255]); // Red
pub const COLOR_SELECTED: Rgba<u8> = Rgba([255, 128, 0, 255]); // Orange
pub const COLOR_NAMED: Rgba<u8> = Rgba([0, 255, 0, 255]); // Green
pub const COLOR_BROKEN: Rgba<u8> = Rgba([255, 0, 255, 255]); // Magenta

/// Color constants for the diagnostic panel.
pub const COLOR_PANEL: Rgba<u8> = Rgba([32, 32, 32, 255]);
pub const COLOR_SEGMENT_ON: Rgba<u8> = Rgba([0, 255, 0, 255]);
pub const COLOR_SEGMENT_OFF: Rgba<u8> = Rgba([70, 70, 70, 255]);
pub const COLOR_PROGRESS: Rgba<u8> = Rgba([0, 128, 255, 255]);

/// Side of the square drawn for each point, in display pixels.
pub const MARKER_SIZE: u32 = 7;

pub const PANEL_HEIGHT: u32 = 100;
const GLYPH_STRIDE: u32 = 50;
const PROGRESS_TOP: u32 = 84;
const PROGRESS_HEIGHT: u32 = 10;

/// Segment rectangles (x, y, w, h) inside a 40x70 glyph cell, in role order.
const GLYPH_CELLS: [(u32, u32, u32, u32); 7] = [
    (8, 4, 24, 6),   // top
    (4, 8, 6, 24),   // top-left
    (30, 8, 6, 24),  // top-right
    (8, 32, 24, 6),  // middle
    (4, 40, 6, 24),  // bottom-left
    (30, 40, 6, 24), // bottom-right
    (8, 60, 24, 6),  // bottom
];

/// Renders the session's current view.
pub fn render_session(session: &Session) -> RgbaImage {
    render(
        session.frame(),
        &session.transform(),
        session.calibration(),
        session.scanner(),
    )
}

/// Renders a frame through the view pipeline with point overlay and diagnostics.
pub fn render(
    frame: &RgbaImage,
    transform: &ViewTransform,
    calibration: &Calibration,
    scanner: Option<&Scanner>,
) -> RgbaImage {
    let mut img = render_view(frame, transform);
    draw_points(&mut img, frame, transform, calibration);

    match scanner {
        Some(scanner) if !scanner.results().is_empty() => {
            append_panel(&img, calibration, scanner)
        }
        _ => img,
    }
}

/// Crops, scales and rotates a frame into display space.
pub fn render_view(frame: &RgbaImage, transform: &ViewTransform) -> RgbaImage {
    let crop = transform.crop();
    let view = imageops::crop_imm(frame, crop.x, crop.y, crop.width, crop.height).to_image();

    let (sw, sh) = transform.scaled_size();
    let scaled = if view.dimensions() == (sw, sh) {
        view
    } else {
        imageops::resize(&view, sw, sh, FilterType::Triangle)
    };

    match transform.rotation() {
        Rotation::Deg0 => scaled,
        Rotation::Deg90 => imageops::rotate90(&scaled),
        Rotation::Deg180 => imageops::rotate180(&scaled),
        Rotation::Deg270 => imageops::rotate270(&scaled),
    }
}

/// Border colour for a point: selected, then broken, then named.
pub fn point_color(point: &SegmentPoint, digit_broken: bool) -> Rgba<u8> {
    if point.selected {
        COLOR_SELECTED
    } else if digit_broken {
        COLOR_BROKEN
    } else if point.name.is_some() {
        COLOR_NAMED
    } else {
        COLOR_UNSELECTED
    }
}

/// Draws a marker for every point visible in the view.
///
/// Each marker is filled with the colour sampled at the point in the
/// source frame, so the operator sees exactly what will be classified.
fn draw_points(
    img: &mut RgbaImage,
    frame: &RgbaImage,
    transform: &ViewTransform,
    calibration: &Calibration,
) {
    let half = (MARKER_SIZE / 2) as i32;
    for (_, point) in calibration.points() {
        let (x, y) = transform.to_display(point.position);
        if !transform.contains_display((x, y)) {
            continue;
        }

        let broken = calibration.digit(point.digit).is_broken;
        let x0 = (x - half).max(0) as u32;
        let y0 = (y - half).max(0) as u32;
        if let Some(fill) = sample_pixel(frame, point.position) {
            fill_rect(img, x0, y0, MARKER_SIZE, MARKER_SIZE, fill);
        }
        draw_rect(
            img,
            x0,
            y0,
            MARKER_SIZE,
            MARKER_SIZE,
            point_color(point, broken),
            2,
        );
    }
}

/// Stacks the diagnostic panel under the view.
fn append_panel(view: &RgbaImage, calibration: &Calibration, scanner: &Scanner) -> RgbaImage {
    let digits = calibration.digits();
    let panel_width = 10 + GLYPH_STRIDE * digits.len() as u32;
    let width = view.width().max(panel_width);
    let height = view.height() + PANEL_HEIGHT;

    let mut img: RgbaImage = ImageBuffer::from_pixel(width, height, COLOR_PANEL);
    imageops::replace(&mut img, view, 0, 0);

    let top = view.height();
    if let Some((_, reading)) = scanner.results().latest() {
        for (i, segments) in reading.segments.iter().enumerate() {
            let broken = digits.get(i).map(|d| d.is_broken).unwrap_or(false);
            draw_glyph(&mut img, 10 + GLYPH_STRIDE * i as u32, top + 6, segments, broken);
        }
    }

    let bar_width = ((width - 20) as f32 * scanner.progress()).round() as u32;
    draw_rect(&mut img, 10, top + PROGRESS_TOP, width - 20, PROGRESS_HEIGHT, COLOR_SEGMENT_OFF, 1);
    fill_rect(&mut img, 10, top + PROGRESS_TOP, bar_width, PROGRESS_HEIGHT, COLOR_PROGRESS);

    img
}

/// Draws one seven-cell on/off visualization.
fn draw_glyph(img: &mut RgbaImage, x: u32, y: u32, segments: &SegmentReading, broken: bool) {
    for (lit, (cx, cy, cw, ch)) in segments.iter().zip(GLYPH_CELLS) {
        let color = if *lit { COLOR_SEGMENT_ON } else { COLOR_SEGMENT_OFF };
        fill_rect(img, x + cx, y + cy, cw, ch, color);
    }
    if broken {
        draw_rect(img, x, y, 40, 70, COLOR_BROKEN, 2);
    }
}

/// Fills a rectangle, clipped to the image.
pub fn fill_rect(img: &mut RgbaImage, x: u32, y: u32, w: u32, h: u32, color: Rgba<u8>) {
    let (img_w, img_h) = img.dimensions();
    for py in y..y.saturating_add(h).min(img_h) {
        for px in x..x.saturating_add(w).min(img_w) {
            img.put_pixel(px, py, color);
        }
    }
}

/// Draws a rectangle border on an image.
pub fn draw_rect(
    img: &mut RgbaImage,
    x: u32,
    y: u32,
    w: u32,
    h: u32,
    color: Rgba<u8>,
    thickness: u32,
) {
    let t = thickness.min(w).min(h);
    // Top and bottom edges
    fill_rect(img, x, y, w, t, color);
    fill_rect(img, x, (y + h).saturating_sub(t), w, t, color);
    // Left and right edges
    fill_rect(img, x, y, t, h, color);
    fill_rect(img, (x + w).saturating_sub(t), y, t, h, color);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calibration::coords::ViewState;
    use crate::calibration::state::tests::{grid_position, named_calibration};
    use crate::capture::memory::MemorySource;
    use crate::config::AppConfig;
    use crate::decode::table::DIGIT_TABLE;
    use crate::scanner::state::tests::glyph_frame;
    use crate::scanner::ScanStep;

    const BLACK: Rgba<u8> = Rgba([0, 0, 0, 255]);
    const MARK: Rgba<u8> = Rgba([200, 10, 10, 255]);

    fn transform(frame: &RgbaImage, view: &ViewState) -> ViewTransform {
        ViewTransform::new(frame.dimensions(), view, 600, 900)
    }

    #[test]
    fn test_draw_rect() {
        let mut img = ImageBuffer::from_pixel(100, 100, BLACK);
        draw_rect(&mut img, 10, 10, 50, 30, COLOR_NAMED, 2);

        assert_eq!(*img.get_pixel(10, 10), COLOR_NAMED);
        assert_eq!(*img.get_pixel(59, 39), COLOR_NAMED);
        assert_eq!(*img.get_pixel(35, 25), BLACK);
    }

    #[test]
    fn test_fill_rect_clips_to_image() {
        let mut img = ImageBuffer::from_pixel(10, 10, BLACK);
        fill_rect(&mut img, 8, 8, 5, 5, COLOR_PROGRESS);
        assert_eq!(*img.get_pixel(9, 9), COLOR_PROGRESS);
        assert_eq!(*img.get_pixel(7, 7), BLACK);
    }

    #[test]
    fn test_rotated_view_matches_transform() {
        // 700x650 is shown unscaled, so pixels map one to one.
        let mut frame: RgbaImage = ImageBuffer::from_pixel(700, 650, BLACK);
        frame.put_pixel(10, 20, MARK);

        let mut view = ViewState::default();
        for _ in 0..4 {
            let t = transform(&frame, &view);
            let img = render_view(&frame, &t);
            assert_eq!(img.dimensions(), t.display_size());
            let (x, y) = t.to_display((10, 20));
            assert_eq!(*img.get_pixel(x as u32, y as u32), MARK);
            view.rotate();
        }
    }

    #[test]
    fn test_cropped_view_is_scaled_to_fit() {
        let frame: RgbaImage = ImageBuffer::from_pixel(1200, 800, BLACK);
        let mut view = ViewState::default();
        view.push_crop(crate::calibration::coords::CropRect {
            x: 100,
            y: 100,
            width: 200,
            height: 100,
        });
        let t = transform(&frame, &view);
        let img = render_view(&frame, &t);
        assert_eq!(img.dimensions(), (600, 300));
    }

    #[test]
    fn test_point_markers_use_status_colors() {
        let frame = glyph_frame(&[DIGIT_TABLE[8]]);
        let mut cal = named_calibration(1);
        let first = cal.points().next().unwrap().0;
        cal.select_only(first);
        cal.digits_mut()[0].is_broken = true;

        let view = ViewState::default();
        let t = ViewTransform::new(frame.dimensions(), &view, 600, 2000);
        let img = render(&frame, &t, &cal, None);

        let half = (MARKER_SIZE / 2) as i32;
        let corner = |i: usize| {
            let (x, y) = grid_position(i);
            *img.get_pixel((x - half) as u32, (y - half) as u32)
        };
        assert_eq!(corner(0), COLOR_SELECTED);
        assert_eq!(corner(1), COLOR_BROKEN);

        // Marker centre shows the sampled source colour.
        let (x, y) = grid_position(2);
        assert_eq!(*img.get_pixel(x as u32, y as u32), Rgba([255, 255, 255, 255]));
    }

    #[test]
    fn test_panel_appended_after_first_sample() {
        let config = AppConfig::default();
        let frame = glyph_frame(&[DIGIT_TABLE[7]]);
        let mut source = MemorySource::new(vec![frame.clone(), frame.clone()], 1.0);
        let mut cal = named_calibration(1);
        let mut scanner = Scanner::new(&config, 1.0, 2);

        let view = ViewState::default();
        let t = transform(&frame, &view);
        let plain = render(&frame, &t, &cal, Some(&scanner));
        assert_eq!(plain.dimensions(), t.display_size());

        assert!(matches!(
            scanner.step(&mut cal, &mut source).unwrap(),
            ScanStep::Sampled { .. }
        ));
        let img = render(&frame, &t, &cal, Some(&scanner));
        let (w, h) = t.display_size();
        assert_eq!(img.dimensions(), (w, h + PANEL_HEIGHT));

        // Top segment of "7" lit, middle off.
        let (cx, cy, _, _) = GLYPH_CELLS[0];
        assert_eq!(*img.get_pixel(10 + cx + 1, h + 6 + cy + 1), COLOR_SEGMENT_ON);
        let (cx, cy, _, _) = GLYPH_CELLS[3];
        assert_eq!(*img.get_pixel(10 + cx + 1, h + 6 + cy + 1), COLOR_SEGMENT_OFF);

        // Half the timeline sampled.
        assert_eq!(*img.get_pixel(12, h + PROGRESS_TOP + 5), COLOR_PROGRESS);
        assert_ne!(*img.get_pixel(w - 15, h + PROGRESS_TOP + 5), COLOR_PROGRESS);
    }
}
