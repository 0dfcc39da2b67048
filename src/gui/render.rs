//! Conversions between egui and the calibration session.
//!
//! Maps keys and pointer buttons onto session input and turns rendered
//! views into textures.

use eframe::egui::{self, ColorImage, Pos2, Rect};
use image::RgbaImage;

use crate::calibration::{Key, PointerButton};

/// Maps a physical key onto a session key.
pub fn map_key(key: egui::Key) -> Key {
    match key {
        egui::Key::Enter => Key::Accept,
        egui::Key::Escape => Key::Abort,
        egui::Key::Backspace => Key::Undo,
        egui::Key::R => Key::Rotate,
        egui::Key::F => Key::Fix,
        egui::Key::ArrowUp | egui::Key::W => Key::Up,
        egui::Key::ArrowDown | egui::Key::S => Key::Down,
        egui::Key::ArrowLeft | egui::Key::A => Key::Left,
        egui::Key::ArrowRight | egui::Key::D => Key::Right,
        _ => Key::Other,
    }
}

pub fn map_button(button: egui::PointerButton) -> Option<PointerButton> {
    match button {
        egui::PointerButton::Primary => Some(PointerButton::Primary),
        egui::PointerButton::Secondary => Some(PointerButton::Secondary),
        _ => None,
    }
}

/// Converts a pointer position in egui points to a pixel of the shown image.
///
/// `rect` is where the image was painted and `image_size` its pixel size.
/// Positions outside the image map outside `0..image_size`.
pub fn pointer_to_pixel(pos: Pos2, rect: Rect, image_size: (u32, u32)) -> (i32, i32) {
    let width = rect.width().max(f32::EPSILON);
    let height = rect.height().max(f32::EPSILON);
    let x = (pos.x - rect.min.x) / width * image_size.0 as f32;
    let y = (pos.y - rect.min.y) / height * image_size.1 as f32;
    (x.floor() as i32, y.floor() as i32)
}

pub fn to_color_image(img: &RgbaImage) -> ColorImage {
    let size = [img.width() as usize, img.height() as usize];
    ColorImage::from_rgba_unmultiplied(size, img.as_raw())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgba};

    #[test]
    fn test_key_mapping() {
        assert_eq!(map_key(egui::Key::Enter), Key::Accept);
        assert_eq!(map_key(egui::Key::Escape), Key::Abort);
        assert_eq!(map_key(egui::Key::Backspace), Key::Undo);
        assert_eq!(map_key(egui::Key::W), Key::Up);
        assert_eq!(map_key(egui::Key::ArrowLeft), Key::Left);
        assert_eq!(map_key(egui::Key::Q), Key::Other);
    }

    #[test]
    fn test_button_mapping() {
        assert_eq!(
            map_button(egui::PointerButton::Secondary),
            Some(PointerButton::Secondary)
        );
        assert_eq!(map_button(egui::PointerButton::Middle), None);
    }

    #[test]
    fn test_pointer_to_pixel_scales_points() {
        // A 200x100 image painted at half size (e.g. pixels_per_point = 2).
        let rect = Rect::from_min_size(Pos2::new(10.0, 20.0), egui::vec2(100.0, 50.0));
        assert_eq!(pointer_to_pixel(Pos2::new(10.0, 20.0), rect, (200, 100)), (0, 0));
        assert_eq!(pointer_to_pixel(Pos2::new(60.0, 45.0), rect, (200, 100)), (100, 50));
        assert_eq!(pointer_to_pixel(Pos2::new(5.0, 20.0), rect, (200, 100)), (-10, 0));
    }

    #[test]
    fn test_color_image_size() {
        let img: RgbaImage = ImageBuffer::from_pixel(3, 2, Rgba([1, 2, 3, 255]));
        let color = to_color_image(&img);
        assert_eq!(color.size, [3, 2]);
        assert_eq!(color.pixels[0], egui::Color32::from_rgb(1, 2, 3));
    }
}
