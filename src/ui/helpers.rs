use anyhow::Error;
use image::DynamicImage;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span};

use crate::imaging;

/// Render an image as rows of half-block cells, packing two pixel rows into
/// each terminal row. The image is thumbnailed to fit the given cell bounds
/// before any pixels are read.
pub(crate) fn image_preview_lines(
    image: &DynamicImage,
    max_width: u16,
    max_height: u16,
) -> Vec<Line<'static>> {
    if max_width == 0 || max_height == 0 {
        return vec![Line::from("")];
    }

    let pixels = imaging::preview_thumbnail(image, max_width as u32, max_height as u32 * 2);
    let width = pixels.width();
    let height = pixels.height();

    let mut lines = Vec::with_capacity(height.div_ceil(2) as usize);
    let mut y = 0;
    while y < height {
        let mut spans = Vec::with_capacity(width as usize);
        for x in 0..width {
            let top = pixels.get_pixel(x, y).0;
            let mut style = Style::default().fg(Color::Rgb(top[0], top[1], top[2]));
            if y + 1 < height {
                let bottom = pixels.get_pixel(x, y + 1).0;
                style = style.bg(Color::Rgb(bottom[0], bottom[1], bottom[2]));
            }
            spans.push(Span::styled("▀", style));
        }
        lines.push(Line::from(spans));
        y += 2;
    }

    lines
}

/// Produce a rectangle centered within `area` that spans the requested percent
/// of the width and height. Used for modal dialogs.
pub(crate) fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let horizontal = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(area);

    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(horizontal[1]);

    vertical[1]
}

/// Extract the most relevant error message from a chained error.
pub(crate) fn surface_error(err: &Error) -> String {
    err.chain()
        .last()
        .map(|cause| cause.to_string())
        .unwrap_or_else(|| err.to_string())
}

#[cfg(test)]
mod tests {
    use image::{Rgba, RgbaImage};

    use super::*;

    fn solid_image(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgba8(RgbaImage::from_pixel(
            width,
            height,
            Rgba([10, 20, 30, 255]),
        ))
    }

    #[test]
    fn test_preview_packs_two_pixel_rows_per_line() {
        let lines = image_preview_lines(&solid_image(40, 20), 20, 10);
        assert_eq!(lines.len(), 5);
        assert_eq!(lines[0].spans.len(), 20);
    }

    #[test]
    fn test_preview_handles_a_zero_sized_viewport() {
        let lines = image_preview_lines(&solid_image(40, 20), 0, 10);
        assert_eq!(lines.len(), 1);
    }
}
