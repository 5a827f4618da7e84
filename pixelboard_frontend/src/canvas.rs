use std::collections::HashMap;
use std::io::Cursor;

use anyhow::{Context, Result};
use eframe::egui::Color32;
use image::{ImageFormat, Rgba, RgbaImage};

pub const MIN_PIXEL_AMOUNT: u32 = 10;
pub const MAX_PIXEL_AMOUNT: u32 = 50;
pub const DEFAULT_PIXEL_AMOUNT: u32 = 20;

pub const GRID_LINE_WIDTH: f32 = 1.5;
pub const GRID_LINE_COLOR: Color32 = Color32::from_rgb(160, 160, 160);
pub const SURFACE_BACKGROUND: Color32 = Color32::WHITE;
pub const DEFAULT_PAINT_COLOR: Color32 = Color32::BLACK;

/// Geometry of the drawing surface for one frame: an N×N logical grid of
/// integer-sized cells fitted into the observed viewport. Recomputed whenever
/// the viewport or the pixel amount changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CanvasLayout {
    pub cell_size: u32,
    pub surface_w: u32,
    pub surface_h: u32,
}

impl CanvasLayout {
    /// `cell_size = floor(viewport_w / pixel_amount)`; the surface is the
    /// largest multiple of `cell_size` fitting the viewport on each axis.
    /// Returns `None` while the viewport is too small to hold a single cell.
    pub fn compute(viewport_w: u32, viewport_h: u32, pixel_amount: u32) -> Option<Self> {
        if pixel_amount == 0 {
            return None;
        }
        let cell_size = viewport_w / pixel_amount;
        if cell_size == 0 {
            return None;
        }
        Some(Self {
            cell_size,
            surface_w: viewport_w - viewport_w % cell_size,
            surface_h: viewport_h - viewport_h % cell_size,
        })
    }

    /// Surface-relative pointer position to grid indices. No clamping: a
    /// pointer off the surface yields a cell that simply is not visible.
    pub fn cell_at(&self, x: f32, y: f32) -> (i32, i32) {
        let size = self.cell_size as f32;
        ((x / size).floor() as i32, (y / size).floor() as i32)
    }

    /// Grid line offsets along an axis of the given extent, including both
    /// edges.
    pub fn line_offsets(&self, extent: u32) -> impl Iterator<Item = u32> + '_ {
        (0..=extent / self.cell_size).map(move |i| i * self.cell_size)
    }
}

/// Pointer interaction: press starts painting, motion while painting keeps
/// painting, release or leaving the surface stops. Fast drags may skip cells;
/// there is no interpolation between move events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PaintPointer {
    #[default]
    Idle,
    Painting,
}

impl PaintPointer {
    pub fn press(&mut self) {
        *self = PaintPointer::Painting;
    }

    pub fn release(&mut self) {
        *self = PaintPointer::Idle;
    }

    pub fn is_painting(&self) -> bool {
        matches!(self, PaintPointer::Painting)
    }

    /// One frame of pointer input. Only a fresh press over the surface
    /// starts painting; releasing the button or leaving the surface returns
    /// to idle, and re-entering with the button still held stays idle until
    /// the next press.
    pub fn update(&mut self, pressed_now: bool, button_down: bool, on_surface: bool) {
        if button_down && on_surface && pressed_now {
            self.press();
        } else if !button_down || !on_surface {
            self.release();
        }
    }
}

/// The painted cells of the drawing. Cells exist only once painted; the only
/// state that ever leaves the client is the exported bitmap.
#[derive(Debug, Clone, Default)]
pub struct PixelCanvas {
    cells: HashMap<(i32, i32), Color32>,
}

impl PixelCanvas {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fills exactly one cell; repainting overwrites the previous color.
    pub fn paint_cell(&mut self, cell: (i32, i32), color: Color32) {
        self.cells.insert(cell, color);
    }

    pub fn cell_color(&self, cell: (i32, i32)) -> Option<Color32> {
        self.cells.get(&cell).copied()
    }

    pub fn cells(&self) -> impl Iterator<Item = (&(i32, i32), &Color32)> {
        self.cells.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn clear(&mut self) {
        self.cells.clear();
    }

    /// Rasterizes the drawing to a PNG the size of the current surface: a
    /// white background with one `cell_size²` square per painted cell. Cells
    /// outside the surface are dropped.
    pub fn export_png(&self, layout: CanvasLayout) -> Result<Vec<u8>> {
        let mut img = RgbaImage::from_pixel(
            layout.surface_w,
            layout.surface_h,
            rgba(SURFACE_BACKGROUND),
        );
        let size = layout.cell_size;
        for (&(col, row), &color) in &self.cells {
            if col < 0 || row < 0 {
                continue;
            }
            let x0 = col as u32 * size;
            let y0 = row as u32 * size;
            if x0 >= layout.surface_w || y0 >= layout.surface_h {
                continue;
            }
            let pixel = rgba(color);
            for y in y0..(y0 + size).min(layout.surface_h) {
                for x in x0..(x0 + size).min(layout.surface_w) {
                    img.put_pixel(x, y, pixel);
                }
            }
        }
        let mut bytes = Vec::new();
        img.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .context("failed to encode PNG")?;
        Ok(bytes)
    }
}

fn rgba(color: Color32) -> Rgba<u8> {
    Rgba([color.r(), color.g(), color.b(), color.a()])
}
