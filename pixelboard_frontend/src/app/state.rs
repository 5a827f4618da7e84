use eframe::egui::Color32;

use crate::canvas::{CanvasLayout, PaintPointer, DEFAULT_PAINT_COLOR, DEFAULT_PIXEL_AMOUNT};

/// Which of the two independent views fills the central panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ActiveView {
    #[default]
    Canvas,
    Gallery,
}

/// Editor controls around the drawing surface. Changing `pixel_amount`
/// re-derives the whole surface, so the painted cells are cleared with it.
pub struct EditorState {
    pub pixel_amount: u32,
    pub color: Color32,
    pub grid_enabled: bool,
    pub pointer: PaintPointer,
    /// Layout of the surface as last rendered, used when exporting.
    pub last_layout: Option<CanvasLayout>,
}

impl Default for EditorState {
    fn default() -> Self {
        Self {
            pixel_amount: DEFAULT_PIXEL_AMOUNT,
            color: DEFAULT_PAINT_COLOR,
            grid_enabled: true,
            pointer: PaintPointer::default(),
            last_layout: None,
        }
    }
}

#[derive(Default)]
pub struct UploadState {
    pub author_name: String,
    pub image_name: String,
    pub submitting: bool,
    pub error: Option<String>,
}

/// Decoded RGBA thumbnail handed from a worker thread to the UI thread,
/// which turns it into a texture on first paint.
#[derive(Clone)]
pub struct LoadedImage {
    pub size: [usize; 2],
    pub pixels: Vec<u8>,
}
