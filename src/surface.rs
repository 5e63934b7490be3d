use std::path::{Path, PathBuf};

use crate::error::{ContextError, ErrorKind};
use crate::fonts::StandardFont;
use crate::pdf::{self, ImageXObject, PdfDocument};

/// Spacing between consecutive lines of a text block, as a multiple of the font size.
pub const LINE_HEIGHT_FACTOR: f32 = 1.15;

/// Thickness of every rule drawn on the page, in millimeters.
pub const LINE_WIDTH: f32 = 0.2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextAlignment {
    /// The text starts at the given position.
    Left,
    /// The text ends at the given position.
    Right,
}

/// Page dimensions in millimeters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageSize {
    pub width: f32,
    pub height: f32,
}

impl PageSize {
    pub const A4_PORTRAIT: PageSize = PageSize {
        width: 210.0,
        height: 297.0,
    };
}

/// The drawing primitives the invoice layout is expressed in. Positions are in
/// millimeters from the top-left corner and text positions are baselines.
pub trait DrawingSurface {
    fn page_size(&self) -> PageSize;

    /// Selects the font used by the following text calls.
    fn set_font(&mut self, font: StandardFont, font_size: f32);

    /// Places a block of lines, the first one at `position` and the following ones below it.
    fn text(
        &mut self,
        lines: &[&str],
        position: [f32; 2],
        alignment: TextAlignment,
    ) -> Result<(), ContextError>;

    fn line(&mut self, from: [f32; 2], to: [f32; 2]) -> Result<(), ContextError>;

    /// Places the image found at `image_path` with its top-left corner at `position`.
    fn image(
        &mut self,
        image_path: &Path,
        position: [f32; 2],
        size: [f32; 2],
    ) -> Result<(), ContextError>;

    /// Hands the finished document over under the given file name.
    fn save(&mut self, file_name: &str) -> Result<(), ContextError>;
}

/// A single-page `DrawingSurface` backed by a `PdfDocument`, saving into a directory.
pub struct PdfSurface {
    pdf_document: PdfDocument,
    page_index: usize,
    font: StandardFont,
    font_size: f32,
    output_directory: PathBuf,
    saved_path: Option<PathBuf>,
}

impl PdfSurface {
    pub fn new(pdf_document: PdfDocument, page_size: PageSize, output_directory: PathBuf) -> Self {
        let mut pdf_document = pdf_document;
        let page_index = pdf_document.add_page(page_size.width, page_size.height);

        PdfSurface {
            pdf_document,
            page_index,
            font: StandardFont::Helvetica,
            font_size: 16.0,
            output_directory,
            saved_path: None,
        }
    }

    /// Where the document was written by the last `save`, if it has been saved.
    pub fn saved_path(&self) -> Option<&Path> {
        self.saved_path.as_deref()
    }
}

impl DrawingSurface for PdfSurface {
    fn page_size(&self) -> PageSize {
        match self.pdf_document.page_size(self.page_index) {
            Ok((width, height)) => PageSize { width, height },
            // The page is created together with the surface
            Err(_) => PageSize::A4_PORTRAIT,
        }
    }

    fn set_font(&mut self, font: StandardFont, font_size: f32) {
        self.font = font;
        self.font_size = font_size;
    }

    fn text(
        &mut self,
        lines: &[&str],
        position: [f32; 2],
        alignment: TextAlignment,
    ) -> Result<(), ContextError> {
        let [x, y] = position;
        let line_height = pdf::points_to_millimeters(self.font_size * LINE_HEIGHT_FACTOR);

        for (line_index, line) in lines.iter().enumerate() {
            let line_x = match alignment {
                TextAlignment::Left => x,
                TextAlignment::Right => {
                    x - pdf::points_to_millimeters(self.font.text_width(line, self.font_size))
                }
            };
            self.pdf_document.write_text(
                self.page_index,
                self.font,
                self.font_size,
                line,
                [line_x, y + line_index as f32 * line_height],
            )?;
        }

        Ok(())
    }

    fn line(&mut self, from: [f32; 2], to: [f32; 2]) -> Result<(), ContextError> {
        self.pdf_document
            .draw_line(self.page_index, from, to, LINE_WIDTH)
    }

    fn image(
        &mut self,
        image_path: &Path,
        position: [f32; 2],
        size: [f32; 2],
    ) -> Result<(), ContextError> {
        let image = ImageXObject::from_path(image_path)?;
        self.pdf_document
            .add_image(self.page_index, image, position, size)
    }

    fn save(&mut self, file_name: &str) -> Result<(), ContextError> {
        let instance_id = format!("{}-instance", self.pdf_document.identifier);
        self.pdf_document.write_all(&instance_id)?;
        let pdf_document_bytes = self.pdf_document.save_to_bytes()?;

        let output_path = self.output_directory.join(file_name);
        std::fs::write(&output_path, pdf_document_bytes).map_err(|error| {
            ContextError::with_error(
                ErrorKind::Io,
                format!("Failed to save the PDF document to {:?}", output_path),
                &error,
            )
        })?;
        log::info!("Saved the PDF document to the path: {:?}", output_path);
        self.saved_path = Some(output_path);

        Ok(())
    }
}
