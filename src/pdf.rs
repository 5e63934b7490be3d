use lopdf::content::Operation;
use lopdf::{dictionary, Object, StringFormat};
use std::{
    collections::{BTreeMap, BTreeSet},
    io::BufWriter,
    mem,
    path::Path,
};
use time::OffsetDateTime;

use crate::error::{ContextError, ErrorKind};
use crate::fonts::{self, StandardFont};

/// Converts millimeters to points. This function is used in order to present the data
/// in the format required by the PDF specification, while the layout is expressed in
/// millimeters which are easier to reason about.
pub fn millimeters_to_points(millimeters: f32) -> f32 {
    millimeters * 2.834646
}

/// Converts points back to millimeters.
pub fn points_to_millimeters(points: f32) -> f32 {
    points / 2.834646
}

/// The low-level image representation for a PDF document: 8-bit RGB samples.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageXObject {
    /// Width of the image in pixels (original width, not scaled width).
    pub width: u32,
    /// Height of the image in pixels (original height, not scaled height).
    pub height: u32,
    /// Should the image be interpolated when scaled?
    pub interpolate: bool,
    /// The samples of the image, three bytes per pixel, row by row.
    pub image_data: Vec<u8>,
}

impl ImageXObject {
    /// Loads an image (JPEG or PNG) from disk and converts it into RGB samples.
    pub fn from_path(image_path: &Path) -> Result<Self, ContextError> {
        let dynamic_image = image::open(image_path).map_err(|error| {
            ContextError::with_error(
                ErrorKind::Io,
                format!("Unable to load the image {:?}", image_path),
                &error,
            )
        })?;
        let rgb_image = dynamic_image.to_rgb8();

        Ok(ImageXObject {
            width: rgb_image.width(),
            height: rgb_image.height(),
            interpolate: false,
            image_data: rgb_image.into_raw(),
        })
    }
}

impl From<ImageXObject> for lopdf::Stream {
    fn from(value: ImageXObject) -> Self {
        lopdf::Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => value.width as i64,
                "Height" => value.height as i64,
                "ColorSpace" => "DeviceRGB",
                "BitsPerComponent" => 8,
                "Interpolate" => value.interpolate,
            },
            value.image_data,
        )
    }
}

/// The representation of a PDF page: its size and the content operations drawn on it,
/// together with the resources those operations refer to.
#[derive(Debug, Clone)]
pub struct PdfPage {
    /// Page width in points.
    pub width: f32,
    /// Page height in points.
    pub height: f32,
    /// The content stream of the page, in drawing order.
    pub(crate) operations: Vec<Operation>,
    /// The fonts the content stream refers to.
    pub(crate) fonts: BTreeSet<StandardFont>,
    /// The images the content stream refers to, by resource name. A `BTreeMap`
    /// keeps the resource dictionary in a stable order.
    pub(crate) images: BTreeMap<String, ImageXObject>,
}

impl PdfPage {
    /// Converts a vertical position measured in millimeters from the top edge into
    /// the PDF coordinate system, which grows upwards from the bottom edge.
    fn flip_y(&self, y: f32) -> f32 {
        self.height - millimeters_to_points(y)
    }
}

/// This struct represents the actual PDF document on a high-level. It is an interface to the
/// underlying `lopdf::Document` with the addition of the pages and the identifiers of the document.
///
/// All positions taken by its methods are in millimeters measured from the top-left corner of
/// the page, so that layouts can be written the way they are measured on paper.
pub struct PdfDocument {
    /// The underlying PDF document: this is a low-level interface and shouldn't be directly interacted with
    /// unless strictly necessary, anyway this is why it is exposed to the user.
    pub inner_document: lopdf::Document,
    /// The identifier of the document, it is used to in order to set the PDF `ID` tag.
    pub identifier: String,
    /// The title written into the document information dictionary.
    pub title: String,
    /// Used for both the creation and the modification date, never the current time.
    pub creation_date: OffsetDateTime,
    /// The pages of the PDF document.
    pub(crate) pages: Vec<PdfPage>,
    /// Whether `write_all` has already run.
    written: bool,
}

impl PdfDocument {
    /// Create a new `PdfDocument` by defaulting the underlying PDF document to version 1.5
    /// of the PDF specification and customly specifying the PDF identifier.
    pub fn new(pdf_document_identifier: String) -> Self {
        PdfDocument {
            inner_document: lopdf::Document::with_version("1.5"),
            identifier: pdf_document_identifier,
            title: String::new(),
            creation_date: OffsetDateTime::UNIX_EPOCH,
            pages: Vec::new(),
            written: false,
        }
    }

    /// Adds a page of given width and height in millimeters and returns its index.
    pub fn add_page(&mut self, page_width: f32, page_height: f32) -> usize {
        self.pages.push(PdfPage {
            width: millimeters_to_points(page_width),
            height: millimeters_to_points(page_height),
            operations: Vec::new(),
            fonts: BTreeSet::new(),
            images: BTreeMap::new(),
        });

        self.pages.len() - 1
    }

    /// The width and height in millimeters of the page at the given index.
    pub fn page_size(&self, page_index: usize) -> Result<(f32, f32), ContextError> {
        let pdf_page = self.get_page(page_index)?;

        Ok((
            points_to_millimeters(pdf_page.width),
            points_to_millimeters(pdf_page.height),
        ))
    }

    /// Writes a single line of black text whose baseline starts at `position`.
    pub fn write_text(
        &mut self,
        page_index: usize,
        font: StandardFont,
        font_size: f32,
        text: &str,
        position: [f32; 2],
    ) -> Result<(), ContextError> {
        let pdf_page = self.get_mut_page(page_index)?;
        let [x, y] = position;
        let y = pdf_page.flip_y(y);

        pdf_page.fonts.insert(font);
        pdf_page.operations.extend([
            Operation::new("BT", vec![]), // Begin text section
            Operation::new("Tf", vec![font.resource_name().into(), font_size.into()]),
            Operation::new("Td", vec![millimeters_to_points(x).into(), y.into()]),
            Operation::new(
                "rg",
                [0.0, 0.0, 0.0].into_iter().map(Object::Real).collect(),
            ),
            Operation::new(
                "Tj",
                vec![Object::String(
                    fonts::encode_win_ansi(text),
                    StringFormat::Literal,
                )],
            ),
            Operation::new("ET", vec![]),
        ]);

        Ok(())
    }

    /// Strokes a black straight line between two points.
    pub fn draw_line(
        &mut self,
        page_index: usize,
        from: [f32; 2],
        to: [f32; 2],
        line_width: f32,
    ) -> Result<(), ContextError> {
        let pdf_page = self.get_mut_page(page_index)?;
        let from_y = pdf_page.flip_y(from[1]);
        let to_y = pdf_page.flip_y(to[1]);

        pdf_page.operations.extend([
            Operation::new("q", vec![]),
            Operation::new("w", vec![millimeters_to_points(line_width).into()]),
            Operation::new(
                "RG",
                [0.0, 0.0, 0.0].into_iter().map(Object::Real).collect(),
            ),
            Operation::new(
                "m",
                vec![millimeters_to_points(from[0]).into(), from_y.into()],
            ),
            Operation::new("l", vec![millimeters_to_points(to[0]).into(), to_y.into()]),
            Operation::new("S", vec![]),
            Operation::new("Q", vec![]),
        ]);

        Ok(())
    }

    /// Places an image with its top-left corner at `position`, scaled to `size`.
    pub fn add_image(
        &mut self,
        page_index: usize,
        image: ImageXObject,
        position: [f32; 2],
        size: [f32; 2],
    ) -> Result<(), ContextError> {
        let pdf_page = self.get_mut_page(page_index)?;
        let image_name = format!("Im{}", pdf_page.images.len());
        let [x, y] = position;
        let [width, height] = size;
        // The image is drawn upwards from its bottom-left corner
        let bottom = pdf_page.flip_y(y + height);

        pdf_page.images.insert(image_name.clone(), image);
        pdf_page.operations.extend([
            Operation::new("q", vec![]),
            Operation::new(
                "cm",
                vec![
                    millimeters_to_points(width).into(),
                    0.into(),
                    0.into(),
                    millimeters_to_points(height).into(),
                    millimeters_to_points(x).into(),
                    bottom.into(),
                ],
            ),
            Operation::new("Do", vec![Object::Name(image_name.into_bytes())]),
            Operation::new("Q", vec![]),
        ]);

        Ok(())
    }

    /// Write the pages so far specified to the underlying document and finalize it.
    ///
    /// The instance ID is the second entry of the trailer `ID`. Nothing written depends on
    /// the clock or on randomness, so equal inputs give equal documents.
    pub fn write_all(&mut self, instance_id: &str) -> Result<(), ContextError> {
        use lopdf::Object::*;
        use lopdf::StringFormat::*;

        if self.written {
            return Err(ContextError::with_context(
                ErrorKind::Render,
                format!("The PDF document {:?} has already been written", self.identifier),
            ));
        }
        self.written = true;

        let timestamp = to_pdf_timestamp_format(&self.creation_date);
        let document_info = lopdf::Dictionary::from_iter(vec![
            ("Trapped", "False".into()),
            (
                "CreationDate",
                String(timestamp.clone().into_bytes(), Literal),
            ),
            ("ModDate", String(timestamp.into_bytes(), Literal)),
            (
                "Title",
                String(fonts::encode_win_ansi(&self.title), Literal),
            ),
            ("Creator", String(b"factura".to_vec(), Literal)),
            ("Producer", String(b"factura".to_vec(), Literal)),
            (
                "Identifier",
                String(self.identifier.clone().into_bytes(), Literal),
            ),
        ]);
        let document_info_id = self.inner_document.add_object(Dictionary(document_info));

        // Construct the catalog, required by the PDF specification
        let pages_id = self.inner_document.new_object_id();
        let catalog = lopdf::Dictionary::from_iter(vec![
            ("Type", "Catalog".into()),
            ("PageLayout", "OneColumn".into()),
            ("PageMode", "UseNone".into()),
            ("Pages", Reference(pages_id)),
        ]);
        let catalog_id = self.inner_document.add_object(catalog);

        self.inner_document
            .trailer
            .set("Root", Reference(catalog_id));
        self.inner_document
            .trailer
            .set("Info", Reference(document_info_id));
        self.inner_document.trailer.set(
            "ID",
            Array(vec![
                String(self.identifier.clone().into_bytes(), Literal),
                String(instance_id.as_bytes().to_vec(), Literal),
            ]),
        );

        // Each base font is written once and shared by every page using it
        let used_fonts: BTreeSet<StandardFont> = self
            .pages
            .iter()
            .flat_map(|page| page.fonts.iter().copied())
            .collect();
        let font_ids: BTreeMap<StandardFont, lopdf::ObjectId> = used_fonts
            .into_iter()
            .map(|font| (font, self.inner_document.add_object(font.to_dictionary())))
            .collect();

        let mut page_ids = Vec::<lopdf::Object>::new();
        for page in mem::take(&mut self.pages) {
            let mut resource_dictionary = lopdf::Dictionary::new();

            if !page.fonts.is_empty() {
                let fonts_dictionary: lopdf::Dictionary = page
                    .fonts
                    .iter()
                    .filter_map(|font| {
                        font_ids
                            .get(font)
                            .map(|font_id| (font.resource_name().to_string(), Reference(*font_id)))
                    })
                    .collect();
                resource_dictionary.set("Font", Dictionary(fonts_dictionary));
            }

            if !page.images.is_empty() {
                let mut xobjects_dictionary = lopdf::Dictionary::new();
                for (image_name, image) in page.images {
                    let image_stream: lopdf::Stream = image.into();
                    let image_id = self.inner_document.add_object(image_stream);
                    xobjects_dictionary.set(image_name, Reference(image_id));
                }
                resource_dictionary.set("XObject", Dictionary(xobjects_dictionary));
            }

            let page_content = lopdf::content::Content {
                operations: page.operations,
            }
            .encode()
            .map_err(|error| {
                ContextError::with_error(
                    ErrorKind::Render,
                    "Failed to encode the page content",
                    &error,
                )
            })?;
            // Page contents are not compressed
            let page_content_id = self.inner_document.add_object(
                lopdf::Stream::new(lopdf::Dictionary::new(), page_content).with_compression(false),
            );

            let page_dictionary = lopdf::Dictionary::from_iter(vec![
                ("Type", "Page".into()),
                ("Rotate", Integer(0)),
                (
                    "MediaBox",
                    vec![0.into(), 0.into(), page.width.into(), page.height.into()].into(),
                ),
                ("Resources", Dictionary(resource_dictionary)),
                ("Contents", Reference(page_content_id)),
                ("Parent", Reference(pages_id)),
            ]);
            let page_id = self.inner_document.add_object(page_dictionary);
            page_ids.push(Reference(page_id));
        }

        let pages = lopdf::Dictionary::from_iter(vec![
            ("Type", "Pages".into()),
            ("Count", Integer(page_ids.len() as i64)),
            ("Kids", Array(page_ids)),
        ]);
        self.inner_document
            .objects
            .insert(pages_id, Dictionary(pages));

        // Compresses the image samples, the page contents opted out above
        self.inner_document.compress();

        Ok(())
    }

    /// Save the `PdfDocument` to bytes in order for it to be written to a file or further processed.
    pub fn save_to_bytes(&mut self) -> Result<Vec<u8>, ContextError> {
        if !self.written {
            return Err(ContextError::with_context(
                ErrorKind::Render,
                "The PDF document has to be written before being saved",
            ));
        }

        let mut pdf_document_bytes = Vec::new();
        let mut writer = BufWriter::new(&mut pdf_document_bytes);
        self.inner_document.save_to(&mut writer).map_err(|error| {
            ContextError::with_error(
                ErrorKind::Io,
                "Error while saving the PDF document to bytes",
                &error,
            )
        })?;
        mem::drop(writer);

        Ok(pdf_document_bytes)
    }

    fn get_page(&self, page_index: usize) -> Result<&PdfPage, ContextError> {
        self.pages
            .get(page_index)
            .ok_or(ContextError::with_context(
                ErrorKind::Render,
                format!("Failed to find the page with index {}", page_index),
            ))
    }

    // Retrieve the specified page via its index.
    fn get_mut_page(&mut self, page_index: usize) -> Result<&mut PdfPage, ContextError> {
        self.pages
            .get_mut(page_index)
            .ok_or(ContextError::with_context(
                ErrorKind::Render,
                format!("Failed to find the page with index {}", page_index),
            ))
    }
}

/// Formats the given time so that it matches what the PDF specification expects.
/// An example of it is the following: D:20170505150224+02'00'.
fn to_pdf_timestamp_format(date: &OffsetDateTime) -> String {
    let offset = date.offset();
    let offset_sign = if offset.is_negative() { '-' } else { '+' };
    format!(
        "D:{:04}{:02}{:02}{:02}{:02}{:02}{offset_sign}{:02}'{:02}'",
        date.year(),
        u8::from(date.month()),
        date.day(),
        date.hour(),
        date.minute(),
        date.second(),
        offset.whole_hours().abs(),
        offset.minutes_past_hour().abs(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page_operators(bytes: &[u8]) -> Vec<String> {
        let document = lopdf::Document::load_mem(bytes).unwrap();
        let page_id = *document.get_pages().get(&1).unwrap();
        let content = document.get_page_content(page_id).unwrap();
        lopdf::content::Content::decode(&content)
            .unwrap()
            .operations
            .into_iter()
            .map(|operation| operation.operator)
            .collect()
    }

    #[test]
    fn timestamps_follow_the_pdf_date_format() {
        assert_eq!(
            to_pdf_timestamp_format(&OffsetDateTime::UNIX_EPOCH),
            "D:19700101000000+00'00'"
        );
    }

    #[test]
    fn text_and_lines_end_up_in_the_page_content() {
        let mut pdf_document = PdfDocument::new("test".into());
        let page_index = pdf_document.add_page(210.0, 297.0);
        pdf_document
            .write_text(page_index, StandardFont::Helvetica, 11.0, "Hola", [20.0, 30.0])
            .unwrap();
        pdf_document
            .draw_line(page_index, [20.0, 97.0], [190.0, 97.0], 0.2)
            .unwrap();
        pdf_document.write_all("instance").unwrap();
        let bytes = pdf_document.save_to_bytes().unwrap();

        assert_eq!(
            page_operators(&bytes),
            vec!["BT", "Tf", "Td", "rg", "Tj", "ET", "q", "w", "RG", "m", "l", "S", "Q"]
        );
    }

    #[test]
    fn page_size_is_reported_in_millimeters() {
        let mut pdf_document = PdfDocument::new("test".into());
        let page_index = pdf_document.add_page(210.0, 297.0);
        let (width, height) = pdf_document.page_size(page_index).unwrap();

        assert!((width - 210.0).abs() < 1e-3);
        assert!((height - 297.0).abs() < 1e-3);
        assert!(pdf_document.page_size(1).is_err());
    }

    #[test]
    fn images_are_registered_as_xobjects() {
        let mut pdf_document = PdfDocument::new("test".into());
        let page_index = pdf_document.add_page(210.0, 297.0);
        let image = ImageXObject {
            width: 2,
            height: 1,
            interpolate: false,
            image_data: vec![255, 0, 0, 0, 0, 255],
        };
        pdf_document
            .add_image(page_index, image, [160.0, 10.0], [30.0, 30.0])
            .unwrap();
        pdf_document.write_all("instance").unwrap();
        let bytes = pdf_document.save_to_bytes().unwrap();

        assert_eq!(page_operators(&bytes), vec!["q", "cm", "Do", "Q"]);
        let document = lopdf::Document::load_mem(&bytes).unwrap();
        let page_id = *document.get_pages().get(&1).unwrap();
        let (resources, _) = document.get_page_resources(page_id);
        let xobjects = resources.unwrap().get(b"XObject").unwrap().as_dict().unwrap();
        assert!(xobjects.has(b"Im0"));
    }

    #[test]
    fn a_document_is_written_only_once() {
        let mut pdf_document = PdfDocument::new("test".into());
        pdf_document.add_page(210.0, 297.0);

        assert!(pdf_document.save_to_bytes().is_err());
        pdf_document.write_all("instance").unwrap();
        assert_eq!(
            pdf_document.write_all("instance").unwrap_err().kind,
            ErrorKind::Render
        );
    }
}
