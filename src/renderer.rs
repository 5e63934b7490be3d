use std::path::Path;

use time::{macros::format_description, Date, OffsetDateTime};

use crate::computation::parse_decimal;
use crate::configuration::RendererConfiguration;
use crate::error::ContextError;
use crate::fonts::StandardFont;
use crate::invoice::{BillingDetails, Invoice, InvoiceItem};
use crate::pdf::PdfDocument;
use crate::surface::{DrawingSurface, PageSize, PdfSurface, TextAlignment};

const LEFT_MARGIN: f32 = 20.0;
/// The right margin sits this far from the right edge of the page.
const RIGHT_MARGIN_INSET: f32 = 20.0;

const LOGO_RIGHT_INSET: f32 = 50.0;
const LOGO_TOP: f32 = 10.0;
const LOGO_SIZE: [f32; 2] = [30.0, 30.0];

const TITLE: &str = "FACTURA";
const TITLE_FONT_SIZE: f32 = 24.0;
const TITLE_Y: f32 = 30.0;
const BODY_FONT_SIZE: f32 = 11.0;
const INVOICE_NUMBER_Y: f32 = 45.0;
const DATE_Y: f32 = 52.0;

const ISSUER_LINES: [&str; 4] = [
    "Charcuteria Nacho",
    "Ignacio Dominguez Huerta",
    "NIF: 06560870M",
    "Tel: 628703287",
];
const ISSUER_Y: f32 = 50.0;

const BILLING_LABEL: &str = "FACTURAR A:";
const BILLING_LABEL_Y: f32 = 75.0;
const BILLING_X: f32 = 55.0;
const BILLING_NAME_Y: f32 = 65.0;
const BILLING_DETAILS_Y: f32 = 72.0;

const TABLE_TOP: f32 = 95.0;
const TABLE_HEADER_RULE_OFFSET: f32 = 2.0;
const TABLE_FIRST_ROW_OFFSET: f32 = 10.0;
const TABLE_ROW_HEIGHT: f32 = 8.0;
const TABLE_BOTTOM_RULE_OFFSET: f32 = 5.0;

/// The totals block starts this far above the bottom edge of the page.
const TOTALS_BOTTOM_INSET: f32 = 65.0;
const TOTALS_LABEL_INSET: f32 = 80.0;
const TOTALS_AMOUNT_INSET: f32 = 40.0;
const TOTALS_RULE_OFFSET: f32 = -5.0;
const TOTALS_ROW_HEIGHT: f32 = 7.0;

const THANKS: &str = "¡Gracias por su compra!";
const THANKS_FONT_SIZE: f32 = 14.0;
const THANKS_OFFSET: f32 = 25.0;
const FOOTER_RULE_OFFSET: f32 = 30.0;
const FOOTER_FONT_SIZE: f32 = 10.0;
const FOOTER_TITLE_OFFSET: f32 = 40.0;
const FOOTER_LINES_OFFSET: f32 = 47.0;
const PAYMENT_TITLE: &str = "Información de pago";
const PAYMENT_LINES: [&str; 3] = ["Efectivo", "Tarjeta", "Bizum: 628703287"];
const CONTACT_TITLE: &str = "Contacto";
const CONTACT_INSET: f32 = 80.0;
const CONTACT_LINES: [&str; 4] = [
    "Charcuteria y Jamoneria Nacho",
    "C/ Angel Luis de la Herran 27",
    "28043 Madrid",
    "Tel:628703287",
];

/// One column of the item table. The width is the room reserved for the column,
/// cell text is neither wrapped nor truncated to it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TableColumn {
    pub header: &'static str,
    pub x: f32,
    pub width: f32,
}

pub const TABLE_COLUMNS: [TableColumn; 6] = [
    TableColumn {
        header: "Articulo",
        x: 20.0,
        width: 70.0,
    },
    TableColumn {
        header: "Peso",
        x: 70.0,
        width: 30.0,
    },
    TableColumn {
        header: "Precio",
        x: 100.0,
        width: 25.0,
    },
    TableColumn {
        header: "Subtotal",
        x: 125.0,
        width: 25.0,
    },
    TableColumn {
        header: "Iva",
        x: 150.0,
        width: 20.0,
    },
    TableColumn {
        header: "Total",
        x: 170.0,
        width: 25.0,
    },
];

/// What happened to the logo while rendering.
#[derive(Debug, Clone, PartialEq)]
pub enum LogoOutcome {
    Drawn,
    /// The logo could not be embedded, the reason is the error message.
    Skipped(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderReport {
    /// The name the document was saved under.
    pub file_name: String,
    pub logo: LogoOutcome,
}

/// Characters that can't appear in a file name on at least one common platform.
const FILE_NAME_RESERVED: [char; 9] = ['/', '\\', ':', '*', '?', '"', '<', '>', '|'];

/// `factura-<invoice number>.pdf`, with the characters of the invoice number that are
/// path separators or otherwise reserved in file names replaced by `_`. The result is
/// always a single path component.
pub fn invoice_file_name(invoice_number: &str) -> String {
    let file_stem: String = invoice_number
        .chars()
        .map(|character| {
            if character.is_control() || FILE_NAME_RESERVED.contains(&character) {
                '_'
            } else {
                character
            }
        })
        .collect();

    format!("factura-{}.pdf", file_stem)
}

/// Amounts are always printed with two decimals, and never as `-0.00`.
fn format_amount(amount: f64) -> String {
    format!("{:.2}", amount + 0.0)
}

/// Lays out `invoice` on `surface` region by region and saves it.
///
/// Only the logo may fail without consequences: its failure is logged and reported in
/// the returned `RenderReport`. Any other failure aborts the rendering before saving.
pub fn render_invoice<S: DrawingSurface + ?Sized>(
    invoice: &Invoice,
    logo_path: &Path,
    surface: &mut S,
) -> Result<RenderReport, ContextError> {
    let page_size = surface.page_size();
    let right_margin = page_size.width - RIGHT_MARGIN_INSET;

    let logo = draw_logo(surface, logo_path, page_size);
    draw_title(surface, invoice)?;
    draw_issuer(surface, right_margin)?;
    draw_billing(surface, invoice.billing_details.as_ref())?;
    draw_item_table(surface, &invoice.items, right_margin)?;
    let bottom_y = page_size.height - TOTALS_BOTTOM_INSET;
    draw_totals(surface, invoice, bottom_y, right_margin)?;
    draw_footer(surface, bottom_y, right_margin)?;

    let file_name = invoice_file_name(&invoice.invoice_number);
    surface.save(&file_name)?;
    log::debug!(
        "Rendered the invoice {:?} as {:?}",
        invoice.invoice_number,
        file_name
    );

    Ok(RenderReport { file_name, logo })
}

fn draw_logo<S: DrawingSurface + ?Sized>(
    surface: &mut S,
    logo_path: &Path,
    page_size: PageSize,
) -> LogoOutcome {
    let position = [page_size.width - LOGO_RIGHT_INSET, LOGO_TOP];
    match surface.image(logo_path, position, LOGO_SIZE) {
        Ok(()) => LogoOutcome::Drawn,
        Err(error) => {
            log::error!("Error loading logo: {}", error);
            LogoOutcome::Skipped(error.to_string())
        }
    }
}

fn draw_title<S: DrawingSurface + ?Sized>(
    surface: &mut S,
    invoice: &Invoice,
) -> Result<(), ContextError> {
    surface.set_font(StandardFont::HelveticaBold, TITLE_FONT_SIZE);
    surface.text(&[TITLE], [LEFT_MARGIN, TITLE_Y], TextAlignment::Left)?;

    surface.set_font(StandardFont::Helvetica, BODY_FONT_SIZE);
    surface.text(
        &[&format!("Factura n.° {}", invoice.invoice_number)],
        [LEFT_MARGIN, INVOICE_NUMBER_Y],
        TextAlignment::Left,
    )?;
    surface.text(
        &[&format!("Fecha: {}", invoice.date)],
        [LEFT_MARGIN, DATE_Y],
        TextAlignment::Left,
    )
}

fn draw_issuer<S: DrawingSurface + ?Sized>(
    surface: &mut S,
    right_margin: f32,
) -> Result<(), ContextError> {
    surface.set_font(StandardFont::Helvetica, BODY_FONT_SIZE);
    surface.text(&ISSUER_LINES, [right_margin, ISSUER_Y], TextAlignment::Right)
}

fn draw_billing<S: DrawingSurface + ?Sized>(
    surface: &mut S,
    billing_details: Option<&BillingDetails>,
) -> Result<(), ContextError> {
    surface.text(
        &[BILLING_LABEL],
        [LEFT_MARGIN, BILLING_LABEL_Y],
        TextAlignment::Left,
    )?;

    let Some(billing_details) = billing_details else {
        log::debug!("The invoice has no billing details, skipping them");
        return Ok(());
    };
    surface.text(
        &[&billing_details.name],
        [BILLING_X, BILLING_NAME_Y],
        TextAlignment::Left,
    )?;
    surface.text(
        &[
            &billing_details.tax_id,
            &billing_details.address,
            &billing_details.postal_code,
        ],
        [BILLING_X, BILLING_DETAILS_Y],
        TextAlignment::Left,
    )
}

/// The six cells of an item row, in column order.
fn item_cells(item: &InvoiceItem) -> [String; 6] {
    [
        item.article.clone(),
        format!("{} {}", item.weight, item.weight_unit),
        format_amount(parse_decimal(&item.price)),
        format_amount(item.subtotal),
        format!("{}%", item.iva),
        item.display_total(),
    ]
}

fn draw_item_table<S: DrawingSurface + ?Sized>(
    surface: &mut S,
    items: &[InvoiceItem],
    right_margin: f32,
) -> Result<(), ContextError> {
    for column in TABLE_COLUMNS.iter() {
        surface.text(&[column.header], [column.x, TABLE_TOP], TextAlignment::Left)?;
    }
    let header_rule_y = TABLE_TOP + TABLE_HEADER_RULE_OFFSET;
    surface.line([LEFT_MARGIN, header_rule_y], [right_margin, header_rule_y])?;

    // Rows have a fixed height regardless of their content
    let mut current_y = TABLE_TOP + TABLE_FIRST_ROW_OFFSET;
    for item in items {
        for (column, cell) in TABLE_COLUMNS.iter().zip(item_cells(item)) {
            surface.text(&[&cell], [column.x, current_y], TextAlignment::Left)?;
        }
        current_y += TABLE_ROW_HEIGHT;
    }

    let bottom_rule_y = current_y + TABLE_BOTTOM_RULE_OFFSET;
    surface.line([LEFT_MARGIN, bottom_rule_y], [right_margin, bottom_rule_y])
}

fn draw_totals<S: DrawingSurface + ?Sized>(
    surface: &mut S,
    invoice: &Invoice,
    bottom_y: f32,
    right_margin: f32,
) -> Result<(), ContextError> {
    let label_x = right_margin - TOTALS_LABEL_INSET;
    let amount_x = right_margin - TOTALS_AMOUNT_INSET;
    let rule_y = bottom_y + TOTALS_RULE_OFFSET;
    surface.line([label_x, rule_y], [right_margin, rule_y])?;

    surface.text(&["Subtotal:"], [label_x, bottom_y], TextAlignment::Left)?;
    surface.text(
        &[&format_amount(invoice.subtotal)],
        [amount_x, bottom_y],
        TextAlignment::Right,
    )?;

    let tax_y = bottom_y + TOTALS_ROW_HEIGHT;
    surface.set_font(StandardFont::HelveticaBold, BODY_FONT_SIZE);
    surface.text(&["Impuestos:"], [label_x, tax_y], TextAlignment::Left)?;
    surface.set_font(StandardFont::Helvetica, BODY_FONT_SIZE);
    surface.text(
        &[&format_amount(invoice.tax)],
        [amount_x, tax_y],
        TextAlignment::Right,
    )?;

    let total_y = bottom_y + 2.0 * TOTALS_ROW_HEIGHT;
    surface.set_font(StandardFont::HelveticaBold, BODY_FONT_SIZE);
    surface.text(&["Total:"], [label_x, total_y], TextAlignment::Left)?;
    surface.text(
        &[&format!("{}€", format_amount(invoice.total))],
        [amount_x, total_y],
        TextAlignment::Right,
    )
}

fn draw_footer<S: DrawingSurface + ?Sized>(
    surface: &mut S,
    bottom_y: f32,
    right_margin: f32,
) -> Result<(), ContextError> {
    surface.set_font(StandardFont::HelveticaBold, THANKS_FONT_SIZE);
    surface.text(
        &[THANKS],
        [LEFT_MARGIN, bottom_y + THANKS_OFFSET],
        TextAlignment::Left,
    )?;

    let rule_y = bottom_y + FOOTER_RULE_OFFSET;
    surface.line([LEFT_MARGIN, rule_y], [right_margin, rule_y])?;

    let title_y = bottom_y + FOOTER_TITLE_OFFSET;
    let lines_y = bottom_y + FOOTER_LINES_OFFSET;
    let contact_x = right_margin - CONTACT_INSET;
    for (x, title, lines) in [
        (LEFT_MARGIN, PAYMENT_TITLE, &PAYMENT_LINES[..]),
        (contact_x, CONTACT_TITLE, &CONTACT_LINES[..]),
    ] {
        surface.set_font(StandardFont::HelveticaBold, FOOTER_FONT_SIZE);
        surface.text(&[title], [x, title_y], TextAlignment::Left)?;
        surface.set_font(StandardFont::Helvetica, FOOTER_FONT_SIZE);
        surface.text(lines, [x, lines_y], TextAlignment::Left)?;
    }

    Ok(())
}

/// The date written into the document metadata: midnight UTC of the invoice date,
/// or the UNIX epoch when the date is not an ISO calendar date.
pub fn invoice_creation_date(date: &str) -> OffsetDateTime {
    match Date::parse(date, format_description!("[year]-[month]-[day]")) {
        Ok(date) => date.midnight().assume_utc(),
        Err(error) => {
            log::debug!(
                "Unable to parse the invoice date {:?} ({}), using the UNIX epoch",
                date,
                error
            );
            OffsetDateTime::UNIX_EPOCH
        }
    }
}

/// Renders `invoice` into a PDF file in the configured output directory.
pub fn generate_pdf(
    invoice: &Invoice,
    configuration: &RendererConfiguration,
) -> Result<RenderReport, ContextError> {
    let mut pdf_document = PdfDocument::new(format!("factura-{}", invoice.invoice_number));
    pdf_document.title = format!("Factura {}", invoice.invoice_number);
    pdf_document.creation_date = invoice_creation_date(&invoice.date);

    let mut surface = PdfSurface::new(
        pdf_document,
        configuration.page_size(),
        configuration.output_directory.clone(),
    );

    render_invoice(invoice, &configuration.logo_path, &mut surface)
}
