use std::path::Path;

use factura::{
    computation::{build_invoice, update_item_field, FieldEdit, ItemRevision},
    error::{ContextError, ErrorKind},
    fonts::StandardFont,
    invoice::{BillingDetails, Invoice, InvoiceHeader, InvoiceItem, WeightUnit},
    renderer::{render_invoice, LogoOutcome, TABLE_COLUMNS},
    surface::{DrawingSurface, PageSize, TextAlignment},
};

#[derive(Debug, Clone, PartialEq)]
enum DrawCall {
    Font(StandardFont, f32),
    Text {
        lines: Vec<String>,
        position: [f32; 2],
        alignment: TextAlignment,
    },
    Line {
        from: [f32; 2],
        to: [f32; 2],
    },
    Image {
        position: [f32; 2],
        size: [f32; 2],
    },
    Save(String),
}

#[derive(Default)]
struct RecordingSurface {
    calls: Vec<DrawCall>,
    fail_image: bool,
    fail_save: bool,
}

impl RecordingSurface {
    fn texts(&self) -> Vec<(Vec<String>, [f32; 2])> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                DrawCall::Text {
                    lines, position, ..
                } => Some((lines.clone(), *position)),
                _ => None,
            })
            .collect()
    }

    fn text_at(&self, position: [f32; 2]) -> Option<Vec<String>> {
        self.texts()
            .into_iter()
            .find(|(_, text_position)| *text_position == position)
            .map(|(lines, _)| lines)
    }

    fn lines(&self) -> Vec<([f32; 2], [f32; 2])> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                DrawCall::Line { from, to } => Some((*from, *to)),
                _ => None,
            })
            .collect()
    }
}

impl DrawingSurface for RecordingSurface {
    fn page_size(&self) -> PageSize {
        PageSize::A4_PORTRAIT
    }

    fn set_font(&mut self, font: StandardFont, font_size: f32) {
        self.calls.push(DrawCall::Font(font, font_size));
    }

    fn text(
        &mut self,
        lines: &[&str],
        position: [f32; 2],
        alignment: TextAlignment,
    ) -> Result<(), ContextError> {
        self.calls.push(DrawCall::Text {
            lines: lines.iter().map(|line| line.to_string()).collect(),
            position,
            alignment,
        });
        Ok(())
    }

    fn line(&mut self, from: [f32; 2], to: [f32; 2]) -> Result<(), ContextError> {
        self.calls.push(DrawCall::Line { from, to });
        Ok(())
    }

    fn image(
        &mut self,
        image_path: &Path,
        position: [f32; 2],
        size: [f32; 2],
    ) -> Result<(), ContextError> {
        if self.fail_image {
            return Err(ContextError::with_context(
                ErrorKind::Io,
                format!("Unable to load the image {:?}", image_path),
            ));
        }
        self.calls.push(DrawCall::Image { position, size });
        Ok(())
    }

    fn save(&mut self, file_name: &str) -> Result<(), ContextError> {
        if self.fail_save {
            return Err(ContextError::with_context(ErrorKind::Io, "Disk full"));
        }
        self.calls.push(DrawCall::Save(file_name.to_string()));
        Ok(())
    }
}

fn revised_item(article: &str, weight: &str, price: &str, iva: f64) -> InvoiceItem {
    let edits = [
        FieldEdit::Article(article.into()),
        FieldEdit::Weight(weight.into()),
        FieldEdit::Price(price.into()),
        FieldEdit::Iva(iva),
    ];
    let items = edits
        .into_iter()
        .fold(vec![InvoiceItem::default()], |items, field_edit| {
            update_item_field(
                &items,
                0,
                ItemRevision::ReviseFromPhysicalInputs(field_edit),
            )
            .unwrap()
        });
    items.into_iter().next().unwrap()
}

fn sample_invoice() -> Invoice {
    let mut cheese = revised_item("Queso curado", "1", "5", 21.0);
    cheese.weight_unit = WeightUnit::Unit;

    build_invoice(
        InvoiceHeader {
            invoice_number: "A-001".into(),
            date: "2024-03-01".into(),
        },
        BillingDetails {
            name: "Bar Pepe".into(),
            tax_id: "B12345678".into(),
            address: "Calle Mayor 1".into(),
            postal_code: "28013".into(),
        },
        vec![revised_item("Jamon iberico", "2", "10", 10.0), cheese],
    )
}

fn render(invoice: &Invoice, surface: &mut RecordingSurface) -> Result<LogoOutcome, ContextError> {
    render_invoice(invoice, Path::new("public/logo.jpg"), surface).map(|report| report.logo)
}

fn strings(lines: &[&str]) -> Vec<String> {
    lines.iter().map(|line| line.to_string()).collect()
}

#[test]
fn header_regions_are_placed_at_their_fixed_positions() {
    let mut surface = RecordingSurface::default();
    let logo = render(&sample_invoice(), &mut surface).unwrap();

    assert_eq!(logo, LogoOutcome::Drawn);
    assert_eq!(
        surface.calls[0],
        DrawCall::Image {
            position: [160.0, 10.0],
            size: [30.0, 30.0],
        }
    );
    assert_eq!(
        surface.calls[1],
        DrawCall::Font(StandardFont::HelveticaBold, 24.0)
    );
    assert_eq!(surface.text_at([20.0, 30.0]), Some(strings(&["FACTURA"])));
    assert_eq!(
        surface.text_at([20.0, 45.0]),
        Some(strings(&["Factura n.° A-001"]))
    );
    assert_eq!(
        surface.text_at([20.0, 52.0]),
        Some(strings(&["Fecha: 2024-03-01"]))
    );
    assert!(surface.calls.contains(&DrawCall::Text {
        lines: strings(&[
            "Charcuteria Nacho",
            "Ignacio Dominguez Huerta",
            "NIF: 06560870M",
            "Tel: 628703287",
        ]),
        position: [190.0, 50.0],
        alignment: TextAlignment::Right,
    }));
    assert_eq!(
        surface.text_at([20.0, 75.0]),
        Some(strings(&["FACTURAR A:"]))
    );
    assert_eq!(surface.text_at([55.0, 65.0]), Some(strings(&["Bar Pepe"])));
    assert_eq!(
        surface.text_at([55.0, 72.0]),
        Some(strings(&["B12345678", "Calle Mayor 1", "28013"]))
    );
}

#[test]
fn item_table_has_six_columns_and_fixed_rows() {
    let mut surface = RecordingSurface::default();
    render(&sample_invoice(), &mut surface).unwrap();

    let headers: Vec<_> = TABLE_COLUMNS
        .iter()
        .map(|column| surface.text_at([column.x, 95.0]).unwrap().join(""))
        .collect();
    assert_eq!(
        headers,
        vec!["Articulo", "Peso", "Precio", "Subtotal", "Iva", "Total"]
    );

    let first_row: Vec<_> = TABLE_COLUMNS
        .iter()
        .map(|column| surface.text_at([column.x, 105.0]).unwrap().join(""))
        .collect();
    assert_eq!(
        first_row,
        vec!["Jamon iberico", "2 kg", "10.00", "20.00", "10%", "22.00"]
    );

    let second_row: Vec<_> = TABLE_COLUMNS
        .iter()
        .map(|column| surface.text_at([column.x, 113.0]).unwrap().join(""))
        .collect();
    assert_eq!(
        second_row,
        vec!["Queso curado", "1 und", "5.00", "5.00", "21%", "6.05"]
    );

    let lines = surface.lines();
    assert_eq!(lines[0], ([20.0, 97.0], [190.0, 97.0]));
    // Two rows of 8 millimeters, then the rule 5 millimeters below
    assert_eq!(lines[1], ([20.0, 126.0], [190.0, 126.0]));
}

#[test]
fn totals_and_footer_are_anchored_to_the_bottom_of_the_page() {
    let mut surface = RecordingSurface::default();
    render(&sample_invoice(), &mut surface).unwrap();

    let lines = surface.lines();
    assert_eq!(lines[2], ([110.0, 227.0], [190.0, 227.0]));
    assert_eq!(lines[3], ([20.0, 262.0], [190.0, 262.0]));
    assert_eq!(lines.len(), 4);

    assert_eq!(surface.text_at([110.0, 232.0]), Some(strings(&["Subtotal:"])));
    assert_eq!(surface.text_at([150.0, 232.0]), Some(strings(&["25.00"])));
    assert_eq!(surface.text_at([110.0, 239.0]), Some(strings(&["Impuestos:"])));
    assert_eq!(surface.text_at([150.0, 239.0]), Some(strings(&["3.05"])));
    assert_eq!(surface.text_at([110.0, 246.0]), Some(strings(&["Total:"])));
    assert!(surface.calls.contains(&DrawCall::Text {
        lines: strings(&["28.05€"]),
        position: [150.0, 246.0],
        alignment: TextAlignment::Right,
    }));

    assert_eq!(
        surface.text_at([20.0, 257.0]),
        Some(strings(&["¡Gracias por su compra!"]))
    );
    assert_eq!(
        surface.text_at([20.0, 272.0]),
        Some(strings(&["Información de pago"]))
    );
    assert_eq!(
        surface.text_at([20.0, 279.0]),
        Some(strings(&["Efectivo", "Tarjeta", "Bizum: 628703287"]))
    );
    assert_eq!(surface.text_at([110.0, 272.0]), Some(strings(&["Contacto"])));
    assert_eq!(
        surface.text_at([110.0, 279.0]),
        Some(strings(&[
            "Charcuteria y Jamoneria Nacho",
            "C/ Angel Luis de la Herran 27",
            "28043 Madrid",
            "Tel:628703287",
        ]))
    );

    assert_eq!(
        surface.calls.last(),
        Some(&DrawCall::Save("factura-A-001.pdf".into()))
    );
}

#[test]
fn a_failing_logo_only_removes_the_logo() {
    let invoice = sample_invoice();
    let mut surface_with_logo = RecordingSurface::default();
    render(&invoice, &mut surface_with_logo).unwrap();
    let mut surface_without_logo = RecordingSurface {
        fail_image: true,
        ..RecordingSurface::default()
    };
    let logo = render(&invoice, &mut surface_without_logo).unwrap();

    assert!(matches!(logo, LogoOutcome::Skipped(reason) if reason.contains("logo.jpg")));
    similar_asserts::assert_eq!(
        surface_without_logo.calls,
        surface_with_logo.calls[1..].to_vec()
    );
    let saves = surface_without_logo
        .calls
        .iter()
        .filter(|call| matches!(call, DrawCall::Save(_)))
        .count();
    assert_eq!(saves, 1);
}

#[test]
fn missing_billing_details_skip_only_their_block() {
    let mut invoice = sample_invoice();
    invoice.billing_details = None;
    let mut surface = RecordingSurface::default();
    render(&invoice, &mut surface).unwrap();

    assert_eq!(
        surface.text_at([20.0, 75.0]),
        Some(strings(&["FACTURAR A:"]))
    );
    assert_eq!(surface.text_at([55.0, 65.0]), None);
    assert_eq!(surface.text_at([55.0, 72.0]), None);
    assert!(matches!(surface.calls.last(), Some(DrawCall::Save(_))));
}

#[test]
fn long_articles_stay_on_a_single_row() {
    let article = "Paleta iberica de bellota cortada a cuchillo, loncheada y envasada al vacio";
    let mut invoice = sample_invoice();
    invoice.items[0].article = article.into();
    let mut surface = RecordingSurface::default();
    render(&invoice, &mut surface).unwrap();

    assert_eq!(surface.text_at([20.0, 105.0]), Some(strings(&[article])));
    assert_eq!(surface.text_at([20.0, 113.0]), Some(strings(&["Queso curado"])));
}

#[test]
fn a_total_typed_by_the_user_is_printed_as_typed() {
    let items = update_item_field(
        &[revised_item("Lomo", "2", "", 10.0)],
        0,
        ItemRevision::ReviseFromTotal("22".into()),
    )
    .unwrap();
    let invoice = build_invoice(
        InvoiceHeader {
            invoice_number: "A-002".into(),
            date: "2024-03-02".into(),
        },
        BillingDetails::default(),
        items,
    );
    let mut surface = RecordingSurface::default();
    render(&invoice, &mut surface).unwrap();

    assert_eq!(surface.text_at([100.0, 105.0]), Some(strings(&["10.00"])));
    assert_eq!(surface.text_at([170.0, 105.0]), Some(strings(&["22"])));
}

#[test]
fn a_negative_total_prints_the_same_amount_in_the_row_and_the_totals() {
    let items = update_item_field(
        &[revised_item("Lomo", "2", "5", 10.0)],
        0,
        ItemRevision::ReviseFromTotal("-10".into()),
    )
    .unwrap();
    let invoice = build_invoice(
        InvoiceHeader {
            invoice_number: "A-003".into(),
            date: "2024-03-03".into(),
        },
        BillingDetails::default(),
        items,
    );
    let mut surface = RecordingSurface::default();
    render(&invoice, &mut surface).unwrap();

    assert_eq!(surface.text_at([100.0, 105.0]), Some(strings(&["0.00"])));
    assert_eq!(surface.text_at([125.0, 105.0]), Some(strings(&["0.00"])));
    assert_eq!(surface.text_at([170.0, 105.0]), Some(strings(&["0.00"])));
    assert_eq!(surface.text_at([150.0, 232.0]), Some(strings(&["0.00"])));
    assert_eq!(surface.text_at([150.0, 239.0]), Some(strings(&["0.00"])));
    assert_eq!(surface.text_at([150.0, 246.0]), Some(strings(&["0.00€"])));
}

#[test]
fn a_failing_save_is_reported() {
    let mut surface = RecordingSurface {
        fail_save: true,
        ..RecordingSurface::default()
    };
    let error = render(&sample_invoice(), &mut surface).unwrap_err();

    assert_eq!(error.kind, ErrorKind::Io);
}
