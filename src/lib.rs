//! Factura turns the contents of an invoice form into a single-page PDF invoice.
//!
//! The crate is split in two halves which only meet through the `Invoice` value.
//! The computation half keeps every line item consistent while it is being edited and
//! aggregates the items into the invoice totals; the renderer half lays the finished
//! invoice out on a fixed A4 grid and saves it as `factura-<invoice number>.pdf`.

/// The data model shared by the form, the computation and the renderer.
pub mod invoice;

/// The arithmetic of line items and invoices.
///
/// # Introduction
///
/// Every edit of a line item is an `ItemRevision`, which states in which direction the dependent
/// fields are derived: from weight, price and IVA towards subtotal and total (`ReviseFromPhysicalInputs`),
/// or from a total typed by the user back to subtotal and price (`ReviseFromTotal`).
/// Numbers typed by the user are kept as text and read with `parse_decimal`, which falls back to zero
/// instead of failing.
pub mod computation;

/// The state of the invoice form as a plain value, changed only through `FormEvent`s.
///
/// Submitting the form enforces that every required field is filled in and that only one
/// document is being generated at a time. Invoice drafts written as JSON are replayed as
/// the sequence of events a user would have performed.
pub mod form;

/// This module contains the `ContextError` type which is the error type used throughout this library.
///
/// The `ContextError` type always carries an explanation of what was being attempted and, when the failure
/// originated in another library, the message of that propagated error. Its `ErrorKind` tells rejected
/// operations apart from I/O, parsing and rendering failures.
pub mod error;

/// The settings of the document generation, read from an optional JSON file.
pub mod configuration;

/// The base fonts used by the invoice: WinAnsi encoding and the glyph widths needed to right-align text.
pub mod fonts;

/// The module were the `PdfDocument` interface for working with PDF documents is presented.
///
/// # Introduction
///
/// The main component of this module is the struct `PdfDocument`, which offers `add_page`, `write_text`,
/// `draw_line`, `add_image`, `write_all` and `save_to_bytes`. Positions are given in millimeters from the
/// top-left corner of the page and converted to the PDF coordinate system internally. The documents are
/// deterministic: no timestamp or random identifier is ever written, so that the same input always
/// produces the same bytes.
pub mod pdf;

/// The `DrawingSurface` trait the invoice layout is drawn on, and its PDF implementation.
pub mod surface;

/// The fixed layout of the invoice document.
pub mod renderer;
