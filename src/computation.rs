use serde::{Deserialize, Serialize};

use crate::error::ContextError;
use crate::invoice::{BillingDetails, Invoice, InvoiceHeader, InvoiceItem, WeightUnit};

/// The amounts derived from the physical inputs of a line item.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ForwardAmounts {
    pub subtotal: f64,
    pub total: f64,
}

/// The amounts derived from a total typed by the user.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReverseAmounts {
    pub subtotal: f64,
    pub price: f64,
}

/// A change to one of the inputs that drive a line item forward.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(tag = "field", content = "value", rename_all = "camelCase")]
pub enum FieldEdit {
    Article(String),
    Weight(String),
    WeightUnit(WeightUnit),
    Price(String),
    Iva(f64),
}

/// An edit of a line item, tagged with the direction in which the dependent
/// fields have to be derived.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub enum ItemRevision {
    /// Weight, price, IVA (or a purely descriptive field) changed: recompute subtotal and total.
    ReviseFromPhysicalInputs(FieldEdit),
    /// The total changed: recompute subtotal and price from it.
    ReviseFromTotal(String),
}

/// Parses the leading decimal number of `text`, the way a form field is read.
///
/// Leading whitespace is skipped and anything after the number is ignored, so `"1.5kg"`
/// reads as `1.5`. Text without a leading number, as well as values that would not be
/// finite, read as `0`.
pub fn parse_decimal(text: &str) -> f64 {
    let bytes = text.trim_start().as_bytes();
    let mut position = 0;

    let negative = match bytes.first() {
        Some(b'-') => {
            position += 1;
            true
        }
        Some(b'+') => {
            position += 1;
            false
        }
        _ => false,
    };

    let integer_start = position;
    while position < bytes.len() && bytes[position].is_ascii_digit() {
        position += 1;
    }
    let integer_digits = &bytes[integer_start..position];

    let mut fraction_digits: &[u8] = &[];
    if position < bytes.len() && bytes[position] == b'.' {
        let fraction_start = position + 1;
        let mut fraction_end = fraction_start;
        while fraction_end < bytes.len() && bytes[fraction_end].is_ascii_digit() {
            fraction_end += 1;
        }
        fraction_digits = &bytes[fraction_start..fraction_end];
        position = fraction_end;
    }

    if integer_digits.is_empty() && fraction_digits.is_empty() {
        return 0.0;
    }

    // The exponent only counts when it carries at least one digit, `"2e"` reads as `2`
    let mut exponent: &[u8] = &[];
    if position < bytes.len() && matches!(bytes[position], b'e' | b'E') {
        let exponent_start = position + 1;
        let mut exponent_end = exponent_start;
        if exponent_end < bytes.len() && matches!(bytes[exponent_end], b'+' | b'-') {
            exponent_end += 1;
        }
        let digits_start = exponent_end;
        while exponent_end < bytes.len() && bytes[exponent_end].is_ascii_digit() {
            exponent_end += 1;
        }
        if exponent_end > digits_start {
            exponent = &bytes[exponent_start..exponent_end];
        }
    }

    let mut normalized = String::with_capacity(position + exponent.len() + 4);
    if negative {
        normalized.push('-');
    }
    normalized.push_str(ascii_or_zero(integer_digits));
    normalized.push('.');
    normalized.push_str(ascii_or_zero(fraction_digits));
    if !exponent.is_empty() {
        normalized.push('e');
        normalized.push_str(ascii_or_zero(exponent));
    }

    normalized
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
        .unwrap_or(0.0)
}

fn ascii_or_zero(digits: &[u8]) -> &str {
    match std::str::from_utf8(digits) {
        Ok(digits) if !digits.is_empty() => digits,
        _ => "0",
    }
}

/// The factor that turns a subtotal into a total for the given IVA percentage.
fn tax_factor(iva: f64) -> f64 {
    1.0 + iva / 100.0
}

/// `subtotal = weight * price` and `total = subtotal * (1 + iva / 100)`.
pub fn compute_forward(weight: f64, price: f64, iva: f64) -> ForwardAmounts {
    let subtotal = weight * price;
    let total = subtotal * tax_factor(iva);

    ForwardAmounts { subtotal, total }
}

/// `subtotal = total / (1 + iva / 100)` and `price = subtotal / weight`.
///
/// The price is `0` whenever the weight is not positive, and the subtotal is `0`
/// whenever the tax factor is not positive, so the result is always finite.
pub fn compute_reverse(weight: f64, total: f64, iva: f64) -> ReverseAmounts {
    let factor = tax_factor(iva);
    let subtotal = if factor > 0.0 && factor.is_finite() {
        total / factor
    } else {
        0.0
    };
    let price = if weight > 0.0 { subtotal / weight } else { 0.0 };

    ReverseAmounts { subtotal, price }
}

/// Recomputes subtotal and total of an item from its weight, price and IVA.
fn derive_forward(mut item: InvoiceItem) -> InvoiceItem {
    let amounts = compute_forward(
        parse_decimal(&item.weight),
        parse_decimal(&item.price),
        item.iva,
    );
    item.subtotal = amounts.subtotal;
    item.total = amounts.total;
    item.total_input = None;

    item
}

/// Recomputes subtotal and price of an item from the total typed by the user.
/// Negative totals are clamped to zero so that the derived price never goes negative,
/// and the typed text is then dropped so that the row shows the clamped total.
fn derive_reverse(mut item: InvoiceItem, total_input: String) -> InvoiceItem {
    let supplied_total = parse_decimal(&total_input);
    let (total, total_input) = if supplied_total < 0.0 {
        log::debug!(
            "Clamping the negative total {:?} of {:?} to zero",
            total_input,
            item.article
        );
        (0.0, None)
    } else {
        (supplied_total, Some(total_input))
    };

    let amounts = compute_reverse(parse_decimal(&item.weight), total, item.iva);
    item.total = total;
    item.subtotal = amounts.subtotal;
    item.price = format!("{:.2}", amounts.price);
    item.total_input = total_input;

    item
}

impl FieldEdit {
    fn apply_to(self, item: &mut InvoiceItem) {
        match self {
            FieldEdit::Article(article) => item.article = article,
            FieldEdit::Weight(weight) => item.weight = weight,
            FieldEdit::WeightUnit(weight_unit) => item.weight_unit = weight_unit,
            FieldEdit::Price(price) => item.price = price,
            FieldEdit::Iva(iva) => item.iva = if iva.is_finite() { iva } else { 0.0 },
        }
    }
}

/// Applies `revision` to the item at `index` and re-derives its dependent fields.
/// Only the item at `index` differs in the returned list.
pub fn update_item_field(
    items: &[InvoiceItem],
    index: usize,
    revision: ItemRevision,
) -> Result<Vec<InvoiceItem>, ContextError> {
    let item = items.get(index).ok_or(ContextError::rejected(format!(
        "Unable to revise the item {}, the invoice has only {} items",
        index,
        items.len()
    )))?;

    let revised_item = match revision {
        ItemRevision::ReviseFromPhysicalInputs(field_edit) => {
            let mut item = item.clone();
            field_edit.apply_to(&mut item);
            derive_forward(item)
        }
        ItemRevision::ReviseFromTotal(total_input) => derive_reverse(item.clone(), total_input),
    };

    let mut revised_items = items.to_vec();
    revised_items[index] = revised_item;

    Ok(revised_items)
}

/// Appends a default item at the end of the list.
pub fn add_item(items: &[InvoiceItem]) -> Vec<InvoiceItem> {
    let mut extended_items = items.to_vec();
    extended_items.push(InvoiceItem::default());

    extended_items
}

/// Removes the item at `index`. Refused when it is the last remaining item.
pub fn remove_item(items: &[InvoiceItem], index: usize) -> Result<Vec<InvoiceItem>, ContextError> {
    if items.len() <= 1 {
        return Err(ContextError::rejected(
            "Unable to remove the item, an invoice needs at least one item",
        ));
    }
    if index >= items.len() {
        return Err(ContextError::rejected(format!(
            "Unable to remove the item {}, the invoice has only {} items",
            index,
            items.len()
        )));
    }

    let mut remaining_items = items.to_vec();
    remaining_items.remove(index);

    Ok(remaining_items)
}

/// Aggregates the items into the invoice totals and packages the snapshot.
pub fn build_invoice(
    header: InvoiceHeader,
    billing_details: BillingDetails,
    items: Vec<InvoiceItem>,
) -> Invoice {
    let subtotal = items.iter().map(|item| item.subtotal).sum::<f64>();
    let tax = items.iter().map(InvoiceItem::tax).sum::<f64>();
    let total = subtotal + tax;

    Invoice {
        invoice_number: header.invoice_number,
        date: header.date,
        billing_details: Some(billing_details),
        items,
        subtotal,
        tax,
        total,
    }
}
