use serde::{Deserialize, Serialize};

/// Default IVA percentage given to every newly created line item.
pub const DEFAULT_IVA: f64 = 10.0;

/// The customer the invoice is billed to. All fields are required but free-form.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BillingDetails {
    pub name: String,
    pub tax_id: String,
    pub address: String,
    pub postal_code: String,
}

/// One of the four billing fields, used when editing them one at a time.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum BillingField {
    Name,
    TaxId,
    Address,
    PostalCode,
}

impl BillingDetails {
    pub fn with_field(mut self, field: BillingField, value: String) -> Self {
        match field {
            BillingField::Name => self.name = value,
            BillingField::TaxId => self.tax_id = value,
            BillingField::Address => self.address = value,
            BillingField::PostalCode => self.postal_code = value,
        }
        self
    }
}

/// How the quantity of a line item is measured.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
pub enum WeightUnit {
    #[default]
    #[serde(rename = "kg")]
    Kilogram,
    #[serde(rename = "und")]
    Unit,
}

impl WeightUnit {
    /// The label printed next to the quantity in the item table.
    pub fn label(self) -> &'static str {
        match self {
            WeightUnit::Kilogram => "kg",
            WeightUnit::Unit => "und",
        }
    }
}

impl std::fmt::Display for WeightUnit {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.label())
    }
}

/// A line item of the invoice.
///
/// `weight` and `price` keep the raw text typed by the user so that partial input
/// such as `"1."` survives an edit; the numeric fields are always derived from them
/// (or, in reverse mode, from the total).
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceItem {
    pub article: String,
    pub weight: String,
    pub weight_unit: WeightUnit,
    pub price: String,
    pub subtotal: f64,
    /// Percentage, e.g. `10.0` for 10 %. Never stored as a fraction.
    pub iva: f64,
    pub total: f64,
    /// The text of the last total typed by the user, kept for display until a
    /// forward derivation recomputes the total.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_input: Option<String>,
}

impl Default for InvoiceItem {
    fn default() -> Self {
        InvoiceItem {
            article: String::new(),
            weight: String::new(),
            weight_unit: WeightUnit::Kilogram,
            price: String::new(),
            subtotal: 0.0,
            iva: DEFAULT_IVA,
            total: 0.0,
            total_input: None,
        }
    }
}

impl InvoiceItem {
    /// The tax amount this item contributes to the invoice.
    pub fn tax(&self) -> f64 {
        self.subtotal * (self.iva / 100.0)
    }

    /// The total as it should be shown: the raw text of a reverse edit when there
    /// is one, otherwise the numeric total with two decimals.
    pub fn display_total(&self) -> String {
        match &self.total_input {
            Some(total_input) => total_input.clone(),
            None => format!("{:.2}", self.total),
        }
    }
}

/// The identifying fields of an invoice, collected before the items.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceHeader {
    pub invoice_number: String,
    /// ISO calendar date, `YYYY-MM-DD`.
    pub date: String,
}

/// A submitted invoice. Built once by `computation::build_invoice` and never modified.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Invoice {
    pub invoice_number: String,
    pub date: String,
    pub billing_details: Option<BillingDetails>,
    pub items: Vec<InvoiceItem>,
    pub subtotal: f64,
    pub tax: f64,
    pub total: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn items_are_created_with_the_default_tax_rate_and_kilograms() {
        let item = InvoiceItem::default();

        assert_eq!(item.weight_unit, WeightUnit::Kilogram);
        assert_eq!(item.iva, 10.0);
        assert_eq!(item.subtotal, 0.0);
        assert_eq!(item.total, 0.0);
    }

    #[test]
    fn item_json_uses_the_form_field_names() {
        let item: InvoiceItem = serde_json::from_str(
            r#"{"article":"Jamon","weight":"2","weightUnit":"und","price":"10","subtotal":20,"iva":10,"total":22}"#,
        )
        .unwrap();

        assert_eq!(item.weight_unit, WeightUnit::Unit);
        assert_eq!(item.total_input, None);
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["weightUnit"], "und");
        assert!(json.get("totalInput").is_none());
    }

    #[test]
    fn display_total_prefers_the_typed_text() {
        let mut item = InvoiceItem {
            total: 22.0,
            ..InvoiceItem::default()
        };
        assert_eq!(item.display_total(), "22.00");

        item.total_input = Some("22".into());
        assert_eq!(item.display_total(), "22");
    }

    #[test]
    fn billing_fields_are_replaced_individually() {
        let billing = BillingDetails::default()
            .with_field(BillingField::Name, "Bar Pepe".into())
            .with_field(BillingField::PostalCode, "28043".into());

        assert_eq!(billing.name, "Bar Pepe");
        assert_eq!(billing.postal_code, "28043");
        assert!(billing.tax_id.is_empty());
    }
}
