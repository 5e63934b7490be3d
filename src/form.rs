use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::computation::{self, FieldEdit, ItemRevision};
use crate::error::{ContextError, ErrorKind};
use crate::invoice::{
    BillingDetails, BillingField, Invoice, InvoiceHeader, InvoiceItem, WeightUnit, DEFAULT_IVA,
};

/// The state of the invoice form, owned by the caller and replaced wholesale on every event.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceForm {
    pub invoice_number: String,
    pub date: String,
    pub billing_details: BillingDetails,
    /// Never empty.
    pub items: Vec<InvoiceItem>,
    /// Set between a successful submission and the end of its document generation.
    pub generation_pending: bool,
}

/// Everything the user can do to the form short of submitting it.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub enum FormEvent {
    SetInvoiceNumber(String),
    SetDate(String),
    SetBillingField(BillingField, String),
    ReviseItem {
        index: usize,
        revision: ItemRevision,
    },
    AddItem,
    RemoveItem(usize),
    GenerationFinished,
}

impl Default for InvoiceForm {
    fn default() -> Self {
        InvoiceForm {
            invoice_number: String::new(),
            date: String::new(),
            billing_details: BillingDetails::default(),
            items: vec![InvoiceItem::default()],
            generation_pending: false,
        }
    }
}

impl InvoiceForm {
    /// Returns the state after `event`. Events that would break an invariant of the
    /// item list are logged and leave the state as it was.
    pub fn apply(self, event: FormEvent) -> InvoiceForm {
        match event {
            FormEvent::SetInvoiceNumber(invoice_number) => InvoiceForm {
                invoice_number,
                ..self
            },
            FormEvent::SetDate(date) => InvoiceForm { date, ..self },
            FormEvent::SetBillingField(field, value) => InvoiceForm {
                billing_details: self.billing_details.with_field(field, value),
                ..self
            },
            FormEvent::ReviseItem { index, revision } => {
                match computation::update_item_field(&self.items, index, revision) {
                    Ok(items) => InvoiceForm { items, ..self },
                    Err(error) => {
                        log::warn!("{}", error);
                        self
                    }
                }
            }
            FormEvent::AddItem => InvoiceForm {
                items: computation::add_item(&self.items),
                ..self
            },
            FormEvent::RemoveItem(index) => match computation::remove_item(&self.items, index) {
                Ok(items) => InvoiceForm { items, ..self },
                Err(error) => {
                    log::warn!("{}", error);
                    self
                }
            },
            FormEvent::GenerationFinished => InvoiceForm {
                generation_pending: false,
                ..self
            },
        }
    }

    /// Whether the remove action of an item should be offered at all.
    pub fn can_remove_items(&self) -> bool {
        self.items.len() > 1
    }

    /// Builds the invoice from the current state.
    ///
    /// Refused while a previous submission is still being generated, or when a required
    /// field is blank. On success the returned state is marked as generating until
    /// `FormEvent::GenerationFinished` is applied.
    pub fn submit(&self) -> Result<(InvoiceForm, Invoice), ContextError> {
        if self.generation_pending {
            return Err(ContextError::rejected(
                "Unable to submit the invoice while the previous one is still being generated",
            ));
        }

        let missing_fields = self.missing_fields();
        if !missing_fields.is_empty() {
            return Err(ContextError::rejected(format!(
                "Unable to submit the invoice, the following fields are required: {}",
                missing_fields.join(", ")
            )));
        }

        let invoice = computation::build_invoice(
            InvoiceHeader {
                invoice_number: self.invoice_number.clone(),
                date: self.date.clone(),
            },
            self.billing_details.clone(),
            self.items.clone(),
        );
        log::debug!(
            "Built the invoice {:?} with {} items and a total of {:.2}",
            invoice.invoice_number,
            invoice.items.len(),
            invoice.total
        );

        let submitted_form = InvoiceForm {
            generation_pending: true,
            ..self.clone()
        };

        Ok((submitted_form, invoice))
    }

    /// The names of the required fields that are still blank, in form order.
    pub fn missing_fields(&self) -> Vec<String> {
        let mut missing_fields = Vec::new();
        let mut require = |value: &str, name: String| {
            if value.trim().is_empty() {
                missing_fields.push(name);
            }
        };

        require(&self.invoice_number, "invoiceNumber".into());
        require(&self.date, "date".into());
        require(&self.billing_details.name, "billingDetails.name".into());
        require(&self.billing_details.tax_id, "billingDetails.taxId".into());
        require(&self.billing_details.address, "billingDetails.address".into());
        require(
            &self.billing_details.postal_code,
            "billingDetails.postalCode".into(),
        );
        for (index, item) in self.items.iter().enumerate() {
            require(&item.article, format!("items[{}].article", index));
            require(&item.weight, format!("items[{}].weight", index));
            require(&item.price, format!("items[{}].price", index));
        }

        missing_fields
    }
}

/// An invoice as written by hand in a JSON file: the values a user would have typed
/// into the form, without any derived amount.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceDraft {
    pub invoice_number: String,
    pub date: String,
    pub billing_details: BillingDetails,
    pub items: Vec<DraftItem>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DraftItem {
    pub article: String,
    pub weight: String,
    #[serde(default)]
    pub weight_unit: WeightUnit,
    #[serde(default)]
    pub price: Option<String>,
    #[serde(default = "default_iva")]
    pub iva: f64,
    /// When present without a price, the item is priced backwards from it.
    #[serde(default)]
    pub total: Option<String>,
}

fn default_iva() -> f64 {
    DEFAULT_IVA
}

impl InvoiceDraft {
    pub fn from_path(draft_path: &Path) -> Result<InvoiceDraft, ContextError> {
        let draft_content = std::fs::read_to_string(draft_path).map_err(|error| {
            ContextError::with_error(
                ErrorKind::Io,
                format!("Unable to read the invoice draft {:?}", draft_path),
                &error,
            )
        })?;
        let draft: InvoiceDraft = serde_json::from_str(&draft_content).map_err(|error| {
            ContextError::with_error(
                ErrorKind::Parse,
                format!("Unable to parse the invoice draft {:?}", draft_path),
                &error,
            )
        })?;

        Ok(draft)
    }

    /// The sequence of form events a user would perform to fill in this draft.
    pub fn events(&self) -> Vec<FormEvent> {
        let mut events = vec![
            FormEvent::SetInvoiceNumber(self.invoice_number.clone()),
            FormEvent::SetDate(self.date.clone()),
            FormEvent::SetBillingField(BillingField::Name, self.billing_details.name.clone()),
            FormEvent::SetBillingField(BillingField::TaxId, self.billing_details.tax_id.clone()),
            FormEvent::SetBillingField(
                BillingField::Address,
                self.billing_details.address.clone(),
            ),
            FormEvent::SetBillingField(
                BillingField::PostalCode,
                self.billing_details.postal_code.clone(),
            ),
        ];

        for (index, item) in self.items.iter().enumerate() {
            // The form always starts with one empty item
            if index > 0 {
                events.push(FormEvent::AddItem);
            }

            let edits = [
                FieldEdit::Article(item.article.clone()),
                FieldEdit::Weight(item.weight.clone()),
                FieldEdit::WeightUnit(item.weight_unit),
                FieldEdit::Iva(item.iva),
            ];
            events.extend(edits.into_iter().map(|field_edit| FormEvent::ReviseItem {
                index,
                revision: ItemRevision::ReviseFromPhysicalInputs(field_edit),
            }));

            let revision = match (&item.price, &item.total) {
                (Some(price), _) => {
                    ItemRevision::ReviseFromPhysicalInputs(FieldEdit::Price(price.clone()))
                }
                (None, Some(total)) => ItemRevision::ReviseFromTotal(total.clone()),
                (None, None) => continue,
            };
            events.push(FormEvent::ReviseItem { index, revision });
        }

        events
    }

    /// Replays the draft onto an empty form.
    pub fn into_form(self) -> InvoiceForm {
        self.events()
            .into_iter()
            .fold(InvoiceForm::default(), InvoiceForm::apply)
    }
}
