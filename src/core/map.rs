use chrono::Utc;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::Value;

use super::classify::SourceRecord;
use super::config::FatooraConfig;
use super::error::FatooraError;
use super::resolve::{parse_date, parse_time, resolve_decimal, resolve_string};
use super::types::*;

const DEFAULT_CURRENCY: &str = "SAR";
const DEFAULT_COUNTRY: &str = "SA";
const DEFAULT_UNIT_CODE: &str = "EA";

fn default_tax_rate() -> Decimal {
    dec!(15)
}

/// Project a source record into the canonical document shape.
///
/// Resolution order per field: the mapped path, then the documented default
/// (currency "SAR", country "SA", tax category "S", tax rate 15, unit "EA"),
/// then `None`. Only the document number is fatal when missing; a credit
/// note additionally requires a resolvable original-invoice number.
///
/// On credit notes every monetary total, line quantity, line discount and
/// line tax amount is normalized to a non-positive value, regardless of how
/// the source stored it.
pub fn map_document(
    record: &SourceRecord,
    config: &FatooraConfig,
) -> Result<CanonicalDocument, FatooraError> {
    let is_credit_note = config.credit_note.identification.classify(record)?;
    let m = &config.field_map;
    let data = &record.data;

    let number = resolve_string(data, m.invoice_number.as_deref()).ok_or_else(|| {
        FatooraError::IncompleteDocument("document number is not resolvable".into())
    })?;

    let type_code = resolve_type_code(data, m.invoice_type.as_deref(), is_credit_note);

    // Issue date/time default to "now" when the source has neither, the
    // same way a freshly created record would be stamped.
    let now = Utc::now().naive_utc();
    let issue_date = resolve_string(data, m.issue_date.as_deref())
        .and_then(|s| parse_date(&s))
        .unwrap_or_else(|| now.date());
    let issue_time = resolve_string(data, m.issue_time.as_deref())
        .and_then(|s| parse_time(&s))
        .unwrap_or_else(|| now.time());

    let currency_code = resolve_string(data, m.invoice_currency_code.as_deref())
        .unwrap_or_else(|| DEFAULT_CURRENCY.into());

    let seller = Party {
        name: resolve_string(data, m.seller_name.as_deref())
            .or_else(|| non_empty(&config.organization.name)),
        tax_number: resolve_string(data, m.seller_tax_number.as_deref())
            .or_else(|| non_empty(&config.organization.tax_number)),
        street: resolve_string(data, m.seller_street.as_deref()),
        building_number: resolve_string(data, m.seller_building_number.as_deref()),
        city: resolve_string(data, m.seller_city.as_deref()),
        postal_code: resolve_string(data, m.seller_postal_code.as_deref()),
        district: resolve_string(data, m.seller_district.as_deref()),
        additional_number: resolve_string(data, m.seller_additional_number.as_deref()),
        country_code: resolve_string(data, m.seller_country_code.as_deref())
            .unwrap_or_else(|| DEFAULT_COUNTRY.into()),
    };

    let buyer = map_buyer(data, m);

    let lines = map_lines(data, m)?;

    let mut doc = CanonicalDocument {
        number,
        uuid: None,
        type_code,
        is_credit_note,
        issue_date,
        issue_time,
        currency_code,
        counter_value: resolve_string(data, m.invoice_counter_value.as_deref()),
        note: resolve_string(data, m.invoice_note.as_deref()),
        supply_date: resolve_string(data, m.supply_date.as_deref()).and_then(|s| parse_date(&s)),
        supply_end_date: resolve_string(data, m.supply_end_date.as_deref())
            .and_then(|s| parse_date(&s)),
        seller,
        buyer,
        lines,
        total_excluding_vat: resolve_decimal(data, m.total_excluding_vat.as_deref())
            .unwrap_or(Decimal::ZERO),
        total_including_vat: resolve_decimal(data, m.total_including_vat.as_deref())
            .unwrap_or(Decimal::ZERO),
        total_vat: resolve_decimal(data, m.total_vat.as_deref()).unwrap_or(Decimal::ZERO),
        total_discount: resolve_decimal(data, m.total_discount.as_deref())
            .unwrap_or(Decimal::ZERO),
        billing_reference: None,
    };

    if is_credit_note {
        doc.billing_reference = Some(resolve_billing_reference(data, config)?);
        normalize_credit_note_signs(&mut doc);
    }

    Ok(doc)
}

/// Fixed code per kind unless the mapped path carries a known override.
fn resolve_type_code(data: &Value, path: Option<&str>, is_credit_note: bool) -> DocumentTypeCode {
    let fallback = if is_credit_note {
        DocumentTypeCode::CreditNote
    } else {
        DocumentTypeCode::Invoice
    };
    resolve_string(data, path)
        .and_then(|code| DocumentTypeCode::from_code(&code))
        .unwrap_or(fallback)
}

fn map_buyer(data: &Value, m: &super::config::FieldMap) -> Option<Party> {
    let buyer = Party {
        name: resolve_string(data, m.buyer_name.as_deref()),
        tax_number: resolve_string(data, m.buyer_tax_number.as_deref()),
        street: resolve_string(data, m.buyer_street.as_deref()),
        building_number: resolve_string(data, m.buyer_building_number.as_deref()),
        city: resolve_string(data, m.buyer_city.as_deref()),
        postal_code: resolve_string(data, m.buyer_postal_code.as_deref()),
        district: resolve_string(data, m.buyer_district.as_deref()),
        additional_number: resolve_string(data, m.buyer_additional_number.as_deref()),
        country_code: resolve_string(data, m.buyer_country_code.as_deref())
            .unwrap_or_else(|| DEFAULT_COUNTRY.into()),
    };
    // A buyer block with no identity at all is treated as absent (B2C
    // simplified invoices have none).
    if buyer.name.is_none() && buyer.tax_number.is_none() {
        None
    } else {
        Some(buyer)
    }
}

fn map_lines(
    data: &Value,
    m: &super::config::FieldMap,
) -> Result<Vec<CanonicalLine>, FatooraError> {
    let Some(path) = m.line_items.as_deref() else {
        return Ok(Vec::new());
    };
    let items = match super::resolve::resolve(data, path) {
        Some(Value::Array(items)) => items.as_slice(),
        Some(Value::Null) | None => &[],
        Some(other) => {
            return Err(FatooraError::Mapping(format!(
                "line items path `{path}` resolved to a non-collection value: {other}"
            )));
        }
    };

    Ok(items.iter().map(|item| map_line(item, m)).collect())
}

fn map_line(item: &Value, m: &super::config::FieldMap) -> CanonicalLine {
    CanonicalLine {
        name: resolve_string(item, m.item_name.as_deref()).unwrap_or_default(),
        quantity: resolve_decimal(item, m.item_quantity.as_deref()).unwrap_or(Decimal::ZERO),
        unit_code: resolve_string(item, m.item_unit_code.as_deref())
            .unwrap_or_else(|| DEFAULT_UNIT_CODE.into()),
        unit_price: resolve_decimal(item, m.item_price.as_deref()).unwrap_or(Decimal::ZERO),
        price_inclusive: resolve_decimal(item, m.item_price_inclusive.as_deref()),
        discount: resolve_decimal(item, m.item_discount.as_deref()).unwrap_or(Decimal::ZERO),
        discount_reason: resolve_string(item, m.item_discount_reason.as_deref()),
        tax_category: resolve_string(item, m.item_tax_category.as_deref())
            .and_then(|c| TaxCategory::from_code(&c))
            .unwrap_or(TaxCategory::StandardRate),
        tax_rate: resolve_decimal(item, m.item_tax_rate.as_deref())
            .unwrap_or_else(default_tax_rate),
        tax_amount: resolve_decimal(item, m.item_tax_amount.as_deref()),
    }
}

fn resolve_billing_reference(
    data: &Value,
    config: &FatooraConfig,
) -> Result<BillingReference, FatooraError> {
    let reference = &config.credit_note.reference;
    let number = resolve_string(data, Some(reference.number_reference.as_str())).ok_or_else(|| {
        FatooraError::MissingReference(format!(
            "original invoice number not resolvable at `{}`",
            reference.number_reference
        ))
    })?;
    Ok(BillingReference {
        number,
        uuid: resolve_string(data, Some(reference.uuid_reference.as_str())),
        issue_date: resolve_string(data, Some(reference.date_reference.as_str()))
            .and_then(|s| parse_date(&s)),
    })
}

/// Enforce the credit-note sign convention: totals, line quantities (which
/// carry the extension amount with them), line discounts and line tax
/// amounts all end up non-positive. Values the source already stored as
/// negative pass through unchanged. Unit prices stay positive — the flipped
/// quantity carries the sign.
fn normalize_credit_note_signs(doc: &mut CanonicalDocument) {
    doc.total_excluding_vat = non_positive(doc.total_excluding_vat);
    doc.total_including_vat = non_positive(doc.total_including_vat);
    doc.total_vat = non_positive(doc.total_vat);
    doc.total_discount = non_positive(doc.total_discount);

    for line in &mut doc.lines {
        if line.extension_amount() > Decimal::ZERO {
            line.quantity = -line.quantity;
        }
        line.discount = non_positive(line.discount);
        if let Some(tax) = line.tax_amount {
            line.tax_amount = Some(non_positive(tax));
        }
    }
}

fn non_positive(value: Decimal) -> Decimal {
    if value > Decimal::ZERO { -value } else { value }
}

fn non_empty(s: &str) -> Option<String> {
    if s.is_empty() { None } else { Some(s.to_string()) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn config() -> FatooraConfig {
        let mut config = FatooraConfig::default();
        config.organization.name = "ACME Trading LLC".into();
        config.organization.tax_number = "310122393500003".into();
        config
    }

    #[test]
    fn missing_number_is_fatal() {
        let record = SourceRecord::new(json!({"total": "10.00"}));
        let err = map_document(&record, &config()).unwrap_err();
        assert!(matches!(err, FatooraError::IncompleteDocument(_)));
    }

    #[test]
    fn defaults_apply_when_paths_are_absent() {
        let record = SourceRecord::new(json!({
            "number": "INV-1",
            "items": [{"name": "Widget", "quantity": 1, "unit_price": "10.00"}],
        }));
        let doc = map_document(&record, &config()).unwrap();
        assert_eq!(doc.currency_code, "SAR");
        assert_eq!(doc.seller.country_code, "SA");
        assert_eq!(doc.seller.name.as_deref(), Some("ACME Trading LLC"));
        let line = &doc.lines[0];
        assert_eq!(line.tax_category, TaxCategory::StandardRate);
        assert_eq!(line.tax_rate, dec!(15));
        assert_eq!(line.unit_code, "EA");
    }

    #[test]
    fn line_items_path_to_scalar_is_a_mapping_error() {
        let mut cfg = config();
        cfg.field_map.line_items = Some("number".into());
        let record = SourceRecord::new(json!({"number": "INV-1"}));
        assert!(matches!(
            map_document(&record, &cfg),
            Err(FatooraError::Mapping(_))
        ));
    }
}
