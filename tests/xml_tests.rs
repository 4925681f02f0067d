use fatoora::core::*;
use fatoora::xml::to_ubl_xml;
use serde_json::json;

fn config() -> FatooraConfig {
    let mut config = FatooraConfig::default();
    config.organization.name = "ACME Trading LLC".into();
    config.organization.tax_number = "310122393500003".into();
    config
}

fn invoice_doc() -> CanonicalDocument {
    let record = SourceRecord::new(json!({
        "number": "INV-2024-001",
        "created_at": "2024-06-15T10:30:00Z",
        "sub_total": "100.00",
        "total": "115.00",
        "vat_amount": "15.00",
        "customer": {"name": "Gulf Retail Co", "tax_number": "311111111100003"},
        "items": [
            {"name": "Consulting", "quantity": 2, "unit_price": "50.00", "vat_rate": 15},
        ],
    }));
    let mut doc = map_document(&record, &config()).unwrap();
    doc.uuid = Some("11111111-2222-3333-4444-555555555555".into());
    doc
}

fn credit_note_doc() -> CanonicalDocument {
    let record = SourceRecord::new(json!({
        "number": "CN-2024-007",
        "type": "credit_note",
        "created_at": "2024-07-01T09:00:00Z",
        "sub_total": "100.00",
        "total": "115.00",
        "vat_amount": "15.00",
        "items": [
            {"name": "Returned goods", "quantity": 2, "unit_price": "50.00", "vat_rate": 15,
             "discount_amount": "5.00", "discount_reason": "Damaged packaging"},
        ],
        "originalInvoice": {"number": "INV-001", "issue_date": "2024-06-15"},
    }));
    let mut doc = map_document(&record, &config()).unwrap();
    doc.uuid = Some("99999999-8888-7777-6666-555555555555".into());
    doc
}

// --- Header & determinism ---

#[test]
fn output_is_byte_for_byte_deterministic() {
    let doc = invoice_doc();
    assert_eq!(to_ubl_xml(&doc).unwrap(), to_ubl_xml(&doc).unwrap());
}

#[test]
fn declaration_and_namespaces() {
    let xml = to_ubl_xml(&invoice_doc()).unwrap();
    assert!(xml.starts_with(r#"<?xml version="1.0" encoding="UTF-8"?>"#));
    assert!(xml.contains(r#"xmlns="urn:oasis:names:specification:ubl:schema:xsd:Invoice-2""#));
    assert!(xml.contains(
        r#"xmlns:cac="urn:oasis:names:specification:ubl:schema:xsd:CommonAggregateComponents-2""#
    ));
}

#[test]
fn header_carries_identity_and_type_code() {
    let xml = to_ubl_xml(&invoice_doc()).unwrap();
    assert!(xml.contains("<cbc:ID>INV-2024-001</cbc:ID>"));
    assert!(xml.contains("<cbc:UUID>11111111-2222-3333-4444-555555555555</cbc:UUID>"));
    assert!(xml.contains("<cbc:IssueDate>2024-06-15</cbc:IssueDate>"));
    assert!(xml.contains("<cbc:IssueTime>10:30:00</cbc:IssueTime>"));
    assert!(xml.contains("<cbc:InvoiceTypeCode>388</cbc:InvoiceTypeCode>"));
    assert!(xml.contains("<cbc:DocumentCurrencyCode>SAR</cbc:DocumentCurrencyCode>"));
}

// --- Monetary totals ---

#[test]
fn monetary_totals_render_with_two_decimals() {
    let xml = to_ubl_xml(&invoice_doc()).unwrap();
    assert!(xml.contains(r#"<cbc:TaxAmount currencyID="SAR">15.00</cbc:TaxAmount>"#));
    assert!(xml.contains(r#"<cbc:TaxExclusiveAmount currencyID="SAR">100.00</cbc:TaxExclusiveAmount>"#));
    assert!(xml.contains(r#"<cbc:TaxInclusiveAmount currencyID="SAR">115.00</cbc:TaxInclusiveAmount>"#));
    assert!(xml.contains(r#"<cbc:PayableAmount currencyID="SAR">115.00</cbc:PayableAmount>"#));
}

// --- Parties ---

#[test]
fn party_blocks_carry_tax_scheme() {
    let xml = to_ubl_xml(&invoice_doc()).unwrap();
    assert!(xml.contains("<cac:AccountingSupplierParty>"));
    assert!(xml.contains("<cac:AccountingCustomerParty>"));
    assert!(xml.contains("<cbc:RegistrationName>ACME Trading LLC</cbc:RegistrationName>"));
    assert!(xml.contains("<cbc:CompanyID>310122393500003</cbc:CompanyID>"));
    assert!(xml.contains("<cbc:CompanyID>311111111100003</cbc:CompanyID>"));
    assert!(xml.contains("<cbc:ID>VAT</cbc:ID>"));
}

// --- Lines ---

#[test]
fn lines_get_sequential_ids_and_computed_extensions() {
    let mut doc = invoice_doc();
    doc.lines.push(CanonicalLine {
        name: "Support".into(),
        quantity: rust_decimal_macros::dec!(1),
        unit_code: "EA".into(),
        unit_price: rust_decimal_macros::dec!(25.00),
        price_inclusive: None,
        discount: rust_decimal::Decimal::ZERO,
        discount_reason: None,
        tax_category: TaxCategory::StandardRate,
        tax_rate: rust_decimal_macros::dec!(15),
        tax_amount: None,
    });
    let xml = to_ubl_xml(&doc).unwrap();
    assert!(xml.contains("<cbc:ID>1</cbc:ID>"));
    assert!(xml.contains("<cbc:ID>2</cbc:ID>"));
    assert!(xml.contains(r#"<cbc:InvoicedQuantity unitCode="EA">2</cbc:InvoicedQuantity>"#));
    assert!(xml.contains(r#"<cbc:LineExtensionAmount currencyID="SAR">100.00</cbc:LineExtensionAmount>"#));
    assert!(xml.contains(r#"<cbc:PriceAmount currencyID="SAR">50.00</cbc:PriceAmount>"#));
    assert!(xml.contains("<cbc:Percent>15</cbc:Percent>"));
}

// --- Credit notes ---

#[test]
fn credit_note_emits_billing_reference_and_negative_totals() {
    let xml = to_ubl_xml(&credit_note_doc()).unwrap();
    assert!(xml.contains("<cbc:InvoiceTypeCode>381</cbc:InvoiceTypeCode>"));
    assert!(xml.contains("<cac:BillingReference>"));
    assert!(xml.contains("<cbc:ID>INV-001</cbc:ID>"));
    assert!(xml.contains("<cbc:IssueDate>2024-06-15</cbc:IssueDate>"));
    assert!(xml.contains(r#"<cbc:TaxInclusiveAmount currencyID="SAR">-115.00</cbc:TaxInclusiveAmount>"#));
    assert!(xml.contains(r#"<cbc:TaxAmount currencyID="SAR">-15.00</cbc:TaxAmount>"#));
    assert!(xml.contains(r#"<cbc:InvoicedQuantity unitCode="EA">-2</cbc:InvoicedQuantity>"#));
    assert!(xml.contains(r#"<cbc:LineExtensionAmount currencyID="SAR">-100.00</cbc:LineExtensionAmount>"#));
}

#[test]
fn discount_renders_as_allowance_charge() {
    let xml = to_ubl_xml(&credit_note_doc()).unwrap();
    assert!(xml.contains("<cac:AllowanceCharge>"));
    assert!(xml.contains("<cbc:ChargeIndicator>false</cbc:ChargeIndicator>"));
    assert!(xml.contains("<cbc:AllowanceChargeReason>Damaged packaging</cbc:AllowanceChargeReason>"));
    assert!(xml.contains(r#"<cbc:Amount currencyID="SAR">-5.00</cbc:Amount>"#));
}

#[test]
fn invoice_has_no_billing_reference_block() {
    let xml = to_ubl_xml(&invoice_doc()).unwrap();
    assert!(!xml.contains("<cac:BillingReference>"));
}

#[test]
fn no_signature_is_embedded_by_the_builder() {
    let xml = to_ubl_xml(&invoice_doc()).unwrap();
    assert!(!xml.contains("ds:Signature"));
    assert!(xml.trim_end().ends_with("</Invoice>"));
}
