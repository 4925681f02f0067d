use fatoora::core::*;
use fatoora::qr::*;
use proptest::prelude::*;
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
        "total": "115.00",
        "vat_amount": "15.00",
    }));
    map_document(&record, &config()).unwrap()
}

fn credit_note_doc() -> CanonicalDocument {
    let record = SourceRecord::new(json!({
        "number": "CN-2024-007",
        "type": "credit_note",
        "created_at": "2024-07-01T09:00:00Z",
        "total": "115.00",
        "vat_amount": "15.00",
        "originalInvoice": {"number": "INV-001"},
    }));
    map_document(&record, &config()).unwrap()
}

fn value_str(records: &[(u8, Vec<u8>)], tag: u8) -> Option<String> {
    records
        .iter()
        .find(|(t, _)| *t == tag)
        .map(|(_, v)| String::from_utf8(v.clone()).unwrap())
}

// --- Tag layout ---

#[test]
fn invoice_emits_the_five_mandatory_tags_in_order() {
    let doc = invoice_doc();
    let tlv = encode_tlv(&doc, None, None).unwrap();
    let records = decode_tlv(&tlv).unwrap();

    let tags: Vec<u8> = records.iter().map(|(t, _)| *t).collect();
    assert_eq!(tags, vec![1, 2, 3, 4, 5]);

    assert_eq!(value_str(&records, 1).as_deref(), Some("ACME Trading LLC"));
    assert_eq!(value_str(&records, 2).as_deref(), Some("310122393500003"));
    assert_eq!(value_str(&records, 3).as_deref(), Some("2024-06-15T10:30:00Z"));
    assert_eq!(value_str(&records, 4).as_deref(), Some("115.00"));
    assert_eq!(value_str(&records, 5).as_deref(), Some("15.00"));
}

#[test]
fn optional_tags_appear_only_when_present() {
    let doc = invoice_doc();
    let tlv = encode_tlv(&doc, Some("hash-value"), Some("sig-value")).unwrap();
    let records = decode_tlv(&tlv).unwrap();

    let tags: Vec<u8> = records.iter().map(|(t, _)| *t).collect();
    assert_eq!(tags, vec![1, 2, 3, 4, 5, 6, 7]);
    assert_eq!(value_str(&records, 6).as_deref(), Some("hash-value"));
    assert_eq!(value_str(&records, 7).as_deref(), Some("sig-value"));
}

#[test]
fn credit_note_emits_marker_and_reference_tags() {
    let doc = credit_note_doc();
    let tlv = encode_tlv(&doc, None, None).unwrap();
    let records = decode_tlv(&tlv).unwrap();

    let tags: Vec<u8> = records.iter().map(|(t, _)| *t).collect();
    assert_eq!(tags, vec![1, 2, 3, 4, 5, 8, 9]);
    assert_eq!(value_str(&records, 8).as_deref(), Some("CreditNote"));
    assert_eq!(value_str(&records, 9).as_deref(), Some("INV-001"));
}

#[test]
fn credit_note_amounts_are_rendered_as_magnitudes() {
    // The canonical document carries negative totals; the QR must not.
    let doc = credit_note_doc();
    assert!(doc.total_including_vat.is_sign_negative());

    let records = decode_tlv(&encode_tlv(&doc, None, None).unwrap()).unwrap();
    assert_eq!(value_str(&records, 4).as_deref(), Some("115.00"));
    assert_eq!(value_str(&records, 5).as_deref(), Some("15.00"));
}

// --- Length handling ---

#[test]
fn length_prefixes_match_value_lengths() {
    let doc = invoice_doc();
    let tlv = encode_tlv(&doc, None, None).unwrap();

    // Walk manually: every declared length lands exactly on the next tag.
    let mut pos = 0;
    let mut count = 0;
    while pos < tlv.len() {
        let len = tlv[pos + 1] as usize;
        pos += 2 + len;
        count += 1;
    }
    assert_eq!(pos, tlv.len());
    assert_eq!(count, 5);
}

#[test]
fn oversize_seller_name_is_rejected_not_truncated() {
    let mut doc = invoice_doc();
    doc.seller.name = Some("x".repeat(300));
    assert!(matches!(
        encode_tlv(&doc, None, None),
        Err(FatooraError::Qr(_))
    ));
}

// --- QR rendering ---

#[test]
fn qr_output_is_a_base64_data_uri() {
    use base64::Engine as _;
    let doc = invoice_doc();
    let qr = generate_qr(&doc, None, None).unwrap();
    assert!(qr.starts_with("data:image/svg+xml;base64,"));
    let body = qr.strip_prefix("data:image/svg+xml;base64,").unwrap();
    let decoded = base64::engine::general_purpose::STANDARD.decode(body).unwrap();
    assert!(String::from_utf8(decoded).unwrap().contains("<svg"));
}

// --- Round-trip property ---

proptest! {
    #[test]
    fn tlv_round_trips_for_arbitrary_documents(
        seller_name in "[a-zA-Z0-9 ]{1,80}",
        tax_number in "[0-9]{1,20}",
        total_cents in 0i64..10_000_000,
        vat_cents in 0i64..1_000_000,
    ) {
        use rust_decimal::Decimal;

        let mut doc = invoice_doc();
        doc.seller.name = Some(seller_name.clone());
        doc.seller.tax_number = Some(tax_number.clone());
        doc.total_including_vat = Decimal::new(total_cents, 2);
        doc.total_vat = Decimal::new(vat_cents, 2);

        let tlv = encode_tlv(&doc, None, None).unwrap();
        let records = decode_tlv(&tlv).unwrap();

        prop_assert_eq!(records.len(), 5);
        prop_assert_eq!(value_str(&records, 1), Some(seller_name));
        prop_assert_eq!(value_str(&records, 2), Some(tax_number));
        prop_assert_eq!(value_str(&records, 4), Some(format_amount(doc.total_including_vat)));
        prop_assert_eq!(value_str(&records, 5), Some(format_amount(doc.total_vat)));
    }
}
