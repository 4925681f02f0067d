//! TLV payload encoding and QR rendering.
//!
//! The authority requires a Tag-Length-Value stream embedded in a scannable
//! QR code: 1-byte tag, 1-byte length, raw UTF-8 value. Monetary values are
//! rendered as non-negative two-decimal magnitudes — the document itself
//! carries the sign, the QR does not.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use qrcode::render::svg;
use qrcode::{EcLevel, QrCode};

use crate::core::{CanonicalDocument, FatooraError, format_amount};

/// Seller name.
pub const TAG_SELLER_NAME: u8 = 1;
/// Seller VAT registration number.
pub const TAG_SELLER_TAX_NUMBER: u8 = 2;
/// Issue timestamp, ISO 8601 UTC.
pub const TAG_TIMESTAMP: u8 = 3;
/// Total including VAT (non-negative magnitude).
pub const TAG_TOTAL_WITH_VAT: u8 = 4;
/// VAT total (non-negative magnitude).
pub const TAG_VAT_TOTAL: u8 = 5;
/// Document hash, when present.
pub const TAG_HASH: u8 = 6;
/// Digital signature value, when present.
pub const TAG_SIGNATURE: u8 = 7;
/// Document-kind literal, credit notes only.
pub const TAG_DOCUMENT_KIND: u8 = 8;
/// Original invoice reference, credit notes only.
pub const TAG_ORIGINAL_REFERENCE: u8 = 9;

/// The literal emitted under [`TAG_DOCUMENT_KIND`].
pub const CREDIT_NOTE_MARKER: &str = "CreditNote";

/// Encode the QR subset of a canonical document as a TLV byte stream.
///
/// Tags are emitted in ascending order; tags 6–9 only when their source
/// value is present. Values longer than 255 bytes are rejected — a 1-byte
/// length field must never silently overflow.
pub fn encode_tlv(
    doc: &CanonicalDocument,
    hash: Option<&str>,
    signature: Option<&str>,
) -> Result<Vec<u8>, FatooraError> {
    let mut out = Vec::new();

    let seller_name = doc.seller.name.as_deref().unwrap_or("");
    let seller_tax = doc.seller.tax_number.as_deref().unwrap_or("");

    push_tlv(&mut out, TAG_SELLER_NAME, seller_name)?;
    push_tlv(&mut out, TAG_SELLER_TAX_NUMBER, seller_tax)?;
    push_tlv(&mut out, TAG_TIMESTAMP, &doc.issue_timestamp())?;
    // Credit notes carry negative totals; the QR always shows magnitudes.
    push_tlv(&mut out, TAG_TOTAL_WITH_VAT, &format_amount(doc.total_including_vat.abs()))?;
    push_tlv(&mut out, TAG_VAT_TOTAL, &format_amount(doc.total_vat.abs()))?;

    if let Some(hash) = hash {
        push_tlv(&mut out, TAG_HASH, hash)?;
    }
    if let Some(signature) = signature {
        push_tlv(&mut out, TAG_SIGNATURE, signature)?;
    }
    if doc.is_credit_note {
        push_tlv(&mut out, TAG_DOCUMENT_KIND, CREDIT_NOTE_MARKER)?;
        if let Some(reference) = &doc.billing_reference {
            push_tlv(&mut out, TAG_ORIGINAL_REFERENCE, &reference.number)?;
        }
    }

    Ok(out)
}

fn push_tlv(out: &mut Vec<u8>, tag: u8, value: &str) -> Result<(), FatooraError> {
    let bytes = value.as_bytes();
    if bytes.len() > u8::MAX as usize {
        return Err(FatooraError::Qr(format!(
            "TLV value for tag {tag} is {} bytes, above the 255-byte limit",
            bytes.len()
        )));
    }
    out.push(tag);
    out.push(bytes.len() as u8);
    out.extend_from_slice(bytes);
    Ok(())
}

/// Decode a TLV byte stream back into `(tag, value)` pairs.
///
/// Truncated streams (a length prefix pointing past the end) are an error.
pub fn decode_tlv(bytes: &[u8]) -> Result<Vec<(u8, Vec<u8>)>, FatooraError> {
    let mut records = Vec::new();
    let mut pos = 0;
    while pos < bytes.len() {
        if pos + 2 > bytes.len() {
            return Err(FatooraError::Qr("truncated TLV header".into()));
        }
        let tag = bytes[pos];
        let len = bytes[pos + 1] as usize;
        pos += 2;
        if pos + len > bytes.len() {
            return Err(FatooraError::Qr(format!(
                "truncated TLV value for tag {tag}: {len} bytes declared, {} available",
                bytes.len() - pos
            )));
        }
        records.push((tag, bytes[pos..pos + len].to_vec()));
        pos += len;
    }
    Ok(records)
}

/// Encode the document's TLV payload and render it as a scannable QR code,
/// returned as a base64 `data:` URI for storage and display.
pub fn generate_qr(
    doc: &CanonicalDocument,
    hash: Option<&str>,
    signature: Option<&str>,
) -> Result<String, FatooraError> {
    let tlv = encode_tlv(doc, hash, signature)?;
    render_qr(&tlv)
}

/// Render an arbitrary binary payload as a QR image (error correction M,
/// ~200 px SVG) and base64-encode it.
pub fn render_qr(payload: &[u8]) -> Result<String, FatooraError> {
    let code = QrCode::with_error_correction_level(payload, EcLevel::M)
        .map_err(|e| FatooraError::Qr(format!("QR rendering failed: {e}")))?;
    let image = code
        .render::<svg::Color>()
        .min_dimensions(200, 200)
        .build();
    Ok(format!(
        "data:image/svg+xml;base64,{}",
        BASE64.encode(image.as_bytes())
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn oversize_value_is_rejected() {
        let mut out = Vec::new();
        let long = "x".repeat(256);
        let err = push_tlv(&mut out, 1, &long).unwrap_err();
        assert!(matches!(err, FatooraError::Qr(_)));
        assert!(out.is_empty());
    }

    #[test]
    fn decode_rejects_truncated_stream() {
        // Tag 1, declared length 10, only 2 value bytes.
        let bytes = [1u8, 10, 0x41, 0x42];
        assert!(matches!(decode_tlv(&bytes), Err(FatooraError::Qr(_))));
    }

    #[test]
    fn max_length_value_round_trips() {
        let mut out = Vec::new();
        let value = "y".repeat(255);
        push_tlv(&mut out, 7, &value).unwrap();
        let decoded = decode_tlv(&out).unwrap();
        assert_eq!(decoded.len(), 1);
        assert_eq!(decoded[0].0, 7);
        assert_eq!(decoded[0].1.len(), 255);
    }
}
