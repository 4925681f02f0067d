use super::xml_utils::{XmlResult, XmlWriter};
use super::{PROFILE_ID, UBL_VERSION, ubl_ns};
use crate::core::{CanonicalDocument, CanonicalLine, Party};
use rust_decimal::Decimal;

/// Generate the authority-schema UBL 2.1 XML for a canonical document.
///
/// Output is deterministic for identical input: the UUID comes from the
/// document (assigned by the orchestrator), never generated here.
pub fn to_ubl_xml(doc: &CanonicalDocument) -> XmlResult {
    let currency = &doc.currency_code;
    let mut w = XmlWriter::new()?;

    w.start_element_with_attrs(
        "Invoice",
        &[
            ("xmlns", ubl_ns::INVOICE),
            ("xmlns:cac", ubl_ns::CAC),
            ("xmlns:cbc", ubl_ns::CBC),
            ("xmlns:ext", ubl_ns::EXT),
        ],
    )?;

    w.text_element("cbc:UBLVersionID", UBL_VERSION)?;
    w.text_element("cbc:ProfileID", PROFILE_ID)?;
    w.text_element("cbc:ID", &doc.number)?;
    w.text_element("cbc:UUID", doc.uuid.as_deref().unwrap_or(""))?;
    w.text_element("cbc:IssueDate", &doc.issue_date.format("%Y-%m-%d").to_string())?;
    w.text_element("cbc:IssueTime", &doc.issue_time.format("%H:%M:%S").to_string())?;
    w.text_element("cbc:InvoiceTypeCode", doc.type_code.code())?;
    if let Some(note) = &doc.note {
        w.text_element("cbc:Note", note)?;
    }
    w.text_element("cbc:DocumentCurrencyCode", currency)?;
    w.text_element("cbc:TaxCurrencyCode", "SAR")?;
    if let Some(supply_date) = &doc.supply_date {
        w.text_element("cbc:TaxPointDate", &supply_date.format("%Y-%m-%d").to_string())?;
    }

    // Credit notes reference the invoice they correct.
    if let Some(reference) = &doc.billing_reference {
        w.start_element("cac:BillingReference")?;
        w.start_element("cac:InvoiceDocumentReference")?;
        w.text_element("cbc:ID", &reference.number)?;
        w.text_element("cbc:UUID", reference.uuid.as_deref().unwrap_or(""))?;
        w.text_element(
            "cbc:IssueDate",
            &reference
                .issue_date
                .map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_default(),
        )?;
        w.end_element("cac:InvoiceDocumentReference")?;
        w.end_element("cac:BillingReference")?;
    }

    write_party(&mut w, &doc.seller, "cac:AccountingSupplierParty")?;
    let buyer = doc.buyer.clone().unwrap_or_else(|| Party {
        country_code: "SA".into(),
        ..Party::default()
    });
    write_party(&mut w, &buyer, "cac:AccountingCustomerParty")?;

    // Tax total
    w.start_element("cac:TaxTotal")?;
    w.amount_element("cbc:TaxAmount", doc.total_vat, currency)?;
    w.end_element("cac:TaxTotal")?;

    // Legal monetary total
    w.start_element("cac:LegalMonetaryTotal")?;
    w.amount_element("cbc:LineExtensionAmount", doc.total_excluding_vat, currency)?;
    w.amount_element("cbc:TaxExclusiveAmount", doc.total_excluding_vat, currency)?;
    w.amount_element("cbc:TaxInclusiveAmount", doc.total_including_vat, currency)?;
    if doc.total_discount != Decimal::ZERO {
        w.amount_element("cbc:AllowanceTotalAmount", doc.total_discount.abs(), currency)?;
    }
    w.amount_element("cbc:PayableAmount", doc.total_including_vat, currency)?;
    w.end_element("cac:LegalMonetaryTotal")?;

    // Lines carry a 1-based sequential id, never a source identifier.
    for (index, line) in doc.lines.iter().enumerate() {
        write_line(&mut w, line, index + 1, currency)?;
    }

    w.end_element("Invoice")?;
    w.into_string()
}

fn write_party(w: &mut XmlWriter, party: &Party, wrapper: &str) -> Result<(), crate::core::FatooraError> {
    w.start_element(wrapper)?;
    w.start_element("cac:Party")?;

    w.start_element("cac:PartyIdentification")?;
    w.text_element("cbc:ID", party.tax_number.as_deref().unwrap_or(""))?;
    w.end_element("cac:PartyIdentification")?;

    w.start_element("cac:PartyName")?;
    w.text_element("cbc:Name", party.name.as_deref().unwrap_or(""))?;
    w.end_element("cac:PartyName")?;

    w.start_element("cac:PostalAddress")?;
    w.text_element("cbc:StreetName", party.street.as_deref().unwrap_or(""))?;
    w.text_element("cbc:BuildingNumber", party.building_number.as_deref().unwrap_or(""))?;
    w.text_element("cbc:CityName", party.city.as_deref().unwrap_or(""))?;
    w.text_element("cbc:PostalZone", party.postal_code.as_deref().unwrap_or(""))?;
    w.text_element("cbc:CountrySubentity", party.district.as_deref().unwrap_or(""))?;
    w.start_element("cac:Country")?;
    w.text_element("cbc:IdentificationCode", &party.country_code)?;
    w.end_element("cac:Country")?;
    w.end_element("cac:PostalAddress")?;

    w.start_element("cac:PartyTaxScheme")?;
    w.text_element("cbc:CompanyID", party.tax_number.as_deref().unwrap_or(""))?;
    w.start_element("cac:TaxScheme")?;
    w.text_element("cbc:ID", "VAT")?;
    w.end_element("cac:TaxScheme")?;
    w.end_element("cac:PartyTaxScheme")?;

    w.start_element("cac:PartyLegalEntity")?;
    w.text_element("cbc:RegistrationName", party.name.as_deref().unwrap_or(""))?;
    w.end_element("cac:PartyLegalEntity")?;

    w.end_element("cac:Party")?;
    w.end_element(wrapper)?;
    Ok(())
}

fn write_line(
    w: &mut XmlWriter,
    line: &CanonicalLine,
    id: usize,
    currency: &str,
) -> Result<(), crate::core::FatooraError> {
    w.start_element("cac:InvoiceLine")?;
    w.text_element("cbc:ID", &id.to_string())?;
    w.quantity_element("cbc:InvoicedQuantity", line.quantity, &line.unit_code)?;
    w.amount_element("cbc:LineExtensionAmount", line.extension_amount(), currency)?;

    if line.discount != Decimal::ZERO {
        w.start_element("cac:AllowanceCharge")?;
        w.text_element("cbc:ChargeIndicator", "false")?;
        w.text_element(
            "cbc:AllowanceChargeReason",
            line.discount_reason.as_deref().unwrap_or("Discount"),
        )?;
        w.amount_element("cbc:Amount", line.discount, currency)?;
        w.end_element("cac:AllowanceCharge")?;
    }

    w.start_element("cac:Item")?;
    w.text_element("cbc:Name", &line.name)?;
    w.start_element("cac:ClassifiedTaxCategory")?;
    w.text_element("cbc:ID", line.tax_category.code())?;
    w.text_element("cbc:Percent", &line.tax_rate.normalize().to_string())?;
    w.start_element("cac:TaxScheme")?;
    w.text_element("cbc:ID", "VAT")?;
    w.end_element("cac:TaxScheme")?;
    w.end_element("cac:ClassifiedTaxCategory")?;
    w.end_element("cac:Item")?;

    w.start_element("cac:Price")?;
    w.amount_element("cbc:PriceAmount", line.unit_price, currency)?;
    w.end_element("cac:Price")?;

    w.end_element("cac:InvoiceLine")?;
    Ok(())
}
