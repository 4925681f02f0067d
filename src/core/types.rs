use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Format a monetary amount as a fixed-point string with exactly two
/// decimal places, the rendering both the XML schema and the QR payload
/// require.
pub fn format_amount(d: Decimal) -> String {
    format!("{:.2}", d.round_dp(2))
}

/// UNTDID 1001 — document type codes used by the authority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DocumentTypeCode {
    /// 388 — Standard tax invoice.
    Invoice,
    /// 381 — Credit note.
    CreditNote,
    /// 383 — Debit note.
    DebitNote,
}

impl DocumentTypeCode {
    /// UNTDID 1001 code as transmitted in the XML.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Invoice => "388",
            Self::CreditNote => "381",
            Self::DebitNote => "383",
        }
    }

    /// Parse from a UNTDID 1001 code string.
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "388" => Some(Self::Invoice),
            "381" => Some(Self::CreditNote),
            "383" => Some(Self::DebitNote),
            _ => None,
        }
    }
}

/// UNTDID 5305 — tax category codes (ZATCA subset).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaxCategory {
    /// S — Standard rate (15%).
    StandardRate,
    /// Z — Zero rated.
    ZeroRated,
    /// E — Exempt from tax.
    Exempt,
    /// O — Out of scope / not subject to VAT.
    OutOfScope,
}

impl TaxCategory {
    /// UNTDID 5305 code letter.
    pub fn code(&self) -> &'static str {
        match self {
            Self::StandardRate => "S",
            Self::ZeroRated => "Z",
            Self::Exempt => "E",
            Self::OutOfScope => "O",
        }
    }

    /// Parse from a UNTDID 5305 code string.
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "S" => Some(Self::StandardRate),
            "Z" => Some(Self::ZeroRated),
            "E" => Some(Self::Exempt),
            "O" => Some(Self::OutOfScope),
            _ => None,
        }
    }
}

/// Seller or buyer party with its postal address parts.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Party {
    pub name: Option<String>,
    /// VAT registration number.
    pub tax_number: Option<String>,
    pub street: Option<String>,
    pub building_number: Option<String>,
    pub city: Option<String>,
    pub postal_code: Option<String>,
    pub district: Option<String>,
    pub additional_number: Option<String>,
    /// ISO 3166-1 alpha-2; defaults to "SA".
    pub country_code: String,
}

/// One canonical line item.
///
/// On credit notes the quantity is sign-flipped during mapping so the line
/// extension amount (price × quantity) follows it to a non-positive value in
/// lockstep; the unit price itself stays positive.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CanonicalLine {
    pub name: String,
    pub quantity: Decimal,
    /// UNECE Rec 20 unit code, e.g. "EA".
    pub unit_code: String,
    pub unit_price: Decimal,
    /// Unit price including VAT, when the source carries it.
    pub price_inclusive: Option<Decimal>,
    pub discount: Decimal,
    pub discount_reason: Option<String>,
    pub tax_category: TaxCategory,
    pub tax_rate: Decimal,
    pub tax_amount: Option<Decimal>,
}

impl CanonicalLine {
    /// Line extension amount: unit price × quantity (signs already
    /// normalized upstream).
    pub fn extension_amount(&self) -> Decimal {
        self.unit_price * self.quantity
    }
}

/// Reference from a credit note to the invoice it corrects.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BillingReference {
    /// Original invoice number. Required — a credit note without it fails
    /// mapping.
    pub number: String,
    /// Original submission UUID, when resolvable.
    pub uuid: Option<String>,
    /// Original issue date, when resolvable.
    pub issue_date: Option<NaiveDate>,
}

/// The canonical projection of a source record: one fixed shape regardless
/// of how the source system stores its invoices.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CanonicalDocument {
    /// Document number (source identity, not generated).
    pub number: String,
    /// Submission UUID. Assigned by the orchestrator per attempt, absent
    /// until then.
    pub uuid: Option<String>,
    pub type_code: DocumentTypeCode,
    pub is_credit_note: bool,
    pub issue_date: NaiveDate,
    pub issue_time: NaiveTime,
    /// ISO 4217; defaults to "SAR".
    pub currency_code: String,
    /// Sequential invoice counter value, when mapped.
    pub counter_value: Option<String>,
    pub note: Option<String>,
    pub supply_date: Option<NaiveDate>,
    pub supply_end_date: Option<NaiveDate>,
    pub seller: Party,
    pub buyer: Option<Party>,
    pub lines: Vec<CanonicalLine>,
    pub total_excluding_vat: Decimal,
    pub total_including_vat: Decimal,
    pub total_vat: Decimal,
    pub total_discount: Decimal,
    /// Present exactly when `is_credit_note`.
    pub billing_reference: Option<BillingReference>,
}

impl CanonicalDocument {
    /// Issue instant as an ISO 8601 UTC timestamp (QR tag 3).
    pub fn issue_timestamp(&self) -> String {
        format!(
            "{}T{}Z",
            self.issue_date.format("%Y-%m-%d"),
            self.issue_time.format("%H:%M:%S")
        )
    }
}

/// Submission lifecycle status as mirrored from the authority.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SubmissionStatus {
    #[default]
    Unsubmitted,
    Reported,
    Cleared,
    Failed,
}

impl std::fmt::Display for SubmissionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Unsubmitted => "UNSUBMITTED",
            Self::Reported => "REPORTED",
            Self::Cleared => "CLEARED",
            Self::Failed => "FAILED",
        };
        write!(f, "{s}")
    }
}

impl SubmissionStatus {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "UNSUBMITTED" => Some(Self::Unsubmitted),
            "REPORTED" => Some(Self::Reported),
            "CLEARED" => Some(Self::Cleared),
            "FAILED" | "REJECTED" => Some(Self::Failed),
            _ => None,
        }
    }
}

/// Compliance state attached 1:1 to a record, owned separately from the
/// business data and mutated only by the submission orchestrator.
///
/// Transitions are monotonic except that failure can occur from any state,
/// and a failed document may be re-submitted (FAILED → REPORTED/CLEARED).
/// Nothing transitions out of REPORTED or CLEARED except an explicit new
/// `report`/`clear` call.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SubmissionState {
    pub status: SubmissionStatus,
    /// Last authority response payload.
    pub response: Option<Value>,
    /// Last error payload.
    pub errors: Option<Value>,
    pub reported_at: Option<DateTime<Utc>>,
    pub cleared_at: Option<DateTime<Utc>>,
    /// UUID of the latest submission attempt.
    pub uuid: Option<String>,
    /// SHA-256 content hash of the signed XML, base64.
    pub hash: Option<String>,
    /// Correlation id returned when the CSR was generated.
    pub compliance_request_id: Option<String>,
    /// QR code as a base64 data URI.
    pub qr_code: Option<String>,
    pub signed_xml: Option<String>,
}

impl SubmissionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark_reported(&mut self, response: Value) {
        self.status = SubmissionStatus::Reported;
        self.reported_at = Some(Utc::now());
        self.response = Some(response);
    }

    pub fn mark_cleared(&mut self, response: Value) {
        self.status = SubmissionStatus::Cleared;
        self.cleared_at = Some(Utc::now());
        self.response = Some(response);
    }

    pub fn mark_failed(&mut self, errors: Value) {
        self.status = SubmissionStatus::Failed;
        self.errors = Some(errors);
    }

    pub fn is_reported(&self) -> bool {
        self.reported_at.is_some()
    }

    pub fn is_cleared(&self) -> bool {
        self.cleared_at.is_some()
    }

    /// Whether this document still needs a (re-)submission: never submitted,
    /// or the last attempt failed.
    pub fn needs_submission(&self) -> bool {
        matches!(
            self.status,
            SubmissionStatus::Unsubmitted | SubmissionStatus::Failed
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn format_amount_cases() {
        use rust_decimal_macros::dec;
        assert_eq!(format_amount(dec!(100)), "100.00");
        assert_eq!(format_amount(dec!(115)), "115.00");
        assert_eq!(format_amount(dec!(49.9)), "49.90");
        assert_eq!(format_amount(dec!(-100)), "-100.00");
        assert_eq!(format_amount(dec!(0)), "0.00");
    }

    #[test]
    fn type_code_round_trip() {
        assert_eq!(DocumentTypeCode::Invoice.code(), "388");
        assert_eq!(DocumentTypeCode::from_code("381"), Some(DocumentTypeCode::CreditNote));
        assert_eq!(DocumentTypeCode::from_code("999"), None);
    }

    #[test]
    fn status_display_and_parse() {
        assert_eq!(SubmissionStatus::Reported.to_string(), "REPORTED");
        assert_eq!(SubmissionStatus::parse("cleared"), Some(SubmissionStatus::Cleared));
        assert_eq!(SubmissionStatus::parse("REJECTED"), Some(SubmissionStatus::Failed));
        assert_eq!(SubmissionStatus::parse("WEIRD"), None);
    }

    #[test]
    fn state_transitions() {
        let mut state = SubmissionState::new();
        assert!(state.needs_submission());

        state.mark_failed(json!({"error": "boom"}));
        assert_eq!(state.status, SubmissionStatus::Failed);
        assert!(state.needs_submission());

        // Retry out of FAILED is allowed.
        state.mark_reported(json!({"reportingStatus": "SUBMITTED"}));
        assert_eq!(state.status, SubmissionStatus::Reported);
        assert!(state.is_reported());
        assert!(!state.needs_submission());
    }
}
