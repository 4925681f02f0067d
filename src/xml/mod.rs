//! UBL 2.1 XML generation for the authority schema.
//!
//! Credit notes share the `Invoice` root element — the numeric type code
//! (381) and the billing-reference block distinguish them. Monetary values
//! arrive already sign-normalized from the canonical mapper; this module
//! renders them as-is with exactly two decimal places.
//!
//! No signature is embedded here — signing is a separate step
//! (`sign::CertificateManager::sign_xml`) applied to this module's output.

mod ubl;
pub(crate) mod xml_utils;

pub use ubl::to_ubl_xml;

/// UBL 2.1 namespace URIs.
pub mod ubl_ns {
    pub const INVOICE: &str = "urn:oasis:names:specification:ubl:schema:xsd:Invoice-2";
    pub const CAC: &str =
        "urn:oasis:names:specification:ubl:schema:xsd:CommonAggregateComponents-2";
    pub const CBC: &str = "urn:oasis:names:specification:ubl:schema:xsd:CommonBasicComponents-2";
    pub const EXT: &str =
        "urn:oasis:names:specification:ubl:schema:xsd:CommonExtensionComponents-2";
}

/// Profile identifier for Phase 2 reporting (BT-23).
pub const PROFILE_ID: &str = "reporting:1.0";

/// UBL version transmitted in the header.
pub const UBL_VERSION: &str = "2.1";
