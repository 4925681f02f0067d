//! # fatoora
//!
//! Saudi e-invoicing (ZATCA Phase 2) library covering the full document
//! lifecycle: canonical field mapping, UBL 2.1 XML generation, enveloped XML
//! signing, TLV QR codes, and reporting/clearance against the authority API.
//!
//! All monetary values use [`rust_decimal::Decimal`] — never floating point.
//! Source records are opaque [`serde_json::Value`] trees projected into one
//! [`CanonicalDocument`](core::CanonicalDocument) shape through a configurable
//! field map, so the library never dictates your data model.
//!
//! ## Quick Start
//!
//! ```rust
//! use fatoora::core::*;
//! use rust_decimal_macros::dec;
//! use serde_json::json;
//!
//! let config = FatooraConfig::default();
//! let record = SourceRecord::from(json!({
//!     "number": "INV-2024-001",
//!     "created_at": "2024-06-15T10:30:00Z",
//!     "sub_total": "100.00",
//!     "total": "115.00",
//!     "vat_amount": "15.00",
//!     "items": [
//!         {"name": "Consulting", "quantity": 2, "unit_price": "50.00", "vat_rate": 15}
//!     ],
//! }));
//!
//! let doc = map_document(&record, &config).unwrap();
//! assert_eq!(doc.total_vat, dec!(15.00));
//! assert_eq!(doc.type_code, DocumentTypeCode::Invoice);
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `core` (default) | Field resolver, classifier, canonical mapper, submission state |
//! | `xml` | UBL 2.1 invoice/credit-note XML generation |
//! | `qr` | TLV payload encoding & QR code rendering |
//! | `sign` | Certificate management, CSR generation, enveloped XML signing |
//! | `api` | Authority client, submission orchestration, batching, callbacks |
//! | `all` | Everything |

#[cfg(feature = "core")]
pub mod core;

#[cfg(feature = "xml")]
pub mod xml;

#[cfg(feature = "qr")]
pub mod qr;

#[cfg(feature = "sign")]
pub mod sign;

#[cfg(feature = "api")]
pub mod api;

// Re-export core types at crate root for convenience
#[cfg(feature = "core")]
pub use crate::core::*;
