use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::classify::ClassifierStrategy;
use super::error::FatooraError;

/// Which authority environment requests go to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Sandbox,
    Production,
}

/// Endpoint set for one environment. Paths are relative to `base_url`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointConfig {
    pub base_url: String,
    pub compliance_url: String,
    pub reporting_url: String,
    pub clearance_url: String,
    pub status_url: String,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            base_url: "https://gw-apic-gov.gazt.gov.sa/e-invoicing/developer-portal".into(),
            compliance_url: "/compliance".into(),
            reporting_url: "/invoices/reporting/single".into(),
            clearance_url: "/invoices/clearance/single".into(),
            status_url: "/invoices/status".into(),
        }
    }
}

impl EndpointConfig {
    fn sandbox() -> Self {
        Self {
            base_url: "https://gw-apic-gov.gazt.gov.sa/e-invoicing/developer-portal/sandbox"
                .into(),
            ..Self::default()
        }
    }

    pub fn reporting_endpoint(&self) -> String {
        format!("{}{}", self.base_url, self.reporting_url)
    }

    pub fn clearance_endpoint(&self) -> String {
        format!("{}{}", self.base_url, self.clearance_url)
    }

    pub fn status_endpoint(&self) -> String {
        format!("{}{}", self.base_url, self.status_url)
    }

    pub fn compliance_endpoint(&self) -> String {
        format!("{}{}", self.base_url, self.compliance_url)
    }
}

/// Endpoint sets for both environments.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Environments {
    pub sandbox: EndpointConfig,
    pub production: EndpointConfig,
}

impl Default for Environments {
    fn default() -> Self {
        Self {
            sandbox: EndpointConfig::sandbox(),
            production: EndpointConfig::default(),
        }
    }
}

/// Sandbox credentials. Certificate and private key accept either inline PEM
/// content or a file path, resolved when the material is read.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SandboxCredentials {
    pub certificate: Option<String>,
    pub private_key: Option<String>,
    pub certificate_id: Option<String>,
    /// Shared secret for the Basic-auth header.
    pub pih: String,
}

/// Organization identity used as the fallback seller and for CSR generation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Organization {
    pub name: String,
    pub tax_number: String,
}

/// How credit notes link back to the invoices they correct.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReferenceConfig {
    /// Path to the original invoice number.
    pub number_reference: String,
    /// Path to the original submission UUID.
    pub uuid_reference: String,
    /// Path to the original issue date.
    pub date_reference: String,
}

impl Default for ReferenceConfig {
    fn default() -> Self {
        Self {
            number_reference: "originalInvoice.number".into(),
            uuid_reference: "originalInvoice.submission_uuid".into(),
            date_reference: "originalInvoice.issue_date".into(),
        }
    }
}

/// Credit-note identification and reference configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CreditNoteConfig {
    pub identification: ClassifierStrategy,
    pub reference: ReferenceConfig,
}

/// Retry policy for authority calls: transport failures retry with the
/// configured backoff delays before the attempt is marked failed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    /// Backoff delay (seconds) before retry N; the last entry repeats.
    pub backoff_secs: Vec<u64>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_secs: vec![30, 60, 120],
        }
    }
}

impl RetryPolicy {
    /// Delay before the given zero-based retry.
    pub fn delay_secs(&self, attempt: u32) -> u64 {
        match self.backoff_secs.get(attempt as usize) {
            Some(d) => *d,
            None => self.backoff_secs.last().copied().unwrap_or(0),
        }
    }

    /// A policy that never waits — for tests.
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            backoff_secs: vec![0],
        }
    }
}

/// Ordered mapping from canonical field name to source path. A `None` path
/// means the field is not mapped and its documented default (if any)
/// applies. The shipped default mirrors a conventional invoicing schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldMap {
    // Basic document information
    pub invoice_number: Option<String>,
    pub invoice_type: Option<String>,
    pub issue_date: Option<String>,
    pub issue_time: Option<String>,
    pub invoice_currency_code: Option<String>,
    pub invoice_counter_value: Option<String>,

    // Seller information (falls back to the configured organization)
    pub seller_name: Option<String>,
    pub seller_tax_number: Option<String>,
    pub seller_street: Option<String>,
    pub seller_building_number: Option<String>,
    pub seller_postal_code: Option<String>,
    pub seller_city: Option<String>,
    pub seller_district: Option<String>,
    pub seller_additional_number: Option<String>,
    pub seller_country_code: Option<String>,

    // Buyer information
    pub buyer_name: Option<String>,
    pub buyer_tax_number: Option<String>,
    pub buyer_street: Option<String>,
    pub buyer_building_number: Option<String>,
    pub buyer_postal_code: Option<String>,
    pub buyer_city: Option<String>,
    pub buyer_district: Option<String>,
    pub buyer_additional_number: Option<String>,
    pub buyer_country_code: Option<String>,

    // Line items: path to the collection, then per-item paths
    pub line_items: Option<String>,
    pub item_name: Option<String>,
    pub item_quantity: Option<String>,
    pub item_unit_code: Option<String>,
    pub item_price: Option<String>,
    pub item_price_inclusive: Option<String>,
    pub item_discount: Option<String>,
    pub item_discount_reason: Option<String>,
    pub item_tax_category: Option<String>,
    pub item_tax_rate: Option<String>,
    pub item_tax_amount: Option<String>,

    // Summary information
    pub total_excluding_vat: Option<String>,
    pub total_including_vat: Option<String>,
    pub total_vat: Option<String>,
    pub total_discount: Option<String>,

    // Additional fields
    pub supply_date: Option<String>,
    pub supply_end_date: Option<String>,
    pub invoice_note: Option<String>,
}

impl Default for FieldMap {
    fn default() -> Self {
        Self {
            invoice_number: Some("number".into()),
            invoice_type: Some("type_code".into()),
            issue_date: Some("created_at".into()),
            issue_time: Some("created_at".into()),
            invoice_currency_code: Some("currency_code".into()),
            invoice_counter_value: Some("id".into()),

            seller_name: None,
            seller_tax_number: None,
            seller_street: Some("seller_street".into()),
            seller_building_number: Some("seller_building_number".into()),
            seller_postal_code: Some("seller_postal_code".into()),
            seller_city: Some("seller_city".into()),
            seller_district: Some("seller_district".into()),
            seller_additional_number: Some("seller_additional_number".into()),
            seller_country_code: Some("seller_country_code".into()),

            buyer_name: Some("customer.name".into()),
            buyer_tax_number: Some("customer.tax_number".into()),
            buyer_street: Some("customer.street".into()),
            buyer_building_number: Some("customer.building_number".into()),
            buyer_postal_code: Some("customer.postal_code".into()),
            buyer_city: Some("customer.city".into()),
            buyer_district: Some("customer.district".into()),
            buyer_additional_number: Some("customer.additional_number".into()),
            buyer_country_code: Some("customer.country_code".into()),

            line_items: Some("items".into()),
            item_name: Some("name".into()),
            item_quantity: Some("quantity".into()),
            item_unit_code: Some("unit".into()),
            item_price: Some("unit_price".into()),
            item_price_inclusive: Some("price_inclusive_vat".into()),
            item_discount: Some("discount_amount".into()),
            item_discount_reason: Some("discount_reason".into()),
            item_tax_category: Some("vat_category".into()),
            item_tax_rate: Some("vat_rate".into()),
            item_tax_amount: Some("vat_amount".into()),

            total_excluding_vat: Some("sub_total".into()),
            total_including_vat: Some("total".into()),
            total_vat: Some("vat_amount".into()),
            total_discount: Some("discount_amount".into()),

            supply_date: None,
            supply_end_date: None,
            invoice_note: Some("notes".into()),
        }
    }
}

/// Process-wide configuration: loaded once, shared read-only by all
/// requests.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FatooraConfig {
    pub environment: Environment,
    pub environments: Environments,
    pub sandbox: SandboxCredentials,
    /// Directory for persisted key/certificate material.
    pub certificate_path: PathBuf,
    pub organization: Organization,
    /// Production shared secret for the Basic-auth header.
    pub pih: String,
    /// Documents whose total meets this threshold need clearance rather than
    /// mere reporting.
    pub clearance_threshold: Decimal,
    pub credit_note: CreditNoteConfig,
    pub field_map: FieldMap,
    /// Per-call HTTP timeout in seconds.
    pub timeout_secs: u64,
    pub retry: RetryPolicy,
    /// Group size for batched submission.
    pub batch_size: usize,
}

impl FatooraConfig {
    /// Load configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, FatooraError> {
        toml::from_str(s).map_err(|e| FatooraError::Config(e.to_string()))
    }

    /// Load configuration from a TOML file.
    pub fn from_toml_path(path: impl AsRef<Path>) -> Result<Self, FatooraError> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| FatooraError::Config(format!("{}: {e}", path.as_ref().display())))?;
        Self::from_toml_str(&content)
    }

    pub fn is_sandbox(&self) -> bool {
        self.environment == Environment::Sandbox
    }

    /// Endpoint set for the active environment.
    pub fn endpoints(&self) -> &EndpointConfig {
        match self.environment {
            Environment::Sandbox => &self.environments.sandbox,
            Environment::Production => &self.environments.production,
        }
    }

    /// Threshold decision consumed by submission schedulers: documents at or
    /// above the clearance threshold need clearance, below it reporting
    /// suffices. Compared by magnitude so credit notes are judged by the
    /// size of the correction.
    pub fn requires_clearance(&self, total: Decimal) -> bool {
        total.abs() >= self.clearance_threshold
    }
}

impl Default for FatooraConfig {
    fn default() -> Self {
        Self {
            environment: Environment::default(),
            environments: Environments::default(),
            sandbox: SandboxCredentials::default(),
            certificate_path: PathBuf::from("certificates"),
            organization: Organization::default(),
            pih: String::new(),
            clearance_threshold: dec!(1000),
            credit_note: CreditNoteConfig::default(),
            field_map: FieldMap::default(),
            timeout_secs: 30,
            retry: RetryPolicy::default(),
            batch_size: 10,
        }
    }
}
