//! Certificate and signature management.
//!
//! Key material lives per environment: sandbox material comes straight from
//! configuration (inline PEM or file paths), production material is
//! persisted under the configured certificate directory. The manager owns
//! all key handling — callers get `sign_xml`, never raw keys.
//!
//! Signing is the most safety-critical operation in the crate: every input
//! is validated before any output is assembled, so a failure can never
//! yield a partially-signed document.

mod xmldsig;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::{DateTime, Utc};
use p256::ecdsa::SigningKey;
use p256::pkcs8::{DecodePrivateKey, EncodePrivateKey, LineEnding};
use rand_core::OsRng;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use x509_parser::pem::parse_x509_pem;
use x509_parser::prelude::*;

use crate::core::{Environment, FatooraConfig, FatooraError, Organization, SandboxCredentials};

pub use xmldsig::SignedXml;

/// Which certificate a stored file belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CertificateKind {
    /// Compliance (CSID onboarding) certificate.
    Compliance,
    /// Production certificate.
    Production,
}

impl CertificateKind {
    fn certificate_file(&self) -> &'static str {
        match self {
            Self::Compliance => "compliance_certificate.pem",
            Self::Production => "certificate.pem",
        }
    }

    fn id_file(&self) -> &'static str {
        match self {
            Self::Compliance => "compliance_certificate_id.txt",
            Self::Production => "production_certificate_id.txt",
        }
    }
}

/// Optional DN fields for CSR generation. Organization name and tax number
/// fall back to the configured organization.
#[derive(Debug, Clone, Default)]
pub struct CsrOptions {
    pub organization_name: Option<String>,
    pub tax_number: Option<String>,
    pub org_unit: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
}

/// Result of CSR generation: the material plus a correlation id for the
/// authority's onboarding flow.
#[derive(Debug, Clone)]
pub struct CsrBundle {
    pub csr_pem: String,
    pub private_key_pem: String,
    pub compliance_request_id: String,
}

/// Key and certificate material resolved for the active environment.
#[derive(Debug, Clone)]
pub struct CertificateData {
    pub private_key: String,
    pub certificate: String,
    pub certificate_id: String,
}

/// Pure validation result for a certificate — no mutation, no persistence.
#[derive(Debug, Clone)]
pub struct CertificateReport {
    pub valid: bool,
    pub expired: bool,
    pub not_yet_valid: bool,
    pub subject: String,
    pub issuer: String,
    pub valid_from: DateTime<Utc>,
    pub valid_to: DateTime<Utc>,
    pub certificate_id: String,
}

struct ParsedCertificate {
    certificate_id: String,
    subject: String,
    issuer: String,
    valid_from: DateTime<Utc>,
    valid_to: DateTime<Utc>,
}

/// Manages key/certificate material and produces enveloped XML signatures.
#[derive(Debug, Clone)]
pub struct CertificateManager {
    environment: Environment,
    sandbox: SandboxCredentials,
    path: PathBuf,
    organization: Organization,
}

impl CertificateManager {
    pub fn new(config: &FatooraConfig) -> Self {
        Self {
            environment: config.environment,
            sandbox: config.sandbox.clone(),
            path: config.certificate_path.clone(),
            organization: config.organization.clone(),
        }
    }

    /// Generate a P-256 keypair and a certificate signing request carrying
    /// the organization identity; the VAT registration number goes into the
    /// DN serialNumber field as the authority requires. Key and CSR are
    /// persisted under the certificate directory.
    pub fn generate_request(&self, opts: &CsrOptions) -> Result<CsrBundle, FatooraError> {
        let org_name = opts
            .organization_name
            .clone()
            .or_else(|| non_empty(&self.organization.name))
            .ok_or_else(|| FatooraError::Config("organization name is required".into()))?;
        let tax_number = opts
            .tax_number
            .clone()
            .or_else(|| non_empty(&self.organization.tax_number))
            .ok_or_else(|| FatooraError::Config("organization tax number is required".into()))?;

        let signing_key = SigningKey::random(&mut OsRng);
        let private_key_pem = signing_key
            .to_pkcs8_pem(LineEnding::LF)
            .map_err(|e| FatooraError::Signing(format!("private key export failed: {e}")))?
            .to_string();

        let key_pair = rcgen::KeyPair::from_pem(&private_key_pem)
            .map_err(|e| FatooraError::Signing(format!("key pair load failed: {e}")))?;

        let mut dn = rcgen::DistinguishedName::new();
        dn.push(rcgen::DnType::CommonName, org_name.as_str());
        dn.push(rcgen::DnType::OrganizationName, org_name.as_str());
        dn.push(
            rcgen::DnType::OrganizationalUnitName,
            opts.org_unit.as_deref().unwrap_or("IT Department"),
        );
        dn.push(rcgen::DnType::CountryName, "SA");
        dn.push(
            rcgen::DnType::LocalityName,
            opts.city.as_deref().unwrap_or("Riyadh"),
        );
        dn.push(
            rcgen::DnType::StateOrProvinceName,
            opts.state.as_deref().unwrap_or("Riyadh"),
        );
        // serialNumber (OID 2.5.4.5) must carry the VAT registration number.
        dn.push(rcgen::DnType::CustomDnType(vec![2, 5, 4, 5]), tax_number.as_str());

        let mut params = rcgen::CertificateParams::default();
        params.distinguished_name = dn;

        let csr_pem = params
            .serialize_request(&key_pair)
            .and_then(|csr| csr.pem())
            .map_err(|e| FatooraError::Signing(format!("CSR generation failed: {e}")))?;

        self.write_file("private.key", &private_key_pem)?;
        self.write_file("certificate.csr", &csr_pem)?;

        let compliance_request_id = hex::encode(Sha256::digest(
            format!("{csr_pem}{}", Utc::now().to_rfc3339()).as_bytes(),
        ));
        self.write_file("compliance_request_id.txt", &compliance_request_id)?;

        tracing::info!(organization = %org_name, "generated certificate signing request");

        Ok(CsrBundle {
            csr_pem,
            private_key_pem,
            compliance_request_id,
        })
    }

    /// Persist a certificate received from the authority, extracting its
    /// serial number as the certificate id. Returns the extracted id.
    pub fn save_certificate(
        &self,
        content: &str,
        kind: CertificateKind,
    ) -> Result<String, FatooraError> {
        let parsed = parse_certificate(content)?;
        self.write_file(kind.certificate_file(), content)?;
        self.write_file(kind.id_file(), &parsed.certificate_id)?;
        tracing::info!(kind = ?kind, certificate_id = %parsed.certificate_id, "saved certificate");
        Ok(parsed.certificate_id)
    }

    /// Validate a certificate against the current time. Pure — nothing is
    /// persisted or mutated.
    pub fn verify_certificate(&self, content: &str) -> Result<CertificateReport, FatooraError> {
        let parsed = parse_certificate(content)?;
        let now = Utc::now();
        let expired = now > parsed.valid_to;
        let not_yet_valid = now < parsed.valid_from;
        Ok(CertificateReport {
            valid: !expired && !not_yet_valid,
            expired,
            not_yet_valid,
            subject: parsed.subject,
            issuer: parsed.issuer,
            valid_from: parsed.valid_from,
            valid_to: parsed.valid_to,
            certificate_id: parsed.certificate_id,
        })
    }

    /// Validate the stored certificate of the given kind.
    pub fn certificate_info(&self, kind: CertificateKind) -> Result<CertificateReport, FatooraError> {
        let path = self.path.join(kind.certificate_file());
        let content = fs::read_to_string(&path).map_err(|e| {
            FatooraError::InvalidCertificate(format!("{}: {e}", path.display()))
        })?;
        self.verify_certificate(&content)
    }

    /// Resolve key/certificate material for the active environment.
    pub fn certificate_data(&self) -> Result<CertificateData, FatooraError> {
        match self.environment {
            Environment::Sandbox => self.sandbox_certificate_data(),
            Environment::Production => self.production_certificate_data(),
        }
    }

    fn sandbox_certificate_data(&self) -> Result<CertificateData, FatooraError> {
        let (Some(certificate), Some(private_key), Some(certificate_id)) = (
            self.sandbox.certificate.as_deref(),
            self.sandbox.private_key.as_deref(),
            self.sandbox.certificate_id.as_deref(),
        ) else {
            return Err(FatooraError::Signing(
                "sandbox certificate material is not configured".into(),
            ));
        };
        Ok(CertificateData {
            private_key: read_inline_or_path(private_key)?,
            certificate: read_inline_or_path(certificate)?,
            certificate_id: certificate_id.to_string(),
        })
    }

    fn production_certificate_data(&self) -> Result<CertificateData, FatooraError> {
        let key_path = self.path.join("private.key");
        let cert_path = self.path.join(CertificateKind::Production.certificate_file());
        let id_path = self.path.join(CertificateKind::Production.id_file());

        let private_key = fs::read_to_string(&key_path).map_err(|_| {
            FatooraError::Signing(format!("private key not found at {}", key_path.display()))
        })?;
        let certificate = fs::read_to_string(&cert_path).map_err(|_| {
            FatooraError::Signing(format!("certificate not found at {}", cert_path.display()))
        })?;
        let certificate_id = match fs::read_to_string(&id_path) {
            Ok(id) => id.trim().to_string(),
            Err(_) => parse_certificate(&certificate)
                .map_err(|e| FatooraError::Signing(e.to_string()))?
                .certificate_id,
        };

        Ok(CertificateData {
            private_key,
            certificate,
            certificate_id,
        })
    }

    /// Sign a document with an enveloped XML signature appended as the last
    /// child of the root element.
    ///
    /// Fails with [`FatooraError::Signing`] when key or certificate material
    /// is missing or malformed; no partially-signed output is ever produced.
    pub fn sign_xml(&self, xml: &str) -> Result<SignedXml, FatooraError> {
        let data = self.certificate_data()?;

        let signing_key = SigningKey::from_pkcs8_pem(&data.private_key)
            .map_err(|e| FatooraError::Signing(format!("private key load failed: {e}")))?;

        // Validate the certificate up front so malformed material fails the
        // whole operation before any output exists.
        parse_certificate(&data.certificate)
            .map_err(|e| FatooraError::Signing(format!("certificate rejected: {e}")))?;

        let signed = xmldsig::sign_enveloped(xml, &signing_key, &data.certificate)?;
        tracing::info!(digest = %signed.digest_value, "signed document XML");
        Ok(signed)
    }

    fn write_file(&self, name: &str, content: &str) -> Result<(), FatooraError> {
        fs::create_dir_all(&self.path)
            .map_err(|e| FatooraError::Signing(format!("{}: {e}", self.path.display())))?;
        let path = self.path.join(name);
        fs::write(&path, content)
            .map_err(|e| FatooraError::Signing(format!("{}: {e}", path.display())))
    }
}

/// Sandbox configuration values may be inline PEM or a file path; paths are
/// resolved when the material is read.
fn read_inline_or_path(value: &str) -> Result<String, FatooraError> {
    if Path::new(value).is_file() {
        fs::read_to_string(value)
            .map_err(|e| FatooraError::Signing(format!("{value}: {e}")))
    } else {
        Ok(value.to_string())
    }
}

/// Parse a certificate from PEM or raw base64 DER and extract the fields
/// the rest of the crate needs, as owned values.
fn parse_certificate(content: &str) -> Result<ParsedCertificate, FatooraError> {
    let der = if content.contains("-----BEGIN") {
        let (_, pem) = parse_x509_pem(content.as_bytes())
            .map_err(|e| FatooraError::InvalidCertificate(format!("PEM parse failed: {e:?}")))?;
        pem.contents
    } else {
        let compact: String = content.split_whitespace().collect();
        BASE64
            .decode(compact.as_bytes())
            .map_err(|e| FatooraError::InvalidCertificate(format!("base64 decode failed: {e}")))?
    };

    let (_, cert) = X509Certificate::from_der(&der)
        .map_err(|e| FatooraError::InvalidCertificate(format!("X.509 parse failed: {e:?}")))?;

    let serial = cert.tbs_certificate.raw_serial();
    if serial.is_empty() {
        return Err(FatooraError::InvalidCertificate(
            "certificate carries no serial number".into(),
        ));
    }

    let valid_from = DateTime::from_timestamp(cert.validity().not_before.timestamp(), 0)
        .ok_or_else(|| FatooraError::InvalidCertificate("invalid notBefore".into()))?;
    let valid_to = DateTime::from_timestamp(cert.validity().not_after.timestamp(), 0)
        .ok_or_else(|| FatooraError::InvalidCertificate("invalid notAfter".into()))?;

    Ok(ParsedCertificate {
        certificate_id: hex::encode(serial),
        subject: cert.subject().to_string(),
        issuer: cert.issuer().to_string(),
        valid_from,
        valid_to,
    })
}

fn non_empty(s: &str) -> Option<String> {
    if s.is_empty() { None } else { Some(s.to_string()) }
}
