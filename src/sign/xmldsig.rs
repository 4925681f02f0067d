//! Enveloped XML digital signature assembly.
//!
//! The signature references the whole document through the
//! enveloped-signature transform: digest over the unsigned XML, ECDSA-SHA256
//! over the SignedInfo block, certificate embedded in KeyInfo, and the
//! finished `ds:Signature` appended as the last child of the root element.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use p256::ecdsa::signature::Signer;
use p256::ecdsa::{Signature, SigningKey};
use sha2::{Digest, Sha256};

use crate::core::FatooraError;

const XMLDSIG_NS: &str = "http://www.w3.org/2000/09/xmldsig#";
const C14N_METHOD: &str = "http://www.w3.org/2006/12/xml-c14n11";
const SIGNATURE_METHOD: &str = "http://www.w3.org/2001/04/xmldsig-more#ecdsa-sha256";
const ENVELOPED_TRANSFORM: &str = "http://www.w3.org/2000/09/xmldsig#enveloped-signature";
const DIGEST_METHOD: &str = "http://www.w3.org/2001/04/xmlenc#sha256";

/// A successfully signed document plus the values other layers reuse
/// (the QR payload carries both).
#[derive(Debug, Clone)]
pub struct SignedXml {
    /// The document with the signature appended.
    pub xml: String,
    /// Base64 SHA-256 digest of the unsigned document.
    pub digest_value: String,
    /// Base64 DER-encoded ECDSA signature over the SignedInfo block.
    pub signature_value: String,
}

pub(crate) fn sign_enveloped(
    xml: &str,
    key: &SigningKey,
    certificate: &str,
) -> Result<SignedXml, FatooraError> {
    let root_close = xml
        .rfind("</Invoice>")
        .ok_or_else(|| FatooraError::Signing("document has no Invoice root element".into()))?;

    let certificate_body = pem_body(certificate)?;

    let digest_value = BASE64.encode(Sha256::digest(xml.as_bytes()));

    let signed_info = format!(
        concat!(
            r#"<ds:SignedInfo xmlns:ds="{ns}">"#,
            r#"<ds:CanonicalizationMethod Algorithm="{c14n}"/>"#,
            r#"<ds:SignatureMethod Algorithm="{sig_method}"/>"#,
            r#"<ds:Reference URI="">"#,
            r#"<ds:Transforms><ds:Transform Algorithm="{transform}"/></ds:Transforms>"#,
            r#"<ds:DigestMethod Algorithm="{digest_method}"/>"#,
            r#"<ds:DigestValue>{digest}</ds:DigestValue>"#,
            r#"</ds:Reference>"#,
            r#"</ds:SignedInfo>"#,
        ),
        ns = XMLDSIG_NS,
        c14n = C14N_METHOD,
        sig_method = SIGNATURE_METHOD,
        transform = ENVELOPED_TRANSFORM,
        digest_method = DIGEST_METHOD,
        digest = digest_value,
    );

    let signature: Signature = key.sign(signed_info.as_bytes());
    let signature_value = BASE64.encode(signature.to_der().as_bytes());

    let signature_block = format!(
        concat!(
            r#"<ds:Signature xmlns:ds="{ns}">"#,
            "{signed_info}",
            r#"<ds:SignatureValue>{signature_value}</ds:SignatureValue>"#,
            r#"<ds:KeyInfo><ds:X509Data><ds:X509Certificate>{certificate}</ds:X509Certificate></ds:X509Data></ds:KeyInfo>"#,
            r#"</ds:Signature>"#,
        ),
        ns = XMLDSIG_NS,
        signed_info = signed_info,
        signature_value = signature_value,
        certificate = certificate_body,
    );

    let mut out = String::with_capacity(xml.len() + signature_block.len());
    out.push_str(&xml[..root_close]);
    out.push_str(&signature_block);
    out.push_str(&xml[root_close..]);

    Ok(SignedXml {
        xml: out,
        digest_value,
        signature_value,
    })
}

/// Strip PEM armor down to the base64 body; raw base64 passes through.
fn pem_body(certificate: &str) -> Result<String, FatooraError> {
    let body: String = if certificate.contains("-----BEGIN") {
        certificate
            .lines()
            .filter(|line| !line.starts_with("-----"))
            .collect()
    } else {
        certificate.split_whitespace().collect()
    };
    if body.is_empty() {
        return Err(FatooraError::Signing("certificate body is empty".into()));
    }
    Ok(body)
}
