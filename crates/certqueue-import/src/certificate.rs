//! Decoding of queued certificates.

use pem::{EncodeConfig, LineEnding, Pem};
use rustls_pki_types::CertificateDer;
use rustls_pki_types::pem::{self as pki_pem, PemObject};
use x509_parser::parse_x509_certificate;
use x509_parser::x509::AttributeTypeAndValue;

const PEM_TAG: &str = "CERTIFICATE";

// Universal tags of the ASN.1 string types without a UTF-8 compatible form.
const TAG_UNIVERSAL_STRING: u32 = 28;
const TAG_BMP_STRING: u32 = 30;

/// The parts of a queued certificate the import pipeline works with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedCertificate {
    /// Subject common name, empty when the subject has none.
    pub common_name: String,
    /// Serial number as lowercase hex without leading zeros.
    pub serial_number: String,
    /// PEM encoding of the DER bytes.
    pub pem: String,
}

impl IssuedCertificate {
    /// Parse a DER encoded X.509 certificate.
    ///
    /// When the subject carries several common names the last one wins.
    /// Returns the parser's message on failure.
    pub fn from_der(der: &[u8]) -> Result<Self, String> {
        let (_, cert) = parse_x509_certificate(der).map_err(|e| e.to_string())?;

        let common_name = cert
            .subject()
            .iter_common_name()
            .last()
            .map(common_name_text)
            .unwrap_or_default();

        Ok(Self {
            common_name,
            serial_number: serial_hex(cert.raw_serial()),
            pem: encode_pem(der),
        })
    }
}

/// Text of a common name attribute whatever string type encodes it.
fn common_name_text(attr: &AttributeTypeAndValue<'_>) -> String {
    if let Ok(text) = attr.as_str() {
        return text.to_string();
    }

    let value = attr.attr_value();
    let data = value.data;
    match value.tag().0 {
        TAG_BMP_STRING => {
            let units: Vec<u16> = data
                .chunks_exact(2)
                .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
                .collect();
            String::from_utf16_lossy(&units)
        }
        TAG_UNIVERSAL_STRING => data
            .chunks_exact(4)
            .map(|quad| {
                char::from_u32(u32::from_be_bytes([quad[0], quad[1], quad[2], quad[3]]))
                    .unwrap_or(char::REPLACEMENT_CHARACTER)
            })
            .collect(),
        _ => String::from_utf8_lossy(data).into_owned(),
    }
}

/// Render serial bytes the way a big integer prints in hex: lowercase, no
/// leading zeros, `"0"` for zero.
pub fn serial_hex(raw: &[u8]) -> String {
    let encoded = hex::encode(raw);
    let trimmed = encoded.trim_start_matches('0');
    if trimmed.is_empty() {
        "0".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Read a certificate file that holds either DER or a PEM `CERTIFICATE` block.
pub fn der_from_file_contents(contents: &[u8]) -> Result<Vec<u8>, String> {
    match CertificateDer::from_pem_slice(contents) {
        Ok(cert) => Ok(cert.as_ref().to_vec()),
        Err(pki_pem::Error::NoItemsFound) => Ok(contents.to_vec()),
        Err(e) => Err(format!("invalid PEM: {}", e)),
    }
}

/// Wrap DER bytes in a `CERTIFICATE` PEM block with LF line endings.
pub fn encode_pem(der: &[u8]) -> String {
    let config = EncodeConfig::new().set_line_ending(LineEnding::LF);
    pem::encode_config(&Pem::new(PEM_TAG, der.to_vec()), config)
}

#[cfg(test)]
#[path = "certificate_tests.rs"]
mod tests;
