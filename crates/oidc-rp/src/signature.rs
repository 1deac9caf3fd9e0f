//! Identity-token signature verification
//!
//! `SignatureVerifier` is the JWS capability the verifier pipeline consumes:
//! given the compact token and the provider's signing certificate, return the
//! decoded payload or `SignatureInvalid`. Only the signature is checked here;
//! every claim check lives in `verify.rs`.

use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode, decode_header};
use x509_parser::public_key::PublicKey;

use crate::error::{Error, Result};
use crate::metadata::Certificate;
use crate::verify::Claims;

const RSA_ALGORITHMS: [Algorithm; 3] = [Algorithm::RS256, Algorithm::RS384, Algorithm::RS512];

pub trait SignatureVerifier: Send + Sync {
    /// Verify `token`'s signature against `certificate` and return its payload.
    fn verify(&self, token: &str, certificate: &Certificate) -> Result<Claims>;
}

/// Verifies RS256/RS384/RS512 tokens with the RSA key inside an X.509 certificate.
#[derive(Debug, Clone, Copy, Default)]
pub struct X509SignatureVerifier;

impl X509SignatureVerifier {
    fn decoding_key(certificate: &Certificate) -> Result<DecodingKey> {
        let der = certificate
            .to_der()
            .map_err(|e| Error::SignatureInvalid(format!("certificate is not base64: {e}")))?;
        let (_, cert) = x509_parser::parse_x509_certificate(&der)
            .map_err(|e| Error::SignatureInvalid(format!("unparsable signing certificate: {e}")))?;

        let spki = cert.public_key();
        if !matches!(spki.parsed(), Ok(PublicKey::RSA(_))) {
            return Err(Error::SignatureInvalid(
                "signing certificate does not carry an RSA key".into(),
            ));
        }

        // The SPKI bit string of an RSA key is the PKCS#1 RSAPublicKey
        Ok(DecodingKey::from_rsa_der(&spki.subject_public_key.data))
    }
}

impl SignatureVerifier for X509SignatureVerifier {
    fn verify(&self, token: &str, certificate: &Certificate) -> Result<Claims> {
        let header = decode_header(token)
            .map_err(|e| Error::SignatureInvalid(format!("malformed token header: {e}")))?;
        if !RSA_ALGORITHMS.contains(&header.alg) {
            return Err(Error::SignatureInvalid(format!(
                "unsupported algorithm {:?}",
                header.alg
            )));
        }

        let key = Self::decoding_key(certificate)?;

        let mut validation = Validation::new(header.alg);
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.required_spec_claims.clear();

        let data = decode::<Claims>(token, &key, &validation)
            .map_err(|e| Error::SignatureInvalid(e.to_string()))?;
        Ok(data.claims)
    }
}
