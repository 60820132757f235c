use crate::errors::{AppError, Result};
use base64::{engine::general_purpose, Engine as _};
use hmac::{Hmac, Mac};
use rand::Rng;
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Checks provider callbacks signed as base64(HMAC-SHA256(secret, body)).
pub struct CallbackSigner;

impl CallbackSigner {
    pub fn sign(secret: &str, body: &[u8]) -> Result<String> {
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
            .map_err(|e| AppError::InternalError(format!("Invalid callback secret: {}", e)))?;
        mac.update(body);
        Ok(general_purpose::STANDARD.encode(mac.finalize().into_bytes()))
    }

    pub fn verify(secret: &str, body: &[u8], signature: &str) -> Result<()> {
        let expected = general_purpose::STANDARD
            .decode(signature.trim())
            .map_err(|_| AppError::AuthenticationError("Malformed callback signature".to_string()))?;

        let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
            .map_err(|e| AppError::InternalError(format!("Invalid callback secret: {}", e)))?;
        mac.update(body);
        mac.verify_slice(&expected)
            .map_err(|_| AppError::AuthenticationError("Invalid callback signature".to_string()))
    }
}

/// Short code shown in every email so users can tell real mail from phishing.
pub fn generate_anti_phishing_code() -> String {
    const ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
    let mut rng = rand::thread_rng();
    (0..8)
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signature_round_trip() {
        let body = br#"{"reference_id":"X1","decision":"approved"}"#;
        let signature = CallbackSigner::sign("s3cret", body).unwrap();
        assert!(CallbackSigner::verify("s3cret", body, &signature).is_ok());
        assert!(CallbackSigner::verify("other", body, &signature).is_err());
        assert!(CallbackSigner::verify("s3cret", b"{}", &signature).is_err());
        assert!(CallbackSigner::verify("s3cret", body, "not base64!").is_err());
    }

    #[test]
    fn anti_phishing_codes_use_unambiguous_characters() {
        let code = generate_anti_phishing_code();
        assert_eq!(code.len(), 8);
        assert!(code.chars().all(|c| !"01IO".contains(c)));
    }
}
