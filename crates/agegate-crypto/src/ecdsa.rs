//! ECDSA operations for the attestation service.
//!
//! The attestor signs the 32-byte digest form of the Poseidon signing
//! message with a secp256k1 key; verifiers check the `(r, s)` halves against
//! the service's published compressed public key with the standard curve
//! verification equation. Signatures are rendered as trimmed `0x`-hex, the
//! same encoding every other felt-like protocol string uses.

use agegate_types::{
    AgegateError, AgegateResult, SignatureParts, SigningPrivateKey, SigningPublicKey,
};
use secp256k1::{ecdsa::Signature, Message, PublicKey, Secp256k1, SecretKey};

thread_local! {
    static SECP256K1_CTX: Secp256k1<secp256k1::All> = Secp256k1::new();
}

pub fn generate_signing_key() -> SigningPrivateKey {
    loop {
        let bytes = crate::random_bytes::<32>();
        if SecretKey::from_slice(&bytes).is_ok() {
            return SigningPrivateKey::from_bytes(bytes);
        }
    }
}

pub fn derive_verifying_key(private_key: &SigningPrivateKey) -> AgegateResult<SigningPublicKey> {
    SECP256K1_CTX.with(|ctx| {
        let secret = SecretKey::from_slice(private_key.as_bytes())
            .map_err(|e| AgegateError::InvalidKey(e.to_string()))?;
        let public = PublicKey::from_secret_key(ctx, &secret);
        Ok(SigningPublicKey::from_bytes(public.serialize()))
    })
}

pub fn sign_digest(
    private_key: &SigningPrivateKey,
    digest: &[u8; 32],
) -> AgegateResult<SignatureParts> {
    SECP256K1_CTX.with(|ctx| {
        let secret = SecretKey::from_slice(private_key.as_bytes())
            .map_err(|e| AgegateError::InvalidKey(e.to_string()))?;
        let message = Message::from_digest_slice(digest)
            .map_err(|e| AgegateError::Crypto(e.to_string()))?;

        let compact = ctx.sign_ecdsa(&message, &secret).serialize_compact();

        Ok(SignatureParts {
            r: scalar_to_hex(&compact[..32]),
            s: scalar_to_hex(&compact[32..]),
        })
    })
}

pub fn verify_digest(
    public_key: &SigningPublicKey,
    digest: &[u8; 32],
    signature: &SignatureParts,
) -> AgegateResult<bool> {
    SECP256K1_CTX.with(|ctx| {
        let public = PublicKey::from_slice(public_key.as_bytes())
            .map_err(|e| AgegateError::InvalidKey(e.to_string()))?;
        let message = Message::from_digest_slice(digest)
            .map_err(|e| AgegateError::Crypto(e.to_string()))?;

        let mut compact = [0u8; 64];
        compact[..32].copy_from_slice(&scalar_from_hex(&signature.r)?);
        compact[32..].copy_from_slice(&scalar_from_hex(&signature.s)?);

        let sig = Signature::from_compact(&compact)
            .map_err(|e| AgegateError::InvalidSignature(e.to_string()))?;

        Ok(ctx.verify_ecdsa(&message, &sig, &public).is_ok())
    })
}

fn scalar_to_hex(bytes: &[u8]) -> String {
    let hex = hex::encode(bytes);
    let trimmed = hex.trim_start_matches('0');
    if trimmed.is_empty() {
        "0x0".to_string()
    } else {
        format!("0x{}", trimmed)
    }
}

fn scalar_from_hex(s: &str) -> AgegateResult<[u8; 32]> {
    let digits = s.strip_prefix("0x").unwrap_or(s);
    if digits.is_empty() || digits.len() > 64 {
        return Err(AgegateError::InvalidSignature(format!(
            "invalid scalar length {}",
            digits.len()
        )));
    }
    let padded = format!("{:0>64}", digits);
    let bytes = hex::decode(padded)
        .map_err(|e| AgegateError::InvalidSignature(e.to_string()))?;
    let mut arr = [0u8; 32];
    arr.copy_from_slice(&bytes);
    Ok(arr)
}
