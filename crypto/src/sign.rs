//! Ed25519 signing and signer recovery over typed-data digests.

use ed25519_dalek::{Signer, SigningKey, VerifyingKey};
use tally_types::{Address, Authorization, Hash256, KeyPair, PrivateKey, PublicKey, Signature};

use crate::hash::blake2b_256;

/// Sign a message with a private key, returning the signature.
pub fn sign_message(message: &[u8], private_key: &PrivateKey) -> Signature {
    let signing_key = SigningKey::from_bytes(&private_key.0);
    Signature(signing_key.sign(message).to_bytes())
}

/// Verify a signature against a message and public key.
///
/// Uses strict verification, so non-canonical signatures are rejected.
pub fn verify_signature(message: &[u8], signature: &Signature, public_key: &PublicKey) -> bool {
    let Ok(verifying_key) = VerifyingKey::from_bytes(&public_key.0) else {
        return false;
    };
    let dalek_sig = ed25519_dalek::Signature::from_bytes(&signature.0);
    verifying_key.verify_strict(message, &dalek_sig).is_ok()
}

/// The account address controlled by a public key.
pub fn derive_address(public_key: &PublicKey) -> Address {
    Address::new(blake2b_256(public_key.as_bytes()))
}

/// Sign a typed-data digest, producing the authorization a relayer submits.
pub fn authorize(digest: &Hash256, keypair: &KeyPair) -> Authorization {
    Authorization {
        signer: keypair.public.clone(),
        signature: sign_message(digest.as_bytes(), &keypair.private),
    }
}

/// Recover the signing account of a digest.
///
/// Returns `None` when the signature does not verify for the embedded key.
pub fn recover_signer(digest: &Hash256, authorization: &Authorization) -> Option<Address> {
    verify_signature(
        digest.as_bytes(),
        &authorization.signature,
        &authorization.signer,
    )
    .then(|| derive_address(&authorization.signer))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::keypair_from_seed;

    #[test]
    fn sign_and_verify() {
        let kp = keypair_from_seed(&[1u8; 32]);
        let msg = b"delegate all units";
        let sig = sign_message(msg, &kp.private);
        assert!(verify_signature(msg, &sig, &kp.public));
        assert!(!verify_signature(b"delegate no units", &sig, &kp.public));
    }

    #[test]
    fn wrong_key_fails() {
        let kp1 = keypair_from_seed(&[1u8; 32]);
        let kp2 = keypair_from_seed(&[2u8; 32]);
        let sig = sign_message(b"test", &kp1.private);
        assert!(!verify_signature(b"test", &sig, &kp2.public));
    }

    #[test]
    fn invalid_public_key() {
        let kp = keypair_from_seed(&[3u8; 32]);
        let sig = sign_message(b"test", &kp.private);
        assert!(!verify_signature(b"test", &sig, &PublicKey([0xFF; 32])));
    }

    #[test]
    fn recover_returns_derived_address() {
        let kp = keypair_from_seed(&[4u8; 32]);
        let digest = Hash256::new([9u8; 32]);
        let auth = authorize(&digest, &kp);
        assert_eq!(recover_signer(&digest, &auth), Some(derive_address(&kp.public)));
    }

    #[test]
    fn recover_rejects_other_digest() {
        let kp = keypair_from_seed(&[4u8; 32]);
        let auth = authorize(&Hash256::new([9u8; 32]), &kp);
        assert_eq!(recover_signer(&Hash256::new([8u8; 32]), &auth), None);
    }

    #[test]
    fn recover_rejects_swapped_signer() {
        let kp = keypair_from_seed(&[4u8; 32]);
        let other = keypair_from_seed(&[5u8; 32]);
        let digest = Hash256::new([9u8; 32]);
        let mut auth = authorize(&digest, &kp);
        auth.signer = other.public.clone();
        assert_eq!(recover_signer(&digest, &auth), None);
    }

    #[test]
    fn addresses_differ_per_key() {
        let a = derive_address(&keypair_from_seed(&[1u8; 32]).public);
        let b = derive_address(&keypair_from_seed(&[2u8; 32]).public);
        assert_ne!(a, b);
        assert!(!a.is_zero());
    }
}
