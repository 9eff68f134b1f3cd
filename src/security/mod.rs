pub mod envelope;
pub mod integrity;
pub mod nonce;
pub mod verifier;
