//! TFHE-rs backend
//!
//! Production backend: ciphertexts are TFHE `FheUint64`s, arithmetic runs
//! under the server key and only the decryption oracle touches the client key.

mod keys;
mod ciphertext;
mod operations;
mod server;

pub use keys::{install_server_key, ClientKey, ServerKey, KeyPair};
pub use ciphertext::FHEUint64;
pub use operations::FHEOps;
pub use server::TfheBackend;
