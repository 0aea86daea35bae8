//! Root credential generation

use base64::Engine;
use rand::RngCore;

/// Byte length of generated root passwords before base64 encoding.
const ROOT_PASSWORD_BYTES: usize = 24;

/// Generate a fresh root password.
///
/// 24 random bytes, base64-encoded. Minted once per disk and handed straight
/// to the vendor; never logged.
pub fn generate_root_password() -> String {
    let mut buf = [0u8; ROOT_PASSWORD_BYTES];
    rand::thread_rng().fill_bytes(&mut buf);
    base64::engine::general_purpose::STANDARD.encode(buf)
}
