use hex::ToHex;
use sha2::Digest;

pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = sha2::Sha256::new();
    hasher.update(bytes);
    hasher.finalize().encode_hex::<String>()
}

pub fn is_sha256_hex(s: &str) -> bool {
    let bytes = s.as_bytes();
    if bytes.len() != 64 {
        return false;
    }
    bytes.iter().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}

/// Normalizes line endings so that scripts produced on different hosts hash the same.
pub fn canonicalize_script(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

pub fn script_digest(script: &str) -> String {
    sha256_hex(canonicalize_script(script).as_bytes())
}
