use sha2::{Digest, Sha256};

/// Hash of a source line that survives re-indentation: all whitespace is
/// dropped before hashing. Empty (or blank) lines hash to an empty string,
/// which issue matching treats as "no hash".
pub fn line_hash(line: &str) -> String {
    let compact: String = line.chars().filter(|c| !c.is_whitespace()).collect();
    if compact.is_empty() {
        return String::new();
    }
    hex::encode(Sha256::digest(compact.as_bytes()))
}
