use sha2::{Digest, Sha256};

/// SHA-256 of `data`, lowercase hex. Total over every input, including empty.
pub fn digest(data: impl AsRef<[u8]>) -> String {
    hex::encode(Sha256::digest(data.as_ref()))
}

/// SHA-256 over the concatenation of `parts`, with no separators.
pub fn digest_concat(parts: &[&[u8]]) -> String {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part);
    }
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_vectors() {
        assert_eq!(
            digest(""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
        assert_eq!(
            digest("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn digest_is_deterministic() {
        assert_eq!(digest(b"hello world"), digest("hello world"));
    }

    #[test]
    fn concat_matches_joined_input() {
        let joined = digest("leftright");
        let parts = digest_concat(&[b"left", b"right"]);
        assert_eq!(joined, parts);
    }

    #[test]
    fn digest_is_lowercase_hex() {
        let d = digest("x");
        assert_eq!(d.len(), 64);
        assert!(d.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f')));
    }
}
