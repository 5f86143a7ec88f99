use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

const SUFFIX_LEN: usize = 9;
const ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Identifier correlating this run's conversation with server-side state.
///
/// Generated once at startup and passed explicitly to every request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionId(String);

impl SessionId {
    pub fn generate() -> Self {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or_default();

        Self(format!("session_{}_{}", millis, random_suffix()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// Bytes 6 and 8 of a v4 uuid carry the version and variant bits.
const FIXED_UUID_BYTES: [usize; 2] = [6, 8];

fn random_suffix() -> String {
    suffix_from_bytes(Uuid::new_v4().as_bytes())
}

// Base36 digits drawn from the random bytes only.
fn suffix_from_bytes(bytes: &[u8; 16]) -> String {
    bytes
        .iter()
        .enumerate()
        .filter(|(index, _)| !FIXED_UUID_BYTES.contains(index))
        .take(SUFFIX_LEN)
        .map(|(_, byte)| ALPHABET[*byte as usize % ALPHABET.len()] as char)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{SessionId, suffix_from_bytes};

    #[test]
    fn generated_id_has_prefix_timestamp_and_suffix() {
        let id = SessionId::generate();
        let parts: Vec<&str> = id.as_str().split('_').collect();

        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "session");
        assert!(!parts[1].is_empty());
        assert!(parts[1].chars().all(|c| c.is_ascii_digit()));
        assert_eq!(parts[2].len(), 9);
        assert!(
            parts[2]
                .chars()
                .all(|c| c.is_ascii_digit() || c.is_ascii_lowercase())
        );
    }

    #[test]
    fn generated_ids_differ() {
        assert_ne!(SessionId::generate(), SessionId::generate());
    }

    #[test]
    fn suffix_skips_version_and_variant_bytes() {
        let mut bytes = [0u8; 16];
        for (index, byte) in bytes.iter_mut().enumerate() {
            *byte = index as u8;
        }
        bytes[6] = 0x4f;
        bytes[8] = 0x80;

        assert_eq!(suffix_from_bytes(&bytes), "01234579a");
    }
}
