//! Cache key fingerprint
//!
//! Deterministic, non-cryptographic fingerprint of a (text, voice) pair.
//! Speed deliberately never participates: audio is synthesized at 1.0x and
//! rate is applied at playback time, so one cached clip serves every speed.
//!
//! The hash runs over UTF-16 code units so fingerprints match those written
//! by earlier deployments of this player, which hashed JavaScript strings.

/// Fingerprint a (text, voice) pair into a cache key.
pub fn fingerprint(text: &str, voice_id: &str) -> String {
    let combined = format!("{}_{}", text, voice_id);
    let mut hash: i32 = 0;
    for unit in combined.encode_utf16() {
        hash = hash
            .wrapping_shl(5)
            .wrapping_sub(hash)
            .wrapping_add(i32::from(unit));
    }
    to_base36(hash.unsigned_abs())
}

fn to_base36(mut value: u32) -> String {
    const DIGITS: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if value == 0 {
        return "0".to_string();
    }
    let mut out = Vec::new();
    while value > 0 {
        out.push(DIGITS[(value % 36) as usize]);
        value /= 36;
    }
    out.reverse();
    String::from_utf8(out).expect("base36 digits are ASCII")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deterministic_across_calls() {
        let a = fingerprint("Hello there.", "en-US-Standard-F");
        let b = fingerprint("Hello there.", "en-US-Standard-F");
        assert_eq!(a, b);
    }

    #[test]
    fn text_and_voice_both_participate() {
        let base = fingerprint("Hello there.", "en-US-Standard-F");
        assert_ne!(base, fingerprint("Hello there!", "en-US-Standard-F"));
        assert_ne!(base, fingerprint("Hello there.", "en-GB-Standard-A"));
    }

    #[test]
    fn speed_never_participates() {
        // The signature has no speed parameter; this pins the invariant that
        // the key is a pure function of text and voice.
        let key = fingerprint("Some sentence.", "en-US-Standard-F");
        assert_eq!(key, fingerprint("Some sentence.", "en-US-Standard-F"));
    }

    #[test]
    fn output_is_base36() {
        let key = fingerprint("The quick brown fox.", "en-AU-Standard-B");
        assert!(!key.is_empty());
        assert!(key.chars().all(|c| c.is_ascii_digit() || c.is_ascii_lowercase()));
    }

    #[test]
    fn non_ascii_text_hashes_by_utf16_units() {
        // Surrogate pairs contribute two units; just pin that it works and
        // differs from the ASCII spelling.
        let a = fingerprint("안녕하세요 🙂", "en-US-Standard-F");
        let b = fingerprint("annyeonghaseyo", "en-US-Standard-F");
        assert_ne!(a, b);
    }

    #[test]
    fn base36_rendering() {
        assert_eq!(to_base36(0), "0");
        assert_eq!(to_base36(35), "z");
        assert_eq!(to_base36(36), "10");
        assert_eq!(to_base36(2_147_483_648), "zik0zk");
    }
}
