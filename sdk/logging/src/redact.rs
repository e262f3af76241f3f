//! API-key redaction for anything that may end up in a log line.

/// Mask all but the first four characters of a secret.
pub fn mask_key(key: &str) -> String {
    if key.len() <= 4 {
        return "****".to_string();
    }
    format!("{}{}", &key[..4], "*".repeat(key.len() - 4))
}

/// Replace occurrences of the given secrets in a message.
pub fn redact(message: &str, secrets: &[&str]) -> String {
    let mut out = message.to_string();
    for secret in secrets {
        if secret.len() >= 8 && out.contains(secret) {
            out = out.replace(secret, &mask_key(secret));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn masks_all_but_prefix() {
        assert_eq!(mask_key("sk-abcdef123"), "sk-a********");
        assert_eq!(mask_key("ab"), "****");
    }

    #[test]
    fn redacts_embedded_secrets() {
        let line = redact("connecting with key sk-abcdef123", &["sk-abcdef123"]);
        assert!(!line.contains("sk-abcdef123"));
        assert!(line.contains("sk-a"));
    }

    #[test]
    fn short_secrets_left_alone() {
        assert_eq!(redact("key is abc", &["abc"]), "key is abc");
    }
}
