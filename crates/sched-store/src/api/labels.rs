//! Label sanitization.
//!
//! The API server only indexes labels whose keys and values are short
//! alphanumeric tokens. Non-conforming entries are dropped rather than
//! rejected so a stray user label never blocks a save.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use crate::types::Labels;

pub const MAX_LABEL_LEN: usize = 63;

static LABEL_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9]([-A-Za-z0-9_.]*[A-Za-z0-9])?$").expect("label regex compiles")
});

pub fn is_valid_label_key(key: &str) -> bool {
    key.len() <= MAX_LABEL_LEN && LABEL_TOKEN.is_match(key)
}

/// Values follow the key rules but may also be empty.
pub fn is_valid_label_value(value: &str) -> bool {
    value.is_empty() || (value.len() <= MAX_LABEL_LEN && LABEL_TOKEN.is_match(value))
}

/// Keep only conforming entries.
pub fn sanitize_labels(labels: &Labels) -> BTreeMap<String, String> {
    labels
        .iter()
        .filter(|(k, v)| {
            let keep = is_valid_label_key(k) && is_valid_label_value(v);
            if !keep {
                debug!(key = %k, value = %v, "dropping non-conforming label");
            }
            keep
        })
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_plain_tokens() {
        assert!(is_valid_label_key("app"));
        assert!(is_valid_label_key("io.tencent.bcs-app_1"));
        assert!(is_valid_label_value(""));
        assert!(is_valid_label_value("v1.2"));
    }

    #[test]
    fn rejects_bad_edges_and_charset() {
        assert!(!is_valid_label_key(""));
        assert!(!is_valid_label_key("-lead"));
        assert!(!is_valid_label_key("trail."));
        assert!(!is_valid_label_key("has space"));
        assert!(!is_valid_label_key("io.tencent/app"));
        assert!(!is_valid_label_value("a:b"));
    }

    #[test]
    fn length_limit_is_63() {
        let ok = "a".repeat(63);
        let long = "a".repeat(64);
        assert!(is_valid_label_key(&ok));
        assert!(!is_valid_label_key(&long));
        assert!(!is_valid_label_value(&long));
    }

    #[test]
    fn sanitize_drops_silently() {
        let mut labels = Labels::new();
        labels.insert("good".into(), "yes".into());
        labels.insert("bad key".into(), "yes".into());
        labels.insert("goodkey".into(), "bad value!".into());
        labels.insert("long".into(), "x".repeat(80));

        let clean = sanitize_labels(&labels);
        assert_eq!(clean.len(), 1);
        assert_eq!(clean.get("good").map(String::as_str), Some("yes"));
    }
}
