//! Human-readable order number generation.

use chrono::{DateTime, Datelike, Utc};
use uuid::Uuid;

/// Generates an order number of the form `ORyymmdd-XXXXXX`, where the
/// suffix is six uppercase hex characters drawn from a fresh UUID. The
/// orders table enforces uniqueness; collisions within a day are
/// vanishingly rare at this volume.
pub fn generate_order_no(now: DateTime<Utc>) -> String {
    let suffix: String = Uuid::new_v4()
        .simple()
        .to_string()
        .chars()
        .take(6)
        .collect::<String>()
        .to_uppercase();
    format!(
        "OR{:02}{:02}{:02}-{}",
        now.year() % 100,
        now.month(),
        now.day(),
        suffix
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn order_no_format() {
        let now = Utc.with_ymd_and_hms(2026, 8, 30, 12, 0, 0).unwrap();
        let no = generate_order_no(now);
        assert!(no.starts_with("OR260830-"), "got {no}");
        assert_eq!(no.len(), "OR260830-".len() + 6);
        let suffix = &no["OR260830-".len()..];
        assert!(suffix.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(suffix, suffix.to_uppercase());
    }

    #[test]
    fn order_no_is_unlikely_to_repeat() {
        let now = Utc::now();
        let a = generate_order_no(now);
        let b = generate_order_no(now);
        assert_ne!(a, b);
    }
}
