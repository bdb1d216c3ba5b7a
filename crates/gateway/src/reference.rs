use chrono::{DateTime, Utc};
use rand::Rng;
use rand::distributions::Alphanumeric;

/// Generate a payment reference of the form `<prefix>_<unix seconds>_<8 random>`.
pub fn generate_reference(prefix: &str, now: DateTime<Utc>) -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(8)
        .map(char::from)
        .collect();
    format!("{prefix}_{}_{}", now.timestamp(), suffix.to_ascii_uppercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_shape() {
        let now = Utc::now();
        let r = generate_reference("CS", now);
        let parts: Vec<&str> = r.split('_').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "CS");
        assert_eq!(parts[1], now.timestamp().to_string());
        assert_eq!(parts[2].len(), 8);
        assert!(parts[2].chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn references_differ() {
        let now = Utc::now();
        assert_ne!(generate_reference("CS", now), generate_reference("CS", now));
    }
}
