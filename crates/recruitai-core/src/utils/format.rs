use chrono::{DateTime, Utc};

/// Relative age of a timestamp, e.g. "5m ago", "2h ago", "3d ago".
pub fn age_display(at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let minutes = (now - at).num_minutes();
    if minutes < 1 {
        // Also covers clock skew
        "just now".to_string()
    } else if minutes < 60 {
        format!("{}m ago", minutes)
    } else if minutes < 1440 {
        let hours = minutes / 60;
        if minutes % 60 >= 30 {
            format!("{}h ago", hours + 1)
        } else {
            format!("{}h ago", hours)
        }
    } else {
        let days = minutes / 1440;
        if (minutes % 1440) / 60 >= 12 {
            format!("{}d ago", days + 1)
        } else {
            format!("{}d ago", days)
        }
    }
}

/// Show only the last four characters of a token.
pub fn mask_token(token: &str) -> String {
    if token.is_empty() {
        return "(none)".to_string();
    }
    let count = token.chars().count();
    if count <= 4 {
        return "*".repeat(count);
    }
    let tail: String = token.chars().skip(count - 4).collect();
    format!("****{}", tail)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_age_display() {
        let now = Utc::now();
        assert_eq!(age_display(now, now), "just now");
        assert_eq!(age_display(now + Duration::minutes(5), now), "just now");
        assert_eq!(age_display(now - Duration::minutes(5), now), "5m ago");
        assert_eq!(age_display(now - Duration::minutes(80), now), "1h ago");
        assert_eq!(age_display(now - Duration::minutes(95), now), "2h ago");
        assert_eq!(age_display(now - Duration::hours(26), now), "1d ago");
        assert_eq!(age_display(now - Duration::hours(36), now), "2d ago");
    }

    #[test]
    fn test_mask_token() {
        assert_eq!(mask_token(""), "(none)");
        assert_eq!(mask_token("abc"), "***");
        assert_eq!(mask_token("eyJhbGciOiJIUzI1NiJ9.payload.sig1234"), "****1234");
    }
}
