/// Map a Claude Messages stop reason to an OpenAI finish reason.
///
/// Unrecognized reasons pass through unchanged; an absent reason maps to
/// `"stop"`.
#[must_use]
pub fn stop_reason_to_finish_reason(stop_reason: Option<&str>) -> &str {
    match stop_reason {
        Some("end_turn") | None => "stop",
        Some("max_tokens") => "length",
        Some(other) => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_reasons() {
        assert_eq!(stop_reason_to_finish_reason(Some("end_turn")), "stop");
        assert_eq!(stop_reason_to_finish_reason(Some("max_tokens")), "length");
    }

    #[test]
    fn test_unknown_reason_passes_through() {
        assert_eq!(
            stop_reason_to_finish_reason(Some("stop_sequence")),
            "stop_sequence"
        );
    }

    #[test]
    fn test_absent_reason_defaults_to_stop() {
        assert_eq!(stop_reason_to_finish_reason(None), "stop");
    }
}
