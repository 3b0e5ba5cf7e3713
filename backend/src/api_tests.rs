#[cfg(test)]
mod tests {
    use crate::api::{CallId, CallTimestamp, Permission, ShareToken};

    #[test]
    fn test_call_id_new() {
        let id = CallId::new(42);
        assert_eq!(id.value(), 42);
        assert_eq!(i64::from(id), 42);
    }

    #[test]
    fn test_call_id_ordering() {
        assert!(CallId::new(1) < CallId::new(2));
    }

    #[test]
    fn test_call_id_serializes_transparently() {
        let json = serde_json::to_string(&CallId::new(7)).unwrap();
        assert_eq!(json, "7");
        let back: CallId = serde_json::from_str("7").unwrap();
        assert_eq!(back, CallId::new(7));
    }

    #[test]
    fn test_share_token_is_opaque_string() {
        let token = ShareToken::new("abc123");
        assert_eq!(serde_json::to_string(&token).unwrap(), "\"abc123\"");
    }

    #[test]
    fn test_generated_tokens_differ() {
        assert_ne!(ShareToken::generate(), ShareToken::generate());
    }

    #[test]
    fn test_permission_wire_names() {
        assert_eq!(serde_json::to_string(&Permission::View).unwrap(), "\"view\"");
        assert_eq!(serde_json::to_string(&Permission::Edit).unwrap(), "\"edit\"");
    }

    #[test]
    fn test_timestamp_wire_format() {
        let ts = CallTimestamp::from_seconds(75 * 60 + 5);
        assert_eq!(serde_json::to_string(&ts).unwrap(), "\"75:05\"");
        let back: CallTimestamp = serde_json::from_str("\"1:15:05\"").unwrap();
        assert_eq!(back, ts);
        assert!(serde_json::from_str::<CallTimestamp>("\"1:75\"").is_err());
    }
}
