//! Unit tests for the Identifiers module
//!
//! Tests cover the UUID-backed ledger identifiers and the string keys used
//! for accounts and users.

use core_kernel::{AccountId, ClosureId, TransactionId, TransferId, UserId};
use uuid::Uuid;

mod closure_id_tests {
    use super::*;

    #[test]
    fn test_new_generates_unique_ids() {
        let id1 = ClosureId::new();
        let id2 = ClosureId::new();
        assert_ne!(id1, id2);
    }

    #[test]
    fn test_new_generates_time_ordered_ids() {
        let id1 = ClosureId::new();
        std::thread::sleep(std::time::Duration::from_millis(2));
        let id2 = ClosureId::new();
        assert!(id1 < id2);
    }

    #[test]
    fn test_from_uuid() {
        let uuid = Uuid::new_v4();
        let id = ClosureId::from_uuid(uuid);
        assert_eq!(*id.as_uuid(), uuid);
    }

    #[test]
    fn test_prefix() {
        assert_eq!(ClosureId::prefix(), "CLS");
        assert_eq!(TransactionId::prefix(), "TXN");
        assert_eq!(TransferId::prefix(), "TRF");
    }

    #[test]
    fn test_from_str_with_and_without_prefix() {
        let original = ClosureId::new();
        let with_prefix: ClosureId = original.to_string().parse().unwrap();
        let bare: ClosureId = original.as_uuid().to_string().parse().unwrap();
        assert_eq!(original, with_prefix);
        assert_eq!(original, bare);
    }

    #[test]
    fn test_from_str_rejects_garbage() {
        assert!("CLS-not-a-uuid".parse::<ClosureId>().is_err());
    }

    #[test]
    fn test_json_is_bare_uuid() {
        let id = TransferId::new();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{}\"", id.as_uuid()));
        let back: TransferId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, back);
    }

    #[test]
    fn test_uuid_conversion() {
        let uuid = Uuid::new_v4();
        let id: TransactionId = uuid.into();
        let back: Uuid = id.into();
        assert_eq!(uuid, back);
    }
}

mod key_tests {
    use super::*;

    #[test]
    fn test_display_is_raw_key() {
        let id = AccountId::new("cash-vault");
        assert_eq!(id.to_string(), "cash-vault");
        assert_eq!(id.as_str(), "cash-vault");
    }

    #[test]
    fn test_conversions() {
        let from_str: UserId = "user-1".into();
        let from_string: UserId = String::from("user-1").into();
        assert_eq!(from_str, from_string);
    }

    #[test]
    fn test_blank_detection() {
        assert!(AccountId::new("").is_blank());
        assert!(AccountId::new("   ").is_blank());
        assert!(!AccountId::new("bank-debit").is_blank());
    }

    #[test]
    fn test_json_is_plain_string() {
        let id = AccountId::new("bank-credit");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"bank-credit\"");
    }
}
