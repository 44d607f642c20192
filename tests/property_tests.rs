//! Property-based tests for permission matching, status strings and
//! pagination arithmetic.
//!
//! These use proptest to verify invariants across a wide range of inputs,
//! helping to catch edge cases that example-based tests miss.

use distribera_api::auth::PermissionService;
use distribera_api::handlers::common::{page_or_first, total_pages};
use distribera_api::services::messages::MessageType;
use distribera_api::services::orders::OrderStatus;
use distribera_api::services::returns::ReturnStatus;
use distribera_api::services::sales::SaleStatus;
use proptest::prelude::*;

// Strategies for generating test data
fn resource_strategy() -> impl Strategy<Value = String> {
    "[a-z]{3,12}".prop_map(|s| s)
}

fn action_strategy() -> impl Strategy<Value = String> {
    "[a-z]{3,10}".prop_map(|s| s)
}

fn action_or_wildcard_strategy() -> impl Strategy<Value = String> {
    prop_oneof![action_strategy(), Just("*".to_string())]
}

fn order_status_strategy() -> impl Strategy<Value = OrderStatus> {
    prop_oneof![
        Just(OrderStatus::Pending),
        Just(OrderStatus::Accepted),
        Just(OrderStatus::Rejected),
        Just(OrderStatus::Cancelled),
    ]
}

fn sale_status_strategy() -> impl Strategy<Value = SaleStatus> {
    prop_oneof![
        Just(SaleStatus::Completed),
        Just(SaleStatus::Pending),
        Just(SaleStatus::Cancelled),
    ]
}

fn return_status_strategy() -> impl Strategy<Value = ReturnStatus> {
    prop_oneof![
        Just(ReturnStatus::Pending),
        Just(ReturnStatus::Approved),
        Just(ReturnStatus::Rejected),
    ]
}

fn message_type_strategy() -> impl Strategy<Value = MessageType> {
    prop_oneof![
        Just(MessageType::Accept),
        Just(MessageType::Reject),
        Just(MessageType::Question),
        Just(MessageType::Info),
    ]
}

// Property: permission implication behaves like a grant lattice
proptest! {
    #![proptest_config(ProptestConfig::with_cases(1000))]

    #[test]
    fn permission_implies_itself(resource in resource_strategy(), action in action_strategy()) {
        let svc = PermissionService::new();
        let perm = format!("{}:{}", resource, action);
        prop_assert!(svc.is_permission_implied(&perm, &perm));
    }

    #[test]
    fn resource_wildcard_covers_every_action(
        resource in resource_strategy(),
        action in action_strategy(),
    ) {
        let svc = PermissionService::new();
        let held = format!("{}:*", resource);
        let required = format!("{}:{}", resource, action);
        prop_assert!(svc.is_permission_implied(&held, &required));
    }

    #[test]
    fn admin_wildcard_covers_everything(
        resource in resource_strategy(),
        action in action_strategy(),
    ) {
        let svc = PermissionService::new();
        let required = format!("{}:{}", resource, action);
        prop_assert!(svc.is_permission_implied("admin:*", &required));
        prop_assert!(svc.is_permission_implied("*", &required));
    }

    #[test]
    fn single_action_never_grants_the_wildcard(
        resource in resource_strategy(),
        action in action_strategy(),
    ) {
        let svc = PermissionService::new();
        let held = format!("{}:{}", resource, action);
        let required = format!("{}:*", resource);
        prop_assert!(!svc.is_permission_implied(&held, &required));
    }

    #[test]
    fn foreign_resource_is_never_implied(
        held_resource in resource_strategy(),
        required_resource in resource_strategy(),
        held_action in action_or_wildcard_strategy(),
        required_action in action_strategy(),
    ) {
        prop_assume!(held_resource != required_resource);
        prop_assume!(held_resource != "admin");

        let svc = PermissionService::new();
        let held = format!("{}:{}", held_resource, held_action);
        let required = format!("{}:{}", required_resource, required_action);
        prop_assert!(
            !svc.is_permission_implied(&held, &required),
            "{} should not imply {}",
            held,
            required
        );
    }

    #[test]
    fn action_mismatch_is_not_implied(
        resource in resource_strategy(),
        held_action in action_strategy(),
        required_action in action_strategy(),
    ) {
        prop_assume!(held_action != required_action);

        let svc = PermissionService::new();
        let held = format!("{}:{}", resource, held_action);
        let required = format!("{}:{}", resource, required_action);
        prop_assert!(!svc.is_permission_implied(&held, &required));
    }
}

// Property: status enums round-trip between their stored string and parsed
// forms, and serde writes the same string Display produces
proptest! {
    #[test]
    fn order_status_survives_string_round_trip(status in order_status_strategy()) {
        let text = status.to_string();
        prop_assert_eq!(text.clone(), text.to_lowercase());
        prop_assert_eq!(text.parse::<OrderStatus>(), Ok(status));

        let as_json = serde_json::to_value(status).expect("serialize status");
        prop_assert_eq!(as_json, serde_json::Value::String(text));
    }

    #[test]
    fn sale_status_survives_string_round_trip(status in sale_status_strategy()) {
        let text = status.to_string();
        prop_assert_eq!(text.clone(), text.to_lowercase());
        prop_assert_eq!(text.parse::<SaleStatus>(), Ok(status));

        let as_json = serde_json::to_value(status).expect("serialize status");
        prop_assert_eq!(as_json, serde_json::Value::String(text));
    }

    #[test]
    fn return_status_survives_string_round_trip(status in return_status_strategy()) {
        let text = status.to_string();
        prop_assert_eq!(text.clone(), text.to_lowercase());
        prop_assert_eq!(text.parse::<ReturnStatus>(), Ok(status));

        let as_json = serde_json::to_value(status).expect("serialize status");
        prop_assert_eq!(as_json, serde_json::Value::String(text));
    }

    #[test]
    fn message_type_survives_string_round_trip(message_type in message_type_strategy()) {
        let text = message_type.to_string();
        prop_assert_eq!(text.clone(), text.to_lowercase());
        prop_assert_eq!(text.parse::<MessageType>(), Ok(message_type));

        let as_json = serde_json::to_value(message_type).expect("serialize message type");
        prop_assert_eq!(as_json, serde_json::Value::String(text));
    }

    #[test]
    fn unrecognized_status_strings_are_rejected(s in "[a-z]{1,12}") {
        if !["pending", "accepted", "rejected", "cancelled"].contains(&s.as_str()) {
            prop_assert!(s.parse::<OrderStatus>().is_err());
        }
        if !["completed", "pending", "cancelled"].contains(&s.as_str()) {
            prop_assert!(s.parse::<SaleStatus>().is_err());
        }
        if !["pending", "approved", "rejected"].contains(&s.as_str()) {
            prop_assert!(s.parse::<ReturnStatus>().is_err());
        }
        if !["accept", "reject", "question", "info"].contains(&s.as_str()) {
            prop_assert!(s.parse::<MessageType>().is_err());
        }
    }
}

// Property: pagination arithmetic never strands or invents rows
proptest! {
    #![proptest_config(ProptestConfig::with_cases(1000))]

    #[test]
    fn total_pages_covers_all_rows(total in 0u64..10_000_000, limit in 1u64..1_000) {
        let pages = total_pages(total, limit);
        prop_assert!(pages * limit >= total, "pages do not cover {} rows", total);
        if total == 0 {
            prop_assert_eq!(pages, 0);
        } else {
            prop_assert!((pages - 1) * limit < total, "last page would be empty");
        }
    }

    #[test]
    fn zero_limit_yields_zero_pages(total in any::<u64>()) {
        prop_assert_eq!(total_pages(total, 0), 0);
    }

    #[test]
    fn page_or_first_never_returns_zero(requested in proptest::option::of(any::<u64>())) {
        prop_assert!(page_or_first(requested) >= 1);
    }
}
