//! Proptest strategies for engine value types.

#![allow(dead_code)] // Each test binary uses its own slice of these helpers.

use proptest::prelude::*;
use serde_json::Value;

use stratus_core::runtime::RetryPolicy;

/// Policies with a cap at or above the base delay, matching what
/// configuration validation admits.
pub fn retry_policy_strategy() -> impl Strategy<Value = RetryPolicy> {
    (
        1u32..=10,
        1u64..=1_000,
        0u64..=5_000,
        1.0f64..=4.0,
        any::<bool>(),
    )
        .prop_map(
            |(max_attempts, base_delay_ms, headroom, backoff_multiplier, jitter)| RetryPolicy {
                max_attempts,
                base_delay_ms,
                max_delay_ms: base_delay_ms + headroom,
                backoff_multiplier,
                jitter,
            },
        )
}

/// Arbitrary JSON documents a few levels deep.
pub fn json_value_strategy() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::from),
        any::<i64>().prop_map(Value::from),
        "[a-zA-Z0-9_ ]{0,12}".prop_map(Value::from),
    ];
    leaf.prop_recursive(3, 24, 6, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..6).prop_map(Value::from),
            prop::collection::btree_map("[a-z_]{1,8}", inner, 0..6)
                .prop_map(|object| Value::Object(object.into_iter().collect())),
        ]
    })
}
