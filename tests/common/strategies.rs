//! Proptest strategies.

#![allow(dead_code)]

use proptest::prelude::*;
use sbb_core::error::FaultKind;

pub fn fault_kind_strategy() -> impl Strategy<Value = FaultKind> {
    prop_oneof![
        Just(FaultKind::Messaging),
        Just(FaultKind::Authentication),
        Just(FaultKind::Authorization),
        Just(FaultKind::Generic),
    ]
}

/// Free text including markup characters that must be escaped
pub fn reason_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9 <>&\"'/:._-]{0,64}"
}

/// Candidate list size and a number of cursor pulls beyond it
pub fn cursor_strategy() -> impl Strategy<Value = (usize, usize)> {
    (0usize..16, 0usize..32)
}
