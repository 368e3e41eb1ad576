// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn hex_id_gen_produces_valid_24_hex() {
    let gen = HexIdGen;
    let id = gen.next();
    assert_eq!(id.len(), 24);
    assert!(is_valid_execution_id(&id), "{id}");
}

#[test]
fn hex_id_gen_is_unique() {
    let gen = HexIdGen;
    let a = gen.next();
    let b = gen.next();
    assert_ne!(a, b);
}

#[test]
fn sequential_gen_is_deterministic_and_valid() {
    let gen = SequentialIdGen::new();
    assert_eq!(gen.next(), "000000000000000000000001");
    assert_eq!(gen.next(), "000000000000000000000002");
    assert!(is_valid_execution_id(&gen.next()));
}

#[yare::parameterized(
    valid        = { "0123456789abcdef01234567", true },
    too_short    = { "0123456789abcdef", false },
    too_long     = { "0123456789abcdef0123456789", false },
    uppercase    = { "0123456789ABCDEF01234567", false },
    non_hex      = { "0123456789abcdef0123456g", false },
    empty        = { "", false },
)]
fn id_format_validation(id: &str, valid: bool) {
    assert_eq!(is_valid_execution_id(id), valid);
}
