// ABOUTME: Trybuild runner for compile-time type safety tests.
// ABOUTME: Verifies that out-of-order deployment transitions fail to compile.

#[test]
fn switch_not_available_before_gates() {
    let t = trybuild::TestCases::new();
    t.compile_fail("tests/compile_fail/switch_before_gates.rs");
}

#[test]
fn force_not_available_after_switch() {
    let t = trybuild::TestCases::new();
    t.compile_fail("tests/compile_fail/force_after_switch.rs");
}

#[test]
fn rollback_not_available_on_verified() {
    let t = trybuild::TestCases::new();
    t.compile_fail("tests/compile_fail/rollback_on_verified.rs");
}
