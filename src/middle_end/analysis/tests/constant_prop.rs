// tests for constant propagation.

use collapse::*;

use super::super::constant_prop::{analyze, Value};
use super::*;

#[test]
fn straight_line() {
    let cfg = cfg_of("fun main() { x := 1; y := x + 1; output y }");
    let result = analyze(&cfg).unwrap();

    let y = find(&cfg, "main.y := main.x + 1");
    assert_eq!(result.get_lattice_value(y, &var("main.y")), Value::Constant(2));
    assert_eq!(result.value_before(y, &var("main.y")), Value::Top);

    collapsed_eq!(
        &result.transferred(find(&cfg, "output main.y")).to_string(),
        "main.x -> 1
         main.y -> 2"
    );
}

#[test]
fn branch_join() {
    let cfg = cfg_of(
        r#"
        fun main(a) {
          if a < 0 then x := 1 else x := 2;
          if a < 0 then y := 3 else y := 3;
          output x
        }
        "#,
    );
    let result = analyze(&cfg).unwrap();

    collapsed_eq!(
        &result.transferred(find(&cfg, "output main.x")).to_string(),
        "main.a -> Top
         main.x -> Top
         main.y -> 3"
    );
}

#[test]
fn loop_converges() {
    let cfg = cfg_of("fun main() { x := 0; while x < 10 do x := x + 1; output x }");
    let result = analyze(&cfg).unwrap();

    let out = find(&cfg, "output main.x");
    assert_eq!(result.value_before(out, &var("main.x")), Value::Top);
    let test = find(&cfg, "test main.x < 10");
    assert_eq!(result.value_before(test, &var("main.x")), Value::Top);
}

#[test]
fn loop_invariant_constant() {
    let cfg = cfg_of("fun main(n) { c := 7; i := 0; while i < n do i := i + c; output c }");
    let result = analyze(&cfg).unwrap();

    let out = find(&cfg, "output main.c");
    assert_eq!(result.value_before(out, &var("main.c")), Value::Constant(7));
    assert_eq!(result.value_before(out, &var("main.i")), Value::Top);
    assert_eq!(result.value_before(out, &var("main.n")), Value::Top);
}

#[test]
fn single_call_site() {
    let cfg = cfg_of(
        r#"
        fun f(a) { r := a + 1; return r }
        fun main() { y := f(5); output y }
        "#,
    );
    let result = analyze(&cfg).unwrap();

    let entry = cfg.function_entry("f").unwrap();
    assert_eq!(result.get_lattice_value(entry, &var("f.a")), Value::Constant(5));

    let call = find(&cfg, "main.y := ret f");
    assert_eq!(result.get_lattice_value(call, &var("main.y")), Value::Constant(6));
}

#[test]
fn call_sites_are_merged() {
    let cfg = cfg_of(
        r#"
        fun f(a) { r := a + 1; return r }
        fun main() { y := f(5); z := f(7); output y }
        "#,
    );
    let result = analyze(&cfg).unwrap();

    let entry = cfg.function_entry("f").unwrap();
    assert_eq!(result.get_lattice_value(entry, &var("f.a")), Value::Top);
    let y = find(&cfg, "main.y := ret f");
    assert_eq!(result.get_lattice_value(y, &var("main.y")), Value::Top);
    let z = find(&cfg, "main.z := ret f");
    assert_eq!(result.get_lattice_value(z, &var("main.z")), Value::Top);
}

#[test]
fn caller_state_survives_the_call() {
    let cfg = cfg_of(
        r#"
        fun id(a) { return a }
        fun main() { x := 3; y := id(x); output x }
        "#,
    );
    let result = analyze(&cfg).unwrap();

    let out = find(&cfg, "output main.x");
    assert_eq!(result.value_before(out, &var("main.x")), Value::Constant(3));
    assert_eq!(result.value_before(out, &var("main.y")), Value::Constant(3));
}

#[test]
fn recursion_terminates() {
    let cfg = cfg_of(
        r#"
        fun fact(n) {
          if n < 1 then return 1 else skip;
          m := n - 1;
          r := fact(m);
          s := n * r;
          return s
        }
        fun main() { x := fact(5); output x }
        "#,
    );
    let result = analyze(&cfg).unwrap();

    let entry = cfg.function_entry("fact").unwrap();
    assert_eq!(result.get_lattice_value(entry, &var("fact.n")), Value::Top);
    let x = find(&cfg, "main.x := ret fact");
    assert_eq!(result.get_lattice_value(x, &var("main.x")), Value::Top);
}

#[test]
fn unreachable_code_stays_bottom() {
    let cfg = cfg_of(
        r#"
        fun unused(p) { q := p; return q }
        fun main() { return 1; x := 2 }
        "#,
    );
    let result = analyze(&cfg).unwrap();

    let x = find(&cfg, "main.x := 2");
    assert_eq!(result.get_lattice_value(x, &var("main.x")), Value::Bottom);
    assert_eq!(result.transferred(x).to_string(), "");

    let q = find(&cfg, "unused.q := unused.p");
    assert_eq!(result.get_lattice_value(q, &var("unused.q")), Value::Bottom);
}

#[test]
fn arithmetic_wraps() {
    let cfg = cfg_of("fun main() { x := 9223372036854775807; y := x + 1; z := y * 2; output z }");
    let result = analyze(&cfg).unwrap();

    let out = find(&cfg, "output main.z");
    assert_eq!(result.value_before(out, &var("main.y")), Value::Constant(i64::MIN));
    assert_eq!(result.value_before(out, &var("main.z")), Value::Constant(0));
}

#[test]
fn main_parameters_are_unknown() {
    let cfg = cfg_of("fun main(a, b) { c := a + 1; output b }");
    let result = analyze(&cfg).unwrap();

    assert_eq!(result.get_lattice_value(cfg.entry, &var("main.a")), Value::Top);
    let c = find(&cfg, "main.c := main.a + 1");
    assert_eq!(result.get_lattice_value(c, &var("main.c")), Value::Top);
}
