use super::*;

fn optimized(code: &str) -> (Program, OptimizationReport) {
    optimize(code.parse().unwrap(), &Options::default()).unwrap()
}

#[test]
fn folds_and_prunes_to_a_fixpoint() {
    let (program, report) = optimized(
        r#"
        fun main() {
          x := 1;
          y := x + 1;
          if y < 3 then z := y * 10 else z := 0;
          output z
        }
        "#,
    );

    assert_eq!(program, "fun main() { output 20 }".parse::<Program>().unwrap());
    assert!(report.changed);
    assert_eq!(report.instructions_after, 2);
    assert!(report.instructions_before > report.instructions_after);
}

#[test]
fn removes_functions_that_become_uncalled() {
    let (program, _) = optimized(
        r#"
        fun leaf(a) { return a }
        fun mid(b) { c := leaf(b); return c }
        fun main() { if false then { d := mid(1); output d } else skip; output 2 }
        "#,
    );

    assert_eq!(program, "fun main() { output 2 }".parse::<Program>().unwrap());
}

#[test]
fn idempotent() {
    let code = r#"
    fun sum(n) {
      s := 0;
      i := 0;
      while i < n do { s := s + i; i := i + 1 };
      return s
    }
    fun main(k) {
      t := 4;
      u := t * t;
      r := sum(k);
      if k < 0 then output u else output r;
      return 0
    }
    "#;
    let (once, _) = optimized(code);
    let (twice, report) = optimize(once.clone(), &Options::default()).unwrap();

    assert_eq!(twice, once);
    assert!(!report.changed);
    assert_eq!(report.rounds, 1);
}

#[test]
fn options_select_passes() {
    let code = "fun main() { x := 1; y := x + 1; output y }";

    let fold_only = Options {
        dead_code_elimination: false,
        ..Options::default()
    };
    let (program, _) = optimize(code.parse().unwrap(), &fold_only).unwrap();
    assert_eq!(program, "fun main() { x := 1; y := 2; output 2 }".parse::<Program>().unwrap());

    let nothing = Options {
        constant_folding: false,
        dead_code_elimination: false,
        max_rounds: None,
    };
    let (program, report) = optimize(code.parse().unwrap(), &nothing).unwrap();
    assert_eq!(program, code.parse::<Program>().unwrap());
    assert_eq!(report.rounds, 1);
    assert!(!report.changed);
}

#[test]
fn round_cap() {
    let code = "fun main(a) { x := a; y := x; output 5 }";
    let options = Options {
        max_rounds: Some(1),
        ..Options::default()
    };
    let (program, report) = optimize(code.parse().unwrap(), &options).unwrap();

    assert_eq!(report.rounds, 1);
    assert!(report.changed);
    // the assignment to x only becomes dead once y's is gone.
    assert_eq!(program, "fun main(a) { x := a; output 5 }".parse::<Program>().unwrap());

    let (program, report) = optimize(code.parse().unwrap(), &Options::default()).unwrap();
    assert_eq!(report.rounds, 3);
    assert_eq!(program, "fun main(a) { output 5 }".parse::<Program>().unwrap());
}

#[test]
fn empty_program() {
    let (program, report) = optimize(Program::default(), &Options::default()).unwrap();
    assert_eq!(program, Program::default());
    assert_eq!(report, OptimizationReport::default());
}

#[test]
fn errors_are_reported() {
    let program = "fun f() { return 1 }".parse::<Program>().unwrap();
    assert_eq!(
        optimize(program, &Options::default()).unwrap_err(),
        Error::NoMainFunction
    );
}

#[test]
fn behavior_is_preserved() {
    preserves_behavior(
        r#"
        fun fib(n) {
          a := 0;
          b := 1;
          i := 0;
          while i < n do { t := a + b; a := b; b := t; i := i + 1 };
          return a
        }
        fun sign(x) {
          if x < 0 then r := -1 else { if x = 0 then r := 0 else r := 1 };
          return r
        }
        fun main(m) {
          k := 10;
          z := k - 10;
          f := fib(k);
          output f;
          s := sign(m);
          output s;
          unused := f * 2;
          if z = 0 then output k else output z;
          w := fib(m);
          return w
        }
        "#,
        &[&[0], &[1], &[7], &[-4]],
    );
}

#[test]
fn recursive_behavior_is_preserved() {
    preserves_behavior(
        r#"
        fun fact(n) {
          if n < 1 then return 1 else skip;
          m := n - 1;
          r := fact(m);
          s := n * r;
          return s
        }
        fun main(a) {
          one := 1;
          x := fact(a);
          output x;
          y := x + one;
          return y
        }
        "#,
        &[&[0], &[5], &[20], &[30]],
    );
}
