use super::*;

#[test]
fn dead_assignment() {
    optimizes_to(
        dead_code_elimination,
        "fun main() { x := 1; y := 2; output x }",
        "fun main() { x := 1; output x }",
    );
}

#[test]
fn overwritten_before_use() {
    optimizes_to(
        dead_code_elimination,
        "fun main(a) { x := a; x := 2; output x }",
        "fun main(a) { x := 2; output x }",
    );
}

#[test]
fn static_conditions() {
    optimizes_to(
        dead_code_elimination,
        r#"
        fun main(y) {
          if false then output y else skip;
          while 1 < 0 do output y;
          if not (1 = 2) and true then { output 1; output 2 } else output 3;
          output 4
        }
        "#,
        r#"
        fun main(y) {
          output 1;
          output 2;
          output 4
        }
        "#,
    );
}

#[test]
fn undecidable_conditions_are_kept() {
    let code = r#"
    fun main(a) {
      while a < 3 do a := a + 1;
      if true or a = 1 then output a else skip;
      return a
    }
    "#;
    optimizes_to(
        dead_code_elimination,
        code,
        r#"
        fun main(a) {
          while a < 3 do a := a + 1;
          output a;
          return a
        }
        "#,
    );
}

#[test]
fn emptied_bodies_keep_a_skip() {
    optimizes_to(
        dead_code_elimination,
        r#"
        fun main(a) {
          if a < 1 then { x := 1 } else x := 2;
          while a < 1 do { y := 3; skip };
          z := 4
        }
        "#,
        r#"
        fun main(a) {
          if a < 1 then { skip } else skip;
          while a < 1 do { skip }
        }
        "#,
    );
}

#[test]
fn everything_dead() {
    optimizes_to(
        dead_code_elimination,
        "fun main() { x := 1; skip; y := 2 }",
        "fun main() { skip }",
    );
}

#[test]
fn blocks_are_flattened() {
    optimizes_to(
        dead_code_elimination,
        "fun main(a) { output a; { output 1; { skip } }; skip; output 2 }",
        "fun main(a) { output a; output 1; output 2 }",
    );
}

#[test]
fn calls_and_uncalled_functions() {
    optimizes_to(
        dead_code_elimination,
        r#"
        fun unused(p) { return p }
        fun g() { output 7; return 1 }
        fun h(q) { return q }
        fun main() { x := g(); y := 5; z := h(y); output 0 }
        "#,
        r#"
        fun g() { output 7; return 1 }
        fun h(q) { return q }
        fun main() { x := g(); y := 5; z := h(y); output 0 }
        "#,
    );
}

#[test]
fn already_clean() {
    let code = r#"
    fun main(a) {
      if a < 1 then { skip } else output a;
      return a
    }
    "#;
    optimizes_to(dead_code_elimination, code, code);
}

#[test]
fn pruned_branch_leaves_skip() {
    optimizes_to(
        dead_code_elimination,
        "fun main(y) { if false then output y else skip }",
        "fun main(y) { skip }",
    );
}
