// tests for the control-flow graph builder.

use super::*;
use crate::front_end::parse;

fn cfg_of(code: &str) -> Cfg {
    Cfg::new(&parse(code).unwrap()).unwrap()
}

fn succs(cfg: &Cfg, inst: InstId) -> Vec<InstId> {
    cfg.succ(inst).collect()
}

fn find(cfg: &Cfg, text: &str) -> InstId {
    cfg.instructions()
        .find(|(_, inst)| inst.to_string() == text)
        .unwrap_or_else(|| panic!("no instruction `{text}` in\n{cfg}"))
        .0
}

#[test]
fn straight_line() {
    let cfg = cfg_of("fun main() { x := 1; y := x + 1; output y }");

    assert_eq!(cfg.len(), 4);
    assert_eq!(cfg.entry, 0);
    assert_eq!(cfg.instruction(0).to_string(), "entry main()");
    assert_eq!(succs(&cfg, 0), vec![1]);
    assert_eq!(succs(&cfg, 1), vec![2]);
    assert_eq!(succs(&cfg, 2), vec![3]);
    assert!(succs(&cfg, 3).is_empty());
    assert_eq!(cfg.pred(3).collect::<Vec<_>>(), vec![2]);
    assert_eq!(cfg.exits().collect::<Vec<_>>(), vec![3]);

    let vars: Vec<String> = cfg.vars().iter().map(|x| x.to_string()).collect();
    assert_eq!(vars, vec!["main.x", "main.y"]);
}

#[test]
fn branches_and_loops() {
    let cfg = cfg_of(
        r#"
        fun main(a) {
          if a < 0 then x := 1 else x := 2;
          while x < 10 do x := x + 1;
          output x
        }
        "#,
    );

    let test_if = find(&cfg, "test main.a < 0");
    let tt = find(&cfg, "main.x := 1");
    let ff = find(&cfg, "main.x := 2");
    let test_while = find(&cfg, "test main.x < 10");
    let body = find(&cfg, "main.x := main.x + 1");
    let out = find(&cfg, "output main.x");

    assert_eq!(succs(&cfg, test_if), vec![tt, ff]);
    assert_eq!(succs(&cfg, tt), vec![test_while]);
    assert_eq!(succs(&cfg, ff), vec![test_while]);
    assert_eq!(succs(&cfg, test_while), vec![body, out]);
    assert_eq!(succs(&cfg, body), vec![test_while]);
    assert_eq!(cfg.pred(test_while).collect::<Vec<_>>(), vec![tt, ff, body]);
}

#[test]
fn calls() {
    let cfg = cfg_of(
        r#"
        fun f(p) { if p < 0 then return 0 else return p }
        fun main() { a := f(1); b := f(2); output b }
        "#,
    );

    let f = cfg.function_entry("f").unwrap();
    let call1 = find(&cfg, "call f(1)");
    let call2 = find(&cfg, "call f(2)");
    let res1 = find(&cfg, "main.a := ret f");
    let res2 = find(&cfg, "main.b := ret f");
    let ret0 = find(&cfg, "return 0");
    let retp = find(&cfg, "return f.p");

    assert_eq!(succs(&cfg, call1), vec![f, res1]);
    assert_eq!(cfg.call_def(call1), Some(f));
    assert_eq!(cfg.call_sites(f).collect::<Vec<_>>(), vec![call1, call2]);

    // context-insensitive: every return flows to every call site.
    assert_eq!(succs(&cfg, ret0), vec![res1, res2]);
    assert_eq!(succs(&cfg, retp), vec![res1, res2]);
    assert_eq!(succs(&cfg, res1), vec![call2]);

    assert_eq!(cfg.function_of(retp), "f");
    assert_eq!(cfg.function_of(res1), "main");
    assert_eq!(cfg.entry, cfg.function_entry("main").unwrap());

    let params: Vec<(&str, &str)> = cfg
        .function_vars("f")
        .unwrap()
        .iter()
        .map(|x| (x.scope(), x.name()))
        .collect();
    assert_eq!(params, vec![("f", "p")]);
}

#[test]
fn return_ends_control_flow() {
    let cfg = cfg_of("fun main() { return 1; output 2 }");
    let ret = find(&cfg, "return 1");
    let out = find(&cfg, "output 2");

    assert!(succs(&cfg, ret).is_empty());
    assert!(cfg.pred(out).next().is_none());
}

#[test]
fn node_paths() {
    let cfg = cfg_of("fun main() { x := 1; while x < 3 do { y := f(x) } }\nfun f(a) { return a }");

    let body = NodePath::function(0).child(0);
    assert_eq!(cfg.inst_at(&NodePath::function(0)), Some(cfg.entry));
    assert_eq!(cfg.inst_at(&body.child(0)), Some(find(&cfg, "main.x := 1")));

    let test = body.child(1).child(0);
    assert_eq!(cfg.inst_at(&test), Some(find(&cfg, "test main.x < 3")));

    let assign = body.child(1).child(1).child(0);
    assert_eq!(cfg.inst_at(&assign), Some(find(&cfg, "main.y := ret f")));
    assert_eq!(cfg.inst_at(&assign.child(0)), Some(find(&cfg, "call f(main.x)")));

    assert_eq!(cfg.inst_at(&NodePath::function(1).child(0).child(0)), Some(find(&cfg, "return f.a")));
}

#[test]
fn empty_blocks_are_transparent() {
    let program = Program {
        functions: vec![FunctionDef {
            name: "main".to_string(),
            params: vec![],
            body: Stmt::Block(vec![
                Stmt::Output(Atom::Int(1)),
                Stmt::Block(vec![]),
                Stmt::Output(Atom::Int(2)),
            ]),
        }],
    };
    let cfg = Cfg::new(&program).unwrap();

    assert_eq!(succs(&cfg, find(&cfg, "output 1")), vec![find(&cfg, "output 2")]);
}

#[test]
fn build_errors() {
    let err = |code: &str| Cfg::new(&parse(code).unwrap()).unwrap_err();

    assert_eq!(Cfg::new(&Program::default()).unwrap_err(), Error::EmptyProgram);
    assert_eq!(err("fun f() { skip }"), Error::NoMainFunction);
    assert_eq!(
        err("fun main() { x := g(1) }"),
        Error::UnknownFunction("g".to_string())
    );
    assert_eq!(
        err("fun main() { skip }\nfun main() { skip }"),
        Error::DuplicateFunction("main".to_string())
    );
    assert_eq!(
        err("fun f(a, b) { return a }\nfun main() { x := f(1) }"),
        Error::ArityMismatch {
            callee: "f".to_string(),
            expected: 2,
            found: 1
        }
    );
}

#[test]
fn mermaid() {
    let cfg = cfg_of("fun main() { output 1 }");
    assert_eq!(
        cfg.to_mermaid(),
        "flowchart TD\n    i0[\"0: entry main()\"]\n    i1[\"1: output 1\"]\n    i0 --> i1\n"
    );
}
