//! Inlining hygiene and formal/actual substitution across call sites.

use arbp::{compile, CompileError, Environment, MemStore, Value};

/// A top-level program that calls the shipped boundary test twice with
/// different output bindings.
const DOUBLE_TEST: &str = "\
!!ARBfp1.0
{{ arb_include('textest.prog') }}
TEMP testA;
TEMP testB;
{{ arb_call('textest.prog', texCoord='{{ varying_coordA }}', out_result='testA') }}
{{ arb_call('textest.prog', texCoord='{{ varying_coordB }}', out_result='testB') }}
KIL testA.x;
KIL testB.x;
MOV result.color, testA;
END
";

fn double_env() -> Environment {
    Environment::new()
        .with("coordA", Value::varying())
        .with("coordB", Value::varying())
}

#[test]
fn sibling_calls_get_distinct_scratch_registers() {
    let store = MemStore::with_builtins().with("double.prog", DOUBLE_TEST);
    let program = compile(&store, "double.prog", &double_env()).unwrap();
    let text = &program.text;

    // The subroutine's internal `below`/`above` temps must be renamed
    // differently at each call site.
    assert!(text.contains("TEMP below_inl0;"), "first site scratch:\n{text}");
    assert!(text.contains("TEMP below_inl1;"), "second site scratch:\n{text}");
    assert!(text.contains("TEMP above_inl0;"));
    assert!(text.contains("TEMP above_inl1;"));
    // The un-suffixed names must be gone entirely.
    assert!(!text.contains("TEMP below;"));
    assert!(!text.contains("TEMP above;"));
}

#[test]
fn formals_are_fully_replaced_by_actuals() {
    let store = MemStore::with_builtins().with("double.prog", DOUBLE_TEST);
    let program = compile(&store, "double.prog", &double_env()).unwrap();
    let text = &program.text;

    // No formal name survives in the output.
    assert!(!text.contains("texCoord"), "unsubstituted formal in:\n{text}");
    assert!(!text.contains("out_result"), "unsubstituted formal in:\n{text}");
    // Each call saw its own coordinate and its own output register.
    assert!(text.contains("SGE below_inl0, fragment.texcoord[0],"));
    assert!(text.contains("SGE below_inl1, fragment.texcoord[1],"));
    assert!(text.contains("MUL testA, below_inl0, above_inl0;"));
    assert!(text.contains("MUL testB, below_inl1, above_inl1;"));
}

#[test]
fn kill_follows_the_boundary_test_in_program_order() {
    let store = MemStore::with_builtins().with("double.prog", DOUBLE_TEST);
    let program = compile(&store, "double.prog", &double_env()).unwrap();
    let text = &program.text;

    let test_a_written = text.find("SUB testA, testA,").unwrap();
    let kil_a = text.find("KIL testA.x;").unwrap();
    assert!(test_a_written < kil_a);
}

#[test]
fn caller_register_named_like_callee_scratch_is_not_aliased() {
    // `top.prog` owns a `scratch` register and passes it as the output of a
    // subroutine that keeps private state in its own `scratch`. The two must
    // end up as distinct registers with distinct declarations.
    let store = MemStore::empty()
        .with(
            "top.prog",
            "!!ARBfp1.0\n\
             {{ arb_include('accum.prog') }}\n\
             TEMP scratch;\n\
             MOV scratch, fragment.texcoord[0];\n\
             {{ arb_call('accum.prog', out='scratch') }}\n\
             MOV result.color, scratch;\n\
             END\n",
        )
        .with(
            "accum.prog",
            "TEMP scratch;\n\
             MOV scratch, { 0, 0, 0, 0 };\n\
             ADD {{ out }}, {{ out }}, scratch;\n",
        );
    let program = compile(&store, "top.prog", &Environment::new()).unwrap();
    let text = &program.text;

    assert!(text.contains("TEMP scratch_inl0;"), "callee scratch renamed:\n{text}");
    assert!(text.contains("ADD scratch, scratch, scratch_inl0;"), "{text}");
    assert_eq!(text.matches("TEMP scratch;").count(), 1, "{text}");
}

#[test]
fn extra_call_argument_is_an_argument_mismatch() {
    let source = "\
!!ARBfp1.0
{{ arb_include('textest.prog') }}
TEMP test;
{{ arb_call('textest.prog', texCoord='{{ varying_coordA }}', out_result='test', typo='x') }}
MOV result.color, test;
END
";
    let store = MemStore::with_builtins().with("bad.prog", source);
    match compile(&store, "bad.prog", &double_env()) {
        Err(CompileError::ArgumentMismatch { callee, extra, missing, .. }) => {
            assert_eq!(callee, "textest.prog");
            assert_eq!(extra, vec!["typo".to_string()]);
            assert!(missing.is_empty());
        }
        other => panic!("expected ArgumentMismatch, got {other:?}"),
    }
}

#[test]
fn missing_call_argument_is_an_argument_mismatch() {
    let source = "\
!!ARBfp1.0
{{ arb_include('textest.prog') }}
TEMP test;
{{ arb_call('textest.prog', out_result='test') }}
MOV result.color, test;
END
";
    let store = MemStore::with_builtins().with("bad.prog", source);
    match compile(&store, "bad.prog", &Environment::new()) {
        Err(CompileError::ArgumentMismatch { missing, .. }) => {
            assert_eq!(missing, vec!["texCoord".to_string()]);
        }
        other => panic!("expected ArgumentMismatch, got {other:?}"),
    }
}

#[test]
fn error_inside_a_subroutine_reports_the_call_chain() {
    let store = MemStore::empty()
        .with(
            "top.prog",
            "!!ARBfp1.0\n\
             {{ arb_include('mid.prog') }}\n\
             {{ arb_include('leaf.prog') }}\n\
             {{ arb_call('mid.prog', out='res') }}\n\
             MOV result.color, res;\n\
             END\n",
        )
        .with("mid.prog", "{{ arb_call('leaf.prog', dst='{{ out }}') }}\n")
        .with("leaf.prog", "MOV {{ dst }}, {{ stray }};\n");
    match compile(&store, "top.prog", &Environment::new()) {
        Err(CompileError::ArgumentMismatch { callee, chain, missing, .. }) => {
            // `leaf.prog` references `stray`, which `mid.prog` never supplies.
            assert_eq!(callee, "leaf.prog");
            assert_eq!(missing, vec!["stray".to_string()]);
            assert_eq!(chain.0, vec!["top.prog".to_string(), "mid.prog".to_string()]);
        }
        other => panic!("expected ArgumentMismatch, got {other:?}"),
    }
}

#[test]
fn circular_subroutines_fail_with_the_revisited_chain() {
    let store = MemStore::empty()
        .with(
            "top.prog",
            "!!ARBfp1.0\n\
             {{ arb_include('ouro.prog') }}\n\
             {{ arb_call('ouro.prog') }}\n\
             END\n",
        )
        .with("ouro.prog", "{{ arb_call('ouro.prog') }}\n");
    match compile(&store, "top.prog", &Environment::new()) {
        Err(CompileError::CircularInclude { name, chain }) => {
            assert_eq!(name, "ouro.prog");
            assert_eq!(chain.0.last().map(String::as_str), Some("ouro.prog"));
        }
        other => panic!("expected CircularInclude, got {other:?}"),
    }
}
