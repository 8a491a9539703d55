//! Integration tests for AerScript using `Compiler` as the entry point.
//!
//! These tests run the full pipeline (lexing, expression trees, code
//! generation) over complete scripts from `test_scripts/`.

use aerscript::prelude::*;
use std::path::PathBuf;

/// Load a test script from the test_scripts directory.
fn load_script(filename: &str) -> String {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("test_scripts")
        .join(filename);
    std::fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("Failed to read {}: {}", path.display(), e))
}

/// Compile a test script with `config`, returning the outcome and every
/// diagnostic it produced.
fn compile_with(filename: &str, config: CompilerConfig) -> (Compilation, Diagnostics) {
    let _ = aerscript::logging::init();
    let mut diagnostics = Diagnostics::new();
    let compilation = Compiler::new(config.with_file_name(filename))
        .compile(&load_script(filename), &mut diagnostics)
        .expect("compilation aborted");
    (compilation, diagnostics)
}

/// Compile a test script that is expected to be free of errors.
fn build_script(filename: &str) -> Program {
    let (compilation, diagnostics) = compile_with(filename, CompilerConfig::default());
    assert!(
        !diagnostics.has_errors(),
        "{filename}: {:?}",
        diagnostics.errors().map(ToString::to_string).collect::<Vec<_>>()
    );
    compilation.into_program().expect("program with errors")
}

fn ops(code: &InstrList) -> Vec<Opcode> {
    code.iter().map(|i| i.op).collect()
}

/// Every jump target indexes the container holding the jump.
fn assert_jumps_in_bounds(program: &Program) {
    for (name, code) in program.containers() {
        for (idx, instr) in code.iter().enumerate() {
            if instr.op.is_jump() {
                assert!(instr.p2 <= code.len(), "{name}:{idx} {instr:?}");
                assert_ne!(instr.p2 as usize, idx, "{name}:{idx} {instr:?}");
            }
        }
    }
}

// =============================================================================
// Basic Programs
// =============================================================================

#[test]
fn test_hello_world() {
    let program = build_script("hello_world.aer");
    assert_eq!(ops(&program.main).last(), Some(&Opcode::Done));
    assert!(ops(&program.main).contains(&Opcode::Call));
}

#[test]
fn test_control_flow() {
    let program = build_script("control_flow.aer");
    let main = ops(&program.main);
    for op in [Opcode::Jmpz, Opcode::Jmp, Opcode::ForeachInit, Opcode::ForeachStep, Opcode::Switch, Opcode::Halt] {
        assert!(main.contains(&op), "missing {op:?}");
    }
    assert_eq!(program.switches.len(), 1);
    assert_eq!(program.switches[0].cases.len(), 3);
    assert!(program.switches[0].default_start.is_some());
    assert_eq!(program.foreach.len(), 1);

    assert_jumps_in_bounds(&program);
}

#[test]
fn test_nested_flow() {
    let program = build_script("nested_flow.aer");
    assert_jumps_in_bounds(&program);

    let classify = program.function("classify").unwrap();
    assert!(classify.has_static("seen"));
    assert!(ops(&classify.code).contains(&Opcode::Switch));

    assert_eq!(program.exceptions.len(), 2);
    let outer = &program.exceptions[0].catches[0].code;
    assert!(ops(outer).contains(&Opcode::ForeachStep));
    let inner = &program.exceptions[1].catches[0].code;
    let throw = inner.iter().find(|i| i.op == Opcode::Throw).unwrap();
    assert_eq!(throw.p2, inner.len() - 1);

    assert_eq!(program.closures.len(), 1);
    assert!(ops(&program.closures[0].code).contains(&Opcode::Jmpnz));
}

#[test]
fn test_every_script_keeps_jumps_in_their_container() {
    for script in [
        "hello_world.aer",
        "control_flow.aer",
        "functions.aer",
        "classes.aer",
        "exceptions.aer",
        "nested_flow.aer",
    ] {
        assert_jumps_in_bounds(&build_script(script));
    }
    let (compilation, _) = compile_with("template.aer", CompilerConfig::new().with_embedded(true));
    assert_jumps_in_bounds(compilation.program());
}

// =============================================================================
// Functions and Closures
// =============================================================================

#[test]
fn test_functions() {
    let program = build_script("functions.aer");
    assert_eq!(program.overloads("add").count(), 2);

    let counter = program.function("counter").unwrap();
    assert!(counter.has_static("calls"));

    let pick = program.function("pick").unwrap();
    assert_eq!(pick.args.len(), 2);
    assert!(pick.args[0].is_by_ref());
    assert!(pick.args[1].default.is_some());

    // Only the function with a `using` clause is a closure; the other is
    // installed under a generated name.
    assert_eq!(program.closures.len(), 1);
    assert_eq!(program.closures[0].captures[0].name, "offset");
    assert!(program.function("{closure_0}").is_some());
}

// =============================================================================
// Classes
// =============================================================================

#[test]
fn test_classes() {
    let program = build_script("classes.aer");
    let shape = program.class("Shape").unwrap();
    assert!(shape.is_interface());

    let base = program.class("Base").unwrap();
    assert!(!base.method("describe").unwrap().has_body());

    let square = program.class("Square").unwrap();
    assert_eq!(square.constants().count(), 1);
    assert!(square.method("make").is_some());

    assert_eq!(program.class_links.len(), 2);
    assert_eq!(
        ops(&program.main).iter().filter(|op| **op == Opcode::ClassInit).count(),
        2
    );
}

#[test]
fn test_exceptions() {
    let program = build_script("exceptions.aer");
    assert_eq!(program.exceptions.len(), 1);
    assert_eq!(program.exceptions[0].catches.len(), 2);
    let risky = program.function("risky").unwrap();
    assert!(ops(&risky.code).contains(&Opcode::Throw));
}

// =============================================================================
// Embedded Documents
// =============================================================================

#[test]
fn test_template() {
    let (compilation, diagnostics) =
        compile_with("template.aer", CompilerConfig::new().with_embedded(true));
    assert!(diagnostics.is_empty(), "{diagnostics:?}");
    let program = compilation.into_program().unwrap();
    let consumed = ops(&program.main)
        .iter()
        .filter(|op| **op == Opcode::Consume)
        .count();
    assert_eq!(consumed, 3);
}

// =============================================================================
// Diagnostics
// =============================================================================

#[test]
fn test_errors_are_collected() {
    let (compilation, diagnostics) = compile_with("errors.aer", CompilerConfig::default());
    assert_eq!(compilation.error_count(), 3);
    let lines: Vec<u32> = diagnostics.errors().map(|d| d.line).collect();
    assert_eq!(lines, vec![2, 3, 4]);
    assert!(diagnostics.iter().all(|d| d.file.as_deref() == Some("errors.aer")));
    assert!(matches!(
        compilation.into_program(),
        Err(CompileError::Failed { errors: 3 })
    ));
}

#[test]
fn test_disassembly_lists_every_container() {
    let program = build_script("functions.aer");
    let listing = program.disassemble();
    assert!(listing.starts_with("main:"));
    assert!(listing.contains("function add("));
    assert!(listing.contains("closure#0"));
    assert!(listing.contains("constants:"));
}

#[test]
fn test_sink_fn_streams_diagnostics() {
    let mut seen = Vec::new();
    let mut sink = SinkFn(|d: Diagnostic| seen.push(d.severity));
    let result = compile_source("namespace App { }", &mut sink);
    assert!(result.is_ok());
    drop(sink);
    assert_eq!(seen, vec![Severity::Notice]);
}
