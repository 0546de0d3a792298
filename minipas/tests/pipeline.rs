use std::collections::VecDeque;

use minipas::error::{CodegenError, RuntimeError};
use minipas::{Backend, CompileError, Interpreter, LineInput, MipsBackend, MipsConfig};

fn interpreted(source: &str, input: &[i32]) -> Vec<String> {
    let output = minipas::interpret(source, input.iter().copied()).unwrap();
    output.lines().map(String::from).collect()
}

/// Compiles, runs the assembly and drops the newline printed on exit.
fn compiled(source: &str, input: &[i32]) -> Vec<String> {
    let assembly = minipas::compile(source).unwrap();
    let output = mips_sim::execute(&assembly, input.iter().copied()).unwrap();
    let output = output
        .strip_suffix('\n')
        .expect("compiled programs end with a newline");
    output.lines().map(String::from).collect()
}

fn assert_both(source: &str, input: &[i32], expected: &[&str]) {
    assert_eq!(interpreted(source, input), expected, "interpreter: {source}");
    assert_eq!(compiled(source, input), expected, "compiled: {source}");
}

#[test]
fn scenario_precedence() {
    assert_both(
        "VAR a; BEGIN a := 3 + 4 * 2; WRITELN(a); END.",
        &[],
        &["11"],
    );
}

#[test]
fn scenario_while_loop() {
    assert_both(
        "VAR x; BEGIN x:=0; WHILE x<3 DO BEGIN WRITELN(x); x:=x+1; END; END.",
        &[],
        &["0", "1", "2"],
    );
}

#[test]
fn scenario_procedure_call() {
    assert_both(
        "PROCEDURE f(n); BEGIN f := n*n; END; BEGIN WRITELN(f(5)); END.",
        &[],
        &["25"],
    );
}

#[test]
fn scenario_division_by_zero_aborts_silently() {
    let source = "BEGIN WRITELN(5/0); END.";

    let program = minipas::parser::parse(source).unwrap();
    let mut interpreter = Interpreter::new(Vec::new(), VecDeque::new());
    assert!(matches!(
        interpreter.run(&program),
        Err(CompileError::Runtime(RuntimeError::DivisionByZero))
    ));
    assert!(interpreter.into_output().is_empty());

    let assembly = minipas::compile(source).unwrap();
    assert!(matches!(
        mips_sim::execute(&assembly, std::iter::empty()),
        Err(mips_sim::SimError::DivisionByZero { .. })
    ));
}

#[test]
fn scenario_false_condition() {
    assert_both(
        "BEGIN IF 1>2 THEN WRITELN(1); WRITELN(2); END.",
        &[],
        &["2"],
    );
}

#[test]
fn compiled_output_ends_with_a_blank_line() {
    let assembly = minipas::compile("WRITELN(4);").unwrap();
    assert_eq!(
        mips_sim::execute(&assembly, std::iter::empty()).unwrap(),
        "4\n\n"
    );
}

#[test]
fn program_without_procedures_has_no_frame_code() {
    let source = "VAR a, b; BEGIN a := 2; b := a * (a + 1); IF b > 5 THEN WRITELN(b); END.";
    let assembly = minipas::compile(source).unwrap();
    assert!(!assembly.contains("jal"));
    assert!(!assembly.contains("jr $ra"));
    assert_both(source, &[], &["6"]);
}

#[test]
fn empty_procedure_signature() {
    assert_both(
        "PROCEDURE answer(); answer := 42; WRITELN(answer() + answer());",
        &[],
        &["84"],
    );
}

#[test]
fn if_nested_in_while() {
    let source = "
        VAR i;
        BEGIN
            i := 0;
            WHILE i < 6 DO
            BEGIN
                IF i mod 3 = 0 THEN WRITELN(i);
                i := i + 1;
            END;
        END.";
    assert_both(source, &[], &["0", "3"]);
}

#[test]
fn three_levels_of_parentheses() {
    assert_both(
        "WRITELN(((2 + 3) * (4 - (1 + 1))) * ((6 / (1 + 2)) - 5));",
        &[],
        &["-30"],
    );
}

#[test]
fn unassigned_return_slot_yields_zero() {
    assert_both(
        "VAR g; PROCEDURE touch(v); g := v; BEGIN WRITELN(touch(9)); WRITELN(g); END.",
        &[],
        &["0", "9"],
    );
}

#[test]
fn recursion_and_locals() {
    let source = "
        PROCEDURE power(base, exp);
        VAR half;
        BEGIN
            power := 1;
            IF exp > 0 THEN
            BEGIN
                half := power(base, exp / 2);
                power := half * half;
                IF exp mod 2 = 1 THEN power := power * base;
            END;
        END;
        BEGIN
            WRITELN(power(2, 10));
            WRITELN(power(3, 5));
            WRITELN(power(7, 0));
        END.";
    assert_both(source, &[], &["1024", "243", "1"]);
}

#[test]
fn calls_inside_expressions_inside_procedures() {
    let source = "
        PROCEDURE inc(x); inc := x + 1;
        PROCEDURE mix(a, b);
        VAR t;
        BEGIN
            t := inc(a) * 10 + inc(inc(b));
            mix := t - inc(0);
        END;
        WRITELN(mix(4, 7));";
    assert_both(source, &[], &["58"]);
}

#[test]
fn condition_operands_with_calls() {
    let source = "
        PROCEDURE id(x); id := x;
        PROCEDURE cmp(a, b);
        BEGIN
            cmp := 0;
            IF id(a) < id(b) THEN cmp := -1;
            IF id(a) > id(b) THEN cmp := 1;
        END;
        BEGIN
            WRITELN(cmp(1, 2));
            WRITELN(cmp(5, 5));
            WRITELN(cmp(9, -9));
        END.";
    assert_both(source, &[], &["-1", "0", "1"]);
}

#[test]
fn every_relational_operator() {
    let source = "
        BEGIN
            IF 1 < 2 THEN WRITELN(1);
            IF 2 > 1 THEN WRITELN(2);
            IF 2 <= 2 THEN WRITELN(3);
            IF 2 >= 3 THEN WRITELN(99);
            IF 4 = 4 THEN WRITELN(5);
            IF 4 <> 4 THEN WRITELN(99);
        END.";
    assert_both(source, &[], &["1", "2", "3", "5"]);
}

#[test]
fn readln_inside_a_procedure() {
    let source = "
        VAR total;
        PROCEDURE readtwo();
        VAR a, b;
        BEGIN
            READLN(a);
            READLN(b);
            readtwo := a * b;
        END;
        BEGIN
            total := readtwo() + readtwo();
            WRITELN(total);
        END.";
    assert_both(source, &[2, 3, 4, 5], &["26"]);
}

#[test]
fn writes_to_unknown_names_go_to_globals() {
    let source = "
        PROCEDURE setup(); BEGIN counter := 5; setup := 0; END;
        BEGIN
            WRITELN(setup());
            counter := counter + 1;
            WRITELN(counter);
        END.";
    assert_both(source, &[], &["0", "6"]);
}

#[test]
fn parameters_shadow_globals_without_touching_them() {
    let source = "
        VAR n;
        PROCEDURE twice(n); BEGIN n := n * 2; twice := n; END;
        BEGIN n := 3; WRITELN(twice(n)); WRITELN(n); END.";
    assert_both(source, &[], &["6", "3"]);
}

#[test]
fn interpreter_reads_lines_from_a_reader() {
    let program = minipas::parser::parse("VAR a, b; BEGIN READLN(a); READLN(b); WRITELN(a + b); END.")
        .unwrap();
    let mut interpreter = Interpreter::new(Vec::new(), LineInput::new("40\n\n2\n".as_bytes()));
    interpreter.run(&program).unwrap();
    assert_eq!(interpreter.into_output(), b"42\n");
}

#[test]
fn run_dispatches_to_any_backend() {
    let source = "PROCEDURE f(); f := 1; WRITELN(f());";
    let mut backend = MipsBackend::with_config(MipsConfig { annotate: true });
    let assembly = minipas::run(source, &mut backend).unwrap();
    assert!(assembly.contains("# call f"));
    // comments must not disturb execution
    assert_eq!(
        mips_sim::execute(&assembly, std::iter::empty()).unwrap(),
        "1\n\n"
    );
}

#[test]
fn undefined_procedure_fails_in_both_backends() {
    let source = "WRITELN(missing());";
    assert!(matches!(
        minipas::interpret(source, std::iter::empty()),
        Err(CompileError::Runtime(RuntimeError::UndefinedProcedure { .. }))
    ));
    assert!(matches!(
        minipas::compile(source),
        Err(CompileError::Codegen(CodegenError::UndefinedProcedure { .. }))
    ));
}

#[test]
fn parsing_is_deterministic() {
    let source = "VAR a; PROCEDURE f(x); f := -x; BEGIN a := f(2) * 3; WRITELN(a); END.";
    assert_eq!(
        minipas::parser::parse(source).unwrap(),
        minipas::parser::parse(source).unwrap()
    );
}
