use indoc::indoc;
use patitoc::{
    compile_source,
    frontend::SourceFile,
    index::Index,
    middle::{
        codegen::Generation, diagnostics::SemanticError, primitive::ValueType,
        quadruple::QuadrupleId, symbols::GLOBAL_SCOPE,
    },
    runtime::{RuntimeError, RuntimeFault, VirtualMachine, VmConfig},
};

fn compile(source: &str) -> Generation {
    compile_source(&SourceFile::from_memory(source)).unwrap()
}

fn run(source: &str) -> (Result<(), RuntimeFault>, String) {
    let generation = compile(source);
    assert_eq!(generation.errors, vec![], "program should compile cleanly");

    let mut vm =
        VirtualMachine::new(&generation.program, VmConfig::default(), Vec::new()).unwrap();
    let result = vm.run();

    (result, String::from_utf8(vm.into_output()).unwrap())
}

#[test]
fn prints_assigned_values() {
    let (result, output) = run(indoc! {"
        program scenario;
        var
            a: integer;
            b: float;
        main {
            a = 10;
            b = 20.5;
            print(a);
            print(b);
        }
        end
    "});

    assert_eq!(result, Ok(()));
    assert_eq!(output, "10\n20.5\n");
}

#[test]
fn undeclared_assignment_targets_emit_nothing() {
    let generation = compile(indoc! {"
        program scenario;
        main {
            y = x + 5;
        }
        end
    "});

    assert_eq!(
        generation.errors,
        vec![SemanticError::UndeclaredVariable {
            name: "y".to_string(),
            scope: GLOBAL_SCOPE.to_string(),
        }]
    );
    // Only the jump to main and the final END remain
    assert_eq!(generation.program.quadruples.len(), 2);
}

#[test]
fn float_to_integer_assignment_is_rejected() {
    let generation = compile(indoc! {"
        program scenario;
        main {
            a: integer;
            a = 3.14;
        }
        end
    "});

    assert_eq!(
        generation.errors,
        vec![SemanticError::IncompatibleAssignment {
            name: "a".to_string(),
            target: ValueType::Integer,
            value: ValueType::Float,
        }]
    );
    assert!(
        generation
            .program
            .quadruples
            .iter()
            .all(|quadruple| quadruple.to_string() != "=,14000,,1000")
    );
}

#[test]
fn while_loops_run_until_their_guard_fails() {
    let (result, output) = run(indoc! {"
        program scenario;
        n: integer;
        main {
            n = 1;
            while (n <= 5) do {
                print(n);
                n = n + 1;
            };
        }
        end
    "});

    assert_eq!(result, Ok(()));
    assert_eq!(output, "1\n2\n3\n4\n5\n");
}

#[test]
fn division_by_zero_halts_execution() {
    let (result, output) = run(indoc! {"
        program scenario;
        x: integer;
        main {
            print(1);
            x = 10 / 0;
            print(x);
        }
        end
    "});

    assert_eq!(
        result,
        Err(RuntimeFault {
            index: QuadrupleId::new(2),
            error: RuntimeError::DivisionByZero,
        })
    );
    assert_eq!(output, "1\n");
}

#[test]
fn recursion_through_globals() {
    let (result, output) = run(indoc! {"
        program factorial;
        var result: integer;

        void factorial(n: integer) {
            if (n > 1) {
                result = result * n;
                factorial(n - 1);
            }
        }

        main {
            result = 1;
            factorial(5);
            print(result);
        }
        end
    "});

    assert_eq!(result, Ok(()));
    assert_eq!(output, "120\n");
}

#[test]
fn locals_do_not_leak_between_calls() {
    let (result, output) = run(indoc! {r#"
        program frames;
        var i: integer;

        void show(label: string, value: float) {
            doubled: float;
            doubled = value * 2;
            print(label, doubled);
        }

        main {
            i = 0;
            while (i < 2) do {
                show("twice:", i + 0.5);
                i = i + 1;
            }
            print(i);
        }
        end
    "#});

    assert_eq!(result, Ok(()));
    assert_eq!(output, "twice:\n1.0\ntwice:\n3.0\n2\n");
}

#[test]
fn conditionals_pick_one_branch() {
    let (result, output) = run(indoc! {r#"
        program branches;
        var a, b: integer;
        main {
            a = 7 / 2;
            b = 4;
            if (a == 3) { print("truncated"); } else { print("rounded"); }
            if (a > b) { print("a"); } else { print("b"); };
            if (b != 4) { print("unreachable"); }
            print(7.0 / 2, "hello, world", a < b);
        }
        end
    "#});

    assert_eq!(result, Ok(()));
    assert_eq!(output, "truncated\nb\n3.5\nhello, world\ntrue\n");
}

#[test]
fn every_problem_is_reported_in_one_pass() {
    let generation = compile(indoc! {r#"
        program broken;
        var a: integer;
        a: float;

        void f(x: integer, x: float) { }
        void f() { }

        main {
            a = "text";
            f(1, 2);
            g();
            while (a) do { print(a); }
        }
        end
    "#});

    assert_eq!(
        generation.errors,
        vec![
            SemanticError::DuplicateDeclaration {
                name: "a".to_string(),
                scope: GLOBAL_SCOPE.to_string(),
            },
            SemanticError::DuplicateParameter {
                name: "x".to_string(),
                function: "f".to_string(),
            },
            SemanticError::DuplicateFunction {
                name: "f".to_string(),
            },
            SemanticError::IncompatibleAssignment {
                name: "a".to_string(),
                target: ValueType::Integer,
                value: ValueType::String,
            },
            SemanticError::ArityMismatch {
                function: "f".to_string(),
                expected: 1,
                found: 2,
            },
            SemanticError::UndeclaredFunction {
                name: "g".to_string(),
            },
            SemanticError::NonBooleanCondition {
                statement: "while",
                found: ValueType::Integer,
            },
        ]
    );
    assert!(generation.program.unresolved_jumps().is_empty());
}

#[test]
fn syntax_errors_stop_compilation() {
    let source = SourceFile::from_memory("program p; main { print(1) } end");

    assert!(matches!(
        compile_source(&source),
        Err(patitoc::CompileError::Parse(_))
    ));
}

#[test]
fn non_breaking_spaces_separate_tokens() {
    let (result, output) = run(
        "program p;\u{a0}main\u{a0}{ print(\"tab\\there\",\u{a0}1); }\u{a0}end",
    );

    assert_eq!(result, Ok(()));
    assert_eq!(output, "tab\\there\n1\n");
}
