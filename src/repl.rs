use crate::ast::Stmt;
use crate::environment::Environment;
use crate::error::{ErrorKind, ScriptError};
use crate::evaluator::Evaluator;
use crate::runner::parse_source;
use crate::value::Value;
use std::io::{self, Write};

/// Interactive loop over one persistent environment. Input is buffered
/// across lines while it ends inside an unclosed block.
pub fn start() {
    println!("EasyScript v{}", env!("CARGO_PKG_VERSION"));
    println!("Type 'exit' or press Ctrl+D to quit");
    println!();

    let mut evaluator = Evaluator::new();
    let mut env = Environment::new();
    let mut buffer = String::new();

    loop {
        print!("{}", if buffer.is_empty() { "> " } else { ". " });
        if io::stdout().flush().is_err() {
            break;
        }

        let mut line = String::new();
        match io::stdin().read_line(&mut line) {
            Ok(0) => {
                println!();
                break;
            }
            Ok(_) => {
                let trimmed = line.trim();
                if buffer.is_empty() {
                    if trimmed.is_empty() {
                        continue;
                    }
                    if trimmed == "exit" || trimmed == "quit" {
                        println!("Goodbye!");
                        break;
                    }
                }

                buffer.push_str(&line);
                match run_repl_command(&buffer, &mut evaluator, &mut env) {
                    ReplOutcome::Incomplete => continue,
                    ReplOutcome::Done => buffer.clear(),
                }
            }
            Err(error) => {
                eprintln!("Error reading input: {}", error);
                break;
            }
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
enum ReplOutcome {
    Done,
    Incomplete,
}

fn run_repl_command(
    source: &str,
    evaluator: &mut Evaluator,
    env: &mut Environment,
) -> ReplOutcome {
    let program = match parse_source(source) {
        Ok(program) => program,
        Err(error) if is_incomplete(&error, source) => return ReplOutcome::Incomplete,
        Err(error) => {
            error.report(source, "<repl>");
            return ReplOutcome::Done;
        }
    };

    // A lone call statement echoes its result.
    if let [Stmt::Expression { expr, .. }] = program.statements.as_slice() {
        match evaluator.evaluate_expression(expr, env) {
            Ok(Value::Null) => {}
            Ok(value) => println!("{}", value),
            Err(error) => error.report(source, "<repl>"),
        }
        evaluator.flush_output();
        return ReplOutcome::Done;
    }

    if let Err(error) = evaluator.execute_program(&program, env) {
        error.report(source, "<repl>");
    }
    evaluator.flush_output();
    ReplOutcome::Done
}

/// A parse error positioned at end of input means the entry is unfinished.
fn is_incomplete(error: &ScriptError, source: &str) -> bool {
    error.kind == ErrorKind::ParseError && error.span.start >= source.chars().count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn open_blocks_are_incomplete() {
        let error = parse_source("if (x > 1)\n  print(x)\n").unwrap_err();
        assert!(is_incomplete(&error, "if (x > 1)\n  print(x)\n"));
    }

    #[test]
    fn misplaced_tokens_are_not_incomplete() {
        let source = "x = )";
        let error = parse_source(source).unwrap_err();
        assert!(!is_incomplete(&error, source));
    }

    #[test]
    fn state_persists_between_entries() {
        let sink = Rc::new(RefCell::new(Vec::new()));
        let mut evaluator = Evaluator::with_output(sink.clone());
        let mut env = Environment::new();

        assert_eq!(run_repl_command("x = 41\n", &mut evaluator, &mut env), ReplOutcome::Done);
        assert_eq!(
            run_repl_command("f inc(n)\n", &mut evaluator, &mut env),
            ReplOutcome::Incomplete
        );
        assert_eq!(
            run_repl_command("f inc(n)\n return n + 1\nendf\n", &mut evaluator, &mut env),
            ReplOutcome::Done
        );
        run_repl_command("print(inc(x))\n", &mut evaluator, &mut env);

        assert_eq!(String::from_utf8(sink.borrow().clone()).unwrap(), "42\n");
    }
}
