use crate::ast::Program;
use crate::environment::Environment;
use crate::error::ScriptError;
use crate::evaluator::Evaluator;
use crate::lexer::Lexer;
use crate::parser::Parser;
use std::fs;
use std::path::Path;
use tracing::debug;

pub fn parse_source(source: &str) -> Result<Program, ScriptError> {
    let tokens = Lexer::new(source).scan_tokens()?;
    Parser::new(tokens).parse()
}

/// Lexes, parses and runs `source` against `env`. The first error aborts
/// the run.
pub fn execute(
    source: &str,
    evaluator: &mut Evaluator,
    env: &mut Environment,
) -> Result<(), ScriptError> {
    let program = parse_source(source)?;
    debug!(statements = program.statements.len(), "parsed");
    evaluator.execute_program(&program, env)
}

/// Runs a whole script, reporting any error to stderr. Returns whether the
/// run succeeded.
pub fn run(source: &str, filename: &str, evaluator: &mut Evaluator, pretty: bool) -> bool {
    let mut env = Environment::new();
    let result = execute(source, evaluator, &mut env);
    evaluator.flush_output();

    match result {
        Ok(()) => true,
        Err(error) => {
            if pretty {
                error.report_pretty(source, filename);
            } else {
                error.report(source, filename);
            }
            false
        }
    }
}

pub fn run_file(path: &Path, pretty: bool) -> bool {
    if !path.is_file() {
        eprintln!("[Error]\nScript file '{}' not found.", path.display());
        return false;
    }

    let source = match fs::read_to_string(path) {
        Ok(source) => source,
        Err(error) => {
            eprintln!("[Error]\nCould not read script file '{}': {}", path.display(), error);
            return false;
        }
    };

    let script_path = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
    let mut evaluator = Evaluator::new().with_script_path(script_path);
    run(&source, &path.display().to_string(), &mut evaluator, pretty)
}
