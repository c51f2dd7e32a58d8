// EasyScript interpreter library
//
// Lexer, parser and tree-walking evaluator for EasyScript, a small
// dynamically-typed scripting language with classes and file modules.

pub mod ast;
pub mod builtins;
pub mod class;
pub mod collections;
pub mod environment;
pub mod error;
pub mod evaluator;
pub mod lexer;
pub mod module;
pub mod parser;
pub mod repl;
pub mod runner;
pub mod value;

pub use ast::{Expr, Program, Stmt};
pub use collections::{EasyList, EasyObject};
pub use environment::Environment;
pub use error::{ErrorKind, ScriptError, Span};
pub use evaluator::{Evaluator, Flow, Output};
pub use lexer::{Lexer, Token, TokenKind};
pub use parser::Parser;
pub use value::Value;

pub use repl::start as start_repl;
pub use runner::{execute, parse_source, run, run_file};
