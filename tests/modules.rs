// Module system tests: scripts importing and loading sibling files.

use easyscript::error::{ErrorKind, ScriptError};
use easyscript::{execute, run_file, Environment, Evaluator};
use pretty_assertions::assert_eq;
use std::cell::RefCell;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use tempfile::TempDir;

fn write(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create module directory");
    }
    fs::write(&path, contents).expect("write module file");
    path
}

/// Runs `main` as `main.es` inside `dir`, returning what it printed.
fn run_main(dir: &TempDir, main: &str) -> Result<String, ScriptError> {
    let path = write(dir.path(), "main.es", main);
    let sink = Rc::new(RefCell::new(Vec::<u8>::new()));
    let mut evaluator = Evaluator::with_output(sink.clone())
        .with_script_path(path.canonicalize().expect("canonical script path"));
    let mut env = Environment::new();

    let result = execute(main, &mut evaluator, &mut env);
    let output = String::from_utf8(sink.borrow().clone()).expect("output is utf-8");
    result.map(|()| output)
}

fn main_error(dir: &TempDir, main: &str) -> ScriptError {
    match run_main(dir, main) {
        Ok(output) => panic!("script succeeded with output {:?}", output),
        Err(error) => error,
    }
}

const DOUBLER: &str = r#"
f helper(x)
  return x * 2
endf
share(helper)
"#;

#[test]
fn selective_import_of_shared_function() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "lib.es", DOUBLER);

    let output = run_main(&dir, "from \"lib.es\" use { helper }\nprint(helper(21))").unwrap();
    assert_eq!(output, "42\n");
}

#[test]
fn unshared_function_cannot_be_imported() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "lib.es", "f helper(x)\n  return x\nendf\n");

    let error = main_error(&dir, "from \"lib.es\" use { helper }");
    assert_eq!(error.kind, ErrorKind::ModuleError);
    assert_eq!(
        error.message,
        "Item 'helper' not found or not shared in module 'lib.es'"
    );
}

#[test]
fn selective_import_of_variables() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "lib.es", "greeting = \"hi\"\n");

    let output = run_main(&dir, "from \"lib.es\" use { greeting }\nprint(greeting)").unwrap();
    assert_eq!(output, "hi\n");
}

#[test]
fn wildcard_import_brings_variables_and_shared_functions() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "lib.es",
        r#"
a = 1
b = 2
f sum()
  return a + b
endf
f hidden()
  return 0
endf
share(sum)
"#,
    );

    let output = run_main(&dir, "from \"lib.es\" use *\nprint(a + b)\nprint(sum())").unwrap();
    assert_eq!(output, "3\n3\n");

    let error = main_error(&dir, "from \"lib.es\" use *\nx = hidden()");
    assert_eq!(error.message, "Function 'hidden' is not defined");
}

#[test]
fn imports_run_before_other_statements() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "lib.es", "value = 10\n");

    let output = run_main(&dir, "print(value)\nfrom \"lib.es\" use { value }").unwrap();
    assert_eq!(output, "10\n");
}

#[test]
fn imported_functions_keep_their_module_scope() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "lib.es",
        r#"
base = 100
f offset(x)
  return x + base
endf
f api(x)
  return offset(x)
endf
share(api)
"#,
    );

    let output = run_main(&dir, "from \"lib.es\" use { api }\nprint(api(1))").unwrap();
    assert_eq!(output, "101\n");
}

#[test]
fn module_paths_resolve_relative_to_the_importer() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "lib/helpers.es",
        "f double(x)\n  return x * 2\nendf\nshare(double)\n",
    );
    write(
        dir.path(),
        "lib/util.es",
        "from \"helpers.es\" use { double }\nf twice(x)\n  return double(x)\nendf\nshare(twice)\n",
    );

    let output = run_main(&dir, "from \"lib/util.es\" use { twice }\nprint(twice(4))").unwrap();
    assert_eq!(output, "8\n");
}

#[test]
fn module_output_goes_to_the_same_sink() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "lib.es", "print(\"loading lib\")\n");

    let output = run_main(&dir, "from \"lib.es\" use *\nprint(\"main\")").unwrap();
    assert_eq!(output, "loading lib\nmain\n");
}

#[test]
fn load_binds_shared_items_under_an_alias() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "lib.es",
        r#"
version = "1.0"
secret = "hidden"
f shout(s)
  return s.uppercase()
endf
class Greeter
  f greet()
    return "hello"
  endf
endclass
share(version, shout, Greeter)
"#,
    );

    let main = r#"
load "lib.es" as lib
print(lib.version)
print(lib.shout("hey"))
g = new lib.Greeter()
print(g.greet())
print(lib.containsKey("secret"))
"#;
    assert_eq!(run_main(&dir, main).unwrap(), "1.0\nHEY\nhello\nFalse\n");
}

#[test]
fn sharing_an_unknown_name_fails_the_import() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "lib.es", "share(nothing)\n");

    let error = main_error(&dir, "from \"lib.es\" use *");
    assert_eq!(error.kind, ErrorKind::ModuleError);
    assert_eq!(
        error.message,
        "Error importing from 'lib.es': lib.es:1:1: Cannot share 'nothing': item not found"
    );
}

#[test]
fn errors_inside_modules_carry_their_position() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "lib.es", "x = 1 / 0\n");

    let error = main_error(&dir, "load \"lib.es\" as lib");
    assert_eq!(error.kind, ErrorKind::ModuleError);
    assert_eq!(
        error.message,
        "Error loading file 'lib.es': lib.es:1:5: Uh-oh! You tried to divide by zero. That's not possible."
    );
    assert_eq!((error.span.line, error.span.column), (1, 1));
}

#[test]
fn missing_module_is_reported() {
    let dir = tempfile::tempdir().unwrap();

    let error = main_error(&dir, "from \"missing.es\" use *");
    assert_eq!(error.kind, ErrorKind::ModuleError);
    assert!(error.message.starts_with("Error importing from 'missing.es': File '"));
    assert!(error.message.ends_with("' not found"));
}

#[test]
fn cyclic_imports_are_rejected() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "a.es", "from \"main.es\" use *\n");

    let error = main_error(&dir, "from \"a.es\" use *");
    assert_eq!(error.kind, ErrorKind::ModuleError);
    assert!(
        error.message.contains("Cyclic import of 'main.es'"),
        "{}",
        error.message
    );
}

#[test]
fn run_file_reports_missing_scripts() {
    let dir = tempfile::tempdir().unwrap();
    assert!(!run_file(&dir.path().join("nope.es"), false));
}

#[test]
fn run_file_executes_a_script_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "lib.es", DOUBLER);
    let main = write(
        dir.path(),
        "main.es",
        "from \"lib.es\" use { helper }\nx = helper(2)\n",
    );

    assert!(run_file(&main, false));
}
