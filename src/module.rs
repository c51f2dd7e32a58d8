use crate::ast::ImportItems;
use crate::collections::EasyObject;
use crate::environment::Environment;
use crate::error::{ScriptError, Span};
use crate::evaluator::Evaluator;
use crate::runner;
use crate::value::{FunctionDef, Value};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use tracing::debug;

const IMPORTING: &str = "Error importing from";
const LOADING: &str = "Error loading file";

/// A module script after it ran to completion.
struct LoadedModule {
    env: Environment,
    shared_variables: HashSet<String>,
}

impl LoadedModule {
    /// Shared function bound to the module's own scope.
    fn export_function(&self, function: &FunctionDef) -> Rc<FunctionDef> {
        Rc::new(function.with_captured(self.env.clone()))
    }

    fn shared_functions(&self) -> Vec<(String, Rc<FunctionDef>)> {
        self.env
            .functions()
            .into_iter()
            .filter(|(_, function)| function.is_shared())
            .map(|(name, function)| (name, self.export_function(&function)))
            .collect()
    }
}

impl Evaluator {
    /// Evaluator for a module script: same output and builtins, its own
    /// shared set, and the import chain extended with `path`.
    fn for_module(&self, path: PathBuf) -> Evaluator {
        let mut import_chain = self.import_chain.clone();
        import_chain.push(path.clone());

        Evaluator {
            output: Rc::clone(&self.output),
            builtins: Rc::clone(&self.builtins),
            script_path: Some(path),
            import_chain,
            shared_variables: HashSet::new(),
        }
    }

    /// Module paths are relative to the importing script's directory.
    fn resolve_module_path(&self, file: &str) -> PathBuf {
        let path = Path::new(file);
        if path.is_absolute() {
            return path.to_path_buf();
        }
        match self.script_path.as_deref().and_then(Path::parent) {
            Some(dir) => dir.join(path),
            None => path.to_path_buf(),
        }
    }

    fn run_module(
        &self,
        file: &str,
        context: &str,
        span: &Span,
    ) -> Result<LoadedModule, ScriptError> {
        let path = self.resolve_module_path(file);
        let path = path.canonicalize().map_err(|_| {
            ScriptError::module_error(
                *span,
                format!("{} '{}': File '{}' not found", context, file, path.display()),
            )
        })?;

        if self.import_chain.contains(&path) {
            return Err(ScriptError::module_error(
                *span,
                format!("Cyclic import of '{}'", file),
            ));
        }

        let source = fs::read_to_string(&path).map_err(|error| {
            ScriptError::module_error(*span, format!("{} '{}': {}", context, file, error))
        })?;

        debug!(module = %path.display(), depth = self.import_chain.len(), "running module");

        let mut module = self.for_module(path);
        let mut env = Environment::new();
        runner::execute(&source, &mut module, &mut env).map_err(|inner| {
            ScriptError::module_error(
                *span,
                format!(
                    "{} '{}': {}:{}:{}: {}",
                    context, file, file, inner.span.line, inner.span.column, inner.message
                ),
            )
        })?;

        Ok(LoadedModule {
            env,
            shared_variables: module.shared_variables,
        })
    }

    /// `from "file" use {a, b}` / `from "file" use *`
    pub(crate) fn import(
        &mut self,
        file: &str,
        items: &ImportItems,
        env: &mut Environment,
        span: &Span,
    ) -> Result<(), ScriptError> {
        let module = self.run_module(file, IMPORTING, span)?;

        match items {
            ImportItems::All => {
                for (name, value) in module.env.variables() {
                    env.assign(name, value.clone());
                }
                for (name, function) in module.shared_functions() {
                    env.define_function(&name, function);
                }
            }
            ImportItems::Names(names) => {
                for name in names {
                    if let Some(function) = module.env.function(name).filter(|f| f.is_shared()) {
                        env.define_function(name, module.export_function(&function));
                    } else if let Some(value) = module.env.get(name) {
                        env.assign(name, value);
                    } else {
                        return Err(ScriptError::module_error(
                            *span,
                            format!("Item '{}' not found or not shared in module '{}'", name, file),
                        ));
                    }
                }
            }
        }

        debug!(module = file, "imported");
        Ok(())
    }

    /// `load "file" as alias`: binds the module's shared variables and
    /// functions as keys of one object.
    pub(crate) fn load(
        &mut self,
        file: &str,
        alias: &str,
        env: &mut Environment,
        span: &Span,
    ) -> Result<(), ScriptError> {
        let module = self.run_module(file, LOADING, span)?;
        let mut namespace = EasyObject::new();

        let mut shared: Vec<&String> = module.shared_variables.iter().collect();
        shared.sort();
        for name in shared {
            if let Some(value) = module.env.get(name) {
                namespace.set(name, value);
            }
        }
        for (name, function) in module.shared_functions() {
            namespace.set(&name, Value::Function(function));
        }

        debug!(module = file, alias, entries = namespace.len(), "loaded");
        env.assign(alias, Value::new_object(namespace));
        Ok(())
    }

    /// `share(a, b)`: marks functions or variables of this script as
    /// importable.
    pub(crate) fn share(
        &mut self,
        names: &[String],
        env: &Environment,
        span: &Span,
    ) -> Result<(), ScriptError> {
        for name in names {
            if let Some(function) = env.function(name) {
                function.mark_shared();
            } else if env.contains(name) {
                self.shared_variables.insert(name.clone());
            } else {
                return Err(ScriptError::module_error(
                    *span,
                    format!("Cannot share '{}': item not found", name),
                ));
            }
            debug!(name = name.as_str(), "shared");
        }
        Ok(())
    }
}
