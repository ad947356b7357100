use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use log::warn;
use rhai::{Dynamic, Engine, EvalAltResult, FnPtr, AST};

/// A script-provided callable, optionally bound to an environment object.
/// The environment is curried onto the function pointer at call time and
/// arrives as the hook's first parameter.
#[derive(Debug, Clone)]
pub struct ScriptHook {
    func: FnPtr,
    env: Option<Dynamic>,
}

impl ScriptHook {
    pub fn new(func: FnPtr) -> ScriptHook {
        ScriptHook { func, env: None }
    }

    pub fn with_env(env: Dynamic, func: FnPtr) -> ScriptHook {
        ScriptHook { func, env: Some(env) }
    }

    pub fn name(&self) -> &str {
        self.func.fn_name()
    }
}

/// Owns the scripting engine and the compiled script the hooks live in.
/// Dispatch goes through here so every listener fault is caught in one place.
pub struct ScriptRuntime {
    engine: Engine,
    ast: AST,
}

impl ScriptRuntime {
    pub fn new() -> ScriptRuntime {
        let mut engine = Engine::new();
        engine.set_fast_operators(true);
        ScriptRuntime { engine, ast: AST::empty() }
    }

    pub fn compile(source: &str) -> Result<ScriptRuntime> {
        let mut rt = ScriptRuntime::new();
        rt.load(source)?;
        Ok(rt)
    }

    pub fn compile_file(path: impl AsRef<Path>) -> Result<ScriptRuntime> {
        let path = path.as_ref();
        let source = fs::read_to_string(path)
            .with_context(|| format!("Reading {}", path.display()))?;
        ScriptRuntime::compile(&source)
            .with_context(|| format!("Compiling {}", path.display()))
    }

    pub fn load(&mut self, source: &str) -> Result<()> {
        self.ast = self
            .engine
            .compile(source)
            .map_err(|err| anyhow::anyhow!("{err}"))
            .context("Compiling script")?;
        Ok(())
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut Engine {
        &mut self.engine
    }

    pub fn ast(&self) -> &AST {
        &self.ast
    }

    pub fn call(
        &self,
        hook: &ScriptHook,
        args: Vec<Dynamic>,
    ) -> Result<Dynamic, Box<EvalAltResult>> {
        let mut func = hook.func.clone();
        if let Some(env) = &hook.env {
            func.add_curry(env.clone());
        }
        func.call::<Dynamic>(&self.engine, &self.ast, args)
    }

    /// Gate-hook form: a missing boolean result or a fault counts as a veto.
    pub fn call_bool(&self, hook: &ScriptHook, context: &str, args: Vec<Dynamic>) -> bool {
        match self.call(hook, args) {
            Ok(value) => value.as_bool().unwrap_or(false),
            Err(err) => {
                warn!("<{context}> hook '{}' failed: {err}", hook.name());
                false
            }
        }
    }

    /// Listener form: faults are logged and swallowed so one misbehaving
    /// listener cannot take down the dispatch loop.
    pub fn call_listener(&self, hook: &ScriptHook, context: &str, args: Vec<Dynamic>) {
        if let Err(err) = self.call(hook, args) {
            warn!("<{context}> listener '{}' failed: {err}", hook.name());
        }
    }
}

impl Default for ScriptRuntime {
    fn default() -> Self {
        ScriptRuntime::new()
    }
}
