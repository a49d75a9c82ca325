//! Engine Facade
//!
//! Ties the parser, executor, handlers and bridges together behind one
//! options-struct entry point, the way embedders consume the crate.

use std::sync::Arc;

use crate::bridge::eval::ArithmeticEvaluator;
use crate::bridge::in_memory::InMemoryBrowser;
use crate::errors::EngineError;
use crate::executor::context::Bridges;
use crate::executor::control::ControlHandle;
use crate::executor::executor::Executor;
use crate::executor::types::MacroResult;
use crate::parser::ParsedMacro;
use crate::vars::VariableValue;

/// Options for creating an Engine.
#[derive(Default)]
pub struct EngineOptions {
    pub bridges: Bridges,
    /// How many times the macro loops. Defaults to 1.
    pub max_loops: u32,
    /// Variables re-applied at the start of every loop iteration.
    pub initial_variables: Vec<(String, VariableValue)>,
}

/// The macro engine: one executor plus its wiring.
pub struct Engine {
    executor: Executor,
}

impl Engine {
    pub fn new(options: EngineOptions) -> Self {
        let mut executor = Executor::new(options.bridges);
        executor.set_max_loops(options.max_loops.max(1));
        executor.set_initial_variables(options.initial_variables);
        Self { executor }
    }

    /// An engine wired to a fresh in-memory browser with the built-in
    /// arithmetic evaluator. Returns the browser for page registration
    /// and call inspection.
    pub fn simulated(max_loops: u32) -> (Self, Arc<InMemoryBrowser>) {
        let browser = Arc::new(InMemoryBrowser::new());
        let engine = Self::new(EngineOptions {
            bridges: Bridges {
                browser: Some(browser.clone() as Arc<dyn crate::bridge::BrowserBridge>),
                content: Some(browser.clone() as Arc<dyn crate::bridge::ContentScriptSender>),
                evaluator: Some(Arc::new(ArithmeticEvaluator)),
                ..Bridges::default()
            },
            max_loops,
            initial_variables: Vec::new(),
        });
        (engine, browser)
    }

    /// Parse, load and run a macro.
    pub async fn run(&mut self, text: &str) -> Result<MacroResult, EngineError> {
        self.executor.load_macro(text);
        self.executor.execute().await
    }

    /// Parse and load without running, for inspection or stepping.
    pub fn load(&mut self, text: &str) -> &ParsedMacro {
        self.executor.load_macro(text)
    }

    pub fn executor(&mut self) -> &mut Executor {
        &mut self.executor
    }

    pub fn control(&self) -> ControlHandle {
        self.executor.control()
    }
}
