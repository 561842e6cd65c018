// Copyright (c) 2022 Weird Constructor <weirdconstructor@gmail.com>
// This file is a part of synfx-dsp-expr. Released under GPL-3.0-or-later.
// See README.md and COPYING for details.

use crate::ast::ASTNode;
use crate::config::EngineConfig;
use crate::delay::DelayLineRegistry;
use crate::error::EquationError;
use crate::eval::evaluate;
use crate::parser::parse_equation;
use std::collections::HashMap;

/// Room for host variables, so that setting a handful of new ones from the
/// audio thread does not make the map grow.
const RESERVED_VARIABLES: usize = 64;

/// The named values an equation can read.
///
/// The per sample values `x`, `y_prev` and `y_prev2` as well as the sample
/// rate (`fs` and `Fs`) are plain fields, everything else including `pi`
/// and `e` lives in a map that the host can extend with
/// [Environment::set].
#[derive(Debug, Clone)]
pub struct Environment {
    input: f64,
    y_prev: f64,
    y_prev2: f64,
    sample_rate: f64,
    vars: HashMap<String, f64>,
}

impl Environment {
    pub fn new(sample_rate: f64) -> Self {
        let mut vars = HashMap::with_capacity(RESERVED_VARIABLES);
        vars.insert("pi".to_string(), std::f64::consts::PI);
        vars.insert("e".to_string(), std::f64::consts::E);

        Self { input: 0.0, y_prev: 0.0, y_prev2: 0.0, sample_rate, vars }
    }

    /// Looks up `name`. Unknown names are `0.0`.
    #[inline]
    pub fn get(&self, name: &str) -> f64 {
        match name {
            "x" => self.input,
            "y_prev" => self.y_prev,
            "y_prev2" => self.y_prev2,
            "fs" | "Fs" => self.sample_rate,
            _ => self.vars.get(name).copied().unwrap_or(0.0),
        }
    }

    /// Binds `name` to `value`, creating the binding if necessary.
    pub fn set(&mut self, name: &str, value: f64) {
        if !self.update(name, value) {
            self.vars.insert(name.to_string(), value);
        }
    }

    /// Like [Environment::set], but takes ownership of the name so that
    /// no allocation is needed for a new binding. Hands the name back
    /// if it was not stored.
    pub fn set_owned(&mut self, name: String, value: f64) -> Option<String> {
        if self.update(&name, value) {
            Some(name)
        } else {
            self.vars.insert(name, value);
            None
        }
    }

    /// Overwrites an existing binding, returns false if there is none.
    pub fn update(&mut self, name: &str, value: f64) -> bool {
        match name {
            "x" => self.input = value,
            "y_prev" => self.y_prev = value,
            "y_prev2" => self.y_prev2 = value,
            "fs" | "Fs" => self.sample_rate = value,
            _ => match self.vars.get_mut(name) {
                Some(slot) => *slot = value,
                None => return false,
            },
        }
        true
    }

    #[inline]
    pub fn input(&self) -> f64 {
        self.input
    }

    #[inline]
    pub fn set_input(&mut self, x: f64) {
        self.input = x;
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    pub fn set_sample_rate(&mut self, sample_rate: f64) {
        self.sample_rate = sample_rate;
    }

    /// Shifts `out` into the feedback history `y_prev` / `y_prev2`.
    #[inline]
    pub fn push_output(&mut self, out: f64) {
        self.y_prev2 = self.y_prev;
        self.y_prev = out;
    }

    /// Clears `x` and the feedback history, keeps all other bindings.
    pub fn reset_history(&mut self) {
        self.input = 0.0;
        self.y_prev = 0.0;
        self.y_prev2 = 0.0;
    }
}

/// A compiled equation: the expression tree together with all the
/// delay lines it reads from.
///
/// All delay lines are allocated when the program is built, so a program
/// can be moved to the audio thread and executed there without
/// allocating. Once received by the executing thread, call
/// [EquationProgram::init] to carry over the delay history of the
/// program it replaces.
pub struct EquationProgram {
    source: String,
    ast: Box<ASTNode>,
    delays: DelayLineRegistry,
}

impl EquationProgram {
    /// Parses `equation` and prepares everything needed to run it.
    ///
    ///```
    /// use synfx_dsp_expr::{EngineConfig, EquationProgram, Environment};
    ///
    /// let mut prog = EquationProgram::compile("x + 0.3*z^-1", &EngineConfig::default()).unwrap();
    /// let mut env = Environment::new(44100.0);
    ///
    /// env.set_input(1.0);
    /// assert_eq!(prog.exec(&env), 1.0);
    /// env.set_input(0.0);
    /// assert!((prog.exec(&env) - 0.3).abs() < 1e-9);
    ///```
    pub fn compile(equation: &str, config: &EngineConfig) -> Result<Self, EquationError> {
        let ast = parse_equation(equation)?;
        Self::from_ast(equation, ast, config)
    }

    /// Wraps an already built tree, e.g. one made with the [crate::build] helpers.
    pub fn from_ast(
        source: &str,
        ast: Box<ASTNode>,
        config: &EngineConfig,
    ) -> Result<Self, EquationError> {
        let mut amounts = ast.delay_amounts();
        if let Some(max) = amounts.last() {
            if *max > config.max_delay_samples {
                return Err(EquationError::DelayTooLong {
                    amount: *max,
                    max: config.max_delay_samples,
                });
            }
        }
        // z^-0 reads the current input directly:
        amounts.retain(|n| *n > 0);

        let mut delays = DelayLineRegistry::new(config.min_delay_capacity);
        delays.prepare(&amounts);

        Ok(Self { source: source.to_string(), ast, delays })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn ast(&self) -> &ASTNode {
        &self.ast
    }

    pub fn delays(&self) -> &DelayLineRegistry {
        &self.delays
    }

    /// Takes over the delay history of `previous` for all delay amounts
    /// both programs share. This swaps buffers and runs in time proportional
    /// to the number of delay lines, not their length. `previous` is not
    /// meant to be executed afterwards.
    pub fn init(&mut self, previous: Option<&mut EquationProgram>) {
        if let Some(previous) = previous {
            self.delays.adopt_state(&mut previous.delays);
        }
    }

    /// Zeroes all delay lines.
    pub fn reset(&mut self) {
        self.delays.clear();
    }

    /// Evaluates the equation for the sample in `env` and advances
    /// the delay lines by one sample.
    #[inline]
    pub fn exec(&mut self, env: &Environment) -> f64 {
        let out = evaluate(&self.ast, env, &mut self.delays);
        self.delays.push_all(env.input());
        out
    }
}
