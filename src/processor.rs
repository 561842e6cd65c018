// Copyright (c) 2022 Weird Constructor <weirdconstructor@gmail.com>
// This file is a part of synfx-dsp-expr. Released under GPL-3.0-or-later.
// See README.md and COPYING for details.

use crate::config::EngineConfig;
use crate::context::{Environment, EquationProgram};
use crate::error::EquationError;
use tracing::{debug, warn};

/// Evaluates an equation sample by sample on the calling thread.
///
/// This is the single object interface for hosts that compile and process
/// on the same thread. For separate control and audio threads see
/// [crate::engine::EquationEngine], which drives one of these on the
/// audio thread.
///
/// As long as no valid equation is installed, [EquationProcessor::process_sample]
/// passes its input through unchanged.
///
///```
/// use synfx_dsp_expr::EquationProcessor;
///
/// let mut proc = EquationProcessor::new();
/// proc.set_sample_rate(48000.0);
/// proc.set_equation("x + 0.3*z^-1").unwrap();
///
/// let out: Vec<f32> = [1.0, 0.0, 0.0, 0.0].iter().map(|x| proc.process_sample(*x)).collect();
/// assert_eq!(out, vec![1.0, 0.3, 0.0, 0.0]);
///
/// assert!(proc.set_equation("x +").is_err());
/// assert!(!proc.is_equation_valid());
/// assert_eq!(proc.process_sample(0.25), 0.25);
///```
pub struct EquationProcessor {
    config: EngineConfig,
    env: Environment,
    program: Option<Box<EquationProgram>>,
    // Last valid program while an invalid equation is set, kept for its
    // delay history. At most one of `program` and `dormant` is set.
    dormant: Option<Box<EquationProgram>>,
    error_message: String,
}

impl EquationProcessor {
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> Self {
        Self {
            env: Environment::new(config.sample_rate),
            config,
            program: None,
            dormant: None,
            error_message: String::new(),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Updates `fs` and `Fs` and resets all delay lines and feedback history.
    pub fn set_sample_rate(&mut self, sample_rate: f64) {
        self.env.set_sample_rate(sample_rate);
        self.reset();
    }

    pub fn sample_rate(&self) -> f64 {
        self.env.sample_rate()
    }

    /// Compiles and installs a new equation.
    ///
    /// On failure the error is kept for [EquationProcessor::error_message]
    /// and the processor passes its input through until the next
    /// successful call.
    pub fn set_equation(&mut self, equation: &str) -> Result<(), EquationError> {
        match EquationProgram::compile(equation, &self.config) {
            Ok(program) => {
                debug!("compiled equation '{}'", equation);
                self.install(Some(Box::new(program)));
                self.error_message.clear();
                Ok(())
            }
            Err(err) => {
                warn!("rejected equation '{}': {}", equation, err);
                self.install(None);
                self.error_message = err.to_string();
                Err(err)
            }
        }
    }

    /// Swaps in `program`, carrying over the delay history of the current
    /// one, and returns the program that is no longer needed.
    ///
    /// Installing `None` switches to pass through, but the last valid program
    /// is kept, so its delay history survives until the next valid equation.
    pub(crate) fn install(
        &mut self,
        program: Option<Box<EquationProgram>>,
    ) -> Option<Box<EquationProgram>> {
        match program {
            Some(mut program) => {
                let mut previous = self.program.take().or_else(|| self.dormant.take());
                program.init(previous.as_deref_mut());
                self.program = Some(program);
                previous
            }
            None => {
                if let Some(current) = self.program.take() {
                    return self.dormant.replace(current);
                }
                None
            }
        }
    }

    pub fn is_equation_valid(&self) -> bool {
        self.program.is_some()
    }

    /// The message of the last failed [EquationProcessor::set_equation],
    /// empty if the last call succeeded.
    pub fn error_message(&self) -> &str {
        &self.error_message
    }

    /// The text of the installed equation.
    pub fn equation(&self) -> Option<&str> {
        self.program.as_ref().map(|p| p.source())
    }

    /// Indented dump of the installed expression tree, for debugging.
    pub fn ast_dump(&self) -> Option<String> {
        self.program.as_ref().map(|p| p.ast().dump(0))
    }

    /// Computes one output sample. Call this for every sample in order.
    #[inline]
    pub fn process_sample(&mut self, input: f32) -> f32 {
        let program = match &mut self.program {
            Some(program) => program,
            None => return input,
        };

        self.env.set_input(input as f64);
        let mut out = program.exec(&self.env);
        if !out.is_finite() {
            out = 0.0;
        }
        self.env.push_output(out);

        out as f32
    }

    /// Processes `buf` in place.
    pub fn process_block(&mut self, buf: &mut [f32]) {
        for sample in buf.iter_mut() {
            *sample = self.process_sample(*sample);
        }
    }

    /// Zeroes all delay lines, `x` and the feedback history. The equation
    /// and all other variables stay as they are.
    pub fn reset(&mut self) {
        if let Some(program) = &mut self.program {
            program.reset();
        }
        if let Some(dormant) = &mut self.dormant {
            dormant.reset();
        }
        self.env.reset_history();
    }

    pub fn set_variable(&mut self, name: &str, value: f64) {
        self.env.set(name, value);
    }

    /// See [Environment::set_owned].
    pub(crate) fn set_variable_owned(&mut self, name: String, value: f64) -> Option<String> {
        self.env.set_owned(name, value)
    }

    pub fn get_variable(&self, name: &str) -> f64 {
        self.env.get(name)
    }
}

impl Default for EquationProcessor {
    fn default() -> Self {
        Self::new()
    }
}
