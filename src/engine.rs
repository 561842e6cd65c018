// Copyright (c) 2022 Weird Constructor <weirdconstructor@gmail.com>
// This file is a part of synfx-dsp-expr. Released under GPL-3.0-or-later.
// See README.md and COPYING for details.

/*! This module implements a real time capable engine for sharing compiled equations with an audio thread.

Use this if you plan on (re)compiling equations in a frontend thread and having
an audio/backend thread actually evaluating them.

The [EquationEngine] parses the equation and allocates everything the equation
needs (including its delay lines) on the frontend thread. The resulting
[EquationProgram] is sent over a lock free ring buffer to the
[EquationBackend], which swaps it in between two samples. The replaced program
is sent back and freed by the frontend in [EquationEngine::query_returns].

See also [EquationEngine] for API examples. There is also an example included
with this crate.
*/

use crate::config::EngineConfig;
use crate::context::EquationProgram;
use crate::error::EquationError;
use crate::processor::EquationProcessor;

use ringbuf::{Consumer, Producer, RingBuffer};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use synfx_dsp::AtomicFloat;
use tracing::{debug, warn};

/// A host variable assignment on its way to the backend.
struct VariableUpdate {
    name: String,
    value: f64,
}

enum CodeUpdateMsg {
    UpdateProgram(Box<EquationProgram>),
    ClearProgram,
    ResetState,
    SetVariable(Box<VariableUpdate>),
}

impl CodeUpdateMsg {
    /// True if `older` has no effect anymore once `self` is delivered.
    fn supersedes(&self, older: &CodeUpdateMsg) -> bool {
        match (self, older) {
            (
                CodeUpdateMsg::UpdateProgram(_) | CodeUpdateMsg::ClearProgram,
                CodeUpdateMsg::UpdateProgram(_) | CodeUpdateMsg::ClearProgram,
            ) => true,
            (CodeUpdateMsg::SetVariable(new), CodeUpdateMsg::SetVariable(old)) => {
                new.name == old.name
            }
            _ => false,
        }
    }
}

enum CodeReturnMsg {
    DestroyProgram(Box<EquationProgram>),
    DestroyVariable(Box<VariableUpdate>),
}

/// This is the frontend handle for the equation execution engine.
///
/// You create it with either [EquationEngine::new] or [EquationEngine::with_config].
/// Afterwards you split off the backend/real time thread handle with [EquationEngine::get_backend].
/// In the backend you must make sure to call [EquationBackend::set_sample_rate] at least once
/// and [EquationBackend::process_updates] regularily.
///
/// Once the audio thread runs, you can call [EquationEngine::set_equation].
/// To free replaced [EquationProgram] instances, you **must** call
/// [EquationEngine::query_returns] regularily. In a GUI for instance each frame, or in the idle callback
/// of the event loop.
///
/// This is the rough way to use this API:
///
///```
/// use synfx_dsp_expr::engine::EquationEngine;
///
/// let mut engine = EquationEngine::new();
///
/// let mut backend = engine.get_backend();
/// std::thread::spawn(move || {
///     backend.set_sample_rate(44100.0);
///
///     for _ in 0..100 {
///         backend.process_updates();
///
///         for _frame in 0..64 {
///             let out = backend.process(0.5);
///         }
///     }
/// });
///
/// // Upload a new equation:
/// engine.set_equation("0.5*x + 0.5*z^-100").unwrap();
///
/// // Call this regularily!!!!
/// engine.query_returns();
///```
pub struct EquationEngine {
    config: EngineConfig,
    update_prod: Producer<CodeUpdateMsg>,
    return_cons: Consumer<CodeReturnMsg>,
    pending: VecDeque<CodeUpdateMsg>,
    last_output: Arc<AtomicFloat>,
    variables: HashMap<String, f64>,
    valid: bool,
    error_message: String,
    debug: bool,
    ast_dump: String,
}

impl EquationEngine {
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> Self {
        let rb = RingBuffer::new(config.ring_buffer_size);
        let (update_prod, _update_cons) = rb.split();
        let rb = RingBuffer::new(config.ring_buffer_size);
        let (_return_prod, return_cons) = rb.split();

        let mut variables = HashMap::new();
        variables.insert("pi".to_string(), std::f64::consts::PI);
        variables.insert("e".to_string(), std::f64::consts::E);

        Self {
            config,
            update_prod,
            return_cons,
            pending: VecDeque::new(),
            last_output: Arc::new(AtomicFloat::new(0.0)),
            variables,
            valid: false,
            error_message: String::new(),
            debug: false,
            ast_dump: String::new(),
        }
    }

    /// Enables collection of the AST dump for [EquationEngine::get_debug_info].
    pub fn set_debug(&mut self, debug: bool) {
        self.debug = debug;
    }

    /// Retrieves debug information:
    pub fn get_debug_info(&self) -> String {
        format!("---------- AST ----------\n{}---------- END ----------", self.ast_dump)
    }

    /// Queues `msg` behind all updates the backend has not received yet.
    /// Pending messages that `msg` makes obsolete are dropped here, on the
    /// frontend thread.
    fn send(&mut self, msg: CodeUpdateMsg) {
        self.pending.retain(|older| !msg.supersedes(older));
        self.pending.push_back(msg);
        self.flush_pending();
    }

    fn flush_pending(&mut self) {
        while let Some(msg) = self.pending.pop_front() {
            if let Err(msg) = self.update_prod.push(msg) {
                self.pending.push_front(msg);
                debug!(
                    "equation backend update queue is full, {} updates pending",
                    self.pending.len()
                );
                break;
            }
        }
    }

    /// True while updates are waiting for room in the queue to the backend.
    /// They are sent on the next call to [EquationEngine::query_returns]
    /// or any other call that sends an update.
    pub fn has_pending_updates(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Compiles `equation` and sends it to the backend thread.
    ///
    /// If compilation fails, the backend is told to drop its current
    /// equation and to pass its input through until the next successful call.
    ///
    ///```
    /// use synfx_dsp_expr::engine::EquationEngine;
    ///
    /// let mut engine = EquationEngine::new();
    /// let mut backend = engine.get_backend();
    ///
    /// engine.set_equation("x*x").unwrap();
    /// backend.process_updates();
    /// assert_eq!(backend.process(3.0), 9.0);
    ///
    /// assert!(engine.set_equation("x*").is_err());
    /// backend.process_updates();
    /// assert_eq!(backend.process(3.0), 3.0);
    ///```
    pub fn set_equation(&mut self, equation: &str) -> Result<(), EquationError> {
        match EquationProgram::compile(equation, &self.config) {
            Ok(program) => {
                debug!(
                    "compiled equation '{}' with {} delay lines",
                    equation,
                    program.delays().len()
                );
                if self.debug {
                    self.ast_dump = program.ast().dump(0);
                }
                self.valid = true;
                self.error_message.clear();
                self.send(CodeUpdateMsg::UpdateProgram(Box::new(program)));
                Ok(())
            }
            Err(err) => {
                warn!("rejected equation '{}': {}", equation, err);
                self.valid = false;
                self.error_message = err.to_string();
                self.ast_dump.clear();
                self.send(CodeUpdateMsg::ClearProgram);
                Err(err)
            }
        }
    }

    pub fn is_equation_valid(&self) -> bool {
        self.valid
    }

    pub fn error_message(&self) -> &str {
        &self.error_message
    }

    /// Sets a variable the equation can read, e.g. a host parameter.
    pub fn set_variable(&mut self, name: &str, value: f64) {
        self.variables.insert(name.to_string(), value);
        self.send(CodeUpdateMsg::SetVariable(Box::new(VariableUpdate {
            name: name.to_string(),
            value,
        })));
    }

    /// Returns the value of a variable as last set by [EquationEngine::set_variable],
    /// or one of the constants `pi` and `e`. Per sample values like `x` or
    /// `y_prev` only exist on the backend, see [EquationEngine::last_output].
    pub fn get_variable(&self, name: &str) -> f64 {
        self.variables.get(name).copied().unwrap_or(0.0)
    }

    /// The most recent sample returned by [EquationBackend::process].
    pub fn last_output(&self) -> f32 {
        self.last_output.get()
    }

    /// Emits a message to the backend to clear all delay lines
    /// and the feedback history.
    pub fn reset(&mut self) {
        self.send(CodeUpdateMsg::ResetState);
    }

    /// Call this regularily in the frontend/worker thread for cleanup purposes.
    /// It also sends updates that did not fit into the queue to the backend.
    ///
    /// If the backend finds the return queue full, it drops a replaced
    /// [EquationProgram] on the audio thread, including its delay lines.
    /// Calling this often enough (or raising
    /// `EngineConfig::ring_buffer_size`) keeps that from happening.
    pub fn query_returns(&mut self) {
        while let Some(msg) = self.return_cons.pop() {
            match msg {
                CodeReturnMsg::DestroyProgram(program) => {
                    debug!("freeing replaced equation '{}'", program.source());
                }
                CodeReturnMsg::DestroyVariable(_update) => (),
            }
        }
        self.flush_pending();
    }

    /// Use this function to split off a [EquationBackend]
    /// handle. If you call this multiple times, the previously generated
    /// [EquationBackend] instances will not receive any updates anymore.
    ///
    /// The new backend starts without an equation, so call
    /// [EquationEngine::set_equation] again afterwards.
    pub fn get_backend(&mut self) -> EquationBackend {
        let rb = RingBuffer::new(self.config.ring_buffer_size);
        let (update_prod, update_cons) = rb.split();
        let rb = RingBuffer::new(self.config.ring_buffer_size);
        let (return_prod, return_cons) = rb.split();

        self.update_prod = update_prod;
        self.return_cons = return_cons;
        self.pending.clear();
        self.valid = false;

        let mut processor = EquationProcessor::with_config(self.config.clone());
        for (name, value) in self.variables.iter() {
            processor.set_variable(name, *value);
        }

        EquationBackend::new(processor, update_cons, return_prod, self.last_output.clone())
    }
}

impl Default for EquationEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// The backend handle for a [EquationEngine].
///
/// You get this from a call to [EquationEngine::get_backend].
/// Make sure to set it up properly with [EquationBackend::set_sample_rate] and
/// regularily call [EquationBackend::process_updates] for receiving updated
/// [EquationProgram] instances from [EquationEngine::set_equation].
pub struct EquationBackend {
    processor: EquationProcessor,
    update_cons: Consumer<CodeUpdateMsg>,
    return_prod: Producer<CodeReturnMsg>,
    last_output: Arc<AtomicFloat>,
}

impl EquationBackend {
    fn new(
        processor: EquationProcessor,
        update_cons: Consumer<CodeUpdateMsg>,
        return_prod: Producer<CodeReturnMsg>,
        last_output: Arc<AtomicFloat>,
    ) -> Self {
        Self { processor, update_cons, return_prod, last_output }
    }

    /// Evaluates the current equation for one input sample.
    #[inline]
    pub fn process(&mut self, input: f32) -> f32 {
        let out = self.processor.process_sample(input);
        self.last_output.set(out);
        out
    }

    /// Processes `buf` in place.
    pub fn process_block(&mut self, buf: &mut [f32]) {
        for sample in buf.iter_mut() {
            *sample = self.processor.process_sample(*sample);
        }
        if let Some(last) = buf.last() {
            self.last_output.set(*last);
        }
    }

    /// Update/set the sample rate for the equation.
    /// This will also reset the state of the equation.
    pub fn set_sample_rate(&mut self, srate: f32) {
        self.processor.set_sample_rate(srate as f64);
    }

    /// Reset the delay lines and feedback history.
    pub fn clear(&mut self) {
        self.processor.reset();
    }

    /// Sends `msg` back for freeing. If the return queue is full, `msg`
    /// is dropped right here on the audio thread.
    fn give_back(&mut self, msg: CodeReturnMsg) {
        let _ = self.return_prod.push(msg);
    }

    /// Process updates received from the thread running the [EquationEngine].
    pub fn process_updates(&mut self) {
        while let Some(msg) = self.update_cons.pop() {
            match msg {
                CodeUpdateMsg::UpdateProgram(program) => {
                    if let Some(old) = self.processor.install(Some(program)) {
                        self.give_back(CodeReturnMsg::DestroyProgram(old));
                    }
                }
                CodeUpdateMsg::ClearProgram => {
                    if let Some(old) = self.processor.install(None) {
                        self.give_back(CodeReturnMsg::DestroyProgram(old));
                    }
                }
                CodeUpdateMsg::ResetState => {
                    self.processor.reset();
                }
                CodeUpdateMsg::SetVariable(mut update) => {
                    let name = std::mem::take(&mut update.name);
                    if let Some(name) = self.processor.set_variable_owned(name, update.value) {
                        update.name = name;
                    }
                    self.give_back(CodeReturnMsg::DestroyVariable(update));
                }
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn check_engine_reset() {
        let mut engine = EquationEngine::new();
        let mut backend = engine.get_backend();

        backend.set_sample_rate(44100.0);

        engine.set_equation("z^-1").unwrap();

        backend.process_updates();
        assert_eq!(backend.process(1.0), 0.0);

        engine.reset();
        backend.process_updates();
        assert_eq!(backend.process(0.0), 0.0);

        backend.process(1.0);
        backend.clear();
        assert_eq!(backend.process(0.0), 0.0);
    }

    #[test]
    fn check_engine_program_swap() {
        let mut engine = EquationEngine::new();
        let mut backend = engine.get_backend();

        engine.set_equation("x + z^-1").unwrap();
        backend.process_updates();
        assert_eq!(backend.process(1.0), 1.0);

        engine.set_equation("10*z^-1").unwrap();
        // Not yet received by the backend:
        assert_eq!(backend.process(0.0), 1.0);
        backend.process_updates();
        assert_eq!(backend.process(0.0), 0.0);
        assert_eq!(engine.last_output(), 0.0);

        engine.query_returns();
    }

    #[test]
    fn check_engine_variables() {
        let mut engine = EquationEngine::new();
        engine.set_variable("gain", 0.5);
        let mut backend = engine.get_backend();

        engine.set_equation("gain*x + offset").unwrap();
        backend.process_updates();
        assert_eq!(backend.process(2.0), 1.0);

        engine.set_variable("offset", 0.25);
        engine.set_variable("gain", 2.0);
        backend.process_updates();
        assert_eq!(backend.process(2.0), 4.25);
        assert_eq!(engine.last_output(), 4.25);

        assert_eq!(engine.get_variable("offset"), 0.25);
        assert_eq!(engine.get_variable("pi"), std::f64::consts::PI);
        engine.query_returns();
    }

    #[test]
    fn check_engine_invalid_equation() {
        let mut engine = EquationEngine::new();
        let mut backend = engine.get_backend();

        engine.set_equation("0.5*x").unwrap();
        backend.process_updates();
        assert_eq!(backend.process(1.0), 0.5);

        let err = engine.set_equation("(x").unwrap_err();
        assert!(!engine.is_equation_valid());
        assert_eq!(engine.error_message(), err.to_string());
        backend.process_updates();
        assert_eq!(backend.process(1.0), 1.0);
    }

    #[test]
    fn check_engine_full_queue_keeps_latest() {
        let mut engine = EquationEngine::with_config(EngineConfig::default().ring_buffer_size(4));
        let mut backend = engine.get_backend();

        for i in 0..200 {
            engine.set_equation(&format!("{}*x", i)).unwrap();
            engine.set_variable("offset", i as f64);
        }
        assert!(engine.is_equation_valid());
        assert!(engine.has_pending_updates());

        for _ in 0..10 {
            backend.process_updates();
            engine.query_returns();
        }
        assert!(!engine.has_pending_updates());
        assert_eq!(backend.process(1.0), 199.0);
        assert_eq!(engine.get_variable("offset"), 199.0);

        engine.set_equation("x + offset").unwrap();
        backend.process_updates();
        assert_eq!(backend.process(1.0), 200.0);
    }

    #[test]
    fn check_engine_full_return_queue() {
        let mut engine = EquationEngine::with_config(EngineConfig::default().ring_buffer_size(2));
        let mut backend = engine.get_backend();

        // Nobody frees the replaced programs, the backend keeps working:
        for i in 1..=6 {
            engine.set_equation(&format!("{}*z^-1", i)).unwrap();
            backend.process_updates();
            let expected = if i == 1 { 0.0 } else { i as f32 };
            assert_eq!(backend.process(1.0), expected);
        }
        assert!(!engine.has_pending_updates());
        engine.query_returns();
    }

    #[test]
    fn check_engine_debug_info() {
        let mut engine = EquationEngine::new();
        engine.set_debug(true);
        engine.set_equation("z^-4").unwrap();
        assert_eq!(
            engine.get_debug_info(),
            "---------- AST ----------\n   delay:4\n---------- END ----------"
        );
    }

    #[test]
    fn check_engine_thread() {
        let mut engine = EquationEngine::new();
        let mut backend = engine.get_backend();
        engine.set_equation("x + 0.3*z^-1").unwrap();

        let out = std::thread::spawn(move || {
            backend.process_updates();
            let mut buf = [1.0, 0.0, 0.0, 0.0];
            backend.process_block(&mut buf);
            buf
        })
        .join()
        .expect("Joining threads works in this test");

        assert_eq!(out, [1.0, 0.3, 0.0, 0.0]);
        assert_eq!(engine.last_output(), 0.0);
        engine.query_returns();
    }
}
