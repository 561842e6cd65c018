// Copyright (c) 2022 Weird Constructor <weirdconstructor@gmail.com>
// This file is a part of synfx-dsp-expr. Released under GPL-3.0-or-later.
// See README.md and COPYING for details.

/*! synfx-dsp-expr - Per sample evaluation of MATLAB-like audio effect equations

This crate lets you describe the transfer function of an audio effect as
an algebraic expression, compile it once and evaluate it once per audio
sample in a real time signal path.

```text
0.5*x + 0.5*z^-441 * sin(2*pi*5/fs)
```

The language knows:

- numbers like `0.5`, `.25` or `12`
- the operators `+ - * / ^`, where `^` binds as tight as `*` and `/`
- variables: `x` (current input sample), `y_prev` and `y_prev2` (the previous
  two output samples), `fs`/`Fs` (sample rate), `pi`, `e` and anything the host
  sets with [EquationProcessor::set_variable]. Unknown variables are `0.0`.
- the functions `sin cos tan exp log log10 sqrt abs`, the stub `filter(a, b)`
  which returns `0.5*a + 0.5*b`, and the names `conv fft ifft freqz butter
  cheby1 cheby2` which are accepted but evaluate to `0.0`.
- `z^-n`: the input `x` from `n` samples ago.

Evaluation never fails: a division by zero is `0.0`, and a non finite result
is replaced by `0.0`. An equation that does not compile makes the processor
pass its input through unchanged.

```
use synfx_dsp_expr::EquationProcessor;

let mut proc = EquationProcessor::new();
proc.set_sample_rate(44100.0);
proc.set_equation("x + 0.3*z^-1").unwrap();

assert_eq!(proc.process_sample(1.0), 1.0);
assert_eq!(proc.process_sample(0.0), 0.3);
```

For compiling on a GUI thread while an audio thread is running see
[engine::EquationEngine].
*/

mod ast;
mod config;
mod context;
mod delay;
pub mod engine;
mod error;
mod eval;
pub mod parser;
mod processor;
mod stdlib;
pub mod token;
pub use ast::*;
pub use config::EngineConfig;
pub use context::{Environment, EquationProgram};
pub use delay::{DelayLine, DelayLineRegistry, DEFAULT_MIN_DELAY_CAPACITY};
pub use error::EquationError;
pub use eval::evaluate;
pub use processor::EquationProcessor;
pub use stdlib::{call_builtin, is_function_name, FUNCTION_NAMES};
