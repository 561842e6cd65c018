// Copyright (c) 2022 Weird Constructor <weirdconstructor@gmail.com>
// This file is a part of synfx-dsp-expr. Released under GPL-3.0-or-later.
// See README.md and COPYING for details.

//! The fixed table of functions an equation can call.

/// All function names the tokenizer classifies as functions.
///
/// Only the first eight and `filter` compute something, the others are
/// recognized so that equations written for a bigger toolbox still parse.
pub const FUNCTION_NAMES: &[&str] = &[
    "sin", "cos", "tan", "exp", "log", "log10", "sqrt", "abs", "filter", "conv", "fft", "ifft",
    "freqz", "butter", "cheby1", "cheby2",
];

/// Returns true if `name` is one of [FUNCTION_NAMES].
pub fn is_function_name(name: &str) -> bool {
    FUNCTION_NAMES.iter().any(|f| *f == name)
}

/// Applies the built-in function `name`.
///
/// `first` and `second` are the values of the first two arguments, `argc`
/// is how many arguments were passed in total. Missing arguments, unknown
/// names and the unimplemented toolbox functions all give `0.0`.
///
/// `filter(a, b)` is a stub that blends its two arguments half and half. It
/// does not run a coefficient driven IIR filter.
#[inline]
pub fn call_builtin(name: &str, first: f64, second: f64, argc: usize) -> f64 {
    if argc == 0 {
        return 0.0;
    }

    match name {
        "sin" => first.sin(),
        "cos" => first.cos(),
        "tan" => first.tan(),
        "exp" => first.exp(),
        "log" => first.ln(),
        "log10" => first.log10(),
        "sqrt" => first.sqrt(),
        "abs" => first.abs(),
        "filter" if argc >= 2 => first * 0.5 + second * 0.5,
        _ => 0.0,
    }
}
