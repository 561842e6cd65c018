// Copyright (c) 2022 Weird Constructor <weirdconstructor@gmail.com>
// This file is a part of synfx-dsp-expr. Released under GPL-3.0-or-later.
// See README.md and COPYING for details.

use crate::ast::ASTNode;
use crate::context::Environment;
use crate::delay::DelayLineRegistry;
use crate::stdlib::call_builtin;

/// Computes the value of `node` for the current sample.
///
/// This never fails: unknown variables and functions yield `0.0`, so do
/// divisions by zero. `z^-n` terms read the input signal `x` from `n` samples
/// ago, regardless of the expression they appear in. The caller is responsible
/// for feeding `x` into the delay lines once the sample is done, see
/// [DelayLineRegistry::push_all].
///
/// No allocations happen here as long as all delay amounts of `node` were
/// passed to [DelayLineRegistry::prepare] before.
pub fn evaluate(node: &ASTNode, env: &Environment, delays: &mut DelayLineRegistry) -> f64 {
    match node {
        ASTNode::Lit(v) => *v,
        ASTNode::Var(name) => env.get(name),
        ASTNode::BinOp(op, a, b) => {
            let a = evaluate(a, env, delays);
            let b = evaluate(b, env, delays);
            op.apply(a, b)
        }
        ASTNode::Call(name, args) => {
            let mut first = 0.0;
            let mut second = 0.0;
            for (i, arg) in args.iter().enumerate() {
                let v = evaluate(arg, env, delays);
                match i {
                    0 => first = v,
                    1 => second = v,
                    _ => (),
                }
            }
            call_builtin(name, first, second, args.len())
        }
        ASTNode::Delay(0) => env.input(),
        ASTNode::Delay(n) => delays.get_or_create(*n).tap(*n),
    }
}
