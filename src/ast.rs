// Copyright (c) 2022 Weird Constructor <weirdconstructor@gmail.com>
// This file is a part of synfx-dsp-expr. Released under GPL-3.0-or-later.
// See README.md and COPYING for details.

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ASTBinOp {
    Add,
    Sub,
    Mul,
    Div,
    Pow,
}

impl ASTBinOp {
    pub fn from_str(op: &str) -> Option<Self> {
        match op {
            "+" => Some(ASTBinOp::Add),
            "-" => Some(ASTBinOp::Sub),
            "*" => Some(ASTBinOp::Mul),
            "/" => Some(ASTBinOp::Div),
            "^" => Some(ASTBinOp::Pow),
            _ => None,
        }
    }

    /// Applies the operator. Division by zero gives `0.0`.
    #[inline]
    pub fn apply(&self, a: f64, b: f64) -> f64 {
        match self {
            ASTBinOp::Add => a + b,
            ASTBinOp::Sub => a - b,
            ASTBinOp::Mul => a * b,
            ASTBinOp::Div => {
                if b == 0.0 {
                    0.0
                } else {
                    a / b
                }
            }
            ASTBinOp::Pow => a.powf(b),
        }
    }
}

/// A node of the expression tree of an equation.
///
/// Trees are built once by the [crate::parser] (or by hand with the [build]
/// helpers) and are never mutated afterwards.
#[derive(Debug, Clone, PartialEq)]
pub enum ASTNode {
    Lit(f64),
    Var(String),
    BinOp(ASTBinOp, Box<ASTNode>, Box<ASTNode>),
    Call(String, Vec<Box<ASTNode>>),
    /// `z^-n`, the input signal delayed by `n` samples.
    Delay(usize),
}

/// Visits `node` and all its children, parents first.
pub fn walk_ast<F: FnMut(&ASTNode)>(node: &ASTNode, f: &mut F) {
    f(node);
    match node {
        ASTNode::Lit(_) | ASTNode::Var(_) | ASTNode::Delay(_) => {}
        ASTNode::BinOp(_, expr1, expr2) => {
            walk_ast(expr1.as_ref(), f);
            walk_ast(expr2.as_ref(), f);
        }
        ASTNode::Call(_, exprs) => {
            for e in exprs.iter() {
                walk_ast(e.as_ref(), f);
            }
        }
    }
}

impl ASTNode {
    pub fn to_string(&self) -> String {
        match self {
            ASTNode::Lit(v) => format!("lit:{:6.4}", v),
            ASTNode::Var(v) => format!("var:{}", v),
            ASTNode::BinOp(op, _, _) => format!("binop:{:?}", op),
            ASTNode::Call(fun, _) => format!("call:{}", fun),
            ASTNode::Delay(n) => format!("delay:{}", n),
        }
    }

    /// Collects the distinct delay amounts referenced anywhere in this tree,
    /// in ascending order.
    pub fn delay_amounts(&self) -> Vec<usize> {
        let mut amounts = vec![];
        walk_ast(self, &mut |node| {
            if let ASTNode::Delay(n) = node {
                amounts.push(*n);
            }
        });
        amounts.sort_unstable();
        amounts.dedup();
        amounts
    }

    pub fn dump(&self, indent: usize) -> String {
        let indent_str = "   ".repeat(indent + 1);
        let mut s = indent_str + &self.to_string() + "\n";

        match self {
            ASTNode::Lit(_) => (),
            ASTNode::Var(_) => (),
            ASTNode::Delay(_) => (),
            ASTNode::BinOp(_, a, b) => {
                s += &a.dump(indent + 1);
                s += &b.dump(indent + 1);
            }
            ASTNode::Call(_, args) => {
                for (i, a) in args.iter().enumerate() {
                    s += &format!("[{}] {}", i, &a.dump(indent + 1));
                }
            }
        }

        s
    }
}

pub mod build {
    use super::*;

    pub fn literal(v: f64) -> Box<ASTNode> {
        Box::new(ASTNode::Lit(v))
    }

    pub fn var(name: &str) -> Box<ASTNode> {
        Box::new(ASTNode::Var(name.to_string()))
    }

    pub fn delay(n: usize) -> Box<ASTNode> {
        Box::new(ASTNode::Delay(n))
    }

    pub fn op_add(a: Box<ASTNode>, b: Box<ASTNode>) -> Box<ASTNode> {
        Box::new(ASTNode::BinOp(ASTBinOp::Add, a, b))
    }

    pub fn op_sub(a: Box<ASTNode>, b: Box<ASTNode>) -> Box<ASTNode> {
        Box::new(ASTNode::BinOp(ASTBinOp::Sub, a, b))
    }

    pub fn op_mul(a: Box<ASTNode>, b: Box<ASTNode>) -> Box<ASTNode> {
        Box::new(ASTNode::BinOp(ASTBinOp::Mul, a, b))
    }

    pub fn op_div(a: Box<ASTNode>, b: Box<ASTNode>) -> Box<ASTNode> {
        Box::new(ASTNode::BinOp(ASTBinOp::Div, a, b))
    }

    pub fn op_pow(a: Box<ASTNode>, b: Box<ASTNode>) -> Box<ASTNode> {
        Box::new(ASTNode::BinOp(ASTBinOp::Pow, a, b))
    }

    pub fn call(name: &str, args: &[Box<ASTNode>]) -> Box<ASTNode> {
        Box::new(ASTNode::Call(name.to_string(), args.to_vec()))
    }
}

#[cfg(test)]
mod test {
    use super::build::*;
    use super::*;

    #[test]
    fn check_delay_amounts() {
        let ast = op_add(
            op_mul(literal(0.5), delay(3)),
            call("filter", &[delay(1), op_add(delay(3), var("x"))]),
        );
        assert_eq!(ast.delay_amounts(), vec![1, 3]);
        assert!(var("x").delay_amounts().is_empty());
    }

    #[test]
    fn check_dump() {
        let ast = op_add(var("x"), call("sin", &[delay(2)]));
        assert_eq!(
            ast.dump(0),
            "   binop:Add\n      var:x\n      call:sin\n[0]          delay:2\n"
        );
    }

    #[test]
    fn check_binop_apply() {
        assert_eq!(ASTBinOp::Div.apply(3.0, 0.0), 0.0);
        assert_eq!(ASTBinOp::Div.apply(3.0, 2.0), 1.5);
        assert_eq!(ASTBinOp::Pow.apply(2.0, 10.0), 1024.0);
        assert_eq!(ASTBinOp::from_str("^"), Some(ASTBinOp::Pow));
        assert_eq!(ASTBinOp::from_str("%"), None);
    }
}
