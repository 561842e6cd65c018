// Copyright (c) 2022 Weird Constructor <weirdconstructor@gmail.com>
// This file is a part of synfx-dsp-expr. Released under GPL-3.0-or-later.
// See README.md and COPYING for details.

/*! Recursive descent parser for the equation language.

The grammar, from lowest to highest binding:

```text
expression   := term (('+'|'-') term)*
term         := factor (('*'|'/'|'^') factor)*
factor       := Number | Delay | Variable | functionCall | '(' expression ')'
functionCall := Function '(' (expression (',' expression)*)? ')'
```

All operators are left associative. Note that `^` binds exactly as tight as
`*` and `/`, so `2*3^2` is `(2*3)^2` and `2^3^2` is `(2^3)^2`. There is no
unary minus, write `0-x` instead.
*/

use crate::ast::*;
use crate::error::EquationError;
use crate::token::{tokenize, Token, TokenKind};

pub struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
}

impl<'a> Parser<'a> {
    /// `tokens` must end with a [TokenKind::End] token, as returned by [tokenize].
    pub fn new(tokens: &'a [Token]) -> Self {
        Self { tokens, pos: 0 }
    }

    fn peek(&self) -> Option<&'a Token> {
        self.tokens.get(self.pos)
    }

    fn peek_pos(&self) -> usize {
        match self.peek() {
            Some(tok) => tok.pos,
            None => self.tokens.last().map(|t| t.pos).unwrap_or(0),
        }
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.peek().map(|t| t.kind == kind).unwrap_or(false)
    }

    fn advance(&mut self) -> Option<&'a Token> {
        let tok = self.tokens.get(self.pos);
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn is_at_end(&self) -> bool {
        self.peek().map(|t| t.kind == TokenKind::End).unwrap_or(true)
    }

    /// Consumes the next token if it is one of the operators in `ops`.
    fn match_op(&mut self, ops: &[&str]) -> Option<ASTBinOp> {
        let tok = self.peek()?;
        if tok.kind != TokenKind::Operator || !ops.iter().any(|op| tok.is_op(op)) {
            return None;
        }
        self.pos += 1;
        ASTBinOp::from_str(&tok.text)
    }

    /// Parses the complete token stream into one expression tree.
    pub fn parse(mut self) -> Result<Box<ASTNode>, EquationError> {
        if self.is_at_end() {
            return Err(EquationError::Empty);
        }

        let ast = self.parse_expression()?;
        if !self.is_at_end() {
            return Err(EquationError::syntax(
                "Unexpected tokens at end of expression",
                self.peek_pos(),
            ));
        }

        Ok(ast)
    }

    fn parse_expression(&mut self) -> Result<Box<ASTNode>, EquationError> {
        let mut left = self.parse_term()?;

        while let Some(op) = self.match_op(&["+", "-"]) {
            let right = self.parse_term()?;
            left = Box::new(ASTNode::BinOp(op, left, right));
        }

        Ok(left)
    }

    fn parse_term(&mut self) -> Result<Box<ASTNode>, EquationError> {
        let mut left = self.parse_factor()?;

        while let Some(op) = self.match_op(&["*", "/", "^"]) {
            let right = self.parse_factor()?;
            left = Box::new(ASTNode::BinOp(op, left, right));
        }

        Ok(left)
    }

    fn parse_factor(&mut self) -> Result<Box<ASTNode>, EquationError> {
        let pos = self.peek_pos();
        let tok = match self.peek() {
            Some(tok) => tok,
            None => return Err(EquationError::syntax("Unexpected token in expression", pos)),
        };

        match tok.kind {
            TokenKind::Number => {
                self.advance();
                Ok(Box::new(ASTNode::Lit(tok.value)))
            }
            TokenKind::Delay => {
                self.advance();
                Ok(Box::new(ASTNode::Delay(tok.value as usize)))
            }
            TokenKind::Variable => {
                self.advance();
                Ok(Box::new(ASTNode::Var(tok.text.clone())))
            }
            TokenKind::Function => {
                self.advance();
                self.parse_function(&tok.text)
            }
            TokenKind::LeftParen => {
                self.advance();
                let expr = self.parse_expression()?;
                if !self.check(TokenKind::RightParen) {
                    return Err(EquationError::syntax(
                        "Expected ')' after expression",
                        self.peek_pos(),
                    ));
                }
                self.advance();
                Ok(expr)
            }
            _ => Err(EquationError::syntax("Unexpected token in expression", pos)),
        }
    }

    fn parse_function(&mut self, name: &str) -> Result<Box<ASTNode>, EquationError> {
        if !self.check(TokenKind::LeftParen) {
            return Err(EquationError::syntax("Expected '(' after function name", self.peek_pos()));
        }
        self.advance();

        let mut args = vec![];
        if !self.check(TokenKind::RightParen) {
            args.push(self.parse_expression()?);
            while self.check(TokenKind::Comma) {
                self.advance();
                args.push(self.parse_expression()?);
            }
        }

        if !self.check(TokenKind::RightParen) {
            return Err(EquationError::syntax(
                "Expected ')' after function arguments",
                self.peek_pos(),
            ));
        }
        self.advance();

        Ok(Box::new(ASTNode::Call(name.to_string(), args)))
    }
}

/// Tokenizes and parses an equation.
///
///```
/// use synfx_dsp_expr::parser::parse_equation;
/// use synfx_dsp_expr::build::*;
///
/// let ast = parse_equation("x + 0.3*z^-1").unwrap();
/// assert_eq!(ast, op_add(var("x"), op_mul(literal(0.3), delay(1))));
///```
pub fn parse_equation(equation: &str) -> Result<Box<ASTNode>, EquationError> {
    let tokens = tokenize(equation)?;
    Parser::new(&tokens).parse()
}
