// Copyright (c) 2022 Weird Constructor <weirdconstructor@gmail.com>
// This file is a part of synfx-dsp-expr. Released under GPL-3.0-or-later.
// See README.md and COPYING for details.

use crate::error::EquationError;
use crate::stdlib::is_function_name;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TokenKind {
    Number,
    Variable,
    /// A `z^-n` delay term, `value` holds `n`.
    Delay,
    Function,
    Operator,
    LeftParen,
    RightParen,
    Comma,
    End,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub value: f64,
    /// Character offset of the first character of this token.
    pub pos: usize,
}

impl Token {
    fn new(kind: TokenKind, text: String, value: f64, pos: usize) -> Self {
        Self { kind, text, value, pos }
    }

    pub fn is_op(&self, op: &str) -> bool {
        self.kind == TokenKind::Operator && self.text == op
    }
}

struct Lexer {
    chars: Vec<char>,
    pos: usize,
}

impl Lexer {
    fn new(input: &str) -> Self {
        Self { chars: input.chars().collect(), pos: 0 }
    }

    fn peek_at(&self, offs: usize) -> Option<char> {
        self.chars.get(self.pos + offs).copied()
    }

    fn take_while<F: Fn(char) -> bool>(&mut self, f: F) -> String {
        let start = self.pos;
        while let Some(c) = self.peek_at(0) {
            if !f(c) {
                break;
            }
            self.pos += 1;
        }
        self.chars[start..self.pos].iter().collect()
    }

    fn starts_delay(&self) -> bool {
        self.peek_at(0) == Some('z') && self.peek_at(1) == Some('^') && self.peek_at(2) == Some('-')
    }

    fn next_token(&mut self) -> Result<Token, EquationError> {
        while let Some(c) = self.peek_at(0) {
            if !c.is_whitespace() {
                break;
            }
            self.pos += 1;
        }

        let start = self.pos;
        let Some(c) = self.peek_at(0) else {
            return Ok(Token::new(TokenKind::End, String::new(), 0.0, start));
        };

        if self.starts_delay() {
            self.pos += 3;
            let digits = self.take_while(|c| c.is_ascii_digit());
            if digits.is_empty() {
                return Err(EquationError::MissingDelayAmount { pos: start });
            }
            let amount: usize = digits
                .parse()
                .map_err(|_| EquationError::MalformedNumber { text: digits.clone(), pos: start + 3 })?;
            return Ok(Token::new(TokenKind::Delay, format!("z^-{}", digits), amount as f64, start));
        }

        match c {
            '0'..='9' | '.' => {
                let text = self.take_while(|c| c.is_ascii_digit() || c == '.');
                let value: f64 = text
                    .parse()
                    .map_err(|_| EquationError::MalformedNumber { text: text.clone(), pos: start })?;
                Ok(Token::new(TokenKind::Number, text, value, start))
            }
            'a'..='z' | 'A'..='Z' => {
                let name = self.take_while(|c| c.is_ascii_alphanumeric() || c == '_');
                let kind =
                    if is_function_name(&name) { TokenKind::Function } else { TokenKind::Variable };
                Ok(Token::new(kind, name, 0.0, start))
            }
            '+' | '-' | '*' | '/' | '^' => {
                self.pos += 1;
                Ok(Token::new(TokenKind::Operator, c.to_string(), 0.0, start))
            }
            '(' => {
                self.pos += 1;
                Ok(Token::new(TokenKind::LeftParen, c.to_string(), 0.0, start))
            }
            ')' => {
                self.pos += 1;
                Ok(Token::new(TokenKind::RightParen, c.to_string(), 0.0, start))
            }
            ',' => {
                self.pos += 1;
                Ok(Token::new(TokenKind::Comma, c.to_string(), 0.0, start))
            }
            _ => Err(EquationError::UnexpectedChar { ch: c, pos: start }),
        }
    }
}

/// Splits an equation into tokens. The returned vector always ends with a
/// [TokenKind::End] token.
///
/// Whitespace separates tokens and is otherwise ignored. Characters outside
/// the equation language are reported instead of being skipped.
///
///```
/// use synfx_dsp_expr::token::{tokenize, TokenKind};
///
/// let toks = tokenize("0.5 * z^-12").unwrap();
/// assert_eq!(toks.len(), 4);
/// assert_eq!(toks[2].kind, TokenKind::Delay);
/// assert_eq!(toks[2].value, 12.0);
///```
pub fn tokenize(equation: &str) -> Result<Vec<Token>, EquationError> {
    let mut lexer = Lexer::new(equation);
    let mut tokens = vec![];

    loop {
        let tok = lexer.next_token()?;
        let end = tok.kind == TokenKind::End;
        tokens.push(tok);
        if end {
            break;
        }
    }

    Ok(tokens)
}

#[cfg(test)]
mod test {
    use super::*;

    fn kinds(s: &str) -> Vec<TokenKind> {
        tokenize(s).unwrap().iter().map(|t| t.kind).collect()
    }

    #[test]
    fn check_tokenize_basic() {
        use TokenKind::*;
        assert_eq!(
            kinds("sin(x) + 0.25*y_prev2"),
            vec![Function, LeftParen, Variable, RightParen, Operator, Number, Operator, Variable, End]
        );
        assert_eq!(kinds(""), vec![End]);
        assert_eq!(kinds("  \t "), vec![End]);
        assert_eq!(kinds("filter(x,z^-3)"), vec![
            Function, LeftParen, Variable, Comma, Delay, RightParen, End
        ]);
    }

    #[test]
    fn check_tokenize_numbers() {
        let toks = tokenize("12.5 .5 3").unwrap();
        assert_eq!(toks[0].value, 12.5);
        assert_eq!(toks[1].value, 0.5);
        assert_eq!(toks[2].value, 3.0);
        assert_eq!(toks[2].pos, 8);
    }

    #[test]
    fn check_tokenize_malformed_number() {
        assert_eq!(
            tokenize("x + 1.2.3"),
            Err(EquationError::MalformedNumber { text: "1.2.3".to_string(), pos: 4 })
        );
        assert!(matches!(tokenize("."), Err(EquationError::MalformedNumber { .. })));
    }

    #[test]
    fn check_tokenize_delay() {
        let toks = tokenize("z^-1024").unwrap();
        assert_eq!(toks[0].kind, TokenKind::Delay);
        assert_eq!(toks[0].text, "z^-1024");
        assert_eq!(toks[0].value, 1024.0);

        assert_eq!(tokenize("x*z^-"), Err(EquationError::MissingDelayAmount { pos: 2 }));

        // Not a delay, just a variable named z to a power:
        assert_eq!(kinds("z^2"), vec![
            TokenKind::Variable, TokenKind::Operator, TokenKind::Number, TokenKind::End
        ]);
        assert_eq!(tokenize("zeta").unwrap()[0].text, "zeta");
    }

    #[test]
    fn check_tokenize_identifiers() {
        let toks = tokenize("log10 logx Fs").unwrap();
        assert_eq!(toks[0].kind, TokenKind::Function);
        assert_eq!(toks[1].kind, TokenKind::Variable);
        assert_eq!(toks[1].text, "logx");
        assert_eq!(toks[2].text, "Fs");
    }

    #[test]
    fn check_tokenize_unexpected_char() {
        assert_eq!(tokenize("x $ 2"), Err(EquationError::UnexpectedChar { ch: '$', pos: 2 }));
        assert_eq!(tokenize("_a"), Err(EquationError::UnexpectedChar { ch: '_', pos: 0 }));
    }
}
