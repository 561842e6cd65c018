// Copyright (c) 2022 Weird Constructor <weirdconstructor@gmail.com>
// This file is a part of synfx-dsp-expr. Released under GPL-3.0-or-later.
// See README.md and COPYING for details.

use std::fmt;

/// Everything that can go wrong while turning equation text into an
/// [crate::EquationProgram].
///
/// Evaluation itself can't fail, so there is no runtime counterpart to this.
#[derive(Debug, Clone, PartialEq)]
pub enum EquationError {
    /// The equation contained nothing but whitespace.
    Empty,
    /// A character that is not part of the equation language.
    UnexpectedChar { ch: char, pos: usize },
    /// A run of digits and dots that is not a number, like `1.2.3`.
    MalformedNumber { text: String, pos: usize },
    /// `z^-` without a sample count after it.
    MissingDelayAmount { pos: usize },
    /// The token stream does not match the grammar.
    Syntax { msg: String, pos: usize },
    /// A `z^-n` term asks for more history than the engine is configured to keep.
    DelayTooLong { amount: usize, max: usize },
}

impl EquationError {
    pub(crate) fn syntax(msg: &str, pos: usize) -> Self {
        EquationError::Syntax { msg: msg.to_string(), pos }
    }

    /// Character offset into the equation text, if the error has one.
    pub fn position(&self) -> Option<usize> {
        match self {
            EquationError::Empty | EquationError::DelayTooLong { .. } => None,
            EquationError::UnexpectedChar { pos, .. }
            | EquationError::MalformedNumber { pos, .. }
            | EquationError::MissingDelayAmount { pos }
            | EquationError::Syntax { pos, .. } => Some(*pos),
        }
    }
}

impl fmt::Display for EquationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EquationError::Empty => write!(f, "Empty equation"),
            EquationError::UnexpectedChar { ch, pos } => {
                write!(f, "Unexpected character '{}' at position {}", ch, pos)
            }
            EquationError::MalformedNumber { text, pos } => {
                write!(f, "Malformed number '{}' at position {}", text, pos)
            }
            EquationError::MissingDelayAmount { pos } => {
                write!(f, "Expected sample count after 'z^-' at position {}", pos)
            }
            EquationError::Syntax { msg, pos } => write!(f, "{} (at position {})", msg, pos),
            EquationError::DelayTooLong { amount, max } => {
                write!(f, "Delay of {} samples exceeds the maximum of {} samples", amount, max)
            }
        }
    }
}

impl std::error::Error for EquationError {}
