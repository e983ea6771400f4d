//! Scans raw expression text into a token sequence.
//!
//! Numbers are unsigned decimal literals with an optional fraction and an
//! optional exponent (`12`, `1.5`, `.5`, `2e3`). A `-` is always the binary
//! subtraction operator. Any fragment that is not a number, an operator from
//! the priority table or a bracket aborts the whole scan.

use std::iter::Peekable;
use std::str::CharIndices;

use crate::core::errors::{CalcError, Result};
use crate::expr::token::{Bracket, PriorityTable, Token};

pub struct Lexer<'a> {
    source: &'a str,
    input: Peekable<CharIndices<'a>>,
    priorities: &'a PriorityTable,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str, priorities: &'a PriorityTable) -> Self {
        Lexer {
            source,
            input: source.char_indices().peekable(),
            priorities,
        }
    }

    /// Consume the whole input. No tokens are returned if any fragment fails.
    pub fn tokenize(mut self) -> Result<Vec<Token>> {
        let mut tokens = Vec::new();
        while let Some(token) = self.next_token()? {
            tokens.push(token);
        }
        Ok(tokens)
    }

    /// Advances the lexer and returns the next token, `None` at end of input.
    pub fn next_token(&mut self) -> Result<Option<Token>> {
        self.skip_whitespace();

        let (start, ch) = match self.input.next() {
            Some(next) => next,
            None => return Ok(None),
        };

        let token = match ch {
            '(' => Token::Bracket(Bracket::Open),
            ')' => Token::Bracket(Bracket::Close),
            ch if ch.is_ascii_digit() || ch == '.' => self.read_number(start)?,
            ch if ch.is_alphabetic() || ch == '_' => {
                let end = self.consume_while(|c| c.is_alphanumeric() || c == '_');
                return Err(CalcError::lex(&self.source[start..end], start));
            }
            ch => match self.priorities.operator_token(ch) {
                Some(token) => token,
                None => return Err(CalcError::lex(ch.to_string(), start)),
            },
        };

        Ok(Some(token))
    }

    fn skip_whitespace(&mut self) {
        while let Some(&(_, ch)) = self.input.peek() {
            if !ch.is_whitespace() {
                break;
            }
            self.input.next();
        }
    }

    /// Consume characters matching `pred`, returning the byte offset just
    /// past the last one consumed.
    fn consume_while(&mut self, pred: impl Fn(char) -> bool) -> usize {
        while let Some(&(_, ch)) = self.input.peek() {
            if !pred(ch) {
                break;
            }
            self.input.next();
        }
        self.offset()
    }

    fn offset(&mut self) -> usize {
        self.input
            .peek()
            .map(|&(idx, _)| idx)
            .unwrap_or(self.source.len())
    }

    fn read_number(&mut self, start: usize) -> Result<Token> {
        // Greedy over digits and dots so that "1.2.3" is reported whole.
        self.consume_while(|c| c.is_ascii_digit() || c == '.');

        if let Some(&(_, 'e' | 'E')) = self.input.peek() {
            self.input.next();
            if let Some(&(_, '+' | '-')) = self.input.peek() {
                self.input.next();
            }
            self.consume_while(|c| c.is_ascii_digit());
        }

        let end = self.offset();
        let fragment = &self.source[start..end];
        fragment
            .parse::<f64>()
            .map(Token::Operand)
            .map_err(|_| CalcError::lex(fragment, start))
    }
}

/// Tokenize `source` with the given operator table
pub fn tokenize(source: &str, priorities: &PriorityTable) -> Result<Vec<Token>> {
    Lexer::new(source, priorities).tokenize()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::token::BinaryOp;
    use pretty_assertions::assert_eq;

    fn lex(source: &str) -> Result<Vec<Token>> {
        tokenize(source, &PriorityTable::default())
    }

    fn op(op: BinaryOp, priority: u8) -> Token {
        Token::Operator { op, priority }
    }

    #[test]
    fn test_simple_expression() {
        let tokens = lex("2 + 2 * 2").unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::Operand(2.0),
                op(BinaryOp::Add, 1),
                Token::Operand(2.0),
                op(BinaryOp::Mul, 2),
                Token::Operand(2.0),
            ]
        );
    }

    #[test]
    fn test_no_whitespace_and_brackets() {
        let tokens = lex("(1.5-.5)/4").unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::Bracket(Bracket::Open),
                Token::Operand(1.5),
                op(BinaryOp::Sub, 1),
                Token::Operand(0.5),
                Token::Bracket(Bracket::Close),
                op(BinaryOp::Div, 2),
                Token::Operand(4.0),
            ]
        );
    }

    #[test]
    fn test_exponent_numbers() {
        assert_eq!(lex("2e3").unwrap(), vec![Token::Operand(2000.0)]);
        assert_eq!(lex("1.5E-2").unwrap(), vec![Token::Operand(0.015)]);
    }

    #[test]
    fn test_whitespace_only_is_empty() {
        assert!(lex(" \t\n ").unwrap().is_empty());
    }

    #[test]
    fn test_invalid_fragments() {
        match lex("2 + abc") {
            Err(CalcError::Lex { fragment, position }) => {
                assert_eq!(fragment, "abc");
                assert_eq!(position, 4);
            }
            other => panic!("Expected lex error, got {:?}", other),
        }
        assert!(matches!(lex("1.2.3"), Err(CalcError::Lex { .. })));
        assert!(matches!(lex("2e"), Err(CalcError::Lex { .. })));
        assert!(matches!(lex("2 % 3"), Err(CalcError::Lex { .. })));
        assert!(matches!(lex("."), Err(CalcError::Lex { .. })));
    }

    #[test]
    fn test_operator_outside_table_is_rejected() {
        let table = PriorityTable::default().without_operator(BinaryOp::Mul);
        let result = tokenize("2 * 3", &table);
        assert!(matches!(
            result,
            Err(CalcError::Lex { ref fragment, position: 2 }) if fragment == "*"
        ));
    }
}
