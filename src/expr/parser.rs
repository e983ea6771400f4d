//! Precedence reordering: infix tokens to postfix using an operator stack.

use crate::core::errors::{CalcError, Result};
use crate::expr::token::{Bracket, Token};

/// Reorder infix `tokens` into postfix. Operators of equal priority are
/// left-associative.
pub fn to_postfix(tokens: &[Token]) -> Result<Vec<Token>> {
    let mut output = Vec::with_capacity(tokens.len());
    let mut operators: Vec<Token> = Vec::new();

    for &token in tokens {
        match token {
            Token::Operand(_) => output.push(token),
            Token::Operator { priority, .. } => {
                while let Some(&Token::Operator { priority: top, .. }) = operators.last() {
                    if top < priority {
                        break;
                    }
                    output.extend(operators.pop());
                }
                operators.push(token);
            }
            Token::Bracket(Bracket::Open) => operators.push(token),
            Token::Bracket(Bracket::Close) => loop {
                match operators.pop() {
                    Some(Token::Bracket(Bracket::Open)) => break,
                    Some(top) => output.push(top),
                    None => return Err(CalcError::MismatchedBrackets),
                }
            },
        }
    }

    while let Some(top) = operators.pop() {
        if let Token::Bracket(_) = top {
            return Err(CalcError::MismatchedBrackets);
        }
        output.push(top);
    }

    Ok(output)
}
