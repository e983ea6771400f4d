//! Direct evaluation, used by workers for single operations and as the
//! reference result for whole expressions.

use crate::core::errors::{CalcError, Result};
use crate::expr::token::{BinaryOp, Token};
use crate::expr::tree::Node;

impl BinaryOp {
    /// Apply the operator to two operands
    pub fn apply(self, lhs: f64, rhs: f64) -> Result<f64> {
        match self {
            BinaryOp::Add => Ok(lhs + rhs),
            BinaryOp::Sub => Ok(lhs - rhs),
            BinaryOp::Mul => Ok(lhs * rhs),
            BinaryOp::Div => {
                if rhs == 0.0 {
                    return Err(CalcError::DivisionByZero);
                }
                Ok(lhs / rhs)
            }
        }
    }
}

/// Evaluate a postfix sequence with a value stack
pub fn evaluate_postfix(postfix: &[Token]) -> Result<f64> {
    let mut stack: Vec<f64> = Vec::new();

    for token in postfix {
        match *token {
            Token::Operand(value) => stack.push(value),
            Token::Operator { op, .. } => {
                let (rhs, lhs) = match (stack.pop(), stack.pop()) {
                    (Some(rhs), Some(lhs)) => (rhs, lhs),
                    _ => return Err(CalcError::malformed("not enough operands")),
                };
                stack.push(op.apply(lhs, rhs)?);
            }
            Token::Bracket(_) => {
                return Err(CalcError::malformed("bracket in postfix sequence"));
            }
        }
    }

    match stack.as_slice() {
        [value] => Ok(*value),
        _ => Err(CalcError::malformed("invalid stack")),
    }
}

/// Pending work while evaluating a tree
enum Step<'a> {
    Visit(&'a Node),
    Apply(BinaryOp),
}

impl Node {
    /// Evaluate the tree with explicit work and value stacks
    pub fn evaluate(&self) -> Result<f64> {
        let mut values: Vec<f64> = Vec::new();
        let mut steps = vec![Step::Visit(self)];

        while let Some(step) = steps.pop() {
            match step {
                Step::Visit(Node::Literal(value)) => values.push(*value),
                Step::Visit(Node::Operation {
                    op, left, right, ..
                }) => {
                    steps.push(Step::Apply(*op));
                    steps.push(Step::Visit(&**right));
                    steps.push(Step::Visit(&**left));
                }
                Step::Apply(op) => {
                    let (rhs, lhs) = match (values.pop(), values.pop()) {
                        (Some(rhs), Some(lhs)) => (rhs, lhs),
                        _ => return Err(CalcError::malformed("not enough operands")),
                    };
                    values.push(op.apply(lhs, rhs)?);
                }
            }
        }

        match values.as_slice() {
            [value] => Ok(*value),
            _ => Err(CalcError::malformed("invalid stack")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::calculate;

    #[test]
    fn test_apply() {
        assert_eq!(BinaryOp::Add.apply(2.0, 3.0).unwrap(), 5.0);
        assert_eq!(BinaryOp::Sub.apply(2.0, 3.0).unwrap(), -1.0);
        assert_eq!(BinaryOp::Mul.apply(2.0, 3.0).unwrap(), 6.0);
        assert_eq!(BinaryOp::Div.apply(3.0, 2.0).unwrap(), 1.5);
        assert!(matches!(
            BinaryOp::Div.apply(1.0, 0.0),
            Err(CalcError::DivisionByZero)
        ));
    }

    #[test]
    fn test_calculate() {
        assert_eq!(calculate("2 + 2 * 2").unwrap(), 6.0);
        assert_eq!(calculate("(2+2)*(3+3)").unwrap(), 24.0);
        assert_eq!(calculate("10 - 4 - 3").unwrap(), 3.0);
        assert_eq!(calculate("42").unwrap(), 42.0);
        assert!(matches!(calculate("1/(2-2)"), Err(CalcError::DivisionByZero)));
    }

    #[test]
    fn test_deep_tree_evaluates() {
        use crate::expr::{compile_tree, PriorityTable};
        let source = format!("1{}", "+1".repeat(150_000));
        let tree = compile_tree(&source, &PriorityTable::default()).unwrap();
        assert_eq!(tree.evaluate().unwrap(), 150_001.0);
        assert_eq!(calculate(&source).unwrap(), 150_001.0);
    }

    #[test]
    fn test_tree_matches_postfix() {
        use crate::expr::{compile_tree, postfix, PriorityTable};
        let table = PriorityTable::default();
        for source in ["1 + 2 * 3 - 4 / 8", "((7 - 2) * (3 + 1)) / 5", "9"] {
            let direct = evaluate_postfix(&postfix(source, &table).unwrap()).unwrap();
            let via_tree = compile_tree(source, &table).unwrap().evaluate().unwrap();
            assert_eq!(direct, via_tree, "mismatch for {}", source);
        }
    }
}
