//! Expression front end: text to tokens, postfix and trees.

pub mod eval;
pub mod lexer;
pub mod parser;
pub mod token;
pub mod tree;

pub use eval::evaluate_postfix;
pub use lexer::{tokenize, Lexer};
pub use parser::to_postfix;
pub use token::{BinaryOp, Bracket, PriorityTable, Token};
pub use tree::{build_tree, Node};

use crate::core::errors::Result;

/// Lex and reorder `source` into postfix
pub fn postfix(source: &str, priorities: &PriorityTable) -> Result<Vec<Token>> {
    let tokens = tokenize(source, priorities)?;
    to_postfix(&tokens)
}

/// Run the whole front end, producing an expression tree
pub fn compile_tree(source: &str, priorities: &PriorityTable) -> Result<Node> {
    build_tree(&postfix(source, priorities)?)
}

/// Evaluate `source` directly, without the task engine
pub fn calculate(source: &str) -> Result<f64> {
    evaluate_postfix(&postfix(source, &PriorityTable::default())?)
}
