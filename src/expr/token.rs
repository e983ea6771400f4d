use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Binary arithmetic operators understood by the compiler and the workers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinaryOp {
    #[serde(rename = "+")]
    Add,
    #[serde(rename = "-")]
    Sub,
    #[serde(rename = "*")]
    Mul,
    #[serde(rename = "/")]
    Div,
}

impl BinaryOp {
    pub const ALL: [BinaryOp; 4] = [BinaryOp::Add, BinaryOp::Sub, BinaryOp::Mul, BinaryOp::Div];

    pub fn from_symbol(symbol: char) -> Option<Self> {
        match symbol {
            '+' => Some(BinaryOp::Add),
            '-' => Some(BinaryOp::Sub),
            '*' => Some(BinaryOp::Mul),
            '/' => Some(BinaryOp::Div),
            _ => None,
        }
    }

    pub fn symbol(self) -> char {
        match self {
            BinaryOp::Add => '+',
            BinaryOp::Sub => '-',
            BinaryOp::Mul => '*',
            BinaryOp::Div => '/',
        }
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bracket {
    Open,
    Close,
}

/// Tokens produced by the lexer
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Token {
    Operand(f64),
    Operator { op: BinaryOp, priority: u8 },
    Bracket(Bracket),
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Operand(value) => write!(f, "{}", value),
            Token::Operator { op, .. } => write!(f, "{}", op),
            Token::Bracket(Bracket::Open) => write!(f, "("),
            Token::Bracket(Bracket::Close) => write!(f, ")"),
        }
    }
}

/// Operator priorities. Only operators present in the table are recognised
/// by the lexer; higher numbers bind tighter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriorityTable {
    priorities: HashMap<BinaryOp, u8>,
}

impl Default for PriorityTable {
    fn default() -> Self {
        let priorities = HashMap::from([
            (BinaryOp::Add, 1),
            (BinaryOp::Sub, 1),
            (BinaryOp::Mul, 2),
            (BinaryOp::Div, 2),
        ]);
        Self { priorities }
    }
}

impl PriorityTable {
    /// A table with no operators at all
    pub fn empty() -> Self {
        Self {
            priorities: HashMap::new(),
        }
    }

    pub fn with_operator(mut self, op: BinaryOp, priority: u8) -> Self {
        self.priorities.insert(op, priority);
        self
    }

    pub fn without_operator(mut self, op: BinaryOp) -> Self {
        self.priorities.remove(&op);
        self
    }

    pub fn priority(&self, op: BinaryOp) -> Option<u8> {
        self.priorities.get(&op).copied()
    }

    /// Build the operator token for `symbol`, if it is a known operator
    pub fn operator_token(&self, symbol: char) -> Option<Token> {
        let op = BinaryOp::from_symbol(symbol)?;
        let priority = self.priority(op)?;
        Some(Token::Operator { op, priority })
    }
}
