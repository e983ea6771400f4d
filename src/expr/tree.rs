use std::mem;

use crate::core::errors::{CalcError, Result};
use crate::expr::token::{BinaryOp, Bracket, Token};
use crate::tasks::model::TaskId;

/// Binary expression tree. Children are owned; the tree is built once and
/// only annotated with task ids afterwards.
///
/// A left-associative chain such as `1+1+...+1` is as deep as it is long,
/// so every walk over the tree (including drop) uses an explicit stack.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Literal(f64),
    Operation {
        op: BinaryOp,
        left: Box<Node>,
        right: Box<Node>,
        task_id: Option<TaskId>,
    },
}

impl Node {
    pub fn operation(op: BinaryOp, left: Node, right: Node) -> Self {
        Node::Operation {
            op,
            left: Box::new(left),
            right: Box::new(right),
            task_id: None,
        }
    }

    pub fn is_literal(&self) -> bool {
        matches!(self, Node::Literal(_))
    }

    /// Number of operation nodes, i.e. tasks this tree compiles to
    pub fn operation_count(&self) -> usize {
        let mut count = 0;
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            if let Node::Operation { left, right, .. } = node {
                count += 1;
                stack.push(left);
                stack.push(right);
            }
        }
        count
    }

    /// Operation nodes children-first: every node comes after both of its
    /// operands.
    pub fn post_order(&self) -> Vec<&Node> {
        let mut order = Vec::new();
        let mut stack = vec![(self, false)];
        while let Some((node, expanded)) = stack.pop() {
            match node {
                Node::Literal(_) => {}
                Node::Operation { .. } if expanded => order.push(node),
                Node::Operation { left, right, .. } => {
                    stack.push((node, true));
                    stack.push((&**right, false));
                    stack.push((&**left, false));
                }
            }
        }
        order
    }

    /// Visit every operation node mutably, in no particular order
    pub fn for_each_operation_mut(&mut self, mut f: impl FnMut(&mut Option<TaskId>)) {
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            if let Node::Operation {
                left,
                right,
                task_id,
                ..
            } = node
            {
                f(task_id);
                stack.push(left);
                stack.push(right);
            }
        }
    }

    pub fn task_id(&self) -> Option<TaskId> {
        match self {
            Node::Literal(_) => None,
            Node::Operation { task_id, .. } => *task_id,
        }
    }
}

impl Drop for Node {
    fn drop(&mut self) {
        let mut detached = Vec::new();
        detach_children(self, &mut detached);
        while let Some(mut node) = detached.pop() {
            detach_children(&mut node, &mut detached);
        }
    }
}

/// Move both children out, leaving literal leaves behind
fn detach_children(node: &mut Node, out: &mut Vec<Node>) {
    if let Node::Operation { left, right, .. } = node {
        out.push(mem::replace(&mut **left, Node::Literal(0.0)));
        out.push(mem::replace(&mut **right, Node::Literal(0.0)));
    }
}

/// Build a tree from a postfix token sequence
pub fn build_tree(postfix: &[Token]) -> Result<Node> {
    let mut stack: Vec<Node> = Vec::new();

    for token in postfix {
        match *token {
            Token::Operand(value) => stack.push(Node::Literal(value)),
            Token::Operator { op, .. } => {
                let (right, left) = match (stack.pop(), stack.pop()) {
                    (Some(right), Some(left)) => (right, left),
                    _ => {
                        return Err(CalcError::malformed(format!(
                            "not enough operands for '{}'",
                            op
                        )))
                    }
                };
                stack.push(Node::operation(op, left, right));
            }
            Token::Bracket(Bracket::Open | Bracket::Close) => {
                return Err(CalcError::malformed("bracket in postfix sequence"));
            }
        }
    }

    let root = stack
        .pop()
        .ok_or_else(|| CalcError::malformed("empty expression"))?;
    if !stack.is_empty() {
        return Err(CalcError::malformed(format!(
            "{} operands left without an operator",
            stack.len() + 1
        )));
    }
    Ok(root)
}
