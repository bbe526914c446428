//! Policy text parser
//!
//! ```text
//! policy    := or_expr EOF
//! or_expr   := and_expr ( "or" and_expr )*
//! and_expr  := primary ( "and" primary )*
//! primary   := attribute | "(" or_expr ")" | INT "of" "(" or_expr ( "," or_expr )+ ")"
//! ```
//!
//! Connectives are case-insensitive. Chains of one connective are flattened,
//! so `a and b and c` becomes a single three-way AND.

use crate::attribute::Attribute;
use crate::tree::{AccessTree, MAX_DEPTH};
use nac_core::{NacError, Result};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    LParen,
    RParen,
    Comma,
    And,
    Or,
    Of,
    Not,
    Word(String),
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::LParen => f.write_str("'('"),
            Token::RParen => f.write_str("')'"),
            Token::Comma => f.write_str("','"),
            Token::And => f.write_str("`and`"),
            Token::Or => f.write_str("`or`"),
            Token::Of => f.write_str("`of`"),
            Token::Not => f.write_str("`not`"),
            Token::Word(word) => write!(f, "`{word}`"),
        }
    }
}

fn tokenize(text: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut word = String::new();

    let flush = |word: &mut String, tokens: &mut Vec<Token>| {
        if word.is_empty() {
            return;
        }
        let token = match word.to_ascii_lowercase().as_str() {
            "and" => Token::And,
            "or" => Token::Or,
            "of" => Token::Of,
            "not" => Token::Not,
            _ => Token::Word(word.clone()),
        };
        tokens.push(token);
        word.clear();
    };

    for c in text.chars() {
        match c {
            '(' | ')' | ',' => {
                flush(&mut word, &mut tokens);
                tokens.push(match c {
                    '(' => Token::LParen,
                    ')' => Token::RParen,
                    _ => Token::Comma,
                });
            }
            c if c.is_whitespace() => flush(&mut word, &mut tokens),
            c => word.push(c),
        }
    }
    flush(&mut word, &mut tokens);
    tokens
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn or_expr(&mut self) -> Result<AccessTree> {
        let mut operands = vec![self.and_expr()?];
        while self.peek() == Some(&Token::Or) {
            self.pos += 1;
            operands.push(self.and_expr()?);
        }
        if operands.len() == 1 {
            return Ok(operands.remove(0));
        }
        let flattened = operands
            .into_iter()
            .flat_map(|operand| match operand {
                AccessTree::Or(children) => children,
                other => vec![other],
            })
            .collect();
        AccessTree::or(flattened)
    }

    fn and_expr(&mut self) -> Result<AccessTree> {
        let mut operands = vec![self.primary()?];
        while self.peek() == Some(&Token::And) {
            self.pos += 1;
            operands.push(self.primary()?);
        }
        if operands.len() == 1 {
            return Ok(operands.remove(0));
        }
        let flattened = operands
            .into_iter()
            .flat_map(|operand| match operand {
                AccessTree::And(children) => children,
                other => vec![other],
            })
            .collect();
        AccessTree::and(flattened)
    }

    fn primary(&mut self) -> Result<AccessTree> {
        match self.next() {
            Some(Token::Word(word)) => {
                if self.peek() == Some(&Token::Of) {
                    let threshold = word.parse::<usize>().map_err(|_| {
                        NacError::policy_syntax(format!(
                            "threshold `{word}` before `of` is not a number"
                        ))
                    })?;
                    self.pos += 1;
                    return self.threshold_gate(threshold);
                }
                Ok(AccessTree::leaf(Attribute::new(word)?))
            }
            Some(Token::LParen) => {
                let inner = self.nested(Parser::or_expr)?;
                self.expect_close()?;
                Ok(inner)
            }
            Some(Token::Not) => Err(NacError::policy_syntax(
                "unsupported connective `not`; policies are monotone",
            )),
            Some(other) => Err(NacError::policy_syntax(format!(
                "expected attribute, found {other}"
            ))),
            None => Err(NacError::policy_syntax(
                "unexpected end of policy, expected attribute",
            )),
        }
    }

    fn threshold_gate(&mut self, threshold: usize) -> Result<AccessTree> {
        if self.next() != Some(Token::LParen) {
            return Err(NacError::policy_syntax(format!(
                "expected '(' after `{threshold} of`"
            )));
        }
        let mut children = vec![self.nested(Parser::or_expr)?];
        while self.peek() == Some(&Token::Comma) {
            self.pos += 1;
            children.push(self.nested(Parser::or_expr)?);
        }
        self.expect_close()?;
        AccessTree::threshold(threshold, children)
    }

    fn nested(&mut self, rule: fn(&mut Parser) -> Result<AccessTree>) -> Result<AccessTree> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(NacError::policy_syntax(format!(
                "policy nesting exceeds {MAX_DEPTH} levels"
            )));
        }
        let tree = rule(self)?;
        self.depth -= 1;
        Ok(tree)
    }

    fn expect_close(&mut self) -> Result<()> {
        match self.next() {
            Some(Token::RParen) => Ok(()),
            Some(other) => Err(NacError::policy_syntax(format!(
                "unbalanced parenthesis: expected ')', found {other}"
            ))),
            None => Err(NacError::policy_syntax(
                "unbalanced parenthesis: missing ')'",
            )),
        }
    }
}

/// Parse policy text such as `attr1 and attr2 or attr3` into an access tree.
///
/// Fails with [`NacError::PolicySyntax`] on empty input, empty operands,
/// unbalanced parentheses, dangling or unknown connectives, and out-of-range
/// thresholds.
pub fn parse(text: &str) -> Result<AccessTree> {
    let tokens = tokenize(text);
    if tokens.is_empty() {
        return Err(NacError::policy_syntax("empty policy"));
    }

    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
    };
    let tree = parser.or_expr()?;

    match parser.peek() {
        None => {}
        Some(Token::RParen) => {
            return Err(NacError::policy_syntax(
                "unbalanced parenthesis: unexpected ')'",
            ))
        }
        Some(Token::Word(word)) => {
            return Err(NacError::policy_syntax(format!(
                "unknown connective `{word}`"
            )))
        }
        Some(other) => {
            return Err(NacError::policy_syntax(format!(
                "unexpected {other} after complete expression"
            )))
        }
    }

    tree.validate()?;
    Ok(tree)
}
