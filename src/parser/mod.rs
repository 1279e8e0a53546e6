// Copyright 2025 Google LLC
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Recursive-descent parser for MoDeL instructions.
//!
//! One logical instruction (comments stripped, includes already spliced
//! by the reader) tokenizes to a flat `Vec<Token>` and parses to one
//! [`crate::ast::Instruction`]. A line is a `local` assignment when its
//! right-hand side, after the top-level `=`, is a bare run of words with
//! no operators; everything else is a `formula`.

use crate::ast::*;
use crate::error::{ParserError, SourceLocation};
use crate::lexer::{Lexer, Token, TokenType};

pub fn parse_instruction(text: &str, file: &str, line: usize) -> Result<Instruction, ParserError> {
    let mut lexer = Lexer::new(text, file.to_string());
    let tokens = lexer.tokenize()?;

    if let Some(assignment) = try_parse_assignment(&tokens, file, line) {
        return Ok(Instruction::Assignment(assignment));
    }

    let mut parser = Parser { tokens, position: 0, file: file.to_string(), line };
    let formula = parser.parse_formula(Terminator::Eof)?;
    Ok(Instruction::Formula(formula))
}

/// A `local` assignment's right-hand side is a bare token run: no
/// operators, brackets, pipes, or keywords. Anything else is a formula.
fn try_parse_assignment(tokens: &[Token], file: &str, line: usize) -> Option<Assignment> {
    let eq_pos = tokens.iter().position(|t| matches!(t.token_type, TokenType::Equals))?;

    let mut names = Vec::new();
    let mut idx = 0;
    loop {
        match tokens.get(idx)?.token_type {
            TokenType::Ident(ref n) => names.push(n.clone()),
            _ => return None,
        }
        idx += 1;
        match tokens.get(idx)?.token_type {
            TokenType::Comma => {
                idx += 1;
                continue;
            }
            TokenType::Equals => break,
            _ => return None,
        }
    }
    if idx != eq_pos || names.is_empty() {
        return None;
    }

    let mut values = Vec::new();
    let mut j = eq_pos + 1;
    loop {
        match &tokens[j].token_type {
            TokenType::Eof => break,
            TokenType::Ident(s) => values.push(s.clone()),
            TokenType::Integer(i) => values.push(i.to_string()),
            TokenType::Real(f) => values.push(f.to_string()),
            _ => return None,
        }
        j += 1;
    }
    if values.is_empty() {
        return None;
    }

    Some(Assignment { names, values, source_location: SourceLocation::new(file.to_string(), line, 1, 0) })
}

#[derive(Clone, Copy, PartialEq)]
enum Terminator {
    Eof,
    RightParen,
}

struct Parser {
    tokens: Vec<Token>,
    position: usize,
    file: String,
    line: usize,
}

impl Parser {
    fn current(&self) -> &Token {
        &self.tokens[self.position.min(self.tokens.len() - 1)]
    }

    fn location(&self) -> SourceLocation {
        let mut loc = self.current().location.clone();
        loc.file = self.file.clone();
        loc.line = self.line;
        loc
    }

    fn advance(&mut self) -> Token {
        let tok = self.current().clone();
        if self.position < self.tokens.len() - 1 {
            self.position += 1;
        }
        tok
    }

    fn check_operator(&self, op: &str) -> bool {
        matches!(&self.current().token_type, TokenType::Operator(o) if o == op)
    }

    fn check_keyword(&self, kw: &str) -> bool {
        matches!(&self.current().token_type, TokenType::Keyword(k) if k == kw)
    }

    fn expect(&mut self, expected: &TokenType, label: &str) -> Result<Token, ParserError> {
        if std::mem::discriminant(&self.current().token_type) == std::mem::discriminant(expected) {
            Ok(self.advance())
        } else {
            Err(ParserError::UnexpectedToken {
                found: format!("{:?}", self.current().token_type),
                expected: label.to_string(),
                location: self.location(),
            })
        }
    }

    fn parse_formula(&mut self, terminator: Terminator) -> Result<Formula, ParserError> {
        let loc = self.location();

        let price_value = if let TokenType::Option(_) = self.current().token_type {
            self.advance();
            true
        } else {
            false
        };

        let lhs = self.parse_expression()?;
        let body = if matches!(self.current().token_type, TokenType::Equals) {
            self.advance();
            let rhs = self.parse_expression()?;
            FormulaBody::Equation(Equation { lhs, rhs, source_location: loc.clone() })
        } else {
            FormulaBody::Expression(lhs)
        };

        let condition = if self.check_keyword("if") {
            self.advance();
            let cloc = self.location();
            let expr = self.parse_expression()?;
            Some(Condition { expression: expr, source_location: cloc })
        } else {
            None
        };

        let mut iterators = Vec::new();
        while matches!(self.current().token_type, TokenType::Comma) {
            self.advance();
            iterators.push(self.parse_iterator()?);
        }

        match terminator {
            Terminator::Eof => {
                self.expect(&TokenType::Eof, "end of instruction")?;
            }
            Terminator::RightParen => {
                self.expect(&TokenType::RightParen, "')'")?;
            }
        }

        Ok(Formula { price_value, body, condition, iterators, source_location: loc })
    }

    fn parse_iterator(&mut self) -> Result<Iterator_, ParserError> {
        let loc = self.location();
        let names = self.parse_name_group()?;
        if !self.check_keyword("in") {
            return Err(ParserError::UnexpectedToken {
                found: format!("{:?}", self.current().token_type),
                expected: "'in'".to_string(),
                location: self.location(),
            });
        }
        self.advance();
        let lists = self.parse_list_group(names.len())?;
        if names.len() != lists.len() {
            return Err(ParserError::IteratorShapeMismatch { location: loc });
        }
        Ok(Iterator_ { names, lists, source_location: loc })
    }

    fn parse_name_group(&mut self) -> Result<Vec<String>, ParserError> {
        if matches!(self.current().token_type, TokenType::LeftParen) {
            self.advance();
            let mut names = vec![self.parse_ident_name()?];
            while matches!(self.current().token_type, TokenType::Comma) {
                self.advance();
                names.push(self.parse_ident_name()?);
            }
            self.expect(&TokenType::RightParen, "')'")?;
            Ok(names)
        } else {
            Ok(vec![self.parse_ident_name()?])
        }
    }

    fn parse_ident_name(&mut self) -> Result<String, ParserError> {
        match &self.current().token_type {
            TokenType::Ident(name) => {
                let name = name.clone();
                self.advance();
                Ok(name)
            }
            other => Err(ParserError::UnexpectedToken {
                found: format!("{other:?}"),
                expected: "identifier".to_string(),
                location: self.location(),
            }),
        }
    }

    fn parse_list_group(&mut self, expected_count: usize) -> Result<Vec<List>, ParserError> {
        if expected_count > 1 {
            self.expect(&TokenType::LeftParen, "'('")?;
            let mut lists = vec![self.parse_list()?];
            while matches!(self.current().token_type, TokenType::Comma) {
                self.advance();
                lists.push(self.parse_list()?);
            }
            self.expect(&TokenType::RightParen, "')'")?;
            Ok(lists)
        } else {
            Ok(vec![self.parse_list()?])
        }
    }

    fn parse_list(&mut self) -> Result<List, ParserError> {
        let loc = self.location();
        let base = self.parse_list_base()?;
        let excluded = if matches!(self.current().token_type, TokenType::Backslash) {
            self.advance();
            Some(self.parse_list_base()?)
        } else {
            None
        };
        Ok(List { base, excluded, source_location: loc })
    }

    fn parse_list_base(&mut self) -> Result<ListBase, ParserError> {
        let loc = self.location();
        let mut items = Vec::new();
        loop {
            match &self.current().token_type {
                TokenType::Ident(_) | TokenType::Integer(_) | TokenType::Real(_) => {
                    items.push(self.current().lexeme.clone());
                    self.advance();
                }
                _ => break,
            }
        }
        if items.is_empty() {
            return Err(ParserError::UnexpectedToken {
                found: format!("{:?}", self.current().token_type),
                expected: "list item".to_string(),
                location: self.location(),
            });
        }
        Ok(ListBase { items, source_location: loc })
    }

    fn parse_expression(&mut self) -> Result<Expression, ParserError> {
        let loc = self.location();
        let mut terms = Vec::new();

        if let TokenType::Operator(op) = &self.current().token_type {
            if op == "+" || op == "-" {
                terms.push(Term::Operator(op.clone()));
                self.advance();
            }
        }

        terms.push(Term::Operand(self.parse_atom()?));

        while let TokenType::Operator(op) = &self.current().token_type {
            let op = op.clone();
            terms.push(Term::Operator(op));
            self.advance();
            terms.push(Term::Operand(self.parse_atom()?));
        }

        Ok(Expression { terms, source_location: loc })
    }

    fn parse_atom(&mut self) -> Result<Operand, ParserError> {
        let loc = self.location();
        match self.current().token_type.clone() {
            TokenType::LeftParen => {
                self.advance();
                let expr = self.parse_expression()?;
                self.expect(&TokenType::RightParen, "')'")?;
                Ok(Operand::Parenthesized(Box::new(expr)))
            }
            TokenType::Integer(i) => {
                self.advance();
                Ok(Operand::Integer(i))
            }
            TokenType::Real(f) => {
                self.advance();
                Ok(Operand::Real(f))
            }
            TokenType::Ident(name) if name.starts_with('$') => {
                self.advance();
                Ok(Operand::LoopCounter(name.trim_start_matches('$').to_string()))
            }
            TokenType::Ident(name) if self.peek_is_left_paren() => self.parse_function(name, loc),
            TokenType::Ident(_) | TokenType::Pipe => self.parse_identifier_or_array(loc),
            other => Err(ParserError::UnexpectedToken {
                found: format!("{other:?}"),
                expected: "expression".to_string(),
                location: loc,
            }),
        }
    }

    fn peek_is_left_paren(&self) -> bool {
        matches!(self.tokens.get(self.position + 1).map(|t| &t.token_type), Some(TokenType::LeftParen))
    }

    fn parse_function(&mut self, name: String, loc: SourceLocation) -> Result<Operand, ParserError> {
        self.advance(); // name
        self.advance(); // '('

        if name == "sum" {
            let inner = self.parse_formula(Terminator::RightParen)?;
            return Ok(Operand::Function(Function {
                name,
                arguments: FunctionArguments::Formula(Box::new(inner)),
                source_location: loc,
            }));
        }

        let mut args = vec![self.parse_expression()?];
        while matches!(self.current().token_type, TokenType::Comma) {
            self.advance();
            args.push(self.parse_expression()?);
        }
        self.expect(&TokenType::RightParen, "')'")?;
        Ok(Operand::Function(Function { name, arguments: FunctionArguments::Expressions(args), source_location: loc }))
    }

    fn parse_identifier_or_array(&mut self, loc: SourceLocation) -> Result<Operand, ParserError> {
        let identifier = self.parse_identifier(loc.clone())?;
        if matches!(self.current().token_type, TokenType::LeftBracket) {
            let index = self.parse_index()?;
            let time_offset = self.parse_time_offset()?;
            Ok(Operand::Array(Array { identifier, index, time_offset, source_location: loc }))
        } else {
            Ok(Operand::Identifier(identifier))
        }
    }

    fn parse_identifier(&mut self, loc: SourceLocation) -> Result<Identifier, ParserError> {
        let mut fragments = Vec::new();
        loop {
            match self.current().token_type.clone() {
                TokenType::Ident(name) => {
                    fragments.push(IdentifierFragment::Name(name));
                    self.advance();
                }
                TokenType::Pipe => {
                    self.advance();
                    let name = match &self.current().token_type {
                        TokenType::Ident(n) => n.clone(),
                        other => {
                            return Err(ParserError::UnexpectedToken {
                                found: format!("{other:?}"),
                                expected: "placeholder name".to_string(),
                                location: self.location(),
                            })
                        }
                    };
                    self.advance();
                    self.expect(&TokenType::Pipe, "'|'")?;
                    fragments.push(IdentifierFragment::Placeholder(name));
                }
                _ => break,
            }
        }
        if fragments.is_empty() {
            return Err(ParserError::UnexpectedToken {
                found: format!("{:?}", self.current().token_type),
                expected: "identifier".to_string(),
                location: loc,
            });
        }
        Ok(Identifier { fragments, source_location: loc })
    }

    fn parse_index(&mut self) -> Result<Index, ParserError> {
        let loc = self.location();
        self.expect(&TokenType::LeftBracket, "'['")?;
        let mut components = vec![self.parse_expression()?];
        while matches!(self.current().token_type, TokenType::Comma) {
            self.advance();
            components.push(self.parse_expression()?);
        }
        self.expect(&TokenType::RightBracket, "']'")?;
        Ok(Index { components, source_location: loc })
    }

    fn parse_time_offset(&mut self) -> Result<Option<TimeOffset>, ParserError> {
        if !matches!(self.current().token_type, TokenType::LeftParen) {
            return Ok(None);
        }
        self.advance();
        let offset = match self.current().token_type.clone() {
            TokenType::Integer(i) => {
                self.advance();
                TimeOffset::Integer(i)
            }
            TokenType::Ident(name) => {
                self.advance();
                TimeOffset::Variable(name)
            }
            other => {
                return Err(ParserError::UnexpectedToken {
                    found: format!("{other:?}"),
                    expected: "time offset".to_string(),
                    location: self.location(),
                })
            }
        };
        self.expect(&TokenType::RightParen, "')'")?;
        Ok(Some(offset))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_equation_with_iterator() {
        let instr = parse_instruction("|V|[com] = |V|D[com], V in Q CH, com in 01 02", "t.mdl", 1).unwrap();
        match instr {
            Instruction::Formula(f) => {
                assert!(!f.price_value);
                assert!(f.condition.is_none());
                assert_eq!(f.iterators.len(), 2);
                assert!(matches!(f.body, FormulaBody::Equation(_)));
            }
            _ => panic!("expected formula"),
        }
    }

    #[test]
    fn test_parse_price_value_option() {
        let instr = parse_instruction("!pv Q[com] = QD[com], com in 01 02", "t.mdl", 1).unwrap();
        match instr {
            Instruction::Formula(f) => assert!(f.price_value),
            _ => panic!("expected formula"),
        }
    }

    #[test]
    fn test_parse_condition() {
        let instr = parse_instruction("Q[com] = QD[com] if CHD[com] > 0, com in 01 02", "t.mdl", 1).unwrap();
        match instr {
            Instruction::Formula(f) => assert!(f.condition.is_some()),
            _ => panic!("expected formula"),
        }
    }

    #[test]
    fn test_parse_list_exclusion() {
        let instr = parse_instruction("Q[com] = QD[com], com in 01 02 03 \\ 02", "t.mdl", 1).unwrap();
        match instr {
            Instruction::Formula(f) => {
                let it = &f.iterators[0];
                assert_eq!(it.lists[0].base.items, vec!["01", "02", "03"]);
                assert_eq!(it.lists[0].excluded.as_ref().unwrap().items, vec!["02"]);
            }
            _ => panic!("expected formula"),
        }
    }

    #[test]
    fn test_parse_composite_iterator() {
        let instr = parse_instruction("X[com,sec] = Y[com,sec], (com,sec) in (01 02, A B)", "t.mdl", 1).unwrap();
        match instr {
            Instruction::Formula(f) => {
                assert_eq!(f.iterators[0].names, vec!["com", "sec"]);
                assert_eq!(f.iterators[0].lists.len(), 2);
            }
            _ => panic!("expected formula"),
        }
    }

    #[test]
    fn test_parse_sum_function() {
        let instr = parse_instruction("TOTAL = sum(CHD[sec], sec in A B)", "t.mdl", 1).unwrap();
        match instr {
            Instruction::Formula(f) => match f.body {
                FormulaBody::Equation(eq) => {
                    assert!(matches!(&eq.rhs.terms[0], Term::Operand(Operand::Function(func)) if func.name == "sum"));
                }
                _ => panic!("expected equation"),
            },
            _ => panic!("expected formula"),
        }
    }

    #[test]
    fn test_parse_loop_counter() {
        let instr = parse_instruction("X[com] = $com * 2, com in A B", "t.mdl", 1).unwrap();
        match instr {
            Instruction::Formula(f) => match f.body {
                FormulaBody::Equation(eq) => {
                    assert!(matches!(&eq.rhs.terms[0], Term::Operand(Operand::LoopCounter(name)) if name == "com"));
                }
                _ => panic!("expected equation"),
            },
            _ => panic!("expected formula"),
        }
    }

    #[test]
    fn test_parse_local_assignment() {
        let instr = parse_instruction("base = Q CH M", "t.mdl", 1).unwrap();
        match instr {
            Instruction::Assignment(a) => {
                assert_eq!(a.names, vec!["base"]);
                assert_eq!(a.values, vec!["Q", "CH", "M"]);
            }
            _ => panic!("expected assignment"),
        }
    }

    #[test]
    fn test_parse_time_offset() {
        let instr = parse_instruction("X[com](-1) = Y[com], com in A", "t.mdl", 1).unwrap();
        match instr {
            Instruction::Formula(f) => match f.body {
                FormulaBody::Equation(eq) => {
                    assert!(matches!(&eq.lhs.terms[0], Term::Operand(Operand::Array(a)) if matches!(a.time_offset, Some(TimeOffset::Integer(-1)))));
                }
                _ => panic!("expected equation"),
            },
            _ => panic!("expected formula"),
        }
    }
}
