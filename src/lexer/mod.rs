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

//! Lexical analysis for MoDeL instructions
//!
//! Tokenizes the text of a single logical instruction (comments already
//! stripped and continuation lines already joined by the reader).

use crate::error::{LexerError, SourceLocation};
use serde::{Deserialize, Serialize};

/// Token types for MoDeL source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TokenType {
    LeftParen,
    RightParen,
    LeftBracket,
    RightBracket,
    Comma,
    Pipe,
    Backslash,
    Equals,
    Integer(i64),
    Real(f64),
    Ident(String),
    Operator(String),
    Keyword(String),
    /// `!pv`, `!p`, `!Pv`, `!P` — the price-value options tag.
    Option(String),
    Eof,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Token {
    pub token_type: TokenType,
    pub location: SourceLocation,
    pub lexeme: String,
}

impl Token {
    pub fn new(token_type: TokenType, location: SourceLocation, lexeme: String) -> Self {
        Self { token_type, location, lexeme }
    }
}

fn is_ident_start(ch: char) -> bool {
    ch.is_ascii_alphabetic() || ch == '_' || ch == '%' || ch == '$' || ch == '@'
}

fn is_ident_continue(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '_'
}

/// Lexer for MoDeL source code
pub struct Lexer {
    input: Vec<char>,
    position: usize,
    current_char: Option<char>,
    line: usize,
    column: usize,
    file_name: String,
}

impl Lexer {
    pub fn new(input: &str, file_name: String) -> Self {
        let chars: Vec<char> = input.chars().collect();
        let current_char = chars.first().copied();
        Self { input: chars, position: 0, current_char, line: 1, column: 1, file_name }
    }

    fn current_location(&self) -> SourceLocation {
        SourceLocation::new(self.file_name.clone(), self.line, self.column, self.position)
    }

    fn advance(&mut self) {
        if self.current_char == Some('\n') {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        self.position += 1;
        self.current_char = self.input.get(self.position).copied();
    }

    fn peek(&self) -> Option<char> {
        self.input.get(self.position + 1).copied()
    }

    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.current_char {
            if ch.is_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }

    /// Read a number (integer or real). Leading `-` is only consumed here
    /// when the lexer dispatch already confirmed a digit follows it.
    fn read_number(&mut self) -> Result<Token, LexerError> {
        let start_location = self.current_location();
        let mut text = String::new();
        let mut is_real = false;

        if self.current_char == Some('-') {
            text.push('-');
            self.advance();
        }

        while let Some(ch) = self.current_char {
            if ch.is_ascii_digit() {
                text.push(ch);
                self.advance();
            } else if ch == '.' && !is_real && self.peek().is_some_and(|c| c.is_ascii_digit()) {
                is_real = true;
                text.push(ch);
                self.advance();
            } else {
                break;
            }
        }

        if is_real {
            text.parse::<f64>()
                .map(|v| Token::new(TokenType::Real(v), start_location.clone(), text.clone()))
                .map_err(|_| LexerError::InvalidNumber { value: text, location: start_location })
        } else {
            text.parse::<i64>()
                .map(|v| Token::new(TokenType::Integer(v), start_location.clone(), text.clone()))
                .map_err(|_| LexerError::InvalidNumber { value: text, location: start_location })
        }
    }

    /// Read an identifier, keyword, or word-operator (`and`/`or`/`xor`).
    fn read_identifier(&mut self) -> Token {
        let start_location = self.current_location();
        let mut text = String::new();

        text.push(self.current_char.unwrap());
        self.advance();

        while let Some(ch) = self.current_char {
            if is_ident_continue(ch) {
                text.push(ch);
                self.advance();
            } else {
                break;
            }
        }

        let token_type = match text.as_str() {
            "if" | "in" => TokenType::Keyword(text.clone()),
            "and" | "or" | "xor" => TokenType::Operator(text.clone()),
            _ => TokenType::Ident(text.clone()),
        };

        Token::new(token_type, start_location, text)
    }

    /// Read the options tag following a `!`, e.g. `!pv`.
    fn read_option(&mut self) -> Result<Token, LexerError> {
        let start_location = self.current_location();
        self.advance(); // consume '!'
        let mut text = String::new();

        while let Some(ch) = self.current_char {
            if ch.is_ascii_alphabetic() {
                text.push(ch);
                self.advance();
            } else {
                break;
            }
        }

        match text.as_str() {
            "pv" | "p" | "Pv" | "P" => {
                Ok(Token::new(TokenType::Option(text.clone()), start_location, format!("!{text}")))
            }
            _ => Err(LexerError::UnexpectedCharacter { character: '!', location: start_location }),
        }
    }

    pub fn next_token(&mut self) -> Result<Token, LexerError> {
        loop {
            match self.current_char {
                None => return Ok(Token::new(TokenType::Eof, self.current_location(), String::new())),
                Some(ch) if ch.is_whitespace() => {
                    self.skip_whitespace();
                    continue;
                }
                Some('(') => {
                    let location = self.current_location();
                    self.advance();
                    return Ok(Token::new(TokenType::LeftParen, location, "(".to_string()));
                }
                Some(')') => {
                    let location = self.current_location();
                    self.advance();
                    return Ok(Token::new(TokenType::RightParen, location, ")".to_string()));
                }
                Some('[') => {
                    let location = self.current_location();
                    self.advance();
                    return Ok(Token::new(TokenType::LeftBracket, location, "[".to_string()));
                }
                Some(']') => {
                    let location = self.current_location();
                    self.advance();
                    return Ok(Token::new(TokenType::RightBracket, location, "]".to_string()));
                }
                Some(',') => {
                    let location = self.current_location();
                    self.advance();
                    return Ok(Token::new(TokenType::Comma, location, ",".to_string()));
                }
                Some('|') => {
                    let location = self.current_location();
                    self.advance();
                    return Ok(Token::new(TokenType::Pipe, location, "|".to_string()));
                }
                Some('\\') => {
                    let location = self.current_location();
                    self.advance();
                    return Ok(Token::new(TokenType::Backslash, location, "\\".to_string()));
                }
                Some('!') => return self.read_option(),
                Some('=') => {
                    let location = self.current_location();
                    if self.peek() == Some('=') {
                        self.advance();
                        self.advance();
                        return Ok(Token::new(TokenType::Operator("==".to_string()), location, "==".to_string()));
                    }
                    self.advance();
                    return Ok(Token::new(TokenType::Equals, location, "=".to_string()));
                }
                Some('<') => {
                    let location = self.current_location();
                    self.advance();
                    match self.current_char {
                        Some('>') => {
                            self.advance();
                            return Ok(Token::new(TokenType::Operator("<>".to_string()), location, "<>".to_string()));
                        }
                        Some('=') => {
                            self.advance();
                            return Ok(Token::new(TokenType::Operator("<=".to_string()), location, "<=".to_string()));
                        }
                        _ => return Ok(Token::new(TokenType::Operator("<".to_string()), location, "<".to_string())),
                    }
                }
                Some('>') => {
                    let location = self.current_location();
                    self.advance();
                    if self.current_char == Some('=') {
                        self.advance();
                        return Ok(Token::new(TokenType::Operator(">=".to_string()), location, ">=".to_string()));
                    }
                    return Ok(Token::new(TokenType::Operator(">".to_string()), location, ">".to_string()));
                }
                Some(op @ ('+' | '-' | '*' | '/' | '^')) => {
                    let location = self.current_location();
                    // A leading '-' immediately followed by a digit is the
                    // start of a negative number literal, not an operator.
                    if op == '-' && self.peek().is_some_and(|c| c.is_ascii_digit()) {
                        return self.read_number();
                    }
                    self.advance();
                    return Ok(Token::new(TokenType::Operator(op.to_string()), location, op.to_string()));
                }
                Some(ch) if ch.is_ascii_digit() => return self.read_number(),
                Some(ch) if is_ident_start(ch) => return Ok(self.read_identifier()),
                Some(ch) => {
                    let location = self.current_location();
                    return Err(LexerError::UnexpectedCharacter { character: ch, location });
                }
            }
        }
    }

    pub fn tokenize(&mut self) -> Result<Vec<Token>, LexerError> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token()?;
            let is_eof = matches!(token.token_type, TokenType::Eof);
            tokens.push(token);
            if is_eof {
                break;
            }
        }
        Ok(tokens)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_tokens() {
        let mut lexer = Lexer::new("( ) [ ] , | \\ =", "test.mdl".to_string());
        let tokens = lexer.tokenize().unwrap();
        let kinds: Vec<&TokenType> = tokens.iter().map(|t| &t.token_type).collect();
        assert!(matches!(kinds[0], TokenType::LeftParen));
        assert!(matches!(kinds[1], TokenType::RightParen));
        assert!(matches!(kinds[2], TokenType::LeftBracket));
        assert!(matches!(kinds[3], TokenType::RightBracket));
        assert!(matches!(kinds[4], TokenType::Comma));
        assert!(matches!(kinds[5], TokenType::Pipe));
        assert!(matches!(kinds[6], TokenType::Backslash));
        assert!(matches!(kinds[7], TokenType::Equals));
    }

    #[test]
    fn test_numbers() {
        let mut lexer = Lexer::new("42 -17 3.14 -2.5", "test.mdl".to_string());
        let tokens = lexer.tokenize().unwrap();
        assert!(matches!(tokens[0].token_type, TokenType::Integer(42)));
        assert!(matches!(tokens[1].token_type, TokenType::Integer(-17)));
        assert!(matches!(tokens[2].token_type, TokenType::Real(f) if (f - 3.14).abs() < f64::EPSILON));
        assert!(matches!(tokens[3].token_type, TokenType::Real(f) if (f - (-2.5)).abs() < f64::EPSILON));
    }

    #[test]
    fn test_comparison_and_boolean_operators() {
        let mut lexer = Lexer::new("<> <= >= == < > and or xor", "test.mdl".to_string());
        let tokens = lexer.tokenize().unwrap();
        let ops: Vec<String> = tokens[..9]
            .iter()
            .map(|t| match &t.token_type {
                TokenType::Operator(s) => s.clone(),
                other => panic!("expected operator, got {other:?}"),
            })
            .collect();
        assert_eq!(ops, vec!["<>", "<=", ">=", "==", "<", ">", "and", "or", "xor"]);
    }

    #[test]
    fn test_keywords_and_identifiers() {
        let mut lexer = Lexer::new("if in %V $com @x _foo", "test.mdl".to_string());
        let tokens = lexer.tokenize().unwrap();
        assert!(matches!(tokens[0].token_type, TokenType::Keyword(ref k) if k == "if"));
        assert!(matches!(tokens[1].token_type, TokenType::Keyword(ref k) if k == "in"));
        assert!(matches!(tokens[2].token_type, TokenType::Ident(ref i) if i == "%V"));
        assert!(matches!(tokens[3].token_type, TokenType::Ident(ref i) if i == "$com"));
        assert!(matches!(tokens[4].token_type, TokenType::Ident(ref i) if i == "@x"));
        assert!(matches!(tokens[5].token_type, TokenType::Ident(ref i) if i == "_foo"));
    }

    #[test]
    fn test_price_value_options() {
        for (src, expected) in [("!pv", "pv"), ("!p", "p"), ("!Pv", "Pv"), ("!P", "P")] {
            let mut lexer = Lexer::new(src, "test.mdl".to_string());
            let tokens = lexer.tokenize().unwrap();
            assert!(matches!(tokens[0].token_type, TokenType::Option(ref o) if o == expected));
        }
    }

    #[test]
    fn test_list_tokens_preserve_lexeme_through_tokenize() {
        let mut lexer = Lexer::new("01 02 03 \\ 02", "test.mdl".to_string());
        let tokens = lexer.tokenize().unwrap();
        assert_eq!(tokens[0].lexeme, "01");
        assert!(matches!(tokens[3].token_type, TokenType::Backslash));
        assert_eq!(tokens[4].lexeme, "02");
    }

    #[test]
    fn test_unexpected_character() {
        let mut lexer = Lexer::new("#", "test.mdl".to_string());
        assert!(matches!(lexer.tokenize(), Err(LexerError::UnexpectedCharacter { .. })));
    }

    #[test]
    fn test_unknown_option_is_error() {
        let mut lexer = Lexer::new("!xyz", "test.mdl".to_string());
        assert!(lexer.tokenize().is_err());
    }
}
