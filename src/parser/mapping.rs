//! Hand-written parser for the mapping DDL (`CREATE MAPPING`, `DROP MAPPING`,
//! `SHOW MAPPINGS`), which sqlparser has no grammar for. It works on
//! sqlparser's token stream so quoting and literals behave the same as in
//! every other statement.

use sqlparser::tokenizer::{Token, Word};
use crate::core::{DataType, DbError, Result};
use crate::storage::{ColumnSpec, MappingDefinition};
use super::ast::{CreateMappingStmt, DropMappingStmt, Statement};

/// Whether the token stream starts a mapping statement.
pub fn is_mapping_statement(tokens: &[Token]) -> bool {
    let words: Vec<String> = significant(tokens)
        .take(4)
        .map(|t| match t {
            Token::Word(w) if w.quote_style.is_none() => w.value.to_ascii_uppercase(),
            _ => String::new(),
        })
        .collect();
    let word = |i: usize| words.get(i).map(String::as_str).unwrap_or("");

    match word(0) {
        "CREATE" => word(1) == "MAPPING" || (word(1) == "OR" && word(2) == "REPLACE" && word(3) == "MAPPING"),
        "DROP" => word(1) == "MAPPING",
        "SHOW" => word(1) == "MAPPINGS",
        _ => false,
    }
}

pub fn parse_mapping_statement(tokens: Vec<Token>) -> Result<Statement> {
    let mut stream = TokenStream::new(tokens);
    let stmt = if stream.consume_keyword("CREATE") {
        Statement::CreateMapping(stream.parse_create()?)
    } else if stream.consume_keyword("DROP") {
        Statement::DropMapping(stream.parse_drop()?)
    } else {
        stream.expect_keyword("SHOW")?;
        stream.expect_keyword("MAPPINGS")?;
        Statement::ShowMappings
    };
    stream.expect_end()?;
    Ok(stmt)
}

fn significant(tokens: &[Token]) -> impl Iterator<Item = &Token> {
    tokens.iter().filter(|t| !matches!(t, Token::Whitespace(_)))
}

struct TokenStream {
    tokens: Vec<Token>,
    pos: usize,
}

impl TokenStream {
    fn new(tokens: Vec<Token>) -> Self {
        let tokens = tokens
            .into_iter()
            .filter(|t| !matches!(t, Token::Whitespace(_) | Token::EOF))
            .collect();
        Self { tokens, pos: 0 }
    }

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

    fn peek_keyword(&self, keyword: &str) -> bool {
        matches!(self.peek(), Some(Token::Word(w)) if w.quote_style.is_none() && w.value.eq_ignore_ascii_case(keyword))
    }

    fn consume_keyword(&mut self, keyword: &str) -> bool {
        if self.peek_keyword(keyword) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect_keyword(&mut self, keyword: &str) -> Result<()> {
        if self.consume_keyword(keyword) {
            Ok(())
        } else {
            Err(self.unexpected(keyword))
        }
    }

    fn consume_token(&mut self, expected: &Token) -> bool {
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect_token(&mut self, expected: &Token) -> Result<()> {
        if self.consume_token(expected) {
            Ok(())
        } else {
            Err(self.unexpected(&expected.to_string()))
        }
    }

    fn expect_end(&mut self) -> Result<()> {
        while self.consume_token(&Token::SemiColon) {}
        match self.peek() {
            None => Ok(()),
            Some(_) => Err(self.unexpected("end of statement")),
        }
    }

    fn unexpected(&self, expected: &str) -> DbError {
        let found = self
            .peek()
            .map(|t| format!("'{}'", t))
            .unwrap_or_else(|| "end of statement".to_string());
        DbError::ParseError(format!("Expected {}, found {}", expected, found))
    }

    fn parse_identifier(&mut self) -> Result<String> {
        match self.peek() {
            Some(Token::Word(Word { value, .. })) => {
                let value = value.clone();
                self.pos += 1;
                Ok(value)
            }
            _ => Err(self.unexpected("identifier")),
        }
    }

    /// `a` or `a.b`, as used by EXTERNAL NAME. A quoted string is taken as is.
    fn parse_external_name(&mut self) -> Result<String> {
        if let Some(Token::SingleQuotedString(s)) = self.peek() {
            let s = s.clone();
            self.pos += 1;
            return Ok(s);
        }
        let mut parts = vec![self.parse_identifier()?];
        while self.consume_token(&Token::Period) {
            parts.push(self.parse_identifier()?);
        }
        Ok(parts.join("."))
    }

    fn parse_string(&mut self) -> Result<String> {
        match self.next() {
            Some(Token::SingleQuotedString(s)) => Ok(s),
            Some(other) => Err(DbError::ParseError(format!(
                "Expected a quoted string, found '{}'",
                other
            ))),
            None => Err(DbError::ParseError(
                "Expected a quoted string, found end of statement".into(),
            )),
        }
    }

    fn parse_create(&mut self) -> Result<CreateMappingStmt> {
        let or_replace = if self.consume_keyword("OR") {
            self.expect_keyword("REPLACE")?;
            true
        } else {
            false
        };
        self.expect_keyword("MAPPING")?;

        let if_not_exists = if self.consume_keyword("IF") {
            self.expect_keyword("NOT")?;
            self.expect_keyword("EXISTS")?;
            true
        } else {
            false
        };
        if or_replace && if_not_exists {
            return Err(DbError::ParseError(
                "OR REPLACE and IF NOT EXISTS cannot be used together".into(),
            ));
        }

        let name = self.parse_identifier()?;
        let external_name = if self.consume_keyword("EXTERNAL") {
            self.expect_keyword("NAME")?;
            Some(self.parse_external_name()?)
        } else {
            None
        };

        let columns = if self.consume_token(&Token::LParen) {
            self.parse_columns()?
        } else {
            Vec::new()
        };

        self.expect_keyword("TYPE")?;
        let type_name = self.parse_identifier()?;

        let options = if self.consume_keyword("OPTIONS") {
            self.parse_options()?
        } else {
            Vec::new()
        };

        Ok(CreateMappingStmt {
            definition: MappingDefinition {
                name,
                external_name,
                columns,
                type_name,
                options,
            },
            or_replace,
            if_not_exists,
        })
    }

    fn parse_columns(&mut self) -> Result<Vec<ColumnSpec>> {
        let mut columns = Vec::new();
        loop {
            let name = self.parse_identifier()?;
            let type_name = self.parse_identifier()?;
            let data_type = DataType::from_sql_name(&type_name).ok_or_else(|| {
                DbError::ParseError(format!(
                    "Unsupported type '{}' for column '{}'",
                    type_name, name
                ))
            })?;
            // VARCHAR(255) и подобные: длина игнорируется
            if self.consume_token(&Token::LParen) {
                while !self.consume_token(&Token::RParen) {
                    if self.next().is_none() {
                        return Err(self.unexpected(")"));
                    }
                }
            }
            let external_name = if self.consume_keyword("EXTERNAL") {
                self.expect_keyword("NAME")?;
                Some(self.parse_external_name()?)
            } else {
                None
            };
            columns.push(ColumnSpec {
                name,
                data_type,
                external_name,
            });

            if self.consume_token(&Token::Comma) {
                continue;
            }
            self.expect_token(&Token::RParen)?;
            return Ok(columns);
        }
    }

    fn parse_options(&mut self) -> Result<Vec<(String, String)>> {
        self.expect_token(&Token::LParen)?;
        let mut options = Vec::new();
        if self.consume_token(&Token::RParen) {
            return Ok(options);
        }
        loop {
            let key = self.parse_string()?;
            self.expect_token(&Token::Eq)?;
            let value = self.parse_string()?;
            options.push((key, value));

            if self.consume_token(&Token::Comma) {
                continue;
            }
            self.expect_token(&Token::RParen)?;
            return Ok(options);
        }
    }

    fn parse_drop(&mut self) -> Result<DropMappingStmt> {
        self.expect_keyword("MAPPING")?;
        let if_exists = if self.consume_keyword("IF") {
            self.expect_keyword("EXISTS")?;
            true
        } else {
            false
        };
        let name = self.parse_identifier()?;
        Ok(DropMappingStmt { name, if_exists })
    }
}
