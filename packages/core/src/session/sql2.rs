//! JCR-SQL2 statement parser
//!
//! Parses the subset of JCR-SQL2 the query object model can express:
//!
//! ```text
//! SELECT * | col [AS name], ...
//! FROM [node:type] [AS] selector
//! [WHERE constraint]
//! [ORDER BY operand [ASC|DESC], ...]
//! ```
//!
//! Constraints support comparisons (`=`, `<>`, `<`, `<=`, `>`, `>=`, `LIKE`),
//! `IS [NOT] NULL`, `ISSAMENODE`, `ISCHILDNODE`, `ISDESCENDANTNODE`,
//! `CONTAINS`, `AND`/`OR`/`NOT` and parentheses. Dynamic operands are property
//! references (`s.[prop]`, `s.prop`, `[prop]`), `NAME()`, `LOCALNAME()`,
//! `LOWER()` and `UPPER()`. Static operands are string and number literals,
//! `TRUE`/`FALSE`/`NULL` and `$bind` variables.
//!
//! # Examples
//!
//! ```rust
//! use docmapper_core::session::sql2;
//!
//! let query = sql2::parse(
//!     "SELECT * FROM [nt:unstructured] AS a WHERE a.[title] = $title ORDER BY a.[title]",
//! ).unwrap();
//! assert_eq!(query.source.name, "a");
//! ```

use super::error::{SessionError, SessionResult};
use super::qom::{
    Column, Constraint, DynamicOperand, Operator, Order, Ordering, QueryObjectModel, Selector,
    StaticOperand,
};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Word(String),
    Bracketed(String),
    Str(String),
    Number(Value),
    Var(String),
    Symbol(&'static str),
}

/// Parse a JCR-SQL2 statement
pub fn parse(statement: &str) -> SessionResult<QueryObjectModel> {
    let tokens = tokenize(statement)?;
    Parser {
        tokens,
        pos: 0,
        selector: String::new(),
    }
    .parse_query()
}

fn tokenize(input: &str) -> SessionResult<Vec<Token>> {
    let chars: Vec<char> = input.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if c.is_whitespace() {
            i += 1;
            continue;
        }

        match c {
            '[' => {
                let start = i + 1;
                let end = chars[start..]
                    .iter()
                    .position(|&ch| ch == ']')
                    .map(|offset| start + offset)
                    .ok_or_else(|| SessionError::invalid_query("Unterminated '[' in statement"))?;
                tokens.push(Token::Bracketed(chars[start..end].iter().collect()));
                i = end + 1;
            }
            '\'' | '"' => {
                let quote = c;
                let mut value = String::new();
                i += 1;
                loop {
                    match chars.get(i) {
                        None => return Err(SessionError::invalid_query("Unterminated string literal")),
                        Some(&ch) if ch == quote => {
                            if chars.get(i + 1) == Some(&quote) {
                                value.push(quote);
                                i += 2;
                            } else {
                                i += 1;
                                break;
                            }
                        }
                        Some(&ch) => {
                            value.push(ch);
                            i += 1;
                        }
                    }
                }
                tokens.push(Token::Str(value));
            }
            '$' => {
                let start = i + 1;
                let mut end = start;
                while end < chars.len() && (chars[end].is_alphanumeric() || chars[end] == '_') {
                    end += 1;
                }
                if end == start {
                    return Err(SessionError::invalid_query("Empty bind variable name"));
                }
                tokens.push(Token::Var(chars[start..end].iter().collect()));
                i = end;
            }
            '<' if chars.get(i + 1) == Some(&'>') => {
                tokens.push(Token::Symbol("<>"));
                i += 2;
            }
            '!' if chars.get(i + 1) == Some(&'=') => {
                tokens.push(Token::Symbol("<>"));
                i += 2;
            }
            '<' if chars.get(i + 1) == Some(&'=') => {
                tokens.push(Token::Symbol("<="));
                i += 2;
            }
            '>' if chars.get(i + 1) == Some(&'=') => {
                tokens.push(Token::Symbol(">="));
                i += 2;
            }
            '<' => {
                tokens.push(Token::Symbol("<"));
                i += 1;
            }
            '>' => {
                tokens.push(Token::Symbol(">"));
                i += 1;
            }
            '=' => {
                tokens.push(Token::Symbol("="));
                i += 1;
            }
            '(' => {
                tokens.push(Token::Symbol("("));
                i += 1;
            }
            ')' => {
                tokens.push(Token::Symbol(")"));
                i += 1;
            }
            ',' => {
                tokens.push(Token::Symbol(","));
                i += 1;
            }
            '.' => {
                tokens.push(Token::Symbol("."));
                i += 1;
            }
            '*' => {
                tokens.push(Token::Symbol("*"));
                i += 1;
            }
            c if c.is_ascii_digit()
                || (c == '-' && chars.get(i + 1).is_some_and(|next| next.is_ascii_digit())) =>
            {
                let start = i;
                i += 1;
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    i += 1;
                }
                let literal: String = chars[start..i].iter().collect();
                let number = if literal.contains('.') {
                    literal
                        .parse::<f64>()
                        .ok()
                        .and_then(serde_json::Number::from_f64)
                        .map(Value::Number)
                } else {
                    literal.parse::<i64>().ok().map(Value::from)
                };
                let number = number.ok_or_else(|| {
                    SessionError::invalid_query(format!("Invalid number literal \"{}\"", literal))
                })?;
                tokens.push(Token::Number(number));
            }
            c if c.is_alphabetic() || c == '_' => {
                let start = i;
                while i < chars.len()
                    && (chars[i].is_alphanumeric() || matches!(chars[i], '_' | ':' | '-'))
                {
                    i += 1;
                }
                tokens.push(Token::Word(chars[start..i].iter().collect()));
            }
            other => {
                return Err(SessionError::invalid_query(format!(
                    "Unexpected character '{}' at position {}",
                    other, i
                )))
            }
        }
    }

    Ok(tokens)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    /// Selector name used for operands that omit one
    selector: String,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn peek_at(&self, offset: usize) -> Option<&Token> {
        self.tokens.get(self.pos + offset)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    fn error(&self, expected: &str) -> SessionError {
        SessionError::invalid_query(format!(
            "Expected {} at token {}, found {:?}",
            expected,
            self.pos,
            self.peek()
        ))
    }

    fn is_keyword(&self, keyword: &str) -> bool {
        matches!(self.peek(), Some(Token::Word(word)) if word.eq_ignore_ascii_case(keyword))
    }

    fn eat_keyword(&mut self, keyword: &str) -> bool {
        if self.is_keyword(keyword) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect_keyword(&mut self, keyword: &str) -> SessionResult<()> {
        if self.eat_keyword(keyword) {
            Ok(())
        } else {
            Err(self.error(keyword))
        }
    }

    fn eat_symbol(&mut self, symbol: &str) -> bool {
        if matches!(self.peek(), Some(Token::Symbol(s)) if *s == symbol) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect_symbol(&mut self, symbol: &str) -> SessionResult<()> {
        if self.eat_symbol(symbol) {
            Ok(())
        } else {
            Err(self.error(&format!("'{}'", symbol)))
        }
    }

    fn parse_name(&mut self) -> SessionResult<String> {
        match self.peek() {
            Some(Token::Word(word)) | Some(Token::Bracketed(word)) => {
                let name = word.clone();
                self.pos += 1;
                Ok(name)
            }
            _ => Err(self.error("a name")),
        }
    }

    fn parse_query(mut self) -> SessionResult<QueryObjectModel> {
        self.expect_keyword("SELECT")?;

        let mut raw_columns = Vec::new();
        if !self.eat_symbol("*") {
            loop {
                if let Some(column) = self.parse_column()? {
                    raw_columns.push(column);
                }
                if !self.eat_symbol(",") {
                    break;
                }
            }
        }

        self.expect_keyword("FROM")?;
        let node_type = self.parse_name()?;
        let name = if self.eat_keyword("AS") {
            self.parse_name()?
        } else {
            match self.peek() {
                Some(Token::Word(word))
                    if !word.eq_ignore_ascii_case("WHERE") && !word.eq_ignore_ascii_case("ORDER") =>
                {
                    self.parse_name()?
                }
                _ => node_type.clone(),
            }
        };
        self.selector = name.clone();

        let mut query = QueryObjectModel::new(Selector::new(node_type, name.clone()));
        for (selector, property, alias) in raw_columns {
            let mut column = Column::new(selector.unwrap_or_else(|| name.clone()), property);
            if let Some(alias) = alias {
                column = column.named(alias);
            }
            query.columns.push(column);
        }

        if self.eat_keyword("WHERE") {
            query.constraint = Some(self.parse_or()?);
        }

        if self.eat_keyword("ORDER") {
            self.expect_keyword("BY")?;
            loop {
                let operand = self.parse_dynamic()?;
                let order = if self.eat_keyword("DESC") {
                    Order::Descending
                } else {
                    self.eat_keyword("ASC");
                    Order::Ascending
                };
                query.orderings.push(Ordering { operand, order });
                if !self.eat_symbol(",") {
                    break;
                }
            }
        }

        if self.peek().is_some() {
            return Err(self.error("end of statement"));
        }

        Ok(query)
    }

    /// `None` for `selector.*`, which selects everything
    #[allow(clippy::type_complexity)]
    fn parse_column(&mut self) -> SessionResult<Option<(Option<String>, String, Option<String>)>> {
        let first = self.parse_name()?;
        let (selector, property) = if self.eat_symbol(".") {
            if self.eat_symbol("*") {
                return Ok(None);
            }
            (Some(first), self.parse_name()?)
        } else {
            (None, first)
        };
        let alias = if self.eat_keyword("AS") {
            Some(self.parse_name()?)
        } else {
            None
        };
        Ok(Some((selector, property, alias)))
    }

    fn parse_or(&mut self) -> SessionResult<Constraint> {
        let mut left = self.parse_and()?;
        while self.eat_keyword("OR") {
            let right = self.parse_and()?;
            left = Constraint::or(left, right);
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> SessionResult<Constraint> {
        let mut left = self.parse_not()?;
        while self.eat_keyword("AND") {
            let right = self.parse_not()?;
            left = Constraint::and(left, right);
        }
        Ok(left)
    }

    fn parse_not(&mut self) -> SessionResult<Constraint> {
        if self.eat_keyword("NOT") {
            return Ok(Constraint::not(self.parse_not()?));
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> SessionResult<Constraint> {
        if self.eat_symbol("(") {
            let constraint = self.parse_or()?;
            self.expect_symbol(")")?;
            return Ok(constraint);
        }

        let function = match self.peek() {
            Some(Token::Word(word)) if matches!(self.peek_at(1), Some(Token::Symbol("("))) => {
                word.to_ascii_uppercase()
            }
            _ => String::new(),
        };

        match function.as_str() {
            "ISSAMENODE" | "ISCHILDNODE" | "ISDESCENDANTNODE" => {
                self.pos += 2;
                let selector = match self.peek() {
                    Some(Token::Str(_)) => self.selector.clone(),
                    _ => {
                        let selector = self.parse_name()?;
                        self.expect_symbol(",")?;
                        selector
                    }
                };
                let path = match self.next() {
                    Some(Token::Str(path)) | Some(Token::Bracketed(path)) => path,
                    _ => return Err(self.error("a path")),
                };
                self.expect_symbol(")")?;
                Ok(match function.as_str() {
                    "ISSAMENODE" => Constraint::SameNode { selector, path },
                    "ISCHILDNODE" => Constraint::ChildNode { selector, path },
                    _ => Constraint::DescendantNode { selector, path },
                })
            }
            "CONTAINS" => {
                self.pos += 2;
                let first = self.parse_name()?;
                let (selector, property) = if self.eat_symbol(".") {
                    if self.eat_symbol("*") {
                        (first, None)
                    } else {
                        (first, Some(self.parse_name()?))
                    }
                } else {
                    (self.selector.clone(), Some(first))
                };
                self.expect_symbol(",")?;
                let expression = match self.next() {
                    Some(Token::Str(expression)) => expression,
                    _ => return Err(self.error("a search expression")),
                };
                self.expect_symbol(")")?;
                Ok(Constraint::FullTextSearch {
                    selector,
                    property,
                    expression,
                })
            }
            _ => self.parse_comparison(),
        }
    }

    fn parse_comparison(&mut self) -> SessionResult<Constraint> {
        let operand = self.parse_dynamic()?;

        if self.eat_keyword("IS") {
            let negated = self.eat_keyword("NOT");
            self.expect_keyword("NULL")?;
            let existence = match operand {
                DynamicOperand::PropertyValue { selector, property } => {
                    Constraint::PropertyExistence { selector, property }
                }
                _ => {
                    return Err(SessionError::invalid_query(
                        "IS [NOT] NULL requires a property operand",
                    ))
                }
            };
            return Ok(if negated {
                existence
            } else {
                Constraint::not(existence)
            });
        }

        let operator = if self.eat_keyword("LIKE") {
            Operator::Like
        } else {
            match self.next() {
                Some(Token::Symbol("=")) => Operator::EqualTo,
                Some(Token::Symbol("<>")) => Operator::NotEqualTo,
                Some(Token::Symbol("<")) => Operator::LessThan,
                Some(Token::Symbol("<=")) => Operator::LessThanOrEqualTo,
                Some(Token::Symbol(">")) => Operator::GreaterThan,
                Some(Token::Symbol(">=")) => Operator::GreaterThanOrEqualTo,
                _ => {
                    self.pos -= 1;
                    return Err(self.error("a comparison operator"));
                }
            }
        };

        let operand2 = self.parse_static()?;
        Ok(Constraint::comparison(operand, operator, operand2))
    }

    fn parse_dynamic(&mut self) -> SessionResult<DynamicOperand> {
        let function = match self.peek() {
            Some(Token::Word(word)) if matches!(self.peek_at(1), Some(Token::Symbol("("))) => {
                word.to_ascii_uppercase()
            }
            _ => String::new(),
        };

        match function.as_str() {
            "NAME" | "LOCALNAME" => {
                self.pos += 2;
                let selector = if matches!(self.peek(), Some(Token::Symbol(")"))) {
                    self.selector.clone()
                } else {
                    self.parse_name()?
                };
                self.expect_symbol(")")?;
                Ok(if function == "NAME" {
                    DynamicOperand::NodeName { selector }
                } else {
                    DynamicOperand::NodeLocalName { selector }
                })
            }
            "LOWER" | "UPPER" => {
                self.pos += 2;
                let inner = Box::new(self.parse_dynamic()?);
                self.expect_symbol(")")?;
                Ok(if function == "LOWER" {
                    DynamicOperand::LowerCase(inner)
                } else {
                    DynamicOperand::UpperCase(inner)
                })
            }
            _ => {
                let first = self.parse_name()?;
                if self.eat_symbol(".") {
                    let property = self.parse_name()?;
                    Ok(DynamicOperand::property(first, property))
                } else {
                    Ok(DynamicOperand::property(self.selector.clone(), first))
                }
            }
        }
    }

    fn parse_static(&mut self) -> SessionResult<StaticOperand> {
        match self.next() {
            Some(Token::Str(value)) => Ok(StaticOperand::Literal(Value::String(value))),
            Some(Token::Number(number)) => Ok(StaticOperand::Literal(number)),
            Some(Token::Var(name)) => Ok(StaticOperand::BindVariable(name)),
            Some(Token::Word(word)) if word.eq_ignore_ascii_case("TRUE") => {
                Ok(StaticOperand::Literal(Value::Bool(true)))
            }
            Some(Token::Word(word)) if word.eq_ignore_ascii_case("FALSE") => {
                Ok(StaticOperand::Literal(Value::Bool(false)))
            }
            Some(Token::Word(word)) if word.eq_ignore_ascii_case("NULL") => {
                Ok(StaticOperand::Literal(Value::Null))
            }
            _ => {
                self.pos -= 1;
                Err(self.error("a literal or bind variable"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_select_all() {
        let query = parse("SELECT * FROM [nt:unstructured]").unwrap();
        assert_eq!(query.source, Selector::new("nt:unstructured", "nt:unstructured"));
        assert!(query.constraint.is_none());
        assert!(query.columns.is_empty());
    }

    #[test]
    fn test_parse_alias_without_as() {
        let query = parse("SELECT * FROM [nt:unstructured] page WHERE page.title IS NOT NULL").unwrap();
        assert_eq!(query.source.name, "page");
        assert_eq!(
            query.constraint,
            Some(Constraint::PropertyExistence {
                selector: "page".into(),
                property: "title".into()
            })
        );
    }

    #[test]
    fn test_parse_columns_with_default_selector() {
        let query = parse("SELECT [jcr:uuid], a.[title] AS t FROM [nt:unstructured] AS a").unwrap();
        assert_eq!(query.columns.len(), 2);
        assert_eq!(query.columns[0], Column::new("a", "jcr:uuid"));
        assert_eq!(query.columns[1], Column::new("a", "title").named("t"));
    }

    #[test]
    fn test_parse_precedence() {
        let query = parse(
            "SELECT * FROM [nt:unstructured] AS a WHERE a.x = 1 OR a.y = 'b' AND NOT a.z LIKE 'c%'",
        )
        .unwrap();

        match query.constraint.unwrap() {
            Constraint::Or(left, right) => {
                assert!(matches!(*left, Constraint::Comparison { .. }));
                match *right {
                    Constraint::And(_, not) => assert!(matches!(*not, Constraint::Not(_))),
                    other => panic!("expected AND, got {:?}", other),
                }
            }
            other => panic!("expected OR, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_functions_and_ordering() {
        let query = parse(
            "SELECT * FROM [nt:unstructured] AS a \
             WHERE ISDESCENDANTNODE(a, '/cmf') AND LOWER(a.[title]) = $title AND NAME(a) <> 'foo' \
             ORDER BY a.[title] DESC, NAME(a)",
        )
        .unwrap();

        assert_eq!(query.orderings.len(), 2);
        assert_eq!(query.orderings[0].order, Order::Descending);
        assert_eq!(
            query.orderings[1].operand,
            DynamicOperand::NodeName { selector: "a".into() }
        );

        let rendered = query.to_string();
        assert!(rendered.contains("ISDESCENDANTNODE(a, '/cmf')"));
        assert!(rendered.contains("LOWER(a.[title]) = $title"));
    }

    #[test]
    fn test_parse_contains_and_literals() {
        let query = parse(
            "SELECT * FROM [nt:unstructured] AS a WHERE CONTAINS(a.*, 'hello') AND a.count >= -2.5 AND a.flag = TRUE",
        )
        .unwrap();
        let rendered = query.to_string();
        assert!(rendered.contains("CONTAINS(a.*, 'hello')"));
        assert!(rendered.contains("a.[count] >= -2.5"));
        assert!(rendered.contains("a.[flag] = TRUE"));
    }

    #[test]
    fn test_rendered_query_parses_back() {
        let original = parse(
            "SELECT a.[title] FROM [sulu:article] AS a WHERE a.[i18n:en-title] = 'It''s' ORDER BY a.[title]",
        )
        .unwrap();
        let reparsed = parse(&original.to_string()).unwrap();
        assert_eq!(original, reparsed);
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(
            parse("SELECT * WHERE a = 1"),
            Err(SessionError::InvalidQuery(_))
        ));
        assert!(parse("SELECT * FROM [nt:base] AS a WHERE a.x =").is_err());
        assert!(parse("SELECT * FROM [nt:base AS a").is_err());
        assert!(parse("SELECT * FROM [nt:base] AS a WHERE a.x = 'open").is_err());
        assert!(parse("SELECT * FROM [nt:base] AS a garbage here").is_err());
    }

    #[test]
    fn test_null_literal() {
        let query = parse("SELECT * FROM [nt:base] AS a WHERE a.x = NULL").unwrap();
        assert_eq!(
            query.constraint,
            Some(Constraint::comparison(
                DynamicOperand::property("a", "x"),
                Operator::EqualTo,
                StaticOperand::Literal(json!(null))
            ))
        );
    }
}
