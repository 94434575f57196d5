use std::fmt;

use rust_decimal::prelude::ToPrimitive;

use crate::{
    ast::{
        Aggregate, BinOp, Column, Direction, Expr, FromClause, Function, Identifier,
        LimitClause, OrderClause, OrderKey, Query, SelectClause, Token, UnaryOp, WhereClause,
    },
    lexer::{Lexeme, Lexer},
};

/// Lexical or syntax error, with the byte offset where it was detected.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    pub message: String,
    pub position: usize,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (at position {})", self.message, self.position)
    }
}

impl std::error::Error for ParseError {}

pub type ParseResult<T> = Result<T, ParseError>;

/// Recursive-descent parser.
///
/// Each precedence layer delegates to the next tighter one. Speculative
/// matches run on a copy of the parser and are discarded on failure, so a
/// failed lookahead never moves the real position.
#[derive(Debug, Clone)]
pub struct Parser<'a> {
    lexer: Lexer<'a>,
    current: Lexeme<'a>,
}

impl<'a> Parser<'a> {
    pub fn new(mut lexer: Lexer<'a>) -> Self {
        let current = lexer.next_token();
        Parser { lexer, current }
    }

    fn advance(&mut self) {
        self.current = self.lexer.next_token();
    }

    fn check(&self, token: &Token) -> bool {
        std::mem::discriminant(&self.current.token) == std::mem::discriminant(token)
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.check(token) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: Token, description: &str) -> ParseResult<()> {
        if self.eat(&expected) {
            Ok(())
        } else {
            Err(self.unexpected(description))
        }
    }

    fn unexpected(&self, expected: &str) -> ParseError {
        let message = match &self.current.token {
            Token::Error(message) => message.clone(),
            Token::Eof => format!("Expected {}, found end of input", expected),
            _ => format!("Expected {}, found '{}'", expected, self.current.text),
        };
        ParseError {
            message,
            position: self.current.position,
        }
    }

    /// Runs `parse` speculatively, rewinding to the current position when
    /// it fails.
    fn attempt<T>(&mut self, parse: impl FnOnce(&mut Self) -> ParseResult<T>) -> Option<T> {
        let snapshot = self.clone();
        match parse(self) {
            Ok(value) => Some(value),
            Err(_) => {
                *self = snapshot;
                None
            }
        }
    }

    fn identifier(&mut self, description: &str) -> ParseResult<Identifier> {
        let identifier = match &self.current.token {
            Token::Identifier(name) => Identifier::new(name.clone()),
            Token::QuotedIdentifier(name) => Identifier::quoted(name.clone()),
            _ => return Err(self.unexpected(description)),
        };
        self.advance();
        Ok(identifier)
    }

    // ========================================
    // Expressions
    // ========================================

    pub fn parse_expression(&mut self) -> ParseResult<Expr> {
        self.parse_or()
    }

    fn parse_or(&mut self) -> ParseResult<Expr> {
        let mut left = self.parse_and()?;

        while self.eat(&Token::Or) {
            let right = self.parse_and()?;
            left = Expr::binary(BinOp::Or, left, right);
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> ParseResult<Expr> {
        let mut left = self.parse_not()?;

        while self.eat(&Token::And) {
            let right = self.parse_not()?;
            left = Expr::binary(BinOp::And, left, right);
        }
        Ok(left)
    }

    fn parse_not(&mut self) -> ParseResult<Expr> {
        if self.eat(&Token::Not) {
            let operand = self.parse_not()?;
            return Ok(Expr::unary(UnaryOp::Not, operand));
        }
        self.parse_equality()
    }

    fn parse_equality(&mut self) -> ParseResult<Expr> {
        let mut left = self.parse_comparison()?;

        loop {
            let op = match &self.current.token {
                Token::Eq => BinOp::Equal,
                Token::NotEq => BinOp::NotEqual,
                _ => break,
            };

            self.advance();
            let right = self.parse_comparison()?;
            left = Expr::binary(op, left, right);
        }
        Ok(left)
    }

    /// At most one relational operator; `a < b < c` is rejected by the
    /// caller as trailing input.
    fn parse_comparison(&mut self) -> ParseResult<Expr> {
        let left = self.parse_concat()?;

        let op = match &self.current.token {
            Token::Lt => BinOp::Lesser,
            Token::Gt => BinOp::Greater,
            Token::LtEq => BinOp::LesserOrEqual,
            Token::GtEq => BinOp::GreaterOrEqual,
            _ => return Ok(left),
        };

        self.advance();
        let right = self.parse_concat()?;
        Ok(Expr::binary(op, left, right))
    }

    fn parse_concat(&mut self) -> ParseResult<Expr> {
        let left = self.parse_pattern()?;

        if self.eat(&Token::Concat) {
            let right = self.parse_concat()?; // right-associative
            return Ok(Expr::binary(BinOp::Concat, left, right));
        }
        Ok(left)
    }

    fn parse_pattern(&mut self) -> ParseResult<Expr> {
        let expr = self.parse_containment()?;

        if !self.eat(&Token::Like) {
            return Ok(expr);
        }

        let pattern = self.parse_expression()?;
        let escape = if self.eat(&Token::Escape) {
            Some(Box::new(self.parse_expression()?))
        } else {
            None
        };

        Ok(Expr::Like {
            expr: Box::new(expr),
            pattern: Box::new(pattern),
            escape,
        })
    }

    fn parse_containment(&mut self) -> ParseResult<Expr> {
        let expr = self.parse_presence()?;

        let negate = if self.check(&Token::Not) && self.lexer.peek_token().token == Token::Between
        {
            self.advance();
            true
        } else if self.check(&Token::Between) {
            false
        } else {
            return Ok(expr);
        };
        self.advance(); // BETWEEN

        let lower = self.parse_presence()?;
        self.expect(Token::And, "AND in BETWEEN expression")?;
        let upper = self.parse_expression()?;

        Ok(Expr::Between {
            negate,
            expr: Box::new(expr),
            lower: Box::new(lower),
            upper: Box::new(upper),
        })
    }

    fn parse_presence(&mut self) -> ParseResult<Expr> {
        let expr = self.parse_is_null()?;

        let negate = self.attempt(|p| {
            p.expect(Token::Is, "IS")?;
            let negate = p.eat(&Token::Not);
            p.expect(Token::Missing, "MISSING")?;
            Ok(negate)
        });

        Ok(match negate {
            Some(negate) => Expr::Presence {
                expr: Box::new(expr),
                negate,
            },
            None => expr,
        })
    }

    fn parse_is_null(&mut self) -> ParseResult<Expr> {
        let expr = self.parse_membership()?;

        let negate = self.attempt(|p| {
            p.expect(Token::Is, "IS")?;
            let negate = p.eat(&Token::Not);
            p.expect(Token::Null, "NULL")?;
            Ok(negate)
        });

        Ok(match negate {
            Some(negate) => Expr::IsNull {
                expr: Box::new(expr),
                negate,
            },
            None => expr,
        })
    }

    fn parse_membership(&mut self) -> ParseResult<Expr> {
        let expr = self.parse_additive()?;

        if !self.eat(&Token::In) {
            return Ok(expr);
        }

        self.expect(Token::LParen, "'(' after IN")?;
        let mut matches = vec![self.parse_expression()?];
        while self.eat(&Token::Comma) {
            matches.push(self.parse_expression()?);
        }
        self.expect(Token::RParen, "')' closing IN list")?;

        Ok(Expr::in_list(expr, matches))
    }

    fn parse_additive(&mut self) -> ParseResult<Expr> {
        let mut left = self.parse_multiplicative()?;

        loop {
            let op = match &self.current.token {
                Token::Plus => BinOp::Add,
                Token::Minus => BinOp::Subtract,
                _ => break,
            };

            self.advance();
            let right = self.parse_multiplicative()?;
            left = Expr::binary(op, left, right);
        }
        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> ParseResult<Expr> {
        let mut left = self.parse_negation()?;

        loop {
            let op = match &self.current.token {
                Token::Star => BinOp::Multiply,
                Token::Slash => BinOp::Divide,
                Token::Percent => BinOp::Modulo,
                _ => break,
            };

            self.advance();
            let right = self.parse_negation()?;
            left = Expr::binary(op, left, right);
        }
        Ok(left)
    }

    fn parse_negation(&mut self) -> ParseResult<Expr> {
        if self.eat(&Token::Minus) {
            let operand = self.parse_negation()?;
            return Ok(Expr::unary(UnaryOp::Negate, operand));
        }
        self.parse_term()
    }

    /// Literals, parenthesised expressions, function calls and paths.
    fn parse_term(&mut self) -> ParseResult<Expr> {
        let literal = match &self.current.token {
            Token::Number(n) => Some(Expr::Number(*n)),
            Token::String(s) => Some(Expr::String(s.clone())),
            Token::Boolean(b) => Some(Expr::Boolean(*b)),
            _ => None,
        };
        if let Some(literal) = literal {
            self.advance();
            return Ok(literal);
        }

        match &self.current.token {
            Token::LParen => {
                self.advance();
                let expr = self.parse_expression()?;
                self.expect(Token::RParen, "')'")?;
                Ok(expr)
            }
            Token::Avg | Token::Count | Token::Max | Token::Min | Token::Sum => {
                self.parse_aggregate_call()
            }
            Token::Identifier(name) if self.lexer.peek_token().token == Token::LParen => {
                let name = name.clone();
                self.advance();
                self.parse_scalar_call(name)
            }
            Token::Identifier(_) | Token::QuotedIdentifier(_) => self.parse_qualified_identifier(),
            _ => Err(self.unexpected("expression")),
        }
    }

    fn parse_qualified_identifier(&mut self) -> ParseResult<Expr> {
        let mut names = vec![self.identifier("identifier")?];
        let mut star = false;

        while self.eat(&Token::Dot) {
            if self.eat(&Token::Star) {
                star = true;
                break;
            }
            names.push(self.identifier("identifier or '*' after '.'")?);
        }

        Ok(Expr::path(names, star))
    }

    fn parse_scalar_call(&mut self, name: String) -> ParseResult<Expr> {
        self.expect(Token::LParen, "'('")?;

        let mut args = vec![];
        if !self.check(&Token::RParen) {
            args.push(self.parse_expression()?);
            while self.eat(&Token::Comma) {
                args.push(self.parse_expression()?);
            }
        }
        self.expect(Token::RParen, "')' closing argument list")?;

        Ok(Expr::Function(Function::Scalar { name, args }))
    }

    fn parse_aggregate_call(&mut self) -> ParseResult<Expr> {
        let kind = self.current.token.clone();
        self.advance();
        self.expect(Token::LParen, "'(' after aggregate function")?;

        if kind == Token::Count && self.eat(&Token::Star) {
            self.expect(Token::RParen, "')'")?;
            return Ok(Expr::Function(Function::Aggregate(Aggregate::Count(None))));
        }

        let arg = Box::new(self.parse_expression()?);
        self.expect(Token::RParen, "')' closing aggregate argument")?;

        let aggregate = match kind {
            Token::Avg => Aggregate::Average(arg),
            Token::Count => Aggregate::Count(Some(arg)),
            Token::Max => Aggregate::Max(arg),
            Token::Min => Aggregate::Min(arg),
            _ => Aggregate::Sum(arg),
        };
        Ok(Expr::Function(Function::Aggregate(aggregate)))
    }

    /// Parses a standalone expression that must span the whole input.
    pub fn parse(&mut self) -> ParseResult<Expr> {
        let expr = self.parse_expression()?;
        self.expect(Token::Eof, "end of input")?;
        Ok(expr)
    }
}

impl<'a> Parser<'a> {
    // ========================================
    // Clauses
    // ========================================

    pub fn parse_select_clause(&mut self) -> ParseResult<SelectClause> {
        self.expect(Token::Select, "SELECT")?;

        if self.eat(&Token::Star) {
            return Ok(SelectClause::Star);
        }

        let mut columns = vec![self.parse_column()?];
        while self.eat(&Token::Comma) {
            columns.push(self.parse_column()?);
        }
        Ok(SelectClause::List(columns))
    }

    fn parse_column(&mut self) -> ParseResult<Column> {
        let expr = self.parse_expression()?;
        let alias = if self.eat(&Token::As) {
            Some(self.identifier("column alias after AS")?)
        } else {
            None
        };
        Ok(Column { expr, alias })
    }

    pub fn parse_from_clause(&mut self) -> ParseResult<FromClause> {
        self.expect(Token::From, "FROM")?;
        let table = self.identifier("table name")?;

        let alias = if self.eat(&Token::As) {
            Some(self.identifier("table alias after AS")?)
        } else if matches!(
            self.current.token,
            Token::Identifier(_) | Token::QuotedIdentifier(_)
        ) {
            Some(self.identifier("table alias")?)
        } else {
            None
        };

        Ok(FromClause { table, alias })
    }

    pub fn parse_where_clause(&mut self) -> ParseResult<WhereClause> {
        self.expect(Token::Where, "WHERE")?;
        let condition = self.parse_expression()?;
        Ok(WhereClause { condition })
    }

    pub fn parse_order_by_clause(&mut self) -> ParseResult<OrderClause> {
        self.expect(Token::Order, "ORDER")?;
        self.expect(Token::By, "BY after ORDER")?;

        let mut keys = vec![self.parse_order_key()?];
        while self.eat(&Token::Comma) {
            keys.push(self.parse_order_key()?);
        }
        Ok(OrderClause { keys })
    }

    fn parse_order_key(&mut self) -> ParseResult<OrderKey> {
        let expr = self.parse_expression()?;
        let direction = if self.eat(&Token::Desc) {
            Direction::Desc
        } else {
            self.eat(&Token::Asc);
            Direction::Asc
        };
        Ok(OrderKey { expr, direction })
    }

    pub fn parse_limit_clause(&mut self) -> ParseResult<LimitClause> {
        self.expect(Token::Limit, "LIMIT")?;
        let limit = self.parse_count("row count after LIMIT")?;
        let offset = if self.eat(&Token::Offset) {
            Some(self.parse_count("row count after OFFSET")?)
        } else {
            None
        };
        Ok(LimitClause { limit, offset })
    }

    /// A row count written as plain digits; `1.0` and `1e2` are rejected.
    fn parse_count(&mut self, description: &str) -> ParseResult<u64> {
        let count = match &self.current.token {
            Token::Number(n) if self.current.text.bytes().all(|b| b.is_ascii_digit()) => {
                n.to_u64()
            }
            _ => None,
        };
        match count {
            Some(count) => {
                self.advance();
                Ok(count)
            }
            None => Err(self.unexpected(description)),
        }
    }

    /// Parses a complete query; nothing may follow the last clause.
    pub fn parse_query(&mut self) -> ParseResult<Query> {
        let select = self.parse_select_clause()?;
        let from = self.parse_from_clause()?;

        let where_clause = if self.check(&Token::Where) {
            Some(self.parse_where_clause()?)
        } else {
            None
        };
        let order_by = if self.check(&Token::Order) {
            Some(self.parse_order_by_clause()?)
        } else {
            None
        };
        let limit = if self.check(&Token::Limit) {
            Some(self.parse_limit_clause()?)
        } else {
            None
        };

        if !self.check(&Token::Eof) {
            if self.current.token.is_clause_keyword() {
                return Err(ParseError {
                    message: format!(
                        "Unexpected {} clause; clauses must appear in the order SELECT, FROM, WHERE, ORDER BY, LIMIT",
                        self.current.text.to_ascii_uppercase()
                    ),
                    position: self.current.position,
                });
            }
            return Err(self.unexpected("end of query"));
        }

        Ok(Query {
            select,
            from,
            where_clause,
            order_by,
            limit,
        })
    }
}

/// Parses query text.
pub fn parse(input: &str) -> ParseResult<Query> {
    Parser::new(Lexer::new(input)).parse_query()
}

/// Parses a standalone expression.
pub fn parse_expression(input: &str) -> ParseResult<Expr> {
    Parser::new(Lexer::new(input)).parse()
}
