use rust_decimal::Decimal;

/// A lexical token.
///
/// Keywords are matched case-insensitively and take priority over plain
/// identifiers. Lexical failures never panic; they surface as
/// [`Token::Error`] and the parser turns them into a parse error.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    // Literals
    /// Numeric literal: digits with an optional fractional part
    ///
    /// # Examples
    /// ```text
    /// 42
    /// 3.14
    /// ```
    Number(Decimal),

    /// Single-quoted string literal, `''` being an escaped quote
    ///
    /// # Examples
    /// ```text
    /// 'hello'
    /// 'it''s'
    /// ```
    String(String),

    /// `TRUE` / `FALSE`
    Boolean(bool),

    // Identifiers
    /// Bare identifier, matched case-insensitively at evaluation time
    ///
    /// # Examples
    /// ```text
    /// s3object
    /// first_name
    /// _id
    /// ```
    Identifier(String),

    /// Double-quoted identifier, matched case-sensitively
    ///
    /// # Examples
    /// ```text
    /// "Name"
    /// "with ""quotes"""
    /// ```
    QuotedIdentifier(String),

    // Keywords
    Select,
    As,
    From,
    Where,
    Order,
    By,
    Limit,
    Offset,
    Asc,
    Desc,
    Is,
    Missing,
    Null,
    Avg,
    Count,
    Max,
    Min,
    Sum,
    Not,
    And,
    Or,
    Between,
    In,
    Like,
    Escape,

    // Operators
    /// `<`
    Lt,
    /// `>`
    Gt,
    /// `<=`
    LtEq,
    /// `>=`
    GtEq,
    /// `=` or `==`
    Eq,
    /// `<>` or `!=`
    NotEq,
    /// `||`
    Concat,
    /// `.`
    Dot,
    /// `,`
    Comma,
    /// `(`
    LParen,
    /// `)`
    RParen,
    /// `*`
    Star,
    /// `-`
    Minus,
    /// `+`
    Plus,
    /// `/`
    Slash,
    /// `%`
    Percent,

    /// Unrecognised input, carrying a human-readable message
    ///
    /// # Examples
    /// ```text
    /// 'unterminated
    /// a & b
    /// #
    /// ```
    Error(String),

    /// End of input
    Eof,
}

impl Token {
    /// Resolves a word to its keyword or boolean token, if it is one.
    pub fn keyword(word: &str) -> Option<Token> {
        let token = match word.to_ascii_uppercase().as_str() {
            "SELECT" => Token::Select,
            "AS" => Token::As,
            "FROM" => Token::From,
            "WHERE" => Token::Where,
            "ORDER" => Token::Order,
            "BY" => Token::By,
            "LIMIT" => Token::Limit,
            "OFFSET" => Token::Offset,
            "ASC" => Token::Asc,
            "DESC" => Token::Desc,
            "IS" => Token::Is,
            "MISSING" => Token::Missing,
            "NULL" => Token::Null,
            "AVG" => Token::Avg,
            "COUNT" => Token::Count,
            "MAX" => Token::Max,
            "MIN" => Token::Min,
            "SUM" => Token::Sum,
            "NOT" => Token::Not,
            "AND" => Token::And,
            "OR" => Token::Or,
            "BETWEEN" => Token::Between,
            "IN" => Token::In,
            "LIKE" => Token::Like,
            "ESCAPE" => Token::Escape,
            "TRUE" => Token::Boolean(true),
            "FALSE" => Token::Boolean(false),
            _ => return None,
        };
        Some(token)
    }

    /// Whether this token opens one of the top-level query clauses.
    pub fn is_clause_keyword(&self) -> bool {
        matches!(
            self,
            Token::Select | Token::From | Token::Where | Token::Order | Token::Limit
        )
    }
}
