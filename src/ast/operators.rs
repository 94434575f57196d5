/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinOp {
    // Logical
    /// Logical AND (`AND`, `&&`)
    And,
    /// Logical OR (`OR`)
    Or,

    // Comparison
    /// Less than (`<`)
    Lesser,
    /// Greater than (`>`)
    Greater,
    /// Less than or equal (`<=`)
    LesserOrEqual,
    /// Greater than or equal (`>=`)
    GreaterOrEqual,
    /// Equal (`=`, `==`)
    Equal,
    /// Not equal (`<>`, `!=`)
    NotEqual,

    // Arithmetic
    /// Addition, or concatenation of textual forms for non-numeric operands (`+`)
    Add,
    /// Subtraction (`-`)
    Subtract,
    /// Multiplication (`*`)
    Multiply,
    /// Division (`/`)
    Divide,
    /// Modulo (`%`)
    Modulo,

    /// String concatenation (`||`)
    Concat,
}

impl BinOp {
    /// Canonical source symbol.
    pub fn symbol(self) -> &'static str {
        match self {
            BinOp::And => "AND",
            BinOp::Or => "OR",
            BinOp::Lesser => "<",
            BinOp::Greater => ">",
            BinOp::LesserOrEqual => "<=",
            BinOp::GreaterOrEqual => ">=",
            BinOp::Equal => "=",
            BinOp::NotEqual => "<>",
            BinOp::Add => "+",
            BinOp::Subtract => "-",
            BinOp::Multiply => "*",
            BinOp::Divide => "/",
            BinOp::Modulo => "%",
            BinOp::Concat => "||",
        }
    }
}

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    /// Logical negation (`NOT`)
    Not,
    /// Arithmetic negation (`-`)
    Negate,
}

/// Sort direction of one ORDER BY key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}
