//! SQL Tokens - the atomic units of SQL output.
//!
//! Tokens are dialect-agnostic representations that serialize
//! to dialect-specific strings.

use super::dialect::{Dialect, SqlDialect};
use super::statement::BindValue;

/// SQL Token - every element the builder can emit.
///
/// Adding a new variant here will cause compile errors everywhere
/// it needs to be handled (exhaustive matching).
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    // === Keywords ===
    Select,
    From,
    Where,
    And,
    Not,
    As,
    On,
    Join,
    Inner,
    GroupBy,
    Having,
    OrderBy,
    Asc,
    Desc,
    Limit,
    Case,
    When,
    Then,
    Else,
    End,
    In,
    Between,
    IsNull,
    IsNotNull,
    Distinct,
    With,
    True,
    False,

    // === Punctuation ===
    Comma,
    Dot,
    Star,
    LParen,
    RParen,

    // === Operators ===
    Eq,
    Gt,
    Plus,
    Minus,
    Mul,
    Div,

    // === Whitespace / Formatting ===
    Space,
    Newline,
    Indent(usize),

    // === Dynamic Content ===
    /// Simple identifier (table, column, alias)
    Ident(String),
    /// Integer literal
    LitInt(i64),
    /// Float literal
    LitFloat(f64),
    /// String literal
    LitString(String),
    /// Boolean literal
    LitBool(bool),
    /// NULL literal
    LitNull,
    /// Bound parameter. Serializes to the dialect placeholder; the value
    /// travels separately in the statement's parameter list.
    Param(BindValue),

    /// Function name, remapped per dialect.
    FunctionName(String),
}

impl Token {
    /// Text of a token that is the same in every dialect.
    fn fixed_text(&self) -> Option<&'static str> {
        let text = match self {
            Token::Select => "SELECT",
            Token::From => "FROM",
            Token::Where => "WHERE",
            Token::And => "AND",
            Token::Not => "NOT",
            Token::As => "AS",
            Token::On => "ON",
            Token::Join => "JOIN",
            Token::Inner => "INNER",
            Token::GroupBy => "GROUP BY",
            Token::Having => "HAVING",
            Token::OrderBy => "ORDER BY",
            Token::Asc => "ASC",
            Token::Desc => "DESC",
            Token::Limit => "LIMIT",
            Token::Case => "CASE",
            Token::When => "WHEN",
            Token::Then => "THEN",
            Token::Else => "ELSE",
            Token::End => "END",
            Token::In => "IN",
            Token::Between => "BETWEEN",
            Token::IsNull => "IS NULL",
            Token::IsNotNull => "IS NOT NULL",
            Token::Distinct => "DISTINCT",
            Token::With => "WITH",
            Token::True => "TRUE",
            Token::False => "FALSE",
            Token::Comma => ",",
            Token::Dot => ".",
            Token::Star => "*",
            Token::LParen => "(",
            Token::RParen => ")",
            Token::Eq => "=",
            Token::Gt => ">",
            Token::Plus => "+",
            Token::Minus => "-",
            Token::Mul => "*",
            Token::Div => "/",
            Token::Space => " ",
            Token::Newline => "\n",
            _ => return None,
        };
        Some(text)
    }

    /// Serialize this token to a string for the given dialect.
    pub fn serialize(&self, dialect: Dialect) -> String {
        if let Some(text) = self.fixed_text() {
            return text.to_string();
        }
        match self {
            Token::Indent(n) => "  ".repeat(*n),
            Token::Ident(name) => dialect.quote_identifier(name),
            Token::LitInt(n) => n.to_string(),
            Token::LitFloat(f) => format_float(*f, dialect),
            Token::LitString(s) => dialect.quote_string(s),
            Token::LitBool(b) => dialect.format_bool(*b).into(),
            Token::LitNull => dialect.format_null().into(),
            Token::Param(_) => dialect.placeholder().into(),
            Token::FunctionName(name) => dialect
                .remap_function(name)
                .map(str::to_string)
                .unwrap_or_else(|| name.to_uppercase()),
            _ => String::new(),
        }
    }

    /// Serialize with bound parameters rendered as literals.
    ///
    /// Only for display (logs, the assistant prompt); never executed.
    pub fn serialize_inline(&self, dialect: Dialect) -> String {
        match self {
            Token::Param(value) => value.to_literal(dialect),
            other => other.serialize(dialect),
        }
    }
}

/// Non-finite floats have no SQL literal; they render as NULL.
pub(crate) fn format_float(f: f64, dialect: Dialect) -> String {
    if !f.is_finite() {
        return dialect.format_null().into();
    }
    let mut buffer = ryu::Buffer::new();
    buffer.format(f).to_string()
}

/// A stream of tokens that can be serialized to SQL.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TokenStream {
    tokens: Vec<Token>,
}

impl TokenStream {
    /// Create an empty token stream.
    pub fn new() -> Self {
        Self { tokens: vec![] }
    }

    /// Push a single token.
    pub fn push(&mut self, token: Token) -> &mut Self {
        self.tokens.push(token);
        self
    }

    /// Extend with multiple tokens.
    pub fn extend(&mut self, tokens: impl IntoIterator<Item = Token>) -> &mut Self {
        self.tokens.extend(tokens);
        self
    }

    /// Append another token stream.
    pub fn append(&mut self, other: &TokenStream) -> &mut Self {
        self.tokens.extend(other.tokens.iter().cloned());
        self
    }

    /// Serialize all tokens to a SQL string with placeholders.
    pub fn serialize(&self, dialect: Dialect) -> String {
        self.tokens.iter().map(|t| t.serialize(dialect)).collect()
    }

    /// Serialize with parameters inlined as literals.
    pub fn serialize_inline(&self, dialect: Dialect) -> String {
        self.tokens
            .iter()
            .map(|t| t.serialize_inline(dialect))
            .collect()
    }

    /// Bound parameter values in placeholder order.
    pub fn params(&self) -> Vec<BindValue> {
        self.tokens
            .iter()
            .filter_map(|t| match t {
                Token::Param(value) => Some(value.clone()),
                _ => None,
            })
            .collect()
    }

    // Convenience methods for common tokens
    pub fn space(&mut self) -> &mut Self {
        self.push(Token::Space)
    }
    pub fn newline(&mut self) -> &mut Self {
        self.push(Token::Newline)
    }
    pub fn indent(&mut self, n: usize) -> &mut Self {
        self.push(Token::Indent(n))
    }
    pub fn comma(&mut self) -> &mut Self {
        self.push(Token::Comma)
    }
    pub fn lparen(&mut self) -> &mut Self {
        self.push(Token::LParen)
    }
    pub fn rparen(&mut self) -> &mut Self {
        self.push(Token::RParen)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyword_serialize() {
        assert_eq!(Token::Select.serialize(Dialect::Snowflake), "SELECT");
        assert_eq!(Token::GroupBy.serialize(Dialect::DuckDb), "GROUP BY");
    }

    #[test]
    fn test_ident_serialize() {
        assert_eq!(
            Token::Ident("CITY".into()).serialize(Dialect::Snowflake),
            "CITY"
        );
        assert_eq!(
            Token::Ident("order".into()).serialize(Dialect::Snowflake),
            "\"order\""
        );
        assert_eq!(
            Token::Ident("ORDER".into()).serialize(Dialect::DuckDb),
            "\"ORDER\""
        );
    }

    #[test]
    fn test_token_stream() {
        let mut ts = TokenStream::new();
        ts.push(Token::Select)
            .space()
            .push(Token::Ident("CITY".into()))
            .space()
            .push(Token::From)
            .space()
            .push(Token::Ident("V_PLATFORM_PROFITABILITY".into()));

        assert_eq!(
            ts.serialize(Dialect::Snowflake),
            "SELECT CITY FROM V_PLATFORM_PROFITABILITY"
        );
    }

    #[test]
    fn test_params_collected_in_order() {
        let mut ts = TokenStream::new();
        ts.push(Token::Param(BindValue::Text("Pune".into())))
            .comma()
            .push(Token::Param(BindValue::Int(3)));

        assert_eq!(ts.serialize(Dialect::Snowflake), "?,?");
        assert_eq!(
            ts.params(),
            vec![BindValue::Text("Pune".into()), BindValue::Int(3)]
        );
        assert_eq!(ts.serialize_inline(Dialect::Snowflake), "'Pune',3");
    }

    #[test]
    fn test_float_serialize() {
        assert_eq!(Token::LitFloat(3.14).serialize(Dialect::DuckDb), "3.14");
        assert_eq!(Token::LitFloat(1.0).serialize(Dialect::DuckDb), "1.0");
        assert_eq!(Token::LitFloat(-42.5).serialize(Dialect::Snowflake), "-42.5");
    }

    #[test]
    fn test_non_finite_float_renders_null() {
        assert_eq!(Token::LitFloat(f64::NAN).serialize(Dialect::Snowflake), "NULL");
        assert_eq!(
            Token::LitFloat(f64::INFINITY).serialize(Dialect::DuckDb),
            "NULL"
        );
    }
}
