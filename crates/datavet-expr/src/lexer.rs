//! Tokenizer for rule expressions
//!
//! Works on chars so that column positions in syntax errors match what a user
//! sees in the schema file, accents included.

use crate::{Error, Result};

/// Kind of a lexical token
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    /// Bare identifier or keyword
    Ident(String),
    /// Backtick-quoted identifier
    QuotedIdent(String),
    Str(String),
    Int(i64),
    Dec(f64),
    LParen,
    RParen,
    LBracket,
    RBracket,
    Comma,
    Dot,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    AndAnd,
    OrOr,
    Bang,
    Eof,
}

/// A token with its 1-indexed starting column
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub column: usize,
}

impl Token {
    /// Whether this token is the given keyword (case-insensitive)
    #[must_use]
    pub fn is_keyword(&self, keyword: &str) -> bool {
        matches!(&self.kind, TokenKind::Ident(s) if s.eq_ignore_ascii_case(keyword))
    }
}

/// Character buffer with a cursor
struct Scanner {
    chars: Vec<char>,
    pos: usize,
}

impl Scanner {
    fn new(input: &str) -> Self {
        Self {
            chars: input.chars().collect(),
            pos: 0,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_next(&self) -> Option<char> {
        self.chars.get(self.pos + 1).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        Some(c)
    }

    fn column(&self) -> usize {
        self.pos + 1
    }

    fn take_while(&mut self, pred: impl Fn(char) -> bool) -> String {
        let mut out = String::new();
        while let Some(c) = self.peek() {
            if !pred(c) {
                break;
            }
            out.push(c);
            self.pos += 1;
        }
        out
    }
}

/// Split an expression into tokens, terminated by [`TokenKind::Eof`]
///
/// # Errors
///
/// Returns a syntax error for unterminated strings, malformed numbers and
/// characters outside the language.
pub fn tokenize(input: &str) -> Result<Vec<Token>> {
    let mut scanner = Scanner::new(input);
    let mut tokens = Vec::new();

    loop {
        scanner.take_while(char::is_whitespace);
        let column = scanner.column();
        let Some(c) = scanner.peek() else {
            tokens.push(Token {
                kind: TokenKind::Eof,
                column,
            });
            return Ok(tokens);
        };

        let kind = match c {
            '\'' | '"' => lex_string(&mut scanner, c)?,
            '`' => lex_quoted_ident(&mut scanner)?,
            c if c.is_ascii_digit() => lex_number(&mut scanner)?,
            c if c.is_alphabetic() || c == '_' => {
                TokenKind::Ident(scanner.take_while(|c| c.is_alphanumeric() || c == '_'))
            }
            _ => lex_symbol(&mut scanner)?,
        };
        tokens.push(Token { kind, column });
    }
}

fn lex_string(scanner: &mut Scanner, quote: char) -> Result<TokenKind> {
    let start = scanner.column();
    scanner.bump();
    let mut value = String::new();
    loop {
        match scanner.bump() {
            None => return Err(Error::syntax(start, "unterminated string literal")),
            Some('\\') => match scanner.bump() {
                Some('n') => value.push('\n'),
                Some('t') => value.push('\t'),
                Some(other) => value.push(other),
                None => return Err(Error::syntax(start, "unterminated string literal")),
            },
            Some(c) if c == quote => return Ok(TokenKind::Str(value)),
            Some(c) => value.push(c),
        }
    }
}

fn lex_quoted_ident(scanner: &mut Scanner) -> Result<TokenKind> {
    let start = scanner.column();
    scanner.bump();
    let name = scanner.take_while(|c| c != '`');
    if scanner.bump() != Some('`') {
        return Err(Error::syntax(start, "unterminated quoted identifier"));
    }
    if name.is_empty() {
        return Err(Error::syntax(start, "empty quoted identifier"));
    }
    Ok(TokenKind::QuotedIdent(name))
}

fn lex_number(scanner: &mut Scanner) -> Result<TokenKind> {
    let start = scanner.column();
    let mut text = scanner.take_while(|c| c.is_ascii_digit());
    let mut is_decimal = false;

    if scanner.peek() == Some('.') && scanner.peek_next().is_some_and(|c| c.is_ascii_digit()) {
        scanner.bump();
        text.push('.');
        text.push_str(&scanner.take_while(|c| c.is_ascii_digit()));
        is_decimal = true;
    }
    if matches!(scanner.peek(), Some('e' | 'E')) {
        let exponent_start = scanner.pos;
        scanner.bump();
        let mut exponent = String::from("e");
        if let Some(sign @ ('+' | '-')) = scanner.peek() {
            scanner.bump();
            exponent.push(sign);
        }
        let digits = scanner.take_while(|c| c.is_ascii_digit());
        if digits.is_empty() {
            scanner.pos = exponent_start;
        } else {
            text.push_str(&exponent);
            text.push_str(&digits);
            is_decimal = true;
        }
    }
    if scanner.peek().is_some_and(|c| c.is_alphabetic() || c == '_') {
        return Err(Error::syntax(start, format!("malformed number '{text}...'")));
    }

    if is_decimal {
        text.parse::<f64>()
            .map(TokenKind::Dec)
            .map_err(|e| Error::syntax(start, format!("invalid number '{text}': {e}")))
    } else {
        text.parse::<i64>()
            .map(TokenKind::Int)
            .map_err(|e| Error::syntax(start, format!("invalid number '{text}': {e}")))
    }
}

fn lex_symbol(scanner: &mut Scanner) -> Result<TokenKind> {
    let column = scanner.column();
    let c = scanner.bump().unwrap_or_default();
    let next = scanner.peek();
    let two = |scanner: &mut Scanner, kind: TokenKind| {
        scanner.bump();
        kind
    };

    let kind = match (c, next) {
        ('(', _) => TokenKind::LParen,
        (')', _) => TokenKind::RParen,
        ('[', _) => TokenKind::LBracket,
        (']', _) => TokenKind::RBracket,
        (',', _) => TokenKind::Comma,
        ('.', _) => TokenKind::Dot,
        ('=', Some('=')) => two(scanner, TokenKind::Eq),
        ('=', _) => TokenKind::Eq,
        ('!', Some('=')) => two(scanner, TokenKind::Ne),
        ('!', _) => TokenKind::Bang,
        ('<', Some('=')) => two(scanner, TokenKind::Le),
        ('<', Some('>')) => two(scanner, TokenKind::Ne),
        ('<', _) => TokenKind::Lt,
        ('>', Some('=')) => two(scanner, TokenKind::Ge),
        ('>', _) => TokenKind::Gt,
        ('+', _) => TokenKind::Plus,
        ('-', _) => TokenKind::Minus,
        ('*', _) => TokenKind::Star,
        ('/', _) => TokenKind::Slash,
        ('%', _) => TokenKind::Percent,
        ('&', Some('&')) => two(scanner, TokenKind::AndAnd),
        ('|', Some('|')) => two(scanner, TokenKind::OrOr),
        (other, _) => {
            return Err(Error::syntax(
                column,
                format!("unexpected character '{other}'"),
            ));
        }
    };
    Ok(kind)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<TokenKind> {
        tokenize(input)
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn test_tokenize_comparison() {
        assert_eq!(
            kinds("amount >= 10.5"),
            vec![
                TokenKind::Ident("amount".to_string()),
                TokenKind::Ge,
                TokenKind::Dec(10.5),
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn test_tokenize_qualified_and_quoted() {
        assert_eq!(
            kinds("clients.id == `unit price`"),
            vec![
                TokenKind::Ident("clients".to_string()),
                TokenKind::Dot,
                TokenKind::Ident("id".to_string()),
                TokenKind::Eq,
                TokenKind::QuotedIdent("unit price".to_string()),
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn test_tokenize_strings_with_escapes() {
        assert_eq!(
            kinds(r#"'it\'s' "x""#),
            vec![
                TokenKind::Str("it's".to_string()),
                TokenKind::Str("x".to_string()),
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn test_tokenize_alternative_operators() {
        assert_eq!(
            kinds("a = 1 && b <> 2 || !c"),
            vec![
                TokenKind::Ident("a".to_string()),
                TokenKind::Eq,
                TokenKind::Int(1),
                TokenKind::AndAnd,
                TokenKind::Ident("b".to_string()),
                TokenKind::Ne,
                TokenKind::Int(2),
                TokenKind::OrOr,
                TokenKind::Bang,
                TokenKind::Ident("c".to_string()),
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn test_tokenize_exponent() {
        assert_eq!(kinds("1e3")[0], TokenKind::Dec(1000.0));
        assert_eq!(kinds("2")[0], TokenKind::Int(2));
    }

    #[test]
    fn test_unterminated_string_reports_column() {
        let err = tokenize("name == 'abc").unwrap_err();
        assert_eq!(
            err,
            Error::Syntax {
                column: 9,
                message: "unterminated string literal".to_string()
            }
        );
    }

    #[test]
    fn test_unexpected_character() {
        let err = tokenize("a ; b").unwrap_err();
        assert!(err.to_string().contains("unexpected character ';'"));
    }

    #[test]
    fn test_malformed_number() {
        assert!(tokenize("12abc").is_err());
    }

    #[test]
    fn test_keyword_matching_is_case_insensitive() {
        let tokens = tokenize("AND").unwrap();
        assert!(tokens[0].is_keyword("and"));
    }
}
