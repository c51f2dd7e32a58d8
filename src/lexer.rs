use crate::error::{ScriptError, Span};
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Keyword,
    Identifier,
    Number,
    String,
    Operator,
    Delimiter,
    Comment,
    Eof,
}

pub const KEYWORDS: &[&str] = &[
    "print", "if", "elif", "else", "endif", "f", "endf", "return", "for", "to", "do", "endfor",
    "while", "endwhile", "in", "break", "class", "endclass", "init", "endinit", "extends",
    "super", "from", "use", "share", "load", "as", "new", "null", "True", "False",
];

/// Operators, longest first so matching is greedy.
pub const OPERATORS: &[&str] = &[
    "==", "!=", ">=", "<=", "&&", "||", "**", "//", "+", "-", "*", "/", "=", ">", "<", "%",
];

const OPERATOR_CHARS: &str = "+-*/=!><&|%";

const DELIMITERS: &str = "()[]{},:.";

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    /// Source text of the token. String tokens hold the unquoted contents.
    pub text: String,
    pub span: Span,
}

impl Token {
    pub fn new(kind: TokenKind, text: String, span: Span) -> Self {
        Self { kind, text, span }
    }

    pub fn is(&self, kind: TokenKind, text: &str) -> bool {
        self.kind == kind && self.text == text
    }

    pub fn is_keyword(&self, text: &str) -> bool {
        self.is(TokenKind::Keyword, text)
    }

    pub fn line(&self) -> usize {
        self.span.line
    }

    pub fn column(&self) -> usize {
        self.span.column
    }
}

pub struct Lexer {
    source: Vec<char>,
    tokens: Vec<Token>,
    start: usize,
    current: usize,
    line: usize,
    column: usize,
    start_line: usize,
    start_column: usize,
    keywords: HashSet<&'static str>,
}

impl Lexer {
    pub fn new(source: &str) -> Self {
        Self {
            source: source.chars().collect(),
            tokens: Vec::new(),
            start: 0,
            current: 0,
            line: 1,
            column: 1,
            start_line: 1,
            start_column: 1,
            keywords: KEYWORDS.iter().copied().collect(),
        }
    }

    /// Tokenizes the whole source. The returned stream always ends with an
    /// `Eof` token; calling this again rescans from the beginning.
    pub fn scan_tokens(&mut self) -> Result<Vec<Token>, ScriptError> {
        self.tokens.clear();
        self.current = 0;
        self.line = 1;
        self.column = 1;

        while !self.is_at_end() {
            self.start = self.current;
            self.start_line = self.line;
            self.start_column = self.column;
            self.scan_token()?;
        }

        self.tokens.push(Token::new(
            TokenKind::Eof,
            String::new(),
            Span::new(self.current, self.current, self.line, self.column),
        ));

        Ok(std::mem::take(&mut self.tokens))
    }

    fn is_at_end(&self) -> bool {
        self.current >= self.source.len()
    }

    fn scan_token(&mut self) -> Result<(), ScriptError> {
        let c = self.advance();

        match c {
            c if c.is_whitespace() => {}
            '>' if self.peek() == '>' => self.comment(),
            '"' | '\'' => self.string(c)?,
            c if c.is_ascii_digit() => self.number(),
            c if c.is_alphabetic() || c == '_' => self.identifier(),
            c if OPERATOR_CHARS.contains(c) => self.operator()?,
            c if DELIMITERS.contains(c) => self.add_token(TokenKind::Delimiter),
            _ => {
                return Err(ScriptError::lex_error(
                    self.current_span(),
                    format!(
                        "Unexpected character: '{}' at line {}, column {}",
                        c, self.start_line, self.start_column
                    ),
                ));
            }
        }

        Ok(())
    }

    fn advance(&mut self) -> char {
        let c = self.source.get(self.current).copied().unwrap_or('\0');
        self.current += 1;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        c
    }

    fn peek(&self) -> char {
        self.source.get(self.current).copied().unwrap_or('\0')
    }

    fn comment(&mut self) {
        while self.peek() != '\n' && !self.is_at_end() {
            self.advance();
        }
        self.add_token(TokenKind::Comment);
    }

    fn string(&mut self, quote: char) -> Result<(), ScriptError> {
        while self.peek() != quote && !self.is_at_end() {
            self.advance();
        }

        if self.is_at_end() {
            return Err(ScriptError::lex_error(
                self.current_span(),
                format!(
                    "Unterminated string at line {}, column {}",
                    self.start_line, self.start_column
                ),
            ));
        }

        // Closing quote
        self.advance();

        let contents: String = self.source[self.start + 1..self.current - 1].iter().collect();
        self.add_token_with_text(TokenKind::String, contents);
        Ok(())
    }

    /// A digit run with at most one decimal point. Whether it is an integer
    /// or a double is decided by the parser.
    fn number(&mut self) {
        let mut seen_point = false;
        loop {
            let c = self.peek();
            if c.is_ascii_digit() {
                self.advance();
            } else if c == '.' && !seen_point {
                seen_point = true;
                self.advance();
            } else {
                break;
            }
        }
        self.add_token(TokenKind::Number);
    }

    fn identifier(&mut self) {
        while self.peek().is_alphanumeric() || self.peek() == '_' {
            self.advance();
        }

        let text: String = self.source[self.start..self.current].iter().collect();
        let kind = if self.keywords.contains(text.as_str()) {
            TokenKind::Keyword
        } else {
            TokenKind::Identifier
        };

        self.add_token_with_text(kind, text);
    }

    fn operator(&mut self) -> Result<(), ScriptError> {
        let first = self.source[self.start];
        let two: String = [first, self.peek()].iter().collect();

        if OPERATORS.contains(&two.as_str()) {
            self.advance();
            self.add_token_with_text(TokenKind::Operator, two);
            return Ok(());
        }

        let one = first.to_string();
        if OPERATORS.contains(&one.as_str()) {
            self.add_token_with_text(TokenKind::Operator, one);
            Ok(())
        } else {
            Err(ScriptError::lex_error(
                self.current_span(),
                format!(
                    "Invalid operator: {} at line {}, column {}",
                    one, self.start_line, self.start_column
                ),
            ))
        }
    }

    fn current_span(&self) -> Span {
        Span::new(self.start, self.current, self.start_line, self.start_column)
    }

    fn add_token(&mut self, kind: TokenKind) {
        let text: String = self.source[self.start..self.current].iter().collect();
        self.add_token_with_text(kind, text);
    }

    fn add_token_with_text(&mut self, kind: TokenKind, text: String) {
        let span = self.current_span();
        self.tokens.push(Token::new(kind, text, span));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn kinds_and_text(source: &str) -> Vec<(TokenKind, String)> {
        Lexer::new(source)
            .scan_tokens()
            .unwrap()
            .into_iter()
            .map(|t| (t.kind, t.text))
            .collect()
    }

    #[test]
    fn classifies_keywords_identifiers_and_literals() {
        let tokens = kinds_and_text("if (count >= 2.5) print('hi') endif");
        assert_eq!(
            tokens,
            vec![
                (TokenKind::Keyword, "if".to_string()),
                (TokenKind::Delimiter, "(".to_string()),
                (TokenKind::Identifier, "count".to_string()),
                (TokenKind::Operator, ">=".to_string()),
                (TokenKind::Number, "2.5".to_string()),
                (TokenKind::Delimiter, ")".to_string()),
                (TokenKind::Keyword, "print".to_string()),
                (TokenKind::Delimiter, "(".to_string()),
                (TokenKind::String, "hi".to_string()),
                (TokenKind::Delimiter, ")".to_string()),
                (TokenKind::Keyword, "endif".to_string()),
                (TokenKind::Eof, String::new()),
            ]
        );
    }

    #[test]
    fn operators_match_longest_first() {
        let ops: Vec<String> = kinds_and_text("a ** b // c == d != e && f || g % h")
            .into_iter()
            .filter(|(k, _)| *k == TokenKind::Operator)
            .map(|(_, t)| t)
            .collect();
        assert_eq!(ops, vec!["**", "//", "==", "!=", "&&", "||", "%"]);
    }

    #[test]
    fn comments_are_kept_as_tokens() {
        let tokens = kinds_and_text(">> a note\nx = 1");
        assert_eq!(tokens[0], (TokenKind::Comment, ">> a note".to_string()));
        assert_eq!(tokens[1], (TokenKind::Identifier, "x".to_string()));
    }

    #[test]
    fn tracks_line_and_column() {
        let tokens = Lexer::new("x = 1\n  y = 'two'").scan_tokens().unwrap();
        let y = &tokens[3];
        assert_eq!(y.text, "y");
        assert_eq!((y.line(), y.column()), (2, 3));
        let two = &tokens[5];
        assert_eq!((two.line(), two.column()), (2, 7));
    }

    #[test]
    fn number_takes_at_most_one_point() {
        let tokens = kinds_and_text("3.14.159");
        assert_eq!(tokens[0], (TokenKind::Number, "3.14".to_string()));
        assert_eq!(tokens[1], (TokenKind::Delimiter, ".".to_string()));
        assert_eq!(tokens[2], (TokenKind::Number, "159".to_string()));
    }

    #[test]
    fn unterminated_string_is_an_error() {
        let error = Lexer::new("x = \"abc").scan_tokens().unwrap_err();
        assert!(error.message.contains("Unterminated string"));
    }

    #[test]
    fn invalid_character_reports_position() {
        let error = Lexer::new("x = 1\ny = @").scan_tokens().unwrap_err();
        assert_eq!(error.message, "Unexpected character: '@' at line 2, column 5");
        assert_eq!((error.span.line, error.span.column), (2, 5));
    }

    #[test]
    fn lone_bang_is_not_an_operator() {
        assert!(Lexer::new("!x").scan_tokens().is_err());
    }

    #[test]
    fn scanning_is_restartable() {
        let mut lexer = Lexer::new("a + b");
        let first = lexer.scan_tokens().unwrap();
        let second = lexer.scan_tokens().unwrap();
        assert_eq!(first, second);
    }
}
