use std::io::Read;

use utf8_read::{Char, Reader};

/// The kinds of [`Token`] produced by the [`Scanner`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// A character that does not belong to the grammar. Callers must
    /// treat this as fatal.
    Illegal,
    /// End of the input. Persistent: once the input is exhausted every
    /// further scan returns it again.
    Eof,
    /// A run of spaces or tabs
    Whitespace,
    /// A run of newline characters
    EndOfLine,
    /// The `;` command terminator
    EndOfCommand,
    /// The `=` key/value separator
    Equal,
    /// `(`
    OpenParen,
    /// `)`
    CloseParen,
    /// `,`
    Comma,
    /// `:`
    Colon,
    /// A word that is neither a number nor a keyword
    Ident,
    /// A word made of digits and dots
    Number,
    /// The `#NEXUS` header
    Nexus,
    /// The `BEGIN` keyword
    Begin,
    /// The `END` keyword
    End,
    /// The `TAXA` block name
    Taxa,
    /// The `TREES` block name
    Trees,
    /// The `TREE` command
    Tree,
    /// The `DATA` or `CHARACTERS` block name
    Data,
    /// The `DIMENSIONS` command
    Dimensions,
    /// The `FORMAT` command
    Format,
    /// The `MATRIX` command
    Matrix,
    /// The `NTAX` key
    NTax,
    /// The `NCHAR` key
    NChar,
    /// The `DATATYPE` key
    Datatype,
    /// The `MISSING` key
    Missing,
    /// The `GAP` key
    Gap,
    /// The `TAXLABELS` command
    TaxLabels,
}

impl TokenKind {
    /// Word-shaped tokens: identifiers, numbers and keywords. Only these
    /// can stand as command names, keys or values when the parser skips
    /// an unsupported construct.
    pub fn is_word(self) -> bool {
        !matches!(
            self,
            TokenKind::Illegal
                | TokenKind::Eof
                | TokenKind::Whitespace
                | TokenKind::EndOfLine
                | TokenKind::EndOfCommand
                | TokenKind::Equal
                | TokenKind::OpenParen
                | TokenKind::CloseParen
                | TokenKind::Comma
                | TokenKind::Colon
        )
    }
}

/// A token of the Nexus grammar: a kind paired with the literal text it
/// was scanned from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    /// The classification of the token
    pub kind: TokenKind,
    /// The literal text of the token
    pub text: String,
}

impl Token {
    pub(crate) fn new(kind: TokenKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
        }
    }
}

/// A tokenizer over an abstract byte source.
///
/// The scanner classifies characters into [`Token`]s maximally
/// (longest-match words and whitespace runs) and skips nothing on its
/// own: callers that want to ignore whitespace use
/// [`Scanner::scan_ignore_whitespace`]. A single token of push-back is
/// supported through [`Scanner::unread`].
pub struct Scanner<R: Read> {
    reader: Reader<R>,
    pending_char: Option<char>,
    pending_token: Option<Token>,
}

impl<R: Read> Scanner<R> {
    /// Creates a scanner over a byte source
    pub fn new(reader: R) -> Self {
        Self {
            reader: Reader::new(reader),
            pending_char: None,
            pending_token: None,
        }
    }

    // Read failures and malformed encodings end the stream: the parser
    // reports the truncation when a terminator goes missing.
    fn read_char(&mut self) -> Option<char> {
        if let Some(c) = self.pending_char.take() {
            return Some(c);
        }
        match self.reader.next_char() {
            Ok(Char::Char(c)) => Some(c),
            _ => None,
        }
    }

    fn unread_char(&mut self, c: char) {
        self.pending_char = Some(c);
    }

    /// Pushes `token` back onto the scanner; the next [`Scanner::scan`]
    /// returns it again. Only one token can be pushed back at a time.
    pub fn unread(&mut self, token: Token) {
        self.pending_token = Some(token);
    }

    /// Returns the next token of the input.
    pub fn scan(&mut self) -> Token {
        if let Some(token) = self.pending_token.take() {
            return token;
        }

        let Some(c) = self.read_char() else {
            return Token::new(TokenKind::Eof, "");
        };

        match c {
            ' ' | '\t' => self.scan_run(c, TokenKind::Whitespace, |c| c == ' ' || c == '\t'),
            '\n' | '\r' => self.scan_run(c, TokenKind::EndOfLine, |c| c == '\n' || c == '\r'),
            ';' => Token::new(TokenKind::EndOfCommand, ";"),
            '=' => Token::new(TokenKind::Equal, "="),
            '(' => Token::new(TokenKind::OpenParen, "("),
            ')' => Token::new(TokenKind::CloseParen, ")"),
            ',' => Token::new(TokenKind::Comma, ","),
            ':' => Token::new(TokenKind::Colon, ":"),
            c if Self::is_word_char(c) => self.scan_word(c),
            c => Token::new(TokenKind::Illegal, c.to_string()),
        }
    }

    /// Scans past whitespace tokens (but not end-of-line tokens) and
    /// returns the first non-whitespace token.
    pub fn scan_ignore_whitespace(&mut self) -> Token {
        loop {
            let token = self.scan();
            if token.kind != TokenKind::Whitespace {
                return token;
            }
        }
    }

    fn is_word_char(c: char) -> bool {
        !c.is_whitespace() && !c.is_control() && !"();=,:".contains(c)
    }

    fn scan_run(&mut self, first: char, kind: TokenKind, accept: impl Fn(char) -> bool) -> Token {
        let mut text = String::from(first);
        while let Some(c) = self.read_char() {
            if accept(c) {
                text.push(c);
            } else {
                self.unread_char(c);
                break;
            }
        }

        Token::new(kind, text)
    }

    fn scan_word(&mut self, first: char) -> Token {
        let token = self.scan_run(first, TokenKind::Ident, Self::is_word_char);

        let is_number = token.text.contains(|c: char| c.is_ascii_digit())
            && token.text.chars().all(|c| c.is_ascii_digit() || c == '.');
        if is_number {
            return Token::new(TokenKind::Number, token.text);
        }

        match Self::keyword(&token.text) {
            Some(kind) => Token::new(kind, token.text),
            None => token,
        }
    }

    // Keywords match case-insensitively
    fn keyword(text: &str) -> Option<TokenKind> {
        Some(match text.to_ascii_uppercase().as_str() {
            "#NEXUS" => TokenKind::Nexus,
            "BEGIN" => TokenKind::Begin,
            "END" => TokenKind::End,
            "TAXA" => TokenKind::Taxa,
            "TREES" => TokenKind::Trees,
            "TREE" => TokenKind::Tree,
            "DATA" | "CHARACTERS" => TokenKind::Data,
            "DIMENSIONS" => TokenKind::Dimensions,
            "FORMAT" => TokenKind::Format,
            "MATRIX" => TokenKind::Matrix,
            "NTAX" => TokenKind::NTax,
            "NCHAR" => TokenKind::NChar,
            "DATATYPE" => TokenKind::Datatype,
            "MISSING" => TokenKind::Missing,
            "GAP" => TokenKind::Gap,
            "TAXLABELS" => TokenKind::TaxLabels,
            _ => return None,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    fn scanner(input: &str) -> Scanner<Cursor<Vec<u8>>> {
        Scanner::new(Cursor::new(input.as_bytes().to_vec()))
    }

    fn kinds(input: &str) -> Vec<TokenKind> {
        let mut s = scanner(input);
        let mut kinds = vec![];
        loop {
            let token = s.scan();
            let kind = token.kind;
            kinds.push(kind);
            if kind == TokenKind::Eof {
                return kinds;
            }
        }
    }

    #[test]
    fn tokenize_header_and_block() {
        use TokenKind::*;
        assert_eq!(
            kinds("#NEXUS\nBEGIN TAXA;\n"),
            vec![
                Nexus, EndOfLine, Begin, Whitespace, Taxa, EndOfCommand, EndOfLine, Eof
            ]
        );
    }

    #[test]
    fn tokenize_tree_command() {
        use TokenKind::*;
        assert_eq!(
            kinds("TREE t1 = (A,(B,C));"),
            vec![
                Tree,
                Whitespace,
                Ident,
                Whitespace,
                Equal,
                Whitespace,
                OpenParen,
                Ident,
                Comma,
                OpenParen,
                Ident,
                Comma,
                Ident,
                CloseParen,
                CloseParen,
                EndOfCommand,
                Eof
            ]
        );
    }

    #[test]
    fn numbers_and_idents() {
        let mut s = scanner("NTAX=25 1.5 t4x0n");
        assert_eq!(s.scan().kind, TokenKind::NTax);
        assert_eq!(s.scan().kind, TokenKind::Equal);

        let number = s.scan();
        assert_eq!(number.kind, TokenKind::Number);
        assert_eq!(number.text, "25");

        assert_eq!(s.scan_ignore_whitespace().kind, TokenKind::Number);
        assert_eq!(s.scan_ignore_whitespace().kind, TokenKind::Ident);
    }

    #[test]
    fn keywords_are_case_insensitive() {
        let mut s = scanner("begin Taxa taxlabels");
        assert_eq!(s.scan().kind, TokenKind::Begin);
        assert_eq!(s.scan_ignore_whitespace().kind, TokenKind::Taxa);
        assert_eq!(s.scan_ignore_whitespace().kind, TokenKind::TaxLabels);
    }

    #[test]
    fn pushback_returns_the_same_token() {
        let mut s = scanner("BEGIN TREES;");
        let token = s.scan();
        assert_eq!(token.kind, TokenKind::Begin);
        s.unread(token.clone());
        assert_eq!(s.scan(), token);
        assert_eq!(s.scan().kind, TokenKind::Whitespace);
    }

    #[test]
    fn eof_is_persistent() {
        let mut s = scanner("a");
        assert_eq!(s.scan().kind, TokenKind::Ident);
        for _ in 0..3 {
            assert_eq!(s.scan().kind, TokenKind::Eof);
        }
    }

    #[test]
    fn control_characters_are_illegal() {
        let mut s = scanner("a\u{1}b");
        assert_eq!(s.scan().kind, TokenKind::Ident);
        let illegal = s.scan();
        assert_eq!(illegal.kind, TokenKind::Illegal);
        assert_eq!(illegal.text, "\u{1}");
        assert_eq!(s.scan().kind, TokenKind::Ident);
    }

    #[test]
    fn whitespace_is_not_skipped_implicitly() {
        let mut s = scanner("A B");
        assert_eq!(s.scan().kind, TokenKind::Ident);
        assert_eq!(s.scan().kind, TokenKind::Whitespace);
        assert_eq!(s.scan().kind, TokenKind::Ident);
    }
}
