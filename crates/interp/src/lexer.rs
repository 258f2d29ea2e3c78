//! Source → token stream.
//!
//! Tokenises the whole source buffer up front into one `Vec<Token>` ending
//! in `TokenKind::Eof`, each token carrying its source position so the
//! parser's cursor is a single `usize` index into this vector (spec: "the
//! parser cursor is a single pointer"). `#if`/`#ifdef`/.../`#endif` are
//! tokenised like any other directive rather than resolved here - they're
//! resolved by the statement parser (see `parser::skip_preprocessor_block`),
//! since deciding whether `#ifdef FOO` holds depends on whether an earlier
//! `#define FOO` has already run, which this single upfront lexer pass
//! can't know (picoc's own lexer source wasn't available to ground this
//! against; this is the one place we had to reason from the spec's prose
//! alone, and we picked the reading consistent with "counters carried on
//! the parser state").

use picoc_core::Atom;
use picoc_runtime::{Fatal, Pos};

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Identifier(Atom),
    IntLiteral { value: i64, is_unsigned: bool, is_long: bool },
    FloatLiteral(f64),
    CharLiteral(i64),
    StringLiteral(Atom),

    // Keywords
    Void,
    Char,
    Short,
    Int,
    Long,
    Unsigned,
    Signed,
    Double,
    Struct,
    Union,
    Enum,
    Typedef,
    Static,
    Extern,
    Const,
    Volatile,
    Sizeof,
    If,
    Else,
    While,
    Do,
    For,
    Switch,
    Case,
    Default,
    Break,
    Continue,
    Return,
    Goto,
    Delete,

    // Punctuation
    LBrace,
    RBrace,
    LParen,
    /// `(` immediately following an identifier with no intervening
    /// whitespace - distinct from `LParen`, per spec 4.6.
    MacroOpenParen,
    RParen,
    LBracket,
    RBracket,
    Semicolon,
    Comma,
    Colon,
    Question,
    Ellipsis,

    Assign,
    PlusAssign,
    MinusAssign,
    StarAssign,
    SlashAssign,
    PercentAssign,
    AndAssign,
    OrAssign,
    XorAssign,
    ShlAssign,
    ShrAssign,

    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Increment,
    Decrement,

    EqEq,
    NotEq,
    Lt,
    Gt,
    Le,
    Ge,

    AndAnd,
    OrOr,
    Not,

    Amp,
    Pipe,
    Caret,
    Tilde,
    Shl,
    Shr,

    Dot,
    Arrow,

    // Preprocessor directives (handled by the statement parser)
    HashDefine,
    HashInclude,
    HashIf,
    HashIfdef,
    HashIfndef,
    HashElse,
    HashEndif,

    Eof,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub pos: Pos,
}

struct Lexer<'a> {
    src: &'a [u8],
    i: usize,
    line: u32,
    col: u32,
    file_name: String,
    interner: &'a mut picoc_core::Interner,
    tokens: Vec<Token>,
}

fn keyword(word: &str) -> Option<TokenKind> {
    use TokenKind::*;
    Some(match word {
        "void" => Void,
        "char" => Char,
        "short" => Short,
        "int" => Int,
        "long" => Long,
        "unsigned" => Unsigned,
        "signed" => Signed,
        "double" | "float" => Double,
        "struct" => Struct,
        "union" => Union,
        "enum" => Enum,
        "typedef" => Typedef,
        "static" => Static,
        "extern" => Extern,
        "const" => Const,
        "volatile" => Volatile,
        "sizeof" => Sizeof,
        "if" => If,
        "else" => Else,
        "while" => While,
        "do" => Do,
        "for" => For,
        "switch" => Switch,
        "case" => Case,
        "default" => Default,
        "break" => Break,
        "continue" => Continue,
        "return" => Return,
        "goto" => Goto,
        "delete" => Delete,
        _ => return None,
    })
}

impl<'a> Lexer<'a> {
    fn peek(&self) -> Option<u8> {
        self.src.get(self.i).copied()
    }

    fn peek_at(&self, off: usize) -> Option<u8> {
        self.src.get(self.i + off).copied()
    }

    fn advance(&mut self) -> Option<u8> {
        let c = self.peek()?;
        self.i += 1;
        if c == b'\n' {
            self.line += 1;
            self.col = 1;
        } else {
            self.col += 1;
        }
        Some(c)
    }

    fn pos(&self) -> Pos {
        Pos::new(self.line, self.col)
    }

    fn fail(&self, pos: Pos, msg: impl Into<String>) -> Fatal {
        Fatal::new(self.file_name.clone(), pos, msg.into())
    }

    fn push(&mut self, kind: TokenKind, pos: Pos) {
        self.tokens.push(Token { kind, pos });
    }

    fn skip_whitespace_and_comments(&mut self) -> Result<bool, Fatal> {
        let mut skipped_whitespace = false;
        loop {
            match self.peek() {
                Some(c) if c == b' ' || c == b'\t' || c == b'\r' || c == b'\n' => {
                    self.advance();
                    skipped_whitespace = true;
                }
                Some(b'/') if self.peek_at(1) == Some(b'/') => {
                    while let Some(c) = self.peek() {
                        if c == b'\n' {
                            break;
                        }
                        self.advance();
                    }
                    skipped_whitespace = true;
                }
                Some(b'/') if self.peek_at(1) == Some(b'*') => {
                    let start = self.pos();
                    self.advance();
                    self.advance();
                    loop {
                        match self.peek() {
                            None => return Err(self.fail(start, "unterminated /* comment")),
                            Some(b'*') if self.peek_at(1) == Some(b'/') => {
                                self.advance();
                                self.advance();
                                break;
                            }
                            Some(_) => {
                                self.advance();
                            }
                        }
                    }
                    skipped_whitespace = true;
                }
                _ => break,
            }
        }
        Ok(skipped_whitespace)
    }

    fn lex_number(&mut self) -> Result<TokenKind, Fatal> {
        let start = self.i;
        let start_pos = self.pos();
        if self.peek() == Some(b'0') && matches!(self.peek_at(1), Some(b'x') | Some(b'X')) {
            self.advance();
            self.advance();
            let digits_start = self.i;
            while matches!(self.peek(), Some(c) if c.is_ascii_hexdigit()) {
                self.advance();
            }
            let text = std::str::from_utf8(&self.src[digits_start..self.i]).unwrap();
            if text.is_empty() {
                return Err(self.fail(start_pos, "expected hex digits after 0x"));
            }
            let value = i64::from_str_radix(text, 16)
                .map_err(|_| self.fail(start_pos, "hex literal out of range"))?;
            let (is_unsigned, is_long) = self.lex_int_suffix();
            return Ok(TokenKind::IntLiteral { value, is_unsigned, is_long });
        }
        let mut is_float = false;
        while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
            self.advance();
        }
        if self.peek() == Some(b'.') && matches!(self.peek_at(1), Some(c) if c.is_ascii_digit()) {
            is_float = true;
            self.advance();
            while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
                self.advance();
            }
        }
        if matches!(self.peek(), Some(b'e') | Some(b'E')) {
            is_float = true;
            self.advance();
            if matches!(self.peek(), Some(b'+') | Some(b'-')) {
                self.advance();
            }
            while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
                self.advance();
            }
        }
        let text = std::str::from_utf8(&self.src[start..self.i]).unwrap().to_string();
        if is_float {
            if matches!(self.peek(), Some(b'f') | Some(b'F')) {
                self.advance();
            }
            let value: f64 = text.parse().map_err(|_| self.fail(start_pos, "bad float literal"))?;
            Ok(TokenKind::FloatLiteral(value))
        } else if text.len() > 1 && text.starts_with('0') {
            let value = i64::from_str_radix(&text, 8).map_err(|_| self.fail(start_pos, "bad octal literal"))?;
            let (is_unsigned, is_long) = self.lex_int_suffix();
            Ok(TokenKind::IntLiteral { value, is_unsigned, is_long })
        } else {
            let value: i64 = text.parse().map_err(|_| self.fail(start_pos, "integer literal out of range"))?;
            let (is_unsigned, is_long) = self.lex_int_suffix();
            Ok(TokenKind::IntLiteral { value, is_unsigned, is_long })
        }
    }

    fn lex_int_suffix(&mut self) -> (bool, bool) {
        let mut is_unsigned = false;
        let mut is_long = false;
        loop {
            match self.peek() {
                Some(b'u') | Some(b'U') => {
                    is_unsigned = true;
                    self.advance();
                }
                Some(b'l') | Some(b'L') => {
                    is_long = true;
                    self.advance();
                }
                _ => break,
            }
        }
        (is_unsigned, is_long)
    }

    fn lex_escape(&mut self, start_pos: Pos) -> Result<u8, Fatal> {
        match self.advance() {
            Some(b'n') => Ok(b'\n'),
            Some(b't') => Ok(b'\t'),
            Some(b'r') => Ok(b'\r'),
            Some(b'0') => Ok(0),
            Some(b'\\') => Ok(b'\\'),
            Some(b'\'') => Ok(b'\''),
            Some(b'"') => Ok(b'"'),
            Some(b'a') => Ok(0x07),
            Some(b'b') => Ok(0x08),
            Some(b'f') => Ok(0x0C),
            Some(b'v') => Ok(0x0B),
            Some(c) => Err(self.fail(start_pos, format!("unknown escape sequence '\\{}'", c as char))),
            None => Err(self.fail(start_pos, "unterminated escape sequence")),
        }
    }

    fn lex_string(&mut self) -> Result<TokenKind, Fatal> {
        let start_pos = self.pos();
        self.advance(); // opening quote
        let mut bytes = Vec::new();
        loop {
            match self.peek() {
                None | Some(b'\n') => return Err(self.fail(start_pos, "unterminated string literal")),
                Some(b'"') => {
                    self.advance();
                    break;
                }
                Some(b'\\') => {
                    self.advance();
                    bytes.push(self.lex_escape(start_pos)?);
                }
                Some(c) => {
                    self.advance();
                    bytes.push(c);
                }
            }
        }
        let text = String::from_utf8_lossy(&bytes).into_owned();
        let atom = self.interner.register(&text);
        Ok(TokenKind::StringLiteral(atom))
    }

    fn lex_char(&mut self) -> Result<TokenKind, Fatal> {
        let start_pos = self.pos();
        self.advance(); // opening quote
        let value = match self.peek() {
            None => return Err(self.fail(start_pos, "unterminated character literal")),
            Some(b'\\') => {
                self.advance();
                self.lex_escape(start_pos)? as i64
            }
            Some(c) => {
                self.advance();
                c as i64
            }
        };
        if self.peek() != Some(b'\'') {
            return Err(self.fail(start_pos, "character literal must contain exactly one character"));
        }
        self.advance();
        Ok(TokenKind::CharLiteral(value))
    }

    fn lex_hash_directive(&mut self) -> Result<TokenKind, Fatal> {
        let start_pos = self.pos();
        self.advance(); // '#'
        let ident_start = self.i;
        while matches!(self.peek(), Some(c) if c.is_ascii_alphabetic()) {
            self.advance();
        }
        let word = std::str::from_utf8(&self.src[ident_start..self.i]).unwrap();
        use TokenKind::*;
        match word {
            "define" => Ok(HashDefine),
            "include" => Ok(HashInclude),
            "if" => Ok(HashIf),
            "ifdef" => Ok(HashIfdef),
            "ifndef" => Ok(HashIfndef),
            "else" => Ok(HashElse),
            "endif" => Ok(HashEndif),
            other => Err(self.fail(start_pos, format!("unsupported preprocessor directive '#{other}'"))),
        }
    }
}

/// Lex `source`, returning a token vector ending in `TokenKind::Eof`.
/// `interner` is shared with the rest of the interpreter so identifiers and
/// literals in this source share storage with ones already registered.
pub fn lex(file_name: &str, source: &str, interner: &mut picoc_core::Interner) -> Result<Vec<Token>, Fatal> {
    let mut lexer = Lexer {
        src: source.as_bytes(),
        i: 0,
        line: 1,
        col: 1,
        file_name: file_name.to_string(),
        interner,
        tokens: Vec::new(),
    };

    loop {
        let had_whitespace = lexer.skip_whitespace_and_comments()?;
        let pos = lexer.pos();
        let Some(c) = lexer.peek() else {
            lexer.push(TokenKind::Eof, pos);
            break;
        };

        if c == b'#' {
            let kind = lexer.lex_hash_directive()?;
            lexer.push(kind, pos);
            continue;
        }

        if c.is_ascii_digit() {
            let kind = lexer.lex_number()?;
            lexer.push(kind, pos);
            continue;
        }

        if c == b'"' {
            let kind = lexer.lex_string()?;
            lexer.push(kind, pos);
            continue;
        }

        if c == b'\'' {
            let kind = lexer.lex_char()?;
            lexer.push(kind, pos);
            continue;
        }

        if c.is_ascii_alphabetic() || c == b'_' {
            let start = lexer.i;
            while matches!(lexer.peek(), Some(c) if c.is_ascii_alphanumeric() || c == b'_') {
                lexer.advance();
            }
            let word = std::str::from_utf8(&lexer.src[start..lexer.i]).unwrap();
            let kind = if let Some(kw) = keyword(word) {
                kw
            } else {
                let atom = lexer.interner.register(word);
                TokenKind::Identifier(atom)
            };
            // An immediately-following '(' with no whitespace between the
            // identifier and it is a distinct token kind (spec 4.6), used
            // to tell function calls/macro invocations apart from a
            // parenthesised expression starting right after a name.
            if !matches!(kind, TokenKind::Identifier(_)) {
                lexer.push(kind, pos);
                continue;
            }
            lexer.push(kind, pos);
            if lexer.peek() == Some(b'(') {
                let paren_pos = lexer.pos();
                lexer.advance();
                lexer.push(TokenKind::MacroOpenParen, paren_pos);
            }
            continue;
        }

        use TokenKind::*;
        let two = (c, lexer.peek_at(1));
        let three = lexer.peek_at(2);
        let kind = match two {
            (b'.', Some(b'.')) if three == Some(b'.') => {
                lexer.advance();
                lexer.advance();
                lexer.advance();
                Ellipsis
            }
            (b'+', Some(b'+')) => {
                lexer.advance();
                lexer.advance();
                Increment
            }
            (b'-', Some(b'-')) => {
                lexer.advance();
                lexer.advance();
                Decrement
            }
            (b'-', Some(b'>')) => {
                lexer.advance();
                lexer.advance();
                Arrow
            }
            (b'<', Some(b'<')) if three == Some(b'=') => {
                lexer.advance();
                lexer.advance();
                lexer.advance();
                ShlAssign
            }
            (b'>', Some(b'>')) if three == Some(b'=') => {
                lexer.advance();
                lexer.advance();
                lexer.advance();
                ShrAssign
            }
            (b'<', Some(b'<')) => {
                lexer.advance();
                lexer.advance();
                Shl
            }
            (b'>', Some(b'>')) => {
                lexer.advance();
                lexer.advance();
                Shr
            }
            (b'&', Some(b'&')) => {
                lexer.advance();
                lexer.advance();
                AndAnd
            }
            (b'|', Some(b'|')) => {
                lexer.advance();
                lexer.advance();
                OrOr
            }
            (b'=', Some(b'=')) => {
                lexer.advance();
                lexer.advance();
                EqEq
            }
            (b'!', Some(b'=')) => {
                lexer.advance();
                lexer.advance();
                NotEq
            }
            (b'<', Some(b'=')) => {
                lexer.advance();
                lexer.advance();
                Le
            }
            (b'>', Some(b'=')) => {
                lexer.advance();
                lexer.advance();
                Ge
            }
            (b'+', Some(b'=')) => {
                lexer.advance();
                lexer.advance();
                PlusAssign
            }
            (b'-', Some(b'=')) => {
                lexer.advance();
                lexer.advance();
                MinusAssign
            }
            (b'*', Some(b'=')) => {
                lexer.advance();
                lexer.advance();
                StarAssign
            }
            (b'/', Some(b'=')) => {
                lexer.advance();
                lexer.advance();
                SlashAssign
            }
            (b'%', Some(b'=')) => {
                lexer.advance();
                lexer.advance();
                PercentAssign
            }
            (b'&', Some(b'=')) => {
                lexer.advance();
                lexer.advance();
                AndAssign
            }
            (b'|', Some(b'=')) => {
                lexer.advance();
                lexer.advance();
                OrAssign
            }
            (b'^', Some(b'=')) => {
                lexer.advance();
                lexer.advance();
                XorAssign
            }
            _ => {
                lexer.advance();
                match c {
                    b'{' => LBrace,
                    b'}' => RBrace,
                    b'(' => LParen,
                    b')' => RParen,
                    b'[' => LBracket,
                    b']' => RBracket,
                    b';' => Semicolon,
                    b',' => Comma,
                    b':' => Colon,
                    b'?' => Question,
                    b'=' => Assign,
                    b'+' => Plus,
                    b'-' => Minus,
                    b'*' => Star,
                    b'/' => Slash,
                    b'%' => Percent,
                    b'<' => Lt,
                    b'>' => Gt,
                    b'&' => Amp,
                    b'|' => Pipe,
                    b'^' => Caret,
                    b'~' => Tilde,
                    b'!' => Not,
                    b'.' => Dot,
                    other => {
                        return Err(lexer.fail(pos, format!("unexpected character '{}'", other as char)));
                    }
                }
            }
        };
        let _ = had_whitespace;
        lexer.push(kind, pos);
    }

    Ok(lexer.tokens)
}

#[cfg(test)]
mod tests {
    use super::*;
    use picoc_core::Interner;

    fn kinds(src: &str) -> Vec<TokenKind> {
        let mut interner = Interner::new();
        lex("t.c", src, &mut interner).unwrap().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn lexes_integer_and_arithmetic() {
        let ks = kinds("1+2*3");
        assert_eq!(
            ks,
            vec![
                TokenKind::IntLiteral { value: 1, is_unsigned: false, is_long: false },
                TokenKind::Plus,
                TokenKind::IntLiteral { value: 2, is_unsigned: false, is_long: false },
                TokenKind::Star,
                TokenKind::IntLiteral { value: 3, is_unsigned: false, is_long: false },
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn identifier_followed_by_paren_is_macro_open() {
        let ks = kinds("foo(x)");
        assert!(matches!(ks[0], TokenKind::Identifier(_)));
        assert_eq!(ks[1], TokenKind::MacroOpenParen);
    }

    #[test]
    fn identifier_then_space_then_paren_is_plain_lparen() {
        let ks = kinds("foo (x)");
        assert!(matches!(ks[0], TokenKind::Identifier(_)));
        assert_eq!(ks[1], TokenKind::LParen);
    }

    #[test]
    fn skips_line_and_block_comments() {
        let ks = kinds("1 // comment\n+ /* block */ 2");
        assert_eq!(
            ks,
            vec![
                TokenKind::IntLiteral { value: 1, is_unsigned: false, is_long: false },
                TokenKind::Plus,
                TokenKind::IntLiteral { value: 2, is_unsigned: false, is_long: false },
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn hex_and_octal_literals() {
        assert_eq!(kinds("0x1F")[0], TokenKind::IntLiteral { value: 31, is_unsigned: false, is_long: false });
        assert_eq!(kinds("010")[0], TokenKind::IntLiteral { value: 8, is_unsigned: false, is_long: false });
    }

    #[test]
    fn string_literal_with_escapes() {
        let mut interner = Interner::new();
        let toks = lex("t.c", "\"hi\\n\"", &mut interner).unwrap();
        match &toks[0].kind {
            TokenKind::StringLiteral(atom) => assert_eq!(interner.resolve(*atom), "hi\n"),
            other => panic!("expected string literal, got {other:?}"),
        }
    }

    #[test]
    fn unterminated_string_is_an_error() {
        let mut interner = Interner::new();
        assert!(lex("t.c", "\"unterminated", &mut interner).is_err());
    }

    #[test]
    fn preprocessor_directives_are_tokenised() {
        let ks = kinds("#define SQ(x) ((x)*(x))");
        assert_eq!(ks[0], TokenKind::HashDefine);
    }
}
