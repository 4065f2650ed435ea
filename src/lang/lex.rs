use super::token::{Token, TokenTag};
use super::Error;

type Result<T> = std::result::Result<T, Error>;

fn is_space(b: u8) -> bool {
    b == b' ' || b == b'\t'
}

fn is_digit(b: u8) -> bool {
    b.is_ascii_digit()
}

fn is_alpha(b: u8) -> bool {
    b.is_ascii_alphabetic()
}

fn is_rest_ident(b: u8) -> bool {
    is_digit(b) || is_alpha(b) || b == b'_'
}

/// The identifiers `not`, `and`, `or`, `xor` are operators in disguise.
fn shadow_tag(ident: &str) -> Option<TokenTag> {
    static SHADOWS: &[(TokenTag, &str)] = &[
        (TokenTag::Neq, "not"),
        (TokenTag::BAnd, "and"),
        (TokenTag::BOr, "or"),
        (TokenTag::BXor, "xor"),
    ];
    SHADOWS
        .iter()
        .find(|(_, word)| word.eq_ignore_ascii_case(ident))
        .map(|(tag, _)| *tag)
}

/// Character-driven scanner over preprocessed text. Emits one token per
/// call; at end of input it keeps answering EOF.
pub struct Tokenizer<'a> {
    src: &'a str,
    cursor: usize,
    line: usize,
}

impl<'a> Tokenizer<'a> {
    pub fn new(src: &'a str) -> Tokenizer<'a> {
        Tokenizer {
            src,
            cursor: 0,
            line: 0,
        }
    }

    fn peek(&self, offset: usize) -> u8 {
        *self.src.as_bytes().get(self.cursor + offset).unwrap_or(&0)
    }

    fn advance(&mut self, n: usize) {
        self.cursor = (self.cursor + n).min(self.src.len());
    }

    /// Consumes `=` when it follows, selecting the compound-assignment
    /// tag over the plain operator.
    fn op_or_assign(&mut self, op: TokenTag, assign: TokenTag) -> TokenTag {
        self.advance(1);
        if self.peek(0) == b'=' {
            self.advance(1);
            assign
        } else {
            op
        }
    }

    pub fn next_token(&mut self) -> Result<Token> {
        let mut left_space = false;
        loop {
            let begin = self.cursor;
            let line = self.line;
            let mut content: Option<String> = None;

            let tag = match self.peek(0) {
                0 => TokenTag::Eof,

                b'\r' | b'\x0c' => {
                    self.advance(1);
                    continue;
                }

                b'\n' => {
                    self.advance(1);
                    self.line += 1;
                    TokenTag::Eol
                }

                b':' => {
                    self.advance(1);
                    TokenTag::Eos
                }

                b'%' => {
                    self.advance(1);
                    TokenTag::PpArg
                }

                b'{' => {
                    self.advance(1);
                    TokenTag::LBrace
                }
                b'}' => {
                    self.advance(1);
                    TokenTag::RBrace
                }
                b'(' => {
                    self.advance(1);
                    TokenTag::LParen
                }
                b')' => {
                    self.advance(1);
                    TokenTag::RParen
                }
                b',' => {
                    self.advance(1);
                    TokenTag::Comma
                }

                b'|' => self.op_or_assign(TokenTag::BOr, TokenTag::BOrAssign),
                b'&' => self.op_or_assign(TokenTag::BAnd, TokenTag::BAndAssign),
                b'^' => self.op_or_assign(TokenTag::BXor, TokenTag::BXorAssign),
                b'>' => self.op_or_assign(TokenTag::Gt, TokenTag::GtOrEq),
                b'<' => self.op_or_assign(TokenTag::Lt, TokenTag::LtOrEq),
                b'+' => self.op_or_assign(TokenTag::Add, TokenTag::AddAssign),
                b'-' => self.op_or_assign(TokenTag::Sub, TokenTag::SubAssign),
                b'*' => self.op_or_assign(TokenTag::Mul, TokenTag::MulAssign),
                b'\\' => self.op_or_assign(TokenTag::Mod, TokenTag::ModAssign),
                b'=' => self.op_or_assign(TokenTag::Assign, TokenTag::Eq),

                b'!' => {
                    self.advance(1);
                    if self.peek(0) == b'=' {
                        self.advance(1);
                        TokenTag::Neq
                    } else {
                        return Err(error!(LexicalError, line; "unexpected character '!'"));
                    }
                }

                b'/' => {
                    if self.peek(1) == b'/' {
                        self.advance(2);
                        while self.peek(0) != b'\n' && self.peek(0) != 0 {
                            self.advance(1);
                        }
                        continue;
                    }
                    if self.peek(1) == b'*' {
                        self.advance(2);
                        loop {
                            match self.peek(0) {
                                0 => {
                                    return Err(error!(LexicalError, self.line;
                                        "end of input inside a multi-line comment"));
                                }
                                b'\n' => {
                                    self.advance(1);
                                    self.line += 1;
                                }
                                b'*' if self.peek(1) == b'/' => {
                                    self.advance(2);
                                    break;
                                }
                                _ => self.advance(1),
                            }
                        }
                        continue;
                    }
                    self.op_or_assign(TokenTag::Div, TokenTag::DivAssign)
                }

                b';' => {
                    self.advance(1);
                    while self.peek(0) != b'\n' && self.peek(0) != 0 {
                        self.advance(1);
                    }
                    continue;
                }

                b'"' => {
                    self.advance(1);
                    let start = self.cursor;
                    loop {
                        match self.peek(0) {
                            0 => {
                                return Err(error!(LexicalError, line;
                                    "end of input inside a string literal"));
                            }
                            b'"' => break,
                            b'\\' if self.peek(1) == b'"' => self.advance(2),
                            _ => self.advance(1),
                        }
                    }
                    content = Some(unescape(&self.src[start..self.cursor], line)?);
                    self.advance(1);
                    TokenTag::Str
                }

                b if is_space(b) => {
                    left_space = true;
                    while is_space(self.peek(0)) {
                        self.advance(1);
                    }
                    continue;
                }

                b if is_digit(b) => {
                    // A leading zero is a number on its own.
                    if b == b'0' {
                        self.advance(1);
                    } else {
                        while is_digit(self.peek(0)) {
                            self.advance(1);
                        }
                    }
                    if self.peek(0) == b'.' {
                        self.advance(1);
                        while is_digit(self.peek(0)) {
                            self.advance(1);
                        }
                        TokenTag::Real
                    } else {
                        TokenTag::Integer
                    }
                }

                b if is_alpha(b) => {
                    self.advance(1);
                    while is_rest_ident(self.peek(0)) {
                        self.advance(1);
                    }
                    shadow_tag(&self.src[begin..self.cursor]).unwrap_or(TokenTag::Identifier)
                }

                b => {
                    return Err(error!(LexicalError, line;
                        format!("unreadable character '{}'", b as char)));
                }
            };

            let end = self.cursor;
            return Ok(Token {
                tag,
                content: content.unwrap_or_else(|| self.src[begin..end].to_string()),
                begin,
                end,
                line,
                left_space,
                right_space: is_space(self.peek(0)),
            });
        }
    }
}

fn unescape(s: &str, line: usize) -> Result<String> {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        match chars.next() {
            Some('t') => out.push('\t'),
            Some('n') => out.push('\n'),
            Some('"') => out.push('"'),
            other => {
                let what = other.map(|c| c.to_string()).unwrap_or_default();
                return Err(error!(LexicalError, line;
                    format!("unknown escape sequence \\{}", what)));
            }
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex_all(src: &str) -> Vec<Token> {
        let mut tokenizer = Tokenizer::new(src);
        let mut out = vec![];
        loop {
            let token = tokenizer.next_token().unwrap();
            let done = token.tag == TokenTag::Eof;
            out.push(token);
            if done {
                break;
            }
        }
        out
    }

    fn tags(src: &str) -> Vec<TokenTag> {
        lex_all(src).iter().map(|t| t.tag).collect()
    }

    #[test]
    fn test_simple_statement() {
        use TokenTag::*;
        assert_eq!(
            tags("a = 1 + 2"),
            vec![Identifier, Assign, Integer, Add, Integer, Eof]
        );
    }

    #[test]
    fn test_compound_assign_operators() {
        use TokenTag::*;
        assert_eq!(
            tags("a += 1 : a \\= 2 : a ^= 3"),
            vec![
                Identifier, AddAssign, Integer, Eos, Identifier, ModAssign, Integer, Eos,
                Identifier, BXorAssign, Integer, Eof
            ]
        );
    }

    #[test]
    fn test_shadow_identifiers() {
        use TokenTag::*;
        assert_eq!(
            tags("1 and 2 or 3 xor 4 not 5"),
            vec![Integer, BAnd, Integer, BOr, Integer, BXor, Integer, Neq, Integer, Eof]
        );
    }

    #[test]
    fn test_leading_zero_is_single() {
        let tokens = lex_all("007");
        let contents: Vec<&str> = tokens.iter().map(|t| t.content.as_str()).collect();
        assert_eq!(contents, vec!["0", "0", "7", ""]);
    }

    #[test]
    fn test_real_literal() {
        let tokens = lex_all("3.14 0.5");
        assert_eq!(tokens[0].tag, TokenTag::Real);
        assert_eq!(tokens[0].content, "3.14");
        assert_eq!(tokens[1].tag, TokenTag::Real);
        assert_eq!(tokens[1].content, "0.5");
    }

    #[test]
    fn test_string_escapes() {
        let tokens = lex_all(r#""a\tb\n\"c""#);
        assert_eq!(tokens[0].tag, TokenTag::Str);
        assert_eq!(tokens[0].content, "a\tb\n\"c");
    }

    #[test]
    fn test_unknown_escape_is_error() {
        let mut tokenizer = Tokenizer::new(r#""a\z""#);
        assert!(tokenizer.next_token().is_err());
    }

    #[test]
    fn test_unterminated_string_is_error() {
        let mut tokenizer = Tokenizer::new(r#""abc"#);
        assert!(tokenizer.next_token().is_err());
    }

    #[test]
    fn test_comments() {
        use TokenTag::*;
        assert_eq!(tags("1 ; rest\n2 // rest\n3"), vec![
            Integer, Eol, Integer, Eol, Integer, Eof
        ]);
        assert_eq!(tags("1 /* a\nb */ 2"), vec![Integer, Integer, Eof]);
    }

    #[test]
    fn test_unterminated_comment_is_error() {
        let mut tokenizer = Tokenizer::new("/* no end");
        assert!(tokenizer.next_token().is_err());
    }

    #[test]
    fn test_space_adjacency() {
        let tokens = lex_all("a (b)");
        assert!(!tokens[0].left_space);
        assert!(tokens[0].right_space);
        assert!(tokens[1].left_space);
        let tokens = lex_all("a(b)");
        assert!(!tokens[0].right_space);
        assert!(!tokens[1].left_space);
    }

    #[test]
    fn test_bare_bang_is_error() {
        let mut tokenizer = Tokenizer::new("a ! b");
        assert!(tokenizer.next_token().is_ok());
        assert!(tokenizer.next_token().is_err());
    }

    #[test]
    fn test_line_numbers() {
        let tokens = lex_all("a\nb\nc");
        let lines: Vec<usize> = tokens.iter().map(|t| t.line).collect();
        assert_eq!(lines, vec![0, 0, 1, 1, 2, 2]);
    }
}
