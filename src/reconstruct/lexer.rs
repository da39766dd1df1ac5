//! Lightweight JavaScript tokenizer for the compression passes.
//!
//! Strings, template literals and comments are atomic tokens, so rewriting passes never touch
//! their contents. Regex literals are not recognised: a `/` is always punctuation. The lexer is
//! total and lossless: concatenating token texts reproduces the input exactly.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TokenKind {
    Whitespace,
    LineComment,
    BlockComment,
    Str,
    Template,
    Word,
    Number,
    Punct,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Token {
    pub(crate) kind: TokenKind,
    pub(crate) text: String,
}

impl Token {
    pub(crate) fn new(kind: TokenKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
        }
    }

    pub(crate) fn is_trivia(&self) -> bool {
        matches!(
            self.kind,
            TokenKind::Whitespace | TokenKind::LineComment | TokenKind::BlockComment
        )
    }

    pub(crate) fn is_comment(&self) -> bool {
        matches!(self.kind, TokenKind::LineComment | TokenKind::BlockComment)
    }

    pub(crate) fn is_punct(&self, p: &str) -> bool {
        self.kind == TokenKind::Punct && self.text == p
    }

    pub(crate) fn is_word(&self, w: &str) -> bool {
        self.kind == TokenKind::Word && self.text == w
    }
}

// Longest first.
const MULTI_PUNCT: &[&str] = &[
    ">>>=", "===", "!==", "**=", "<<=", ">>=", ">>>", "...", "&&=", "||=", "??=", "=>", "==",
    "!=", "<=", ">=", "&&", "||", "??", "?.", "++", "--", "+=", "-=", "*=", "/=", "%=", "&=",
    "|=", "^=", "**", "<<", ">>",
];

fn is_word_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == '$'
}

fn is_word_continue(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

pub(crate) fn lex(input: &str) -> Vec<Token> {
    let mut out = Vec::new();
    let bytes = input.as_bytes();
    let mut i = 0usize;

    while i < input.len() {
        let rest = &input[i..];
        let Some(c) = rest.chars().next() else {
            break;
        };
        let start = i;

        let kind = if c.is_whitespace() {
            i += rest
                .char_indices()
                .find(|(_, ch)| !ch.is_whitespace())
                .map(|(n, _)| n)
                .unwrap_or(rest.len());
            TokenKind::Whitespace
        } else if rest.starts_with("//") {
            i += rest.find('\n').unwrap_or(rest.len());
            TokenKind::LineComment
        } else if rest.starts_with("/*") {
            i += rest[2..].find("*/").map(|n| n + 4).unwrap_or(rest.len());
            TokenKind::BlockComment
        } else if c == '"' || c == '\'' || c == '`' {
            i += quoted_len(rest, c);
            if c == '`' {
                TokenKind::Template
            } else {
                TokenKind::Str
            }
        } else if c.is_ascii_digit()
            || (c == '.' && bytes.get(i + 1).is_some_and(|b| b.is_ascii_digit()))
        {
            i += number_len(rest);
            TokenKind::Number
        } else if is_word_start(c) {
            i += rest
                .char_indices()
                .find(|(_, ch)| !is_word_continue(*ch))
                .map(|(n, _)| n)
                .unwrap_or(rest.len());
            TokenKind::Word
        } else {
            i += MULTI_PUNCT
                .iter()
                .find(|p| rest.starts_with(**p))
                .map(|p| p.len())
                .unwrap_or(c.len_utf8());
            TokenKind::Punct
        };

        out.push(Token::new(kind, &input[start..i]));
    }

    out
}

/// Byte length of a quoted literal starting at `rest[0] == quote`. Unterminated literals run to
/// the end of input.
fn quoted_len(rest: &str, quote: char) -> usize {
    let mut escaped = false;
    for (n, ch) in rest.char_indices().skip(1) {
        if escaped {
            escaped = false;
        } else if ch == '\\' {
            escaped = true;
        } else if ch == quote {
            return n + ch.len_utf8();
        }
    }
    rest.len()
}

fn number_len(rest: &str) -> usize {
    let mut prev = '\0';
    for (n, ch) in rest.char_indices() {
        let exponent_sign = matches!(ch, '+' | '-') && matches!(prev, 'e' | 'E') && n > 0;
        if !(ch.is_ascii_alphanumeric() || ch == '.' || ch == '_' || exponent_sign) {
            return n;
        }
        prev = ch;
    }
    rest.len()
}

pub(crate) fn render(tokens: &[Token]) -> String {
    let mut s = String::with_capacity(tokens.iter().map(|t| t.text.len()).sum());
    for t in tokens {
        s.push_str(&t.text);
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<(TokenKind, String)> {
        lex(src).into_iter().map(|t| (t.kind, t.text)).collect()
    }

    #[test]
    fn lexing_is_lossless() {
        for src in [
            "const a = 'x // not a comment'; // real\n/* block */ b === !0",
            "`tmpl ${x}` + \"q\\\"uote\" + 1.5e-3 + .5",
            "unterminated 'string",
            "é = ünïcode + $jq_1;",
            "/* never closed",
        ] {
            assert_eq!(render(&lex(src)), src);
        }
    }

    #[test]
    fn strings_and_comments_are_atomic() {
        let toks = kinds("x = \"a /* b */ c\" /* d */ // e");
        assert_eq!(toks[4], (TokenKind::Str, "\"a /* b */ c\"".to_string()));
        assert_eq!(toks[6], (TokenKind::BlockComment, "/* d */".to_string()));
        assert_eq!(toks[8], (TokenKind::LineComment, "// e".to_string()));
    }

    #[test]
    fn operators_use_longest_match() {
        let toks = kinds("a===b=>c!==d>>>=e");
        let puncts = toks
            .iter()
            .filter(|(k, _)| *k == TokenKind::Punct)
            .map(|(_, t)| t.as_str())
            .collect::<Vec<_>>();
        assert_eq!(puncts, vec!["===", "=>", "!==", ">>>="]);
    }

    #[test]
    fn numbers_keep_exponent_sign() {
        let toks = kinds("1e-5+2");
        assert_eq!(toks[0], (TokenKind::Number, "1e-5".to_string()));
        assert_eq!(toks[1], (TokenKind::Punct, "+".to_string()));
    }
}
