//! Size-reducing rewrite passes over generated code.
//!
//! Every pass lexes its input, rewrites tokens and renders text again. Passes run in a fixed
//! order and none may grow its input.
//!
//! The passes assume codegen output: names in [`ABBREVIATIONS`] are renamed wherever they occur,
//! member positions included, so arbitrary scripts are not safe input.

use crate::{
    foundation::error::{FuseError, FuseResult},
    reconstruct::lexer::{Token, TokenKind, lex, render},
};

#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct PassStat {
    pub pass: String,
    pub bytes_before: usize,
    pub bytes_after: usize,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct CompressionStats {
    pub passes: Vec<PassStat>,
}

impl CompressionStats {
    pub fn input_bytes(&self) -> usize {
        self.passes.first().map(|p| p.bytes_before).unwrap_or(0)
    }

    pub fn output_bytes(&self) -> usize {
        self.passes.last().map(|p| p.bytes_after).unwrap_or(0)
    }

    /// `output / input`; 1.0 for empty input.
    pub fn ratio(&self) -> f64 {
        match self.input_bytes() {
            0 => 1.0,
            n => self.output_bytes() as f64 / n as f64,
        }
    }
}

type Pass = fn(&str) -> String;

const PASSES: &[(&str, Pass)] = &[
    ("strip_comments", strip_comments),
    ("collapse_whitespace", collapse_whitespace),
    ("normalize_punctuation", normalize_punctuation),
    ("abbreviate_tokens", abbreviate_tokens),
    ("reformulate", reformulate),
];

/// Run every pass in order, failing if any pass grows its input.
#[tracing::instrument(skip_all, fields(bytes = code.len()))]
pub(crate) fn compress(code: &str) -> FuseResult<(String, CompressionStats)> {
    let mut stats = CompressionStats::default();
    let out = run_passes(code, PASSES, &mut stats)?;
    Ok((out, stats))
}

/// Passes that completed are recorded in `stats` even when a later pass fails.
fn run_passes(
    code: &str,
    passes: &[(&str, Pass)],
    stats: &mut CompressionStats,
) -> FuseResult<String> {
    let mut cur = code.to_owned();
    for (name, pass) in passes {
        let next = pass(&cur);
        if next.len() > cur.len() {
            return Err(FuseError::reconstruction(format!(
                "compression pass '{name}' grew output from {} to {} bytes",
                cur.len(),
                next.len()
            )));
        }
        tracing::trace!(pass = name, before = cur.len(), after = next.len());
        stats.passes.push(PassStat {
            pass: (*name).to_owned(),
            bytes_before: cur.len(),
            bytes_after: next.len(),
        });
        cur = next;
    }
    Ok(cur)
}

pub(crate) fn strip_comments(code: &str) -> String {
    let tokens = lex(code);
    let mut out: Vec<Token> = Vec::with_capacity(tokens.len());
    for (i, t) in tokens.iter().enumerate() {
        if !t.is_comment() {
            out.push(t.clone());
            continue;
        }
        let prev_ws = out.last().is_none_or(|p| p.kind == TokenKind::Whitespace);
        let next_ws = tokens
            .get(i + 1)
            .is_none_or(|n| n.kind == TokenKind::Whitespace);
        if t.kind == TokenKind::BlockComment && t.text.contains('\n') {
            out.push(Token::new(TokenKind::Whitespace, "\n"));
        } else if !(prev_ws || next_ws) {
            out.push(Token::new(TokenKind::Whitespace, " "));
        }
    }
    render(&out)
}

/// Each whitespace run becomes a single newline (if it had one) or a single space. Leading and
/// trailing whitespace is removed.
pub(crate) fn collapse_whitespace(code: &str) -> String {
    let tokens = lex(code.trim());
    let out = tokens
        .into_iter()
        .map(|t| {
            if t.kind != TokenKind::Whitespace {
                t
            } else if t.text.contains('\n') {
                Token::new(TokenKind::Whitespace, "\n")
            } else {
                Token::new(TokenKind::Whitespace, " ")
            }
        })
        .collect::<Vec<_>>();
    render(&out)
}

// Keywords after which a line break terminates the statement.
const RESTRICTED_PRODUCTIONS: &[&str] = &["return", "break", "continue", "throw", "yield", "async"];

fn ends_operand(t: &Token) -> bool {
    matches!(
        t.kind,
        TokenKind::Word | TokenKind::Number | TokenKind::Str | TokenKind::Template
    ) || [")", "]", "}"].iter().any(|p| t.is_punct(p))
}

fn starts_operand(t: &Token) -> bool {
    matches!(
        t.kind,
        TokenKind::Word | TokenKind::Number | TokenKind::Str | TokenKind::Template
    ) || t.is_punct("++")
        || t.is_punct("--")
}

/// Joining `a` and `b` with nothing in between lexes back into the same two tokens.
fn glues_cleanly(a: &Token, b: &Token) -> bool {
    let joined = lex(&format!("{}{}", a.text, b.text));
    joined.len() == 2 && joined[0] == *a && joined[1] == *b
}

/// Drop whitespace wherever the neighbours stay distinct tokens and no line break is needed
/// for automatic semicolon insertion.
pub(crate) fn normalize_punctuation(code: &str) -> String {
    let tokens = lex(code);
    let mut out: Vec<Token> = Vec::with_capacity(tokens.len());
    for (i, t) in tokens.iter().enumerate() {
        if t.kind != TokenKind::Whitespace {
            out.push(t.clone());
            continue;
        }
        let (Some(prev), Some(next)) = (out.last(), tokens.get(i + 1)) else {
            continue;
        };
        let newline = t.text.contains('\n');
        let asi_sensitive = newline
            && ((prev.kind == TokenKind::Word
                && RESTRICTED_PRODUCTIONS.contains(&prev.text.as_str()))
                || (ends_operand(prev) && starts_operand(next)));
        if asi_sensitive || !glues_cleanly(prev, next) {
            let ws = if newline { "\n" } else { " " };
            out.push(Token::new(TokenKind::Whitespace, ws));
        }
    }
    render(&out)
}

/// Codegen-owned member names and their short forms. Only identifiers the generator itself
/// introduces are listed; external APIs and serialized keys are never renamed.
pub(crate) const ABBREVIATIONS: &[(&str, &str)] = &[
    ("originalEssence", "oE"),
    ("enhancedProperties", "eP"),
    ("moduleIntegrations", "mI"),
    ("evolution", "eV"),
    ("fusionIntensity", "fI"),
    ("isRunning", "iR"),
    ("frameHandle", "fH"),
    ("applyEnhancements", "aE"),
    ("spawnParticle", "sP"),
    ("deltaTime", "dt"),
    ("timestamp", "ts"),
];

fn significant_before(tokens: &[Token], i: usize) -> Option<&Token> {
    tokens[..i].iter().rev().find(|t| !t.is_trivia())
}

fn significant_after(tokens: &[Token], i: usize) -> Option<&Token> {
    tokens.get(i + 1..)?.iter().find(|t| !t.is_trivia())
}

/// Shorten codegen-owned identifiers and boolean literals (`true` → `!0`, `false` → `!1`).
pub(crate) fn abbreviate_tokens(code: &str) -> String {
    let tokens = lex(code);
    let mut out = Vec::with_capacity(tokens.len() + 8);
    for (i, t) in tokens.iter().enumerate() {
        if t.kind != TokenKind::Word {
            out.push(t.clone());
            continue;
        }
        if let Some((_, short)) = ABBREVIATIONS.iter().find(|(long, _)| *long == t.text) {
            out.push(Token::new(TokenKind::Word, *short));
            continue;
        }
        let is_member = significant_before(&tokens, i).is_some_and(|p| p.is_punct("."));
        let is_key = significant_after(&tokens, i).is_some_and(|n| n.is_punct(":"))
            && significant_before(&tokens, i).is_some_and(|p| p.is_punct("{") || p.is_punct(","));
        let bit = match t.text.as_str() {
            "true" => Some("0"),
            "false" => Some("1"),
            _ => None,
        };
        match bit {
            Some(bit) if !is_member && !is_key => {
                out.push(Token::new(TokenKind::Punct, "!"));
                out.push(Token::new(TokenKind::Number, bit));
            }
            _ => out.push(t.clone()),
        }
    }
    render(&out)
}

/// Pattern rewrites: anonymous function expressions to arrows, and boolean literal
/// comparisons elided.
pub(crate) fn reformulate(code: &str) -> String {
    let tokens = lex(code)
        .into_iter()
        .filter(|t| t.kind != TokenKind::Whitespace || t.text.contains('\n'))
        .collect::<Vec<_>>();
    // Only single spaces were dropped above; they are restored by re-gluing below.
    let tokens = arrowize_functions(tokens);
    let tokens = elide_boolean_comparisons(tokens);
    render(&respace(tokens))
}

/// Reinsert a single space between neighbours that would otherwise merge.
fn respace(tokens: Vec<Token>) -> Vec<Token> {
    let mut out: Vec<Token> = Vec::with_capacity(tokens.len());
    for t in tokens {
        if let Some(prev) = out.last()
            && prev.kind != TokenKind::Whitespace
            && t.kind != TokenKind::Whitespace
            && !glues_cleanly(prev, &t)
        {
            out.push(Token::new(TokenKind::Whitespace, " "));
        }
        out.push(t);
    }
    out
}

fn matching(tokens: &[Token], open_at: usize, open: &str, close: &str) -> Option<usize> {
    let mut depth = 0usize;
    for (j, t) in tokens.iter().enumerate().skip(open_at) {
        if t.is_punct(open) {
            depth += 1;
        } else if t.is_punct(close) {
            depth = depth.checked_sub(1)?;
            if depth == 0 {
                return Some(j);
            }
        }
    }
    None
}

fn next_significant(tokens: &[Token], from: usize) -> Option<usize> {
    (from..tokens.len()).find(|&j| !tokens[j].is_trivia())
}

// Positions where an arrow function is a valid drop-in for a function expression.
const ARROW_PRECEDERS: &[&str] = &["(", ",", "=", ":", "?"];
const ARROW_FOLLOWERS: &[&str] = &[")", ",", ";", "}", "]", ":"];
const ARROW_BLOCKERS: &[&str] = &["this", "arguments", "super", "new"];

fn arrowize_functions(mut tokens: Vec<Token>) -> Vec<Token> {
    let mut i = 0;
    while i < tokens.len() {
        if let Some(rewritten) = try_arrowize(&tokens, i) {
            tokens = rewritten;
        }
        i += 1;
    }
    tokens
}

fn try_arrowize(tokens: &[Token], i: usize) -> Option<Vec<Token>> {
    if !tokens[i].is_word("function") {
        return None;
    }
    let prev = significant_before(tokens, i)?;
    let prev_ok = ARROW_PRECEDERS.iter().any(|p| prev.is_punct(p)) || prev.is_word("return");
    if !prev_ok {
        return None;
    }
    let lparen = next_significant(tokens, i + 1)?;
    if !tokens[lparen].is_punct("(") {
        return None;
    }
    let rparen = matching(tokens, lparen, "(", ")")?;
    let lbrace = next_significant(tokens, rparen + 1)?;
    if !tokens[lbrace].is_punct("{") {
        return None;
    }
    let rbrace = matching(tokens, lbrace, "{", "}")?;
    if tokens[lparen..=rbrace]
        .iter()
        .any(|t| ARROW_BLOCKERS.iter().any(|w| t.is_word(w)))
    {
        return None;
    }
    match next_significant(tokens, rbrace + 1) {
        None => {}
        Some(j) if ARROW_FOLLOWERS.iter().any(|p| tokens[j].is_punct(p)) => {}
        Some(_) => return None,
    }

    let mut out = Vec::with_capacity(tokens.len());
    out.extend_from_slice(&tokens[..i]);
    out.extend_from_slice(&tokens[lparen..=rparen]);
    out.push(Token::new(TokenKind::Punct, "=>"));
    out.extend_from_slice(&tokens[lbrace..]);
    Some(out)
}

const COMPARISON_PRECEDERS: &[&str] = &["(", "&&", "||", "?", ",", "=", ":"];
const COMPARISON_FOLLOWERS: &[&str] = &[")", "&&", "||", "?", ",", ";", ":"];

/// `true`/`false` in either spelled-out or abbreviated (`!0`/`!1`) form. Returns the literal
/// value and its token length.
fn bool_literal(tokens: &[Token], at: usize) -> Option<(bool, usize)> {
    let t = tokens.get(at)?;
    if t.is_word("true") {
        return Some((true, 1));
    }
    if t.is_word("false") {
        return Some((false, 1));
    }
    let n = tokens.get(at + 1)?;
    if t.is_punct("!") && n.kind == TokenKind::Number {
        return match n.text.as_str() {
            "0" => Some((true, 2)),
            "1" => Some((false, 2)),
            _ => None,
        };
    }
    None
}

/// Start index of the member chain `a.b.c` ending at `end` (inclusive), if any.
fn member_chain_start(tokens: &[Token], end: usize) -> Option<usize> {
    if tokens.get(end)?.kind != TokenKind::Word {
        return None;
    }
    let mut start = end;
    while start >= 2 && tokens[start - 1].is_punct(".") && tokens[start - 2].kind == TokenKind::Word
    {
        start -= 2;
    }
    Some(start)
}

/// `x.y === true` → `x.y`, `x.y === false` → `!x.y` (and the `!==` / `==` / `!=` variants).
///
/// Only member chains in a delimited condition position are rewritten. This treats the
/// operand as a boolean: for non-boolean values strict comparison and truthiness differ, so the
/// rewrite is only sound for boolean-valued operands.
fn elide_boolean_comparisons(mut tokens: Vec<Token>) -> Vec<Token> {
    let mut i = 0;
    while i < tokens.len() {
        let op = &tokens[i];
        let negated_op = op.is_punct("!==") || op.is_punct("!=");
        if !(op.is_punct("===") || op.is_punct("==") || negated_op) || i == 0 {
            i += 1;
            continue;
        }
        let Some((lit, lit_len)) = bool_literal(&tokens, i + 1) else {
            i += 1;
            continue;
        };
        let Some(start) = member_chain_start(&tokens, i - 1) else {
            i += 1;
            continue;
        };
        let before_ok = start > 0
            && COMPARISON_PRECEDERS
                .iter()
                .any(|p| tokens[start - 1].is_punct(p));
        let after_ok = tokens
            .get(i + 1 + lit_len)
            .is_some_and(|t| COMPARISON_FOLLOWERS.iter().any(|p| t.is_punct(p)));
        if !(before_ok && after_ok) {
            i += 1;
            continue;
        }

        let keep_truthy = lit != negated_op;
        let operand = tokens[start..i].to_vec();
        let mut replacement = Vec::with_capacity(operand.len() + 1);
        if !keep_truthy {
            replacement.push(Token::new(TokenKind::Punct, "!"));
        }
        replacement.extend(operand);
        let replaced_len = replacement.len();
        let tail = tokens.split_off(i + 1 + lit_len);
        tokens.truncate(start);
        tokens.extend(replacement);
        tokens.extend(tail);
        i = start + replaced_len;
    }
    tokens
}

#[cfg(test)]
mod tests {
    use super::*;

    fn normalize_trivia(code: &str) -> String {
        collapse_whitespace(&strip_comments(code))
    }

    #[test]
    fn strip_comments_keeps_string_contents() {
        let src = "const a = '/* keep */'; /* drop */ const b = \"// keep\"; // drop\n";
        let out = strip_comments(src);
        assert!(out.contains("'/* keep */'"));
        assert!(out.contains("\"// keep\""));
        assert!(!out.contains("drop"));
    }

    #[test]
    fn strip_comments_never_glues_tokens() {
        assert_eq!(strip_comments("a/*x*/b"), "a b");
        assert_eq!(strip_comments("a /*x*/ b"), "a  b");
    }

    #[test]
    fn trivia_normalization_is_idempotent() {
        let src = "  // head\nclass A {\n\n   /* note\n */  m() {   return 1; } // tail\n}\n\n";
        let once = normalize_trivia(src);
        assert_eq!(normalize_trivia(&once), once);
        assert_eq!(once, "class A {\nm() { return 1; }\n}");
    }

    #[test]
    fn punctuation_spacing_respects_operator_fusion() {
        assert_eq!(normalize_punctuation("a = b + +c;"), "a=b+ +c;");
        assert_eq!(normalize_punctuation("x = y - -z;"), "x=y- -z;");
        assert_eq!(normalize_punctuation("let v = 1 ;"), "let v=1;");
        assert_eq!(normalize_punctuation("a / /re/"), "a/ /re/");
    }

    #[test]
    fn punctuation_spacing_keeps_asi_line_breaks() {
        assert_eq!(normalize_punctuation("return\nvalue"), "return\nvalue");
        assert_eq!(normalize_punctuation("a = b\nc = d"), "a=b\nc=d");
        assert_eq!(normalize_punctuation("f();\ng();"), "f();g();");
        assert_eq!(normalize_punctuation("x\n++y"), "x\n++y");
    }

    #[test]
    fn abbreviation_skips_strings_members_and_keys() {
        let src = "this.isRunning = true; s = \"isRunning true\"; o.true; ({ true: 1 });";
        assert_eq!(
            abbreviate_tokens(src),
            "this.iR = !0; s = \"isRunning true\"; o.true; ({ true: 1 });"
        );
    }

    #[test]
    fn arrow_rewrite_requires_this_free_body() {
        assert_eq!(
            reformulate("const loop=function(ts){self.step(ts);};"),
            "const loop=(ts)=>{self.step(ts);};"
        );
        let bound = "const f=function(){return this.x;};";
        assert_eq!(reformulate(bound), bound);
        let named = "const g=function named(){};";
        assert_eq!(reformulate(named), named);
        let chained = "x=function(){}.bind(o);";
        assert_eq!(reformulate(chained), chained);
        let logical = "x=y||function(){};";
        assert_eq!(reformulate(logical), logical);
    }

    #[test]
    fn boolean_comparisons_are_elided() {
        assert_eq!(reformulate("if(this.iR===!0){}"), "if(this.iR){}");
        assert_eq!(reformulate("if(self.iR===!1){}"), "if(!self.iR){}");
        assert_eq!(reformulate("if(a.b!==true&&c){}"), "if(!a.b&&c){}");
        assert_eq!(reformulate("if(ok==false)"), "if(!ok)");
        // Compound operands are left alone.
        let compound = "if(a+b===!0){}";
        assert_eq!(reformulate(compound), compound);
    }

    #[test]
    fn reformulate_keeps_required_spaces() {
        assert_eq!(reformulate("return value;"), "return value;");
        assert_eq!(
            reformulate("const x=function(){return !0;};"),
            "const x=()=>{return!0;};"
        );
    }

    #[test]
    fn compress_never_grows_and_reports_passes() {
        let src = "// c\nfunction f(a) {\n  return a === true;\n}\n";
        let (out, stats) = compress(src).unwrap();
        assert!(out.len() <= src.len());
        assert_eq!(stats.passes.len(), PASSES.len());
        for (p, (name, _)) in stats.passes.iter().zip(PASSES) {
            assert_eq!(p.pass, *name);
            assert!(p.bytes_after <= p.bytes_before);
        }
        assert_eq!(stats.input_bytes(), src.len());
        assert_eq!(stats.output_bytes(), out.len());
        assert!(stats.ratio() < 1.0);
    }

    #[test]
    fn growing_pass_is_a_reconstruction_error() {
        fn pad(code: &str) -> String {
            format!("{code};;")
        }
        let passes: &[(&str, Pass)] = &[
            ("strip_comments", strip_comments),
            ("pad", pad),
            ("collapse_whitespace", collapse_whitespace),
        ];
        let mut stats = CompressionStats::default();
        let err = run_passes("a; // c\n", passes, &mut stats).unwrap_err();
        assert!(matches!(err, FuseError::Reconstruction(_)));
        assert!(err.to_string().contains("'pad'"));
        let recorded = stats.passes.iter().map(|p| p.pass.as_str()).collect::<Vec<_>>();
        assert_eq!(recorded, vec!["strip_comments"]);
    }

    #[test]
    fn particle_fixture_compresses_monotonically() {
        let src = include_str!("../../tests/data/particles.js");
        let (out, stats) = compress(src).unwrap();
        assert!(out.len() < src.len());
        for p in &stats.passes {
            assert!(p.bytes_after <= p.bytes_before, "{}", p.pass);
        }
        let once = normalize_trivia(src);
        assert_eq!(normalize_trivia(&once), once);
    }
}
