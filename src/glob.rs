//! Wildcard patterns for `<Match pattern="...">`.
//!
//! Patterns are matched against a single file name, case-sensitively:
//!
//! - `*.cs` matches `Program.cs` but not `Program.csproj`
//! - `Form?.resx` matches `Form1.resx`
//! - `[!_]*.cs` matches every `.cs` file not starting with an underscore
//!
//! Uses [`chumsky`] for the parsing grammar.
//!
//! ## Grammar
//!
//! ```text
//! pattern = token*
//! token   = '*' | '?' | class | literal
//! class   = '[' ('!' | '^')? item+ ']'
//! item    = char '-' char | char
//! literal = (any char except '*', '?', '[')+
//! ```

use chumsky::prelude::*;

// ═══════════════════════════════════════════════════════════════════════════════
//  AST
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GlobToken {
    /// Plain text that must match exactly.
    Literal(String),
    /// `*`: any run of characters, including none.
    AnyRun,
    /// `?`: exactly one character.
    AnyChar,
    /// `[abc]`, `[a-z]`, `[!0-9]`.
    Class { negated: bool, items: Vec<ClassItem> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassItem {
    Char(char),
    Range(char, char),
}

impl ClassItem {
    fn contains(self, c: char) -> bool {
        match self {
            Self::Char(x) => x == c,
            Self::Range(lo, hi) => lo <= c && c <= hi,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
//  Chumsky parser
// ═══════════════════════════════════════════════════════════════════════════════

fn glob_parser<'a>() -> impl Parser<'a, &'a str, Vec<GlobToken>, extra::Err<Simple<'a, char>>> {
    // ── [class] ──────────────────────────────────────────────────────────
    let item = none_of(']')
        .then(just('-').ignore_then(none_of(']')).or_not())
        .map(|(lo, hi)| match hi {
            Some(hi) => ClassItem::Range(lo, hi),
            None => ClassItem::Char(lo),
        });

    let class = just('[')
        .ignore_then(one_of("!^").or_not())
        .then(item.repeated().at_least(1).collect::<Vec<_>>())
        .then_ignore(just(']'))
        .map(|(negation, items)| GlobToken::Class { negated: negation.is_some(), items });

    // ── Literal run ──────────────────────────────────────────────────────
    let literal = none_of("*?[")
        .repeated()
        .at_least(1)
        .collect::<String>()
        .map(GlobToken::Literal);

    let token = choice((
        just('*').to(GlobToken::AnyRun),
        just('?').to(GlobToken::AnyChar),
        class,
        literal,
    ));

    token.repeated().collect::<Vec<_>>().then_ignore(end())
}

// ═══════════════════════════════════════════════════════════════════════════════
//  Glob
// ═══════════════════════════════════════════════════════════════════════════════

/// A compiled wildcard pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Glob {
    tokens: Vec<GlobToken>,
}

impl Glob {
    pub fn tokens(&self) -> &[GlobToken] {
        &self.tokens
    }

    /// Whether the whole of `name` matches this pattern.
    pub fn is_match(&self, name: &str) -> bool {
        let chars: Vec<char> = name.chars().collect();
        match_tokens(&self.tokens, &chars)
    }
}

/// Parse a wildcard pattern into a [`Glob`].
pub fn parse_glob(input: &str) -> Result<Glob, String> {
    glob_parser()
        .parse(input)
        .into_result()
        .map(|tokens| Glob { tokens: collapse_runs(tokens) })
        .map_err(|errs| {
            let messages: Vec<String> = errs.iter().map(|e| format!("{e}")).collect();
            format!("Failed to parse pattern '{}': {}", input, messages.join("; "))
        })
}

/// `**` behaves exactly like `*` on a single file name.
fn collapse_runs(tokens: Vec<GlobToken>) -> Vec<GlobToken> {
    let mut out: Vec<GlobToken> = Vec::with_capacity(tokens.len());
    for token in tokens {
        if token == GlobToken::AnyRun && out.last() == Some(&GlobToken::AnyRun) {
            continue;
        }
        out.push(token);
    }
    out
}

/// Star-backtracking match: only the most recent `*` is ever widened, so a
/// pattern of `k` tokens runs in `O(k * name.len())`.
fn match_tokens(tokens: &[GlobToken], name: &[char]) -> bool {
    let (mut t, mut n) = (0, 0);
    // Token index after the last `*`, and the name offset it currently stops at.
    let mut star: Option<(usize, usize)> = None;

    loop {
        if let Some(token) = tokens.get(t) {
            if *token == GlobToken::AnyRun {
                star = Some((t + 1, n));
                t += 1;
                continue;
            }
            if let Some(len) = match_one(token, &name[n..]) {
                t += 1;
                n += len;
                continue;
            }
        } else if n == name.len() {
            return true;
        }

        match star {
            Some((resume, from)) if from < name.len() => {
                star = Some((resume, from + 1));
                t = resume;
                n = from + 1;
            }
            _ => return false,
        }
    }
}

/// Length consumed by a single non-`*` token at the start of `name`.
fn match_one(token: &GlobToken, name: &[char]) -> Option<usize> {
    match token {
        GlobToken::AnyRun => Some(0),
        GlobToken::AnyChar => (!name.is_empty()).then_some(1),
        GlobToken::Class { negated, items } => name
            .first()
            .filter(|&&c| items.iter().any(|item| item.contains(c)) != *negated)
            .map(|_| 1),
        GlobToken::Literal(lit) => {
            let len = lit.chars().count();
            (name.len() >= len && name[..len].iter().copied().eq(lit.chars())).then_some(len)
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    fn glob(p: &str) -> Glob {
        parse_glob(p).unwrap_or_else(|e| panic!("{e}"))
    }

    #[test]
    fn parse_tokens() {
        assert_eq!(
            glob("a*?.cs").tokens(),
            &[
                GlobToken::Literal("a".into()),
                GlobToken::AnyRun,
                GlobToken::AnyChar,
                GlobToken::Literal(".cs".into()),
            ]
        );
    }

    #[test]
    fn parse_class_with_range_and_negation() {
        assert_eq!(
            glob("[!a-c_]").tokens(),
            &[GlobToken::Class {
                negated: true,
                items: vec![ClassItem::Range('a', 'c'), ClassItem::Char('_')],
            }]
        );
    }

    #[test]
    fn star_extension() {
        let g = glob("*.cs");
        assert!(g.is_match("Program.cs"));
        assert!(g.is_match(".cs"));
        assert!(!g.is_match("Program.csproj"));
        assert!(!g.is_match("Program.CS"));
    }

    #[test]
    fn default_pattern_matches_everything() {
        let g = glob("*");
        assert!(g.is_match(""));
        assert!(g.is_match("anything.at.all"));
    }

    #[test]
    fn question_mark_is_one_char() {
        let g = glob("Form?.resx");
        assert!(g.is_match("Form1.resx"));
        assert!(!g.is_match("Form.resx"));
        assert!(!g.is_match("Form12.resx"));
    }

    #[test]
    fn classes() {
        let g = glob("[!_]*.cs");
        assert!(g.is_match("Main.cs"));
        assert!(!g.is_match("_Hidden.cs"));

        let g = glob("v[0-9].txt");
        assert!(g.is_match("v3.txt"));
        assert!(!g.is_match("vx.txt"));
    }

    #[test]
    fn double_star_collapses() {
        assert_eq!(glob("**.cs").tokens(), glob("*.cs").tokens());
    }

    #[test]
    fn stars_backtrack_to_the_last_one_only() {
        let g = glob("*a*b*c.cs");
        assert!(g.is_match("xaybzc.cs"));
        assert!(g.is_match("abcabc.cs"));
        assert!(!g.is_match("cba.cs"));

        let g = glob("*?.cs");
        assert!(g.is_match("a.cs"));
        assert!(!g.is_match(".cs"));
    }

    #[test]
    fn many_stars_on_a_long_name() {
        let g = glob(&"*a".repeat(16).chars().chain("*b".chars()).collect::<String>());
        let name = "a".repeat(400);
        assert!(!g.is_match(&name));
        assert!(g.is_match(&format!("{name}b")));
    }

    #[test]
    fn unclosed_class_is_an_error() {
        assert!(parse_glob("[abc").is_err());
        assert!(parse_glob("[]").is_err());
    }
}
