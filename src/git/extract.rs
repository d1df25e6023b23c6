//! Static metrics for C-family source files.
//!
//! A light lexer that finds function definitions by shape
//! (`name(params) qualifiers {`), matches their braces and counts tokens,
//! branches and call sites. It does not preprocess or resolve overloads.

use crate::model::Method;
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileMetrics {
    pub nloc: u64,
    pub complexity: u64,
    pub token_count: u64,
    pub methods: Vec<Method>,
}

pub trait MethodExtractor {
    fn extract(&self, path: &str, source: &str) -> FileMetrics;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CFamilyExtractor;

const KEYWORDS: &[&str] = &[
    "if", "else", "for", "while", "do", "switch", "case", "default", "return", "sizeof", "catch",
    "try", "throw", "new", "delete", "alignof", "decltype", "static_assert", "typeid", "defined",
    "operator", "template", "typename",
];

const BRANCHES: &[&str] = &["if", "for", "while", "case", "catch", "&&", "||", "?"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Ident,
    Number,
    Literal,
    Punct,
}

#[derive(Debug, Clone)]
struct Token {
    kind: Kind,
    text: String,
    line: u32,
}

impl Token {
    fn is(&self, text: &str) -> bool {
        self.kind == Kind::Punct && self.text == text
    }

    fn is_name(&self) -> bool {
        self.kind == Kind::Ident && !KEYWORDS.contains(&self.text.as_str())
    }
}

impl MethodExtractor for CFamilyExtractor {
    fn extract(&self, _path: &str, source: &str) -> FileMetrics {
        let tokens = tokenize(source);
        let mut methods = Vec::new();
        let mut calls: Vec<Vec<String>> = Vec::new();

        let mut i = 0;
        while i < tokens.len() {
            match definition_at(&tokens, i) {
                Some(def) => {
                    let (method, callees) = measure(&tokens, &def);
                    methods.push(method);
                    calls.push(callees);
                    i = def.body_end + 1;
                }
                None => i += 1,
            }
        }

        // fan-in: call sites of a method's bare name in the other methods of this file
        let mut call_sites: Vec<HashMap<&str, u64>> = Vec::with_capacity(calls.len());
        for callees in &calls {
            let mut sites = HashMap::new();
            for callee in callees {
                *sites.entry(bare_name(callee)).or_insert(0) += 1;
            }
            call_sites.push(sites);
        }
        let fan_in: Vec<u64> = methods
            .iter()
            .enumerate()
            .map(|(idx, m)| {
                let name = bare_name(&m.name);
                call_sites
                    .iter()
                    .enumerate()
                    .filter(|(other, _)| *other != idx)
                    .map(|(_, sites)| sites.get(name).copied().unwrap_or(0))
                    .sum()
            })
            .collect();
        for (method, fan_in) in methods.iter_mut().zip(fan_in) {
            method.fan_in = fan_in;
        }

        FileMetrics {
            nloc: distinct_lines(&tokens),
            complexity: methods.iter().map(|m| m.complexity).sum(),
            token_count: tokens.len() as u64,
            methods,
        }
    }
}

struct Definition {
    name: String,
    name_start: usize,
    params_open: usize,
    params_close: usize,
    body_open: usize,
    body_end: usize,
}

fn definition_at(tokens: &[Token], i: usize) -> Option<Definition> {
    let name_tok = tokens.get(i)?;
    if !name_tok.is_name() || !tokens.get(i + 1)?.is("(") {
        return None;
    }
    if i > 0 && (tokens[i - 1].is(".") || tokens[i - 1].is("->")) {
        return None;
    }

    let params_open = i + 1;
    let params_close = matching(tokens, params_open, "(", ")")?;

    // qualifiers, trailing return types and constructor initializer lists
    let mut k = params_close + 1;
    loop {
        let tok = tokens.get(k)?;
        if tok.is("{") {
            break;
        }
        if tok.is("(") {
            k = matching(tokens, k, "(", ")")? + 1;
            continue;
        }
        let allowed = tok.kind == Kind::Ident
            || tok.kind == Kind::Number
            || ["::", ",", ":", "->", "&", "*", "<", ">"].iter().any(|p| tok.is(p));
        if !allowed {
            return None;
        }
        k += 1;
    }
    let body_open = k;
    let body_end = matching(tokens, body_open, "{", "}")?;

    let (name, name_start) = qualified_name(tokens, i);
    Some(Definition { name, name_start, params_open, params_close, body_open, body_end })
}

fn qualified_name(tokens: &[Token], i: usize) -> (String, usize) {
    let mut start = i;
    let mut name = tokens[i].text.clone();
    if start > 0 && tokens[start - 1].is("~") {
        start -= 1;
        name = format!("~{name}");
    }
    while start >= 2 && tokens[start - 1].is("::") && tokens[start - 2].kind == Kind::Ident {
        name = format!("{}::{name}", tokens[start - 2].text);
        start -= 2;
    }
    (name, start)
}

fn matching(tokens: &[Token], open_at: usize, open: &str, close: &str) -> Option<usize> {
    let mut depth = 0usize;
    for (offset, tok) in tokens[open_at..].iter().enumerate() {
        if tok.is(open) {
            depth += 1;
        } else if tok.is(close) {
            depth = depth.checked_sub(1)?;
            if depth == 0 {
                return Some(open_at + offset);
            }
        }
    }
    None
}

fn measure(tokens: &[Token], def: &Definition) -> (Method, Vec<String>) {
    let span = &tokens[def.name_start..=def.body_end];
    let body = &tokens[def.body_open + 1..def.body_end];

    let complexity = 1 + body
        .iter()
        .filter(|t| BRANCHES.contains(&t.text.as_str()) && t.kind != Kind::Literal)
        .count() as u64;

    let callees: Vec<String> = body
        .windows(2)
        .filter(|w| w[0].is_name() && w[1].is("("))
        .map(|w| w[0].text.clone())
        .collect();
    let general_fan_out = callees.iter().collect::<HashSet<_>>().len() as u64;

    let method = Method {
        name: def.name.clone(),
        start_line: tokens[def.name_start].line,
        end_line: tokens[def.body_end].line,
        nloc: distinct_lines(span),
        complexity,
        token_count: span.len() as u64,
        fan_in: 0,
        fan_out: callees.len() as u64,
        general_fan_out,
        parameter_count: parameter_count(&tokens[def.params_open + 1..def.params_close]),
    };
    (method, callees)
}

fn parameter_count(params: &[Token]) -> u64 {
    if params.is_empty() || (params.len() == 1 && params[0].text == "void") {
        return 0;
    }
    let mut depth = 0i32;
    let mut commas = 0u64;
    for tok in params {
        if tok.is("(") || tok.is("<") || tok.is("[") || tok.is("{") {
            depth += 1;
        } else if tok.is(")") || tok.is(">") || tok.is("]") || tok.is("}") {
            depth -= 1;
        } else if tok.is(",") && depth == 0 {
            commas += 1;
        }
    }
    commas + 1
}

fn bare_name(name: &str) -> &str {
    name.rsplit("::").next().unwrap_or(name)
}

fn distinct_lines(tokens: &[Token]) -> u64 {
    tokens.iter().map(|t| t.line).collect::<HashSet<_>>().len() as u64
}

fn tokenize(source: &str) -> Vec<Token> {
    let chars: Vec<char> = source.chars().collect();
    let mut tokens = Vec::new();
    let mut line = 1u32;
    let mut at_line_start = true;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if c == '\n' {
            line += 1;
            at_line_start = true;
            i += 1;
            continue;
        }
        if c.is_whitespace() {
            i += 1;
            continue;
        }

        // preprocessor directive, with backslash continuations
        if c == '#' && at_line_start {
            while i < chars.len() && chars[i] != '\n' {
                if chars[i] == '\\' && chars.get(i + 1) == Some(&'\n') {
                    line += 1;
                    i += 1;
                }
                i += 1;
            }
            continue;
        }
        at_line_start = false;

        if c == '/' && chars.get(i + 1) == Some(&'/') {
            while i < chars.len() && chars[i] != '\n' {
                i += 1;
            }
            continue;
        }
        if c == '/' && chars.get(i + 1) == Some(&'*') {
            i += 2;
            while i < chars.len() && !(chars[i] == '*' && chars.get(i + 1) == Some(&'/')) {
                if chars[i] == '\n' {
                    line += 1;
                }
                i += 1;
            }
            i += 2;
            continue;
        }

        let start = i;
        let start_line = line;
        if c == '"' || c == '\'' {
            i += 1;
            while i < chars.len() && chars[i] != c {
                if chars[i] == '\\' {
                    i += 1;
                }
                if chars.get(i) == Some(&'\n') {
                    line += 1;
                }
                i += 1;
            }
            i += 1;
            tokens.push(Token { kind: Kind::Literal, text: String::new(), line: start_line });
            continue;
        }
        if c.is_alphabetic() || c == '_' {
            while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_') {
                i += 1;
            }
            let text: String = chars[start..i].iter().collect();
            tokens.push(Token { kind: Kind::Ident, text, line });
            continue;
        }
        if c.is_ascii_digit() {
            while i < chars.len()
                && (chars[i].is_alphanumeric() || chars[i] == '.' || chars[i] == '_')
            {
                i += 1;
            }
            let text: String = chars[start..i].iter().collect();
            tokens.push(Token { kind: Kind::Number, text, line });
            continue;
        }

        let pair: String = chars[i..chars.len().min(i + 2)].iter().collect();
        let text = if ["::", "->", "&&", "||"].contains(&pair.as_str()) {
            i += 2;
            pair
        } else {
            i += 1;
            c.to_string()
        };
        tokens.push(Token { kind: Kind::Punct, text, line });
    }
    tokens
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const SOURCE: &str = r#"#include <stdio.h>

// helper
static int add(int a, int b)
{
    return a + b;
}

int Calc::run(void) const {
    int x = add(1, 2);
    if (x > 2 && x < 10) {
        x = add(x, 1);
    }
    for (int i = 0; i < 3; i++) { log("{ not a brace }"); }
    return x;
}

Calc::~Calc() {}
"#;

    fn extract() -> FileMetrics {
        CFamilyExtractor.extract("calc.cpp", SOURCE)
    }

    #[test]
    fn finds_definitions_with_lines() {
        let metrics = extract();
        let names: Vec<_> = metrics.methods.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["add", "Calc::run", "Calc::~Calc"]);

        let add = &metrics.methods[0];
        assert_eq!((add.start_line, add.end_line), (4, 7));
        assert_eq!(add.parameter_count, 2);

        let run = &metrics.methods[1];
        assert_eq!((run.start_line, run.end_line), (9, 16));
        assert_eq!(run.parameter_count, 0);
    }

    #[test]
    fn counts_branches_and_calls() {
        let metrics = extract();
        let run = &metrics.methods[1];
        // if, &&, for
        assert_eq!(run.complexity, 4);
        assert_eq!(run.fan_out, 3);
        assert_eq!(run.general_fan_out, 2);
        assert_eq!(metrics.methods[0].fan_in, 2);
        assert_eq!(metrics.methods[0].complexity, 1);
        assert_eq!(metrics.complexity, 6);
    }

    #[test]
    fn ignores_calls_and_declarations() {
        let source = "int f(int);\nvoid g() { f(1); obj.h(2); }\n";
        let metrics = CFamilyExtractor.extract("a.c", source);
        let names: Vec<_> = metrics.methods.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["g"]);
        assert_eq!(metrics.methods[0].nloc, 1);
    }

    #[test]
    fn empty_source() {
        assert_eq!(CFamilyExtractor.extract("a.c", ""), FileMetrics::default());
    }
}
