//! Parser for the graph-description automaton format.
//!
//! ```text
//! digraph G {
//!     graph [
//!         clock_variable_size = 1
//!         string_variable_size = 1
//!         number_variable_size = 0
//!     ]
//!     0 [init=1][match=0]
//!     1 [init=0][match=1]
//!     0 -> 1 [label=0][s_constraints="{x1 == 'a'}"][guard="{x0 > 4}"][reset="{0}"]
//! }
//! ```
//!
//! Graph attributes give the variable-space cardinalities (plus
//! `parameter_size` in parametric mode); node attributes mark initial and
//! accepting states; edge attributes carry the action label and the
//! transition data. Reset sets use `{i, j}` syntax, guards are atomic clock
//! comparisons `x<i> <op> <number>` (with `p<i>` parameter atoms and
//! rational constants in parametric mode), string literals are
//! single-quoted, and unknown attributes are ignored.

use std::collections::HashMap;

use anyhow::{bail, ensure, Context, Result};
use symon::automata::{Automaton, StateId, Transition};
use symon::constraints::{Cmp, StringAtom, StringConstraint, StringOp, TimingGuard};
use symon::core::{parse_decimal, Action, Rational};

use crate::ast::{timing_rel, ModeBuild, NumAst, TimeAst};

#[derive(Debug, Clone, PartialEq)]
enum Tok {
    Ident(String),
    Number(String),
    Quoted(String),
    Arrow,
    Sym(char),
}

fn tokenize(src: &str) -> Result<Vec<Tok>> {
    let mut tokens = Vec::new();
    let mut chars = src.chars().peekable();
    while let Some(&c) = chars.peek() {
        match c {
            c if c.is_whitespace() => {
                chars.next();
            }
            '#' => {
                for c in chars.by_ref() {
                    if c == '\n' {
                        break;
                    }
                }
            }
            '/' => {
                chars.next();
                ensure!(chars.next_if_eq(&'/').is_some(), "stray `/` in automaton file");
                for c in chars.by_ref() {
                    if c == '\n' {
                        break;
                    }
                }
            }
            '"' => {
                chars.next();
                let mut text = String::new();
                loop {
                    match chars.next() {
                        Some('"') => break,
                        Some(c) => text.push(c),
                        None => bail!("unterminated string in automaton file"),
                    }
                }
                tokens.push(Tok::Quoted(text));
            }
            '-' => {
                chars.next();
                ensure!(chars.next_if_eq(&'>').is_some(), "expected `->`");
                tokens.push(Tok::Arrow);
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let mut ident = String::new();
                while let Some(&c) = chars.peek() {
                    if c.is_ascii_alphanumeric() || c == '_' {
                        ident.push(c);
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(Tok::Ident(ident));
            }
            c if c.is_ascii_digit() || c == '.' => {
                let mut number = String::new();
                while let Some(&c) = chars.peek() {
                    if c.is_ascii_digit() || c == '.' {
                        number.push(c);
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(Tok::Number(number));
            }
            '{' | '}' | '[' | ']' | '=' | ';' | ',' => {
                chars.next();
                tokens.push(Tok::Sym(c));
            }
            other => bail!("unexpected character `{other}` in automaton file"),
        }
    }
    Ok(tokens)
}

struct Parser {
    tokens: Vec<Tok>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Tok> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Result<Tok> {
        let tok = self.tokens.get(self.pos).cloned().context("unexpected end of automaton file")?;
        self.pos += 1;
        Ok(tok)
    }

    fn eat_sym(&mut self, sym: char) -> bool {
        if self.peek() == Some(&Tok::Sym(sym)) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect_sym(&mut self, sym: char) -> Result<()> {
        let tok = self.next()?;
        ensure!(tok == Tok::Sym(sym), "expected `{sym}`, found {tok:?}");
        Ok(())
    }

    fn expect_ident(&mut self, ident: &str) -> Result<()> {
        let tok = self.next()?;
        ensure!(
            matches!(&tok, Tok::Ident(i) if i == ident),
            "expected `{ident}`, found {tok:?}"
        );
        Ok(())
    }

    /// Zero or more `[key = value, …]` groups.
    fn attr_list(&mut self) -> Result<Vec<(String, String)>> {
        let mut attrs = Vec::new();
        while self.eat_sym('[') {
            loop {
                if self.eat_sym(']') {
                    break;
                }
                let key = match self.next()? {
                    Tok::Ident(key) => key,
                    tok => bail!("expected attribute name, found {tok:?}"),
                };
                self.expect_sym('=')?;
                let value = match self.next()? {
                    Tok::Ident(v) | Tok::Number(v) | Tok::Quoted(v) => v,
                    tok => bail!("expected attribute value, found {tok:?}"),
                };
                attrs.push((key, value));
                while self.eat_sym(',') || self.eat_sym(';') {}
            }
        }
        Ok(attrs)
    }
}

/// Character-level parsing of the attribute payloads (`{…}` lists, infix
/// expressions, quoted literals).
struct Cursor<'a> {
    src: &'a str,
    chars: std::iter::Peekable<std::str::Chars<'a>>,
}

impl<'a> Cursor<'a> {
    fn new(src: &'a str) -> Self {
        Cursor {
            src,
            chars: src.chars().peekable(),
        }
    }

    fn skip_ws(&mut self) {
        while self.chars.next_if(|c| c.is_whitespace()).is_some() {}
    }

    fn peek(&mut self) -> Option<char> {
        self.chars.peek().copied()
    }

    fn eat(&mut self, c: char) -> bool {
        self.skip_ws();
        self.chars.next_if_eq(&c).is_some()
    }

    fn expect(&mut self, c: char) -> Result<()> {
        ensure!(self.eat(c), "expected `{c}` in `{}`", self.src);
        Ok(())
    }

    fn at_end(&mut self) -> bool {
        self.skip_ws();
        self.peek().is_none()
    }

    fn parse_usize(&mut self) -> Result<usize> {
        self.skip_ws();
        let mut digits = String::new();
        while let Some(c) = self.chars.next_if(|c| c.is_ascii_digit()) {
            digits.push(c);
        }
        ensure!(!digits.is_empty(), "expected an index in `{}`", self.src);
        digits.parse().with_context(|| format!("index in `{}`", self.src))
    }

    fn parse_rational(&mut self) -> Result<Rational> {
        self.skip_ws();
        let mut text = String::new();
        if let Some(c) = self.chars.next_if(|&c| c == '-' || c == '+') {
            text.push(c);
        }
        while let Some(c) = self.chars.next_if(|&c| c.is_ascii_digit() || c == '.') {
            text.push(c);
        }
        ensure!(!text.is_empty(), "expected a number in `{}`", self.src);
        Ok(parse_decimal(&text)?)
    }

    fn parse_quoted(&mut self) -> Result<String> {
        self.expect('\'')?;
        let mut text = String::new();
        loop {
            match self.chars.next() {
                Some('\'') => return Ok(text),
                Some(c) => text.push(c),
                None => bail!("unterminated string literal in `{}`", self.src),
            }
        }
    }

    fn parse_cmp(&mut self) -> Result<Cmp> {
        self.skip_ws();
        let first = self.chars.next().with_context(|| format!("expected a comparison in `{}`", self.src))?;
        Ok(match first {
            '<' => {
                if self.chars.next_if_eq(&'=').is_some() {
                    Cmp::Le
                } else {
                    Cmp::Lt
                }
            }
            '>' => {
                if self.chars.next_if_eq(&'=').is_some() {
                    Cmp::Ge
                } else {
                    Cmp::Gt
                }
            }
            '=' => {
                self.chars.next_if_eq(&'=');
                Cmp::Eq
            }
            '!' => {
                ensure!(self.chars.next_if_eq(&'=').is_some(), "stray `!` in `{}`", self.src);
                Cmp::Ne
            }
            other => bail!("expected a comparison, found `{other}` in `{}`", self.src),
        })
    }

    fn parse_string_atom(&mut self) -> Result<StringAtom> {
        self.skip_ws();
        match self.peek() {
            Some('\'') => Ok(StringAtom::Literal(self.parse_quoted()?)),
            Some('x') => {
                self.chars.next();
                Ok(StringAtom::Var(self.parse_usize()?))
            }
            _ => bail!("expected `x<i>` or a quoted literal in `{}`", self.src),
        }
    }

    fn parse_num_atom(&mut self) -> Result<NumAst> {
        self.skip_ws();
        match self.peek() {
            Some('x') => {
                self.chars.next();
                Ok(NumAst::Var(self.parse_usize()?))
            }
            _ => Ok(NumAst::Const(self.parse_rational()?)),
        }
    }

    fn parse_num_expr(&mut self) -> Result<NumAst> {
        let mut expr = self.parse_num_atom()?;
        loop {
            self.skip_ws();
            match self.peek() {
                Some('+') => {
                    self.chars.next();
                    expr = NumAst::Add(Box::new(expr), Box::new(self.parse_num_atom()?));
                }
                Some('-') => {
                    self.chars.next();
                    expr = NumAst::Sub(Box::new(expr), Box::new(self.parse_num_atom()?));
                }
                _ => return Ok(expr),
            }
        }
    }

    fn parse_time_atom(&mut self) -> Result<TimeAst> {
        self.skip_ws();
        match self.peek() {
            Some('p') => {
                self.chars.next();
                Ok(TimeAst::Param(self.parse_usize()?))
            }
            _ => Ok(TimeAst::Const(self.parse_rational()?)),
        }
    }

    fn parse_time_expr(&mut self) -> Result<TimeAst> {
        let mut expr = self.parse_time_atom()?;
        loop {
            self.skip_ws();
            match self.peek() {
                Some('+') => {
                    self.chars.next();
                    expr = TimeAst::Add(Box::new(expr), Box::new(self.parse_time_atom()?));
                }
                Some('-') => {
                    self.chars.next();
                    expr = TimeAst::Sub(Box::new(expr), Box::new(self.parse_time_atom()?));
                }
                _ => return Ok(expr),
            }
        }
    }

    /// `{ item, item, … }` with `item` parsed by `f`.
    fn parse_braced<T>(&mut self, mut f: impl FnMut(&mut Self) -> Result<T>) -> Result<Vec<T>> {
        self.expect('{')?;
        let mut items = Vec::new();
        if self.eat('}') {
            return Ok(items);
        }
        loop {
            items.push(f(self)?);
            if self.eat('}') {
                break;
            }
            self.expect(',')?;
        }
        ensure!(self.at_end(), "trailing input in `{}`", self.src);
        Ok(items)
    }
}

fn parse_resets(value: &str) -> Result<Vec<usize>> {
    Cursor::new(value).parse_braced(Cursor::parse_usize)
}

fn parse_string_constraints(value: &str) -> Result<Vec<StringConstraint>> {
    Cursor::new(value).parse_braced(|c| {
        let left = c.parse_string_atom()?;
        let op = match c.parse_cmp()? {
            Cmp::Eq => StringOp::Eq,
            Cmp::Ne => StringOp::Ne,
            other => bail!("string constraints support `==` and `!=`, found `{other}`"),
        };
        let right = c.parse_string_atom()?;
        Ok(StringConstraint::new(left, op, right))
    })
}

fn ast_max_var(ast: &NumAst) -> Option<usize> {
    match ast {
        NumAst::Var(v) => Some(*v),
        NumAst::Const(_) => None,
        NumAst::Add(a, b) | NumAst::Sub(a, b) | NumAst::Mul(a, b) | NumAst::Div(a, b) => {
            ast_max_var(a).into_iter().chain(ast_max_var(b)).max()
        }
    }
}

fn parse_number_constraints<M: ModeBuild>(value: &str, number_count: usize) -> Result<Vec<M::NumberConstraint>> {
    Cursor::new(value).parse_braced(|c| {
        let left = c.parse_num_expr()?;
        let cmp = c.parse_cmp()?;
        let right = c.parse_num_expr()?;
        // Expressions may also reach into the event payload, past the
        // declared variables.
        let dim = number_count
            .max(ast_max_var(&left).map_or(0, |v| v + 1))
            .max(ast_max_var(&right).map_or(0, |v| v + 1));
        M::number_constraint(&left, cmp, &right, dim)
    })
}

fn parse_string_updates<M: ModeBuild>(value: &str, update: &mut M::Update) -> Result<()> {
    Cursor::new(value).parse_braced(|c| {
        c.expect('x')?;
        let target = c.parse_usize()?;
        c.expect(':')?;
        c.expect('=')?;
        let atom = c.parse_string_atom()?;
        Ok((target, atom))
    })?
    .into_iter()
    .for_each(|(target, atom)| M::push_string_update(update, target, atom));
    Ok(())
}

fn parse_number_updates<M: ModeBuild>(value: &str, number_count: usize, update: &mut M::Update) -> Result<()> {
    let items = Cursor::new(value).parse_braced(|c| {
        c.expect('x')?;
        let target = c.parse_usize()?;
        c.expect(':')?;
        c.expect('=')?;
        let expr = c.parse_num_expr()?;
        Ok((target, expr))
    })?;
    for (target, expr) in items {
        let dim = number_count.max(ast_max_var(&expr).map_or(0, |v| v + 1));
        M::push_number_update(update, target, &expr, dim)?;
    }
    Ok(())
}

fn parse_guard<M: ModeBuild>(value: &str, params: usize, clocks: usize) -> Result<M::Guard> {
    let items = Cursor::new(value).parse_braced(|c| {
        c.expect('x')?;
        let clock = c.parse_usize()?;
        let rel = timing_rel(c.parse_cmp()?)?;
        let expr = c.parse_time_expr()?;
        Ok((clock, rel, expr))
    })?;
    let mut guard = M::Guard::universe(params, clocks);
    for (clock, rel, expr) in items {
        ensure!(clock < clocks, "guard references undeclared clock x{clock}");
        guard = guard.conjoin(&M::clock_guard(clock, rel, &expr, params)?);
    }
    Ok(guard)
}

fn flag(value: &str) -> bool {
    !matches!(value, "0" | "false")
}

/// Parses an automaton in the graph-description format for the given mode.
pub fn parse_automaton<M: ModeBuild>(src: &str) -> Result<Automaton<M>> {
    let mut parser = Parser {
        tokens: tokenize(src)?,
        pos: 0,
    };
    parser.expect_ident("digraph")?;
    if matches!(parser.peek(), Some(Tok::Ident(_))) {
        parser.next()?;
    }
    parser.expect_sym('{')?;

    let mut graph_attrs: HashMap<String, String> = HashMap::new();
    struct RawNode {
        name: String,
        attrs: Vec<(String, String)>,
    }
    struct RawEdge {
        from: String,
        to: String,
        attrs: Vec<(String, String)>,
    }
    let mut nodes: Vec<RawNode> = Vec::new();
    let mut edges: Vec<RawEdge> = Vec::new();

    loop {
        match parser.next()? {
            Tok::Sym('}') => break,
            Tok::Sym(';') => continue,
            Tok::Ident(ident) if ident == "graph" => {
                graph_attrs.extend(parser.attr_list()?);
            }
            Tok::Ident(ident) if ident == "node" || ident == "edge" => {
                parser.attr_list()?;
            }
            Tok::Ident(name) | Tok::Number(name) => {
                if parser.peek() == Some(&Tok::Arrow) {
                    parser.next()?;
                    let to = match parser.next()? {
                        Tok::Ident(to) | Tok::Number(to) => to,
                        tok => bail!("expected a target node, found {tok:?}"),
                    };
                    let attrs = parser.attr_list()?;
                    edges.push(RawEdge { from: name, to, attrs });
                } else {
                    let attrs = parser.attr_list()?;
                    nodes.push(RawNode { name, attrs });
                }
            }
            tok => bail!("unexpected {tok:?} in automaton file"),
        }
    }

    let size = |key: &str| -> Result<usize> {
        let value = graph_attrs
            .get(key)
            .with_context(|| format!("missing graph attribute `{key}`"))?;
        value.parse().with_context(|| format!("graph attribute `{key}`"))
    };
    let clocks = size("clock_variable_size")?;
    let strings = size("string_variable_size")?;
    let numbers = size("number_variable_size")?;
    let params = if M::PARAMETRIC { size("parameter_size")? } else { 0 };

    let mut automaton: Automaton<M> = Automaton::new(clocks, params, strings, numbers);
    let mut ids: HashMap<String, StateId> = HashMap::new();
    let mut state_of = |automaton: &mut Automaton<M>, name: &str| -> StateId {
        *ids.entry(name.to_string())
            .or_insert_with(|| automaton.add_state(false))
    };

    for node in &nodes {
        let id = state_of(&mut automaton, &node.name);
        for (key, value) in &node.attrs {
            match key.as_str() {
                "init" => {
                    if flag(value) && !automaton.initial.contains(&id) {
                        automaton.initial.push(id);
                    }
                }
                "match" => automaton.states[id].accepting = flag(value),
                _ => {}
            }
        }
    }

    for edge in &edges {
        let from = state_of(&mut automaton, &edge.from);
        let to = state_of(&mut automaton, &edge.to);
        let mut transition: Transition<M> = Transition::unconstrained(to, params, clocks);
        let mut action: Option<Action> = None;
        for (key, value) in &edge.attrs {
            match key.as_str() {
                "label" => {
                    let id: u32 = value.parse().with_context(|| format!("edge label `{value}`"))?;
                    action = Some(Action(id));
                }
                "reset" => {
                    transition.resets.clear();
                    for clock in parse_resets(value)? {
                        ensure!(clock < clocks, "reset of undeclared clock x{clock}");
                        transition.resets.push(clock);
                    }
                }
                "guard" => transition.guard = parse_guard::<M>(value, params, clocks)?,
                "s_constraints" => transition.string_constraints = parse_string_constraints(value)?,
                "n_constraints" => {
                    transition.number_constraints = parse_number_constraints::<M>(value, numbers)?;
                }
                "s_update" => parse_string_updates::<M>(value, &mut transition.update)?,
                "n_update" => parse_number_updates::<M>(value, numbers, &mut transition.update)?,
                _ => {}
            }
        }
        let action = action.with_context(|| format!("edge {} -> {} has no label", edge.from, edge.to))?;
        automaton.add_transition(from, action, transition);
    }

    ensure!(!automaton.initial.is_empty(), "automaton has no initial state");
    Ok(automaton)
}
