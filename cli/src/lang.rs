//! The high-level specification language.
//!
//! A specification file is a sequence of items followed by one top-level
//! expression:
//!
//! ```text
//! variables { number n; string owner; parameter p; }
//! signature update(string dst, number val)
//!
//! define bind = update { dst == "y", n := val }
//! within (5, 10] { bind ; update { dst == "x", val = n } }
//! ```
//!
//! Items: `variables { … }` declares the global string/number variables and
//! (parametric mode only) the timing parameters; `signature name(…)`
//! declares an event kind and names its payload fields, assigning action ids
//! by appearance order; `init { … }` (parametric only) constrains the
//! initial valuations; `define name = expr` binds a reusable subexpression.
//!
//! Expressions: `;` sequencing, `||` alternation, `&&` conjunction, postfix
//! `*` / `+` / `?`, parentheses, `within <timing> { expr }`,
//! `ignore { actions } in { expr }`, and atomic event patterns
//! `name { constraint-or-assignment, … }`. Inside a pattern's braces, the
//! payload names of the event's signature and the global variables are in
//! scope; assignments write global variables. Timing constraints are
//! intervals `[a,b]`, `(a,b)` (brackets mix freely) or `<op> expr`, where
//! `expr` may reference parameters in parametric mode.

use std::collections::HashMap;

use anyhow::{bail, ensure, Context, Result};
use symon::automata::{ops, Automaton, StateId, Transition};
use symon::constraints::{Cmp, StringAtom, StringConstraint, StringOp, TimingGuard, TimingRel};
use symon::core::{parse_decimal, Action, VariableId};

use crate::ast::{timing_rel, ModeBuild, NumAst, TimeAst};
use crate::signature::Signature;

#[derive(Clone, Debug, PartialEq)]
enum Token {
    Ident(String),
    Number(String),
    Str(String),
    LBrace,
    RBrace,
    LParen,
    RParen,
    LBracket,
    RBracket,
    Semi,
    Comma,
    Star,
    Plus,
    Minus,
    Slash,
    Question,
    OrOr,
    AndAnd,
    Assign,
    Eq,
    Ne,
    Le,
    Lt,
    Ge,
    Gt,
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Token::Ident(i) => write!(f, "`{i}`"),
            Token::Number(n) => write!(f, "`{n}`"),
            Token::Str(s) => write!(f, "\"{s}\""),
            Token::LBrace => write!(f, "`{{`"),
            Token::RBrace => write!(f, "`}}`"),
            Token::LParen => write!(f, "`(`"),
            Token::RParen => write!(f, "`)`"),
            Token::LBracket => write!(f, "`[`"),
            Token::RBracket => write!(f, "`]`"),
            Token::Semi => write!(f, "`;`"),
            Token::Comma => write!(f, "`,`"),
            Token::Star => write!(f, "`*`"),
            Token::Plus => write!(f, "`+`"),
            Token::Minus => write!(f, "`-`"),
            Token::Slash => write!(f, "`/`"),
            Token::Question => write!(f, "`?`"),
            Token::OrOr => write!(f, "`||`"),
            Token::AndAnd => write!(f, "`&&`"),
            Token::Assign => write!(f, "`:=`"),
            Token::Eq => write!(f, "`=`"),
            Token::Ne => write!(f, "`<>`"),
            Token::Le => write!(f, "`<=`"),
            Token::Lt => write!(f, "`<`"),
            Token::Ge => write!(f, "`>=`"),
            Token::Gt => write!(f, "`>`"),
        }
    }
}

#[derive(Clone, Debug)]
struct Lexed {
    token: Token,
    line: u32,
}

fn tokenize(src: &str) -> Result<Vec<Lexed>> {
    let mut tokens = Vec::new();
    let mut chars = src.chars().peekable();
    let mut line = 1u32;
    while let Some(&c) = chars.peek() {
        let token = match c {
            '\n' => {
                line += 1;
                chars.next();
                continue;
            }
            c if c.is_whitespace() => {
                chars.next();
                continue;
            }
            '#' => {
                while chars.next_if(|&c| c != '\n').is_some() {}
                continue;
            }
            '/' => {
                chars.next();
                if chars.next_if_eq(&'/').is_some() {
                    while chars.next_if(|&c| c != '\n').is_some() {}
                    continue;
                }
                Token::Slash
            }
            '"' => {
                chars.next();
                let mut text = String::new();
                loop {
                    match chars.next() {
                        Some('"') => break,
                        Some('\n') | None => bail!("line {line}: unterminated string literal"),
                        Some(c) => text.push(c),
                    }
                }
                Token::Str(text)
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let mut ident = String::new();
                while let Some(c) = chars.next_if(|&c| c.is_ascii_alphanumeric() || c == '_') {
                    ident.push(c);
                }
                Token::Ident(ident)
            }
            c if c.is_ascii_digit() || c == '.' => {
                let mut number = String::new();
                while let Some(c) = chars.next_if(|&c| c.is_ascii_digit() || c == '.') {
                    number.push(c);
                }
                Token::Number(number)
            }
            '{' => {
                chars.next();
                Token::LBrace
            }
            '}' => {
                chars.next();
                Token::RBrace
            }
            '(' => {
                chars.next();
                Token::LParen
            }
            ')' => {
                chars.next();
                Token::RParen
            }
            '[' => {
                chars.next();
                Token::LBracket
            }
            ']' => {
                chars.next();
                Token::RBracket
            }
            ';' => {
                chars.next();
                Token::Semi
            }
            ',' => {
                chars.next();
                Token::Comma
            }
            '*' => {
                chars.next();
                Token::Star
            }
            '+' => {
                chars.next();
                Token::Plus
            }
            '-' => {
                chars.next();
                Token::Minus
            }
            '?' => {
                chars.next();
                Token::Question
            }
            '|' => {
                chars.next();
                ensure!(chars.next_if_eq(&'|').is_some(), "line {line}: expected `||`");
                Token::OrOr
            }
            '&' => {
                chars.next();
                ensure!(chars.next_if_eq(&'&').is_some(), "line {line}: expected `&&`");
                Token::AndAnd
            }
            ':' => {
                chars.next();
                ensure!(chars.next_if_eq(&'=').is_some(), "line {line}: expected `:=`");
                Token::Assign
            }
            '=' => {
                chars.next();
                chars.next_if_eq(&'=');
                Token::Eq
            }
            '!' => {
                chars.next();
                ensure!(chars.next_if_eq(&'=').is_some(), "line {line}: expected `!=`");
                Token::Ne
            }
            '<' => {
                chars.next();
                if chars.next_if_eq(&'=').is_some() {
                    Token::Le
                } else if chars.next_if_eq(&'>').is_some() {
                    Token::Ne
                } else {
                    Token::Lt
                }
            }
            '>' => {
                chars.next();
                if chars.next_if_eq(&'=').is_some() {
                    Token::Ge
                } else {
                    Token::Gt
                }
            }
            other => bail!("line {line}: unexpected character `{other}`"),
        };
        tokens.push(Lexed { token, line });
    }
    Ok(tokens)
}

#[derive(Clone, Debug)]
struct RawSignature {
    name: String,
    strings: Vec<String>,
    numbers: Vec<String>,
}

/// The result of parsing a specification file: the assembled automaton and
/// the signature implied by its `signature` items.
pub struct ParsedSpec<M: ModeBuild> {
    pub automaton: Automaton<M>,
    pub signature: Signature,
}

pub fn parse_spec<M: ModeBuild>(src: &str) -> Result<ParsedSpec<M>> {
    SpecParser::<M>::new(src)?.parse()
}

struct SpecParser<M: ModeBuild> {
    tokens: Vec<Lexed>,
    pos: usize,
    signatures: Vec<RawSignature>,
    parameters: Vec<String>,
    global_strings: Vec<String>,
    global_numbers: Vec<String>,
    defines: HashMap<String, Automaton<M>>,
    init_strings: Vec<StringConstraint>,
    init_numbers: Vec<M::NumberConstraint>,
}

impl<M: ModeBuild> SpecParser<M> {
    fn new(src: &str) -> Result<Self> {
        Ok(SpecParser {
            tokens: tokenize(src)?,
            pos: 0,
            signatures: Vec::new(),
            parameters: Vec::new(),
            global_strings: Vec::new(),
            global_numbers: Vec::new(),
            defines: HashMap::new(),
            init_strings: Vec::new(),
            init_numbers: Vec::new(),
        })
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|l| &l.token)
    }

    fn peek_at(&self, offset: usize) -> Option<&Token> {
        self.tokens.get(self.pos + offset).map(|l| &l.token)
    }

    fn line(&self) -> u32 {
        self.tokens
            .get(self.pos.min(self.tokens.len().saturating_sub(1)))
            .map_or(0, |l| l.line)
    }

    fn next(&mut self) -> Result<Token> {
        let lexed = self.tokens.get(self.pos).cloned().context("unexpected end of input")?;
        self.pos += 1;
        Ok(lexed.token)
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.peek() == Some(token) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token: Token) -> Result<()> {
        let line = self.line();
        let found = self.next()?;
        ensure!(found == token, "line {line}: expected {token}, found {found}");
        Ok(())
    }

    fn expect_ident(&mut self) -> Result<String> {
        let line = self.line();
        match self.next()? {
            Token::Ident(ident) => Ok(ident),
            found => bail!("line {line}: expected an identifier, found {found}"),
        }
    }

    fn at_keyword(&self, keyword: &str) -> bool {
        matches!(self.peek(), Some(Token::Ident(i)) if i == keyword)
    }

    fn parse(mut self) -> Result<ParsedSpec<M>> {
        let mut top: Option<Automaton<M>> = None;
        while self.peek().is_some() {
            if self.at_keyword("variables") {
                self.pos += 1;
                self.parse_variables()?;
            } else if self.at_keyword("signature") {
                self.pos += 1;
                self.parse_signature()?;
            } else if self.at_keyword("init") {
                self.pos += 1;
                self.parse_inits()?;
            } else if self.at_keyword("define") {
                self.pos += 1;
                let name = self.expect_ident()?;
                self.expect(Token::Eq)?;
                let automaton = self.parse_expr()?;
                self.defines.insert(name, automaton);
            } else if self.eat(&Token::Semi) {
                continue;
            } else {
                let line = self.line();
                ensure!(top.is_none(), "line {line}: multiple top-level expressions");
                top = Some(self.parse_expr()?);
            }
        }
        let mut automaton = top.context("the specification has no top-level expression")?;
        self.apply_initial_constraints(&mut automaton)?;
        automaton.string_count = self.global_strings.len();
        automaton.number_count = self.global_numbers.len();
        automaton.param_count = self.parameters.len();
        let signature = Signature::from_entries(
            self.signatures
                .iter()
                .map(|s| (s.name.clone(), s.strings.len(), s.numbers.len())),
        );
        Ok(ParsedSpec { automaton, signature })
    }

    fn parse_variables(&mut self) -> Result<()> {
        self.expect(Token::LBrace)?;
        while !self.eat(&Token::RBrace) {
            let line = self.line();
            let kind = self.expect_ident()?;
            let name = self.expect_ident()?;
            match kind.as_str() {
                "string" => self.global_strings.push(name),
                "number" => self.global_numbers.push(name),
                "parameter" => {
                    ensure!(
                        M::PARAMETRIC,
                        "line {line}: timing parameters are only available in parametric mode"
                    );
                    self.parameters.push(name);
                }
                other => bail!("line {line}: unknown variable kind `{other}`"),
            }
            self.eat(&Token::Semi);
        }
        Ok(())
    }

    fn parse_signature(&mut self) -> Result<()> {
        let line = self.line();
        let name = self.expect_ident()?;
        ensure!(
            !self.signatures.iter().any(|s| s.name == name),
            "line {line}: duplicate signature `{name}`"
        );
        let mut raw = RawSignature {
            name,
            strings: Vec::new(),
            numbers: Vec::new(),
        };
        self.expect(Token::LParen)?;
        if !self.eat(&Token::RParen) {
            loop {
                let line = self.line();
                let kind = self.expect_ident()?;
                let field = self.expect_ident()?;
                match kind.as_str() {
                    "string" => raw.strings.push(field),
                    "number" => raw.numbers.push(field),
                    other => bail!("line {line}: unknown payload kind `{other}`"),
                }
                if self.eat(&Token::RParen) {
                    break;
                }
                self.expect(Token::Comma)?;
            }
        }
        self.signatures.push(raw);
        Ok(())
    }

    fn parse_inits(&mut self) -> Result<()> {
        let line = self.line();
        ensure!(
            M::PARAMETRIC,
            "line {line}: initial constraints are only supported in parametric mode"
        );
        self.expect(Token::LBrace)?;
        let empty = RawSignature {
            name: String::new(),
            strings: Vec::new(),
            numbers: Vec::new(),
        };
        while !self.eat(&Token::RBrace) {
            let (strings, numbers) = self.parse_constraint(&empty)?;
            self.init_strings.extend(strings);
            self.init_numbers.extend(numbers);
            self.eat(&Token::Comma);
        }
        Ok(())
    }

    fn apply_initial_constraints(&mut self, automaton: &mut Automaton<M>) -> Result<()> {
        if self.init_strings.is_empty() && self.init_numbers.is_empty() {
            return Ok(());
        }
        let fresh = automaton.add_state(false);
        for init in std::mem::take(&mut automaton.initial) {
            let mut transition: Transition<M> =
                Transition::unconstrained(init, self.parameters.len(), automaton.clock_count);
            transition.string_constraints = self.init_strings.clone();
            transition.number_constraints = self.init_numbers.clone();
            automaton.add_transition(fresh, Action::UNOBSERVABLE, transition);
        }
        automaton.initial = vec![fresh];
        Ok(())
    }

    // ---- expressions ----------------------------------------------------

    /// Can the next token begin an expression? Resolves identifiers against
    /// the declared actions and defines, so a `;` before anything else ends
    /// the expression instead.
    fn starts_primary(&self) -> bool {
        match self.peek() {
            Some(Token::LParen) => true,
            Some(Token::Ident(i)) => {
                matches!(i.as_str(), "within" | "ignore" | "unobservable")
                    || self.defines.contains_key(i)
                    || self.signatures.iter().any(|s| &s.name == i)
            }
            _ => false,
        }
    }

    fn parse_expr(&mut self) -> Result<Automaton<M>> {
        let mut left = self.parse_conjunction()?;
        while self.eat(&Token::OrOr) {
            let right = self.parse_conjunction()?;
            left = ops::disjunction(left, right);
        }
        Ok(left)
    }

    fn parse_conjunction(&mut self) -> Result<Automaton<M>> {
        let mut left = self.parse_sequence()?;
        while self.eat(&Token::AndAnd) {
            let right = self.parse_sequence()?;
            left = ops::conjunction(&left, &right);
        }
        Ok(left)
    }

    fn parse_sequence(&mut self) -> Result<Automaton<M>> {
        let mut left = self.parse_repeat()?;
        while self.eat(&Token::Semi) {
            if !self.starts_primary() {
                // A trailing `;` ends the expression instead.
                break;
            }
            let right = self.parse_repeat()?;
            left = ops::concatenate(left, right);
        }
        Ok(left)
    }

    fn parse_repeat(&mut self) -> Result<Automaton<M>> {
        let mut inner = self.parse_primary()?;
        loop {
            if self.eat(&Token::Star) {
                inner = ops::kleene_star(inner);
            } else if self.eat(&Token::Plus) {
                inner = ops::kleene_plus(inner);
            } else if self.eat(&Token::Question) {
                inner = ops::empty_or(inner);
            } else {
                return Ok(inner);
            }
        }
    }

    fn parse_primary(&mut self) -> Result<Automaton<M>> {
        let line = self.line();
        if self.eat(&Token::LParen) {
            let inner = self.parse_expr()?;
            self.expect(Token::RParen)?;
            return Ok(inner);
        }
        let name = self.expect_ident()?;
        match name.as_str() {
            "within" => self.parse_within(),
            "ignore" => self.parse_ignore(),
            _ => {
                if let Some(defined) = self.defines.get(&name) {
                    return Ok(defined.deep_copy());
                }
                self.parse_atomic(line, name)
            }
        }
    }

    fn parse_within(&mut self) -> Result<Automaton<M>> {
        let timing = self.parse_timing()?;
        self.expect(Token::LBrace)?;
        let mut inner = self.parse_expr()?;
        self.expect(Token::RBrace)?;
        // Reuse the last clock when nothing resets it.
        if inner.clock_count > 0 && ops::no_reset_last_clock(&inner) {
            inner.clock_count -= 1;
        }
        let clock = inner.clock_count;
        let params = self.parameters.len();
        let guard = match timing {
            Timing::Interval {
                low,
                low_inclusive,
                high,
                high_inclusive,
            } => {
                let low_rel = if low_inclusive { TimingRel::Ge } else { TimingRel::Gt };
                let high_rel = if high_inclusive { TimingRel::Le } else { TimingRel::Lt };
                let low_guard = M::clock_guard(clock, low_rel, &low, params)?;
                low_guard.conjoin(&M::clock_guard(clock, high_rel, &high, params)?)
            }
            Timing::Bound { rel, expr } => M::clock_guard(clock, rel, &expr, params)?,
        };
        Ok(ops::time_restriction(inner, guard))
    }

    fn parse_ignore(&mut self) -> Result<Automaton<M>> {
        self.expect(Token::LBrace)?;
        let mut actions = Vec::new();
        while !self.eat(&Token::RBrace) {
            let line = self.line();
            let name = self.expect_ident()?;
            let position = self
                .signatures
                .iter()
                .position(|s| s.name == name)
                .with_context(|| format!("line {line}: undeclared action `{name}`"))?;
            actions.push(Action(position as u32));
            self.eat(&Token::Comma);
        }
        let line = self.line();
        let keyword = self.expect_ident()?;
        ensure!(keyword == "in", "line {line}: expected `in`, found `{keyword}`");
        self.expect(Token::LBrace)?;
        let inner = self.parse_expr()?;
        self.expect(Token::RBrace)?;
        Ok(ops::ignore_actions(inner, &actions))
    }

    fn parse_atomic(&mut self, line: u32, name: String) -> Result<Automaton<M>> {
        let unobservable = name == "unobservable";
        let (action, signature) = if unobservable {
            (
                Action::UNOBSERVABLE,
                RawSignature {
                    name,
                    strings: Vec::new(),
                    numbers: Vec::new(),
                },
            )
        } else {
            let position = self
                .signatures
                .iter()
                .position(|s| s.name == name)
                .with_context(|| format!("line {line}: undeclared action `{name}`"))?;
            (Action(position as u32), self.signatures[position].clone())
        };

        let mut transition: Transition<M> =
            Transition::unconstrained(StateId::from(1usize), self.parameters.len(), 0);
        let mut has_content = false;
        if self.eat(&Token::LBrace) {
            while !self.eat(&Token::RBrace) {
                has_content = true;
                if matches!(self.peek(), Some(Token::Ident(_))) && self.peek_at(1) == Some(&Token::Assign) {
                    self.parse_assignment(&signature, &mut transition.update)?;
                } else {
                    let (strings, numbers) = self.parse_constraint(&signature)?;
                    transition.string_constraints.extend(strings);
                    transition.number_constraints.extend(numbers);
                }
                self.eat(&Token::Comma);
            }
        }

        let mut automaton: Automaton<M> = Automaton::new(
            0,
            self.parameters.len(),
            self.global_strings.len(),
            self.global_numbers.len(),
        );
        if unobservable && !has_content {
            // A bare `unobservable` matches the empty word.
            let only = automaton.add_state(true);
            automaton.initial.push(only);
            return Ok(automaton);
        }
        let start = automaton.add_state(false);
        automaton.add_state(true);
        automaton.initial.push(start);
        automaton.add_transition(start, action, transition);
        Ok(automaton)
    }

    // ---- constraints and assignments ------------------------------------

    /// Resolves an identifier against the global string variables and the
    /// signature's string payload.
    fn string_var(&self, signature: &RawSignature, name: &str) -> Option<VariableId> {
        if let Some(i) = self.global_strings.iter().position(|v| v == name) {
            return Some(i);
        }
        signature
            .strings
            .iter()
            .position(|v| v == name)
            .map(|i| self.global_strings.len() + i)
    }

    /// Resolves an identifier against the global number variables and the
    /// signature's number payload.
    fn number_var(&self, signature: &RawSignature, name: &str) -> Option<VariableId> {
        if let Some(i) = self.global_numbers.iter().position(|v| v == name) {
            return Some(i);
        }
        signature
            .numbers
            .iter()
            .position(|v| v == name)
            .map(|i| self.global_numbers.len() + i)
    }

    fn parse_cmp(&mut self) -> Result<Cmp> {
        let line = self.line();
        Ok(match self.next()? {
            Token::Lt => Cmp::Lt,
            Token::Le => Cmp::Le,
            Token::Eq => Cmp::Eq,
            Token::Ne => Cmp::Ne,
            Token::Ge => Cmp::Ge,
            Token::Gt => Cmp::Gt,
            found => bail!("line {line}: expected a comparison, found {found}"),
        })
    }

    /// One constraint; the kind follows from the left operand.
    fn parse_constraint(
        &mut self,
        signature: &RawSignature,
    ) -> Result<(Vec<StringConstraint>, Vec<M::NumberConstraint>)> {
        let line = self.line();
        let string_lhs = match self.peek() {
            Some(Token::Str(_)) => true,
            Some(Token::Ident(name)) => self.string_var(signature, name).is_some(),
            _ => false,
        };
        if string_lhs {
            let left = self.parse_string_atom(signature)?;
            let op = match self.parse_cmp()? {
                Cmp::Eq => StringOp::Eq,
                Cmp::Ne => StringOp::Ne,
                other => bail!("line {line}: string constraints support `=` and `<>`, found `{other}`"),
            };
            let right = self.parse_string_atom(signature)?;
            Ok((vec![StringConstraint::new(left, op, right)], vec![]))
        } else {
            let left = self.parse_num_expr(signature)?;
            let cmp = self.parse_cmp()?;
            let right = self.parse_num_expr(signature)?;
            let dim = self.global_numbers.len() + signature.numbers.len();
            let constraint = M::number_constraint(&left, cmp, &right, dim)
                .with_context(|| format!("line {line}"))?;
            Ok((vec![], vec![constraint]))
        }
    }

    fn parse_string_atom(&mut self, signature: &RawSignature) -> Result<StringAtom> {
        let line = self.line();
        match self.next()? {
            Token::Str(text) => Ok(StringAtom::Literal(text)),
            Token::Ident(name) => self
                .string_var(signature, &name)
                .map(StringAtom::Var)
                .with_context(|| format!("line {line}: undeclared string variable `{name}`")),
            found => bail!("line {line}: expected a string operand, found {found}"),
        }
    }

    fn parse_assignment(&mut self, signature: &RawSignature, update: &mut M::Update) -> Result<()> {
        let line = self.line();
        let target = self.expect_ident()?;
        self.expect(Token::Assign)?;
        // Assignments write global variables only.
        if let Some(id) = self.global_strings.iter().position(|v| v == &target) {
            let atom = self.parse_string_atom(signature)?;
            M::push_string_update(update, id, atom);
            Ok(())
        } else if let Some(id) = self.global_numbers.iter().position(|v| v == &target) {
            let value = self.parse_num_expr(signature)?;
            let dim = self.global_numbers.len() + signature.numbers.len();
            M::push_number_update(update, id, &value, dim).with_context(|| format!("line {line}"))
        } else {
            bail!("line {line}: assignment to undeclared variable `{target}`")
        }
    }

    // ---- numeric and timing expressions ---------------------------------

    fn parse_num_expr(&mut self, signature: &RawSignature) -> Result<NumAst> {
        let mut expr = self.parse_num_term(signature)?;
        loop {
            if self.eat(&Token::Plus) {
                expr = NumAst::Add(Box::new(expr), Box::new(self.parse_num_term(signature)?));
            } else if self.eat(&Token::Minus) {
                expr = NumAst::Sub(Box::new(expr), Box::new(self.parse_num_term(signature)?));
            } else {
                return Ok(expr);
            }
        }
    }

    fn parse_num_term(&mut self, signature: &RawSignature) -> Result<NumAst> {
        let mut expr = self.parse_num_factor(signature)?;
        loop {
            if self.eat(&Token::Star) {
                expr = NumAst::Mul(Box::new(expr), Box::new(self.parse_num_factor(signature)?));
            } else if self.eat(&Token::Slash) {
                expr = NumAst::Div(Box::new(expr), Box::new(self.parse_num_factor(signature)?));
            } else {
                return Ok(expr);
            }
        }
    }

    fn parse_num_factor(&mut self, signature: &RawSignature) -> Result<NumAst> {
        let line = self.line();
        if self.eat(&Token::LParen) {
            let inner = self.parse_num_expr(signature)?;
            self.expect(Token::RParen)?;
            return Ok(inner);
        }
        match self.next()? {
            Token::Number(text) => Ok(NumAst::Const(parse_decimal(&text)?)),
            Token::Ident(name) => self
                .number_var(signature, &name)
                .map(NumAst::Var)
                .with_context(|| format!("line {line}: undeclared number variable `{name}`")),
            found => bail!("line {line}: expected a number operand, found {found}"),
        }
    }

    fn parse_timing(&mut self) -> Result<Timing> {
        let line = self.line();
        let open = match self.peek() {
            Some(Token::LBracket) => Some(true),
            Some(Token::LParen) => Some(false),
            _ => None,
        };
        if let Some(low_inclusive) = open {
            self.pos += 1;
            let low = self.parse_time_expr()?;
            self.expect(Token::Comma)?;
            let high = self.parse_time_expr()?;
            let high_inclusive = match self.next()? {
                Token::RBracket => true,
                Token::RParen => false,
                found => bail!("line {line}: expected `]` or `)`, found {found}"),
            };
            return Ok(Timing::Interval {
                low,
                low_inclusive,
                high,
                high_inclusive,
            });
        }
        let rel = timing_rel(self.parse_cmp()?).with_context(|| format!("line {line}"))?;
        let expr = self.parse_time_expr()?;
        Ok(Timing::Bound { rel, expr })
    }

    fn parse_time_expr(&mut self) -> Result<TimeAst> {
        let mut expr = self.parse_time_term()?;
        loop {
            if self.eat(&Token::Plus) {
                expr = TimeAst::Add(Box::new(expr), Box::new(self.parse_time_term()?));
            } else if self.eat(&Token::Minus) {
                expr = TimeAst::Sub(Box::new(expr), Box::new(self.parse_time_term()?));
            } else {
                return Ok(expr);
            }
        }
    }

    fn parse_time_term(&mut self) -> Result<TimeAst> {
        let line = self.line();
        if self.eat(&Token::LParen) {
            let inner = self.parse_time_expr()?;
            self.expect(Token::RParen)?;
            return Ok(inner);
        }
        match self.next()? {
            Token::Number(text) => Ok(TimeAst::Const(parse_decimal(&text)?)),
            Token::Ident(name) => {
                let position = self
                    .parameters
                    .iter()
                    .position(|p| p == &name)
                    .with_context(|| format!("line {line}: undeclared timing parameter `{name}`"))?;
                Ok(TimeAst::Param(position))
            }
            found => bail!("line {line}: expected a timing operand, found {found}"),
        }
    }
}

enum Timing {
    Interval {
        low: TimeAst,
        low_inclusive: bool,
        high: TimeAst,
        high_inclusive: bool,
    },
    Bound { rel: TimingRel, expr: TimeAst },
}
