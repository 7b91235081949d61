//! Shared surface-syntax pieces: numeric and time expressions with exact
//! constants, and their lowering into the per-mode constraint and guard
//! types.

use anyhow::{bail, ensure, Result};
use symon::automata::{Boolean, DataParametric, Mode, Parametric};
use symon::constraints::{Cmp, ClockBound, NumberExpr, ScalarConstraint, StringAtom, TimingRel};
use symon::core::{to_f64, ClockId, NumError, Rational, VariableId};
use symon::poly::{LinearConstraint, LinearExpr, Polyhedron};

/// A parsed numeric expression. Variable indices are already resolved
/// against the declared number variables (and, past their count, the event
/// payload).
#[derive(Clone, Debug, PartialEq)]
pub enum NumAst {
    Var(VariableId),
    Const(Rational),
    Add(Box<NumAst>, Box<NumAst>),
    Sub(Box<NumAst>, Box<NumAst>),
    Mul(Box<NumAst>, Box<NumAst>),
    Div(Box<NumAst>, Box<NumAst>),
}

impl NumAst {
    pub fn var(v: VariableId) -> Self {
        NumAst::Var(v)
    }

    pub fn constant(c: Rational) -> Self {
        NumAst::Const(c)
    }
}

/// Evaluates a constant subexpression.
pub fn eval_const(ast: &NumAst) -> Result<Rational> {
    use num_traits::Zero;
    Ok(match ast {
        NumAst::Var(v) => bail!("expected a constant, found variable x{v}"),
        NumAst::Const(c) => c.clone(),
        NumAst::Add(a, b) => eval_const(a)? + eval_const(b)?,
        NumAst::Sub(a, b) => eval_const(a)? - eval_const(b)?,
        NumAst::Mul(a, b) => eval_const(a)? * eval_const(b)?,
        NumAst::Div(a, b) => {
            let denom = eval_const(b)?;
            if denom.is_zero() {
                return Err(NumError::DivisionByZero.into());
            }
            eval_const(a)? / denom
        }
    })
}

fn const_f64(ast: &NumAst) -> Result<f64> {
    let value = eval_const(ast)?;
    to_f64(&value).ok_or_else(|| anyhow::anyhow!("constant out of range: {value}"))
}

/// Lowers to the concrete-mode expression tree. Products and quotients must
/// fold to constants.
pub fn to_number_expr(ast: &NumAst) -> Result<NumberExpr> {
    if let Ok(c) = eval_const(ast) {
        let value = to_f64(&c).ok_or_else(|| anyhow::anyhow!("constant out of range: {c}"))?;
        return Ok(NumberExpr::Const(value));
    }
    Ok(match ast {
        NumAst::Var(v) => NumberExpr::Var(*v),
        NumAst::Const(_) => unreachable!("constants fold above"),
        NumAst::Add(a, b) => NumberExpr::Add(Box::new(to_number_expr(a)?), Box::new(to_number_expr(b)?)),
        NumAst::Sub(a, b) => NumberExpr::Sub(Box::new(to_number_expr(a)?), Box::new(to_number_expr(b)?)),
        NumAst::Mul(..) | NumAst::Div(..) => {
            bail!("products and quotients of variables are not supported")
        }
    })
}

/// Lowers to a linear expression over `dim` number dimensions.
pub fn to_linear_expr(ast: &NumAst, dim: usize) -> Result<LinearExpr> {
    Ok(match ast {
        NumAst::Var(v) => {
            ensure!(*v < dim, "number variable x{v} out of range");
            LinearExpr::variable(dim, *v)
        }
        NumAst::Const(c) => LinearExpr::constant(dim, c.clone()),
        NumAst::Add(a, b) => to_linear_expr(a, dim)? + to_linear_expr(b, dim)?,
        NumAst::Sub(a, b) => to_linear_expr(a, dim)? - to_linear_expr(b, dim)?,
        NumAst::Mul(a, b) => {
            if let Ok(k) = eval_const(a) {
                to_linear_expr(b, dim)?.scaled(&k)
            } else if let Ok(k) = eval_const(b) {
                to_linear_expr(a, dim)?.scaled(&k)
            } else {
                bail!("nonlinear product in a number expression")
            }
        }
        NumAst::Div(a, b) => {
            use num_traits::Zero;
            let k = eval_const(b)?;
            if k.is_zero() {
                return Err(NumError::DivisionByZero.into());
            }
            to_linear_expr(a, dim)?.scaled(&(Rational::from_integer(1.into()) / k))
        }
    })
}

fn linear_constraint(left: &NumAst, cmp: Cmp, right: &NumAst, dim: usize) -> Result<LinearConstraint> {
    let l = to_linear_expr(left, dim)?;
    let r = to_linear_expr(right, dim)?;
    Ok(match cmp {
        Cmp::Lt => LinearConstraint::lt(l, r),
        Cmp::Le => LinearConstraint::le(l, r),
        Cmp::Eq => LinearConstraint::eq(l, r),
        Cmp::Ge => LinearConstraint::ge(l, r),
        Cmp::Gt => LinearConstraint::gt(l, r),
        Cmp::Ne => bail!("disequalities are not supported by the symbolic number domain"),
    })
}

/// A parsed timing expression: parameters, constants, sums and differences.
#[derive(Clone, Debug, PartialEq)]
pub enum TimeAst {
    Param(usize),
    Const(Rational),
    Add(Box<TimeAst>, Box<TimeAst>),
    Sub(Box<TimeAst>, Box<TimeAst>),
}

fn time_const(ast: &TimeAst) -> Result<Rational> {
    Ok(match ast {
        TimeAst::Param(p) => bail!("timing parameter p{p} is only available in parametric mode"),
        TimeAst::Const(c) => c.clone(),
        TimeAst::Add(a, b) => time_const(a)? + time_const(b)?,
        TimeAst::Sub(a, b) => time_const(a)? - time_const(b)?,
    })
}

/// Lowers a timing expression over the (parameter, clock) dimension layout.
fn time_linear(ast: &TimeAst, params: usize, dim: usize) -> Result<LinearExpr> {
    Ok(match ast {
        TimeAst::Param(p) => {
            ensure!(*p < params, "timing parameter p{p} out of range");
            LinearExpr::variable(dim, *p)
        }
        TimeAst::Const(c) => LinearExpr::constant(dim, c.clone()),
        TimeAst::Add(a, b) => time_linear(a, params, dim)? + time_linear(b, params, dim)?,
        TimeAst::Sub(a, b) => time_linear(a, params, dim)? - time_linear(b, params, dim)?,
    })
}

fn concrete_clock_guard(clock: ClockId, rel: TimingRel, expr: &TimeAst) -> Result<Vec<ClockBound>> {
    let value = time_const(expr)?;
    let bound = to_f64(&value).ok_or_else(|| anyhow::anyhow!("guard constant out of range: {value}"))?;
    Ok(vec![ClockBound { clock, rel, bound }])
}

/// Lowering hooks that vary with the monitoring mode. The surface parsers
/// build [`NumAst`] / [`TimeAst`] values and hand them to these.
pub trait ModeBuild: Mode {
    /// Whether timing parameters and initial-constraint blocks exist.
    const PARAMETRIC: bool;

    fn number_constraint(left: &NumAst, cmp: Cmp, right: &NumAst, dim: usize) -> Result<Self::NumberConstraint>;

    fn push_string_update(update: &mut Self::Update, target: VariableId, atom: StringAtom);

    fn push_number_update(update: &mut Self::Update, target: VariableId, value: &NumAst, dim: usize) -> Result<()>;

    /// An atomic timing guard `x<clock> ∼ expr` over `params` parameters.
    fn clock_guard(clock: ClockId, rel: TimingRel, expr: &TimeAst, params: usize) -> Result<Self::Guard>;
}

impl ModeBuild for Boolean {
    const PARAMETRIC: bool = false;

    fn number_constraint(left: &NumAst, cmp: Cmp, right: &NumAst, _dim: usize) -> Result<Self::NumberConstraint> {
        // `expr ∼ constant`; a non-constant right side becomes
        // `(left - right) ∼ 0`.
        if let Ok(bound) = const_f64(right) {
            Ok(ScalarConstraint {
                expr: to_number_expr(left)?,
                cmp,
                bound,
            })
        } else {
            Ok(ScalarConstraint {
                expr: NumberExpr::Sub(Box::new(to_number_expr(left)?), Box::new(to_number_expr(right)?)),
                cmp,
                bound: 0.0,
            })
        }
    }

    fn push_string_update(update: &mut Self::Update, target: VariableId, atom: StringAtom) {
        update.strings.push((target, atom));
    }

    fn push_number_update(update: &mut Self::Update, target: VariableId, value: &NumAst, _dim: usize) -> Result<()> {
        match value {
            NumAst::Var(source) => {
                update.numbers.push((target, *source));
                Ok(())
            }
            _ => bail!("only variable-to-variable number assignments are supported in boolean mode"),
        }
    }

    fn clock_guard(clock: ClockId, rel: TimingRel, expr: &TimeAst, _params: usize) -> Result<Self::Guard> {
        concrete_clock_guard(clock, rel, expr)
    }
}

impl ModeBuild for DataParametric {
    const PARAMETRIC: bool = false;

    fn number_constraint(left: &NumAst, cmp: Cmp, right: &NumAst, dim: usize) -> Result<Self::NumberConstraint> {
        linear_constraint(left, cmp, right, dim)
    }

    fn push_string_update(update: &mut Self::Update, target: VariableId, atom: StringAtom) {
        update.strings.push((target, atom));
    }

    fn push_number_update(update: &mut Self::Update, target: VariableId, value: &NumAst, dim: usize) -> Result<()> {
        update.numbers.push((target, to_linear_expr(value, dim)?));
        Ok(())
    }

    fn clock_guard(clock: ClockId, rel: TimingRel, expr: &TimeAst, _params: usize) -> Result<Self::Guard> {
        concrete_clock_guard(clock, rel, expr)
    }
}

impl ModeBuild for Parametric {
    const PARAMETRIC: bool = true;

    fn number_constraint(left: &NumAst, cmp: Cmp, right: &NumAst, dim: usize) -> Result<Self::NumberConstraint> {
        linear_constraint(left, cmp, right, dim)
    }

    fn push_string_update(update: &mut Self::Update, target: VariableId, atom: StringAtom) {
        update.strings.push((target, atom));
    }

    fn push_number_update(update: &mut Self::Update, target: VariableId, value: &NumAst, dim: usize) -> Result<()> {
        update.numbers.push((target, to_linear_expr(value, dim)?));
        Ok(())
    }

    fn clock_guard(clock: ClockId, rel: TimingRel, expr: &TimeAst, params: usize) -> Result<Self::Guard> {
        let dim = params + clock + 1;
        let lhs = LinearExpr::variable(dim, params + clock);
        let rhs = time_linear(expr, params, dim)?;
        let constraint = match rel {
            TimingRel::Lt => LinearConstraint::lt(lhs, rhs),
            TimingRel::Le => LinearConstraint::le(lhs, rhs),
            TimingRel::Eq => LinearConstraint::eq(lhs, rhs),
            TimingRel::Ge => LinearConstraint::ge(lhs, rhs),
            TimingRel::Gt => LinearConstraint::gt(lhs, rhs),
        };
        let mut guard = Polyhedron::universe(dim);
        guard.add_constraint(constraint);
        Ok(guard)
    }
}

/// Maps a surface comparison to a guard relation; disequality is not a
/// timing relation.
pub fn timing_rel(cmp: Cmp) -> Result<TimingRel> {
    Ok(match cmp {
        Cmp::Lt => TimingRel::Lt,
        Cmp::Le => TimingRel::Le,
        Cmp::Eq => TimingRel::Eq,
        Cmp::Ge => TimingRel::Ge,
        Cmp::Gt => TimingRel::Gt,
        Cmp::Ne => bail!("`!=` is not a timing relation"),
    })
}
