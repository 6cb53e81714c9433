//! Symbolic expression trees.
//!
//! An [`Expr`] is built either by parsing a string ([`Expr::parse`]) or by
//! combining symbols and numbers with the usual arithmetic operators. All
//! construction goes through simplifying constructors that fold constants and
//! drop neutral elements, so derivatives of simple polynomials come out in a
//! readable form (`d/dx x^2` is `2*x`, not `2*x^(2 - 1)*1`).

use crate::error::{CalculusError, Result};
use crate::parser;
use crate::traits::Scalar;
use num_traits::Zero;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::ops::{Add, Div, Mul, Neg, Sub};
use std::str::FromStr;

/// Elementary functions that may appear in an expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Function {
    Sin,
    Cos,
    Tan,
    Asin,
    Acos,
    Atan,
    Sinh,
    Cosh,
    Tanh,
    Exp,
    Ln,
    Sqrt,
    Abs,
    /// `-1`, `0` or `1`; the derivative of `abs`.
    Sign,
}

impl Function {
    /// Looks up a function by the name used in expression strings.
    /// `log` is accepted as an alias for the natural logarithm.
    pub fn from_name(name: &str) -> Option<Self> {
        let func = match name {
            "sin" => Function::Sin,
            "cos" => Function::Cos,
            "tan" => Function::Tan,
            "asin" => Function::Asin,
            "acos" => Function::Acos,
            "atan" => Function::Atan,
            "sinh" => Function::Sinh,
            "cosh" => Function::Cosh,
            "tanh" => Function::Tanh,
            "exp" => Function::Exp,
            "ln" | "log" => Function::Ln,
            "sqrt" => Function::Sqrt,
            "abs" => Function::Abs,
            "sign" => Function::Sign,
            _ => return None,
        };
        Some(func)
    }

    pub fn name(self) -> &'static str {
        match self {
            Function::Sin => "sin",
            Function::Cos => "cos",
            Function::Tan => "tan",
            Function::Asin => "asin",
            Function::Acos => "acos",
            Function::Atan => "atan",
            Function::Sinh => "sinh",
            Function::Cosh => "cosh",
            Function::Tanh => "tanh",
            Function::Exp => "exp",
            Function::Ln => "ln",
            Function::Sqrt => "sqrt",
            Function::Abs => "abs",
            Function::Sign => "sign",
        }
    }

    /// Evaluates the function on any scalar type.
    pub fn apply<T: Scalar>(self, value: T) -> T {
        match self {
            Function::Sin => value.sin(),
            Function::Cos => value.cos(),
            Function::Tan => value.tan(),
            Function::Asin => value.asin(),
            Function::Acos => value.acos(),
            Function::Atan => value.atan(),
            Function::Sinh => value.sinh(),
            Function::Cosh => value.cosh(),
            Function::Tanh => value.tanh(),
            Function::Exp => value.exp(),
            Function::Ln => value.ln(),
            Function::Sqrt => value.sqrt(),
            Function::Abs => value.abs(),
            Function::Sign => {
                if value.is_zero() {
                    T::zero()
                } else {
                    value.signum()
                }
            }
        }
    }

    /// Outer derivative f'(u), to be multiplied by u' for the chain rule.
    fn derivative_at(self, arg: &Expr) -> Expr {
        let u = || arg.clone();
        let unit_root = || {
            Expr::call(
                Function::Sqrt,
                Expr::difference(Expr::one(), Expr::power(u(), Expr::Number(2.0))),
            )
        };
        match self {
            Function::Sin => Expr::call(Function::Cos, u()),
            Function::Cos => Expr::negate(Expr::call(Function::Sin, u())),
            Function::Tan => Expr::quotient(
                Expr::one(),
                Expr::power(Expr::call(Function::Cos, u()), Expr::Number(2.0)),
            ),
            Function::Asin => Expr::quotient(Expr::one(), unit_root()),
            Function::Acos => Expr::negate(Expr::quotient(Expr::one(), unit_root())),
            Function::Atan => Expr::quotient(
                Expr::one(),
                Expr::sum(Expr::one(), Expr::power(u(), Expr::Number(2.0))),
            ),
            Function::Sinh => Expr::call(Function::Cosh, u()),
            Function::Cosh => Expr::call(Function::Sinh, u()),
            Function::Tanh => Expr::difference(
                Expr::one(),
                Expr::power(Expr::call(Function::Tanh, u()), Expr::Number(2.0)),
            ),
            Function::Exp => Expr::call(Function::Exp, u()),
            Function::Ln => Expr::quotient(Expr::one(), u()),
            Function::Sqrt => Expr::quotient(
                Expr::one(),
                Expr::product(Expr::Number(2.0), Expr::call(Function::Sqrt, u())),
            ),
            Function::Abs => Expr::call(Function::Sign, u()),
            Function::Sign => Expr::zero(),
        }
    }
}

/// A symbolic scalar expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    Number(f64),
    Symbol(String),
    Add(Box<Expr>, Box<Expr>),
    Sub(Box<Expr>, Box<Expr>),
    Mul(Box<Expr>, Box<Expr>),
    Div(Box<Expr>, Box<Expr>),
    Pow(Box<Expr>, Box<Expr>),
    Neg(Box<Expr>),
    Call(Function, Box<Expr>),
}

impl Expr {
    /// Parses an expression such as `"x^2*sin(y) + 3"`.
    pub fn parse(input: &str) -> Result<Expr> {
        parser::parse(input)
    }

    pub fn symbol(name: impl Into<String>) -> Expr {
        Expr::Symbol(name.into())
    }

    pub fn number(value: f64) -> Expr {
        Expr::Number(value)
    }

    pub fn one() -> Expr {
        Expr::Number(1.0)
    }

    pub fn is_one(&self) -> bool {
        matches!(self, Expr::Number(v) if *v == 1.0)
    }

    /// Returns the value if the expression has been reduced to a number.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Expr::Number(v) => Some(*v),
            _ => None,
        }
    }

    // --- Simplifying constructors ---

    pub fn sum(a: Expr, b: Expr) -> Expr {
        match (a, b) {
            (Expr::Number(l), Expr::Number(r)) => Expr::Number(l + r),
            (a, b) if a.is_zero() => b,
            (a, b) if b.is_zero() => a,
            (a, Expr::Neg(inner)) => Expr::difference(a, *inner),
            (a, Expr::Number(r)) if r < 0.0 => Expr::difference(a, Expr::Number(-r)),
            (a, b) => Expr::Add(Box::new(a), Box::new(b)),
        }
    }

    pub fn difference(a: Expr, b: Expr) -> Expr {
        match (a, b) {
            (Expr::Number(l), Expr::Number(r)) => Expr::Number(l - r),
            (a, b) if b.is_zero() => a,
            (a, b) if a.is_zero() => Expr::negate(b),
            (a, b) if a == b => Expr::zero(),
            (a, Expr::Neg(inner)) => Expr::sum(a, *inner),
            (a, Expr::Number(r)) if r < 0.0 => Expr::sum(a, Expr::Number(-r)),
            (a, b) => Expr::Sub(Box::new(a), Box::new(b)),
        }
    }

    /// Multiplication; numeric factors are kept on the left and merged.
    pub fn product(a: Expr, b: Expr) -> Expr {
        match (a, b) {
            (Expr::Number(l), Expr::Number(r)) => Expr::Number(l * r),
            (a, b) if a.is_zero() || b.is_zero() => Expr::zero(),
            (a, b) if a.is_one() => b,
            (a, b) if b.is_one() => a,
            (Expr::Number(l), b) if l == -1.0 => Expr::negate(b),
            (a, Expr::Number(r)) => Expr::product(Expr::Number(r), a),
            (Expr::Number(l), Expr::Mul(inner_l, inner_r)) => match *inner_l {
                Expr::Number(m) => Expr::product(Expr::Number(l * m), *inner_r),
                other => Expr::Mul(
                    Box::new(Expr::Number(l)),
                    Box::new(Expr::Mul(Box::new(other), inner_r)),
                ),
            },
            (Expr::Neg(inner), b) => Expr::negate(Expr::product(*inner, b)),
            (a, Expr::Neg(inner)) => Expr::negate(Expr::product(a, *inner)),
            (a, b) => Expr::Mul(Box::new(a), Box::new(b)),
        }
    }

    /// Division. A literal zero denominator is kept symbolic; evaluating it
    /// yields an infinite or NaN value.
    pub fn quotient(a: Expr, b: Expr) -> Expr {
        match (a, b) {
            (Expr::Number(l), Expr::Number(r)) if r != 0.0 => Expr::Number(l / r),
            (a, b) if a.is_zero() && !b.is_zero() => Expr::zero(),
            (a, b) if b.is_one() => a,
            (a, b) if a == b && !b.is_zero() => Expr::one(),
            (a, b) => Expr::Div(Box::new(a), Box::new(b)),
        }
    }

    pub fn power(base: Expr, exponent: Expr) -> Expr {
        match (base, exponent) {
            (Expr::Number(b), Expr::Number(e)) if b.powf(e).is_finite() => {
                Expr::Number(b.powf(e))
            }
            (_, e) if e.is_zero() => Expr::one(),
            (b, e) if e.is_one() => b,
            (b, _) if b.is_one() => Expr::one(),
            (b, e) => Expr::Pow(Box::new(b), Box::new(e)),
        }
    }

    pub fn negate(a: Expr) -> Expr {
        match a {
            Expr::Number(v) if v == 0.0 => Expr::zero(),
            Expr::Number(v) => Expr::Number(-v),
            Expr::Neg(inner) => *inner,
            Expr::Sub(l, r) => Expr::Sub(r, l),
            Expr::Mul(l, r) => match *l {
                Expr::Number(c) => Expr::product(Expr::Number(-c), *r),
                other => Expr::Neg(Box::new(Expr::Mul(Box::new(other), r))),
            },
            other => Expr::Neg(Box::new(other)),
        }
    }

    /// Applies `func`, folding it when the argument is a number and the
    /// result is finite.
    pub fn call(func: Function, arg: Expr) -> Expr {
        if let Expr::Number(v) = arg {
            let folded = func.apply(v);
            if folded.is_finite() {
                return Expr::Number(folded);
            }
        }
        Expr::Call(func, Box::new(arg))
    }

    pub fn pow(self, exponent: impl Into<Expr>) -> Expr {
        Expr::power(self, exponent.into())
    }

    pub fn apply(self, func: Function) -> Expr {
        Expr::call(func, self)
    }

    pub fn sqrt(self) -> Expr {
        Expr::call(Function::Sqrt, self)
    }

    pub fn sin(self) -> Expr {
        Expr::call(Function::Sin, self)
    }

    pub fn cos(self) -> Expr {
        Expr::call(Function::Cos, self)
    }

    pub fn exp(self) -> Expr {
        Expr::call(Function::Exp, self)
    }

    pub fn ln(self) -> Expr {
        Expr::call(Function::Ln, self)
    }

    // --- Calculus ---

    /// Whether `var` occurs anywhere in the expression.
    pub fn depends_on(&self, var: &str) -> bool {
        match self {
            Expr::Number(_) => false,
            Expr::Symbol(name) => name == var,
            Expr::Add(a, b) | Expr::Sub(a, b) | Expr::Mul(a, b) | Expr::Div(a, b) | Expr::Pow(a, b) => {
                a.depends_on(var) || b.depends_on(var)
            }
            Expr::Neg(a) | Expr::Call(_, a) => a.depends_on(var),
        }
    }

    /// Partial derivative with respect to `var`.
    pub fn diff(&self, var: &str) -> Expr {
        match self {
            Expr::Number(_) => Expr::zero(),
            Expr::Symbol(name) => {
                if name == var {
                    Expr::one()
                } else {
                    Expr::zero()
                }
            }
            Expr::Add(a, b) => Expr::sum(a.diff(var), b.diff(var)),
            Expr::Sub(a, b) => Expr::difference(a.diff(var), b.diff(var)),
            Expr::Mul(a, b) => Expr::sum(
                Expr::product(a.diff(var), (**b).clone()),
                Expr::product((**a).clone(), b.diff(var)),
            ),
            Expr::Div(a, b) => {
                if !b.depends_on(var) {
                    return Expr::quotient(a.diff(var), (**b).clone());
                }
                Expr::quotient(
                    Expr::difference(
                        Expr::product(a.diff(var), (**b).clone()),
                        Expr::product((**a).clone(), b.diff(var)),
                    ),
                    Expr::power((**b).clone(), Expr::Number(2.0)),
                )
            }
            Expr::Pow(base, exponent) => {
                if !exponent.depends_on(var) {
                    let reduced = Expr::difference((**exponent).clone(), Expr::one());
                    Expr::product(
                        Expr::product((**exponent).clone(), Expr::power((**base).clone(), reduced)),
                        base.diff(var),
                    )
                } else {
                    // d(f^g) = f^g * (g' ln f + g f' / f)
                    let log_term = Expr::product(
                        exponent.diff(var),
                        Expr::call(Function::Ln, (**base).clone()),
                    );
                    let ratio_term = Expr::quotient(
                        Expr::product((**exponent).clone(), base.diff(var)),
                        (**base).clone(),
                    );
                    Expr::product(self.clone(), Expr::sum(log_term, ratio_term))
                }
            }
            Expr::Neg(a) => Expr::negate(a.diff(var)),
            Expr::Call(func, arg) => Expr::product(func.derivative_at(arg), arg.diff(var)),
        }
    }

    // --- Substitution & evaluation ---

    pub fn subs(&self, var: &str, value: &Expr) -> Expr {
        self.subs_all(&[(var, value.clone())])
    }

    /// Replaces every listed symbol simultaneously and re-simplifies.
    pub fn subs_all(&self, bindings: &[(&str, Expr)]) -> Expr {
        match self {
            Expr::Number(v) => Expr::Number(*v),
            Expr::Symbol(name) => bindings
                .iter()
                .find(|(bound, _)| *bound == name.as_str())
                .map(|(_, value)| value.clone())
                .unwrap_or_else(|| self.clone()),
            Expr::Add(a, b) => Expr::sum(a.subs_all(bindings), b.subs_all(bindings)),
            Expr::Sub(a, b) => Expr::difference(a.subs_all(bindings), b.subs_all(bindings)),
            Expr::Mul(a, b) => Expr::product(a.subs_all(bindings), b.subs_all(bindings)),
            Expr::Div(a, b) => Expr::quotient(a.subs_all(bindings), b.subs_all(bindings)),
            Expr::Pow(a, b) => Expr::power(a.subs_all(bindings), b.subs_all(bindings)),
            Expr::Neg(a) => Expr::negate(a.subs_all(bindings)),
            Expr::Call(func, a) => Expr::call(*func, a.subs_all(bindings)),
        }
    }

    /// Evaluates numerically. Every symbol must be bound.
    pub fn eval(&self, bindings: &[(&str, f64)]) -> Result<f64> {
        let value = match self {
            Expr::Number(v) => *v,
            Expr::Symbol(name) => bindings
                .iter()
                .find(|(bound, _)| *bound == name.as_str())
                .map(|(_, value)| *value)
                .ok_or_else(|| CalculusError::UnknownSymbol(name.clone()))?,
            Expr::Add(a, b) => a.eval(bindings)? + b.eval(bindings)?,
            Expr::Sub(a, b) => a.eval(bindings)? - b.eval(bindings)?,
            Expr::Mul(a, b) => a.eval(bindings)? * b.eval(bindings)?,
            Expr::Div(a, b) => a.eval(bindings)? / b.eval(bindings)?,
            Expr::Pow(a, b) => a.eval(bindings)?.powf(b.eval(bindings)?),
            Expr::Neg(a) => -a.eval(bindings)?,
            Expr::Call(func, a) => func.apply(a.eval(bindings)?),
        };
        Ok(value)
    }

    pub fn free_symbols(&self) -> BTreeSet<String> {
        let mut symbols = BTreeSet::new();
        self.collect_symbols(&mut symbols);
        symbols
    }

    fn collect_symbols(&self, out: &mut BTreeSet<String>) {
        match self {
            Expr::Number(_) => {}
            Expr::Symbol(name) => {
                out.insert(name.clone());
            }
            Expr::Add(a, b) | Expr::Sub(a, b) | Expr::Mul(a, b) | Expr::Div(a, b) | Expr::Pow(a, b) => {
                a.collect_symbols(out);
                b.collect_symbols(out);
            }
            Expr::Neg(a) | Expr::Call(_, a) => a.collect_symbols(out),
        }
    }

    fn precedence(&self) -> u8 {
        match self {
            Expr::Add(..) | Expr::Sub(..) => 1,
            Expr::Mul(..) | Expr::Div(..) => 2,
            Expr::Neg(_) => 3,
            Expr::Number(v) if *v < 0.0 => 3,
            Expr::Pow(..) => 4,
            Expr::Number(_) | Expr::Symbol(_) | Expr::Call(..) => 5,
        }
    }
}

fn write_operand(f: &mut fmt::Formatter<'_>, expr: &Expr, min_precedence: u8) -> fmt::Result {
    if expr.precedence() < min_precedence {
        write!(f, "({expr})")
    } else {
        write!(f, "{expr}")
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Number(v) => write!(f, "{v}"),
            Expr::Symbol(name) => write!(f, "{name}"),
            Expr::Add(a, b) => {
                write_operand(f, a, 1)?;
                f.write_str(" + ")?;
                write_operand(f, b, 1)
            }
            Expr::Sub(a, b) => {
                write_operand(f, a, 1)?;
                f.write_str(" - ")?;
                write_operand(f, b, 2)
            }
            Expr::Mul(a, b) => {
                write_operand(f, a, 2)?;
                f.write_str("*")?;
                write_operand(f, b, 3)
            }
            Expr::Div(a, b) => {
                write_operand(f, a, 2)?;
                f.write_str("/")?;
                write_operand(f, b, 3)
            }
            Expr::Pow(a, b) => {
                write_operand(f, a, 5)?;
                f.write_str("^")?;
                write_operand(f, b, 4)
            }
            Expr::Neg(a) => {
                f.write_str("-")?;
                write_operand(f, a, 3)
            }
            Expr::Call(func, a) => write!(f, "{}({a})", func.name()),
        }
    }
}

impl FromStr for Expr {
    type Err = CalculusError;

    fn from_str(s: &str) -> Result<Self> {
        Expr::parse(s)
    }
}

impl From<f64> for Expr {
    fn from(value: f64) -> Self {
        Expr::Number(value)
    }
}

impl Zero for Expr {
    fn zero() -> Self {
        Expr::Number(0.0)
    }

    fn is_zero(&self) -> bool {
        matches!(self, Expr::Number(v) if *v == 0.0)
    }
}

impl Add for Expr {
    type Output = Expr;
    fn add(self, rhs: Expr) -> Expr {
        Expr::sum(self, rhs)
    }
}

impl Sub for Expr {
    type Output = Expr;
    fn sub(self, rhs: Expr) -> Expr {
        Expr::difference(self, rhs)
    }
}

impl Mul for Expr {
    type Output = Expr;
    fn mul(self, rhs: Expr) -> Expr {
        Expr::product(self, rhs)
    }
}

impl Div for Expr {
    type Output = Expr;
    fn div(self, rhs: Expr) -> Expr {
        Expr::quotient(self, rhs)
    }
}

impl Neg for Expr {
    type Output = Expr;
    fn neg(self) -> Expr {
        Expr::negate(self)
    }
}

/// The coordinate symbols used throughout the crate.
pub mod symbols {
    use super::Expr;

    pub const X: &str = "x";
    pub const Y: &str = "y";
    pub const Z: &str = "z";
    /// Curve parameter.
    pub const T: &str = "t";

    pub fn x() -> Expr {
        Expr::symbol(X)
    }

    pub fn y() -> Expr {
        Expr::symbol(Y)
    }

    pub fn z() -> Expr {
        Expr::symbol(Z)
    }

    pub fn t() -> Expr {
        Expr::symbol(T)
    }
}

#[cfg(test)]
mod tests {
    use super::symbols::{x, y};
    use super::*;

    fn parse(input: &str) -> Expr {
        Expr::parse(input).expect("expression should parse")
    }

    #[test]
    fn constructors_fold_constants_and_identities() {
        assert_eq!(Expr::sum(Expr::Number(2.0), Expr::Number(3.0)), Expr::Number(5.0));
        assert_eq!(x() + Expr::zero(), x());
        assert_eq!(Expr::one() * x(), x());
        assert_eq!(x() * Expr::zero(), Expr::zero());
        assert_eq!(x() - x(), Expr::zero());
        assert_eq!(x().pow(1.0), x());
        assert_eq!(x().pow(0.0), Expr::one());
        assert_eq!(-(-x()), x());
    }

    #[test]
    fn product_keeps_numeric_factor_on_the_left() {
        let expr = x() * Expr::Number(3.0);
        assert_eq!(expr, Expr::Mul(Box::new(Expr::Number(3.0)), Box::new(x())));
        let nested = Expr::Number(2.0) * expr;
        assert_eq!(nested.to_string(), "6*x");
    }

    #[test]
    fn diff_of_polynomial_is_simplified() {
        let f = parse("x^2 + y^2");
        assert_eq!(f.diff("x"), parse("2*x"));
        assert_eq!(f.diff("y"), parse("2*y"));
        assert_eq!(f.diff("z"), Expr::zero());
    }

    #[test]
    fn diff_product_rule_matches_expected_terms() {
        let f = parse("2*x*y");
        assert_eq!(f.diff("y"), parse("2*x"));
        assert_eq!(f.diff("x"), parse("2*y"));
    }

    #[test]
    fn diff_chain_rule_evaluates_correctly() {
        let f = parse("sin(x^2) + exp(2*x)");
        let df = f.diff("x");
        let at = 0.7_f64;
        let expected = 2.0 * at * (at * at).cos() + 2.0 * (2.0 * at).exp();
        let value = df.eval(&[("x", at)]).expect("derivative should evaluate");
        assert!((value - expected).abs() < 1e-12, "got {value}, expected {expected}");
    }

    #[test]
    fn diff_quotient_and_variable_exponent() {
        let at = 1.3_f64;
        let quotient = parse("x/(1 + x^2)").diff("x");
        let expected = (1.0 - at * at) / (1.0 + at * at).powi(2);
        let value = quotient.eval(&[("x", at)]).expect("quotient derivative");
        assert!((value - expected).abs() < 1e-12);

        let tower = parse("x^x").diff("x");
        let expected = at.powf(at) * (at.ln() + 1.0);
        let value = tower.eval(&[("x", at)]).expect("x^x derivative");
        assert!((value - expected).abs() < 1e-12);
    }

    #[test]
    fn inverse_trig_derivatives_match_closed_forms() {
        let at = 0.4_f64;
        let cases = [
            ("asin(x)", 1.0 / (1.0 - at * at).sqrt()),
            ("acos(x)", -1.0 / (1.0 - at * at).sqrt()),
            ("atan(x)", 1.0 / (1.0 + at * at)),
            ("tanh(x)", 1.0 - at.tanh().powi(2)),
            ("sqrt(x)", 0.5 / at.sqrt()),
            ("ln(x)", 1.0 / at),
        ];
        for (input, expected) in cases {
            let value = parse(input)
                .diff("x")
                .eval(&[("x", at)])
                .expect("derivative should evaluate");
            assert!((value - expected).abs() < 1e-12, "{input}: got {value}, expected {expected}");
        }
    }

    #[test]
    fn abs_derivative_is_sign_and_finite_at_zero() {
        let slope = parse("abs(x)").diff("x");
        assert_eq!(slope, parse("sign(x)"));
        assert_eq!(slope.eval(&[("x", 0.0)]).expect("sign at 0"), 0.0);
        assert_eq!(slope.eval(&[("x", -2.5)]).expect("sign below 0"), -1.0);
        assert_eq!(slope.eval(&[("x", 3.0)]).expect("sign above 0"), 1.0);
        assert!(slope.diff("x").is_zero());
    }

    #[test]
    fn subs_replaces_and_folds() {
        let f = parse("x^2 + 3*y");
        let partially = f.subs("x", &Expr::Number(2.0));
        assert_eq!(partially, parse("4 + 3*y"));
        let fully = f.subs_all(&[("x", Expr::Number(2.0)), ("y", Expr::Number(1.0))]);
        assert_eq!(fully.as_number(), Some(7.0));
    }

    #[test]
    fn subs_all_is_simultaneous() {
        let f = parse("x - y");
        let swapped = f.subs_all(&[("x", y()), ("y", x())]);
        assert_eq!(swapped, parse("y - x"));
    }

    #[test]
    fn eval_reports_unbound_symbols() {
        let err = parse("x + a").eval(&[("x", 1.0)]).expect_err("a is unbound");
        assert!(matches!(err, CalculusError::UnknownSymbol(ref name) if name == "a"));
    }

    #[test]
    fn free_symbols_are_sorted_and_unique() {
        let symbols: Vec<String> = parse("z*x + sin(x*y)").free_symbols().into_iter().collect();
        assert_eq!(symbols, vec!["x", "y", "z"]);
    }

    #[test]
    fn display_uses_minimal_parentheses() {
        assert_eq!(parse("(x + y)*z").to_string(), "(x + y)*z");
        assert_eq!(parse("x - (y - z)").to_string(), "x - (y - z)");
        assert_eq!(parse("-x^2").to_string(), "-x^2");
        assert_eq!(parse("(x^2)^3").to_string(), "(x^2)^3");
        assert_eq!(parse("sin(x)/2").to_string(), "sin(x)/2");
    }

    #[test]
    fn display_round_trips_through_parser() {
        for input in ["x*y + z/(x - 1)", "-(x*y)", "exp(-x^2)*cos(t)", "2^x^y"] {
            let expr = parse(input);
            let reparsed = parse(&expr.to_string());
            assert_eq!(expr, reparsed, "{input} printed as {expr}");
        }
    }
}
