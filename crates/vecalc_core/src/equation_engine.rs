use crate::error::{CalculusError, Result};
use crate::expr::{Expr, Function};
use crate::traits::Scalar;
use std::cell::RefCell;
use std::collections::HashMap;

/// OpCodes for the Stack-based Virtual Machine.
/// The VM operates on a stack of `Scalar` values.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OpCode {
    /// Pushes a constant `f64` value onto the stack.
    LoadConst(f64),
    /// Pushes the value of a variable (by index) onto the stack.
    /// Indices follow the order the variables were given to the compiler.
    LoadVar(usize),
    /// Pops top two values (b, a), pushes (a + b).
    Add,
    /// Pops top two values (b, a), pushes (a - b).
    Sub,
    /// Pops top two values (b, a), pushes (a * b).
    Mul,
    /// Pops top two values (b, a), pushes (a / b).
    Div,
    /// Pops top two values (b, a), pushes (a ^ b).
    Pow,
    /// Pops top value (a), pushes -a.
    Neg,
    /// Pops top value (a), pushes f(a).
    Call(Function),
}

/// Represents a compiled sequence of operations.
#[derive(Debug, Clone, Default)]
pub struct Bytecode {
    pub ops: Vec<OpCode>,
}

/// Stack-based Virtual Machine for evaluating compiled expressions.
///
/// The VM is stateless; `execute` takes all necessary context:
/// - `bytecode`: Instructions to run.
/// - `vars`: Variable values (read-only).
/// - `stack`: A mutable buffer for intermediate computations.
pub struct VM;

impl VM {
    pub fn execute<T: Scalar>(bytecode: &Bytecode, vars: &[T], stack: &mut Vec<T>) -> T {
        stack.clear();

        for op in &bytecode.ops {
            match op {
                OpCode::LoadConst(val) => stack.push(T::from_f64(*val).unwrap_or_else(T::nan)),
                OpCode::LoadVar(idx) => stack.push(vars[*idx]),
                OpCode::Add => {
                    let (a, b) = pop_pair(stack);
                    stack.push(a + b);
                }
                OpCode::Sub => {
                    let (a, b) = pop_pair(stack);
                    stack.push(a - b);
                }
                OpCode::Mul => {
                    let (a, b) = pop_pair(stack);
                    stack.push(a * b);
                }
                OpCode::Div => {
                    let (a, b) = pop_pair(stack);
                    stack.push(a / b);
                }
                OpCode::Pow => {
                    let (a, b) = pop_pair(stack);
                    stack.push(a.powf(b));
                }
                OpCode::Neg => {
                    let a = pop(stack);
                    stack.push(-a);
                }
                OpCode::Call(func) => {
                    let a = pop(stack);
                    stack.push(func.apply(a));
                }
            }
        }

        // Compiled bytecode always leaves exactly one value; NaN flags a malformed program.
        pop(stack)
    }
}

fn pop<T: Scalar>(stack: &mut Vec<T>) -> T {
    stack.pop().unwrap_or_else(T::nan)
}

fn pop_pair<T: Scalar>(stack: &mut Vec<T>) -> (T, T) {
    let b = pop(stack);
    let a = pop(stack);
    (a, b)
}

/// Compiles an [`Expr`] into [`Bytecode`], resolving symbol names to
/// variable slots.
pub struct Compiler {
    pub var_map: HashMap<String, usize>,
}

impl Compiler {
    pub fn new(var_names: &[&str]) -> Self {
        let var_map = var_names
            .iter()
            .enumerate()
            .map(|(i, name)| (name.to_string(), i))
            .collect();
        Self { var_map }
    }

    pub fn compile(&self, expr: &Expr) -> Result<Bytecode> {
        let mut ops = Vec::new();
        self.compile_recursive(expr, &mut ops)?;
        Ok(Bytecode { ops })
    }

    fn compile_recursive(&self, expr: &Expr, ops: &mut Vec<OpCode>) -> Result<()> {
        match expr {
            Expr::Number(n) => ops.push(OpCode::LoadConst(*n)),
            Expr::Symbol(name) => {
                let idx = self
                    .var_map
                    .get(name)
                    .ok_or_else(|| CalculusError::UnknownSymbol(name.clone()))?;
                ops.push(OpCode::LoadVar(*idx));
            }
            Expr::Add(a, b) => self.compile_binary(a, b, OpCode::Add, ops)?,
            Expr::Sub(a, b) => self.compile_binary(a, b, OpCode::Sub, ops)?,
            Expr::Mul(a, b) => self.compile_binary(a, b, OpCode::Mul, ops)?,
            Expr::Div(a, b) => self.compile_binary(a, b, OpCode::Div, ops)?,
            Expr::Pow(a, b) => self.compile_binary(a, b, OpCode::Pow, ops)?,
            Expr::Neg(a) => {
                self.compile_recursive(a, ops)?;
                ops.push(OpCode::Neg);
            }
            Expr::Call(func, arg) => {
                self.compile_recursive(arg, ops)?;
                ops.push(OpCode::Call(*func));
            }
        }
        Ok(())
    }

    fn compile_binary(&self, a: &Expr, b: &Expr, op: OpCode, ops: &mut Vec<OpCode>) -> Result<()> {
        self.compile_recursive(a, ops)?;
        self.compile_recursive(b, ops)?;
        ops.push(op);
        Ok(())
    }
}

/// A vector of compiled expressions over the same variables.
pub struct EquationSystem<T: Scalar> {
    pub equations: Vec<Bytecode>,
    // Interior mutability for VM stack to avoid allocation on every evaluation.
    // Note: This makes the system !Sync.
    stack: RefCell<Vec<T>>,
}

impl<T: Scalar> EquationSystem<T> {
    pub fn new(equations: Vec<Bytecode>) -> Self {
        Self {
            equations,
            stack: RefCell::new(Vec::with_capacity(64)),
        }
    }

    /// Compiles every expression against `var_names`.
    pub fn compile(exprs: &[Expr], var_names: &[&str]) -> Result<Self> {
        let compiler = Compiler::new(var_names);
        let equations = exprs
            .iter()
            .map(|expr| compiler.compile(expr))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::new(equations))
    }

    pub fn dimension(&self) -> usize {
        self.equations.len()
    }

    pub fn apply(&self, x: &[T], out: &mut [T]) {
        let mut stack = self.stack.borrow_mut();
        for (slot, eq) in out.iter_mut().zip(&self.equations) {
            *slot = VM::execute(eq, x, &mut stack);
        }
    }

    /// Evaluates the expression at `index` only.
    pub fn evaluate(&self, index: usize, x: &[T]) -> T {
        let mut stack = self.stack.borrow_mut();
        VM::execute(&self.equations[index], x, &mut stack)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compile(input: &str, vars: &[&str]) -> Result<Bytecode> {
        let expr = Expr::parse(input).expect("expression should parse");
        Compiler::new(vars).compile(&expr)
    }

    #[test]
    fn compiled_bytecode_matches_tree_evaluation() {
        let input = "x^2*sin(y) - exp(-x)/(1 + y^2)";
        let expr = Expr::parse(input).expect("should parse");
        let bytecode = compile(input, &["x", "y"]).expect("should compile");
        let mut stack = Vec::new();
        for &(x, y) in &[(0.5, 1.5), (-2.0, 0.25), (3.0, -1.0)] {
            let vm = VM::execute(&bytecode, &[x, y], &mut stack);
            let tree = expr.eval(&[("x", x), ("y", y)]).expect("should evaluate");
            assert!((vm - tree).abs() < 1e-12, "vm {vm} vs tree {tree}");
        }
    }

    #[test]
    fn compile_rejects_unknown_symbols() {
        let err = compile("x + missing", &["x"]).expect_err("unknown symbol should fail");
        assert!(err.to_string().contains("missing"), "unexpected error: {err}");
    }

    #[test]
    fn constant_expression_compiles_to_single_load() {
        let bytecode = compile("2*3 + 1", &[]).expect("should compile");
        assert_eq!(bytecode.ops, vec![OpCode::LoadConst(7.0)]);
    }

    #[test]
    fn equation_system_applies_each_equation() {
        let exprs = vec![
            Expr::parse("x + y").expect("parse"),
            Expr::parse("x*y").expect("parse"),
        ];
        let system = EquationSystem::<f64>::compile(&exprs, &["x", "y"]).expect("compile");
        assert_eq!(system.dimension(), 2);
        let mut out = vec![0.0; 2];
        system.apply(&[2.0, 5.0], &mut out);
        assert_eq!(out, vec![7.0, 10.0]);
        assert_eq!(system.evaluate(1, &[3.0, 4.0]), 12.0);
    }
}
