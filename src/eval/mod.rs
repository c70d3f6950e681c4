//! # Evaluator
//!
//! Walks a syntax tree against an [`EvalContext`] and produces a [`Value`].
//!
//! Evaluation never stops at the first problem. Each error becomes a
//! [`Diagnostic`] and the failing node evaluates to an unknown value, so
//! that the rest of the tree is still checked without piling up follow-on
//! errors (operations on unknowns are silent).
//!
//! ## Modules
//!
//! * `expression`: literals, variables, constructors, conditionals and calls
//! * `operators`: unary and binary operators
//! * `refine`: what operator results are known to be when operands are not
//! * `traversal`: attribute access, indexing and splats
//! * `for_expr`: `for` expressions
//! * `template`: string templates and their directives

pub mod context;
pub mod function;
pub mod refine;

mod expression;
mod for_expr;
mod operators;
mod template;
mod traversal;

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::ast::Expression;
use crate::config::EngineConfig;
use crate::diagnostics::{Diagnostic, Diagnostics, SourceRange};
use crate::value::Value;

pub use context::EvalContext;
pub use function::{Function, FunctionError, FunctionSpec, FunctionTable, Parameter};

/// Ceilings that bound the work one evaluation may do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    pub max_depth: usize,
    pub max_iterations: usize,
    pub max_prefix_bytes: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self::from(&EngineConfig::default())
    }
}

impl From<&EngineConfig> for Limits {
    fn from(config: &EngineConfig) -> Self {
        Self {
            max_depth: config.max_nesting_depth,
            max_iterations: config.max_iterations,
            max_prefix_bytes: config.max_prefix_bytes,
        }
    }
}

pub struct Evaluator {
    ctx: Arc<EvalContext>,
    limits: Limits,
    depth: usize,
    /// Elements iterated so far by `for` expressions, splats and `for`
    /// directives, counted across every level of nesting.
    iterations: usize,
    /// Elements bound by enclosing splat expressions, innermost last.
    splat_items: Vec<Value>,
}

impl Evaluator {
    pub fn new(ctx: Arc<EvalContext>) -> Self {
        Self {
            ctx,
            limits: Limits::default(),
            depth: 0,
            iterations: 0,
            splat_items: Vec::new(),
        }
    }

    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    /// Evaluates `expr`, returning its value and any problems found. When
    /// the diagnostics contain errors the value is not meaningful.
    #[tracing::instrument(level = "debug", skip(self, expr), fields(range = %expr.range))]
    pub fn evaluate(&mut self, expr: &Expression) -> (Value, Diagnostics) {
        let mut diags = Diagnostics::new();
        let value = self.eval(expr, &mut diags);
        if diags.has_errors() {
            tracing::debug!(errors = diags.error_count(), "evaluation reported errors");
        }
        (value, diags)
    }

    pub(crate) fn eval(&mut self, expr: &Expression, diags: &mut Diagnostics) -> Value {
        self.depth += 1;
        let value = if self.depth > self.limits.max_depth {
            self.error(
                diags,
                "Expression too deeply nested",
                format!(
                    "This expression is nested more than {} levels deep.",
                    self.limits.max_depth
                ),
                &expr.range,
            )
        } else {
            self.eval_expression(expr, diags)
        };
        self.depth -= 1;
        value
    }

    /// Records an error and returns the stand-in value for the failed node.
    fn error(
        &self,
        diags: &mut Diagnostics,
        summary: &str,
        detail: impl Into<String>,
        subject: &SourceRange,
    ) -> Value {
        diags.push(Diagnostic::error(summary, detail).with_subject(subject.clone()));
        Value::dynamic()
    }

    /// Charges `count` elements to the iteration budget of this evaluation.
    /// Returns false once the budget is spent; only the first collection
    /// that overruns it is reported.
    fn within_iteration_limit(
        &mut self,
        count: usize,
        range: &SourceRange,
        diags: &mut Diagnostics,
    ) -> bool {
        let max = self.limits.max_iterations;
        if self.iterations > max {
            return false;
        }
        self.iterations = self.iterations.saturating_add(count);
        if self.iterations <= max {
            return true;
        }
        self.error(
            diags,
            "Too many iterations",
            format!(
                "Iterating over these {} elements takes this evaluation past its limit of {} iterations.",
                count, max
            ),
            range,
        );
        false
    }

    /// Runs `f` in a child scope holding `variables`.
    fn with_scope<T>(
        &mut self,
        variables: BTreeMap<String, Value>,
        f: impl FnOnce(&mut Self) -> T,
    ) -> T {
        let child = Arc::new(EvalContext::child(self.ctx.clone(), variables));
        let saved = std::mem::replace(&mut self.ctx, child);
        let result = f(self);
        self.ctx = saved;
        result
    }
}

/// Evaluates `expr` in `ctx` with default limits.
pub fn evaluate(expr: &Expression, ctx: Arc<EvalContext>) -> (Value, Diagnostics) {
    Evaluator::new(ctx).evaluate(expr)
}
