//! Partial evaluation of CMake ASTs
//!
//! The evaluator walks an AST against a scoped variable environment,
//! computing values with confidence levels and registering discovered
//! targets. Evaluation is partial by design: platform-dependent and
//! user-provided values stay symbolic, and failures are local — they
//! downgrade confidence and attach warnings instead of aborting.

mod commands;
pub mod context;

pub use context::{value_helpers, Confidence, EvaluatedValue, EvaluationContext, Value};

use crate::analysis::ProjectAnalysis;
use crate::ast::{LoopKind, Node, NumberValue, VarScope};
use crate::error::{AnalysisCategory, AnalysisError, Result};
use log::{debug, trace};
use std::collections::HashSet;
use std::path::PathBuf;

/// Maximum depth of nested evaluation before giving up.
const MAX_EVAL_DEPTH: usize = 100;

/// Maximum number of iterations a foreach is allowed to expand to.
const MAX_FOREACH_ITERATIONS: usize = 64;

/// AST walker computing partial values against an [`EvaluationContext`].
pub struct Evaluator {
    ctx: EvaluationContext,
    warnings: Vec<String>,
    depth: usize,
    /// Directory of the file under evaluation; recorded on targets.
    source_dir: PathBuf,
    /// Names of user-defined functions and macros (never inlined).
    callables: HashSet<String>,
}

impl Default for Evaluator {
    fn default() -> Self {
        Self::new()
    }
}

impl Evaluator {
    pub fn new() -> Self {
        Self::with_context(EvaluationContext::with_builtins())
    }

    pub fn with_context(ctx: EvaluationContext) -> Self {
        Self {
            ctx,
            warnings: Vec::new(),
            depth: 0,
            source_dir: PathBuf::new(),
            callables: HashSet::new(),
        }
    }

    pub fn with_source_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.source_dir = dir.into();
        self
    }

    pub fn context(&self) -> &EvaluationContext {
        &self.ctx
    }

    pub fn context_mut(&mut self) -> &mut EvaluationContext {
        &mut self.ctx
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    pub(crate) fn warn(&mut self, message: impl Into<String>) {
        let message = message.into();
        debug!("analysis warning: {}", message);
        self.warnings.push(message);
    }

    /// Evaluate a file and distill the context into a [`ProjectAnalysis`].
    pub fn analyze_file(&mut self, file: &Node) -> ProjectAnalysis {
        if let Err(err) = self.eval(file) {
            self.warn(format!("evaluation aborted: {}", err));
        }

        let mut analysis = ProjectAnalysis::default();
        if let Some(name) = self.ctx.get_variable("PROJECT_NAME") {
            analysis.project_name = value_helpers::to_string(&name.value);
        }
        if let Some(version) = self.ctx.get_variable("PROJECT_VERSION") {
            analysis.project_version = value_helpers::to_string(&version.value);
        }
        for name in self.ctx.variable_names() {
            if let Some(value) = self.ctx.get_variable(&name) {
                analysis
                    .global_vars
                    .insert(name.clone(), value_helpers::to_string(&value.value));
            }
        }
        for name in self.ctx.cache_variable_names() {
            if let Some(value) = self.ctx.get_cache_variable(&name) {
                analysis
                    .cache_vars
                    .insert(name.clone(), value_helpers::to_string(&value.value));
            }
        }
        analysis.targets = self.ctx.take_targets();
        analysis.warnings = std::mem::take(&mut self.warnings);
        analysis
    }

    /// Evaluate one node.
    pub fn eval(&mut self, node: &Node) -> Result<EvaluatedValue> {
        self.depth += 1;
        if self.depth > MAX_EVAL_DEPTH {
            self.depth -= 1;
            return Err(AnalysisError::new(
                AnalysisCategory::InvalidConfiguration,
                format!("evaluation depth exceeds {}", MAX_EVAL_DEPTH),
            )
            .at(node.location().clone())
            .into());
        }
        let result = self.eval_inner(node);
        self.depth -= 1;
        result
    }

    fn eval_inner(&mut self, node: &Node) -> Result<EvaluatedValue> {
        match node {
            Node::StringLiteral { value, .. } => Ok(self.interpolate(value)),

            Node::NumberLiteral { text, value, .. } => {
                // Keep the written spelling when the canonical float form
                // would lose it (`3.20` must stay `3.20`).
                let value = match value {
                    NumberValue::Int(int) => Value::Num(*int as f64),
                    NumberValue::Float(float)
                        if value_helpers::format_num(*float) == *text =>
                    {
                        Value::Num(*float)
                    }
                    NumberValue::Float(_) => Value::Str(text.clone()),
                };
                Ok(EvaluatedValue::new(value, Confidence::Certain))
            }

            Node::BooleanLiteral { value, .. } => {
                Ok(EvaluatedValue::new(Value::Bool(*value), Confidence::Certain))
            }

            Node::Identifier { name, .. } => {
                Ok(EvaluatedValue::certain(name.as_str()))
            }

            Node::Variable { name, scope, .. } => Ok(self.eval_variable(name, *scope)),

            Node::CommandCall { name, args, .. } => self.eval_command(name, args, node.location()),

            Node::FunctionDef { name, .. } | Node::MacroDef { name, .. } => {
                // Definitions are recorded, never inlined.
                self.callables.insert(name.to_string());
                trace!("recorded callable '{}'", name);
                Ok(EvaluatedValue::unknown(""))
            }

            Node::If { .. } => self.eval_if(node),

            Node::While { .. } => {
                // A while body would need its condition to change across
                // iterations to terminate, which partial evaluation
                // cannot observe.
                self.warn(format!(
                    "{}: while loop not evaluated",
                    node.location()
                ));
                Ok(EvaluatedValue::unknown(""))
            }

            Node::ForEach { .. } => self.eval_foreach(node),

            Node::List {
                elements,
                separator,
                ..
            } => self.eval_list(elements, separator),

            Node::GeneratorExpr { text, .. } => {
                // Preserved opaquely for Buck2.
                Ok(EvaluatedValue::unknown(format!("$<{}>", text)))
            }

            Node::BracketExpr { content, .. } => self.eval(content),

            Node::BinaryOp { .. } | Node::UnaryOp { .. } | Node::FunctionCall { .. } => {
                Ok(EvaluatedValue::unknown(""))
            }

            Node::Block { statements, .. } => {
                self.eval_statements(statements);
                Ok(EvaluatedValue::certain(""))
            }

            Node::File { statements, .. } => {
                self.eval_statements(statements);
                Ok(EvaluatedValue::certain(""))
            }

            Node::CpmAddPackage(pkg) => {
                // Package options are cache entries the build may see.
                for (key, value) in &pkg.options {
                    self.ctx
                        .set_cache_variable(key.clone(), value.clone(), Confidence::Uncertain);
                }
                Ok(EvaluatedValue::unknown(""))
            }

            Node::CpmFindPackage(_)
            | Node::CpmUsePackageLock { .. }
            | Node::CpmDeclarePackage(_) => Ok(EvaluatedValue::unknown("")),

            Node::Error { message, .. } => Err(AnalysisError::new(
                AnalysisCategory::InvalidConfiguration,
                message.clone(),
            )
            .at(node.location().clone())
            .into()),
        }
    }

    /// Evaluate a statement list with local error recovery: a failing
    /// statement becomes a warning, not an abort.
    fn eval_statements(&mut self, statements: &[Node]) {
        for stmt in statements {
            if let Err(err) = self.eval(stmt) {
                self.warn(err.render_human().trim_end().to_string());
            }
        }
    }

    // Variables and interpolation ---------------------------------------

    fn eval_variable(&mut self, name: &str, scope: VarScope) -> EvaluatedValue {
        match scope {
            VarScope::Env => {
                // Environment state is configure-time input; the stored
                // name already carries the ENV{...} wrapper.
                EvaluatedValue::new(format!("${}", name), Confidence::Uncertain)
            }
            VarScope::Cache => {
                let inner = name
                    .strip_prefix("CACHE{")
                    .and_then(|s| s.strip_suffix('}'))
                    .unwrap_or(name);
                match self.ctx.get_cache_variable(inner) {
                    Some(value) => value.clone(),
                    None => EvaluatedValue::unknown(format!("${{{}}}", name)),
                }
            }
            VarScope::Normal => match self
                .ctx
                .get_variable(name)
                .or_else(|| self.ctx.get_cache_variable(name))
            {
                Some(value) => value.clone(),
                None => {
                    trace!("unknown variable '{}'", name);
                    // Preserve the reference so emission can surface it.
                    EvaluatedValue::unknown(format!("${{{}}}", name))
                }
            },
        }
    }

    /// Substitute innermost `${IDENT}` references until none remain or a
    /// reference is unresolved. Resolved strings pass through unchanged,
    /// so interpolation is idempotent.
    pub(crate) fn interpolate(&mut self, input: &str) -> EvaluatedValue {
        let mut result = input.to_string();
        let mut confidence = Confidence::Certain;
        let mut guard = 0usize;

        loop {
            guard += 1;
            if guard > MAX_EVAL_DEPTH {
                return EvaluatedValue::new(result, Confidence::Uncertain);
            }

            let Some((start, end)) = find_innermost_ref(&result) else {
                return EvaluatedValue::new(result, confidence);
            };
            let name = &result[start + 2..end];

            if name.starts_with("ENV{") {
                // Environment references never resolve offline.
                return EvaluatedValue::new(result, confidence.min(Confidence::Uncertain));
            }

            match self
                .ctx
                .get_variable(name)
                .or_else(|| self.ctx.get_cache_variable(name))
                .cloned()
            {
                Some(value) => {
                    confidence = confidence.min(value.confidence);
                    let text = value_helpers::to_string(&value.value);
                    result.replace_range(start..=end, &text);
                }
                None => {
                    // Unresolved: stop and keep what we have.
                    return EvaluatedValue::new(result, confidence.min(Confidence::Uncertain));
                }
            }
        }
    }

    fn eval_list(&mut self, elements: &[Node], separator: &str) -> Result<EvaluatedValue> {
        let mut confidence = Confidence::Certain;

        if separator.is_empty() {
            // Adjacency list: `pre${X}post` concatenates into one string.
            let mut out = String::new();
            for elem in elements {
                let value = self.eval(elem)?;
                confidence = confidence.min(value.confidence);
                out.push_str(&value_helpers::to_string(&value.value));
            }
            return Ok(EvaluatedValue::new(out, confidence));
        }

        let mut items = Vec::with_capacity(elements.len());
        for elem in elements {
            let value = self.eval(elem)?;
            confidence = confidence.min(value.confidence);
            items.push(value_helpers::to_string(&value.value));
        }
        Ok(EvaluatedValue::new(Value::List(items), confidence))
    }

    // Control flow -------------------------------------------------------

    fn eval_if(&mut self, node: &Node) -> Result<EvaluatedValue> {
        let Node::If {
            condition,
            then_branch,
            elseifs,
            else_branch,
            ..
        } = node
        else {
            unreachable!("eval_if on non-if node");
        };

        let (truthy, confidence) = self.eval_condition(condition);
        if confidence == Confidence::Unknown {
            self.warn(format!(
                "{}: condition could not be resolved, skipping branch",
                node.location()
            ));
            return Ok(EvaluatedValue::unknown(""));
        }

        if truthy {
            self.eval_statements(then_branch);
            return Ok(EvaluatedValue::certain(""));
        }

        for arm in elseifs {
            let (arm_truthy, arm_confidence) = self.eval_condition(&arm.condition);
            if arm_confidence == Confidence::Unknown {
                self.warn(format!(
                    "{}: elseif condition could not be resolved, skipping branch",
                    arm.location
                ));
                return Ok(EvaluatedValue::unknown(""));
            }
            if arm_truthy {
                self.eval_statements(&arm.body);
                return Ok(EvaluatedValue::certain(""));
            }
        }

        if let Some(else_branch) = else_branch {
            self.eval_statements(else_branch);
        }
        Ok(EvaluatedValue::certain(""))
    }

    /// Condition truthiness. Bare names dereference as variables (with
    /// platform checks consulted first); multi-argument conditions
    /// understand NOT / AND / OR / DEFINED / STREQUAL / EQUAL; anything
    /// richer is Unknown.
    pub(crate) fn eval_condition(&mut self, condition: &Node) -> (bool, Confidence) {
        match condition {
            Node::StringLiteral {
                value,
                quoted: false,
                ..
            } => self.eval_condition_name(value),
            Node::Identifier { name, .. } => {
                let name = name.to_string();
                self.eval_condition_name(&name)
            }
            Node::List {
                elements,
                separator,
                ..
            } if separator.as_str() == " " => {
                let terms: Vec<&Node> = elements.iter().collect();
                self.eval_condition_terms(&terms)
            }
            other => match self.eval(other) {
                Ok(value) => (
                    value_helpers::is_truthy(&value.value),
                    value.confidence,
                ),
                Err(_) => (false, Confidence::Unknown),
            },
        }
    }

    /// A bare name in a condition: platform check, then variable
    /// dereference, then the CMake constant rule (an undefined name is
    /// false).
    fn eval_condition_name(&mut self, name: &str) -> (bool, Confidence) {
        if let Some(result) = self.ctx.get_platform_check(name) {
            return (result, Confidence::Certain);
        }
        if let Some(value) = self.ctx.get_variable(name) {
            return (
                value_helpers::is_truthy(&value.value),
                value.confidence,
            );
        }
        if let Some(value) = self.ctx.get_cache_variable(name) {
            return (
                value_helpers::is_truthy(&value.value),
                value.confidence,
            );
        }
        let constant = Value::Str(name.to_string());
        if !value_helpers::is_truthy(&constant) {
            // FALSE, OFF, NOTFOUND and friends are false as constants.
            return (false, Confidence::Certain);
        }
        // Undefined variable names are false in if(); a user could still
        // define them at configure time.
        (false, Confidence::Likely)
    }

    fn eval_condition_terms(&mut self, terms: &[&Node]) -> (bool, Confidence) {
        // OR has the lowest precedence, then AND, then NOT.
        if let Some(split) = find_keyword(terms, "OR") {
            let (lhs, lc) = self.eval_condition_terms(&terms[..split]);
            let (rhs, rc) = self.eval_condition_terms(&terms[split + 1..]);
            return (lhs || rhs, lc.min(rc));
        }
        if let Some(split) = find_keyword(terms, "AND") {
            let (lhs, lc) = self.eval_condition_terms(&terms[..split]);
            let (rhs, rc) = self.eval_condition_terms(&terms[split + 1..]);
            return (lhs && rhs, lc.min(rc));
        }
        if let [first, rest @ ..] = terms {
            if term_text(first).as_deref() == Some("NOT") && !rest.is_empty() {
                let (value, confidence) = self.eval_condition_terms(rest);
                return (!value, confidence);
            }
        }

        match terms {
            [] => (false, Confidence::Unknown),
            [single] => self.eval_condition(single),
            [keyword, name] if term_text(keyword).as_deref() == Some("DEFINED") => {
                match term_text(name) {
                    Some(name) => (
                        self.ctx.has_variable(&name)
                            || self.ctx.get_cache_variable(&name).is_some(),
                        Confidence::Certain,
                    ),
                    None => (false, Confidence::Unknown),
                }
            }
            [lhs, op, rhs] => {
                let op_text = term_text(op).unwrap_or_default();
                match op_text.as_str() {
                    "STREQUAL" => {
                        let (left, lc) = self.condition_operand(lhs);
                        let (right, rc) = self.condition_operand(rhs);
                        (left == right, lc.min(rc))
                    }
                    "EQUAL" => {
                        let (left, lc) = self.condition_operand(lhs);
                        let (right, rc) = self.condition_operand(rhs);
                        match (left.parse::<f64>(), right.parse::<f64>()) {
                            (Ok(a), Ok(b)) => (a == b, lc.min(rc)),
                            _ => (false, Confidence::Unknown),
                        }
                    }
                    _ => (false, Confidence::Unknown),
                }
            }
            _ => (false, Confidence::Unknown),
        }
    }

    /// Comparison operand: bare names dereference, everything else
    /// evaluates to its string form.
    fn condition_operand(&mut self, node: &Node) -> (String, Confidence) {
        match node {
            Node::StringLiteral {
                value,
                quoted: false,
                ..
            } => {
                if let Some(var) = self.ctx.get_variable(value) {
                    (
                        value_helpers::to_string(&var.value),
                        var.confidence,
                    )
                } else {
                    (value.clone(), Confidence::Certain)
                }
            }
            other => match self.eval(other) {
                Ok(value) => (
                    value_helpers::to_string(&value.value),
                    value.confidence,
                ),
                Err(_) => (String::new(), Confidence::Unknown),
            },
        }
    }

    fn eval_foreach(&mut self, node: &Node) -> Result<EvaluatedValue> {
        let Node::ForEach {
            vars,
            loop_kind,
            items,
            body,
            ..
        } = node
        else {
            unreachable!("eval_foreach on non-foreach node");
        };

        if *loop_kind == LoopKind::InZipLists || vars.len() != 1 {
            self.warn(format!(
                "{}: foreach form not evaluated",
                node.location()
            ));
            return Ok(EvaluatedValue::unknown(""));
        }
        let var = vars[0].to_string();

        let expansion = match loop_kind {
            LoopKind::Range => self.expand_range(items),
            _ => self.expand_items(items, *loop_kind),
        };

        let Some((values, confidence)) = expansion else {
            self.warn(format!(
                "{}: foreach items could not be resolved, loop skipped",
                node.location()
            ));
            return Ok(EvaluatedValue::unknown(""));
        };

        if values.len() > MAX_FOREACH_ITERATIONS {
            self.warn(format!(
                "{}: foreach expands to {} iterations (limit {}), loop skipped",
                node.location(),
                values.len(),
                MAX_FOREACH_ITERATIONS
            ));
            return Ok(EvaluatedValue::unknown(""));
        }

        // Bounded concrete iteration: bind the loop variable in a child
        // scope per pass.
        for item in values {
            self.ctx.push_scope();
            self.ctx.set_variable(var.clone(), item, confidence);
            self.eval_statements(body);
            self.ctx.pop_scope();
        }

        Ok(EvaluatedValue::certain(""))
    }

    /// Concrete item expansion at Certain/Likely confidence, or None.
    fn expand_items(
        &mut self,
        items: &[Node],
        loop_kind: LoopKind,
    ) -> Option<(Vec<String>, Confidence)> {
        let mut values = Vec::new();
        let mut confidence = Confidence::Certain;

        for item in items {
            if loop_kind == LoopKind::InLists {
                // Items are list variable names.
                let name = crate::parser::node_string(item)?;
                let list = self.ctx.get_variable(&name)?.clone();
                if list.confidence < Confidence::Likely {
                    return None;
                }
                confidence = confidence.min(list.confidence);
                values.extend(value_helpers::to_list(&list.value));
            } else {
                let value = self.eval(item).ok()?;
                if value.confidence < Confidence::Likely {
                    return None;
                }
                confidence = confidence.min(value.confidence);
                values.extend(value_helpers::to_list(&value.value));
            }
        }

        Some((values, confidence))
    }

    /// `RANGE stop` / `RANGE start stop [step]`, inclusive like CMake.
    fn expand_range(&mut self, items: &[Node]) -> Option<(Vec<String>, Confidence)> {
        let mut bounds = Vec::new();
        let mut confidence = Confidence::Certain;
        for item in items {
            let value = self.eval(item).ok()?;
            if value.confidence < Confidence::Likely {
                return None;
            }
            confidence = confidence.min(value.confidence);
            let number = value_helpers::to_f64(&value.value)?;
            bounds.push(number as i64);
        }

        let (start, stop, step) = match bounds.as_slice() {
            [stop] => (0, *stop, 1),
            [start, stop] => (*start, *stop, 1),
            [start, stop, step] if *step > 0 => (*start, *stop, *step),
            _ => return None,
        };
        if stop < start {
            return None;
        }

        let values = (start..=stop)
            .step_by(step as usize)
            .map(|i| i.to_string())
            .collect();
        Some((values, confidence))
    }
}

/// Leftmost innermost `${...}` (one containing no nested `${`), as byte
/// offsets of `$` and the matching `}`.
fn find_innermost_ref(s: &str) -> Option<(usize, usize)> {
    let bytes = s.as_bytes();
    let mut open: Option<usize> = None;
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'$' && i + 1 < bytes.len() && bytes[i + 1] == b'{' {
            open = Some(i);
            i += 2;
            continue;
        }
        if bytes[i] == b'}' {
            if let Some(start) = open {
                return Some((start, i));
            }
        }
        i += 1;
    }
    None
}

fn term_text(node: &Node) -> Option<String> {
    crate::parser::node_string(node)
}

fn find_keyword(terms: &[&Node], keyword: &str) -> Option<usize> {
    terms
        .iter()
        .position(|t| term_text(t).as_deref() == Some(keyword))
}
