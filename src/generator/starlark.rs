//! Starlark output writer
//!
//! Buffers three ordered sections — load statements, variable
//! definitions, rule bodies — and renders them with stable formatting:
//! loads first, blank line, variables, blank line, rules with a blank
//! line between adjacent non-comment rules. Identical inputs produce
//! byte-identical output.

/// Sectioned writer for one Starlark file.
#[derive(Debug, Default)]
pub struct StarlarkWriter {
    loads: Vec<String>,
    variables: Vec<String>,
    rules: Vec<String>,
}

impl StarlarkWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_load(&mut self, file: &str, symbols: &[&str]) {
        let quoted: Vec<String> = symbols.iter().map(|s| quote(s)).collect();
        self.loads
            .push(format!("load({}, {})", quote(file), quoted.join(", ")));
    }

    pub fn add_variable(&mut self, name: &str, value: &str) {
        self.variables.push(format!("{} = {}", name, value));
    }

    pub fn add_rule(&mut self, rule: impl Into<String>) {
        self.rules.push(rule.into());
    }

    pub fn add_comment(&mut self, comment: &str) {
        self.rules.push(format!("# {}", comment));
    }

    pub fn is_empty(&self) -> bool {
        self.loads.is_empty() && self.variables.is_empty() && self.rules.is_empty()
    }

    /// Render the buffered sections.
    pub fn finish(&self) -> String {
        let mut out = String::new();

        for load in &self.loads {
            out.push_str(load);
            out.push('\n');
        }
        if !self.loads.is_empty() && (!self.variables.is_empty() || !self.rules.is_empty()) {
            out.push('\n');
        }

        for var in &self.variables {
            out.push_str(var);
            out.push('\n');
        }
        if !self.variables.is_empty() && !self.rules.is_empty() {
            out.push('\n');
        }

        for (i, rule) in self.rules.iter().enumerate() {
            out.push_str(rule);
            out.push('\n');

            // Blank line between adjacent non-comment rules.
            let next_is_rule = self
                .rules
                .get(i + 1)
                .map(|r| !r.starts_with('#'))
                .unwrap_or(false);
            if next_is_rule && !rule.starts_with('#') {
                out.push('\n');
            }
        }

        out
    }
}

/// Quote a string with `"`.
pub fn quote(s: &str) -> String {
    format!("\"{}\"", s)
}

/// Render a list attribute: short lists stay on one line, lists of more
/// than three items break one element per line at `indent` + 4 spaces.
pub fn format_list(items: &[String], indent: &str) -> String {
    if items.is_empty() {
        return "[]".to_string();
    }
    if items.len() <= 3 {
        let quoted: Vec<String> = items.iter().map(|i| quote(i)).collect();
        return format!("[{}]", quoted.join(", "));
    }

    let mut out = String::from("[\n");
    for item in items {
        out.push_str(indent);
        out.push_str("    ");
        out.push_str(&quote(item));
        out.push_str(",\n");
    }
    out.push_str(indent);
    out.push(']');
    out
}
