//! Fluent composer for template source.
//!
//! Pure string concatenation: nothing is parsed or evaluated here. The result
//! is handed to [`RenderEngine`](crate::engine::RenderEngine) like any other
//! source.

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TemplateBuilder {
    parts: Vec<String>,
}

impl TemplateBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(mut self, text: impl Into<String>) -> Self {
        self.parts.push(text.into());
        self
    }

    pub fn add_if(self, condition: bool, text: impl Into<String>) -> Self {
        if condition {
            self.add(text)
        } else {
            self
        }
    }

    /// `{{#name}}content{{/name}}`
    pub fn add_block(self, name: &str, content: impl Into<String>) -> Self {
        self.add_block_with(name, "", content)
    }

    /// `{{#name args}}content{{/name}}`
    pub fn add_block_with(self, name: &str, args: &str, content: impl Into<String>) -> Self {
        let open = if args.trim().is_empty() {
            format!("{{{{#{}}}}}", name)
        } else {
            format!("{{{{#{} {}}}}}", name, args.trim())
        };
        let content = content.into();
        self.add(format!("{}{}{{{{/{}}}}}", open, content, name))
    }

    /// `{{> name}}` or `{{> name context}}`
    pub fn add_partial(self, name: &str, context: Option<&str>) -> Self {
        match context.map(str::trim).filter(|c| !c.is_empty()) {
            Some(context) => self.add(format!("{{{{> {} {}}}}}", name, context)),
            None => self.add(format!("{{{{> {}}}}}", name)),
        }
    }

    /// `{{expr}}`
    pub fn add_expression(self, expr: &str) -> Self {
        self.add(format!("{{{{{}}}}}", expr.trim()))
    }

    pub fn len(&self) -> usize {
        self.parts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    pub fn build(&self) -> String {
        self.parts.concat()
    }
}
