use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::HelperError;
use crate::evaluator::{is_truthy, lookup_path, number_value, to_display_string, to_f64};

static NULL: Value = Value::Null;

// ================================
// Helper outputs
// ================================

/// A string that is already trusted markup and must be written without
/// escaping.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SafeString(String);

impl SafeString {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for SafeString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// What a helper hands back to the sandbox: a plain value (escaped on
/// insertion) or a [`SafeString`] (inserted verbatim).
#[derive(Debug, Clone, PartialEq)]
pub enum HelperOutput {
    Value(Value),
    Safe(SafeString),
}

impl HelperOutput {
    pub fn safe(value: impl Into<String>) -> Self {
        HelperOutput::Safe(SafeString::new(value))
    }

    pub fn number(n: f64) -> Self {
        HelperOutput::Value(number_value(n))
    }

    /// The JSON value a subexpression sees.
    pub fn into_value(self) -> Value {
        match self {
            HelperOutput::Value(value) => value,
            HelperOutput::Safe(safe) => Value::String(safe.into_string()),
        }
    }

    pub fn as_value(&self) -> Option<&Value> {
        match self {
            HelperOutput::Value(value) => Some(value),
            HelperOutput::Safe(_) => None,
        }
    }

    pub fn is_safe(&self) -> bool {
        matches!(self, HelperOutput::Safe(_))
    }

    /// Text as it would be written before escaping.
    pub fn to_text(&self) -> String {
        match self {
            HelperOutput::Value(value) => to_display_string(value),
            HelperOutput::Safe(safe) => safe.as_str().to_string(),
        }
    }
}

impl From<Value> for HelperOutput {
    fn from(value: Value) -> Self {
        HelperOutput::Value(value)
    }
}

impl From<SafeString> for HelperOutput {
    fn from(value: SafeString) -> Self {
        HelperOutput::Safe(value)
    }
}

impl From<String> for HelperOutput {
    fn from(value: String) -> Self {
        HelperOutput::Value(Value::String(value))
    }
}

impl From<&str> for HelperOutput {
    fn from(value: &str) -> Self {
        HelperOutput::Value(Value::String(value.to_string()))
    }
}

impl From<bool> for HelperOutput {
    fn from(value: bool) -> Self {
        HelperOutput::Value(Value::Bool(value))
    }
}

pub type HelperResult = Result<HelperOutput, HelperError>;

// ================================
// Block callbacks
// ================================

/// Render callbacks the engine supplies when a helper is invoked in block
/// form.
pub trait BlockRenderer {
    /// Render the block body against the current scope.
    fn render(&mut self) -> Result<String, HelperError>;

    /// Render the block body against a derived scope with `@`-data locals.
    fn render_with(&mut self, scope: &Value, locals: &[(&str, Value)])
        -> Result<String, HelperError>;

    /// Render the `{{else}}` branch; empty when the block has none.
    fn inverse(&mut self) -> Result<String, HelperError>;
}

/// `@index`, `@first`, `@last` (plus the `isFirst`/`isLast` spellings) for the
/// item at `index` of `len`.
pub fn item_locals(index: usize, len: usize) -> Vec<(&'static str, Value)> {
    let first = index == 0;
    let last = index + 1 == len;
    vec![
        ("index", Value::from(index)),
        ("first", Value::Bool(first)),
        ("last", Value::Bool(last)),
        ("isFirst", Value::Bool(first)),
        ("isLast", Value::Bool(last)),
    ]
}

// ================================
// HelperCall
// ================================

/// One helper invocation: positional arguments separated from the
/// engine-supplied descriptor (hash options, scope, root, block callbacks).
pub struct HelperCall<'a> {
    name: &'a str,
    args: Vec<Value>,
    hash: Map<String, Value>,
    this: Cow<'a, Value>,
    root: Cow<'a, Value>,
    block: Option<&'a mut dyn BlockRenderer>,
}

impl<'a> HelperCall<'a> {
    pub fn new(name: &'a str, args: Vec<Value>) -> Self {
        Self {
            name,
            args,
            hash: Map::new(),
            this: Cow::Borrowed(&NULL),
            root: Cow::Borrowed(&NULL),
            block: None,
        }
    }

    pub fn with_hash(mut self, hash: Map<String, Value>) -> Self {
        self.hash = hash;
        self
    }

    pub fn with_this(mut self, this: Value) -> Self {
        self.this = Cow::Owned(this);
        self
    }

    pub fn with_root(mut self, root: Value) -> Self {
        self.root = Cow::Owned(root);
        self
    }

    pub fn with_root_ref(mut self, root: &'a Value) -> Self {
        self.root = Cow::Borrowed(root);
        self
    }

    pub fn with_block(mut self, block: &'a mut dyn BlockRenderer) -> Self {
        self.block = Some(block);
        self
    }

    pub fn name(&self) -> &str {
        self.name
    }

    pub fn args(&self) -> &[Value] {
        &self.args
    }

    /// Positional argument; `null` when absent.
    pub fn arg(&self, index: usize) -> &Value {
        self.args.get(index).unwrap_or(&NULL)
    }

    pub fn has_arg(&self, index: usize) -> bool {
        !self.arg(index).is_null()
    }

    pub fn arg_str(&self, index: usize) -> Option<&str> {
        self.arg(index).as_str()
    }

    pub fn arg_f64(&self, index: usize) -> Option<f64> {
        to_f64(self.arg(index))
    }

    /// Hash option; `null` values count as absent.
    pub fn hash(&self, key: &str) -> Option<&Value> {
        self.hash.get(key).filter(|v| !v.is_null())
    }

    pub fn hash_str(&self, key: &str) -> Option<String> {
        self.hash(key).map(to_display_string)
    }

    pub fn hash_f64(&self, key: &str) -> Option<f64> {
        self.hash(key).and_then(to_f64)
    }

    pub fn hash_bool(&self, key: &str) -> bool {
        self.hash(key).map(is_truthy).unwrap_or(false)
    }

    pub fn hash_map(&self) -> &Map<String, Value> {
        &self.hash
    }

    /// The scope the helper was invoked in.
    pub fn this(&self) -> &Value {
        &self.this
    }

    /// The merged render context.
    pub fn root(&self) -> &Value {
        &self.root
    }

    /// The caller's original data payload.
    pub fn data(&self) -> &Value {
        self.root.get("_root").unwrap_or(&self.root)
    }

    pub fn setting(&self, key: &str) -> Option<&Value> {
        self.root
            .get("settings")
            .and_then(|settings| settings.get(key))
            .filter(|v| !v.is_null())
    }

    /// Dotted lookup in the current scope, then the merged context.
    pub fn lookup(&self, path: &str) -> Option<&Value> {
        lookup_path(&self.this, path)
            .filter(|v| !v.is_null())
            .or_else(|| lookup_path(&self.root, path).filter(|v| !v.is_null()))
    }

    pub fn is_block(&self) -> bool {
        self.block.is_some()
    }

    pub fn render(&mut self) -> Result<String, HelperError> {
        match self.block.as_mut() {
            Some(block) => block.render(),
            None => Ok(String::new()),
        }
    }

    pub fn render_with(
        &mut self,
        scope: &Value,
        locals: &[(&str, Value)],
    ) -> Result<String, HelperError> {
        match self.block.as_mut() {
            Some(block) => block.render_with(scope, locals),
            None => Ok(String::new()),
        }
    }

    pub fn inverse(&mut self) -> Result<String, HelperError> {
        match self.block.as_mut() {
            Some(block) => block.inverse(),
            None => Ok(String::new()),
        }
    }

    /// Dual convention for predicates: the block body or else-branch in block
    /// form, the boolean itself inline.
    pub fn branch(&mut self, condition: bool) -> HelperResult {
        if !self.is_block() {
            return Ok(HelperOutput::from(condition));
        }
        let rendered = if condition {
            self.render()?
        } else {
            self.inverse()?
        };
        Ok(HelperOutput::safe(rendered))
    }

    /// Render the block once per item with index metadata; the else-branch
    /// when there are none.
    pub fn iterate(&mut self, items: &[Value]) -> HelperResult {
        if items.is_empty() {
            return Ok(HelperOutput::safe(self.inverse()?));
        }
        let mut rendered = String::new();
        for (index, item) in items.iter().enumerate() {
            rendered.push_str(&self.render_with(item, &item_locals(index, items.len()))?);
        }
        Ok(HelperOutput::safe(rendered))
    }

    /// Render a single record as the block scope, or the else-branch when it
    /// is missing.
    pub fn scope_or_inverse(&mut self, record: Option<&Value>) -> HelperResult {
        let rendered = match record.filter(|v| is_truthy(v)) {
            Some(record) => self.render_with(record, &[])?,
            None => self.inverse()?,
        };
        Ok(HelperOutput::safe(rendered))
    }
}

// ================================
// Registration entries
// ================================

/// A named helper function. Every helper shares this one signature.
pub trait TemplateHelper: Send + Sync {
    fn call(&self, call: &mut HelperCall<'_>) -> HelperResult;
}

impl<F> TemplateHelper for F
where
    F: Fn(&mut HelperCall<'_>) -> HelperResult + Send + Sync,
{
    fn call(&self, call: &mut HelperCall<'_>) -> HelperResult {
        self(call)
    }
}

/// How a helper expects to be invoked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallingConvention {
    /// Produces a value. Used in block form it behaves like `with`.
    Inline,
    /// Handles its own block body and else-branch.
    Block,
}

#[derive(Clone)]
pub struct HelperEntry {
    pub name: String,
    pub helper: Arc<dyn TemplateHelper>,
    pub convention: CallingConvention,
}

impl HelperEntry {
    pub fn new(
        name: impl Into<String>,
        helper: Arc<dyn TemplateHelper>,
        convention: CallingConvention,
    ) -> Self {
        Self {
            name: name.into(),
            helper,
            convention,
        }
    }
}

impl fmt::Debug for HelperEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HelperEntry")
            .field("name", &self.name)
            .field("convention", &self.convention)
            .finish()
    }
}
