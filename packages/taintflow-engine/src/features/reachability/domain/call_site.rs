//! Call sites with enclosing context
//!
//! The resolver's node type: a call expression enriched with the context the
//! structural matching rules need (enclosing class/method, the textual form
//! of the immediately-enclosing call, block parameters and body).

/// Context a call site lives in: (enclosing class, enclosing method)
pub type ContextKey = (Option<String>, Option<String>);

/// One call expression with resolver context
#[derive(Debug, Clone)]
pub struct CallSite {
    /// Index into the owning `CallIndex`
    pub id: usize,

    /// Callee as written (`obj.method` or `method`)
    pub callee: String,

    /// Exact source text of the call expression
    pub text: String,

    pub line: u32,

    /// Enclosing function scope bounds
    pub scope_start: u32,
    pub scope_end: u32,

    pub enclosing_class: Option<String>,
    pub enclosing_method: Option<String>,

    /// Textual form of the immediately-enclosing call, when nested
    pub parent_text: Option<String>,

    /// Argument expressions, textual
    pub args: Vec<String>,

    /// Parameter names of a block/closure argument
    pub block_params: Vec<String>,

    /// Source text of the block/closure argument body
    pub block_body: Option<String>,
}

impl CallSite {
    /// Method component of the callee (`obj.method` -> `method`)
    pub fn method_name(&self) -> &str {
        self.callee.rsplit('.').next().unwrap_or(&self.callee)
    }

    pub fn context_key(&self) -> ContextKey {
        (self.enclosing_class.clone(), self.enclosing_method.clone())
    }

    pub fn has_block(&self) -> bool {
        !self.block_params.is_empty() && self.block_body.is_some()
    }
}
