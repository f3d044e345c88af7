// Explicit per-request operator context
/// Who a request acts on behalf of. Created per request and passed into the
/// calls that log or mutate for an operator; nothing reads it from globals.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OperatorContext {
    pub operator_id: Option<String>,
}

impl OperatorContext {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn for_operator(operator_id: impl Into<String>) -> Self {
        Self {
            operator_id: Some(operator_id.into()),
        }
    }

    /// Operator id for log fields
    pub fn actor(&self) -> &str {
        self.operator_id.as_deref().unwrap_or("anonymous")
    }
}
