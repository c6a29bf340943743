use serde_json::Value;

/// Builds a response document with keys in the order they were added
#[derive(Debug, Clone, Default)]
pub struct ResponseDocument {
    fields: Vec<(String, Value)>,
}

impl ResponseDocument {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add any top-level key
    pub fn field(mut self, key: impl Into<String>, value: Value) -> Self {
        self.fields.push((key.into(), value));
        self
    }

    pub fn request_id(self, id: &str) -> Self {
        self.field("requestID", Value::from(id))
    }

    pub fn client_context_id(self, id: &str) -> Self {
        self.field("clientContextID", Value::from(id))
    }

    pub fn signature(self, signature: Value) -> Self {
        self.field("signature", signature)
    }

    pub fn results(self, rows: Vec<Value>) -> Self {
        self.field("results", Value::Array(rows))
    }

    pub fn errors(self, errors: Vec<Value>) -> Self {
        self.field("errors", Value::Array(errors))
    }

    pub fn warnings(self, warnings: Vec<Value>) -> Self {
        self.field("warnings", Value::Array(warnings))
    }

    pub fn handle(self, uri: &str) -> Self {
        self.field("handle", Value::from(uri))
    }

    pub fn status(self, status: &str) -> Self {
        self.field("status", Value::from(status))
    }

    pub fn metrics(self, metrics: Value) -> Self {
        self.field("metrics", metrics)
    }

    pub fn build(&self) -> String {
        let body: Vec<String> = self
            .fields
            .iter()
            .map(|(key, value)| format!("{}:{}", Value::from(key.as_str()), value))
            .collect();
        format!("{{{}}}", body.join(","))
    }
}
