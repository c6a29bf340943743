/// Top-level sections of a query response document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Section {
    Results,
    Errors,
    Warnings,
    Signature,
    Metrics,
    Status,
    RequestId,
    ClientContextId,
    Handle,
    /// Anything else (`plans`, `type`, ...), skipped
    Other,
}

impl Section {
    pub fn from_key(key: &str) -> Self {
        match key {
            "results" => Self::Results,
            "errors" => Self::Errors,
            "warnings" => Self::Warnings,
            "signature" => Self::Signature,
            "metrics" => Self::Metrics,
            "status" => Self::Status,
            "requestID" => Self::RequestId,
            "clientContextID" => Self::ClientContextId,
            "handle" => Self::Handle,
            _ => Self::Other,
        }
    }

    pub fn key(&self) -> &'static str {
        match self {
            Self::Results => "results",
            Self::Errors => "errors",
            Self::Warnings => "warnings",
            Self::Signature => "signature",
            Self::Metrics => "metrics",
            Self::Status => "status",
            Self::RequestId => "requestID",
            Self::ClientContextId => "clientContextID",
            Self::Handle => "handle",
            Self::Other => "other",
        }
    }
}
