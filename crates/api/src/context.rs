use gatekeep_auth::OperationId;
use gatekeep_core::PrincipalId;

/// Request-scoped view of who is calling which operation.
///
/// Inserted by the gate middleware for every guarded route. `principal` is
/// `None` for anonymous callers and for operations marked unsecure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerContext {
    operation: OperationId,
    principal: Option<PrincipalId>,
}

impl CallerContext {
    pub fn new(operation: OperationId, principal: Option<PrincipalId>) -> Self {
        Self { operation, principal }
    }

    pub fn operation(&self) -> &OperationId {
        &self.operation
    }

    pub fn principal(&self) -> Option<&PrincipalId> {
        self.principal.as_ref()
    }
}
