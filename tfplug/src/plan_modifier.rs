use crate::types::{AttributePath, Diagnostic, Dynamic};

#[derive(Debug, Clone)]
pub struct PlanModifyRequest {
    pub state: Dynamic,
    pub plan: Dynamic,
    pub config: Dynamic,
    pub path: AttributePath,
}

#[derive(Debug, Clone)]
pub struct PlanModifyResponse {
    pub plan_value: Dynamic,
    pub requires_replace: bool,
    pub diagnostics: Vec<Diagnostic>,
}

impl PlanModifyResponse {
    fn keep(plan_value: Dynamic) -> Self {
        Self {
            plan_value,
            requires_replace: false,
            diagnostics: Vec::new(),
        }
    }
}

/// Modifies the planned value of a single attribute.
///
/// Plan modifiers run after the server has marked computed attributes
/// unknown. They can replace the planned value, force replacement of the
/// resource, or add diagnostics.
pub trait PlanModifier: Send + Sync {
    fn description(&self) -> String;

    fn modify_plan(&self, request: PlanModifyRequest) -> PlanModifyResponse;
}

/// Uses the prior state value when the planned value is unknown.
///
/// Keeps server-assigned identifiers stable across plans that change nothing
/// else about them.
pub struct UseStateForUnknown;

impl PlanModifier for UseStateForUnknown {
    fn description(&self) -> String {
        "Once set, the value of this attribute in state will not change.".to_string()
    }

    fn modify_plan(&self, request: PlanModifyRequest) -> PlanModifyResponse {
        // Nothing to carry over on create, and a config value that is still
        // being computed stays unknown.
        let carry_state = matches!(request.plan, Dynamic::Unknown)
            && !matches!(request.state, Dynamic::Null)
            && !matches!(request.config, Dynamic::Unknown);

        if carry_state {
            PlanModifyResponse::keep(request.state)
        } else {
            PlanModifyResponse::keep(request.plan)
        }
    }
}
