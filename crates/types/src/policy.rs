use serde::{Deserialize, Serialize};

/// A single permission, prohibition or duty
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    /// ODRL action, e.g. "use"
    pub action: String,

    /// Constraint expressions attached to the rule, kept opaque
    #[serde(default)]
    pub constraints: Vec<String>,
}

impl Rule {
    pub fn new(action: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            constraints: vec![],
        }
    }

    pub fn with_constraint(mut self, constraint: impl Into<String>) -> Self {
        self.constraints.push(constraint.into());
        self
    }
}

/// Usage policy attached to offers and agreements.
///
/// The engine never evaluates policies; it only carries them between
/// offers, agreements and outbound messages.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Policy {
    /// Asset the policy applies to
    pub target: Option<String>,

    pub assigner: Option<String>,

    pub assignee: Option<String>,

    #[serde(default)]
    pub permissions: Vec<Rule>,

    #[serde(default)]
    pub prohibitions: Vec<Rule>,

    #[serde(default)]
    pub obligations: Vec<Rule>,
}

impl Policy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    pub fn with_assigner(mut self, assigner: impl Into<String>) -> Self {
        self.assigner = Some(assigner.into());
        self
    }

    pub fn with_assignee(mut self, assignee: impl Into<String>) -> Self {
        self.assignee = Some(assignee.into());
        self
    }

    pub fn with_permission(mut self, rule: Rule) -> Self {
        self.permissions.push(rule);
        self
    }
}
