//! Specialist roster
//!
//! Five fixed personas share every conversation. Each one is backed by a
//! model the user picks per session.

use crate::api::{ModelAssignments, Role};

/// Model every specialist starts with
pub const DEFAULT_MODEL: &str = "llama3.2";

/// Models offered for assignment
pub const AVAILABLE_MODELS: [&str; 5] = ["llama3.2", "llama3.1", "mistral", "phi3", "gemma2"];

/// Display details for one persona
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpecialistInfo {
    pub role: Role,
    pub name: &'static str,
    pub icon: &'static str,
}

/// Persona for a specialist role, `None` for `user`/`system`
pub fn info(role: Role) -> Option<SpecialistInfo> {
    let (name, icon) = match role {
        Role::Style => ("Luna", "🎨"),
        Role::Composition => ("Frame", "📐"),
        Role::Story => ("Saga", "📖"),
        Role::Technical => ("Pixel", "⚙️"),
        Role::Critic => ("Lens", "🔍"),
        Role::User | Role::System => return None,
    };
    Some(SpecialistInfo { role, name, icon })
}

/// All five personas in roster order
pub fn roster() -> impl Iterator<Item = SpecialistInfo> {
    Role::SPECIALISTS.into_iter().filter_map(info)
}

/// Assignments for a fresh session
pub fn default_model_assignments() -> ModelAssignments {
    Role::SPECIALISTS
        .iter()
        .map(|role| (role.as_str().to_string(), DEFAULT_MODEL.to_string()))
        .collect()
}

/// Overlay a session's stored assignments on the defaults, so roles the
/// backend never saw still show a model.
pub fn merge_with_defaults(stored: &ModelAssignments) -> ModelAssignments {
    let mut merged = default_model_assignments();
    merged.extend(stored.iter().map(|(k, v)| (k.clone(), v.clone())));
    merged
}

/// Label for a message author: persona name for specialists, else the role
pub fn display_name(role: Role, name: Option<&str>) -> String {
    match (name.filter(|n| !n.is_empty()), info(role)) {
        (Some(name), _) => name.to_string(),
        (None, Some(info)) => info.name.to_string(),
        (None, None) => match role {
            Role::User => "You".to_string(),
            other => other.as_str().to_string(),
        },
    }
}
