//! Request guards evaluated, in order, before a pipeline runs.
//!
//! Authentication is the routing layer's job; guards only see what it resolved.

use crate::assistant::Role;
use crate::error::AppError;

#[derive(Debug, Clone, Copy)]
pub struct GuardContext {
    /// Resolved caller role, if the operation needs one.
    pub role: Option<Role>,
    pub ai_enabled: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Guard {
    RequireRole(&'static [Role]),
    RequireAiEnabled,
}

impl Guard {
    pub fn check(&self, ctx: &GuardContext) -> Result<(), AppError> {
        match self {
            Guard::RequireRole(allowed) => match ctx.role {
                Some(role) if allowed.contains(&role) => Ok(()),
                Some(role) => Err(AppError::Forbidden(format!(
                    "role '{}' may not use this operation",
                    role
                ))),
                None => Err(AppError::Forbidden("caller role required".to_string())),
            },
            Guard::RequireAiEnabled => {
                if ctx.ai_enabled {
                    Ok(())
                } else {
                    Err(AppError::Unavailable(
                        "AI provider credentials are not configured".to_string(),
                    ))
                }
            }
        }
    }
}

pub const NOTE_GUARDS: &[Guard] = &[
    Guard::RequireRole(&[Role::Clinician, Role::Admin]),
    Guard::RequireAiEnabled,
];

pub const CHAT_GUARDS: &[Guard] = &[Guard::RequireAiEnabled];

/// First failing guard wins.
pub fn check_all(guards: &[Guard], ctx: &GuardContext) -> Result<(), AppError> {
    guards.iter().try_for_each(|guard| guard.check(ctx))
}
