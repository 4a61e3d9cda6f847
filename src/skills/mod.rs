// ABOUTME: Skill facades - named convenience operations over a generic Session.
// ABOUTME: Each facade owns a session and only ever talks to it through call_tool.

mod browser;
mod github;
mod postgres;
mod sentry;

pub use browser::{BrowserSkill, Screenshot};
pub use github::GithubSkill;
pub use postgres::PostgresSkill;
pub use sentry::SentrySkill;

use std::fmt;
use std::str::FromStr;

use crate::config::{SessionConfig, Settings};
use crate::error::{McpError, McpResult};
use crate::protocol::ToolCallResult;

/// The skills this crate knows how to configure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkillKind {
    Browser,
    Postgres,
    Github,
    Sentry,
}

impl SkillKind {
    pub const ALL: [SkillKind; 4] = [
        SkillKind::Browser,
        SkillKind::Postgres,
        SkillKind::Github,
        SkillKind::Sentry,
    ];

    pub fn name(self) -> &'static str {
        match self {
            SkillKind::Browser => "browser",
            SkillKind::Postgres => "postgres",
            SkillKind::Github => "github",
            SkillKind::Sentry => "sentry",
        }
    }

    /// Build the session config for this skill from resolved settings.
    pub fn config(self, settings: &Settings) -> McpResult<SessionConfig> {
        match self {
            SkillKind::Browser => BrowserSkill::config(settings),
            SkillKind::Postgres => PostgresSkill::config(settings),
            SkillKind::Github => GithubSkill::config(settings),
            SkillKind::Sentry => SentrySkill::config(settings),
        }
    }
}

impl fmt::Display for SkillKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SkillKind {
    type Err = McpError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SkillKind::ALL
            .into_iter()
            .find(|k| k.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                McpError::Configuration(format!(
                    "unknown skill '{}' (expected one of: browser, postgres, github, sentry)",
                    s
                ))
            })
    }
}

/// Parse a tool's text output as JSON, falling back to the raw text.
pub(crate) fn json_or_text(result: &ToolCallResult) -> serde_json::Value {
    if let Some(structured) = &result.structured_content {
        return structured.clone();
    }
    let text = result.text();
    serde_json::from_str(&text).unwrap_or(serde_json::Value::String(text))
}
