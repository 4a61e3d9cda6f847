// ABOUTME: Command-line arguments for mcp-skill.
// ABOUTME: One skill per invocation, one command against it.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use mcp_skills::skills::SkillKind;

/// Talk to an MCP skill server from the shell.
#[derive(Parser, Debug)]
#[command(name = "mcp-skill", version, about = "Run MCP skill tools from the command line")]
pub struct Args {
    /// Log protocol traffic at debug level on stderr
    #[arg(short, long)]
    pub verbose: bool,

    /// Read settings from this dotenv file instead of .env.local and .env.
    /// Can be given multiple times; earlier files win.
    #[arg(long = "env-file", value_name = "PATH")]
    pub env_files: Vec<PathBuf>,

    /// Directory holding the skill's own .env file
    #[arg(long, value_name = "DIR")]
    pub skill_dir: Option<PathBuf>,

    /// Seconds to wait for each server reply
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// browser, postgres, github or sentry
    #[arg(value_name = "SKILL", value_parser = parse_skill)]
    pub skill: SkillKind,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List the tools the server offers
    Tools,

    /// Call a tool with JSON arguments
    Call {
        tool: String,
        /// Arguments as a JSON object (defaults to {})
        #[arg(value_name = "JSON")]
        arguments: Option<String>,
    },

    /// Run SQL (postgres only)
    Query {
        #[arg(value_name = "SQL")]
        sql: String,
    },

    /// Fetch an issue (github only)
    Issue {
        owner: String,
        repo: String,
        number: u64,
    },
}

impl Args {
    pub fn request_timeout(&self) -> Option<Duration> {
        self.timeout.map(Duration::from_secs)
    }
}

fn parse_skill(s: &str) -> Result<SkillKind, String> {
    s.parse().map_err(|e: mcp_skills::McpError| e.to_string())
}
