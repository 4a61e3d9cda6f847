// ABOUTME: mcp-skill - opens one MCP session, runs one command, closes it.
// ABOUTME: Tool output goes to stdout as JSON; logs and errors go to stderr.

mod args;

use std::process::ExitCode;

use anyhow::{Context, Result, bail};
use clap::Parser;
use serde_json::{Value, json};

use mcp_skills::prelude::*;

use crate::args::{Args, Command};

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default.into()),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn settings_for(args: &Args) -> Result<Settings> {
    let sources = if args.env_files.is_empty() {
        Settings::default_sources(args.skill_dir.as_deref())
    } else {
        let mut sources = vec![EnvSource::Process];
        if let Some(dir) = &args.skill_dir {
            sources.push(EnvSource::File(dir.join(".env")));
        }
        sources.extend(args.env_files.iter().cloned().map(EnvSource::File));
        sources
    };
    Ok(Settings::resolve(&sources)?)
}

/// Close the session whatever happened; the command's own error wins.
fn settle(outcome: McpResult<Value>, closed: McpResult<()>) -> Result<Value> {
    let value = outcome?;
    closed.context("closing session")?;
    Ok(value)
}

async fn execute(args: Args) -> Result<Value> {
    let settings = settings_for(&args)?;
    let mut config = args.skill.config(&settings)?;
    if let Some(timeout) = args.request_timeout() {
        config = config.timeout(timeout);
    }
    tracing::debug!(skill = %args.skill, timeout = ?config.request_timeout, "opening session");

    match (args.command, args.skill) {
        (Command::Query { .. }, kind) if kind != SkillKind::Postgres => {
            bail!("query is only available for the postgres skill")
        }
        (Command::Issue { .. }, kind) if kind != SkillKind::Github => {
            bail!("issue is only available for the github skill")
        }
        (Command::Tools, _) => {
            let listed = Session::open(config)
                .await?
                .run(|session| {
                    Box::pin(async move {
                        let catalog = session.discover_tools().await?;
                        Ok::<_, McpError>(json!(catalog.iter().collect::<Vec<_>>()))
                    })
                })
                .await?;
            Ok(listed)
        }
        (Command::Call { tool, arguments }, _) => {
            let arguments: Value = match arguments {
                Some(raw) => serde_json::from_str(&raw)
                    .with_context(|| format!("arguments for {} are not valid JSON", tool))?,
                None => json!({}),
            };
            let result = with_session(config, move |session| {
                Box::pin(async move {
                    let result = session.call_tool(&tool, arguments).await?;
                    Ok::<_, McpError>(serde_json::to_value(result)?)
                })
            })
            .await?;
            Ok(result)
        }
        (Command::Query { sql }, _) => {
            let mut skill = PostgresSkill::from_session(Session::open(config).await?);
            let outcome = skill.query(&sql).await.map(Value::Array);
            let closed = skill.close().await;
            settle(outcome, closed)
        }
        (Command::Issue { owner, repo, number }, _) => {
            let mut skill = GithubSkill::from_session(Session::open(config).await?);
            let outcome = skill.get_issue(&owner, &repo, number).await;
            let closed = skill.close().await;
            settle(outcome, closed)
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.verbose);

    match execute(args).await {
        Ok(value) => match serde_json::to_string_pretty(&value) {
            Ok(text) => {
                println!("{}", text);
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("error: {}", e);
                ExitCode::FAILURE
            }
        },
        Err(e) => {
            eprintln!("error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
