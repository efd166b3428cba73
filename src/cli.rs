use std::env;
use std::fs;

use serde::Deserialize;
use tracing::warn;

use crate::config::{StackConfig, BIND_ENV, DEFAULT_BIND};
use crate::optimizer::topology::plan_teams;
use crate::optimizer::{assign_many, AssignJob, AssignMode};
use crate::parallel::WorkerPool;
use crate::server;
use crate::server::api::{resolve_request, TeamRequest, TeamResponse};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Serve,
    Assign,
    Plan,
}

pub fn parse_command(args: &[String]) -> Option<Command> {
    match args.get(1).map(String::as_str) {
        Some("serve") => Some(Command::Serve),
        Some("assign") => Some(Command::Assign),
        Some("plan") => Some(Command::Plan),
        _ => None,
    }
}

pub fn run_with_args(args: &[String]) -> i32 {
    match parse_command(args) {
        Some(Command::Serve) => handle_serve(),
        Some(Command::Assign) => handle_assign(args),
        Some(Command::Plan) => handle_plan(args),
        None => {
            eprintln!("usage: stackmaker <serve|assign|plan>");
            2
        }
    }
}

/// A request file holds one team request or a list of them.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RequestFile {
    Many(Vec<TeamRequest>),
    One(TeamRequest),
}

fn handle_serve() -> i32 {
    let config = StackConfig::from_env().unwrap_or_else(|err| {
        warn!(error = %err, "falling back to default configuration");
        eprintln!("config error: {err}; using defaults");
        StackConfig::default()
    });
    let bind_addr = env::var(BIND_ENV).unwrap_or_else(|_| DEFAULT_BIND.to_string());
    match server::run_server(&bind_addr, config) {
        Ok(()) => 0,
        Err(err) => {
            eprintln!("server error: {err}");
            1
        }
    }
}

fn handle_assign(args: &[String]) -> i32 {
    const USAGE: &str =
        "usage: stackmaker assign <request.json> [priority|balance|random] [--workers N]";

    let Some(path) = args.get(2) else {
        eprintln!("{USAGE}");
        return 2;
    };

    let mut mode_override = None;
    let mut workers = 0;
    let mut rest = args.iter().skip(3);
    while let Some(arg) = rest.next() {
        if arg == "--workers" {
            workers = parse_usize_arg(rest.next(), "workers", 0);
            continue;
        }
        match arg.parse::<AssignMode>() {
            Ok(mode) => mode_override = Some(mode),
            Err(err) => {
                eprintln!("{err}");
                eprintln!("{USAGE}");
                return 2;
            }
        }
    }

    let config = match StackConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("config error: {err}");
            return 1;
        }
    };

    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(err) => {
            eprintln!("failed to read '{path}': {err}");
            return 1;
        }
    };
    let (requests, single) = match serde_json::from_str::<RequestFile>(&raw) {
        Ok(RequestFile::One(request)) => (vec![request], true),
        Ok(RequestFile::Many(requests)) => (requests, false),
        Err(err) => {
            eprintln!("invalid request file '{path}': {err}");
            return 1;
        }
    };

    let mut jobs: Vec<AssignJob> = Vec::with_capacity(requests.len());
    for (index, request) in requests.into_iter().enumerate() {
        match resolve_request(request, &config.ranks) {
            Ok(mut job) => {
                if let Some(mode) = mode_override {
                    job.mode = mode;
                }
                jobs.push(job);
            }
            Err(err) => {
                eprintln!("request {index}: {err}");
                return 1;
            }
        }
    }

    let mut failed = false;
    let mut responses = Vec::with_capacity(jobs.len());
    for (index, result) in assign_many(&jobs, &config, WorkerPool::with_workers(workers))
        .into_iter()
        .enumerate()
    {
        match result {
            Ok(assignment) => responses.push(TeamResponse::from(assignment)),
            Err(err) => {
                eprintln!("request {index}: {err}");
                failed = true;
            }
        }
    }
    if failed {
        return 1;
    }

    let payload = if single {
        responses.first().map(serde_json::to_string_pretty)
    } else {
        Some(serde_json::to_string_pretty(&responses))
    };
    match payload {
        Some(Ok(payload)) => {
            println!("{payload}");
            0
        }
        Some(Err(err)) => {
            eprintln!("failed to serialize assignment: {err}");
            1
        }
        None => 1,
    }
}

fn handle_plan(args: &[String]) -> i32 {
    const USAGE: &str = "usage: stackmaker plan <participants> <roles>";

    let (Some(participants), Some(roles)) = (args.get(2), args.get(3)) else {
        eprintln!("{USAGE}");
        return 2;
    };
    let (Ok(participants), Ok(roles)) = (participants.parse::<usize>(), roles.parse::<usize>())
    else {
        eprintln!("{USAGE}");
        return 2;
    };

    let config = match StackConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("config error: {err}");
            return 1;
        }
    };

    match plan_teams(participants, roles, &config.topology) {
        Ok(plan) => match serde_json::to_string_pretty(&plan) {
            Ok(payload) => {
                println!("{payload}");
                0
            }
            Err(err) => {
                eprintln!("failed to serialize plan: {err}");
                1
            }
        },
        Err(err) => {
            eprintln!("plan failed: {err}");
            1
        }
    }
}

fn parse_usize_arg(raw: Option<&String>, name: &str, default: usize) -> usize {
    raw.and_then(|value| value.parse::<usize>().ok())
        .unwrap_or_else(|| {
            if let Some(value) = raw {
                eprintln!("invalid {name} '{value}', defaulting to {default}");
            }
            default
        })
}
