use std::path::PathBuf;

use anyhow::{Context, Result, anyhow, bail};
use log::debug;

use shapetrap::eval::{EvalError, evaluate};
use shapetrap::parser::parse;
use shapetrap::policy::Policy;
use shapetrap::session::Session;
use shapetrap::tensor::{TensorHost, Value};

const USAGE: &str = "usage: shapetrap [--bind NAME=VALUE]... [--policy FILE] [--repr] LINE";

fn main() -> Result<()> {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let mut env = TensorHost::prelude();
    let mut policy_path: Option<PathBuf> = None;
    let mut show_repr = false;
    let mut line: Option<String> = None;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--bind" | "-b" => {
                let binding = args
                    .next()
                    .ok_or_else(|| anyhow!("Missing NAME=VALUE after {arg}"))?;
                let (name, value) = binding
                    .split_once('=')
                    .ok_or_else(|| anyhow!("Binding `{binding}` is not NAME=VALUE"))?;
                let value = value
                    .parse::<Value>()
                    .with_context(|| format!("Binding {name}"))?;
                env.insert(name.trim().to_string(), value);
            }
            "--policy" | "-p" => {
                let path = args
                    .next()
                    .ok_or_else(|| anyhow!("Missing policy file after {arg}"))?;
                policy_path = Some(PathBuf::from(path));
            }
            "--repr" => show_repr = true,
            "--help" | "-h" => {
                println!("{USAGE}");
                return Ok(());
            }
            _ => {
                line = Some(arg);
                if args.next().is_some() {
                    bail!("Only one line is supported\n{USAGE}");
                }
                break;
            }
        }
    }

    let Some(line) = line else {
        bail!("Missing LINE\n{USAGE}");
    };
    let policy = match &policy_path {
        Some(path) => Policy::load(path)?,
        None => Policy::default(),
    };

    let Some(node) = parse(&line)? else {
        debug!("nothing to analyze in `{line}`");
        return Ok(());
    };
    if show_repr {
        println!("{}", node.repr());
        return Ok(());
    }

    let host = TensorHost::new();
    let message = match evaluate(&node, &env, &host, &host) {
        Ok(value) => {
            println!("{value}");
            return Ok(());
        }
        Err(EvalError::Trap(trap)) => trap.cause.to_string(),
        Err(err) => err.to_string(),
    };

    let mut session = Session::start(policy);
    match session.diagnose(&host, &line, &env, &message) {
        Some(diagnosis) => bail!("{diagnosis}"),
        None => bail!("{message}"),
    }
}
