use clap::{Args, Subcommand};

use crate::exit::CliResult;
use crate::output::OutputFormat;

pub mod call;
pub mod parse;
pub mod serve;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Host the demo Calc and Echo objects until interrupted.
    Serve(ServeArgs),
    /// Perform one remote call.
    Call(CallArgs),
    /// Parse an endpoint URL and print its parts.
    Parse(ParseArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Serve(args) => serve::run(args, format),
        Command::Call(args) => call::run(args, format),
        Command::Parse(args) => parse::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Host or address to bind.
    #[arg(long, env = "SIMPLERPC_HOST", default_value = "0.0.0.0")]
    pub host: String,
    /// Port to bind (0 picks a free port).
    #[arg(long, short = 'p', env = "SIMPLERPC_PORT", default_value_t = 0)]
    pub port: u16,
    /// Worker threads. More than one allows concurrent calls.
    #[arg(long, env = "SIMPLERPC_WORKERS", default_value_t = 1)]
    pub workers: usize,
    /// Accepted connections allowed to wait for a worker.
    #[arg(long, default_value_t = 1)]
    pub queue_depth: usize,
    /// Log every call through a trace stage.
    #[arg(long)]
    pub trace: bool,
}

#[derive(Args, Debug)]
pub struct CallArgs {
    /// Endpoint URL, e.g. simple://localhost:8080/Calc.
    pub url: String,
    /// Method name.
    pub method: String,
    /// Argument as JSON (repeatable): true, 42, "text" or null.
    #[arg(long = "arg", short = 'a', value_name = "JSON", allow_hyphen_values = true)]
    pub args: Vec<String>,
    /// Log every call through a trace stage.
    #[arg(long)]
    pub trace: bool,
}

#[derive(Args, Debug)]
pub struct ParseArgs {
    /// Endpoint URL to parse.
    pub url: String,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}
