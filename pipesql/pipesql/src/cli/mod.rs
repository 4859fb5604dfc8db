use std::fs::File;
use std::io::{self, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::process::exit;
use std::str::FromStr;

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand, ValueHint};
use strum::VariantNames;

use pipesql::debug;
use pipesql::json;
use pipesql::{Compiler, Dialect, Options, Quoting};

/// Entrypoint called by [`crate::main`]
pub fn main() -> Result<()> {
    let cli = Cli::parse();

    // redirect all log messages into the [debug::DebugLog]
    static LOGGER: debug::MessageLogger = debug::MessageLogger;
    log::set_logger(&LOGGER)
        .map(|()| log::set_max_level(log::LevelFilter::Debug))
        .map_err(|e| anyhow!("cannot install the logger: {e}"))?;

    match cli.command.run() {
        Ok(output) => {
            io::stdout().write_all(&output)?;
            Ok(())
        }
        Err(error) => {
            eprintln!("{error}");
            exit(1)
        }
    }
}

#[derive(Parser, Debug, Clone)]
#[command(name = env!("CARGO_PKG_NAME"), about, version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, Clone)]
enum Command {
    /// Compile a pipeline to SQL
    Compile {
        #[command(flatten)]
        io_args: IoArgs,

        /// Exclude the signature comment containing the compiler version
        #[arg(long = "hide-signature-comment", action = clap::ArgAction::SetFalse)]
        signature_comment: bool,

        /// Emit unformatted, dense SQL
        #[arg(long = "no-format", action = clap::ArgAction::SetFalse)]
        format: bool,

        /// Emit the command, with its parameters, as JSON
        #[arg(long)]
        json: bool,

        /// File path into which to write the debug log to.
        #[arg(long, env = "PIPESQL_DEBUG_LOG")]
        debug_log: Option<PathBuf>,
    },

    #[command(subcommand)]
    Debug(DebugCommand),

    /// Show available dialect names
    #[command(name = "list-dialects")]
    ListDialects,
}

/// Commands for meant for debugging, prone to change
#[derive(Subcommand, Debug, Clone)]
enum DebugCommand {
    /// Print the translated select and shaper as JSON
    Shaped(IoArgs),

    /// Compile and print the debug log as JSON
    Log(IoArgs),
}

#[derive(clap::Args, Debug, Clone)]
struct IoArgs {
    /// Pipeline as JSON. Reads stdin when `-`.
    #[arg(default_value = "-", value_hint(ValueHint::FilePath))]
    pipeline: PathBuf,

    /// Entity model as JSON
    #[arg(short, long, value_hint(ValueHint::FilePath), env = "PIPESQL_MODEL")]
    model: PathBuf,

    /// Target dialect
    #[arg(short, long, default_value = "generic", env = "PIPESQL_DIALECT")]
    dialect: String,

    /// When to quote identifiers: `when_needed` or `always`
    #[arg(long, default_value = "when_needed")]
    quoting: String,
}

/// Contents of the files an IO command reads.
struct Inputs {
    pipeline: String,
    model: String,
}

impl Command {
    /// Entrypoint called by [`main`]
    fn run(&self) -> Result<Vec<u8>> {
        match self {
            Command::ListDialects => Ok(format!("{}\n", Dialect::VARIANTS.join("\n")).into_bytes()),
            _ => {
                let inputs = self.read_input()?;
                self.execute(&inputs)
            }
        }
    }

    fn execute(&self, inputs: &Inputs) -> Result<Vec<u8>> {
        let query = json::to_query(&inputs.pipeline)?;
        let model = json::to_model(&inputs.model)?;
        let options = self.io_args().map(IoArgs::options).transpose()?;
        let options = options.unwrap_or_default();

        Ok(match self {
            Command::Compile {
                signature_comment,
                format,
                json,
                debug_log,
                ..
            } => {
                if debug_log.is_some() {
                    debug::log_start();
                }

                let options = options
                    .with_signature_comment(*signature_comment)
                    .with_format(*format);
                let res = Compiler::new(&model, options).compile(&query);

                if let Some(path) = debug_log {
                    write_log(path)?;
                }

                let command = res?;
                if *json {
                    json::from_command(&command)?.into_bytes()
                } else {
                    let mut sql = command.sql;
                    sql.push('\n');
                    sql.into_bytes()
                }
            }
            Command::Debug(DebugCommand::Shaped(_)) => {
                let shaped = Compiler::new(&model, options).translate(&query)?;
                serde_json::to_string_pretty(&shaped)?.into_bytes()
            }
            Command::Debug(DebugCommand::Log(_)) => {
                debug::log_start();
                // a failed compilation still has a log, its error is in there
                let _ = Compiler::new(&model, options).compile(&query);
                let log = debug::log_finish()
                    .ok_or_else(|| anyhow!("debug log was started, but it cannot be found"))?;
                log.to_json()?.into_bytes()
            }
            Command::ListDialects => unreachable!("`list-dialects` doesn't read input"),
        })
    }

    fn io_args(&self) -> Option<&IoArgs> {
        match self {
            Command::Compile { io_args, .. }
            | Command::Debug(DebugCommand::Shaped(io_args) | DebugCommand::Log(io_args)) => {
                Some(io_args)
            }
            Command::ListDialects => None,
        }
    }

    fn read_input(&self) -> Result<Inputs> {
        let io_args = self
            .io_args()
            .ok_or_else(|| anyhow!("command doesn't read input"))?;

        let pipeline = if io_args.pipeline == Path::new("-") {
            let mut buf = String::new();
            io::stdin().read_to_string(&mut buf)?;
            buf
        } else {
            std::fs::read_to_string(&io_args.pipeline)?
        };
        let model = std::fs::read_to_string(&io_args.model)?;

        Ok(Inputs { pipeline, model })
    }
}

impl IoArgs {
    fn options(&self) -> Result<Options> {
        let dialect = Dialect::from_str(&self.dialect).map_err(|_| {
            anyhow!(
                "unknown dialect `{}`, expected one of: {}",
                self.dialect,
                Dialect::VARIANTS.join(", ")
            )
        })?;
        let quoting = Quoting::from_str(&self.quoting)
            .map_err(|_| anyhow!("unknown quoting `{}`", self.quoting))?;
        Ok(Options::default()
            .with_dialect(dialect)
            .with_quoting(quoting))
    }
}

fn write_log(path: &Path) -> Result<()> {
    let debug_log = debug::log_finish().ok_or_else(|| {
        anyhow!("debug log was started, but it cannot be found after compilation")
    })?;
    match path.extension().and_then(|s| s.to_str()) {
        Some("json") => {
            let file = BufWriter::new(File::create(path)?);
            serde_json::to_writer(file, &debug_log)?;
        }
        _ => {
            return Err(anyhow!("unknown debug log format for file {path:?}"));
        }
    }
    Ok(())
}
