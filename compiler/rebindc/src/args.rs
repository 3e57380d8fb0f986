//! Command-line parsing.

use std::path::PathBuf;

use rebind_diagnostic::emitter::{ColorMode, OutputFormat};

/// A parsed invocation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    Generate(GenerateArgs),
    Rules(RulesArgs),
    Help,
}

/// Flags for `rebindc generate`. Every override is optional; unset ones
/// fall back to the config file, then to the built-in conventions.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GenerateArgs {
    pub config: Option<PathBuf>,
    pub source: Option<PathBuf>,
    pub dest: Option<PathBuf>,
    /// Appended to the configured defines.
    pub defines: Vec<String>,
    pub format: OutputFormat,
    pub color: ColorMode,
    /// Print the bindings instead of writing them.
    pub dry_run: bool,
}

/// Flags for `rebindc rules`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RulesArgs {
    pub config: Option<PathBuf>,
    pub format: OutputFormat,
    pub color: ColorMode,
}

/// Parse `args`, not including the program name.
///
/// No subcommand means `generate`.
pub fn parse_args(args: &[String]) -> Result<Command, String> {
    let (command, rest) = match args.first().map(String::as_str) {
        Some("generate") => ("generate", &args[1..]),
        Some("rules") => ("rules", &args[1..]),
        Some("help" | "--help" | "-h") => return Ok(Command::Help),
        Some(arg) if !arg.starts_with('-') => {
            return Err(format!("unknown command `{arg}`"));
        }
        _ => ("generate", args),
    };

    let mut generate = GenerateArgs::default();
    let mut i = 0;
    while i < rest.len() {
        let arg = rest[i].as_str();
        // Both `--flag value` and `--flag=value` are accepted.
        let (flag, inline) = match arg.split_once('=') {
            Some((flag, value)) if flag.starts_with("--") => (flag, Some(value.to_string())),
            _ => (arg, None),
        };
        let mut value = || -> Result<String, String> {
            if let Some(value) = inline.clone() {
                return Ok(value);
            }
            i += 1;
            rest.get(i)
                .cloned()
                .ok_or_else(|| format!("`{flag}` needs a value"))
        };
        match flag {
            "--config" => generate.config = Some(PathBuf::from(value()?)),
            "--source" => generate.source = Some(PathBuf::from(value()?)),
            "--dest" => generate.dest = Some(PathBuf::from(value()?)),
            "--define" | "-D" => generate.defines.push(value()?),
            "--format" => generate.format = value()?.parse()?,
            "--color" => generate.color = value()?.parse()?,
            "--dry-run" => generate.dry_run = true,
            other => return Err(format!("unknown option `{other}`")),
        }
        i += 1;
    }

    if command == "rules" {
        if generate.source.is_some()
            || generate.dest.is_some()
            || !generate.defines.is_empty()
            || generate.dry_run
        {
            return Err("`rules` only accepts --config, --format and --color".to_string());
        }
        return Ok(Command::Rules(RulesArgs {
            config: generate.config,
            format: generate.format,
            color: generate.color,
        }));
    }
    Ok(Command::Generate(generate))
}

pub const USAGE: &str = "\
Usage: rebindc [generate] [options]
       rebindc rules [--config <file.json>] [--format terminal|json]
       rebindc help

Generates Rust bindings from a tree of C headers.

Options:
  --config <file.json>      Generator config (default: built-in nng conventions)
  --source <dir>            Header root (default: ext/nng/include)
  --dest <dir>              Output root (default: nng-sys/src)
  -D, --define NAME[=VALUE] Predefine a preprocessor macro (repeatable)
  --format terminal|json    Diagnostic output format
  --color auto|always|never Terminal colors
  --dry-run                 Print the bindings to stdout instead of writing

Set RUST_LOG (e.g. RUST_LOG=rebind_gen=debug) for tracing output.";

#[cfg(test)]
#[expect(clippy::unwrap_used, reason = "Tests use unwrap for brevity")]
mod tests;
