//! Rebind CLI
//!
//! Generates Rust bindings for a C library from its header tree.

use std::io::{self, IsTerminal, Write};

use rebind_diagnostic::emitter::{
    ColorMode, DiagnosticEmitter, JsonEmitter, OutputFormat, TerminalEmitter,
};
use rebind_diagnostic::{Diagnostic, Tally};
use rebind_gen::GeneratorConfig;
use rebindc::args::{parse_args, Command, GenerateArgs, RulesArgs, USAGE};
use rebindc::{init_tracing, rule_table, rules_json, run_generate, Produced};

fn main() {
    init_tracing();
    let args: Vec<String> = std::env::args().skip(1).collect();

    let command = match parse_args(&args) {
        Ok(command) => command,
        Err(message) => {
            eprintln!("error: {message}");
            eprintln!();
            eprintln!("{USAGE}");
            std::process::exit(1);
        }
    };

    let code = match command {
        Command::Generate(args) => generate(&args),
        Command::Rules(args) => rules(&args),
        Command::Help => {
            println!("{USAGE}");
            0
        }
    };
    std::process::exit(code);
}

fn report(diagnostics: &[Diagnostic], format: OutputFormat, color: ColorMode) {
    let tally = Tally::of(diagnostics);
    let mut emitter: Box<dyn DiagnosticEmitter> = match format {
        OutputFormat::Terminal => Box::new(TerminalEmitter::stderr(
            color,
            io::stderr().is_terminal(),
        )),
        OutputFormat::Json => Box::new(JsonEmitter::new(io::stderr())),
    };
    emitter.emit_all(diagnostics);
    if tally.errors + tally.warnings > 0 {
        emitter.emit_summary(tally.errors, tally.warnings);
    }
    emitter.flush();
}

fn generate(args: &GenerateArgs) -> i32 {
    let cwd = match std::env::current_dir() {
        Ok(cwd) => cwd,
        Err(err) => {
            eprintln!("error: cannot determine the working directory: {err}");
            return 1;
        }
    };

    let outcome = run_generate(args, &cwd);
    report(&outcome.diagnostics, args.format, args.color);
    match &outcome.result {
        Ok(Produced::Rendered(text)) => {
            let mut stdout = io::stdout().lock();
            if let Err(err) = stdout.write_all(text.as_bytes()) {
                eprintln!("error: {err}");
                return 1;
            }
        }
        Ok(Produced::Written(written)) => {
            eprintln!(
                "wrote {} ({} declarations, {} bytes)",
                written.path.display(),
                written.decls,
                written.bytes
            );
        }
        Err(err) => eprintln!("error: {err}"),
    }
    outcome.exit_code()
}

fn rules(args: &RulesArgs) -> i32 {
    let config = match &args.config {
        Some(path) => GeneratorConfig::load(path),
        None => Ok(GeneratorConfig::default()),
    };
    let printed = config.and_then(|config| match args.format {
        OutputFormat::Terminal => {
            let (table, warnings) = rule_table(&config)?;
            print!("{table}");
            report(&warnings, args.format, args.color);
            Ok(())
        }
        OutputFormat::Json => {
            // Compile first so an invalid rule set is still rejected.
            config.registry()?;
            println!("{}", rules_json(&config)?);
            Ok(())
        }
    });
    match printed {
        Ok(()) => 0,
        Err(err) => {
            eprintln!("error: {err}");
            1
        }
    }
}
