use pretty_assertions::assert_eq;

use super::*;

fn parse(args: &[&str]) -> Result<Command, String> {
    let args: Vec<String> = args.iter().map(ToString::to_string).collect();
    parse_args(&args)
}

#[test]
fn test_no_arguments_generates_with_conventions() {
    assert_eq!(parse(&[]).unwrap(), Command::Generate(GenerateArgs::default()));
}

#[test]
fn test_generate_flags() {
    let command = parse(&[
        "generate",
        "--config",
        "rebind.json",
        "--source=vendor/include",
        "--dest",
        "out",
        "-D",
        "NNG_STATIC_LIB",
        "--define=NNG_VERSION=2",
        "--format",
        "json",
        "--color=never",
        "--dry-run",
    ])
    .unwrap();
    assert_eq!(
        command,
        Command::Generate(GenerateArgs {
            config: Some(PathBuf::from("rebind.json")),
            source: Some(PathBuf::from("vendor/include")),
            dest: Some(PathBuf::from("out")),
            defines: vec!["NNG_STATIC_LIB".to_string(), "NNG_VERSION=2".to_string()],
            format: OutputFormat::Json,
            color: ColorMode::Never,
            dry_run: true,
        })
    );
}

#[test]
fn test_subcommand_is_optional() {
    let Command::Generate(args) = parse(&["--dry-run"]).unwrap() else {
        panic!("expected generate");
    };
    assert!(args.dry_run);
}

#[test]
fn test_rules_command() {
    assert_eq!(
        parse(&["rules", "--config", "rebind.json", "--format", "json"]).unwrap(),
        Command::Rules(RulesArgs {
            config: Some(PathBuf::from("rebind.json")),
            format: OutputFormat::Json,
            color: ColorMode::Auto,
        })
    );
    assert!(parse(&["rules", "--dry-run"]).is_err());
}

#[test]
fn test_help() {
    assert_eq!(parse(&["help"]).unwrap(), Command::Help);
    assert_eq!(parse(&["--help"]).unwrap(), Command::Help);
}

#[test]
fn test_errors() {
    assert_eq!(parse(&["bogus"]).unwrap_err(), "unknown command `bogus`");
    assert_eq!(parse(&["--verbose"]).unwrap_err(), "unknown option `--verbose`");
    assert_eq!(parse(&["--dest"]).unwrap_err(), "`--dest` needs a value");
    assert!(parse(&["--format", "xml"]).unwrap_err().contains("unknown format"));
    assert!(parse(&["--color=sometimes"]).is_err());
}
