mod debug_report;

use phonomorph::{MorpherOptions, Options, parse_verbose_with};
use std::io::{self, IsTerminal, Read};
use tracing_subscriber::EnvFilter;

fn main() {
    let config = match parse_args() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(2);
        }
    };
    init_logging();

    let mut failed = false;
    for word in config.input.split_whitespace() {
        match parse_verbose_with(word, &config.options) {
            Ok(res) => debug_report::print_run(word, &res, config.color),
            Err(err) => {
                eprintln!("error: {word}: {err}");
                failed = true;
            }
        }
    }
    if failed {
        std::process::exit(1);
    }
}

/// `PHONOMORPH_LOG` takes precedence; `PHONOMORPH_DEBUG_RULES=1` raises the
/// default from `warn` to `debug` for this crate.
fn init_logging() {
    let debug_rules = std::env::var("PHONOMORPH_DEBUG_RULES").is_ok_and(|v| v == "1");
    let default = if debug_rules { "warn,phonomorph=debug" } else { "warn" };
    let filter = EnvFilter::try_from_env("PHONOMORPH_LOG").unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(io::stderr).with_target(false).init();
}

struct CliConfig {
    input: String,
    options: Options,
    color: bool,
}

fn parse_args() -> Result<CliConfig, String> {
    let mut input: Option<String> = None;
    let mut morpher = MorpherOptions::default();
    let mut verbose = false;
    let mut color = io::stdout().is_terminal();
    let mut args = std::env::args().skip(1).peekable();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-h" | "--help" => {
                print_help();
                std::process::exit(0);
            }
            "-V" | "--version" => {
                println!("phonomorph {}", env!("CARGO_PKG_VERSION"));
                std::process::exit(0);
            }
            "--color" => color = true,
            "--no-color" => color = false,
            "--trace" => verbose = true,
            "--deletion-reapplications" => {
                let value = args.next().ok_or_else(|| "error: --deletion-reapplications expects a value".to_string())?;
                morpher.deletion_reapplications = parse_count(&value)?;
            }
            "--input" | "-i" => {
                let value = args.next().ok_or_else(|| "error: --input expects a value".to_string())?;
                if input.is_some() {
                    return Err("error: input provided multiple times".to_string());
                }
                input = Some(value);
            }
            "--" => {
                let rest = args.collect::<Vec<_>>().join(" ");
                if !rest.trim().is_empty() {
                    if input.is_some() {
                        return Err("error: input provided multiple times".to_string());
                    }
                    input = Some(rest);
                }
                break;
            }
            _ if arg.starts_with("--deletion-reapplications=") => {
                let value = arg.trim_start_matches("--deletion-reapplications=");
                morpher.deletion_reapplications = parse_count(value)?;
            }
            _ if arg.starts_with("--input=") => {
                let value = arg.trim_start_matches("--input=");
                if input.is_some() {
                    return Err("error: input provided multiple times".to_string());
                }
                input = Some(value.to_string());
            }
            _ if arg.starts_with('-') => {
                return Err(format!("error: unknown option '{arg}'"));
            }
            _ => {
                let rest = std::iter::once(arg).chain(args).collect::<Vec<_>>().join(" ");
                if input.is_some() {
                    return Err("error: input provided multiple times".to_string());
                }
                input = Some(rest);
                break;
            }
        }
    }

    let input = match input {
        Some(value) => value,
        None => read_stdin_input()?,
    };

    if input.trim().is_empty() {
        return Err(format!("error: no input provided\n\n{}", help_text()));
    }

    Ok(CliConfig { input, options: Options { morpher, verbose }, color })
}

fn read_stdin_input() -> Result<String, String> {
    let mut buffer = String::new();
    io::stdin().read_to_string(&mut buffer).map_err(|err| format!("error: failed to read stdin: {err}"))?;
    Ok(buffer)
}

fn parse_count(value: &str) -> Result<usize, String> {
    value
        .parse::<usize>()
        .map_err(|_| format!("error: invalid --deletion-reapplications '{value}' (expected a non-negative integer)"))
}

fn print_help() {
    println!("{}", help_text());
}

fn help_text() -> String {
    format!(
        "phonomorph {version}

Parse surface words against the built-in sample grammar.

Usage:
  phonomorph [OPTIONS] [--] <word...>
  phonomorph [OPTIONS] --input <words>

Options:
  -i, --input <words>                 Words to parse, separated by whitespace. If
                                      omitted, reads remaining args or stdin when
                                      no args are provided.
  --deletion-reapplications <n>       Extra passes when unapplying deletion and
                                      widening rules. Default: 0
  --trace                             Record and print every rule event.
  --color                             Force ANSI color output.
  --no-color                          Disable ANSI color output.
  -h, --help                          Show this help message.
  -V, --version                       Print version information.

Environment:
  PHONOMORPH_LOG                      tracing filter, e.g. `phonomorph=debug`.
  PHONOMORPH_DEBUG_RULES=1            Log every rule application.

Exit codes:
  0  Success.
  1  A word failed to parse.
  2  Invalid arguments or missing input.
",
        version = env!("CARGO_PKG_VERSION"),
    )
}
