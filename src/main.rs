use std::path::PathBuf;

const HELP: &str = "YCH-TUI - Keep a bank of ready-made comments and open a channel's latest uploads.

  --version, -V          Show version and exit
  --help,    -h          Show this help message
  --config <file>        Read settings from <file> instead of the default config
  --import <file>        Merge comments from a .pdf, .txt or .csv file and exit";

enum Command {
    Exit,
    Import(PathBuf),
    Run,
}

fn main() {
    let mut opts = ych_tui::RunOptions::default();
    let command = match parse_args(std::env::args().skip(1), &mut opts) {
        Ok(command) => command,
        Err(message) => {
            eprintln!("error: {message}\n\n{HELP}");
            std::process::exit(2);
        }
    };

    let result = match command {
        Command::Exit => return,
        Command::Import(path) => ych_tui::import(opts, &path).map(|added| {
            println!("Imported {added} new comments from {}.", path.display());
        }),
        Command::Run => ych_tui::run(opts),
    };

    if let Err(err) = result {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

fn parse_args(
    mut args: impl Iterator<Item = String>,
    opts: &mut ych_tui::RunOptions,
) -> Result<Command, String> {
    let mut command = Command::Run;
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--version" | "-V" => {
                println!("YCH-TUI {}", ych_tui::VERSION);
                return Ok(Command::Exit);
            }
            "--help" | "-h" => {
                println!("{HELP}");
                return Ok(Command::Exit);
            }
            "--config" => {
                let value = args.next().ok_or("--config needs a file path")?;
                opts.config_file = Some(PathBuf::from(value));
            }
            "--import" => {
                let value = args.next().ok_or("--import needs a file path")?;
                command = Command::Import(PathBuf::from(value));
            }
            other => return Err(format!("unknown argument {other:?}")),
        }
    }
    Ok(command)
}
