use std::path::PathBuf;

use thread_scout::app::{self, RunOptions};

enum Mode {
    Browse,
    Once,
    CheckConfig,
}

fn main() {
    let (mode, opts) = match parse_args() {
        Ok(Some(parsed)) => parsed,
        Ok(None) => return,
        Err(message) => {
            eprintln!("error: {message}");
            std::process::exit(2);
        }
    };

    let mut stdout = std::io::stdout();
    let result = match mode {
        Mode::Browse => app::run(opts),
        Mode::Once => app::run_once(opts, &mut stdout),
        Mode::CheckConfig => app::check_config(opts, &mut stdout),
    };
    if let Err(err) = result {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

fn print_help() {
    println!(
        "thread-scout - Rank discussion-board threads by search term hits.\n\n  --config <path>      Read configuration from <path>\n  --log-file <path>    Write logs to <path>\n  --once               Crawl once, print ranked results and exit\n  --check-config       Validate configuration, print it and exit\n  --version, -V        Show version and exit\n  --help,    -h        Show this help message"
    );
}

fn parse_args() -> Result<Option<(Mode, RunOptions)>, String> {
    let mut mode = Mode::Browse;
    let mut opts = RunOptions::default();
    let mut args = std::env::args().skip(1);

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--version" | "-V" => {
                println!("thread-scout {}", thread_scout::VERSION);
                return Ok(None);
            }
            "--help" | "-h" => {
                print_help();
                return Ok(None);
            }
            "--config" => {
                let path = args.next().ok_or("--config needs a path")?;
                opts.config_file = Some(PathBuf::from(path));
            }
            "--log-file" => {
                let path = args.next().ok_or("--log-file needs a path")?;
                opts.log_file = Some(PathBuf::from(path));
            }
            "--once" => mode = Mode::Once,
            "--check-config" => mode = Mode::CheckConfig,
            other => return Err(format!("unknown argument {other:?} (see --help)")),
        }
    }

    Ok(Some((mode, opts)))
}
