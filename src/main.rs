use std::fs::File;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Local;
use clap::Parser as ClapParser;
use env_logger::Builder;
use log::{debug, info};
use memmap2::Mmap;

use lhox::error::LhoxError;
use lhox::session::{Backend, DumpOptions, Session};

const SCRIPT_EXTENSION: &str = "holang";
const EXIT_USAGE: i32 = 64;
const EXIT_STATIC: i32 = 65;
const EXIT_RUNTIME: i32 = 70;

#[derive(ClapParser, Debug)]
#[command(version, about = "lhox language interpreter", long_about = None)]
pub struct Cli {
    /// Script to run; starts a REPL when omitted
    file: Option<PathBuf>,

    /// Execution backend
    #[arg(long, value_enum, default_value_t = Backend::Tree)]
    backend: Backend,

    /// Print the token stream as JSON before running
    #[arg(long)]
    tokens: bool,

    /// Print each parsed statement as an S-expression
    #[arg(long)]
    ast: bool,

    /// Print the compiled bytecode (vm and both backends)
    #[arg(long)]
    disassemble: bool,

    /// Enable logging to lhox.log
    #[arg(long)]
    log: bool,
}

/// `path` if it exists, otherwise `path` with the script extension appended.
fn locate_script(path: &Path) -> Option<PathBuf> {
    if path.is_file() {
        return Some(path.to_path_buf());
    }

    let mut with_ext = path.as_os_str().to_owned();
    with_ext.push(".");
    with_ext.push(SCRIPT_EXTENSION);
    let with_ext = PathBuf::from(with_ext);

    with_ext.is_file().then_some(with_ext)
}

/// Memory-maps the script and returns its text.
fn read_script(path: &Path) -> Result<String> {
    info!("Reading file: {:?}", path);

    let file = File::open(path).context(format!("Failed to open file {:?}", path))?;
    let len = file
        .metadata()
        .context(format!("Failed to stat file {:?}", path))?
        .len();

    if len == 0 {
        return Ok(String::new());
    }

    // SAFETY: the map is read once into an owned String and dropped before
    // the program runs.
    let mmap = unsafe { Mmap::map(&file) }.context(format!("Failed to map file {:?}", path))?;
    let text = std::str::from_utf8(&mmap)
        .map_err(LhoxError::from)
        .context(format!("File {:?} is not valid UTF-8", path))?
        .to_owned();

    info!("Read {} bytes from {:?}", len, path);

    Ok(text)
}

fn init_logger() -> Result<()> {
    let log_file = File::create("lhox.log").context("Failed to create lhox.log")?;

    Builder::new()
        .format(|buf, record| {
            let module = record
                .module_path()
                .unwrap_or("<unnamed>")
                .strip_prefix("lhox::")
                .unwrap_or(record.module_path().unwrap_or("<unnamed>"));
            writeln!(
                buf,
                "[{} {}:{}] {} - {}",
                Local::now().format("%Y-%m-%dT%H:%M:%S%.3f"),
                module,
                record.line().unwrap_or(0),
                record.level(),
                record.args()
            )
        })
        .target(env_logger::Target::Pipe(Box::new(log_file)))
        .filter(None, log::LevelFilter::Debug)
        .parse_default_env()
        .init();

    info!("Logger initialized, writing to lhox.log");
    Ok(())
}

fn exit_code(error: &LhoxError) -> i32 {
    if error.is_static() {
        EXIT_STATIC
    } else {
        EXIT_RUNTIME
    }
}

fn run_file(session: &mut Session, path: &Path) -> Result<()> {
    let Some(script) = locate_script(path) else {
        eprintln!(
            "No such script: {:?} (also tried .{})\nUsage: lhox [OPTIONS] [FILE]",
            path, SCRIPT_EXTENSION
        );
        std::process::exit(EXIT_USAGE);
    };

    let source = read_script(&script)?;

    if let Err(e) = session.run(&source) {
        debug!("Run failed: {}", e);
        eprintln!("{}", e);
        std::process::exit(exit_code(&e));
    }

    info!("Program executed successfully");
    Ok(())
}

/// Reads lines until EOF; an error aborts the line, not the loop.
fn run_prompt(session: &mut Session) -> Result<()> {
    let stdin = io::stdin();
    let mut line = String::new();

    loop {
        print!("> ");
        io::stdout().flush().context("Failed to flush prompt")?;

        line.clear();
        let read = stdin
            .lock()
            .read_line(&mut line)
            .context("Failed to read from stdin")?;

        if read == 0 {
            info!("REPL reached end of input");
            println!();
            return Ok(());
        }

        if let Err(e) = session.run(&line) {
            debug!("REPL line failed: {}", e);
            eprintln!("{}", e);
        }
    }
}

fn main() -> Result<()> {
    let args: Cli = match Cli::try_parse() {
        Ok(args) => args,
        Err(e) if e.use_stderr() => {
            e.print().ok();
            std::process::exit(EXIT_USAGE);
        }
        Err(e) => e.exit(),
    };

    if args.log {
        init_logger()?;
    } else {
        env_logger::Builder::new()
            .filter_level(log::LevelFilter::Off)
            .init();
    }

    info!("CLI arguments: {:?}", args);

    let mut session = Session::new(args.backend);
    session.set_dumps(DumpOptions {
        tokens: args.tokens,
        ast: args.ast,
        disassemble: args.disassemble,
    });

    match args.file {
        Some(path) => run_file(&mut session, &path),
        None => run_prompt(&mut session),
    }
}
