// Pepasm - Symbol resolution and linkage core for a two-unit Pep/10 assembler
// Copyright (C) 2026  Marcel Joachim Kloubert <marcel@kloubert.dev>
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

//! Pepasm CLI
//!
//! Assembles a Pep/10 operating system and an optional user program and
//! reports every problem found in either of them.

use ariadne::{Label, Report, ReportKind, Source};
use clap::Parser;
use log::LevelFilter;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use pepasm::driver::{AsmDriver, Assembly, DriverConfig, UnitKind};
use pepasm::error::{format_error, AsmError, Message, Severity};
use pepasm::format::format_source;
use pepasm::passes::object_size;

/// Pepasm - A Pep/10 assembler core
#[derive(Parser, Debug)]
#[command(name = "pepasm")]
#[command(author = "Pepasm Team")]
#[command(version)]
#[command(about = "Resolve, expand and link a Pep/10 operating system and user program")]
#[command(long_about = r#"
Pepasm parses a Pep/10 operating system and, optionally, a user program,
expands their macros, groups them into sections, assigns addresses and
links the user program's imports against the operating system's exports.

Every problem in either unit is reported; nothing is written on failure.

Example usage:
  pepasm os.pep
  pepasm os.pep --user hello.pep --symbols
  pepasm os.pep --user hello.pep --macro-dir ./macros --source
"#)]
struct Cli {
    /// Operating system source file (.pep)
    os_file: PathBuf,

    /// User program source file (.pep)
    #[arg(short, long)]
    user: Option<PathBuf>,

    /// Directory of additional macro definitions (.pepm), may be repeated
    #[arg(short, long = "macro-dir")]
    macro_dir: Vec<PathBuf>,

    /// Print the symbol table of each unit
    #[arg(long)]
    symbols: bool,

    /// Print the macro-expanded source of each unit
    #[arg(long)]
    source: bool,

    /// Do not report undefined symbols in the user program
    #[arg(long)]
    ignore_undefined: bool,

    /// Report errors as plain text instead of annotated snippets
    #[arg(long)]
    plain: bool,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

/// A unit's source as read from disk.
struct Input {
    name: String,
    text: String,
}

impl Input {
    fn read(path: &Path) -> Result<Self, String> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| format!("Cannot read {}: {}", path.display(), e))?;
        let name = path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("<input>")
            .to_string();
        Ok(Self { name, text })
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    };
    env_logger::Builder::new()
        .filter_level(level)
        .format_timestamp(None)
        .parse_default_env()
        .init();

    if cli.verbose {
        println!("Pepasm Assembler v{}", pepasm::VERSION);
        println!("Operating system: {}", cli.os_file.display());
        if let Some(user) = &cli.user {
            println!("User program: {}", user.display());
        }
        println!();
    }

    let os = match Input::read(&cli.os_file) {
        Ok(input) => input,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::from(3);
        }
    };
    let user = match cli.user.as_deref().map(Input::read).transpose() {
        Ok(input) => input,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::from(3);
        }
    };

    let mut config = DriverConfig::default();
    config.user_features.ignore_undefined_symbols = cli.ignore_undefined;
    let mut driver = AsmDriver::new(config);

    for dir in &cli.macro_dir {
        match driver.load_macro_directory(dir) {
            Ok(count) => {
                if cli.verbose {
                    println!("Loaded {} macro(s) from {}", count, dir.display());
                }
            }
            Err(e) => {
                eprintln!("Error: Cannot load macros from {}: {}", dir.display(), e);
                return ExitCode::from(3);
            }
        }
    }

    let assembly = driver.assemble(&os.text, user.as_ref().map(|u| u.text.as_str()));

    let mut failed = report(&os, &assembly.os_errors(), cli.plain);
    if let Some(user) = &user {
        failed |= report(user, &assembly.user_errors(), cli.plain);
    }

    if cli.source {
        print_source(&assembly, UnitKind::Os, &os.name);
        if let Some(user) = &user {
            print_source(&assembly, UnitKind::User, &user.name);
        }
    }
    if cli.symbols {
        print_symbols(&assembly, UnitKind::Os, &os.name);
        if let Some(user) = &user {
            print_symbols(&assembly, UnitKind::User, &user.name);
        }
    }

    if failed {
        return ExitCode::from(1);
    }

    let mut summary = vec![format!("{} ({} bytes)", os.name, object_size(&assembly.os.ast, assembly.os.root()))];
    if let (Some(input), Some(unit)) = (&user, &assembly.user) {
        summary.push(format!("{} ({} bytes)", input.name, object_size(&unit.ast, unit.root())));
    }
    println!("Assembled {}", summary.join(", "));

    if cli.verbose && !assembly.call_via_return.is_empty() {
        let sites: Vec<String> = assembly
            .call_via_return
            .iter()
            .map(|addr| format!("0x{:04X}", addr))
            .collect();
        println!("Call-via-return sites: {}", sites.join(", "));
    }

    ExitCode::SUCCESS
}

/// Print a unit's diagnostics. Returns whether any of them is fatal.
fn report(input: &Input, errors: &[(usize, Message)], plain: bool) -> bool {
    for (line, message) in errors {
        if plain {
            let error = AsmError::at_line(*line, message);
            eprint!("{}", format_error(&error, &input.text, Some(&input.name)));
        } else {
            print_report(input, *line, message);
        }
    }
    errors.iter().any(|(_, message)| message.is_fatal())
}

fn print_report(input: &Input, line: usize, message: &Message) {
    let span = line_span(&input.text, line);
    let kind = match message.severity {
        Severity::Fatal => ReportKind::Error,
        Severity::Warning => ReportKind::Warning,
    };
    let result = Report::build(kind, input.name.clone(), span.start)
        .with_code(message.code.code())
        .with_message(&message.message)
        .with_label(Label::new((input.name.clone(), span)).with_message("here"))
        .finish()
        .eprint((input.name.clone(), Source::from(input.text.as_str())));
    if let Err(e) = result {
        eprintln!("Error: Cannot print diagnostic: {}", e);
    }
}

/// Character range of a 0-indexed line, without its line break.
fn line_span(text: &str, line: usize) -> std::ops::Range<usize> {
    let mut start = 0;
    for (index, content) in text.split('\n').enumerate() {
        let len = content.trim_end_matches('\r').chars().count();
        if index == line {
            return start..start + len;
        }
        start += content.chars().count() + 1;
    }
    start..start
}

fn print_source(assembly: &Assembly, kind: UnitKind, name: &str) {
    let Some(unit) = assembly.unit(kind) else {
        return;
    };
    println!("; {} ({})", name, kind);
    for line in format_source(&unit.ast, unit.root()) {
        println!("{}", line);
    }
    println!();
}

fn print_symbols(assembly: &Assembly, kind: UnitKind, name: &str) {
    let Some(listing) = assembly.symbol_listing(kind) else {
        return;
    };
    println!("Symbols of {} ({}):", name, kind);
    print!("{}", listing);
    println!();
}
