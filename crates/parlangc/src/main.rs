//! Parlang Translator Executable
//!
//! Command-line driver for the Parlang source-to-source translator. It reads
//! every input file named on the command line, runs the whole batch through
//! one translation (definitions in any file are visible to every file), and
//! writes each output next to its input.
//!
//! # File Naming
//!
//! Every input must carry a two-suffix extension of the form
//! `<name>.<hostlang>.parlang` — for example `raytracer.js.parlang`. The
//! output path is the input path with the outer `.parlang` stripped, so
//! `raytracer.js.parlang` translates to `raytracer.js`. Files are named
//! explicitly; no directories are traversed and stdin is not read.
//!
//! # Error Reporting
//!
//! The translator stops at the first error. Diagnostics are rendered with
//! `codespan-reporting` and lead with a `<file>:<line>: <message>` summary;
//! the process exits nonzero. Non-fatal macro-expander diagnostics are
//! reported through the logger as warnings.

use std::process::exit;

use libparlang::{
    error::{CodeSpanReportGenerator, ReportGenerator, PARLANG_LANG_EXT},
    file::SourceFile,
    nom_tools::State,
    translate,
};
use log::LevelFilter;
use simplelog::{ColorChoice, CombinedLogger, ConfigBuilder, LevelPadding, TermLogger, TerminalMode, ThreadLogMode};

/// Computes the output path for an input path
///
/// The input must end in `.parlang` and still carry an inner extension once
/// that suffix is stripped; the output is the input minus the outer suffix.
fn output_path_for(path: &str) -> Option<String> {
    let stem = path.strip_suffix(&format!(".{PARLANG_LANG_EXT}"))?;
    let name = stem.rsplit('/').next().unwrap_or(stem);
    let (base, inner_ext) = name.rsplit_once('.')?;
    if base.is_empty() || inner_ext.is_empty() {
        return None;
    }
    Some(stem.to_string())
}

/// Main entry point for the Parlang translator.
///
/// # Process Flow
///
/// 1. **Logging Setup**: warning-level terminal logging (macro-expander
///    diagnostics arrive through the logger)
/// 2. **Argument Processing**: validate every input path's extension
/// 3. **Reading**: load every input into memory
/// 4. **Translation**: run the whole batch through the pipeline
/// 5. **Writing**: one output file per input
///
/// Exits with status 1 on the first failure of any step.
fn main() {
    let config = ConfigBuilder::new()
        .set_location_level(LevelFilter::Error)
        .set_thread_mode(ThreadLogMode::Both)
        .set_level_padding(LevelPadding::Off)
        .set_thread_level(LevelFilter::Off)
        .build();
    CombinedLogger::init(vec![TermLogger::new(LevelFilter::Warn, config, TerminalMode::Mixed, ColorChoice::Auto)]).unwrap();

    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 {
        eprintln!("Usage: {} file1.js.{PARLANG_LANG_EXT} file2.js.{PARLANG_LANG_EXT} ...", args[0]);
        exit(1);
    }

    let mut states = Vec::new();
    let mut output_paths = Vec::new();
    for file_path in &args[1..] {
        let Some(output_path) = output_path_for(file_path) else {
            eprintln!("{file_path}: input files must end with a two-suffix extension '.<hostlang>.{PARLANG_LANG_EXT}'");
            exit(1);
        };

        let content = match std::fs::read_to_string(file_path) {
            Ok(content) => content,
            Err(error) => {
                eprintln!("Error reading file {file_path}: {error}");
                exit(1);
            }
        };

        let path = file_path.split('/').map(str::to_string).collect();
        states.push(State::new(SourceFile::new(path, content)));
        output_paths.push(output_path);
    }

    let outputs = match translate(&states) {
        Ok(outputs) => outputs,
        Err(error) => {
            CodeSpanReportGenerator::generate(&error);
            exit(1);
        }
    };

    for (output, output_path) in outputs.iter().zip(&output_paths) {
        if let Err(error) = std::fs::write(output_path, &output.text) {
            eprintln!("Error writing file {output_path}: {error}");
            exit(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::output_path_for;

    #[rstest]
    #[case("raytracer.js.parlang", Some("raytracer.js"))]
    #[case("demos/mandel.js.parlang", Some("demos/mandel.js"))]
    #[case("raytracer.js", None)]
    #[case("raytracer.parlang", None)]
    #[case(".parlang", None)]
    #[case("dir.with.dots/raytracer.ts.parlang", Some("dir.with.dots/raytracer.ts"))]
    fn output_paths(#[case] input: &str, #[case] expected: Option<&str>) {
        assert_eq!(output_path_for(input).as_deref(), expected);
    }
}
