/*
** This file is a part of Xmlwrap (XML parsing and XSLT bridge)
** Copyright (C) 2025 Gurer Ozen
**
** Xmlwrap is free software: you can redistribute it and/or modify it
** under the terms of the GNU Lesser General Public License as
** published by the Free Software Foundation, either version 3 of
** the License, or (at your option) any later version.
*/

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use xmlwrap::DocumentError;
use xmlwrap::ParamSet;
use xmlwrap::ParseError;
use xmlwrap::ParserConfig;
use xmlwrap::Stylesheet;
use xmlwrap::StylesheetError;
use xmlwrap::TreeParser;

/// Applies an XSLT stylesheet to an XML document.
#[derive(Parser, Debug)]
#[command(name = "xwproc", version)]
struct Args {
    /// Pass a parameter as an XPath expression
    #[arg(short = 'p', long = "param", num_args = 2, value_names = ["NAME", "EXPRESSION"])]
    params: Vec<String>,

    /// Pass a parameter as a literal string
    #[arg(long = "stringparam", num_args = 2, value_names = ["NAME", "VALUE"])]
    string_params: Vec<String>,

    /// Write the result to a file instead of standard output
    #[arg(short = 'o', long = "output", value_name = "FILE")]
    output: Option<PathBuf>,

    /// The stylesheet
    #[arg(value_name = "STYLESHEET.xsl")]
    stylesheet: PathBuf,

    /// The document to transform
    #[arg(value_name = "FILE.xml")]
    file: PathBuf,
}

#[derive(Debug, thiserror::Error)]
enum XwprocError {
    #[error("{0}")]
    Stylesheet(#[from] StylesheetError),

    #[error("{0}")]
    Input(#[from] ParseError),

    #[error("{0}")]
    Output(#[from] DocumentError),

    #[error("string parameter {0} contains both quote characters")]
    Unquotable(String),
}

// Wraps a value into an XPath string literal.
fn quote(name: &str, value: &str) -> Result<String, XwprocError> {
    if !value.contains('\'') {
        Ok(format!("'{}'", value))
    } else if !value.contains('"') {
        Ok(format!("\"{}\"", value))
    } else {
        Err(XwprocError::Unquotable(name.to_string()))
    }
}

fn collect_params(args: &Args) -> Result<ParamSet, XwprocError> {
    let mut params = ParamSet::new();
    for pair in args.params.chunks_exact(2) {
        params.entry(pair[0].clone()).or_insert_with(|| pair[1].clone());
    }
    for pair in args.string_params.chunks_exact(2) {
        let value = quote(&pair[0], &pair[1])?;
        params.entry(pair[0].clone()).or_insert(value);
    }
    Ok(params)
}

fn process(args: &Args) -> Result<(), XwprocError> {
    let params = collect_params(args)?;
    let mut stylesheet = Stylesheet::from_file(&args.stylesheet)?;
    let input = TreeParser::parse_file(&args.file, &ParserConfig::default())?.into_document()?;
    let result = stylesheet.apply_with_params(&input, &params)?;
    match &args.output {
        Some(path) => result.save_to_file(path)?,
        None => print!("{}", result.save_to_string()),
    }
    Ok(())
}

fn main() -> ExitCode {
    env_logger::init();
    let args = Args::parse();

    match process(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {}", err);
            ExitCode::FAILURE
        }
    }
}
