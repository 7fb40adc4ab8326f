/*
** This file is a part of Xmlwrap (XML parsing and XSLT bridge)
** Copyright (C) 2025 Gurer Ozen
**
** Xmlwrap is free software: you can redistribute it and/or modify it
** under the terms of the GNU Lesser General Public License as
** published by the Free Software Foundation, either version 3 of
** the License, or (at your option) any later version.
*/

use std::io::Read;
use std::io::stdin;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use xmlwrap::ParseError;
use xmlwrap::ParserConfig;
use xmlwrap::TreeParser;

/// Checks the well-formedness of XML documents.
#[derive(Parser, Debug)]
#[command(name = "xwlint", version)]
struct Args {
    /// Drop ignorable whitespace instead of keeping it as text
    #[arg(short = 'b', long = "drop-blanks")]
    drop_blanks: bool,

    /// Print element and text node counts of each document
    #[arg(short = 's', long = "stat")]
    stat: bool,

    /// Files to check, standard input if none is given
    #[arg(value_name = "FILE.xml")]
    files: Vec<PathBuf>,
}

struct Linter {
    config: ParserConfig,
    stat: bool,
}

impl Linter {
    fn parse(&self, file: Option<&PathBuf>) -> Result<TreeParser, ParseError> {
        match file {
            Some(path) => TreeParser::parse_file(path, &self.config),
            None => {
                let mut data = Vec::new();
                if let Err(err) = stdin().read_to_end(&mut data) {
                    return Err(ParseError::SourceUnavailable(format!("failed to read stdin: {}", err)));
                }
                TreeParser::parse_bytes(&data, &self.config)
            }
        }
    }

    fn lint_file(&self, file: Option<&PathBuf>) -> bool {
        let name = file.map_or_else(|| "stdin".to_string(), |path| path.display().to_string());
        let parser = match self.parse(file) {
            Ok(parser) => parser,
            Err(err) => {
                eprintln!("Error in '{}': {}", name, err);
                return false;
            }
        };
        if parser.failed() {
            eprintln!("Error in '{}': {}", name, parser.error_message());
            return false;
        }
        if parser.had_warnings() {
            println!("{}: warnings seen", name);
        }
        if self.stat {
            if let Some(doc) = parser.document() {
                let tree = doc.tree();
                let nodes = tree.descendant_or_self(tree.root());
                let (elements, texts) = nodes.fold((0, 0), |(elements, texts), id| {
                    (
                        elements + usize::from(tree.is_element(id)),
                        texts + usize::from(tree.is_text(id)),
                    )
                });
                println!("{}: {} elements, {} text nodes", name, elements, texts);
            }
        }
        true
    }
}

fn main() -> ExitCode {
    env_logger::init();
    let args = Args::parse();

    // Failures are inspected here rather than raised.
    let config = ParserConfig::default()
        .with_keep_blanks(!args.drop_blanks)
        .with_raise_on_error(false);
    let linter = Linter {
        config,
        stat: args.stat,
    };

    if args.files.is_empty() {
        if !linter.lint_file(None) {
            return ExitCode::FAILURE;
        }
    } else {
        for file in &args.files {
            if !linter.lint_file(Some(file)) {
                return ExitCode::FAILURE;
            }
        }
    }

    ExitCode::SUCCESS
}
