//! Parses a json file with a demo grammar and dumps the concrete syntax
//! tree. Useful for eyeballing hidden-token attachment and span layout.

use std::env::args;
use std::path::PathBuf;
use std::str::FromStr;

use parsnip::{at_least_one, chars, d, lit, many, many_sep, opt, s, Grammar};

fn build_grammar() -> Grammar {
    let mut g = Grammar::new();
    g.terminal("WS").ignore().is(at_least_one(s()));
    g.terminal("COMMENT")
        .hide()
        .is(lit("/*") >> lit("*/"));

    g.terminal("STRING")
        .is(lit("\"") + many(!chars("\"")) + lit("\""));

    let number = opt(lit("-"))
        + (lit("0") | chars("1-9") + many(d()))
        + opt(lit(".") + at_least_one(d()))
        + opt(lit("e").ci() + opt(chars("-+")) + at_least_one(d()));
    g.terminal("Number").is(number);

    let pair = g.call("STRING") + lit(":") + g.call("Value");
    g.datatype("Pair").is(pair);

    let object = lit("{") + many_sep(lit(","), g.call("Pair")) + lit("}");
    g.datatype("Object").is(object);

    let array = lit("[") + many_sep(lit(","), g.call("Value")) + lit("]");
    g.datatype("Array").is(array);

    let value = g.call("STRING")
        | g.call("Number")
        | g.call("Object")
        | g.call("Array")
        | lit("true")
        | lit("false")
        | lit("null");
    g.datatype("Value").is(value);

    g
}

fn load_from_file() -> Option<(String, PathBuf)> {
    if let Some(file) = args().nth(1) {
        let path = PathBuf::from(file);
        if path.is_file() {
            let contents = std::fs::read(&path).unwrap();
            let string = String::from_utf8(contents)
                .map_err(|e| e.utf8_error())
                .unwrap();
            return Some((string, path));
        } else {
            eprintln!("'{}' is not a file", path.display());
        }
    }
    eprintln!("No file provided");
    None
}

fn main() {
    let level = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_owned());
    let level = log::LevelFilter::from_str(&level).unwrap();

    simplelog::TermLogger::init(
        level,
        simplelog::ConfigBuilder::new()
            .set_time_format_custom(&[])
            .build(),
        simplelog::TerminalMode::Stderr,
        simplelog::ColorChoice::Never,
    )
    .unwrap();

    let Some((src, path)) = load_from_file() else {
        std::process::exit(1);
    };

    let grammar = build_grammar();

    let start = std::time::Instant::now();
    let result = grammar.parse("Value", &src);
    let elapsed = start.elapsed();

    eprintln!(
        "{}: parsed {} / {} bytes in {elapsed:.2?}",
        path.display(),
        result.len,
        src.len()
    );
    if !result.full_match {
        eprintln!("warning: input was not fully consumed");
    }

    print!("{}", result.root.pretty(&grammar));
}
