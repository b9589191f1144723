mod config;
mod parse;

use std::path::{Path, PathBuf};

use clap::Parser;
use comb_check::{decode_witnesses_from_bits, infer, typecheck, LocatedError};
use comb_dag::{ConcreteTys, CorePrim, Dag, RawDag};
use comb_ty::{Arrow, BitIter, FinalTy};
use miette::{Diagnostic, IntoDiagnostic};
use thiserror::Error;

use crate::config::CombConfig;

#[derive(Parser, Debug)]
#[command(author, version, about = "Infer and check combinator DAG programs")]
struct Cli {
    /// Program to check, one node per line
    file_path: PathBuf,

    /// Declared input type of the root, e.g. `1` or `(2^8 * 2^8)`
    #[arg(long)]
    source: Option<String>,

    /// Declared output type of the root
    #[arg(long)]
    target: Option<String>,

    /// Packed witness bits as hex
    #[arg(long = "witness", value_name = "HEX")]
    witness_hex: Option<String>,

    /// comb.toml to use instead of searching upwards from the program
    #[arg(long)]
    config: Option<PathBuf>,

    /// Stop after inference and print the annotated program
    #[arg(long)]
    infer_only: bool,
}

#[derive(Debug, Error, Diagnostic)]
enum CliError {
    #[error("--source and --target must be given together")]
    #[diagnostic(
        code(comb::cli::arrow),
        help("set both, or neither to check against the inferred type")
    )]
    PartialArrow,

    #[error("witness is not valid hex: {0:?}")]
    #[diagnostic(code(comb::cli::hex))]
    Hex(String),
}

/// Inputs after merging flags over `comb.toml`.
#[derive(Debug, Default)]
struct Request {
    arrow: Option<Arrow>,
    witness: Vec<u8>,
    infer_only: bool,
}

fn main() -> miette::Result<()> {
    env_logger::init();

    let args = Cli::parse();

    let config = match &args.config {
        Some(path) => config::load_config(path)?,
        None => {
            let start = args.file_path.parent().unwrap_or(Path::new("."));
            let start = std::fs::canonicalize(start).unwrap_or_else(|_| start.to_path_buf());
            match config::find_config(&start) {
                Some(path) => config::load_config(&path)?,
                None => CombConfig::default(),
            }
        }
    };

    let arrow = match (args.source.or(config.source), args.target.or(config.target)) {
        (Some(source), Some(target)) => Some(Arrow::new(
            parse::parse_ty(&source)?,
            parse::parse_ty(&target)?,
        )),
        (None, None) => None,
        _ => return Err(CliError::PartialArrow.into()),
    };
    let witness = decode_hex(args.witness_hex.or(config.witness_hex).as_deref().unwrap_or(""))?;

    let text = std::fs::read_to_string(&args.file_path).into_diagnostic()?;
    let dag = parse::parse_program(&text)?;

    let request = Request {
        arrow,
        witness,
        infer_only: args.infer_only,
    };
    print!("{}", run(dag, &request)?);

    Ok(())
}

fn run(dag: RawDag<CorePrim, ()>, request: &Request) -> Result<String, LocatedError> {
    let typed = infer(dag, request.arrow.as_ref())?;
    let mut out = render_typed(&typed);
    if request.infer_only {
        return Ok(out);
    }

    let Some(root) = typed.len().checked_sub(1) else {
        return Err(LocatedError::empty_dag());
    };
    let arrow = match &request.arrow {
        Some(arrow) => arrow.clone(),
        None => typed[root]
            .arrow(&mut ConcreteTys)
            .map_err(|e| LocatedError::at(root, e))?,
    };

    let mut bits = BitIter::new(&request.witness);
    let decoded = decode_witnesses_from_bits(typed, &mut bits)?;
    let expr = typecheck(&decoded, &arrow)?;
    out.push_str(&format!("ok: {}\n", expr.arrow()));
    Ok(out)
}

/// One line per node: position, node, and the arrow its annotations give.
fn render_typed<W>(dag: &Dag<CorePrim, FinalTy, W>) -> String {
    let mut out = String::new();
    for (pos, node) in dag.iter().enumerate() {
        let arrow = match node.arrow(&mut ConcreteTys) {
            Ok(arrow) => arrow.to_string(),
            Err(_) => "-".to_string(),
        };
        out.push_str(&format!("{pos}: {node} : {arrow}\n"));
    }
    out
}

fn decode_hex(hex: &str) -> Result<Vec<u8>, CliError> {
    let hex = hex.trim();
    if !hex.is_ascii() || hex.len() % 2 != 0 {
        return Err(CliError::Hex(hex.to_string()));
    }
    (0..hex.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| CliError::Hex(hex.to_string())))
        .collect()
}

#[cfg(test)]
mod tests {
    use comb_check::CheckError;
    use indoc::indoc;

    use super::*;
    use crate::parse::{parse_program, parse_ty};

    const TRUE_CONSTANT: &str = indoc! {"
        unit
        injr 1
        iden
        comp 2 1
    "};

    fn request(source: &str, target: &str) -> Request {
        Request {
            arrow: Some(Arrow::new(parse_ty(source).unwrap(), parse_ty(target).unwrap())),
            ..Request::default()
        }
    }

    #[test]
    fn renders_inferred_program() {
        let dag = parse_program(TRUE_CONSTANT).unwrap();
        let out = run(
            dag,
            &Request {
                infer_only: true,
                ..request("1", "2")
            },
        )
        .unwrap();
        assert_eq!(
            out,
            indoc! {"
                0: unit : 1 -> 1
                1: injr 1 : 1 -> 2
                2: iden : 2 -> 2
                3: comp 2 1 : 1 -> 2
            "}
        );
    }

    #[test]
    fn checks_against_declared_arrow() {
        let dag = parse_program(TRUE_CONSTANT).unwrap();
        let out = run(dag, &request("1", "2")).unwrap();
        assert!(out.ends_with("ok: 1 -> 2\n"));
    }

    #[test]
    fn checks_against_inferred_arrow() {
        let dag = parse_program("iden\n").unwrap();
        let out = run(dag, &Request::default()).unwrap();
        assert_eq!(out, "0: iden : 1 -> 1\nok: 1 -> 1\n");
    }

    #[test]
    fn adder_reads_witness() {
        let dag = parse_program(indoc! {"
            witness
            witness
            pair 2 1
            prim add8
            comp 2 1
        "})
        .unwrap();
        let out = run(
            dag,
            &Request {
                witness: decode_hex("8090").unwrap(),
                ..request("1", "(2 * 2^8)")
            },
        )
        .unwrap();
        assert!(out.ends_with("ok: 1 -> (2 × 2^8)\n"));
    }

    #[test]
    fn reports_failing_node() {
        let dag = parse_program("unit\ninjl 2\n").unwrap();
        let err = run(dag, &Request::default()).unwrap_err();
        assert_eq!(err.at_node, Some(1));
        assert_eq!(err.error, CheckError::IndexOutOfRange { offset: 2 });
        assert_eq!(err.to_string(), "node 1: child offset 2 does not point at an earlier node");
    }

    #[test]
    fn hidden_root_has_no_arrow() {
        let dag = parse_program(&format!("hidden {}\n", "00".repeat(32))).unwrap();
        let out = run(
            dag,
            &Request {
                infer_only: true,
                ..Request::default()
            },
        )
        .unwrap();
        assert_eq!(out, format!("0: hidden {} : -\n", "00".repeat(32)));
    }

    #[test]
    fn hex_decoding() {
        assert_eq!(decode_hex("00ff10").unwrap(), vec![0x00, 0xff, 0x10]);
        assert_eq!(decode_hex("").unwrap(), Vec::<u8>::new());
        assert!(decode_hex("abc").is_err());
        assert!(decode_hex("zz").is_err());
    }
}
