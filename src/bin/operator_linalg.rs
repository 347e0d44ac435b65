//! Command-line front end for the operator routines.
//!
//! Each subcommand loads an operator from a Matrix Market coordinate file, runs one
//! routine on it, and writes the result as CSV:
//!
//! - `eigs`: eigenvalues (index, real part, imaginary part).
//! - `condest`: the one-norm and the estimated one-norm condition number.
//! - `expm`: the stored entries of the matrix exponential as triplets.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use operator_linalg::{
    EigenOptions, Operator, SortOrder, eigen::DEFAULT_MAX_ITER, estimate_condition,
    norms::one_norm, utils::data_loader::load_matrix_market,
};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Output ordering of the `eigs` subcommand.
#[derive(ValueEnum, Clone, Debug, Copy)]
enum Sort {
    /// Ascending; partial requests return the smallest eigenvalues.
    Low,
    /// Descending; partial requests return the largest eigenvalues.
    High,
}

impl From<Sort> for SortOrder {
    fn from(sort: Sort) -> Self {
        match sort {
            Sort::Low => SortOrder::Low,
            Sort::High => SortOrder::High,
        }
    }
}

/// Command-line arguments for the operator routines.
#[derive(Parser, Debug)]
#[clap(
    name = "operator-linalg",
    about = "Eigenvalues, condition estimates and matrix exponentials of Matrix Market operators."
)]
struct Cli {
    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Computes eigenvalues.
    Eigs(EigsArgs),
    /// Estimates the one-norm condition number.
    Condest(IoArgs),
    /// Computes the matrix exponential.
    Expm(IoArgs),
}

/// Input and output paths shared by every subcommand.
#[derive(Args, Debug)]
struct IoArgs {
    /// Path to the Matrix Market (.mtx) file holding the operator.
    #[clap(long, value_name = "PATH")]
    input: PathBuf,

    /// Path to the output CSV file where results will be written.
    #[clap(long, value_name = "PATH")]
    output: PathBuf,
}

#[derive(Args, Debug)]
struct EigsArgs {
    #[clap(flatten)]
    io: IoArgs,

    /// Number of eigenvalues; 0 computes all of them.
    #[clap(long, default_value_t = 0)]
    count: usize,

    /// Output ordering.
    #[clap(long, value_enum, default_value_t = Sort::Low)]
    sort: Sort,

    /// Use the iterative sparse solvers instead of dense decompositions.
    #[clap(long)]
    sparse: bool,

    /// Convergence tolerance of the sparse solvers; 0 selects machine precision.
    #[clap(long, default_value_t = 0.0)]
    tol: f64,

    /// Operator application budget of the sparse solvers.
    #[clap(long, default_value_t = DEFAULT_MAX_ITER)]
    max_iter: usize,
}

/// A single eigenvalue row.
#[derive(Debug, Serialize)]
struct EigenvalueRecord {
    index: usize,
    real: f64,
    imag: f64,
}

/// The single row written by `condest`.
#[derive(Debug, Serialize)]
struct ConditionRecord {
    rows: usize,
    cols: usize,
    one_norm: f64,
    condition_estimate: f64,
}

/// One stored entry of the exponential.
#[derive(Debug, Serialize)]
struct EntryRecord {
    row: usize,
    col: usize,
    real: f64,
    imag: f64,
}

fn load(path: &Path) -> Result<Operator> {
    log::info!("Loading operator from {:?}...", path);
    let op = load_matrix_market(path)
        .with_context(|| format!("Failed to load Matrix Market file {path:?}"))?;
    log::info!(
        "Loaded {}x{} {} operator (hermitian: {}).",
        op.nrows(),
        op.ncols(),
        op.kind(),
        op.isherm()
    );
    Ok(op)
}

fn write_records<R: Serialize>(path: &Path, records: impl IntoIterator<Item = R>) -> Result<()> {
    log::info!("Writing results to {:?}...", path);
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create output file {path:?}"))?;
    for record in records {
        writer.serialize(record)?;
    }
    writer.flush()?;
    Ok(())
}

fn run_eigs(args: &EigsArgs) -> Result<()> {
    let op = load(&args.io.input)?;
    let opts = EigenOptions {
        vectors: false,
        sparse: args.sparse,
        sort: args.sort.into(),
        count: args.count,
        tol: args.tol,
        max_iter: args.max_iter,
    };
    let values = operator_linalg::eigenvalues(&op, &opts)?.to_complex();
    log::info!("Computed {} eigenvalues.", values.len());
    write_records(
        &args.io.output,
        values.iter().enumerate().map(|(index, z)| EigenvalueRecord {
            index,
            real: z.re,
            imag: z.im,
        }),
    )
}

fn run_condest(args: &IoArgs) -> Result<()> {
    let op = load(&args.input)?;
    let record = ConditionRecord {
        rows: op.nrows(),
        cols: op.ncols(),
        one_norm: one_norm(&op),
        condition_estimate: estimate_condition(&op)?,
    };
    log::info!("Condition estimate: {:e}", record.condition_estimate);
    write_records(&args.output, [record])
}

fn run_expm(args: &IoArgs) -> Result<()> {
    let op = load(&args.input)?;
    let f = operator_linalg::matrix_exponential(&op)?;
    log::info!("Exponential has {} stored entries.", f.as_ref().compute_nnz());
    write_records(
        &args.output,
        f.as_ref().triplet_iter().map(|t| EntryRecord {
            row: t.row,
            col: t.col,
            real: t.val.re,
            imag: t.val.im,
        }),
    )
}

/// The main entry point of the command-line tool.
fn main() -> Result<()> {
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Info)
        .try_init()?;
    let cli = Cli::parse();

    match &cli.command {
        Command::Eigs(args) => run_eigs(args)?,
        Command::Condest(args) => run_condest(args)?,
        Command::Expm(args) => run_expm(args)?,
    }

    log::info!("Done.");
    Ok(())
}
