use anyhow::{bail, Context, Result};
use bionj::{Algorithm, NeighbourJoining, NjConfig};
use clap::Parser;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::time::Instant;

#[derive(Parser)]
#[command(name = "bionj")]
#[command(version)]
#[command(about = "Distance-based phylogenetic tree construction (NJ, BIONJ, rapid BIONJ)", long_about = None)]
struct Cli {
    /// Input pairwise distance matrix file
    #[arg(short, long)]
    input: PathBuf,
    /// Output Newick tree file
    #[arg(short, long)]
    out: PathBuf,
    /// Joining algorithm: nj, bionj or rapid
    #[arg(short, long, default_value = "bionj")]
    algorithm: String,
    /// Worker threads for the parallel passes (0 = one per core)
    #[cfg(feature = "parallel")]
    #[arg(short = 'n', long, default_value_t = 0)]
    num_threads: usize,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let algorithm = match cli.algorithm.as_str() {
        "nj" => Algorithm::Classic,
        "bionj" => Algorithm::Bionj,
        "rapid" => Algorithm::RapidBionj,
        other => bail!("unknown algorithm \"{other}\", expected nj, bionj or rapid"),
    };

    #[cfg(feature = "parallel")]
    if cli.num_threads > 0 {
        rayon::ThreadPoolBuilder::new()
            .num_threads(cli.num_threads)
            .build_global()
            .context("failed to size the worker thread pool")?;
    }

    let input = bionj::read_distance_file::<f64, _>(&cli.input)
        .with_context(|| format!("failed to read {}", cli.input.display()))?;

    let config = NjConfig::builder().algorithm(algorithm).build();
    let builder = NeighbourJoining::new(&input.names, &input.distances, config);

    let join_start = Instant::now();
    #[cfg(feature = "parallel")]
    let tree = builder.build_tree_par()?;
    #[cfg(not(feature = "parallel"))]
    let tree = builder.build_tree()?;
    println!(
        "Joined {} taxa in {:.6} s",
        input.names.len(),
        join_start.elapsed().as_secs_f64()
    );

    let file = File::create(&cli.out)
        .with_context(|| format!("failed to create {}", cli.out.display()))?;
    let mut writer = BufWriter::new(file);
    tree.write_newick(&mut writer)?;
    writer.flush()?;
    println!("Wrote {}", cli.out.display());
    Ok(())
}
