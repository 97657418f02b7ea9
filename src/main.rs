use ACME::{
    Args, Balancer, DatasetOptions, Degrader, load_compositions, load_degradation_kwargs, make_dataset,
    warn_unused_kwargs,
};
use anyhow::{Result, bail};
use clap::Parser;
use log::{debug, info};

fn main() -> Result<()> {
    let args = Args::parse();
    let filter = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(filter)).init();

    if args.csv_dirs.is_empty() && args.midi_dirs.is_empty() {
        bail!("No input given..! Pass at least one of --csv-dirs or --midi-dirs.");
    }

    let kinds = args.degradation_kinds();
    let params = load_degradation_kwargs(
        args.degradation_kwargs.as_deref(),
        args.degradation_kwarg_json.as_deref(),
    )?;
    warn_unused_kwargs(&params, &kinds);
    debug!("Degradation parameters: {:?}", params);

    let mut balancer = Balancer::new(&kinds, args.degradation_dist.as_deref(), args.clean_prop)?;
    let mut degrader = match args.seed {
        Some(seed) => Degrader::seeded(seed),
        None => Degrader::from_entropy(),
    }
    .with_sort(!args.no_sort)
    .with_forbid_overlaps(args.forbid_overlaps);

    let options = DatasetOptions {
        excerpt_length: args.excerpt_length,
        min_notes: args.min_notes,
        splits: args.splits.as_slice().try_into()?,
    };

    let mut compositions = load_compositions(&args.csv_dirs, &args.midi_dirs)?;
    info!("Making dataset at '{}'...", args.output_dir.display());

    let summary = make_dataset(
        &mut compositions,
        &args.output_dir,
        &mut balancer,
        &mut degrader,
        &params,
        &options,
    )?;

    info!(
        "Finished! Wrote {} excerpts and skipped {} pieces..!",
        summary.written, summary.skipped
    );
    for (label, count) in &summary.counts {
        info!("{}: {}", label, count);
    }
    info!(
        "Excerpts are under '{}' in clean/ and altered/, with labels and splits in metadata.csv and label names in labels.csv..!",
        args.output_dir.display()
    );

    Ok(())
}
