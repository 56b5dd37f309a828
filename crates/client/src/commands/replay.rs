use std::time::Duration;

use anyhow::{Context, Result};
use runtime::{
    ActionRecord, Driver, DriverConfig, FileRecordRepository, RecordRepository, ScriptedSource,
    Simulation,
};

use crate::cli::ReplayArgs;
use crate::content::Content;
use crate::report;

const POLL_INTERVAL: Duration = Duration::from_millis(20);

pub async fn execute(args: ReplayArgs) -> Result<()> {
    let content = Content::load(&args.content)?;
    let record = load_record(&args)?;
    if args.content.config.is_some() {
        tracing::warn!("Replay uses the config stored in the record; --config is ignored");
    }

    let sim = content.builder(record.config.clone()).build()?;
    let mut sim = match args.mode.tick_mode() {
        None => {
            let mut sim = sim;
            sim.replay(&record)?;
            sim
        }
        Some(mode) => drive(sim, &record, mode, args.speed).await?,
    };
    sim.run_until_settled(args.output.settle);

    report::print(&sim.summary(), args.output.json)
}

fn load_record(args: &ReplayArgs) -> Result<ActionRecord> {
    let record = match (&args.file, &args.name) {
        (Some(path), _) => FileRecordRepository::read_path(path)?,
        (None, Some(name)) => FileRecordRepository::new(&args.records.records_dir)?
            .load(name)?
            .with_context(|| format!("no record named '{name}'"))?,
        (None, None) => anyhow::bail!("either --name or --file is required"),
    };
    tracing::info!(job = %record.job, entries = record.len(), "record loaded");
    Ok(record)
}

/// Plays `record` through a real-time driver and returns the simulation.
async fn drive(
    sim: Simulation,
    record: &ActionRecord,
    mode: runtime::TickMode,
    speed: f64,
) -> Result<Simulation> {
    if record.job != sim.state().job().name {
        return Err(runtime::RuntimeError::JobMismatch {
            expected: record.job.clone(),
            actual: sim.state().job().name.clone(),
        }
        .into());
    }

    let driver = Driver::spawn(
        sim,
        DriverConfig {
            mode,
            speed,
            ..DriverConfig::default()
        },
    );
    let mut source = ScriptedSource::new(record);
    let played = driver.handle().play(&mut source, POLL_INTERVAL).await;
    let sim = driver.shutdown().await?;
    tracing::info!(requests = played?, time = sim.now(), "real-time replay finished");
    Ok(sim)
}
