use anyhow::Result;
use runtime::SimulationSummary;

pub fn print(summary: &SimulationSummary, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(summary)?);
        return Ok(());
    }

    println!(
        "{} (seed {:?}) ended at t={:.2}s",
        summary.job, summary.seed, summary.end_time
    );
    println!(
        "potency {:.1} ({:.2}/s), pending {:.1}",
        summary.total_potency, summary.potency_per_second, summary.pending_potency
    );
    println!(
        "procs {}, interrupts {}, rng draws {}",
        summary.procs, summary.interrupts, summary.rng_draws
    );

    println!();
    println!(
        "{:<16} {:>5} {:>5} {:>5} {:>10} {:>8}",
        "skill", "casts", "hits", "ticks", "potency", "cost"
    );
    for (skill, totals) in &summary.skills {
        println!(
            "{:<16} {:>5} {:>5} {:>5} {:>10.1} {:>8.0}",
            skill,
            totals.captures,
            totals.hits,
            totals.ticks,
            totals.applied_potency,
            totals.cost_paid
        );
    }

    if !summary.recurring.is_empty() {
        println!();
        for (key, accounting) in &summary.recurring {
            println!(
                "{key}: {} applications, {} ticks, gap {:.2}s, overridden {:.2}s",
                accounting.applications,
                accounting.ticks,
                accounting.cumulative_gap,
                accounting.cumulative_override
            );
        }
    }

    for diagnostic in &summary.diagnostics {
        tracing::warn!(
            code = diagnostic.code,
            severity = diagnostic.severity,
            "{}",
            diagnostic.message
        );
    }
    Ok(())
}
