use anyhow::Result;

use crate::cli::ContentArgs;
use crate::content::Content;

pub fn execute(args: ContentArgs) -> Result<()> {
    let content = Content::load(&args)?;
    content.config.validate(&content.job)?;

    println!(
        "{}: {} resources, {} cooldowns, {} skills; config ok",
        content.job.name,
        content.job.resources.len(),
        content.job.cooldowns.len(),
        content.job.skills.len()
    );
    Ok(())
}
