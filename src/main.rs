//! prolific-agent: infer coding activity from file metadata and publish
//! anonymized reports to a git repository.

use anyhow::Result;

mod cli;

fn main() -> Result<()> {
    cli::run()
}
