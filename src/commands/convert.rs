use std::path::PathBuf;

use anyhow::{Context, Result};
use bookshelf_pipeline::config::{ConverterConfig, SingleSourceConfig};
use bookshelf_pipeline::converter;

pub async fn catalog(
    douban: PathBuf,
    goodreads: PathBuf,
    read: Option<PathBuf>,
    output: PathBuf,
) -> Result<()> {
    let config = ConverterConfig {
        douban_path: douban,
        goodreads_path: goodreads,
        read_list_path: read,
        output_path: output,
    };
    let summary = converter::convert_catalog(&config)
        .await
        .context("catalog conversion failed")?;

    println!(
        "Douban: {} books, Goodreads: {} books",
        summary.douban, summary.goodreads
    );
    println!("Written to {}", summary.output_path.display());
    Ok(())
}

pub async fn single(input: PathBuf, output: PathBuf) -> Result<()> {
    let config = SingleSourceConfig::new(input, output);
    let count = converter::convert_single(&config)
        .await
        .with_context(|| format!("failed to convert {}", config.input_path.display()))?;
    println!("{} books written to {}", count, config.output_path.display());
    Ok(())
}

pub async fn detailed(input: PathBuf, output: PathBuf) -> Result<()> {
    let config = SingleSourceConfig::new(input, output);
    let count = converter::convert_detailed(&config)
        .await
        .with_context(|| format!("failed to convert {}", config.input_path.display()))?;
    println!("{} books written to {}", count, config.output_path.display());
    Ok(())
}
