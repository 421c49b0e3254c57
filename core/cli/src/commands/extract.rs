use std::path::Path;

use anyhow::{Context, Result};
use car_extract::car::{CarBlockstore, CarWriter};
use car_extract::{Extractor, LogicalPath};
use futures::TryStreamExt;
use tokio::io::AsyncWrite;
use tracing::info;

use crate::config::Config;
use crate::utils::ensure_parent_exist;

pub async fn exec(config: Config, path: &str, car: &Path, output: Option<&Path>) -> Result<()> {
    let root = *path.parse::<LogicalPath>()?.root();
    let store = CarBlockstore::open(car)
        .await
        .with_context(|| format!("Failed to open CAR: {}", car.display()))?;
    let extractor = Extractor::builder()
        .blockstore(store)
        .config(config.extract)
        .build();

    match output {
        Some(output) => {
            ensure_parent_exist(output)?;
            // Moved into place only once every block was written.
            let dir = output.parent().filter(|dir| !dir.as_os_str().is_empty());
            let tmp = tempfile::NamedTempFile::new_in(dir.unwrap_or(Path::new(".")))?;
            let file = tokio::fs::File::from_std(tmp.reopen()?);
            let blocks = write_car(&extractor, path, root, file).await?;
            tmp.persist(output)
                .with_context(|| format!("Failed to write CAR: {}", output.display()))?;
            info!("extracted {blocks} blocks to {}", output.display());
        },
        None => {
            let blocks = write_car(&extractor, path, root, tokio::io::stdout()).await?;
            info!("extracted {blocks} blocks");
        },
    }
    Ok(())
}

async fn write_car<W>(
    extractor: &Extractor<CarBlockstore>,
    path: &str,
    root: cid::Cid,
    out: W,
) -> Result<usize>
where
    W: AsyncWrite + Unpin,
{
    let mut writer = CarWriter::new(out, vec![root]).await?;
    let mut blocks = extractor.resolve(path);
    while let Some(block) = blocks.try_next().await? {
        writer.write(&block).await?;
    }
    let count = writer.blocks();
    writer.finish().await?;
    Ok(count)
}
