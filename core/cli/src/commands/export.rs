use std::path::Path;

use anyhow::{Context, Result};
use car_extract::car::CarBlockstore;
use car_extract::Extractor;
use tracing::info;

use crate::config::Config;
use crate::utils::ensure_parent_exist;

pub async fn exec(config: Config, path: &str, car: &Path, output: Option<&Path>) -> Result<()> {
    let store = CarBlockstore::open(car)
        .await
        .with_context(|| format!("Failed to open CAR: {}", car.display()))?;
    let extractor = Extractor::builder()
        .blockstore(store)
        .config(config.extract)
        .build();

    let content = extractor.read_file(path);
    let written = match output {
        Some(output) => {
            ensure_parent_exist(output)?;
            let mut file = tokio::fs::File::create(output)
                .await
                .with_context(|| format!("Failed to create file: {}", output.display()))?;
            content.write_to(&mut file).await?
        },
        None => content.write_to(&mut tokio::io::stdout()).await?,
    };
    info!("exported {written} bytes of {path}");
    Ok(())
}
