use adforge::{AppConfig, ClientProvider, Pipeline};
use std::path::{Path, PathBuf};

fn example_output_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("ADFORGE_EXAMPLE_OUTPUT_DIR") {
        return PathBuf::from(dir);
    }
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("examples")
        .join("output")
}

#[tokio::main]
async fn main() -> adforge::Result<()> {
    let config = AppConfig::from_env()?;
    let client = ClientProvider::global().init(&config).await?;
    let pipeline = Pipeline::new(&client, &config)?;

    let product =
        std::env::var("ADFORGE_EXAMPLE_PRODUCT").unwrap_or_else(|_| "backpack.jpg".to_string());
    match pipeline
        .generate_detailed(&product, "waterproof, ultra-light, durable backpack")
        .await
    {
        Ok(image) => {
            let output_dir = example_output_dir();
            std::fs::create_dir_all(&output_dir)?;
            let file_name = image.path().file_name().unwrap_or_default();
            let saved = image.persist_to(output_dir.join(file_name))?;
            println!("saved {} ({} bytes)", saved.display(), image.bytes_len());
        }
        Err(err) => println!("generation failed at {:?}: {err}", err.stage()),
    }
    Ok(())
}
