//! Ingests a directory of text files into a SQLite vector collection, then
//! runs a similarity query against it.
//!
//! A small sample corpus is generated on first run, so the demo works
//! without any setup:
//!
//! ```bash
//! cargo run --example ingest_corpus
//! ```
//!
//! Set `CORPUS_DIR` and `COLLECTION_DB` to point at real data.

use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use tracing_subscriber::FmtSubscriber;

use chunksmith::{
    DistanceMetric, EmbeddingProvider, IngestError, IngestionPipeline, MockEmbeddingProvider,
    PipelineConfig, SqliteVectorStore, VectorStore,
};

#[tokio::main]
async fn main() -> Result<(), IngestError> {
    init_tracing();

    let corpus_dir = env::var("CORPUS_DIR").unwrap_or_else(|_| "./sample_corpus".to_string());
    let corpus_dir = PathBuf::from(corpus_dir);
    let db_path = env::var("COLLECTION_DB").unwrap_or_else(|_| "./chunks.sqlite".to_string());
    let db_path = PathBuf::from(db_path);

    if !corpus_dir.exists() {
        println!("No corpus found, writing a sample one to {}", corpus_dir.display());
        write_sample_corpus(&corpus_dir).await?;
    }

    let provider = Arc::new(MockEmbeddingProvider::new());
    let store = Arc::new(
        SqliteVectorStore::open(&db_path, provider.dimensions(), DistanceMetric::Cosine).await?,
    );

    let pipeline = IngestionPipeline::builder()
        .config(PipelineConfig {
            chunk_size: 400,
            chunk_overlap: 40,
            collection_path: db_path.clone(),
            ..Default::default()
        })
        .embedding_provider(Arc::clone(&provider) as Arc<dyn EmbeddingProvider>)
        .store(Arc::clone(&store) as Arc<dyn VectorStore>)
        .build()?;

    println!("→ Ingesting {}", corpus_dir.display());
    let report = match pipeline.run(&corpus_dir).await {
        Ok(report) => report,
        Err(failure) => {
            eprintln!("✗ {failure}");
            return Ok(());
        }
    };

    println!("\n✅ Ingestion complete!");
    println!("  documents loaded : {}", report.documents_loaded);
    println!("  chunks produced  : {}", report.chunks_produced);
    println!("  chunks persisted : {}", report.chunks_persisted);
    println!("  collection size  : {}", report.collection_size);
    println!("  duration         : {:?}", report.elapsed);
    println!("  sqlite database  : {}", db_path.display());

    let query = "How do bees communicate about food?";
    let query_vector = provider.embed(query).await?;
    let hits = store.search_similar(&query_vector, 3).await?;

    println!("\nTop matches for {query:?}:");
    for (rank, hit) in hits.iter().enumerate() {
        let preview: String = hit.record.content.chars().take(72).collect();
        println!(
            "  {}. [{:.4}] {} #{} — {}",
            rank + 1,
            hit.distance,
            hit.record.source,
            hit.record.chunk_index,
            preview.replace('\n', " ")
        );
    }

    Ok(())
}

fn init_tracing() {
    static INIT: std::sync::Once = std::sync::Once::new();
    INIT.call_once(|| {
        let subscriber = FmtSubscriber::builder().with_env_filter("info").finish();
        let _ = tracing::subscriber::set_global_default(subscriber);
    });
}

async fn write_sample_corpus(dir: &std::path::Path) -> Result<(), IngestError> {
    tokio::fs::create_dir_all(dir).await?;
    tokio::fs::write(
        dir.join("bees.txt"),
        "Honey bees communicate the location of food through the waggle dance. \
         The angle of the dance encodes direction relative to the sun. \
         The duration of each waggle run encodes distance to the source.\n\n\
         Foragers adjust their dances as the sun moves across the sky. \
         Other workers read the dance in complete darkness inside the hive.",
    )
    .await?;
    tokio::fs::write(
        dir.join("glaciers.txt"),
        "Glaciers form where snow accumulates faster than it melts over many years. \
         The weight of the upper layers compresses older snow into dense ice. \
         Under pressure the ice deforms and the whole mass flows slowly downhill.\n\n\
         Meltwater at the base can lubricate the bed and speed up the flow.",
    )
    .await?;
    tokio::fs::write(
        dir.join("sourdough.txt"),
        "A sourdough starter is a stable culture of wild yeast and lactic acid bacteria. \
         Regular feeding with flour and water keeps the culture active. \
         The bacteria acidify the dough, which strengthens gluten and adds flavor.",
    )
    .await?;
    Ok(())
}
