//! Shows semantic chunking on a short multi-topic text.
//!
//! ```bash
//! cargo run --example semantic_chunks
//! ```

use std::sync::Arc;

use chunksmith::{
    BreakpointStrategy, ChunkingConfig, IngestError, MockEmbeddingProvider,
    SemanticChunkingService,
};

const REPORT: &str = "\
Quarterly Results
The company reported record revenue of $25.2B in the third quarter.
Results exceeded analyst expectations by fifteen percent.
Growth was driven by strong product deliveries.

Flagship Product
The flagship model became the best-selling product globally, with 350,000 units sold.
Customer satisfaction ratings reached an all-time high of 96 percent.
It now represents sixty percent of total sales.

Production Challenges
Supply chain issues caused a twelve percent increase in production costs.
The company is working to diversify its supplier base.
New manufacturing techniques are being introduced to reduce costs.";

#[tokio::main]
async fn main() -> Result<(), IngestError> {
    let service = SemanticChunkingService::builder()
        .with_embedding_provider(Arc::new(MockEmbeddingProvider::new()))
        .with_config(ChunkingConfig {
            strategy: BreakpointStrategy::Percentile { threshold: 70.0 },
            ..Default::default()
        })
        .build();

    let response = service.chunk_text(REPORT).await.map_err(IngestError::from)?;

    println!("SEMANTIC CHUNKING RESULTS");
    println!("{}", "=".repeat(50));
    for (index, chunk) in response.outcome.chunks.iter().enumerate() {
        println!(
            "Chunk {index}: ({} chars, {} sentences)",
            chunk.char_count, chunk.sentence_count
        );
        println!("{:?}", chunk.content);
        println!();
    }

    let telemetry = &response.telemetry;
    println!(
        "{} chunks via {} strategy in {} ms (cache: {} hits / {} misses)",
        telemetry.chunk_count,
        telemetry.strategy,
        telemetry.duration_ms,
        telemetry.cache_hits,
        telemetry.cache_misses
    );

    Ok(())
}
