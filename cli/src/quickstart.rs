//! Walkthrough over a small in-memory corpus: tokenize, embed, cosine
//! search, rerank.

use anyhow::Context as _;
use semsearch_retrieval::config::EmbeddingConfig;
use semsearch_retrieval::{Document, RetrievalConfig, SearchPipeline};

/// Embedding model used by the walkthrough.
pub(crate) const MODEL: &str = "voyage-3.5";

pub(crate) const DEFAULT_QUERY: &str = "When is Apple's conference call scheduled?";

const CORPUS: [&str; 9] = [
    "The Mediterranean diet emphasizes fish, olive oil, and vegetables, believed to reduce chronic diseases.",
    "Photosynthesis in plants converts light energy into glucose and produces essential oxygen.",
    "20th-century innovations, from radios to smartphones, centered on electronic advancements.",
    "Rivers provide water, irrigation, and habitat for aquatic species, vital for ecosystems.",
    "Apple’s conference call to discuss fourth fiscal quarter results and business updates is scheduled for Thursday, November 2, 2023 at 2:00 p.m. PT / 5:00 p.m. ET.",
    "Shakespeare's works, like 'Hamlet' and 'A Midsummer Night's Dream,' endure in literature.",
    "The beloved Granny Smith Festival is set to take place on Saturday 18 October 2025, from 9:00am to 8:30pm in Eastwood, NSW.",
    "Companies hold earnings conference calls on the same day or the day after they release their quarterly reports, which are subject to SEC filing requirements. The exact time can vary, but they are often scheduled during peak business hours, though a study noted that late afternoon calls were sometimes more negative.",
    "Local Farmer's Market Apple Festival planning committee call scheduled for this Thursday at 2:30 p.m. to finalize event details.",
];

/// Embedding settings for the walkthrough: `voyage-3.5` at its native dimension.
fn embedding_config(config: &EmbeddingConfig) -> EmbeddingConfig {
    EmbeddingConfig {
        model: MODEL.to_string(),
        output_dimension: None,
        ..config.clone()
    }
}

pub(crate) async fn run(config: RetrievalConfig, query: &str, k: usize) -> anyhow::Result<()> {
    let embedding = embedding_config(&config.embedding);
    let mut config = config.with_embedding(embedding);
    // Reranking is shown as its own step below.
    config.rerank.enabled = false;

    let pipeline = SearchPipeline::builder(config)
        .build()
        .await
        .context("failed to set up search pipeline")?;

    let documents: Vec<String> = CORPUS.iter().map(ToString::to_string).collect();

    inspect_tokens(&pipeline, &documents).await?;

    let corpus = pipeline
        .embed_corpus(documents.iter().map(Document::new).collect())
        .await?;
    let results = pipeline.search_local(query, &corpus, k).await?;

    println!("\n\n=== Cosine Search Result ===");
    for result in &results {
        let number = result
            .corpus_index
            .map_or_else(|| "?".to_string(), |i| (i + 1).to_string());
        println!("{}. Document {number}:", result.rank);
        println!("   {}", result.document.text);
        println!("Score: {}\n", result.score);
    }

    println!("\n\n=== Re-ranked Documents Search Result ===");
    for r in pipeline.rerank(query, &documents, Some(k)).await? {
        println!("Document no. {}: {}", r.index + 1, r.document);
        println!("Index: {}", r.index);
        println!("Relevance Score: {}\n", r.relevance_score);
    }

    Ok(())
}

async fn inspect_tokens(pipeline: &SearchPipeline, documents: &[String]) -> anyhow::Result<()> {
    println!("Input list count: {}", documents.len());

    let tokenized = pipeline.tokenize(documents).await?;
    for (i, tokens) in tokenized.iter().enumerate() {
        println!("\nDocument No.{i}:");
        println!("{tokens:?}");
    }
    println!("\nOutput tokenized list count: {}\n", tokenized.len());

    let manual: usize = tokenized.iter().map(Vec::len).sum();
    println!("Manual count of tokens: {manual}");

    let counted = pipeline.count_tokens(documents).await?;
    println!("count_tokens: {counted}");
    Ok(())
}
