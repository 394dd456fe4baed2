//! Embed a few sentences and compare them against a query.
//!
//! Uses the local fastembed model by default; set `DOCENT_PROVIDER=openai`
//! (with `OPENAI_API_KEY`) to go through the HTTP provider instead.

use docent_embed::{EmbedConfig, ProviderKind, create_provider};
use half::f16;

fn cosine(a: &[f16], b: &[f16]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x.to_f32() * y.to_f32()).sum();
    let norm_a = a.iter().map(|x| x.to_f32().powi(2)).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x.to_f32().powi(2)).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let provider_kind: ProviderKind = std::env::var("DOCENT_PROVIDER")
        .unwrap_or_else(|_| "fastembed".to_string())
        .parse()?;
    let config = match provider_kind {
        ProviderKind::FastEmbed => EmbedConfig::default().with_batch_size(2),
        ProviderKind::OpenAi => EmbedConfig::openai(),
    };

    println!("Provider: {}  Model: {}", config.provider, config.model_name);
    let provider = create_provider(&config).await?;
    println!("Dimension: {}", provider.embedding_dimension());

    let texts = vec![
        "Cats are small domesticated carnivorous mammals.".to_string(),
        "Quarterly revenue grew by twelve percent.".to_string(),
        "Rust guarantees memory safety without a garbage collector.".to_string(),
    ];
    let result = provider.embed_texts(&texts).await?;

    let query = "Tell me about pets";
    let query_embedding = provider.embed_text(query).await?;

    println!("\nQuery: \"{query}\"");
    for (text, embedding) in texts.iter().zip(result.embeddings.iter()) {
        println!("  {:.3}  {text}", cosine(&query_embedding, embedding));
    }
    Ok(())
}
