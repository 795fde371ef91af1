use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{ArgGroup, Parser};
use tracing::{debug, error};
use tracing_subscriber::EnvFilter;

use metric_recommender::{
    InMemoryStore, MetricRecommender, QuestionRepository, RecommendError, RecommenderConfig, Result,
    TextNormalizer,
};

/// Recommend metrics for a question from a labelled question corpus
#[derive(Parser, Debug)]
#[command(name = "metric-recommender", version, about)]
#[command(group(ArgGroup::new("target").required(true).args(["text", "question_id"])))]
struct Cli {
    /// TOML configuration file
    #[arg(long, env = "METRIC_RECOMMENDER_CONFIG")]
    config: Option<PathBuf>,

    /// JSON file with `metrics` and `questions`
    #[arg(long)]
    corpus: PathBuf,

    /// Raw text of the question to recommend for
    #[arg(long)]
    text: Option<String>,

    /// Stored question to recommend for; excluded from the corpus
    #[arg(long)]
    question_id: Option<u64>,

    /// Write the request's ARFF datasets and label descriptor here
    #[arg(long)]
    dump_dir: Option<PathBuf>,
}

fn run(cli: Cli) -> Result<Vec<u64>> {
    let config = match &cli.config {
        Some(path) => RecommenderConfig::from_file(path)?,
        None => RecommenderConfig::default(),
    };
    let store: InMemoryStore = serde_json::from_str(&std::fs::read_to_string(&cli.corpus)?)?;
    debug!(
        metrics = store.metrics.len(),
        questions = store.questions.len(),
        "corpus loaded"
    );

    // 既定設定なら共有インスタンスを使う
    let normalizer = if cli.config.is_none() {
        TextNormalizer::global()?
    } else {
        Arc::new(TextNormalizer::from_config(&config.normalizer)?)
    };
    let recommender = MetricRecommender::new(normalizer, config, &store)?;

    let (target, corpus) = match cli.question_id {
        Some(id) => {
            let question = store
                .find_question(id)?
                .ok_or_else(|| RecommendError::Repository(format!("question {id} not found")))?;
            (question.content, store.list_other_questions(id)?)
        }
        None => {
            let all: Vec<_> = store.questions.iter().map(|q| q.record.clone()).collect();
            (cli.text.unwrap_or_default(), all)
        }
    };

    let Some(request) = recommender.prepare(&target, &corpus)? else {
        return Ok(Vec::new());
    };
    if let Some(dir) = &cli.dump_dir {
        request.write_artifacts(dir)?;
    }
    recommender.recommend_prepared(&request)
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let ids = match run(cli) {
        Ok(ids) => ids,
        Err(e) => {
            error!("{e}");
            return ExitCode::FAILURE;
        }
    };
    match serde_json::to_string(&ids) {
        Ok(json) => {
            println!("{json}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}
