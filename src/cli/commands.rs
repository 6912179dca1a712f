//! CLI command definitions for quizforge.
//!
//! The `generate` command runs the whole pipeline in-process: it loads
//! templates, assembles the orchestrator, submits one request, polls its
//! status to completion and prints the result set.

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::cache::{MemoryCache, RedisCache, ResultCache};
use crate::curriculum::{CurriculumMapping, Difficulty};
use crate::intake::GenerationRequest;
use crate::metrics::{export_metrics, init_metrics};
use crate::pipeline::{PipelineConfig, PipelineOrchestrator};
use crate::question::Question;
use crate::sink::{MemorySink, QuestionSink, SqliteSink};
use crate::status::GenerationState;
use crate::synthesis::HttpSynthesizer;
use crate::template::{TemplateRegistry, TemplateSelector};
use crate::validation::RuleValidator;

/// Default template directory.
const DEFAULT_TEMPLATES_DIR: &str = "./templates";

/// How long `generate` waits for a request before giving up.
const GENERATE_WAIT_TIMEOUT: Duration = Duration::from_secs(600);
const GENERATE_POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Curriculum-aligned question generation pipeline.
#[derive(Parser)]
#[command(name = "quizforge")]
#[command(about = "Generate validated, curriculum-aligned practice questions")]
#[command(version)]
#[command(
    long_about = "quizforge generates practice questions for a curriculum slot: templates are \
selected per slot, content is synthesized externally, and every candidate is validated for \
curriculum alignment, age-appropriate language and technical accuracy before it is accepted.\n\n\
Example usage:\n  quizforge generate --subject mathematics --year 3 --topic fractions --count 5"
)]
pub struct Cli {
    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short, long, default_value = "info", global = true)]
    pub log_level: String,
}

/// Available CLI subcommands.
#[derive(clap::Subcommand)]
pub enum Commands {
    /// Generate questions for one curriculum slot.
    #[command(alias = "gen")]
    Generate(GenerateArgs),

    /// Inspect and validate question templates.
    Templates(TemplatesArgs),

    /// Print the current metric exposition.
    Metrics,
}

/// Arguments for `quizforge generate`.
#[derive(Parser, Debug)]
pub struct GenerateArgs {
    /// Curriculum subject (e.g. mathematics).
    #[arg(short, long)]
    pub subject: String,

    /// School year, 1-13.
    #[arg(short, long)]
    pub year: u8,

    /// Curriculum topic (e.g. fractions).
    #[arg(short, long)]
    pub topic: String,

    /// Optional term (e.g. autumn).
    #[arg(long)]
    pub term: Option<String>,

    /// Comma-separated learning objectives.
    #[arg(long)]
    pub objectives: Option<String>,

    /// Difficulty level (easy, medium, hard).
    #[arg(short, long, default_value = "medium")]
    pub difficulty: String,

    /// Number of questions to generate.
    #[arg(short = 'n', long, default_value = "5")]
    pub count: u32,

    /// Directory holding question templates.
    #[arg(long, default_value = DEFAULT_TEMPLATES_DIR)]
    pub templates: String,

    /// Synthesis service URL (can also be set via QUIZFORGE_SYNTH_URL).
    #[arg(long, env = "QUIZFORGE_SYNTH_URL")]
    pub synth_url: Option<String>,

    /// Synthesis API key (can also be set via QUIZFORGE_SYNTH_KEY).
    #[arg(long, env = "QUIZFORGE_SYNTH_KEY")]
    pub api_key: Option<String>,

    /// Output JSON instead of human-readable text.
    #[arg(short = 'j', long)]
    pub json: bool,
}

/// Arguments for `quizforge templates`.
#[derive(Parser, Debug)]
pub struct TemplatesArgs {
    /// Templates subcommand to run.
    #[command(subcommand)]
    pub command: TemplatesSubcommand,
}

/// Template subcommands.
#[derive(clap::Subcommand, Debug)]
pub enum TemplatesSubcommand {
    /// List all templates in a directory.
    List(TemplatesDirArgs),

    /// Parse and validate all templates in a directory.
    Validate(TemplatesDirArgs),
}

/// Directory argument shared by template subcommands.
#[derive(Parser, Debug)]
pub struct TemplatesDirArgs {
    /// Directory holding question templates.
    #[arg(short, long, default_value = DEFAULT_TEMPLATES_DIR)]
    pub dir: String,
}

/// JSON summary emitted by `generate --json`.
#[derive(Debug, Serialize)]
struct GenerateOutput {
    request_id: Uuid,
    status: String,
    cache_key: String,
    deduplicated: bool,
    questions: Vec<Question>,
}

/// Parse CLI arguments and return the Cli struct.
///
/// This allows main.rs to access CLI arguments (like log_level) before
/// running commands.
pub fn parse_cli() -> Cli {
    Cli::parse()
}

/// Run the CLI by parsing arguments and executing the command.
pub async fn run() -> anyhow::Result<()> {
    run_with_cli(parse_cli()).await
}

/// Run the CLI with the parsed arguments.
pub async fn run_with_cli(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Generate(args) => {
            run_generate_command(args).await?;
        }
        Commands::Templates(args) => {
            run_templates_command(args)?;
        }
        Commands::Metrics => {
            init_metrics()?;
            print!("{}", export_metrics());
        }
    }
    Ok(())
}

async fn run_generate_command(args: GenerateArgs) -> anyhow::Result<()> {
    init_metrics()?;

    let config = PipelineConfig::from_env()?;
    let difficulty: Difficulty = args.difficulty.parse()?;

    let mut curriculum = CurriculumMapping::new(&args.subject, args.year, &args.topic);
    if let Some(term) = &args.term {
        curriculum = curriculum.with_term(term);
    }
    if let Some(objectives) = &args.objectives {
        curriculum = curriculum.with_objectives(
            objectives
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
        );
    }

    let mut registry = TemplateRegistry::new();
    let loaded = registry.load_directory(&args.templates)?;
    info!(count = loaded, dir = %args.templates, "Loaded templates");
    let selector = Arc::new(TemplateSelector::new(Arc::new(registry)));

    let mut synthesizer = match &args.synth_url {
        Some(url) => HttpSynthesizer::new(url, config.synthesis_timeout),
        None => HttpSynthesizer::from_env(config.synthesis_timeout)?,
    };
    if let Some(key) = &args.api_key {
        synthesizer = synthesizer.with_api_key(key);
    }

    let cache: Arc<dyn ResultCache> = match &config.redis_url {
        Some(url) => match RedisCache::connect(url, "quizforge").await {
            Ok(redis) => Arc::new(redis),
            Err(e) => {
                warn!(error = %e, "Redis unavailable; using in-memory cache");
                Arc::new(MemoryCache::new())
            }
        },
        None => Arc::new(MemoryCache::new()),
    };

    let sink: Arc<dyn QuestionSink> = match &config.database_url {
        Some(url) => Arc::new(SqliteSink::connect(url).await?),
        None => Arc::new(MemorySink::new()),
    };

    let mut orchestrator = PipelineOrchestrator::new(
        config,
        selector,
        Arc::new(synthesizer),
        Arc::new(RuleValidator::new()),
        Arc::clone(&cache),
        sink,
    );
    orchestrator.start()?;

    let request = GenerationRequest::new(curriculum, difficulty, args.count);
    let receipt = orchestrator.submit(request).await?;

    let status = orchestrator
        .wait_for(receipt.request_id, GENERATE_WAIT_TIMEOUT, GENERATE_POLL_INTERVAL)
        .await
        .ok_or_else(|| anyhow::anyhow!("request {} lost its status", receipt.request_id))?;

    let result = match status.state {
        GenerationState::Completed => orchestrator.result(&receipt.cache_key).await?,
        GenerationState::Failed => {
            orchestrator.shutdown().await?;
            anyhow::bail!(
                "generation failed: {}",
                status.error.as_deref().unwrap_or("unknown error")
            );
        }
        _ => {
            orchestrator.shutdown().await?;
            anyhow::bail!(
                "timed out after {:?} (state: {}, progress: {}%)",
                GENERATE_WAIT_TIMEOUT,
                status.state,
                status.progress
            );
        }
    };

    orchestrator.shutdown().await?;

    let questions = result.map(|r| r.questions).unwrap_or_default();
    if args.json {
        let output = GenerateOutput {
            request_id: receipt.request_id,
            status: status.state.to_string(),
            cache_key: receipt.cache_key.to_string(),
            deduplicated: receipt.deduplicated,
            questions,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        print_questions(&questions, receipt.deduplicated);
    }

    Ok(())
}

fn print_questions(questions: &[Question], deduplicated: bool) {
    if deduplicated {
        println!("(served from cache)");
    }
    for (i, question) in questions.iter().enumerate() {
        println!("\n{}. [{}] {}", i + 1, question.content.question_type(), question.content.prompt());
        if let crate::question::QuestionContent::MultipleChoice {
            correct_answer,
            distractors,
            ..
        } = &question.content
        {
            let mut options: Vec<&str> = distractors.iter().map(String::as_str).collect();
            options.push(correct_answer);
            options.sort_unstable();
            for option in options {
                println!("   - {}", option);
            }
        }
        println!("   Answer: {}", question.content.answer());
        if !question.explanation.is_empty() {
            println!("   Explanation: {}", question.explanation);
        }
        for hint in &question.hints {
            println!("   Hint: {}", hint);
        }
    }
}

fn run_templates_command(args: TemplatesArgs) -> anyhow::Result<()> {
    match args.command {
        TemplatesSubcommand::List(dir_args) => {
            let mut registry = TemplateRegistry::new();
            registry.load_directory(&dir_args.dir)?;
            let total = registry.len();

            let mut templates: Vec<_> = registry.iter().collect();
            templates.sort_by(|a, b| a.id.cmp(&b.id));
            for template in templates {
                println!(
                    "{:<24} {:<16} {:<8} {} year {} / {}",
                    template.id,
                    template.question_type,
                    template.difficulty,
                    template.curriculum.subject,
                    template.curriculum.year,
                    template.curriculum.topic,
                );
            }
            println!("\n{} templates", total);
        }
        TemplatesSubcommand::Validate(dir_args) => {
            let mut registry = TemplateRegistry::new();
            match registry.load_directory(&dir_args.dir) {
                Ok(count) => println!("{} templates OK", count),
                Err(e) => {
                    anyhow::bail!("template validation failed: {}", e);
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_parses() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_generate_command_defaults() {
        let args = vec![
            "quizforge",
            "generate",
            "--subject",
            "mathematics",
            "--year",
            "3",
            "--topic",
            "fractions",
        ];
        let cli = Cli::try_parse_from(args).expect("should parse");

        match cli.command {
            Commands::Generate(args) => {
                assert_eq!(args.subject, "mathematics");
                assert_eq!(args.year, 3);
                assert_eq!(args.topic, "fractions");
                assert_eq!(args.difficulty, "medium");
                assert_eq!(args.count, 5);
                assert_eq!(args.templates, DEFAULT_TEMPLATES_DIR);
                assert!(!args.json);
            }
            _ => panic!("Expected Generate command"),
        }
    }

    #[test]
    fn test_generate_alias() {
        let args = vec![
            "quizforge", "gen", "-s", "science", "-y", "5", "-t", "plants", "-n", "2", "-j",
        ];
        let cli = Cli::try_parse_from(args).expect("should parse with alias");

        match cli.command {
            Commands::Generate(args) => {
                assert_eq!(args.subject, "science");
                assert_eq!(args.count, 2);
                assert!(args.json);
            }
            _ => panic!("Expected Generate command"),
        }
    }

    #[test]
    fn test_templates_validate_parses() {
        let args = vec!["quizforge", "templates", "validate", "--dir", "./t"];
        let cli = Cli::try_parse_from(args).expect("should parse");

        match cli.command {
            Commands::Templates(args) => match args.command {
                TemplatesSubcommand::Validate(dir_args) => {
                    assert_eq!(dir_args.dir, "./t");
                }
                _ => panic!("Expected templates validate subcommand"),
            },
            _ => panic!("Expected templates command"),
        }
    }
}
