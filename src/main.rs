use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::rc::Rc;

use clap::Parser;
use tracing::Level;

use vocabmark::annotation::{
    AnnotationResult, AnnotationService, ConfigManager, MemoryProvider, ProviderRegistry,
    ScanRoot, VocabularyStore,
};
use vocabmark::annotation::error::helpers;
use vocabmark::env::{core as env_core, describe_all, EnvVar};
use vocabmark::{html_to_dom, serialize_document};

#[derive(Parser, Debug)]
#[command(name = "vocabmark", version)]
#[command(about = "Annotate vocabulary words inline in Chinese HTML pages", long_about = None)]
struct Args {
    /// HTML document to annotate
    #[arg(short, long, value_name = "HTML", required_unless_present_any = ["init_config", "list_env"])]
    input: Option<PathBuf>,

    /// Vocabulary entries as a JSON array
    #[arg(short = 'w', long, value_name = "JSON", required_unless_present_any = ["init_config", "list_env"])]
    vocabulary: Option<PathBuf>,

    /// Write the annotated document here instead of stdout
    #[arg(short, long, value_name = "HTML")]
    output: Option<PathBuf>,

    /// Configuration file (TOML or JSON); searched in default locations when omitted
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Offline translation memory used as translation and dictionary provider
    #[arg(short, long, value_name = "JSON")]
    memory: Option<PathBuf>,

    /// Page URL checked against the configured domain policy
    #[arg(short, long)]
    url: Option<String>,

    /// Document charset
    #[arg(long, default_value = "utf-8")]
    charset: String,

    /// Enable similarity matching when exact matching finds nothing
    #[arg(short, long)]
    aggressive: bool,

    /// Only scan the main content container
    #[arg(long)]
    main_content: bool,

    /// Print debug logs
    #[arg(short, long)]
    verbose: bool,

    /// Write a default configuration file, then exit
    #[arg(long, value_name = "FILE", exclusive = true)]
    init_config: Option<PathBuf>,

    /// List supported environment variables, then exit
    #[arg(long, exclusive = true)]
    list_env: bool,
}

fn init_logging(verbose: bool) {
    let level = if verbose {
        Level::DEBUG
    } else {
        match env_core::LogLevel::get().as_deref() {
            Ok("trace") => Level::TRACE,
            Ok("debug") => Level::DEBUG,
            Ok("warn") => Level::WARN,
            Ok("error") => Level::ERROR,
            _ => Level::INFO,
        }
    };
    let no_color = env_core::NoColor::get().unwrap_or(false);

    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_ansi(!no_color)
        .with_writer(io::stderr)
        .init();
}

async fn run(args: Args) -> AnnotationResult<()> {
    if let Some(path) = &args.init_config {
        ConfigManager::generate_example_config(path)?;
        println!("Wrote default configuration to {}", path.display());
        return Ok(());
    }

    if args.list_env {
        for (name, description) in describe_all() {
            println!("{:<28} {}", name, description);
        }
        return Ok(());
    }

    let (Some(input_path), Some(vocabulary_path)) = (&args.input, &args.vocabulary) else {
        return Err(helpers::validation_error("--input 与 --vocabulary 必须同时给出"));
    };

    let manager = match &args.config {
        Some(path) => ConfigManager::from_path(path)?,
        None => ConfigManager::new()?,
    };

    if args.aggressive || args.main_content {
        let mut config = (*manager.snapshot()).clone();
        config.aggressive |= args.aggressive;
        if args.main_content {
            config.scan_root = ScanRoot::MainContent;
        }
        manager.update(config)?;
    }
    let config = manager.snapshot();

    let input = fs::read(input_path)?;
    let dom = html_to_dom(&input, &args.charset)?;

    let permitted = args
        .url
        .as_deref()
        .map(|url| config.domains.permits(url))
        .unwrap_or(true);

    if permitted {
        let vocabulary = VocabularyStore::load_json(vocabulary_path)?;
        let mut registry = ProviderRegistry::from_config(&config)?;
        if let Some(path) = &args.memory {
            let memory = Rc::new(MemoryProvider::load_json(path)?);
            registry.register(memory.clone());
            registry.register_dictionary(memory);
        }
        tracing::debug!("已注册翻译服务: {:?}", registry.ids());

        let service = AnnotationService::from_parts(&manager, &vocabulary, registry);
        let report = service.annotate_document(&dom).await;
        tracing::info!(
            "段落 {}，完成 {}，失败 {}，标注 {} 处",
            report.blocks_found,
            report.stats.blocks_done,
            report.stats.blocks_failed,
            report.stats.spans_applied
        );
        if let Some(cache) = service.registry().cache() {
            let stats = cache.stats();
            tracing::debug!("翻译缓存命中率: {:.1}%", stats.hit_rate() * 100.0);
        }
    } else {
        tracing::info!("域名策略不允许在该页面运行，原样输出");
    }

    let output = serialize_document(&dom, &args.charset)?;
    match &args.output {
        Some(path) => fs::write(path, output)?,
        None => io::stdout().write_all(&output)?,
    }
    Ok(())
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.verbose);

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Error: failed to start runtime: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(args)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
