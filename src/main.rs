use clap::Parser;
use std::io::Read;
use std::sync::Arc;

use webmacro::bridge::in_memory::{SimElement, SimPage};
use webmacro::datasource::StaticDataSourceProvider;
use webmacro::{Engine, EngineOptions, Bridges, InMemoryBrowser, ArithmeticEvaluator, VariableValue};

#[derive(Parser)]
#[command(name = "webmacro")]
#[command(about = "Replay iMacros-style macros against a simulated browser")]
#[command(version)]
struct Cli {
    /// Execute the macro from a command line argument
    #[arg(short = 'c')]
    macro_text: Option<String>,

    /// Number of loop iterations
    #[arg(short = 'l', long = "loop", default_value_t = 1)]
    loops: u32,

    /// Initial variables, NAME=VALUE (repeatable); re-applied every loop
    #[arg(long = "var")]
    vars: Vec<String>,

    /// CSV data source as NAME=PATH (repeatable), loadable via SET !DATASOURCE NAME
    #[arg(long = "datasource")]
    datasources: Vec<String>,

    /// Output the result as JSON
    #[arg(long = "json")]
    json: bool,

    /// Macro file to execute
    #[arg()]
    macro_file: Option<String>,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let text = if let Some(t) = cli.macro_text {
        t
    } else if let Some(ref file) = cli.macro_file {
        match std::fs::read_to_string(file) {
            Ok(content) => content,
            Err(e) => {
                eprintln!("Error: cannot read macro file {}: {}", file, e);
                std::process::exit(1);
            }
        }
    } else {
        use std::io::IsTerminal;
        if std::io::stdin().is_terminal() {
            eprintln!("Error: no macro provided. Use -c 'macro', a macro file, or pipe via stdin.");
            std::process::exit(1);
        }
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf).unwrap_or_default();
        buf
    };

    if text.trim().is_empty() {
        eprintln!("Error: empty macro");
        std::process::exit(1);
    }

    let initial_variables: Vec<(String, VariableValue)> = cli
        .vars
        .iter()
        .filter_map(|pair| {
            let (name, value) = pair.split_once('=')?;
            Some((name.to_string(), VariableValue::infer(value)))
        })
        .collect();

    let mut provider = StaticDataSourceProvider::new();
    for pair in &cli.datasources {
        let Some((name, path)) = pair.split_once('=') else {
            eprintln!("Error: --datasource expects NAME=PATH, got {}", pair);
            std::process::exit(1);
        };
        match std::fs::read_to_string(path) {
            Ok(content) => provider = provider.with_source(name, &content),
            Err(e) => {
                eprintln!("Error: cannot read data source {}: {}", path, e);
                std::process::exit(1);
            }
        }
    }

    let browser = Arc::new(InMemoryBrowser::new());
    browser.register_page(demo_page());

    let mut engine = Engine::new(EngineOptions {
        bridges: Bridges {
            browser: Some(browser.clone() as Arc<dyn webmacro::BrowserBridge>),
            content: Some(browser as Arc<dyn webmacro::ContentScriptSender>),
            evaluator: Some(Arc::new(ArithmeticEvaluator)),
            datasource: Some(Arc::new(provider)),
            ..Bridges::default()
        },
        max_loops: cli.loops,
        initial_variables,
    });

    let result = match engine.run(&text).await {
        Ok(result) => result,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&result).unwrap());
    } else {
        if result.success {
            println!("OK ({} loops, {} ms)", result.loops_completed, result.execution_time_ms);
        } else {
            println!(
                "FAILED {} at line {}: {}",
                result.error_code.code(),
                result.error_line.map(|l| l.to_string()).unwrap_or_else(|| "-".to_string()),
                result.error_message.as_deref().unwrap_or("unknown error"),
            );
        }
        for (index, value) in result.extract_data.iter().enumerate() {
            println!("extract[{}]: {}", index + 1, value);
        }
    }

    std::process::exit(if result.success { 0 } else { 1 });
}

/// The page macros see when none is registered: a small fixture mirroring
/// the documentation examples.
fn demo_page() -> SimPage {
    SimPage::new("https://example.com", "Test Page")
        .with_element(SimElement::new("H1").with_text("Welcome to Test Page"))
        .with_element(
            SimElement::new("INPUT")
                .with_attr("type", "text")
                .with_attr("id", "username")
                .with_attr("name", "username"),
        )
        .with_element(
            SimElement::new("A")
                .with_attr("href", "https://example.com/next")
                .with_text("Next"),
        )
}
