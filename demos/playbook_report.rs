use dotenv::dotenv;
use merchant_playbook::llm::{GeminiClient, GeminiRenderer};
use merchant_playbook::{
    NarrativeReport, PlaybookConfig, PlaybookPipeline, QueryOutcome, RandomMarkers,
};
use std::error::Error;
use std::io::{self, Write};
use std::path::Path;

fn load_config() -> Result<PlaybookConfig, Box<dyn Error>> {
    let config = match std::env::var("PLAYBOOK_CONFIG") {
        Ok(path) => PlaybookConfig::from_json_file(Path::new(&path))?
            .with_overrides(|key| std::env::var(key).ok())?,
        Err(_) => PlaybookConfig::from_env()?,
    };
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    dotenv().ok();
    let api_key = std::env::var("GEMINI_API_KEY").expect("GEMINI_API_KEY must be set");

    let config = load_config()?;
    println!("🤖 AI 전략 가이드 - 데이터 기반 맞춤형 AI 마케팅 전략 리포트");
    println!("📂 Sources: {:?}", config.sources);

    let renderer = GeminiRenderer::new(GeminiClient::new(api_key), config.model.clone());
    let pipeline = PlaybookPipeline::new(config);
    let mut markers = RandomMarkers::new();

    loop {
        print!("🏪 가맹점 코드를 입력하세요 (quit to exit) > ");
        io::stdout().flush()?;

        let mut input = String::new();
        if io::stdin().read_line(&mut input)? == 0 {
            break;
        }
        let query = input.trim();
        if query.eq_ignore_ascii_case("quit") || query.eq_ignore_ascii_case("exit") {
            break;
        }

        // Source problems end this query only; the prompt loop keeps going.
        let outcome = match pipeline.analyze(query, &mut markers) {
            Ok(outcome) => outcome,
            Err(e) => {
                eprintln!("❌ {}", e);
                continue;
            }
        };

        let analysis = match outcome {
            QueryOutcome::Ready(analysis) => analysis,
            other => {
                println!("{}", other.message().unwrap_or_default());
                continue;
            }
        };

        println!("\n🏪 선택된 가맹점: {}", analysis.comparison.display_name);
        println!("\n### 📋 주요 지표 요약");
        for row in &analysis.summary {
            println!("  {:<24} {}", row.label, row.value.display());
        }

        println!("\n### 📊 매장 vs 평균");
        for chart in &analysis.charts {
            println!(
                "  {:<12} {} {:>8} | {} {:>8}",
                chart.title,
                chart.merchant_label,
                merchant_playbook::utils::format_metric(chart.merchant),
                chart.population_label,
                merchant_playbook::utils::format_metric(chart.population),
            );
        }

        println!("\n## 💬 AI 전략 리포트 결과");
        match pipeline.narrate(&renderer, &analysis.prompts).await {
            NarrativeReport::NoStrategy { message } => println!("{}", message),
            NarrativeReport::Sections { sections } => {
                for section in sections {
                    println!("\n------------------------------------------------------------------");
                    println!("{}\n", section.title);
                    println!("{}", section.text);
                }
            }
        }
        println!();
    }

    Ok(())
}
