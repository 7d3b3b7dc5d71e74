use async_trait::async_trait;
use merchant_playbook::*;
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

const MERCHANTS_CSV: &str = "\u{feff}ENCODED_MCT,MCT_NM ,HPSN_MCT_BZN_CD_NM
MCT001,스타벅스,카페
MCT002,김밥천국,분식
 MCT003 ,편의점A,편의점
MCT004,휴업매장,한식
";

const USAGE_CSV: &str = "ENCODED_MCT, TA_YM ,DLV_SAA_RAT,MCT_UE_CLN_REU_RAT
MCT001,202402,60,30
MCT001,202401,60,30
MCT002,202401,20,70
MCT003,202401,50,50
MCT003,202402,,50
MCT999,202401,99,99
";

const MONTHLY_CSV: &str = "ENCODED_MCT,TA_YM,M12_MAL_1020_RAT,M12_MAL_30_RAT,M12_FME_1020_RAT,M12_FME_30_RAT
MCT001,202401,10,20,30,40
MCT001,202402,10,20,30,40
MCT002,202401,0,10,0,10
MCT003,202401,15,15,15,15
";

fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "merchant-playbook-it-{}-{}",
        name,
        std::process::id()
    ));
    fs::create_dir_all(&dir).unwrap();
    dir
}

fn write_sources(name: &str, merchants: &str, usage: &str, monthly: &str) -> SourcePaths {
    let dir = scratch_dir(name);
    fs::write(dir.join("data1.csv"), merchants).unwrap();
    fs::write(dir.join("data2.csv"), usage).unwrap();
    fs::write(dir.join("data3.csv"), monthly).unwrap();
    SourcePaths::in_dir(dir)
}

fn config_for(sources: SourcePaths) -> PlaybookConfig {
    PlaybookConfig {
        sources,
        ..PlaybookConfig::default()
    }
}

fn first_marker(markers: &'static [&'static str]) -> &'static str {
    markers[0]
}

fn ready(outcome: QueryOutcome) -> MerchantAnalysis {
    match outcome {
        QueryOutcome::Ready(analysis) => *analysis,
        other => panic!("expected a ready analysis, got {:?}", other),
    }
}

/// Rows as column-name -> value maps, sorted, so tables with different
/// column orders can be compared as sets.
fn row_set(table: &Table) -> Vec<BTreeMap<String, String>> {
    let mut rows: Vec<BTreeMap<String, String>> = table
        .rows()
        .iter()
        .map(|row| {
            table
                .columns()
                .iter()
                .cloned()
                .zip(row.iter().cloned())
                .collect()
        })
        .collect();
    rows.sort();
    rows
}

struct EchoRenderer;

#[async_trait]
impl NarrativeRenderer for EchoRenderer {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let title = prompt.lines().next().unwrap_or_default();
        Ok(format!("전략 리포트: {}", title))
    }
}

struct FailingRenderer;

#[async_trait]
impl NarrativeRenderer for FailingRenderer {
    async fn generate(&self, _prompt: &str) -> Result<String> {
        Err(PlaybookError::NarrativeRender("503 Service Unavailable".to_string()))
    }
}

#[test]
fn test_merge_keeps_only_keys_present_everywhere() {
    let sources = write_sources("merge", MERCHANTS_CSV, USAGE_CSV, MONTHLY_CSV);
    let merged = load_merged(&sources).unwrap();

    assert_eq!(merged.len(), 4);
    assert!(merged.merchant_rows("MCT999").is_empty());
    assert!(merged.merchant_rows("MCT004").is_empty());
    assert_eq!(merged.merchant_rows("MCT003").len(), 1);
    assert!(merged.has_column("MCT_NM"));
    assert!(merged.has_column("TA_YM"));
}

#[test]
fn test_join_grouping_does_not_change_rows() {
    let sources = write_sources("assoc", MERCHANTS_CSV, USAGE_CSV, MONTHLY_CSV);
    let t1 = load_table(&sources.merchants).unwrap();
    let t2 = load_table(&sources.usage).unwrap();
    let t3 = load_table(&sources.monthly).unwrap();

    let left_first = merge_sources(&t1, &t2, &t3).unwrap();
    let right_first = inner_join(
        &t1,
        &inner_join(&t2, &t3, &[MERCHANT_ID, PERIOD]).unwrap(),
        &[MERCHANT_ID],
    )
    .unwrap();

    assert_eq!(row_set(&left_first), row_set(&right_first));
}

#[test]
fn test_cache_loads_once_per_path_set() {
    let sources = write_sources("cache", MERCHANTS_CSV, USAGE_CSV, MONTHLY_CSV);
    let cache = DatasetCache::new();

    let first = cache.get_or_load(&sources).unwrap();
    let second = cache.get_or_load(&sources).unwrap();

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(cache.load_count(), 1);

    // Files are not re-read: removing them does not affect the cached copy.
    fs::remove_file(&sources.usage).unwrap();
    let third = cache.get_or_load(&sources).unwrap();
    assert_eq!(*third, *first);
    assert_eq!(cache.load_count(), 1);
}

#[test]
fn test_missing_source_is_fatal_and_not_cached() {
    let sources = write_sources("missing", MERCHANTS_CSV, USAGE_CSV, MONTHLY_CSV);
    fs::remove_file(&sources.monthly).unwrap();
    let cache = DatasetCache::new();
    let pipeline = PlaybookPipeline::with_cache(config_for(sources.clone()), &cache);

    let err = pipeline.analyze("MCT001", &mut first_marker).unwrap_err();
    match &err {
        PlaybookError::MissingSource { path } => assert_eq!(path, &sources.monthly),
        other => panic!("expected MissingSource, got {:?}", other),
    }
    assert!(!err.is_recoverable());
    assert_eq!(cache.load_count(), 0);
}

#[test]
fn test_blank_query_awaits_input_without_loading() {
    let sources = write_sources("blank", MERCHANTS_CSV, USAGE_CSV, MONTHLY_CSV);
    let cache = DatasetCache::new();
    let pipeline = PlaybookPipeline::with_cache(config_for(sources), &cache);

    let outcome = pipeline.analyze("   ", &mut first_marker).unwrap();
    assert_eq!(outcome, QueryOutcome::AwaitingInput);
    assert!(outcome.message().is_some());
    assert_eq!(cache.load_count(), 0);
}

#[test]
fn test_unknown_merchant_is_reported_not_raised() {
    let sources = write_sources("unknown", MERCHANTS_CSV, USAGE_CSV, MONTHLY_CSV);
    let cache = DatasetCache::new();
    let pipeline = PlaybookPipeline::with_cache(config_for(sources), &cache);

    let outcome = pipeline.analyze(" mct004 ", &mut first_marker).unwrap();
    assert_eq!(
        outcome,
        QueryOutcome::NotFound {
            code: "MCT004".to_string()
        }
    );
    assert_eq!(outcome.message(), Some(report::NOT_FOUND_MESSAGE));
}

#[test]
fn test_cafe_merchant_analysis() {
    let sources = write_sources("cafe", MERCHANTS_CSV, USAGE_CSV, MONTHLY_CSV);
    let cache = DatasetCache::new();
    let pipeline = PlaybookPipeline::with_cache(config_for(sources), &cache);

    let analysis = ready(pipeline.analyze(" mct001", &mut first_marker).unwrap());
    let cmp = &analysis.comparison;

    assert_eq!(cmp.code, "MCT001");
    assert_eq!(cmp.display_name, "스타벅스 · MCT001");
    assert_eq!(cmp.periods, vec!["202401", "202402"]);

    assert_eq!(cmp.merchant.delivery_rate, Some(60.0));
    assert_eq!(cmp.merchant.revisit, Some(30.0));
    assert_eq!(cmp.merchant.young_rate, Some(25.0));
    assert_eq!(cmp.merchant.avg_temp, Some(DEFAULT_AVG_TEMPERATURE));
    assert_eq!(cmp.merchant.event_count, Some(DEFAULT_EVENT_COUNT));
    assert_eq!(cmp.merchant.store_type, "카페");

    assert_eq!(cmp.population.delivery_rate, Some(47.5));
    assert_eq!(cmp.population.revisit, Some(45.0));
    assert_eq!(cmp.population.young_rate, Some(17.5));
    assert_eq!(cmp.population.avg_temp, Some(DEFAULT_AVG_TEMPERATURE));

    let kinds: Vec<_> = analysis.prompts.iter().map(|p| p.kind).collect();
    assert_eq!(
        kinds,
        vec![
            StrategyKind::Cafe,
            StrategyKind::RevisitRecovery,
            StrategyKind::YouthSns
        ]
    );

    assert_eq!(analysis.summary.len(), 6);
    assert_eq!(analysis.charts.len(), 3);
    assert_eq!(analysis.other_age_share, Some(75.0));
}

#[test]
fn test_restaurant_merchant_gets_food_and_delivery() {
    let sources = write_sources("food", MERCHANTS_CSV, USAGE_CSV, MONTHLY_CSV);
    let cache = DatasetCache::new();
    let pipeline = PlaybookPipeline::with_cache(config_for(sources), &cache);

    let analysis = ready(pipeline.analyze("MCT002", &mut first_marker).unwrap());
    let kinds: Vec<_> = analysis.prompts.iter().map(|p| p.kind).collect();
    assert_eq!(
        kinds,
        vec![StrategyKind::FoodService, StrategyKind::DeliveryUplift]
    );
    assert!(analysis.prompts[1].body.contains("20.0% (평균 47.5%)"));
}

#[tokio::test]
async fn test_no_strategy_merchant_reports_explicitly() {
    let sources = write_sources("none", MERCHANTS_CSV, USAGE_CSV, MONTHLY_CSV);
    let cache = DatasetCache::new();
    let pipeline = PlaybookPipeline::with_cache(config_for(sources), &cache);

    let analysis = ready(pipeline.analyze("MCT003", &mut first_marker).unwrap());
    assert!(analysis.prompts.is_empty());

    let report = pipeline.narrate(&EchoRenderer, &analysis.prompts).await;
    match report {
        NarrativeReport::NoStrategy { message } => {
            assert_eq!(message, narrative::NO_STRATEGY_MESSAGE)
        }
        other => panic!("expected NoStrategy, got {:?}", other),
    }
}

#[tokio::test]
async fn test_narratives_follow_prompt_order() {
    let sources = write_sources("narrate", MERCHANTS_CSV, USAGE_CSV, MONTHLY_CSV);
    let cache = DatasetCache::new();
    let pipeline = PlaybookPipeline::with_cache(config_for(sources), &cache);

    let analysis = ready(pipeline.analyze("MCT001", &mut RandomMarkers::new()).unwrap());
    let report = pipeline.narrate(&EchoRenderer, &analysis.prompts).await;
    let sections = report.sections();

    assert_eq!(sections.len(), 3);
    for (section, prompt) in sections.iter().zip(&analysis.prompts) {
        assert_eq!(section.title, prompt.title);
        assert!(section.generated);
        assert_eq!(section.text, format!("전략 리포트: {}", prompt.title));
    }
}

#[tokio::test]
async fn test_renderer_failure_keeps_report_alive() {
    let sources = write_sources("failing", MERCHANTS_CSV, USAGE_CSV, MONTHLY_CSV);
    let cache = DatasetCache::new();
    let config = PlaybookConfig {
        narrative_timeout_secs: 1,
        ..config_for(sources)
    };
    let pipeline = PlaybookPipeline::with_cache(config, &cache);

    let analysis = ready(pipeline.analyze("MCT001", &mut first_marker).unwrap());
    let report = pipeline.narrate(&FailingRenderer, &analysis.prompts).await;

    assert_eq!(report.sections().len(), 3);
    assert!(report
        .sections()
        .iter()
        .all(|s| !s.generated && s.text == narrative::NO_ANALYSIS_PLACEHOLDER));
}

#[test]
fn test_temperature_and_events_used_when_present() {
    let monthly = "ENCODED_MCT,TA_YM,M12_MAL_1020_RAT,평균기온,지역이벤트발생횟수
MCT001,202401,10,-2.0,3
MCT001,202402,10,4.0,
MCT002,202401,10,,5
";
    let sources = write_sources("weather", MERCHANTS_CSV, USAGE_CSV, monthly);
    let merged = load_merged(&sources).unwrap();

    let cmp = compare_merchant(&merged, "MCT001").unwrap();
    assert_eq!(cmp.merchant.avg_temp, Some(1.0));
    assert_eq!(cmp.merchant.event_count, Some(3.0));
    // Only one of four youth sub-ratios is present; the rest count as zero.
    assert_eq!(cmp.merchant.young_rate, Some(2.5));
    assert_eq!(cmp.population.event_count, Some(4.0));
}

#[test]
fn test_all_missing_delivery_is_undefined() {
    let usage = "ENCODED_MCT,TA_YM,DLV_SAA_RAT,MCT_UE_CLN_REU_RAT
MCT001,202401,,30
MCT001,202402,n/a,30
";
    let sources = write_sources("undefined", MERCHANTS_CSV, usage, MONTHLY_CSV);
    let merged = load_merged(&sources).unwrap();

    let cmp = compare_merchant(&merged, "MCT001").unwrap();
    assert_eq!(cmp.merchant.delivery_rate, None);
    assert_eq!(cmp.population.delivery_rate, None);

    let analysis = MerchantAnalysis::new(cmp, Vec::new());
    assert_eq!(analysis.summary[0].value.display(), "N/A");
}

#[test]
fn test_analysis_serializes_for_presentation() -> anyhow::Result<()> {
    let sources = write_sources("serialize", MERCHANTS_CSV, USAGE_CSV, MONTHLY_CSV);
    let cache = DatasetCache::new();
    let pipeline = PlaybookPipeline::with_cache(config_for(sources), &cache);

    let outcome = pipeline.analyze("MCT001", &mut first_marker)?;
    let json = serde_json::to_value(&outcome)?;

    assert_eq!(json["status"], "ready");
    assert_eq!(json["comparison"]["code"], "MCT001");
    assert_eq!(json["prompts"][0]["kind"], "cafe");
    Ok(())
}


#[test]
fn test_empty_source_file_is_parse_error() {
    let sources = write_sources("empty", "", USAGE_CSV, MONTHLY_CSV);
    let cache = DatasetCache::new();
    let pipeline = PlaybookPipeline::with_cache(config_for(sources.clone()), &cache);

    match pipeline.analyze("MCT001", &mut first_marker) {
        Err(PlaybookError::Parse { path, .. }) => assert_eq!(path, sources.merchants),
        other => panic!("expected Parse, got {:?}", other),
    }
    assert_eq!(cache.load_count(), 0);
}
