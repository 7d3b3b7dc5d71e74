use crate::schema::{MetricSummary, StrategyKind, StrategyPrompt};
use crate::utils::format_rate;
use log::debug;
use rand::rngs::ThreadRng;
use rand::seq::SliceRandom;
use rand::{thread_rng, Rng};

pub const CAFE_KEYWORDS: [&str; 2] = ["카페", "커피"];
pub const FOOD_KEYWORDS: [&str; 7] = ["한식", "분식", "양식", "중식", "일식", "요리", "식당"];

/// Supplies the decorative marker for a template body.
pub trait MarkerChooser {
    fn choose(&mut self, markers: &'static [&'static str]) -> &'static str;
}

impl<F> MarkerChooser for F
where
    F: FnMut(&'static [&'static str]) -> &'static str,
{
    fn choose(&mut self, markers: &'static [&'static str]) -> &'static str {
        self(markers)
    }
}

/// Uniformly random markers.
pub struct RandomMarkers<R = ThreadRng> {
    rng: R,
}

impl RandomMarkers<ThreadRng> {
    pub fn new() -> Self {
        Self { rng: thread_rng() }
    }
}

impl Default for RandomMarkers<ThreadRng> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Rng> RandomMarkers<R> {
    pub fn with_rng(rng: R) -> Self {
        Self { rng }
    }
}

impl<R: Rng> MarkerChooser for RandomMarkers<R> {
    fn choose(&mut self, markers: &'static [&'static str]) -> &'static str {
        markers.choose(&mut self.rng).copied().unwrap_or_default()
    }
}

fn below(value: Option<f64>, baseline: Option<f64>) -> bool {
    matches!((value, baseline), (Some(v), Some(b)) if v < b)
}

fn above(value: Option<f64>, baseline: Option<f64>) -> bool {
    matches!((value, baseline), (Some(v), Some(b)) if v > b)
}

pub fn is_cafe(store_type: &str) -> bool {
    CAFE_KEYWORDS.iter().any(|k| store_type.contains(k))
}

pub fn is_food_service(store_type: &str) -> bool {
    FOOD_KEYWORDS.iter().any(|k| store_type.contains(k))
}

/// Evaluates every condition independently, in fixed order:
/// cafe, revisit recovery, food service, delivery uplift, youth SNS.
/// An undefined rate never satisfies a comparison.
pub fn select_strategies<M: MarkerChooser>(
    merchant: &MetricSummary,
    population: &MetricSummary,
    markers: &mut M,
) -> Vec<StrategyPrompt> {
    let mut prompts = Vec::new();

    if is_cafe(&merchant.store_type) {
        prompts.push(render(StrategyKind::Cafe, merchant, population, markers));
    }
    if below(merchant.revisit, population.revisit) {
        prompts.push(render(
            StrategyKind::RevisitRecovery,
            merchant,
            population,
            markers,
        ));
    }
    if is_food_service(&merchant.store_type) {
        prompts.push(render(
            StrategyKind::FoodService,
            merchant,
            population,
            markers,
        ));
    }
    if below(merchant.delivery_rate, population.delivery_rate) {
        prompts.push(render(
            StrategyKind::DeliveryUplift,
            merchant,
            population,
            markers,
        ));
    }
    if above(merchant.young_rate, population.young_rate) {
        prompts.push(render(StrategyKind::YouthSns, merchant, population, markers));
    }

    debug!(
        "Selected strategies: {:?}",
        prompts.iter().map(|p| p.kind).collect::<Vec<_>>()
    );
    prompts
}

pub fn render<M: MarkerChooser>(
    kind: StrategyKind,
    merchant: &MetricSummary,
    population: &MetricSummary,
    markers: &mut M,
) -> StrategyPrompt {
    let marker = markers.choose(kind.marker_category().markers());
    let body = template_body(kind, marker, merchant, population);
    let title = body
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .unwrap_or_default()
        .to_string();

    StrategyPrompt { kind, title, body }
}

fn template_body(
    kind: StrategyKind,
    marker: &str,
    merchant: &MetricSummary,
    population: &MetricSummary,
) -> String {
    match kind {
        StrategyKind::Cafe => format!(
            "[☕ 카페 업종 마케팅 전략]\n\
             {marker} 당신은 **카페 전문 AI 마케팅 참모**입니다.\n\
             - 업종: {store_type}\n\
             - 재방문율: {revisit}%\n\
             - 주 고객층: {young}%\n\
             \n\
             **전략 제안**\n\
             1️⃣ '스터디로그 챌린지' : 공부/노트 인증 시 무료 쿠폰 제공\n\
             2️⃣ 'OOTD 콘테스트' : 포토존 릴스 중 최다 좋아요에 상품\n\
             3️⃣ 날씨 기반 추천 음료 시스템 운영\n",
            store_type = merchant.store_type,
            revisit = format_rate(merchant.revisit),
            young = format_rate(merchant.young_rate),
        ),
        StrategyKind::RevisitRecovery => format!(
            "[🔁 재방문율 개선 전략]\n\
             {marker} 현재 재방문율 {revisit}%가 평균({avg_revisit}%)보다 낮습니다.\n\
             **빠른 회복 전략 제안**\n\
             - 7일 이내 재방문 고객 대상 100% 당첨 쿠폰\n\
             - 스탬프 적립 5회 시 추가 적립 제공\n\
             - 재방문 고객 전용 톡 채널 운영\n",
            revisit = format_rate(merchant.revisit),
            avg_revisit = format_rate(population.revisit),
        ),
        StrategyKind::FoodService => format!(
            "[🍱 요식업 매출 전략]\n\
             {marker} 업종: {store_type}\n\
             **추천 전략**\n\
             1️⃣ 배달 메뉴 차별화 (대표메뉴 세트화)\n\
             2️⃣ 점심 구독권 프로모션\n\
             3️⃣ 리뷰 작성 시 즉시 할인 쿠폰 발급\n",
            store_type = merchant.store_type,
        ),
        StrategyKind::DeliveryUplift => format!(
            "[🚚 배달 매출 향상 전략]\n\
             {marker} 현재 배달 매출 {delivery}% (평균 {avg_delivery}%)\n\
             - 더운 날씨엔 냉음료 세트, 추운 날엔 국물 메뉴 중심 쿠폰 자동 발행\n\
             - 지역 이벤트 시 '방구석 응원 세트' 노출\n\
             - 배달비 프로모션 자동화 시스템 적용\n",
            delivery = format_rate(merchant.delivery_rate),
            avg_delivery = format_rate(population.delivery_rate),
        ),
        StrategyKind::YouthSns => format!(
            "[📱 2030 고객 중심 SNS 홍보 전략]\n\
             {marker} 20~30대 고객 비중 {young}% (평균 {avg_young}%)\n\
             - 인스타/틱톡 기반 ‘날씨형 릴스 콘텐츠’ 제작\n\
             - 해시태그 챌린지 운영 ('#오늘의한잔', '#나의출근브이로그')\n\
             - SNS 반응률 10% ↑ 시 방문전환율 약 8% 상승 예상\n",
            young = format_rate(merchant.young_rate),
            avg_young = format_rate(population.young_rate),
        ),
    }
}
