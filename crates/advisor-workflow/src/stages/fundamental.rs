//! Fundamental scoring against sector benchmarks

use crate::config::WorkflowConfig;
use crate::snapshot::DataSnapshot;
use advisor_core::CompanyProfile;
use serde::Serialize;
use std::collections::BTreeMap;

const STRENGTH_WORDS: [&str; 5] = ["strong", "excellent", "attractive", "low debt", "discount"];
const CONCERN_WORDS: [&str; 6] = ["weak", "poor", "concern", "high", "declining", "negative"];
const MAX_HIGHLIGHTS: usize = 5;

/// Typical ratios for a sector
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SectorBenchmark {
    pub pe_ratio: f64,
    pub profit_margin: f64,
    pub roe: f64,
    pub debt_to_equity: f64,
}

impl SectorBenchmark {
    const fn new(pe_ratio: f64, profit_margin: f64, roe: f64, debt_to_equity: f64) -> Self {
        Self {
            pe_ratio,
            profit_margin,
            roe,
            debt_to_equity,
        }
    }

    /// Benchmark for `sector`, falling back to a broad-market default
    pub fn for_sector(sector: Option<&str>) -> Self {
        match sector.unwrap_or_default() {
            "Technology" => Self::new(25.0, 0.15, 0.18, 0.5),
            "Healthcare" => Self::new(20.0, 0.12, 0.15, 0.6),
            "Financial Services" => Self::new(12.0, 0.20, 0.12, 2.0),
            "Consumer Cyclical" => Self::new(18.0, 0.08, 0.15, 0.8),
            "Communication Services" => Self::new(20.0, 0.12, 0.10, 0.7),
            "Industrials" => Self::new(18.0, 0.08, 0.12, 0.9),
            "Consumer Defensive" => Self::new(20.0, 0.06, 0.15, 0.7),
            "Energy" => Self::new(10.0, 0.08, 0.10, 0.5),
            "Utilities" => Self::new(15.0, 0.10, 0.08, 1.2),
            "Real Estate" => Self::new(30.0, 0.25, 0.05, 1.0),
            "Basic Materials" => Self::new(12.0, 0.08, 0.10, 0.6),
            _ => Self::new(18.0, 0.10, 0.12, 0.8),
        }
    }
}

/// Label, normalized score in [-1, 1] and the reasons behind it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Assessment {
    pub assessment: &'static str,
    pub score: f64,
    pub reasons: Vec<String>,
}

impl Assessment {
    fn new(assessment: &'static str, raw_score: i32, reasons: Vec<String>) -> Self {
        Self {
            assessment,
            score: (f64::from(raw_score) / 3.0).clamp(-1.0, 1.0),
            reasons,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Valuation {
    pub pe_ratio: Option<f64>,
    pub forward_pe: Option<f64>,
    pub peg_ratio: Option<f64>,
    pub price_to_book: Option<f64>,
    #[serde(flatten)]
    pub assessment: Assessment,
}

#[derive(Debug, Clone, Serialize)]
pub struct Profitability {
    pub profit_margin: Option<f64>,
    pub operating_margin: Option<f64>,
    pub roe: Option<f64>,
    #[serde(flatten)]
    pub assessment: Assessment,
}

#[derive(Debug, Clone, Serialize)]
pub struct Growth {
    pub revenue_growth: Option<f64>,
    pub earnings_growth: Option<f64>,
    #[serde(flatten)]
    pub assessment: Assessment,
}

#[derive(Debug, Clone, Serialize)]
pub struct FinancialHealth {
    pub debt_to_equity: Option<f64>,
    pub current_ratio: Option<f64>,
    #[serde(flatten)]
    pub assessment: Assessment,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Consensus {
    Buy,
    Hold,
    Sell,
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalystConsensus {
    pub consensus: Consensus,
    pub buy_pct: Option<f64>,
    pub count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FundamentalOutlook {
    Positive,
    Neutral,
    Negative,
}

impl FundamentalOutlook {
    pub fn from_score(score: f64) -> Self {
        if score > 0.3 {
            Self::Positive
        } else if score > -0.3 {
            Self::Neutral
        } else {
            Self::Negative
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            Self::Positive => "positive",
            Self::Neutral => "neutral",
            Self::Negative => "negative",
        }
    }
}

/// Fundamental picture for one company
#[derive(Debug, Clone, Serialize)]
pub struct CompanyFundamentals {
    pub name: Option<String>,
    pub sector: String,
    pub industry: Option<String>,
    pub market_cap: Option<f64>,
    pub valuation: Valuation,
    pub profitability: Profitability,
    pub growth: Growth,
    pub financial_health: FinancialHealth,
    pub analyst_sentiment: AnalystConsensus,
    pub overall_score: f64,
    pub key_strengths: Vec<String>,
    pub key_concerns: Vec<String>,
    pub fair_value_assessment: String,
}

/// Output of the fundamental stage
#[derive(Debug, Clone, Serialize)]
pub struct FundamentalReport {
    pub symbols: BTreeMap<String, CompanyFundamentals>,
    pub skipped_crypto: Vec<String>,
    /// Stock symbols without a collected company profile
    pub missing_profiles: Vec<String>,
    pub outlook: Option<FundamentalOutlook>,
    pub summary: String,
}

/// Score every requested stock that has a company profile
///
/// Crypto symbols are skipped; the stage never fails.
pub fn analyze(snapshot: &DataSnapshot, config: &WorkflowConfig) -> FundamentalReport {
    let (crypto, stocks): (Vec<&String>, Vec<&String>) =
        snapshot.symbols.iter().partition(|s| config.is_crypto(s));

    let mut symbols = BTreeMap::new();
    let mut missing_profiles = Vec::new();
    for symbol in &stocks {
        match snapshot.companies.get(symbol.as_str()) {
            Some(profile) => {
                symbols.insert((*symbol).clone(), analyze_company(profile));
            }
            None => missing_profiles.push((*symbol).clone()),
        }
    }

    let outlook = if symbols.is_empty() {
        None
    } else {
        let total: f64 = symbols.values().map(|c| c.overall_score).sum();
        Some(FundamentalOutlook::from_score(total / symbols.len() as f64))
    };

    let summary = match outlook {
        _ if stocks.is_empty() => "No stocks to analyze for fundamentals".to_string(),
        Some(outlook) => format!(
            "Fundamental analysis complete. Overall outlook: {}. Analyzed {} stocks.",
            outlook.as_str(),
            symbols.len()
        ),
        None => "No stocks successfully analyzed.".to_string(),
    };

    FundamentalReport {
        symbols,
        skipped_crypto: crypto.into_iter().cloned().collect(),
        missing_profiles,
        outlook,
        summary,
    }
}

pub fn analyze_company(profile: &CompanyProfile) -> CompanyFundamentals {
    let benchmark = SectorBenchmark::for_sector(profile.sector.as_deref());
    let valuation = assess_valuation(profile, &benchmark);
    let profitability = assess_profitability(profile, &benchmark);
    let growth = assess_growth(profile);
    let financial_health = assess_health(profile, &benchmark);
    let analyst_sentiment = analyst_consensus(&profile.analyst_grades);

    let mut overall_score = valuation.assessment.score * 0.25
        + profitability.assessment.score * 0.25
        + growth.assessment.score * 0.25
        + financial_health.assessment.score * 0.15;
    match analyst_sentiment.consensus {
        Consensus::Buy => overall_score += 0.10,
        Consensus::Sell => overall_score -= 0.10,
        Consensus::Hold | Consensus::Unknown => {}
    }

    let reasons = [
        &valuation.assessment,
        &profitability.assessment,
        &growth.assessment,
        &financial_health.assessment,
    ]
    .into_iter()
    .flat_map(|a| a.reasons.iter());
    let (key_strengths, key_concerns) = highlights(reasons);

    CompanyFundamentals {
        name: profile.name.clone(),
        sector: profile.sector.clone().unwrap_or_else(|| "Unknown".to_string()),
        industry: profile.industry.clone(),
        market_cap: profile.market_cap,
        fair_value_assessment: fair_value_note(overall_score, valuation.assessment.assessment),
        valuation,
        profitability,
        growth,
        financial_health,
        analyst_sentiment,
        overall_score,
        key_strengths,
        key_concerns,
    }
}

fn assess_valuation(profile: &CompanyProfile, benchmark: &SectorBenchmark) -> Valuation {
    let mut score = 0;
    let mut reasons = Vec::new();

    if let Some(pe) = profile.pe_ratio {
        let relative = if benchmark.pe_ratio == 0.0 {
            1.0
        } else {
            pe / benchmark.pe_ratio
        };
        if relative < 0.8 {
            score += 2;
            reasons.push("Trading at discount to sector".to_string());
        } else if relative < 1.2 {
            score += 1;
            reasons.push("P/E in line with sector".to_string());
        } else {
            score -= 1;
            reasons.push("Premium valuation vs sector".to_string());
        }
    }

    if let Some(peg) = profile.peg_ratio {
        if peg < 1.0 {
            score += 2;
            reasons.push("Attractive PEG ratio".to_string());
        } else if peg < 2.0 {
            score += 1;
        } else {
            score -= 1;
            reasons.push("High PEG suggests overvaluation".to_string());
        }
    }

    let nonzero = |v: Option<f64>| v.filter(|x| *x != 0.0);
    if let (Some(forward), Some(trailing)) = (nonzero(profile.forward_pe), nonzero(profile.pe_ratio)) {
        if forward < trailing * 0.85 {
            score += 1;
            reasons.push("Earnings expected to grow".to_string());
        } else if forward > trailing * 1.15 {
            score -= 1;
            reasons.push("Earnings expected to decline".to_string());
        }
    }

    let label = if score >= 3 {
        "undervalued"
    } else if score >= 1 {
        "fair"
    } else {
        "overvalued"
    };

    Valuation {
        pe_ratio: profile.pe_ratio,
        forward_pe: profile.forward_pe,
        peg_ratio: profile.peg_ratio,
        price_to_book: profile.price_to_book,
        assessment: Assessment::new(label, score, reasons),
    }
}

fn assess_profitability(profile: &CompanyProfile, benchmark: &SectorBenchmark) -> Profitability {
    let mut score = 0;
    let mut reasons = Vec::new();

    if let Some(margin) = profile.profit_margin {
        if margin > benchmark.profit_margin * 1.3 {
            score += 2;
            reasons.push("Strong profit margins".to_string());
        } else if margin > benchmark.profit_margin * 0.8 {
            score += 1;
            reasons.push("Adequate profit margins".to_string());
        } else {
            score -= 1;
            reasons.push("Below-average profit margins".to_string());
        }
    }

    if let Some(roe) = profile.roe {
        if roe > 0.20 {
            score += 2;
            reasons.push("Excellent return on equity".to_string());
        } else if roe > 0.10 {
            score += 1;
        } else if roe <= 0.0 {
            score -= 2;
            reasons.push("Negative ROE is concerning".to_string());
        }
    }

    let label = match score {
        s if s >= 3 => "excellent",
        2 => "good",
        s if s >= 0 => "average",
        _ => "poor",
    };

    Profitability {
        profit_margin: profile.profit_margin,
        operating_margin: profile.operating_margin,
        roe: profile.roe,
        assessment: Assessment::new(label, score, reasons),
    }
}

fn assess_growth(profile: &CompanyProfile) -> Growth {
    let mut score = 0;
    let mut reasons = Vec::new();

    if let Some(revenue) = profile.revenue_growth {
        if revenue > 0.20 {
            score += 2;
            reasons.push("Strong revenue growth".to_string());
        } else if revenue > 0.10 {
            score += 1;
            reasons.push("Moderate revenue growth".to_string());
        } else if revenue <= 0.0 {
            score -= 1;
            reasons.push("Revenue declining".to_string());
        }
    }

    if let Some(earnings) = profile.earnings_growth {
        if earnings > 0.25 {
            score += 2;
            reasons.push("Strong earnings growth".to_string());
        } else if earnings > 0.10 {
            score += 1;
        } else if earnings <= 0.0 {
            score -= 1;
            reasons.push("Earnings declining".to_string());
        }
    }

    let label = match score {
        s if s >= 3 => "high",
        s if s >= 1 => "moderate",
        0 => "low",
        _ => "negative",
    };

    Growth {
        revenue_growth: profile.revenue_growth,
        earnings_growth: profile.earnings_growth,
        assessment: Assessment::new(label, score, reasons),
    }
}

fn assess_health(profile: &CompanyProfile, benchmark: &SectorBenchmark) -> FinancialHealth {
    let mut score = 0;
    let mut reasons = Vec::new();

    if let Some(de) = profile.debt_to_equity {
        if de < benchmark.debt_to_equity * 0.5 {
            score += 2;
            reasons.push("Low debt levels".to_string());
        } else if de < benchmark.debt_to_equity * 1.5 {
            score += 1;
            reasons.push("Manageable debt".to_string());
        } else {
            score -= 1;
            reasons.push("High debt levels".to_string());
        }
    }

    if let Some(ratio) = profile.current_ratio {
        if ratio > 2.0 {
            score += 2;
            reasons.push("Strong liquidity position".to_string());
        } else if ratio > 1.0 {
            score += 1;
            reasons.push("Adequate liquidity".to_string());
        } else {
            score -= 2;
            reasons.push("Liquidity concerns".to_string());
        }
    }

    let label = if score >= 3 {
        "strong"
    } else if score >= 1 {
        "adequate"
    } else {
        "weak"
    };

    FinancialHealth {
        debt_to_equity: profile.debt_to_equity,
        current_ratio: profile.current_ratio,
        assessment: Assessment::new(label, score, reasons),
    }
}

/// Buy/hold/sell consensus from free-text analyst grades
pub fn analyst_consensus(grades: &[String]) -> AnalystConsensus {
    if grades.is_empty() {
        return AnalystConsensus {
            consensus: Consensus::Unknown,
            buy_pct: None,
            count: 0,
        };
    }

    let (mut buy, mut hold, mut sell) = (0usize, 0usize, 0usize);
    for grade in grades {
        let grade = grade.to_lowercase();
        if ["buy", "outperform", "overweight"].iter().any(|w| grade.contains(w)) {
            buy += 1;
        } else if ["sell", "underperform", "underweight"].iter().any(|w| grade.contains(w)) {
            sell += 1;
        } else {
            hold += 1;
        }
    }

    let consensus = if buy > hold + sell {
        Consensus::Buy
    } else if sell > buy + hold {
        Consensus::Sell
    } else {
        Consensus::Hold
    };

    AnalystConsensus {
        consensus,
        buy_pct: Some(buy as f64 / grades.len() as f64 * 100.0),
        count: grades.len(),
    }
}

fn highlights<'a>(reasons: impl Iterator<Item = &'a String>) -> (Vec<String>, Vec<String>) {
    let mut strengths = Vec::new();
    let mut concerns = Vec::new();
    for reason in reasons {
        let lower = reason.to_lowercase();
        if STRENGTH_WORDS.iter().any(|w| lower.contains(w)) {
            strengths.push(reason.clone());
        } else if CONCERN_WORDS.iter().any(|w| lower.contains(w)) {
            concerns.push(reason.clone());
        }
    }
    strengths.truncate(MAX_HIGHLIGHTS);
    concerns.truncate(MAX_HIGHLIGHTS);
    (strengths, concerns)
}

fn fair_value_note(overall_score: f64, valuation: &str) -> String {
    let base = if overall_score > 0.5 {
        "Fundamentals are strong."
    } else if overall_score > 0.0 {
        "Fundamentals are adequate."
    } else {
        "Fundamentals show weakness."
    };
    let relative = match valuation {
        "undervalued" => "attractive",
        "overvalued" => "stretched",
        _ => "fair",
    };
    format!("{base} Current valuation appears {relative} relative to fundamentals.")
}

#[cfg(test)]
mod tests {
    use super::*;
    use advisor_core::TimeHorizon;

    fn quality_tech() -> CompanyProfile {
        CompanyProfile {
            name: Some("Quality Tech".to_string()),
            sector: Some("Technology".to_string()),
            pe_ratio: Some(18.0),
            forward_pe: Some(14.0),
            peg_ratio: Some(0.9),
            profit_margin: Some(0.25),
            roe: Some(0.30),
            revenue_growth: Some(0.22),
            earnings_growth: Some(0.30),
            debt_to_equity: Some(0.2),
            current_ratio: Some(2.5),
            analyst_grades: vec!["Buy".into(), "Outperform".into(), "Hold".into()],
            ..Default::default()
        }
    }

    fn struggling_utility() -> CompanyProfile {
        CompanyProfile {
            sector: Some("Utilities".to_string()),
            pe_ratio: Some(30.0),
            forward_pe: Some(40.0),
            peg_ratio: Some(3.5),
            profit_margin: Some(0.02),
            roe: Some(-0.05),
            revenue_growth: Some(-0.04),
            earnings_growth: Some(-0.10),
            debt_to_equity: Some(2.5),
            current_ratio: Some(0.8),
            analyst_grades: vec!["Sell".into(), "Underweight".into()],
            ..Default::default()
        }
    }

    #[test]
    fn test_strong_company_scores_high() {
        let result = analyze_company(&quality_tech());

        assert_eq!(result.valuation.assessment.assessment, "undervalued");
        assert_eq!(result.valuation.assessment.score, 1.0);
        assert_eq!(result.profitability.assessment.assessment, "excellent");
        assert_eq!(result.growth.assessment.assessment, "high");
        assert_eq!(result.financial_health.assessment.assessment, "strong");
        assert_eq!(result.analyst_sentiment.consensus, Consensus::Buy);

        // 0.25 * 3 + 0.15 + 0.10
        assert!((result.overall_score - 1.0).abs() < 1e-12);
        assert_eq!(result.key_strengths.len(), MAX_HIGHLIGHTS);
        assert!(result.key_concerns.is_empty());
        assert_eq!(
            result.fair_value_assessment,
            "Fundamentals are strong. Current valuation appears attractive relative to fundamentals."
        );
    }

    #[test]
    fn test_weak_company_scores_low() {
        let result = analyze_company(&struggling_utility());

        assert_eq!(result.valuation.assessment.assessment, "overvalued");
        assert_eq!(result.profitability.assessment.assessment, "poor");
        assert_eq!(result.growth.assessment.assessment, "negative");
        assert_eq!(result.financial_health.assessment.assessment, "weak");
        assert_eq!(result.analyst_sentiment.consensus, Consensus::Sell);
        assert!(result.overall_score < -0.3);
        assert!(result.key_concerns.contains(&"High debt levels".to_string()));
        assert!(result.fair_value_assessment.contains("stretched"));
    }

    #[test]
    fn test_analyst_consensus() {
        let none = analyst_consensus(&[]);
        assert_eq!(none.consensus, Consensus::Unknown);
        assert!(none.buy_pct.is_none());

        let split = analyst_consensus(&["Buy".into(), "Sell".into(), "Neutral".into()]);
        assert_eq!(split.consensus, Consensus::Hold);
        assert_eq!(split.count, 3);
        assert!((split.buy_pct.unwrap() - 100.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_unknown_sector_uses_default_benchmark() {
        assert_eq!(
            SectorBenchmark::for_sector(Some("Aerospace")),
            SectorBenchmark::for_sector(None)
        );
        assert_eq!(SectorBenchmark::for_sector(Some("Energy")).pe_ratio, 10.0);
    }

    #[test]
    fn test_stage_skips_crypto_and_reports_missing() {
        let mut snapshot = DataSnapshot::new(
            vec!["AAPL".into(), "BTC".into(), "XOM".into()],
            TimeHorizon::Medium,
        );
        snapshot.companies.insert("AAPL".into(), quality_tech());

        let report = analyze(&snapshot, &WorkflowConfig::default());
        assert_eq!(report.skipped_crypto, vec!["BTC"]);
        assert_eq!(report.missing_profiles, vec!["XOM"]);
        assert_eq!(report.outlook, Some(FundamentalOutlook::Positive));
        assert!(report.summary.contains("Analyzed 1 stocks"));

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["symbols"]["AAPL"]["valuation"]["assessment"], "undervalued");
        assert!(json["symbols"]["AAPL"]["valuation"]["reasons"].is_array());
    }

    #[test]
    fn test_crypto_only_request() {
        let snapshot = DataSnapshot::new(vec!["BTC".into(), "ETH".into()], TimeHorizon::Short);
        let report = analyze(&snapshot, &WorkflowConfig::default());
        assert!(report.symbols.is_empty());
        assert!(report.outlook.is_none());
        assert_eq!(report.summary, "No stocks to analyze for fundamentals");
    }
}
