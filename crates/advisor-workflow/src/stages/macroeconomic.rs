//! Rule-based macroeconomic assessment

use crate::snapshot::DataSnapshot;
use advisor_analytics::{Confidence, SignalDirection};
use advisor_core::{MacroSnapshot, TimeHorizon};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CyclePhase {
    Expansion,
    Peak,
    Trough,
    Contraction,
}

impl CyclePhase {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Expansion => "expansion",
            Self::Peak => "peak",
            Self::Trough => "trough",
            Self::Contraction => "contraction",
        }
    }

    /// Sectors that historically lead in this phase
    pub fn favored_sectors(self) -> [&'static str; 3] {
        match self {
            Self::Expansion => ["Technology", "Consumer Discretionary", "Industrials"],
            Self::Peak => ["Energy", "Materials", "Financials"],
            Self::Contraction => ["Utilities", "Consumer Staples", "Healthcare"],
            Self::Trough => ["Financials", "Real Estate", "Consumer Discretionary"],
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct EconomicCycle {
    pub phase: CyclePhase,
    pub confidence: Confidence,
    pub evidence: Vec<String>,
    pub outlook_months: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PolicyStance {
    Hawkish,
    Neutral,
    Dovish,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Rising,
    Stable,
    Falling,
    Unknown,
}

#[derive(Debug, Clone, Serialize)]
pub struct MonetaryPolicy {
    pub stance: PolicyStance,
    pub fed_funds_rate: Option<f64>,
    pub real_rate: Option<f64>,
    pub rate_outlook: Trend,
    pub treasury_10y: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct InflationView {
    pub trend: Trend,
    pub current_rate: Option<f64>,
    pub outlook: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GrowthTrend {
    Accelerating,
    Stable,
    Decelerating,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Employment {
    Strong,
    Moderate,
    Weak,
    Unknown,
}

#[derive(Debug, Clone, Serialize)]
pub struct GrowthView {
    pub gdp_trend: GrowthTrend,
    pub gdp_growth: Option<f64>,
    pub employment: Employment,
    pub unemployment: Option<f64>,
    pub consumer_outlook: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RiskAppetite {
    #[serde(rename = "risk-on")]
    RiskOn,
    #[serde(rename = "neutral")]
    Neutral,
    #[serde(rename = "risk-off")]
    RiskOff,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VixLevel {
    Low,
    Moderate,
    Elevated,
    High,
    Unknown,
}

#[derive(Debug, Clone, Serialize)]
pub struct MarketConditions {
    pub risk_appetite: RiskAppetite,
    pub vix_level: VixLevel,
    pub vix_value: Option<f64>,
    pub sentiment: SignalDirection,
    pub sp500_pe: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Outlook {
    Favorable,
    Neutral,
    Unfavorable,
}

impl Outlook {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Favorable => "favorable",
            Self::Neutral => "neutral",
            Self::Unfavorable => "unfavorable",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AssetOutlook {
    pub outlook: Outlook,
    pub score: i32,
}

#[derive(Debug, Clone, Serialize)]
pub struct AssetImplications {
    pub stocks: AssetOutlook,
    pub bonds: AssetOutlook,
    pub crypto: AssetOutlook,
    pub recommended_sectors: Vec<String>,
}

/// Output of the macro stage
#[derive(Debug, Clone, Serialize)]
pub struct MacroReport {
    pub economic_cycle: EconomicCycle,
    pub monetary_policy: MonetaryPolicy,
    pub inflation: InflationView,
    pub growth: GrowthView,
    pub market_conditions: MarketConditions,
    pub asset_implications: AssetImplications,
    pub key_risks: Vec<String>,
    pub summary: String,
    pub time_horizon: TimeHorizon,
    pub symbols_analyzed: Vec<String>,
    /// Indicators the assessment was based on
    pub indicators: MacroSnapshot,
}

/// Assess the macro environment from the snapshot's indicators
///
/// Missing indicators degrade individual sections to `unknown`/neutral; the
/// stage itself never fails.
pub fn analyze(snapshot: &DataSnapshot) -> MacroReport {
    let data = &snapshot.macro_indicators;
    let cycle = assess_cycle(data);
    let monetary = assess_monetary_policy(data);
    let inflation = assess_inflation(data);
    let growth = assess_growth(data);
    let market = assess_market(data);
    let assets = assess_assets(&cycle, &monetary, &inflation, &market);
    let key_risks = identify_risks(&cycle, &monetary, &inflation, &market);
    let summary = summarize(&cycle, &assets, &key_risks);

    MacroReport {
        economic_cycle: cycle,
        monetary_policy: monetary,
        inflation,
        growth,
        market_conditions: market,
        asset_implications: assets,
        key_risks,
        summary,
        time_horizon: snapshot.time_horizon,
        symbols_analyzed: snapshot.symbols.clone(),
        indicators: data.clone(),
    }
}

fn indicator(data: &MacroSnapshot, key: &str) -> Option<f64> {
    data.get(key).copied().filter(|v| v.is_finite())
}

pub fn assess_cycle(data: &MacroSnapshot) -> EconomicCycle {
    let gdp = indicator(data, "gdp_growth");
    let unemployment = indicator(data, "unemployment");
    let mut evidence = Vec::new();
    let mut score = 0;

    if let Some(gdp) = gdp {
        if gdp > 3.0 {
            evidence.push(format!("Strong GDP growth at {gdp:.1}%"));
            score += 2;
        } else if gdp > 1.5 {
            evidence.push(format!("Moderate GDP growth at {gdp:.1}%"));
            score += 1;
        } else if gdp > 0.0 {
            evidence.push(format!("Weak GDP growth at {gdp:.1}%"));
        } else {
            evidence.push(format!("GDP contraction at {gdp:.1}%"));
            score -= 2;
        }
    }

    if let Some(rate) = unemployment {
        if rate < 4.0 {
            evidence.push(format!("Low unemployment at {rate:.1}%"));
            score += 1;
        } else if rate < 6.0 {
            evidence.push(format!("Moderate unemployment at {rate:.1}%"));
        } else {
            evidence.push(format!("High unemployment at {rate:.1}%"));
            score -= 1;
        }
    }

    let (phase, outlook_months) = if score >= 2 {
        (CyclePhase::Expansion, 12)
    } else if score >= 0 {
        if gdp.is_some_and(|g| g > 2.0) {
            (CyclePhase::Peak, 6)
        } else {
            (CyclePhase::Trough, 6)
        }
    } else {
        (CyclePhase::Contraction, 9)
    };

    let confidence = match evidence.len() {
        n if n >= 3 => Confidence::High,
        2 => Confidence::Medium,
        _ => Confidence::Low,
    };

    EconomicCycle {
        phase,
        confidence,
        evidence,
        outlook_months,
    }
}

/// Stance from the real policy rate (fed funds minus inflation)
pub fn assess_monetary_policy(data: &MacroSnapshot) -> MonetaryPolicy {
    let treasury_10y = indicator(data, "treasury_10y");
    let Some(fed) = indicator(data, "fed_funds_rate") else {
        return MonetaryPolicy {
            stance: PolicyStance::Unknown,
            fed_funds_rate: None,
            real_rate: None,
            rate_outlook: Trend::Stable,
            treasury_10y,
        };
    };

    let inflation = indicator(data, "inflation");
    let real_rate = fed - inflation.unwrap_or(0.0);

    let (stance, rate_outlook) = if real_rate > 2.0 {
        let outlook = if inflation.is_some_and(|i| i < 3.0) {
            Trend::Stable
        } else {
            Trend::Rising
        };
        (PolicyStance::Hawkish, outlook)
    } else if real_rate > 0.0 {
        (PolicyStance::Neutral, Trend::Stable)
    } else {
        let outlook = if inflation.is_some_and(|i| i < 2.0) {
            Trend::Falling
        } else {
            Trend::Stable
        };
        (PolicyStance::Dovish, outlook)
    };

    MonetaryPolicy {
        stance,
        fed_funds_rate: Some(fed),
        real_rate: Some(real_rate),
        rate_outlook,
        treasury_10y,
    }
}

pub fn assess_inflation(data: &MacroSnapshot) -> InflationView {
    let Some(rate) = indicator(data, "inflation") else {
        return InflationView {
            trend: Trend::Unknown,
            current_rate: None,
            outlook: "Unable to assess without inflation data".to_string(),
        };
    };

    let (trend, outlook) = if rate > 4.0 {
        (
            Trend::Rising,
            "High inflation erodes purchasing power. Consider inflation hedges like commodities, TIPS, or real assets.",
        )
    } else if rate > 2.5 {
        (
            Trend::Stable,
            "Inflation elevated but manageable. Monitor for persistence.",
        )
    } else if rate > 1.5 {
        (
            Trend::Stable,
            "Inflation near target. Supportive of economic growth.",
        )
    } else {
        (
            Trend::Falling,
            "Low inflation may indicate weak demand. Watch for deflation risks.",
        )
    };

    InflationView {
        trend,
        current_rate: Some(rate),
        outlook: outlook.to_string(),
    }
}

pub fn assess_growth(data: &MacroSnapshot) -> GrowthView {
    let gdp = indicator(data, "gdp_growth");
    let unemployment = indicator(data, "unemployment");

    let gdp_trend = match gdp {
        Some(g) if g > 3.0 => GrowthTrend::Accelerating,
        Some(g) if g > 1.0 => GrowthTrend::Stable,
        Some(_) => GrowthTrend::Decelerating,
        None => GrowthTrend::Unknown,
    };

    let (employment, consumer_outlook) = match unemployment {
        Some(u) if u < 4.0 => (
            Employment::Strong,
            "Strong labor market supports consumer spending.",
        ),
        Some(u) if u < 6.0 => (
            Employment::Moderate,
            "Labor market stable but not exceptional.",
        ),
        Some(_) => (
            Employment::Weak,
            "High unemployment may constrain consumer spending.",
        ),
        None => (
            Employment::Unknown,
            "Unable to assess without unemployment data.",
        ),
    };

    GrowthView {
        gdp_trend,
        gdp_growth: gdp,
        employment,
        unemployment,
        consumer_outlook: consumer_outlook.to_string(),
    }
}

pub fn assess_market(data: &MacroSnapshot) -> MarketConditions {
    let vix = indicator(data, "vix");
    let sp500_pe = indicator(data, "sp500_pe");

    let (vix_level, risk_appetite) = match vix {
        Some(v) if v < 15.0 => (VixLevel::Low, RiskAppetite::RiskOn),
        Some(v) if v < 20.0 => (VixLevel::Moderate, RiskAppetite::Neutral),
        Some(v) if v < 30.0 => (VixLevel::Elevated, RiskAppetite::RiskOff),
        Some(_) => (VixLevel::High, RiskAppetite::RiskOff),
        None => (VixLevel::Unknown, RiskAppetite::Neutral),
    };

    // Rich valuations read as optimism, cheap ones as fear
    let sentiment = match sp500_pe {
        Some(pe) if pe > 25.0 => SignalDirection::Bullish,
        Some(pe) if pe > 18.0 => SignalDirection::Neutral,
        Some(_) => SignalDirection::Bearish,
        None => SignalDirection::Neutral,
    };

    MarketConditions {
        risk_appetite,
        vix_level,
        vix_value: vix,
        sentiment,
        sp500_pe,
    }
}

fn outlook_from(score: i32, favorable_at: i32, neutral_at: i32) -> AssetOutlook {
    let outlook = if score >= favorable_at {
        Outlook::Favorable
    } else if score >= neutral_at {
        Outlook::Neutral
    } else {
        Outlook::Unfavorable
    };
    AssetOutlook { outlook, score }
}

fn policy_tilt(stance: PolicyStance) -> i32 {
    match stance {
        PolicyStance::Dovish => 1,
        PolicyStance::Hawkish => -1,
        PolicyStance::Neutral | PolicyStance::Unknown => 0,
    }
}

fn appetite_tilt(appetite: RiskAppetite) -> i32 {
    match appetite {
        RiskAppetite::RiskOn => 1,
        RiskAppetite::RiskOff => -1,
        RiskAppetite::Neutral => 0,
    }
}

fn trend_tilt(trend: Trend) -> i32 {
    match trend {
        Trend::Falling => 1,
        Trend::Rising => -1,
        Trend::Stable | Trend::Unknown => 0,
    }
}

pub fn assess_assets(
    cycle: &EconomicCycle,
    monetary: &MonetaryPolicy,
    inflation: &InflationView,
    market: &MarketConditions,
) -> AssetImplications {
    let cycle_score = match cycle.phase {
        CyclePhase::Expansion => 2,
        CyclePhase::Peak => 1,
        CyclePhase::Trough => 0,
        CyclePhase::Contraction => -2,
    };
    let stocks = cycle_score + policy_tilt(monetary.stance) + appetite_tilt(market.risk_appetite);

    // Bonds move inversely to rates
    let bonds = 2 * trend_tilt(monetary.rate_outlook) + trend_tilt(inflation.trend);

    let crypto = 2 * appetite_tilt(market.risk_appetite) + policy_tilt(monetary.stance);

    AssetImplications {
        stocks: outlook_from(stocks, 2, 0),
        bonds: outlook_from(bonds, 1, -1),
        crypto: outlook_from(crypto, 1, -1),
        recommended_sectors: cycle
            .phase
            .favored_sectors()
            .iter()
            .map(|s| (*s).to_string())
            .collect(),
    }
}

pub fn identify_risks(
    cycle: &EconomicCycle,
    monetary: &MonetaryPolicy,
    inflation: &InflationView,
    market: &MarketConditions,
) -> Vec<String> {
    let mut risks = Vec::new();

    match cycle.phase {
        CyclePhase::Peak => {
            risks.push("Economic cycle may be peaking - watch for slowdown signals".to_string());
        }
        CyclePhase::Contraction => {
            risks.push("Economic contraction underway - recession risk elevated".to_string());
        }
        CyclePhase::Expansion | CyclePhase::Trough => {}
    }

    if monetary.stance == PolicyStance::Hawkish {
        risks.push("Tight monetary policy may constrain growth and valuations".to_string());
    }

    if inflation.trend == Trend::Rising {
        if let Some(rate) = inflation.current_rate.filter(|r| *r > 3.0) {
            risks.push(format!("Elevated inflation at {rate:.1}% may persist"));
        }
    }

    if matches!(market.vix_level, VixLevel::Elevated | VixLevel::High) {
        risks.push("Elevated market volatility indicates uncertainty".to_string());
    }

    if market.sp500_pe.is_some_and(|pe| pe > 25.0) {
        risks.push("High market valuations increase correction risk".to_string());
    }

    if risks.is_empty() {
        risks.push("No significant macro risks identified at this time".to_string());
    }
    risks
}

fn summarize(cycle: &EconomicCycle, assets: &AssetImplications, risks: &[String]) -> String {
    let mut summary = format!(
        "Economy is in {} phase. Stock market outlook is {}. Recommended sectors: {}. ",
        cycle.phase.as_str(),
        assets.stocks.outlook.as_str(),
        assets.recommended_sectors.join(", ")
    );
    if let Some(first) = risks.first() {
        summary.push_str("Key risk: ");
        summary.push_str(first);
    }
    summary
}
