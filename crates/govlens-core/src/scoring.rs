//! Credit-default scoring: input checks, risk bands and a text gauge.

use std::fmt;

use govlens_api::{ScoringClient, ScoringFeatures};
use serde::{Deserialize, Serialize};

use crate::error::{GovlensError, Result};
use crate::obs;

/// Valid range of a repayment status (`-1` = paid duly, `1..=9` = months late)
pub const PAY_RANGE: std::ops::RangeInclusive<i64> = -1..=9;
/// Valid applicant age
pub const AGE_RANGE: std::ops::RangeInclusive<i64> = 20..=115;

/// Lower bound of [`RiskBand::RepaymentLikely`]
pub const REPAYMENT_LIKELY_THRESHOLD: f64 = 0.6;
/// Lower bound of [`RiskBand::Level1Outreach`]
pub const LEVEL1_THRESHOLD: f64 = 0.4;

const GAUGE_WIDTH: usize = 40;

/// One credit application as entered by the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreInput {
    pub pay_0: i64,
    pub pay_2: i64,
    pub pay_3: i64,
    pub pay_4: i64,
    pub limit_bal: i64,
    pub bill_amt1: i64,
    /// Checked and echoed back; the model does not use it
    pub age: i64,
}

impl ScoreInput {
    pub fn validate(&self) -> Result<()> {
        for (field, value) in [
            ("pay_0", self.pay_0),
            ("pay_2", self.pay_2),
            ("pay_3", self.pay_3),
            ("pay_4", self.pay_4),
        ] {
            check(field, value, PAY_RANGE.contains(&value), "-1..=9")?;
        }
        check("limit_bal", self.limit_bal, self.limit_bal >= 0, ">= 0")?;
        check("bill_amt1", self.bill_amt1, self.bill_amt1 >= 0, ">= 0")?;
        check("age", self.age, AGE_RANGE.contains(&self.age), "20..=115")
    }

    /// Model features, in the model's column naming.
    pub fn to_features(&self) -> ScoringFeatures {
        ScoringFeatures {
            pay_0: self.pay_0,
            pay_2: self.pay_2,
            pay_3: self.pay_3,
            pay_4: self.pay_4,
            limit_bal: self.limit_bal,
            bill_amt1: self.bill_amt1,
        }
    }
}

fn check(field: &'static str, value: i64, ok: bool, expected: &'static str) -> Result<()> {
    if ok {
        Ok(())
    } else {
        Err(GovlensError::InvalidScoreInput {
            field,
            value,
            expected,
        })
    }
}

/// Risk classification of a repayment probability
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskBand {
    RepaymentLikely,
    Level1Outreach,
    Level2Outreach,
}

impl RiskBand {
    /// Band of repayment probability `p`; `p` must lie in `[0, 1]`.
    pub fn classify(p: f64) -> Result<Self> {
        if !(0.0..=1.0).contains(&p) {
            return Err(GovlensError::InvalidProbability(p));
        }
        Ok(if p >= REPAYMENT_LIKELY_THRESHOLD {
            Self::RepaymentLikely
        } else if p >= LEVEL1_THRESHOLD {
            Self::Level1Outreach
        } else {
            Self::Level2Outreach
        })
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::RepaymentLikely => "REPAYMENT LIKELY",
            Self::Level1Outreach => "RISK OF DEFAULT - LEVEL 1 OUTREACH",
            Self::Level2Outreach => "HIGH RISK OF DEFAULT - LEVEL 2 OUTREACH",
        }
    }
}

impl fmt::Display for RiskBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Scored application
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreOutcome {
    pub input: ScoreInput,
    pub probability: f64,
    pub band: RiskBand,
}

impl ScoreOutcome {
    pub fn render_text(&self) -> String {
        format!(
            "{}\n\nRepayment probability: {:.2}\nClassification: {}\nApplicant age: {}\n",
            render_gauge(self.probability),
            self.probability,
            self.band,
            self.input.age
        )
    }
}

/// Two-line gauge: the three bands as shaded cells, then a `^` under `p`.
///
/// `░` is level 2 outreach, `▒` level 1, `▓` repayment likely. `p` is
/// clamped to `[0, 1]`.
pub fn render_gauge(p: f64) -> String {
    let p = p.clamp(0.0, 1.0);
    let level1_at = cell(LEVEL1_THRESHOLD);
    let likely_at = cell(REPAYMENT_LIKELY_THRESHOLD);

    let bar: String = (0..GAUGE_WIDTH)
        .map(|i| match i {
            i if i < level1_at => '░',
            i if i < likely_at => '▒',
            _ => '▓',
        })
        .collect();
    let marker_at = cell(p).min(GAUGE_WIDTH - 1);

    format!(
        "0 [{bar}] 1\n   {}^ {p:.2}",
        " ".repeat(marker_at)
    )
}

fn cell(p: f64) -> usize {
    // p is within [0, 1], so the product fits.
    (p * GAUGE_WIDTH as f64).round() as usize
}

/// Validate `input`, score it remotely and classify the result.
pub async fn score_application(client: &ScoringClient, input: &ScoreInput) -> Result<ScoreOutcome> {
    input.validate()?;
    let probability = client.score(&input.to_features()).await?;
    let band = RiskBand::classify(probability)?;
    obs::emit_application_scored(probability, band.label());
    Ok(ScoreOutcome {
        input: *input,
        probability,
        band,
    })
}
