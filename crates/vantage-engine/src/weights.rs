//! Weight and threshold tables for every engine component.
//!
//! One immutable [`EngineConfig`] is built once per compute invocation and
//! passed by reference into each component. Tests override individual tables
//! through struct update syntax instead of patching module globals.
//!
//! Values mirror the production tuning; changing any of them changes ranking
//! output, so the defaults are pinned by tests.

/// Average days per month used when converting runway months to days.
pub const DAYS_PER_MONTH: f64 = 30.44;

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub runway: RunwayThresholds,
    pub freshness: FreshnessThresholds,
    pub pipeline: PipelineThresholds,
    pub preissue: PreIssueThresholds,
    pub cost_of_delay: CostOfDelayTable,
    pub intro: IntroThresholds,
    pub trust: TrustWeights,
    pub timing: TimingWeights,
    pub ranking: RankingWeights,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            runway: RunwayThresholds::default(),
            freshness: FreshnessThresholds::default(),
            pipeline: PipelineThresholds::default(),
            preissue: PreIssueThresholds::default(),
            cost_of_delay: CostOfDelayTable::default(),
            intro: IntroThresholds::default(),
            trust: TrustWeights::default(),
            timing: TimingWeights::default(),
            ranking: RankingWeights::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RunwayThresholds {
    /// Below this many months: RUNWAY_CRITICAL.
    pub critical_months: f64,
    /// Below this many months (and above critical): RUNWAY_WARNING.
    pub warning_months: f64,
    /// Below this many months: a RUNWAY_BREACH pre-issue.
    pub breach_months: f64,
}

impl Default for RunwayThresholds {
    fn default() -> Self {
        Self { critical_months: 6.0, warning_months: 12.0, breach_months: 9.0 }
    }
}

#[derive(Debug, Clone)]
pub struct FreshnessThresholds {
    /// Company financials older than this many days: DATA_STALE.
    pub data_stale_days: f64,
    /// Deals untouched longer than this: DEAL_STALE issue.
    pub deal_stale_days: f64,
    /// Deals untouched longer than this: DEAL_STALL pre-issue.
    pub deal_stall_days: f64,
    /// Staleness at which a stalled deal is considered lost (breach point).
    pub deal_cold_days: f64,
}

impl Default for FreshnessThresholds {
    fn default() -> Self {
        Self {
            data_stale_days: 14.0,
            deal_stale_days: 7.0,
            deal_stall_days: 14.0,
            deal_cold_days: 45.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PipelineThresholds {
    /// Weighted pipeline below this fraction of the round target: PIPELINE_GAP.
    pub coverage_ratio: f64,
    /// Deals below this close probability while in due diligence: DEAL_AT_RISK.
    pub at_risk_probability: f64,
}

impl Default for PipelineThresholds {
    fn default() -> Self {
        Self { coverage_ratio: 0.5, at_risk_probability: 50.0 }
    }
}

#[derive(Debug, Clone)]
pub struct PreIssueThresholds {
    /// Raise lead time: intervention must start this long before a runway breach.
    pub runway_buffer_days: f64,
    /// Course-correction lead time before a goal due date.
    pub goal_buffer_days: f64,
    /// Re-engagement lead time before a deal goes cold.
    pub deal_buffer_days: f64,
    /// Escalations closer than this many days are imminent.
    pub imminent_days: f64,
    /// Goal-miss pre-issue fires below this probability of hit.
    pub goal_miss_probability: f64,
}

impl Default for PreIssueThresholds {
    fn default() -> Self {
        Self {
            runway_buffer_days: 90.0,
            goal_buffer_days: 14.0,
            deal_buffer_days: 7.0,
            imminent_days: 7.0,
            goal_miss_probability: 0.6,
        }
    }
}

/// Piecewise cost-of-delay bands over days-until-escalation, plus per-type
/// multipliers. The curve must be monotonically non-decreasing as the
/// escalation date approaches; a property test pins this.
#[derive(Debug, Clone)]
pub struct CostOfDelayTable {
    /// Beyond this many days out the multiplier is flat 1.0.
    pub flat_days: f64,
    /// 1.0 → `mid_max` between `mid_days` and `flat_days`.
    pub mid_days: f64,
    pub mid_max: f64,
    /// `mid_max` → `near_max` between `near_days` and `mid_days`.
    pub near_days: f64,
    pub near_max: f64,
    /// `near_max` → `peak` between 0 and `near_days`.
    pub peak: f64,
    /// Unbounded growth per day past escalation, added on top of `peak`.
    pub overdue_slope: f64,
    pub runway_multiplier: f64,
    pub goal_multiplier: f64,
    pub deal_multiplier: f64,
}

impl Default for CostOfDelayTable {
    fn default() -> Self {
        Self {
            flat_days: 30.0,
            mid_days: 14.0,
            mid_max: 1.5,
            near_days: 7.0,
            near_max: 2.5,
            peak: 5.0,
            overdue_slope: 0.5,
            runway_multiplier: 1.5,
            goal_multiplier: 1.0,
            deal_multiplier: 1.2,
        }
    }
}

#[derive(Debug, Clone)]
pub struct IntroThresholds {
    /// Hard hop cap for the relationship BFS.
    pub max_hops: usize,
    /// Baseline cold-outreach conversion a path is compared against.
    pub baseline_conversion: f64,
    /// Multi-hop paths must beat this lift over baseline to be retained.
    pub lift_threshold: f64,
    /// Per-extra-hop attenuation of chain strength.
    pub hop_decay: f64,
    /// If fewer than this fraction of discovered 2-hop paths pass the lift
    /// threshold, the whole second-order feature is suppressed for that
    /// traversal (noise-floor circuit breaker).
    pub noise_floor: f64,
}

impl Default for IntroThresholds {
    fn default() -> Self {
        Self {
            max_hops: 2,
            baseline_conversion: 0.15,
            lift_threshold: 1.2,
            hop_decay: 0.6,
            noise_floor: 0.2,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TrustWeights {
    /// Weight on inverse relationship strength.
    pub strength_weight: f64,
    /// Penalty per recency bucket: ≤7d, ≤30d, ≤90d, >90d (or never).
    pub recency_penalties: [f64; 4],
    /// Escalating penalty for 0, 1, 2, 3, 4+ recent asks to the same person.
    pub ask_penalties: [f64; 5],
    /// Penalty per path length: 1, 2, 3, 4+ hops.
    pub path_penalties: [f64; 4],
    /// Penalty when introducer/target tags and sectors do not line up.
    pub fit_mismatch_penalty: f64,
    /// Penalty for senior introducer + weak edge, or a low success rate.
    pub asymmetry_penalty: f64,
    /// Success rate below which the asymmetry penalty applies.
    pub asymmetry_success_rate: f64,
    /// Strength below which a senior introducer's edge counts as weak.
    pub weak_edge_strength: f64,
    /// Band boundaries: low ≤ first, medium ≤ second, high above.
    pub band_low: f64,
    pub band_medium: f64,
    /// Scores above this hard-block the opportunity (timing NEVER).
    pub block_threshold: f64,
}

impl Default for TrustWeights {
    fn default() -> Self {
        Self {
            strength_weight: 0.3,
            recency_penalties: [0.0, 10.0, 25.0, 40.0],
            ask_penalties: [0.0, 5.0, 15.0, 30.0, 50.0],
            path_penalties: [0.0, 15.0, 35.0, 50.0],
            fit_mismatch_penalty: 15.0,
            asymmetry_penalty: 12.0,
            asymmetry_success_rate: 0.5,
            weak_edge_strength: 40.0,
            band_low: 30.0,
            band_medium: 60.0,
            block_threshold: 80.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TimingWeights {
    /// Score at or above which the recommendation is NOW.
    pub now_threshold: f64,
    /// Score at or above which the recommendation is SOON.
    pub soon_threshold: f64,
    /// Days-left below which goal distance contributes maximum urgency.
    pub urgent_days: f64,
    pub goal_distance_weight: f64,
    pub time_pressure_weight: f64,
    pub velocity_weight: f64,
    pub seasonality_weight: f64,
    pub trust_weight: f64,
    pub probability_weight: f64,
}

impl Default for TimingWeights {
    fn default() -> Self {
        Self {
            now_threshold: 0.65,
            soon_threshold: 0.4,
            urgent_days: 30.0,
            goal_distance_weight: 0.25,
            time_pressure_weight: 0.2,
            velocity_weight: 0.15,
            seasonality_weight: 0.1,
            trust_weight: 0.15,
            probability_weight: 0.15,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RankingWeights {
    /// Trust risk below this (on [0,1]) carries no penalty.
    pub trust_floor: f64,
    pub trust_scale: f64,
    /// Per-step friction, counted up to `max_steps`.
    pub step_penalty: f64,
    pub max_steps: usize,
    pub complexity_scale: f64,
    /// Time penalty: min(cap, days / divisor).
    pub time_penalty_cap: f64,
    pub time_penalty_divisor: f64,
    /// Deadline boost: scale × e^(−days/tau) inside the window.
    pub boost_scale: f64,
    pub boost_tau: f64,
    pub boost_window_days: f64,
    /// Scores closer than this are a tie, broken by actionId.
    pub tie_epsilon: f64,
}

impl Default for RankingWeights {
    fn default() -> Self {
        Self {
            trust_floor: 0.3,
            trust_scale: 20.0,
            step_penalty: 0.5,
            max_steps: 10,
            complexity_scale: 5.0,
            time_penalty_cap: 30.0,
            time_penalty_divisor: 7.0,
            boost_scale: 15.0,
            boost_tau: 7.0,
            boost_window_days: 28.0,
            tie_epsilon: 1e-4,
        }
    }
}
