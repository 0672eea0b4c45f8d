//! Serializable scenario configuration.
//!
//! A scenario describes one complete keeper run: the assets, the accounts and
//! their funding, the order the owner opens, the price path the market walks,
//! the keeper fleet polling it, and any collaborator failures to inject.
//!
//! Amounts are written in whole units and scaled by the asset's `decimals`
//! when the scenario is run, so TOML files stay readable.

use std::path::Path;

use autoexit_core::domain::{AccountId, AssetId, FeeTier, OpenOrderParams, Tick, TickError};
use autoexit_core::sim::{ProceedsModel, SimOp};
use autoexit_core::ControllerConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Unique identifier for a scenario (content-addressable hash).
pub type ScenarioId = String;

/// Largest supported `decimals`; `10^38` is the largest power of ten in a `u128`.
pub const MAX_DECIMALS: u32 = 38;

#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error("failed to read scenario {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse scenario: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid scenario: {0}")]
    Invalid(String),

    #[error("{value} whole units at {decimals} decimals overflows")]
    AmountOverflow { value: u64, decimals: u32 },

    #[error(transparent)]
    Tick(#[from] TickError),
}

/// Full scenario configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ScenarioConfig {
    pub name: String,

    #[serde(default)]
    pub description: String,

    pub assets: AssetsConfig,

    #[serde(default)]
    pub accounts: AccountsConfig,

    pub funding: FundingConfig,

    pub order: OrderConfig,

    #[serde(default)]
    pub controller: ControllerConfig,

    pub market: MarketConfig,

    pub path: PathConfig,

    #[serde(default)]
    pub keepers: KeeperConfig,

    #[serde(default)]
    pub failures: Vec<FailureConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AssetsConfig {
    pub base: AssetSpec,
    pub quote: AssetSpec,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AssetSpec {
    pub symbol: String,
    #[serde(default)]
    pub decimals: u32,
}

impl AssetSpec {
    pub fn id(&self) -> AssetId {
        AssetId::new(self.symbol.as_str())
    }

    /// Convert whole units to raw units.
    pub fn scale(&self, whole: u64) -> Result<u128, ScenarioError> {
        10u128
            .checked_pow(self.decimals)
            .and_then(|factor| u128::from(whole).checked_mul(factor))
            .ok_or(ScenarioError::AmountOverflow {
                value: whole,
                decimals: self.decimals,
            })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AccountsConfig {
    pub owner: String,
    pub controller: String,
    pub issuer: String,
}

impl Default for AccountsConfig {
    fn default() -> Self {
        Self {
            owner: "owner".into(),
            controller: "autoexit".into(),
            issuer: autoexit_core::sim::DEFAULT_ISSUER.into(),
        }
    }
}

impl AccountsConfig {
    pub fn owner_id(&self) -> AccountId {
        AccountId::new(self.owner.as_str())
    }

    pub fn controller_id(&self) -> AccountId {
        AccountId::new(self.controller.as_str())
    }

    pub fn issuer_id(&self) -> AccountId {
        AccountId::new(self.issuer.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FundingConfig {
    /// Base balance minted to the owner, in whole units.
    pub owner_base: u64,
    /// Allowance the owner grants the controller; defaults to `owner_base`.
    #[serde(default)]
    pub allowance: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderConfig {
    #[serde(default = "default_fee_tier")]
    pub fee_tier: u32,
    /// Committed base amount, in whole units.
    pub committed: u64,
    pub lower_tick: i32,
    pub upper_tick: i32,
}

fn default_fee_tier() -> u32 {
    FeeTier::MEDIUM.0
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MarketConfig {
    /// Pool tick before the path starts; the order is opened at this price.
    pub initial_tick: i32,
    #[serde(default)]
    pub proceeds: ProceedsConfig,
}

/// What a full conversion pays, see [`ProceedsModel`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum ProceedsConfig {
    /// Fixed quote amount for a full conversion, in whole quote units.
    Fixed { amount: u64 },
    /// Raw quote units per raw base unit.
    Ratio { numerator: u64, denominator: u64 },
}

impl Default for ProceedsConfig {
    fn default() -> Self {
        ProceedsConfig::Ratio {
            numerator: 1,
            denominator: 1,
        }
    }
}

/// Sequence of pool ticks the keepers observe, one per step.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum PathConfig {
    Explicit {
        ticks: Vec<i32>,
    },
    /// Seeded random walk: each step moves by `drift + U[-max_step, max_step]`,
    /// clamped to the tick domain.
    RandomWalk {
        start: i32,
        steps: usize,
        max_step: i32,
        #[serde(default)]
        drift: i32,
        seed: u64,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct KeeperConfig {
    /// Number of independent keepers polling the controller.
    pub count: usize,
    /// Keepers poll every `stride` steps.
    pub stride: usize,
}

impl Default for KeeperConfig {
    fn default() -> Self {
        Self {
            count: 1,
            stride: 1,
        }
    }
}

/// A collaborator failure armed when the path reaches `at_step`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FailureConfig {
    pub op: SimOp,
    #[serde(default)]
    pub at_step: usize,
    /// Fail this many calls; every call until the run ends when absent.
    #[serde(default)]
    pub times: Option<u32>,
    #[serde(default = "default_failure_reason")]
    pub reason: String,
}

fn default_failure_reason() -> String {
    "injected failure".into()
}

impl ScenarioConfig {
    /// Load and validate a scenario from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ScenarioError> {
        let text = std::fs::read_to_string(path).map_err(|source| ScenarioError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Parse and validate a scenario from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self, ScenarioError> {
        let config: ScenarioConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Deterministic hash of the scenario.
    ///
    /// Two scenarios with identical content share an id, so reports can be
    /// matched to the exact configuration that produced them.
    pub fn scenario_id(&self) -> ScenarioId {
        // Plain data with string keys: serialization cannot fail.
        let json = serde_json::to_vec(self).unwrap_or_default();
        blake3::hash(&json).to_hex().to_string()
    }

    /// Structural checks. Order parameters are deliberately not checked here:
    /// rejecting them is the controller's job, and a scenario may exercise
    /// exactly that.
    pub fn validate(&self) -> Result<(), ScenarioError> {
        if self.name.trim().is_empty() {
            return Err(ScenarioError::Invalid("name must not be empty".into()));
        }
        for spec in [&self.assets.base, &self.assets.quote] {
            if spec.symbol.trim().is_empty() {
                return Err(ScenarioError::Invalid("asset symbol must not be empty".into()));
            }
            if spec.decimals > MAX_DECIMALS {
                return Err(ScenarioError::Invalid(format!(
                    "{} decimals {} exceeds {MAX_DECIMALS}",
                    spec.symbol, spec.decimals
                )));
            }
        }
        if self.assets.base.symbol == self.assets.quote.symbol {
            return Err(ScenarioError::Invalid(
                "base and quote must be different assets".into(),
            ));
        }
        let accounts = [
            &self.accounts.owner,
            &self.accounts.controller,
            &self.accounts.issuer,
        ];
        if accounts.iter().any(|a| a.trim().is_empty()) {
            return Err(ScenarioError::Invalid("account names must not be empty".into()));
        }
        if accounts[0] == accounts[1] || accounts[0] == accounts[2] || accounts[1] == accounts[2] {
            return Err(ScenarioError::Invalid("account names must be distinct".into()));
        }

        Tick::new(self.market.initial_tick)?;
        match &self.path {
            PathConfig::Explicit { ticks } => {
                if ticks.is_empty() {
                    return Err(ScenarioError::Invalid("path must have at least one tick".into()));
                }
                for &tick in ticks {
                    Tick::new(tick)?;
                }
            }
            PathConfig::RandomWalk {
                start,
                steps,
                max_step,
                ..
            } => {
                Tick::new(*start)?;
                if *steps == 0 {
                    return Err(ScenarioError::Invalid("random walk needs at least one step".into()));
                }
                if *max_step < 0 {
                    return Err(ScenarioError::Invalid("max_step must not be negative".into()));
                }
            }
        }

        if let ProceedsConfig::Ratio { denominator: 0, .. } = self.market.proceeds {
            return Err(ScenarioError::Invalid("proceeds denominator must not be zero".into()));
        }
        if self.keepers.count == 0 {
            return Err(ScenarioError::Invalid("at least one keeper is required".into()));
        }
        if self.keepers.stride == 0 {
            return Err(ScenarioError::Invalid("keeper stride must be at least 1".into()));
        }

        // Surface overflow now rather than mid-run.
        self.committed_amount()?;
        self.owner_funding()?;
        self.allowance()?;
        self.proceeds_model()?;
        Ok(())
    }

    pub fn base(&self) -> AssetId {
        self.assets.base.id()
    }

    pub fn quote(&self) -> AssetId {
        self.assets.quote.id()
    }

    pub fn committed_amount(&self) -> Result<u128, ScenarioError> {
        self.assets.base.scale(self.order.committed)
    }

    pub fn owner_funding(&self) -> Result<u128, ScenarioError> {
        self.assets.base.scale(self.funding.owner_base)
    }

    pub fn allowance(&self) -> Result<u128, ScenarioError> {
        self.assets
            .base
            .scale(self.funding.allowance.unwrap_or(self.funding.owner_base))
    }

    pub fn proceeds_model(&self) -> Result<ProceedsModel, ScenarioError> {
        Ok(match self.market.proceeds {
            ProceedsConfig::Fixed { amount } => ProceedsModel::Fixed {
                amount: self.assets.quote.scale(amount)?,
            },
            ProceedsConfig::Ratio {
                numerator,
                denominator,
            } => ProceedsModel::Ratio {
                numerator: numerator as u128,
                denominator: denominator as u128,
            },
        })
    }

    /// The order the owner submits.
    pub fn order_params(&self) -> Result<OpenOrderParams, ScenarioError> {
        Ok(OpenOrderParams {
            base_asset: self.base(),
            quote_asset: self.quote(),
            fee_tier: FeeTier(self.order.fee_tier),
            committed_amount: self.committed_amount()?,
            lower_tick: self.order.lower_tick,
            upper_tick: self.order.upper_tick,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const REFERENCE: &str = r#"
name = "reference"

[assets]
base = { symbol = "USDC" }
quote = { symbol = "WETH" }

[funding]
owner_base = 3000

[order]
committed = 3000
lower_tick = 79700
upper_tick = 80000

[market]
initial_tick = 80500
proceeds = { fixed = { amount = 1000 } }

[path.explicit]
ticks = [80500, 79000]
"#;

    #[test]
    fn parses_with_defaults() {
        let config = ScenarioConfig::from_toml_str(REFERENCE).unwrap();
        assert_eq!(config.accounts, AccountsConfig::default());
        assert_eq!(config.keepers, KeeperConfig::default());
        assert_eq!(config.order.fee_tier, 3000);
        assert_eq!(config.funding.allowance, None);
        assert_eq!(config.allowance().unwrap(), 3000);
        assert!(!config.controller.sweep_residual_base);
        assert!(config.failures.is_empty());
        assert_eq!(
            config.proceeds_model().unwrap(),
            ProceedsModel::Fixed { amount: 1000 }
        );
    }

    #[test]
    fn scenario_id_is_deterministic() {
        let a = ScenarioConfig::from_toml_str(REFERENCE).unwrap();
        let b = ScenarioConfig::from_toml_str(REFERENCE).unwrap();
        assert_eq!(a.scenario_id(), b.scenario_id());
        assert_eq!(a.scenario_id().len(), 64);

        let mut c = a.clone();
        c.order.committed = 2999;
        assert_ne!(a.scenario_id(), c.scenario_id());
    }

    #[test]
    fn decimals_scale_amounts() {
        let spec = AssetSpec {
            symbol: "USDC".into(),
            decimals: 6,
        };
        assert_eq!(spec.scale(3000).unwrap(), 3_000_000_000);

        let huge = AssetSpec {
            symbol: "X".into(),
            decimals: 38,
        };
        assert!(matches!(
            huge.scale(u64::MAX),
            Err(ScenarioError::AmountOverflow { .. })
        ));
    }

    #[test]
    fn rejects_structural_errors() {
        let cases = [
            ("ticks = [80500, 79000]", "ticks = []"),
            ("[funding]", "[keepers]\ncount = 0\n\n[funding]"),
            ("initial_tick = 80500", "initial_tick = 900000"),
            (r#"quote = { symbol = "WETH" }"#, r#"quote = { symbol = "USDC" }"#),
        ];
        for (from, to) in cases {
            let text = REFERENCE.replace(from, to);
            assert!(ScenarioConfig::from_toml_str(&text).is_err(), "{to}");
        }
    }

    #[test]
    fn unknown_fields_rejected() {
        let text = format!("bogus = 1\n{REFERENCE}");
        assert!(matches!(
            ScenarioConfig::from_toml_str(&text),
            Err(ScenarioError::Parse(_))
        ));
    }

    #[test]
    fn inverted_order_range_is_left_to_the_controller() {
        let text = REFERENCE.replace("lower_tick = 79700", "lower_tick = 81000");
        let config = ScenarioConfig::from_toml_str(&text).unwrap();
        assert_eq!(config.order_params().unwrap().lower_tick, 81000);
    }

    #[test]
    fn random_walk_and_failures_parse() {
        let text = REFERENCE.replace(
            "[path.explicit]\nticks = [80500, 79000]",
            r#"[path.random_walk]
start = 80500
steps = 50
max_step = 40
drift = -20
seed = 7

[[failures]]
op = "collect"
at_step = 3
times = 1
"#,
        );
        let config = ScenarioConfig::from_toml_str(&text).unwrap();
        assert!(matches!(config.path, PathConfig::RandomWalk { steps: 50, .. }));
        assert_eq!(config.failures.len(), 1);
        assert_eq!(config.failures[0].op, SimOp::Collect);
        assert_eq!(config.failures[0].reason, "injected failure");
    }
}
