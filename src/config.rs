use anyhow::Result;
use std::env;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Dev,
    Staging,
    Prod,
}

impl Environment {
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "prod" | "production" => Self::Prod,
            "staging" => Self::Staging,
            _ => Self::Dev,
        }
    }

    pub fn is_dev(&self) -> bool {
        matches!(self, Self::Dev)
    }

    pub fn is_prod(&self) -> bool {
        matches!(self, Self::Prod)
    }
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub env: Environment,

    // Procedure periods (days)
    pub tendering_period_days: i64,
    pub standstill_period_days: i64,
    pub complaint_period_days: i64,

    // Minimum number of bids a lot needs to reach auction
    pub min_bids_number: usize,
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        // Load .env if present; environment always wins.
        dotenvy::dotenv().ok();

        let env = Environment::from_str(&env::var("ENV").unwrap_or_else(|_| "dev".to_string()));

        let tendering_period_days = env::var("TENDERING_PERIOD_DAYS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(30);
        let standstill_period_days = env::var("STANDSTILL_PERIOD_DAYS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(10);
        let complaint_period_days = env::var("COMPLAINT_PERIOD_DAYS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(10);
        let min_bids_number = env::var("MIN_BIDS_NUMBER")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(2);

        Ok(Settings {
            env,
            tendering_period_days,
            standstill_period_days,
            complaint_period_days,
            min_bids_number,
        })
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            env: Environment::Dev,
            tendering_period_days: 30,
            standstill_period_days: 10,
            complaint_period_days: 10,
            min_bids_number: 2,
        }
    }
}
