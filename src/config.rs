use std::env;
use std::path::PathBuf;

use crate::error::DashboardError;
use crate::food::analysis::RdaProfile;
use crate::food::config::FoodConfig;
use crate::food::session::DEFAULT_CACHE_SIZE;

pub const DEFAULT_PORT: u16 = 8501;
pub const DEFAULT_DATABASE_PATH: &str = "data/food_nutrient_database.json";

#[derive(Debug, Clone)]
pub struct DashboardConfig {
    pub port: u16,
    pub database_path: PathBuf,
    pub rda_profile: RdaProfile,
    pub cache_size: usize,
    pub food: FoodConfig,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            database_path: PathBuf::from(DEFAULT_DATABASE_PATH),
            rda_profile: RdaProfile::default(),
            cache_size: DEFAULT_CACHE_SIZE,
            food: FoodConfig::default(),
        }
    }
}

impl DashboardConfig {
    pub fn from_env() -> Result<Self, DashboardError> {
        let port: u16 = match env::var("DASHBOARD_PORT") {
            Ok(raw) => raw
                .trim()
                .parse()
                .map_err(|e| DashboardError::Config(format!("Invalid DASHBOARD_PORT '{}': {}", raw, e)))?,
            Err(_) => DEFAULT_PORT,
        };

        let database_path = env::var("FOOD_DATABASE_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_DATABASE_PATH));

        let rda_profile: RdaProfile = match env::var("RDA_PROFILE") {
            Ok(raw) => raw
                .parse()
                .map_err(|e: DashboardError| DashboardError::Config(e.to_string()))?,
            Err(_) => RdaProfile::default(),
        };

        let cache_size = env::var("DETAIL_CACHE_SIZE")
            .ok()
            .and_then(|s| s.trim().parse().ok())
            .filter(|&n: &usize| n > 0)
            .unwrap_or(DEFAULT_CACHE_SIZE);

        Ok(Self {
            port,
            database_path,
            rda_profile,
            cache_size,
            food: FoodConfig::from_env()?,
        })
    }
}
