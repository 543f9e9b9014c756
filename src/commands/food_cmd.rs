use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use chrono::Utc;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use log::{info, warn};

use crate::food::analysis::{NutritionalGuidelines, RdaProfile};
use crate::food::api::{FoodSource, FoodSummary, MAX_PAGE_SIZE};
use crate::food::catalog::FoodCatalog;

/// Pause between detail requests so a full fetch stays under the USDA rate limit.
pub const REQUEST_DELAY: Duration = Duration::from_millis(500);

#[derive(Debug, Clone)]
pub struct FetchOptions {
    pub output: PathBuf,
    pub max_foods: Option<usize>,
    pub delay: Duration,
    pub show_progress: bool,
}

impl FetchOptions {
    pub fn new(output: impl Into<PathBuf>) -> Self {
        Self {
            output: output.into(),
            max_foods: None,
            delay: REQUEST_DELAY,
            show_progress: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchSummary {
    pub listed: usize,
    pub saved: usize,
    pub failed: usize,
    pub duplicates: usize,
}

/// Walks the paginated food listing until every page is read or the cap is hit.
pub async fn list_all_foods(source: &dyn FoodSource, max_foods: Option<usize>) -> Result<Vec<FoodSummary>> {
    let mut foods = Vec::new();
    let mut page_number = 1;

    loop {
        let page = source
            .list_foods(page_number, MAX_PAGE_SIZE)
            .await
            .with_context(|| format!("Failed to list foods (page {})", page_number))?;
        let empty = page.foods.is_empty();
        foods.extend(page.foods);
        info!("Listed page {} of {} ({} foods so far)", page_number, page.total_pages, foods.len());

        if let Some(max) = max_foods {
            if foods.len() >= max {
                foods.truncate(max);
                break;
            }
        }
        if empty || page_number >= page.total_pages {
            break;
        }
        page_number += 1;
    }

    Ok(foods)
}

/// Downloads every listed food's detail and writes the catalog snapshot.
/// Individual failures are counted and skipped.
pub async fn fetch_database(source: &dyn FoodSource, options: &FetchOptions) -> Result<FetchSummary> {
    let summaries = list_all_foods(source, options.max_foods).await?;
    if summaries.is_empty() {
        bail!("The USDA listing returned no foods");
    }
    println!("{} {} foods", "Fetching details for".bright_cyan(), summaries.len());

    let pb = if options.show_progress {
        let pb = ProgressBar::new(summaries.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}")?,
        );
        pb
    } else {
        ProgressBar::hidden()
    };

    let mut catalog = FoodCatalog::new();
    let mut failed = 0;
    let mut duplicates = 0;

    for (i, summary) in summaries.iter().enumerate() {
        if i > 0 && !options.delay.is_zero() {
            tokio::time::sleep(options.delay).await;
        }
        pb.set_message(summary.description.clone());

        match source.food_details(summary.fdc_id).await {
            Ok(record) => {
                if !catalog.insert(record) {
                    duplicates += 1;
                }
            }
            Err(e) => {
                warn!("Skipping food {}: {}", summary.fdc_id, e);
                failed += 1;
            }
        }
        pb.inc(1);
    }
    pb.finish_with_message("done");

    if catalog.is_empty() {
        bail!("No food details could be fetched ({} failures)", failed);
    }
    catalog
        .save(&options.output, Utc::now())
        .with_context(|| format!("Failed to write {}", options.output.display()))?;

    let summary = FetchSummary {
        listed: summaries.len(),
        saved: catalog.len(),
        failed,
        duplicates,
    };
    println!(
        "{} {} foods to {}",
        "Saved".bright_green(),
        summary.saved,
        options.output.display().to_string().bright_yellow()
    );
    if failed > 0 {
        println!("{} {} foods failed to download", "Warning:".yellow(), failed);
    }
    Ok(summary)
}

/// Prints the guideline table for a profile, or writes the raw table as JSON.
pub fn export_guidelines(profile: RdaProfile, output: Option<&Path>) -> Result<()> {
    let guidelines = NutritionalGuidelines::new();

    if let Some(path) = output {
        let json = serde_json::to_string_pretty(&guidelines.to_json())?;
        std::fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;
        println!("{} {}", "Guidelines written to".bright_green(), path.display());
        return Ok(());
    }

    println!("{} ({})", "Daily nutrient guidelines".bold(), profile);
    for req in guidelines.all_requirements(profile) {
        let rda = req.rda.map_or_else(|| "-".to_string(), |v| format!("{}", v));
        let ul = req.upper_limit.map_or_else(|| "-".to_string(), |v| format!("{}", v));
        println!("  {:<32} RDA {:>8} {:<5} UL {:>8}", req.nutrient.bright_cyan(), rda, req.unit, ul);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::food::api::MockFoodSource;

    fn options(dir: &tempfile::TempDir) -> FetchOptions {
        FetchOptions {
            output: dir.path().join("db.json"),
            max_foods: None,
            delay: Duration::ZERO,
            show_progress: false,
        }
    }

    #[tokio::test]
    async fn test_fetch_writes_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let options = options(&dir);
        let summary = fetch_database(&MockFoodSource::new(), &options).await.unwrap();

        assert_eq!(summary.listed, 4);
        assert_eq!(summary.saved, 4);
        assert_eq!(summary.failed, 0);

        let catalog = FoodCatalog::load(&options.output).unwrap();
        assert_eq!(catalog.len(), 4);
    }

    #[tokio::test]
    async fn test_fetch_respects_max_foods() {
        let dir = tempfile::tempdir().unwrap();
        let mut options = options(&dir);
        options.max_foods = Some(2);

        let summary = fetch_database(&MockFoodSource::new(), &options).await.unwrap();
        assert_eq!(summary.listed, 2);
        assert_eq!(summary.saved, 2);
    }

    #[tokio::test]
    async fn test_fetch_offline_fails_without_writing() {
        let dir = tempfile::tempdir().unwrap();
        let options = options(&dir);
        assert!(fetch_database(&MockFoodSource::offline(), &options).await.is_err());
        assert!(!options.output.exists());
    }

    #[test]
    fn test_export_guidelines_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("guidelines.json");
        export_guidelines(RdaProfile::Average, Some(&path)).unwrap();

        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert!(json.get("iron_mg").is_some());
    }
}
