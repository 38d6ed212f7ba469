//! Assertions run on the normalized config before planning.
//! Each one returns the first violation it finds.

use std::collections::HashSet;

use crate::core::config::NormalizedConfig;
use crate::core::error::{Error, Result};
use crate::core::models::Filters;

/// Every activated reporter must be registered in `reporters.list`.
pub fn validate_activated_reporters(config: &NormalizedConfig) -> Result<()> {
    let reporters = &config.reporters;
    match reporters
        .activated
        .iter()
        .find(|name| !reporters.list.iter().any(|reporter| reporter.name == **name))
    {
        Some(unknown) => Err(Error::UnknownReporter(unknown.clone())),
        None => Ok(()),
    }
}

/// A suites filter needs configured suites, and may only name existing ones.
pub fn validate_suites_filter(config: &NormalizedConfig) -> Result<()> {
    let Some(filter) = Filters::active(&config.filters.suites) else {
        return Ok(());
    };

    let suites = config.suites();
    if suites.is_empty() {
        return Err(Error::SuitesFilterWithoutSuites);
    }

    match filter
        .iter()
        .find(|name| !suites.iter().any(|suite| suite.name == **name))
    {
        Some(unknown) => Err(Error::UnknownSuite(unknown.clone())),
        None => Ok(()),
    }
}

/// Suite names must be unique. Files based configs always pass.
pub fn validate_suites_for_uniqueness(config: &NormalizedConfig) -> Result<()> {
    let mut seen = HashSet::new();
    for suite in config.suites() {
        if !seen.insert(suite.name.as_str()) {
            return Err(Error::DuplicateSuite(suite.name.clone()));
        }
    }
    Ok(())
}

/// Runs every validation, in order.
pub fn validate(config: &NormalizedConfig) -> Result<()> {
    validate_activated_reporters(config)?;
    validate_suites_filter(config)?;
    validate_suites_for_uniqueness(config)
}
