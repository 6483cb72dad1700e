//! Persisted-state checks

use tracing::debug;

use crate::error::{E2eError, E2eResult};
use crate::store::OptionStore;

/// Fail unless option `name` is stored with exactly `expected`.
pub async fn assert_option(store: &dyn OptionStore, name: &str, expected: &str) -> E2eResult<()> {
    match store.get(name).await? {
        None => Err(E2eError::OptionMissing {
            name: name.to_string(),
        }),
        Some(actual) if actual != expected => Err(E2eError::OptionMismatch {
            name: name.to_string(),
            expected: expected.to_string(),
            actual,
        }),
        Some(_) => {
            debug!("Option {} = '{}'", name, expected);
            Ok(())
        }
    }
}

/// [`assert_option`] for each pair, stopping at the first failure.
pub async fn assert_options(store: &dyn OptionStore, expected: &[(&str, &str)]) -> E2eResult<()> {
    for (name, value) in expected {
        assert_option(store, name, value).await?;
    }
    Ok(())
}
