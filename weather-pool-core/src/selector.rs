use std::sync::Arc;

use rand::Rng;

use crate::{provider::ProviderDescriptor, registry::ProviderRegistry};

/// Picks one provider uniformly at random among those that are enabled and
/// under quota. `None` when no provider is eligible.
///
/// Never blocks beyond the per-provider locks read for eligibility.
pub fn select_provider<R: Rng + ?Sized>(
    registry: &ProviderRegistry,
    rng: &mut R,
) -> Option<Arc<ProviderDescriptor>> {
    let eligible: Vec<&Arc<ProviderDescriptor>> =
        registry.iter().filter(|p| p.is_eligible()).collect();

    if eligible.is_empty() {
        tracing::debug!(registered = registry.len(), "no eligible provider");
        return None;
    }

    let chosen = eligible[rng.random_range(0..eligible.len())];
    tracing::debug!(provider = chosen.name(), eligible = eligible.len(), "provider selected");
    Some(Arc::clone(chosen))
}
