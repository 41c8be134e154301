use std::time::Duration;

use crate::ProviderId;

/// Request budget an adapter enforces against its upstream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderPolicy {
    pub provider_id: ProviderId,
    pub quota_window: Duration,
    pub quota_limit: u32,
}

impl ProviderPolicy {
    /// Finnhub free tier: 60 calls per minute.
    pub fn finnhub_default() -> Self {
        Self {
            provider_id: ProviderId::Finnhub,
            quota_window: Duration::from_secs(60),
            quota_limit: 60,
        }
    }

    pub fn yahoo_default() -> Self {
        Self {
            provider_id: ProviderId::Yahoo,
            quota_window: Duration::from_secs(60),
            quota_limit: 120,
        }
    }

    pub fn default_for(provider_id: ProviderId) -> Self {
        match provider_id {
            ProviderId::Yahoo => Self::yahoo_default(),
            ProviderId::Finnhub => Self::finnhub_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finnhub_policy_matches_free_tier() {
        let policy = ProviderPolicy::default_for(ProviderId::Finnhub);

        assert_eq!(policy.provider_id, ProviderId::Finnhub);
        assert_eq!(policy.quota_window, Duration::from_secs(60));
        assert_eq!(policy.quota_limit, 60);
    }

    #[test]
    fn yahoo_policy_allows_higher_budget() {
        let policy = ProviderPolicy::default_for(ProviderId::Yahoo);

        assert_eq!(policy.provider_id, ProviderId::Yahoo);
        assert_eq!(policy.quota_limit, 120);
    }
}
